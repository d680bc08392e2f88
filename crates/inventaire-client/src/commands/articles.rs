//! Article form and catalog mutations.
//!
//! The local catalog only changes after the backend acknowledged the write.

use inventaire_shared::{Article, ArticleForm};
use tracing::{error, info};

use super::App;
use crate::backend::Backend;
use crate::error::ClientError;
use crate::state::View;

impl<B: Backend> App<B> {
    pub(super) fn reset_article_form(&mut self) {
        self.state.article_form = ArticleForm::default();
        self.state.editing = None;
    }

    /// Open an empty form for a new article.
    pub fn open_create_form(&mut self) -> Result<(), ClientError> {
        self.require_manager()?;
        self.reset_article_form();
        self.state.view = View::ArticleForm;
        Ok(())
    }

    /// Open the form pre-filled with an existing article.
    pub fn open_edit_form(&mut self, id: i64) -> Result<(), ClientError> {
        self.require_manager()?;
        let Some(form) = self.state.article(id).map(ArticleForm::from_article) else {
            return Err(self.fail(ClientError::ArticleNotFound));
        };
        self.state.article_form = form;
        self.state.editing = Some(id);
        self.state.view = View::ArticleForm;
        Ok(())
    }

    /// Set one form field by name. Returns `false` for an unknown field.
    pub fn set_form_field(&mut self, field: &str, value: &str) -> bool {
        self.state.article_form.set(field, value)
    }

    pub fn cancel_article_form(&mut self) {
        self.reset_article_form();
        self.state.view = View::SearchArticles;
    }

    /// Create or update from the form. Required fields are checked before
    /// anything is sent.
    pub async fn save_article(&mut self) -> Result<Article, ClientError> {
        let user = self.require_manager()?;
        let draft = match self.state.article_form.to_draft() {
            Ok(draft) => draft,
            Err(e) => return Err(self.fail(e.into())),
        };

        self.begin();
        let result = match self.state.editing {
            Some(id) => self
                .backend
                .update_article(id, &draft)
                .await
                .map(|()| draft.clone().into_article(id)),
            None => self
                .backend
                .insert_article(&draft)
                .await
                .map(|row| row.into_article()),
        };
        self.end();

        let article = match result {
            Ok(article) => article,
            Err(e) => {
                error!(symbol = %draft.symbol, error = %e, "Article save failed");
                self.notifier
                    .error(format!("Erreur lors de la sauvegarde: {}", e.friendly()));
                return Err(e.into());
            }
        };

        let message = match self.state.editing {
            Some(id) => {
                if let Some(slot) = self.state.articles.iter_mut().find(|a| a.id == id) {
                    *slot = article.clone();
                }
                "Article modifié avec succès"
            }
            None => {
                self.state.articles.push(article.clone());
                "Article créé avec succès"
            }
        };
        info!(id = article.id, symbol = %article.symbol, by = %user.numero_cp, "{message}");

        self.reset_article_form();
        self.state.view = View::SearchArticles;
        self.notifier.success(message);
        Ok(article)
    }

    /// First step of a delete: stage the article for confirmation.
    pub fn request_delete(&mut self, id: i64) -> Result<Article, ClientError> {
        self.require_manager()?;
        let Some(article) = self.state.article(id).cloned() else {
            return Err(self.fail(ClientError::ArticleNotFound));
        };
        self.state.pending_delete = Some(id);
        Ok(article)
    }

    pub fn cancel_delete(&mut self) {
        self.state.pending_delete = None;
    }

    /// Second step of a delete: remove remotely, then locally.
    pub async fn confirm_delete(&mut self) -> Result<(), ClientError> {
        let user = self.require_manager()?;
        let Some(id) = self.state.pending_delete else {
            return Err(ClientError::NoPendingDelete);
        };

        self.begin();
        let result = self.backend.delete_article(id).await;
        self.end();
        self.state.pending_delete = None;

        if let Err(e) = result {
            error!(id, error = %e, "Article delete failed");
            self.notifier
                .error(format!("Erreur lors de la suppression: {}", e.friendly()));
            return Err(e.into());
        }

        self.state.articles.retain(|a| a.id != id);
        self.clamp_page();
        info!(id, by = %user.numero_cp, "Article deleted");
        self.notifier.success("Article supprimé avec succès");
        Ok(())
    }
}
