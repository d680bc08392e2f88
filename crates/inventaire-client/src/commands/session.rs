//! Session lifecycle: startup check, post-authentication gates, data load,
//! logout and navigation.

use chrono::Utc;
use inventaire_shared::{Article, CurrentUser};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::App;
use crate::backend::{ArticleRow, Backend};
use crate::error::ClientError;
use crate::state::{BootOutcome, View};

const SETUP_PIN_PROMPT: &str = "Veuillez créer votre code PIN pour sécuriser votre compte.";

impl<B: Backend> App<B> {
    /// Startup: restore the remembered identifier, then resume any existing
    /// backend session through the same gates as a fresh login.
    pub async fn bootstrap(&mut self) -> BootOutcome {
        self.restore_identifier().await;

        self.state.view = View::Loading;
        self.state.auth_loading = true;
        let outcome = match self.backend.get_session().await {
            Ok(Some(session)) => self.admit(session.user_id).await,
            Ok(None) => BootOutcome::Login,
            Err(e) => {
                warn!(error = %e, "Session check failed");
                BootOutcome::Login
            }
        };
        self.state.auth_loading = false;

        match outcome {
            BootOutcome::Login => self.state.view = View::Login,
            BootOutcome::Dashboard => {
                if let Err(e) = self.load_data().await {
                    warn!(error = %e, "Session resumed without a catalog");
                }
            }
            _ => {}
        }
        info!(?outcome, "Startup complete");
        outcome
    }

    /// Gates shared by every way into the application. Nothing is stored in
    /// the state before the blocked check passes.
    pub(super) async fn admit(&mut self, user_id: Uuid) -> BootOutcome {
        let record = match self.backend.fetch_user(user_id).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                warn!(%user_id, "No user row for session");
                self.discard_session().await;
                self.notifier.error(ClientError::NotAuthenticated.to_string());
                return BootOutcome::Reauthenticate;
            }
            Err(e) => {
                warn!(%user_id, error = %e, "Could not load user row");
                self.discard_session().await;
                self.notifier.error(ClientError::NotAuthenticated.to_string());
                return BootOutcome::Reauthenticate;
            }
        };

        if record.is_blocked() {
            warn!(numero_cp = %record.numero_cp, "Blocked account refused");
            self.discard_session().await;
            self.notifier.error(ClientError::AccountBlocked.to_string());
            return BootOutcome::Blocked;
        }

        let user = CurrentUser::from_record(&record);
        if !record.has_pin {
            info!(numero_cp = %record.numero_cp, "PIN setup required");
            self.state.current_user = Some(user);
            self.state.logged_in = false;
            self.state.view = View::SetupPin;
            self.notifier.success(SETUP_PIN_PROMPT);
            return BootOutcome::SetupPin;
        }

        if let Err(e) = self.backend.stamp_login(record.id, Utc::now()).await {
            warn!(numero_cp = %record.numero_cp, error = %e, "Could not record login");
        }

        info!(numero_cp = %record.numero_cp, profile = %record.profile, "User logged in");
        self.notifier.success(format!("Bienvenue {}!", user.name));
        self.state.current_user = Some(user);
        self.state.logged_in = true;
        self.state.view = View::Dashboard;
        BootOutcome::Dashboard
    }

    /// Sign out remotely after a refused admission and clear the user.
    async fn discard_session(&mut self) {
        if let Err(e) = self.backend.sign_out().await {
            warn!(error = %e, "Sign-out after refused admission failed");
        }
        self.state.current_user = None;
        self.state.logged_in = false;
        self.state.view = View::Login;
    }

    /// Fetch the catalog, and the user directory for administrators.
    ///
    /// A failure on the directory is logged and keeps the previous list.
    pub async fn load_data(&mut self) -> Result<usize, ClientError> {
        let user = self.signed_in()?;
        self.begin();

        let rows = match self.backend.list_articles().await {
            Ok(rows) => rows,
            Err(e) => {
                self.end();
                error!(error = %e, "Catalog load failed");
                self.notifier
                    .error(format!("Erreur lors du chargement des données: {}", e.friendly()));
                return Err(e.into());
            }
        };
        let articles: Vec<Article> = rows.into_iter().map(ArticleRow::into_article).collect();

        let users = if user.is_admin() {
            match self.backend.list_users().await {
                Ok(users) => Some(users),
                Err(e) => {
                    warn!(error = %e, "User directory load failed");
                    None
                }
            }
        } else {
            None
        };
        self.end();

        let count = articles.len();
        self.state.articles = articles;
        if let Some(users) = users {
            self.state.users = users;
        }
        self.clamp_page();

        info!(count, "Catalog loaded");
        self.notifier
            .success(format!("✅ Données chargées: {count} articles"));
        Ok(count)
    }

    pub async fn reload(&mut self) -> Result<usize, ClientError> {
        self.load_data().await
    }

    /// Invalidate the remote session and return to the login screen.
    ///
    /// Local state is cleared even when the backend cannot be reached; the
    /// remote failure is only reported.
    pub async fn logout(&mut self) -> Result<(), ClientError> {
        let remote = self.backend.sign_out().await;

        if let Err(e) = self.store().clear_session() {
            warn!(error = %e, "Could not clear persisted session");
        }
        let numero_cp = self.state.current_user.as_ref().map(|u| u.numero_cp.clone());
        self.state.reset_after_logout();

        match remote {
            Ok(()) => {
                info!(numero_cp = ?numero_cp, "User logged out");
                self.notifier.success("Déconnecté");
            }
            Err(e) => {
                warn!(numero_cp = ?numero_cp, error = %e, "Logged out locally, remote sign-out failed");
                self.notifier
                    .error("Déconnecté (erreur lors de la déconnexion du serveur)");
            }
        }
        Ok(())
    }

    /// Switch screen, refusing what the current profile cannot see.
    pub fn navigate(&mut self, view: View) -> Result<(), ClientError> {
        let user = self.signed_in()?;
        let allowed = match view {
            View::Loading | View::Login | View::SetupPin => false,
            View::Dashboard | View::SearchArticles | View::Stats | View::Settings => true,
            View::ArticleForm => user.can_manage_articles(),
            View::Users => user.is_admin(),
        };
        if !allowed {
            return Err(self.fail(ClientError::Forbidden));
        }

        if view == View::ArticleForm && self.state.view != View::ArticleForm {
            self.reset_article_form();
        }
        self.state.view = view;
        Ok(())
    }
}
