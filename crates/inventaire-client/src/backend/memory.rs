//! In-memory [`Backend`] for tests and demo mode.
//!
//! Behaves like the hosted backend where the controller can tell the
//! difference: unique symbols, ordered listings, the same error messages.
//! Any operation can be made to fail on demand.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use inventaire_shared::identity::email_from_cp;
use inventaire_shared::{ArticleDraft, Profile, Session, Status, UserRecord};
use uuid::Uuid;

use super::{ArticleRow, Backend, BackendResult};
use crate::error::BackendError;

/// Backend operations, used to inject failures and to inspect calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    GetSession,
    SignInPassword,
    SignInPin,
    SignOut,
    FetchUser,
    PinOnFile,
    StampLogin,
    SetPin,
    ListUsers,
    UpdateProfile,
    ListArticles,
    InsertArticle,
    UpdateArticle,
    DeleteArticle,
}

/// A directory entry together with its credentials.
#[derive(Debug, Clone)]
pub struct MemoryUser {
    pub record: UserRecord,
    pub password: String,
    pub pin: Option<String>,
}

#[derive(Debug, Default)]
struct Inner {
    users: Vec<MemoryUser>,
    articles: Vec<ArticleRow>,
    session: Option<Session>,
    next_article_id: i64,
    failing: HashSet<Operation>,
    calls: Vec<Operation>,
}

#[derive(Clone, Debug)]
pub struct MemoryBackend {
    inner: Arc<Mutex<Inner>>,
    email_domain: String,
}

impl MemoryBackend {
    pub fn new(email_domain: &str) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                next_article_id: 1,
                ..Inner::default()
            })),
            email_domain: email_domain.to_string(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a user and return its id.
    pub fn add_user(
        &self,
        numero_cp: &str,
        name: &str,
        profile: Profile,
        status: Status,
        password: &str,
        pin: Option<&str>,
    ) -> Uuid {
        let id = Uuid::new_v4();
        self.lock().users.push(MemoryUser {
            record: UserRecord {
                id,
                numero_cp: numero_cp.to_string(),
                name: name.to_string(),
                profile,
                status,
                last_login: None,
                failed_attempts: 0,
                created_at: Some(Utc::now()),
                has_pin: pin.is_some(),
            },
            password: password.to_string(),
            pin: pin.map(str::to_string),
        });
        id
    }

    /// Store an article directly and return its id.
    pub fn add_article(&self, draft: &ArticleDraft) -> i64 {
        let mut inner = self.lock();
        let id = inner.next_article_id;
        inner.next_article_id += 1;
        inner.articles.push(ArticleRow::from_draft(id, draft));
        id
    }

    /// Remove a user row while keeping any session that points to it.
    pub fn remove_user(&self, id: Uuid) {
        self.lock().users.retain(|u| u.record.id != id);
    }

    pub fn set_status(&self, id: Uuid, status: Status) {
        if let Some(user) = self.lock().users.iter_mut().find(|u| u.record.id == id) {
            user.record.status = status;
        }
    }

    /// Install a session as if left over from a previous run.
    pub fn set_session(&self, user_id: Uuid) {
        self.lock().session = Some(issue_session(user_id));
    }

    pub fn session(&self) -> Option<Session> {
        self.lock().session.clone()
    }

    pub fn user(&self, id: Uuid) -> Option<MemoryUser> {
        self.lock().users.iter().find(|u| u.record.id == id).cloned()
    }

    pub fn articles(&self) -> Vec<ArticleRow> {
        self.lock().articles.clone()
    }

    /// Make every later call to `op` fail until [`MemoryBackend::recover`].
    pub fn fail(&self, op: Operation) {
        self.lock().failing.insert(op);
    }

    pub fn recover(&self, op: Operation) {
        self.lock().failing.remove(&op);
    }

    /// Every operation called so far, in order.
    pub fn calls(&self) -> Vec<Operation> {
        self.lock().calls.clone()
    }

    pub fn called(&self, op: Operation) -> bool {
        self.lock().calls.contains(&op)
    }

    /// Record the call and return the injected failure, if any.
    fn enter(&self, op: Operation) -> BackendResult<MutexGuard<'_, Inner>> {
        let mut inner = self.lock();
        inner.calls.push(op);
        if inner.failing.contains(&op) {
            return Err(BackendError::Api {
                status: 503,
                message: format!("Service indisponible ({op:?})"),
            });
        }
        Ok(inner)
    }

    /// Backend pre-filled with a small directory and catalog.
    pub fn with_demo_data(email_domain: &str) -> Self {
        let backend = Self::new(email_domain);
        backend.add_user(
            "7408443F",
            "Administrateur Démo",
            Profile::Administrateur,
            Status::Actif,
            "admin1234",
            Some("1234"),
        );
        backend.add_user(
            "1234567G",
            "Gestionnaire Démo",
            Profile::Gestionnaire,
            Status::Actif,
            "gestion1234",
            None,
        );
        backend.add_user(
            "7654321C",
            "Consultant Démo",
            Profile::Consultant,
            Status::Actif,
            "consult1234",
            Some("4321"),
        );
        backend.add_user(
            "1111111B",
            "Compte Bloqué",
            Profile::Consultant,
            Status::Bloque,
            "bloque1234",
            Some("1111"),
        );

        const PARTS: [(&str, &str); 8] = [
            ("Isolateur composite 25 kV", "BDL"),
            ("Pendule de caténaire", "BDL"),
            ("Griffe de suspension", "SR"),
            ("Fil de contact 107 mm²", "BDL"),
            ("Console de rappel", "SR"),
            ("Bras de rappel", "SR"),
            ("Tendeur à ressort", "BDL"),
            ("Connecteur équipotentiel", "SR"),
        ];
        const LOCATIONS: [&str; 3] = ["Porte de Buc", "Matelots", "Plaisir"];

        for n in 0..45usize {
            let (designation, nature) = PARTS[n % PARTS.len()];
            backend.add_article(&ArticleDraft {
                symbol: format!("{:07}", 8400 + n * 7),
                designation: designation.to_string(),
                deposit_nature: Some(nature.to_string()),
                location: LOCATIONS[n % LOCATIONS.len()].to_string(),
                rack: Some(format!("R{}", n % 6 + 1)),
                level: Some((n % 4 + 1).to_string()),
                slot: Some(format!("E{:02}", n % 12 + 1)),
                comment: (n % 9 == 0).then(|| "Stock à vérifier".to_string()),
            });
        }
        backend
    }
}

fn issue_session(user_id: Uuid) -> Session {
    Session {
        access_token: Uuid::new_v4().to_string(),
        refresh_token: Some(Uuid::new_v4().to_string()),
        user_id,
        expires_at: Some(Utc::now() + Duration::hours(1)),
    }
}

fn invalid_credentials() -> BackendError {
    BackendError::Api {
        status: 400,
        message: "Invalid login credentials".to_string(),
    }
}

impl Backend for MemoryBackend {
    async fn get_session(&self) -> BackendResult<Option<Session>> {
        let inner = self.enter(Operation::GetSession)?;
        Ok(inner.session.clone())
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> BackendResult<Session> {
        let mut inner = self.enter(Operation::SignInPassword)?;
        let user_id = inner
            .users
            .iter()
            .find(|u| {
                email_from_cp(&u.record.numero_cp, &self.email_domain) == email
                    && u.password == password
            })
            .map(|u| u.record.id)
            .ok_or_else(invalid_credentials)?;

        let session = issue_session(user_id);
        inner.session = Some(session.clone());
        Ok(session)
    }

    async fn sign_in_with_pin(&self, numero_cp: &str, pin: &str) -> BackendResult<Session> {
        let mut inner = self.enter(Operation::SignInPin)?;
        let user_id = inner
            .users
            .iter()
            .find(|u| u.record.numero_cp == numero_cp && u.pin.as_deref() == Some(pin))
            .map(|u| u.record.id)
            .ok_or_else(invalid_credentials)?;

        let session = issue_session(user_id);
        inner.session = Some(session.clone());
        Ok(session)
    }

    async fn sign_out(&self) -> BackendResult<()> {
        let mut inner = self.enter(Operation::SignOut)?;
        inner.session = None;
        Ok(())
    }

    async fn fetch_user(&self, id: Uuid) -> BackendResult<Option<UserRecord>> {
        let inner = self.enter(Operation::FetchUser)?;
        Ok(inner
            .users
            .iter()
            .find(|u| u.record.id == id)
            .map(|u| u.record.clone()))
    }

    async fn pin_on_file(&self, numero_cp: &str) -> BackendResult<bool> {
        let inner = self.enter(Operation::PinOnFile)?;
        Ok(inner
            .users
            .iter()
            .any(|u| u.record.numero_cp == numero_cp && u.pin.is_some()))
    }

    async fn stamp_login(&self, id: Uuid, at: DateTime<Utc>) -> BackendResult<()> {
        let mut inner = self.enter(Operation::StampLogin)?;
        if let Some(user) = inner.users.iter_mut().find(|u| u.record.id == id) {
            user.record.last_login = Some(at);
            user.record.failed_attempts = 0;
        }
        Ok(())
    }

    async fn set_pin(&self, id: Uuid, pin: &str) -> BackendResult<()> {
        let mut inner = self.enter(Operation::SetPin)?;
        let user = inner
            .users
            .iter_mut()
            .find(|u| u.record.id == id)
            .ok_or(BackendError::NotFound)?;
        user.pin = Some(pin.to_string());
        user.record.has_pin = true;
        Ok(())
    }

    async fn list_users(&self) -> BackendResult<Vec<UserRecord>> {
        let inner = self.enter(Operation::ListUsers)?;
        let mut users: Vec<UserRecord> = inner.users.iter().map(|u| u.record.clone()).collect();
        users.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(users)
    }

    async fn update_profile(&self, id: Uuid, profile: Profile) -> BackendResult<()> {
        let mut inner = self.enter(Operation::UpdateProfile)?;
        if let Some(user) = inner.users.iter_mut().find(|u| u.record.id == id) {
            user.record.profile = profile;
        }
        Ok(())
    }

    async fn list_articles(&self) -> BackendResult<Vec<ArticleRow>> {
        let inner = self.enter(Operation::ListArticles)?;
        let mut rows = inner.articles.clone();
        rows.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        Ok(rows)
    }

    async fn insert_article(&self, draft: &ArticleDraft) -> BackendResult<ArticleRow> {
        let mut inner = self.enter(Operation::InsertArticle)?;
        if inner
            .articles
            .iter()
            .any(|a| a.symbol.as_deref() == Some(draft.symbol.as_str()))
        {
            return Err(BackendError::Api {
                status: 409,
                message: "duplicate key value violates unique constraint \"articles_symbole_key\"".to_string(),
            });
        }

        let id = inner.next_article_id;
        inner.next_article_id += 1;
        let row = ArticleRow::from_draft(id, draft);
        inner.articles.push(row.clone());
        Ok(row)
    }

    async fn update_article(&self, id: i64, draft: &ArticleDraft) -> BackendResult<()> {
        let mut inner = self.enter(Operation::UpdateArticle)?;
        if inner
            .articles
            .iter()
            .any(|a| a.id != id && a.symbol.as_deref() == Some(draft.symbol.as_str()))
        {
            return Err(BackendError::Api {
                status: 409,
                message: "duplicate key value violates unique constraint \"articles_symbole_key\"".to_string(),
            });
        }
        if let Some(row) = inner.articles.iter_mut().find(|a| a.id == id) {
            *row = ArticleRow::from_draft(id, draft);
        }
        Ok(())
    }

    async fn delete_article(&self, id: i64) -> BackendResult<()> {
        let mut inner = self.enter(Operation::DeleteArticle)?;
        inner.articles.retain(|a| a.id != id);
        Ok(())
    }
}
