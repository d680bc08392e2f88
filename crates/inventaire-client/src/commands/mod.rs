//! Controller operations.
//!
//! [`App`] owns the [`AppState`], the backend and the notifier. Each
//! sub-module adds the operations of one screen or concern. Every operation
//! that reaches the backend shows exactly one notification and leaves the
//! state untouched when the call fails.

pub mod articles;
pub mod auth;
pub mod export;
pub mod search;
pub mod session;
pub mod stats;
pub mod users;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use inventaire_shared::CurrentUser;
use inventaire_store::Database;

use crate::backend::Backend;
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::notify::Notifier;
use crate::state::AppState;

pub struct App<B: Backend> {
    backend: B,
    store: Arc<Mutex<Database>>,
    config: ClientConfig,
    state: AppState,
    notifier: Notifier,
}

impl<B: Backend> App<B> {
    pub fn new(backend: B, store: Arc<Mutex<Database>>, config: ClientConfig) -> Self {
        let notifier = Notifier::new(config.notification_ttl);
        Self {
            backend,
            store,
            config,
            state: AppState::new(),
            notifier,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn current_user(&self) -> Option<&CurrentUser> {
        self.state.current_user.as_ref()
    }

    fn store(&self) -> MutexGuard<'_, Database> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Show `err` as an error notification and hand it back.
    fn fail(&mut self, err: ClientError) -> ClientError {
        self.notifier.error(err.to_string());
        err
    }

    /// The signed-in user, past every login gate.
    fn signed_in(&mut self) -> Result<CurrentUser, ClientError> {
        if self.state.logged_in {
            if let Some(user) = &self.state.current_user {
                return Ok(user.clone());
            }
        }
        Err(self.fail(ClientError::NotAuthenticated))
    }

    fn require_manager(&mut self) -> Result<CurrentUser, ClientError> {
        let user = self.signed_in()?;
        if !user.can_manage_articles() {
            return Err(self.fail(ClientError::Forbidden));
        }
        Ok(user)
    }

    fn require_admin(&mut self) -> Result<CurrentUser, ClientError> {
        let user = self.signed_in()?;
        if !user.is_admin() {
            return Err(self.fail(ClientError::Forbidden));
        }
        Ok(user)
    }

    /// Mark a remote call as in flight until [`App::end`].
    fn begin(&mut self) {
        self.state.busy = true;
    }

    fn end(&mut self) {
        self.state.busy = false;
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::{Arc, Mutex};

    use inventaire_shared::{Profile, Status};
    use inventaire_store::Database;
    use uuid::Uuid;

    use super::App;
    use crate::backend::memory::MemoryBackend;
    use crate::config::ClientConfig;

    pub const DOMAIN: &str = "test.internal";

    pub struct Fixture {
        pub app: App<MemoryBackend>,
        pub backend: MemoryBackend,
        pub admin: Uuid,
        pub manager: Uuid,
        pub viewer: Uuid,
        pub blocked: Uuid,
        pub newcomer: Uuid,
    }

    /// Directory with one user per situation and three articles.
    pub fn fixture() -> Fixture {
        let backend = MemoryBackend::new(DOMAIN);
        let admin = backend.add_user("7408443F", "Alice Admin", Profile::Administrateur, Status::Actif, "admin-pass", Some("1234"));
        let manager = backend.add_user("1234567G", "Bruno Gestion", Profile::Gestionnaire, Status::Actif, "manager-pass", Some("2468"));
        let viewer = backend.add_user("7654321C", "Chloé Consult", Profile::Consultant, Status::Actif, "viewer-pass", Some("1357"));
        let blocked = backend.add_user("1111111B", "Denis Bloqué", Profile::Consultant, Status::Bloque, "blocked-pass", Some("1111"));
        let newcomer = backend.add_user("2222222N", "Emma Nouvelle", Profile::Gestionnaire, Status::Actif, "new-pass", None);

        for (symbol, location, nature) in [
            ("0008443", "Matelots", "BDL"),
            ("0012000", "Plaisir", "SR"),
            ("0020001", "Porte de Buc", "BDL"),
        ] {
            backend.add_article(&inventaire_shared::ArticleDraft {
                symbol: symbol.into(),
                designation: format!("Pièce {symbol}"),
                deposit_nature: Some(nature.into()),
                location: location.into(),
                rack: None,
                level: None,
                slot: None,
                comment: None,
            });
        }

        Fixture {
            app: app_with(backend.clone()),
            backend,
            admin,
            manager,
            viewer,
            blocked,
            newcomer,
        }
    }

    pub fn app_with(backend: MemoryBackend) -> App<MemoryBackend> {
        let store = Arc::new(Mutex::new(Database::open_in_memory().unwrap()));
        let config = ClientConfig {
            email_domain: DOMAIN.into(),
            ..ClientConfig::default()
        };
        App::new(backend, store, config)
    }

    /// Log in through the password path.
    pub async fn login(app: &mut App<MemoryBackend>, cp: &str, password: &str) {
        app.set_identifier(cp).await;
        app.login_with_password(password).await.unwrap();
    }
}
