//! Login screen: identifier entry, login-mode choice, both login paths and
//! PIN management.

use inventaire_shared::identity::{email_from_cp, normalize_cp};
use inventaire_shared::pin::{validate_login_pin, validate_new_pin, PinChange};
use inventaire_shared::ValidationError;
use tracing::{debug, error, info, warn};

use super::App;
use crate::backend::Backend;
use crate::error::ClientError;
use crate::state::{BootOutcome, LoginMode, View};

impl<B: Backend> App<B> {
    /// Pre-fill the identifier saved by "remember me".
    pub(super) async fn restore_identifier(&mut self) {
        let remembered = self.store().remembered_cp();
        match remembered {
            Ok(Some(cp)) => {
                debug!(numero_cp = %cp, "Restoring remembered identifier");
                self.state.login.remember = true;
                self.set_identifier(&cp).await;
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Could not read remembered identifier"),
        }
    }

    /// Update the typed identifier and pick the default login mode from
    /// whether a PIN is on file. Lookup failures fall back to password mode.
    pub async fn set_identifier(&mut self, raw: &str) {
        self.state.login.numero_cp = raw.to_string();

        let cp = normalize_cp(raw);
        let pin_on_file = if cp.is_empty() {
            false
        } else {
            match self.backend.pin_on_file(&cp).await {
                Ok(found) => found,
                Err(e) => {
                    debug!(numero_cp = %cp, error = %e, "PIN lookup failed");
                    false
                }
            }
        };

        self.state.login.pin_on_file = pin_on_file;
        self.state.login.mode = if pin_on_file {
            LoginMode::Pin
        } else {
            LoginMode::Password
        };
    }

    pub fn set_remember(&mut self, remember: bool) {
        self.state.login.remember = remember;
    }

    /// Switch login mode. PIN mode is only available when a PIN is on file.
    pub fn set_login_mode(&mut self, mode: LoginMode) -> LoginMode {
        if mode == LoginMode::Password || self.state.login.pin_on_file {
            self.state.login.mode = mode;
        }
        self.state.login.mode
    }

    fn persist_identifier(&self, cp: &str) {
        let db = self.store();
        let result = if self.state.login.remember {
            db.set_remembered_cp(cp)
        } else {
            db.clear_remembered_cp()
        };
        if let Err(e) = result {
            warn!(error = %e, "Could not save remembered identifier");
        }
    }

    /// Turn an admission outcome into the operation result, loading data
    /// when the user reached the dashboard.
    async fn finish_login(&mut self, outcome: BootOutcome) -> Result<BootOutcome, ClientError> {
        match outcome {
            BootOutcome::Dashboard => {
                // Admission stands; the load failure was already notified.
                if let Err(e) = self.load_data().await {
                    warn!(error = %e, "Logged in without a catalog");
                }
                Ok(outcome)
            }
            BootOutcome::SetupPin => Ok(outcome),
            BootOutcome::Blocked => Err(ClientError::AccountBlocked),
            BootOutcome::Login | BootOutcome::Reauthenticate => Err(ClientError::NotAuthenticated),
        }
    }

    pub async fn login_with_password(&mut self, password: &str) -> Result<BootOutcome, ClientError> {
        let cp = normalize_cp(&self.state.login.numero_cp);
        if cp.is_empty() || password.is_empty() {
            return Err(self.fail(ValidationError::MissingCredentials.into()));
        }

        self.begin();
        let email = email_from_cp(&cp, &self.config.email_domain);
        let session = match self.backend.sign_in_with_password(&email, password).await {
            Ok(session) => session,
            Err(e) if e.is_invalid_credentials() => {
                self.end();
                info!(numero_cp = %cp, "Password login refused");
                return Err(self.fail(ClientError::InvalidCredentials));
            }
            Err(e) => {
                self.end();
                error!(numero_cp = %cp, error = %e, "Password login failed");
                self.notifier
                    .error(format!("Erreur de connexion: {}", e.friendly()));
                return Err(e.into());
            }
        };

        self.persist_identifier(&cp);
        let outcome = self.admit(session.user_id).await;
        self.end();
        self.finish_login(outcome).await
    }

    /// Quick login. The backend exchanges the PIN for a real session; a
    /// mismatch never says which part was wrong.
    pub async fn login_with_pin(&mut self, pin: &str) -> Result<BootOutcome, ClientError> {
        let cp = normalize_cp(&self.state.login.numero_cp);
        if let Err(e) = validate_login_pin(&cp, pin) {
            return Err(self.fail(e.into()));
        }

        self.begin();
        let session = match self.backend.sign_in_with_pin(&cp, pin).await {
            Ok(session) => session,
            Err(e) if e.is_rejection() => {
                self.end();
                info!(numero_cp = %cp, "PIN login refused");
                return Err(self.fail(ClientError::InvalidPin));
            }
            Err(e) => {
                self.end();
                error!(numero_cp = %cp, error = %e, "PIN login failed");
                self.notifier.error("Erreur lors de la connexion");
                return Err(e.into());
            }
        };

        let outcome = self.admit(session.user_id).await;
        if matches!(outcome, BootOutcome::Dashboard | BootOutcome::SetupPin) {
            self.persist_identifier(&cp);
        }
        self.end();
        self.finish_login(outcome).await
    }

    /// First PIN of a user stopped at the setup screen. Completes the login.
    pub async fn setup_pin(&mut self, pin: &str, confirm: &str) -> Result<(), ClientError> {
        let Some(user) = self.state.current_user.clone() else {
            return Err(self.fail(ClientError::NotAuthenticated));
        };
        if let Err(e) = validate_new_pin(pin, confirm, PinChange::Setup) {
            return Err(self.fail(e.into()));
        }

        self.begin();
        let result = self.backend.set_pin(user.id, pin).await;
        self.end();
        if let Err(e) = result {
            error!(numero_cp = %user.numero_cp, error = %e, "PIN setup failed");
            self.notifier
                .error(format!("Erreur lors de la création du PIN: {}", e.friendly()));
            return Err(e.into());
        }

        info!(numero_cp = %user.numero_cp, "PIN created");
        if let Some(current) = self.state.current_user.as_mut() {
            current.has_pin = true;
        }
        self.state.logged_in = true;
        self.state.view = View::Dashboard;
        self.notifier.success("Code PIN créé avec succès!");
        if let Err(e) = self.load_data().await {
            warn!(error = %e, "PIN created but catalog load failed");
        }
        Ok(())
    }

    /// Replace the PIN of the signed-in user.
    pub async fn change_pin(&mut self, pin: &str, confirm: &str) -> Result<(), ClientError> {
        let user = self.signed_in()?;
        if let Err(e) = validate_new_pin(pin, confirm, PinChange::Update) {
            return Err(self.fail(e.into()));
        }

        self.begin();
        let result = self.backend.set_pin(user.id, pin).await;
        self.end();
        if let Err(e) = result {
            error!(numero_cp = %user.numero_cp, error = %e, "PIN change failed");
            self.notifier
                .error(format!("Erreur lors de la modification du PIN: {}", e.friendly()));
            return Err(e.into());
        }

        info!(numero_cp = %user.numero_cp, "PIN changed");
        if let Some(current) = self.state.current_user.as_mut() {
            current.has_pin = true;
        }
        self.notifier.success("Code PIN modifié avec succès!");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::Operation;
    use crate::commands::testing::{fixture, login};

    #[tokio::test]
    async fn test_identifier_selects_pin_mode() {
        let mut f = fixture();
        f.app.set_identifier(" 7408443f ").await;
        assert!(f.app.state().login.pin_on_file);
        assert_eq!(f.app.state().login.mode, LoginMode::Pin);

        f.app.set_identifier("2222222N").await;
        assert!(!f.app.state().login.pin_on_file);
        assert_eq!(f.app.state().login.mode, LoginMode::Password);
        assert_eq!(f.app.set_login_mode(LoginMode::Pin), LoginMode::Password);
    }

    #[tokio::test]
    async fn test_pin_lookup_failure_falls_back_silently() {
        let mut f = fixture();
        f.backend.fail(Operation::PinOnFile);
        f.app.set_identifier("7408443F").await;
        assert_eq!(f.app.state().login.mode, LoginMode::Password);
        assert!(f.app.notifier().last().is_none());
    }

    #[tokio::test]
    async fn test_password_login_reaches_dashboard() {
        let mut f = fixture();
        login(&mut f.app, "7408443f", "admin-pass").await;

        let state = f.app.state();
        assert!(state.logged_in);
        assert_eq!(state.view, View::Dashboard);
        assert_eq!(state.current_user.as_ref().unwrap().id, f.admin);
        assert_eq!(state.articles.len(), 3);
    }

    #[tokio::test]
    async fn test_login_stands_when_catalog_load_fails() {
        let mut f = fixture();
        f.backend.fail(Operation::ListArticles);
        f.app.set_identifier("7408443f").await;
        f.app.set_login_mode(LoginMode::Password);

        let outcome = f.app.login_with_password("admin-pass").await.unwrap();
        assert_eq!(outcome, BootOutcome::Dashboard);
        assert!(f.app.state().logged_in);
        assert_eq!(f.app.state().view, View::Dashboard);
        assert!(f.app.state().articles.is_empty());
        assert!(f.app.notifier().last().unwrap().is_error);
    }

    #[tokio::test]
    async fn test_missing_credentials_never_reach_backend() {
        let mut f = fixture();
        f.app.set_identifier("").await;
        let err = f.app.login_with_password("secret").await.unwrap_err();
        assert!(matches!(err, ClientError::Validation(ValidationError::MissingCredentials)));
        assert!(!f.backend.called(Operation::SignInPassword));
        assert_eq!(
            f.app.notifier().last().unwrap().message,
            "Veuillez saisir votre numéro de CP et votre mot de passe"
        );
    }

    #[tokio::test]
    async fn test_wrong_password_message() {
        let mut f = fixture();
        f.app.set_identifier("7408443F").await;
        let err = f.app.login_with_password("nope").await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidCredentials));
        assert_eq!(
            f.app.notifier().last().unwrap().message,
            "Numéro de CP ou mot de passe incorrect"
        );
        assert!(!f.app.state().busy);
        assert!(f.app.current_user().is_none());
    }

    #[tokio::test]
    async fn test_backend_outage_on_login() {
        let mut f = fixture();
        f.backend.fail(Operation::SignInPassword);
        f.app.set_identifier("7408443F").await;
        let err = f.app.login_with_password("admin-pass").await.unwrap_err();
        assert!(matches!(err, ClientError::Backend(_)));
        assert!(f
            .app
            .notifier()
            .last()
            .unwrap()
            .message
            .starts_with("Erreur de connexion: "));
    }

    #[tokio::test]
    async fn test_blocked_password_login_populates_nothing() {
        let mut f = fixture();
        f.app.set_identifier("1111111B").await;
        let err = f.app.login_with_password("blocked-pass").await.unwrap_err();

        assert!(matches!(err, ClientError::AccountBlocked));
        assert!(f.app.current_user().is_none());
        assert!(!f.app.state().logged_in);
        assert!(f.app.state().articles.is_empty());
        assert!(f.backend.session().is_none());
        assert!(!f.backend.called(Operation::StampLogin));
    }

    #[tokio::test]
    async fn test_blocked_pin_login_populates_nothing() {
        let mut f = fixture();
        f.app.set_identifier("1111111B").await;
        let err = f.app.login_with_pin("1111").await.unwrap_err();

        assert!(matches!(err, ClientError::AccountBlocked));
        assert!(f.app.current_user().is_none());
        assert!(f.backend.session().is_none());
        assert_eq!(
            f.app.notifier().last().unwrap().message,
            "Votre compte est bloqué. Contactez un administrateur."
        );
    }

    #[tokio::test]
    async fn test_pin_login() {
        let mut f = fixture();
        f.app.set_identifier("1234567G").await;
        assert_eq!(f.app.login_with_pin("2468").await.unwrap(), BootOutcome::Dashboard);
        assert!(f.app.state().logged_in);
        assert!(f.backend.session().is_some());
    }

    #[tokio::test]
    async fn test_pin_login_generic_rejection() {
        let mut f = fixture();
        for cp in ["1234567G", "9999999Z"] {
            f.app.set_identifier(cp).await;
            let err = f.app.login_with_pin("0000").await.unwrap_err();
            assert!(matches!(err, ClientError::InvalidPin));
            assert_eq!(f.app.notifier().last().unwrap().message, "Code PIN incorrect");
        }
    }

    #[tokio::test]
    async fn test_pin_login_validation() {
        let mut f = fixture();
        f.app.set_identifier("1234567G").await;
        assert!(f.app.login_with_pin("12").await.is_err());
        assert!(f.app.login_with_pin("12a4").await.is_err());
        assert!(!f.backend.called(Operation::SignInPin));
    }

    #[tokio::test]
    async fn test_setup_pin_completes_login() {
        let mut f = fixture();
        f.app.set_identifier("2222222N").await;
        assert_eq!(
            f.app.login_with_password("new-pass").await.unwrap(),
            BootOutcome::SetupPin
        );
        assert!(!f.app.state().logged_in);
        assert!(!f.backend.called(Operation::ListArticles));

        let err = f.app.setup_pin("1234", "5678").await.unwrap_err();
        assert!(matches!(err, ClientError::Validation(ValidationError::PinMismatch)));
        assert!(f.backend.user(f.newcomer).unwrap().pin.is_none());

        f.app.setup_pin("1234", "1234").await.unwrap();
        assert!(f.app.state().logged_in);
        assert_eq!(f.app.state().view, View::Dashboard);
        assert!(f.app.current_user().unwrap().has_pin);
        assert_eq!(f.backend.user(f.newcomer).unwrap().pin.as_deref(), Some("1234"));
        assert_eq!(f.app.state().articles.len(), 3);
    }

    #[tokio::test]
    async fn test_setup_pin_failure_stays_on_setup() {
        let mut f = fixture();
        f.app.set_identifier("2222222N").await;
        f.app.login_with_password("new-pass").await.unwrap();
        f.backend.fail(Operation::SetPin);

        assert!(f.app.setup_pin("1234", "1234").await.is_err());
        assert_eq!(f.app.state().view, View::SetupPin);
        assert!(!f.app.state().logged_in);
        assert!(f
            .app
            .notifier()
            .last()
            .unwrap()
            .message
            .starts_with("Erreur lors de la création du PIN: "));
    }

    #[tokio::test]
    async fn test_change_pin() {
        let mut f = fixture();
        login(&mut f.app, "7654321C", "viewer-pass").await;

        assert!(f.app.change_pin("12", "12").await.is_err());
        f.app.change_pin("8642", "8642").await.unwrap();
        assert_eq!(f.backend.user(f.viewer).unwrap().pin.as_deref(), Some("8642"));
        assert_eq!(f.app.notifier().last().unwrap().message, "Code PIN modifié avec succès!");
        assert_eq!(f.app.state().view, View::Dashboard);
    }

    #[tokio::test]
    async fn test_remembered_identifier_survives_logout_and_restart() {
        let mut f = fixture();
        f.app.set_identifier("7408443F").await;
        f.app.set_remember(true);
        f.app.login_with_password("admin-pass").await.unwrap();
        f.app.logout().await.unwrap();

        assert_eq!(f.app.state().login.numero_cp, "7408443F");
        assert!(f.app.state().login.remember);

        let mut restarted = crate::commands::App::new(
            f.backend.clone(),
            f.app.store.clone(),
            f.app.config.clone(),
        );
        restarted.bootstrap().await;
        assert_eq!(restarted.state().login.numero_cp, "7408443F");
        assert!(restarted.state().login.remember);
        assert_eq!(restarted.state().login.mode, LoginMode::Pin);
    }

    #[tokio::test]
    async fn test_login_without_remember_forgets_identifier() {
        let mut f = fixture();
        f.app.set_identifier("7408443F").await;
        f.app.set_remember(true);
        f.app.login_with_password("admin-pass").await.unwrap();
        f.app.logout().await.unwrap();

        f.app.set_remember(false);
        f.app.login_with_password("admin-pass").await.unwrap();
        assert_eq!(f.app.store().remembered_cp().unwrap(), None);
    }
}
