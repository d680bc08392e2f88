use inventaire_shared::ValidationError;
use inventaire_store::StoreError;
use thiserror::Error;

/// Failure of a call to the remote backend.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with an error status.
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Record not found")]
    NotFound,

    /// Reading or writing the persisted session failed.
    #[error("Local storage error: {0}")]
    Store(#[from] StoreError),
}

impl BackendError {
    /// Message shown to the operator.
    pub fn friendly(&self) -> String {
        friendly_message(&self.to_string())
    }

    pub fn is_invalid_credentials(&self) -> bool {
        matches!(self, BackendError::Api { message, .. } if message.contains("Invalid login credentials"))
    }

    /// The backend understood the request and refused it.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            BackendError::Api { status: 400..=499, .. } | BackendError::NotFound
        )
    }
}

/// Map well-known backend messages to their French wording.
pub fn friendly_message(raw: &str) -> String {
    const KNOWN: [(&str, &str); 4] = [
        ("Invalid login credentials", "Identifiants incorrects"),
        ("Email not confirmed", "Email non confirmé"),
        ("User not found", "Utilisateur introuvable"),
        ("duplicate key", "Cet élément existe déjà"),
    ];

    if let Some((_, friendly)) = KNOWN.iter().find(|(needle, _)| raw.contains(needle)) {
        return friendly.to_string();
    }
    if raw.trim().is_empty() {
        return "Une erreur est survenue".to_string();
    }
    raw.to_string()
}

/// Errors returned by controller operations.
///
/// The user-facing notification has already been shown when one of these is
/// returned; the value is for callers and tests.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("Vous n'avez pas les droits pour effectuer cette action.")]
    Forbidden,

    #[error("Votre compte est bloqué. Contactez un administrateur.")]
    AccountBlocked,

    #[error("Numéro de CP ou mot de passe incorrect")]
    InvalidCredentials,

    #[error("Code PIN incorrect")]
    InvalidPin,

    #[error("Session invalide. Veuillez vous reconnecter.")]
    NotAuthenticated,

    #[error("Vous ne pouvez pas modifier votre propre profil.")]
    SelfRoleEdit,

    #[error("Aucune modification de profil en attente")]
    NoPendingChange,

    #[error("Aucune suppression en attente")]
    NoPendingDelete,

    #[error("Article introuvable")]
    ArticleNotFound,

    #[error("Utilisateur introuvable")]
    UserNotFound,

    #[error("Export impossible: {0}")]
    Export(String),
}
