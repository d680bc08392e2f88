use thiserror::Error;

/// Input rejected before any backend call.
///
/// The `Display` text of each variant is the message shown to the user.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Veuillez saisir votre numéro de CP et votre mot de passe")]
    MissingCredentials,

    #[error("Veuillez saisir votre numéro de CP")]
    MissingIdentifier,

    #[error("Veuillez saisir votre code PIN")]
    MissingPin,

    #[error("Le code PIN doit contenir au moins 4 chiffres")]
    PinTooShort,

    #[error("Le nouveau code PIN doit contenir au moins 4 chiffres")]
    NewPinTooShort,

    #[error("Les codes PIN ne correspondent pas")]
    PinMismatch,

    #[error("Les nouveaux codes PIN ne correspondent pas")]
    NewPinMismatch,

    #[error("Le code PIN ne doit contenir que des chiffres")]
    PinNotNumeric,

    #[error("Veuillez remplir tous les champs obligatoires (Symbole et Localisation)")]
    MissingArticleFields,

    #[error("Profil inconnu: {0}")]
    UnknownProfile(String),

    #[error("Statut inconnu: {0}")]
    UnknownStatus(String),
}
