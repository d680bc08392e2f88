use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::DESIGNATION_PLACEHOLDER;
use crate::error::ValidationError;

// ---------------------------------------------------------------------------
// Article
// ---------------------------------------------------------------------------

/// One stock item as held in the in-memory catalog.
///
/// Optional backend columns are normalized to empty strings so the search
/// engine and the export never deal with `None`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Article {
    /// Backend-assigned identifier.
    pub id: i64,
    /// Unique human code, e.g. `0008443`.
    pub symbol: String,
    pub designation: String,
    /// Coarse stocking category (e.g. `BDL`, `SR`), possibly empty.
    pub deposit_nature: String,
    pub location: String,
    pub rack: String,
    pub level: String,
    pub slot: String,
    pub comment: String,
}

/// Validated article fields ready to be written to the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArticleDraft {
    pub symbol: String,
    pub designation: String,
    pub deposit_nature: Option<String>,
    pub location: String,
    pub rack: Option<String>,
    pub level: Option<String>,
    pub slot: Option<String>,
    pub comment: Option<String>,
}

impl ArticleDraft {
    /// Build the catalog entry the backend acknowledged under `id`.
    pub fn into_article(self, id: i64) -> Article {
        Article {
            id,
            symbol: self.symbol,
            designation: self.designation,
            deposit_nature: self.deposit_nature.unwrap_or_default(),
            location: self.location,
            rack: self.rack.unwrap_or_default(),
            level: self.level.unwrap_or_default(),
            slot: self.slot.unwrap_or_default(),
            comment: self.comment.unwrap_or_default(),
        }
    }
}

/// Raw article form input, as typed by the user.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArticleForm {
    pub symbol: String,
    pub designation: String,
    pub deposit_nature: String,
    pub location: String,
    pub rack: String,
    pub level: String,
    pub slot: String,
    pub comment: String,
}

impl ArticleForm {
    /// Pre-fill the form for editing an existing article.
    pub fn from_article(article: &Article) -> Self {
        Self {
            symbol: article.symbol.clone(),
            designation: article.designation.clone(),
            deposit_nature: article.deposit_nature.clone(),
            location: article.location.clone(),
            rack: article.rack.clone(),
            level: article.level.clone(),
            slot: article.slot.clone(),
            comment: article.comment.clone(),
        }
    }

    /// Set a field by its short name. Returns `false` for an unknown field.
    pub fn set(&mut self, field: &str, value: &str) -> bool {
        let slot = match field {
            "symbole" | "symbol" => &mut self.symbol,
            "designation" => &mut self.designation,
            "nature" | "nature_depot" | "deposit_nature" => &mut self.deposit_nature,
            "localisation" | "location" => &mut self.location,
            "rack" => &mut self.rack,
            "niveau" | "level" => &mut self.level,
            "emplacement" | "slot" => &mut self.slot,
            "commentaire" | "comment" => &mut self.comment,
            _ => return false,
        };
        *slot = value.to_string();
        true
    }

    /// Check required fields and default the designation.
    pub fn to_draft(&self) -> Result<ArticleDraft, ValidationError> {
        let symbol = self.symbol.trim();
        let location = self.location.trim();
        if symbol.is_empty() || location.is_empty() {
            return Err(ValidationError::MissingArticleFields);
        }

        let designation = match self.designation.trim() {
            "" => DESIGNATION_PLACEHOLDER.to_string(),
            d => d.to_string(),
        };

        Ok(ArticleDraft {
            symbol: symbol.to_string(),
            designation,
            deposit_nature: non_empty(&self.deposit_nature),
            location: location.to_string(),
            rack: non_empty(&self.rack),
            level: non_empty(&self.level),
            slot: non_empty(&self.slot),
            comment: non_empty(&self.comment),
        })
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

// ---------------------------------------------------------------------------
// Profile / Status
// ---------------------------------------------------------------------------

/// Role of a user. Stored lowercase in the `profil` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Profile {
    Consultant,
    Gestionnaire,
    Administrateur,
}

impl Profile {
    pub fn as_str(&self) -> &'static str {
        match self {
            Profile::Consultant => "consultant",
            Profile::Gestionnaire => "gestionnaire",
            Profile::Administrateur => "administrateur",
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Profile {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "consultant" => Ok(Profile::Consultant),
            "gestionnaire" => Ok(Profile::Gestionnaire),
            "administrateur" => Ok(Profile::Administrateur),
            other => Err(ValidationError::UnknownProfile(other.to_string())),
        }
    }
}

impl TryFrom<String> for Profile {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Profile> for String {
    fn from(p: Profile) -> Self {
        p.as_str().to_string()
    }
}

/// Account status. A blocked account can neither log in nor keep a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Status {
    Actif,
    Bloque,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Actif => "actif",
            Status::Bloque => "bloque",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "actif" => Ok(Status::Actif),
            "bloque" | "bloqué" => Ok(Status::Bloque),
            other => Err(ValidationError::UnknownStatus(other.to_string())),
        }
    }
}

impl TryFrom<String> for Status {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Status> for String {
    fn from(s: Status) -> Self {
        s.as_str().to_string()
    }
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// A row of the user directory. The PIN itself is never kept, only whether
/// one is on file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserRecord {
    /// Backend auth identifier.
    pub id: Uuid,
    /// Business identifier used to log in (upper case).
    pub numero_cp: String,
    pub name: String,
    pub profile: Profile,
    pub status: Status,
    pub last_login: Option<DateTime<Utc>>,
    pub failed_attempts: u32,
    pub created_at: Option<DateTime<Utc>>,
    pub has_pin: bool,
}

impl UserRecord {
    pub fn is_blocked(&self) -> bool {
        self.status == Status::Bloque
    }
}

/// The authenticated actor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: Uuid,
    pub name: String,
    pub profile: Profile,
    pub numero_cp: String,
    pub status: Status,
    pub has_pin: bool,
}

impl CurrentUser {
    pub fn from_record(record: &UserRecord) -> Self {
        Self {
            id: record.id,
            name: record.name.clone(),
            profile: record.profile,
            numero_cp: record.numero_cp.clone(),
            status: record.status,
            has_pin: record.has_pin,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.profile == Profile::Administrateur
    }

    pub fn is_manager(&self) -> bool {
        self.profile == Profile::Gestionnaire
    }

    /// Create, edit and delete articles.
    pub fn can_manage_articles(&self) -> bool {
        self.is_admin() || self.is_manager()
    }

    /// Whether the role control of `row` is interactive for this user.
    /// Never true for the user's own row, whatever the profile.
    pub fn can_edit_role(&self, row: &UserRecord) -> bool {
        self.is_admin() && row.id != self.id
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Credentialed backend session, issued by either login path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub user_id: Uuid,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(profile: Profile) -> UserRecord {
        UserRecord {
            id: Uuid::new_v4(),
            numero_cp: "7408443F".into(),
            name: "Jeanne Martin".into(),
            profile,
            status: Status::Actif,
            last_login: None,
            failed_attempts: 0,
            created_at: None,
            has_pin: true,
        }
    }

    #[test]
    fn test_form_requires_symbol_and_location() {
        let mut form = ArticleForm::default();
        form.symbol = "0008443".into();
        assert_eq!(form.to_draft(), Err(ValidationError::MissingArticleFields));

        form.location = "   ".into();
        assert_eq!(form.to_draft(), Err(ValidationError::MissingArticleFields));

        form.location = "Matelots".into();
        assert!(form.to_draft().is_ok());
    }

    #[test]
    fn test_form_defaults_designation() {
        let form = ArticleForm {
            symbol: "12".into(),
            location: "Plaisir".into(),
            rack: " ".into(),
            ..Default::default()
        };
        let draft = form.to_draft().unwrap();
        assert_eq!(draft.designation, DESIGNATION_PLACEHOLDER);
        assert_eq!(draft.rack, None);

        let article = draft.into_article(7);
        assert_eq!(article.id, 7);
        assert_eq!(article.rack, "");
    }

    #[test]
    fn test_form_set_by_field_name() {
        let mut form = ArticleForm::default();
        assert!(form.set("symbole", "42"));
        assert!(form.set("emplacement", "B3"));
        assert!(!form.set("prix", "10"));
        assert_eq!(form.symbol, "42");
        assert_eq!(form.slot, "B3");
    }

    #[test]
    fn test_profile_parse_case_insensitive() {
        assert_eq!("Administrateur".parse::<Profile>().unwrap(), Profile::Administrateur);
        assert!("root".parse::<Profile>().is_err());

        let json = serde_json::to_string(&Profile::Gestionnaire).unwrap();
        assert_eq!(json, "\"gestionnaire\"");
        let back: Profile = serde_json::from_str("\"CONSULTANT\"").unwrap();
        assert_eq!(back, Profile::Consultant);
    }

    #[test]
    fn test_status_serde() {
        let s: Status = serde_json::from_str("\"bloque\"").unwrap();
        assert_eq!(s, Status::Bloque);
        assert!(serde_json::from_str::<Status>("\"gone\"").is_err());
    }

    #[test]
    fn test_permissions() {
        let admin = CurrentUser::from_record(&user(Profile::Administrateur));
        let manager = CurrentUser::from_record(&user(Profile::Gestionnaire));
        let viewer = CurrentUser::from_record(&user(Profile::Consultant));

        assert!(admin.can_manage_articles());
        assert!(manager.can_manage_articles());
        assert!(!viewer.can_manage_articles());
        assert!(!manager.is_admin());
    }

    #[test]
    fn test_own_role_is_never_editable() {
        let own = user(Profile::Administrateur);
        let other = user(Profile::Consultant);
        let admin = CurrentUser::from_record(&own);

        assert!(!admin.can_edit_role(&own));
        assert!(admin.can_edit_role(&other));

        let manager = CurrentUser::from_record(&user(Profile::Gestionnaire));
        assert!(!manager.can_edit_role(&other));
    }

    #[test]
    fn test_session_expiry() {
        let now = Utc::now();
        let mut session = Session {
            access_token: "t".into(),
            refresh_token: None,
            user_id: Uuid::new_v4(),
            expires_at: None,
        };
        assert!(!session.is_expired(now));
        session.expires_at = Some(now - chrono::Duration::seconds(1));
        assert!(session.is_expired(now));
    }
}
