//! Remote backend capability: authentication plus the `articles` and
//! `utilisateurs` tables.
//!
//! The controller is generic over [`Backend`], so the hosted implementation
//! ([`supabase::SupabaseBackend`]) and the in-memory one used by tests and
//! demo mode ([`memory::MemoryBackend`]) are interchangeable.
//!
//! The wire rows below mirror the backend's French column names and are
//! converted into the domain types of `inventaire-shared` at this boundary.

pub mod memory;
pub mod supabase;

use std::future::Future;

use chrono::{DateTime, NaiveDateTime, Utc};
use inventaire_shared::constants::DESIGNATION_PLACEHOLDER;
use inventaire_shared::{Article, ArticleDraft, Profile, Session, Status, UserRecord};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::BackendError;

pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Async interface to the hosted backend.
pub trait Backend {
    /// Session left over from a previous run, refreshed if needed.
    fn get_session(&self) -> impl Future<Output = BackendResult<Option<Session>>>;

    fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = BackendResult<Session>>;

    /// Exchange a CP number and PIN for a session. Any mismatch is a
    /// rejection without detail.
    fn sign_in_with_pin(
        &self,
        numero_cp: &str,
        pin: &str,
    ) -> impl Future<Output = BackendResult<Session>>;

    fn sign_out(&self) -> impl Future<Output = BackendResult<()>>;

    fn fetch_user(&self, id: Uuid) -> impl Future<Output = BackendResult<Option<UserRecord>>>;

    /// Whether the user with this CP number has a PIN on file.
    fn pin_on_file(&self, numero_cp: &str) -> impl Future<Output = BackendResult<bool>>;

    /// Record a successful login and reset the failed-attempt counter.
    fn stamp_login(&self, id: Uuid, at: DateTime<Utc>) -> impl Future<Output = BackendResult<()>>;

    fn set_pin(&self, id: Uuid, pin: &str) -> impl Future<Output = BackendResult<()>>;

    /// Every user, ordered by name.
    fn list_users(&self) -> impl Future<Output = BackendResult<Vec<UserRecord>>>;

    fn update_profile(&self, id: Uuid, profile: Profile) -> impl Future<Output = BackendResult<()>>;

    /// Every article, ordered by symbol.
    fn list_articles(&self) -> impl Future<Output = BackendResult<Vec<ArticleRow>>>;

    /// Insert and return the stored row with its new id.
    fn insert_article(&self, draft: &ArticleDraft) -> impl Future<Output = BackendResult<ArticleRow>>;

    fn update_article(&self, id: i64, draft: &ArticleDraft) -> impl Future<Output = BackendResult<()>>;

    fn delete_article(&self, id: i64) -> impl Future<Output = BackendResult<()>>;
}

// ---------------------------------------------------------------------------
// Wire rows
// ---------------------------------------------------------------------------

/// Row of the `articles` table as returned by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArticleRow {
    pub id: i64,
    #[serde(rename = "symbole", default, deserialize_with = "text_or_number")]
    pub symbol: Option<String>,
    #[serde(default)]
    pub designation: Option<String>,
    #[serde(rename = "nature_depot", default)]
    pub deposit_nature: Option<String>,
    #[serde(rename = "localisation", default)]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "text_or_number")]
    pub rack: Option<String>,
    #[serde(rename = "niveau", default, deserialize_with = "text_or_number")]
    pub level: Option<String>,
    #[serde(rename = "emplacement", default, deserialize_with = "text_or_number")]
    pub slot: Option<String>,
    #[serde(rename = "commentaire", default)]
    pub comment: Option<String>,
}

impl ArticleRow {
    pub fn from_draft(id: i64, draft: &ArticleDraft) -> Self {
        Self {
            id,
            symbol: Some(draft.symbol.clone()),
            designation: Some(draft.designation.clone()),
            deposit_nature: draft.deposit_nature.clone(),
            location: Some(draft.location.clone()),
            rack: draft.rack.clone(),
            level: draft.level.clone(),
            slot: draft.slot.clone(),
            comment: draft.comment.clone(),
        }
    }

    /// Normalize into a catalog entry: missing text becomes empty and a
    /// missing designation gets the placeholder.
    pub fn into_article(self) -> Article {
        let designation = self
            .designation
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| DESIGNATION_PLACEHOLDER.to_string());

        Article {
            id: self.id,
            symbol: self.symbol.unwrap_or_default(),
            designation,
            deposit_nature: self.deposit_nature.unwrap_or_default(),
            location: self.location.unwrap_or_default(),
            rack: self.rack.unwrap_or_default(),
            level: self.level.unwrap_or_default(),
            slot: self.slot.unwrap_or_default(),
            comment: self.comment.unwrap_or_default(),
        }
    }
}

/// Insert/update body for the `articles` table. `None` clears a column.
#[derive(Debug, Serialize)]
pub struct ArticlePayload<'a> {
    pub symbole: &'a str,
    pub designation: &'a str,
    pub nature_depot: Option<&'a str>,
    pub localisation: &'a str,
    pub rack: Option<&'a str>,
    pub niveau: Option<&'a str>,
    pub emplacement: Option<&'a str>,
    pub commentaire: Option<&'a str>,
}

impl<'a> From<&'a ArticleDraft> for ArticlePayload<'a> {
    fn from(draft: &'a ArticleDraft) -> Self {
        Self {
            symbole: &draft.symbol,
            designation: &draft.designation,
            nature_depot: draft.deposit_nature.as_deref(),
            localisation: &draft.location,
            rack: draft.rack.as_deref(),
            niveau: draft.level.as_deref(),
            emplacement: draft.slot.as_deref(),
            commentaire: draft.comment.as_deref(),
        }
    }
}

/// Row of the `utilisateurs` table.
#[derive(Debug, Clone, Deserialize)]
pub struct UserRow {
    pub id: Uuid,
    pub numero_cp: String,
    #[serde(default)]
    pub nom: Option<String>,
    pub profil: Profile,
    pub statut: Status,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub derniere_connexion: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tentatives_echouees: Option<i64>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    /// Only ever checked for presence.
    #[serde(default)]
    pub code_pin: Option<String>,
}

impl From<UserRow> for UserRecord {
    fn from(row: UserRow) -> Self {
        UserRecord {
            id: row.id,
            numero_cp: row.numero_cp,
            name: row.nom.unwrap_or_default(),
            profile: row.profil,
            status: row.statut,
            last_login: row.derniere_connexion,
            failed_attempts: row
                .tentatives_echouees
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(0),
            created_at: row.created_at,
            has_pin: row.code_pin.is_some_and(|p| !p.is_empty()),
        }
    }
}

/// Accept a JSON string or number for code-like columns.
fn text_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

/// RFC 3339, or a naive timestamp taken as UTC.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    if let Ok(at) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(Some(at.with_timezone(&Utc)));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M:%S%.f"))
        .map(|naive| Some(naive.and_utc()))
        .map_err(serde::de::Error::custom)
}
