//! [`Backend`] over a Supabase-compatible HTTP API.
//!
//! Authentication goes through the GoTrue endpoints under `/auth/v1`, table
//! access through PostgREST under `/rest/v1`. The session is kept in memory
//! and mirrored in the local store so the next start can resume it.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, TimeZone, Utc};
use inventaire_shared::constants::{TABLE_ARTICLES, TABLE_USERS};
use inventaire_shared::{ArticleDraft, Profile, Session, UserRecord};
use inventaire_store::Database;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{ArticlePayload, ArticleRow, Backend, BackendResult, UserRow};
use crate::config::ClientConfig;
use crate::error::BackendError;

/// Body of a successful token grant.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    /// Unix seconds.
    #[serde(default)]
    expires_at: Option<i64>,
    user: AuthUser,
}

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: Uuid,
}

/// The error shapes GoTrue and PostgREST use.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
    error: Option<String>,
}

fn session_from_token(token: TokenResponse, now: DateTime<Utc>) -> Session {
    let expires_at = token
        .expires_at
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
        .or_else(|| token.expires_in.map(|secs| now + Duration::seconds(secs)));

    Session {
        access_token: token.access_token,
        refresh_token: token.refresh_token,
        user_id: token.user.id,
        expires_at,
    }
}

fn api_error(status: u16, body: &str) -> BackendError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = parsed
        .error_description
        .or(parsed.msg)
        .or(parsed.message)
        .or(parsed.error)
        .unwrap_or_else(|| body.trim().to_string());
    BackendError::Api { status, message }
}

pub struct SupabaseBackend {
    http: Client,
    base_url: String,
    anon_key: String,
    pin_exchange_path: String,
    store: Arc<Mutex<Database>>,
    session: Mutex<Option<Session>>,
}

impl SupabaseBackend {
    /// Build the backend and pick up any session persisted by a previous run.
    pub fn new(config: &ClientConfig, store: Arc<Mutex<Database>>) -> BackendResult<Self> {
        let persisted = store
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .load_session()?;

        let http = Client::builder()
            .user_agent(concat!("inventaire/", env!("CARGO_PKG_VERSION")))
            .build()?;

        info!(url = %config.supabase_url, resumed = persisted.is_some(), "Hosted backend configured");

        Ok(Self {
            http,
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            anon_key: config.supabase_anon_key.clone(),
            pin_exchange_path: config.pin_exchange_path.clone(),
            store,
            session: Mutex::new(persisted),
        })
    }

    fn cached_session(&self) -> Option<Session> {
        self.session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the session in memory and in the local store.
    fn remember_session(&self, session: Option<Session>) {
        let db = self.store.lock().unwrap_or_else(PoisonError::into_inner);
        let persisted = match &session {
            Some(s) => db.save_session(s),
            None => db.clear_session(),
        };
        if let Err(e) = persisted {
            warn!(error = %e, "Could not persist backend session");
        }
        drop(db);

        *self.session.lock().unwrap_or_else(PoisonError::into_inner) = session;
    }

    /// Request carrying `token`, or the anon key when there is none.
    fn request(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.base_url, path))
            .header("apikey", &self.anon_key)
            .bearer_auth(token.unwrap_or(&self.anon_key))
    }

    /// The cached session, refreshed first once it has expired. A refused
    /// refresh drops it.
    async fn live_session(&self) -> BackendResult<Option<Session>> {
        let Some(session) = self.cached_session() else {
            return Ok(None);
        };
        if !session.is_expired(Utc::now()) {
            return Ok(Some(session));
        }

        let Some(refresh_token) = session.refresh_token.as_deref() else {
            self.remember_session(None);
            return Ok(None);
        };

        debug!("Refreshing expired session");
        match self.refresh(refresh_token).await {
            Ok(fresh) => Ok(Some(fresh)),
            Err(e) if e.is_rejection() => {
                warn!(error = %e, "Session refresh rejected");
                self.remember_session(None);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn table(&self, method: Method, table: &str) -> BackendResult<RequestBuilder> {
        let token = self.live_session().await?.map(|s| s.access_token);
        Ok(self.request(method, &format!("/rest/v1/{table}"), token.as_deref()))
    }

    async fn send(builder: RequestBuilder) -> BackendResult<Response> {
        let resp = builder.send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(api_error(status.as_u16(), &body))
    }

    async fn decode<T: DeserializeOwned>(resp: Response) -> BackendResult<T> {
        let bytes = resp.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| BackendError::Decode(e.to_string()))
    }

    async fn grant(&self, builder: RequestBuilder) -> BackendResult<Session> {
        let resp = Self::send(builder).await?;
        let token: TokenResponse = Self::decode(resp).await?;
        let session = session_from_token(token, Utc::now());
        self.remember_session(Some(session.clone()));
        Ok(session)
    }

    async fn refresh(&self, refresh_token: &str) -> BackendResult<Session> {
        let builder = self
            .request(Method::POST, "/auth/v1/token", None)
            .query(&[("grant_type", "refresh_token")])
            .json(&json!({ "refresh_token": refresh_token }));
        self.grant(builder).await
    }

    async fn patch_user(&self, id: Uuid, body: Value) -> BackendResult<()> {
        let builder = self
            .table(Method::PATCH, TABLE_USERS)
            .await?
            .query(&[("id", format!("eq.{id}"))])
            .json(&body);
        Self::send(builder).await?;
        Ok(())
    }
}

impl Backend for SupabaseBackend {
    async fn get_session(&self) -> BackendResult<Option<Session>> {
        self.live_session().await
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> BackendResult<Session> {
        let builder = self
            .request(Method::POST, "/auth/v1/token", None)
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }));
        self.grant(builder).await
    }

    async fn sign_in_with_pin(&self, numero_cp: &str, pin: &str) -> BackendResult<Session> {
        let builder = self
            .request(Method::POST, &self.pin_exchange_path, None)
            .json(&json!({ "numero_cp": numero_cp, "code_pin": pin }));
        self.grant(builder).await
    }

    /// The local session is dropped whatever the backend answers.
    async fn sign_out(&self) -> BackendResult<()> {
        let Some(session) = self.cached_session() else {
            return Ok(());
        };
        self.remember_session(None);

        let builder = self.request(Method::POST, "/auth/v1/logout", Some(&session.access_token));
        match Self::send(builder).await {
            Ok(_) => Ok(()),
            // The token is already unusable.
            Err(BackendError::Api { status: 401 | 403 | 404, .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn fetch_user(&self, id: Uuid) -> BackendResult<Option<UserRecord>> {
        let builder = self
            .table(Method::GET, TABLE_USERS)
            .await?
            .query(&[("select", "*")])
            .query(&[("id", format!("eq.{id}"))]);
        let rows: Vec<UserRow> = Self::decode(Self::send(builder).await?).await?;
        Ok(rows.into_iter().next().map(UserRecord::from))
    }

    async fn pin_on_file(&self, numero_cp: &str) -> BackendResult<bool> {
        let builder = self
            .table(Method::GET, TABLE_USERS)
            .await?
            .query(&[("select", "id"), ("code_pin", "not.is.null")])
            .query(&[("numero_cp", format!("eq.{numero_cp}"))]);
        let rows: Vec<Value> = Self::decode(Self::send(builder).await?).await?;
        Ok(!rows.is_empty())
    }

    async fn stamp_login(&self, id: Uuid, at: DateTime<Utc>) -> BackendResult<()> {
        self.patch_user(
            id,
            json!({ "derniere_connexion": at.to_rfc3339(), "tentatives_echouees": 0 }),
        )
        .await
    }

    async fn set_pin(&self, id: Uuid, pin: &str) -> BackendResult<()> {
        self.patch_user(id, json!({ "code_pin": pin })).await
    }

    async fn list_users(&self) -> BackendResult<Vec<UserRecord>> {
        let builder = self
            .table(Method::GET, TABLE_USERS)
            .await?
            .query(&[("select", "*"), ("order", "nom.asc")]);
        let rows: Vec<UserRow> = Self::decode(Self::send(builder).await?).await?;
        Ok(rows.into_iter().map(UserRecord::from).collect())
    }

    async fn update_profile(&self, id: Uuid, profile: Profile) -> BackendResult<()> {
        self.patch_user(id, json!({ "profil": profile.as_str() })).await
    }

    async fn list_articles(&self) -> BackendResult<Vec<ArticleRow>> {
        let builder = self
            .table(Method::GET, TABLE_ARTICLES)
            .await?
            .query(&[("select", "*"), ("order", "symbole.asc")]);
        Self::decode(Self::send(builder).await?).await
    }

    async fn insert_article(&self, draft: &ArticleDraft) -> BackendResult<ArticleRow> {
        let builder = self
            .table(Method::POST, TABLE_ARTICLES)
            .await?
            .header("Prefer", "return=representation")
            .json(&[ArticlePayload::from(draft)]);
        let rows: Vec<ArticleRow> = Self::decode(Self::send(builder).await?).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| BackendError::Decode("insert returned no row".to_string()))
    }

    async fn update_article(&self, id: i64, draft: &ArticleDraft) -> BackendResult<()> {
        let builder = self
            .table(Method::PATCH, TABLE_ARTICLES)
            .await?
            .query(&[("id", format!("eq.{id}"))])
            .json(&ArticlePayload::from(draft));
        Self::send(builder).await?;
        Ok(())
    }

    async fn delete_article(&self, id: i64) -> BackendResult<()> {
        let builder = self
            .table(Method::DELETE, TABLE_ARTICLES)
            .await?
            .query(&[("id", format!("eq.{id}"))]);
        Self::send(builder).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> SupabaseBackend {
        let config = ClientConfig {
            supabase_url: "https://abc.supabase.co/".into(),
            supabase_anon_key: "anon".into(),
            ..ClientConfig::default()
        };
        let store = Arc::new(Mutex::new(Database::open_in_memory().unwrap()));
        SupabaseBackend::new(&config, store).unwrap()
    }

    #[test]
    fn test_session_from_token_prefers_expires_at() {
        let id = Uuid::new_v4();
        let token: TokenResponse = serde_json::from_value(json!({
            "access_token": "a",
            "refresh_token": "r",
            "expires_in": 3600,
            "expires_at": 1_700_000_000,
            "user": { "id": id }
        }))
        .unwrap();

        let session = session_from_token(token, Utc::now());
        assert_eq!(session.user_id, id);
        assert_eq!(session.expires_at.unwrap().timestamp(), 1_700_000_000);
        assert_eq!(session.refresh_token.as_deref(), Some("r"));
    }

    #[test]
    fn test_session_from_token_expires_in() {
        let now = Utc::now();
        let token: TokenResponse = serde_json::from_value(json!({
            "access_token": "a",
            "expires_in": 60,
            "user": { "id": Uuid::new_v4() }
        }))
        .unwrap();

        let session = session_from_token(token, now);
        assert_eq!(session.expires_at, Some(now + Duration::seconds(60)));
    }

    #[test]
    fn test_api_error_shapes() {
        let err = api_error(400, r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#);
        assert!(err.is_invalid_credentials());

        let err = api_error(400, r#"{"code":400,"msg":"Invalid login credentials"}"#);
        assert!(err.is_invalid_credentials());

        let err = api_error(409, r#"{"code":"23505","message":"duplicate key value violates unique constraint"}"#);
        assert_eq!(err.friendly(), "Cet élément existe déjà");

        let err = api_error(502, "Bad Gateway");
        assert_eq!(err.to_string(), "Bad Gateway");
    }

    #[test]
    fn test_session_persisted_across_instances() {
        let config = ClientConfig {
            supabase_url: "https://abc.supabase.co".into(),
            ..ClientConfig::default()
        };
        let store = Arc::new(Mutex::new(Database::open_in_memory().unwrap()));
        let first = SupabaseBackend::new(&config, store.clone()).unwrap();
        assert!(first.cached_session().is_none());

        let session = Session {
            access_token: "a".into(),
            refresh_token: None,
            user_id: Uuid::new_v4(),
            expires_at: None,
        };
        first.remember_session(Some(session.clone()));

        let second = SupabaseBackend::new(&config, store).unwrap();
        assert_eq!(second.cached_session(), Some(session));
    }

    #[tokio::test]
    async fn test_expired_session_without_refresh_token_is_dropped() {
        let backend = backend();
        backend.remember_session(Some(Session {
            access_token: "a".into(),
            refresh_token: None,
            user_id: Uuid::new_v4(),
            expires_at: Some(Utc::now() - Duration::minutes(1)),
        }));

        assert_eq!(backend.get_session().await.unwrap(), None);
        assert!(backend.cached_session().is_none());
    }

    #[tokio::test]
    async fn test_sign_out_without_session_is_local() {
        let backend = backend();
        assert!(backend.sign_out().await.is_ok());
    }

    /// Minimal stand-in for the hosted API on a loopback port. Records
    /// `METHOD path | authorization` for every request it answers.
    async fn serve_stub() -> (String, Arc<Mutex<Vec<String>>>) {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let mut raw = Vec::new();
                let mut buf = [0u8; 4096];
                let head_end = loop {
                    let n = socket.read(&mut buf).await.unwrap();
                    if n == 0 {
                        break None;
                    }
                    raw.extend_from_slice(&buf[..n]);
                    if let Some(pos) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
                        break Some(pos + 4);
                    }
                };
                let Some(head_end) = head_end else { continue };

                let head = String::from_utf8_lossy(&raw[..head_end]).to_string();
                let mut lines = head.lines();
                let mut start = lines.next().unwrap_or_default().split(' ');
                let method = start.next().unwrap_or_default().to_string();
                let path = start.next().unwrap_or_default().to_string();
                let header = |name: &str| {
                    head.lines()
                        .filter_map(|l| l.split_once(':'))
                        .find(|(k, _)| k.trim().eq_ignore_ascii_case(name))
                        .map(|(_, v)| v.trim().to_string())
                        .unwrap_or_default()
                };
                let length: usize = header("content-length").parse().unwrap_or(0);
                while raw.len() < head_end + length {
                    let n = socket.read(&mut buf).await.unwrap();
                    if n == 0 {
                        break;
                    }
                    raw.extend_from_slice(&buf[..n]);
                }
                let authorization = header("authorization");
                log.lock()
                    .unwrap()
                    .push(format!("{method} {path} | {authorization}"));

                let (status, body) = if path.starts_with("/auth/v1/token") {
                    let body = json!({
                        "access_token": "FRESH",
                        "refresh_token": "r2",
                        "expires_in": 3600,
                        "user": { "id": Uuid::nil() }
                    });
                    ("200 OK", body.to_string())
                } else if path.starts_with("/auth/v1/logout") {
                    ("500 Internal Server Error", r#"{"message":"indisponible"}"#.to_string())
                } else if authorization == "Bearer FRESH" {
                    ("200 OK", "[]".to_string())
                } else {
                    ("401 Unauthorized", r#"{"message":"JWT expired"}"#.to_string())
                };
                let reply = format!(
                    "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(reply.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        (url, seen)
    }

    fn backend_at(url: &str) -> SupabaseBackend {
        let config = ClientConfig {
            supabase_url: url.into(),
            supabase_anon_key: "anon".into(),
            ..ClientConfig::default()
        };
        let store = Arc::new(Mutex::new(Database::open_in_memory().unwrap()));
        SupabaseBackend::new(&config, store).unwrap()
    }

    #[tokio::test]
    async fn test_expired_token_refreshed_before_table_call() {
        let (url, seen) = serve_stub().await;
        let backend = backend_at(&url);
        backend.remember_session(Some(Session {
            access_token: "EXPIRED".into(),
            refresh_token: Some("r1".into()),
            user_id: Uuid::nil(),
            expires_at: Some(Utc::now() - Duration::minutes(5)),
        }));

        let articles = backend.list_articles().await.unwrap();
        assert!(articles.is_empty());

        let seen = seen.lock().unwrap().clone();
        assert_eq!(seen.len(), 2);
        assert!(seen[0].starts_with("POST /auth/v1/token?grant_type=refresh_token"));
        assert!(seen[1].starts_with("GET /rest/v1/articles"));
        assert!(seen[1].ends_with("| Bearer FRESH"));

        assert_eq!(backend.cached_session().unwrap().access_token, "FRESH");
        let persisted = backend.store.lock().unwrap().load_session().unwrap();
        assert_eq!(persisted.unwrap().refresh_token.as_deref(), Some("r2"));
    }

    #[tokio::test]
    async fn test_live_token_sent_without_refresh() {
        let (url, seen) = serve_stub().await;
        let backend = backend_at(&url);
        backend.remember_session(Some(Session {
            access_token: "FRESH".into(),
            refresh_token: Some("r1".into()),
            user_id: Uuid::nil(),
            expires_at: Some(Utc::now() + Duration::hours(1)),
        }));

        backend.list_articles().await.unwrap();

        let seen = seen.lock().unwrap().clone();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].starts_with("GET /rest/v1/articles"));
    }

    #[tokio::test]
    async fn test_sign_out_drops_session_when_logout_fails() {
        let (url, _seen) = serve_stub().await;
        let backend = backend_at(&url);
        backend.remember_session(Some(Session {
            access_token: "FRESH".into(),
            refresh_token: None,
            user_id: Uuid::nil(),
            expires_at: None,
        }));

        assert!(backend.sign_out().await.is_err());
        assert!(backend.cached_session().is_none());
        assert!(backend.store.lock().unwrap().load_session().unwrap().is_none());
    }
}
