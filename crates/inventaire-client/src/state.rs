//! Explicit application state owned by the controller.
//!
//! Every screen reads from [`AppState`]; only the operations in
//! [`crate::commands`] write to it.

use std::collections::HashMap;

use inventaire_shared::search::FilterState;
use inventaire_shared::{Article, ArticleForm, CurrentUser, Profile, UserRecord};

/// Screen currently displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    Loading,
    Login,
    SetupPin,
    Dashboard,
    SearchArticles,
    ArticleForm,
    Stats,
    Settings,
    Users,
}

impl View {
    pub fn as_str(&self) -> &'static str {
        match self {
            View::Loading => "loading",
            View::Login => "login",
            View::SetupPin => "setup-pin",
            View::Dashboard => "dashboard",
            View::SearchArticles => "search",
            View::ArticleForm => "form",
            View::Stats => "stats",
            View::Settings => "settings",
            View::Users => "users",
        }
    }

    /// Parse a view name typed in the terminal front end.
    pub fn parse(name: &str) -> Option<View> {
        let view = match name.trim().to_lowercase().as_str() {
            "dashboard" | "accueil" => View::Dashboard,
            "search" | "articles" | "recherche" => View::SearchArticles,
            "form" => View::ArticleForm,
            "stats" | "statistiques" => View::Stats,
            "settings" | "parametres" | "paramètres" => View::Settings,
            "users" | "utilisateurs" => View::Users,
            _ => return None,
        };
        Some(view)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoginMode {
    #[default]
    Password,
    Pin,
}

/// Identifier entry of the login screen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginForm {
    /// CP number as typed.
    pub numero_cp: String,
    pub remember: bool,
    pub mode: LoginMode,
    /// Whether a PIN is on file for the typed identifier.
    pub pin_on_file: bool,
}

/// Result of the startup session check or of a successful authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootOutcome {
    /// No session: show the login screen.
    Login,
    /// A session exists but its user row could not be loaded.
    Reauthenticate,
    Blocked,
    SetupPin,
    Dashboard,
}

/// Central application state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub view: View,

    /// Startup session check in progress.
    pub auth_loading: bool,

    /// True once the user passed every gate (not blocked, PIN on file).
    pub logged_in: bool,

    /// Set as soon as the user row is known, including during PIN setup.
    pub current_user: Option<CurrentUser>,

    pub login: LoginForm,

    /// Catalog ordered by symbol.
    pub articles: Vec<Article>,

    /// User directory ordered by name. Only loaded for administrators.
    pub users: Vec<UserRecord>,

    pub filters: FilterState,

    /// 1-based page of the filtered catalog.
    pub page: usize,

    pub article_form: ArticleForm,

    /// Article being edited, `None` when the form creates a new one.
    pub editing: Option<i64>,

    /// Staged role changes keyed by CP number.
    pub pending_profiles: HashMap<String, Profile>,

    /// Article awaiting delete confirmation.
    pub pending_delete: Option<i64>,

    /// A remote mutation is in flight.
    pub busy: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            view: View::Loading,
            auth_loading: false,
            logged_in: false,
            current_user: None,
            login: LoginForm::default(),
            articles: Vec::new(),
            users: Vec::new(),
            filters: FilterState::default(),
            page: 1,
            article_form: ArticleForm::default(),
            editing: None,
            pending_profiles: HashMap::new(),
            pending_delete: None,
            busy: false,
        }
    }

    pub fn article(&self, id: i64) -> Option<&Article> {
        self.articles.iter().find(|a| a.id == id)
    }

    pub fn user_by_cp(&self, numero_cp: &str) -> Option<&UserRecord> {
        self.users.iter().find(|u| u.numero_cp == numero_cp)
    }

    /// Drop everything tied to the signed-in user. The identifier survives
    /// only when "remember me" is set.
    pub fn reset_after_logout(&mut self) {
        let login = if self.login.remember {
            LoginForm {
                numero_cp: self.login.numero_cp.clone(),
                remember: true,
                mode: LoginMode::Password,
                pin_on_file: self.login.pin_on_file,
            }
        } else {
            LoginForm::default()
        };

        *self = Self {
            view: View::Login,
            login,
            ..Self::new()
        };
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
