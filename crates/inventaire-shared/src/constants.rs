/// Application name
pub const APP_NAME: &str = "Inventaire Caténaires Versailles";

/// Version reported in exports
pub const APP_VERSION: &str = "1.0.0";

/// Domain appended to the lowercased CP number to build the login email
pub const DEFAULT_EMAIL_DOMAIN: &str = "catenaires-versailles.internal";

/// Articles per page in the search view
pub const PAGE_SIZE: usize = 20;

/// Minimum PIN length (digits)
pub const MIN_PIN_LENGTH: usize = 4;

/// Stored when an article is saved without a designation
pub const DESIGNATION_PLACEHOLDER: &str = "Désignation non définie";

/// Shown in the location list when no article carries one yet
pub const FALLBACK_LOCATIONS: [&str; 3] = ["Porte de Buc", "Matelots", "Plaisir"];

/// Shown in the deposit-nature list when no article carries one yet
pub const FALLBACK_DEPOSIT_NATURES: [&str; 2] = ["BDL", "SR"];

/// Notification auto-dismiss delay in seconds
pub const NOTIFICATION_SECS: u64 = 3;

/// Export file name prefix, followed by `_YYYY-MM-DD.xlsx`
pub const EXPORT_FILE_PREFIX: &str = "inventaire_vch_export";

/// Block character used for textual bar charts
pub const BAR_CHAR: char = '█';

/// One bar block per this many percentage points
pub const BAR_STEP_PERCENT: u32 = 5;

/// Backend table names
pub const TABLE_ARTICLES: &str = "articles";
pub const TABLE_USERS: &str = "utilisateurs";
