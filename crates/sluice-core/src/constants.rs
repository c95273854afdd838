//! Limits and well-known keys.

// ── Composition ─────────────────────────────────────────────────────

/// Maximum remote include substitutions performed in one composition pass.
pub const MAX_REMOTE_INCLUDES: usize = 12;

/// Maximum entries processed by a single bulk import call.
pub const MAX_IMPORT_ENTRIES: usize = 60;

/// Reserved import name addressing the default rule buffer.
pub const DEFAULT_RULES_NAME: &str = "Default";

// ── Composer history ────────────────────────────────────────────────

/// Maximum number of composer history entries kept.
pub const MAX_HISTORY_LEN: usize = 36;
/// Maximum stored URL length in bytes.
pub const MAX_URL_LEN: usize = 10 * 1024;
/// Maximum stored headers length in bytes.
pub const MAX_HEADERS_LEN: usize = 128 * 1024;
/// Maximum stored body length in bytes.
pub const MAX_BODY_LEN: usize = 256 * 1024;
/// Maximum stored method length in bytes.
pub const MAX_METHOD_LEN: usize = 64;
/// Name of the history file inside the properties namespace.
pub const HISTORY_FILE_NAME: &str = "composerHistory";

// ── Property keys ───────────────────────────────────────────────────

/// Properties namespace: every rule source except shadow rules is off.
pub const PROP_DISABLED_ALL_RULES: &str = "disabledAllRules";
/// Properties namespace: mirror host pairs into the system hosts file.
pub const PROP_SYNC_WITH_SYS_HOSTS: &str = "syncWithSysHosts";
/// Properties namespace: precedence inversion toggle.
pub const PROP_BACK_RULES_FIRST: &str = "backRulesFirst";
/// Properties namespace: allow selecting more than one rule file.
pub const PROP_ALLOW_MULTIPLE_CHOICE: &str = "allowMultipleChoice";
/// Properties namespace: latest published version string.
pub const PROP_LATEST_VERSION: &str = "latestVersion";

/// Rules namespace: default rule buffer text.
pub const PROP_DEFAULT_RULES: &str = "defaultRules";
/// Rules namespace: default rule buffer disabled flag.
pub const PROP_DISABLED_DEFAULT_RULES: &str = "disabledDefaultRules";
/// Rules namespace: ordered selection list.
pub const PROP_SELECTED_LIST: &str = "selectedList";

/// Values namespace: the single selected value file.
pub const PROP_SELECTED_FILE: &str = "selectedFile";
