//! Database layer (Firestore).

pub mod firestore;

pub use firestore::{FirestoreDb, LogQuery};

/// Collection names as constants.
pub mod collections {
    pub const LOGS: &str = "logs";
    pub const SETTINGS: &str = "settings";
    /// Aggregate statistics (single document)
    pub const LOG_STATS: &str = "log_stats";
    /// Per-user record counts, keyed by a digest of the user ID
    pub const LOG_USERS: &str = "log_users";
}

/// Well-known document IDs.
pub mod documents {
    /// `settings/retention`
    pub const RETENTION: &str = "retention";
    /// `settings/live_console`
    pub const LIVE_CONSOLE: &str = "live_console";
    /// `log_stats/aggregate`
    pub const STATS_AGGREGATE: &str = "aggregate";
}
