pub mod member;
pub mod search;
pub mod user;

pub use member::{ChannelMember, TeamMember};
pub use search::{UserSearchOptions, USER_SEARCH_DEFAULT_LIMIT};
pub use user::{User, UserUpdate};

use chrono::Utc;

/// Current wall-clock time in epoch milliseconds, the unit every persisted
/// timestamp in this store uses.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Mints a new 32-char identifier. Ids are plain text so that an unset id can
/// be represented as the empty string.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
