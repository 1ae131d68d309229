use serde::{Deserialize, Serialize};
use serde_json::json;

/// Team association row. Removal is a hard delete, so presence of a row is
/// membership.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TeamMember {
    pub team_id: String,
    pub user_id: String,
    pub roles: String,
}

impl TeamMember {
    pub fn new(team_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        TeamMember {
            team_id: team_id.into(),
            user_id: user_id.into(),
            roles: String::new(),
        }
    }
}

/// Channel association row carrying the per-channel unread state.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ChannelMember {
    pub channel_id: String,
    pub user_id: String,
    pub roles: String,
    pub last_viewed_at: i64,
    pub last_update_at: i64,
    pub msg_count: i64,
    pub mention_count: i64,
    pub notify_props: serde_json::Value,
}

impl ChannelMember {
    pub fn new(channel_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        ChannelMember {
            channel_id: channel_id.into(),
            user_id: user_id.into(),
            roles: String::new(),
            last_viewed_at: 0,
            last_update_at: 0,
            msg_count: 0,
            mention_count: 0,
            notify_props: Self::default_notify_props(),
        }
    }

    pub fn default_notify_props() -> serde_json::Value {
        json!({
            "desktop": "default",
            "email": "default",
            "mark_unread": "all",
            "push": "default",
        })
    }
}
