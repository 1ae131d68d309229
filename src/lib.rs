//! User profile persistence store
//!
//! Owns the user, team-membership and channel-membership tables of a
//! PostgreSQL engine and exposes them behind typed asynchronous handles:
//! - CRUD and lookups over user rows, with engine-enforced identity
//!   uniqueness
//! - Prefix search across profile fields with per-call visibility scoping
//! - Membership-filtered listings (in/not-in team, in/not-in channel) with
//!   derived freshness etags
//! - In-process profile caches for the hot channel-roster and by-id paths
//! - Mention-count aggregation for unread badges

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod store;

pub use cache::{CacheStats, ChannelProfiles, ProfileCache};
pub use config::{CacheConfig, DatabaseConfig, StoreConfig};
pub use error::{StoreError, StoreResult};
pub use models::{ChannelMember, TeamMember, User, UserSearchOptions, UserUpdate};
pub use store::{ChannelMemberStore, ProfileStore, StoreHandle, TeamMemberStore, UserStore};
