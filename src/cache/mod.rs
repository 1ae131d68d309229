pub mod profile_cache;

pub use profile_cache::{CacheStats, ChannelProfiles, ProfileCache};
