//! Store facade and the asynchronous completion protocol.
//!
//! Every store operation clones its inputs, runs on the tokio runtime and
//! immediately hands back a [`StoreHandle`]. The handle resolves exactly once,
//! with either the typed payload or a [`StoreError`]. There is no cancellation
//! primitive: dropping a handle abandons the outcome while the operation still
//! runs to completion in the background.

pub mod channel_store;
pub mod team_store;
pub mod user_search;
pub mod user_store;

pub use channel_store::ChannelMemberStore;
pub use team_store::TeamMemberStore;
pub use user_store::UserStore;

use sqlx::PgPool;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::oneshot;

use crate::cache::ProfileCache;
use crate::config::StoreConfig;
use crate::db;
use crate::error::{StoreError, StoreResult};

/// Single-use completion handle for one store operation.
#[must_use = "a StoreHandle resolves to the operation outcome and should be received"]
pub struct StoreHandle<T> {
    rx: oneshot::Receiver<StoreResult<T>>,
}

impl<T> StoreHandle<T> {
    /// Waits for the operation to finish. This is the caller's only
    /// suspension point; it resolves exactly once per handle.
    pub async fn recv(self) -> StoreResult<T> {
        match self.rx.await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Internal(
                "store worker dropped its result channel".to_string(),
            )),
        }
    }
}

/// Spawns one operation onto the runtime and returns its handle. Must be
/// called from within a tokio runtime.
pub(crate) fn dispatch<T, F>(op: F) -> StoreHandle<T>
where
    T: Send + 'static,
    F: Future<Output = StoreResult<T>> + Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        // The receiver may already be gone; the outcome is then discarded.
        let _ = tx.send(op.await);
    });
    StoreHandle { rx }
}

/// Root store object: owns the pool, the cache service and the per-entity
/// stores. Construct one per persistence engine and share it.
pub struct ProfileStore {
    pool: PgPool,
    cache: Arc<ProfileCache>,
    user: UserStore,
    team: TeamMemberStore,
    channel: ChannelMemberStore,
}

impl ProfileStore {
    pub fn new(pool: PgPool, config: &StoreConfig) -> Self {
        let cache = Arc::new(ProfileCache::new(&config.cache));
        ProfileStore {
            user: UserStore::new(pool.clone(), cache.clone()),
            team: TeamMemberStore::new(pool.clone()),
            channel: ChannelMemberStore::new(pool.clone(), cache.clone()),
            pool,
            cache,
        }
    }

    /// Connects to the engine, applies migrations and wires everything up.
    pub async fn connect(config: &StoreConfig) -> StoreResult<Self> {
        let pool = db::create_pool(&config.database).await?;
        db::run_migrations(&pool).await?;
        Ok(Self::new(pool, config))
    }

    pub fn user(&self) -> &UserStore {
        &self.user
    }

    pub fn team(&self) -> &TeamMemberStore {
        &self.team
    }

    pub fn channel(&self) -> &ChannelMemberStore {
        &self.channel
    }

    pub fn cache(&self) -> &ProfileCache {
        &self.cache
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn handle_resolves_exactly_once_with_payload() {
        let handle = dispatch(async { Ok::<_, StoreError>(41 + 1) });
        assert_eq!(handle.recv().await.unwrap(), 42);
    }

    #[tokio::test]
    async fn handle_resolves_with_error() {
        let handle: StoreHandle<()> =
            dispatch(async { Err(StoreError::Validation("bad input".to_string())) });
        assert!(matches!(
            handle.recv().await,
            Err(StoreError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn abandoned_handle_still_runs_to_completion() {
        let (done_tx, done_rx) = oneshot::channel();
        let handle = dispatch(async move {
            let _ = done_tx.send(());
            Ok::<_, StoreError>(())
        });
        drop(handle);
        done_rx
            .await
            .expect("operation should complete after its handle is dropped");
    }

    #[tokio::test]
    async fn panicked_worker_surfaces_internal_error() {
        let handle: StoreHandle<()> = dispatch(async { panic!("worker crashed") });
        match handle.recv().await {
            Err(StoreError::Internal(_)) => {}
            other => panic!("expected internal error, got {other:?}"),
        }
    }
}
