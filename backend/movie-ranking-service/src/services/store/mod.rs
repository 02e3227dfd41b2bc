/// Storage seams
///
/// The aggregation core only needs "fetch everything" and "replace one user's
/// ranking". These traits are what the service depends on; `InMemoryStore`
/// backs tests and local runs, `RedisStore` backs deployments.
pub mod in_memory;
pub mod redis_store;

pub use in_memory::InMemoryStore;
pub use redis_store::RedisStore;

use crate::models::{CommunalSnapshot, Movie, User, UserId, UserRanking};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Full current movie catalog. Iteration order is significant: it breaks ties
/// in the communal ordering.
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    async fn list_movies(&self) -> Result<Vec<Movie>>;
}

#[async_trait]
pub trait RankingStore: Send + Sync {
    /// `None` means the user never submitted.
    async fn get_ranking(&self, user_id: &UserId) -> Result<Option<UserRanking>>;

    /// Every stored ranking, in first-submission order.
    async fn list_rankings(&self) -> Result<Vec<UserRanking>>;

    /// Replace the user's ranking wholesale. Last write wins.
    async fn upsert_ranking(&self, ranking: UserRanking) -> Result<()>;
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn resolve_access_token(&self, access_token: &str) -> Result<Option<User>>;

    async fn get_user(&self, user_id: &UserId) -> Result<Option<User>>;
}

#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn save_snapshot(&self, snapshot: &CommunalSnapshot) -> Result<()>;

    async fn latest_snapshot(&self) -> Result<Option<CommunalSnapshot>>;
}
