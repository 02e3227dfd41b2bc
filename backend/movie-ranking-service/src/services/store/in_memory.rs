use super::{CatalogProvider, RankingStore, Result, SnapshotStore, UserDirectory};
use crate::models::{CommunalSnapshot, Movie, MovieId, User, UserId, UserRanking};
use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

/// Process-local store for tests and single-node runs
#[derive(Debug, Default)]
pub struct InMemoryStore {
    catalog: RwLock<Vec<Movie>>,
    rankings: RwLock<Vec<UserRanking>>,
    users: DashMap<UserId, User>,
    tokens: DashMap<String, UserId>,
    snapshot: RwLock<Option<CommunalSnapshot>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catalog(catalog: Vec<Movie>) -> Self {
        Self {
            catalog: RwLock::new(catalog),
            ..Default::default()
        }
    }

    pub async fn add_movie(&self, movie: Movie) {
        self.catalog.write().await.push(movie);
    }

    /// Drop a movie from the catalog. Rankings naming it are left untouched.
    pub async fn remove_movie(&self, movie_id: &MovieId) -> bool {
        let mut catalog = self.catalog.write().await;
        let before = catalog.len();
        catalog.retain(|movie| &movie.id != movie_id);
        catalog.len() != before
    }

    pub fn insert_user(&self, user: User) {
        self.tokens.insert(user.access_token.clone(), user.id.clone());
        self.users.insert(user.id.clone(), user);
    }

    /// Create a user with a fresh id and access token.
    pub fn register_user(&self, name: &str) -> User {
        let user = User {
            id: UserId::new(Uuid::new_v4().simple().to_string()),
            name: name.to_string(),
            access_token: Uuid::new_v4().simple().to_string(),
        };
        self.insert_user(user.clone());

        info!(user_id = %user.id, name = %user.name, "Registered user");
        user
    }
}

#[async_trait]
impl CatalogProvider for InMemoryStore {
    async fn list_movies(&self) -> Result<Vec<Movie>> {
        Ok(self.catalog.read().await.clone())
    }
}

#[async_trait]
impl RankingStore for InMemoryStore {
    async fn get_ranking(&self, user_id: &UserId) -> Result<Option<UserRanking>> {
        let rankings = self.rankings.read().await;
        Ok(rankings.iter().find(|r| &r.user_id == user_id).cloned())
    }

    async fn list_rankings(&self) -> Result<Vec<UserRanking>> {
        Ok(self.rankings.read().await.clone())
    }

    async fn upsert_ranking(&self, ranking: UserRanking) -> Result<()> {
        let mut rankings = self.rankings.write().await;

        match rankings.iter_mut().find(|r| r.user_id == ranking.user_id) {
            Some(existing) => *existing = ranking,
            None => rankings.push(ranking),
        }

        debug!(total = rankings.len(), "Upserted ranking");
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for InMemoryStore {
    async fn resolve_access_token(&self, access_token: &str) -> Result<Option<User>> {
        let user_id = self
            .tokens
            .get(access_token)
            .map(|entry| entry.value().clone());

        match user_id {
            Some(user_id) => self.get_user(&user_id).await,
            None => Ok(None),
        }
    }

    async fn get_user(&self, user_id: &UserId) -> Result<Option<User>> {
        Ok(self.users.get(user_id).map(|entry| entry.value().clone()))
    }
}

#[async_trait]
impl SnapshotStore for InMemoryStore {
    async fn save_snapshot(&self, snapshot: &CommunalSnapshot) -> Result<()> {
        *self.snapshot.write().await = Some(snapshot.clone());
        Ok(())
    }

    async fn latest_snapshot(&self) -> Result<Option<CommunalSnapshot>> {
        Ok(self.snapshot.read().await.clone())
    }
}
