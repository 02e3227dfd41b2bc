// ============================================
// Redis Store
// ============================================
//
// Redis keys:
// - {prefix}:catalog           - List of movie JSON, catalog order
// - {prefix}:ranking:{user_id} - UserRanking JSON, replaced wholesale
// - {prefix}:rankings          - Sorted set of user ids by first submission
// - {prefix}:ranking_seq       - Counter feeding the sorted set scores
// - {prefix}:user:{user_id}    - User JSON
// - {prefix}:token:{token}     - user id for an access token
// - {prefix}:communal_snapshot - Latest published CommunalSnapshot JSON

use super::{CatalogProvider, RankingStore, Result, SnapshotStore, UserDirectory};
use crate::models::{CommunalSnapshot, Movie, User, UserId, UserRanking};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tracing::{debug, info, warn};

pub struct RedisStore {
    redis: redis::Client,
    key_prefix: String,
}

impl RedisStore {
    const CATALOG_KEY_SUFFIX: &'static str = ":catalog";
    const RANKING_KEY_PREFIX: &'static str = ":ranking:";
    const RANKING_INDEX_SUFFIX: &'static str = ":rankings";
    const RANKING_SEQ_SUFFIX: &'static str = ":ranking_seq";
    const USER_KEY_PREFIX: &'static str = ":user:";
    const TOKEN_KEY_PREFIX: &'static str = ":token:";
    const SNAPSHOT_KEY_SUFFIX: &'static str = ":communal_snapshot";

    pub fn new(redis: redis::Client) -> Self {
        Self {
            redis,
            key_prefix: "movie_ranking".to_string(),
        }
    }

    pub fn with_key_prefix(mut self, prefix: &str) -> Self {
        self.key_prefix = prefix.to_string();
        self
    }

    fn catalog_key(&self) -> String {
        format!("{}{}", self.key_prefix, Self::CATALOG_KEY_SUFFIX)
    }

    fn ranking_key(&self, user_id: &UserId) -> String {
        format!("{}{}{}", self.key_prefix, Self::RANKING_KEY_PREFIX, user_id)
    }

    fn ranking_index_key(&self) -> String {
        format!("{}{}", self.key_prefix, Self::RANKING_INDEX_SUFFIX)
    }

    fn ranking_seq_key(&self) -> String {
        format!("{}{}", self.key_prefix, Self::RANKING_SEQ_SUFFIX)
    }

    fn user_key(&self, user_id: &UserId) -> String {
        format!("{}{}{}", self.key_prefix, Self::USER_KEY_PREFIX, user_id)
    }

    fn token_key(&self, access_token: &str) -> String {
        format!("{}{}{}", self.key_prefix, Self::TOKEN_KEY_PREFIX, access_token)
    }

    fn snapshot_key(&self) -> String {
        format!("{}{}", self.key_prefix, Self::SNAPSHOT_KEY_SUFFIX)
    }

    async fn connection(&self) -> Result<MultiplexedConnection> {
        Ok(self.redis.get_multiplexed_async_connection().await?)
    }

    /// Append a movie to the catalog.
    pub async fn put_movie(&self, movie: &Movie) -> Result<()> {
        let mut conn = self.connection().await?;
        let movie_json = serde_json::to_string(movie)?;

        let _: () = conn.rpush(self.catalog_key(), movie_json).await?;

        info!(movie_id = %movie.id, title = %movie.title, "Added movie to catalog");
        Ok(())
    }

    /// Store a user and index their access token.
    pub async fn put_user(&self, user: &User) -> Result<()> {
        let mut conn = self.connection().await?;
        let user_json = serde_json::to_string(user)?;

        redis::pipe()
            .atomic()
            .set(self.user_key(&user.id), user_json)
            .ignore()
            .set(self.token_key(&user.access_token), user.id.as_str())
            .ignore()
            .query_async::<_, ()>(&mut conn)
            .await?;

        info!(user_id = %user.id, "Stored user");
        Ok(())
    }
}

#[async_trait]
impl CatalogProvider for RedisStore {
    async fn list_movies(&self) -> Result<Vec<Movie>> {
        let mut conn = self.connection().await?;

        let movies_json: Vec<String> = conn.lrange(self.catalog_key(), 0, -1).await?;
        let movies = movies_json
            .iter()
            .map(|json| serde_json::from_str(json))
            .collect::<std::result::Result<Vec<Movie>, _>>()?;

        debug!(count = movies.len(), "Loaded catalog");
        Ok(movies)
    }
}

#[async_trait]
impl RankingStore for RedisStore {
    async fn get_ranking(&self, user_id: &UserId) -> Result<Option<UserRanking>> {
        let mut conn = self.connection().await?;

        let ranking_json: Option<String> = conn.get(self.ranking_key(user_id)).await?;
        match ranking_json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn list_rankings(&self) -> Result<Vec<UserRanking>> {
        let mut conn = self.connection().await?;

        let user_ids: Vec<String> = conn.zrange(self.ranking_index_key(), 0, -1).await?;
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut pipe = redis::pipe();
        for user_id in &user_ids {
            pipe.get(self.ranking_key(&UserId::new(user_id.as_str())));
        }
        let rankings_json: Vec<Option<String>> = pipe.query_async(&mut conn).await?;

        let mut rankings = Vec::with_capacity(rankings_json.len());
        for (user_id, json) in user_ids.iter().zip(rankings_json) {
            match json {
                Some(json) => rankings.push(serde_json::from_str(&json)?),
                None => warn!(user_id = %user_id, "Ranking index entry without a ranking"),
            }
        }

        debug!(count = rankings.len(), "Loaded rankings");
        Ok(rankings)
    }

    async fn upsert_ranking(&self, ranking: UserRanking) -> Result<()> {
        let mut conn = self.connection().await?;
        let ranking_json = serde_json::to_string(&ranking)?;

        let seq: i64 = conn.incr(self.ranking_seq_key(), 1i64).await?;

        // The SET replaces the whole record; NX keeps the first-submission
        // position on later upserts.
        redis::pipe()
            .atomic()
            .set(self.ranking_key(&ranking.user_id), ranking_json)
            .ignore()
            .cmd("ZADD")
            .arg(self.ranking_index_key())
            .arg("NX")
            .arg(seq)
            .arg(ranking.user_id.as_str())
            .ignore()
            .query_async::<_, ()>(&mut conn)
            .await?;

        info!(
            user_id = %ranking.user_id,
            movie_count = ranking.len(),
            "Upserted ranking"
        );
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for RedisStore {
    async fn resolve_access_token(&self, access_token: &str) -> Result<Option<User>> {
        let mut conn = self.connection().await?;

        let user_id: Option<String> = conn.get(self.token_key(access_token)).await?;
        match user_id {
            Some(user_id) => self.get_user(&UserId::new(user_id)).await,
            None => Ok(None),
        }
    }

    async fn get_user(&self, user_id: &UserId) -> Result<Option<User>> {
        let mut conn = self.connection().await?;

        let user_json: Option<String> = conn.get(self.user_key(user_id)).await?;
        match user_json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl SnapshotStore for RedisStore {
    async fn save_snapshot(&self, snapshot: &CommunalSnapshot) -> Result<()> {
        let mut conn = self.connection().await?;
        let snapshot_json = serde_json::to_string(snapshot)?;

        let _: () = conn.set(self.snapshot_key(), snapshot_json).await?;

        debug!(
            ranked = snapshot.ranking.ranked_movies.len(),
            method = snapshot.method.as_str(),
            "Saved communal snapshot"
        );
        Ok(())
    }

    async fn latest_snapshot(&self) -> Result<Option<CommunalSnapshot>> {
        let mut conn = self.connection().await?;

        let snapshot_json: Option<String> = conn.get(self.snapshot_key()).await?;
        match snapshot_json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }
}
