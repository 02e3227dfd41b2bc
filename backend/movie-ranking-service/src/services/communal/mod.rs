/// Communal Ranking Service
///
/// Entry points consumed by the presentation layer:
/// - **Aggregation**: fetch catalog + all rankings concurrently, then merge
/// - **User view**: one user's ranked / unranked split, seeds an editing session
/// - **Submission**: validate an ordered id payload, then replace the user's ranking
///
/// Store failures propagate untouched; retry policy belongs to the store.
use super::percentile::{sort_by_title, RankPercentileAggregator};
use super::reorder::DualListReorderModel;
use super::skill_rating::{RatingModel, SkillRatingAggregator};
use super::store::{CatalogProvider, RankingStore, StoreError, UserDirectory};
use crate::models::{
    CommunalRanking, ConsensusMethod, MovieId, User, UserId, UserRanking, UserRankingView,
};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

const MAX_ID_LEN: usize = 64;

#[derive(Debug, Error)]
pub enum CommunalError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation failed: {0}")]
    ValidationFailure(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, CommunalError>;

pub struct CommunalRankingService {
    catalog: Arc<dyn CatalogProvider>,
    rankings: Arc<dyn RankingStore>,
    users: Arc<dyn UserDirectory>,
    method: ConsensusMethod,
    percentile: RankPercentileAggregator,
    skill: SkillRatingAggregator,
}

impl CommunalRankingService {
    pub fn new(
        catalog: Arc<dyn CatalogProvider>,
        rankings: Arc<dyn RankingStore>,
        users: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            catalog,
            rankings,
            users,
            method: ConsensusMethod::default(),
            percentile: RankPercentileAggregator::new(),
            skill: SkillRatingAggregator::default(),
        }
    }

    /// Build on one backend that serves every role.
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: CatalogProvider + RankingStore + UserDirectory + 'static,
    {
        Self::new(store.clone(), store.clone(), store)
    }

    pub fn with_method(mut self, method: ConsensusMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_rating_model(mut self, model: RatingModel) -> Self {
        self.skill = SkillRatingAggregator::new(model);
        self
    }

    pub fn method(&self) -> ConsensusMethod {
        self.method
    }

    /// Communal view with the configured consensus method.
    pub async fn communal_ranking(&self) -> Result<CommunalRanking> {
        self.communal_ranking_with(self.method).await
    }

    pub async fn communal_ranking_with(&self, method: ConsensusMethod) -> Result<CommunalRanking> {
        let (catalog, rankings) =
            tokio::try_join!(self.catalog.list_movies(), self.rankings.list_rankings())?;

        info!(
            movies = catalog.len(),
            rankings = rankings.len(),
            method = method.as_str(),
            "Computing communal ranking"
        );

        let communal = match method {
            ConsensusMethod::Percentile => self.percentile.aggregate(&catalog, &rankings),
            ConsensusMethod::SkillRating => self.skill.aggregate(&catalog, &rankings),
        };

        debug!(
            ranked = communal.ranked_movies.len(),
            unranked = communal.unranked_movies.len(),
            "Communal ranking computed"
        );

        Ok(communal)
    }

    pub async fn resolve_user(&self, access_token: &str) -> Result<User> {
        self.users
            .resolve_access_token(access_token)
            .await?
            .ok_or_else(|| CommunalError::NotFound("access token".to_string()))
    }

    async fn require_user(&self, user_id: &UserId) -> Result<User> {
        self.users
            .get_user(user_id)
            .await?
            .ok_or_else(|| CommunalError::NotFound(format!("user {}", user_id)))
    }

    /// The user's stored order against the current catalog. Movies the user
    /// never ranked are listed by title; a user without a ranking gets the
    /// whole catalog as unranked.
    pub async fn user_ranking_view(&self, access_token: &str) -> Result<UserRankingView> {
        let user = self.resolve_user(access_token).await?;
        self.view_for(&user.id).await
    }

    pub async fn user_ranking_view_for(&self, user_id: &UserId) -> Result<UserRankingView> {
        self.require_user(user_id).await?;
        self.view_for(user_id).await
    }

    async fn view_for(&self, user_id: &UserId) -> Result<UserRankingView> {
        let (mut catalog, ranking) = tokio::try_join!(
            self.catalog.list_movies(),
            self.rankings.get_ranking(user_id)
        )?;
        sort_by_title(&mut catalog, |movie| movie.title.as_str());

        let Some(ranking) = ranking else {
            return Ok(UserRankingView {
                ranked_movies: Vec::new(),
                unranked_movies: catalog,
            });
        };

        let mut ranked_movies = Vec::with_capacity(ranking.len());
        let mut ranked_ids: HashSet<&MovieId> = HashSet::with_capacity(ranking.len());
        for movie_id in &ranking.movie_ids {
            if ranked_ids.contains(movie_id) {
                continue;
            }
            if let Some(movie) = catalog.iter().find(|m| &m.id == movie_id) {
                ranked_ids.insert(movie_id);
                ranked_movies.push(movie.clone());
            }
        }

        let unranked_movies = catalog
            .iter()
            .filter(|movie| !ranked_ids.contains(&movie.id))
            .cloned()
            .collect();

        Ok(UserRankingView {
            ranked_movies,
            unranked_movies,
        })
    }

    /// Editing state for the user behind `access_token`.
    pub async fn editing_session(&self, access_token: &str) -> Result<DualListReorderModel> {
        Ok(self.user_ranking_view(access_token).await?.into())
    }

    /// Replace the ranking of `user_id` with the ordered ids in `payload`.
    /// The payload must be a JSON array of identifier strings; anything else
    /// is rejected before the store is touched.
    pub async fn submit_ranking(&self, user_id: &UserId, payload: &Value) -> Result<()> {
        let movie_ids = parse_ordered_movie_ids(payload)?;
        self.require_user(user_id).await?;
        self.store_ranking(user_id, movie_ids).await
    }

    pub async fn submit_ranking_for_token(
        &self,
        access_token: &str,
        payload: &Value,
    ) -> Result<()> {
        let movie_ids = parse_ordered_movie_ids(payload)?;
        let user = self.resolve_user(access_token).await?;
        self.store_ranking(&user.id, movie_ids).await
    }

    /// Persist the ranked list of an editing session.
    pub async fn submit_session(
        &self,
        user_id: &UserId,
        session: &DualListReorderModel,
    ) -> Result<()> {
        let movie_ids = session.ranked_ids();
        validate_movie_ids(&movie_ids)?;
        self.require_user(user_id).await?;
        self.store_ranking(user_id, movie_ids).await
    }

    async fn store_ranking(&self, user_id: &UserId, movie_ids: Vec<MovieId>) -> Result<()> {
        let count = movie_ids.len();
        self.rankings
            .upsert_ranking(UserRanking::new(user_id.clone(), movie_ids))
            .await?;

        info!(user_id = %user_id, movie_count = count, "Ranking submitted");
        Ok(())
    }
}

/// Non-empty, bounded, ASCII alphanumeric plus `-` and `_`.
pub fn is_well_formed_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_ID_LEN
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Decode a submission payload into an ordered, duplicate-free id list.
pub fn parse_ordered_movie_ids(payload: &Value) -> Result<Vec<MovieId>> {
    let entries = payload.as_array().ok_or_else(|| {
        CommunalError::ValidationFailure("payload must be an array of movie ids".to_string())
    })?;

    let movie_ids = entries
        .iter()
        .enumerate()
        .map(|(position, entry)| match entry.as_str() {
            Some(id) => Ok(MovieId::new(id)),
            None => {
                warn!(position, "Rejected non-string ranking entry");
                Err(CommunalError::ValidationFailure(format!(
                    "entry {} is not a string",
                    position
                )))
            }
        })
        .collect::<Result<Vec<_>>>()?;

    validate_movie_ids(&movie_ids)?;
    Ok(movie_ids)
}

pub fn validate_movie_ids(movie_ids: &[MovieId]) -> Result<()> {
    let mut seen = HashSet::with_capacity(movie_ids.len());

    for (position, movie_id) in movie_ids.iter().enumerate() {
        if !is_well_formed_id(movie_id.as_str()) {
            return Err(CommunalError::ValidationFailure(format!(
                "entry {} is not a well-formed movie id",
                position
            )));
        }
        if !seen.insert(movie_id) {
            return Err(CommunalError::ValidationFailure(format!(
                "movie {} is ranked twice",
                movie_id
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Movie;
    use crate::services::store::{InMemoryStore, Result as StoreResult};
    use async_trait::async_trait;
    use mockall::mock;
    use serde_json::json;

    mock! {
        pub Catalog {}

        #[async_trait]
        impl CatalogProvider for Catalog {
            async fn list_movies(&self) -> StoreResult<Vec<Movie>>;
        }
    }

    fn catalog() -> Vec<Movie> {
        vec![
            Movie::new("a", "Amadeus", 1984),
            Movie::new("b", "Brazil", 1985),
            Movie::new("c", "Casablanca", 1942),
        ]
    }

    #[test]
    fn test_parse_accepts_ordered_ids() {
        let ids = parse_ordered_movie_ids(&json!(["b", "a_1", "c-2"])).unwrap();
        assert_eq!(
            ids,
            vec![MovieId::new("b"), MovieId::new("a_1"), MovieId::new("c-2")]
        );
        assert!(parse_ordered_movie_ids(&json!([])).unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_non_string_entry() {
        let err = parse_ordered_movie_ids(&json!(["x", "y", 3])).unwrap_err();
        assert!(matches!(err, CommunalError::ValidationFailure(_)));
    }

    #[test]
    fn test_parse_rejects_malformed_payloads() {
        for payload in [
            json!({"ids": ["a"]}),
            json!("a"),
            json!([""]),
            json!(["has space"]),
            json!(["a", "a"]),
            json!([null]),
            json!(["x".repeat(65)]),
        ] {
            assert!(
                matches!(
                    parse_ordered_movie_ids(&payload),
                    Err(CommunalError::ValidationFailure(_))
                ),
                "payload {} should be rejected",
                payload
            );
        }
    }

    #[tokio::test]
    async fn test_invalid_submission_leaves_store_untouched() {
        let store = Arc::new(InMemoryStore::with_catalog(catalog()));
        let user = store.register_user("Ada");
        let service = CommunalRankingService::from_store(store.clone());

        service
            .submit_ranking(&user.id, &json!(["a", "b"]))
            .await
            .unwrap();
        let err = service
            .submit_ranking(&user.id, &json!(["x", "y", 3]))
            .await
            .unwrap_err();

        assert!(matches!(err, CommunalError::ValidationFailure(_)));
        let stored = store.get_ranking(&user.id).await.unwrap().unwrap();
        assert_eq!(stored.movie_ids, vec![MovieId::new("a"), MovieId::new("b")]);
    }

    #[tokio::test]
    async fn test_unknown_user_and_token_are_not_found() {
        let store = Arc::new(InMemoryStore::with_catalog(catalog()));
        let service = CommunalRankingService::from_store(store.clone());

        let err = service
            .submit_ranking(&UserId::new("ghost"), &json!(["a"]))
            .await
            .unwrap_err();
        assert!(matches!(err, CommunalError::NotFound(_)));

        let err = service.user_ranking_view("no-such-token").await.unwrap_err();
        assert!(matches!(err, CommunalError::NotFound(_)));

        assert!(store.list_rankings().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_view_without_ranking_is_catalog_by_title() {
        let store = Arc::new(InMemoryStore::with_catalog(vec![
            Movie::new("z", "Zodiac", 2007),
            Movie::new("a", "alien", 1979),
        ]));
        let user = store.register_user("Ada");
        let service = CommunalRankingService::from_store(store);

        let view = service.user_ranking_view(&user.access_token).await.unwrap();

        assert!(view.ranked_movies.is_empty());
        let titles: Vec<&str> = view.unranked_movies.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(titles, vec!["alien", "Zodiac"]);
    }

    #[tokio::test]
    async fn test_view_keeps_user_order_and_drops_dangling_ids() {
        let store = Arc::new(InMemoryStore::with_catalog(catalog()));
        let user = store.register_user("Ada");
        let service = CommunalRankingService::from_store(store);

        service
            .submit_ranking(&user.id, &json!(["c", "gone", "a"]))
            .await
            .unwrap();
        let view = service.user_ranking_view_for(&user.id).await.unwrap();

        let ranked: Vec<&str> = view.ranked_movies.iter().map(|m| m.id.as_str()).collect();
        let unranked: Vec<&str> = view.unranked_movies.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ranked, vec!["c", "a"]);
        assert_eq!(unranked, vec!["b"]);
    }

    #[tokio::test]
    async fn test_catalog_failure_propagates() {
        let mut failing = MockCatalog::new();
        failing
            .expect_list_movies()
            .returning(|| Err(StoreError::Unavailable("catalog offline".to_string())));

        let store = Arc::new(InMemoryStore::new());
        let service = CommunalRankingService::new(Arc::new(failing), store.clone(), store);

        let err = service.communal_ranking().await.unwrap_err();
        assert!(matches!(err, CommunalError::Store(StoreError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_method_selects_aggregator() {
        let store = Arc::new(InMemoryStore::with_catalog(catalog()));
        let ada = store.register_user("Ada");
        let bob = store.register_user("Bob");
        let service =
            CommunalRankingService::from_store(store).with_method(ConsensusMethod::SkillRating);

        service.submit_ranking(&ada.id, &json!(["a", "b"])).await.unwrap();
        service.submit_ranking(&bob.id, &json!(["b", "c"])).await.unwrap();

        let skill = service.communal_ranking().await.unwrap();
        assert!(skill.ranked_movies.iter().all(|m| m.trueskill_mu.is_some()));

        let percentile = service
            .communal_ranking_with(ConsensusMethod::Percentile)
            .await
            .unwrap();
        assert!(percentile.ranked_movies.iter().all(|m| m.trueskill_mu.is_none()));
        assert_eq!(percentile.contributing_user_ids, vec![ada.id, bob.id]);
    }
}
