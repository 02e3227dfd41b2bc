use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque movie identifier as handed out by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MovieId(pub String);

impl MovieId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MovieId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque user identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub id: MovieId,
    pub title: String,
    pub year: i32,
}

impl Movie {
    pub fn new(id: impl Into<String>, title: impl Into<String>, year: i32) -> Self {
        Self {
            id: MovieId::new(id),
            title: title.into(),
            year,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    #[serde(rename = "accessToken")]
    pub access_token: String,
}

/// One user's full preference order, most preferred first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRanking {
    pub user_id: UserId,
    pub movie_ids: Vec<MovieId>,
}

impl UserRanking {
    pub fn new(user_id: UserId, movie_ids: Vec<MovieId>) -> Self {
        Self { user_id, movie_ids }
    }

    pub fn len(&self) -> usize {
        self.movie_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.movie_ids.is_empty()
    }
}

/// Where one user placed one movie.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedObservation {
    pub user_id: UserId,
    pub rank_number: usize,
    pub rank_out_of: usize,
    pub rank_pct: f64,
}

/// A catalog movie together with every observation naming it and its
/// consensus scores. Unranked movies carry no score at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieAggregate {
    #[serde(flatten)]
    pub movie: Movie,
    pub user_rankings: Vec<RankedObservation>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub average_ranking: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub trueskill_mu: Option<f64>,
}

impl MovieAggregate {
    pub fn new(movie: Movie) -> Self {
        Self {
            movie,
            user_rankings: Vec::new(),
            average_ranking: None,
            trueskill_mu: None,
        }
    }

    pub fn id(&self) -> &MovieId {
        &self.movie.id
    }

    pub fn is_ranked(&self) -> bool {
        !self.user_rankings.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunalRanking {
    pub ranked_movies: Vec<MovieAggregate>,
    pub unranked_movies: Vec<MovieAggregate>,
    #[serde(rename = "userIds")]
    pub contributing_user_ids: Vec<UserId>,
}

/// One user's own ranking laid out against the current catalog.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRankingView {
    pub ranked_movies: Vec<Movie>,
    pub unranked_movies: Vec<Movie>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsensusMethod {
    #[default]
    Percentile,
    SkillRating,
}

impl ConsensusMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsensusMethod::Percentile => "percentile",
            ConsensusMethod::SkillRating => "skill_rating",
        }
    }
}

/// A published communal view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunalSnapshot {
    pub generated_at: DateTime<Utc>,
    pub method: ConsensusMethod,
    pub ranking: CommunalRanking,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_serializes_flat_camel_case() {
        let mut aggregate = MovieAggregate::new(Movie::new("m1", "Alien", 1979));
        aggregate.user_rankings.push(RankedObservation {
            user_id: UserId::new("u1"),
            rank_number: 1,
            rank_out_of: 3,
            rank_pct: 0.0,
        });
        aggregate.average_ranking = Some(0.0);

        let json = serde_json::to_value(&aggregate).unwrap();

        assert_eq!(json["id"], "m1");
        assert_eq!(json["title"], "Alien");
        assert_eq!(json["averageRanking"], 0.0);
        assert_eq!(json["userRankings"][0]["rankOutOf"], 3);
        assert!(json.get("trueskillMu").is_none());
    }

    #[test]
    fn test_consensus_method_parses_snake_case() {
        let method: ConsensusMethod = serde_json::from_str("\"skill_rating\"").unwrap();
        assert_eq!(method, ConsensusMethod::SkillRating);
        assert_eq!(ConsensusMethod::default().as_str(), "percentile");
    }
}
