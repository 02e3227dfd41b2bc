// ============================================
// Skill Rating Aggregation
// ============================================
//
// Alternative consensus: every user ranking is replayed as one multi-way
// "match" in which position 0 beat position 1 beat position 2 ...
//
// Rating state lives in an explicit ledger folded over the rankings, rebuilt
// from the prior on every pass. Replay order matters: the same rankings in a
// different order can yield different means.

pub mod rating;

pub use rating::{RatingModel, SkillRating};

use super::percentile::RankPercentileAggregator;
use crate::models::{CommunalRanking, Movie, MovieId, UserRanking};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Running ratings for every catalog movie during one aggregation pass
#[derive(Debug, Clone)]
pub struct SkillLedger {
    model: RatingModel,
    ratings: HashMap<MovieId, SkillRating>,
    positions: HashMap<MovieId, usize>,
    rankings_applied: usize,
}

impl SkillLedger {
    /// Every catalog movie starts at the model prior.
    pub fn new(model: RatingModel, catalog: &[Movie]) -> Self {
        let ratings = catalog
            .iter()
            .map(|movie| (movie.id.clone(), model.prior))
            .collect();
        let positions = catalog
            .iter()
            .enumerate()
            .map(|(i, movie)| (movie.id.clone(), i))
            .collect();

        Self {
            model,
            ratings,
            positions,
            rankings_applied: 0,
        }
    }

    /// Apply one user ranking and return the ledger for chaining in a fold.
    pub fn apply(mut self, ranking: &UserRanking) -> Self {
        let mut seen: HashSet<&MovieId> = HashSet::with_capacity(ranking.len());
        let groups: Vec<&MovieId> = ranking
            .movie_ids
            .iter()
            .filter(|id| self.ratings.contains_key(*id) && seen.insert(*id))
            .collect();

        if groups.len() < 2 {
            debug!(
                user_id = %ranking.user_id,
                rateable = groups.len(),
                "Skipping ranking without a pairwise comparison"
            );
            return self;
        }

        let snapshot: Vec<SkillRating> = groups.iter().map(|id| self.ratings[*id]).collect();
        let updated = self.model.rate(&snapshot);

        for (id, rating) in groups.into_iter().zip(updated) {
            self.ratings.insert(id.clone(), rating);
        }
        self.rankings_applied += 1;

        self
    }

    pub fn rating(&self, movie_id: &MovieId) -> Option<SkillRating> {
        self.ratings.get(movie_id).copied()
    }

    /// Index of the movie in the catalog this ledger was seeded from.
    pub fn catalog_position(&self, movie_id: &MovieId) -> Option<usize> {
        self.positions.get(movie_id).copied()
    }

    pub fn rankings_applied(&self) -> usize {
        self.rankings_applied
    }
}

#[derive(Debug, Clone, Default)]
pub struct SkillRatingAggregator {
    model: RatingModel,
    percentile: RankPercentileAggregator,
}

impl SkillRatingAggregator {
    pub fn new(model: RatingModel) -> Self {
        Self {
            model,
            percentile: RankPercentileAggregator::new(),
        }
    }

    /// Replay `rankings` in order against a fresh ledger.
    pub fn rate(&self, catalog: &[Movie], rankings: &[UserRanking]) -> SkillLedger {
        rankings
            .iter()
            .fold(SkillLedger::new(self.model, catalog), SkillLedger::apply)
    }

    /// Percentile aggregation re-sorted by skill: ranked movies descending by
    /// `trueskill_mu`, unranked movies untouched and unscored.
    pub fn aggregate(&self, catalog: &[Movie], rankings: &[UserRanking]) -> CommunalRanking {
        let communal = self.percentile.aggregate(catalog, rankings);
        let ledger = self.rate(catalog, rankings);
        self.apply_ledger(communal, &ledger)
    }

    pub fn apply_ledger(
        &self,
        mut communal: CommunalRanking,
        ledger: &SkillLedger,
    ) -> CommunalRanking {
        for aggregate in &mut communal.ranked_movies {
            aggregate.trueskill_mu = ledger.rating(aggregate.id()).map(|rating| rating.mu);
        }

        // Equal means fall back to catalog order.
        communal.ranked_movies.sort_by(|a, b| {
            b.trueskill_mu
                .unwrap_or(f64::MIN)
                .total_cmp(&a.trueskill_mu.unwrap_or(f64::MIN))
                .then_with(|| {
                    let position =
                        |id: &MovieId| ledger.catalog_position(id).unwrap_or(usize::MAX);
                    position(a.id()).cmp(&position(b.id()))
                })
        });

        debug!(
            ranked = communal.ranked_movies.len(),
            rankings_applied = ledger.rankings_applied(),
            "Applied skill ratings"
        );

        communal
    }
}
