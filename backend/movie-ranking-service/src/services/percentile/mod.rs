/// Percentile Aggregation
///
/// Merges every user's ordering into one communal ordering by averaging the
/// normalized position (`rank_pct`) each user gave a movie.
///
/// # Workflow
/// 1. One empty aggregate per catalog movie
/// 2. Replay each user ranking, attaching an observation to every movie it names
/// 3. Split into ranked / unranked
/// 4. Ranked ascending by mean percentile, unranked by title
use crate::models::{
    CommunalRanking, Movie, MovieAggregate, MovieId, RankedObservation, UserRanking,
};
use crate::utils::{mean, rank_percentile};
use std::collections::{HashMap, HashSet};
use tracing::debug;

#[derive(Debug, Clone, Copy, Default)]
pub struct RankPercentileAggregator;

impl RankPercentileAggregator {
    pub fn new() -> Self {
        Self
    }

    pub fn aggregate(&self, catalog: &[Movie], rankings: &[UserRanking]) -> CommunalRanking {
        let mut aggregates: Vec<MovieAggregate> =
            catalog.iter().cloned().map(MovieAggregate::new).collect();
        let index: HashMap<&MovieId, usize> = catalog
            .iter()
            .enumerate()
            .map(|(i, movie)| (&movie.id, i))
            .collect();

        let mut contributing_user_ids = Vec::with_capacity(rankings.len());

        for ranking in rankings {
            contributing_user_ids.push(ranking.user_id.clone());

            let rank_out_of = ranking.len();
            let mut seen: HashSet<&MovieId> = HashSet::with_capacity(rank_out_of);

            for (position, movie_id) in ranking.movie_ids.iter().enumerate() {
                if !seen.insert(movie_id) {
                    continue;
                }

                // Dangling references are dropped: the catalog may have shrunk
                // since this ranking was submitted.
                let Some(&slot) = index.get(movie_id) else {
                    debug!(
                        user_id = %ranking.user_id,
                        movie_id = %movie_id,
                        "Dropping ranking entry absent from catalog"
                    );
                    continue;
                };

                aggregates[slot].user_rankings.push(RankedObservation {
                    user_id: ranking.user_id.clone(),
                    rank_number: position + 1,
                    rank_out_of,
                    rank_pct: rank_percentile(position, rank_out_of),
                });
            }
        }

        let (mut ranked_movies, mut unranked_movies): (Vec<_>, Vec<_>) =
            aggregates.into_iter().partition(MovieAggregate::is_ranked);

        for aggregate in &mut ranked_movies {
            aggregate.average_ranking = mean(aggregate.user_rankings.iter().map(|o| o.rank_pct));
        }

        // Stable sorts: ties keep catalog order.
        ranked_movies.sort_by(|a, b| {
            a.average_ranking
                .unwrap_or(f64::MAX)
                .total_cmp(&b.average_ranking.unwrap_or(f64::MAX))
        });
        sort_by_title(&mut unranked_movies, |aggregate| aggregate.movie.title.as_str());

        CommunalRanking {
            ranked_movies,
            unranked_movies,
            contributing_user_ids,
        }
    }
}

/// Case-insensitive title order, stable on ties.
pub(crate) fn sort_by_title<T>(items: &mut [T], title: impl Fn(&T) -> &str) {
    items.sort_by_cached_key(|item| title(item).to_lowercase());
}
