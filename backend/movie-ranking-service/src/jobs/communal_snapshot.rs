// ============================================
// Communal Snapshot Job
// ============================================
//
// Recomputes the communal ranking and publishes it for readers that should
// not pay for aggregation on every request.
//
// Workflow:
// 1. Fetch catalog + all rankings through the service
// 2. Aggregate with the configured consensus method
// 3. Save the result as the latest CommunalSnapshot
//
// Runs once (CronJob) or on a fixed interval (long-lived process).

use crate::config::{Config, StoreBackend};
use crate::models::{CommunalSnapshot, ConsensusMethod};
use crate::services::communal::CommunalRankingService;
use crate::services::store::{InMemoryStore, RedisStore, SnapshotStore};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{error, info, warn};

#[derive(Debug, Clone)]
pub struct CommunalSnapshotConfig {
    pub method: ConsensusMethod,
    /// Exit after one pass instead of looping
    pub run_once: bool,
    pub interval_secs: u64,
}

impl Default for CommunalSnapshotConfig {
    fn default() -> Self {
        Self {
            method: ConsensusMethod::default(),
            run_once: true,
            interval_secs: 300,
        }
    }
}

impl CommunalSnapshotConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            method: config.aggregation.method,
            run_once: config.snapshot.run_once,
            interval_secs: config.snapshot.interval_secs,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SnapshotJobStats {
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub passes: u32,
    pub failed_passes: u32,
    pub ranked_movies: usize,
    pub unranked_movies: usize,
    pub contributing_users: usize,
    pub total_duration_ms: u64,
}

pub struct CommunalSnapshotJob {
    config: CommunalSnapshotConfig,
    service: Arc<CommunalRankingService>,
    snapshots: Arc<dyn SnapshotStore>,
}

impl CommunalSnapshotJob {
    pub fn new(
        config: CommunalSnapshotConfig,
        service: Arc<CommunalRankingService>,
        snapshots: Arc<dyn SnapshotStore>,
    ) -> Self {
        Self {
            config,
            service,
            snapshots,
        }
    }

    /// Run passes until `run_once` stops the loop. A failed pass is logged and
    /// retried on the next interval; with `run_once` the error is returned.
    pub async fn run(&self) -> anyhow::Result<SnapshotJobStats> {
        let mut totals = SnapshotJobStats {
            started_at: Some(Utc::now()),
            ..Default::default()
        };

        loop {
            match self.run_single_pass().await {
                Ok(stats) => {
                    info!(
                        ranked = stats.ranked_movies,
                        unranked = stats.unranked_movies,
                        users = stats.contributing_users,
                        duration_ms = stats.total_duration_ms,
                        "Communal snapshot pass completed"
                    );
                    totals.passes += 1;
                    totals.ranked_movies = stats.ranked_movies;
                    totals.unranked_movies = stats.unranked_movies;
                    totals.contributing_users = stats.contributing_users;
                    totals.total_duration_ms += stats.total_duration_ms;
                }
                Err(e) if !self.config.run_once => {
                    totals.failed_passes += 1;
                    error!(error = %e, "Communal snapshot pass failed");
                }
                Err(e) => return Err(e),
            }

            if self.config.run_once {
                totals.completed_at = Some(Utc::now());
                return Ok(totals);
            }

            info!(
                interval_secs = self.config.interval_secs,
                "Sleeping until next pass"
            );
            sleep(Duration::from_secs(self.config.interval_secs)).await;
        }
    }

    pub async fn run_single_pass(&self) -> anyhow::Result<SnapshotJobStats> {
        let start_time = Instant::now();
        let started_at = Utc::now();

        info!(method = self.config.method.as_str(), "Starting communal snapshot pass");

        let ranking = self.service.communal_ranking_with(self.config.method).await?;
        let snapshot = CommunalSnapshot {
            generated_at: started_at,
            method: self.config.method,
            ranking,
        };
        self.snapshots.save_snapshot(&snapshot).await?;

        Ok(SnapshotJobStats {
            started_at: Some(started_at),
            completed_at: Some(Utc::now()),
            passes: 1,
            failed_passes: 0,
            ranked_movies: snapshot.ranking.ranked_movies.len(),
            unranked_movies: snapshot.ranking.unranked_movies.len(),
            contributing_users: snapshot.ranking.contributing_user_ids.len(),
            total_duration_ms: start_time.elapsed().as_millis() as u64,
        })
    }
}

/// Entry point for running the snapshot job as a standalone process
pub async fn run_communal_snapshot_job(config: &Config) -> anyhow::Result<SnapshotJobStats> {
    info!(
        service = %config.service.service_name,
        backend = ?config.store_backend,
        "Initializing communal snapshot job"
    );

    let job_config = CommunalSnapshotConfig::from_config(config);
    let rating_model = config.aggregation.rating_model();

    let job = match config.store_backend {
        StoreBackend::Redis => {
            let client = redis::Client::open(config.redis.url.as_str())?;
            let store = Arc::new(RedisStore::new(client).with_key_prefix(&config.redis.key_prefix));
            let service = CommunalRankingService::from_store(store.clone())
                .with_method(config.aggregation.method)
                .with_rating_model(rating_model);
            CommunalSnapshotJob::new(job_config, Arc::new(service), store)
        }
        StoreBackend::Memory => {
            warn!("Memory backend starts empty; the published snapshot will be empty");
            let store = Arc::new(InMemoryStore::new());
            let service = CommunalRankingService::from_store(store.clone())
                .with_method(config.aggregation.method)
                .with_rating_model(rating_model);
            CommunalSnapshotJob::new(job_config, Arc::new(service), store)
        }
    };

    let stats = job.run().await?;

    info!(
        passes = stats.passes,
        failed = stats.failed_passes,
        ranked = stats.ranked_movies,
        "Communal snapshot job completed"
    );

    Ok(stats)
}
