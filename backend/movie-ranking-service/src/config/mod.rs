use crate::models::ConsensusMethod;
use crate::services::skill_rating::{rating, RatingModel};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment: {0}")]
    Env(#[from] envy::Error),

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub service: ServiceConfig,
    pub redis: RedisConfig,
    pub aggregation: AggregationConfig,
    pub snapshot: SnapshotConfig,
    pub store_backend: StoreBackend,
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub service_name: String,
}

#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: String,
    pub key_prefix: String,
}

#[derive(Debug, Clone)]
pub struct AggregationConfig {
    pub method: ConsensusMethod,
    pub skill_prior_sigma: f64,
    pub skill_beta: f64,
    pub skill_tau: f64,
}

impl AggregationConfig {
    pub fn rating_model(&self) -> RatingModel {
        RatingModel::new(self.skill_prior_sigma, self.skill_beta, self.skill_tau)
    }
}

#[derive(Debug, Clone)]
pub struct SnapshotConfig {
    pub run_once: bool,
    pub interval_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Redis,
    /// Smoke-test mode: the job runs against a fresh, empty process-local
    /// store and publishes an empty snapshot.
    Memory,
}

/// Flat view of the process environment; every key is optional.
#[derive(Debug, Deserialize)]
struct RawEnv {
    #[serde(default = "default_service_name")]
    service_name: String,
    #[serde(default = "default_redis_url")]
    redis_url: String,
    #[serde(default = "default_redis_key_prefix")]
    redis_key_prefix: String,
    #[serde(default)]
    consensus_method: ConsensusMethod,
    #[serde(default = "default_skill_prior_sigma")]
    skill_prior_sigma: f64,
    #[serde(default = "default_skill_beta")]
    skill_beta: f64,
    #[serde(default = "default_skill_tau")]
    skill_tau: f64,
    #[serde(default = "default_snapshot_run_once")]
    snapshot_run_once: bool,
    #[serde(default = "default_snapshot_interval_secs")]
    snapshot_interval_secs: u64,
    #[serde(default)]
    store_backend: StoreBackend,
}

fn default_service_name() -> String {
    "movie-ranking-service".to_string()
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_redis_key_prefix() -> String {
    "movie_ranking".to_string()
}

fn default_skill_prior_sigma() -> f64 {
    rating::DEFAULT_SIGMA
}

fn default_skill_beta() -> f64 {
    rating::DEFAULT_BETA
}

fn default_skill_tau() -> f64 {
    rating::DEFAULT_TAU
}

fn default_snapshot_run_once() -> bool {
    true
}

fn default_snapshot_interval_secs() -> u64 {
    300
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    /// Build from explicit key/value pairs; used by `from_env` and tests.
    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let raw: RawEnv = envy::from_iter(vars)?;

        for (field, value) in [
            ("SKILL_PRIOR_SIGMA", raw.skill_prior_sigma),
            ("SKILL_BETA", raw.skill_beta),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("must be a positive number, got {}", value),
                });
            }
        }
        if !(raw.skill_tau.is_finite() && raw.skill_tau >= 0.0) {
            return Err(ConfigError::Invalid {
                field: "SKILL_TAU",
                reason: format!("must be non-negative, got {}", raw.skill_tau),
            });
        }
        if !raw.snapshot_run_once && raw.snapshot_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "SNAPSHOT_INTERVAL_SECS",
                reason: "must be positive when SNAPSHOT_RUN_ONCE is false".to_string(),
            });
        }

        Ok(Config {
            service: ServiceConfig {
                service_name: raw.service_name,
            },
            redis: RedisConfig {
                url: raw.redis_url,
                key_prefix: raw.redis_key_prefix,
            },
            aggregation: AggregationConfig {
                method: raw.consensus_method,
                skill_prior_sigma: raw.skill_prior_sigma,
                skill_beta: raw.skill_beta,
                skill_tau: raw.skill_tau,
            },
            snapshot: SnapshotConfig {
                run_once: raw.snapshot_run_once,
                interval_secs: raw.snapshot_interval_secs,
            },
            store_backend: raw.store_backend,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_vars(Vec::new()).unwrap();

        assert_eq!(config.service.service_name, "movie-ranking-service");
        assert_eq!(config.redis.url, "redis://localhost:6379");
        assert_eq!(config.redis.key_prefix, "movie_ranking");
        assert_eq!(config.aggregation.method, ConsensusMethod::Percentile);
        assert_eq!(config.store_backend, StoreBackend::Redis);
        assert!(config.snapshot.run_once);
        assert_eq!(config.aggregation.rating_model(), RatingModel::default());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_vars(vars(&[
            ("CONSENSUS_METHOD", "skill_rating"),
            ("STORE_BACKEND", "memory"),
            ("SKILL_BETA", "2.5"),
            ("SNAPSHOT_RUN_ONCE", "false"),
            ("SNAPSHOT_INTERVAL_SECS", "60"),
        ]))
        .unwrap();

        assert_eq!(config.aggregation.method, ConsensusMethod::SkillRating);
        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert_eq!(config.aggregation.skill_beta, 2.5);
        assert!(!config.snapshot.run_once);
        assert_eq!(config.snapshot.interval_secs, 60);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            Config::from_vars(vars(&[("SKILL_BETA", "0")])),
            Err(ConfigError::Invalid { field: "SKILL_BETA", .. })
        ));
        assert!(matches!(
            Config::from_vars(vars(&[("CONSENSUS_METHOD", "elo")])),
            Err(ConfigError::Env(_))
        ));
        assert!(matches!(
            Config::from_vars(vars(&[
                ("SNAPSHOT_RUN_ONCE", "false"),
                ("SNAPSHOT_INTERVAL_SECS", "0"),
            ])),
            Err(ConfigError::Invalid { .. })
        ));
    }
}
