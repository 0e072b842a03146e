//! Environment-driven tunables, read once at startup.
//!
//! Uses direct `std::env::var` parsing rather than a separate
//! config-parsing crate, since none of the tunables need more than a
//! parse-or-default.

use crate::report::ScoreWeights;

/// All tunable thresholds and window sizes for the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    pub max_distance_meters: f64,
    pub time_window_days: i64,
    pub t_hard: f64,
    pub t_soft: f64,
    pub weights: ScoreWeights,
    pub deletion_grace_days: i64,
    pub sweeper_period_secs: u64,
    pub d_img: usize,
    pub d_txt: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_distance_meters: 100.0,
            time_window_days: 30,
            t_hard: 0.90,
            t_soft: 0.75,
            weights: ScoreWeights {
                location: 0.3,
                text: 0.3,
                image: 0.3,
                recency: 0.1,
            },
            deletion_grace_days: 10,
            sweeper_period_secs: 24 * 60 * 60,
            d_img: 512,
            d_txt: 100,
        }
    }
}

impl EngineConfig {
    /// Reads every tunable from its environment variable, falling back to
    /// the documented default when unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_distance_meters: env_f64("MAX_DISTANCE_METERS", defaults.max_distance_meters),
            time_window_days: env_i64("TIME_WINDOW_DAYS", defaults.time_window_days),
            t_hard: env_f64("T_HARD", defaults.t_hard),
            t_soft: env_f64("T_SOFT", defaults.t_soft),
            weights: env_weights(defaults.weights),
            deletion_grace_days: env_i64("DELETION_GRACE_DAYS", defaults.deletion_grace_days),
            sweeper_period_secs: env_u64("SWEEPER_PERIOD_SECS", defaults.sweeper_period_secs),
            d_img: env_usize("D_IMG", defaults.d_img),
            d_txt: env_usize("D_TXT", defaults.d_txt),
        }
    }
}

fn env_f64(key: &str, default: f64) -> f64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_i64(key: &str, default: i64) -> i64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_weights(default: ScoreWeights) -> ScoreWeights {
    let Ok(raw) = std::env::var("WEIGHTS") else {
        return default;
    };
    let parts: Vec<f64> = raw.split(',').filter_map(|p| p.trim().parse().ok()).collect();
    if parts.len() != 4 {
        tracing::warn!(
            "WEIGHTS env var must have exactly 4 comma-separated floats, got {:?}; using defaults",
            raw
        );
        return default;
    }
    ScoreWeights {
        location: parts[0],
        text: parts[1],
        image: parts[2],
        recency: parts[3],
    }
}
