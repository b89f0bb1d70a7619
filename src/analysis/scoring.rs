use async_trait::async_trait;
use rand::Rng;
use serde_json::Value;

use crate::rank::LetterRank;
use crate::replay::models::ReplayModel;
use crate::shared::AppError;

/// Raw per-replay counters and score produced by a scorer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplayScore {
    pub ward_score: f64,
    /// Left empty to let the classifier decide
    pub rank: Option<LetterRank>,
    pub wards_placed: i32,
    pub wards_destroyed: i32,
    pub vision_score: i32,
    pub control_wards_placed: i32,
    pub game_stats: Option<Value>,
    pub insights: Option<Value>,
    pub suggestions: Option<Value>,
    pub heatmap_data: Option<Value>,
}

/// Ratios derived from the raw counters
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DerivedMetrics {
    pub wards_per_minute: f64,
    pub vision_control_ratio: f64,
}

impl DerivedMetrics {
    /// Zero durations and zero wards placed leave the matching ratio at 0.
    pub fn compute(wards_placed: i32, wards_destroyed: i32, duration_secs: i32) -> Self {
        let mut metrics = Self::default();
        if duration_secs > 0 {
            metrics.wards_per_minute = wards_placed as f64 / (duration_secs as f64 / 60.0);
        }
        if wards_placed > 0 {
            metrics.vision_control_ratio = wards_destroyed as f64 / wards_placed as f64;
        }
        metrics
    }
}

/// Turns a replay into raw counters and a score.
///
/// The analysis pipeline only depends on this trait, so a real replay-file
/// parser can replace the simulated scorer without touching it.
#[async_trait]
pub trait ReplayScorer: Send + Sync {
    async fn score(&self, replay: &ReplayModel) -> Result<ReplayScore, AppError>;

    fn scorer_name(&self) -> &'static str;
}

/// Stand-in scorer that draws counters at random until replay files are parsed
pub struct SimulatedReplayScorer;

impl SimulatedReplayScorer {
    pub fn new() -> Self {
        Self
    }

    fn roll() -> ReplayScore {
        let mut rng = rand::rng();
        ReplayScore {
            ward_score: rng.random_range(50.0..100.0),
            wards_placed: rng.random_range(10..30),
            wards_destroyed: rng.random_range(5..20),
            vision_score: rng.random_range(20..100),
            control_wards_placed: rng.random_range(3..10),
            ..ReplayScore::default()
        }
    }
}

impl Default for SimulatedReplayScorer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReplayScorer for SimulatedReplayScorer {
    async fn score(&self, _replay: &ReplayModel) -> Result<ReplayScore, AppError> {
        Ok(Self::roll())
    }

    fn scorer_name(&self) -> &'static str {
        "SimulatedReplayScorer"
    }
}

/// Scorer returning a preset result for every replay
pub struct StaticReplayScorer {
    score: ReplayScore,
}

impl StaticReplayScorer {
    pub fn new(score: ReplayScore) -> Self {
        Self { score }
    }
}

#[async_trait]
impl ReplayScorer for StaticReplayScorer {
    async fn score(&self, _replay: &ReplayModel) -> Result<ReplayScore, AppError> {
        Ok(self.score.clone())
    }

    fn scorer_name(&self) -> &'static str {
        "StaticReplayScorer"
    }
}
