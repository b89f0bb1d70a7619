use serde::{Deserialize, Serialize};

use super::models::AnalysisModel;
use crate::replay::models::ReplayModel;

/// An analysis with the replay it was derived from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisDetail {
    #[serde(flatten)]
    pub analysis: AnalysisModel,
    pub replay: Option<ReplayModel>,
}
