use serde::{Deserialize, Serialize};

use crate::config::RiskBand;
use crate::types::RiskPercentage;

/// Linear map between the 1-100 risk scale and a target portfolio std.
///
/// Neither direction clamps or rounds; callers decide what to do with values
/// outside the band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskTargetMapper {
    band: RiskBand,
}

impl Default for RiskTargetMapper {
    fn default() -> Self {
        RiskTargetMapper::new(RiskBand::default())
    }
}

impl RiskTargetMapper {
    pub fn new(band: RiskBand) -> Self {
        RiskTargetMapper { band }
    }

    fn slope(&self) -> f64 {
        (self.band.max_std - self.band.min_std) / 99.0
    }

    /// `min_std + (risk - 1) * (max_std - min_std) / 99`
    pub fn target_std(&self, risk: RiskPercentage) -> f64 {
        self.band.min_std + (risk - 1.0) * self.slope()
    }

    /// `1 + (std - min_std) * 99 / (max_std - min_std)`
    pub fn risk_percentage(&self, std: f64) -> RiskPercentage {
        1.0 + (std - self.band.min_std) / self.slope()
    }
}
