use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::canopy::CanopyConfig;
use crate::error::{BalanceError, Result};
use crate::layers::LayerStack;
use crate::runoff::CoverCondition;

/**
Run-wide model settings.

Every field has a default, so a TOML file only needs the keys it changes:

```toml
surface_depth = 15.0
total_depth = 150.0
residue_cover = 0.2

[canopy]
planting = 120
```
*/
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub surface_depth: f64,      // Upper water-holding zone [cm]
    pub total_depth: f64,        // Modeled soil depth [cm]
    pub layers: LayerStack,      // Layer geometry
    pub residue_cover: f64,      // Fraction of surface covered by residue [-]
    pub stage_one_limit_mm: f64, // Upper limit of stage 1 soil evaporation [mm]
    pub cover: CoverCondition,   // Curve number table row
    pub cnl: Option<f64>,        // Crop curve number overriding the soil-group value
    pub canopy: CanopyConfig,
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig {
            surface_depth: 15.0,
            total_depth: 150.0,
            layers: LayerStack::standard(),
            residue_cover: 0.2, // Conventional tillage
            stage_one_limit_mm: 9.0,
            cover: CoverCondition::Good,
            cnl: None,
            canopy: CanopyConfig::default(),
        }
    }
}

impl ModelConfig {
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        let config: ModelConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let toml_str = fs::read_to_string(path).map_err(|source| BalanceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&toml_str)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.surface_depth > 0.0 && self.surface_depth < self.total_depth) {
            return Err(BalanceError::InvalidConfig(format!(
                "surface_depth {} must be positive and shallower than total_depth {}",
                self.surface_depth, self.total_depth
            )));
        }
        if !(0.0..=1.0).contains(&self.residue_cover) {
            return Err(BalanceError::InvalidConfig(format!(
                "residue_cover {} must lie in [0, 1]",
                self.residue_cover
            )));
        }
        if !(self.stage_one_limit_mm > 0.0) {
            return Err(BalanceError::InvalidConfig(format!(
                "stage_one_limit_mm {} must be positive",
                self.stage_one_limit_mm
            )));
        }
        if let Some(cnl) = self.cnl {
            if !(cnl > 0.0 && cnl <= 100.0) {
                return Err(BalanceError::InvalidConfig(format!(
                    "cnl {cnl} must lie in (0, 100]"
                )));
            }
        }
        self.canopy.validate()
    }

    // Stage 1 evaporation limit [in]
    pub fn stage_one_limit(&self) -> f64 {
        self.stage_one_limit_mm / 25.4
    }
}
