use serde::{Deserialize, Serialize};

use crate::error::{BalanceError, Result};

// Seasonal leaf area schedule for a generic row crop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanopyConfig {
    pub planting: u32,    // Day of year growth begins
    pub growth_days: u32, // Days from planting to full canopy
    pub harvest: u32,     // Day of year canopy is removed
    pub max_lai: f64,     // Full canopy LAI [-]
    pub min_lai: f64,     // Bare/residue LAI [-]
}

impl Default for CanopyConfig {
    fn default() -> Self {
        CanopyConfig {
            planting: 120,
            growth_days: 80,
            harvest: 300,
            max_lai: 5.0,
            min_lai: 0.25,
        }
    }
}

impl CanopyConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        if !(self.min_lai > 0.0 && self.max_lai >= self.min_lai) {
            return Err(BalanceError::InvalidConfig(format!(
                "canopy LAI range [{}, {}] is invalid",
                self.min_lai, self.max_lai
            )));
        }
        if self.growth_days == 0 || self.planting >= self.harvest {
            return Err(BalanceError::InvalidConfig(format!(
                "canopy season planting={} harvest={} growth_days={} is invalid",
                self.planting, self.harvest, self.growth_days
            )));
        }
        Ok(())
    }

    // Leaf area index for a day of year (1-based)
    pub fn leaf_area_index(&self, doy: u32) -> f64 {
        if doy < self.planting || doy > self.harvest {
            self.min_lai
        } else if doy < self.planting.saturating_add(self.growth_days) {
            // Exponential growth from min to max over the growth period
            let rate = (self.max_lai / self.min_lai).powf(1.0 / self.growth_days as f64);
            self.min_lai * rate.powi((doy - self.planting) as i32)
        } else {
            self.max_lai
        }
    }
}
