use serde::{Deserialize, Serialize};

use crate::layers::{LayerStack, Moisture};
use crate::soil_hydra::SoilProfile;

// Plant-available water above the wilting point
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AvailableWater {
    pub aw: f64,       // Whole profile, ws1 + ws2 [in]
    pub asm1: f64,     // Upper three layers, per inch of soil [-]
    pub asm: f64,      // Whole profile, per inch of soil [-]
    pub ws1: f64,      // Upper three layers [in]
    pub ws2: f64,      // Bottom layer [in]
    pub extra_aw: f64, // Water beyond the rooting-depth value awi [in]
}

/**
Summarizes the available water held in `moisture`.

The surface and bottom layers are floored at zero; the two middle layers
are not, so `ws1` and `aw` go negative when those layers sit below the
wilting point.
*/
pub fn available_water(soil: &SoilProfile, layers: &LayerStack, moisture: &Moisture) -> AvailableWater {
    let depths = layers.inches();
    let ll = soil.vwc_pwp;

    let ws1 = (moisture[0] - ll).max(0.0) * depths[0]
        + (moisture[1] - ll) * depths[1]
        + (moisture[2] - ll) * depths[2];
    let ws2 = (moisture[3] - ll).max(0.0) * depths[3];

    let upper = depths[0] + depths[1] + depths[2];
    let aw = ws1 + ws2;
    let awi = soil.frain.map_or(0.0, |f| f.awi);

    AvailableWater {
        aw,
        asm1: ws1 / upper,
        asm: aw / depths.sum(),
        ws1,
        ws2,
        extra_aw: (aw - awi).max(0.0),
    }
}
