use serde::{Deserialize, Serialize};

use crate::layers::{LAYER_COUNT, LayerStack, Moisture};
use crate::soil_hydra::SoilProfile;

// Moisture above field capacity tolerated before a layer drains [cm³/cm³]
const DRAIN_TOLERANCE: f64 = 0.003;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InfiltrationOutput {
    pub moisture: Moisture,                 // Layer moisture after infiltration
    pub flux: f64,                          // Outflow below the profile [in]
    pub drain: f64,                         // Drainage from the bottom layer [in]
    pub layer_drainage: [f64; LAYER_COUNT], // Drainage out of each layer [in]
}

/**
Cascades net infiltration `winf` [in] down the layer stack.

Each layer takes what it can hold; water above field capacity drains at
the soil's SWCON rate and, together with any saturation excess, becomes the
flux into the layer below. What leaves the bottom layer is deep drainage.
*/
pub fn infiltration(
    soil: &SoilProfile,
    layers: &LayerStack,
    moisture: &Moisture,
    winf: f64,
) -> InfiltrationOutput {
    let sat = soil.vwc_sat;
    let fc = soil.vwc_fc;
    let swcon = soil.swcon;

    let mut new_moisture = *moisture;
    let mut layer_drainage = [0.0; LAYER_COUNT];
    let mut flux = winf.max(0.0);

    for (l, layer) in layers.layers().iter().enumerate() {
        let depth = layer.inches();
        let hold = (sat - new_moisture[l]) * depth;

        if flux <= hold {
            new_moisture[l] += flux / depth;
            let drain = if new_moisture[l] > fc + DRAIN_TOLERANCE {
                (new_moisture[l] - fc) * swcon * depth
            } else {
                0.0
            };
            new_moisture[l] -= drain / depth;
            layer_drainage[l] = drain;
            flux = drain;
        } else {
            // Saturation excess; also catches a layer that came in above saturation
            let drain = (sat - fc) * swcon * depth;
            new_moisture[l] = sat - drain / depth;
            layer_drainage[l] = drain;
            flux = flux - hold + drain;
        }
    }

    InfiltrationOutput {
        moisture: new_moisture,
        flux,
        drain: layer_drainage[LAYER_COUNT - 1],
        layer_drainage,
    }
}
