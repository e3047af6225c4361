use serde::{Deserialize, Serialize};

use crate::layers::{LayerStack, Moisture};

// Ceilings on the share of transpiration drawn from the second and third layers;
// the bottom layer supplies the remainder. The surface layer only evaporates.
const SECOND_LAYER_SHARE: f64 = 0.15;
const THIRD_LAYER_SHARE: f64 = 0.25;

// Root water extraction for one day
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transpiration {
    pub moisture: Moisture, // Moisture after extraction
    pub demand: f64,        // Transpiration allowed by canopy and stress [in]
    pub ep: f64,            // Water actually extracted, ep2 + ep3 + ep4 [in]
    pub ep2: f64,           // From layer 2 [in]
    pub ep3: f64,           // From layer 3 [in]
    pub ep4: f64,           // From layer 4 [in]
}

/**
Water stress multiplier on transpiration [0, 1].

Stress begins once available water falls below half the profile's water
holding capacity. A profile with no capacity cannot transpire.
*/
pub fn water_stress(aw: f64, capacity: f64) -> f64 {
    if capacity <= 0.0 {
        return 0.0;
    }
    (aw / (0.5 * capacity)).clamp(0.0, 1.0)
}

// Canopy-limited transpiration before soil water limits [in]
pub fn potential_transpiration(eo: f64, lai: f64) -> f64 {
    if lai <= 3.0 {
        eo * (1.0 - (-lai).exp())
    } else {
        eo
    }
}

/**
Draws the day's transpiration from the root zone.

`eo` is potential evapotranspiration and `es` the soil evaporation already
taken, so `es + ep` never exceeds `eo`. Each layer gives up at most the
water it holds above the wilting point `ll`.
*/
pub fn transpiration(
    moisture: &Moisture,
    layers: &LayerStack,
    ll: f64,
    eo: f64,
    es: f64,
    lai: f64,
    stress: f64,
) -> Transpiration {
    let mut demand = potential_transpiration(eo, lai).min(eo * stress);
    if demand + es > eo {
        demand = eo - es;
    }
    let demand = demand.max(0.0);

    let depths = layers.inches();
    let extractable = |l: usize| (moisture[l] - ll) * depths[l];

    let ep2 = extractable(1).min(SECOND_LAYER_SHARE * demand).max(0.0);
    let ep3 = extractable(2).min(THIRD_LAYER_SHARE * demand).max(0.0);
    let ep4 = extractable(3).min(demand - ep2 - ep3).max(0.0);

    let mut new_moisture = *moisture;
    new_moisture[1] -= ep2 / depths[1];
    new_moisture[2] -= ep3 / depths[2];
    new_moisture[3] -= ep4 / depths[3];

    Transpiration {
        moisture: new_moisture,
        demand,
        ep: ep2 + ep3 + ep4,
        ep2,
        ep3,
        ep4,
    }
}
