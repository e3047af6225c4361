use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::layers::{LAYER_COUNT, LayerStack, Moisture};
use crate::soil_hydra::SoilProfile;

const MAX_DIFFUSIVITY: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnsaturatedFlowOutput {
    pub moisture: Moisture,
    pub flows: Vector3<f64>, // Flux across each layer boundary, positive upward [in]
}

// Soil water diffusivity from depth-weighted extractable wetness, CERES form
pub fn diffusivity(thet1: f64, depth: f64, thet2: f64, next_depth: f64) -> f64 {
    let wetness = (thet1 * depth + thet2 * next_depth) / (depth + next_depth);
    (0.88 * (35.4 * wetness).exp()).min(MAX_DIFFUSIVITY)
}

/**
Redistributes water between neighbouring layers by unsaturated diffusion.

Pairs are visited top to bottom and each update is applied before the next
pair, so a later pair sees the moisture the earlier one left. The flux is
limited to half the moisture difference so layers never swap order. Only
moves water: the depth-weighted total is unchanged.
*/
pub fn unsaturated_flow(soil: &SoilProfile, layers: &LayerStack, moisture: &Moisture) -> UnsaturatedFlowOutput {
    let depths = layers.inches();
    let ll = soil.vwc_pwp;

    let mut new_moisture = *moisture;
    let mut flows = Vector3::zeros();

    for l in 0..LAYER_COUNT - 1 {
        let m = l + 1;
        let depth = depths[l];
        let next_depth = depths[m];

        let thet1 = (new_moisture[l] - ll).max(0.0);
        let thet2 = (new_moisture[m] - ll).max(0.0);
        let dbar = diffusivity(thet1, depth, thet2, next_depth);
        let mut flow = dbar * (thet2 - thet1) / ((depth + next_depth) * 0.5);

        let difference = new_moisture[m] - new_moisture[l];
        if flow < 0.0 {
            // Downward, bounded by the upper layer's share of the difference
            flow = flow.max(0.5 * difference * depth);
        } else {
            flow = flow.min(0.5 * difference * next_depth);
        }

        flows[l] = flow;
        new_moisture[l] += flow / depth;
        new_moisture[m] -= flow / next_depth;
    }

    UnsaturatedFlowOutput {
        moisture: new_moisture,
        flows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::soil_hydra::test_soils::sandy;
    use approx::assert_abs_diff_eq;

    #[test]
    fn wet_middle_layer_spreads_out() {
        let soil = sandy();
        let layers = LayerStack::standard();
        let moisture = Moisture::new(0.18, 0.2, 0.3, 0.2);
        let result = unsaturated_flow(&soil, &layers, &moisture);

        assert!(result.moisture[0] >= moisture[0]);
        assert!(result.moisture[1] >= moisture[1]);
        assert!(result.moisture[2] <= moisture[2]);
        assert!(result.moisture[3] >= moisture[3]);

        let before = layers.water_depth(&moisture);
        let after = layers.water_depth(&result.moisture);
        assert_abs_diff_eq!(before, after, epsilon = 0.1);
    }

    #[test]
    fn conserves_water_for_any_start() {
        let soil = sandy();
        let layers = LayerStack::standard();
        let starts = [
            Moisture::new(0.0, 0.0, 0.0, 0.0),
            Moisture::new(0.36, 0.1, 0.36, 0.1),
            Moisture::new(0.1, 0.2, 0.3, 0.36),
            Moisture::new(0.36, 0.3, 0.2, 0.1),
            Moisture::new(0.5, 0.0, 0.25, 0.9),
        ];
        for start in starts {
            let result = unsaturated_flow(&soil, &layers, &start);
            assert_abs_diff_eq!(
                layers.water_depth(&start),
                layers.water_depth(&result.moisture),
                epsilon = 1e-9
            );
        }
    }

    #[test]
    fn uniform_profile_does_not_move() {
        let soil = sandy();
        let layers = LayerStack::standard();
        let moisture = Moisture::from_element(0.25);
        let result = unsaturated_flow(&soil, &layers, &moisture);
        assert_eq!(result.flows, Vector3::zeros());
        assert_eq!(result.moisture, moisture);
    }

    #[test]
    fn flux_never_overshoots_midpoint() {
        let soil = sandy();
        let layers = LayerStack::standard();
        let moisture = Moisture::new(0.36, 0.18, 0.18, 0.18);
        let result = unsaturated_flow(&soil, &layers, &moisture);
        // Surface drains downward but stays wetter than the layer below
        assert!(result.flows[0] < 0.0);
        assert!(result.moisture[0] >= result.moisture[1]);
    }

    #[test]
    fn diffusivity_is_capped() {
        assert_eq!(diffusivity(0.3, 1.0, 0.3, 1.0), 100.0);
        assert_abs_diff_eq!(diffusivity(0.0, 1.0, 0.0, 1.0), 0.88, epsilon = 1e-12);
    }
}
