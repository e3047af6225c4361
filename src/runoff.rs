/**
Module for estimating daily surface runoff with the SCS curve number method.

The base curve number comes from the hydrologic soil group and is shifted
between its dry (AMC I) and wet (AMC III) bounds by an antecedent-moisture
index computed over the soil layers within `RUNOFF_AFFECTED_DEPTH`. The index
is accumulated in centimeters of soil; rainfall and runoff depths are inches.
*/
use serde::{Deserialize, Serialize};

use crate::layers::{LayerStack, Moisture};
use crate::soil_hydra::{HydrologicGroup, SoilProfile};

const RUNOFF_AFFECTED_DEPTH: f64 = 45.0; // [cm]
const MIN_CURVE_NUMBER: f64 = 0.99;
const MAX_CURVE_NUMBER: f64 = 100.0;

// Hydrologic condition of straight-row crops in the curve number table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoverCondition {
    Good,
    Poor,
}

/**
Curve number for average antecedent moisture (AMC II), straight-row crops.

Values are the Ceres Maize table.

# Arguments
* `soil_group` - Hydrologic soil group.
* `cover` - Hydrologic condition of the crop cover.
*/
pub fn curve_number(soil_group: HydrologicGroup, cover: CoverCondition) -> f64 {
    match (cover, soil_group) {
        (CoverCondition::Good, HydrologicGroup::A) => 67.0,
        (CoverCondition::Good, HydrologicGroup::B) => 78.0,
        (CoverCondition::Good, HydrologicGroup::C) => 85.0,
        (CoverCondition::Good, HydrologicGroup::D) => 89.0,

        (CoverCondition::Poor, HydrologicGroup::A) => 72.0,
        (CoverCondition::Poor, HydrologicGroup::B) => 81.0,
        (CoverCondition::Poor, HydrologicGroup::C) => 88.0,
        (CoverCondition::Poor, HydrologicGroup::D) => 91.0,
    }
}

// Dry (AMC I) and wet (AMC III) curve numbers from AMC II, SWAT form
pub fn dry_wet_curve_numbers(cn2: f64) -> (f64, f64) {
    let c2 = 100.0 - cn2;
    let cn1dry = cn2 - 20.0 * c2 / (c2 + (2.533 - 0.0636 * c2).exp());
    let cn1dry = cn1dry.max(0.4 * cn2);
    let cn3wet = cn2 * (0.006729 * c2).exp();
    (cn1dry, cn3wet)
}

// Keeps the curve number in (0, 100]
pub fn bound_curve_number(cn: f64) -> f64 {
    if cn <= 0.0 {
        MIN_CURVE_NUMBER
    } else {
        cn.min(MAX_CURVE_NUMBER)
    }
}

// Position of `sw` within [lower, upper]; a collapsed band is all-or-nothing
pub(crate) fn band_fraction(sw: f64, lower: f64, upper: f64) -> f64 {
    let width = upper - lower;
    if width > 0.0 {
        (sw - lower) / width
    } else if sw >= upper {
        1.0
    } else {
        0.0
    }
}

// Runoff result with every intermediate for inspection
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RunoffOutput {
    pub p: f64,      // Precipitation [in]
    pub q: f64,      // Runoff [in]
    pub s: f64,      // Potential retention [in]
    pub ia: f64,     // Initial abstraction [in]
    pub pe: f64,     // Precipitation excess over abstraction [in]
    pub cn: f64,     // Curve number used
    pub cn1dry: f64, // AMC I curve number
    pub cn2: f64,    // AMC II curve number
    pub cn3wet: f64, // AMC III curve number
    pub cnpd: f64,   // Dry-side antecedent index [-]
    pub cnpw: f64,   // Wet-side antecedent index [-]
    pub wf: f64,     // Last layer weighting factor [-]
    pub wx: f64,     // Last cumulative depth weight [-]
}

/**
Calculates the daily runoff depth from precipitation and prior moisture.

# Arguments
- `p` - Precipitation for the day [in].
- `soil` - Soil profile, supplies the soil group and water limits.
- `moisture` - Layer moisture at the start of the day.
- `layers` - Layer geometry.
- `cover` - Curve number table row.
- `cnl` - Curve number override; skips the antecedent-moisture adjustment.

# Returns
Runoff `q` in inches with `0 <= q <= p`, plus intermediates.
*/
pub fn runoff(
    p: f64,
    soil: &SoilProfile,
    moisture: &Moisture,
    layers: &LayerStack,
    cover: CoverCondition,
    cnl: Option<f64>,
) -> RunoffOutput {
    let p = p.max(0.0);
    let cn2 = curve_number(soil.hsg, cover);
    let (cn1dry, cn3wet) = dry_wet_curve_numbers(cn2);

    let sat = soil.vwc_sat;
    let dul = soil.vwc_fc;
    let ll = soil.vwc_pwp;

    let mut cnpw = 0.0;
    let mut cnpd = 0.0;
    let mut wx = 0.0;
    let mut wf = 0.0;

    let cn = match cnl {
        Some(cnl) => cnl,
        None => {
            let mut cum_dep = 0.0;
            let mut xx = 0.0;
            for (layer, &sw) in layers.layers().iter().zip(moisture.iter()) {
                if cum_dep > RUNOFF_AFFECTED_DEPTH {
                    break;
                }
                cum_dep = (cum_dep + layer.dlayr).min(RUNOFF_AFFECTED_DEPTH);
                wx = 1.016 * (1.0 - (-4.16 * cum_dep / RUNOFF_AFFECTED_DEPTH).exp());
                wf = wx - xx;
                xx = wx;
                cnpw += band_fraction(sw, dul, sat) * wf;
                cnpd += band_fraction(sw, ll, dul) * wf;
            }
            cnpw = cnpw.clamp(0.0, 1.0);
            cnpd = cnpd.clamp(0.0, 1.0);

            // A full dry-side index means the soil is past field capacity
            if cnpd >= 1.0 {
                cn2 + (cn3wet - cn2) * cnpw
            } else {
                cn1dry + (cn2 - cn1dry) * cnpd
            }
        }
    };
    let cn = bound_curve_number(cn);

    let s = 1000.0 / cn - 10.0;
    let ia = 0.2 * s;
    let pe = p - ia;
    let q = if pe > 0.0 { pe.powi(2) / (pe + s) } else { 0.0 };

    RunoffOutput {
        p,
        q,
        s,
        ia,
        pe,
        cn,
        cn1dry,
        cn2,
        cn3wet,
        cnpd,
        cnpw,
        wf,
        wx,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::soil_hydra::test_soils::sandy;
    use approx::assert_abs_diff_eq;

    fn run(p: f64, sw: f64) -> RunoffOutput {
        let soil = sandy();
        runoff(
            p,
            &soil,
            &Moisture::from_element(sw),
            &LayerStack::standard(),
            CoverCondition::Good,
            None,
        )
    }

    fn assert_bounds(result: &RunoffOutput) {
        assert!(result.q >= 0.0 && result.q <= result.p, "q = {}", result.q);
        assert!(
            result.cn >= result.cn1dry - 1e-9 && result.cn <= result.cn3wet + 1e-9,
            "cn {} outside [{}, {}]",
            result.cn,
            result.cn1dry,
            result.cn3wet
        );
    }

    #[test]
    fn light_rain_on_moist_soil_does_not_run_off() {
        let result = run(0.5, 0.2);
        assert_abs_diff_eq!(result.cn, 51.0, epsilon = 1.0);
        assert_abs_diff_eq!(result.q, 0.0, epsilon = 0.0001);
        assert_bounds(&result);
    }

    #[test]
    fn heavy_rain_on_moist_soil() {
        let result = run(1.5, 0.2);
        assert_abs_diff_eq!(result.cn, 51.0, epsilon = 1.0);
        assert_abs_diff_eq!(result.q, 0.0, epsilon = 0.01);
        assert_bounds(&result);
    }

    #[test]
    fn saturated_soil_uses_wet_curve_number() {
        let soil = sandy();
        let result = run(1.5, soil.vwc_sat);
        assert_abs_diff_eq!(result.cn, 83.0, epsilon = 1.0);
        assert_abs_diff_eq!(result.q, 0.4, epsilon = 0.01);
        assert_bounds(&result);
    }

    #[test]
    fn field_capacity_uses_base_curve_number() {
        let soil = sandy();
        let result = run(1.5, soil.vwc_fc);
        assert_abs_diff_eq!(result.cn, 67.0, epsilon = 1.0);
        assert_abs_diff_eq!(result.q, 0.048, epsilon = 0.01);
        assert_bounds(&result);
    }

    #[test]
    fn bone_dry_soil_uses_dry_curve_number() {
        let result = run(1.5, 0.0);
        assert_abs_diff_eq!(result.cn, 47.0, epsilon = 1.0);
        assert_abs_diff_eq!(result.q, 0.0, epsilon = 0.01);
        assert_eq!(result.cn, result.cn1dry);
        assert_bounds(&result);
    }

    #[test]
    fn runoff_never_exceeds_rain() {
        let soil = sandy();
        for sw in [0.0, 0.1, soil.vwc_pwp, 0.25, soil.vwc_fc, 0.34, soil.vwc_sat, 0.5] {
            for p in [0.0, 0.01, 0.3, 1.0, 3.0, 10.0] {
                assert_bounds(&run(p, sw));
            }
        }
    }

    #[test]
    fn no_rain_no_runoff() {
        let result = run(0.0, 0.35);
        assert_eq!(result.q, 0.0);
        assert!(result.pe <= 0.0);
    }

    #[test]
    fn override_skips_antecedent_moisture() {
        let soil = sandy();
        let result = runoff(
            2.0,
            &soil,
            &Moisture::from_element(0.0),
            &LayerStack::standard(),
            CoverCondition::Good,
            Some(90.0),
        );
        assert_eq!(result.cn, 90.0);
        assert_eq!(result.cnpd, 0.0);
        assert_eq!(result.cnpw, 0.0);
        assert_abs_diff_eq!(result.s, 1000.0 / 90.0 - 10.0, epsilon = 1e-12);
        assert!(result.q > 0.0 && result.q < 2.0);
    }

    #[test]
    fn curve_number_bounds() {
        assert_eq!(bound_curve_number(0.0), 0.99);
        assert_eq!(bound_curve_number(-5.0), 0.99);
        assert_eq!(bound_curve_number(120.0), 100.0);
        assert_eq!(bound_curve_number(75.0), 75.0);
    }

    #[test]
    fn impervious_curve_number_passes_all_rain() {
        let soil = sandy();
        let result = runoff(
            1.2,
            &soil,
            &Moisture::from_element(0.2),
            &LayerStack::standard(),
            CoverCondition::Good,
            Some(100.0),
        );
        assert_abs_diff_eq!(result.q, 1.2, epsilon = 1e-12);
    }

    #[test]
    fn dry_curve_number_is_floored() {
        let (cn1dry, cn3wet) = dry_wet_curve_numbers(67.0);
        assert_abs_diff_eq!(cn1dry, 47.9, epsilon = 0.1);
        assert!(cn3wet > 67.0);
        let (cn1dry, _) = dry_wet_curve_numbers(10.0);
        assert!(cn1dry >= 4.0);
    }

    #[test]
    fn poor_cover_raises_curve_number() {
        for group in [
            HydrologicGroup::A,
            HydrologicGroup::B,
            HydrologicGroup::C,
            HydrologicGroup::D,
        ] {
            assert!(curve_number(group, CoverCondition::Poor) > curve_number(group, CoverCondition::Good));
        }
    }

    #[test]
    fn collapsed_band_is_binary() {
        assert_eq!(band_fraction(0.3, 0.3, 0.3), 1.0);
        assert_eq!(band_fraction(0.2, 0.3, 0.3), 0.0);
        assert_abs_diff_eq!(band_fraction(0.25, 0.2, 0.3), 0.5, epsilon = 1e-12);
    }
}
