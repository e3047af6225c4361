use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::ModelConfig;
use crate::error::{BalanceError, Result};
use crate::layers::{CM_PER_INCH, LayerStack};

const PARTICLE_DENSITY: f64 = 2.65; // Mineral particle density [g/cm³]

// Hydrologic soil group, drainage class of the whole profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum HydrologicGroup {
    A,
    B,
    C,
    D,
}

impl FromStr for HydrologicGroup {
    type Err = BalanceError;

    // Dual groups such as "A/D" use their first (drained) class
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().chars().next().map(|c| c.to_ascii_uppercase()) {
            Some('A') => Ok(HydrologicGroup::A),
            Some('B') => Ok(HydrologicGroup::B),
            Some('C') => Ok(HydrologicGroup::C),
            Some('D') => Ok(HydrologicGroup::D),
            _ => Err(BalanceError::UnknownSoilGroup(s.to_string())),
        }
    }
}

impl TryFrom<String> for HydrologicGroup {
    type Error = BalanceError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<HydrologicGroup> for String {
    fn from(group: HydrologicGroup) -> Self {
        group.to_string()
    }
}

impl fmt::Display for HydrologicGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            HydrologicGroup::A => "A",
            HydrologicGroup::B => "B",
            HydrologicGroup::C => "C",
            HydrologicGroup::D => "D",
        };
        f.write_str(code)
    }
}

// Volumetric water content limits [cm³/cm³]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaterLimits {
    pub ll: f64,  // Lower limit, wilting point
    pub dul: f64, // Drained upper limit, field capacity
    pub sat: f64, // Saturation
}

/**
Texture-only estimate of the water limits (Saxton et al.).

`sand` and `clay` are percentages by weight. Useful when a survey lacks
measured retention points.
*/
pub fn saxton(sand: f64, clay: f64) -> WaterLimits {
    let sat = 0.332 - 7.251e-4 * sand + 0.1276 * clay.log10();
    let a = (-4.396 - 0.0715 * clay - 4.88e-4 * sand * sand - 4.285e-5 * sand * sand * clay).exp();
    let b = -3.14 - 0.00222 * clay * clay - 3.484e-5 * sand * sand * clay;
    let dul = (0.3333 / a).powf(1.0 / b);
    let ll = (15.0 / a).powf(1.0 / b);
    WaterLimits { ll, dul, sat }
}

// Total pore space from bulk density [-]
pub fn porosity(bulk_density: f64) -> f64 {
    1.0 - bulk_density / PARTICLE_DENSITY
}

// Drainage rate constant SWCON [1/day], bounded to [0, 1]
pub fn drainage_coefficient(porosity: f64, dul: f64) -> f64 {
    if porosity <= 0.0 {
        return 0.0;
    }
    ((porosity - dul) / porosity).clamp(0.0, 1.0)
}

// Fraction of the lower limit the surface layer may dry to by evaporation
pub fn soil_evaporation_fraction(top_thickness_cm: f64) -> f64 {
    (0.9 - 0.00038 * (top_thickness_cm - 30.0).powi(2)).max(0.0)
}

/**
Water-holding parameters that depend on fall rainfall.

`frain` is the precipitation over the last quarter of the previous year
(see [`crate::weather::fall_rain`]); it sets `faw`, the fraction of
available water the profile starts the season with.
*/
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrainParams {
    pub whc1: f64,  // Water holding capacity, upper zone [in]
    pub whc2: f64,  // Water holding capacity, lower zone [in]
    pub faw: f64,   // Initial fraction of available water [-]
    pub depth: f64, // Effective modeled depth [in]
    pub ws1: f64,   // Initial available water, upper zone [in]
    pub ws2: f64,   // Initial available water, lower zone [in]
    pub aw: f64,    // Initial available water, whole profile [in]
    pub awi: f64,   // Available water through the rooting depth [in]
}

impl FrainParams {
    pub fn derive(awc: f64, thickness_cm: f64, frain: f64, config: &ModelConfig) -> Self {
        let whc1 = awc * config.surface_depth / CM_PER_INCH;
        let whc2 = awc * (config.total_depth - config.surface_depth) / CM_PER_INCH;

        let capacity = whc1 + whc2;
        let faw = if capacity > 0.0 {
            (0.3 + 0.7 * frain.max(0.0) / capacity).min(1.0)
        } else {
            1.0
        };

        // Rooting depth is taken as the modeled depth
        let depth = thickness_cm.min(config.total_depth) / CM_PER_INCH;

        let ws1 = faw * whc1;
        let ws2 = faw * whc2;
        FrainParams {
            whc1,
            whc2,
            faw,
            depth,
            ws1,
            ws2,
            aw: ws1 + ws2,
            awi: faw * awc * depth,
        }
    }

    // Whole-profile water holding capacity [in]
    pub fn capacity(&self) -> f64 {
        self.whc1 + self.whc2
    }
}

// Hydraulic description of one soil, flattened to a single horizon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SoilProfile {
    pub hsg: HydrologicGroup,
    pub albedo_dry: f64,     // Dry soil albedo [-]
    pub bulk_density: f64,   // [g/cm³]
    pub organic_matter: f64, // [%]
    pub vwc_sat: f64,        // Saturation [cm³/cm³]
    pub vwc_fc: f64,         // Field capacity [cm³/cm³]
    pub vwc_pwp: f64,        // Wilting point [cm³/cm³]
    pub awc: f64,            // Available water capacity [cm³/cm³]
    pub thickness: f64,      // Surveyed soil thickness [cm]
    pub porosity: f64,       // [-]
    pub swcon: f64,          // Drainage rate constant [1/day]
    pub swef: f64,           // Soil water evaporation fraction [-]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frain: Option<FrainParams>,
}

impl SoilProfile {
    // Builds a profile and derives porosity, SWCON and SWEF from the inputs
    pub fn new(
        hsg: HydrologicGroup,
        limits: WaterLimits,
        awc: f64,
        bulk_density: f64,
        layers: &LayerStack,
    ) -> Self {
        let porosity = porosity(bulk_density);
        SoilProfile {
            hsg,
            albedo_dry: 0.13,
            bulk_density,
            organic_matter: 0.0,
            vwc_sat: limits.sat,
            vwc_fc: limits.dul,
            vwc_pwp: limits.ll,
            awc,
            thickness: layers.total_thickness(),
            porosity,
            swcon: drainage_coefficient(porosity, limits.dul),
            swef: soil_evaporation_fraction(layers.surface().dlayr),
            frain: None,
        }
    }

    pub fn with_albedo_dry(mut self, albedo_dry: f64) -> Self {
        self.albedo_dry = albedo_dry;
        self
    }

    pub fn with_organic_matter(mut self, organic_matter: f64) -> Self {
        self.organic_matter = organic_matter;
        self
    }

    pub fn with_thickness(mut self, thickness: f64) -> Self {
        self.thickness = thickness;
        self
    }

    // Late-assigns the frain-derived parameters; must happen before a run
    pub fn with_frain(mut self, frain: f64, config: &ModelConfig) -> Self {
        self.frain = Some(FrainParams::derive(
            self.awc,
            self.thickness,
            frain,
            config,
        ));
        self
    }

    pub fn limits(&self) -> WaterLimits {
        WaterLimits {
            ll: self.vwc_pwp,
            dul: self.vwc_fc,
            sat: self.vwc_sat,
        }
    }

    // Moisture every layer starts from when the balance is (re)initialized
    pub fn initial_moisture(&self, frain: &FrainParams) -> f64 {
        frain.faw * (self.vwc_fc - self.vwc_pwp) + self.vwc_pwp
    }

    // Checks the profile invariants and returns its frain parameters; `key` only labels the error
    pub fn validate(&self, key: &str) -> Result<&FrainParams> {
        let invalid = |reason: String| BalanceError::InvalidSoil {
            key: key.to_string(),
            reason,
        };

        let values = [
            self.vwc_sat,
            self.vwc_fc,
            self.vwc_pwp,
            self.awc,
            self.swcon,
            self.swef,
            self.albedo_dry,
        ];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(invalid("hydraulic properties must be finite".to_string()));
        }
        if !(self.vwc_sat >= self.vwc_fc && self.vwc_fc >= self.vwc_pwp && self.vwc_pwp >= 0.0) {
            return Err(invalid(format!(
                "expected vwc-sat >= vwc-fc >= vwc-pwp >= 0, got {} / {} / {}",
                self.vwc_sat, self.vwc_fc, self.vwc_pwp
            )));
        }
        if !(0.0..=1.0).contains(&self.swcon) {
            return Err(invalid(format!("swcon {} outside [0, 1]", self.swcon)));
        }

        let frain = self.frain.as_ref().ok_or_else(|| BalanceError::MissingFrain {
            key: key.to_string(),
        })?;
        if !(frain.faw > 0.0 && frain.faw <= 1.0) {
            return Err(invalid(format!("faw {} outside (0, 1]", frain.faw)));
        }
        Ok(frain)
    }
}

// Survey-style record; anything left out is derived as in `SoilProfile::new`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct SoilRecord {
    hsg: HydrologicGroup,
    albedo_dry: f64,
    bulk_density: f64,
    #[serde(default)]
    organic_matter: f64,
    vwc_sat: f64,
    vwc_fc: f64,
    vwc_pwp: f64,
    awc: f64,
    thickness: Option<f64>,
    porosity: Option<f64>,
    swcon: Option<f64>,
    swef: Option<f64>,
}

impl SoilRecord {
    fn into_profile(self, layers: &LayerStack) -> SoilProfile {
        let limits = WaterLimits {
            ll: self.vwc_pwp,
            dul: self.vwc_fc,
            sat: self.vwc_sat,
        };
        let mut soil = SoilProfile::new(self.hsg, limits, self.awc, self.bulk_density, layers)
            .with_albedo_dry(self.albedo_dry)
            .with_organic_matter(self.organic_matter);
        if let Some(thickness) = self.thickness {
            soil.thickness = thickness;
        }
        if let Some(porosity) = self.porosity {
            soil.porosity = porosity;
            soil.swcon = drainage_coefficient(porosity, soil.vwc_fc);
        }
        if let Some(swcon) = self.swcon {
            soil.swcon = swcon;
        }
        if let Some(swef) = self.swef {
            soil.swef = swef;
        }
        soil
    }
}

/**
Parses a TOML table of soils keyed by soil key.

Each entry is completed with derived constants and the frain parameters
for `frain` inches of fall rain.
*/
pub fn profiles_from_toml_str(
    toml_str: &str,
    frain: f64,
    config: &ModelConfig,
) -> Result<BTreeMap<String, SoilProfile>> {
    let records: BTreeMap<String, SoilRecord> = toml::from_str(toml_str)?;
    Ok(records
        .into_iter()
        .map(|(key, record)| {
            let soil = record.into_profile(&config.layers).with_frain(frain, config);
            (key, soil)
        })
        .collect())
}

pub fn profiles_from_file(
    path: impl AsRef<Path>,
    frain: f64,
    config: &ModelConfig,
) -> Result<BTreeMap<String, SoilProfile>> {
    let path = path.as_ref();
    let toml_str = fs::read_to_string(path).map_err(|source| BalanceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    profiles_from_toml_str(&toml_str, frain, config)
}
