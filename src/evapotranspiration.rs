use serde::{Deserialize, Serialize};

use crate::config::ModelConfig;
use crate::layers::Moisture;
use crate::root_uptake::{self, Transpiration};
use crate::soil_hydra::SoilProfile;
use crate::weather::{WeatherDay, fahrenheit_to_celsius};

const BARE_SOIL_ALBEDO: f64 = 0.23;

// Priestley-Taylor style potential rates for the day
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PotentialEvaporation {
    pub td: f64,     // 60/40 weighted mean temperature [°C]
    pub albedo: f64, // Canopy-weighted surface albedo [-]
    pub eeq: f64,    // Equilibrium evaporation [in]
    pub eo: f64,     // Potential evapotranspiration [in]
    pub eos: f64,    // Potential soil evaporation [in]
}

pub fn potential_evaporation(weather: &WeatherDay, lai: f64, albedo_dry: f64) -> PotentialEvaporation {
    let maxt = fahrenheit_to_celsius(weather.maxt);
    let mint = fahrenheit_to_celsius(weather.mint);

    let td = 0.6 * maxt + 0.4 * mint;
    let albedo = BARE_SOIL_ALBEDO - (BARE_SOIL_ALBEDO - albedo_dry) * (-0.75 * lai).exp();

    // IFSM coefficients are hourly; divided by 24 for a daily rate
    let eeq = (weather.ghi * (0.00488 - 0.00437 * albedo) * (td + 29.0) / 25.4 / 24.0).max(0.0);
    let eo = if maxt > 35.0 {
        eeq * ((maxt - 35.0) * 0.05 + 1.1)
    } else if maxt < 5.0 {
        eeq * 0.01 * (0.18 * (maxt + 20.0)).exp()
    } else {
        eeq * 1.1
    };

    // Non-forage crop
    let eos = if lai < 1.0 {
        eo * (1.0 - 0.43 * lai)
    } else {
        eo / 1.1 * (-0.4 * lai).exp()
    };

    PotentialEvaporation {
        td,
        albedo,
        eeq,
        eo,
        eos,
    }
}

// Two-stage (Ritchie) soil evaporation state and result
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SoilEvaporation {
    pub es: f64,          // Soil evaporation before water limits [in]
    pub swr: f64,         // Relative wetness of the surface layer [-]
    pub sumes1: f64,      // Cumulative stage 1 evaporation [in]
    pub sumes2: f64,      // Cumulative stage 2 evaporation [in]
    pub t: f64,           // Days into stage 2
    pub escf: f64,        // Residue cover factor [-]
    pub esx: Option<f64>, // Stage 2 evaporation bounded by rewetting [in]
    pub winf: f64,        // Infiltration left after refilling stage 2 [in]
}

/**
Soil evaporation from the two-stage drying model.

The surface layer's relative wetness places the soil in stage 1 (energy
limited, up to `u` inches) or stage 2 (diffusion limited, growing with the
square root of time). Infiltration `winf` resets the stage accounting before
the day's evaporation is taken.

# Arguments
- `m0` - Surface layer moisture.
- `ll`, `dul` - Wilting point and field capacity.
- `eos` - Potential soil evaporation [in].
- `winf` - Net infiltration [in].
- `u` - Upper limit of stage 1 evaporation [in].
- `residue_cover` - Fraction of the surface under residue.
*/
pub fn soil_evaporation(
    m0: f64,
    ll: f64,
    dul: f64,
    eos: f64,
    winf: f64,
    u: f64,
    residue_cover: f64,
) -> SoilEvaporation {
    let mut winf = winf.max(0.0);
    let escf = 1.0 - 0.5 * residue_cover;
    let swr = if dul > ll { ((m0 - ll) / (dul - ll)).max(0.0) } else { 1.0 };

    let (mut sumes1, mut sumes2, mut t) = if swr >= 1.0 {
        (0.0, 0.0, 0.0)
    } else if swr >= 0.9 {
        ((100.0 - swr * 100.0) / 25.4, 0.0, 0.0)
    } else {
        let sumes2 = (25.0 - 27.8 * swr).max(0.0) / 25.4;
        (u, sumes2, (sumes2 / 3.5).powi(2))
    };

    let mut esx = None;
    let es = if sumes1 >= u {
        if winf >= sumes2 {
            // Rain refilled stage 2; restart in stage 1
            winf -= sumes2;
            sumes1 = if winf > u { 0.0 } else { u - winf };
            t = 0.0;
            sumes1 += eos;
            if sumes1 > u { eos - 0.4 * (sumes1 - u) } else { eos }
        } else {
            t += 1.0;
            let mut es = (3.5 * t).sqrt() - sumes2;
            if winf > 0.0 {
                let mut x = 0.8 * winf;
                if x <= es {
                    x = es + winf;
                }
                es = eos.min(x);
                esx = Some(x);
            } else if es > eos {
                es = eos;
            }
            sumes2 += es - winf;
            t = (sumes2 / 3.5).powi(2);
            es
        }
    } else {
        sumes1 = if winf >= sumes1 { eos } else { sumes1 - winf + eos };
        if sumes1 > u {
            escf * (eos - 0.4 * (sumes1 - u))
        } else {
            escf * eos
        }
    };

    SoilEvaporation {
        es: es.max(0.0),
        swr,
        sumes1,
        sumes2,
        t,
        escf,
        esx,
        winf,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvapotranspirationOutput {
    pub moisture: Moisture, // Moisture after evaporation and transpiration
    pub es: f64,            // Soil evaporation [in]
    pub ep: f64,            // Transpiration [in]
    pub et: f64,            // es + ep [in]
    pub es1: Option<f64>,   // Evaporation returned to keep the surface above ll * swef [in]
    pub potential: PotentialEvaporation,
    pub evaporation: SoilEvaporation,
    pub transpiration: Transpiration,
}

/**
Splits the day's evaporative demand between the soil surface and the crop.

`moisture` is the post-infiltration state, `winf` the net infiltration and
`aw` the available water carried from the previous day.
*/
pub fn evapotranspiration(
    soil: &SoilProfile,
    config: &ModelConfig,
    moisture: &Moisture,
    weather: &WeatherDay,
    lai: f64,
    winf: f64,
    aw: f64,
) -> EvapotranspirationOutput {
    let ll = soil.vwc_pwp;
    let dul = soil.vwc_fc;
    let layers = &config.layers;

    let potential = potential_evaporation(weather, lai, soil.albedo_dry);
    let evaporation = soil_evaporation(
        moisture[0],
        ll,
        dul,
        potential.eos,
        winf,
        config.stage_one_limit(),
        config.residue_cover,
    );

    // Surface layer can lose 30% of its plant-available range plus anything above field capacity
    let first = layers.surface().inches();
    let mut es = evaporation
        .es
        .min((0.3 * (dul - ll) + (moisture[0] - dul).max(0.0)) * first);

    let mut new_moisture = *moisture;
    new_moisture[0] -= es / first;

    let floor = ll * soil.swef;
    let mut es1 = None;
    if new_moisture[0] < floor {
        let deficit = (floor - new_moisture[0]) * first;
        new_moisture[0] = floor;
        es = (es - deficit).max(0.0);
        es1 = Some(deficit);
    }

    let capacity = soil.frain.map_or(0.0, |f| f.capacity());
    let stress = root_uptake::water_stress(aw, capacity);
    let transpiration = root_uptake::transpiration(
        &new_moisture,
        layers,
        ll,
        potential.eo,
        es,
        lai,
        stress,
    );
    new_moisture = transpiration.moisture;

    let ep = transpiration.ep;
    EvapotranspirationOutput {
        moisture: new_moisture,
        es,
        ep,
        et: es + ep,
        es1,
        potential,
        evaporation,
        transpiration,
    }
}
