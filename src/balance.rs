use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use nalgebra::Vector3;
use rayon::prelude::*;
use serde::{Deserialize, Serialize, Serializer};
use tracing::{debug, info, trace, warn};

use crate::available_water::{AvailableWater, available_water};
use crate::config::ModelConfig;
use crate::error::{BalanceError, Result};
use crate::evapotranspiration::{EvapotranspirationOutput, evapotranspiration};
use crate::infiltration::{InfiltrationOutput, infiltration};
use crate::layers::Moisture;
use crate::runoff::{RunoffOutput, runoff};
use crate::soil_hydra::{FrainParams, SoilProfile};
use crate::unsat_flow::{UnsaturatedFlowOutput, unsaturated_flow};
use crate::weather::{WeatherDay, WeatherSeries};

// One soil on one date, composed from the output of every stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceRecord {
    pub weather: WeatherDay,
    pub lai: f64,          // Leaf area index [-]
    pub infiltration: f64, // Net infiltration, precipitation less runoff [in]
    pub runoff: RunoffOutput,
    pub routing: InfiltrationOutput,
    pub evapotranspiration: EvapotranspirationOutput,
    pub redistribution: UnsaturatedFlowOutput,
    pub available: AvailableWater,
}

impl BalanceRecord {
    pub fn precip(&self) -> f64 {
        self.weather.pcpn
    }

    // Runoff depth [in]
    pub fn q(&self) -> f64 {
        self.runoff.q
    }

    // End-of-day moisture
    pub fn moisture(&self) -> &Moisture {
        &self.redistribution.moisture
    }

    pub fn flows(&self) -> &Vector3<f64> {
        &self.redistribution.flows
    }

    pub fn es(&self) -> f64 {
        self.evapotranspiration.es
    }

    pub fn ep(&self) -> f64 {
        self.evapotranspiration.ep
    }

    pub fn et(&self) -> f64 {
        self.evapotranspiration.et
    }

    pub fn aw(&self) -> f64 {
        self.available.aw
    }
}

pub type SoilSeries = BTreeMap<NaiveDate, BalanceRecord>;

// Result of a run: a series per soil, and the soils that could not be run
#[derive(Debug, Default, Serialize)]
pub struct BalanceOutput {
    pub balances: BTreeMap<String, SoilSeries>,
    #[serde(serialize_with = "errors_as_messages")]
    pub skipped: BTreeMap<String, BalanceError>,
}

fn errors_as_messages<S: Serializer>(
    errors: &BTreeMap<String, BalanceError>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_map(errors.iter().map(|(key, err)| (key, err.to_string())))
}

impl BalanceOutput {
    fn collect(results: impl IntoIterator<Item = (String, Result<SoilSeries>)>) -> Self {
        let mut output = BalanceOutput::default();
        for (key, result) in results {
            match result {
                Ok(series) => {
                    output.balances.insert(key, series);
                }
                Err(err) => {
                    warn!(soil = %key, error = %err, "soil removed from the run");
                    output.skipped.insert(key, err);
                }
            }
        }
        output
    }
}

// State carried from one day into the next
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreviousDay {
    pub moisture: Moisture,
    pub aw: f64,
}

impl PreviousDay {
    fn from_record(record: &BalanceRecord) -> Self {
        PreviousDay {
            moisture: *record.moisture(),
            aw: record.aw(),
        }
    }
}

/**
Daily soil water balance driver.

Holds the run configuration; soils and weather are passed per call so one
driver can serve many runs. Each soil is simulated independently.
*/
#[derive(Debug, Clone, Default)]
pub struct WaterBalance {
    config: ModelConfig,
}

impl WaterBalance {
    pub fn new(config: ModelConfig) -> Result<Self> {
        config.validate()?;
        Ok(WaterBalance { config })
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    // Uniform moisture at the frain-derived fraction of available water
    pub fn initial_state(&self, soil: &SoilProfile, frain: &FrainParams) -> PreviousDay {
        let moisture = Moisture::from_element(soil.initial_moisture(frain));
        let available = available_water(soil, &self.config.layers, &moisture);
        trace!(?available, "initial available water");
        PreviousDay {
            moisture,
            aw: available.aw,
        }
    }

    /**
    Runs one day's pipeline for one soil.

    Stages run in a fixed order, each consuming the moisture the previous
    one produced: runoff, infiltration, evapotranspiration, unsaturated
    flow, available water.
    */
    pub fn step(
        &self,
        soil: &SoilProfile,
        previous: &PreviousDay,
        date: NaiveDate,
        weather: &WeatherDay,
    ) -> BalanceRecord {
        let config = &self.config;
        let layers = &config.layers;

        let runoff = runoff(
            weather.pcpn,
            soil,
            &previous.moisture,
            layers,
            config.cover,
            config.cnl,
        );
        trace!(?runoff, "runoff");
        let winf = (weather.pcpn - runoff.q).max(0.0);

        let routing = infiltration(soil, layers, &previous.moisture, winf);
        trace!(?routing, "infiltration");

        let lai = config.canopy.leaf_area_index(date.ordinal());
        let et = evapotranspiration(
            soil,
            config,
            &routing.moisture,
            weather,
            lai,
            winf,
            previous.aw,
        );
        trace!(?et, "evapotranspiration");

        let redistribution = unsaturated_flow(soil, layers, &et.moisture);
        trace!(?redistribution, "unsaturated flow");

        let available = available_water(soil, layers, &redistribution.moisture);
        trace!(?available, "available water");

        BalanceRecord {
            weather: *weather,
            lai,
            infiltration: winf,
            runoff,
            routing,
            evapotranspiration: et,
            redistribution,
            available,
        }
    }

    /**
    Simulates one soil over every date from the first to the last in
    `weather`.

    A date without weather produces no record, and the day after it starts
    again from the initial moisture.
    */
    pub fn simulate_soil(
        &self,
        key: &str,
        soil: &SoilProfile,
        weather: &WeatherSeries,
    ) -> Result<SoilSeries> {
        let frain = soil.validate(key)?;
        info!(soil = key, "running water balance");

        let mut series = SoilSeries::new();
        let (Some(&first), Some(&last)) = (weather.keys().next(), weather.keys().next_back())
        else {
            return Ok(series);
        };

        let mut previous: Option<(NaiveDate, PreviousDay)> = None;
        for date in first.iter_days().take_while(|date| *date <= last) {
            let Some(day) = weather.get(&date) else {
                info!(soil = key, %date, "weather missing, skipping date");
                continue;
            };
            debug!(soil = key, %date, doy = date.ordinal(), "processing");

            let state = match previous {
                Some((prev_date, state)) if date.pred_opt() == Some(prev_date) => state,
                _ => {
                    info!(soil = key, %date, "(re)initializing soil moisture");
                    self.initial_state(soil, frain)
                }
            };

            let record = self.step(soil, &state, date, day);
            previous = Some((date, PreviousDay::from_record(&record)));
            series.insert(date, record);
        }

        Ok(series)
    }

    // Soils one after another
    pub fn run(&self, soils: &BTreeMap<String, SoilProfile>, weather: &WeatherSeries) -> BalanceOutput {
        BalanceOutput::collect(
            soils
                .iter()
                .map(|(key, soil)| (key.clone(), self.simulate_soil(key, soil, weather))),
        )
    }

    // Soils spread over the rayon pool; same output as `run`
    pub fn run_parallel(
        &self,
        soils: &BTreeMap<String, SoilProfile>,
        weather: &WeatherSeries,
    ) -> BalanceOutput {
        let results: Vec<(String, Result<SoilSeries>)> = soils
            .par_iter()
            .map(|(key, soil)| (key.clone(), self.simulate_soil(key, soil, weather)))
            .collect();
        BalanceOutput::collect(results)
    }
}
