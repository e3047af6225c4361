mod available_water;
mod balance;
mod canopy;
mod config;
mod error;
mod evapotranspiration;
mod infiltration;
mod layers;
mod root_uptake;
mod runoff;
mod soil_hydra;
mod unsat_flow;
mod weather;

pub use available_water::{AvailableWater, available_water};
pub use balance::{BalanceOutput, BalanceRecord, PreviousDay, SoilSeries, WaterBalance};
pub use canopy::CanopyConfig;
pub use config::ModelConfig;
pub use error::{BalanceError, Result};
pub use evapotranspiration::{
    EvapotranspirationOutput, PotentialEvaporation, SoilEvaporation, evapotranspiration,
    potential_evaporation, soil_evaporation,
};
pub use infiltration::{InfiltrationOutput, infiltration};
pub use layers::{CM_PER_INCH, LAYER_COUNT, Layer, LayerStack, Moisture};
pub use root_uptake::{Transpiration, potential_transpiration, transpiration, water_stress};
pub use runoff::{
    CoverCondition, RunoffOutput, bound_curve_number, curve_number, dry_wet_curve_numbers, runoff,
};
pub use soil_hydra::{
    FrainParams, HydrologicGroup, SoilProfile, WaterLimits, drainage_coefficient, porosity,
    profiles_from_file, profiles_from_toml_str, saxton, soil_evaporation_fraction,
};
pub use unsat_flow::{UnsaturatedFlowOutput, diffusivity, unsaturated_flow};
pub use weather::{WeatherDay, WeatherSeries, fahrenheit_to_celsius, fall_rain};

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use chrono::{Days, NaiveDate};
    use std::collections::BTreeMap;

    fn season() -> WeatherSeries {
        let start = NaiveDate::from_ymd_opt(2010, 5, 1).unwrap();
        (0..120u64)
            .map(|i| {
                let date = start + Days::new(i);
                let pcpn = match i % 9 {
                    0 => 1.4,
                    4 => 0.3,
                    _ => 0.0,
                };
                let warm = (i as f64 / 120.0) * 15.0;
                let day = WeatherDay {
                    pcpn,
                    maxt: 70.0 + warm,
                    mint: 50.0 + warm,
                    ghi: 220.0 + warm * 4.0,
                };
                (date, day)
            })
            .collect()
    }

    fn soils() -> BTreeMap<String, SoilProfile> {
        let config = ModelConfig::default();
        let sandy = SoilProfile::new(
            HydrologicGroup::A,
            WaterLimits {
                ll: 0.1745,
                dul: 0.3048,
                sat: 0.3665,
            },
            0.159,
            1.30,
            &config.layers,
        )
        .with_albedo_dry(0.16)
        .with_frain(10.0, &config);
        let clayey = SoilProfile::new(
            HydrologicGroup::D,
            WaterLimits {
                ll: 0.25,
                dul: 0.40,
                sat: 0.48,
            },
            0.15,
            1.2,
            &config.layers,
        )
        .with_albedo_dry(0.12)
        .with_frain(4.0, &config);

        let mut soils = BTreeMap::new();
        soils.insert("sandy".to_string(), sandy);
        soils.insert("clayey".to_string(), clayey);
        soils
    }

    #[test]
    fn season_run_stays_within_physical_bounds() {
        let model = WaterBalance::default();
        let weather = season();
        let soils = soils();
        let output = model.run(&soils, &weather);

        assert!(output.skipped.is_empty());
        for (key, series) in &output.balances {
            let soil = &soils[key];
            assert_eq!(series.len(), weather.len());
            for (date, record) in series {
                assert!(record.q() >= 0.0 && record.q() <= record.precip(), "{key} {date}");
                assert!(record.es() >= 0.0 && record.ep() >= 0.0 && record.et() >= 0.0);
                for m in record.moisture().iter() {
                    assert!(*m <= soil.vwc_sat + 1e-9, "{key} {date} moisture {m}");
                    assert!(*m >= 0.0, "{key} {date} moisture {m}");
                }
            }
        }
    }

    #[test]
    fn parallel_run_matches_sequential() {
        let model = WaterBalance::default();
        let weather = season();
        let soils = soils();
        let sequential = model.run(&soils, &weather);
        let parallel = model.run_parallel(&soils, &weather);
        assert_eq!(sequential.balances, parallel.balances);
        assert_eq!(sequential.skipped.len(), parallel.skipped.len());
    }

    #[test]
    fn records_serialize_for_external_writers() {
        let model = WaterBalance::default();
        let mut weather = WeatherSeries::new();
        let date = NaiveDate::from_ymd_opt(2010, 6, 1).unwrap();
        weather.insert(
            date,
            WeatherDay {
                pcpn: 0.4,
                maxt: 80.0,
                mint: 58.0,
                ghi: 240.0,
            },
        );
        let output = model.run(&soils(), &weather);
        let json = serde_json::to_value(&output).unwrap();

        let record = &json["balances"]["sandy"]["2010-06-01"];
        assert_eq!(record["redistribution"]["moisture"].as_array().unwrap().len(), 4);
        assert_eq!(record["redistribution"]["flows"].as_array().unwrap().len(), 3);
        assert_eq!(record["weather"]["pcpn"], 0.4);

        let back: BalanceRecord = serde_json::from_value(record.clone()).unwrap();
        let first_pass = &output.balances["sandy"][&date];
        assert_abs_diff_eq!(back.q(), first_pass.q(), epsilon = 1e-12);
        assert_abs_diff_eq!(back.et(), first_pass.et(), epsilon = 1e-12);
        assert_abs_diff_eq!(back.moisture(), first_pass.moisture(), epsilon = 1e-12);
    }
}
