use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

// First day of year counted as fall rain
const FALL_START_DOY: u32 = 275;

// Daily forcing for one date
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeatherDay {
    pub pcpn: f64, // Precipitation [in]
    pub maxt: f64, // Maximum air temperature [°F]
    pub mint: f64, // Minimum air temperature [°F]
    pub ghi: f64,  // Global horizontal irradiance [MJ/m²]
}

// Weather keyed by date; dates need not be contiguous
pub type WeatherSeries = BTreeMap<NaiveDate, WeatherDay>;

pub fn fahrenheit_to_celsius(degrees_f: f64) -> f64 {
    (degrees_f - 32.0) * 5.0 / 9.0
}

// Precipitation over the last quarter of the year (day of year >= 275) [in]
pub fn fall_rain(weather: &WeatherSeries) -> f64 {
    weather
        .iter()
        .filter(|(date, _)| date.ordinal() >= FALL_START_DOY)
        .map(|(_, day)| day.pcpn)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn day(pcpn: f64) -> WeatherDay {
        WeatherDay {
            pcpn,
            maxt: 60.0,
            mint: 40.0,
            ghi: 10.0,
        }
    }

    #[test]
    fn converts_temperatures() {
        assert_abs_diff_eq!(fahrenheit_to_celsius(32.0), 0.0);
        assert_abs_diff_eq!(fahrenheit_to_celsius(212.0), 100.0, epsilon = 1e-12);
    }

    #[test]
    fn fall_rain_only_counts_late_year() {
        let mut weather = WeatherSeries::new();
        weather.insert(NaiveDate::from_ymd_opt(2010, 6, 1).unwrap(), day(2.0));
        // 2010-10-02 is day 275
        weather.insert(NaiveDate::from_ymd_opt(2010, 10, 2).unwrap(), day(0.5));
        weather.insert(NaiveDate::from_ymd_opt(2010, 12, 31).unwrap(), day(1.25));
        assert_abs_diff_eq!(fall_rain(&weather), 1.75, epsilon = 1e-12);
    }

    #[test]
    fn weather_day_reads_from_json() {
        let day: WeatherDay =
            serde_json::from_str(r#"{"pcpn": 0.1, "maxt": 80, "mint": 55, "ghi": 21.5}"#).unwrap();
        assert_eq!(day.maxt, 80.0);
    }
}
