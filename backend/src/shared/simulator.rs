//! Synthetic field device
//!
//! Produces readings with plausible dynamics: a diurnal temperature cycle,
//! humidity that tracks temperature inversely, afternoon-biased rain
//! showers that wet the soil, heat-driven evaporation and occasional wind
//! gusts. State carries over between readings so series change gradually.

use chrono::{DateTime, Duration, Timelike, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;

use crate::domain::{round2, Location, Reading};
use crate::store::hourly_shard_path;

const TEMPERATURE_RANGE: (f64, f64) = (-10.0, 40.0);
const HUMIDITY_RANGE: (f64, f64) = (20.0, 100.0);
const SOIL_MOISTURE_RANGE: (f64, f64) = (0.0, 100.0);
const WIND_SPEED_RANGE: (f64, f64) = (0.0, 50.0);

const BASE_RAIN_PROBABILITY: f64 = 0.05;
const AFTERNOON_RAIN_PROBABILITY: f64 = 0.15;
const GUST_PROBABILITY: f64 = 0.05;

/// Spacing between generated historical readings
pub const BACKFILL_STEP_MINUTES: i64 = 15;

pub struct SensorSimulator {
    device_id: String,
    location: Location,
    rng: StdRng,
    temperature: f64,
    humidity: f64,
    rainfall: f64,
    soil_moisture: f64,
    wind_speed: f64,
}

impl SensorSimulator {
    /// Simulator seeded from OS entropy, starting state drawn around `start`
    pub fn new(device_id: impl Into<String>, location: Location, start: DateTime<Utc>) -> Self {
        Self::with_rng(device_id, location, start, StdRng::from_entropy())
    }

    /// Deterministic simulator for tests and reproducible backfills
    pub fn seeded(
        device_id: impl Into<String>,
        location: Location,
        start: DateTime<Utc>,
        seed: u64,
    ) -> Self {
        Self::with_rng(device_id, location, start, StdRng::seed_from_u64(seed))
    }

    fn with_rng(
        device_id: impl Into<String>,
        location: Location,
        start: DateTime<Utc>,
        mut rng: StdRng,
    ) -> Self {
        let base = 20.0 + 8.0 * (0.5 - hour_offset(start));
        Self {
            device_id: device_id.into(),
            location,
            temperature: rng.gen_range(base - 3.0..base + 3.0),
            humidity: rng.gen_range(40.0..70.0),
            rainfall: 0.0,
            soil_moisture: rng.gen_range(30.0..60.0),
            wind_speed: rng.gen_range(0.0..15.0),
            rng,
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Advance the simulated sensors to `at` and emit a reading
    pub fn next_reading(&mut self, at: DateTime<Utc>) -> Reading {
        let hour = at.hour();

        // Cooler at night, warmest around noon
        let daily_base = 20.0 + 10.0 * (0.5 - hour_offset(at));
        self.temperature = clamp(daily_base + self.rng.gen_range(-1.5..1.5), TEMPERATURE_RANGE);

        let mut humidity_base = 60.0 - (self.temperature - 20.0) * 1.5;
        if hour < 6 {
            humidity_base += 15.0;
        }
        self.humidity = clamp(humidity_base + self.rng.gen_range(-3.0..3.0), HUMIDITY_RANGE);

        let rain_probability = if (14..=18).contains(&hour) {
            AFTERNOON_RAIN_PROBABILITY
        } else {
            BASE_RAIN_PROBABILITY
        };
        if self.rng.gen::<f64>() < rain_probability {
            self.rainfall = self.rng.gen_range(1.0..15.0);
        } else {
            self.rainfall = (self.rainfall - self.rng.gen_range(0.0..2.0)).max(0.0);
        }

        if self.rainfall > 0.0 {
            self.soil_moisture =
                (self.soil_moisture + self.rainfall * 0.4).min(SOIL_MOISTURE_RANGE.1);
        } else {
            let evaporation = 0.5 + (self.temperature - 20.0) * 0.1;
            let loss = if evaporation > 0.0 {
                self.rng.gen_range(0.0..=evaporation)
            } else {
                0.0
            };
            self.soil_moisture = (self.soil_moisture - loss).max(SOIL_MOISTURE_RANGE.0);
        }

        let from_noon = hour as f64 - 12.0;
        let mut wind_change = self.rng.gen_range(-2.0..2.0);
        if self.rng.gen::<f64>() < GUST_PROBABILITY {
            wind_change += self.rng.gen_range(5.0..15.0);
        }
        self.wind_speed = clamp(5.0 + from_noon * from_noon * 0.1 + wind_change, WIND_SPEED_RANGE);

        Reading {
            device_id: self.device_id.clone(),
            timestamp: at.to_rfc3339(),
            location: Some(self.location),
            temperature: Some(round2(self.temperature)),
            humidity: Some(round2(self.humidity)),
            rainfall: Some(round2(self.rainfall)),
            soil_moisture: Some(round2(self.soil_moisture)),
            wind_speed: Some(round2(self.wind_speed)),
        }
    }

    /// `count` readings spaced 15 minutes apart, starting `hours_back`
    /// hours before `now`
    pub fn backfill(&mut self, now: DateTime<Utc>, hours_back: i64, count: usize) -> Vec<Reading> {
        let start = now - Duration::hours(hours_back);
        (0..count)
            .map(|i| {
                let at = start + Duration::minutes(BACKFILL_STEP_MINUTES * i as i64);
                self.next_reading(at)
            })
            .collect()
    }
}

/// Group readings into hourly shards keyed by shard path
pub fn group_hourly(device_id: &str, readings: Vec<Reading>) -> BTreeMap<String, Vec<Reading>> {
    let mut shards: BTreeMap<String, Vec<Reading>> = BTreeMap::new();
    for reading in readings {
        let Some(at) = reading.event_time() else {
            continue;
        };
        shards
            .entry(hourly_shard_path(device_id, at))
            .or_default()
            .push(reading);
    }
    shards
}

/// Distance from noon as a fraction of half a day (0 at noon, 1 at midnight)
fn hour_offset(at: DateTime<Utc>) -> f64 {
    ((at.hour() as f64 - 12.0) / 12.0).abs()
}

fn clamp(value: f64, (lo, hi): (f64, f64)) -> f64 {
    value.max(lo).min(hi)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(ts: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(ts).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_readings_stay_in_range() {
        let start = at("2024-01-15T00:00:00Z");
        let mut sim = SensorSimulator::seeded("dev-1", Location::default(), start, 7);

        for reading in sim.backfill(start + Duration::hours(72), 72, 288) {
            let t = reading.temperature.unwrap();
            let h = reading.humidity.unwrap();
            let r = reading.rainfall.unwrap();
            let s = reading.soil_moisture.unwrap();
            let w = reading.wind_speed.unwrap();
            assert!((-10.0..=40.0).contains(&t), "temperature {}", t);
            assert!((20.0..=100.0).contains(&h), "humidity {}", h);
            assert!(r >= 0.0 && r <= 15.0, "rainfall {}", r);
            assert!((0.0..=100.0).contains(&s), "soil moisture {}", s);
            assert!((0.0..=50.0).contains(&w), "wind speed {}", w);
        }
    }

    #[test]
    fn test_values_are_rounded() {
        let start = at("2024-01-15T10:00:00Z");
        let mut sim = SensorSimulator::seeded("dev-1", Location::default(), start, 1);
        let reading = sim.next_reading(start);
        for value in [
            reading.temperature,
            reading.humidity,
            reading.soil_moisture,
            reading.wind_speed,
        ] {
            let v = value.unwrap();
            assert!((v * 100.0 - (v * 100.0).round()).abs() < 1e-6);
        }
        assert_eq!(reading.location, Some(Location::default()));
        assert_eq!(reading.device_id, "dev-1");
    }

    #[test]
    fn test_noon_is_warmer_than_midnight() {
        let day = at("2024-01-15T00:00:00Z");
        let mut sim = SensorSimulator::seeded("dev-1", Location::default(), day, 3);
        let midnight = sim.next_reading(day).temperature.unwrap();
        let noon = sim.next_reading(day + Duration::hours(12)).temperature.unwrap();
        // Bases are 15°C and 25°C with at most ±1.5°C noise
        assert!(noon > midnight);
    }

    #[test]
    fn test_seeded_is_deterministic() {
        let start = at("2024-01-15T06:00:00Z");
        let mut a = SensorSimulator::seeded("dev-1", Location::default(), start, 42);
        let mut b = SensorSimulator::seeded("dev-1", Location::default(), start, 42);
        assert_eq!(a.backfill(start, 2, 8), b.backfill(start, 2, 8));
    }

    #[test]
    fn test_backfill_spacing_and_grouping() {
        let now = at("2024-01-15T12:00:00Z");
        let mut sim = SensorSimulator::seeded("dev-1", Location::default(), now, 9);
        let readings = sim.backfill(now, 2, 8);

        assert_eq!(readings.len(), 8);
        assert_eq!(readings[0].timestamp, "2024-01-15T10:00:00+00:00");
        assert_eq!(readings[1].timestamp, "2024-01-15T10:15:00+00:00");

        let shards = group_hourly("dev-1", readings);
        let names: Vec<_> = shards.keys().cloned().collect();
        assert_eq!(
            names,
            vec!["dev-1/0/2024/01/15/10/00", "dev-1/0/2024/01/15/11/00"]
        );
        assert!(shards.values().all(|r| r.len() == 4));
    }
}
