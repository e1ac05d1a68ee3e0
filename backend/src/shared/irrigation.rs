use serde::{Deserialize, Serialize};

use crate::domain::{round2, Reading, DEFAULT_HUMIDITY_PCT, DEFAULT_RAINFALL_MM, DEFAULT_SOIL_MOISTURE_PCT};

/// Temperature assumed for recommendations when a reading omits it (°C).
/// Not the alert engine default.
pub const RECOMMENDATION_DEFAULT_TEMPERATURE_C: f64 = 20.0;

pub const DEFAULT_CROP_TYPE: &str = "general";

const DRY_SOIL_PCT: f64 = 30.0;
const MODERATE_SOIL_PCT: f64 = 40.0;
const WARM_TEMPERATURE_C: f64 = 25.0;
const RECENT_RAIN_MM: f64 = 5.0;
const BASE_WATER_LITERS: f64 = 10.0;
const LITERS_PER_MOISTURE_POINT: f64 = 0.5;
const LIGHT_WATER_LITERS: f64 = 5.0;

/// Conditions the recommendation was derived from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CurrentConditions {
    pub soil_moisture: f64,
    pub temperature: f64,
    pub rainfall: f64,
    pub humidity: f64,
}

impl From<&Reading> for CurrentConditions {
    fn from(reading: &Reading) -> Self {
        Self {
            soil_moisture: reading.soil_moisture.unwrap_or(DEFAULT_SOIL_MOISTURE_PCT),
            temperature: reading
                .temperature
                .unwrap_or(RECOMMENDATION_DEFAULT_TEMPERATURE_C),
            rainfall: reading.rainfall.unwrap_or(DEFAULT_RAINFALL_MM),
            humidity: reading.humidity.unwrap_or(DEFAULT_HUMIDITY_PCT),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IrrigationRecommendation {
    pub crop_type: String,
    pub current_conditions: CurrentConditions,
    pub recommendation: String,
    pub needs_irrigation: bool,
    pub water_amount_liters: f64,
}

/// Irrigation advice for the latest reading. First matching rule wins.
///
/// `crop_type` is carried through to the result but does not change the
/// computation yet.
pub fn recommend(reading: &Reading, crop_type: &str) -> IrrigationRecommendation {
    let conditions = CurrentConditions::from(reading);

    let (recommendation, needs_irrigation, water_amount) = if conditions.soil_moisture < DRY_SOIL_PCT
    {
        (
            "Irrigation recommended - soil moisture is low",
            true,
            BASE_WATER_LITERS + (DRY_SOIL_PCT - conditions.soil_moisture) * LITERS_PER_MOISTURE_POINT,
        )
    } else if conditions.soil_moisture < MODERATE_SOIL_PCT && conditions.temperature > WARM_TEMPERATURE_C
    {
        (
            "Light irrigation recommended - high temperature and moderate soil moisture",
            true,
            LIGHT_WATER_LITERS,
        )
    } else if conditions.rainfall > RECENT_RAIN_MM {
        ("Recent rainfall detected - no irrigation needed", false, 0.0)
    } else {
        ("Soil moisture levels are adequate", false, 0.0)
    };

    IrrigationRecommendation {
        crop_type: crop_type.to_string(),
        current_conditions: conditions,
        recommendation: recommendation.to_string(),
        needs_irrigation,
        water_amount_liters: round2(water_amount),
    }
}
