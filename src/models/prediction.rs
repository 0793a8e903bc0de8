//! Prediction response model

use serde::Serialize;

use crate::{AppError, AppResult};

/// Decimal places kept in the response
pub const RESPONSE_DECIMALS: i32 = 2;

/// Body of a successful `POST /predict`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PredictionResponse {
    pub co2_emissions: f64,
    pub water_consumption: f64,
}

impl PredictionResponse {
    /// Take the first two model outputs as (emissions, consumption)
    pub fn from_outputs(outputs: &[f64]) -> AppResult<Self> {
        let (co2, water) = match outputs {
            [co2, water, ..] => (*co2, *water),
            _ => {
                return Err(AppError::MalformedOutput(format!(
                    "expected at least 2 model outputs, got {}",
                    outputs.len()
                )));
            }
        };

        if !co2.is_finite() || !water.is_finite() {
            return Err(AppError::MalformedOutput(format!(
                "model produced a non-finite prediction ({}, {})",
                co2, water
            )));
        }

        Ok(Self {
            co2_emissions: round_to(co2, RESPONSE_DECIMALS),
            water_consumption: round_to(water, RESPONSE_DECIMALS),
        })
    }
}

/// Round half away from zero to `decimals` places
///
/// Values too large to scale have no fractional digits and pass through.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    let scaled = value * factor;
    if !scaled.is_finite() {
        return value;
    }
    scaled.round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(45.6712, 2), 45.67);
        assert_eq!(round_to(12.345_9, 2), 12.35);
        assert_eq!(round_to(-3.004, 2), -3.0);
        assert_eq!(round_to(7.0, 2), 7.0);
        assert_eq!(round_to(1e307, 2), 1e307);
        assert_eq!(round_to(-f64::MAX, 2), -f64::MAX);
    }

    #[test]
    fn test_from_outputs_keeps_huge_values_numeric() {
        let response = PredictionResponse::from_outputs(&[1e307, 1.0]).unwrap();
        assert_eq!(response.co2_emissions, 1e307);

        let body = serde_json::to_value(response).unwrap();
        assert!(body["co2_emissions"].is_f64());
        assert_eq!(body["water_consumption"], serde_json::json!(1.0));
    }

    #[test]
    fn test_from_outputs_rounds_and_orders() {
        let response = PredictionResponse::from_outputs(&[45.6712, 12.3449, 99.0]).unwrap();
        assert_eq!(response.co2_emissions, 45.67);
        assert_eq!(response.water_consumption, 12.34);
    }

    #[test]
    fn test_from_outputs_needs_two_values() {
        let err = PredictionResponse::from_outputs(&[1.0]).unwrap_err();
        assert!(matches!(err, AppError::MalformedOutput(_)));
        assert!(PredictionResponse::from_outputs(&[]).is_err());
    }

    #[test]
    fn test_from_outputs_rejects_nan() {
        let err = PredictionResponse::from_outputs(&[f64::NAN, 1.0]).unwrap_err();
        assert!(err.to_string().contains("non-finite"));
    }

    #[test]
    fn test_serialized_keys() {
        let body = serde_json::to_value(PredictionResponse {
            co2_emissions: 45.67,
            water_consumption: 12.34,
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"co2_emissions": 45.67, "water_consumption": 12.34})
        );
    }
}
