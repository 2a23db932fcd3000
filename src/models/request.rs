use serde::Deserialize;
use utoipa::ToSchema;

use crate::errors::ValidationError;
use crate::models::recommendation::{TariffSlabs, UsageType};
use crate::services::tariff::MAX_MONTHLY_CONSUMPTION_KWH;

/// Slab rates as submitted by the form. Any of them may be blank.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SlabRatesInput {
    /// ₹/kWh for 0–100 kWh
    pub slab1_rate: Option<f64>,
    /// ₹/kWh for 101–300 kWh
    pub slab2_rate: Option<f64>,
    /// ₹/kWh for 301–500 kWh
    pub slab3_rate: Option<f64>,
    /// ₹/kWh above 500 kWh
    pub slab4_rate: Option<f64>,
}

impl SlabRatesInput {
    pub fn rates(&self) -> [Option<f64>; 4] {
        [self.slab1_rate, self.slab2_rate, self.slab3_rate, self.slab4_rate]
    }

    pub fn resolve(&self, allow_missing: bool) -> Result<TariffSlabs, ValidationError> {
        TariffSlabs::from_rates(self.rates(), allow_missing)
    }
}

/// Loosely-typed body of `POST /api/recommend`, mirroring the form payload.
/// Presence and ranges are checked by [`RecommendRequest::validate`].
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecommendRequest {
    pub location: Option<String>,
    pub usage_type: Option<String>,
    pub monthly_consumption: Option<f64>,
    #[serde(alias = "tariffSlabs")]
    pub slabs: Option<SlabRatesInput>,
    /// Single flat ₹/kWh rate, used only when no slab schedule is sent
    pub tariff: Option<f64>,
    pub budget: Option<f64>,
    /// Treat blank slab rates as 0 instead of rejecting the request
    #[serde(default)]
    pub allow_missing_rates: bool,
}

/// Validated, immutable input to the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Intake {
    pub location: String,
    pub usage_type: UsageType,
    pub monthly_consumption_kwh: f64,
    pub slabs: TariffSlabs,
    /// False when the bill was derived from a flat `tariff`
    pub slabs_provided: bool,
    pub budget: Option<f64>,
}

impl RecommendRequest {
    pub fn validate(&self) -> Result<Intake, ValidationError> {
        let location = self
            .location
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .ok_or_else(|| ValidationError::new("location", "is required"))?
            .to_string();

        let usage_type = self
            .usage_type
            .as_deref()
            .ok_or_else(|| ValidationError::new("usageType", "is required"))?
            .parse::<UsageType>()?;

        let monthly_consumption_kwh = self
            .monthly_consumption
            .ok_or_else(|| ValidationError::new("monthlyConsumption", "is required"))?;
        non_negative("monthlyConsumption", monthly_consumption_kwh)?;
        if monthly_consumption_kwh > MAX_MONTHLY_CONSUMPTION_KWH {
            return Err(ValidationError::new(
                "monthlyConsumption",
                format!("must not exceed {MAX_MONTHLY_CONSUMPTION_KWH} kWh"),
            ));
        }

        let (slabs, slabs_provided) = match (&self.slabs, self.tariff) {
            (Some(raw), _) => (raw.resolve(self.allow_missing_rates)?, true),
            (None, Some(flat)) if flat > 0.0 => (TariffSlabs::flat(flat)?, false),
            (None, Some(flat)) if flat < 0.0 || !flat.is_finite() => {
                return Err(ValidationError::new("tariff", "must be a non-negative number"));
            }
            (None, _) => {
                return Err(ValidationError::new(
                    "slabs",
                    "a slab tariff schedule (or a positive flat tariff) is required",
                ));
            }
        };

        let budget = match self.budget {
            Some(b) => {
                non_negative("budget", b)?;
                Some(b)
            }
            None => None,
        };

        Ok(Intake {
            location,
            usage_type,
            monthly_consumption_kwh,
            slabs,
            slabs_provided,
            budget,
        })
    }
}

/// Body of `POST /api/tariff/bill`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BillRequest {
    pub consumption: f64,
    pub slabs: SlabRatesInput,
    #[serde(default)]
    pub allow_missing_rates: bool,
}

fn non_negative(field: &str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::new(field, "must be a finite number"));
    }
    if value < 0.0 {
        return Err(ValidationError::new(field, "must not be negative"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(json: serde_json::Value) -> RecommendRequest {
        serde_json::from_value(json).expect("request should deserialize")
    }

    #[test]
    fn accepts_form_payload_with_slabs() {
        let intake = form(serde_json::json!({
            "location": "  Pune ",
            "usageType": "home",
            "monthlyConsumption": 450,
            "tariff": 0,
            "slabs": { "slab1Rate": 4.0, "slab2Rate": 6.0, "slab3Rate": 8.0, "slab4Rate": 10.0 }
        }))
        .validate()
        .unwrap();

        assert_eq!(intake.location, "Pune");
        assert_eq!(intake.usage_type, UsageType::Home);
        assert_eq!(intake.slabs.rates, [4.0, 6.0, 8.0, 10.0]);
        assert!(intake.slabs_provided);
        assert_eq!(intake.budget, None);
    }

    #[test]
    fn flat_tariff_is_used_when_no_slabs_are_sent() {
        let intake = form(serde_json::json!({
            "location": "Nagpur",
            "usageType": "factory",
            "monthlyConsumption": 1200,
            "tariff": 7.5
        }))
        .validate()
        .unwrap();

        assert_eq!(intake.slabs.rates, [7.5; 4]);
        assert!(!intake.slabs_provided);
    }

    #[test]
    fn tariff_slabs_alias_is_accepted() {
        let intake = form(serde_json::json!({
            "location": "Delhi",
            "usageType": "home",
            "monthlyConsumption": 10,
            "tariffSlabs": { "slab1Rate": 1, "slab2Rate": 2, "slab3Rate": 3, "slab4Rate": 4 }
        }))
        .validate()
        .unwrap();
        assert_eq!(intake.slabs.rates, [1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn rejects_with_field_level_reasons() {
        let base = serde_json::json!({
            "location": "Pune",
            "usageType": "home",
            "monthlyConsumption": 100,
            "slabs": { "slab1Rate": 4.0, "slab2Rate": 6.0, "slab3Rate": 8.0, "slab4Rate": 10.0 }
        });

        let cases = [
            ("location", serde_json::json!("  ")),
            ("usageType", serde_json::json!("shop")),
            ("monthlyConsumption", serde_json::json!(-5)),
            ("monthlyConsumption", serde_json::json!(1e307)),
            ("budget", serde_json::json!(-1)),
        ];
        for (field, value) in cases {
            let mut body = base.clone();
            body[field] = value;
            let err = form(body).validate().unwrap_err();
            assert_eq!(err.field, field, "unexpected error {err}");
        }

        let mut body = base.clone();
        body.as_object_mut().unwrap().remove("monthlyConsumption");
        assert_eq!(form(body).validate().unwrap_err().field, "monthlyConsumption");

        let mut body = base.clone();
        body.as_object_mut().unwrap().remove("slabs");
        assert_eq!(form(body).validate().unwrap_err().field, "slabs");

        let mut body = base;
        body["slabs"]["slab3Rate"] = serde_json::json!(-2.0);
        assert_eq!(form(body).validate().unwrap_err().field, "slabs.slab3Rate");
    }

    #[test]
    fn blank_slab_rate_needs_explicit_permission() {
        let body = serde_json::json!({
            "location": "Pune",
            "usageType": "home",
            "monthlyConsumption": 100,
            "slabs": { "slab1Rate": 4.0, "slab2Rate": 6.0, "slab3Rate": 8.0 }
        });
        let err = form(body.clone()).validate().unwrap_err();
        assert_eq!(err.field, "slabs.slab4Rate");

        let mut permitted = body;
        permitted["allowMissingRates"] = serde_json::json!(true);
        let intake = form(permitted).validate().unwrap();
        assert_eq!(intake.slabs.rates, [4.0, 6.0, 8.0, 0.0]);
    }
}
