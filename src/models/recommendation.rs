use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::ValidationError;

// ─── Intake enums ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UsageType {
    Home,
    Factory,
    Agriculture,
}

impl UsageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UsageType::Home => "home",
            UsageType::Factory => "factory",
            UsageType::Agriculture => "agriculture",
        }
    }
}

impl std::str::FromStr for UsageType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "home" => Ok(UsageType::Home),
            "factory" => Ok(UsageType::Factory),
            "agriculture" => Ok(UsageType::Agriculture),
            other => Err(ValidationError::new(
                "usageType",
                format!("unknown usage type `{other}` (expected home, factory or agriculture)"),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SystemType {
    Solar,
    Wind,
    Hybrid,
}

impl SystemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SystemType::Solar => "solar",
            SystemType::Wind => "wind",
            SystemType::Hybrid => "hybrid",
        }
    }
}

// ─── Tariff ──────────────────────────────────────────────────────────────────

/// Per-unit rates (₹/kWh) for the bands 0–100, 101–300, 301–500 and >500 kWh.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TariffSlabs {
    pub rates: [f64; 4],
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct BandCharge {
    /// Inclusive lower bound of the band in kWh
    pub lower_kwh: f64,
    /// Upper bound in kWh; `None` for the open-ended top band
    pub upper_kwh: Option<f64>,
    pub rate: f64,
    pub units_kwh: f64,
    pub amount: f64,
}

/// Blended per-unit cost. Zero consumption has no meaningful rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EffectiveRate {
    PerUnit(f64),
    NotApplicable,
}

impl EffectiveRate {
    pub fn value(&self) -> Option<f64> {
        match self {
            EffectiveRate::PerUnit(rate) => Some(*rate),
            EffectiveRate::NotApplicable => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BillBreakdown {
    pub consumption_kwh: f64,
    pub bill_amount: f64,
    pub band_charges: [BandCharge; 4],
    pub effective_rate: EffectiveRate,
}

// ─── Sizing ──────────────────────────────────────────────────────────────────

/// Relative generation factors for a site; 1.0 is the reference yield.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LocationProfile {
    pub solar_factor: f64,
    pub wind_factor: f64,
}

impl Default for LocationProfile {
    fn default() -> Self {
        Self { solar_factor: 1.0, wind_factor: 1.0 }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SystemRecommendation {
    pub system_type: SystemType,
    pub recommended_size_kw: f64,
    /// Monthly yield of one installed kW at this site
    pub generation_per_kw_kwh: f64,
    pub estimated_generation_kwh: f64,
}

// ─── Subsidy ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum SubsidyDecision {
    Ineligible,
    Granted {
        scheme: String,
        /// Fraction in [0, 1]
        percentage: f64,
        amount: f64,
    },
}

impl SubsidyDecision {
    pub fn amount(&self) -> f64 {
        match self {
            SubsidyDecision::Ineligible => 0.0,
            SubsidyDecision::Granted { amount, .. } => *amount,
        }
    }
}

// ─── Financials ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Payback {
    Years(f64),
    /// Savings are zero, so the net cost is never recovered.
    NotRecoverable,
}

impl Payback {
    pub fn years(&self) -> Option<f64> {
        match self {
            Payback::Years(years) => Some(*years),
            Payback::NotRecoverable => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FinancialProjection {
    pub offset_kwh: f64,
    pub remaining_consumption_kwh: f64,
    pub new_bill: BillBreakdown,
    pub monthly_savings: f64,
    pub system_cost_gross: f64,
    pub system_cost_net: f64,
    pub payback: Payback,
    pub co2_reduction_tonnes: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BudgetCheck {
    pub budget: f64,
    pub within_budget: bool,
    pub shortfall: f64,
}

/// Everything the engine computes for one intake.
#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    pub current_bill: BillBreakdown,
    pub system: SystemRecommendation,
    pub subsidy: SubsidyDecision,
    pub projection: FinancialProjection,
    pub budget_check: Option<BudgetCheck>,
}

// ─── REST API response types ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SummarySource {
    Model,
    Template,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RecommendationData {
    pub location: String,
    pub usage_type: UsageType,
    pub system_type: SystemType,
    pub recommended_size_kw: f64,
    pub estimated_generation_kwh: f64,
    pub monthly_savings: f64,
    /// Net system cost after any subsidy
    pub system_cost: f64,
    /// `null` when savings are zero and the cost is never recovered
    pub payback_years: Option<f64>,
    pub payback_recoverable: bool,
    pub gemini_summary: String,
    pub summary_source: SummarySource,
    pub details: RecommendationDetails,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RecommendationDetails {
    pub current_consumption: f64,
    pub remaining_consumption: f64,
    pub current_bill: f64,
    pub new_bill: f64,
    /// `null` when consumption is zero
    pub effective_tariff: Option<f64>,
    /// Tonnes of CO2 avoided per month
    pub co2_reduction: f64,
    pub slabs_used: bool,
    pub subsidy_info: SubsidyInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget_check: Option<BudgetCheckInfo>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SubsidyInfo {
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
    /// Percent, 0–100
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gross_cost: Option<f64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BudgetCheckInfo {
    pub budget: f64,
    pub within_budget: bool,
    pub shortfall: f64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BillResponse {
    pub consumption_kwh: f64,
    pub bill_amount: f64,
    pub effective_tariff: Option<f64>,
    pub bands: Vec<BandCharge>,
}

impl From<&BillBreakdown> for BillResponse {
    fn from(bill: &BillBreakdown) -> Self {
        Self {
            consumption_kwh: bill.consumption_kwh,
            bill_amount: round_to(bill.bill_amount, 2),
            effective_tariff: bill.effective_rate.value().map(|r| round_to(r, 2)),
            bands: bill.band_charges.to_vec(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthStatus {
    pub timestamp: DateTime<Utc>,
    pub status: String,
    pub message: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub narrative_model: bool,
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_type_parses_case_insensitively() {
        assert_eq!(" Agriculture ".parse::<UsageType>(), Ok(UsageType::Agriculture));
        assert_eq!("HOME".parse::<UsageType>(), Ok(UsageType::Home));
        let err = "shop".parse::<UsageType>().unwrap_err();
        assert_eq!(err.field, "usageType");
    }

    #[test]
    fn undefined_values_serialize_as_null() {
        let details = RecommendationDetails {
            current_consumption: 0.0,
            remaining_consumption: 0.0,
            current_bill: 0.0,
            new_bill: 0.0,
            effective_tariff: EffectiveRate::NotApplicable.value(),
            co2_reduction: 0.0,
            slabs_used: true,
            subsidy_info: SubsidyInfo {
                available: false,
                scheme: None,
                percentage: None,
                amount: None,
                gross_cost: None,
            },
            budget_check: None,
        };
        let json = serde_json::to_value(&details).unwrap();
        assert!(json["effective_tariff"].is_null());
        assert_eq!(json["subsidy_info"], serde_json::json!({ "available": false }));
        assert!(json.get("budget_check").is_none());
    }

    #[test]
    fn round_to_keeps_requested_precision() {
        assert_eq!(round_to(2.345_6, 2), 2.35);
        assert_eq!(round_to(12.04, 1), 12.0);
    }
}
