use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::ConfigError;
use crate::models::recommendation::{LocationProfile, SystemType, UsageType};

/// Service configuration, read from `config.json`. Every section has
/// defaults, so a missing file or a partial one is fine.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub sizing: SizingPolicy,
    pub costs: CostTable,
    pub finance: FinanceConfig,
    pub subsidies: SubsidyPolicy,
    pub locations: LocationTable,
    pub narrative: NarrativeConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "0.0.0.0".to_string(), port: 5000 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter directive, e.g. `info` or `energy_advisor=debug`
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: LogFormat::Compact }
    }
}

/// How a raw capacity is snapped to an installable increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingMode {
    Up,
    Nearest,
    Down,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SizingPolicy {
    /// Share of monthly consumption the system should generate
    pub target_coverage: f64,
    pub size_increment_kw: f64,
    pub rounding: RoundingMode,
    pub days_per_month: f64,
    pub solar_daily_yield_kwh_per_kw: f64,
    /// Open-field agricultural arrays are better positioned
    pub agriculture_solar_daily_yield_kwh_per_kw: f64,
    pub wind_daily_yield_kwh_per_kw: f64,
    /// Solar share of a hybrid system's capacity
    pub hybrid_solar_share: f64,
    /// Smallest agricultural system: a 5 HP irrigation pump
    pub pump_min_kw: f64,
    /// Factories at or above this consumption get a hybrid or wind system
    pub factory_hybrid_threshold_kwh: f64,
    /// Large factories go pure wind when wind_factor ≥ ratio × solar_factor
    pub wind_preference_ratio: f64,
}

impl Default for SizingPolicy {
    fn default() -> Self {
        Self {
            target_coverage: 0.9,
            size_increment_kw: 0.5,
            rounding: RoundingMode::Up,
            days_per_month: 30.0,
            solar_daily_yield_kwh_per_kw: 4.2,
            agriculture_solar_daily_yield_kwh_per_kw: 4.5,
            wind_daily_yield_kwh_per_kw: 3.8,
            hybrid_solar_share: 0.6,
            pump_min_kw: 3.7,
            factory_hybrid_threshold_kwh: 2000.0,
            wind_preference_ratio: 1.25,
        }
    }
}

/// Installed cost in ₹ per kW.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct CostTable {
    pub solar_per_kw: f64,
    pub wind_per_kw: f64,
    pub hybrid_per_kw: f64,
    pub agriculture_solar_per_kw: f64,
}

impl Default for CostTable {
    fn default() -> Self {
        Self {
            solar_per_kw: 55_000.0,
            wind_per_kw: 75_000.0,
            hybrid_per_kw: 65_000.0,
            agriculture_solar_per_kw: 45_000.0,
        }
    }
}

impl CostTable {
    pub fn per_kw(&self, usage: UsageType, system: SystemType) -> f64 {
        match (usage, system) {
            (UsageType::Agriculture, SystemType::Solar) => self.agriculture_solar_per_kw,
            (_, SystemType::Solar) => self.solar_per_kw,
            (_, SystemType::Wind) => self.wind_per_kw,
            (_, SystemType::Hybrid) => self.hybrid_per_kw,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct FinanceConfig {
    /// Grid emission factor; 0.82 kg/kWh for India
    pub co2_kg_per_kwh: f64,
}

impl Default for FinanceConfig {
    fn default() -> Self {
        Self { co2_kg_per_kwh: 0.82 }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, ToSchema)]
pub struct SubsidyRule {
    pub usage_type: UsageType,
    pub scheme: String,
    /// Fraction of gross cost, 0–1
    pub percentage: f64,
    #[serde(default)]
    pub max_amount: Option<f64>,
}

/// Ordered rule table; the first rule matching the usage type applies.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(transparent)]
pub struct SubsidyPolicy {
    pub rules: Vec<SubsidyRule>,
}

impl Default for SubsidyPolicy {
    fn default() -> Self {
        Self {
            rules: vec![SubsidyRule {
                usage_type: UsageType::Agriculture,
                scheme: "PM-KUSUM".to_string(),
                percentage: 0.30,
                max_amount: None,
            }],
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct LocationTable {
    pub default: LocationProfile,
    /// Keyed by location name, matched case-insensitively
    pub sites: HashMap<String, LocationProfile>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct NarrativeConfig {
    pub enabled: bool,
    /// OpenAI-compatible base URL (LM Studio by default)
    pub api_base: String,
    pub model: String,
    pub timeout_secs: u64,
    pub temperature: f64,
    pub max_tokens: u32,
    /// Check `GET {api_base}/models` at startup and disable the model if it fails
    pub probe_on_startup: bool,
}

impl Default for NarrativeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_base: "http://localhost:1234/v1".to_string(),
            model: "local-model".to_string(),
            timeout_secs: 30,
            temperature: 0.7,
            max_tokens: 256,
            probe_on_startup: true,
        }
    }
}

impl Config {
    /// Reads `path` if it exists, applies environment overrides and validates.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// [`Config::load`] with the environment lookup supplied by the caller.
    pub fn load_with<F>(path: impl AsRef<Path>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = path.as_ref();
        let mut config: Config = if path.exists() {
            let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
                path: path.to_path_buf(),
                source,
            })?;
            serde_json::from_str(&content).map_err(|source| ConfigError::ParseFile {
                path: path.to_path_buf(),
                source,
            })?
        } else {
            Config::default()
        };
        config.apply_overrides(lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// `PORT`, `LM_STUDIO_API_BASE` and `ADVISOR_LOG` take precedence over the file.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            self.server.port = port.trim().parse().map_err(|_| ConfigError::InvalidEnvOverride {
                key: "PORT".to_string(),
                value: port.clone(),
            })?;
        }
        if let Some(api_base) = lookup("LM_STUDIO_API_BASE").filter(|v| !v.trim().is_empty()) {
            self.narrative.api_base = api_base;
        }
        if let Some(level) = lookup("ADVISOR_LOG").filter(|v| !v.trim().is_empty()) {
            self.logging.level = level;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.sizing;
        if !(s.target_coverage > 0.0 && s.target_coverage <= 1.5) {
            return invalid(format!("sizing.target_coverage must be in (0, 1.5], got {}", s.target_coverage));
        }
        if !positive(s.size_increment_kw) {
            return invalid("sizing.size_increment_kw must be positive".to_string());
        }
        if !positive(s.days_per_month) {
            return invalid("sizing.days_per_month must be positive".to_string());
        }
        for (name, v) in [
            ("solar_daily_yield_kwh_per_kw", s.solar_daily_yield_kwh_per_kw),
            ("agriculture_solar_daily_yield_kwh_per_kw", s.agriculture_solar_daily_yield_kwh_per_kw),
            ("wind_daily_yield_kwh_per_kw", s.wind_daily_yield_kwh_per_kw),
        ] {
            if !positive(v) {
                return invalid(format!("sizing.{name} must be positive and finite"));
            }
        }
        if !(0.0..=1.0).contains(&s.hybrid_solar_share) {
            return invalid("sizing.hybrid_solar_share must be in [0, 1]".to_string());
        }
        if !non_negative(s.pump_min_kw)
            || !non_negative(s.factory_hybrid_threshold_kwh)
            || !positive(s.wind_preference_ratio)
        {
            return invalid("sizing thresholds must be non-negative and finite".to_string());
        }

        let c = &self.costs;
        for v in [c.solar_per_kw, c.wind_per_kw, c.hybrid_per_kw, c.agriculture_solar_per_kw] {
            if !non_negative(v) {
                return invalid("costs must be non-negative and finite".to_string());
            }
        }

        if !non_negative(self.finance.co2_kg_per_kwh) {
            return invalid("finance.co2_kg_per_kwh must be non-negative and finite".to_string());
        }

        for rule in &self.subsidies.rules {
            if !(0.0..=1.0).contains(&rule.percentage) {
                return invalid(format!(
                    "subsidy `{}` percentage must be a fraction in [0, 1], got {}",
                    rule.scheme, rule.percentage
                ));
            }
            if rule.max_amount.is_some_and(|m| !(m >= 0.0)) {
                return invalid(format!("subsidy `{}` max_amount must be non-negative", rule.scheme));
            }
        }

        let profiles = std::iter::once(("default", &self.locations.default))
            .chain(self.locations.sites.iter().map(|(k, v)| (k.as_str(), v)));
        for (name, p) in profiles {
            if !non_negative(p.solar_factor) || !non_negative(p.wind_factor) {
                return invalid(format!("location `{name}` factors must be non-negative and finite"));
            }
        }

        if self.narrative.enabled && self.narrative.api_base.trim().is_empty() {
            return invalid("narrative.api_base is required when narrative is enabled".to_string());
        }
        Ok(())
    }
}

fn invalid(msg: String) -> Result<(), ConfigError> {
    Err(ConfigError::Validation(msg))
}

fn positive(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

fn non_negative(v: f64) -> bool {
    v.is_finite() && v >= 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.subsidies.rules[0].scheme, "PM-KUSUM");
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config: Config = serde_json::from_str(
            r#"{
                "sizing": { "target_coverage": 1.0, "rounding": "nearest" },
                "locations": { "sites": { "Jaisalmer": { "solar_factor": 1.15, "wind_factor": 1.4 } } },
                "subsidies": [
                    { "usage_type": "agriculture", "scheme": "State pump scheme", "percentage": 0.6, "max_amount": 150000 }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(config.sizing.target_coverage, 1.0);
        assert_eq!(config.sizing.rounding, RoundingMode::Nearest);
        assert_eq!(config.sizing.size_increment_kw, 0.5);
        assert_eq!(config.subsidies.rules[0].max_amount, Some(150_000.0));
        assert_eq!(config.locations.sites["Jaisalmer"].wind_factor, 1.4);
        assert_eq!(config.narrative.model, "local-model");
        config.validate().unwrap();
    }

    #[test]
    fn rejects_out_of_range_values() {
        let mut config = Config::default();
        config.subsidies.rules[0].percentage = 30.0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));

        let mut config = Config::default();
        config.sizing.size_increment_kw = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.sizing.target_coverage = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.locations.default.solar_factor = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_infinite_factors() {
        let mut config = Config::default();
        config.sizing.solar_daily_yield_kwh_per_kw = f64::INFINITY;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));

        let mut config = Config::default();
        config.locations.sites.insert(
            "Leh".to_string(),
            LocationProfile { solar_factor: f64::INFINITY, wind_factor: 1.0 },
        );
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.finance.co2_kg_per_kwh = f64::INFINITY;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.costs.wind_per_kw = f64::INFINITY;
        assert!(config.validate().is_err());
    }

    #[test]
    fn env_overrides_take_precedence() {
        let mut config = Config::default();
        config
            .apply_overrides(|key| match key {
                "PORT" => Some("8081".to_string()),
                "LM_STUDIO_API_BASE" => Some("http://lm.internal:1234/v1".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.server.port, 8081);
        assert_eq!(config.narrative.api_base, "http://lm.internal:1234/v1");
        assert_eq!(config.logging.level, "info");

        let err = config.apply_overrides(|key| (key == "PORT").then(|| "http".to_string()));
        assert!(matches!(err, Err(ConfigError::InvalidEnvOverride { .. })));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = Config::load_with("does-not-exist/config.json", |_| None).unwrap();
        assert_eq!(config.sizing.pump_min_kw, 3.7);
        assert_eq!(config.server.port, 5000);
    }
}
