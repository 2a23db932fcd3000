/// System sizing heuristics.
///
/// Deterministic policy:
///  1. Technology from usage type (and, for large factories, site wind vs. sun)
///  2. Monthly yield per kW = daily yield × days × location factor
///  3. Capacity = consumption × target coverage / yield per kW
///  4. Snap to the installable increment, apply minimums

use crate::config::{RoundingMode, SizingPolicy};
use crate::models::recommendation::{LocationProfile, SystemRecommendation, SystemType, UsageType};

pub fn recommend_system(
    policy: &SizingPolicy,
    usage: UsageType,
    consumption_kwh: f64,
    site: &LocationProfile,
) -> SystemRecommendation {
    let system_type = choose_technology(policy, usage, consumption_kwh, site);
    let generation_per_kw_kwh = monthly_yield_per_kw(policy, usage, system_type, site);

    let raw_kw = if generation_per_kw_kwh > 0.0 {
        consumption_kwh * policy.target_coverage / generation_per_kw_kwh
    } else {
        0.0
    };

    let mut size_kw = snap(raw_kw, policy.size_increment_kw, policy.rounding)
        .max(policy.size_increment_kw);
    if usage == UsageType::Agriculture && size_kw < policy.pump_min_kw {
        size_kw = snap(policy.pump_min_kw, policy.size_increment_kw, RoundingMode::Up);
    }

    SystemRecommendation {
        system_type,
        recommended_size_kw: size_kw,
        generation_per_kw_kwh,
        estimated_generation_kwh: size_kw * generation_per_kw_kwh,
    }
}

fn choose_technology(
    policy: &SizingPolicy,
    usage: UsageType,
    consumption_kwh: f64,
    site: &LocationProfile,
) -> SystemType {
    match usage {
        UsageType::Home | UsageType::Agriculture => SystemType::Solar,
        UsageType::Factory if consumption_kwh < policy.factory_hybrid_threshold_kwh => SystemType::Solar,
        UsageType::Factory => {
            if site.wind_factor >= policy.wind_preference_ratio * site.solar_factor {
                SystemType::Wind
            } else {
                SystemType::Hybrid
            }
        }
    }
}

/// kWh one installed kW produces per month at this site.
pub fn monthly_yield_per_kw(
    policy: &SizingPolicy,
    usage: UsageType,
    system: SystemType,
    site: &LocationProfile,
) -> f64 {
    let solar_daily = if usage == UsageType::Agriculture {
        policy.agriculture_solar_daily_yield_kwh_per_kw
    } else {
        policy.solar_daily_yield_kwh_per_kw
    };
    let solar = solar_daily * site.solar_factor;
    let wind = policy.wind_daily_yield_kwh_per_kw * site.wind_factor;

    let daily = match system {
        SystemType::Solar => solar,
        SystemType::Wind => wind,
        SystemType::Hybrid => {
            policy.hybrid_solar_share * solar + (1.0 - policy.hybrid_solar_share) * wind
        }
    };
    daily * policy.days_per_month
}

/// Rounds `kw` to a multiple of `increment`. A tiny epsilon keeps values
/// such as 2.0000000001 from being pushed up a whole step.
pub fn snap(kw: f64, increment: f64, mode: RoundingMode) -> f64 {
    let steps = kw / increment;
    let steps = match mode {
        RoundingMode::Up => (steps - 1e-9).ceil(),
        RoundingMode::Nearest => steps.round(),
        RoundingMode::Down => (steps + 1e-9).floor(),
    };
    steps.max(0.0) * increment
}
