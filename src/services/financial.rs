use crate::config::FinanceConfig;
use crate::errors::ValidationError;
use crate::models::recommendation::{
    BillBreakdown, FinancialProjection, Payback, SubsidyDecision, SystemRecommendation, TariffSlabs,
};
use crate::services::tariff;

/// Post-installation bill, savings, payback and CO2 for one recommendation.
///
/// `bill_before` is expected to come from [`tariff::compute_bill`] with the
/// same `slabs`, in which case this cannot fail.
pub fn project(
    bill_before: &BillBreakdown,
    slabs: &TariffSlabs,
    system: &SystemRecommendation,
    system_cost_gross: f64,
    subsidy: &SubsidyDecision,
    finance: &FinanceConfig,
) -> Result<FinancialProjection, ValidationError> {
    let consumption = bill_before.consumption_kwh;
    let offset_kwh = system.estimated_generation_kwh.max(0.0).min(consumption);
    let remaining_consumption_kwh = (consumption - offset_kwh).max(0.0);

    let new_bill = tariff::compute_bill(remaining_consumption_kwh, slabs)?;

    let monthly_savings = (bill_before.bill_amount - new_bill.bill_amount).max(0.0);
    let system_cost_net = (system_cost_gross - subsidy.amount()).max(0.0);

    let payback = if monthly_savings > 0.0 {
        Payback::Years(system_cost_net / (monthly_savings * 12.0))
    } else {
        Payback::NotRecoverable
    };

    Ok(FinancialProjection {
        offset_kwh,
        remaining_consumption_kwh,
        new_bill,
        monthly_savings,
        system_cost_gross,
        system_cost_net,
        payback,
        co2_reduction_tonnes: offset_kwh * finance.co2_kg_per_kwh / 1000.0,
    })
}
