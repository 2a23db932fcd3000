use std::sync::Arc;

use tracing::debug;

use crate::config::{Config, CostTable, FinanceConfig, SizingPolicy, SubsidyPolicy};
use crate::errors::ValidationError;
use crate::models::recommendation::{Assessment, BudgetCheck};
use crate::models::request::Intake;
use crate::services::location::{LocationFactors, TableLocationFactors};
use crate::services::{financial, sizing, subsidy, tariff};

/// Stateless pipeline: tariff → sizing → subsidy → financial projection.
/// Shared across requests behind an `Arc`; holds only read-only policy.
#[derive(Clone)]
pub struct RecommendationEngine {
    sizing: SizingPolicy,
    costs: CostTable,
    subsidies: SubsidyPolicy,
    finance: FinanceConfig,
    locations: Arc<dyn LocationFactors>,
}

impl std::fmt::Debug for RecommendationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecommendationEngine")
            .field("sizing", &self.sizing)
            .field("costs", &self.costs)
            .field("subsidies", &self.subsidies)
            .field("finance", &self.finance)
            .finish_non_exhaustive()
    }
}

impl RecommendationEngine {
    pub fn new(
        sizing: SizingPolicy,
        costs: CostTable,
        subsidies: SubsidyPolicy,
        finance: FinanceConfig,
        locations: Arc<dyn LocationFactors>,
    ) -> Self {
        Self { sizing, costs, subsidies, finance, locations }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.sizing.clone(),
            config.costs.clone(),
            config.subsidies.clone(),
            config.finance.clone(),
            Arc::new(TableLocationFactors::from(&config.locations)),
        )
    }

    pub fn subsidy_policy(&self) -> &SubsidyPolicy {
        &self.subsidies
    }

    pub fn assess(&self, intake: &Intake) -> Result<Assessment, ValidationError> {
        let current_bill = tariff::compute_bill(intake.monthly_consumption_kwh, &intake.slabs)?;

        let site = self.locations.profile(&intake.location);
        let system = sizing::recommend_system(
            &self.sizing,
            intake.usage_type,
            intake.monthly_consumption_kwh,
            &site,
        );

        let gross =
            system.recommended_size_kw * self.costs.per_kw(intake.usage_type, system.system_type);
        let subsidy = subsidy::resolve_subsidy(&self.subsidies, intake.usage_type, gross);

        let projection = financial::project(
            &current_bill,
            &intake.slabs,
            &system,
            gross,
            &subsidy,
            &self.finance,
        )?;

        let derived = [
            system.recommended_size_kw,
            projection.system_cost_gross,
            projection.system_cost_net,
            projection.monthly_savings,
            projection.payback.years().unwrap_or(0.0),
        ];
        if derived.iter().any(|v| !v.is_finite()) {
            return Err(ValidationError::new(
                "monthlyConsumption",
                "is too large to assess at this site",
            ));
        }

        let budget_check = intake.budget.map(|budget| BudgetCheck {
            budget,
            within_budget: projection.system_cost_net <= budget,
            shortfall: (projection.system_cost_net - budget).max(0.0),
        });

        debug!(
            event_name = "engine.assessed",
            location = %intake.location,
            usage_type = intake.usage_type.as_str(),
            system_type = system.system_type.as_str(),
            size_kw = system.recommended_size_kw,
            yield_per_kw = system.generation_per_kw_kwh,
            solar_factor = site.solar_factor,
            wind_factor = site.wind_factor,
            offset_kwh = projection.offset_kwh,
            bill_before = current_bill.bill_amount,
            bill_after = projection.new_bill.bill_amount,
            "assessment computed"
        );

        Ok(Assessment {
            current_bill,
            system,
            subsidy,
            projection,
            budget_check,
        })
    }
}
