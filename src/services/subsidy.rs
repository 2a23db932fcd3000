use crate::config::SubsidyPolicy;
use crate::models::recommendation::{SubsidyDecision, UsageType};

/// Looks up the first rule for `usage` and applies it to the gross cost.
/// The amount is capped by the rule's `max_amount` and by the gross cost itself.
pub fn resolve_subsidy(policy: &SubsidyPolicy, usage: UsageType, system_cost_gross: f64) -> SubsidyDecision {
    let Some(rule) = policy.rules.iter().find(|r| r.usage_type == usage) else {
        return SubsidyDecision::Ineligible;
    };

    let gross = system_cost_gross.max(0.0);
    let mut amount = gross * rule.percentage.clamp(0.0, 1.0);
    if let Some(cap) = rule.max_amount {
        amount = amount.min(cap.max(0.0));
    }

    SubsidyDecision::Granted {
        scheme: rule.scheme.clone(),
        percentage: rule.percentage,
        amount: amount.min(gross),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SubsidyRule;

    #[test]
    fn test_agriculture_gets_default_scheme() {
        let d = resolve_subsidy(&SubsidyPolicy::default(), UsageType::Agriculture, 300_000.0);
        assert_eq!(
            d,
            SubsidyDecision::Granted {
                scheme: "PM-KUSUM".to_string(),
                percentage: 0.30,
                amount: 90_000.0,
            }
        );
        assert_eq!(300_000.0 - d.amount(), 210_000.0);
    }

    #[test]
    fn test_other_usage_types_ineligible() {
        let policy = SubsidyPolicy::default();
        for usage in [UsageType::Home, UsageType::Factory] {
            assert_eq!(resolve_subsidy(&policy, usage, 500_000.0), SubsidyDecision::Ineligible);
        }
    }

    #[test]
    fn test_cap_and_gross_bound() {
        let policy = SubsidyPolicy {
            rules: vec![
                SubsidyRule {
                    usage_type: UsageType::Home,
                    scheme: "Rooftop".to_string(),
                    percentage: 0.4,
                    max_amount: Some(78_000.0),
                },
                SubsidyRule {
                    usage_type: UsageType::Home,
                    scheme: "Shadowed".to_string(),
                    percentage: 0.9,
                    max_amount: None,
                },
                SubsidyRule {
                    usage_type: UsageType::Factory,
                    scheme: "Full".to_string(),
                    percentage: 1.0,
                    max_amount: None,
                },
            ],
        };

        let home = resolve_subsidy(&policy, UsageType::Home, 300_000.0);
        assert_eq!(home.amount(), 78_000.0);
        assert!(matches!(home, SubsidyDecision::Granted { ref scheme, .. } if scheme == "Rooftop"));

        for gross in [0.0, 1.0, 123_456.0] {
            let full = resolve_subsidy(&policy, UsageType::Factory, gross);
            assert!(full.amount() <= gross);
            assert!(gross - full.amount() >= 0.0);
        }
    }
}
