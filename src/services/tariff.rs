/// Progressive slab billing.
///
/// Each band is charged only for the units that fall inside it, so the
/// bill is continuous at the band edges and non-decreasing in consumption.

use crate::errors::ValidationError;
use crate::models::recommendation::{BandCharge, BillBreakdown, EffectiveRate, TariffSlabs};

/// Upper edges of the first three bands in kWh. Band 4 is open-ended.
pub const BAND_EDGES_KWH: [f64; 3] = [100.0, 300.0, 500.0];

/// Largest monthly consumption accepted (1 TWh). Keeps every derived
/// amount finite.
pub const MAX_MONTHLY_CONSUMPTION_KWH: f64 = 1.0e9;

/// Largest per-unit rate accepted, in ₹/kWh.
pub const MAX_RATE_PER_KWH: f64 = 1.0e5;

const SLAB_FIELDS: [&str; 4] = [
    "slabs.slab1Rate",
    "slabs.slab2Rate",
    "slabs.slab3Rate",
    "slabs.slab4Rate",
];

impl TariffSlabs {
    /// Builds a schedule from possibly-blank rates. A blank rate silently
    /// undercharges, so it becomes 0 only when `allow_missing` is set.
    pub fn from_rates(rates: [Option<f64>; 4], allow_missing: bool) -> Result<Self, ValidationError> {
        let mut resolved = [0.0; 4];
        for (i, rate) in rates.into_iter().enumerate() {
            resolved[i] = match rate {
                Some(r) => r,
                None if allow_missing => 0.0,
                None => {
                    return Err(ValidationError::new(
                        SLAB_FIELDS[i],
                        "is missing (set allowMissingRates to bill this band at 0)",
                    ));
                }
            };
        }
        Self::new(resolved)
    }

    pub fn new(rates: [f64; 4]) -> Result<Self, ValidationError> {
        for (i, rate) in rates.iter().enumerate() {
            if !rate.is_finite() || *rate < 0.0 {
                return Err(ValidationError::new(SLAB_FIELDS[i], "must be a non-negative rate"));
            }
            if *rate > MAX_RATE_PER_KWH {
                return Err(ValidationError::new(
                    SLAB_FIELDS[i],
                    format!("must not exceed {MAX_RATE_PER_KWH} per kWh"),
                ));
            }
        }
        Ok(Self { rates })
    }

    /// Same rate in every band.
    pub fn flat(rate: f64) -> Result<Self, ValidationError> {
        if !rate.is_finite() || rate < 0.0 {
            return Err(ValidationError::new("tariff", "must be a non-negative rate"));
        }
        if rate > MAX_RATE_PER_KWH {
            return Err(ValidationError::new(
                "tariff",
                format!("must not exceed {MAX_RATE_PER_KWH} per kWh"),
            ));
        }
        Ok(Self { rates: [rate; 4] })
    }
}

/// Bill for one month of consumption under `slabs`.
pub fn compute_bill(consumption_kwh: f64, slabs: &TariffSlabs) -> Result<BillBreakdown, ValidationError> {
    if !consumption_kwh.is_finite() || consumption_kwh < 0.0 {
        return Err(ValidationError::new(
            "monthlyConsumption",
            "must be a non-negative number",
        ));
    }
    if consumption_kwh > MAX_MONTHLY_CONSUMPTION_KWH {
        return Err(ValidationError::new(
            "monthlyConsumption",
            format!("must not exceed {MAX_MONTHLY_CONSUMPTION_KWH} kWh"),
        ));
    }

    let band_charges: [BandCharge; 4] = std::array::from_fn(|i| {
        let lower = if i == 0 { 0.0 } else { BAND_EDGES_KWH[i - 1] };
        let upper = BAND_EDGES_KWH.get(i).copied();
        let units = (consumption_kwh.min(upper.unwrap_or(f64::INFINITY)) - lower).max(0.0);
        let rate = slabs.rates[i];
        BandCharge {
            lower_kwh: lower,
            upper_kwh: upper,
            rate,
            units_kwh: units,
            amount: units * rate,
        }
    });

    let bill_amount: f64 = band_charges.iter().map(|b| b.amount).sum();

    let effective_rate = if consumption_kwh > 0.0 {
        EffectiveRate::PerUnit(bill_amount / consumption_kwh)
    } else {
        EffectiveRate::NotApplicable
    };

    Ok(BillBreakdown {
        consumption_kwh,
        bill_amount,
        band_charges,
        effective_rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slabs() -> TariffSlabs {
        TariffSlabs::new([4.0, 6.0, 8.0, 10.0]).unwrap()
    }

    fn bill(kwh: f64) -> f64 {
        compute_bill(kwh, &slabs()).unwrap().bill_amount
    }

    #[test]
    fn test_reference_bill_450_kwh() {
        let b = compute_bill(450.0, &slabs()).unwrap();
        assert_eq!(b.bill_amount, 2800.0);
        let units: Vec<f64> = b.band_charges.iter().map(|c| c.units_kwh).collect();
        assert_eq!(units, vec![100.0, 200.0, 150.0, 0.0]);
        assert_eq!(b.effective_rate, EffectiveRate::PerUnit(2800.0 / 450.0));
    }

    #[test]
    fn test_zero_consumption() {
        let b = compute_bill(0.0, &slabs()).unwrap();
        assert_eq!(b.bill_amount, 0.0);
        assert_eq!(b.effective_rate, EffectiveRate::NotApplicable);
    }

    #[test]
    fn test_band_edges_are_continuous() {
        assert_eq!(bill(100.0), 100.0 * 4.0);
        assert_eq!(bill(101.0), bill(100.0) + 6.0);
        assert_eq!(bill(301.0), bill(300.0) + 8.0);
        assert_eq!(bill(501.0), bill(500.0) + 10.0);
        assert_eq!(bill(800.0), 400.0 + 1200.0 + 1600.0 + 3000.0);
    }

    #[test]
    fn test_monotonic_in_consumption() {
        let schedules = [
            [4.0, 6.0, 8.0, 10.0],
            [10.0, 1.0, 0.0, 3.0], // regressive rates still never reduce the bill
            [0.0, 0.0, 0.0, 0.0],
        ];
        for rates in schedules {
            let s = TariffSlabs::new(rates).unwrap();
            let mut previous = 0.0;
            for step in 0..=1400 {
                let kwh = step as f64 * 0.5;
                let amount = compute_bill(kwh, &s).unwrap().bill_amount;
                assert!(amount >= previous, "bill fell at {kwh} kWh for {rates:?}");
                previous = amount;
            }
        }
    }

    #[test]
    fn test_fractional_consumption() {
        assert!((bill(100.5) - 403.0).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_invalid_input() {
        assert_eq!(compute_bill(-1.0, &slabs()).unwrap_err().field, "monthlyConsumption");
        assert!(compute_bill(f64::NAN, &slabs()).is_err());
        assert_eq!(
            TariffSlabs::new([4.0, -6.0, 8.0, 10.0]).unwrap_err().field,
            "slabs.slab2Rate"
        );
        assert!(TariffSlabs::flat(f64::INFINITY).is_err());
    }

    #[test]
    fn test_rejects_out_of_range_magnitudes() {
        let err = compute_bill(1e307, &slabs()).unwrap_err();
        assert_eq!(err.field, "monthlyConsumption");
        assert!(compute_bill(MAX_MONTHLY_CONSUMPTION_KWH + 1.0, &slabs()).is_err());

        assert_eq!(
            TariffSlabs::new([4.0, 6.0, 8.0, 1e300]).unwrap_err().field,
            "slabs.slab4Rate"
        );
        assert_eq!(TariffSlabs::flat(1e300).unwrap_err().field, "tariff");
    }

    #[test]
    fn test_largest_inputs_stay_finite() {
        let s = TariffSlabs::new([MAX_RATE_PER_KWH; 4]).unwrap();
        let b = compute_bill(MAX_MONTHLY_CONSUMPTION_KWH, &s).unwrap();
        assert!(b.bill_amount.is_finite());
        assert!(b.effective_rate.value().is_some_and(f64::is_finite));
    }

    #[test]
    fn test_missing_rates() {
        let rates = [Some(4.0), None, Some(8.0), Some(10.0)];
        assert_eq!(
            TariffSlabs::from_rates(rates, false).unwrap_err().field,
            "slabs.slab2Rate"
        );
        let s = TariffSlabs::from_rates(rates, true).unwrap();
        assert_eq!(s.rates, [4.0, 0.0, 8.0, 10.0]);
    }
}
