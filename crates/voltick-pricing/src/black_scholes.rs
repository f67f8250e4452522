//! Black-Scholes-Merton pricing with continuous dividend yield.
//!
//! Greeks use natural units: delta and gamma per unit of spot, vega per
//! unit of volatility (not per vol point), theta per year, rho per unit
//! of rate. Callers wanting per-day theta or per-point vega rescale.

use serde::{Deserialize, Serialize};
use voltick_core::OptionType;

use crate::error::PricingError;
use crate::math::{norm_cdf, norm_pdf};

/// Validated inputs for a single vanilla option.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricingInputs {
    pub spot: f64,
    pub strike: f64,
    pub rate: f64,
    pub dividend_yield: f64,
    pub volatility: f64,
    pub time_to_expiry: f64,
    pub option_type: OptionType,
}

impl PricingInputs {
    /// Builds validated inputs.
    ///
    /// `time_to_expiry` may be zero or negative (an expired contract
    /// prices at intrinsic); everything else must be finite, spot and
    /// strike strictly positive, and volatility non-negative.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        spot: f64,
        strike: f64,
        rate: f64,
        dividend_yield: f64,
        volatility: f64,
        time_to_expiry: f64,
        option_type: OptionType,
    ) -> Result<Self, PricingError> {
        for (name, value) in [
            ("spot", spot),
            ("strike", strike),
            ("rate", rate),
            ("dividend_yield", dividend_yield),
            ("volatility", volatility),
            ("time_to_expiry", time_to_expiry),
        ] {
            if !value.is_finite() {
                return Err(PricingError::InvalidInput(format!(
                    "{name} must be finite, got {value}"
                )));
            }
        }
        if spot <= 0.0 {
            return Err(PricingError::InvalidInput(format!(
                "spot must be positive, got {spot}"
            )));
        }
        if strike <= 0.0 {
            return Err(PricingError::InvalidInput(format!(
                "strike must be positive, got {strike}"
            )));
        }
        if volatility < 0.0 {
            return Err(PricingError::InvalidInput(format!(
                "volatility must be non-negative, got {volatility}"
            )));
        }
        Ok(Self {
            spot,
            strike,
            rate,
            dividend_yield,
            volatility,
            time_to_expiry,
            option_type,
        })
    }

    /// Same inputs with the volatility replaced. Used by the solver.
    pub fn with_volatility(self, volatility: f64) -> Self {
        Self { volatility, ..self }
    }

    pub(crate) fn forward(&self) -> f64 {
        self.spot * ((self.rate - self.dividend_yield) * self.time_to_expiry).exp()
    }

    pub(crate) fn discount_factor(&self) -> f64 {
        (-self.rate * self.time_to_expiry).exp()
    }

    pub(crate) fn dividend_factor(&self) -> f64 {
        (-self.dividend_yield * self.time_to_expiry).exp()
    }
}

/// First-order sensitivities plus gamma.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Greeks {
    pub delta: f64,
    pub gamma: f64,
    pub vega: f64,
    pub theta: f64,
    pub rho: f64,
}

impl Greeks {
    /// Scales every sensitivity, for signed position sizes.
    pub fn scaled(self, factor: f64) -> Self {
        Self {
            delta: self.delta * factor,
            gamma: self.gamma * factor,
            vega: self.vega * factor,
            theta: self.theta * factor,
            rho: self.rho * factor,
        }
    }

    pub fn add(self, other: Self) -> Self {
        Self {
            delta: self.delta + other.delta,
            gamma: self.gamma + other.gamma,
            vega: self.vega + other.vega,
            theta: self.theta + other.theta,
            rho: self.rho + other.rho,
        }
    }
}

fn d1(inputs: &PricingInputs) -> f64 {
    let sqrt_t = inputs.time_to_expiry.sqrt();
    ((inputs.forward() / inputs.strike).ln()
        + 0.5 * inputs.volatility * inputs.volatility * inputs.time_to_expiry)
        / (inputs.volatility * sqrt_t)
}

fn d2(inputs: &PricingInputs, d1: f64) -> f64 {
    d1 - inputs.volatility * inputs.time_to_expiry.sqrt()
}

/// Theoretical option price.
///
/// Expired contracts (`time_to_expiry <= 0`) price at intrinsic value.
/// Zero volatility prices at the discounted intrinsic of the forward.
/// Puts are priced through put-call parity off the call formula.
pub fn price(inputs: &PricingInputs) -> f64 {
    if inputs.time_to_expiry <= 0.0 {
        return inputs.option_type.intrinsic(inputs.spot, inputs.strike);
    }
    if inputs.volatility <= 0.0 {
        return inputs.discount_factor()
            * inputs.option_type.intrinsic(inputs.forward(), inputs.strike);
    }

    let d1 = d1(inputs);
    let d2 = d2(inputs, d1);
    let discounted_spot = inputs.spot * inputs.dividend_factor();
    let discounted_strike = inputs.strike * inputs.discount_factor();
    let call = discounted_spot * norm_cdf(d1) - discounted_strike * norm_cdf(d2);

    match inputs.option_type {
        OptionType::Call => call.max(0.0),
        // Parity: P = C - S e^{-qT} + K e^{-rT}
        OptionType::Put => (call - discounted_spot + discounted_strike).max(0.0),
    }
}

/// Full set of Greeks.
///
/// Degenerate regimes collapse to step deltas: an expired at-the-money
/// contract reports delta +-0.5, and a zero-volatility contract reports
/// the discounted step delta on forward versus strike. All second-order
/// and time sensitivities are zero in those regimes.
pub fn greeks(inputs: &PricingInputs) -> Greeks {
    if inputs.time_to_expiry <= 0.0 {
        return expired_greeks(inputs);
    }
    if inputs.volatility <= 0.0 {
        return zero_vol_greeks(inputs);
    }

    let d1 = d1(inputs);
    let d2 = d2(inputs, d1);
    let sqrt_t = inputs.time_to_expiry.sqrt();
    let div_factor = inputs.dividend_factor();
    let df = inputs.discount_factor();
    let pdf_d1 = norm_pdf(d1);

    let gamma = div_factor * pdf_d1 / (inputs.spot * inputs.volatility * sqrt_t);
    let vega = inputs.spot * div_factor * pdf_d1 * sqrt_t;

    let theta_common = -inputs.spot * div_factor * pdf_d1 * inputs.volatility / (2.0 * sqrt_t);

    match inputs.option_type {
        OptionType::Call => Greeks {
            delta: div_factor * norm_cdf(d1),
            gamma,
            vega,
            theta: theta_common - inputs.rate * inputs.strike * df * norm_cdf(d2)
                + inputs.dividend_yield * inputs.spot * div_factor * norm_cdf(d1),
            rho: inputs.strike * inputs.time_to_expiry * df * norm_cdf(d2),
        },
        OptionType::Put => Greeks {
            delta: div_factor * (norm_cdf(d1) - 1.0),
            gamma,
            vega,
            theta: theta_common + inputs.rate * inputs.strike * df * norm_cdf(-d2)
                - inputs.dividend_yield * inputs.spot * div_factor * norm_cdf(-d1),
            rho: -inputs.strike * inputs.time_to_expiry * df * norm_cdf(-d2),
        },
    }
}

fn expired_greeks(inputs: &PricingInputs) -> Greeks {
    let delta = match inputs.option_type {
        OptionType::Call => {
            if inputs.spot > inputs.strike {
                1.0
            } else if inputs.spot < inputs.strike {
                0.0
            } else {
                0.5
            }
        }
        OptionType::Put => {
            if inputs.spot < inputs.strike {
                -1.0
            } else if inputs.spot > inputs.strike {
                0.0
            } else {
                -0.5
            }
        }
    };
    Greeks {
        delta,
        ..Greeks::default()
    }
}

fn zero_vol_greeks(inputs: &PricingInputs) -> Greeks {
    let forward = inputs.forward();
    let div_factor = inputs.dividend_factor();
    let delta = match inputs.option_type {
        OptionType::Call => {
            if forward > inputs.strike {
                div_factor
            } else if forward < inputs.strike {
                0.0
            } else {
                0.5 * div_factor
            }
        }
        OptionType::Put => {
            if forward < inputs.strike {
                -div_factor
            } else if forward > inputs.strike {
                0.0
            } else {
                -0.5 * div_factor
            }
        }
    };
    Greeks {
        delta,
        ..Greeks::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atm_call() -> PricingInputs {
        PricingInputs::new(100.0, 100.0, 0.05, 0.0, 0.20, 1.0, OptionType::Call).unwrap()
    }

    #[test]
    fn atm_call_matches_reference_value() {
        // Canonical textbook case: S=K=100, r=5%, sigma=20%, T=1y.
        let value = price(&atm_call());
        assert!((value - 10.4506).abs() < 1e-3, "got {value}");
    }

    #[test]
    fn put_call_parity_holds() {
        let call = atm_call();
        let put = PricingInputs {
            option_type: OptionType::Put,
            ..call
        };
        let lhs = price(&call) - price(&put);
        let rhs = call.spot * call.dividend_factor() - call.strike * call.discount_factor();
        assert!((lhs - rhs).abs() < 1e-9);
    }

    #[test]
    fn price_is_monotonic_in_volatility() {
        let base = atm_call();
        let mut previous = price(&base.with_volatility(0.01));
        for step in 1..40 {
            let vol = 0.01 + step as f64 * 0.05;
            let current = price(&base.with_volatility(vol));
            assert!(current > previous, "not increasing at vol {vol}");
            previous = current;
        }
    }

    #[test]
    fn expired_contract_prices_at_intrinsic() {
        let call = PricingInputs::new(110.0, 100.0, 0.05, 0.0, 0.20, 0.0, OptionType::Call).unwrap();
        assert!((price(&call) - 10.0).abs() < 1e-12);

        let put = PricingInputs::new(90.0, 100.0, 0.05, 0.0, 0.20, -0.5, OptionType::Put).unwrap();
        assert!((price(&put) - 10.0).abs() < 1e-12);

        let otm = PricingInputs::new(90.0, 100.0, 0.05, 0.0, 0.20, 0.0, OptionType::Call).unwrap();
        assert_eq!(price(&otm), 0.0);
    }

    #[test]
    fn zero_volatility_prices_discounted_forward_intrinsic() {
        let inputs = PricingInputs::new(100.0, 90.0, 0.05, 0.0, 0.0, 1.0, OptionType::Call).unwrap();
        let forward = 100.0 * (0.05f64).exp();
        let expected = (-0.05f64).exp() * (forward - 90.0);
        assert!((price(&inputs) - expected).abs() < 1e-12);
    }

    #[test]
    fn expired_atm_delta_is_half() {
        let call = PricingInputs::new(100.0, 100.0, 0.05, 0.0, 0.20, 0.0, OptionType::Call).unwrap();
        assert_eq!(greeks(&call).delta, 0.5);

        let put = PricingInputs {
            option_type: OptionType::Put,
            ..call
        };
        assert_eq!(greeks(&put).delta, -0.5);
    }

    #[test]
    fn call_delta_lies_in_unit_interval() {
        let greeks = greeks(&atm_call());
        assert!(greeks.delta > 0.0 && greeks.delta < 1.0);
        // ATM call with positive rates sits a touch above 0.5.
        assert!((greeks.delta - 0.6368).abs() < 1e-3);
    }

    #[test]
    fn gamma_and_vega_match_across_option_types() {
        let call = atm_call();
        let put = PricingInputs {
            option_type: OptionType::Put,
            ..call
        };
        let cg = greeks(&call);
        let pg = greeks(&put);
        assert!((cg.gamma - pg.gamma).abs() < 1e-12);
        assert!((cg.vega - pg.vega).abs() < 1e-12);
    }

    #[test]
    fn theta_decays_long_options() {
        assert!(greeks(&atm_call()).theta < 0.0);
    }

    #[test]
    fn greeks_scale_and_sum() {
        let g = greeks(&atm_call());
        let doubled = g.scaled(2.0);
        assert!((doubled.delta - 2.0 * g.delta).abs() < 1e-12);
        let net = g.add(g.scaled(-1.0));
        assert!(net.delta.abs() < 1e-12);
        assert!(net.vega.abs() < 1e-12);
    }

    #[test]
    fn rejects_non_positive_spot_and_strike() {
        assert!(PricingInputs::new(0.0, 100.0, 0.05, 0.0, 0.2, 1.0, OptionType::Call).is_err());
        assert!(PricingInputs::new(100.0, -5.0, 0.05, 0.0, 0.2, 1.0, OptionType::Call).is_err());
        assert!(
            PricingInputs::new(100.0, 100.0, f64::NAN, 0.0, 0.2, 1.0, OptionType::Call).is_err()
        );
        assert!(PricingInputs::new(100.0, 100.0, 0.05, 0.0, -0.1, 1.0, OptionType::Call).is_err());
    }
}
