//! Compound-interest projection for comparing a recommended strategy against
//! a recurring deposit and a traditional endowment plan.

use crate::domain::RiskAppetite;
use serde::Serialize;

pub const DEFAULT_FD_RATE: f64 = 0.07;
pub const DEFAULT_LIC_RATE: f64 = 0.055;

/// Monthly rate equivalent to an annual yield.
pub fn apy_to_monthly(annual_rate: f64) -> f64 {
    (1.0 + annual_rate).powf(1.0 / 12.0) - 1.0
}

/// Future value of `monthly` deposited at the end of each month for `years`.
pub fn future_value_sip(monthly: f64, annual_rate: f64, years: u32) -> f64 {
    let r = apy_to_monthly(annual_rate);
    let n = f64::from(years) * 12.0;
    if r == 0.0 {
        return monthly * n;
    }
    monthly * (((1.0 + r).powf(n) - 1.0) / r)
}

/// Parses strings like `"10-12% p.a."`, `"12% p.a."` or `"11%"` into a fraction.
/// A range resolves to its midpoint. Returns `None` when no number is present.
pub fn parse_expected_return(text: &str) -> Option<f64> {
    let nums: Vec<f64> = text
        .split(|c: char| !(c.is_ascii_digit() || c == '.'))
        .filter(|s| !s.is_empty() && s.chars().any(|c| c.is_ascii_digit()))
        .filter_map(|s| s.trim_matches('.').parse::<f64>().ok())
        .collect();

    match nums.as_slice() {
        [] => None,
        [only] => Some(only / 100.0),
        [a, b, ..] => Some((a + b) / 2.0 / 100.0),
    }
}

pub fn default_rate_for_risk(risk: RiskAppetite) -> f64 {
    match risk {
        RiskAppetite::Conservative => 0.08,
        RiskAppetite::Moderate => 0.11,
        RiskAppetite::Aggressive => 0.14,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProjectionPoint {
    pub year: u32,
    pub strategy: f64,
    pub fixed_deposit: f64,
    pub endowment: f64,
    pub invested: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct ProjectionRates {
    pub strategy: f64,
    pub fixed_deposit: f64,
    pub endowment: f64,
}

impl ProjectionRates {
    pub fn for_risk(risk: RiskAppetite) -> Self {
        Self {
            strategy: default_rate_for_risk(risk),
            fixed_deposit: DEFAULT_FD_RATE,
            endowment: DEFAULT_LIC_RATE,
        }
    }
}

/// One point per year, values rounded to whole currency units.
pub fn compare_strategies(monthly: f64, years: u32, rates: ProjectionRates) -> Vec<ProjectionPoint> {
    (1..=years)
        .map(|year| ProjectionPoint {
            year,
            strategy: future_value_sip(monthly, rates.strategy, year).round(),
            fixed_deposit: future_value_sip(monthly, rates.fixed_deposit, year).round(),
            endowment: future_value_sip(monthly, rates.endowment, year).round(),
            invested: (monthly * f64::from(year) * 12.0).round(),
        })
        .collect()
}
