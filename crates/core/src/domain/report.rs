use anyhow::{ensure, Context};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Portfolio recommendation produced by a completed task.
///
/// Allocation amounts are trusted to sum to the declared budget; the client only
/// checks that each amount is a finite, non-negative number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub allocations: BTreeMap<String, f64>,
    #[serde(default)]
    pub mutual_funds: Vec<MutualFund>,
    #[serde(default)]
    pub etfs: Vec<Etf>,
    #[serde(default)]
    pub bonds: Vec<Bond>,
    #[serde(default)]
    pub sgbs: Vec<Sgb>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutualFund {
    pub name: String,
    #[serde(default)]
    pub return_5y: Option<f64>,
    #[serde(default)]
    pub expense_ratio: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Etf {
    pub name: String,
    #[serde(default)]
    pub return_3y: Option<f64>,
    #[serde(default)]
    pub expense_ratio: Option<f64>,
    #[serde(default)]
    pub standard_deviation: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bond {
    pub name: String,
    #[serde(default)]
    pub ytm: Option<f64>,
    #[serde(default)]
    pub coupon_rate: Option<f64>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub maturity_date: Option<String>,
}

/// Sovereign gold bond.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sgb {
    pub name: String,
    #[serde(default)]
    pub last_traded_price: Option<f64>,
    #[serde(default)]
    pub interest_rate: Option<f64>,
    #[serde(default)]
    pub expected_returns: Option<f64>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub maturity_date: Option<String>,
}

impl Report {
    /// Decode the `result` payload of a completed task.
    ///
    /// The backend sometimes wraps the report one level deeper
    /// (`{"result": {"allocations": ...}}`); both shapes are accepted.
    pub fn from_result(result: &Value) -> anyhow::Result<Self> {
        let inner = match result.get("allocations") {
            Some(_) => result,
            None => result
                .get("result")
                .filter(|v| v.get("allocations").is_some())
                .context("result payload has no allocations")?,
        };

        let report = serde_json::from_value::<Report>(inner.clone())
            .context("failed to decode result payload into Report")?;
        report.validate()?;
        Ok(report)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, amount) in &self.allocations {
            ensure!(!name.trim().is_empty(), "allocation name must be non-empty");
            ensure!(
                amount.is_finite() && *amount >= 0.0,
                "allocation for {name} must be non-negative (got {amount})"
            );
        }
        Ok(())
    }

    pub fn total_allocated(&self) -> f64 {
        self.allocations.values().sum()
    }

    /// Counts funds, ETFs and bonds. Gold bonds are reported separately.
    pub fn instrument_count(&self) -> usize {
        self.mutual_funds.len() + self.etfs.len() + self.bonds.len()
    }

    /// Share of the total for each allocation, in percent.
    pub fn allocation_shares(&self) -> Vec<(&str, f64)> {
        let total = self.total_allocated();
        self.allocations
            .iter()
            .map(|(name, amount)| {
                let pct = if total > 0.0 { amount / total * 100.0 } else { 0.0 };
                (name.as_str(), pct)
            })
            .collect()
    }
}

impl Bond {
    pub fn is_government(&self) -> bool {
        self.name.contains("Government Security")
    }

    pub fn is_corporate(&self) -> bool {
        self.name.contains("Corporate Bond")
    }
}

impl Sgb {
    /// Whole years left until maturity, clamped at zero. `maturity_date` only
    /// needs to start with a four-digit year (`"2031"`, `"2031-11-28"`).
    pub fn years_to_maturity(&self, today: NaiveDate) -> Option<u32> {
        let raw = self.maturity_date.as_deref()?.trim();
        let year = raw.get(..4)?.parse::<i32>().ok()?;
        Some((year - today.year()).max(0) as u32)
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<Value>::deserialize(deserializer)?;
    Ok(match v {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
