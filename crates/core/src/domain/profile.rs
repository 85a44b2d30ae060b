use anyhow::ensure;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const MIN_YEARS_TO_ACHIEVE: u32 = 1;
pub const MAX_YEARS_TO_ACHIEVE: u32 = 40;

/// Questionnaire answers that seed one analysis task.
///
/// Serialized in the backend's camelCase shape, e.g.
/// `{"monthlyInvestment": 15000, "yearsToAchieve": 5, ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub monthly_investment: f64,
    pub years_to_achieve: u32,
    pub age: u32,
    pub objective: Objective,
    pub risk: RiskAppetite,
}

impl UserProfile {
    pub fn try_new(
        monthly_investment: f64,
        years_to_achieve: u32,
        age: u32,
        objective: Objective,
        risk: RiskAppetite,
    ) -> anyhow::Result<Self> {
        let profile = Self {
            monthly_investment,
            years_to_achieve,
            age,
            objective,
            risk,
        };
        profile.validate()?;
        Ok(profile)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            self.monthly_investment.is_finite() && self.monthly_investment > 0.0,
            "monthly investment must be a positive amount (got {})",
            self.monthly_investment
        );
        ensure!(
            (MIN_YEARS_TO_ACHIEVE..=MAX_YEARS_TO_ACHIEVE).contains(&self.years_to_achieve),
            "years to achieve must be {MIN_YEARS_TO_ACHIEVE}..={MAX_YEARS_TO_ACHIEVE} (got {})",
            self.years_to_achieve
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Objective {
    Marriage,
    #[serde(rename = "Child Education")]
    ChildEducation,
    Retirement,
    Travel,
    #[serde(rename = "Home Purchase")]
    HomePurchase,
    #[serde(rename = "Emergency Fund")]
    EmergencyFund,
    #[serde(rename = "Wealth Creation")]
    WealthCreation,
    #[serde(rename = "Health Care")]
    HealthCare,
    #[serde(rename = "Tax Saving")]
    TaxSaving,
    Other,
}

impl Objective {
    pub const ALL: [Objective; 10] = [
        Objective::Marriage,
        Objective::ChildEducation,
        Objective::Retirement,
        Objective::Travel,
        Objective::HomePurchase,
        Objective::EmergencyFund,
        Objective::WealthCreation,
        Objective::HealthCare,
        Objective::TaxSaving,
        Objective::Other,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Objective::Marriage => "Marriage",
            Objective::ChildEducation => "Child Education",
            Objective::Retirement => "Retirement",
            Objective::Travel => "Travel",
            Objective::HomePurchase => "Home Purchase",
            Objective::EmergencyFund => "Emergency Fund",
            Objective::WealthCreation => "Wealth Creation",
            Objective::HealthCare => "Health Care",
            Objective::TaxSaving => "Tax Saving",
            Objective::Other => "Other",
        }
    }
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Objective {
    type Err = anyhow::Error;

    /// Accepts the display label or a kebab/snake-case spelling
    /// (`"Child Education"`, `"child-education"`, `"child_education"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize(s);
        Objective::ALL
            .into_iter()
            .find(|o| normalize(o.label()) == wanted)
            .ok_or_else(|| anyhow::anyhow!("unknown objective: {s}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskAppetite {
    Conservative,
    Moderate,
    Aggressive,
}

impl RiskAppetite {
    pub const ALL: [RiskAppetite; 3] = [
        RiskAppetite::Conservative,
        RiskAppetite::Moderate,
        RiskAppetite::Aggressive,
    ];

    pub fn label(self) -> &'static str {
        match self {
            RiskAppetite::Conservative => "Conservative",
            RiskAppetite::Moderate => "Moderate",
            RiskAppetite::Aggressive => "Aggressive",
        }
    }
}

impl fmt::Display for RiskAppetite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for RiskAppetite {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize(s);
        RiskAppetite::ALL
            .into_iter()
            .find(|r| normalize(r.label()) == wanted)
            .ok_or_else(|| anyhow::anyhow!("unknown risk appetite: {s}"))
    }
}

fn normalize(s: &str) -> String {
    s.trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .flat_map(char::to_lowercase)
        .collect()
}
