use chrono::NaiveDate;
use moneyfi_core::domain::{Report, UserProfile};
use moneyfi_core::projection::{ProjectionPoint, ProjectionRates};
use serde_json::Value;
use std::fmt::Write;

pub fn profile(p: &UserProfile) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Profile");
    let _ = writeln!(out, "  Monthly investment : {}", money(p.monthly_investment));
    let _ = writeln!(out, "  Years to achieve   : {}", p.years_to_achieve);
    let _ = writeln!(out, "  Age                : {}", p.age);
    let _ = writeln!(out, "  Objective          : {}", p.objective);
    let _ = writeln!(out, "  Risk appetite      : {}", p.risk);
    out.push('\n');
    out
}

pub fn report(r: &Report, today: NaiveDate) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "Allocation ({} total across {} asset classes, {} instruments)",
        money(r.total_allocated()),
        r.allocations.len(),
        r.instrument_count()
    );
    for (name, pct) in r.allocation_shares() {
        let amount = r.allocations.get(name).copied().unwrap_or_default();
        let _ = writeln!(out, "  {name:<24} {:>14} {pct:>6.1}%", money(amount));
    }

    if !r.mutual_funds.is_empty() {
        let _ = writeln!(out, "\nMutual funds");
        for f in &r.mutual_funds {
            let _ = writeln!(
                out,
                "  {:<48} 5y {:>7}  exp {:>6}",
                f.name,
                pct(f.return_5y),
                pct(f.expense_ratio)
            );
        }
    }

    if !r.etfs.is_empty() {
        let _ = writeln!(out, "\nETFs");
        for e in &r.etfs {
            let _ = writeln!(
                out,
                "  {:<48} 3y {:>7}  exp {:>6}  sd {:>7}",
                e.name,
                pct(e.return_3y),
                pct(e.expense_ratio),
                pct(e.standard_deviation)
            );
        }
    }

    if !r.bonds.is_empty() {
        let gov = r.bonds.iter().filter(|b| b.is_government()).count();
        let corp = r.bonds.iter().filter(|b| b.is_corporate()).count();
        let _ = writeln!(out, "\nBonds ({gov} government, {corp} corporate)");
        for b in &r.bonds {
            let _ = writeln!(
                out,
                "  {:<48} ytm {:>7}  coupon {:>7}  matures {}",
                b.name,
                pct(b.ytm),
                pct(b.coupon_rate),
                b.maturity_date.as_deref().unwrap_or("-")
            );
        }
    }

    if !r.sgbs.is_empty() {
        let _ = writeln!(out, "\nSovereign gold bonds");
        for s in &r.sgbs {
            let years = s
                .years_to_maturity(today)
                .map(|y| format!("{y} yrs"))
                .unwrap_or_else(|| "-".to_string());
            let _ = writeln!(
                out,
                "  {:<48} ltp {:>12}  interest {:>7}  expected {:>7}  {years}",
                s.name,
                s.last_traded_price.map(money).unwrap_or_else(|| "-".to_string()),
                pct(s.interest_rate),
                pct(s.expected_returns)
            );
        }
    }

    out
}

pub fn raw_result(result: &Value) -> String {
    match result {
        Value::String(s) => s.clone(),
        Value::Null => "No recommendations available".to_string(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

pub fn projection(points: &[ProjectionPoint], rates: ProjectionRates) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>5} {:>14} {:>14} {:>14} {:>14}",
        "year",
        format!("strategy {:.1}%", rates.strategy * 100.0),
        format!("FD {:.1}%", rates.fixed_deposit * 100.0),
        format!("LIC {:.1}%", rates.endowment * 100.0),
        "invested"
    );
    for p in points {
        let _ = writeln!(
            out,
            "{:>5} {:>14} {:>14} {:>14} {:>14}",
            format!("{}y", p.year),
            money(p.strategy),
            money(p.fixed_deposit),
            money(p.endowment),
            money(p.invested)
        );
    }
    out
}

fn pct(v: Option<f64>) -> String {
    v.map(|v| format!("{v:.2}%")).unwrap_or_else(|| "-".to_string())
}

/// Rupee amount with Indian digit grouping, e.g. 1234567 -> ₹12,34,567.
fn money(amount: f64) -> String {
    let rounded = amount.round();
    let sign = if rounded < 0.0 { "-" } else { "" };
    let digits = format!("{:.0}", rounded.abs());

    let grouped = if digits.len() <= 3 {
        digits
    } else {
        let (head, tail) = digits.split_at(digits.len() - 3);
        let mut parts: Vec<&str> = Vec::new();
        let mut rest = head;
        while rest.len() > 2 {
            let (l, r) = rest.split_at(rest.len() - 2);
            parts.push(r);
            rest = l;
        }
        if !rest.is_empty() {
            parts.push(rest);
        }
        parts.reverse();
        format!("{},{tail}", parts.join(","))
    };
    format!("{sign}₹{grouped}")
}
