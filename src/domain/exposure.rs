//! Portfolio exposure metrics and correlation grouping. Futures contracts
//! are normalized to their root symbol (`ESH25` -> `ES`) before being
//! grouped, the same shape the broker-symbol normalizer uses, so a
//! correlation group reads the same regardless of which contract month is
//! currently held.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A named correlation group declared in configuration: an explicit symbol
/// set (membership is exact match after root normalization, so it can mix
/// asset classes -- e.g. `NASDAQ = {MNQ, TQQQ, QQQ, NQ}`) and its own
/// max-concentration percentage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationGroup {
    pub name: String,
    pub symbols: Vec<String>,
    pub max_concentration_pct: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExposureLimits {
    /// Gross exposure (sum of |position value|) as a fraction of equity.
    pub max_gross_exposure_pct: f64,
    /// Net-long exposure (positive signed sum) as a fraction of equity.
    pub max_net_long_pct: f64,
    /// Net-short exposure (|negative signed sum|) as a fraction of equity.
    pub max_net_short_pct: f64,
    /// Fallback cap applied to any symbol that isn't a member of a declared
    /// correlation group, keyed by its normalized root.
    pub max_group_exposure_pct: f64,
    /// Emit a warning once exposure reaches this fraction of a cap.
    pub warning_threshold_pct: f64,
    /// Declared named groups (spec §4.5), e.g. `NASDAQ = {MNQ, TQQQ, QQQ, NQ}, max 50%`.
    pub groups: Vec<CorrelationGroup>,
}

impl Default for ExposureLimits {
    fn default() -> Self {
        Self {
            max_gross_exposure_pct: 3.0,
            max_net_long_pct: 1.5,
            max_net_short_pct: 0.5,
            max_group_exposure_pct: 0.35,
            warning_threshold_pct: 0.8,
            groups: vec![
                CorrelationGroup {
                    name: "NASDAQ".to_string(),
                    symbols: vec!["MNQ".to_string(), "NQ".to_string(), "TQQQ".to_string(), "QQQ".to_string()],
                    max_concentration_pct: 0.5,
                },
                CorrelationGroup {
                    name: "SP500".to_string(),
                    symbols: vec!["MES".to_string(), "ES".to_string(), "SPY".to_string()],
                    max_concentration_pct: 0.5,
                },
            ],
        }
    }
}

impl ExposureLimits {
    /// The declared group a symbol belongs to, if any, after root
    /// normalization; `None` means it falls back to the per-root grouping.
    fn declared_group_for(&self, normalized_symbol: &str) -> Option<&CorrelationGroup> {
        self.groups.iter().find(|g| g.symbols.iter().any(|s| s == normalized_symbol))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExposureReport {
    pub gross_exposure: Decimal,
    pub net_exposure: Decimal,
    pub gross_exposure_pct: f64,
    pub net_exposure_pct: f64,
    pub group_exposure: HashMap<String, Decimal>,
    pub warnings: Vec<String>,
    pub breaches: Vec<String>,
}

/// A futures contract like `ESH25` normalizes to its root `ES`; anything
/// else (equities, already-bare roots) normalizes to itself.
pub fn correlation_group_of(symbol: &str) -> String {
    let bytes = symbol.as_bytes();
    if bytes.len() < 3 {
        return symbol.to_string();
    }
    const CONTRACT_MONTH_CODES: &[u8] = b"FGHJKMNQUVXZ";
    let root_len = bytes.len() - 3;
    if root_len == 0 || root_len > 3 {
        return symbol.to_string();
    }
    let month_code = bytes[root_len];
    let year_digits = &bytes[root_len + 1..];
    if CONTRACT_MONTH_CODES.contains(&month_code) && year_digits.iter().all(|b| b.is_ascii_digit()) {
        symbol[..root_len].to_string()
    } else {
        symbol.to_string()
    }
}

pub fn compute_exposure(
    positions: &HashMap<String, Decimal>,
    equity: Decimal,
    limits: &ExposureLimits,
) -> ExposureReport {
    use rust_decimal::prelude::ToPrimitive;

    let mut gross = Decimal::ZERO;
    let mut net = Decimal::ZERO;
    let mut group_exposure: HashMap<String, Decimal> = HashMap::new();
    let mut group_limits: HashMap<String, f64> = HashMap::new();

    for (symbol, value) in positions {
        gross += value.abs();
        net += *value;
        let root = correlation_group_of(symbol);
        let (group_key, group_limit) = match limits.declared_group_for(&root) {
            Some(g) => (g.name.clone(), g.max_concentration_pct),
            None => (root, limits.max_group_exposure_pct),
        };
        *group_exposure.entry(group_key.clone()).or_insert(Decimal::ZERO) += value.abs();
        group_limits.insert(group_key, group_limit);
    }

    if equity <= Decimal::ZERO {
        return ExposureReport {
            gross_exposure: gross,
            net_exposure: net,
            gross_exposure_pct: 0.0,
            net_exposure_pct: 0.0,
            group_exposure,
            warnings: Vec::new(),
            breaches: vec!["equity is zero or negative; exposure limits cannot be evaluated".to_string()],
        };
    }

    let equity_f64 = equity.to_f64().unwrap_or(1.0);
    let gross_pct = gross.to_f64().unwrap_or(0.0) / equity_f64;
    let net_pct = net.to_f64().unwrap_or(0.0) / equity_f64;

    let mut warnings = Vec::new();
    let mut breaches = Vec::new();

    check_limit(
        gross_pct,
        limits.max_gross_exposure_pct,
        limits.warning_threshold_pct,
        "gross exposure",
        &mut warnings,
        &mut breaches,
    );
    if net_pct >= 0.0 {
        check_limit(net_pct, limits.max_net_long_pct, limits.warning_threshold_pct, "net long exposure", &mut warnings, &mut breaches);
    } else {
        check_limit(net_pct.abs(), limits.max_net_short_pct, limits.warning_threshold_pct, "net short exposure", &mut warnings, &mut breaches);
    }
    for (group, value) in &group_exposure {
        let pct = value.to_f64().unwrap_or(0.0) / equity_f64;
        let max_pct = group_limits.get(group).copied().unwrap_or(limits.max_group_exposure_pct);
        check_limit(
            pct,
            max_pct,
            limits.warning_threshold_pct,
            &format!("correlation group {group}"),
            &mut warnings,
            &mut breaches,
        );
    }

    ExposureReport {
        gross_exposure: gross,
        net_exposure: net,
        gross_exposure_pct: gross_pct,
        net_exposure_pct: net_pct,
        group_exposure,
        warnings,
        breaches,
    }
}

fn check_limit(
    value_pct: f64,
    max_pct: f64,
    warning_threshold_pct: f64,
    label: &str,
    warnings: &mut Vec<String>,
    breaches: &mut Vec<String>,
) {
    if value_pct >= max_pct {
        breaches.push(format!(
            "{label} at {:.1}% exceeds limit {:.1}%",
            value_pct * 100.0,
            max_pct * 100.0
        ));
    } else if value_pct >= max_pct * warning_threshold_pct {
        warnings.push(format!(
            "{label} at {:.1}% is within {:.0}% of limit {:.1}%",
            value_pct * 100.0,
            (1.0 - warning_threshold_pct) * 100.0,
            max_pct * 100.0
        ));
    }
}
