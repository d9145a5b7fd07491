//! Fills in the statement fields a source document did not state.
//!
//! Inference is a fixed pipeline of [`InferenceRule`]s. Each rule reads one [`Snapshot`] and
//! returns the next; later rules see what earlier ones filled in, and no rule runs twice.

use crate::config::InferenceConfig;
use crate::diagnostics::Finding;
use crate::schema::{CleanedFields, FieldName, FinancialData};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataOrigin {
    /// Parsed from the source statement.
    Observed,
    /// Computed by an inference rule.
    Inferred,
    /// Absent from the source and never filled; holds zero.
    Defaulted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDerivation {
    pub origin: DataOrigin,
    /// The rule that last wrote the field, for inferred values.
    pub rule: Option<InferenceRule>,
    /// Human readable explanation (e.g. "Revenue - Cost_of_Revenue")
    pub logic: String,
}

pub type Provenance = BTreeMap<FieldName, FieldDerivation>;

/// Statement values together with where each one came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub data: FinancialData,
    pub provenance: Provenance,
}

impl Snapshot {
    pub fn from_cleaned(cleaned: &CleanedFields) -> Self {
        let provenance = FieldName::ALL
            .into_iter()
            .map(|field| {
                let derivation = if cleaned.contains_key(&field) {
                    FieldDerivation {
                        origin: DataOrigin::Observed,
                        rule: None,
                        logic: "Parsed from source statement".to_string(),
                    }
                } else {
                    FieldDerivation {
                        origin: DataOrigin::Defaulted,
                        rule: None,
                        logic: "Not present in source; defaulted to 0".to_string(),
                    }
                };
                (field, derivation)
            })
            .collect();

        Self {
            data: FinancialData::from_cleaned(cleaned),
            provenance,
        }
    }

    pub fn value(&self, field: FieldName) -> f64 {
        self.data.get(field)
    }

    pub fn origin(&self, field: FieldName) -> DataOrigin {
        self.provenance
            .get(&field)
            .map(|derivation| derivation.origin)
            .unwrap_or(DataOrigin::Defaulted)
    }

    /// Whether a rule is allowed to fill `field`.
    pub fn is_missing(&self, field: FieldName, config: &InferenceConfig) -> bool {
        self.value(field) == 0.0
            && (config.treat_zero_as_missing || self.origin(field) == DataOrigin::Defaulted)
    }

    /// Whether `field` holds a figure that identities should be built from instead of ratios.
    fn has_direct_figure(&self, field: FieldName, config: &InferenceConfig) -> bool {
        if config.treat_zero_as_missing {
            self.value(field) > 0.0
        } else {
            self.origin(field) != DataOrigin::Defaulted
        }
    }

    #[must_use]
    fn infer(mut self, field: FieldName, value: f64, rule: InferenceRule, logic: String) -> Self {
        debug!("{:?}: {} = {} ({})", rule, field, value, logic);
        self.data = self.data.with(field, value);
        self.provenance.insert(
            field,
            FieldDerivation {
                origin: DataOrigin::Inferred,
                rule: Some(rule),
                logic,
            },
        );
        self
    }

    /// One info finding per inferred field, in statement order.
    pub fn inference_findings(&self) -> Vec<Finding> {
        self.provenance
            .iter()
            .filter(|(_, derivation)| derivation.origin == DataOrigin::Inferred)
            .filter_map(|(field, derivation)| {
                derivation.rule.map(|rule| Finding::FieldInferred {
                    field: *field,
                    rule,
                    value: self.value(*field),
                    logic: derivation.logic.clone(),
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InferenceRule {
    /// Revenue = Cost_of_Revenue + Gross_Profit, falling back to a cost ratio.
    RevenueSplit,
    /// Gross_Profit = Operating_Expenses + Operating_Income, falling back to an expense ratio.
    GrossProfitSplit,
    /// Net_Income as a fixed share of Operating_Income.
    NetFromOperating,
    /// Revenue reconstructed from Gross_Profit.
    RevenueFromGrossProfit,
    /// Operating_Income reconstructed from Net_Income.
    OperatingFromNet,
}

impl InferenceRule {
    /// Application order. Changing it changes results.
    pub const ORDER: [InferenceRule; 5] = [
        InferenceRule::RevenueSplit,
        InferenceRule::GrossProfitSplit,
        InferenceRule::NetFromOperating,
        InferenceRule::RevenueFromGrossProfit,
        InferenceRule::OperatingFromNet,
    ];

    pub fn apply(self, snapshot: &Snapshot, config: &InferenceConfig) -> Snapshot {
        let next = snapshot.clone();
        match self {
            InferenceRule::RevenueSplit => revenue_split(next, config),
            InferenceRule::GrossProfitSplit => gross_profit_split(next, config),
            InferenceRule::NetFromOperating => net_from_operating(next, config),
            InferenceRule::RevenueFromGrossProfit => revenue_from_gross_profit(next, config),
            InferenceRule::OperatingFromNet => operating_from_net(next, config),
        }
    }
}

fn revenue_split(snapshot: Snapshot, config: &InferenceConfig) -> Snapshot {
    let rule = InferenceRule::RevenueSplit;
    let data = snapshot.data;
    if data.revenue <= 0.0 {
        return snapshot;
    }

    if snapshot.is_missing(FieldName::GrossProfit, config) {
        if snapshot.has_direct_figure(FieldName::CostOfRevenue, config) {
            snapshot.infer(
                FieldName::GrossProfit,
                data.revenue - data.cost_of_revenue,
                rule,
                "Revenue - Cost_of_Revenue".to_string(),
            )
        } else {
            let cost = data.revenue * config.cost_of_revenue_ratio;
            snapshot
                .infer(
                    FieldName::CostOfRevenue,
                    cost,
                    rule,
                    format!("{} x Revenue (fallback cost ratio)", config.cost_of_revenue_ratio),
                )
                .infer(
                    FieldName::GrossProfit,
                    data.revenue - cost,
                    rule,
                    "Revenue - Cost_of_Revenue".to_string(),
                )
        }
    } else if snapshot.is_missing(FieldName::CostOfRevenue, config) {
        snapshot.infer(
            FieldName::CostOfRevenue,
            data.revenue - data.gross_profit,
            rule,
            "Revenue - Gross_Profit".to_string(),
        )
    } else {
        snapshot
    }
}

fn gross_profit_split(snapshot: Snapshot, config: &InferenceConfig) -> Snapshot {
    let rule = InferenceRule::GrossProfitSplit;
    let data = snapshot.data;
    if data.gross_profit <= 0.0 {
        return snapshot;
    }

    if snapshot.is_missing(FieldName::OperatingIncome, config) {
        if snapshot.has_direct_figure(FieldName::OperatingExpenses, config) {
            snapshot.infer(
                FieldName::OperatingIncome,
                data.gross_profit - data.operating_expenses,
                rule,
                "Gross_Profit - Operating_Expenses".to_string(),
            )
        } else {
            let expenses = data.gross_profit * config.operating_expense_ratio;
            snapshot
                .infer(
                    FieldName::OperatingExpenses,
                    expenses,
                    rule,
                    format!(
                        "{} x Gross_Profit (fallback expense ratio)",
                        config.operating_expense_ratio
                    ),
                )
                .infer(
                    FieldName::OperatingIncome,
                    data.gross_profit - expenses,
                    rule,
                    "Gross_Profit - Operating_Expenses".to_string(),
                )
        }
    } else if snapshot.is_missing(FieldName::OperatingExpenses, config) {
        snapshot.infer(
            FieldName::OperatingExpenses,
            data.gross_profit - data.operating_income,
            rule,
            "Gross_Profit - Operating_Income".to_string(),
        )
    } else {
        snapshot
    }
}

fn net_from_operating(snapshot: Snapshot, config: &InferenceConfig) -> Snapshot {
    let operating_income = snapshot.data.operating_income;
    if operating_income == 0.0 || !snapshot.is_missing(FieldName::NetIncome, config) {
        return snapshot;
    }

    snapshot.infer(
        FieldName::NetIncome,
        operating_income * config.net_income_ratio,
        InferenceRule::NetFromOperating,
        format!("{} x Operating_Income", config.net_income_ratio),
    )
}

fn revenue_from_gross_profit(snapshot: Snapshot, config: &InferenceConfig) -> Snapshot {
    let rule = InferenceRule::RevenueFromGrossProfit;
    let data = snapshot.data;
    if data.gross_profit <= 0.0 || !snapshot.is_missing(FieldName::Revenue, config) {
        return snapshot;
    }

    if config.keep_stated_cost_in_revenue_inference
        && !snapshot.is_missing(FieldName::CostOfRevenue, config)
    {
        return snapshot.infer(
            FieldName::Revenue,
            data.gross_profit + data.cost_of_revenue,
            rule,
            "Gross_Profit + Cost_of_Revenue".to_string(),
        );
    }

    let revenue = data.gross_profit * config.revenue_from_gross_profit;
    snapshot
        .infer(
            FieldName::Revenue,
            revenue,
            rule,
            format!("{} x Gross_Profit", config.revenue_from_gross_profit),
        )
        .infer(
            FieldName::CostOfRevenue,
            revenue - data.gross_profit,
            rule,
            "Revenue - Gross_Profit".to_string(),
        )
}

fn operating_from_net(snapshot: Snapshot, config: &InferenceConfig) -> Snapshot {
    let net_income = snapshot.data.net_income;
    if net_income == 0.0 || !snapshot.is_missing(FieldName::OperatingIncome, config) {
        return snapshot;
    }

    snapshot.infer(
        FieldName::OperatingIncome,
        net_income * config.operating_from_net,
        InferenceRule::OperatingFromNet,
        format!("{} x Net_Income", config.operating_from_net),
    )
}

pub struct InferenceEngine<'a> {
    config: &'a InferenceConfig,
}

impl<'a> InferenceEngine<'a> {
    pub fn new(config: &'a InferenceConfig) -> Self {
        Self { config }
    }

    /// Seeds a snapshot from the cleaned fields and runs every rule in [`InferenceRule::ORDER`].
    pub fn run(&self, cleaned: &CleanedFields) -> Snapshot {
        let seed = Snapshot::from_cleaned(cleaned);
        InferenceRule::ORDER
            .into_iter()
            .fold(seed, |snapshot, rule| rule.apply(&snapshot, self.config))
    }
}

pub fn infer_missing_fields(cleaned: &CleanedFields, config: &InferenceConfig) -> Snapshot {
    InferenceEngine::new(config).run(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cleaned(values: &[(FieldName, f64)]) -> CleanedFields {
        values.iter().copied().collect()
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    #[test]
    fn test_seed_snapshot_origins() {
        let snapshot = Snapshot::from_cleaned(&cleaned(&[(FieldName::Revenue, 100.0)]));
        assert_eq!(snapshot.origin(FieldName::Revenue), DataOrigin::Observed);
        assert_eq!(snapshot.origin(FieldName::NetIncome), DataOrigin::Defaulted);
        assert_eq!(snapshot.provenance.len(), 6);
        assert_eq!(snapshot.data.net_income, 0.0);
    }

    #[test]
    fn test_revenue_split_uses_cost_ratio() {
        let config = InferenceConfig::default();
        let seed = Snapshot::from_cleaned(&cleaned(&[(FieldName::Revenue, 1000.0)]));
        let next = InferenceRule::RevenueSplit.apply(&seed, &config);

        assert_close(next.data.cost_of_revenue, 650.0);
        assert_close(next.data.gross_profit, 350.0);
        assert_eq!(next.origin(FieldName::CostOfRevenue), DataOrigin::Inferred);
        // The input snapshot is untouched.
        assert_eq!(seed.data.gross_profit, 0.0);
    }

    #[test]
    fn test_revenue_split_prefers_stated_cost() {
        let config = InferenceConfig::default();
        let seed = Snapshot::from_cleaned(&cleaned(&[
            (FieldName::Revenue, 1000.0),
            (FieldName::CostOfRevenue, 600.0),
        ]));
        let next = InferenceRule::RevenueSplit.apply(&seed, &config);

        assert_close(next.data.gross_profit, 400.0);
        assert_eq!(next.origin(FieldName::CostOfRevenue), DataOrigin::Observed);
    }

    #[test]
    fn test_revenue_split_fills_cost_from_gross_profit() {
        let config = InferenceConfig::default();
        let seed = Snapshot::from_cleaned(&cleaned(&[
            (FieldName::Revenue, 1000.0),
            (FieldName::GrossProfit, 300.0),
        ]));
        let next = InferenceRule::RevenueSplit.apply(&seed, &config);
        assert_close(next.data.cost_of_revenue, 700.0);
    }

    #[test]
    fn test_revenue_split_ignores_non_positive_revenue() {
        let config = InferenceConfig::default();
        let seed = Snapshot::from_cleaned(&cleaned(&[(FieldName::Revenue, -10.0)]));
        assert_eq!(InferenceRule::RevenueSplit.apply(&seed, &config), seed);
    }

    #[test]
    fn test_gross_profit_split() {
        let config = InferenceConfig::default();

        let with_expenses = Snapshot::from_cleaned(&cleaned(&[
            (FieldName::GrossProfit, 500.0),
            (FieldName::OperatingExpenses, 320.0),
        ]));
        let next = InferenceRule::GrossProfitSplit.apply(&with_expenses, &config);
        assert_eq!(next.data.operating_income, 500.0 - 320.0);
        assert_eq!(next.origin(FieldName::OperatingExpenses), DataOrigin::Observed);

        let ratio_only = Snapshot::from_cleaned(&cleaned(&[(FieldName::GrossProfit, 400.0)]));
        let next = InferenceRule::GrossProfitSplit.apply(&ratio_only, &config);
        assert_close(next.data.operating_expenses, 280.0);
        assert_close(next.data.operating_income, 120.0);

        let with_income = Snapshot::from_cleaned(&cleaned(&[
            (FieldName::GrossProfit, 400.0),
            (FieldName::OperatingIncome, -50.0),
        ]));
        let next = InferenceRule::GrossProfitSplit.apply(&with_income, &config);
        assert_close(next.data.operating_expenses, 450.0);
    }

    #[test]
    fn test_net_from_operating() {
        let config = InferenceConfig::default();
        let seed = Snapshot::from_cleaned(&cleaned(&[(FieldName::OperatingIncome, -200.0)]));
        let next = InferenceRule::NetFromOperating.apply(&seed, &config);
        assert_close(next.data.net_income, -150.0);

        let stated = Snapshot::from_cleaned(&cleaned(&[
            (FieldName::OperatingIncome, 200.0),
            (FieldName::NetIncome, 10.0),
        ]));
        assert_eq!(InferenceRule::NetFromOperating.apply(&stated, &config), stated);
    }

    #[test]
    fn test_revenue_from_gross_profit() {
        let config = InferenceConfig::default();
        let seed = Snapshot::from_cleaned(&cleaned(&[(FieldName::GrossProfit, 400.0)]));
        let next = InferenceRule::RevenueFromGrossProfit.apply(&seed, &config);
        assert_close(next.data.revenue, 600.0);
        assert_close(next.data.cost_of_revenue, 200.0);
        assert_eq!(
            next.provenance[&FieldName::Revenue].rule,
            Some(InferenceRule::RevenueFromGrossProfit)
        );
    }

    #[test]
    fn test_revenue_from_gross_profit_overwrites_stated_cost_by_default() {
        let config = InferenceConfig::default();
        let seed = Snapshot::from_cleaned(&cleaned(&[
            (FieldName::GrossProfit, 400.0),
            (FieldName::CostOfRevenue, 600.0),
        ]));
        let next = InferenceRule::RevenueFromGrossProfit.apply(&seed, &config);
        assert_close(next.data.revenue, 600.0);
        assert_close(next.data.cost_of_revenue, 200.0);
        assert_eq!(next.origin(FieldName::CostOfRevenue), DataOrigin::Inferred);
    }

    #[test]
    fn test_revenue_from_gross_profit_keeps_stated_cost() {
        let config = InferenceConfig {
            keep_stated_cost_in_revenue_inference: true,
            ..InferenceConfig::default()
        };
        let seed = Snapshot::from_cleaned(&cleaned(&[
            (FieldName::GrossProfit, 400.0),
            (FieldName::CostOfRevenue, 600.0),
        ]));
        let next = InferenceRule::RevenueFromGrossProfit.apply(&seed, &config);
        assert_close(next.data.revenue, 1000.0);
        assert_eq!(next.data.cost_of_revenue, 600.0);
        assert_eq!(next.origin(FieldName::CostOfRevenue), DataOrigin::Observed);
    }

    #[test]
    fn test_operating_from_net() {
        let config = InferenceConfig::default();
        let seed = Snapshot::from_cleaned(&cleaned(&[(FieldName::NetIncome, -50.0)]));
        let next = InferenceRule::OperatingFromNet.apply(&seed, &config);
        assert_close(next.data.operating_income, -62.5);
    }

    #[test]
    fn test_full_pipeline_from_revenue_and_cost() {
        let snapshot = infer_missing_fields(
            &cleaned(&[
                (FieldName::Revenue, 1000.0),
                (FieldName::CostOfRevenue, 600.0),
            ]),
            &InferenceConfig::default(),
        );

        assert_close(snapshot.data.gross_profit, 400.0);
        assert_close(snapshot.data.operating_expenses, 280.0);
        assert_close(snapshot.data.operating_income, 120.0);
        assert_close(snapshot.data.net_income, 90.0);

        let inferred: Vec<FieldName> = snapshot
            .inference_findings()
            .iter()
            .filter_map(|finding| match finding {
                Finding::FieldInferred { field, .. } => Some(*field),
                _ => None,
            })
            .collect();
        assert_eq!(
            inferred,
            vec![
                FieldName::GrossProfit,
                FieldName::OperatingExpenses,
                FieldName::OperatingIncome,
                FieldName::NetIncome,
            ]
        );
    }

    #[test]
    fn test_full_pipeline_from_gross_profit_only() {
        let snapshot = infer_missing_fields(
            &cleaned(&[(FieldName::GrossProfit, 400.0)]),
            &InferenceConfig::default(),
        );

        // Rule 2 and 3 run before revenue is reconstructed by rule 4.
        assert_close(snapshot.data.operating_expenses, 280.0);
        assert_close(snapshot.data.operating_income, 120.0);
        assert_close(snapshot.data.net_income, 90.0);
        assert_close(snapshot.data.revenue, 600.0);
        assert_close(snapshot.data.cost_of_revenue, 200.0);
    }

    #[test]
    fn test_nothing_to_anchor_on() {
        let snapshot = infer_missing_fields(&CleanedFields::new(), &InferenceConfig::default());
        assert!(snapshot.data.is_empty());
        assert!(snapshot.inference_findings().is_empty());
        assert!(snapshot
            .provenance
            .values()
            .all(|derivation| derivation.origin == DataOrigin::Defaulted));
    }

    #[test]
    fn test_stated_zero_respected_when_not_sentinel() {
        let config = InferenceConfig {
            treat_zero_as_missing: false,
            ..InferenceConfig::default()
        };
        let input = cleaned(&[(FieldName::Revenue, 1000.0), (FieldName::CostOfRevenue, 0.0)]);

        let snapshot = infer_missing_fields(&input, &config);
        assert_eq!(snapshot.data.cost_of_revenue, 0.0);
        assert_close(snapshot.data.gross_profit, 1000.0);

        let sentinel = infer_missing_fields(&input, &InferenceConfig::default());
        assert_close(sentinel.data.cost_of_revenue, 650.0);
    }
}
