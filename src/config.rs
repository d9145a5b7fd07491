use crate::error::{IncomeFlowError, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_COST_OF_REVENUE_RATIO: f64 = 0.65;
pub const DEFAULT_OPERATING_EXPENSE_RATIO: f64 = 0.7;
pub const DEFAULT_NET_INCOME_RATIO: f64 = 0.75;
pub const DEFAULT_REVENUE_FROM_GROSS_PROFIT: f64 = 1.5;
pub const DEFAULT_OPERATING_FROM_NET: f64 = 1.25;
pub const DEFAULT_MIN_LINK_VALUE: f64 = 1.0;
pub const DEFAULT_BALANCE_TOLERANCE: f64 = 0.1;
pub const DEFAULT_MIN_CLEANED_FIELDS: usize = 2;

/// Fallback ratios used when a statement does not state a figure directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Share of revenue assumed to be cost of revenue.
    pub cost_of_revenue_ratio: f64,
    /// Share of gross profit assumed to be operating expenses.
    pub operating_expense_ratio: f64,
    /// Share of operating income assumed to survive to net income.
    pub net_income_ratio: f64,
    /// Revenue as a multiple of gross profit when revenue is missing.
    pub revenue_from_gross_profit: f64,
    /// Operating income as a multiple of net income when operating income is missing.
    pub operating_from_net: f64,
    /// When true, a field holding exactly zero counts as missing even if it was stated.
    /// When false, only fields absent from the input are eligible for inference.
    pub treat_zero_as_missing: bool,
    /// When true, reconstructing revenue from gross profit keeps a stated cost of revenue
    /// (Revenue = Gross_Profit + Cost_of_Revenue) instead of overwriting it with the ratio path.
    pub keep_stated_cost_in_revenue_inference: bool,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            cost_of_revenue_ratio: DEFAULT_COST_OF_REVENUE_RATIO,
            operating_expense_ratio: DEFAULT_OPERATING_EXPENSE_RATIO,
            net_income_ratio: DEFAULT_NET_INCOME_RATIO,
            revenue_from_gross_profit: DEFAULT_REVENUE_FROM_GROSS_PROFIT,
            operating_from_net: DEFAULT_OPERATING_FROM_NET,
            treat_zero_as_missing: true,
            keep_stated_cost_in_revenue_inference: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    pub inference: InferenceConfig,
    /// Smallest layout width a link may have.
    pub min_link_value: f64,
    /// Allowed gap between a node and the sum of its outgoing flows.
    pub balance_tolerance: f64,
    /// Below this many cleaned fields the result is flagged as low confidence.
    pub min_cleaned_fields: usize,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            inference: InferenceConfig::default(),
            min_link_value: DEFAULT_MIN_LINK_VALUE,
            balance_tolerance: DEFAULT_BALANCE_TOLERANCE,
            min_cleaned_fields: DEFAULT_MIN_CLEANED_FIELDS,
        }
    }
}

impl FlowConfig {
    /// Parses a configuration from JSON. Keys left out keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: FlowConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let ratios = [
            ("cost_of_revenue_ratio", self.inference.cost_of_revenue_ratio),
            ("operating_expense_ratio", self.inference.operating_expense_ratio),
            ("net_income_ratio", self.inference.net_income_ratio),
            ("revenue_from_gross_profit", self.inference.revenue_from_gross_profit),
            ("operating_from_net", self.inference.operating_from_net),
        ];

        for (field, ratio) in ratios {
            if !ratio.is_finite() || ratio < 0.0 {
                return Err(IncomeFlowError::InvalidConfig {
                    field: field.to_string(),
                    details: format!("ratio must be a finite, non-negative number, got {}", ratio),
                });
            }
        }

        if !self.min_link_value.is_finite() || self.min_link_value <= 0.0 {
            return Err(IncomeFlowError::InvalidConfig {
                field: "min_link_value".to_string(),
                details: format!(
                    "floor must be a finite, positive number, got {}",
                    self.min_link_value
                ),
            });
        }

        if !self.balance_tolerance.is_finite() || self.balance_tolerance < 0.0 {
            return Err(IncomeFlowError::InvalidConfig {
                field: "balance_tolerance".to_string(),
                details: format!(
                    "tolerance must be a finite, non-negative number, got {}",
                    self.balance_tolerance
                ),
            });
        }

        Ok(())
    }
}
