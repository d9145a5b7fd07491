use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Key under which an upstream extractor reports that it could not read the document.
pub const ERROR_FIELD: &str = "error";

/// The six line items of the simplified income statement, in statement order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
pub enum FieldName {
    #[serde(rename = "Revenue")]
    Revenue,
    #[serde(rename = "Cost_of_Revenue")]
    CostOfRevenue,
    #[serde(rename = "Gross_Profit")]
    GrossProfit,
    #[serde(rename = "Operating_Expenses")]
    OperatingExpenses,
    #[serde(rename = "Operating_Income")]
    OperatingIncome,
    #[serde(rename = "Net_Income")]
    NetIncome,
}

impl FieldName {
    pub const ALL: [FieldName; 6] = [
        FieldName::Revenue,
        FieldName::CostOfRevenue,
        FieldName::GrossProfit,
        FieldName::OperatingExpenses,
        FieldName::OperatingIncome,
        FieldName::NetIncome,
    ];

    /// The key used for this field in raw statements and serialized output.
    pub fn key(self) -> &'static str {
        match self {
            FieldName::Revenue => "Revenue",
            FieldName::CostOfRevenue => "Cost_of_Revenue",
            FieldName::GrossProfit => "Gross_Profit",
            FieldName::OperatingExpenses => "Operating_Expenses",
            FieldName::OperatingIncome => "Operating_Income",
            FieldName::NetIncome => "Net_Income",
        }
    }

    /// Human readable label, used for graph node names.
    pub fn label(self) -> &'static str {
        match self {
            FieldName::Revenue => "Revenue",
            FieldName::CostOfRevenue => "Cost of Revenue",
            FieldName::GrossProfit => "Gross Profit",
            FieldName::OperatingExpenses => "Operating Expenses",
            FieldName::OperatingIncome => "Operating Income",
            FieldName::NetIncome => "Net Income",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.key() == key)
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// One income statement exactly as it arrived: values may be numbers, formatted strings,
/// the literal `"Unknown"`, or anything else an extractor produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawStatement {
    fields: Map<String, Value>,
}

impl RawStatement {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, handy for assembling statements in code.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The extractor-reported failure message, if the statement carries a non-empty one.
    pub fn error_message(&self) -> Option<&str> {
        self.fields
            .get(ERROR_FIELD)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|message| !message.is_empty())
    }
}

impl From<Map<String, Value>> for RawStatement {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

/// Successfully parsed values, keyed by field. Absent keys could not be used.
pub type CleanedFields = BTreeMap<FieldName, f64>;

/// The complete statement: all six fields are always present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FinancialData {
    #[serde(rename = "Revenue")]
    pub revenue: f64,
    #[serde(rename = "Cost_of_Revenue")]
    pub cost_of_revenue: f64,
    #[serde(rename = "Gross_Profit")]
    pub gross_profit: f64,
    #[serde(rename = "Operating_Expenses")]
    pub operating_expenses: f64,
    #[serde(rename = "Operating_Income")]
    pub operating_income: f64,
    #[serde(rename = "Net_Income")]
    pub net_income: f64,
}

impl FinancialData {
    /// Seeds every field from the cleaned input, defaulting absent ones to zero.
    pub fn from_cleaned(cleaned: &CleanedFields) -> Self {
        FieldName::ALL
            .into_iter()
            .fold(Self::default(), |data, field| {
                data.with(field, cleaned.get(&field).copied().unwrap_or(0.0))
            })
    }

    pub fn get(&self, field: FieldName) -> f64 {
        match field {
            FieldName::Revenue => self.revenue,
            FieldName::CostOfRevenue => self.cost_of_revenue,
            FieldName::GrossProfit => self.gross_profit,
            FieldName::OperatingExpenses => self.operating_expenses,
            FieldName::OperatingIncome => self.operating_income,
            FieldName::NetIncome => self.net_income,
        }
    }

    /// Returns a copy with one field replaced.
    #[must_use]
    pub fn with(mut self, field: FieldName, value: f64) -> Self {
        let slot = match field {
            FieldName::Revenue => &mut self.revenue,
            FieldName::CostOfRevenue => &mut self.cost_of_revenue,
            FieldName::GrossProfit => &mut self.gross_profit,
            FieldName::OperatingExpenses => &mut self.operating_expenses,
            FieldName::OperatingIncome => &mut self.operating_income,
            FieldName::NetIncome => &mut self.net_income,
        };
        *slot = value;
        self
    }

    /// True when no field carries a value, i.e. there was nothing to anchor inference on.
    pub fn is_empty(&self) -> bool {
        FieldName::ALL.into_iter().all(|field| self.get(field) == 0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum StatementValue {
    Number(f64),
    Text(String),
}

/// Shape an extractor is asked to produce. Used to describe the expected output, never
/// to validate it: the normalizer accepts far looser input than this.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct StatementSchema {
    #[serde(rename = "Revenue")]
    #[schemars(
        description = "Total revenue (net sales) for the period. Number or string as printed, e.g. \"$1,234.5\". Use \"Unknown\" if not stated."
    )]
    pub revenue: Option<StatementValue>,

    #[serde(rename = "Cost_of_Revenue")]
    #[schemars(
        description = "Cost of revenue / cost of goods sold. Use \"Unknown\" if not stated."
    )]
    pub cost_of_revenue: Option<StatementValue>,

    #[serde(rename = "Gross_Profit")]
    #[schemars(description = "Gross profit (revenue minus cost of revenue). Use \"Unknown\" if not stated.")]
    pub gross_profit: Option<StatementValue>,

    #[serde(rename = "Operating_Expenses")]
    #[schemars(
        description = "Total operating expenses (SG&A, R&D, etc). Use \"Unknown\" if not stated."
    )]
    pub operating_expenses: Option<StatementValue>,

    #[serde(rename = "Operating_Income")]
    #[schemars(description = "Operating income (EBIT). Negative for an operating loss. Use \"Unknown\" if not stated.")]
    pub operating_income: Option<StatementValue>,

    #[serde(rename = "Net_Income")]
    #[schemars(description = "Net income after tax. Negative for a net loss. Use \"Unknown\" if not stated.")]
    pub net_income: Option<StatementValue>,
}

impl StatementSchema {
    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(StatementSchema)
    }

    pub fn schema_as_json() -> Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}
