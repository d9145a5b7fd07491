//! # Income Flow Builder
//!
//! A library for turning a sparse, loosely-typed income statement (as extracted from a
//! PDF or a model response) into a complete flow graph ready for a Sankey diagram.
//!
//! ## Core Concepts
//!
//! - **Raw Statement**: Field values as they arrived: numbers, `"$1,234.5"`-style strings,
//!   the literal `"Unknown"`, or junk
//! - **Normalization**: Cleans values into numbers and records what had to be rejected
//! - **Inference**: Fills missing line items from accounting identities
//!   (Revenue = Cost + Gross Profit, Gross Profit = OpEx + Operating Income) and fallback
//!   ratios, recording the provenance of every field
//! - **Flow Graph**: 6 nodes and 5 links with strictly positive layout widths and the true
//!   signed amounts alongside
//! - **Findings**: Advisory diagnostics returned with the result, never fatal
//!
//! ## Example
//!
//! ```rust
//! use income_flow_builder::*;
//!
//! let statement = RawStatement::new()
//!     .with("Revenue", "1,000")
//!     .with("Cost_of_Revenue", "600");
//!
//! let report = build_flow_report(Some(&statement)).unwrap();
//! assert_eq!(report.data.gross_profit, 400.0);
//! assert_eq!(report.graph.nodes[0].name, "Revenue");
//! assert!(report.graph.links.iter().all(|link| link.value >= 1.0));
//! ```

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod format;
pub mod graph;
pub mod inference;
pub mod ingestion;
pub mod normalizer;
pub mod schema;

#[cfg(feature = "ollama")]
pub mod llm;

pub use config::{FlowConfig, InferenceConfig};
pub use diagnostics::{Finding, Severity};
pub use error::{IncomeFlowError, Result};
pub use format::{format_compact, format_currency, format_verbose, CurrencyStyle};
pub use graph::{FlowGraph, FlowGraphBuilder, FlowLink, FlowNode};
pub use inference::{
    infer_missing_fields, DataOrigin, FieldDerivation, InferenceEngine, InferenceRule, Provenance,
    Snapshot,
};
pub use ingestion::*;
pub use normalizer::{NormalizedStatement, Normalizer};
pub use schema::*;

use log::{debug, info};
use serde::{Deserialize, Serialize};

/// Everything produced for one statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowReport {
    pub data: FinancialData,
    pub provenance: Provenance,
    pub graph: FlowGraph,
    pub findings: Vec<Finding>,
}

impl FlowReport {
    pub fn warnings(&self) -> impl Iterator<Item = &Finding> {
        diagnostics::warnings(&self.findings)
    }

    /// True when the source was too sparse or reported an error, so most of the
    /// diagram is estimated.
    pub fn is_low_confidence(&self) -> bool {
        self.findings.iter().any(|finding| {
            matches!(
                finding,
                Finding::InsufficientData { .. } | Finding::SourceError { .. }
            )
        })
    }

    pub fn origin(&self, field: FieldName) -> DataOrigin {
        self.provenance
            .get(&field)
            .map(|derivation| derivation.origin)
            .unwrap_or(DataOrigin::Defaulted)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[derive(Debug, Clone, Default)]
pub struct IncomeFlowProcessor {
    config: FlowConfig,
}

impl IncomeFlowProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: FlowConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    /// Runs normalization, inference and graph construction.
    ///
    /// Fails only when there is no statement at all. Every other input, however sparse,
    /// yields a graph; problems are reported through [`FlowReport::findings`].
    pub fn process(&self, statement: Option<&RawStatement>) -> Result<FlowReport> {
        let statement = statement.ok_or(IncomeFlowError::MissingStatement)?;

        info!(
            "Building flow graph from statement with {} field(s)",
            statement.len()
        );

        let normalized = Normalizer::new(self.config.min_cleaned_fields).normalize(statement);
        let snapshot = InferenceEngine::new(&self.config.inference).run(&normalized.cleaned);
        debug!("Resolved statement: {:?}", snapshot.data);

        let builder =
            FlowGraphBuilder::new(self.config.min_link_value, self.config.balance_tolerance);
        let graph = builder.build(&snapshot.data);

        let mut findings = normalized.findings;
        findings.extend(snapshot.inference_findings());
        findings.extend(builder.check_balance(&snapshot.data));
        diagnostics::log_findings(&findings);

        Ok(FlowReport {
            data: snapshot.data,
            provenance: snapshot.provenance,
            graph,
            findings,
        })
    }

    /// Parses a JSON statement and processes it. JSON `null` is treated as a missing statement.
    pub fn process_json(&self, json: &str) -> Result<FlowReport> {
        let statement = statement_from_json(json)?;
        self.process(Some(&statement))
    }
}

pub fn build_flow_report(statement: Option<&RawStatement>) -> Result<FlowReport> {
    IncomeFlowProcessor::new().process(statement)
}

pub fn build_flow_graph(statement: Option<&RawStatement>) -> Result<FlowGraph> {
    build_flow_report(statement).map(|report| report.graph)
}
