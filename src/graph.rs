use crate::diagnostics::Finding;
use crate::schema::{FieldName, FinancialData};
use log::debug;
use serde::{Deserialize, Serialize};

/// Directed flows of the statement, as (source, target) pairs.
/// The target of each pair is also the field whose value sizes the link.
pub const TOPOLOGY: [(FieldName, FieldName); 5] = [
    (FieldName::Revenue, FieldName::CostOfRevenue),
    (FieldName::Revenue, FieldName::GrossProfit),
    (FieldName::GrossProfit, FieldName::OperatingExpenses),
    (FieldName::GrossProfit, FieldName::OperatingIncome),
    (FieldName::OperatingIncome, FieldName::NetIncome),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowNode {
    pub name: String,
    /// Signed statement value, for reference only; layout uses the link values.
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowLink {
    pub source: usize,
    pub target: usize,
    /// Layout width. Never below the configured floor.
    pub value: f64,
    /// The true signed amount the link stands for.
    pub absolute_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowGraph {
    pub nodes: Vec<FlowNode>,
    pub links: Vec<FlowLink>,
}

impl FlowGraph {
    /// Position of a field's node. Fixed for every graph.
    pub fn node_index(field: FieldName) -> usize {
        field as usize
    }

    pub fn node(&self, field: FieldName) -> Option<&FlowNode> {
        self.nodes.get(Self::node_index(field))
    }

    /// The single link that flows into `field`'s node. Revenue has none.
    pub fn link_into(&self, field: FieldName) -> Option<&FlowLink> {
        let target = Self::node_index(field);
        self.links.iter().find(|link| link.target == target)
    }
}

pub struct FlowGraphBuilder {
    min_link_value: f64,
    balance_tolerance: f64,
}

impl FlowGraphBuilder {
    pub fn new(min_link_value: f64, balance_tolerance: f64) -> Self {
        Self {
            min_link_value,
            balance_tolerance,
        }
    }

    /// Absolute value clamped to the floor, so zero and tiny amounts stay visible.
    pub fn layout_magnitude(&self, value: f64) -> f64 {
        value.abs().max(self.min_link_value)
    }

    pub fn build(&self, data: &FinancialData) -> FlowGraph {
        let nodes = FieldName::ALL
            .into_iter()
            .map(|field| FlowNode {
                name: field.label().to_string(),
                value: data.get(field),
            })
            .collect();

        let links = TOPOLOGY
            .into_iter()
            .map(|(source, target)| {
                let signed = data.get(target);
                FlowLink {
                    source: FlowGraph::node_index(source),
                    target: FlowGraph::node_index(target),
                    value: self.layout_magnitude(signed),
                    absolute_value: signed,
                }
            })
            .collect();

        FlowGraph { nodes, links }
    }

    /// Compares each parent's layout width with the widths flowing out of it.
    /// Reports mismatches; the graph itself is never adjusted.
    pub fn check_balance(&self, data: &FinancialData) -> Vec<Finding> {
        let branches = [
            (
                FieldName::Revenue,
                vec![FieldName::CostOfRevenue, FieldName::GrossProfit],
            ),
            (
                FieldName::GrossProfit,
                vec![FieldName::OperatingExpenses, FieldName::OperatingIncome],
            ),
            (FieldName::OperatingIncome, vec![FieldName::NetIncome]),
        ];

        branches
            .into_iter()
            .filter_map(|(parent, children)| {
                let expected = self.layout_magnitude(data.get(parent));
                let actual: f64 = children
                    .iter()
                    .map(|child| self.layout_magnitude(data.get(*child)))
                    .sum();
                let difference = (expected - actual).abs();

                if difference > self.balance_tolerance {
                    debug!(
                        "Flow imbalance at {}: {} vs {} (diff {})",
                        parent, expected, actual, difference
                    );
                    Some(Finding::FlowImbalance {
                        node: parent,
                        expected,
                        actual,
                        difference,
                    })
                } else {
                    None
                }
            })
            .collect()
    }
}
