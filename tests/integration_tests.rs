use income_flow_builder::*;
use serde_json::json;

fn approx_eq(actual: f64, expected: f64) -> bool {
    (actual - expected).abs() < 1e-9
}

fn layout_values(graph: &FlowGraph) -> Vec<f64> {
    graph.links.iter().map(|link| link.value).collect()
}

#[test]
fn test_revenue_only_uses_fallback_cost_ratio() -> anyhow::Result<()> {
    for revenue in [1.0, 250.0, 1_000.0, 48_500_000.0, 3.2e11] {
        let statement = RawStatement::new().with("Revenue", revenue);
        let report = build_flow_report(Some(&statement))?;

        assert!(approx_eq(report.data.cost_of_revenue, revenue * 0.65));
        assert!(approx_eq(report.data.gross_profit, revenue * 0.35));
        assert_eq!(report.origin(FieldName::CostOfRevenue), DataOrigin::Inferred);
    }
    Ok(())
}

#[test]
fn test_stated_operating_expenses_are_not_ratioed() -> anyhow::Result<()> {
    let cases = [(400.0, 100.0), (400.0, 500.0), (12_345.67, 2_345.6)];
    for (gross_profit, expenses) in cases {
        let statement = RawStatement::new()
            .with("Gross_Profit", gross_profit)
            .with("Operating_Expenses", expenses);
        let report = build_flow_report(Some(&statement))?;

        assert_eq!(report.data.operating_income, gross_profit - expenses);
        assert_eq!(report.data.operating_expenses, expenses);
    }
    Ok(())
}

#[test]
fn test_every_link_respects_the_floor() -> anyhow::Result<()> {
    let statements = vec![
        RawStatement::new(),
        RawStatement::new().with("Revenue", 0),
        RawStatement::new().with("Revenue", 0.3).with("Net_Income", -0.2),
        RawStatement::new().with("Operating_Income", "-1,500"),
        RawStatement::new()
            .with("Revenue", "Unknown")
            .with("Gross_Profit", json!(true))
            .with("Net_Income", json!([1, 2, 3])),
        RawStatement::new().with("Gross_Profit", 2.0).with("Revenue", 2.0),
    ];

    for statement in &statements {
        let graph = build_flow_graph(Some(statement))?;
        assert_eq!(graph.nodes.len(), 6);
        assert_eq!(graph.links.len(), 5);
        assert!(graph.links.iter().all(|link| link.value >= 1.0));
        assert!(graph
            .links
            .iter()
            .all(|link| link.source < 6 && link.target < 6));
        assert_eq!(graph.nodes[0].name, "Revenue");
        assert_eq!(graph.nodes[5].name, "Net Income");
    }
    Ok(())
}

#[test]
fn test_formatted_strings_and_unknown() -> anyhow::Result<()> {
    let statement = RawStatement::new()
        .with("Revenue", "1,234.50")
        .with("Net_Income", "Unknown");
    let report = build_flow_report(Some(&statement))?;

    assert_eq!(report.data.revenue, 1234.50);
    assert_eq!(report.origin(FieldName::Revenue), DataOrigin::Observed);
    assert_ne!(report.origin(FieldName::NetIncome), DataOrigin::Observed);
    assert!(report.findings.contains(&Finding::UnparseableField {
        field: FieldName::NetIncome,
        raw: json!("Unknown"),
    }));
    Ok(())
}

#[test]
fn test_revenue_and_cost_example() -> anyhow::Result<()> {
    let statement = RawStatement::new()
        .with("Revenue", "1,000")
        .with("Cost_of_Revenue", "600");
    let report = build_flow_report(Some(&statement))?;

    assert!(approx_eq(report.data.gross_profit, 400.0));
    assert!(approx_eq(report.data.operating_expenses, 280.0));
    assert!(approx_eq(report.data.operating_income, 120.0));
    assert!(approx_eq(report.data.net_income, 90.0));

    let expected = [600.0, 400.0, 280.0, 120.0, 90.0];
    for (actual, expected) in layout_values(&report.graph).into_iter().zip(expected) {
        assert!(approx_eq(actual, expected));
    }

    let signed: Vec<f64> = report
        .graph
        .links
        .iter()
        .map(|link| link.absolute_value)
        .collect();
    assert_eq!(
        signed,
        vec![
            report.data.cost_of_revenue,
            report.data.gross_profit,
            report.data.operating_expenses,
            report.data.operating_income,
            report.data.net_income,
        ]
    );

    // Operating income -> net income keeps only 75%, so the last step cannot balance.
    let imbalances: Vec<FieldName> = report
        .findings
        .iter()
        .filter_map(|finding| match finding {
            Finding::FlowImbalance { node, .. } => Some(*node),
            _ => None,
        })
        .collect();
    assert_eq!(imbalances, vec![FieldName::OperatingIncome]);
    Ok(())
}

#[test]
fn test_empty_statement_example() -> anyhow::Result<()> {
    let report = build_flow_report(Some(&RawStatement::new()))?;

    assert_eq!(report.data, FinancialData::default());
    assert_eq!(layout_values(&report.graph), vec![1.0; 5]);
    assert!(report
        .graph
        .links
        .iter()
        .all(|link| link.absolute_value == 0.0));
    assert!(report.is_low_confidence());
    assert!(report
        .provenance
        .values()
        .all(|derivation| derivation.origin == DataOrigin::Defaulted));
    Ok(())
}

#[test]
fn test_net_loss_example() -> anyhow::Result<()> {
    let statement = RawStatement::new().with("Net_Income", -50);
    let report = build_flow_report(Some(&statement))?;

    assert_eq!(report.data.operating_income, -62.5);

    let net = report
        .graph
        .link_into(FieldName::NetIncome)
        .expect("net income link");
    assert_eq!(net.absolute_value, -50.0);
    assert_eq!(net.value, 50.0);

    let operating = report
        .graph
        .link_into(FieldName::OperatingIncome)
        .expect("operating income link");
    assert_eq!(operating.value, 62.5);
    assert_eq!(operating.absolute_value, -62.5);
    Ok(())
}

#[test]
fn test_absent_statement_produces_no_graph() {
    match build_flow_graph(None) {
        Err(IncomeFlowError::MissingStatement) => {}
        other => panic!("expected MissingStatement, got {:?}", other),
    }
}

#[test]
fn test_extractor_error_still_yields_graph() -> anyhow::Result<()> {
    let statement = statement_from_model_response("Error: model timed out")?;
    let report = build_flow_report(Some(&statement))?;

    assert!(report.findings.contains(&Finding::SourceError {
        message: "model timed out".to_string()
    }));
    assert!(report.is_low_confidence());
    assert_eq!(report.graph.links.len(), 5);
    Ok(())
}

#[test]
fn test_messy_model_output_end_to_end() -> anyhow::Result<()> {
    let response = r#"Sure! Here are the figures:
```json
{
  "Revenue": "$5,200,000",
  "Cost_of_Revenue": "$3,100,000",
  "Gross_Profit": "Unknown",
  "Operating_Expenses": "1,400,000",
  "Operating_Income": null,
  "Net_Income": "520,000",
  "fiscal_year": "2023"
}
```"#;

    let statement = statement_from_model_response(response)?;
    let report = build_flow_report(Some(&statement))?;

    assert_eq!(report.data.gross_profit, 2_100_000.0);
    assert_eq!(report.data.operating_income, 700_000.0);
    assert_eq!(report.data.net_income, 520_000.0);
    assert_eq!(report.origin(FieldName::NetIncome), DataOrigin::Observed);
    assert!(report.findings.contains(&Finding::IgnoredField {
        key: "fiscal_year".to_string()
    }));

    let revenue = report.graph.node(FieldName::Revenue).expect("revenue node");
    assert_eq!(format_compact(revenue.value), "$5.2M");
    assert_eq!(format_verbose(revenue.value), "$5.20 million");
    Ok(())
}

#[test]
fn test_gross_profit_only_reconstructs_revenue() -> anyhow::Result<()> {
    let statement = RawStatement::new().with("Gross_Profit", "400");
    let report = build_flow_report(Some(&statement))?;

    assert!(approx_eq(report.data.revenue, 600.0));
    assert!(approx_eq(report.data.cost_of_revenue, 200.0));
    assert_eq!(
        report.provenance[&FieldName::Revenue].rule,
        Some(InferenceRule::RevenueFromGrossProfit)
    );
    Ok(())
}
