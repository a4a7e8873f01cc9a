use analytics::{AnalyticsEngine, PerformanceReport};
use anyhow::{Context, Result};
use comfy_table::{Cell, Table, presets::UTF8_FULL};
use core_types::{Asset, Order, PortfolioSnapshot, Weights};
use executor::OrderOutcome;
use portfolio_backtester::Comparison;
use portfolio_parser::TargetPortfolio;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fs::File;
use std::path::Path;

/// Everything a backtest produces, ready to print or save.
#[derive(Debug, Serialize)]
pub struct BacktestSummary {
    pub assets: Vec<Asset>,
    pub weights: Weights,
    pub starting_cash: Decimal,
    pub hold: PerformanceReport,
    pub rebalance: PerformanceReport,
    #[serde(skip)]
    pub comparison: Comparison,
    #[serde(skip)]
    pub hold_normalized: Vec<Decimal>,
    #[serde(skip)]
    pub rebalance_normalized: Vec<Decimal>,
}

impl BacktestSummary {
    pub fn new(
        target: &TargetPortfolio,
        starting_cash: Decimal,
        comparison: &Comparison,
    ) -> Result<Self> {
        let engine = AnalyticsEngine::new();
        Ok(Self {
            assets: target.assets.clone(),
            weights: target.weights.clone(),
            starting_cash,
            hold: engine.calculate(&comparison.hold)?,
            rebalance: engine.calculate(&comparison.rebalance)?,
            hold_normalized: engine.normalize(&comparison.hold)?,
            rebalance_normalized: engine.normalize(&comparison.rebalance)?,
            comparison: comparison.clone(),
        })
    }
}

fn new_table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(header.to_vec());
    table
}

fn optional(value: Option<Decimal>) -> String {
    value
        .map(|v| v.round_dp(4).to_string())
        .unwrap_or_else(|| "n/a".to_string())
}

pub fn report_table(summary: &BacktestSummary) -> Table {
    let (hold, rebalance) = (&summary.hold, &summary.rebalance);
    let mut table = new_table(&["Metric", "HOLD", "REBALANCE"]);
    let rows: [(&str, String, String); 7] = [
        (
            "Final value",
            hold.final_value.round_dp(2).to_string(),
            rebalance.final_value.round_dp(2).to_string(),
        ),
        (
            "Net profit",
            hold.total_net_profit.round_dp(2).to_string(),
            rebalance.total_net_profit.round_dp(2).to_string(),
        ),
        (
            "Total return %",
            hold.total_return_pct.round_dp(2).to_string(),
            rebalance.total_return_pct.round_dp(2).to_string(),
        ),
        (
            "Max drawdown",
            hold.max_drawdown.round_dp(2).to_string(),
            rebalance.max_drawdown.round_dp(2).to_string(),
        ),
        (
            "Max drawdown %",
            hold.max_drawdown_pct.round_dp(2).to_string(),
            rebalance.max_drawdown_pct.round_dp(2).to_string(),
        ),
        (
            "Sharpe ratio",
            optional(hold.sharpe_ratio),
            optional(rebalance.sharpe_ratio),
        ),
        (
            "Calmar ratio",
            optional(hold.calmar_ratio),
            optional(rebalance.calmar_ratio),
        ),
    ];
    for (metric, h, r) in rows {
        table.add_row(vec![Cell::new(metric), Cell::new(h), Cell::new(r)]);
    }
    table
}

pub fn orders_table(orders: &[Order]) -> Table {
    let mut table = new_table(&["#", "Side", "Asset", "Quantity", "Price", "Value", "Reason"]);
    for (i, order) in orders.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(order.side),
            Cell::new(&order.asset),
            Cell::new(order.quantity),
            Cell::new(order.price),
            Cell::new(order.value().round_dp(2)),
            Cell::new(&order.description),
        ]);
    }
    table
}

pub fn outcomes_table(orders: &[Order], outcomes: &[OrderOutcome]) -> Table {
    let mut table = new_table(&["#", "Order", "Result"]);
    for (i, (order, outcome)) in orders.iter().zip(outcomes).enumerate() {
        let result = match outcome {
            Ok(()) => "executed".to_string(),
            Err(e) => format!("rejected: {}", e),
        };
        table.add_row(vec![Cell::new(i + 1), Cell::new(order), Cell::new(result)]);
    }
    table
}

pub fn holdings_table(snapshot: &PortfolioSnapshot, target: &Weights) -> Table {
    let mut table = new_table(&["Asset", "Quantity", "Price", "Value", "Weight", "Target"]);
    for asset in &snapshot.assets {
        let quantity = snapshot.quantity(asset);
        let price = snapshot.price(asset).unwrap_or_default();
        table.add_row(vec![
            Cell::new(asset),
            Cell::new(quantity),
            Cell::new(price),
            Cell::new((quantity * price).round_dp(2)),
            Cell::new(snapshot.weights.get(asset).round_dp(4)),
            Cell::new(target.get(asset).round_dp(4)),
        ]);
    }
    table
}

/// Writes one row per period with the date and both normalized curves.
pub fn write_equity_csv(path: &Path, summary: &BacktestSummary) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    writer.write_record(["period", "date", "hold", "rebalance"])?;

    let rows = summary
        .comparison
        .hold
        .points
        .iter()
        .zip(&summary.hold_normalized)
        .zip(&summary.rebalance_normalized);
    for ((point, hold), rebalance) in rows {
        writer.write_record([
            point.period.to_string(),
            point.timestamp.format("%Y-%m-%d").to_string(),
            hold.round_dp(8).normalize().to_string(),
            rebalance.round_dp(8).normalize().to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_report_json(path: &Path, summary: &BacktestSummary) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(file, summary)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use core_types::{EquityCurve, EquityPoint, OrderSide};
    use rust_decimal_macros::dec;

    fn curve(values: &[Decimal]) -> EquityCurve {
        let start = Utc.with_ymd_and_hms(2019, 1, 2, 0, 0, 0).unwrap();
        let mut curve = EquityCurve::with_capacity(values.len());
        for (period, value) in values.iter().enumerate() {
            curve.push(EquityPoint {
                period,
                timestamp: start + Duration::days(period as i64),
                value: *value,
            });
        }
        curve
    }

    fn summary() -> BacktestSummary {
        let target = TargetPortfolio {
            weights: [(Asset::new("A"), dec!(1))].into_iter().collect(),
            assets: vec![Asset::new("A")],
        };
        let comparison = Comparison {
            hold: curve(&[dec!(100), dec!(150), dec!(120)]),
            rebalance: curve(&[dec!(100), dec!(150), dec!(135)]),
        };
        BacktestSummary::new(&target, dec!(100), &comparison).unwrap()
    }

    #[test]
    fn equity_csv_holds_normalized_curves() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("equity.csv");
        write_equity_csv(&path, &summary()).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = written.lines().collect();
        assert_eq!(lines[0], "period,date,hold,rebalance");
        assert_eq!(lines[1], "0,2019-01-02,1,1");
        assert_eq!(lines[3], "2,2019-01-04,1.2,1.35");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn report_json_has_both_runs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        write_report_json(&path, &summary()).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["assets"][0], "A");
        assert_eq!(json["hold"]["periods"], 3);
        assert!(json["rebalance"]["final_value"].as_str().is_some());
        assert!(json.get("comparison").is_none());
    }

    #[test]
    fn tables_render_every_row() {
        let rendered = report_table(&summary()).to_string();
        assert!(rendered.contains("REBALANCE"));
        assert!(rendered.contains("Total return %"));
        assert!(rendered.contains("Sharpe ratio"));

        let orders = vec![Order::new(
            "Allocation of unbound cash",
            OrderSide::Buy,
            Asset::new("A"),
            dec!(10),
            dec!(3),
        )];
        let rendered = orders_table(&orders).to_string();
        assert!(rendered.contains("BUY"));
        assert!(rendered.contains("Allocation of unbound cash"));
    }
}
