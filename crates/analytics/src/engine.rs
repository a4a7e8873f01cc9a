use crate::error::AnalyticsError;
use crate::report::PerformanceReport;
use core_types::EquityCurve;
use rust_decimal::prelude::*;
use rust_decimal::Decimal;

/// A stateless calculator for deriving performance metrics from an equity curve.
#[derive(Debug, Default)]
pub struct AnalyticsEngine {}

impl AnalyticsEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// The main entry point for calculating performance metrics.
    ///
    /// # Arguments
    ///
    /// * `curve` - The per-period account value of one backtest run.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `PerformanceReport` or an `AnalyticsError`.
    pub fn calculate(&self, curve: &EquityCurve) -> Result<PerformanceReport, AnalyticsError> {
        let (Some(first), Some(last)) = (curve.first(), curve.last()) else {
            return Err(AnalyticsError::NotEnoughData(
                "the equity curve is empty".to_string(),
            ));
        };
        if first.value <= Decimal::ZERO {
            return Err(AnalyticsError::DivisionByZero("total_return_pct".to_string()));
        }

        let values = curve.values();
        let total_net_profit = last.value - first.value;
        let total_return_pct = total_net_profit / first.value * Decimal::ONE_HUNDRED;
        let (max_drawdown, max_drawdown_pct) = Self::drawdown(&values);
        let sharpe_ratio = Self::sharpe_ratio(&Self::returns(&values)?)?;
        let calmar_ratio =
            (max_drawdown_pct > Decimal::ZERO).then(|| total_return_pct / max_drawdown_pct);

        tracing::debug!(
            periods = values.len(),
            %total_return_pct,
            %max_drawdown_pct,
            "Calculated performance report"
        );

        Ok(PerformanceReport {
            periods: values.len(),
            start: first.timestamp,
            end: last.timestamp,
            starting_value: first.value,
            final_value: last.value,
            total_net_profit,
            total_return_pct,
            max_drawdown,
            max_drawdown_pct,
            sharpe_ratio,
            calmar_ratio,
        })
    }

    /// Converts an equity curve into a cumulative-return series starting at 1.
    ///
    /// Each point is the previous one grown by that period's relative change, so two runs with
    /// different starting values can be drawn on the same axis.
    pub fn normalize(&self, curve: &EquityCurve) -> Result<Vec<Decimal>, AnalyticsError> {
        let values = curve.values();
        let mut normalized = Vec::with_capacity(values.len());
        let mut cumulative = Decimal::ONE;
        for (i, value) in values.iter().enumerate() {
            if i > 0 {
                cumulative *= Decimal::ONE + Self::period_return(values[i - 1], *value)?;
            }
            normalized.push(cumulative);
        }
        Ok(normalized)
    }

    /// The largest peak-to-trough decline, absolute and as a percentage of its peak.
    fn drawdown(values: &[Decimal]) -> (Decimal, Decimal) {
        let Some(&start) = values.first() else {
            return (Decimal::ZERO, Decimal::ZERO);
        };
        let mut peak = start;
        let mut max_drawdown = Decimal::ZERO;
        let mut max_drawdown_pct = Decimal::ZERO;

        for &value in values {
            if value > peak {
                peak = value;
            }
            let drawdown = peak - value;
            if drawdown > max_drawdown {
                max_drawdown = drawdown;
            }
            if peak > Decimal::ZERO {
                let pct = drawdown / peak * Decimal::ONE_HUNDRED;
                if pct > max_drawdown_pct {
                    max_drawdown_pct = pct;
                }
            }
        }
        (max_drawdown, max_drawdown_pct)
    }

    fn returns(values: &[Decimal]) -> Result<Vec<Decimal>, AnalyticsError> {
        values
            .windows(2)
            .map(|w| Self::period_return(w[0], w[1]))
            .collect()
    }

    fn period_return(previous: Decimal, current: Decimal) -> Result<Decimal, AnalyticsError> {
        if previous.is_zero() {
            return Err(AnalyticsError::DivisionByZero("period_return".to_string()));
        }
        Ok((current - previous) / previous)
    }

    /// Per-period Sharpe ratio with a risk-free rate of zero. Not annualized, since the
    /// length of a period is up to the quote source.
    fn sharpe_ratio(returns: &[Decimal]) -> Result<Option<Decimal>, AnalyticsError> {
        if returns.len() < 2 {
            return Ok(None);
        }

        let count = Decimal::from(returns.len());
        let mean_return = returns.iter().sum::<Decimal>() / count;
        let variance = returns
            .iter()
            .map(|r| (*r - mean_return) * (*r - mean_return))
            .sum::<Decimal>()
            / count;

        if variance <= Decimal::ZERO {
            return Ok(None);
        }

        let std_dev = variance.sqrt().ok_or_else(|| {
            AnalyticsError::Calculation("failed to take the square root of the variance".to_string())
        })?;
        Ok((std_dev > Decimal::ZERO).then(|| mean_return / std_dev))
    }
}
