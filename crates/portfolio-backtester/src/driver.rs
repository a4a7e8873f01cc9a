use crate::data_handler::QuoteMatrix;
use crate::error::BacktestError;
use configuration::Config;
use core_types::{CostBasisMethod, EquityCurve, EquityPoint, TradingPolicy, Weights};
use executor::{Broker, Ledger, PortfolioQuery};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use rebalance::{OrderGenerator, RebalanceOptions};
use rust_decimal::Decimal;

const PROGRESS_TEMPLATE: &str =
    "{prefix:>10} {spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})";

/// The equity curves of a HOLD and a REBALANCE run over the same history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparison {
    pub hold: EquityCurve,
    pub rebalance: EquityCurve,
}

/// Replays a quote history against a fresh simulated ledger.
///
/// Every run starts from `starting_cash` and buys into the target weights in the first period.
/// After that, a HOLD run only revalues its holdings while a REBALANCE run trades back to the
/// target weights each period. Runs are fail-fast: the first error ends the run and no partial
/// curve is returned.
///
/// The simulated ledger only fills whole shares, so orders are always sized in whole shares
/// regardless of `allow_partial_shares`.
#[derive(Debug, Clone)]
pub struct BacktestDriver {
    starting_cash: Decimal,
    cost_basis: CostBasisMethod,
    generator: OrderGenerator,
    show_progress: bool,
}

impl BacktestDriver {
    pub fn new(starting_cash: Decimal, options: RebalanceOptions) -> Self {
        if options.allow_partial_shares {
            tracing::warn!("Partial shares are not simulated; backtests trade whole shares");
        }
        Self {
            starting_cash,
            cost_basis: CostBasisMethod::default(),
            generator: OrderGenerator::new(RebalanceOptions {
                allow_partial_shares: false,
                ..options
            }),
            show_progress: false,
        }
    }

    /// Builds a driver from the `[account]`, `[backtest]` and `[rebalance]` settings.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.backtest.starting_cash,
            RebalanceOptions::from(&config.rebalance),
        )
        .with_cost_basis(config.account.cost_basis)
        .with_progress(config.backtest.show_progress)
    }

    pub fn with_starting_cash(mut self, starting_cash: Decimal) -> Self {
        self.starting_cash = starting_cash;
        self
    }

    pub fn with_cost_basis(mut self, method: CostBasisMethod) -> Self {
        self.cost_basis = method;
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn starting_cash(&self) -> Decimal {
        self.starting_cash
    }

    pub fn options(&self) -> &RebalanceOptions {
        self.generator.options()
    }

    /// Runs a single simulation and returns one equity point per period.
    pub fn run(
        &self,
        desired: &Weights,
        quotes: &QuoteMatrix,
        policy: TradingPolicy,
    ) -> Result<EquityCurve, BacktestError> {
        let progress = self.progress_bar(quotes.len(), policy)?;
        self.simulate(desired, quotes, policy, &progress)
    }

    /// Runs HOLD and REBALANCE on independent ledgers in parallel.
    pub fn compare(
        &self,
        desired: &Weights,
        quotes: &QuoteMatrix,
    ) -> Result<Comparison, BacktestError> {
        let bars = MultiProgress::new();
        let hold_bar = bars.add(self.progress_bar(quotes.len(), TradingPolicy::Hold)?);
        let rebalance_bar = bars.add(self.progress_bar(quotes.len(), TradingPolicy::Rebalance)?);

        let (hold, rebalance) = rayon::join(
            || self.simulate(desired, quotes, TradingPolicy::Hold, &hold_bar),
            || self.simulate(desired, quotes, TradingPolicy::Rebalance, &rebalance_bar),
        );
        Ok(Comparison {
            hold: hold?,
            rebalance: rebalance?,
        })
    }

    fn simulate(
        &self,
        desired: &Weights,
        quotes: &QuoteMatrix,
        policy: TradingPolicy,
        progress: &ProgressBar,
    ) -> Result<EquityCurve, BacktestError> {
        let assets = quotes.assets();
        let mut ledger = Ledger::new(self.starting_cash).with_cost_basis(self.cost_basis);
        let mut curve = EquityCurve::with_capacity(quotes.len());
        tracing::info!(
            %policy,
            periods = quotes.len(),
            assets = assets.len(),
            starting_cash = %self.starting_cash,
            "Starting backtest"
        );

        for (period, row) in quotes.iter().enumerate() {
            ledger.set_quotes(row.iter().cloned());

            if period == 0 || policy == TradingPolicy::Rebalance {
                let orders = self.generator.rebalance(&ledger, desired, assets)?;
                let outcomes = ledger.execute(&orders);
                if let Some((order, source)) = orders
                    .iter()
                    .zip(outcomes)
                    .find_map(|(order, outcome)| outcome.err().map(|e| (order, e)))
                {
                    progress.abandon();
                    return Err(BacktestError::OrderRejected {
                        period,
                        order: Box::new(order.clone()),
                        source,
                    });
                }
                tracing::debug!(%policy, period, orders = orders.len(), "Executed rebalance orders");
            }

            let value = ledger.available_cash()? + ledger.portfolio(assets)?.total_value;
            // Every row holds at least one quote, so the timestamp is always present.
            let timestamp = row.first().map(|q| q.timestamp).unwrap_or_default();
            curve.push(EquityPoint {
                period,
                timestamp,
                value,
            });
            progress.inc(1);
        }

        progress.finish_with_message("done");
        if let Some(last) = curve.last() {
            tracing::info!(%policy, final_value = %last.value, "Backtest complete");
        }
        Ok(curve)
    }

    fn progress_bar(
        &self,
        periods: usize,
        policy: TradingPolicy,
    ) -> Result<ProgressBar, BacktestError> {
        if !self.show_progress {
            return Ok(ProgressBar::hidden());
        }
        let bar = ProgressBar::new(periods as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template(PROGRESS_TEMPLATE)?
                .progress_chars("=>-"),
        );
        bar.set_prefix(policy.to_string());
        Ok(bar)
    }
}
