use std::collections::HashMap;

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use tracing::debug;

use super::error::{EngineError, Result};
use super::policy::{ActiveDebt, AllocationPolicy};
use super::types::{
    validate_extra_payment, DebtPayoff, DebtRecord, EngineConfig, PaymentScheduleEntry, PlanKind, Portfolio,
    SimulationResult,
};

const MONTHS_PER_YEAR_PERCENT: Decimal = dec!(1200);

/// Per-run mutable state. Balances are indexed like `Portfolio::debts()`.
#[derive(Debug)]
struct SimulationState {
    balances: Vec<Decimal>,
    month_index: u32,
    cumulative_interest: Decimal,
    cumulative_paid: Decimal,
    /// Minimums of debts retired in earlier months, recycled into the discretionary pool.
    recycled_minimums: Decimal,
}

/// Discretionary budget for an accelerated run.
#[derive(Clone, Copy)]
struct Acceleration<'p> {
    policy: &'p AllocationPolicy,
    extra_payment: Decimal,
}

#[derive(Debug, Default)]
struct MonthOutcome {
    entries: Vec<PaymentScheduleEntry>,
    retired: Vec<usize>,
    unallocated: Decimal,
}

/// Runs `policy` over `portfolio` with a fixed monthly `extra_payment`.
///
/// With a zero extra payment the run is minimum-payments-only and the policy is
/// never consulted, so every strategy yields the same schedule.
pub fn simulate(
    portfolio: &Portfolio,
    policy: &AllocationPolicy,
    extra_payment: Decimal,
    config: &EngineConfig,
) -> Result<SimulationResult> {
    validate_extra_payment(extra_payment)?;
    let acceleration = (extra_payment > Decimal::ZERO).then_some(Acceleration {
        policy,
        extra_payment,
    });
    run_plan(
        portfolio,
        acceleration,
        policy.strategy().into(),
        config,
    )
}

/// Reference run: every debt receives exactly its minimum until retired.
pub fn simulate_minimum_only(
    portfolio: &Portfolio,
    config: &EngineConfig,
) -> Result<SimulationResult> {
    run_plan(portfolio, None, PlanKind::Baseline, config)
}

/// One month of interest on `balance`, rounded to the cent.
pub fn monthly_interest(balance: Decimal, annual_rate_percent: Decimal) -> Decimal {
    (balance * annual_rate_percent / MONTHS_PER_YEAR_PERCENT)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Fails on the first open debt whose minimum cannot outpace its interest.
pub fn check_amortization(portfolio: &Portfolio) -> Result<()> {
    for debt in portfolio.active() {
        let interest = monthly_interest(debt.balance, debt.annual_rate_percent);
        if debt.minimum_payment <= interest {
            return Err(EngineError::InsufficientMinimum {
                debt_id: debt.id.clone(),
                minimum_payment: debt.minimum_payment,
                monthly_interest: interest,
            });
        }
    }
    Ok(())
}

fn run_plan(
    portfolio: &Portfolio,
    acceleration: Option<Acceleration<'_>>,
    plan: PlanKind,
    config: &EngineConfig,
) -> Result<SimulationResult> {
    if config.max_months == 0 {
        return Err(EngineError::invalid_request("maxMonths must be > 0"));
    }
    check_amortization(portfolio)?;

    let debts = portfolio.debts();
    let index_by_id: HashMap<&str, usize> = debts
        .iter()
        .enumerate()
        .map(|(idx, d)| (d.id.as_str(), idx))
        .collect();

    debug!(
        strategy = ?plan,
        debts = debts.len(),
        extra = %acceleration.map(|a| a.extra_payment).unwrap_or_default(),
        "starting payoff simulation"
    );

    let mut state = SimulationState::new(debts);
    let mut schedule = Vec::new();
    let mut payoff_order = Vec::new();

    while state.open_debts() > 0 {
        if state.month_index >= config.max_months {
            debug!(strategy = ?plan, open = state.open_debts(), "payoff hit month ceiling");
            return Err(EngineError::NonConvergent {
                max_months: config.max_months,
                open_debts: state.open_debts(),
            });
        }

        let month_index = state.month_index;
        let outcome = state.advance_month(debts, &index_by_id, acceleration)?;
        payoff_order.extend(outcome.retired.iter().map(|&idx| DebtPayoff {
            debt_id: debts[idx].id.clone(),
            label: debts[idx].label.clone(),
            month_index,
        }));
        if !outcome.unallocated.is_zero() {
            debug!(
                month = month_index,
                unallocated = %outcome.unallocated,
                "budget left after final payoff"
            );
        }
        schedule.extend(outcome.entries);
    }

    debug!(
        strategy = ?plan,
        months = state.month_index,
        interest = %state.cumulative_interest,
        "payoff simulation finished"
    );

    Ok(SimulationResult {
        strategy: plan,
        months_to_payoff: state.month_index,
        total_interest_paid: state.cumulative_interest,
        total_paid: state.cumulative_paid,
        interest_saved_vs_baseline: None,
        payoff_order,
        schedule,
    })
}

impl SimulationState {
    fn new(debts: &[DebtRecord]) -> Self {
        Self {
            balances: debts.iter().map(|d| d.balance).collect(),
            month_index: 0,
            cumulative_interest: Decimal::ZERO,
            cumulative_paid: Decimal::ZERO,
            recycled_minimums: Decimal::ZERO,
        }
    }

    fn open_debts(&self) -> usize {
        self.balances.iter().filter(|b| **b > Decimal::ZERO).count()
    }

    fn advance_month(
        &mut self,
        debts: &[DebtRecord],
        index_by_id: &HashMap<&str, usize>,
        acceleration: Option<Acceleration<'_>>,
    ) -> Result<MonthOutcome> {
        let open: Vec<usize> = (0..debts.len())
            .filter(|&idx| self.balances[idx] > Decimal::ZERO)
            .collect();
        let count = debts.len();
        let mut interest = vec![Decimal::ZERO; count];
        let mut paid = vec![Decimal::ZERO; count];
        let mut extra = vec![Decimal::ZERO; count];

        for &idx in &open {
            let accrued = monthly_interest(self.balances[idx], debts[idx].annual_rate_percent);
            interest[idx] = accrued;
            self.balances[idx] += accrued;
            self.cumulative_interest += accrued;
        }

        // Minimums never spill onto other debts at this step.
        let mut surplus = Decimal::ZERO;
        for &idx in &open {
            let due = debts[idx].minimum_payment.min(self.balances[idx]);
            self.balances[idx] -= due;
            paid[idx] = due;
            if self.balances[idx].is_zero() {
                surplus += debts[idx].minimum_payment - due;
            }
        }

        let mut unallocated = Decimal::ZERO;
        if let Some(acceleration) = acceleration {
            let mut pool = acceleration.extra_payment + self.recycled_minimums + surplus;
            let still_open: Vec<ActiveDebt<'_>> = open
                .iter()
                .filter(|&&idx| self.balances[idx] > Decimal::ZERO)
                .map(|&idx| ActiveDebt::new(&debts[idx], self.balances[idx]))
                .collect();

            if !still_open.is_empty() {
                for id in acceleration.policy.order_priority(&still_open)? {
                    if pool.is_zero() {
                        break;
                    }
                    let idx = index_by_id[id];
                    let applied = pool.min(self.balances[idx]);
                    self.balances[idx] -= applied;
                    paid[idx] += applied;
                    extra[idx] = applied;
                    pool -= applied;
                }
            }
            unallocated = pool;
        }

        let mut outcome = MonthOutcome {
            unallocated,
            ..MonthOutcome::default()
        };
        for &idx in &open {
            self.cumulative_paid += paid[idx];
            if self.balances[idx].is_zero() {
                outcome.retired.push(idx);
                if acceleration.is_some() {
                    self.recycled_minimums += debts[idx].minimum_payment;
                }
            }
            outcome.entries.push(PaymentScheduleEntry {
                month_index: self.month_index,
                debt_id: debts[idx].id.clone(),
                interest_accrued: interest[idx],
                payment: paid[idx],
                principal_paid: paid[idx] - interest[idx],
                extra_applied: extra[idx],
                remaining_balance: self.balances[idx],
            });
        }

        self.month_index += 1;
        Ok(outcome)
    }
}
