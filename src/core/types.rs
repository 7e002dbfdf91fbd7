use std::collections::HashSet;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

use super::error::{EngineError, FailureKind, Result};

/// Hard ceiling on simulated months (100 years).
pub const DEFAULT_MAX_MONTHS: u32 = 1200;
pub const DEFAULT_RATE_WEIGHT: Decimal = dec!(0.7);
/// Upper bound on any balance, minimum or extra payment. Keeps every product and
/// running total of a 1200-month run far below `Decimal::MAX`.
pub const MAX_AMOUNT: Decimal = dec!(1000000000000000);
pub const MAX_ANNUAL_RATE_PERCENT: Decimal = dec!(1000);

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Avalanche,
    Snowball,
    Custom,
}

impl Strategy {
    pub const ALL: [Strategy; 3] = [Strategy::Avalanche, Strategy::Snowball, Strategy::Custom];
}

/// Label attached to every simulation result.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanKind {
    Baseline,
    Avalanche,
    Snowball,
    Custom,
}

impl From<Strategy> for PlanKind {
    fn from(value: Strategy) -> Self {
        match value {
            Strategy::Avalanche => PlanKind::Avalanche,
            Strategy::Snowball => PlanKind::Snowball,
            Strategy::Custom => PlanKind::Custom,
        }
    }
}

/// Blend of "highest rate" and "smallest balance" used by the custom strategy.
/// The two weights always sum to one.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomWeights {
    rate_weight: Decimal,
    balance_weight: Decimal,
}

impl CustomWeights {
    pub fn new(rate_weight: Decimal) -> Result<Self> {
        if rate_weight < Decimal::ZERO || rate_weight > Decimal::ONE {
            return Err(EngineError::invalid_request(format!(
                "rateWeight must be between 0 and 1, got {rate_weight}"
            )));
        }
        Ok(Self {
            rate_weight,
            balance_weight: Decimal::ONE - rate_weight,
        })
    }

    pub fn rate_weight(&self) -> Decimal {
        self.rate_weight
    }

    pub fn balance_weight(&self) -> Decimal {
        self.balance_weight
    }
}

impl Default for CustomWeights {
    fn default() -> Self {
        Self {
            rate_weight: DEFAULT_RATE_WEIGHT,
            balance_weight: Decimal::ONE - DEFAULT_RATE_WEIGHT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebtRecord {
    pub id: String,
    pub balance: Decimal,
    pub annual_rate_percent: Decimal,
    pub minimum_payment: Decimal,
    pub label: String,
}

impl DebtRecord {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        balance: Decimal,
        annual_rate_percent: Decimal,
        minimum_payment: Decimal,
    ) -> Self {
        Self {
            id: id.into(),
            balance,
            annual_rate_percent,
            minimum_payment,
            label: label.into(),
        }
    }

    /// Zero-balance debts are retired from month 0.
    pub fn is_retired(&self) -> bool {
        self.balance.is_zero()
    }
}

/// Validated, ordered debt set. Ids are unique and every balance is non-negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Portfolio {
    debts: Vec<DebtRecord>,
}

impl Portfolio {
    pub fn new(debts: Vec<DebtRecord>) -> Result<Self> {
        if debts.is_empty() {
            return Err(EngineError::invalid_portfolio(
                "portfolio must contain at least one debt",
            ));
        }

        let mut seen = HashSet::with_capacity(debts.len());
        for debt in &debts {
            if debt.id.trim().is_empty() {
                return Err(EngineError::invalid_portfolio("debt id must not be empty"));
            }
            if !seen.insert(debt.id.as_str()) {
                return Err(EngineError::invalid_debt(&debt.id, "duplicate id"));
            }
            if debt.balance < Decimal::ZERO {
                return Err(EngineError::invalid_debt(&debt.id, "balance must be >= 0"));
            }
            if debt.balance > MAX_AMOUNT {
                return Err(EngineError::invalid_debt(
                    &debt.id,
                    format!("balance must be <= {MAX_AMOUNT}"),
                ));
            }
            if debt.annual_rate_percent < Decimal::ZERO {
                return Err(EngineError::invalid_debt(
                    &debt.id,
                    "annualRatePercent must be >= 0",
                ));
            }
            if debt.annual_rate_percent > MAX_ANNUAL_RATE_PERCENT {
                return Err(EngineError::invalid_debt(
                    &debt.id,
                    format!("annualRatePercent must be <= {MAX_ANNUAL_RATE_PERCENT}"),
                ));
            }
            if debt.minimum_payment > MAX_AMOUNT {
                return Err(EngineError::invalid_debt(
                    &debt.id,
                    format!("minimumPayment must be <= {MAX_AMOUNT}"),
                ));
            }
            if !debt.is_retired() && debt.minimum_payment <= Decimal::ZERO {
                return Err(EngineError::invalid_debt(
                    &debt.id,
                    "minimumPayment must be > 0 while a balance is owed",
                ));
            }
        }

        Ok(Self { debts })
    }

    pub fn debts(&self) -> &[DebtRecord] {
        &self.debts
    }

    pub fn len(&self) -> usize {
        self.debts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.debts.is_empty()
    }

    pub fn active(&self) -> impl Iterator<Item = &DebtRecord> {
        self.debts.iter().filter(|d| !d.is_retired())
    }

    pub fn total_balance(&self) -> Decimal {
        self.debts.iter().map(|d| d.balance).sum()
    }

    /// Sum of the minimums of every debt still carrying a balance.
    pub fn total_minimum_payment(&self) -> Decimal {
        self.active().map(|d| d.minimum_payment).sum()
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct EngineConfig {
    pub max_months: u32,
    pub parallel: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_months: DEFAULT_MAX_MONTHS,
            parallel: true,
        }
    }
}

/// One debt's ledger line for one month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentScheduleEntry {
    pub month_index: u32,
    pub debt_id: String,
    pub interest_accrued: Decimal,
    pub payment: Decimal,
    pub principal_paid: Decimal,
    pub extra_applied: Decimal,
    pub remaining_balance: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebtPayoff {
    pub debt_id: String,
    pub label: String,
    pub month_index: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    pub strategy: PlanKind,
    pub months_to_payoff: u32,
    pub total_interest_paid: Decimal,
    pub total_paid: Decimal,
    pub interest_saved_vs_baseline: Option<Decimal>,
    pub payoff_order: Vec<DebtPayoff>,
    pub schedule: Vec<PaymentScheduleEntry>,
}

impl SimulationResult {
    /// Schedule lines for a single month, in portfolio order.
    pub fn month(&self, month_index: u32) -> impl Iterator<Item = &PaymentScheduleEntry> {
        self.schedule
            .iter()
            .filter(move |e| e.month_index == month_index)
    }

    pub fn payoff_month(&self, debt_id: &str) -> Option<u32> {
        self.payoff_order
            .iter()
            .find(|p| p.debt_id == debt_id)
            .map(|p| p.month_index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyFailure {
    pub strategy: PlanKind,
    pub kind: FailureKind,
    pub debt_id: Option<String>,
    pub message: String,
}

impl StrategyFailure {
    pub fn from_error(strategy: PlanKind, err: &EngineError) -> Self {
        Self {
            strategy,
            kind: err.kind(),
            debt_id: err.debt_id().map(str::to_string),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum RunOutcome {
    Completed(SimulationResult),
    Failed(StrategyFailure),
}

impl RunOutcome {
    pub fn result(&self) -> Option<&SimulationResult> {
        match self {
            RunOutcome::Completed(result) => Some(result),
            RunOutcome::Failed(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonReport {
    pub baseline: RunOutcome,
    /// Successful strategies, cheapest first.
    pub results: Vec<SimulationResult>,
    pub failures: Vec<StrategyFailure>,
}

impl ComparisonReport {
    pub fn result_for(&self, strategy: Strategy) -> Option<&SimulationResult> {
        let plan = PlanKind::from(strategy);
        self.results.iter().find(|r| r.strategy == plan)
    }

    pub fn failure_for(&self, strategy: Strategy) -> Option<&StrategyFailure> {
        let plan = PlanKind::from(strategy);
        self.failures.iter().find(|f| f.strategy == plan)
    }
}

pub(crate) fn validate_extra_payment(extra_monthly_payment: Decimal) -> Result<()> {
    if extra_monthly_payment < Decimal::ZERO {
        return Err(EngineError::invalid_request(
            "extraMonthlyPayment must be >= 0",
        ));
    }
    if extra_monthly_payment > MAX_AMOUNT {
        return Err(EngineError::invalid_request(format!(
            "extraMonthlyPayment must be <= {MAX_AMOUNT}"
        )));
    }
    Ok(())
}

/// Immutable input to one comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulateRequest {
    pub portfolio: Portfolio,
    pub extra_monthly_payment: Decimal,
    pub strategies: Vec<Strategy>,
    pub custom_weights: CustomWeights,
}

impl SimulateRequest {
    pub fn new(
        debts: Vec<DebtRecord>,
        extra_monthly_payment: Decimal,
        strategies: &[Strategy],
        custom_weights: Option<CustomWeights>,
    ) -> Result<Self> {
        let portfolio = Portfolio::new(debts)?;
        validate_extra_payment(extra_monthly_payment)?;

        let mut unique = Vec::with_capacity(Strategy::ALL.len());
        for strategy in strategies {
            if !unique.contains(strategy) {
                unique.push(*strategy);
            }
        }
        if unique.is_empty() {
            unique.extend(Strategy::ALL);
        }

        Ok(Self {
            portfolio,
            extra_monthly_payment,
            strategies: unique,
            custom_weights: custom_weights.unwrap_or_default(),
        })
    }
}
