use std::cmp::Ordering;

use rust_decimal::Decimal;

use super::error::{EngineError, Result};
use super::types::{CustomWeights, DebtRecord, Strategy};

/// A debt still owing money, paired with its balance at the current point of a run.
#[derive(Debug, Clone, Copy)]
pub struct ActiveDebt<'a> {
    pub record: &'a DebtRecord,
    pub balance: Decimal,
}

impl<'a> ActiveDebt<'a> {
    pub fn new(record: &'a DebtRecord, balance: Decimal) -> Self {
        Self { record, balance }
    }

    fn id(&self) -> &'a str {
        self.record.id.as_str()
    }

    fn rate(&self) -> Decimal {
        self.record.annual_rate_percent
    }
}

/// Decides which open debt receives discretionary money first.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AllocationPolicy {
    /// Highest rate first.
    Avalanche,
    /// Smallest current balance first.
    Snowball,
    /// Weighted blend of normalised rate and inverse normalised balance.
    Custom(CustomWeights),
}

impl AllocationPolicy {
    pub fn for_strategy(strategy: Strategy, weights: CustomWeights) -> Self {
        match strategy {
            Strategy::Avalanche => AllocationPolicy::Avalanche,
            Strategy::Snowball => AllocationPolicy::Snowball,
            Strategy::Custom => AllocationPolicy::Custom(weights),
        }
    }

    pub fn strategy(&self) -> Strategy {
        match self {
            AllocationPolicy::Avalanche => Strategy::Avalanche,
            AllocationPolicy::Snowball => Strategy::Snowball,
            AllocationPolicy::Custom(_) => Strategy::Custom,
        }
    }

    /// Total, deterministic priority order over `active`, highest priority first.
    pub fn order_priority<'a>(&self, active: &[ActiveDebt<'a>]) -> Result<Vec<&'a str>> {
        if active.is_empty() {
            return Err(EngineError::invalid_portfolio(
                "no active debts to prioritise",
            ));
        }

        let mut ranked = active.to_vec();
        match self {
            AllocationPolicy::Avalanche => ranked.sort_by(avalanche_cmp),
            AllocationPolicy::Snowball => ranked.sort_by(snowball_cmp),
            AllocationPolicy::Custom(weights) => {
                let mut scored = custom_scores(&ranked, weights);
                scored.sort_by(|(sa, a), (sb, b)| sb.cmp(sa).then_with(|| a.id().cmp(b.id())));
                return Ok(scored.into_iter().map(|(_, d)| d.id()).collect());
            }
        }

        Ok(ranked.into_iter().map(|d| d.id()).collect())
    }
}

fn avalanche_cmp(a: &ActiveDebt<'_>, b: &ActiveDebt<'_>) -> Ordering {
    b.rate()
        .cmp(&a.rate())
        .then_with(|| a.balance.cmp(&b.balance))
        .then_with(|| a.id().cmp(b.id()))
}

fn snowball_cmp(a: &ActiveDebt<'_>, b: &ActiveDebt<'_>) -> Ordering {
    a.balance
        .cmp(&b.balance)
        .then_with(|| b.rate().cmp(&a.rate()))
        .then_with(|| a.id().cmp(b.id()))
}

/// `rate/maxRate * wRate + (1 - balance/maxBalance) * wBalance`, maxima taken over `active`.
fn custom_scores<'a>(
    active: &[ActiveDebt<'a>],
    weights: &CustomWeights,
) -> Vec<(Decimal, ActiveDebt<'a>)> {
    let max_rate = active
        .iter()
        .map(ActiveDebt::rate)
        .max()
        .unwrap_or(Decimal::ZERO);
    let max_balance = active
        .iter()
        .map(|d| d.balance)
        .max()
        .unwrap_or(Decimal::ZERO);

    active
        .iter()
        .map(|debt| {
            let normalized_rate = ratio(debt.rate(), max_rate);
            let normalized_balance = ratio(debt.balance, max_balance);
            let score = normalized_rate * weights.rate_weight()
                + (Decimal::ONE - normalized_balance) * weights.balance_weight();
            (score, *debt)
        })
        .collect()
}

fn ratio(value: Decimal, max: Decimal) -> Decimal {
    if max.is_zero() {
        Decimal::ZERO
    } else {
        value / max
    }
}
