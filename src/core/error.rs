use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

/// Failures the payoff engine reports instead of a result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Malformed debt set, rejected before any month is simulated.
    #[error("Invalid portfolio: {reason}")]
    InvalidPortfolio {
        debt_id: Option<String>,
        reason: String,
    },

    /// Request-level parameter outside its domain (extra payment, weights, ceiling).
    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    /// The minimum payment never gets ahead of the interest on this debt.
    #[error(
        "Debt {debt_id} cannot be paid down: minimum payment {minimum_payment} does not exceed monthly interest {monthly_interest}"
    )]
    InsufficientMinimum {
        debt_id: String,
        minimum_payment: Decimal,
        monthly_interest: Decimal,
    },

    #[error("Payoff did not converge within {max_months} months; {open_debts} debt(s) still open")]
    NonConvergent { max_months: u32, open_debts: usize },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    InvalidPortfolio,
    InvalidRequest,
    InsufficientMinimum,
    NonConvergent,
}

impl EngineError {
    pub fn invalid_portfolio(reason: impl Into<String>) -> Self {
        Self::InvalidPortfolio {
            debt_id: None,
            reason: reason.into(),
        }
    }

    pub fn invalid_debt(debt_id: &str, reason: impl Into<String>) -> Self {
        Self::InvalidPortfolio {
            debt_id: Some(debt_id.to_string()),
            reason: format!("debt {debt_id}: {}", reason.into()),
        }
    }

    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            Self::InvalidPortfolio { .. } => FailureKind::InvalidPortfolio,
            Self::InvalidRequest { .. } => FailureKind::InvalidRequest,
            Self::InsufficientMinimum { .. } => FailureKind::InsufficientMinimum,
            Self::NonConvergent { .. } => FailureKind::NonConvergent,
        }
    }

    /// The debt responsible for the failure, when a single one is.
    pub fn debt_id(&self) -> Option<&str> {
        match self {
            Self::InvalidPortfolio { debt_id, .. } => debt_id.as_deref(),
            Self::InsufficientMinimum { debt_id, .. } => Some(debt_id),
            Self::InvalidRequest { .. } | Self::NonConvergent { .. } => None,
        }
    }
}
