mod cli;

use axum::{
    Router,
    extract::{Json, State, rejection::JsonRejection},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::core::{
    CustomWeights, DEFAULT_RATE_WEIGHT, DebtRecord, EngineConfig, EngineError, FailureKind,
    SimulateRequest, Strategy, compare_strategies,
};

pub use cli::{Cli, Command, EngineArgs, build_engine_config, run_compare_command};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiStrategy {
    Avalanche,
    Snowball,
    #[serde(
        alias = "ai-optimized",
        alias = "ai_optimized",
        alias = "aiOptimized",
        alias = "weighted"
    )]
    Custom,
}

impl From<ApiStrategy> for Strategy {
    fn from(value: ApiStrategy) -> Self {
        match value {
            ApiStrategy::Avalanche => Strategy::Avalanche,
            ApiStrategy::Snowball => Strategy::Snowball,
            ApiStrategy::Custom => Strategy::Custom,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DebtPayload {
    id: String,
    balance: Decimal,
    #[serde(alias = "apr", alias = "interestRate")]
    annual_rate_percent: Decimal,
    #[serde(alias = "minPayment")]
    minimum_payment: Decimal,
    #[serde(default)]
    label: Option<String>,
}

impl From<DebtPayload> for DebtRecord {
    fn from(value: DebtPayload) -> Self {
        let label = value.label.unwrap_or_else(|| value.id.clone());
        DebtRecord::new(
            value.id,
            label,
            value.balance,
            value.annual_rate_percent,
            value.minimum_payment,
        )
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct WeightsPayload {
    rate_weight: Option<Decimal>,
    balance_weight: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ComparePayload {
    debts: Option<Vec<DebtPayload>>,
    #[serde(alias = "extraPayment")]
    extra_monthly_payment: Option<Decimal>,
    strategies: Option<Vec<ApiStrategy>>,
    custom_weights: Option<WeightsPayload>,
}

/// Request fields before validation; payload values are laid over these defaults.
#[derive(Debug, Clone)]
struct RequestDraft {
    debts: Vec<DebtRecord>,
    extra_monthly_payment: Decimal,
    strategies: Vec<Strategy>,
    rate_weight: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<FailureKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    debt_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

fn default_draft_for_api() -> RequestDraft {
    RequestDraft {
        debts: Vec::new(),
        extra_monthly_payment: Decimal::ZERO,
        strategies: Strategy::ALL.to_vec(),
        rate_weight: DEFAULT_RATE_WEIGHT,
    }
}

fn sample_debts() -> Vec<DebtRecord> {
    vec![
        DebtRecord::new(
            "credit-card",
            "Rewards Credit Card",
            dec!(8000),
            dec!(25),
            dec!(200),
        ),
        DebtRecord::new("store-card", "Store Card", dec!(3000), dec!(20), dec!(85)),
        DebtRecord::new("car-loan", "Car Loan", dec!(12500), dec!(6.9), dec!(310)),
    ]
}

fn sample_request() -> Result<SimulateRequest, EngineError> {
    build_request(RequestDraft {
        debts: sample_debts(),
        extra_monthly_payment: dec!(100),
        ..default_draft_for_api()
    })
}

fn build_request(draft: RequestDraft) -> Result<SimulateRequest, EngineError> {
    let weights = CustomWeights::new(draft.rate_weight)?;
    SimulateRequest::new(
        draft.debts,
        draft.extra_monthly_payment,
        &draft.strategies,
        Some(weights),
    )
}

pub(crate) fn api_request_from_json(json: &str) -> Result<SimulateRequest, EngineError> {
    let payload = serde_json::from_str::<ComparePayload>(json)
        .map_err(|e| EngineError::invalid_request(format!("Invalid API JSON payload: {e}")))?;
    api_request_from_payload(payload)
}

fn api_request_from_payload(payload: ComparePayload) -> Result<SimulateRequest, EngineError> {
    let mut draft = default_draft_for_api();

    if let Some(v) = payload.debts {
        draft.debts = v.into_iter().map(DebtRecord::from).collect();
    }
    if let Some(v) = payload.extra_monthly_payment {
        draft.extra_monthly_payment = v;
    }
    if let Some(v) = payload.strategies {
        draft.strategies = v.into_iter().map(Strategy::from).collect();
    }
    if let Some(weights) = payload.custom_weights {
        match (weights.rate_weight, weights.balance_weight) {
            (Some(rate), Some(balance)) => {
                if rate + balance != Decimal::ONE {
                    return Err(EngineError::invalid_request(
                        "customWeights.rateWeight and balanceWeight must sum to 1",
                    ));
                }
                draft.rate_weight = rate;
            }
            (Some(rate), None) => draft.rate_weight = rate,
            (None, Some(balance)) => draft.rate_weight = Decimal::ONE - balance,
            (None, None) => {}
        }
    }

    build_request(draft)
}

pub fn router(config: EngineConfig) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/compare", post(compare_post_handler))
        .route("/api/compare/sample", get(compare_sample_handler))
        .fallback(not_found_handler)
        .with_state(config)
}

pub async fn run_http_server(port: u16, config: EngineConfig) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, max_months = config.max_months, "payoff HTTP API listening");
    info!("Local access: http://127.0.0.1:{port}/api/compare/sample");

    axum::serve(listener, router(config)).await
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, HealthResponse { status: "ok" })
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn compare_post_handler(
    State(config): State<EngineConfig>,
    payload: Result<Json<ComparePayload>, JsonRejection>,
) -> Response {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                &format!("Invalid API JSON payload: {}", rejection.body_text()),
            );
        }
    };
    match api_request_from_payload(payload) {
        Ok(request) => run_comparison(request, config).await,
        Err(err) => engine_error_response(&err),
    }
}

async fn compare_sample_handler(State(config): State<EngineConfig>) -> Response {
    match sample_request() {
        Ok(request) => run_comparison(request, config).await,
        Err(err) => engine_error_response(&err),
    }
}

async fn run_comparison(request: SimulateRequest, config: EngineConfig) -> Response {
    let outcome =
        tokio::task::spawn_blocking(move || compare_strategies(&request, &config)).await;
    match outcome {
        Ok(Ok(report)) => json_response(StatusCode::OK, report),
        Ok(Err(err)) => engine_error_response(&err),
        Err(err) => {
            error!(error = %err, "comparison task panicked or was cancelled");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Comparison failed")
        }
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
            kind: None,
            debt_id: None,
        },
    )
}

fn engine_error_response(err: &EngineError) -> Response {
    let status = match err.kind() {
        FailureKind::InvalidPortfolio => StatusCode::UNPROCESSABLE_ENTITY,
        FailureKind::InvalidRequest
        | FailureKind::InsufficientMinimum
        | FailureKind::NonConvergent => StatusCode::BAD_REQUEST,
    };
    warn!(status = status.as_u16(), error = %err, "rejecting comparison request");
    json_response(
        status,
        ErrorResponse {
            error: err.to_string(),
            kind: Some(err.kind()),
            debt_id: err.debt_id().map(str::to_string),
        },
    )
}
