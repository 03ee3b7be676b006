use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use axum::{
    Router,
    extract::{Json, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::core::{
    BalanceChart, ChartFrame, JsonFileStore, LoanParameters, PersistedSettings, PlanRequest,
    ProjectionFailure, ProjectionResult, ProjectionSummary, SettingsEditor, balance_chart,
    format_currency, format_duration, generate_plan, project, resolve_payment, summarize,
};

#[derive(Parser, Debug)]
#[command(
    name = "loanpath",
    about = "Student loan payoff projections and life-stage financial plans"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the JSON API.
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
        #[arg(
            long,
            default_value = ".",
            help = "Directory holding the saved loan settings snapshot"
        )]
        settings_dir: PathBuf,
    },
    /// Print a single payoff projection as JSON.
    Project(ProjectArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ProjectArgs {
    #[arg(long, default_value_t = 20_000.0, help = "Current loan balance")]
    principal: f64,
    #[arg(long, default_value_t = 5.5, help = "Annual interest rate in percent")]
    annual_rate: f64,
    #[arg(long, default_value_t = 250.0)]
    monthly_payment: f64,
    #[arg(
        long,
        help = "Target payoff in months; overrides --monthly-payment when set"
    )]
    target_months: Option<u32>,
    #[arg(long, help = "Lay the chart out for the side-by-side edit view")]
    editing: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProjectionPayload {
    principal: Option<f64>,
    #[serde(alias = "annualRatePercent")]
    annual_rate: Option<f64>,
    monthly_payment: Option<f64>,
    #[serde(alias = "monthsToPayoff")]
    target_months: Option<u32>,
    editing: Option<bool>,
}

#[derive(Debug)]
struct ApiRequest {
    params: LoanParameters,
    frame: ChartFrame,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectionResponse {
    parameters: LoanParameters,
    effective_payment: f64,
    result: ProjectionResult,
    summary: ProjectionSummary,
    duration_label: String,
    total_principal_label: String,
    total_interest_label: String,
    total_paid_label: String,
    chart: BalanceChart,
    failure_message: Option<&'static str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SettingsResponse {
    settings: PersistedSettings,
    configured: bool,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Clone)]
struct AppState {
    settings: Arc<Mutex<SettingsEditor<JsonFileStore>>>,
}

fn build_parameters(args: &ProjectArgs) -> Result<LoanParameters, String> {
    for (name, value) in [
        ("--principal", args.principal),
        ("--annual-rate", args.annual_rate),
        ("--monthly-payment", args.monthly_payment),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(format!("{name} must be >= 0"));
        }
    }

    if args.target_months == Some(0) {
        return Err("--target-months must be >= 1".to_string());
    }

    Ok(LoanParameters {
        principal: args.principal,
        annual_rate_percent: args.annual_rate,
        monthly_payment: args.monthly_payment,
        target_months: args.target_months,
    })
}

fn build_projection_response(params: LoanParameters, frame: &ChartFrame) -> ProjectionResponse {
    let result = project(&params);
    let summary = summarize(&result);
    let chart = balance_chart(&result, params.principal, frame);

    ProjectionResponse {
        parameters: params,
        effective_payment: resolve_payment(&params),
        duration_label: format_duration(summary.months_to_payoff),
        total_principal_label: format_currency(summary.total_principal),
        total_interest_label: format_currency(summary.total_interest),
        total_paid_label: format_currency(summary.total_paid),
        failure_message: result.failure.map(ProjectionFailure::message),
        result,
        summary,
        chart,
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve { port, settings_dir } => {
            run_http_server(port, settings_dir).await?;
        }
        Command::Project(args) => {
            let params = build_parameters(&args).map_err(anyhow::Error::msg)?;
            let frame = frame_for(args.editing);
            let response = build_projection_response(params, &frame);
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }
    Ok(())
}

pub async fn run_http_server(port: u16, settings_dir: PathBuf) -> std::io::Result<()> {
    let editor = SettingsEditor::open(JsonFileStore::new(&settings_dir))
        .map_err(std::io::Error::other)?;
    let state = AppState {
        settings: Arc::new(Mutex::new(editor)),
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, settings_dir = %settings_dir.display(), "loan API listening");

    axum::serve(listener, router(state)).await
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/plan", get(plan_get_handler).post(plan_post_handler))
        .route(
            "/api/loan/projection",
            get(projection_get_handler).post(projection_post_handler),
        )
        .route(
            "/api/loan/settings",
            get(settings_get_handler).put(settings_put_handler),
        )
        .fallback(not_found_handler)
        .with_state(state)
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, HealthResponse { status: "ok" })
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn plan_get_handler(Query(request): Query<PlanRequest>) -> Response {
    plan_response(request)
}

async fn plan_post_handler(Json(request): Json<PlanRequest>) -> Response {
    plan_response(request)
}

fn plan_response(request: PlanRequest) -> Response {
    if let Err(msg) = request.validate() {
        warn!(%msg, "rejected plan request");
        return error_response(StatusCode::BAD_REQUEST, &msg);
    }
    json_response(StatusCode::OK, generate_plan(&request))
}

async fn projection_get_handler(Query(payload): Query<ProjectionPayload>) -> Response {
    projection_response(payload)
}

async fn projection_post_handler(Json(payload): Json<ProjectionPayload>) -> Response {
    projection_response(payload)
}

fn projection_response(payload: ProjectionPayload) -> Response {
    let request = match api_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => {
            warn!(%msg, "rejected projection request");
            return error_response(StatusCode::BAD_REQUEST, &msg);
        }
    };
    json_response(
        StatusCode::OK,
        build_projection_response(request.params, &request.frame),
    )
}

async fn settings_get_handler(State(state): State<AppState>) -> Response {
    settings_get_response(&state)
}

async fn settings_put_handler(
    State(state): State<AppState>,
    Json(settings): Json<PersistedSettings>,
) -> Response {
    settings_put_response(&state, settings)
}

fn settings_get_response(state: &AppState) -> Response {
    let Ok(editor) = state.settings.lock() else {
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Settings unavailable");
    };
    json_response(
        StatusCode::OK,
        SettingsResponse {
            settings: editor.committed(),
            configured: editor.is_configured(),
        },
    )
}

fn settings_put_response(state: &AppState, settings: PersistedSettings) -> Response {
    if let Err(msg) = build_parameters(&settings_args(settings)) {
        warn!(%msg, "rejected settings update");
        return error_response(StatusCode::BAD_REQUEST, &msg);
    }

    let Ok(mut editor) = state.settings.lock() else {
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Settings unavailable");
    };
    *editor.begin_edit() = settings;
    match editor.save() {
        Ok(saved) => json_response(
            StatusCode::OK,
            SettingsResponse {
                settings: saved,
                configured: editor.is_configured(),
            },
        ),
        Err(e) => {
            warn!(error = %e, "failed to save loan settings");
            // Leave the stored snapshot authoritative.
            if let Err(e) = editor.cancel() {
                warn!(error = %e, "failed to reload loan settings");
            }
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())
        }
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn api_request_from_json(json: &str) -> Result<ApiRequest, String> {
    let payload = serde_json::from_str::<ProjectionPayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    api_request_from_payload(payload)
}

fn api_request_from_payload(payload: ProjectionPayload) -> Result<ApiRequest, String> {
    let mut args = default_args_for_api();

    if let Some(v) = payload.principal {
        args.principal = v;
    }
    if let Some(v) = payload.annual_rate {
        args.annual_rate = v;
    }
    if let Some(v) = payload.monthly_payment {
        args.monthly_payment = v;
    }
    if let Some(v) = payload.target_months {
        args.target_months = Some(v);
    }
    if let Some(v) = payload.editing {
        args.editing = v;
    }

    let params = build_parameters(&args)?;
    Ok(ApiRequest {
        params,
        frame: frame_for(args.editing),
    })
}

fn default_args_for_api() -> ProjectArgs {
    settings_args(PersistedSettings::default())
}

fn settings_args(settings: PersistedSettings) -> ProjectArgs {
    ProjectArgs {
        principal: settings.principal,
        annual_rate: settings.annual_rate,
        monthly_payment: settings.monthly_payment,
        target_months: settings.months_to_payoff,
        editing: false,
    }
}

fn frame_for(editing: bool) -> ChartFrame {
    if editing {
        ChartFrame::editing()
    } else {
        ChartFrame::default()
    }
}
