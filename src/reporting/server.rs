//! Read-only reporting surface.
//!
//! Exposes the decoded global signature, a health endpoint and the
//! synthetic dashboard endpoints over HTTP. Strictly read-only with
//! respect to the ledger; no aggregation logic lives here.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use warp::http::StatusCode;
use warp::Filter;

use super::synthetic::SyntheticSource;
use crate::core::HealthChecker;
use crate::error::LedgerError;
use crate::ledger::{Address, LedgerGateway};
use crate::signature::ScaledCodec;

/// Shared state for all reporting routes.
pub struct ReportingContext {
    pub gateway: Arc<dyn LedgerGateway>,
    pub codec: ScaledCodec,
    pub contract_address: Address,
    pub health: HealthChecker,
    pub synthetic: SyntheticSource,
}

pub async fn serve(ctx: Arc<ReportingContext>, port: u16) {
    tracing::info!("reporting server listening on port {}", port);
    warp::serve(routes(ctx)).run(([0, 0, 0, 0], port)).await;
}

fn routes(
    ctx: Arc<ReportingContext>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let with_ctx = warp::any().map(move || ctx.clone());

    let global_model = warp::path("global-model")
        .and(warp::get())
        .and(with_ctx.clone())
        .and_then(global_model_handler);

    let health = warp::path("health")
        .and(warp::get())
        .and(with_ctx.clone())
        .and_then(health_handler);

    let forecast = warp::path("forecast")
        .and(warp::get())
        .and(warp::query::<HashMap<String, String>>())
        .and(with_ctx.clone())
        .and_then(forecast_handler);

    let bill = warp::path("bill")
        .and(warp::get())
        .and(warp::query::<HashMap<String, String>>())
        .and(with_ctx.clone())
        .and_then(bill_handler);

    let regional = warp::path("regional")
        .and(warp::get())
        .and(warp::query::<HashMap<String, String>>())
        .and(with_ctx.clone())
        .and_then(regional_handler);

    global_model.or(health).or(forecast).or(bill).or(regional)
}

async fn global_model_handler(
    ctx: Arc<ReportingContext>,
) -> Result<impl warp::Reply, Infallible> {
    match ctx.gateway.read_global_signature().await {
        Ok(scaled) => {
            ctx.health.set_ledger_reachable(true).await;
            if scaled.is_empty() {
                return Ok(warp::reply::with_status(
                    warp::reply::json(&json!({ "error": "global model not found or empty" })),
                    StatusCode::NOT_FOUND,
                ));
            }
            let weights = ctx.codec.decode_vector(&scaled);
            Ok(warp::reply::with_status(
                warp::reply::json(&json!({
                    "model_weights": weights,
                    "metadata": {
                        "total_weights": weights.len(),
                        "scaling_factor": ctx.codec.scale(),
                        "contract_address": ctx.contract_address,
                    },
                    "timestamp": Utc::now().timestamp(),
                })),
                StatusCode::OK,
            ))
        }
        Err(e) => {
            if matches!(e, LedgerError::Unreachable(_)) {
                ctx.health.set_ledger_reachable(false).await;
            }
            tracing::error!("global model read failed: {}", e);
            Ok(warp::reply::with_status(
                warp::reply::json(&json!({ "error": e.to_string() })),
                StatusCode::BAD_GATEWAY,
            ))
        }
    }
}

async fn health_handler(ctx: Arc<ReportingContext>) -> Result<impl warp::Reply, Infallible> {
    let status = ctx.health.get_status().await;
    Ok(warp::reply::with_status(
        warp::reply::json(&status),
        StatusCode::OK,
    ))
}

async fn forecast_handler(
    query: HashMap<String, String>,
    ctx: Arc<ReportingContext>,
) -> Result<impl warp::Reply, Infallible> {
    let period = query.get("period").map(String::as_str).unwrap_or("24h");
    let user_address = query.get("user_address").map(String::as_str);

    match ctx.synthetic.forecast(period, user_address) {
        Some(forecast) => Ok(warp::reply::with_status(
            warp::reply::json(&forecast),
            StatusCode::OK,
        )),
        None => Ok(warp::reply::with_status(
            warp::reply::json(&json!({ "error": "invalid period, use 24h, 7d or 30d" })),
            StatusCode::BAD_REQUEST,
        )),
    }
}

async fn bill_handler(
    query: HashMap<String, String>,
    ctx: Arc<ReportingContext>,
) -> Result<impl warp::Reply, Infallible> {
    match query.get("user_address") {
        Some(address) if !address.is_empty() => Ok(warp::reply::with_status(
            warp::reply::json(&ctx.synthetic.bill(address)),
            StatusCode::OK,
        )),
        _ => Ok(warp::reply::with_status(
            warp::reply::json(&json!({ "error": "user_address is required" })),
            StatusCode::BAD_REQUEST,
        )),
    }
}

async fn regional_handler(
    query: HashMap<String, String>,
    ctx: Arc<ReportingContext>,
) -> Result<impl warp::Reply, Infallible> {
    let region = query.get("region").map(String::as_str);
    let reports = ctx.synthetic.regional(region);

    let body = match region {
        Some(key) if reports.len() == 1 => json!({
            "region": key,
            "data": reports[0].1,
            "timestamp": Utc::now().timestamp(),
        }),
        _ => {
            let map: serde_json::Map<String, serde_json::Value> = reports
                .into_iter()
                .map(|(key, report)| (key, json!(report)))
                .collect();
            json!({
                "total_regions": map.len(),
                "regions": map,
                "timestamp": Utc::now().timestamp(),
            })
        }
    };
    Ok(warp::reply::with_status(
        warp::reply::json(&body),
        StatusCode::OK,
    ))
}
