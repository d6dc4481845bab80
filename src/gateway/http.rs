//! HTTP surface of the gateway
//!
//! Thin axum layer: authenticate the caller, forward to the tournament
//! channels, and translate the uniform error codes into HTTP statuses. Every
//! error body carries the correlation id so a client report can be matched
//! to the server-side trace.

use crate::error::{ErrorCode, ServiceError};
use crate::gateway::auth::{authenticate, InMemoryTokenIssuer, TokenVerifier};
use crate::gateway::client::{ErrorResponse, TournamentsClient};
use crate::types::JoinTournamentCommand;
use crate::utils::normalize_correlation_id;
use axum::extract::{Path, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

#[derive(Clone)]
pub struct GatewayState {
    pub issuer: Arc<InMemoryTokenIssuer>,
    pub verifier: Arc<dyn TokenVerifier>,
    pub tournaments: Arc<TournamentsClient>,
}

impl GatewayState {
    pub fn new(issuer: Arc<InMemoryTokenIssuer>, tournaments: Arc<TournamentsClient>) -> Self {
        Self {
            verifier: issuer.clone(),
            issuer,
            tournaments,
        }
    }
}

pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/auth/login", post(login))
        .route("/tournaments/join", post(join_tournament))
        .route("/tournaments/my-tournaments", get(my_tournaments))
        .route("/players/{player_id}/tournaments", get(player_tournaments))
        .with_state(state)
}

/// Map an error code onto the HTTP status it travels under
fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorCode::Unauthorized | ErrorCode::InvalidToken => StatusCode::UNAUTHORIZED,
        ErrorCode::UserNotFound | ErrorCode::TournamentNotFound => StatusCode::NOT_FOUND,
        ErrorCode::PlayerAlreadyJoined
        | ErrorCode::TournamentFull
        | ErrorCode::TournamentNotOpen
        | ErrorCode::ConcurrencyConflict => StatusCode::CONFLICT,
        ErrorCode::DependencyTimeout => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_body(error: ServiceError, correlation_id: &str) -> Response {
    let status = status_for(error.code);
    (
        status,
        Json(json!({
            "error": error,
            "correlationId": correlation_id,
        })),
    )
        .into_response()
}

fn failure(rejected: ErrorResponse) -> Response {
    error_body(rejected.error, &rejected.correlation_id)
}

fn bearer_header(headers: &HeaderMap) -> Option<&str> {
    headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok())
}

fn correlation_header(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(CORRELATION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
}

async fn healthz() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy" }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest {
    player_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    token: String,
    player_id: String,
}

async fn login(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    Json(body): Json<LoginRequest>,
) -> Response {
    let player_id = body.player_id.trim();
    if player_id.is_empty() {
        return error_body(
            ServiceError::new(ErrorCode::InvalidRequest, "playerId must not be blank"),
            &normalize_correlation_id(correlation_header(&headers)),
        );
    }

    let token = state.issuer.issue(player_id).await;
    info!(player_id, "player logged in");
    Json(LoginResponse {
        token,
        player_id: player_id.to_string(),
    })
    .into_response()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JoinRequest {
    game_type: String,
    tournament_type: String,
    entry_fee: i64,
}

async fn join_tournament(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    Json(body): Json<JoinRequest>,
) -> Response {
    let player_id = match authenticate(&state.verifier, bearer_header(&headers)).await {
        Ok(player_id) => player_id,
        Err(error) => {
            return error_body(
                error,
                &normalize_correlation_id(correlation_header(&headers)),
            )
        }
    };

    let command = JoinTournamentCommand {
        player_id,
        game_type: body.game_type,
        tournament_type: body.tournament_type,
        entry_fee: body.entry_fee,
    };

    match state
        .tournaments
        .join_tournament(correlation_header(&headers), command)
        .await
    {
        Ok((result, _)) => Json(result).into_response(),
        Err(rejected) => failure(rejected),
    }
}

async fn my_tournaments(State(state): State<GatewayState>, headers: HeaderMap) -> Response {
    let player_id = match authenticate(&state.verifier, bearer_header(&headers)).await {
        Ok(player_id) => player_id,
        Err(error) => {
            return error_body(
                error,
                &normalize_correlation_id(correlation_header(&headers)),
            )
        }
    };

    match state
        .tournaments
        .player_tournaments(correlation_header(&headers), &player_id)
        .await
    {
        Ok((result, _)) => Json(result).into_response(),
        Err(rejected) => failure(rejected),
    }
}

/// Tournament lookup for an arbitrary player; no token required, the
/// directory decides whether the player exists downstream.
async fn player_tournaments(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    Path(player_id): Path<String>,
) -> Response {
    match state
        .tournaments
        .player_tournaments(correlation_header(&headers), &player_id)
        .await
    {
        Ok((result, _)) => Json(result).into_response(),
        Err(rejected) => failure(rejected),
    }
}
