//! Integration tests for the tournament matchmaking service
//!
//! These tests run the full gateway → orchestrator → directory path over an
//! in-process transport, validating:
//! - Find-or-create-and-join matching across tournaments
//! - Capacity and single-membership invariants under concurrency
//! - Timeout and error propagation across hops
//! - The HTTP surface, auth included

mod fixtures;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use tourney_hall::types::TournamentStatus;
use tourney_hall::ErrorCode;
use tower::ServiceExt;

use fixtures::{
    create_test_system, create_test_system_with, join_command, StalledDirectory, TestSystem,
};

// ---------------------------------------------------------------------------
// Matching semantics
// ---------------------------------------------------------------------------

#[tokio::test]
async fn first_join_creates_an_open_tournament() {
    let system = create_test_system().await;

    let (result, _) = system
        .client
        .join_tournament(Some("corr-a"), join_command("user1", "chess", 10))
        .await
        .unwrap();

    assert_eq!(result.tournament.players_count, 1);
    assert_eq!(result.tournament.max_players, 4);
    assert_eq!(result.tournament.status, TournamentStatus::Open);
    assert_eq!(result.joined_player.player_id, "user1");
    assert_eq!(system.store.stats().await.tournaments, 1);
}

#[tokio::test]
async fn fifth_player_overflows_into_a_new_tournament() {
    let system = create_test_system().await;

    let mut first_id = None;
    for n in 1..=4 {
        let (result, _) = system
            .client
            .join_tournament(None, join_command(&format!("user{n}"), "chess", 10))
            .await
            .unwrap();
        let id = first_id.get_or_insert(result.tournament.tournament_id);
        assert_eq!(result.tournament.tournament_id, *id);
    }

    let (full, _) = system
        .client
        .player_tournaments(None, "user1")
        .await
        .unwrap();
    assert_eq!(full.tournaments[0].status, TournamentStatus::Full);
    assert_eq!(full.tournaments[0].players_count, 4);

    let (overflow, _) = system
        .client
        .join_tournament(None, join_command("user5", "chess", 10))
        .await
        .unwrap();
    assert_ne!(Some(overflow.tournament.tournament_id), first_id);
    assert_eq!(overflow.tournament.players_count, 1);
    assert_eq!(system.store.stats().await.tournaments, 2);
}

#[tokio::test]
async fn differing_criteria_never_share_a_tournament() {
    let system = create_test_system().await;

    let (chess, _) = system
        .client
        .join_tournament(None, join_command("user1", "chess", 10))
        .await
        .unwrap();
    let (poker, _) = system
        .client
        .join_tournament(None, join_command("user2", "poker", 10))
        .await
        .unwrap();
    let (pricier, _) = system
        .client
        .join_tournament(None, join_command("user3", "chess", 25))
        .await
        .unwrap();

    assert_ne!(chess.tournament.tournament_id, poker.tournament.tournament_id);
    assert_ne!(chess.tournament.tournament_id, pricier.tournament.tournament_id);
    assert_eq!(system.store.stats().await.tournaments, 3);
}

#[tokio::test]
async fn rejoin_is_rejected_even_with_a_fresh_correlation_id() {
    let system = create_test_system().await;

    system
        .client
        .join_tournament(Some("corr-1"), join_command("user1", "chess", 10))
        .await
        .unwrap();

    // A client retry shows up as the same command under a new id.
    let rejected = system
        .client
        .join_tournament(Some("corr-2"), join_command("user1", "chess", 10))
        .await
        .unwrap_err();

    assert_eq!(rejected.error.code, ErrorCode::PlayerAlreadyJoined);
    assert_eq!(rejected.correlation_id, "corr-2");
    assert_eq!(system.store.stats().await.memberships, 1);
}

#[tokio::test]
async fn unknown_player_creates_nothing() {
    let system = create_test_system().await;

    let rejected = system
        .client
        .join_tournament(None, join_command("ghost", "chess", 10))
        .await
        .unwrap_err();

    assert_eq!(rejected.error.code, ErrorCode::UserNotFound);
    assert_eq!(system.store.stats().await.tournaments, 0);
}

#[tokio::test]
async fn joined_tournaments_come_back_in_creation_order() {
    let system = create_test_system().await;

    let (first, _) = system
        .client
        .join_tournament(None, join_command("user1", "chess", 10))
        .await
        .unwrap();
    let (second, _) = system
        .client
        .join_tournament(None, join_command("user1", "poker", 10))
        .await
        .unwrap();

    let (result, _) = system
        .client
        .player_tournaments(None, "user1")
        .await
        .unwrap();
    assert_eq!(result.player_id, "user1");
    assert_eq!(result.tournaments.len(), 2);
    assert_eq!(
        result.tournaments[0].tournament_id,
        first.tournament.tournament_id
    );
    assert_eq!(
        result.tournaments[1].tournament_id,
        second.tournament.tournament_id
    );
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[tokio::test]
async fn concurrent_joins_never_overfill_a_tournament() {
    let system = Arc::new(create_test_system().await);

    let joins = (1..=8).map(|n| {
        let system = system.clone();
        async move {
            system
                .client
                .join_tournament(None, join_command(&format!("user{n}"), "chess", 10))
                .await
        }
    });
    let results = futures::future::join_all(joins).await;
    assert!(results.iter().all(|r| r.is_ok()));

    for tournament in system.store.all_tournaments().await {
        assert!(tournament.players.len() as u32 <= tournament.max_players);
    }
    assert_eq!(system.store.stats().await.memberships, 8);
}

#[tokio::test]
async fn concurrent_duplicate_join_yields_exactly_one_membership() {
    let system = Arc::new(create_test_system().await);

    let (a, b) = tokio::join!(
        system
            .client
            .join_tournament(Some("corr-a"), join_command("user1", "chess", 10)),
        system
            .client
            .join_tournament(Some("corr-b"), join_command("user1", "chess", 10)),
    );

    let outcomes = [a, b];
    let wins = outcomes.iter().filter(|r| r.is_ok()).count();
    assert_eq!(wins, 1);
    let rejected = outcomes.iter().find(|r| r.is_err()).unwrap();
    assert_eq!(
        rejected.as_ref().unwrap_err().error.code,
        ErrorCode::PlayerAlreadyJoined
    );

    let stats = system.store.stats().await;
    assert_eq!(stats.tournaments, 1);
    assert_eq!(stats.memberships, 1);
}

// ---------------------------------------------------------------------------
// Timeouts
// ---------------------------------------------------------------------------

#[tokio::test]
async fn stalled_directory_surfaces_as_dependency_timeout() {
    let system =
        create_test_system_with(Arc::new(StalledDirectory), Duration::from_millis(30)).await;

    let rejected = system
        .client
        .join_tournament(Some("corr-t"), join_command("user1", "chess", 10))
        .await
        .unwrap_err();

    assert_eq!(rejected.error.code, ErrorCode::DependencyTimeout);
    assert_eq!(rejected.correlation_id, "corr-t");
    let details = rejected.error.details.unwrap();
    assert_eq!(details["dependency"], "directory-service");
    assert_eq!(system.store.stats().await.tournaments, 0);
}

// ---------------------------------------------------------------------------
// HTTP surface
// ---------------------------------------------------------------------------

async fn send(
    system: &TestSystem,
    request: Request<Body>,
) -> (StatusCode, serde_json::Value) {
    let response = system.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn login(system: &TestSystem, player_id: &str) -> String {
    let (status, body) = send(
        system,
        json_request("POST", "/auth/login", serde_json::json!({ "playerId": player_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_endpoint_responds() {
    let system = create_test_system().await;
    let (status, body) = send(
        &system,
        Request::builder()
            .uri("/healthz")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn login_join_query_round_trip_over_http() {
    let system = create_test_system().await;
    let token = login(&system, "user1").await;

    let mut join = json_request(
        "POST",
        "/tournaments/join",
        serde_json::json!({ "gameType": "chess", "tournamentType": "solo", "entryFee": 10 }),
    );
    join.headers_mut().insert(
        header::AUTHORIZATION,
        format!("Bearer {token}").parse().unwrap(),
    );
    let (status, body) = send(&system, join).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tournament"]["playersCount"], 1);
    assert_eq!(body["tournament"]["status"], "open");
    assert_eq!(body["joinedPlayer"]["playerId"], "user1");

    let mut query = Request::builder()
        .uri("/tournaments/my-tournaments")
        .body(Body::empty())
        .unwrap();
    query.headers_mut().insert(
        header::AUTHORIZATION,
        format!("Bearer {token}").parse().unwrap(),
    );
    let (status, body) = send(&system, query).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tournaments"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn join_without_a_token_is_401() {
    let system = create_test_system().await;
    let (status, body) = send(
        &system,
        json_request(
            "POST",
            "/tournaments/join",
            serde_json::json!({ "gameType": "chess", "tournamentType": "solo", "entryFee": 10 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    assert!(body["correlationId"].as_str().is_some());
}

#[tokio::test]
async fn join_with_an_unknown_token_is_401() {
    let system = create_test_system().await;
    let mut join = json_request(
        "POST",
        "/tournaments/join",
        serde_json::json!({ "gameType": "chess", "tournamentType": "solo", "entryFee": 10 }),
    );
    join.headers_mut()
        .insert(header::AUTHORIZATION, "Bearer bogus".parse().unwrap());
    let (status, body) = send(&system, join).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "INVALID_TOKEN");
}

#[tokio::test]
async fn join_for_an_unknown_player_is_404() {
    let system = create_test_system().await;
    // Login only mints a token; the directory decides who exists.
    let token = login(&system, "ghost").await;

    let mut join = json_request(
        "POST",
        "/tournaments/join",
        serde_json::json!({ "gameType": "chess", "tournamentType": "solo", "entryFee": 10 }),
    );
    join.headers_mut().insert(
        header::AUTHORIZATION,
        format!("Bearer {token}").parse().unwrap(),
    );
    let (status, body) = send(&system, join).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "USER_NOT_FOUND");
}

#[tokio::test]
async fn repeat_join_is_409_and_echoes_the_correlation_header() {
    let system = create_test_system().await;
    let token = login(&system, "user1").await;

    for (expected, corr) in [(StatusCode::OK, "first"), (StatusCode::CONFLICT, "second")] {
        let mut join = json_request(
            "POST",
            "/tournaments/join",
            serde_json::json!({ "gameType": "chess", "tournamentType": "solo", "entryFee": 10 }),
        );
        join.headers_mut().insert(
            header::AUTHORIZATION,
            format!("Bearer {token}").parse().unwrap(),
        );
        join.headers_mut()
            .insert("x-correlation-id", corr.parse().unwrap());
        let (status, body) = send(&system, join).await;
        assert_eq!(status, expected);
        if expected == StatusCode::CONFLICT {
            assert_eq!(body["error"]["code"], "PLAYER_ALREADY_JOINED");
            assert_eq!(body["correlationId"], "second");
        }
    }
}

#[tokio::test]
async fn negative_entry_fee_is_400() {
    let system = create_test_system().await;
    let token = login(&system, "user1").await;

    let mut join = json_request(
        "POST",
        "/tournaments/join",
        serde_json::json!({ "gameType": "chess", "tournamentType": "solo", "entryFee": -5 }),
    );
    join.headers_mut().insert(
        header::AUTHORIZATION,
        format!("Bearer {token}").parse().unwrap(),
    );
    let (status, body) = send(&system, join).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn player_lookup_route_needs_no_token() {
    let system = create_test_system().await;

    let (status, body) = send(
        &system,
        Request::builder()
            .uri("/players/user2/tournaments")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["playerId"], "user2");
    assert_eq!(body["tournaments"].as_array().unwrap().len(), 0);
}
