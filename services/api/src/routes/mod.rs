//! HTTP surface: route table, shared state, and the health probe.

pub mod checkin;
pub mod leaderboard;
pub mod location;

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;

use crate::config::ApiConfig;
use crate::error::Result;
use crate::models::ApiResponse;
use crate::store::Ledger;

#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<dyn Ledger>,
    pub config: Arc<ApiConfig>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/checkin", post(checkin::checkin))
        .route(
            "/api/location-checkin",
            post(location::location_checkin).get(location::find_player),
        )
        .route("/api/leaderboard", get(leaderboard::leaderboard))
        .route("/healthz", get(healthz))
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthData {
    status: &'static str,
}

async fn healthz(State(state): State<AppState>) -> Result<Json<ApiResponse<HealthData>>> {
    state.ledger.ping().await?;
    Ok(Json(ApiResponse::ok(HealthData { status: "ok" })))
}

// ── Tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use chrono::Utc;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::config::SeedCheckpoint;
    use crate::models::Location;
    use crate::store::memory::MemLedger;

    const EVM: &str = "0x71C7656EC7ab88b098defB751B7401B5f6d8976F";
    const SOLANA: &str = "DYw8jCTfwHNRJhhmFcbXvVDTqWMEVFBX6ZKUmG5CNSKK";

    async fn test_app() -> (Router, Arc<MemLedger>) {
        let mem = Arc::new(MemLedger::new());
        mem.seed_checkpoint(&SeedCheckpoint {
            slug: "hq".to_string(),
            name: "HQ".to_string(),
            chain: "evm".to_string(),
            points_value: 100,
        })
        .await;
        mem.seed_checkpoint(&SeedCheckpoint {
            slug: "sol-booth".to_string(),
            name: "Solana Booth".to_string(),
            chain: "solana".to_string(),
            points_value: 250,
        })
        .await;

        let state = AppState {
            ledger: mem.clone(),
            config: Arc::new(ApiConfig::default()),
        };
        (router(state), mem)
    }

    async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn location_body(place_id: &str) -> Value {
        json!({
            "walletAddress": EVM,
            "locationData": {
                "place_id": place_id,
                "display_name": "Blue Bottle Coffee",
                "lat": 37.77,
                "lon": -122.42,
                "type": "cafe"
            }
        })
    }

    #[tokio::test]
    async fn test_checkin_success_envelope() {
        let (app, _) = test_app().await;
        let (status, body) = post_json(
            &app,
            "/api/checkin",
            json!({ "walletAddress": EVM, "checkpoint": "hq" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["data"]["pointsAwarded"], json!(100));
        assert_eq!(body["data"]["pointsEarnedToday"], json!(100));
        assert_eq!(body["data"]["player"]["total_points"], json!(100));
    }

    #[tokio::test]
    async fn test_checkin_missing_wallet_is_400() {
        let (app, _) = test_app().await;
        let (status, body) = post_json(&app, "/api/checkin", json!({ "checkpoint": "hq" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], json!(false));
    }

    #[tokio::test]
    async fn test_unsupported_chain_never_falls_back_to_evm() {
        let (app, _) = test_app().await;
        // walletAddress is a perfectly valid EVM address; the unknown
        // chain must still be rejected.
        let (status, body) = post_json(
            &app,
            "/api/checkin",
            json!({ "chain": "unsupported", "walletAddress": EVM, "checkpoint": "hq" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"]
            .as_str()
            .unwrap()
            .contains("unsupported chain"));
    }

    #[tokio::test]
    async fn test_cross_chain_address_is_400() {
        let (app, _) = test_app().await;
        let (status, _) = post_json(
            &app,
            "/api/checkin",
            json!({ "chain": "solana", "walletAddress": EVM, "checkpoint": "sol-booth" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_checkpoint_chain_mismatch_is_400() {
        let (app, _) = test_app().await;
        let (status, body) = post_json(
            &app,
            "/api/checkin",
            json!({ "chain": "solana", "walletAddress": SOLANA, "checkpoint": "hq" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("expects"));
    }

    #[tokio::test]
    async fn test_unknown_checkpoint_is_400() {
        let (app, _) = test_app().await;
        let (status, _) = post_json(
            &app,
            "/api/checkin",
            json!({ "walletAddress": EVM, "checkpoint": "nowhere" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_inactive_checkpoint_is_403() {
        let (app, mem) = test_app().await;
        mem.set_checkpoint_active("hq", false).await;
        let (status, _) = post_json(
            &app,
            "/api/checkin",
            json!({ "walletAddress": EVM, "checkpoint": "hq" }),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_eleventh_checkin_is_429_and_total_unchanged() {
        let (app, _) = test_app().await;
        let body = json!({ "walletAddress": EVM, "checkpoint": "hq" });
        for _ in 0..10 {
            let (status, _) = post_json(&app, "/api/checkin", body.clone()).await;
            assert_eq!(status, StatusCode::OK);
        }
        let (status, response) = post_json(&app, "/api/checkin", body).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response["success"], json!(false));

        let (status, response) =
            get_json(&app, &format!("/api/location-checkin?walletAddress={EVM}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(response["data"]["player"]["total_points"], json!(1000));
    }

    #[tokio::test]
    async fn test_location_checkin_success() {
        let (app, _) = test_app().await;
        let (status, body) = post_json(&app, "/api/location-checkin", location_body("osm:1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["pointsEarned"], json!(100));
        assert_eq!(body["data"]["location"]["place_id"], json!("osm:1"));
        assert!(body["data"]["message"]
            .as_str()
            .unwrap()
            .contains("Blue Bottle Coffee"));
    }

    #[tokio::test]
    async fn test_repeat_location_checkin_is_409() {
        let (app, _) = test_app().await;
        let (status, _) = post_json(&app, "/api/location-checkin", location_body("osm:1")).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = post_json(&app, "/api/location-checkin", location_body("osm:1")).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_hidden_location_is_403() {
        let (app, mem) = test_app().await;
        mem.seed_location(Location {
            id: Uuid::new_v4(),
            place_id: "osm:hidden".to_string(),
            name: "Back Room".to_string(),
            lat: 0.0,
            lon: 0.0,
            kind: None,
            is_visible: false,
            points_value: 100,
            created_at: Utc::now(),
        })
        .await;
        let (status, _) =
            post_json(&app, "/api/location-checkin", location_body("osm:hidden")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_out_of_range_coords_rejected_before_any_lookup() {
        let (app, _) = test_app().await;
        for (lat, lon) in [(91.0, 0.0), (-91.0, 0.0), (0.0, 181.0), (0.0, -181.0)] {
            let body = json!({
                "walletAddress": EVM,
                "locationData": { "place_id": "osm:9", "name": "X", "lat": lat, "lon": lon }
            });
            let (status, _) = post_json(&app, "/api/location-checkin", body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
        }
        // missing coordinates are equally malformed
        let body = json!({
            "walletAddress": EVM,
            "locationData": { "place_id": "osm:9", "name": "X", "lat": null, "lon": 0.0 }
        });
        let (status, _) = post_json(&app, "/api/location-checkin", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        // nothing was created: the player lookup still 404s
        let (status, _) =
            get_json(&app, &format!("/api/location-checkin?walletAddress={EVM}")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_player_lookup_codes() {
        let (app, _) = test_app().await;
        let (status, _) = get_json(&app, "/api/location-checkin").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) =
            get_json(&app, &format!("/api/location-checkin?walletAddress={EVM}")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        post_json(&app, "/api/location-checkin", location_body("osm:1")).await;
        let (status, body) =
            get_json(&app, &format!("/api/location-checkin?walletAddress={EVM}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["player"]["wallet_address"], json!(EVM));
    }

    #[tokio::test]
    async fn test_leaderboard_orders_by_points() {
        let (app, _) = test_app().await;
        // EVM player earns 100 at hq, Solana player earns 250 at the booth
        post_json(
            &app,
            "/api/checkin",
            json!({ "walletAddress": EVM, "checkpoint": "hq" }),
        )
        .await;
        post_json(
            &app,
            "/api/checkin",
            json!({ "chain": "solana", "walletAddress": SOLANA, "checkpoint": "sol-booth" }),
        )
        .await;

        let (status, body) = get_json(&app, "/api/leaderboard?limit=10").await;
        assert_eq!(status, StatusCode::OK);
        let players = body["data"]["players"].as_array().unwrap();
        assert_eq!(players.len(), 2);
        assert_eq!(players[0]["total_points"], json!(250));
        assert_eq!(players[1]["total_points"], json!(100));
    }

    #[tokio::test]
    async fn test_healthz() {
        let (app, _) = test_app().await;
        let (status, body) = get_json(&app, "/healthz").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], json!("ok"));
    }
}
