//! Client behaviour against a mock WHOOP API.

use std::sync::Arc;

use chrono::{TimeDelta, Utc};
use serde_json::json;
use tempfile::tempdir;
use whoop_client::{CollectionQuery, Error, ScoreState, WhoopClient};
use whoop_oauth::{StaticToken, Token, TokenManager, TokenStore};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_with_token(server: &MockServer, token: &str) -> WhoopClient {
    WhoopClient::builder()
        .base_url(format!("{}/developer", server.uri()))
        .access_token(token)
        .build()
        .unwrap()
}

fn cycle_json(id: i64) -> serde_json::Value {
    json!({
        "id": id,
        "user_id": 10129,
        "created_at": "2024-03-01T11:25:44.774Z",
        "updated_at": "2024-03-01T14:25:44.774Z",
        "start": "2024-03-01T02:25:44.774Z",
        "end": "2024-03-02T02:25:44.774Z",
        "timezone_offset": "-05:00",
        "score_state": "SCORED",
        "score": {
            "strain": 5.2951527,
            "kilojoule": 8288.297,
            "average_heart_rate": 68,
            "max_heart_rate": 141
        }
    })
}

#[tokio::test]
async fn test_profile_sends_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/developer/v2/user/profile/basic"))
        .and(header("authorization", "Bearer secret-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user_id": 10129,
            "email": "jsmith123@whoop.com",
            "first_name": "John",
            "last_name": "Smith"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let profile = client_with_token(&server, "secret-token")
        .user()
        .profile()
        .await
        .unwrap();

    assert_eq!(profile.user_id, 10129);
    assert_eq!(profile.first_name, "John");
}

#[tokio::test]
async fn test_no_token_omits_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Authorization was not valid"))
        .mount(&server)
        .await;

    let client = WhoopClient::builder()
        .base_url(format!("{}/developer", server.uri()))
        .build()
        .unwrap();
    let err = client.user().body_measurements().await.unwrap_err();

    assert!(err.is_unauthorized());
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(!requests[0].headers.contains_key("authorization"));
}

#[tokio::test]
async fn test_cycles_list_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/developer/v2/cycle"))
        .and(query_param("limit", "25"))
        .and(query_param("start", "2024-03-01T00:00:00Z"))
        .and(query_param("nextToken", "page-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "records": [cycle_json(93845)],
            "next_token": "page-3"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let query = CollectionQuery::new()
        .start("2024-03-01T00:00:00Z")
        .limit(50)
        .next_token("page-2");
    let page = client_with_token(&server, "t")
        .cycles()
        .list(&query)
        .await
        .unwrap();

    assert_eq!(page.records.len(), 1);
    assert_eq!(page.records[0].score_state, ScoreState::Scored);
    assert_eq!(page.next_token.as_deref(), Some("page-3"));
}

#[tokio::test]
async fn test_cycle_sub_resources() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/developer/v2/cycle/93845/recovery"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "cycle_id": 93845,
            "sleep_id": "123e4567-e89b-12d3-a456-426614174000",
            "user_id": 10129,
            "created_at": "2024-03-01T11:25:44.774Z",
            "updated_at": "2024-03-01T14:25:44.774Z",
            "score_state": "SCORED",
            "score": {
                "user_calibrating": false,
                "recovery_score": 44,
                "resting_heart_rate": 64,
                "hrv_rmssd_milli": 31.813562,
                "spo2_percentage": 95.6875,
                "skin_temp_celsius": 33.7
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let recovery = client_with_token(&server, "t")
        .cycles()
        .recovery(93845)
        .await
        .unwrap();
    assert_eq!(recovery.score.unwrap().recovery_score, 44.0);
}

#[tokio::test]
async fn test_invalid_ids_never_hit_network() {
    let server = MockServer::start().await;
    let client = client_with_token(&server, "t");

    assert!(matches!(
        client.cycles().get(0).await,
        Err(Error::InvalidArgument(_))
    ));
    assert!(matches!(
        client.sleep().get("not-a-uuid").await,
        Err(Error::InvalidArgument(_))
    ));
    assert!(matches!(
        client.workouts().get("ecfc6a154661442fa9a4f160dd7afae8").await,
        Err(Error::InvalidArgument(_))
    ));
    assert!(matches!(
        client.activity().mapping(-1).await,
        Err(Error::InvalidArgument(_))
    ));

    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_error_classification() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/developer/v2/activity/workout/ecfc6a15-4661-442f-a9a4-f160dd7afae8"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/developer/v2/recovery"))
        .respond_with(ResponseTemplate::new(429).set_body_string("too many"))
        .mount(&server)
        .await;

    let client = client_with_token(&server, "t");

    let err = client
        .workouts()
        .get("ecfc6a15-4661-442f-a9a4-f160dd7afae8")
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let err = client
        .recovery()
        .list(&CollectionQuery::new())
        .await
        .unwrap_err();
    assert!(err.is_rate_limited());
    assert_eq!(err.status(), Some(429));
}

#[tokio::test]
async fn test_activity_mapping() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/developer/v1/activity-mapping/1043"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "v2_activity_id": "ecfc6a15-4661-442f-a9a4-f160dd7afae8"
        })))
        .mount(&server)
        .await;

    let mapping = client_with_token(&server, "t")
        .activity()
        .mapping(1043)
        .await
        .unwrap();
    assert_eq!(mapping.v2_activity_id, "ecfc6a15-4661-442f-a9a4-f160dd7afae8");
}

#[tokio::test]
async fn test_static_token_wins_over_provider() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("authorization", "Bearer from-env"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "height_meter": 1.83,
            "weight_kilogram": 90.7,
            "max_heart_rate": 200
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = WhoopClient::builder()
        .base_url(format!("{}/developer", server.uri()))
        .access_token("from-env")
        .token_provider(Arc::new(StaticToken::new("from-provider")))
        .build()
        .unwrap();

    let body = client.user().body_measurements().await.unwrap();
    assert_eq!(body.max_heart_rate, 200);
}

#[tokio::test]
async fn test_provider_token_from_store() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("authorization", "Bearer stored-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"records": []})))
        .expect(1)
        .mount(&server)
        .await;

    let temp = tempdir().unwrap();
    let store = TokenStore::in_dir(temp.path());
    store
        .save(&Token {
            access_token: "stored-token".to_string(),
            refresh_token: None,
            token_type: "Bearer".to_string(),
            expiry: Some(Utc::now() + TimeDelta::hours(1)),
        })
        .unwrap();

    let client = WhoopClient::builder()
        .base_url(format!("{}/developer", server.uri()))
        .token_provider(Arc::new(TokenManager::read_only(store)))
        .build()
        .unwrap();

    let page = client.sleep().list(&CollectionQuery::new()).await.unwrap();
    assert!(page.records.is_empty());
}

#[tokio::test]
async fn test_expired_stored_token_surfaces_token_error() {
    let server = MockServer::start().await;

    let temp = tempdir().unwrap();
    let store = TokenStore::in_dir(temp.path());
    store
        .save(&Token {
            access_token: "old".to_string(),
            refresh_token: None,
            token_type: "Bearer".to_string(),
            expiry: Some(Utc::now() - TimeDelta::hours(1)),
        })
        .unwrap();

    let client = WhoopClient::builder()
        .base_url(format!("{}/developer", server.uri()))
        .token_provider(Arc::new(TokenManager::read_only(store)))
        .build()
        .unwrap();

    let err = client.user().profile().await.unwrap_err();
    assert!(matches!(
        err,
        Error::Token(whoop_oauth::OAuthError::TokenExpired)
    ));
    assert!(server.received_requests().await.unwrap().is_empty());
}
