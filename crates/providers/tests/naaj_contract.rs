//! HTTP contract tests for the Naaj client and the IP geolocator.

use providers::geolocation::{IpGeolocator, LocationProvider};
use providers::naaj::NaajClient;
use providers::Assistant;
use serde_json::json;
use shared::error::ClientError;
use shared::review::ReviewSubmission;
use shared::transcript::{Location, ReplyTurn, Turn, TurnKind};
use wiremock::matchers::{body_json, body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_question_body_matches_wire_contract() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/naaj"))
        .and(body_json(json!({
            "question": "¿Qué hay cerca?",
            "history": [
                {"text": "¡Hola!", "isUser": false},
                {"text": "hola", "isUser": true}
            ],
            "lat": 19.84,
            "lng": -90.53
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"answer": "El malecón"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = NaajClient::new(&server.uri()).unwrap();
    let history = vec![Turn::assistant_text(1, "¡Hola!"), Turn::user(2, "hola")];
    let turns = client
        .send(
            "¿Qué hay cerca?",
            &history,
            Some(Location { lat: 19.84, lng: -90.53 }),
        )
        .await
        .unwrap();

    assert_eq!(turns, vec![ReplyTurn::text("El malecón")]);
}

#[tokio::test]
async fn test_missing_location_sends_nulls() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/naaj"))
        .and(body_partial_json(json!({"lat": null, "lng": null, "history": []})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "messages": [
                {"content": "A"},
                {"content": "img.png", "type": "image", "alt_text": "X"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = NaajClient::new(&server.uri()).unwrap();
    let turns = client.send("hola", &[], None).await.unwrap();

    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].text, "A");
    assert_eq!(turns[0].kind, TurnKind::Text);
    assert_eq!(turns[1].kind, TurnKind::Image);
    assert_eq!(turns[1].alt_text.as_deref(), Some("X"));
}

#[tokio::test]
async fn test_server_error_is_reported() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/naaj"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({"error": "Se requiere una pregunta."})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = NaajClient::new(&server.uri()).unwrap();
    let err = client.send("", &[], None).await.unwrap_err();

    match err {
        ClientError::Status { status, body } => {
            assert_eq!(status, 500);
            assert!(body.contains("Se requiere"));
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unreachable_backend_is_transport_error() {
    // Nothing listens on the discard port
    let client = NaajClient::new("http://127.0.0.1:9").unwrap();
    let err = client.send("hola", &[], None).await.unwrap_err();
    assert!(matches!(err, ClientError::Transport(_)));
}

#[tokio::test]
async fn test_review_is_posted() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/review"))
        .and(body_json(json!({
            "place_name": "Edzná",
            "rating": 5,
            "comment": "Impresionante",
            "address": "Ubicación desconocida",
            "coords": null,
            "category": "Lugar Turístico"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let client = NaajClient::new(&server.uri()).unwrap();
    let reply = client
        .submit_review(&ReviewSubmission::new("Edzná", 5, "Impresionante"))
        .await
        .unwrap();
    assert_eq!(reply, json!({"ok": true}));
}

#[tokio::test]
async fn test_invalid_review_never_hits_network() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/review"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = NaajClient::new(&server.uri()).unwrap();
    let err = client
        .submit_review(&ReviewSubmission::new("Edzná", 0, ""))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::InvalidReview(_)));
}

#[tokio::test]
async fn test_ip_geolocator_parses_lookup() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "lat": 19.8301,
            "lon": -90.5349
        })))
        .mount(&server)
        .await;

    let geo = IpGeolocator::new(&format!("{}/json", server.uri())).unwrap();
    let location = geo.locate().await.unwrap();
    assert_eq!(location, Location { lat: 19.8301, lng: -90.5349 });
}

#[tokio::test]
async fn test_ip_geolocator_failure_status() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "fail",
            "message": "reserved range"
        })))
        .mount(&server)
        .await;

    let geo = IpGeolocator::new(&format!("{}/json", server.uri())).unwrap();
    let err = geo.locate().await.unwrap_err();
    assert!(err.to_string().contains("reserved range"));
}
