use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use extlogin_protocol::{CaptureResponse, cors};
use tokio::sync::watch;
use tower::ServiceExt;

use super::*;

const LANDSCAPE: &str = "https://eu10.example.ondemand.com/index.html";

struct Harness {
	app: axum::Router,
	slot: Arc<SettleSlot>,
	outcome: oneshot::Receiver<Outcome>,
	shutdown: watch::Receiver<bool>,
}

fn harness(landscape: &str) -> Harness {
	let (slot, outcome) = SettleSlot::new();
	let (tx, shutdown) = watch::channel(false);
	let state = CaptureState::new(Landscape::new(landscape), Arc::clone(&slot), Arc::new(tx));
	Harness {
		app: router("/ext-login", state),
		slot,
		outcome,
		shutdown,
	}
}

fn post_json(body: &str) -> Request<Body> {
	Request::builder()
		.method(Method::POST)
		.uri("/ext-login")
		.header("content-type", "application/json")
		.body(Body::from(body.to_string()))
		.unwrap()
}

async fn send(app: &axum::Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
	let response = app.clone().oneshot(request).await.unwrap();
	let status = response.status();
	let headers = response.headers().clone();
	let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
	(status, headers, body.to_vec())
}

fn status_of(body: &[u8]) -> CaptureResponse {
	serde_json::from_slice(body).unwrap()
}

#[tokio::test]
async fn preflight_allows_any_origin() {
	let h = harness(LANDSCAPE);
	let request = Request::builder()
		.method(Method::OPTIONS)
		.uri("/ext-login")
		.body(Body::empty())
		.unwrap();

	let (status, headers, body) = send(&h.app, request).await;

	assert_eq!(status, StatusCode::OK);
	assert!(body.is_empty());
	assert_eq!(headers["access-control-allow-origin"], cors::ANY_ORIGIN);
	assert_eq!(headers["access-control-allow-methods"], cors::METHODS);
	assert_eq!(headers["access-control-allow-headers"], cors::PREFLIGHT_HEADERS);
	assert_eq!(headers["access-control-allow-credentials"], "true");
	assert!(!h.slot.is_settled());
}

#[tokio::test]
async fn valid_post_settles_with_token() {
	let h = harness(LANDSCAPE);

	let (status, headers, body) = send(&h.app, post_json(r#"{"token":"eyJhbGciOi.eyJleHAiOjF9.sig"}"#)).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(status_of(&body), CaptureResponse::OK);
	assert_eq!(
		headers["access-control-allow-origin"],
		"https://eu10.example.ondemand.com"
	);
	assert_eq!(headers["access-control-allow-headers"], cors::HEADERS);
	assert!(*h.shutdown.borrow(), "winning post should request shutdown");

	let token = h.outcome.await.unwrap().unwrap();
	assert_eq!(token.as_str(), "eyJhbGciOi.eyJleHAiOjF9.sig");
}

#[tokio::test]
async fn empty_object_settles_invalid_payload() {
	let h = harness(LANDSCAPE);

	let (status, _, body) = send(&h.app, post_json("{}")).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(status_of(&body), CaptureResponse::ERROR);
	let err = h.outcome.await.unwrap().unwrap_err();
	assert!(matches!(err, Error::InvalidPayload { ref landscape } if landscape.as_str() == LANDSCAPE));
}

#[tokio::test]
async fn html_page_settles_invalid_payload() {
	let h = harness(LANDSCAPE);

	let (_, _, body) = send(
		&h.app,
		post_json(r#"{"token":"<html><body>Unauthorized</body></html>"}"#),
	)
	.await;

	assert_eq!(status_of(&body), CaptureResponse::ERROR);
	assert!(matches!(h.outcome.await.unwrap(), Err(Error::InvalidPayload { .. })));
}

#[tokio::test]
async fn form_encoded_legacy_field_is_accepted() {
	let h = harness(LANDSCAPE);
	let request = Request::builder()
		.method(Method::POST)
		.uri("/ext-login")
		.header("content-type", "application/x-www-form-urlencoded; charset=UTF-8")
		.body(Body::from("jwt=abc.def.ghi&state=1"))
		.unwrap();

	let (_, _, body) = send(&h.app, request).await;

	assert_eq!(status_of(&body), CaptureResponse::OK);
	assert_eq!(h.outcome.await.unwrap().unwrap().as_str(), "abc.def.ghi");
}

#[tokio::test]
async fn body_with_both_fields_settles_token_field() {
	let h = harness(LANDSCAPE);

	let (_, _, body) = send(&h.app, post_json(r#"{"jwt":"old.jwt.sig","token":"new.token.sig"}"#)).await;

	assert_eq!(status_of(&body), CaptureResponse::OK);
	assert_eq!(h.outcome.await.unwrap().unwrap().as_str(), "new.token.sig");
}

#[tokio::test]
async fn late_post_is_rejected_without_resettling() {
	let h = harness(LANDSCAPE);

	let (_, _, first) = send(&h.app, post_json(r#"{"token":"first.token.sig"}"#)).await;
	let (_, _, second) = send(&h.app, post_json(r#"{"token":"second.token.sig"}"#)).await;
	let (_, _, third) = send(&h.app, post_json("{}")).await;

	assert_eq!(status_of(&first), CaptureResponse::OK);
	assert_eq!(status_of(&second), CaptureResponse::ERROR);
	assert_eq!(status_of(&third), CaptureResponse::ERROR);
	assert_eq!(h.outcome.await.unwrap().unwrap().as_str(), "first.token.sig");
}

#[tokio::test]
async fn untrusted_landscape_falls_back_to_any_origin() {
	let h = harness("javascript:alert(1)");

	let (_, headers, _) = send(&h.app, post_json(r#"{"token":"a.b.c"}"#)).await;

	assert_eq!(headers["access-control-allow-origin"], cors::ANY_ORIGIN);
}

#[tokio::test]
async fn other_paths_are_not_found() {
	let h = harness(LANDSCAPE);
	let request = Request::builder()
		.method(Method::POST)
		.uri("/other")
		.body(Body::from("{}"))
		.unwrap();

	let (status, _, _) = send(&h.app, request).await;

	assert_eq!(status, StatusCode::NOT_FOUND);
	assert!(!h.slot.is_settled());
}

#[test]
fn slot_settles_once() {
	let (slot, mut outcome) = SettleSlot::new();

	assert!(slot.settle(Ok(Token::new("a"))));
	assert!(!slot.settle(Ok(Token::new("b"))));
	assert!(!slot.settle(Err(Error::InvalidPayload {
		landscape: Landscape::new(LANDSCAPE),
	})));
	assert!(slot.is_settled());
	assert_eq!(outcome.try_recv().unwrap().unwrap().as_str(), "a");
}

#[test]
fn settling_after_receiver_dropped_is_silent() {
	let (slot, outcome) = SettleSlot::new();
	drop(outcome);
	assert!(slot.settle(Ok(Token::new("late"))));
}

fn loopback_config() -> LoginConfig {
	LoginConfig::default()
		.with_port(0)
		.with_shutdown_grace(Duration::from_millis(200))
}

#[tokio::test]
async fn start_registers_and_terminate_releases() {
	let server = CaptureServer::new(ListenerRegistry::new(), loopback_config());
	let landscape = Landscape::new(LANDSCAPE);

	let pending = server.start(&landscape).unwrap();
	assert_ne!(pending.local_addr().port(), 0);
	assert_eq!(server.registry().local_addr(&landscape), Some(pending.local_addr()));

	let again = server.start(&landscape).unwrap_err();
	assert!(matches!(again, Error::AlreadyListening { .. }));

	assert!(server.terminate(&landscape).await);
	assert!(!server.terminate(&landscape).await);
	assert!(!server.registry().contains(&landscape));

	let err = pending.settled().await.unwrap_err();
	assert!(matches!(err, Error::Listen { .. }));
}

#[tokio::test]
async fn occupied_port_is_a_listen_error() {
	let blocker = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
	let port = blocker.local_addr().unwrap().port();
	let server = CaptureServer::new(ListenerRegistry::new(), loopback_config().with_port(port));
	let landscape = Landscape::new(LANDSCAPE);

	let err = server.start(&landscape).unwrap_err();

	assert!(matches!(err, Error::Listen { ref landscape, .. } if landscape.as_str() == LANDSCAPE));
	assert!(server.registry().is_empty());
}

#[tokio::test]
async fn invalid_capture_path_is_rejected() {
	let mut config = loopback_config();
	config.capture_path = "ext-login".into();
	let server = CaptureServer::new(ListenerRegistry::new(), config);

	let err = server.start(&Landscape::new(LANDSCAPE)).unwrap_err();

	assert!(matches!(err, Error::Listen { .. }));
	assert!(server.registry().is_empty());
}

#[tokio::test]
async fn distinct_landscapes_do_not_contend() {
	let server = CaptureServer::new(ListenerRegistry::new(), loopback_config());
	let a = Landscape::new("https://a.example.com");
	let b = Landscape::new("https://b.example.com");

	let pa = server.start(&a).unwrap();
	let pb = server.start(&b).unwrap();

	assert_ne!(pa.local_addr(), pb.local_addr());
	assert_eq!(server.registry().len(), 2);
	server.registry().terminate_all().await;
	assert!(server.registry().is_empty());
}

#[tokio::test]
async fn terminate_drops_connection_stalled_mid_request() {
	use tokio::io::{AsyncReadExt, AsyncWriteExt};

	let server = CaptureServer::new(
		ListenerRegistry::new(),
		loopback_config().with_shutdown_grace(Duration::from_millis(50)),
	);
	let landscape = Landscape::new(LANDSCAPE);
	let pending = server.start(&landscape).unwrap();

	let body = r#"{"token":"after.terminate.sig"}"#;
	let head = format!(
		"POST /ext-login HTTP/1.1\r\nHost: 127.0.0.1\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n",
		body.len()
	);
	let mut stream = tokio::net::TcpStream::connect(pending.local_addr()).await.unwrap();
	stream.write_all(head.as_bytes()).await.unwrap();
	stream.write_all(&body.as_bytes()[..5]).await.unwrap();
	tokio::time::sleep(Duration::from_millis(100)).await;

	assert!(server.terminate(&landscape).await);
	assert!(server.registry().is_empty());

	// The connection is gone, so these writes may fail and the read sees EOF or a reset.
	let _ = stream.write_all(&body.as_bytes()[5..]).await;
	let mut response = Vec::new();
	let _ = tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut response)).await;
	let response = String::from_utf8_lossy(&response);
	assert!(!response.contains("\"ok\""), "terminated listener answered: {response}");

	let outcome = tokio::time::timeout(Duration::from_secs(1), pending.settled())
		.await
		.unwrap();
	assert!(matches!(outcome, Err(Error::Listen { .. })));
}
