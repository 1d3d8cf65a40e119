//! HTTP surface of the capture listener.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Request, State};
use axum::http::header::{
	ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
	ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE,
};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use extlogin_protocol::{CapturePayload, CaptureResponse, cors};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::SettleSlot;
use crate::error::Error;
use crate::landscape::Landscape;
use crate::token::Token;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

#[derive(Clone)]
pub(crate) struct CaptureState {
	landscape: Landscape,
	/// Sanitized landscape origin, or `*`.
	allow_origin: HeaderValue,
	slot: Arc<SettleSlot>,
	shutdown: Arc<watch::Sender<bool>>,
}

impl CaptureState {
	pub(crate) fn new(landscape: Landscape, slot: Arc<SettleSlot>, shutdown: Arc<watch::Sender<bool>>) -> Self {
		let allow_origin = landscape
			.origin()
			.and_then(|origin| HeaderValue::from_str(&origin).ok())
			.unwrap_or(HeaderValue::from_static(cors::ANY_ORIGIN));
		Self {
			landscape,
			allow_origin,
			slot,
			shutdown,
		}
	}
}

pub(crate) fn router(capture_path: &str, state: CaptureState) -> Router {
	Router::new()
		.route(capture_path, post(capture_token).options(preflight))
		.layer(middleware::from_fn_with_state(state.clone(), cors_headers))
		.with_state(state)
}

/// Fills in any CORS header the handler did not set itself.
async fn cors_headers(State(state): State<CaptureState>, request: Request, next: Next) -> Response {
	let mut response = next.run(request).await;
	let headers = response.headers_mut();
	headers
		.entry(ACCESS_CONTROL_ALLOW_ORIGIN)
		.or_insert(state.allow_origin);
	headers
		.entry(ACCESS_CONTROL_ALLOW_METHODS)
		.or_insert(HeaderValue::from_static(cors::METHODS));
	headers
		.entry(ACCESS_CONTROL_ALLOW_HEADERS)
		.or_insert(HeaderValue::from_static(cors::HEADERS));
	headers
		.entry(ACCESS_CONTROL_ALLOW_CREDENTIALS)
		.or_insert(HeaderValue::from_static(cors::CREDENTIALS));
	response
}

async fn preflight() -> impl IntoResponse {
	(
		StatusCode::OK,
		[
			(ACCESS_CONTROL_ALLOW_ORIGIN, cors::ANY_ORIGIN),
			(ACCESS_CONTROL_ALLOW_HEADERS, cors::PREFLIGHT_HEADERS),
		],
	)
}

async fn capture_token(State(state): State<CaptureState>, headers: HeaderMap, body: Bytes) -> Json<CaptureResponse> {
	let payload = parse_payload(&headers, &body);
	let outcome = match payload.usable_token() {
		Some(token) => Ok(Token::new(token)),
		None => Err(Error::InvalidPayload {
			landscape: state.landscape.clone(),
		}),
	};
	let accepted = outcome.is_ok();

	if !state.slot.settle(outcome) {
		debug!(target = "extlogin.capture", landscape = %state.landscape, "capture already settled, rejecting post");
		return Json(CaptureResponse::ERROR);
	}
	state.shutdown.send_replace(true);

	if accepted {
		info!(target = "extlogin.capture", landscape = %state.landscape, "token received");
		Json(CaptureResponse::OK)
	} else {
		warn!(target = "extlogin.capture", landscape = %state.landscape, "login page posted an unusable token");
		Json(CaptureResponse::ERROR)
	}
}

/// Reads the token from a JSON or form-encoded body.
fn parse_payload(headers: &HeaderMap, body: &[u8]) -> CapturePayload {
	let is_form = headers
		.get(CONTENT_TYPE)
		.and_then(|value| value.to_str().ok())
		.is_some_and(|value| value.starts_with(FORM_CONTENT_TYPE));

	if !is_form {
		return CapturePayload::from_json(body);
	}

	CapturePayload::from_form(url::form_urlencoded::parse(body))
}
