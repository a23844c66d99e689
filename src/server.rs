//! Inbound HTTP boundary.
//!
//! `POST /api/messages` always answers `200 {"type":"message","text":...}`. Bodies that are not
//! JSON, or that carry no usable `text`, get an empty reply without touching the downstream API.

// crates.io
use axum::{
	Json, Router,
	body::Bytes,
	extract::State,
	routing::{get, post},
};
use tokio::net::TcpListener;
// self
use crate::{_prelude::*, relay::ChatRelay};

/// Route receiving inbound messages.
pub const MESSAGES_PATH: &str = "/api/messages";
/// Liveness route.
pub const HEALTH_PATH: &str = "/healthz";

/// Fields of an inbound activity the relay cares about; everything else is ignored.
#[derive(Debug, Default, Deserialize)]
pub struct InboundMessage {
	/// User text, if the activity carries any.
	#[serde(default)]
	pub text: Option<String>,
}
impl InboundMessage {
	/// Parses an inbound body leniently; anything unreadable is treated as carrying no text.
	pub fn parse(body: &[u8]) -> Self {
		serde_json::from_slice(body).unwrap_or_default()
	}

	/// User text worth relaying, if any.
	pub fn relayable_text(&self) -> Option<&str> {
		self.text.as_deref().filter(|text| !text.trim().is_empty())
	}
}

/// Reply body returned for every inbound message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
	/// Activity type; always `message`.
	#[serde(rename = "type")]
	pub kind: String,
	/// Reply text, possibly empty.
	pub text: String,
}
impl OutboundMessage {
	/// Wraps reply text.
	pub fn new(text: impl Into<String>) -> Self {
		Self { kind: "message".into(), text: text.into() }
	}
}

/// Builds the router serving inbound messages through `relay`.
pub fn router(relay: ChatRelay) -> Router {
	Router::new()
		.route(MESSAGES_PATH, post(messages))
		.route(HEALTH_PATH, get(health))
		.with_state(relay)
}

/// Serves `relay` on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, relay: ChatRelay, shutdown: F) -> Result<()>
where
	F: 'static + Send + Future<Output = ()>,
{
	axum::serve(listener, router(relay))
		.with_graceful_shutdown(shutdown)
		.await
		.map_err(Error::Serve)
}

async fn messages(State(relay): State<ChatRelay>, body: Bytes) -> Json<OutboundMessage> {
	let inbound = InboundMessage::parse(&body);
	let text = match inbound.relayable_text() {
		Some(text) => relay.relay(text).await.text,
		None => String::new(),
	};

	Json(OutboundMessage::new(text))
}

async fn health() -> &'static str {
	"ok"
}
