// std
use std::net::SocketAddr;
// crates.io
use httpmock::prelude::*;
use tokio::net::TcpListener;
// self
use coze_relay::{
	_preludet::*,
	clock::ManualClock,
	exchange::ExchangeProfile,
	server::{self, HEALTH_PATH, MESSAGES_PATH, OutboundMessage},
};

async fn spawn_relay(server: &MockServer) -> SocketAddr {
	let cache = build_test_cache(
		&server.url("/token"),
		ExchangeProfile::jwt_bearer(None),
		Arc::new(ManualClock::new(test_epoch())),
	);
	let relay = build_test_relay(&server.url("/v3/chat"), cache);
	let listener =
		TcpListener::bind("127.0.0.1:0").await.expect("Loopback listener should bind.");
	let addr = listener.local_addr().expect("Listener should report its address.");

	tokio::spawn(server::serve(listener, relay, std::future::pending()));

	addr
}

async fn post_message(addr: SocketAddr, body: &'static str) -> (u16, OutboundMessage) {
	let response = test_reqwest_client()
		.post(format!("http://{addr}{MESSAGES_PATH}"))
		.header("content-type", "application/json")
		.body(body)
		.send()
		.await
		.expect("Inbound request should reach the relay.");
	let status = response.status().as_u16();
	let reply = response.json().await.expect("Relay should answer with a message body.");

	(status, reply)
}

#[tokio::test]
async fn inbound_message_is_answered_with_chat_reply() {
	let server = MockServer::start_async().await;
	let _token = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"tok-1\",\"expires_in\":900}");
		})
		.await;
	let chat = server
		.mock_async(|when, then| {
			when.method(POST).path("/v3/chat").body_includes("\"content\":\"ping\"");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"choices\":[{\"message\":{\"content\":\"pong\"}}]}");
		})
		.await;
	let addr = spawn_relay(&server).await;
	let (status, reply) = post_message(addr, "{\"type\":\"message\",\"text\":\"ping\"}").await;

	assert_eq!(status, 200);
	assert_eq!(reply, OutboundMessage::new("pong"));
	chat.assert_calls_async(1).await;
}

#[tokio::test]
async fn downstream_failure_still_answers_200() {
	let server = MockServer::start_async().await;
	let _token = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(500).body("down");
		})
		.await;
	let addr = spawn_relay(&server).await;
	let (status, reply) = post_message(addr, "{\"text\":\"ping\"}").await;

	assert_eq!(status, 200);
	assert_eq!(reply.kind, "message");
	assert!(reply.text.starts_with("[error] "));
}

#[tokio::test]
async fn unusable_bodies_get_empty_reply_without_downstream_calls() {
	let server = MockServer::start_async().await;
	let token = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200).body("{\"access_token\":\"tok-1\",\"expires_in\":900}");
		})
		.await;
	let addr = spawn_relay(&server).await;

	for body in ["not json", "{\"type\":\"conversationUpdate\"}", "{\"text\":\"  \"}"] {
		let (status, reply) = post_message(addr, body).await;

		assert_eq!(status, 200);
		assert_eq!(reply, OutboundMessage::new(""));
	}

	token.assert_calls_async(0).await;
}

#[tokio::test]
async fn health_route_answers_ok() {
	let server = MockServer::start_async().await;
	let addr = spawn_relay(&server).await;
	let response = test_reqwest_client()
		.get(format!("http://{addr}{HEALTH_PATH}"))
		.send()
		.await
		.expect("Health request should reach the relay.");

	assert_eq!(response.status().as_u16(), 200);
	assert_eq!(response.text().await.expect("Health body should be readable."), "ok");
}
