// crates.io
use httpmock::prelude::*;
// self
use coze_relay::{
	_preludet::*,
	clock::ManualClock,
	exchange::ExchangeProfile,
	relay::{ChatRelay, NO_REPLY_PLACEHOLDER, ReplyOutcome},
};

fn build_relay(server: &MockServer) -> ChatRelay {
	let cache = build_test_cache(
		&server.url("/token"),
		ExchangeProfile::jwt_bearer(None),
		Arc::new(ManualClock::new(test_epoch())),
	);

	build_test_relay(&server.url("/v3/chat"), cache)
}

async fn mock_token<'a>(server: &'a MockServer, token: &str) -> httpmock::Mock<'a> {
	let body = format!("{{\"access_token\":\"{token}\",\"expires_in\":900}}");

	server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200).header("content-type", "application/json").body(body);
		})
		.await
}

#[tokio::test]
async fn relays_text_and_returns_first_choice() {
	let server = MockServer::start_async().await;
	let token = mock_token(&server, "tok-1").await;
	let chat = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/v3/chat")
				.header("authorization", "Bearer tok-1")
				.header("content-type", "application/json")
				.body_includes("\"bot_id\":\"bot-test\"")
				.body_includes("\"user_id\":\"user_from_teams\"")
				.body_includes("\"stream\":false")
				.body_includes("\"content\":\"hello\"");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"choices\":[{\"message\":{\"content\":\"hi\"}}]}");
		})
		.await;
	let relay = build_relay(&server);
	let first = relay.relay("hello").await;
	let second = relay.relay("hello").await;

	assert_eq!(first.text, "hi");
	assert_eq!(first.outcome, ReplyOutcome::Answered);
	assert_eq!(first, second);
	token.assert_calls_async(1).await;
	chat.assert_calls_async(2).await;
}

#[tokio::test]
async fn token_failure_becomes_error_reply_without_chat_call() {
	let server = MockServer::start_async().await;
	let token = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(401).body("{\"error\":\"invalid_client\"}");
		})
		.await;
	let chat = server
		.mock_async(|when, then| {
			when.method(POST).path("/v3/chat");
			then.status(200).body("{}");
		})
		.await;
	let reply = build_relay(&server).relay("hello").await;

	assert!(reply.is_error());
	assert!(reply.text.starts_with("[error] "));
	assert!(reply.text.contains("401"));
	token.assert_calls_async(1).await;
	chat.assert_calls_async(0).await;
}

#[tokio::test]
async fn missing_reply_path_uses_placeholder() {
	let server = MockServer::start_async().await;
	let _token = mock_token(&server, "tok-1").await;
	let chat = server
		.mock_async(|when, then| {
			when.method(POST).path("/v3/chat");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"code\":0,\"data\":{\"status\":\"in_progress\"}}");
		})
		.await;
	let reply = build_relay(&server).relay("hello").await;

	assert_eq!(reply.text, NO_REPLY_PLACEHOLDER);
	assert_eq!(reply.outcome, ReplyOutcome::Placeholder);
	chat.assert_calls_async(1).await;
}

#[tokio::test]
async fn chat_error_status_becomes_error_reply() {
	let server = MockServer::start_async().await;
	let _token = mock_token(&server, "tok-1").await;
	let _chat = server
		.mock_async(|when, then| {
			when.method(POST).path("/v3/chat");
			then.status(500).body("upstream exploded");
		})
		.await;
	let relay = build_relay(&server);
	let reply = relay.relay("hello").await;

	assert!(reply.is_error());
	assert!(reply.text.contains("500"));
	assert!(relay.tokens().peek().is_some());
}

#[tokio::test]
async fn chat_unauthorized_invalidates_cached_token() {
	let server = MockServer::start_async().await;
	let token = mock_token(&server, "tok-1").await;
	let chat = server
		.mock_async(|when, then| {
			when.method(POST).path("/v3/chat");
			then.status(401).body("{\"msg\":\"token expired\"}");
		})
		.await;
	let relay = build_relay(&server);
	let first = relay.relay("hello").await;

	assert!(first.is_error());
	assert!(relay.tokens().peek().is_none());

	let second = relay.relay("hello").await;

	assert!(second.is_error());
	token.assert_calls_async(2).await;
	chat.assert_calls_async(2).await;
}

#[tokio::test]
async fn unrepresentable_token_lifetime_becomes_error_reply() {
	let server = MockServer::start_async().await;
	let token = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"tok-1\",\"expires_in\":100000000000000}");
		})
		.await;
	let chat = server
		.mock_async(|when, then| {
			when.method(POST).path("/v3/chat");
			then.status(200).body("{}");
		})
		.await;
	let relay = build_relay(&server);
	let reply = tokio::spawn(async move { relay.relay("hello").await })
		.await
		.expect("Relay task should not panic on an out-of-range lifetime.");

	assert!(reply.is_error());
	assert!(reply.text.starts_with("[error] "));
	token.assert_calls_async(1).await;
	chat.assert_calls_async(0).await;
}
