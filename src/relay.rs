//! Forwards one inbound message to the chat endpoint and turns every outcome into a reply.
//!
//! [`ChatRelay::relay`] is the outermost error boundary: token failures, transport failures, and
//! non-success statuses all become a [`ChatReply`] whose text carries the error, so the inbound
//! transport always has something to answer with.

pub mod payload;

pub use payload::*;

// crates.io
use reqwest::header::AUTHORIZATION;
// self
use crate::{
	_prelude::*,
	auth::AccessToken,
	cache::TokenCache,
	error::ChatError,
	http,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// Reply text used when the chat endpoint answers without a reply at the expected path.
pub const NO_REPLY_PLACEHOLDER: &str = "(no response)";
/// Prefix of every failure reply.
pub const ERROR_REPLY_PREFIX: &str = "[error]";

/// How a [`ChatReply`] was produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplyOutcome {
	/// The chat endpoint produced reply text.
	Answered,
	/// The chat endpoint answered without reply text; the placeholder was used.
	Placeholder,
	/// The relay failed; the text describes the error.
	Failed,
}

/// Reply handed back to the inbound transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatReply {
	/// Text to send back to the user.
	pub text: String,
	/// How the text was produced.
	pub outcome: ReplyOutcome,
}
impl ChatReply {
	/// Successful reply.
	pub fn answered(text: impl Into<String>) -> Self {
		Self { text: text.into(), outcome: ReplyOutcome::Answered }
	}

	/// Placeholder reply.
	pub fn placeholder(text: impl Into<String>) -> Self {
		Self { text: text.into(), outcome: ReplyOutcome::Placeholder }
	}

	/// Failure reply describing `error`.
	pub fn failed(error: &dyn Display) -> Self {
		Self { text: format!("{ERROR_REPLY_PREFIX} {error}"), outcome: ReplyOutcome::Failed }
	}

	/// Returns `true` if the reply carries an error.
	pub fn is_error(&self) -> bool {
		matches!(self.outcome, ReplyOutcome::Failed)
	}
}

/// Static settings of the chat endpoint.
#[derive(Clone, Debug)]
pub struct ChatSettings {
	/// Chat endpoint URL.
	pub endpoint: Url,
	/// Bot identifier.
	pub bot_id: String,
	/// Fixed downstream user identifier.
	pub user_id: String,
	/// Whether the downstream should keep conversation history.
	pub auto_save_history: bool,
	/// Reply used when the response lacks reply text.
	pub placeholder: String,
}
impl ChatSettings {
	/// Default downstream user identifier.
	pub const DEFAULT_USER_ID: &'static str = "user_from_teams";

	/// Creates settings with the default user identifier and placeholder.
	pub fn new(endpoint: Url, bot_id: impl Into<String>) -> Self {
		Self {
			endpoint,
			bot_id: bot_id.into(),
			user_id: Self::DEFAULT_USER_ID.into(),
			auto_save_history: true,
			placeholder: NO_REPLY_PLACEHOLDER.into(),
		}
	}

	/// Overrides the downstream user identifier.
	pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
		self.user_id = user_id.into();

		self
	}

	/// Overrides the placeholder reply.
	pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
		self.placeholder = placeholder.into();

		self
	}
}

/// Relays inbound text to the chat endpoint using tokens from a shared [`TokenCache`].
#[derive(Clone, Debug)]
pub struct ChatRelay {
	tokens: Arc<TokenCache>,
	client: ReqwestClient,
	settings: Arc<ChatSettings>,
}
impl ChatRelay {
	const ENDPOINT: &'static str = "chat";

	/// Creates a relay.
	pub fn new(tokens: Arc<TokenCache>, client: ReqwestClient, settings: ChatSettings) -> Self {
		Self { tokens, client, settings: Arc::new(settings) }
	}

	/// Token cache backing this relay.
	pub fn tokens(&self) -> &Arc<TokenCache> {
		&self.tokens
	}

	/// Chat settings in use.
	pub fn settings(&self) -> &ChatSettings {
		&self.settings
	}

	/// Relays `user_text` and returns the reply. Never fails.
	pub async fn relay(&self, user_text: &str) -> ChatReply {
		const KIND: FlowKind = FlowKind::Chat;

		let span = FlowSpan::new(KIND, "relay");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async {
				let token = self.tokens.get_token().await?;

				self.complete(&token, user_text).await.map_err(Error::from)
			})
			.await;

		obs::record_flow_outcome(KIND, FlowOutcome::of(&result));

		result.unwrap_or_else(|err| {
			obs::warn_failure(KIND, &err);

			ChatReply::failed(&err)
		})
	}

	async fn complete(&self, token: &AccessToken, text: &str) -> Result<ChatReply, ChatError> {
		let request = ChatRequest {
			bot_id: &self.settings.bot_id,
			user_id: &self.settings.user_id,
			text,
			auto_save_history: self.settings.auto_save_history,
		};
		let builder = self
			.client
			.post(self.settings.endpoint.clone())
			.header(AUTHORIZATION, token.secret.bearer())
			.json(&request.payload());
		let captured = http::send(builder, Self::ENDPOINT).await.map_err(ChatError::from)?;

		if captured.status == 401 {
			self.tokens.invalidate(token);
		}
		if !captured.is_success() {
			return Err(ChatError::Status { status: captured.status, body: captured.preview() });
		}

		Ok(match extract_reply(&captured.body) {
			Some(reply) => ChatReply::answered(reply),
			None => ChatReply::placeholder(self.settings.placeholder.as_str()),
		})
	}
}
