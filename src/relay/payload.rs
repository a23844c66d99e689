//! Wire shapes of the downstream chat endpoint.

// crates.io
use serde_json::Value;
// self
use crate::_prelude::*;

const REPLY_POINTER: &str = "/choices/0/message/content";

/// One inbound message bound for the chat endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatRequest<'a> {
	/// Bot identifier.
	pub bot_id: &'a str,
	/// Downstream user identifier.
	pub user_id: &'a str,
	/// Text typed by the user.
	pub text: &'a str,
	/// Whether the downstream should keep the exchange in its history.
	pub auto_save_history: bool,
}
impl<'a> ChatRequest<'a> {
	/// Renders the non-streaming request body.
	pub fn payload(&self) -> ChatPayload<'a> {
		ChatPayload {
			bot_id: self.bot_id,
			user_id: self.user_id,
			stream: false,
			auto_save_history: self.auto_save_history,
			additional_messages: [ChatMessage {
				role: "user",
				content: self.text,
				content_type: "text",
			}],
		}
	}
}

/// JSON body posted to the chat endpoint.
#[derive(Debug, Serialize)]
pub struct ChatPayload<'a> {
	bot_id: &'a str,
	user_id: &'a str,
	stream: bool,
	auto_save_history: bool,
	additional_messages: [ChatMessage<'a>; 1],
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
	role: &'static str,
	content: &'a str,
	content_type: &'static str,
}

/// Pulls `choices[0].message.content` out of a chat response body.
///
/// Returns `None` when the body is not JSON or the path is absent or not a string.
pub fn extract_reply(body: &[u8]) -> Option<String> {
	let value: Value = serde_json::from_slice(body).ok()?;

	value.pointer(REPLY_POINTER).and_then(Value::as_str).map(str::to_owned)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn payload_is_non_streaming_with_single_user_message() {
		let request = ChatRequest {
			bot_id: "bot",
			user_id: "user_from_teams",
			text: "hello",
			auto_save_history: true,
		};
		let json = serde_json::to_value(request.payload()).expect("Payload should serialize.");

		assert_eq!(
			json,
			serde_json::json!({
				"bot_id": "bot",
				"user_id": "user_from_teams",
				"stream": false,
				"auto_save_history": true,
				"additional_messages": [
					{ "role": "user", "content": "hello", "content_type": "text" }
				]
			})
		);
	}

	#[test]
	fn reply_extraction_tolerates_missing_paths() {
		assert_eq!(
			extract_reply(br#"{"choices":[{"message":{"content":"hi"}}]}"#).as_deref(),
			Some("hi")
		);
		assert_eq!(extract_reply(br#"{"choices":[]}"#), None);
		assert_eq!(extract_reply(br#"{"choices":[{"message":{"content":7}}]}"#), None);
		assert_eq!(extract_reply(b"<html>"), None);
	}
}
