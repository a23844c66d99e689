//! Shared reqwest plumbing for the token and chat endpoints.
//!
//! Both downstream calls go through [`send`], which maps transport failures into
//! [`TransportError`] and captures the status plus body so callers can classify the answer
//! without holding the response open.

// crates.io
use reqwest::{RequestBuilder, redirect::Policy};
// self
use crate::{
	_prelude::*,
	error::{ConfigError, TransportError},
};

const BODY_PREVIEW_LIMIT: usize = 512;

/// Builds the reqwest client used for every downstream call.
///
/// Redirects are not followed; both endpoints must answer directly. `timeout` bounds each call
/// end to end.
pub fn build_client(timeout: StdDuration) -> Result<ReqwestClient, ConfigError> {
	ReqwestClient::builder()
		.timeout(timeout)
		.redirect(Policy::none())
		.build()
		.map_err(ConfigError::from)
}

/// Status and body of a completed downstream call.
#[derive(Clone, Debug)]
pub struct CapturedResponse {
	/// HTTP status code.
	pub status: u16,
	/// Raw response body.
	pub body: Vec<u8>,
}
impl CapturedResponse {
	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Lossy, length-bounded rendering of the body for diagnostics.
	pub fn preview(&self) -> String {
		let text = String::from_utf8_lossy(&self.body);
		let trimmed = text.trim();

		match trimmed.char_indices().nth(BODY_PREVIEW_LIMIT) {
			Some((idx, _)) => format!("{}...", &trimmed[..idx]),
			None => trimmed.to_owned(),
		}
	}
}

/// Sends `request` and captures the full response.
pub async fn send(
	request: RequestBuilder,
	endpoint: &'static str,
) -> Result<CapturedResponse, TransportError> {
	let response =
		request.send().await.map_err(|err| TransportError::from_reqwest(endpoint, err))?;
	let status = response.status().as_u16();
	let body = response
		.bytes()
		.await
		.map_err(|err| TransportError::from_reqwest(endpoint, err))?
		.to_vec();

	Ok(CapturedResponse { status, body })
}
