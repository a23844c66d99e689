//! Redeems signed assertions for access tokens at the authorization endpoint.
//!
//! [`HttpTokenExchanger`] performs exactly one POST per call and never retries; retry policy
//! belongs to the caller. The request and response shapes come from an [`ExchangeProfile`].

pub mod profile;

pub use profile::*;

// crates.io
use reqwest::header::AUTHORIZATION;
use serde_json::{Map, Value};
// self
use crate::{
	_prelude::*,
	auth::{SignedAssertion, TokenSecret},
	clock::{Clock, SystemClock},
	error::AuthError,
	http::{self, CapturedResponse},
};

/// Boxed future returned by [`TokenExchange::exchange`].
pub type ExchangeFuture<'a> =
	Pin<Box<dyn Future<Output = Result<ExchangedToken, AuthError>> + 'a + Send>>;

/// Redeems a signed assertion for an access token.
pub trait TokenExchange
where
	Self: Send + Sync,
{
	/// Performs one redemption call; the assertion is consumed.
	fn exchange(&self, assertion: SignedAssertion) -> ExchangeFuture<'_>;
}

/// Access token and its server-declared lifetime.
#[derive(Clone, Debug)]
pub struct ExchangedToken {
	/// Access token secret.
	pub access_token: TokenSecret,
	/// Lifetime declared by the server, before any safety margin.
	pub ttl: Duration,
}

/// reqwest-backed [`TokenExchange`] implementation.
pub struct HttpTokenExchanger {
	client: ReqwestClient,
	endpoint: Url,
	profile: ExchangeProfile,
	clock: Arc<dyn Clock>,
}
impl HttpTokenExchanger {
	const ENDPOINT: &'static str = "token";

	/// Creates an exchanger for `endpoint` using `profile`.
	pub fn new(client: ReqwestClient, endpoint: Url, profile: ExchangeProfile) -> Self {
		Self { client, endpoint, profile, clock: Arc::new(SystemClock) }
	}

	/// Replaces the clock used to turn absolute expiries into lifetimes.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	/// Profile in use.
	pub fn profile(&self) -> &ExchangeProfile {
		&self.profile
	}

	async fn redeem(&self, assertion: SignedAssertion) -> Result<ExchangedToken, AuthError> {
		let mut request = self.client.post(self.endpoint.clone());

		if matches!(self.profile.assertion, AssertionPlacement::BearerHeader) {
			request = request.header(AUTHORIZATION, format!("Bearer {}", assertion.expose()));
		}

		request = match self.profile.encoding {
			BodyEncoding::Json => request.json(&self.profile.body(assertion.expose())),
			BodyEncoding::Form => request.form(&self.profile.form(assertion.expose())),
		};

		// Single use.
		drop(assertion);

		let captured = http::send(request, Self::ENDPOINT).await?;

		if !captured.is_success() {
			return Err(AuthError::Rejected { status: captured.status, body: captured.preview() });
		}

		self.parse(&captured)
	}

	fn parse(&self, captured: &CapturedResponse) -> Result<ExchangedToken, AuthError> {
		let status = captured.status;
		let mut de = serde_json::Deserializer::from_slice(&captured.body);
		let fields: Map<String, Value> = serde_path_to_error::deserialize(&mut de)
			.map_err(|source| AuthError::MalformedResponse { status, source: Arc::new(source) })?;
		let token = fields
			.get(&self.profile.token_field)
			.and_then(Value::as_str)
			.filter(|value| !value.is_empty())
			.ok_or_else(|| AuthError::MissingField {
				field: self.profile.token_field.clone(),
				status,
			})?;
		let ttl = match fields.get(&self.profile.ttl_field).filter(|value| !value.is_null()) {
			Some(value) => {
				let raw = integer(value).ok_or_else(|| AuthError::MissingField {
					field: self.profile.ttl_field.clone(),
					status,
				})?;

				match self.profile.ttl_kind {
					TtlKind::Relative => Duration::seconds(raw),
					TtlKind::AbsoluteUnix =>
						Duration::seconds(raw.saturating_sub(self.clock.now().unix_timestamp())),
				}
			},
			None => self.profile.default_ttl.ok_or_else(|| AuthError::MissingField {
				field: self.profile.ttl_field.clone(),
				status,
			})?,
		};

		Ok(ExchangedToken { access_token: TokenSecret::new(token), ttl })
	}
}
impl TokenExchange for HttpTokenExchanger {
	fn exchange(&self, assertion: SignedAssertion) -> ExchangeFuture<'_> {
		Box::pin(self.redeem(assertion))
	}
}
impl Debug for HttpTokenExchanger {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("HttpTokenExchanger")
			.field("endpoint", &self.endpoint.as_str())
			.field("profile", &self.profile)
			.finish()
	}
}

fn integer(value: &Value) -> Option<i64> {
	match value {
		Value::Number(number) => number.as_i64(),
		Value::String(text) => text.trim().parse().ok(),
		_ => None,
	}
}
