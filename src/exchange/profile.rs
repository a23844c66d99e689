//! Describes how an assertion is redeemed at the authorization endpoint.
//!
//! Deployments disagree on the exact redemption flow (JWT-bearer grant with the assertion in the
//! `Authorization` header versus a client-credentials grant carrying the assertion in the form
//! body), so the request shape and the response field names are data rather than code.

// crates.io
use serde_json::{Map, Value};
// self
use crate::_prelude::*;

/// Grant type URN for RFC 7523 JWT-bearer redemption.
pub const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Where the signed assertion travels in the token request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AssertionPlacement {
	/// `Authorization: Bearer <assertion>` header.
	BearerHeader,
	/// Named field in the request body.
	BodyField(String),
}

/// Token request body encoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BodyEncoding {
	/// `application/json`.
	Json,
	/// `application/x-www-form-urlencoded`.
	Form,
}

/// Interpretation of the TTL field in the token response.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum TtlKind {
	/// Seconds of validity counted from the response.
	Relative,
	/// Absolute expiry as seconds since the Unix epoch.
	AbsoluteUnix,
}

/// Request and response shape of one redemption flow.
#[derive(Clone, Debug)]
pub struct ExchangeProfile {
	/// Value of the `grant_type` field.
	pub grant_type: String,
	/// Where the assertion is placed.
	pub assertion: AssertionPlacement,
	/// Body encoding.
	pub encoding: BodyEncoding,
	/// Extra body parameters sent with every request.
	pub extra_params: BTreeMap<String, Value>,
	/// Response field carrying the access token.
	pub token_field: String,
	/// Response field carrying the lifetime.
	pub ttl_field: String,
	/// How the lifetime field is interpreted.
	pub ttl_kind: TtlKind,
	/// Lifetime assumed when the response omits the TTL field; `None` makes it mandatory.
	pub default_ttl: Option<Duration>,
}
impl ExchangeProfile {
	const DEFAULT_JWT_BEARER_TTL: Duration = Duration::seconds(900);

	/// JWT-bearer grant: JSON body, assertion as bearer header, optional requested duration.
	pub fn jwt_bearer(duration_seconds: Option<u64>) -> Self {
		let mut extra_params = BTreeMap::new();

		if let Some(duration) = duration_seconds {
			extra_params.insert("duration_seconds".into(), Value::from(duration));
		}

		Self {
			grant_type: JWT_BEARER_GRANT.into(),
			assertion: AssertionPlacement::BearerHeader,
			encoding: BodyEncoding::Json,
			extra_params,
			token_field: "access_token".into(),
			ttl_field: "expires_in".into(),
			ttl_kind: TtlKind::Relative,
			default_ttl: Some(Self::DEFAULT_JWT_BEARER_TTL),
		}
	}

	/// Client-credentials grant: form body with an `assertion` field, `expires_in` required.
	pub fn client_credentials() -> Self {
		Self {
			grant_type: "client_credentials".into(),
			assertion: AssertionPlacement::BodyField("assertion".into()),
			encoding: BodyEncoding::Form,
			extra_params: BTreeMap::new(),
			token_field: "access_token".into(),
			ttl_field: "expires_in".into(),
			ttl_kind: TtlKind::Relative,
			default_ttl: None,
		}
	}

	/// Overrides the `grant_type` value.
	pub fn with_grant_type(mut self, grant_type: impl Into<String>) -> Self {
		self.grant_type = grant_type.into();

		self
	}

	/// Moves the assertion to `placement`.
	pub fn with_assertion(mut self, placement: AssertionPlacement) -> Self {
		self.assertion = placement;

		self
	}

	/// Adds or replaces an extra body parameter.
	pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self.extra_params.insert(key.into(), value.into());

		self
	}

	/// Overrides the response field names.
	pub fn with_response_fields(
		mut self,
		token_field: impl Into<String>,
		ttl_field: impl Into<String>,
	) -> Self {
		self.token_field = token_field.into();
		self.ttl_field = ttl_field.into();

		self
	}

	/// Overrides the TTL interpretation.
	pub fn with_ttl_kind(mut self, kind: TtlKind) -> Self {
		self.ttl_kind = kind;

		self
	}

	/// Overrides the fallback lifetime used when the TTL field is absent.
	pub fn with_default_ttl(mut self, ttl: Option<Duration>) -> Self {
		self.default_ttl = ttl;

		self
	}

	/// Builds the request body for `assertion`.
	///
	/// Extra parameters never override `grant_type` or the assertion field.
	pub fn body(&self, assertion: &str) -> Map<String, Value> {
		let mut body: Map<String, Value> =
			self.extra_params.iter().map(|(k, v)| (k.clone(), v.clone())).collect();

		body.insert("grant_type".into(), Value::from(self.grant_type.as_str()));

		if let AssertionPlacement::BodyField(field) = &self.assertion {
			body.insert(field.clone(), Value::from(assertion));
		}

		body
	}

	/// Flattens [`ExchangeProfile::body`] into form pairs.
	pub fn form(&self, assertion: &str) -> Vec<(String, String)> {
		self.body(assertion)
			.into_iter()
			.map(|(key, value)| {
				let value = match value {
					Value::String(text) => text,
					other => other.to_string(),
				};

				(key, value)
			})
			.collect()
	}
}
