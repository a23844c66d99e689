//! Process configuration read from flags or the environment, and component wiring.

// std
use std::net::{Ipv4Addr, SocketAddr};
// crates.io
use clap::{Parser, ValueEnum};
// self
use crate::{
	_prelude::*,
	auth::{JwtSigner, SignerConfig},
	cache::TokenCache,
	error::ConfigError,
	exchange::{AssertionPlacement, ExchangeProfile, HttpTokenExchanger, TtlKind},
	http,
	relay::{ChatRelay, ChatSettings},
};

/// Redemption flow used at the token endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ExchangeFlow {
	/// JWT-bearer grant with the assertion in the `Authorization` header.
	#[default]
	JwtBearer,
	/// Client-credentials grant with the assertion in the form body.
	ClientCredentials,
}

/// Relay configuration.
#[derive(Clone, Parser)]
#[command(name = "coze-relay", version, about)]
pub struct RelayConfig {
	/// OAuth application client identifier; issuer of every assertion.
	#[arg(long, env = "COZE_CLIENT_ID")]
	pub client_id: String,
	/// Bot identifier sent with every chat request.
	#[arg(long, env = "COZE_BOT_ID")]
	pub bot_id: String,
	/// Public key identifier placed in the assertion header.
	#[arg(long, env = "COZE_PUBLIC_KEY_ID")]
	pub public_key_id: String,
	/// RSA private key (PEM).
	#[arg(long, env = "COZE_PRIVATE_KEY", hide_env_values = true, allow_hyphen_values = true)]
	pub private_key: String,
	/// Audience expected by the authorization server.
	#[arg(long, env = "COZE_AUDIENCE", default_value = "api.coze.cn")]
	pub audience: String,
	/// Optional `sub` claim.
	#[arg(long, env = "COZE_ASSERTION_SUBJECT")]
	pub assertion_subject: Option<String>,
	/// Base URL of the downstream API.
	#[arg(long, env = "COZE_API_BASE", default_value = "https://api.coze.cn")]
	pub api_base: String,
	/// Token endpoint path, joined onto the base URL.
	#[arg(long, env = "COZE_TOKEN_PATH", default_value = "/api/permission/oauth2/token")]
	pub token_path: String,
	/// Chat endpoint path, joined onto the base URL.
	#[arg(long, env = "COZE_CHAT_PATH", default_value = "/v3/chat")]
	pub chat_path: String,
	/// Redemption flow.
	#[arg(long, env = "COZE_EXCHANGE_FLOW", value_enum, default_value_t = ExchangeFlow::JwtBearer)]
	pub exchange_flow: ExchangeFlow,
	/// Overrides the `grant_type` value of the selected flow.
	#[arg(long, env = "COZE_GRANT_TYPE")]
	pub grant_type: Option<String>,
	/// Sends the assertion in this body field instead of the flow's default placement.
	#[arg(long, env = "COZE_ASSERTION_FIELD")]
	pub assertion_field: Option<String>,
	/// Response field carrying the access token.
	#[arg(long, env = "COZE_TOKEN_FIELD")]
	pub token_field: Option<String>,
	/// Response field carrying the token lifetime.
	#[arg(long, env = "COZE_TTL_FIELD")]
	pub ttl_field: Option<String>,
	/// Whether the lifetime field is relative seconds or an absolute Unix expiry.
	#[arg(long, env = "COZE_TTL_KIND", value_enum)]
	pub ttl_kind: Option<TtlKind>,
	/// Requested token lifetime for the JWT-bearer flow.
	#[arg(long, env = "COZE_TOKEN_DURATION_SECONDS", default_value_t = 86_399)]
	pub token_duration_seconds: u64,
	/// Fixed downstream user identifier.
	#[arg(long, env = "COZE_USER_ID", default_value = ChatSettings::DEFAULT_USER_ID)]
	pub user_id: String,
	/// Seconds subtracted from every token lifetime; at least 60.
	#[arg(long, env = "COZE_REFRESH_MARGIN_SECONDS", default_value_t = 60)]
	pub refresh_margin_seconds: u64,
	/// Per-call network timeout.
	#[arg(long, env = "COZE_HTTP_TIMEOUT_SECONDS", default_value_t = 10)]
	pub http_timeout_seconds: u64,
	/// Listen port.
	#[arg(long, env = "PORT", default_value_t = 3978)]
	pub port: u16,
}
impl RelayConfig {
	/// Socket address the inbound listener binds to.
	pub fn listen_addr(&self) -> SocketAddr {
		SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port))
	}

	/// Token endpoint URL.
	pub fn token_endpoint(&self) -> Result<Url, ConfigError> {
		self.endpoint(&self.token_path)
	}

	/// Chat endpoint URL.
	pub fn chat_endpoint(&self) -> Result<Url, ConfigError> {
		self.endpoint(&self.chat_path)
	}

	/// Redemption profile for the configured flow, with any field overrides applied.
	pub fn exchange_profile(&self) -> ExchangeProfile {
		let mut profile = match self.exchange_flow {
			ExchangeFlow::JwtBearer =>
				ExchangeProfile::jwt_bearer(Some(self.token_duration_seconds)),
			ExchangeFlow::ClientCredentials => ExchangeProfile::client_credentials(),
		};

		if let Some(grant_type) = &self.grant_type {
			profile = profile.with_grant_type(grant_type);
		}
		if let Some(field) = &self.assertion_field {
			profile = profile.with_assertion(AssertionPlacement::BodyField(field.clone()));
		}
		if self.token_field.is_some() || self.ttl_field.is_some() {
			let token_field =
				self.token_field.clone().unwrap_or_else(|| profile.token_field.clone());
			let ttl_field = self.ttl_field.clone().unwrap_or_else(|| profile.ttl_field.clone());

			profile = profile.with_response_fields(token_field, ttl_field);
		}
		if let Some(kind) = self.ttl_kind {
			profile = profile.with_ttl_kind(kind);
		}

		profile
	}

	/// Identity material for the assertion signer.
	pub fn signer_config(&self) -> SignerConfig {
		let config = SignerConfig::new(
			&self.client_id,
			&self.public_key_id,
			&self.private_key,
			&self.audience,
		);

		match &self.assertion_subject {
			Some(subject) => config.with_subject(subject),
			None => config,
		}
	}

	/// Validates the configuration and wires signer, exchanger, cache, and relay together.
	pub fn build_relay(&self) -> Result<ChatRelay, ConfigError> {
		if self.bot_id.trim().is_empty() {
			return Err(ConfigError::Missing { name: "bot_id" });
		}
		if self.http_timeout_seconds == 0 {
			return Err(ConfigError::NonPositiveDuration { name: "HTTP timeout" });
		}

		let signer = JwtSigner::from_config(self.signer_config())?;
		let client = http::build_client(StdDuration::from_secs(self.http_timeout_seconds))?;
		let exchanger = HttpTokenExchanger::new(
			client.clone(),
			self.token_endpoint()?,
			self.exchange_profile(),
		);
		let margin =
			Duration::seconds(i64::try_from(self.refresh_margin_seconds).unwrap_or(i64::MAX));
		let cache = TokenCache::new(Arc::new(signer), Arc::new(exchanger)).with_margin(margin);
		let settings =
			ChatSettings::new(self.chat_endpoint()?, &self.bot_id).with_user_id(&self.user_id);

		Ok(ChatRelay::new(Arc::new(cache), client, settings))
	}

	fn endpoint(&self, path: &str) -> Result<Url, ConfigError> {
		Url::parse(&self.api_base).and_then(|base| base.join(path)).map_err(|source| {
			ConfigError::InvalidEndpoint { value: format!("{}{path}", self.api_base), source }
		})
	}
}
impl Debug for RelayConfig {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RelayConfig")
			.field("client_id", &self.client_id)
			.field("bot_id", &self.bot_id)
			.field("public_key_id", &self.public_key_id)
			.field("private_key", &"<redacted>")
			.field("audience", &self.audience)
			.field("api_base", &self.api_base)
			.field("exchange_flow", &self.exchange_flow)
			.field("port", &self.port)
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::_preludet::*;

	fn parse(extra: &[&str]) -> RelayConfig {
		let private_key = format!("--private-key={TEST_PRIVATE_KEY_PEM}");
		let mut args = vec![
			"coze-relay",
			"--client-id",
			TEST_ISSUER,
			"--bot-id",
			"bot-1",
			"--public-key-id",
			TEST_KEY_ID,
			private_key.as_str(),
		];

		args.extend_from_slice(extra);

		RelayConfig::try_parse_from(args).expect("Fixture arguments should parse.")
	}

	#[test]
	fn defaults_match_the_public_deployment() {
		let config = parse(&[]);

		assert_eq!(config.listen_addr().port(), 3978);
		assert_eq!(
			config.token_endpoint().expect("Default token endpoint should parse.").as_str(),
			"https://api.coze.cn/api/permission/oauth2/token"
		);
		assert_eq!(
			config.chat_endpoint().expect("Default chat endpoint should parse.").as_str(),
			"https://api.coze.cn/v3/chat"
		);
		assert_eq!(config.exchange_profile().assertion, AssertionPlacement::BearerHeader);
		assert_eq!(config.user_id, "user_from_teams");
	}

	#[test]
	fn client_credentials_flow_is_selectable() {
		let config = parse(&["--exchange-flow", "client-credentials", "--audience", "aud-x"]);
		let profile = config.exchange_profile();

		assert_eq!(profile.grant_type, "client_credentials");
		assert_eq!(config.signer_config().audience, "aud-x");
	}

	#[test]
	fn field_overrides_reshape_the_selected_flow() {
		let profile = parse(&[
			"--grant-type",
			"jwt_assertion",
			"--assertion-field",
			"assertion",
			"--ttl-field",
			"expires_at",
			"--ttl-kind",
			"absolute-unix",
		])
		.exchange_profile();

		assert_eq!(profile.grant_type, "jwt_assertion");
		assert_eq!(profile.assertion, AssertionPlacement::BodyField("assertion".into()));
		assert_eq!(profile.token_field, "access_token");
		assert_eq!(profile.ttl_field, "expires_at");
		assert_eq!(profile.ttl_kind, TtlKind::AbsoluteUnix);

		let profile = parse(&["--token-field", "token"]).exchange_profile();

		assert_eq!(profile.token_field, "token");
		assert_eq!(profile.ttl_field, "expires_in");
		assert_eq!(profile.ttl_kind, TtlKind::Relative);
	}

	#[test]
	fn build_relay_rejects_bad_material_before_serving() {
		let mut config = parse(&[]);

		config.private_key = "garbage".into();

		assert!(matches!(config.build_relay(), Err(ConfigError::MalformedKey { .. })));

		let mut config = parse(&["--api-base", "not a url"]);

		assert!(matches!(config.build_relay(), Err(ConfigError::InvalidEndpoint { .. })));

		config = parse(&["--http-timeout-seconds", "0"]);

		assert!(matches!(config.build_relay(), Err(ConfigError::NonPositiveDuration { .. })));
	}

	#[test]
	fn build_relay_clamps_margin() {
		let relay = parse(&["--refresh-margin-seconds", "5"])
			.build_relay()
			.expect("Valid configuration should build.");

		assert_eq!(relay.tokens().margin(), TokenCache::MIN_MARGIN);
		assert!(!format!("{:?}", parse(&[])).contains("PRIVATE KEY"));
	}
}
