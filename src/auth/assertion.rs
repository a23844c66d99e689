//! Self-issued RS256 assertions proving the relay's identity to the authorization server.

// crates.io
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use rand::{Rng, distr::Alphanumeric};
// self
use crate::{
	_prelude::*,
	error::{ConfigError, SigningError},
};

const JTI_LEN: usize = 32;

/// Produces fresh signed assertions on demand.
///
/// Implementations are CPU-only; every call must yield a distinct `jti` so the authorization
/// server never sees a replayed assertion.
pub trait AssertionSigner
where
	Self: Send + Sync,
{
	/// Signs a new assertion valid from `now`.
	fn sign(&self, now: OffsetDateTime) -> Result<SignedAssertion, SigningError>;
}

/// Identity material used to sign assertions.
#[derive(Clone)]
pub struct SignerConfig {
	/// Issuer (`iss`), typically the OAuth application's client identifier.
	pub issuer: String,
	/// Public key identifier placed in the `kid` header.
	pub key_id: String,
	/// RSA private key in PEM form. Literal `\n` escapes are expanded before parsing.
	pub private_key_pem: String,
	/// Expected audience (`aud`) of the authorization server.
	pub audience: String,
	/// Optional subject (`sub`) claim.
	pub subject: Option<String>,
	/// Validity window of each assertion.
	pub lifetime: Duration,
}
impl SignerConfig {
	const DEFAULT_LIFETIME: Duration = Duration::hours(1);

	/// Creates a config with the default one-hour lifetime and no subject.
	pub fn new(
		issuer: impl Into<String>,
		key_id: impl Into<String>,
		private_key_pem: impl Into<String>,
		audience: impl Into<String>,
	) -> Self {
		Self {
			issuer: issuer.into(),
			key_id: key_id.into(),
			private_key_pem: private_key_pem.into(),
			audience: audience.into(),
			subject: None,
			lifetime: Self::DEFAULT_LIFETIME,
		}
	}

	/// Adds a `sub` claim to every assertion.
	pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
		self.subject = Some(subject.into());

		self
	}

	/// Overrides the assertion validity window.
	pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
		self.lifetime = lifetime;

		self
	}
}
impl Debug for SignerConfig {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SignerConfig")
			.field("issuer", &self.issuer)
			.field("key_id", &self.key_id)
			.field("private_key_pem", &"<redacted>")
			.field("audience", &self.audience)
			.field("subject", &self.subject)
			.field("lifetime", &self.lifetime)
			.finish()
	}
}

/// Claim set carried by every assertion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionClaims {
	/// Issuer.
	pub iss: String,
	/// Audience.
	pub aud: String,
	/// Issued-at, seconds since the Unix epoch.
	pub iat: i64,
	/// Expiry, seconds since the Unix epoch.
	pub exp: i64,
	/// Unique identifier of this assertion.
	pub jti: String,
	/// Optional subject.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub sub: Option<String>,
}

/// Compact signed assertion. Single use; discarded after redemption.
pub struct SignedAssertion {
	token: String,
	/// Unique identifier embedded in the claims.
	pub jti: String,
	/// Issued-at instant.
	pub issued_at: OffsetDateTime,
	/// Expiry instant.
	pub expires_at: OffsetDateTime,
}
impl SignedAssertion {
	/// Returns the compact JWS. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.token
	}
}
impl Debug for SignedAssertion {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SignedAssertion")
			.field("token", &"<redacted>")
			.field("jti", &self.jti)
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// RS256 signer holding a parsed private key.
pub struct JwtSigner {
	issuer: String,
	audience: String,
	subject: Option<String>,
	lifetime: Duration,
	header: Header,
	key: EncodingKey,
}
impl JwtSigner {
	/// Validates the identity material and parses the private key once.
	pub fn from_config(config: SignerConfig) -> Result<Self, ConfigError> {
		let SignerConfig { issuer, key_id, private_key_pem, audience, subject, lifetime } = config;

		require("client_id", &issuer)?;
		require("public_key_id", &key_id)?;
		require("audience", &audience)?;
		require("private_key", &private_key_pem)?;

		if !lifetime.is_positive() {
			return Err(ConfigError::NonPositiveDuration { name: "assertion lifetime" });
		}

		let pem = normalize_pem(&private_key_pem);
		let key = EncodingKey::from_rsa_pem(pem.as_bytes())
			.map_err(|source| ConfigError::MalformedKey { source })?;
		let header = Header { kid: Some(key_id), ..Header::new(Algorithm::RS256) };

		Ok(Self { issuer, audience, subject, lifetime, header, key })
	}

	/// Key identifier advertised in the header.
	pub fn key_id(&self) -> Option<&str> {
		self.header.kid.as_deref()
	}
}
impl AssertionSigner for JwtSigner {
	fn sign(&self, now: OffsetDateTime) -> Result<SignedAssertion, SigningError> {
		let expires_at = now + self.lifetime;
		let claims = AssertionClaims {
			iss: self.issuer.clone(),
			aud: self.audience.clone(),
			iat: now.unix_timestamp(),
			exp: expires_at.unix_timestamp(),
			jti: random_jti(),
			sub: self.subject.clone(),
		};
		let token = jsonwebtoken::encode(&self.header, &claims, &self.key)?;

		Ok(SignedAssertion { token, jti: claims.jti, issued_at: now, expires_at })
	}
}
impl Debug for JwtSigner {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("JwtSigner")
			.field("issuer", &self.issuer)
			.field("audience", &self.audience)
			.field("kid", &self.header.kid)
			.field("lifetime", &self.lifetime)
			.finish_non_exhaustive()
	}
}

fn require(name: &'static str, value: &str) -> Result<(), ConfigError> {
	if value.trim().is_empty() { Err(ConfigError::Missing { name }) } else { Ok(()) }
}

// Environment variables often carry PEM bodies on a single line with escaped newlines.
fn normalize_pem(raw: &str) -> String {
	raw.trim().replace("\\n", "\n")
}

fn random_jti() -> String {
	rand::rng().sample_iter(Alphanumeric).take(JTI_LEN).map(char::from).collect()
}
