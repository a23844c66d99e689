//! Relay-level error types shared by the signer, token cache, exchanger, and chat relay.

// self
use crate::_prelude::*;

/// Relay-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;
type SharedError = Arc<dyn std::error::Error + Send + Sync>;

/// Canonical relay error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Access token could not be obtained.
	#[error(transparent)]
	Auth(#[from] AuthError),
	/// Chat endpoint call failed.
	#[error(transparent)]
	Chat(#[from] ChatError),
	/// Inbound listener failure.
	#[error("Inbound listener failed.")]
	Serve(#[source] std::io::Error),
}

/// Missing or malformed configuration; fatal at startup.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// A required configuration value is empty.
	#[error("Required configuration value `{name}` is missing.")]
	Missing {
		/// Configuration key.
		name: &'static str,
	},
	/// The private key could not be parsed as an RSA PEM.
	#[error("Private key is not a valid RSA PEM.")]
	MalformedKey {
		/// Underlying parsing failure.
		#[source]
		source: jsonwebtoken::errors::Error,
	},
	/// A configured endpoint cannot be parsed.
	#[error("Endpoint `{value}` is not a valid URL.")]
	InvalidEndpoint {
		/// Offending value.
		value: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Refresh margin or lifetime is out of the supported range.
	#[error("The {name} duration must be positive.")]
	NonPositiveDuration {
		/// Setting name.
		name: &'static str,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Cryptographic failure while producing a signed assertion.
#[derive(Clone, Debug, ThisError)]
#[error("Assertion could not be signed.")]
pub struct SigningError {
	#[source]
	source: SharedError,
}
impl SigningError {
	/// Wraps the signing backend's failure.
	pub fn new(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self { source: Arc::new(src) }
	}
}
impl From<jsonwebtoken::errors::Error> for SigningError {
	fn from(e: jsonwebtoken::errors::Error) -> Self {
		Self::new(e)
	}
}

/// Access token acquisition failures.
///
/// The type is cheap to clone so one failed refresh can be delivered to every coalesced waiter.
#[derive(Clone, Debug, ThisError)]
pub enum AuthError {
	/// Assertion signing failed before any network call.
	#[error(transparent)]
	Signing(#[from] SigningError),
	/// Authorization endpoint could not be reached.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Authorization endpoint answered with a non-success status.
	#[error("Token endpoint rejected the assertion with status {status}: {body}.")]
	Rejected {
		/// HTTP status code.
		status: u16,
		/// Response body preview for diagnostics.
		body: String,
	},
	/// Authorization endpoint answered with a body that is not a JSON object.
	#[error("Token endpoint returned malformed JSON.")]
	MalformedResponse {
		/// HTTP status code.
		status: u16,
		/// Structured parsing failure.
		#[source]
		source: Arc<serde_path_to_error::Error<serde_json::Error>>,
	},
	/// A required response field is absent or has the wrong type.
	#[error("Token endpoint response is missing `{field}`.")]
	MissingField {
		/// Missing field name.
		field: String,
		/// HTTP status code.
		status: u16,
	},
	/// The declared lifetime leaves nothing once the refresh margin is applied.
	#[error("Token lifetime of {ttl_seconds}s does not outlast the refresh margin.")]
	InvalidLifetime {
		/// Server-declared lifetime in seconds.
		ttl_seconds: i64,
	},
	/// The background refresh task stopped before producing a result.
	#[error("Token refresh was aborted: {reason}.")]
	RefreshAborted {
		/// Join failure reported by the runtime.
		reason: String,
	},
}
impl AuthError {
	/// HTTP status returned by the authorization endpoint, when one was received.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Rejected { status, .. }
			| Self::MalformedResponse { status, .. }
			| Self::MissingField { status, .. } => Some(*status),
			_ => None,
		}
	}
}

/// Chat endpoint failures.
#[derive(Debug, ThisError)]
pub enum ChatError {
	/// Chat endpoint could not be reached.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Chat endpoint answered with a non-success status.
	#[error("Chat endpoint returned status {status}: {body}.")]
	Status {
		/// HTTP status code.
		status: u16,
		/// Response body preview for diagnostics.
		body: String,
	},
}

/// Transport-level failures (network, timeouts).
#[derive(Clone, Debug, ThisError)]
pub enum TransportError {
	/// The call exceeded the configured timeout.
	#[error("Request to {endpoint} timed out.")]
	Timeout {
		/// Endpoint label.
		endpoint: &'static str,
	},
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the {endpoint} endpoint.")]
	Network {
		/// Endpoint label.
		endpoint: &'static str,
		/// Transport-specific network error.
		#[source]
		source: SharedError,
	},
}
impl TransportError {
	/// Classifies a reqwest failure for the given endpoint label.
	pub fn from_reqwest(endpoint: &'static str, err: ReqwestError) -> Self {
		if err.is_timeout() {
			Self::Timeout { endpoint }
		} else {
			Self::Network { endpoint, source: Arc::new(err) }
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn auth_error_exposes_status_only_for_http_answers() {
		let rejected = AuthError::Rejected { status: 401, body: "denied".into() };
		let timeout = AuthError::from(TransportError::Timeout { endpoint: "token" });

		assert_eq!(rejected.status(), Some(401));
		assert_eq!(timeout.status(), None);
		assert_eq!(
			rejected.to_string(),
			"Token endpoint rejected the assertion with status 401: denied."
		);
	}

	#[test]
	fn cloned_auth_errors_share_sources() {
		let err = AuthError::from(SigningError::new(std::io::Error::other("boom")));
		let cloned = err.clone();

		assert_eq!(err.to_string(), cloned.to_string());
		assert!(StdError::source(&cloned).is_some());
	}
}
