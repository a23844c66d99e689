//! Opaque access token value.

// self
use crate::_prelude::*;

const REDACTED: &str = "<redacted>";

/// Access token string handed out by the authorization server.
///
/// Formatting never prints the value; only [`TokenSecret::expose`] and
/// [`TokenSecret::bearer`] reveal it, for building requests.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Takes ownership of a token string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Raw token value.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// `Authorization` header value for this token.
	pub fn bearer(&self) -> String {
		format!("Bearer {}", self.0)
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "TokenSecret({REDACTED})")
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(REDACTED)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn only_bearer_and_expose_reveal_the_value() {
		let secret = TokenSecret::new("pat_abc");

		assert_eq!(format!("{secret:?}"), "TokenSecret(<redacted>)");
		assert_eq!(secret.to_string(), "<redacted>");
		assert_eq!(secret.bearer(), "Bearer pat_abc");
		assert_eq!(secret.expose(), "pat_abc");
	}
}
