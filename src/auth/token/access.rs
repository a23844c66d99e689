//! Margin-adjusted access tokens.

// self
use crate::{_prelude::*, auth::token::secret::TokenSecret, error::AuthError};

/// Access token redeemed from a signed assertion.
///
/// `expires_at` already has the refresh margin subtracted, so a token is usable exactly while
/// `expires_at` lies strictly after the current instant. Values are replaced wholesale on refresh
/// and never mutated in place.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
	/// Bearer secret; callers must avoid logging it.
	pub secret: TokenSecret,
	/// Instant the exchange completed.
	pub issued_at: OffsetDateTime,
	/// Margin-adjusted expiry instant.
	pub expires_at: OffsetDateTime,
}
impl AccessToken {
	/// Builds a token from a server-declared lifetime, subtracting `margin`.
	///
	/// Fails when the lifetime does not outlast the margin or when the resulting expiry is not a
	/// representable instant.
	pub fn from_ttl(
		secret: TokenSecret,
		issued_at: OffsetDateTime,
		ttl: Duration,
		margin: Duration,
	) -> Result<Self, AuthError> {
		let invalid = || AuthError::InvalidLifetime { ttl_seconds: ttl.whole_seconds() };
		let usable =
			ttl.checked_sub(margin).filter(|usable| usable.is_positive()).ok_or_else(invalid)?;
		let expires_at = issued_at.checked_add(usable).ok_or_else(invalid)?;

		Ok(Self { secret, issued_at, expires_at })
	}

	/// Returns `true` while the margin-adjusted expiry lies strictly after `now`.
	pub fn is_usable_at(&self, now: OffsetDateTime) -> bool {
		self.expires_at > now
	}

	/// Remaining margin-adjusted lifetime at `now`, clamped at zero.
	pub fn remaining_at(&self, now: OffsetDateTime) -> Duration {
		let remaining = self.expires_at - now;

		if remaining.is_negative() { Duration::ZERO } else { remaining }
	}
}
impl Debug for AccessToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AccessToken")
			.field("secret", &self.secret)
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}
