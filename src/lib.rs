//! Chat relay between a conversational front-end and a chat-completion API.
//!
//! The relay signs its own RS256 assertions, redeems them for short-lived access tokens,
//! caches the token with coalesced refreshes, and forwards each inbound message to the
//! downstream chat endpoint. Every inbound message gets a reply; failures surface only as
//! reply text.

#![deny(clippy::all, missing_docs)]

pub mod auth;
pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod exchange;
pub mod http;
pub mod obs;
pub mod relay;
pub mod server;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		auth::{JwtSigner, SignerConfig},
		cache::TokenCache,
		clock::{Clock, ManualClock},
		exchange::{ExchangeProfile, HttpTokenExchanger},
		relay::{ChatRelay, ChatSettings},
	};

	/// RSA private key used to sign assertions in tests.
	pub const TEST_PRIVATE_KEY_PEM: &str = include_str!("../tests/fixtures/rsa_private.pem");
	/// Public half of [`TEST_PRIVATE_KEY_PEM`], used to verify signatures in tests.
	pub const TEST_PUBLIC_KEY_PEM: &str = include_str!("../tests/fixtures/rsa_public.pem");
	/// Issuer placed into test assertions.
	pub const TEST_ISSUER: &str = "client-test";
	/// Key identifier placed into test assertion headers.
	pub const TEST_KEY_ID: &str = "kid-test";
	/// Audience placed into test assertions.
	pub const TEST_AUDIENCE: &str = "api.test.local";

	/// Fixed starting instant for [`ManualClock`]-driven tests.
	pub fn test_epoch() -> OffsetDateTime {
		time::macros::datetime!(2025-01-01 00:00 UTC)
	}

	/// Builds a signer backed by the fixture RSA key.
	pub fn test_signer() -> JwtSigner {
		JwtSigner::from_config(SignerConfig::new(
			TEST_ISSUER,
			TEST_KEY_ID,
			TEST_PRIVATE_KEY_PEM,
			TEST_AUDIENCE,
		))
		.expect("Fixture RSA key should parse.")
	}

	/// Builds a reqwest client with a short timeout for mock servers.
	pub fn test_reqwest_client() -> ReqwestClient {
		crate::http::build_client(StdDuration::from_secs(5))
			.expect("Failed to build Reqwest client for tests.")
	}

	/// Constructs a [`TokenCache`] that redeems assertions against `token_url` with `profile`.
	pub fn build_test_cache(
		token_url: &str,
		profile: ExchangeProfile,
		clock: Arc<ManualClock>,
	) -> Arc<TokenCache> {
		let url = Url::parse(token_url).expect("Mock token endpoint should parse successfully.");
		let exchanger = HttpTokenExchanger::new(test_reqwest_client(), url, profile);
		let clock: Arc<dyn Clock> = clock;

		Arc::new(TokenCache::new(Arc::new(test_signer()), Arc::new(exchanger)).with_clock(clock))
	}

	/// Constructs a [`ChatRelay`] that talks to `chat_url` using `cache` for tokens.
	pub fn build_test_relay(chat_url: &str, cache: Arc<TokenCache>) -> ChatRelay {
		let url = Url::parse(chat_url).expect("Mock chat endpoint should parse successfully.");

		ChatRelay::new(cache, test_reqwest_client(), ChatSettings::new(url, "bot-test"))
	}
}

mod _prelude {
	pub use std::{
		collections::BTreeMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
		time::Duration as StdDuration,
	};

	pub use async_lock::OnceCell as AsyncOnceCell;
	pub use parking_lot::{Mutex, RwLock};
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use url;
