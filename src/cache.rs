//! Single-slot access token cache with coalesced refreshes.
//!
//! [`TokenCache::get_token`] answers from the cached token while its margin-adjusted expiry is
//! still ahead of the injected clock. Otherwise the caller joins the refresh in flight, or starts
//! one: a fresh assertion is signed and redeemed exactly once, and every waiter receives the same
//! token or the same [`AuthError`]. Failures leave the cached slot untouched so the next call
//! retries cleanly.
//!
//! Refreshes run on their own Tokio task, so a waiter that is dropped mid-refresh (for example
//! when an inbound client disconnects) neither cancels the exchange nor causes a second one.
//! The synchronous locks only guard the decision to reuse, join, or start a refresh and are
//! always taken slot first, then token.

mod metrics;

pub use metrics::CacheMetrics;

// crates.io
use tokio::task;
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, AssertionSigner},
	clock::{Clock, SystemClock},
	error::AuthError,
	exchange::TokenExchange,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

type Flight = AsyncOnceCell<Result<AccessToken, AuthError>>;
type Slot = Arc<Mutex<Option<Arc<Flight>>>>;

enum Joined {
	Ready(AccessToken),
	Waiting(Arc<Flight>),
}

/// Owns the relay's only shared mutable state: the current access token.
///
/// Must be used from within a Tokio runtime; refreshes are spawned onto it.
pub struct TokenCache {
	core: CacheCore,
}
impl TokenCache {
	/// Smallest refresh margin subtracted from server-declared lifetimes.
	pub const MIN_MARGIN: Duration = Duration::seconds(60);

	/// Creates an empty cache using the system clock and the minimum margin.
	pub fn new(signer: Arc<dyn AssertionSigner>, exchanger: Arc<dyn TokenExchange>) -> Self {
		Self {
			core: CacheCore {
				signer,
				exchanger,
				clock: Arc::new(SystemClock),
				margin: Self::MIN_MARGIN,
				current: Default::default(),
				in_flight: Default::default(),
				metrics: Default::default(),
			},
		}
	}

	/// Replaces the clock used for expiry decisions.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.core.clock = clock;

		self
	}

	/// Overrides the refresh margin; values below [`TokenCache::MIN_MARGIN`] are raised to it.
	pub fn with_margin(mut self, margin: Duration) -> Self {
		self.core.margin = margin.max(Self::MIN_MARGIN);

		self
	}

	/// Refresh margin in use.
	pub fn margin(&self) -> Duration {
		self.core.margin
	}

	/// Counters describing cache activity.
	pub fn metrics(&self) -> &CacheMetrics {
		&self.core.metrics
	}

	/// Returns the cached token if it is still usable, without refreshing.
	pub fn peek(&self) -> Option<AccessToken> {
		self.core.usable(self.core.clock.now())
	}

	/// Drops the cached token if it is still `token`.
	///
	/// Used when the downstream API rejects a token before its declared expiry. A newer token
	/// installed by a concurrent refresh is left alone.
	pub fn invalidate(&self, token: &AccessToken) {
		let _slot = self.core.in_flight.lock();
		let mut current = self.core.current.write();

		if current.as_ref().is_some_and(|cached| cached.secret == token.secret) {
			*current = None;
		}
	}

	/// Returns a usable access token, refreshing it at most once per expiry cycle.
	pub async fn get_token(&self) -> Result<AccessToken, AuthError> {
		if let Some(token) = self.core.usable(self.core.clock.now()) {
			self.core.record_hit();

			return Ok(token);
		}

		match self.join() {
			Joined::Ready(token) => {
				self.core.record_hit();

				Ok(token)
			},
			Joined::Waiting(flight) => flight.wait().await.clone(),
		}
	}

	// A refresh may have landed between the optimistic read and taking the slot lock.
	fn join(&self) -> Joined {
		let mut slot = self.core.in_flight.lock();

		if let Some(token) = self.core.usable(self.core.clock.now()) {
			return Joined::Ready(token);
		}
		if let Some(flight) = slot.as_ref() {
			return Joined::Waiting(flight.clone());
		}

		let flight = Arc::new(Flight::new());

		*slot = Some(flight.clone());
		self.core.clone().spawn_refresh(flight.clone());

		Joined::Waiting(flight)
	}
}
impl Debug for TokenCache {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let refreshing = self.core.in_flight.lock().is_some();
		let cached = self.core.current.read().is_some();

		f.debug_struct("TokenCache")
			.field("margin", &self.core.margin)
			.field("cached", &cached)
			.field("refreshing", &refreshing)
			.field("metrics", &self.core.metrics)
			.finish()
	}
}

/// Shared handles a background refresh needs once it outlives the caller that started it.
#[derive(Clone)]
struct CacheCore {
	signer: Arc<dyn AssertionSigner>,
	exchanger: Arc<dyn TokenExchange>,
	clock: Arc<dyn Clock>,
	margin: Duration,
	current: Arc<RwLock<Option<AccessToken>>>,
	in_flight: Slot,
	metrics: Arc<CacheMetrics>,
}
impl CacheCore {
	fn usable(&self, now: OffsetDateTime) -> Option<AccessToken> {
		self.current.read().as_ref().filter(|token| token.is_usable_at(now)).cloned()
	}

	fn record_hit(&self) {
		self.metrics.record_hit();
		obs::record_cache_hit();
	}

	fn spawn_refresh(self, flight: Arc<Flight>) {
		task::spawn(async move {
			let worker = self.clone();
			// A panic inside the refresh must still release every waiter.
			let result = match task::spawn(async move { worker.refresh().await }).await {
				Ok(result) => result,
				Err(err) => Err(AuthError::RefreshAborted { reason: err.to_string() }),
			};

			self.settle(&result);

			let _ = flight.set(result).await;
		});
	}

	async fn refresh(&self) -> Result<AccessToken, AuthError> {
		let span = FlowSpan::new(FlowKind::TokenRefresh, "get_token");

		obs::record_flow_outcome(FlowKind::TokenRefresh, FlowOutcome::Attempt);
		self.metrics.record_exchange();

		span.instrument(async {
			let assertion = self.signer.sign(self.clock.now())?;
			let exchanged = self.exchanger.exchange(assertion).await?;

			AccessToken::from_ttl(
				exchanged.access_token,
				self.clock.now(),
				exchanged.ttl,
				self.margin,
			)
		})
		.await
	}

	// Retire the flight and publish the token together so late joiners either see the new token
	// or start a new flight.
	fn settle(&self, result: &Result<AccessToken, AuthError>) {
		const KIND: FlowKind = FlowKind::TokenRefresh;

		{
			let mut slot = self.in_flight.lock();

			if let Ok(token) = result {
				*self.current.write() = Some(token.clone());
			}

			slot.take();
		}

		obs::record_flow_outcome(KIND, FlowOutcome::of(result));

		if let Err(err) = result {
			self.metrics.record_failure();
			obs::warn_failure(KIND, err);
		}
	}
}
