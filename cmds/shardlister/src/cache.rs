//! Short-lived read-through cache for upstream listings.
//!
//! A single invocation may ask for the same listing once per shard; the cache
//! keeps the first answer around for a few seconds so the upstream API is only
//! hit once.

use std::{
	future::Future,
	sync::atomic::{AtomicU64, Ordering},
	time::Duration,
};

use tokio::{sync::Mutex, time::Instant};
use tracing::trace;

/// How long a fetched listing stays fresh.
pub const DEFAULT_TTL: Duration = Duration::from_secs(30);

struct Entry<T> {
	value: T,
	expires_at: Instant,
}

struct Slot<T, E> {
	entry: Option<Entry<T>>,
	/// Error of the last fetch, if it failed.
	failure: Option<E>,
}

/// A single time-expiring slot filled on demand.
///
/// Concurrent callers are serialised on the slot, so only one upstream fetch
/// happens per expiry window. A failed fetch is handed to the callers that were
/// already waiting for it, but is not cached: the next caller fetches again.
pub struct ReadThroughCache<T, E> {
	slot: Mutex<Slot<T, E>>,
	/// Number of fetches that have completed, successful or not.
	fetches: AtomicU64,
	ttl: Duration,
}

impl<T, E> Default for ReadThroughCache<T, E> {
	fn default() -> Self {
		Self::new(DEFAULT_TTL)
	}
}

impl<T, E> ReadThroughCache<T, E> {
	pub fn new(ttl: Duration) -> Self {
		Self {
			slot: Mutex::new(Slot {
				entry: None,
				failure: None,
			}),
			fetches: AtomicU64::new(0),
			ttl,
		}
	}

	/// Drop the cached value, forcing the next read to fetch.
	pub async fn invalidate(&self) {
		let mut slot = self.slot.lock().await;
		slot.entry = None;
		slot.failure = None;
	}
}

impl<T: Clone, E: Clone> ReadThroughCache<T, E> {
	/// The cached value, if present and not expired.
	pub async fn get(&self) -> Option<T> {
		let slot = self.slot.lock().await;
		slot.entry
			.as_ref()
			.filter(|entry| entry.expires_at > Instant::now())
			.map(|entry| entry.value.clone())
	}

	/// Return the cached value, or run `fetch` and cache its result.
	pub async fn get_or_try_fetch<F, Fut>(&self, fetch: F) -> Result<T, E>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<T, E>>,
	{
		let seen = self.fetches.load(Ordering::Acquire);
		let mut slot = self.slot.lock().await;

		if let Some(entry) = &slot.entry {
			if entry.expires_at > Instant::now() {
				trace!("cache hit");
				return Ok(entry.value.clone());
			}
		}
		// a fetch failed while this caller was waiting for the slot
		if let Some(err) = &slot.failure {
			if self.fetches.load(Ordering::Acquire) != seen {
				trace!("sharing failed fetch");
				return Err(err.clone());
			}
		}

		trace!("cache miss");
		let result = fetch().await;
		self.fetches.fetch_add(1, Ordering::AcqRel);

		match result {
			Ok(value) => {
				slot.entry = Some(Entry {
					value: value.clone(),
					expires_at: Instant::now() + self.ttl,
				});
				slot.failure = None;
				Ok(value)
			}
			Err(err) => {
				slot.failure = Some(err.clone());
				Err(err)
			}
		}
	}
}
