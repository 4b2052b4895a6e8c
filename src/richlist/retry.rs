//! Fixed-delay retry for transient node failures.
//!
//! A timed-out request waits `timeout_backoff`, a node that is catching up waits
//! `catching_up_backoff`, then the operation is re-run from the start. Attempts are
//! unbounded unless `max_attempts` is set. Any other error is returned immediately.

use crate::chain::ChainError;
use crate::richlist::RichlistError;

use backoff::backoff::Constant;
use std::future::Future;
use std::time::Duration;
use tracing::{error, warn};

#[derive(Debug, Clone)]
pub struct RetryPolicy {
	pub timeout_backoff: Duration,
	pub catching_up_backoff: Duration,
	/// Total attempts including the first; `None` retries forever.
	pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			timeout_backoff: Duration::from_secs(30),
			catching_up_backoff: Duration::from_secs(60),
			max_attempts: None,
		}
	}
}

impl RetryPolicy {
	/// The wait before retrying after `err`, or `None` if `err` is not retryable.
	pub fn delay_for(&self, err: &RichlistError) -> Option<Duration> {
		match err {
			RichlistError::Chain(ChainError::RequestTimedOut) => Some(self.timeout_backoff),
			RichlistError::Chain(ChainError::NodeCatchingUp) => Some(self.catching_up_backoff),
			_ => None,
		}
	}

	fn may_retry(&self, attempt: u32) -> bool {
		self.max_attempts.is_none_or(|max| attempt < max)
	}

	/// Run `operation` until it succeeds, fails permanently or runs out of attempts.
	///
	/// `operation` is invoked afresh for every attempt, so each attempt must start from
	/// the caller's original inputs.
	pub async fn run<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, RichlistError>
	where
		F: FnMut() -> Fut,
		Fut: Future<Output = Result<T, RichlistError>>,
	{
		let mut attempts = 0u32;
		backoff::future::retry_notify(
			// Only consulted when no explicit delay is given, which never happens here
			Constant::new(self.timeout_backoff),
			|| {
				attempts += 1;
				let attempt = attempts;
				let fut = operation();
				async move {
					match fut.await {
						Ok(value) => Ok(value),
						Err(err) => match self.delay_for(&err) {
							Some(delay) if self.may_retry(attempt) => {
								Err(backoff::Error::retry_after(err, delay))
							}
							Some(_) => {
								error!("{}: giving up after {} attempts: {}", label, attempt, err);
								Err(backoff::Error::permanent(err))
							}
							None => Err(backoff::Error::permanent(err)),
						},
					}
				}
			},
			|err: RichlistError, delay: Duration| {
				warn!(
					"{}: {}, waiting {}s before retrying",
					label,
					err,
					delay.as_secs_f64()
				);
			},
		)
		.await
	}
}
