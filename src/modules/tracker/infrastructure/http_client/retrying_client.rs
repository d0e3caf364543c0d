//! One logical remote call with deadline, classification and backoff
//!
//! The client owns no connection state: every call gets a fresh attempt
//! future from the caller, so concurrent calls never share mutable state.

use std::future::Future;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::retry_policy::RetryPolicy;
use crate::shared::errors::{classify, AppResult, ClassifiedError, ErrorKind, SourceError};

#[derive(Debug, Clone)]
pub struct RetryingClient {
    policy: RetryPolicy,
}

impl RetryingClient {
    pub fn new(policy: RetryPolicy) -> AppResult<Self> {
        policy.validate()?;
        Ok(Self { policy })
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `attempt_fn` until it succeeds, fails fatally, exhausts the policy
    /// or `cancel` fires.
    ///
    /// Each attempt receives a child token that is cancelled as soon as the
    /// attempt is abandoned (deadline or outer cancellation).
    pub async fn call<T, F, Fut>(
        &self,
        operation: &str,
        cancel: &CancellationToken,
        mut attempt_fn: F,
    ) -> Result<T, ClassifiedError>
    where
        F: FnMut(CancellationToken) -> Fut,
        Fut: Future<Output = Result<T, SourceError>>,
    {
        let max_attempts = self.policy.max_attempts;
        let mut attempt = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(ClassifiedError::cancelled(attempt));
            }
            attempt += 1;

            let attempt_token = cancel.child_token();
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(SourceError::Cancelled),
                result = timeout(self.policy.timeout, attempt_fn(attempt_token.clone())) => {
                    result.unwrap_or(Err(SourceError::Timeout))
                }
            };
            attempt_token.cancel();

            let error = match outcome {
                Ok(value) => {
                    if attempt > 1 {
                        debug!("{} succeeded on attempt {}", operation, attempt);
                    }
                    return Ok(value);
                }
                Err(error) => error,
            };

            match classify(&error) {
                ErrorKind::Cancelled => return Err(ClassifiedError::cancelled(attempt)),
                ErrorKind::Fatal => {
                    debug!("{} failed with non-retryable error: {}", operation, error);
                    return Err(ClassifiedError::from_source(&error, attempt));
                }
                ErrorKind::Retryable if attempt >= max_attempts => {
                    warn!(
                        "{} failed on final attempt {}/{} ({}), giving up",
                        operation, attempt, max_attempts, error
                    );
                    return Err(ClassifiedError::from_source(&error, attempt));
                }
                ErrorKind::Retryable => {
                    let delay = self.policy.calculate_delay(attempt, error.retry_after());
                    warn!(
                        "{} failed on attempt {}/{} ({}), retrying in {:?}",
                        operation, attempt, max_attempts, error, delay
                    );
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(ClassifiedError::cancelled(attempt)),
                        _ = sleep(delay) => {}
                    }
                }
            }
        }
    }
}
