//! Bounded fan-out of ids to an async worker
//!
//! Ids are driven through `buffer_unordered`, so at most `concurrency`
//! worker futures exist at any time. Completions arrive in any order and land
//! in a pre-sized slot indexed by input position, which keeps the output
//! aligned with the input without sorting.

use futures::stream::{self, StreamExt};
use std::fmt;
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::progress::{DispatchEvent, DispatchStatus, ProgressSink};
use crate::shared::errors::{AppResult, ClassifiedError};
use crate::shared::utils::{LogContext, Validator};

/// Upper bound on in-flight workers, whatever the caller asks for
pub const MAX_CONCURRENCY: usize = 50;
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Per-id outcomes of one dispatch, in input order
#[derive(Debug)]
pub struct DispatchResults<K, T> {
    entries: Vec<(K, Result<T, ClassifiedError>)>,
    cancelled: bool,
}

impl<K, T> DispatchResults<K, T> {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn iter(&self) -> impl Iterator<Item = &(K, Result<T, ClassifiedError>)> {
        self.entries.iter()
    }

    pub fn succeeded(&self) -> usize {
        self.entries.iter().filter(|(_, r)| r.is_ok()).count()
    }

    pub fn into_entries(self) -> Vec<(K, Result<T, ClassifiedError>)> {
        self.entries
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BoundedDispatcher {
    concurrency: usize,
}

impl Default for BoundedDispatcher {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl BoundedDispatcher {
    /// Rejects zero; anything above [`MAX_CONCURRENCY`] is clamped.
    pub fn new(concurrency: usize) -> AppResult<Self> {
        Validator::validate_concurrency(concurrency)?;

        let effective = concurrency.min(MAX_CONCURRENCY);
        if effective != concurrency {
            warn!(
                "Requested concurrency {} exceeds maximum, clamping to {}",
                concurrency, MAX_CONCURRENCY
            );
        }

        Ok(Self {
            concurrency: effective,
        })
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Run `worker` once per id and collect every outcome in input order.
    ///
    /// Once `cancel` fires no further ids are started and in-flight workers
    /// are dropped; their slots, and those of unstarted ids, hold a cancelled
    /// error. Slots that finished before cancellation keep their result.
    pub async fn dispatch_all<K, T, W, Fut>(
        &self,
        phase: &str,
        ids: &[K],
        cancel: &CancellationToken,
        sink: &dyn ProgressSink,
        worker: W,
    ) -> DispatchResults<K, T>
    where
        K: Clone + fmt::Display,
        W: Fn(K) -> Fut,
        Fut: Future<Output = Result<T, ClassifiedError>>,
    {
        let total = ids.len();
        debug!(
            "Dispatch: {} starting for {} ids (concurrency {})",
            phase, total, self.concurrency
        );

        let mut slots: Vec<Option<Result<T, ClassifiedError>>> =
            std::iter::repeat_with(|| None).take(total).collect();
        let worker = &worker;

        let mut completions = stream::iter(ids.iter().cloned().enumerate().map(
            |(index, id)| async move {
                if cancel.is_cancelled() {
                    return (index, Err(ClassifiedError::cancelled(0)));
                }
                let outcome = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Err(ClassifiedError::cancelled(0)),
                    result = worker(id) => result,
                };
                (index, outcome)
            },
        ))
        .buffer_unordered(self.concurrency);

        let mut completed = 0;
        let mut failed = 0;
        while let Some((index, outcome)) = completions.next().await {
            completed += 1;
            let status = match &outcome {
                Ok(_) => DispatchStatus::Succeeded,
                Err(e) if e.is_cancelled() => DispatchStatus::Cancelled,
                Err(_) => DispatchStatus::Failed,
            };
            if status != DispatchStatus::Succeeded {
                failed += 1;
            }

            sink.on_event(DispatchEvent {
                phase: phase.to_string(),
                id: ids[index].to_string(),
                index,
                status,
                completed,
                total,
            });
            slots[index] = Some(outcome);
        }
        drop(completions);

        let cancelled = cancel.is_cancelled();
        let entries: Vec<_> = ids
            .iter()
            .cloned()
            .zip(slots)
            .map(|(id, slot)| (id, slot.unwrap_or_else(|| Err(ClassifiedError::cancelled(0)))))
            .collect();

        LogContext::dispatch_summary(phase, total, total - failed, failed);
        if cancelled {
            warn!("Dispatch: {} was cancelled", phase);
        }

        DispatchResults { entries, cancelled }
    }
}
