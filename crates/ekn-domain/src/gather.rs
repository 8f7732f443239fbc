//! Ordered scatter-gather.
//!
//! [`gather_ordered`] polls a batch of futures together and writes each
//! result into the slot of its dispatch position, so the output order is
//! the input order whatever order the futures finish in. It resolves once,
//! after every future has resolved.

use futures::stream::{FuturesUnordered, StreamExt};
use std::future::Future;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Reported by a sub-operation aborted through its cancellation token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("operation cancelled")]
pub struct Cancelled;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatherPolicy {
    /// Every future runs to completion; the first error is reported after.
    Settle,
    /// The first error cancels the futures still running.
    AbortOnError,
}

/// Runs `futures` concurrently and returns their outputs in input order, or
/// the first error in completion order.
///
/// Cancelling `cancel` aborts every future still running with [`Cancelled`].
pub async fn gather_ordered<I, F, T, E>(futures: I, cancel: &CancellationToken, policy: GatherPolicy) -> Result<Vec<T>, E>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = Result<T, E>>,
    E: From<Cancelled>,
{
    let token = cancel.child_token();
    let mut pending: FuturesUnordered<_> = futures
        .into_iter()
        .enumerate()
        .map(|(index, future)| {
            let token = token.clone();
            async move {
                let result = tokio::select! {
                    biased;
                    () = token.cancelled() => Err(E::from(Cancelled)),
                    result = future => result,
                };
                (index, result)
            }
        })
        .collect();

    let mut slots: Vec<Option<T>> = std::iter::repeat_with(|| None).take(pending.len()).collect();
    let mut first_error = None;
    while let Some((index, result)) = pending.next().await {
        match result {
            Ok(value) => {
                if let Some(slot) = slots.get_mut(index) {
                    *slot = Some(value);
                }
            }
            Err(err) => {
                if first_error.is_none() {
                    if policy == GatherPolicy::AbortOnError {
                        token.cancel();
                    }
                    first_error = Some(err);
                }
            }
        }
    }

    match first_error {
        Some(err) => Err(err),
        None => Ok(slots.into_iter().flatten().collect()),
    }
}
