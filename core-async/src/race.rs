//! Racing futures with guaranteed cancellation of the loser.
//!
//! Waits in the playback engine are frequently "whichever happens first":
//! a retry backoff against network restoration, or a sleep-timer deadline
//! against an explicit cancel. These helpers model that directly. The losing
//! future is dropped before the winner's output is returned, so any work it
//! owned (timers, subscriptions) is released and it can never complete later.

use crate::sync::CancellationToken;
use futures::future::{self, Either as FutureEither};
use std::future::Future;

/// Output of [`first_of`]: which side resolved first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Either<L, R> {
    Left(L),
    Right(R),
}

impl<L, R> Either<L, R> {
    pub fn is_left(&self) -> bool {
        matches!(self, Either::Left(_))
    }

    pub fn is_right(&self) -> bool {
        matches!(self, Either::Right(_))
    }
}

/// Resolves with the output of whichever future completes first.
///
/// If both are ready on the same poll, `left` wins. The other future is
/// dropped before this function returns.
///
/// ```rust
/// use core_async::race::{first_of, Either};
/// use core_async::time::{sleep, Duration};
///
/// # core_async::runtime::block_on(async {
/// let out = first_of(
///     async { sleep(Duration::from_millis(1)).await; "fast" },
///     async { sleep(Duration::from_secs(60)).await; "slow" },
/// )
/// .await;
/// assert_eq!(out, Either::Left("fast"));
/// # });
/// ```
pub async fn first_of<A, B>(left: A, right: B) -> Either<A::Output, B::Output>
where
    A: Future,
    B: Future,
{
    let left = std::pin::pin!(left);
    let right = std::pin::pin!(right);

    match future::select(left, right).await {
        FutureEither::Left((output, loser)) => {
            drop(loser);
            Either::Left(output)
        }
        FutureEither::Right((output, loser)) => {
            drop(loser);
            Either::Right(output)
        }
    }
}

/// Runs `future` until it completes or `token` is cancelled.
///
/// Returns `None` when cancelled. A token that is already cancelled wins
/// even if `future` would be immediately ready.
pub async fn with_cancellation<F>(token: &CancellationToken, future: F) -> Option<F::Output>
where
    F: Future,
{
    if token.is_cancelled() {
        return None;
    }

    match first_of(token.cancelled(), future).await {
        Either::Left(()) => None,
        Either::Right(output) => Some(output),
    }
}
