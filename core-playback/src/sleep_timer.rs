//! # Sleep Timer
//!
//! Pauses playback after a delay or at the natural end of the current item.
//!
//! A timed fire runs as a cancellable task. Each arm bumps a generation
//! counter so a fire that raced with `clear` or a re-arm is discarded even if
//! its wait already completed. On fire the timer state is cleared first, then
//! the completion runs, then listeners see `SleepTimerChanged(Inactive)`.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bridge_traits::Clock;
use chrono::{DateTime, Utc};
use core_async::race::with_cancellation;
use core_async::sync::CancellationToken;
use core_async::time::sleep;
use core_runtime::events::EventBus;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{PlaybackError, Result};
use crate::events::PlayerEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", content = "at", rename_all = "snake_case")]
pub enum SleepTimerState {
    #[default]
    Inactive,
    FiresAt(DateTime<Utc>),
    EndOfCurrentItem,
}

impl SleepTimerState {
    pub fn is_active(&self) -> bool {
        !matches!(self, SleepTimerState::Inactive)
    }
}

#[derive(Debug, Default)]
struct TimerSlot {
    state: SleepTimerState,
    generation: u64,
    token: Option<CancellationToken>,
}

impl TimerSlot {
    /// Cancels any pending fire and invalidates in-flight ones.
    fn disarm(&mut self) -> SleepTimerState {
        if let Some(token) = self.token.take() {
            token.cancel();
        }
        self.generation = self.generation.wrapping_add(1);
        std::mem::take(&mut self.state)
    }
}

#[derive(Clone)]
pub struct SleepTimer {
    slot: Arc<Mutex<TimerSlot>>,
    clock: Arc<dyn Clock>,
    events: EventBus<PlayerEvent>,
}

impl std::fmt::Debug for SleepTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SleepTimer")
            .field("state", &self.state())
            .finish()
    }
}

impl SleepTimer {
    pub fn new(clock: Arc<dyn Clock>, events: EventBus<PlayerEvent>) -> Self {
        Self {
            slot: Arc::new(Mutex::new(TimerSlot::default())),
            clock,
            events,
        }
    }

    pub fn state(&self) -> SleepTimerState {
        self.slot.lock().state
    }

    /// Arms a one-shot fire `duration` from now, replacing any previous mode.
    ///
    /// Returns the wall-clock deadline reported to listeners.
    pub fn set_after<F, Fut>(&self, duration: Duration, on_fire: F) -> Result<DateTime<Utc>>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let deadline = self.clock.deadline_after(duration);
        let token = CancellationToken::new();

        let generation = {
            let mut slot = self.slot.lock();
            slot.disarm();
            slot.state = SleepTimerState::FiresAt(deadline);
            slot.token = Some(token.clone());
            slot.generation
        };

        debug!(%deadline, "Sleep timer armed");
        self.notify(SleepTimerState::FiresAt(deadline));

        let timer = self.clone();
        let spawned = core_async::task::try_spawn(async move {
            if with_cancellation(&token, sleep(duration)).await.is_none() {
                return;
            }
            if !timer.claim_fire(generation) {
                debug!("Sleep timer fire superseded");
                return;
            }

            info!("Sleep timer fired");
            on_fire().await;
            timer.notify(SleepTimerState::Inactive);
        });

        if spawned.is_none() {
            warn!("No async runtime available; sleep timer not armed");
            self.slot.lock().disarm();
            self.notify(SleepTimerState::Inactive);
            return Err(PlaybackError::Runtime(core_runtime::Error::Internal(
                "sleep timer requires an async runtime".to_string(),
            )));
        }

        Ok(deadline)
    }

    /// Pauses at the natural end of whatever item is current when it ends.
    pub fn set_at_end_of_current_item(&self) {
        {
            let mut slot = self.slot.lock();
            slot.disarm();
            slot.state = SleepTimerState::EndOfCurrentItem;
        }
        debug!("Sleep timer armed for end of current item");
        self.notify(SleepTimerState::EndOfCurrentItem);
    }

    /// Cancels the timer. Returns whether anything was active.
    pub fn clear(&self) -> bool {
        let previous = self.slot.lock().disarm();
        if !previous.is_active() {
            return false;
        }
        debug!("Sleep timer cleared");
        self.notify(SleepTimerState::Inactive);
        true
    }

    /// Consumes the end-of-item mode if it is armed.
    ///
    /// The caller pauses and then calls [`SleepTimer::notify_cleared`].
    pub fn take_end_of_item(&self) -> bool {
        let mut slot = self.slot.lock();
        if slot.state != SleepTimerState::EndOfCurrentItem {
            return false;
        }
        slot.disarm();
        true
    }

    pub fn notify_cleared(&self) {
        self.notify(SleepTimerState::Inactive);
    }

    fn claim_fire(&self, generation: u64) -> bool {
        let mut slot = self.slot.lock();
        if slot.generation != generation {
            return false;
        }
        slot.disarm();
        true
    }

    fn notify(&self, state: SleepTimerState) {
        let _ = self.events.emit(PlayerEvent::SleepTimerChanged(state));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::SystemClock;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn timer() -> (SleepTimer, EventBus<PlayerEvent>) {
        let events = EventBus::new(16);
        (SleepTimer::new(Arc::new(SystemClock), events.clone()), events)
    }

    fn counting(counter: &Arc<AtomicUsize>) -> impl FnOnce() -> futures::future::Ready<()> {
        let counter = counter.clone();
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            futures::future::ready(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn cleared_timer_never_fires() {
        let (timer, _events) = timer();
        let fired = Arc::new(AtomicUsize::new(0));

        timer.set_after(Duration::from_secs(5), counting(&fired)).unwrap();
        assert!(matches!(timer.state(), SleepTimerState::FiresAt(_)));
        assert!(timer.clear());
        assert!(!timer.clear());

        sleep(Duration::from_secs(10)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(timer.state(), SleepTimerState::Inactive);
    }

    #[tokio::test(start_paused = true)]
    async fn short_timer_fires_once_and_goes_inactive() {
        let (timer, events) = timer();
        let mut stream = events.stream();
        let fired = Arc::new(AtomicUsize::new(0));

        timer
            .set_after(Duration::from_millis(100), counting(&fired))
            .unwrap();
        sleep(Duration::from_secs(1)).await;

        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(timer.state(), SleepTimerState::Inactive);

        let states: Vec<SleepTimerState> = stream
            .drain()
            .into_iter()
            .filter_map(|event| match event {
                PlayerEvent::SleepTimerChanged(state) => Some(state),
                _ => None,
            })
            .collect();
        assert_eq!(states.len(), 2);
        assert!(matches!(states[0], SleepTimerState::FiresAt(_)));
        assert_eq!(states[1], SleepTimerState::Inactive);
    }

    #[tokio::test(start_paused = true)]
    async fn rearming_replaces_previous_fire() {
        let (timer, _events) = timer();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        timer.set_after(Duration::from_secs(1), counting(&first)).unwrap();
        timer.set_after(Duration::from_secs(3), counting(&second)).unwrap();

        sleep(Duration::from_secs(2)).await;
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 0);

        sleep(Duration::from_secs(2)).await;
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn end_of_item_mode_cancels_timed_fire() {
        let (timer, _events) = timer();
        let fired = Arc::new(AtomicUsize::new(0));

        timer.set_after(Duration::from_secs(1), counting(&fired)).unwrap();
        timer.set_at_end_of_current_item();
        sleep(Duration::from_secs(2)).await;

        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(timer.state(), SleepTimerState::EndOfCurrentItem);
        assert!(timer.take_end_of_item());
        assert!(!timer.take_end_of_item());
        assert_eq!(timer.state(), SleepTimerState::Inactive);
    }

    #[test]
    fn set_after_without_runtime_fails() {
        let (timer, _events) = timer();
        let result = timer.set_after(Duration::from_secs(1), || async {});
        assert!(matches!(result, Err(PlaybackError::Runtime(_))));
        assert_eq!(timer.state(), SleepTimerState::Inactive);
    }
}
