//! # Player
//!
//! The playback engine: one queue, one state machine, one bound renderer item.
//!
//! ## Overview
//!
//! [`Player`] owns a [`QueueStore`], a [`PlaybackStateMachine`], a
//! [`RetryCoordinator`], a [`BufferPolicy`] and a [`SleepTimer`], and drives a
//! host [`Renderer`] through them. Every public operation, including reads,
//! runs under a single async mutex (the control context), so queue, cursor
//! and state are never observed half-updated.
//!
//! Background work (retry waits, sleep-timer deadlines) runs as cancellable
//! tasks outside the lock and re-enters it only to re-validate and act.
//!
//! ## Renderer events
//!
//! Every bind gets a fresh [`BindingId`]. Renderer notifications for any other
//! binding are dropped, so a late event from a previous item can never move
//! the state machine. Renderers must deliver notifications asynchronously
//! (never from inside a control call), either by calling
//! [`Player::handle_renderer_event`] or through [`Player::spawn_event_pump`].
//!
//! ## Usage
//!
//! ```ignore
//! let config = CoreConfig::builder()
//!     .renderer(Arc::new(AvPlayerRenderer::new()))
//!     .build()?;
//! let player = Player::new(config, PlayerOptions::default())?;
//!
//! let mut events = player.subscribe();
//! player.add(vec![episode], None).await?;
//! player.play().await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use bridge_traits::{BindingId, RenderRequest, Renderer, RendererEvent, RendererNotification};
use chrono::{DateTime, Utc};
use core_async::sync::Mutex;
use core_async::task::JoinHandle;
use core_async::time::Instant;
use core_runtime::config::CoreConfig;
use core_runtime::events::{EventBus, EventStream};
use core_runtime::logging::redact_url;
use futures::{Stream, StreamExt};
use tracing::{debug, info, instrument, warn};

use crate::buffer_policy::BufferPolicy;
use crate::config::{OptionsChangeSet, OptionsUpdate, PlayerOptions, RepeatMode};
use crate::error::{PlaybackError, PlaybackFailure, Result};
use crate::events::{PlayerEvent, RetryOutcome};
use crate::queue::{ActiveItemChange, CursorMove, QueueStore};
use crate::retry::{GiveUpReason, RetryCoordinator, RetryDecision};
use crate::sleep_timer::{SleepTimer, SleepTimerState};
use crate::state::{PlaybackStateMachine, PlayingIndicator};
use crate::types::{PlaybackSnapshot, PlaybackState, QueueItem};

// ============================================================================
// Engine state
// ============================================================================

/// Everything guarded by the control context.
#[derive(Debug)]
struct Engine {
    queue: QueueStore,
    machine: PlaybackStateMachine,
    retry: RetryCoordinator,
    buffer: BufferPolicy,
    options: PlayerOptions,
    binding: Option<BindingId>,
    rate: f32,
    /// Playback has produced audio since the last bind.
    has_started: bool,
    is_rebuffering: bool,
    /// The renderer reached end-of-media and nothing followed.
    at_end: bool,
    /// Bumped on every current-item change; stale retries compare against it.
    item_epoch: u64,
    /// Where to resume when the renderer is not bound (stopped or failed).
    resume_position: Duration,
}

struct PlayerInner {
    renderer: Arc<dyn Renderer>,
    events: EventBus<PlayerEvent>,
    sleep_timer: SleepTimer,
    engine: Mutex<Engine>,
}

/// Handle to the playback engine. Cheap to clone.
#[derive(Clone)]
pub struct Player {
    inner: Arc<PlayerInner>,
}

impl std::fmt::Debug for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Player")
            .field("renderer", &"Renderer { ... }")
            .field("sleep_timer", &self.inner.sleep_timer)
            .finish()
    }
}

impl Player {
    /// Creates a player from host capabilities and initial options.
    ///
    /// # Errors
    ///
    /// `Config` when `options` fail validation.
    pub fn new(config: CoreConfig, options: PlayerOptions) -> Result<Self> {
        Self::with_queue(config, options, QueueStore::new())
    }

    /// Like [`Player::new`] but with a deterministic shuffle order.
    pub fn with_shuffle_seed(
        config: CoreConfig,
        options: PlayerOptions,
        seed: u64,
    ) -> Result<Self> {
        Self::with_queue(config, options, QueueStore::with_shuffle_seed(seed))
    }

    fn with_queue(
        config: CoreConfig,
        options: PlayerOptions,
        mut queue: QueueStore,
    ) -> Result<Self> {
        config.validate()?;
        options.validate()?;

        queue.set_repeat_mode(options.repeat_mode);
        queue.set_shuffle_enabled(options.shuffle_enabled);

        let events = EventBus::new(config.event_buffer_size);
        let sleep_timer = SleepTimer::new(config.clock.clone(), events.clone());

        let engine = Engine {
            queue,
            machine: PlaybackStateMachine::new(),
            retry: RetryCoordinator::new(options.retry.clone(), config.retry_network_monitor()),
            buffer: BufferPolicy::new(options.buffer.clone()),
            options,
            binding: None,
            rate: 1.0,
            has_started: false,
            is_rebuffering: false,
            at_end: false,
            item_epoch: 0,
            resume_position: Duration::ZERO,
        };

        info!(
            network_aware_retry = config.features.enable_network_aware_retry,
            "Player created"
        );

        Ok(Self {
            inner: Arc::new(PlayerInner {
                renderer: config.renderer,
                events,
                sleep_timer,
                engine: Mutex::new(engine),
            }),
        })
    }

    /// Subscribes to host-facing events from now on.
    pub fn subscribe(&self) -> EventStream<PlayerEvent> {
        self.inner.events.stream()
    }

    // ------------------------------------------------------------------------
    // Queue operations
    // ------------------------------------------------------------------------

    /// Inserts items at `at` (default: append).
    #[instrument(skip(self, items), fields(count = items.len()))]
    pub async fn add(&self, items: Vec<QueueItem>, at: Option<usize>) -> Result<()> {
        let mut engine = self.inner.engine.lock().await;
        let change = engine.queue.add(items, at)?;
        self.inner.queue_changed(&engine);
        if let Some(change) = change {
            self.inner.apply_active_change(&mut engine, change).await;
        }
        Ok(())
    }

    pub async fn remove(&self, index: usize) -> Result<()> {
        let mut engine = self.inner.engine.lock().await;
        let change = engine.queue.remove(index)?;
        self.inner.queue_changed(&engine);
        if let Some(change) = change {
            self.inner.apply_active_change(&mut engine, change).await;
        }
        Ok(())
    }

    /// Removes several indices atomically: all are validated first.
    pub async fn remove_many(&self, indices: &[usize]) -> Result<()> {
        let mut engine = self.inner.engine.lock().await;
        let change = engine.queue.remove_many(indices)?;
        self.inner.queue_changed(&engine);
        if let Some(change) = change {
            self.inner.apply_active_change(&mut engine, change).await;
        }
        Ok(())
    }

    pub async fn move_item(&self, from: usize, to: usize) -> Result<()> {
        let mut engine = self.inner.engine.lock().await;
        engine.queue.move_item(from, to)?;
        self.inner.queue_changed(&engine);
        Ok(())
    }

    /// Drops every item after the current one.
    pub async fn remove_upcoming(&self) -> Result<()> {
        let mut engine = self.inner.engine.lock().await;
        if engine.queue.remove_upcoming() > 0 {
            self.inner.queue_changed(&engine);
        }
        Ok(())
    }

    /// Patches metadata (title, artwork, favorited, ...) without rebinding.
    pub async fn update_item(&self, index: usize, item: QueueItem) -> Result<()> {
        let mut engine = self.inner.engine.lock().await;
        engine.queue.update_item(index, item)?;
        self.inner.queue_changed(&engine);
        Ok(())
    }

    /// Swaps the current item for `item` and binds it.
    pub async fn replace_current(&self, item: QueueItem) -> Result<()> {
        let mut engine = self.inner.engine.lock().await;
        let change = engine.queue.replace_current(item)?;
        self.inner.queue_changed(&engine);
        self.inner.apply_active_change(&mut engine, change).await;
        Ok(())
    }

    /// Empties the queue and stops the renderer.
    pub async fn clear(&self) -> Result<()> {
        let mut engine = self.inner.engine.lock().await;
        if let Some(change) = engine.queue.clear() {
            self.inner.queue_changed(&engine);
            self.inner.apply_active_change(&mut engine, change).await;
        }
        Ok(())
    }

    /// Replaces the whole queue and binds `start` (default 0).
    #[instrument(skip(self, items), fields(count = items.len()))]
    pub async fn set_queue(&self, items: Vec<QueueItem>, start: Option<usize>) -> Result<()> {
        let mut engine = self.inner.engine.lock().await;
        let change = engine.queue.set_queue(items, start)?;
        self.inner.queue_changed(&engine);
        if let Some(change) = change {
            self.inner.apply_active_change(&mut engine, change).await;
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------------

    #[instrument(skip(self))]
    pub async fn skip_to(&self, index: usize) -> Result<()> {
        let mut engine = self.inner.engine.lock().await;
        let cursor = engine.queue.skip_to(index)?;
        self.inner.follow_cursor(&mut engine, cursor).await;
        Ok(())
    }

    /// Moves to the next item in play order. A no-op at the end unless
    /// repeat mode is `Queue`.
    pub async fn next(&self) -> Result<()> {
        let mut engine = self.inner.engine.lock().await;
        let cursor = engine.queue.next();
        let cursor = restart_only_when_playing(&engine, cursor);
        self.inner.follow_cursor(&mut engine, cursor).await;
        Ok(())
    }

    pub async fn previous(&self) -> Result<()> {
        let mut engine = self.inner.engine.lock().await;
        let cursor = engine.queue.previous();
        let cursor = restart_only_when_playing(&engine, cursor);
        self.inner.follow_cursor(&mut engine, cursor).await;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Transport
    // ------------------------------------------------------------------------

    /// Sets intent-to-play and starts the renderer.
    ///
    /// From `Error` this is a manual retry; from `Stopped` it rebinds; from
    /// `Ended` it restarts the current item.
    pub async fn play(&self) -> Result<()> {
        let mut engine = self.inner.engine.lock().await;
        self.inner.set_intent(&mut engine, true);

        if engine.queue.current_index().is_none() {
            return Ok(());
        }

        let state = engine.machine.state().clone();
        match state {
            PlaybackState::Error(_) => {
                info!("Play from error state; retrying current item");
                engine.retry.reset();
                let position = engine.resume_position;
                self.inner.bind_current(&mut engine, position).await;
            }
            PlaybackState::Stopped | PlaybackState::None => {
                let position = engine.resume_position;
                self.inner.bind_current(&mut engine, position).await;
            }
            PlaybackState::Ended => {
                self.inner.bind_current(&mut engine, Duration::ZERO).await;
            }
            _ => {
                if engine.binding.is_some() {
                    self.inner.renderer.play().await?;
                }
            }
        }
        Ok(())
    }

    pub async fn pause(&self) -> Result<()> {
        let mut engine = self.inner.engine.lock().await;
        self.inner.pause_locked(&mut engine).await
    }

    /// Clears intent, releases the renderer and keeps the queue.
    pub async fn stop(&self) -> Result<()> {
        let mut engine = self.inner.engine.lock().await;
        self.inner.set_intent(&mut engine, false);
        engine.retry.reset();
        self.inner.release_renderer(&mut engine).await;
        engine.resume_position = Duration::ZERO;
        self.inner.transition(&mut engine, PlaybackState::Stopped);
        Ok(())
    }

    /// Seeks within the current item.
    ///
    /// After a natural end this rebinds at `position`. While stopped or
    /// failed the position is remembered for the next bind.
    pub async fn seek(&self, position: Duration) -> Result<()> {
        let mut engine = self.inner.engine.lock().await;
        if engine.queue.current_index().is_none() {
            return Err(PlaybackError::NoCurrentItem);
        }

        if engine.at_end {
            self.inner.bind_current(&mut engine, position).await;
        } else if engine.binding.is_none() {
            engine.resume_position = position;
        } else {
            self.inner.renderer.seek(position).await?;
        }
        Ok(())
    }

    /// Sets the playback speed. Also scales buffering thresholds.
    pub async fn set_rate(&self, rate: f32) -> Result<()> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(PlaybackError::Config(format!(
                "Playback rate must be a positive finite number, got {rate}"
            )));
        }

        let mut engine = self.inner.engine.lock().await;
        engine.rate = rate;
        if engine.binding.is_some() {
            self.inner.renderer.set_rate(rate).await?;
        }
        Ok(())
    }

    /// Reloads the current item at its last known position, resetting the
    /// automatic retry budget.
    #[instrument(skip(self))]
    pub async fn retry(&self) -> Result<()> {
        let mut engine = self.inner.engine.lock().await;
        if engine.queue.current_index().is_none() {
            return Err(PlaybackError::NoCurrentItem);
        }

        info!("Manual retry");
        engine.retry.reset();
        let position = engine.resume_position;
        self.inner.bind_current(&mut engine, position).await;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Options
    // ------------------------------------------------------------------------

    /// Applies an options update atomically and reacts to what changed.
    pub async fn update_options(&self, update: OptionsUpdate) -> Result<OptionsChangeSet> {
        let mut engine = self.inner.engine.lock().await;
        let changes = engine.options.apply(update)?;

        if let Some(buffer) = &changes.buffer {
            engine.buffer.set_config(buffer.clone())?;
        }
        if let Some(retry) = &changes.retry {
            engine.retry.set_config(retry.clone());
        }
        if let Some(mode) = changes.repeat_mode {
            engine.queue.set_repeat_mode(mode);
            self.inner.emit(PlayerEvent::RepeatModeChanged(mode));
        }
        if let Some(enabled) = changes.shuffle_enabled {
            engine.queue.set_shuffle_enabled(enabled);
            self.inner.emit(PlayerEvent::ShuffleChanged(enabled));
        }

        if !changes.is_empty() {
            debug!(?changes, "Options updated");
        }
        Ok(changes)
    }

    pub async fn set_repeat_mode(&self, mode: RepeatMode) -> Result<()> {
        self.update_options(OptionsUpdate::repeat_mode(mode)).await?;
        Ok(())
    }

    pub async fn set_shuffle_enabled(&self, enabled: bool) -> Result<()> {
        self.update_options(OptionsUpdate::shuffle(enabled)).await?;
        Ok(())
    }

    pub async fn options(&self) -> PlayerOptions {
        self.inner.engine.lock().await.options.clone()
    }

    // ------------------------------------------------------------------------
    // Sleep timer
    // ------------------------------------------------------------------------

    /// Pauses playback `duration` from now. Returns the wall-clock deadline.
    pub async fn set_sleep_timer(&self, duration: Duration) -> Result<DateTime<Utc>> {
        let _engine = self.inner.engine.lock().await;
        let weak = Arc::downgrade(&self.inner);
        self.inner.sleep_timer.set_after(duration, move || async move {
            if let Some(inner) = weak.upgrade() {
                let mut engine = inner.engine.lock().await;
                if let Err(err) = inner.pause_locked(&mut engine).await {
                    warn!(error = %err, "Sleep timer pause failed");
                }
            }
        })
    }

    /// Pauses when the current item ends naturally instead of advancing.
    pub async fn set_sleep_timer_at_end_of_item(&self) {
        let _engine = self.inner.engine.lock().await;
        self.inner.sleep_timer.set_at_end_of_current_item();
    }

    /// Cancels the sleep timer. Returns whether one was active.
    pub async fn clear_sleep_timer(&self) -> bool {
        let _engine = self.inner.engine.lock().await;
        self.inner.sleep_timer.clear()
    }

    pub fn sleep_timer_state(&self) -> SleepTimerState {
        self.inner.sleep_timer.state()
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    /// Queue, cursor and state read in one dispatch.
    pub async fn snapshot(&self) -> PlaybackSnapshot {
        let engine = self.inner.engine.lock().await;
        PlaybackSnapshot {
            items: engine.queue.items().to_vec(),
            current_index: engine.queue.current_index(),
            play_order: engine.queue.play_order(),
            state: engine.machine.state().clone(),
            play_when_ready: engine.machine.play_when_ready(),
            repeat_mode: engine.queue.repeat_mode(),
            shuffle_enabled: engine.queue.shuffle_enabled(),
            rate: engine.rate,
            sleep_timer: self.inner.sleep_timer.state(),
        }
    }

    pub async fn state(&self) -> PlaybackState {
        self.inner.engine.lock().await.machine.state().clone()
    }

    pub async fn current_index(&self) -> Option<usize> {
        self.inner.engine.lock().await.queue.current_index()
    }

    pub async fn current_item(&self) -> Option<QueueItem> {
        self.inner.engine.lock().await.queue.current_item().cloned()
    }

    pub async fn queue(&self) -> Vec<QueueItem> {
        self.inner.engine.lock().await.queue.items().to_vec()
    }

    pub async fn play_when_ready(&self) -> bool {
        self.inner.engine.lock().await.machine.play_when_ready()
    }

    /// Renderer position, or the remembered resume position when unbound.
    pub async fn position(&self) -> Duration {
        let engine = self.inner.engine.lock().await;
        self.inner.current_position(&engine).await
    }

    // ------------------------------------------------------------------------
    // Buffering decisions
    // ------------------------------------------------------------------------

    /// Load-control query for the renderer adapter at the current rate.
    pub async fn should_continue_loading(&self, buffered: Duration) -> bool {
        let engine = self.inner.engine.lock().await;
        engine.buffer.should_continue_loading(buffered, engine.rate)
    }

    /// Start/resume query for the renderer adapter. Uses the rebuffer
    /// threshold once playback had started on this binding.
    pub async fn should_start_playback(&self, buffered: Duration) -> bool {
        let engine = self.inner.engine.lock().await;
        engine
            .buffer
            .should_start_playback(buffered, engine.rate, engine.is_rebuffering)
    }

    // ------------------------------------------------------------------------
    // Renderer events
    // ------------------------------------------------------------------------

    /// Feeds one renderer notification into the state machine.
    pub async fn handle_renderer_event(&self, notification: RendererNotification) {
        let mut engine = self.inner.engine.lock().await;
        if engine.binding != Some(notification.binding) {
            debug!(
                binding = %notification.binding,
                "Dropping renderer event for stale binding"
            );
            return;
        }
        self.inner
            .on_renderer_event(&mut engine, notification.event)
            .await;
    }

    /// Forwards every notification from `events` until the stream ends or the
    /// player is dropped.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a Tokio runtime.
    pub fn spawn_event_pump<S>(&self, events: S) -> JoinHandle<()>
    where
        S: Stream<Item = RendererNotification> + Send + 'static,
    {
        let weak = Arc::downgrade(&self.inner);
        core_async::spawn(async move {
            let mut events = std::pin::pin!(events);
            while let Some(notification) = events.next().await {
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                Player { inner }.handle_renderer_event(notification).await;
            }
            debug!("Renderer event pump finished");
        })
    }
}

/// A wrap onto the same item (single-item queue, repeat `Queue`) restarts it
/// only while intent-to-play is set.
fn restart_only_when_playing(engine: &Engine, cursor: CursorMove) -> CursorMove {
    match cursor {
        CursorMove::Restart if !engine.machine.play_when_ready() => CursorMove::Unchanged,
        other => other,
    }
}

// ============================================================================
// Control-context internals
// ============================================================================

impl PlayerInner {
    fn emit(&self, event: PlayerEvent) {
        let _ = self.events.emit(event);
    }

    fn queue_changed(&self, engine: &Engine) {
        self.emit(PlayerEvent::QueueChanged {
            length: engine.queue.len(),
        });
    }

    fn emit_indicator(&self, indicator: PlayingIndicator) {
        self.emit(PlayerEvent::PlayingIndicatorChanged {
            playing: indicator.playing,
            buffering: indicator.buffering,
        });
    }

    /// Applies a state change and emits its events in order.
    fn transition(&self, engine: &mut Engine, next: PlaybackState) -> bool {
        let Some(outcome) = engine.machine.transition(next) else {
            return false;
        };
        if outcome.error_cleared.is_some() {
            self.emit(PlayerEvent::ErrorCleared);
        }
        self.emit(PlayerEvent::StateChanged(outcome.current));
        if let Some(indicator) = outcome.indicator {
            self.emit_indicator(indicator);
        }
        true
    }

    fn set_intent(&self, engine: &mut Engine, play_when_ready: bool) {
        if let Some(indicator) = engine.machine.set_play_when_ready(play_when_ready) {
            self.emit_indicator(indicator);
        }
    }

    async fn current_position(&self, engine: &Engine) -> Duration {
        if engine.binding.is_none() {
            return engine.resume_position;
        }
        match self.renderer.position().await {
            Ok(position) => position,
            Err(err) => {
                debug!(error = %err, "Renderer position unavailable");
                engine.resume_position
            }
        }
    }

    async fn release_renderer(&self, engine: &mut Engine) {
        engine.at_end = false;
        if engine.binding.take().is_some() {
            if let Err(err) = self.renderer.stop().await {
                warn!(error = %err, "Renderer stop failed");
            }
        }
    }

    async fn pause_locked(&self, engine: &mut Engine) -> Result<()> {
        self.set_intent(engine, false);

        let state = engine.machine.state().clone();
        if engine.binding.is_some() && state.is_renderer_driven() {
            self.renderer.pause().await?;
        }
        if matches!(
            state,
            PlaybackState::Ready | PlaybackState::Playing | PlaybackState::Buffering
        ) {
            self.transition(engine, PlaybackState::Paused);
        }
        Ok(())
    }

    /// Binds the current item with a fresh binding id and enters `Loading`.
    async fn bind_current(self: &Arc<Self>, engine: &mut Engine, start: Duration) {
        let Some(item) = engine.queue.current_item().cloned() else {
            return;
        };

        let request = RenderRequest::new(item.source.clone())
            .with_metadata(item.metadata())
            .with_start_position(start)
            .with_rate(engine.rate);
        let binding = request.binding;

        engine.binding = Some(binding);
        engine.at_end = false;
        engine.has_started = false;
        engine.is_rebuffering = false;
        engine.resume_position = start;
        self.transition(engine, PlaybackState::Loading);

        info!(
            item_id = %item.id,
            source = %redact_url(&item.source.location()),
            %binding,
            start_ms = start.as_millis() as u64,
            "Binding item"
        );

        if let Err(err) = self.renderer.bind(request).await {
            self.handle_failure(engine, PlaybackFailure::from_bridge(&err))
                .await;
            return;
        }

        if engine.machine.play_when_ready() {
            if let Err(err) = self.renderer.play().await {
                self.handle_failure(engine, PlaybackFailure::from_bridge(&err))
                    .await;
            }
        }
    }

    /// Reacts to the current item moving: resets retries, reports the change
    /// with the previous item's position, then binds or stops.
    async fn apply_active_change(
        self: &Arc<Self>,
        engine: &mut Engine,
        change: ActiveItemChange,
    ) {
        let previous_position = self.current_position(engine).await;
        engine.retry.reset();
        engine.item_epoch = engine.item_epoch.wrapping_add(1);

        debug!(
            previous = ?change.previous_index,
            current = ?change.index,
            "Active item changed"
        );

        let has_item = change.index.is_some();
        self.emit(PlayerEvent::ActiveItemChanged {
            previous_index: change.previous_index,
            previous_item: change.previous_item,
            previous_position,
            index: change.index,
            item: change.item,
        });

        if has_item {
            self.bind_current(engine, Duration::ZERO).await;
        } else {
            self.set_intent(engine, false);
            self.release_renderer(engine).await;
            engine.resume_position = Duration::ZERO;
            self.transition(engine, PlaybackState::Stopped);
        }
    }

    async fn follow_cursor(self: &Arc<Self>, engine: &mut Engine, cursor: CursorMove) {
        match cursor {
            CursorMove::Unchanged => {}
            CursorMove::Restart => self.restart_current(engine).await,
            CursorMove::Changed(change) => self.apply_active_change(engine, change).await,
        }
    }

    /// Plays the current item again from the start.
    async fn restart_current(self: &Arc<Self>, engine: &mut Engine) {
        if engine.binding.is_none() || engine.at_end {
            self.bind_current(engine, Duration::ZERO).await;
            return;
        }

        debug!("Restarting current item");
        if let Err(err) = self.renderer.seek(Duration::ZERO).await {
            self.handle_failure(engine, PlaybackFailure::from_bridge(&err))
                .await;
            return;
        }
        if engine.machine.play_when_ready() {
            if let Err(err) = self.renderer.play().await {
                self.handle_failure(engine, PlaybackFailure::from_bridge(&err))
                    .await;
            }
        }
    }

    async fn on_renderer_event(self: &Arc<Self>, engine: &mut Engine, event: RendererEvent) {
        let intent = engine.machine.play_when_ready();
        let state = engine.machine.state().clone();

        match event {
            RendererEvent::Ready => {
                if state == PlaybackState::Loading {
                    self.transition(engine, PlaybackState::Ready);
                }
            }
            RendererEvent::BufferingChanged { buffering: true } => {
                let starts_buffering = state == PlaybackState::Playing
                    || (intent && state == PlaybackState::Ready);
                if starts_buffering {
                    engine.is_rebuffering = engine.has_started;
                    self.transition(engine, PlaybackState::Buffering);
                }
            }
            RendererEvent::BufferingChanged { buffering: false } => {
                if state == PlaybackState::Buffering {
                    if intent {
                        engine.has_started = true;
                        engine.is_rebuffering = false;
                        self.transition(engine, PlaybackState::Playing);
                    } else {
                        self.transition(engine, PlaybackState::Paused);
                    }
                }
            }
            RendererEvent::PlayingChanged { playing: true } => {
                if !intent {
                    debug!("Renderer started without intent-to-play; ignoring");
                    return;
                }
                if state.is_renderer_driven() {
                    engine.has_started = true;
                    engine.is_rebuffering = false;
                    self.transition(engine, PlaybackState::Playing);
                }
            }
            RendererEvent::PlayingChanged { playing: false } => {
                let can_pause = matches!(
                    state,
                    PlaybackState::Ready | PlaybackState::Playing | PlaybackState::Buffering
                );
                if !intent && can_pause {
                    self.transition(engine, PlaybackState::Paused);
                }
            }
            RendererEvent::Ended => self.on_natural_end(engine).await,
            RendererEvent::PositionDiscontinuity { position } => {
                debug!(position_ms = position.as_millis() as u64, "Position discontinuity");
            }
            RendererEvent::Failed { error } => {
                self.handle_failure(engine, error.into()).await;
            }
        }
    }

    /// Natural end of the bound item: sleep-timer pause, repeat, advance, or
    /// end of queue.
    async fn on_natural_end(self: &Arc<Self>, engine: &mut Engine) {
        let Some(index) = engine.queue.current_index() else {
            return;
        };
        if engine.at_end {
            debug!(index, "Duplicate end of item ignored");
            return;
        }
        let position = self.current_position(engine).await;
        engine.at_end = true;

        if self.sleep_timer.take_end_of_item() {
            info!("Sleep timer reached end of item; pausing");
            self.set_intent(engine, false);
            let is_last = engine.queue.peek_next().is_none();
            self.enter_ended(engine, is_last.then_some((index, position)));
            self.sleep_timer.notify_cleared();
            return;
        }

        // The ended binding cannot be resumed, so restarts rebind.
        if engine.queue.repeat_mode() == RepeatMode::Track {
            self.bind_current(engine, Duration::ZERO).await;
            return;
        }

        match engine.queue.next() {
            CursorMove::Changed(change) => self.apply_active_change(engine, change).await,
            CursorMove::Restart => self.bind_current(engine, Duration::ZERO).await,
            CursorMove::Unchanged => {
                info!(index, "Queue ended");
                self.enter_ended(engine, Some((index, position)));
            }
        }
    }

    /// `QueueEnded` follows an effective transition to `Ended` only.
    fn enter_ended(&self, engine: &mut Engine, queue_end: Option<(usize, Duration)>) {
        if !self.transition(engine, PlaybackState::Ended) {
            return;
        }
        if let Some((index, position)) = queue_end {
            self.emit(PlayerEvent::QueueEnded { index, position });
        }
    }

    /// Enters `Error` and decides on an automatic retry.
    async fn handle_failure(self: &Arc<Self>, engine: &mut Engine, failure: PlaybackFailure) {
        if engine.binding.is_some() {
            engine.resume_position = self.current_position(engine).await;
            if let Err(err) = self.renderer.stop().await {
                debug!(error = %err, "Renderer stop after failure failed");
            }
            engine.binding = None;
        }
        engine.at_end = false;

        warn!(code = %failure.code, message = %failure.message, "Playback failed");
        self.transition(engine, PlaybackState::Error(failure.clone()));

        let retry = self.plan_retry(engine, &failure);
        self.emit(PlayerEvent::ErrorSet {
            error: failure,
            retry,
        });
    }

    fn plan_retry(
        self: &Arc<Self>,
        engine: &mut Engine,
        failure: &PlaybackFailure,
    ) -> RetryOutcome {
        if !engine.machine.play_when_ready() {
            return RetryOutcome::WillNotRetry {
                reason: GiveUpReason::NotPlaying,
            };
        }

        match engine.retry.evaluate(failure, Instant::now()) {
            RetryDecision::Retry { attempt, delay } => {
                let weak = Arc::downgrade(self);
                let epoch = engine.item_epoch;
                let scheduled = engine.retry.schedule(delay, move || async move {
                    if let Some(inner) = weak.upgrade() {
                        inner.fire_retry(epoch, attempt).await;
                    }
                });

                if scheduled {
                    info!(attempt, delay_ms = delay.as_millis() as u64, "Retry scheduled");
                    RetryOutcome::Scheduled { attempt, delay }
                } else {
                    RetryOutcome::WillNotRetry {
                        reason: GiveUpReason::SchedulingFailed,
                    }
                }
            }
            RetryDecision::GiveUp(reason) => {
                warn!(?reason, "Not retrying");
                RetryOutcome::WillNotRetry { reason }
            }
        }
    }

    /// Backoff elapsed: reload if the failure is still the current situation.
    async fn fire_retry(self: &Arc<Self>, epoch: u64, attempt: u32) {
        let mut engine = self.engine.lock().await;

        if engine.item_epoch != epoch {
            debug!(attempt, "Retry belongs to a previous item; dropped");
            return;
        }
        if !engine.machine.play_when_ready() || !engine.machine.state().is_error() {
            debug!(attempt, "Retry no longer needed");
            return;
        }
        if !engine.retry.within_duration(Instant::now()) {
            debug!(attempt, "Retry window elapsed");
            return;
        }

        info!(attempt, "Retrying current item");
        let position = engine.resume_position;
        self.bind_current(&mut engine, position).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::{AudioSource, BridgeError, RendererError, RendererErrorCode};
    use mockall::mock;
    use mockall::predicate::eq;

    mock! {
        Renderer {}

        #[async_trait]
        impl Renderer for Renderer {
            async fn bind(&self, request: RenderRequest) -> BridgeResult<()>;
            async fn play(&self) -> BridgeResult<()>;
            async fn pause(&self) -> BridgeResult<()>;
            async fn stop(&self) -> BridgeResult<()>;
            async fn seek(&self, position: Duration) -> BridgeResult<()>;
            async fn set_rate(&self, rate: f32) -> BridgeResult<()>;
            async fn position(&self) -> BridgeResult<Duration>;
            async fn duration(&self) -> BridgeResult<Option<Duration>>;
            async fn buffered_position(&self) -> BridgeResult<Duration>;
        }
    }

    fn player(renderer: MockRenderer) -> Player {
        let config = CoreConfig::builder()
            .renderer(Arc::new(renderer))
            .build()
            .unwrap();
        Player::new(config, PlayerOptions::default()).unwrap()
    }

    fn item(id: &str) -> QueueItem {
        QueueItem::new(id, AudioSource::remote(format!("https://cdn.example/{id}.mp3")))
    }

    fn capture_binding(renderer: &mut MockRenderer) -> Arc<parking_lot::Mutex<Option<BindingId>>> {
        let slot = Arc::new(parking_lot::Mutex::new(None));
        let captured = slot.clone();
        renderer.expect_bind().returning(move |request| {
            *captured.lock() = Some(request.binding);
            Ok(())
        });
        slot
    }

    #[tokio::test]
    async fn bind_failure_without_intent_does_not_retry() {
        let mut renderer = MockRenderer::new();
        renderer.expect_bind().times(1).returning(|_| {
            Err(BridgeError::Renderer(RendererError::new(
                RendererErrorCode::TimedOut,
                "timed out",
            )))
        });
        renderer.expect_position().returning(|| Ok(Duration::ZERO));
        renderer.expect_stop().times(1).returning(|| Ok(()));

        let player = player(renderer);
        let mut events = player.subscribe();
        player.add(vec![item("a")], None).await.unwrap();

        assert!(player.state().await.is_error());
        let error_set = events
            .drain()
            .into_iter()
            .find_map(|event| match event {
                PlayerEvent::ErrorSet { retry, .. } => Some(retry),
                _ => None,
            })
            .unwrap();
        assert_eq!(
            error_set,
            RetryOutcome::WillNotRetry {
                reason: GiveUpReason::NotPlaying
            }
        );
    }

    #[tokio::test]
    async fn rate_must_be_positive_and_finite() {
        let player = player(MockRenderer::new());

        assert!(matches!(
            player.set_rate(0.0).await,
            Err(PlaybackError::Config(_))
        ));
        assert!(matches!(
            player.set_rate(f32::NAN).await,
            Err(PlaybackError::Config(_))
        ));
        player.set_rate(1.5).await.unwrap();
        assert_eq!(player.snapshot().await.rate, 1.5);
    }

    #[tokio::test]
    async fn stale_binding_events_are_dropped() {
        let mut renderer = MockRenderer::new();
        let binding = capture_binding(&mut renderer);
        let player = player(renderer);

        player.add(vec![item("a")], None).await.unwrap();
        assert_eq!(player.state().await, PlaybackState::Loading);

        player
            .handle_renderer_event(RendererNotification::new(BindingId::new(), RendererEvent::Ready))
            .await;
        assert_eq!(player.state().await, PlaybackState::Loading);

        let current = binding.lock().unwrap();
        player
            .handle_renderer_event(RendererNotification::new(current, RendererEvent::Ready))
            .await;
        assert_eq!(player.state().await, PlaybackState::Ready);
    }

    #[tokio::test]
    async fn seek_forwards_to_bound_renderer() {
        let mut renderer = MockRenderer::new();
        capture_binding(&mut renderer);
        renderer
            .expect_seek()
            .with(eq(Duration::from_secs(30)))
            .times(1)
            .returning(|_| Ok(()));
        let player = player(renderer);

        assert!(matches!(
            player.seek(Duration::from_secs(30)).await,
            Err(PlaybackError::NoCurrentItem)
        ));

        player.add(vec![item("a")], None).await.unwrap();
        player.seek(Duration::from_secs(30)).await.unwrap();
    }

    #[tokio::test]
    async fn pause_control_failure_is_returned() {
        let mut renderer = MockRenderer::new();
        let binding = capture_binding(&mut renderer);
        renderer.expect_play().returning(|| Ok(()));
        renderer
            .expect_pause()
            .returning(|| Err(BridgeError::OperationFailed("session lost".into())));
        let player = player(renderer);

        player.add(vec![item("a")], None).await.unwrap();
        player.play().await.unwrap();
        let current = binding.lock().unwrap();
        player
            .handle_renderer_event(RendererNotification::new(
                current,
                RendererEvent::PlayingChanged { playing: true },
            ))
            .await;

        assert!(matches!(
            player.pause().await,
            Err(PlaybackError::Bridge(_))
        ));
        assert!(!player.play_when_ready().await);
    }
}
