//! Rotating queue of simultaneous ride offers.
//!
//! In single view one offer is highlighted at a time and the highlight
//! rotates: the card stays visible for `visible_ms`, slides out for
//! `exit_ms`, then the next card comes in. "Show all" lists every offer and
//! suspends rotation. Refresh simulates competing drivers taking offers and
//! new ones arriving.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::offer::{OfferPool, RideOffer};
use crate::random::RandomSource;
use crate::sampling::{sample_batch, sample_replacement};
use crate::scheduler::{TimerCommand, TimerId, TimerOwner, TimerSlot};
use crate::TickerConfig;

#[derive(Default, Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    #[default]
    Single,
    ShowAll,
}

impl ViewMode {
    #[must_use]
    pub const fn toggle(self) -> Self {
        match self {
            Self::Single => Self::ShowAll,
            Self::ShowAll => Self::Single,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TickerStatus {
    Empty,
    SingleVisible,
    ListVisible,
}

#[derive(Default, Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RotationPhase {
    #[default]
    Idle,
    Visible,
    Exiting,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TickerError {
    #[error("offer index {index} out of range for {len} offers")]
    IndexOutOfRange { index: usize, len: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TickerState {
    offers: Vec<RideOffer>,
    current_index: usize,
    view_mode: ViewMode,
    rotation: RotationPhase,
}

impl Default for TickerState {
    fn default() -> Self {
        Self {
            offers: Vec::new(),
            current_index: 0,
            view_mode: ViewMode::Single,
            rotation: RotationPhase::Idle,
        }
    }
}

impl TickerState {
    #[must_use]
    pub fn offers(&self) -> &[RideOffer] {
        &self.offers
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.offers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.offers.is_empty()
    }

    /// `None` while the queue is empty.
    #[must_use]
    pub fn current_index(&self) -> Option<usize> {
        (!self.offers.is_empty()).then_some(self.current_index)
    }

    #[must_use]
    pub fn current_offer(&self) -> Option<&RideOffer> {
        self.offers.get(self.current_index)
    }

    #[must_use]
    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    #[must_use]
    pub fn rotation_phase(&self) -> RotationPhase {
        self.rotation
    }

    #[must_use]
    pub fn is_rotation_active(&self) -> bool {
        self.rotation != RotationPhase::Idle
    }

    #[must_use]
    pub fn is_exiting(&self) -> bool {
        self.rotation == RotationPhase::Exiting
    }

    #[must_use]
    pub fn status(&self) -> TickerStatus {
        match (self.offers.is_empty(), self.view_mode) {
            (true, _) => TickerStatus::Empty,
            (false, ViewMode::Single) => TickerStatus::SingleVisible,
            (false, ViewMode::ShowAll) => TickerStatus::ListVisible,
        }
    }

    fn should_rotate(&self) -> bool {
        self.view_mode == ViewMode::Single && self.offers.len() > 1
    }

    fn clamp_index(&mut self) {
        if self.current_index >= self.offers.len() {
            self.current_index = 0;
        }
    }
}

#[derive(Debug, Clone)]
pub struct TickerQueue {
    state: TickerState,
    config: TickerConfig,
    timer: TimerSlot,
    commands: Vec<TimerCommand>,
}

impl Default for TickerQueue {
    fn default() -> Self {
        Self::new(TickerConfig::default())
    }
}

impl TickerQueue {
    #[must_use]
    pub fn new(config: TickerConfig) -> Self {
        Self {
            state: TickerState::default(),
            config,
            timer: TimerSlot::new(TimerOwner::Ticker),
            commands: Vec::new(),
        }
    }

    #[must_use]
    pub fn state(&self) -> &TickerState {
        &self.state
    }

    #[must_use]
    pub fn config(&self) -> &TickerConfig {
        &self.config
    }

    /// New durations apply the next time a timer is armed.
    pub fn set_config(&mut self, config: TickerConfig) {
        self.config = config;
    }

    #[must_use]
    pub fn pending_timer(&self) -> Option<TimerId> {
        self.timer.pending()
    }

    /// Drains the timer commands queued by the transitions so far.
    pub fn take_timer_commands(&mut self) -> Vec<TimerCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Populates an empty queue with a fresh batch. The view mode chosen
    /// before going offline is kept.
    pub fn go_online(&mut self, pool: &OfferPool, rng: &mut dyn RandomSource) {
        if !self.state.is_empty() {
            debug!(offers = self.state.len(), "ticker already populated");
            return;
        }

        self.state.offers = sample_batch(pool, self.config.batch_min, self.config.batch_max, rng);
        self.state.current_index = 0;
        info!(
            offers = self.state.len(),
            view_mode = ?self.state.view_mode,
            "ticker populated"
        );
        self.restart_rotation();
    }

    pub fn go_offline(&mut self) {
        self.timer.cancel(&mut self.commands);
        self.state.offers.clear();
        self.state.current_index = 0;
        self.state.rotation = RotationPhase::Idle;
        debug!("ticker cleared");
    }

    /// Moves the highlight to the next offer, wrapping around.
    pub fn tick(&mut self) {
        let len = self.state.len();
        if len == 0 {
            return;
        }
        self.state.current_index = (self.state.current_index + 1) % len;
    }

    /// Handles a fired rotation timer. Returns `false` when `id` is not the
    /// armed handle; stale timers leave the state untouched.
    pub fn on_timer(&mut self, id: TimerId) -> bool {
        if !self.timer.fire(id) {
            debug!(%id, "ignoring stale ticker timer");
            return false;
        }

        match self.state.rotation {
            RotationPhase::Visible if self.state.should_rotate() => {
                self.state.rotation = RotationPhase::Exiting;
                self.timer.arm(
                    Duration::from_millis(self.config.exit_ms),
                    &mut self.commands,
                );
            }
            RotationPhase::Exiting if self.state.should_rotate() => {
                self.tick();
                self.state.rotation = RotationPhase::Visible;
                self.timer.arm(
                    Duration::from_millis(self.config.visible_ms),
                    &mut self.commands,
                );
            }
            _ => self.state.rotation = RotationPhase::Idle,
        }
        true
    }

    /// Replaces part of the queue: drops `1..=min(len - 1, max_removed)`
    /// random offers (never the last one) and adds up to
    /// `min_added..=max_added` offers with fresh destinations. Additions stop
    /// early once the pool has no non-conflicting destination left.
    pub fn refresh(&mut self, pool: &OfferPool, rng: &mut dyn RandomSource) {
        let len = self.state.len();
        if len == 0 {
            return;
        }

        let max_removed = (len - 1).min(self.config.max_removed_per_refresh);
        let remove_count = if max_removed == 0 {
            0
        } else {
            rng.between(1, max_removed)
        };
        for _ in 0..remove_count {
            let index = rng.index(self.state.len());
            self.state.offers.remove(index);
        }

        let add_count = rng.between(
            self.config.min_added_per_refresh,
            self.config.max_added_per_refresh,
        );
        let mut added = 0;
        for _ in 0..add_count {
            let existing = self.state.offers.iter().map(RideOffer::destination);
            match sample_replacement(pool, existing, 1, rng) {
                Ok(mut drawn) => {
                    added += drawn.len();
                    self.state.offers.append(&mut drawn);
                }
                Err(e) => {
                    debug!(error = %e, "refresh added fewer offers than requested");
                    break;
                }
            }
        }

        self.state.clamp_index();
        info!(
            removed = remove_count,
            added,
            offers = self.state.len(),
            "ticker refreshed"
        );
        self.restart_rotation();
    }

    /// Removes the offer at `index` and hands it back to the caller.
    ///
    /// `Ok(None)` when the queue is empty. An index outside the current
    /// snapshot is a caller bug and is rejected.
    pub fn accept(&mut self, index: usize) -> Result<Option<RideOffer>, TickerError> {
        let len = self.state.len();
        if len == 0 {
            return Ok(None);
        }
        if index >= len {
            return Err(TickerError::IndexOutOfRange { index, len });
        }

        let accepted = self.state.offers.remove(index);
        self.state.clamp_index();
        if self.state.is_empty() {
            self.go_offline();
        } else {
            self.restart_rotation();
        }
        Ok(Some(accepted))
    }

    pub fn toggle_view_mode(&mut self) {
        if self.state.is_empty() {
            return;
        }
        self.state.view_mode = self.state.view_mode.toggle();
        self.state.clamp_index();
        debug!(view_mode = ?self.state.view_mode, "ticker view mode toggled");
        self.restart_rotation();
    }

    fn restart_rotation(&mut self) {
        self.timer.cancel(&mut self.commands);
        if self.state.should_rotate() {
            self.state.rotation = RotationPhase::Visible;
            self.timer.arm(
                Duration::from_millis(self.config.visible_ms),
                &mut self.commands,
            );
        } else {
            self.state.rotation = RotationPhase::Idle;
        }
    }
}
