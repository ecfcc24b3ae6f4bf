//! Single-offer countdown banner.
//!
//! `Hidden -> Offered(remaining) -> {Accepted | Declined | Expired} -> Hidden`.
//! The decision states are a short closing transient; the parent only hears
//! about the outcome once the transient is over.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::offer::RideOffer;
use crate::scheduler::{TimerCommand, TimerId, TimerOwner, TimerSlot};
use crate::LifecycleConfig;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleOutcome {
    Accepted,
    Declined,
    Expired,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleTag {
    Hidden,
    Offered,
    Accepted,
    Declined,
    Expired,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeclineReason {
    Manual,
    Expired,
}

/// What the parent hears once the banner has closed. Expiry is reported
/// through `Declined` so one handler covers both paths.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LifecycleSignal {
    Accepted(RideOffer),
    Declined {
        offer: RideOffer,
        reason: DeclineReason,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum LifecycleState {
    #[default]
    Hidden,
    Offered {
        offer: RideOffer,
        remaining: u32,
    },
    Closing {
        offer: RideOffer,
        outcome: LifecycleOutcome,
    },
}

impl LifecycleState {
    #[must_use]
    pub fn tag(&self) -> LifecycleTag {
        match self {
            Self::Hidden => LifecycleTag::Hidden,
            Self::Offered { .. } => LifecycleTag::Offered,
            Self::Closing { outcome, .. } => match outcome {
                LifecycleOutcome::Accepted => LifecycleTag::Accepted,
                LifecycleOutcome::Declined => LifecycleTag::Declined,
                LifecycleOutcome::Expired => LifecycleTag::Expired,
            },
        }
    }

    #[must_use]
    pub fn offer(&self) -> Option<&RideOffer> {
        match self {
            Self::Hidden => None,
            Self::Offered { offer, .. } | Self::Closing { offer, .. } => Some(offer),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("no offer is awaiting a decision (state: {state:?})")]
    NotOffered { state: LifecycleTag },
}

#[derive(Debug, Clone)]
pub struct RequestLifecycle {
    state: LifecycleState,
    config: LifecycleConfig,
    timer: TimerSlot,
    commands: Vec<TimerCommand>,
}

impl Default for RequestLifecycle {
    fn default() -> Self {
        Self::new(LifecycleConfig::default())
    }
}

impl RequestLifecycle {
    #[must_use]
    pub fn new(config: LifecycleConfig) -> Self {
        Self {
            state: LifecycleState::Hidden,
            config,
            timer: TimerSlot::new(TimerOwner::Lifecycle),
            commands: Vec::new(),
        }
    }

    #[must_use]
    pub fn state(&self) -> &LifecycleState {
        &self.state
    }

    #[must_use]
    pub fn tag(&self) -> LifecycleTag {
        self.state.tag()
    }

    #[must_use]
    pub fn remaining_seconds(&self) -> Option<u32> {
        match &self.state {
            LifecycleState::Offered { remaining, .. } => Some(*remaining),
            _ => None,
        }
    }

    /// Fraction of the countdown left, `1.0` when freshly presented.
    #[must_use]
    pub fn progress(&self) -> f32 {
        match &self.state {
            LifecycleState::Offered { offer, remaining } => {
                #[allow(clippy::cast_precision_loss)]
                let fraction = *remaining as f32 / offer.timeout_seconds() as f32;
                fraction
            }
            _ => 0.0,
        }
    }

    pub fn set_config(&mut self, config: LifecycleConfig) {
        self.config = config;
    }

    #[must_use]
    pub fn pending_timer(&self) -> Option<TimerId> {
        self.timer.pending()
    }

    pub fn take_timer_commands(&mut self) -> Vec<TimerCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Shows `offer` with a fresh countdown. Supersedes anything on screen;
    /// the superseded offer never produces a signal.
    pub fn present(&mut self, offer: RideOffer) {
        if let Some(previous) = self.state.offer() {
            debug!(previous = %previous, "superseding presented offer");
        }
        let remaining = offer.timeout_seconds();
        info!(offer = %offer, remaining, "presenting ride request");
        self.state = LifecycleState::Offered { offer, remaining };
        self.arm_tick();
    }

    /// One countdown step. Reaching zero expires the offer.
    pub fn tick(&mut self) -> Result<Option<LifecycleSignal>, LifecycleError> {
        let remaining = match &mut self.state {
            LifecycleState::Offered { remaining, .. } => {
                *remaining = remaining.saturating_sub(1);
                *remaining
            }
            _ => return Err(self.not_offered()),
        };

        if remaining == 0 {
            info!("ride request expired");
            return Ok(self.begin_close(LifecycleOutcome::Expired));
        }
        self.arm_tick();
        Ok(None)
    }

    pub fn accept(&mut self) -> Result<Option<LifecycleSignal>, LifecycleError> {
        self.decide(LifecycleOutcome::Accepted)
    }

    pub fn decline(&mut self) -> Result<Option<LifecycleSignal>, LifecycleError> {
        self.decide(LifecycleOutcome::Declined)
    }

    /// Handles a fired lifecycle timer. Stale ids yield `None` and change
    /// nothing.
    pub fn on_timer(&mut self, id: TimerId) -> Option<LifecycleSignal> {
        if !self.timer.fire(id) {
            debug!(%id, "ignoring stale lifecycle timer");
            return None;
        }

        match self.state {
            LifecycleState::Offered { .. } => self.tick().ok().flatten(),
            LifecycleState::Closing { .. } => self.finish_close(),
            LifecycleState::Hidden => None,
        }
    }

    /// Tears the banner down without notifying anyone.
    pub fn hide(&mut self) {
        self.timer.cancel(&mut self.commands);
        self.state = LifecycleState::Hidden;
    }

    fn decide(
        &mut self,
        outcome: LifecycleOutcome,
    ) -> Result<Option<LifecycleSignal>, LifecycleError> {
        if !matches!(self.state, LifecycleState::Offered { .. }) {
            return Err(self.not_offered());
        }
        info!(?outcome, "ride request decided");
        Ok(self.begin_close(outcome))
    }

    fn begin_close(&mut self, outcome: LifecycleOutcome) -> Option<LifecycleSignal> {
        self.timer.cancel(&mut self.commands);
        let LifecycleState::Offered { offer, .. } = std::mem::take(&mut self.state) else {
            return None;
        };
        self.state = LifecycleState::Closing { offer, outcome };

        if self.config.close_delay_ms == 0 {
            return self.finish_close();
        }
        self.timer.arm(
            Duration::from_millis(self.config.close_delay_ms),
            &mut self.commands,
        );
        None
    }

    fn finish_close(&mut self) -> Option<LifecycleSignal> {
        self.timer.cancel(&mut self.commands);
        let LifecycleState::Closing { offer, outcome } = std::mem::take(&mut self.state) else {
            return None;
        };

        Some(match outcome {
            LifecycleOutcome::Accepted => LifecycleSignal::Accepted(offer),
            LifecycleOutcome::Declined => LifecycleSignal::Declined {
                offer,
                reason: DeclineReason::Manual,
            },
            LifecycleOutcome::Expired => LifecycleSignal::Declined {
                offer,
                reason: DeclineReason::Expired,
            },
        })
    }

    fn arm_tick(&mut self) {
        self.timer.arm(
            Duration::from_millis(self.config.tick_ms),
            &mut self.commands,
        );
    }

    fn not_offered(&self) -> LifecycleError {
        LifecycleError::NotOffered {
            state: self.state.tag(),
        }
    }
}
