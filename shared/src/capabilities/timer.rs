use crux_core::capability::{CapabilityContext, Operation};
use crux_core::macros::Capability;
use serde::{Deserialize, Serialize};

use crate::scheduler::{TimerCommand, TimerId};

/// One-shot timers run by the shell.
///
/// The shell resolves `Start` with `Fired` when the delay elapses, or with
/// `Cancelled` if a matching `Cancel` arrived first. The core treats both as
/// advisory: only the handle the state machine still holds is acted upon.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", content = "data")]
pub enum TimerOperation {
    Start { id: TimerId, millis: u64 },
    Cancel { id: TimerId },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "data")]
pub enum TimerOutput {
    Fired { id: TimerId },
    Cancelled { id: TimerId },
}

impl Operation for TimerOperation {
    type Output = TimerOutput;
}

impl From<&TimerCommand> for TimerOperation {
    fn from(command: &TimerCommand) -> Self {
        match command {
            TimerCommand::Start { id, delay } => Self::Start {
                id: *id,
                millis: u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            },
            TimerCommand::Cancel { id } => Self::Cancel { id: *id },
        }
    }
}

#[derive(Capability)]
pub struct Timer<Ev> {
    context: CapabilityContext<TimerOperation, Ev>,
}

impl<Ev> Timer<Ev>
where
    Ev: 'static,
{
    pub fn new(context: CapabilityContext<TimerOperation, Ev>) -> Self {
        Self { context }
    }

    pub fn start<F>(&self, id: TimerId, millis: u64, make_event: F)
    where
        F: FnOnce(TimerOutput) -> Ev + Send + 'static,
    {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            let output = ctx
                .request_from_shell(TimerOperation::Start { id, millis })
                .await;
            ctx.update_app(make_event(output));
        });
    }

    pub fn cancel(&self, id: TimerId) {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            ctx.notify_shell(TimerOperation::Cancel { id }).await;
        });
    }

    /// Issues the capability request matching a queued state-machine command.
    pub fn dispatch<F>(&self, command: &TimerCommand, make_event: F)
    where
        F: FnOnce(TimerOutput) -> Ev + Send + 'static,
    {
        match TimerOperation::from(command) {
            TimerOperation::Start { id, millis } => self.start(id, millis, make_event),
            TimerOperation::Cancel { id } => self.cancel(id),
        }
    }
}
