use ic_core::{Error, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Where the controller is in its one-way startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Loading,
    Ready,
    /// The model could not be loaded; terminal.
    Failed,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Phase::Loading)
    }
}

/// `Loading -> Ready` or `Loading -> Failed`, each at most once.
#[derive(Debug)]
pub struct Readiness {
    tx: watch::Sender<Phase>,
}

impl Default for Readiness {
    fn default() -> Self {
        Self::new()
    }
}

impl Readiness {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Phase::Loading);
        Self { tx }
    }

    pub fn phase(&self) -> Phase {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Phase> {
        self.tx.subscribe()
    }

    /// Returns whether this call performed the transition.
    pub fn mark_ready(&self) -> bool {
        self.transition(Phase::Ready)
    }

    pub fn mark_failed(&self) -> bool {
        self.transition(Phase::Failed)
    }

    pub fn ensure_ready(&self) -> Result<()> {
        match self.phase() {
            Phase::Ready => Ok(()),
            Phase::Loading | Phase::Failed => Err(Error::NotReady),
        }
    }

    fn transition(&self, to: Phase) -> bool {
        self.tx.send_if_modified(|phase| {
            if phase.is_terminal() {
                return false;
            }
            *phase = to;
            true
        })
    }
}
