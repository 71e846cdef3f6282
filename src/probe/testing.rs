//! Scripted probers for unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use crate::probe::prober::{AttemptOutcome, Prober, Transport};

/// Replays a fixed list of outcomes, then keeps failing.
pub struct ScriptedProber {
    outcomes: Mutex<VecDeque<AttemptOutcome>>,
    calls: AtomicU32,
    transports: Mutex<Vec<Transport>>,
}

impl ScriptedProber {
    pub fn new(outcomes: impl IntoIterator<Item = AttemptOutcome>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into_iter().collect()),
            calls: AtomicU32::new(0),
            transports: Mutex::new(Vec::new()),
        }
    }

    pub fn always_failing() -> Self {
        Self::new([])
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn transports(&self) -> Vec<Transport> {
        self.transports.lock().unwrap().clone()
    }
}

impl Prober for ScriptedProber {
    async fn attempt(&self, _host: &str, transport: Transport) -> AttemptOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.transports.lock().unwrap().push(transport);
        let next = self.outcomes.lock().unwrap().pop_front();
        next.unwrap_or_else(|| AttemptOutcome::failure("scripted failure"))
    }
}

pub fn ok(elapsed_ms: u64) -> AttemptOutcome {
    AttemptOutcome::Success { elapsed_ms }
}

pub fn fail() -> AttemptOutcome {
    AttemptOutcome::failure("scripted failure")
}
