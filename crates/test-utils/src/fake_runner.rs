use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::anyhow;
use rollout::dag::RunContext;
use rollout::exec::{CommandFuture, CommandRequest, CommandRunner};
use rollout::types::Phase;

/// A fake command runner that:
/// - records every request it receives, in order
/// - succeeds unless the `(unit, phase)` pair was scripted to fail.
#[derive(Debug, Clone, Default)]
pub struct RecordingRunner {
    requests: Arc<Mutex<Vec<CommandRequest>>>,
    failures: Arc<Mutex<HashSet<(String, Phase)>>>,
    delay: Option<Duration>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on(self, unit: &str, phase: Phase) -> Self {
        self.failures
            .lock()
            .unwrap()
            .insert((unit.to_string(), phase));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn requests(&self) -> Vec<CommandRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// `(unit, phase)` pairs in the order they were requested.
    pub fn calls(&self) -> Vec<(String, Phase)> {
        self.requests()
            .into_iter()
            .map(|r| (r.unit, r.phase))
            .collect()
    }

    pub fn phases_for(&self, unit: &str) -> Vec<Phase> {
        self.requests()
            .into_iter()
            .filter(|r| r.unit == unit)
            .map(|r| r.phase)
            .collect()
    }

    /// Index of the first `(unit, phase)` request.
    pub fn position(&self, unit: &str, phase: Phase) -> Option<usize> {
        self.calls()
            .iter()
            .position(|(u, p)| u == unit && *p == phase)
    }
}

impl CommandRunner for RecordingRunner {
    fn run<'a>(&'a self, _ctx: &'a RunContext, request: CommandRequest) -> CommandFuture<'a> {
        Box::pin(async move {
            let key = (request.unit.clone(), request.phase);
            self.requests.lock().unwrap().push(request);

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            if self.failures.lock().unwrap().contains(&key) {
                return Err(anyhow!("{} of {} failed (scripted)", key.1, key.0));
            }
            Ok(())
        })
    }
}
