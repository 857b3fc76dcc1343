use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::anyhow;
use rollout::dag::{RunContext, UnitName};

pub type CallbackFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;

/// One callback invocation, with logical timestamps from a shared clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub unit: UnitName,
    pub started: u64,
    pub finished: u64,
    pub ok: bool,
}

impl Span {
    pub fn overlaps(&self, other: &Span) -> bool {
        self.started < other.finished && other.started < self.finished
    }
}

#[derive(Debug, Default)]
struct Script {
    default_delay: Duration,
    delays: HashMap<UnitName, Duration>,
    failures: HashSet<UnitName>,
    until_cancelled: HashSet<UnitName>,
}

#[derive(Debug, Default)]
struct Inner {
    clock: AtomicU64,
    running: AtomicUsize,
    peak: AtomicUsize,
    started: Mutex<Vec<UnitName>>,
    spans: Mutex<Vec<Span>>,
    script: Mutex<Script>,
}

/// Scheduler callback that records when each unit ran.
///
/// Per-unit delays and failures are scripted up front; the callback returned
/// by [`CallbackRecorder::callback`] shares state with the recorder, so
/// assertions can be made after the run.
#[derive(Debug, Clone, Default)]
pub struct CallbackRecorder {
    inner: Arc<Inner>,
}

impl CallbackRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay applied to units without their own delay.
    pub fn with_default_delay(self, delay: Duration) -> Self {
        self.inner.script.lock().unwrap().default_delay = delay;
        self
    }

    pub fn with_delay(self, unit: &str, delay: Duration) -> Self {
        self.inner
            .script
            .lock()
            .unwrap()
            .delays
            .insert(unit.to_string(), delay);
        self
    }

    /// Make `unit`'s callback return an error (after its delay).
    pub fn failing(self, unit: &str) -> Self {
        self.inner
            .script
            .lock()
            .unwrap()
            .failures
            .insert(unit.to_string());
        self
    }

    /// Make `unit`'s callback block until its run context is cancelled, then
    /// fail.
    pub fn until_cancelled(self, unit: &str) -> Self {
        self.inner
            .script
            .lock()
            .unwrap()
            .until_cancelled
            .insert(unit.to_string());
        self
    }

    pub fn callback(
        &self,
    ) -> impl Fn(RunContext, UnitName) -> CallbackFuture + Send + Sync + 'static {
        let inner = Arc::clone(&self.inner);
        move |ctx: RunContext, unit: UnitName| -> CallbackFuture {
            let inner = Arc::clone(&inner);
            Box::pin(async move { inner.invoke(ctx, unit).await })
        }
    }

    /// Units in the order their callbacks started.
    pub fn started(&self) -> Vec<UnitName> {
        self.inner.started.lock().unwrap().clone()
    }

    /// Every finished invocation, in finishing order.
    pub fn spans(&self) -> Vec<Span> {
        self.inner.spans.lock().unwrap().clone()
    }

    pub fn span(&self, unit: &str) -> Option<Span> {
        self.spans().into_iter().find(|s| s.unit == unit)
    }

    /// Successfully finished units, in finishing order.
    pub fn completed(&self) -> Vec<UnitName> {
        self.spans()
            .into_iter()
            .filter(|s| s.ok)
            .map(|s| s.unit)
            .collect()
    }

    pub fn invocations(&self, unit: &str) -> usize {
        self.started().iter().filter(|u| *u == unit).count()
    }

    pub fn total_invocations(&self) -> usize {
        self.started().len()
    }

    /// `first` finished before `second` started.
    pub fn finished_before(&self, first: &str, second: &str) -> bool {
        match (self.span(first), self.span(second)) {
            (Some(a), Some(b)) => a.finished < b.started,
            _ => false,
        }
    }

    pub fn peak_concurrency(&self) -> usize {
        self.inner.peak.load(Ordering::SeqCst)
    }
}

impl Inner {
    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::SeqCst)
    }

    async fn invoke(&self, ctx: RunContext, unit: UnitName) -> anyhow::Result<()> {
        let (delay, fails, wait_for_cancel) = {
            let script = self.script.lock().unwrap();
            (
                script.delays.get(&unit).copied().unwrap_or(script.default_delay),
                script.failures.contains(&unit),
                script.until_cancelled.contains(&unit),
            )
        };

        let started = self.tick();
        self.started.lock().unwrap().push(unit.clone());
        let now_running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now_running, Ordering::SeqCst);

        if wait_for_cancel {
            ctx.cancelled().await;
        } else if delay.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(delay).await;
        }

        self.running.fetch_sub(1, Ordering::SeqCst);
        let ok = !fails && !wait_for_cancel;
        let finished = self.tick();
        self.spans.lock().unwrap().push(Span {
            unit: unit.clone(),
            started,
            finished,
            ok,
        });

        if wait_for_cancel {
            Err(anyhow!("{unit} cancelled"))
        } else if fails {
            Err(anyhow!("{unit} failed"))
        } else {
            Ok(())
        }
    }
}
