// src/dag/scheduler.rs

//! Concurrent, dependency-ordered execution of one callback per unit.
//!
//! The run starts by offering every extremity vertex. An offer launches the
//! vertex only if none of its predecessors is still at the blocking status;
//! otherwise the offer is dropped without being queued. When a callback
//! succeeds the vertex moves to the target status and its adjacent vertices
//! are offered in turn. The last predecessor to complete is therefore the
//! one whose offer finds an empty blocking set, which makes the run a
//! parallel topological sort with no explicit in-degree counter.
//!
//! A failed vertex never reaches the target status, so everything
//! downstream of it stays blocked forever. Independent branches keep running
//! unless [`RunOptions::fail_stop`] is set. A panicking callback counts as a
//! failure of its unit.
//!
//! A launched unit may still wait for a concurrency permit. If the run is
//! cancelled meanwhile, its callback is skipped and the vertex is released,
//! so it is reported as not started.

use std::any::Any;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use anyhow::anyhow;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::errors::{Result, RolloutError};
use crate::types::Direction;

use super::context::RunContext;
use super::graph::{Graph, Offer, UnitName, UnitSpec};
use super::traversal::TraversalConfig;

/// Tuning knobs for a single run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Upper bound on callbacks running at the same time. `None` = unbounded.
    pub max_concurrency: Option<usize>,
    /// Stop launching anything new after the first failure and cancel the
    /// run context handed to in-flight callbacks.
    pub fail_stop: bool,
}

/// What happened during a run.
#[derive(Debug)]
pub struct RunReport {
    pub direction: Direction,
    /// Units whose callback succeeded, in completion order.
    pub completed: Vec<UnitName>,
    /// Units whose callback returned an error, in completion order.
    pub failed: Vec<UnitName>,
    /// Units whose callback was never invoked.
    pub not_started: Vec<UnitName>,
    first_error: Option<RolloutError>,
    interrupted: bool,
}

impl RunReport {
    fn new(direction: Direction) -> Self {
        Self {
            direction,
            completed: Vec::new(),
            failed: Vec::new(),
            not_started: Vec::new(),
            first_error: None,
            interrupted: false,
        }
    }

    pub fn is_success(&self) -> bool {
        self.first_error.is_none() && !self.interrupted
    }

    /// The first callback error observed, if any.
    pub fn first_error(&self) -> Option<&RolloutError> {
        self.first_error.as_ref()
    }

    /// Whether the run context was cancelled before every unit was launched.
    pub fn was_interrupted(&self) -> bool {
        self.interrupted
    }

    pub fn into_result(self) -> Result<()> {
        if let Some(err) = self.first_error {
            return Err(err);
        }
        if self.interrupted {
            return Err(RolloutError::Interrupted);
        }
        Ok(())
    }
}

/// How a launched unit task ended.
enum Outcome {
    /// The callback ran and returned (or panicked, mapped to an error).
    Finished(anyhow::Result<()>),
    /// The run was cancelled before the unit got a concurrency permit.
    Skipped,
}

type InFlight = JoinSet<(UnitName, Outcome)>;

/// One scheduled run over a validated, acyclic graph.
#[derive(Debug)]
pub struct Scheduler {
    graph: Arc<Graph>,
    traversal: TraversalConfig,
    options: RunOptions,
}

impl Scheduler {
    /// Build the graph for `direction` and prove it acyclic.
    ///
    /// Fails before anything runs if a dependency names an unknown unit or
    /// if the graph has a cycle.
    pub fn new(
        units: &BTreeMap<UnitName, UnitSpec>,
        direction: Direction,
        options: RunOptions,
    ) -> Result<Self> {
        let traversal = TraversalConfig::for_direction(direction);
        let graph = Graph::from_units(units, traversal.initial_status)?;
        graph.detect_cycle()?;

        Ok(Self {
            graph: Arc::new(graph),
            traversal,
            options,
        })
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn traversal(&self) -> &TraversalConfig {
        &self.traversal
    }

    /// Walk the graph, invoking `callback` once per unit, and wait for every
    /// launched callback to finish.
    ///
    /// Callbacks receive a child of `ctx`: cancelling `ctx` is visible to
    /// them, while `fail_stop` only cancels the child.
    pub async fn run<F, Fut>(self, ctx: &RunContext, callback: F) -> RunReport
    where
        F: Fn(RunContext, UnitName) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let direction = self.traversal.direction;
        let permits = self
            .options
            .max_concurrency
            .unwrap_or(Semaphore::MAX_PERMITS)
            .clamp(1, Semaphore::MAX_PERMITS);

        let launcher = Launcher {
            graph: Arc::clone(&self.graph),
            traversal: self.traversal,
            callback: Arc::new(callback),
            limiter: Arc::new(Semaphore::new(permits)),
            ctx: ctx.child(),
            fail_stop: self.options.fail_stop,
        };

        let mut in_flight = InFlight::new();
        let mut report = RunReport::new(direction);

        let extremities = self.traversal.extremity_nodes(&self.graph);
        info!(
            %direction,
            units = self.graph.len(),
            ?extremities,
            max_concurrency = ?self.options.max_concurrency,
            fail_stop = self.options.fail_stop,
            "starting dependency-ordered run"
        );
        launcher.offer(extremities, &mut in_flight);

        while let Some(joined) = in_flight.join_next().await {
            let (unit, outcome) = match joined {
                Ok(done) => done,
                Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
                Err(err) => {
                    error!(error = %err, "unit task ended without reporting an outcome");
                    continue;
                }
            };

            let outcome = match outcome {
                Outcome::Finished(outcome) => outcome,
                Outcome::Skipped => {
                    debug!(unit = %unit, "run cancelled before the unit got a permit; skipped");
                    continue;
                }
            };

            match outcome {
                Ok(()) => {
                    info!(unit = %unit, %direction, "unit completed");
                    report.completed.push(unit.clone());

                    if launcher.ctx.is_cancelled() {
                        debug!(unit = %unit, "run cancelled; not offering adjacent units");
                        continue;
                    }
                    let next = self.traversal.adjacent_nodes(&self.graph, &unit);
                    launcher.offer(next, &mut in_flight);
                }
                Err(error) => {
                    warn!(
                        unit = %unit,
                        %direction,
                        error = %format!("{error:#}"),
                        "unit failed; units waiting on it will not run"
                    );
                    report.failed.push(unit.clone());
                    if report.first_error.is_none() {
                        report.first_error = Some(RolloutError::UnitFailed { unit, error });
                    }
                    if self.options.fail_stop {
                        // Usually already cancelled by the unit's own task.
                        info!("fail_stop set; cancelling the rest of the run");
                        launcher.ctx.cancel();
                    }
                }
            }
        }

        report.not_started = self.graph.not_launched();
        report.interrupted = launcher.ctx.is_cancelled() && !report.not_started.is_empty();

        info!(
            %direction,
            completed = report.completed.len(),
            failed = report.failed.len(),
            not_started = report.not_started.len(),
            "dependency-ordered run finished"
        );

        report
    }
}

/// Everything a launched unit task needs, shared across offers.
struct Launcher<F> {
    graph: Arc<Graph>,
    traversal: TraversalConfig,
    callback: Arc<F>,
    limiter: Arc<Semaphore>,
    ctx: RunContext,
    fail_stop: bool,
}

impl<F, Fut> Launcher<F>
where
    F: Fn(RunContext, UnitName) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    fn offer(&self, candidates: Vec<UnitName>, in_flight: &mut InFlight) {
        for unit in candidates {
            if self.ctx.is_cancelled() {
                debug!(unit = %unit, "run cancelled; dropping offer");
                continue;
            }

            match self.traversal.offer(&self.graph, &unit) {
                Ok(Offer::Launch) => {
                    debug!(unit = %unit, "predecessors done; launching");
                    in_flight.spawn(self.launch(unit));
                }
                Ok(Offer::Blocked(waiting_on)) => {
                    debug!(unit = %unit, ?waiting_on, "offer dropped; predecessors still outstanding");
                }
                Ok(Offer::AlreadyLaunched) => {
                    debug!(unit = %unit, "offer dropped; already launched");
                }
                Err(err) => {
                    warn!(unit = %unit, error = %err, "offer for unknown unit ignored");
                }
            }
        }
    }

    fn launch(&self, unit: UnitName) -> impl Future<Output = (UnitName, Outcome)> + Send + 'static {
        let graph = Arc::clone(&self.graph);
        let callback = Arc::clone(&self.callback);
        let limiter = Arc::clone(&self.limiter);
        let ctx = self.ctx.clone();
        let target = self.traversal.target_status;
        let fail_stop = self.fail_stop;

        async move {
            let _permit = match limiter.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    let err = anyhow!("concurrency limiter closed");
                    return (unit, Outcome::Finished(Err(err)));
                }
            };

            if ctx.is_cancelled() {
                graph.release(&unit);
                return (unit, Outcome::Skipped);
            }

            debug!(unit = %unit, "invoking unit callback");
            let outcome = match tokio::spawn((*callback)(ctx.clone(), unit.clone())).await {
                Ok(outcome) => outcome,
                Err(err) if err.is_panic() => Err(anyhow!(
                    "callback for '{unit}' panicked: {}",
                    panic_message(err.into_panic().as_ref())
                )),
                Err(err) => Err(anyhow!("callback for '{unit}' was aborted: {err}")),
            };

            match &outcome {
                // Written before the outcome reaches the driver, which then
                // offers the adjacent units.
                Ok(()) => {
                    if let Err(err) = graph.update_status(&unit, target) {
                        return (unit, Outcome::Finished(Err(err.into())));
                    }
                }
                // Cancel while still holding the permit, so no queued unit
                // can take it first.
                Err(_) if fail_stop => ctx.cancel(),
                Err(_) => {}
            }

            (unit, Outcome::Finished(outcome))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "non-string panic payload"
    }
}

/// Build the graph for `units`, check it for cycles, then run `callback` on
/// every unit in `direction` order. Returns the first callback error.
pub async fn run_in_dependency_order<F, Fut>(
    ctx: &RunContext,
    units: &BTreeMap<UnitName, UnitSpec>,
    direction: Direction,
    options: RunOptions,
    callback: F,
) -> Result<()>
where
    F: Fn(RunContext, UnitName) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Scheduler::new(units, direction, options)?
        .run(ctx, callback)
        .await
        .into_result()
}
