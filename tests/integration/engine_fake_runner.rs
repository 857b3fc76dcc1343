// tests/integration/engine_fake_runner.rs

use std::sync::Arc;
use std::time::Duration;

use rollout::config::ConfigFile;
use rollout::dag::{RunContext, RunOptions};
use rollout::engine::{Engine, Operation};
use rollout::errors::RolloutError;
use rollout::types::{AppKind, Phase};
use rollout_test_utils::builders::{AppConfigBuilder, ConfigFileBuilder, InfraConfigBuilder};
use rollout_test_utils::fake_runner::RecordingRunner;
use rollout_test_utils::{init_tracing, with_timeout};

/// network <- cluster (infra); db <- api, db <- worker, backend -> {api, worker} (apps).
fn project() -> ConfigFile {
    ConfigFileBuilder::new()
        .with_project("acme", "dev")
        .with_tag("v2")
        .with_infra("network", InfraConfigBuilder::new().build())
        .with_infra("cluster", InfraConfigBuilder::new().depends_on("network").build())
        .with_app(
            "db",
            AppConfigBuilder::new(AppKind::Helm)
                .deploy_cmd("helm install {name}")
                .destroy_cmd("helm uninstall {name}")
                .build(),
        )
        .with_app("api", AppConfigBuilder::ecs().depends_on("db").build())
        .with_app(
            "worker",
            AppConfigBuilder::new(AppKind::Serverless)
                .depends_on("db")
                .build_cmd("never used")
                .deploy_cmd("sls deploy {name}")
                .destroy_cmd("sls remove {name}")
                .build(),
        )
        .with_app(
            "backend",
            AppConfigBuilder::new(AppKind::Alias)
                .depends_on("api")
                .depends_on("worker")
                .build(),
        )
        .build()
}

fn engine(runner: &RecordingRunner) -> Engine {
    Engine::new(&project(), Arc::new(runner.clone()))
}

fn before(runner: &RecordingRunner, first: (&str, Phase), second: (&str, Phase)) -> bool {
    match (runner.position(first.0, first.1), runner.position(second.0, second.1)) {
        (Some(a), Some(b)) => a < b,
        _ => false,
    }
}

#[tokio::test]
async fn test_deploy_all_runs_infra_then_apps_in_dependency_order() {
    init_tracing();
    let runner = RecordingRunner::new();
    let ctx = RunContext::new();

    with_timeout(engine(&runner).run_all(&ctx, Operation::Deploy))
        .await
        .unwrap();

    assert!(before(&runner, ("network", Phase::Deploy), ("cluster", Phase::Deploy)));
    assert!(before(&runner, ("cluster", Phase::Deploy), ("db", Phase::Deploy)));
    assert!(before(&runner, ("db", Phase::Deploy), ("api", Phase::Build)));
    assert!(before(&runner, ("db", Phase::Deploy), ("worker", Phase::Deploy)));

    assert_eq!(
        runner.phases_for("api"),
        vec![Phase::Build, Phase::Push, Phase::Deploy]
    );
    assert_eq!(runner.phases_for("worker"), vec![Phase::Deploy]);
    assert_eq!(runner.phases_for("db"), vec![Phase::Deploy]);
    assert!(runner.phases_for("backend").is_empty());
    assert_eq!(runner.requests().len(), 7);
}

#[tokio::test]
async fn test_destroy_all_runs_apps_then_infra_in_reverse_order() {
    init_tracing();
    let runner = RecordingRunner::new();
    let ctx = RunContext::new();

    with_timeout(engine(&runner).run_all(&ctx, Operation::Destroy))
        .await
        .unwrap();

    assert!(before(&runner, ("api", Phase::Destroy), ("db", Phase::Destroy)));
    assert!(before(&runner, ("worker", Phase::Destroy), ("db", Phase::Destroy)));
    assert!(before(&runner, ("db", Phase::Destroy), ("cluster", Phase::Destroy)));
    assert!(before(&runner, ("cluster", Phase::Destroy), ("network", Phase::Destroy)));
    assert!(runner.calls().iter().all(|(_, phase)| *phase == Phase::Destroy));
}

#[tokio::test]
async fn test_build_all_only_touches_apps_with_a_build_phase() {
    init_tracing();
    let runner = RecordingRunner::new();

    with_timeout(engine(&runner).run_all(&RunContext::new(), Operation::Build))
        .await
        .unwrap();

    assert_eq!(runner.calls(), vec![("api".to_string(), Phase::Build)]);
}

#[tokio::test]
async fn test_commands_are_rendered_with_project_values() {
    init_tracing();
    let runner = RecordingRunner::new();

    with_timeout(engine(&runner).run_unit(&RunContext::new(), Operation::Push, "api"))
        .await
        .unwrap();

    let requests = runner.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].command, "push api");
    assert_eq!(requests[0].env["NAMESPACE"], "acme");
    assert_eq!(requests[0].env["ENV"], "dev");
    assert_eq!(requests[0].env["TAG"], "v2");
    assert_eq!(requests[0].env["ROLLOUT_UNIT"], "api");
}

#[tokio::test]
async fn test_single_unit_deploy_ignores_dependencies() {
    init_tracing();
    let runner = RecordingRunner::new();

    with_timeout(engine(&runner).run_unit(&RunContext::new(), Operation::Deploy, "api"))
        .await
        .unwrap();

    assert_eq!(
        runner.calls(),
        vec![
            ("api".to_string(), Phase::Build),
            ("api".to_string(), Phase::Push),
            ("api".to_string(), Phase::Deploy),
        ]
    );
}

#[tokio::test]
async fn test_unknown_unit_is_reported() {
    let runner = RecordingRunner::new();

    let result = engine(&runner)
        .run_unit(&RunContext::new(), Operation::Deploy, "ghost")
        .await;

    assert!(matches!(result, Err(RolloutError::UnknownUnit(name)) if name == "ghost"));
    assert!(runner.requests().is_empty());
}

#[tokio::test]
async fn test_failed_phase_stops_the_unit_and_its_dependents() {
    init_tracing();
    let runner = RecordingRunner::new().fail_on("api", Phase::Push);

    let result = with_timeout(engine(&runner).run_all(&RunContext::new(), Operation::Deploy)).await;

    match result {
        Err(RolloutError::UnitFailed { unit, error }) => {
            assert_eq!(unit, "api");
            assert!(error.to_string().contains("push of api failed"));
        }
        other => panic!("expected UnitFailed, got {other:?}"),
    }

    assert_eq!(runner.phases_for("api"), vec![Phase::Build, Phase::Push]);
    assert_eq!(runner.phases_for("worker"), vec![Phase::Deploy]);
}

#[tokio::test]
async fn test_failed_infra_stage_skips_apps() {
    init_tracing();
    let runner = RecordingRunner::new().fail_on("network", Phase::Deploy);

    let result = with_timeout(engine(&runner).run_all(&RunContext::new(), Operation::Deploy)).await;

    assert!(matches!(result, Err(RolloutError::UnitFailed { ref unit, .. }) if unit == "network"));
    assert_eq!(runner.calls(), vec![("network".to_string(), Phase::Deploy)]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_engine_respects_max_concurrency_option() {
    init_tracing();
    let runner = RecordingRunner::new().with_delay(Duration::from_millis(10));
    let engine = engine(&runner).with_options(RunOptions {
        max_concurrency: Some(1),
        fail_stop: false,
    });

    with_timeout(engine.run_all(&RunContext::new(), Operation::Deploy))
        .await
        .unwrap();

    // Serialized: api and worker never interleave, so each app's phases are
    // contiguous in the request log.
    let calls = runner.calls();
    let api: Vec<usize> = calls
        .iter()
        .enumerate()
        .filter(|(_, (unit, _))| unit == "api")
        .map(|(i, _)| i)
        .collect();
    assert_eq!(api.len(), 3);
    assert_eq!(api[2] - api[0], 2);
}

#[tokio::test]
async fn test_plan_lists_stages_and_waves() {
    let runner = RecordingRunner::new();
    let engine = engine(&runner);

    let deploy = engine.plan(Operation::Deploy).unwrap();
    assert_eq!(deploy.len(), 2);
    assert_eq!(deploy[1].waves, vec![vec!["db"], vec!["api", "worker"], vec!["backend"]]);

    let destroy = engine.plan(Operation::Destroy).unwrap();
    assert_eq!(destroy[0].waves, vec![vec!["backend"], vec!["api", "worker"], vec!["db"]]);
    assert_eq!(destroy[1].waves, vec![vec!["cluster"], vec!["network"]]);

    let push = engine.plan(Operation::Push).unwrap();
    assert_eq!(push.len(), 1);
    assert!(runner.requests().is_empty());
}

#[tokio::test]
async fn test_cancelled_context_interrupts_the_operation() {
    let runner = RecordingRunner::new();
    let ctx = RunContext::new();
    ctx.cancel();

    let result = engine(&runner).run_all(&ctx, Operation::Deploy).await;

    assert!(matches!(result, Err(RolloutError::Interrupted)));
    assert!(runner.requests().is_empty());
}
