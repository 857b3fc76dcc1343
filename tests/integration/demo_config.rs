// tests/integration/demo_config.rs

use std::path::PathBuf;
use std::sync::Arc;

use rollout::config::load_and_validate;
use rollout::engine::{Engine, Operation};
use rollout::exec::ShellRunner;
use rollout::types::Phase;

fn demo_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos/rollout.toml")
}

#[test]
fn test_demo_config_is_valid() {
    let cfg = load_and_validate(demo_path()).unwrap();
    assert_eq!(cfg.infra.len(), 2);
    assert_eq!(cfg.app.len(), 4);
    assert_eq!(cfg.project.max_concurrency, Some(4));
}

#[test]
fn test_demo_deploy_plan() {
    let cfg = load_and_validate(demo_path()).unwrap();
    let engine = Engine::new(&cfg, Arc::new(ShellRunner::new()));

    let stages = engine.plan(Operation::Deploy).unwrap();
    assert_eq!(stages.len(), 2);

    assert_eq!(stages[0].waves, vec![vec!["network"], vec!["cluster"]]);
    assert_eq!(stages[1].phases, &[Phase::Build, Phase::Push, Phase::Deploy]);
    assert_eq!(
        stages[1].waves,
        vec![vec!["db"], vec!["api", "worker"], vec!["backend"]]
    );
}

#[test]
fn test_demo_commands_are_rendered() {
    let cfg = load_and_validate(demo_path()).unwrap();
    let engine = Engine::new(&cfg, Arc::new(ShellRunner::new()));

    let api = engine.unit("api").unwrap();
    let build = api.request(Phase::Build).unwrap();
    assert_eq!(build.command, "echo docker build -t acme/api:v1 apps/api");
    assert_eq!(build.env["LOG_LEVEL"], "debug");
    assert_eq!(build.env["ROLLOUT_UNIT"], "api");

    let worker = engine.unit("worker").unwrap();
    assert!(worker.request(Phase::Build).is_none());
    assert_eq!(
        worker.request(Phase::Deploy).unwrap().command,
        "echo serverless deploy --stage dev --config functions/worker/serverless.yml"
    );
}

#[cfg(unix)]
#[tokio::test]
async fn test_demo_deploys_and_destroys_with_the_shell() {
    use rollout::dag::RunContext;
    use rollout_test_utils::{init_tracing, with_timeout};

    init_tracing();
    let cfg = load_and_validate(demo_path()).unwrap();
    let engine = Engine::new(&cfg, Arc::new(ShellRunner::new()));
    let ctx = RunContext::new();

    with_timeout(engine.run_all(&ctx, Operation::Deploy)).await.unwrap();
    with_timeout(engine.run_all(&ctx, Operation::Destroy)).await.unwrap();
}
