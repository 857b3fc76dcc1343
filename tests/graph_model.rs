use std::error::Error;

use rollout::dag::{Adjacency, Graph, Offer, Status, DEPLOY, DESTROY};
use rollout::errors::RolloutError;
use rollout_test_utils::builders::{UnitSetBuilder, diamond};

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn add_edge_mirrors_dependencies_and_dependents() -> TestResult {
    let graph = Graph::new();
    graph.add_vertex("api", Status::Pending);
    graph.add_vertex("db", Status::Pending);

    graph.add_edge("api", "db")?;

    let api = graph.vertex("api").expect("api vertex");
    let db = graph.vertex("db").expect("db vertex");
    assert!(api.dependencies.contains("db"));
    assert!(api.dependents.is_empty());
    assert!(db.dependents.contains("api"));
    assert!(db.dependencies.is_empty());
    Ok(())
}

#[test]
fn add_edge_twice_is_a_noop() -> TestResult {
    let graph = Graph::new();
    graph.add_vertex("a", Status::Pending);
    graph.add_vertex("b", Status::Pending);

    graph.add_edge("a", "b")?;
    graph.add_edge("a", "b")?;

    assert_eq!(graph.vertex("a").unwrap().dependencies.len(), 1);
    assert_eq!(graph.vertex("b").unwrap().dependents.len(), 1);
    Ok(())
}

#[test]
fn add_vertex_keeps_existing_vertex() {
    let graph = Graph::new();
    assert!(graph.add_vertex("a", Status::Pending));
    assert!(!graph.add_vertex("a", Status::Active));
    assert_eq!(graph.status_of("a"), Some(Status::Pending));
    assert_eq!(graph.len(), 1);
}

#[test]
fn add_edge_with_missing_endpoint_is_unknown_unit() {
    let graph = Graph::new();
    graph.add_vertex("a", Status::Pending);

    match graph.add_edge("a", "ghost") {
        Err(RolloutError::UnknownUnit(name)) => assert_eq!(name, "ghost"),
        other => panic!("expected UnknownUnit, got {other:?}"),
    }
    match graph.add_edge("ghost", "a") {
        Err(RolloutError::UnknownUnit(name)) => assert_eq!(name, "ghost"),
        other => panic!("expected UnknownUnit, got {other:?}"),
    }
}

#[test]
fn from_units_rejects_unknown_dependency_with_config_error() {
    let units = UnitSetBuilder::new().unit("api", &["db"]).build();

    match Graph::from_units(&units, Status::Pending) {
        Err(RolloutError::ConfigError(msg)) => {
            assert!(msg.contains("api"), "{msg}");
            assert!(msg.contains("db"), "{msg}");
        }
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn leaves_and_roots_of_a_diamond() -> TestResult {
    let graph = Graph::from_units(&diamond(), Status::Pending)?;

    assert_eq!(graph.leaves(), vec!["A".to_string()]);
    assert_eq!(graph.roots(), vec!["D".to_string()]);
    assert_eq!(DEPLOY.extremity_nodes(&graph), vec!["A".to_string()]);
    assert_eq!(DESTROY.extremity_nodes(&graph), vec!["D".to_string()]);
    Ok(())
}

#[test]
fn filter_by_status_tracks_status_updates() -> TestResult {
    let graph = Graph::from_units(&diamond(), Status::Pending)?;

    let blocking = graph.filter_by_status("D", Adjacency::Dependencies, Status::Pending);
    assert_eq!(blocking, vec!["B".to_string(), "C".to_string()]);

    graph.update_status("B", Status::Active)?;
    assert_eq!(DEPLOY.blocking_neighbors(&graph, "D"), vec!["C".to_string()]);

    graph.update_status("C", Status::Active)?;
    assert!(DEPLOY.blocking_neighbors(&graph, "D").is_empty());
    Ok(())
}

#[test]
fn update_status_of_unknown_vertex_fails() {
    let graph = Graph::new();
    assert!(matches!(
        graph.update_status("nope", Status::Active),
        Err(RolloutError::UnknownUnit(_))
    ));
}

#[test]
fn offer_launches_a_ready_vertex_exactly_once() -> TestResult {
    let graph = Graph::from_units(&diamond(), Status::Pending)?;

    assert_eq!(
        DEPLOY.offer(&graph, "D")?,
        Offer::Blocked(vec!["B".to_string(), "C".to_string()])
    );

    graph.update_status("B", Status::Active)?;
    graph.update_status("C", Status::Active)?;

    assert_eq!(DEPLOY.offer(&graph, "D")?, Offer::Launch);
    assert_eq!(DEPLOY.offer(&graph, "D")?, Offer::AlreadyLaunched);
    assert!(!graph.not_launched().contains(&"D".to_string()));
    Ok(())
}

#[test]
fn destroy_offer_waits_for_dependents() -> TestResult {
    let graph = Graph::from_units(&diamond(), Status::Active)?;

    assert_eq!(
        DESTROY.offer(&graph, "A")?,
        Offer::Blocked(vec!["B".to_string(), "C".to_string()])
    );
    assert_eq!(DESTROY.offer(&graph, "D")?, Offer::Launch);
    assert_eq!(DESTROY.adjacent_nodes(&graph, "D"), vec!["B".to_string(), "C".to_string()]);
    Ok(())
}
