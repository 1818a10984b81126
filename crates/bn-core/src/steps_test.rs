use super::*;

fn pipeline() -> StepGraph {
    StepGraph::build(&[
        StepSpec::new("clean", &[]),
        StepSpec::new("dedup", &["clean"]),
        StepSpec::new("fusion", &["dedup"]),
        StepSpec::new("revenue", &["fusion"]),
        StepSpec::new("zscore", &["fusion"]),
        StepSpec::new("report", &["revenue", "zscore"]),
        StepSpec::new("archive-logs", &["report"]).always(),
    ])
    .unwrap()
}

#[test]
fn test_topological_order() {
    let graph = pipeline();
    let order = graph.topological_order().unwrap();
    let pos = |name: &str| order.iter().position(|n| n == name).unwrap();

    assert!(pos("clean") < pos("dedup"));
    assert!(pos("dedup") < pos("fusion"));
    assert!(pos("fusion") < pos("revenue"));
    assert!(pos("fusion") < pos("zscore"));
    assert!(pos("revenue") < pos("report"));
    assert!(pos("zscore") < pos("report"));
    assert!(pos("report") < pos("archive-logs"));
}

#[test]
fn test_levels_put_parallel_branches_together() {
    let levels = pipeline().levels().unwrap();
    assert_eq!(levels.len(), 6);
    assert_eq!(levels[0], vec!["clean"]);
    assert_eq!(levels[3], vec!["revenue", "zscore"]);
    assert_eq!(levels[5], vec!["archive-logs"]);
}

#[test]
fn test_dependencies() {
    let graph = pipeline();
    assert_eq!(graph.dependencies("report"), vec!["revenue", "zscore"]);
    assert_eq!(graph.dependencies("revenue"), vec!["fusion"]);
    assert!(graph.dependencies("clean").is_empty());
    assert!(graph.dependencies("missing").is_empty());
}

#[test]
fn test_cycle_detected() {
    let err = StepGraph::build(&[StepSpec::new("a", &["b"]), StepSpec::new("b", &["a"])])
        .unwrap_err();
    match err {
        CoreError::CircularDependency { cycle } => {
            assert!(cycle.contains("a"));
            assert!(cycle.contains("b"));
        }
        other => panic!("expected cycle error, got {other}"),
    }
}

#[test]
fn test_cycle_path_skips_side_loops() {
    let mut graph = StepGraph::new();
    for name in ["a", "b", "c", "d", "e"] {
        graph.add_step(name, Trigger::AllSuccess).unwrap();
    }
    // b <-> c is the cycle; b -> d <-> e is a loop that never returns to b
    graph.add_dependency("b", "a").unwrap();
    graph.add_dependency("c", "b").unwrap();
    graph.add_dependency("b", "c").unwrap();
    graph.add_dependency("d", "b").unwrap();
    graph.add_dependency("e", "d").unwrap();
    graph.add_dependency("d", "e").unwrap();

    assert_eq!(graph.find_cycle_path(graph.node_map["b"]), "b -> c -> b");
    assert_eq!(graph.find_cycle_path(graph.node_map["a"]), "cycle involving a");
}

#[test]
fn test_reported_cycle_is_closed() {
    let specs = [
        StepSpec::new("start", &[]),
        StepSpec::new("b", &["start", "c"]),
        StepSpec::new("c", &["b"]),
        StepSpec::new("d", &["b", "e"]),
        StepSpec::new("e", &["d"]),
    ];
    let CoreError::CircularDependency { cycle } = StepGraph::build(&specs).unwrap_err() else {
        panic!("expected cycle error");
    };
    let steps: Vec<&str> = cycle.split(" -> ").collect();
    assert!(steps.len() >= 3, "{cycle}");
    assert_eq!(steps.first(), steps.last(), "{cycle}");
    for pair in steps.windows(2) {
        let to = specs.iter().find(|s| s.name == pair[1]).unwrap();
        assert!(to.after.iter().any(|a| a == pair[0]), "{cycle}");
    }
}

#[test]
fn test_unknown_dependency_rejected() {
    let err = StepGraph::build(&[StepSpec::new("a", &["ghost"])]).unwrap_err();
    assert!(matches!(err, CoreError::UnknownStep { .. }));
}

#[test]
fn test_duplicate_step_rejected() {
    let err = StepGraph::build(&[StepSpec::new("a", &[]), StepSpec::new("a", &[])]).unwrap_err();
    assert!(matches!(err, CoreError::DuplicateStep { .. }));
}

#[test]
fn test_ready_all_success() {
    let graph = pipeline();
    let mut outcomes = HashMap::new();
    assert!(graph.ready("clean", &outcomes));
    assert!(!graph.ready("dedup", &outcomes));

    outcomes.insert("clean".to_string(), StepStatus::Failed);
    assert!(!graph.ready("dedup", &outcomes));

    outcomes.insert("clean".to_string(), StepStatus::Success);
    assert!(graph.ready("dedup", &outcomes));
}

#[test]
fn test_ready_all_done_runs_after_failure() {
    let graph = pipeline();
    let mut outcomes = HashMap::new();
    assert!(!graph.ready("archive-logs", &outcomes));

    outcomes.insert("report".to_string(), StepStatus::Skipped);
    assert_eq!(graph.trigger("archive-logs"), Trigger::AllDone);
    assert!(graph.ready("archive-logs", &outcomes));
}
