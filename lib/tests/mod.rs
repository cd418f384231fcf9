use crate::analysis::{
    self, AbortReason, Analysis, CancellationToken, ConditionOutcome, DfType, LongRangeSet,
    Options, OptionsBuilder, Status,
};
use crate::il::{self, BinaryOp, ControlFlowGraph};
use crate::{Error, StateMismatch};
use std::collections::BTreeMap;
use std::time::Duration;


fn analyze(cfg: &ControlFlowGraph) -> Analysis {
    analysis::analyze(cfg, &BTreeMap::new(), &Options::default(), None).unwrap()
}

/// i = 0; while (true) { i = i + 1; }
fn infinite_loop() -> ControlFlowGraph {
    let mut cfg = ControlFlowGraph::new();
    cfg.push(0); // 0
    cfg.store(il::local("i")); // 1
    cfg.load(il::local("i")); // 2
    cfg.push(1); // 3
    cfg.binary(BinaryOp::Add); // 4
    cfg.store(il::local("i")); // 5
    cfg.goto(2); // 6
    cfg
}

#[test]
fn ternary_merges_to_range() {
    // r = c ? 1 : -1;
    let mut cfg = ControlFlowGraph::new();
    cfg.load(il::local("c")); // 0
    cfg.conditional_goto(4, true); // 1
    cfg.push(-1); // 2
    cfg.goto(5); // 3
    cfg.push(1); // 4
    cfg.store(il::local("r")); // 5
    cfg.exit(); // 6

    let analysis = analyze(&cfg);
    assert_eq!(analysis.status(), Status::Complete);
    assert_eq!(
        analysis.state(6).unwrap().get(&il::local("r")),
        DfType::range(LongRangeSet::from_intervals(vec![(-1, -1), (1, 1)]))
    );
    assert_eq!(
        analysis.state(4).unwrap().get(&il::local("c")),
        DfType::bool(true)
    );
    assert_eq!(analysis.condition(1), Some(ConditionOutcome::Unknown));
}

#[test]
fn comparison_ternary_merges_to_range() {
    // r = x > 0 ? 1 : -1;
    let mut cfg = ControlFlowGraph::new();
    cfg.load(il::local("x")); // 0
    cfg.push(0); // 1
    cfg.binary(BinaryOp::Gt); // 2
    cfg.conditional_goto(6, true); // 3
    cfg.push(-1); // 4
    cfg.goto(7); // 5
    cfg.push(1); // 6
    cfg.store(il::local("r")); // 7
    cfg.exit(); // 8

    let analysis = analyze(&cfg);
    assert_eq!(analysis.status(), Status::Complete);
    assert_eq!(
        analysis.state(8).unwrap().get(&il::local("r")),
        DfType::range(LongRangeSet::from_intervals(vec![(-1, -1), (1, 1)]))
    );
    assert_eq!(
        analysis.state(6).unwrap().get(&il::local("x")),
        DfType::int_range(1, i64::MAX)
    );
    assert_eq!(
        analysis.state(4).unwrap().get(&il::local("x")),
        DfType::int_range(i64::MIN, 0)
    );
    assert_eq!(analysis.condition(3), Some(ConditionOutcome::Unknown));
}

#[test]
fn null_check_narrows() {
    // if (p == null) { ... } else { ... }
    let mut cfg = ControlFlowGraph::new();
    cfg.load(il::local("p")); // 0
    cfg.push_null(); // 1
    cfg.binary(BinaryOp::Eq); // 2
    cfg.conditional_goto(6, true); // 3
    cfg.nop(); // 4
    cfg.exit(); // 5
    cfg.exit(); // 6

    let mut initial = BTreeMap::new();
    initial.insert(il::local("p"), DfType::nullable());
    let analysis = analysis::analyze(&cfg, &initial, &Options::default(), None).unwrap();

    assert_eq!(
        analysis.state(4).unwrap().get(&il::local("p")),
        DfType::not_null()
    );
    assert_eq!(analysis.state(6).unwrap().get(&il::local("p")), DfType::null());
}

#[test]
fn dereference_makes_null_check_constant() {
    // p.f(); if (p == null) { unreachable }
    let mut cfg = ControlFlowGraph::new();
    cfg.load(il::local("p")); // 0
    cfg.dereference(); // 1
    cfg.pop(); // 2
    cfg.load(il::local("p")); // 3
    cfg.push_null(); // 4
    cfg.binary(BinaryOp::Eq); // 5
    cfg.conditional_goto(8, true); // 6
    cfg.exit(); // 7
    cfg.exit(); // 8

    let analysis = analyze(&cfg);
    assert_eq!(
        analysis.state(3).unwrap().get(&il::local("p")),
        DfType::not_null()
    );
    assert_eq!(analysis.condition(6), Some(ConditionOutcome::AlwaysFalse));
    assert_eq!(analysis.constant_conditions().get(&6), Some(&false));
    assert_eq!(analysis.unreachable(), vec![8]);
}

#[test]
fn infinite_loop_is_widened() {
    let analysis = analyze(&infinite_loop());

    assert_eq!(analysis.status(), Status::Complete);
    assert_eq!(analysis.state(2).unwrap().get(&il::local("i")), DfType::Top);
    assert!(analysis.unreachable().is_empty());

    // One pass over 0..=6, then at most one pass over the loop body 2..=6
    // per change of the header before widening, and one more to confirm.
    for widening_threshold in 1..4 {
        let options = OptionsBuilder::new()
            .widening_threshold(widening_threshold)
            .build();
        let analysis =
            analysis::analyze(&infinite_loop(), &BTreeMap::new(), &options, None).unwrap();
        assert_eq!(analysis.status(), Status::Complete);
        assert_eq!(analysis.state(2).unwrap().get(&il::local("i")), DfType::Top);
        assert!(analysis.steps() <= 7 + 5 * (widening_threshold + 1));
    }
}

#[test]
fn bounded_loop_exit_is_narrowed() {
    // for (i = 0; i < 10; i++) {}
    let mut cfg = ControlFlowGraph::new();
    cfg.push(0); // 0
    cfg.store(il::local("i")); // 1
    cfg.load(il::local("i")); // 2
    cfg.push(10); // 3
    cfg.binary(BinaryOp::Lt); // 4
    cfg.conditional_goto(11, false); // 5
    cfg.load(il::local("i")); // 6
    cfg.push(1); // 7
    cfg.binary(BinaryOp::Add); // 8
    cfg.store(il::local("i")); // 9
    cfg.goto(2); // 10
    cfg.exit(); // 11

    let analysis = analyze(&cfg);
    assert_eq!(analysis.status(), Status::Complete);
    assert_eq!(
        analysis.state(11).unwrap().get(&il::local("i")),
        DfType::int_range(10, i64::MAX)
    );
    assert_eq!(
        analysis.state(6).unwrap().get(&il::local("i")),
        DfType::int_range(i64::MIN, 9)
    );
}

#[test]
fn return_without_call_is_malformed() {
    let mut cfg = ControlFlowGraph::new();
    cfg.push(1); // 0
    cfg.return_(1); // 1

    let error = analysis::analyze(&cfg, &BTreeMap::new(), &Options::default(), None).unwrap_err();
    assert!(error.is_malformed());
    assert_eq!(error.offset(), Some(1));
    match error {
        Error::StateMismatch {
            mismatch: StateMismatch::EmptyCallStack,
            ..
        } => {}
        error => panic!("expected an empty call stack, got {:?}", error),
    }
}

#[test]
fn assignments_merge_to_range() {
    // if (?) x = 1; else x = 2;
    let mut cfg = ControlFlowGraph::new();
    cfg.push_unknown(); // 0
    cfg.conditional_goto(5, true); // 1
    cfg.push(1); // 2
    cfg.store(il::local("x")); // 3
    cfg.goto(7); // 4
    cfg.push(2); // 5
    cfg.store(il::local("x")); // 6
    cfg.exit(); // 7

    let analysis = analyze(&cfg);
    assert_eq!(
        analysis.state(7).unwrap().get(&il::local("x")),
        DfType::int_range(1, 2)
    );
}

#[test]
fn equal_slots_narrow_together() {
    // if (a == b) { if (a != b) { unreachable } }
    let mut cfg = ControlFlowGraph::new();
    cfg.load(il::local("a")); // 0
    cfg.load(il::local("b")); // 1
    cfg.binary(BinaryOp::Eq); // 2
    cfg.conditional_goto(9, false); // 3
    cfg.load(il::local("a")); // 4
    cfg.load(il::local("b")); // 5
    cfg.binary(BinaryOp::Ne); // 6
    cfg.conditional_goto(10, true); // 7
    cfg.exit(); // 8
    cfg.exit(); // 9
    cfg.exit(); // 10

    let analysis = analyze(&cfg);
    assert!(analysis
        .state(4)
        .unwrap()
        .are_equal(&il::local("a"), &il::local("b")));
    assert_eq!(analysis.condition(7), Some(ConditionOutcome::AlwaysFalse));
    assert_eq!(analysis.unreachable(), vec![10]);
}

#[test]
fn copies_share_null_checks() {
    // q = p; if (q != null) { p is not null }
    let mut cfg = ControlFlowGraph::new();
    cfg.load(il::local("p")); // 0
    cfg.store(il::local("q")); // 1
    cfg.load(il::local("q")); // 2
    cfg.push_null(); // 3
    cfg.binary(BinaryOp::Ne); // 4
    cfg.conditional_goto(7, false); // 5
    cfg.exit(); // 6
    cfg.exit(); // 7

    let analysis = analyze(&cfg);
    assert_eq!(
        analysis.state(6).unwrap().get(&il::local("p")),
        DfType::not_null()
    );
    assert_eq!(analysis.state(7).unwrap().get(&il::local("p")), DfType::null());
}

#[test]
fn initial_constraints_decide_conditions() {
    // if (x > 10) where x is in [0, 10]
    let mut cfg = ControlFlowGraph::new();
    cfg.load(il::local("x")); // 0
    cfg.push(10); // 1
    cfg.binary(BinaryOp::Gt); // 2
    cfg.conditional_goto(5, true); // 3
    cfg.exit(); // 4
    cfg.exit(); // 5

    let mut initial = BTreeMap::new();
    initial.insert(il::local("x"), DfType::int_range(0, 10));
    let analysis = analysis::analyze(&cfg, &initial, &Options::default(), None).unwrap();

    assert_eq!(analysis.condition(3), Some(ConditionOutcome::AlwaysFalse));
    assert_eq!(analysis.condition(2), None);
    assert_eq!(analysis.unreachable(), vec![5]);
}

#[test]
fn branch_on_int_slot_reaches_both_sides() {
    let mut cfg = ControlFlowGraph::new();
    cfg.load(il::local("x")); // 0
    cfg.conditional_goto(3, true); // 1
    cfg.exit(); // 2
    cfg.exit(); // 3

    let mut initial = BTreeMap::new();
    initial.insert(il::local("x"), DfType::int_range(0, 5));
    let analysis = analysis::analyze(&cfg, &initial, &Options::default(), None).unwrap();

    assert!(analysis.unreachable().is_empty());
    assert_eq!(analysis.condition(1), Some(ConditionOutcome::Unknown));
    assert_eq!(
        analysis.state(3).unwrap().get(&il::local("x")),
        DfType::int_range(0, 5)
    );
}

#[test]
fn dereference_of_int_slot_falls_through() {
    let mut cfg = ControlFlowGraph::new();
    cfg.load(il::local("x")); // 0
    cfg.dereference(); // 1
    cfg.pop(); // 2
    cfg.exit(); // 3

    let mut initial = BTreeMap::new();
    initial.insert(il::local("x"), DfType::int(3));
    let analysis = analysis::analyze(&cfg, &initial, &Options::default(), None).unwrap();

    assert!(analysis.unreachable().is_empty());
    assert_eq!(analysis.state(3).unwrap().get(&il::local("x")), DfType::int(3));
}

#[test]
fn copy_chains_share_null_checks() {
    // q = p; r = q; if (r != null) { p is not null }
    let mut cfg = ControlFlowGraph::new();
    cfg.load(il::local("p")); // 0
    cfg.store(il::local("q")); // 1
    cfg.load(il::local("q")); // 2
    cfg.store(il::local("r")); // 3
    cfg.load(il::local("r")); // 4
    cfg.push_null(); // 5
    cfg.binary(BinaryOp::Ne); // 6
    cfg.conditional_goto(9, false); // 7
    cfg.exit(); // 8
    cfg.exit(); // 9

    let analysis = analyze(&cfg);
    assert_eq!(
        analysis.state(8).unwrap().get(&il::local("p")),
        DfType::not_null()
    );
    assert_eq!(analysis.state(9).unwrap().get(&il::local("p")), DfType::null());
}

#[test]
fn dangling_target_is_rejected() {
    let mut cfg = ControlFlowGraph::new();
    cfg.push_unknown(); // 0
    cfg.conditional_goto(12, true); // 1
    cfg.exit(); // 2

    let error = analysis::analyze(&cfg, &BTreeMap::new(), &Options::default(), None).unwrap_err();
    assert!(error.is_malformed());
    assert_eq!(error.offset(), Some(1));
}

#[test]
fn cancelled_analysis_is_partial() {
    let cancel = CancellationToken::new();
    cancel.cancel();

    let analysis = analysis::analyze(
        &infinite_loop(),
        &BTreeMap::new(),
        &Options::default(),
        Some(&cancel),
    )
    .unwrap();
    assert_eq!(analysis.status(), Status::Aborted(AbortReason::Cancelled));
    assert!(analysis.state(0).is_some());
}

#[test]
fn step_limit_aborts() {
    let options = OptionsBuilder::new().max_steps(5).build();
    let analysis =
        analysis::analyze(&infinite_loop(), &BTreeMap::new(), &options, None).unwrap();

    assert_eq!(analysis.status(), Status::Aborted(AbortReason::StepLimit));
    assert_eq!(analysis.steps(), 5);
    assert!(analysis.state(4).is_some());
}

#[test]
fn time_budget_aborts() {
    let options = OptionsBuilder::new()
        .time_budget(Duration::from_secs(0))
        .build();
    let analysis =
        analysis::analyze(&infinite_loop(), &BTreeMap::new(), &options, None).unwrap();

    assert_eq!(analysis.status(), Status::Aborted(AbortReason::Timeout));
}

#[test]
fn analyze_json() {
    let json = r#"{
        "instructions": [
            {"offset": 0, "operation": {"Push": {"constant": {"Int": 1}}}},
            {"offset": 1, "operation": {"Store": {"slot": {"Local": "x"}}}, "comment": "x = 1"},
            {"offset": 2, "operation": "Exit"}
        ]
    }"#;
    let cfg = ControlFlowGraph::from_json(json).unwrap();
    assert_eq!(cfg.instruction(1).unwrap().comment(), Some("x = 1"));

    let analysis = analyze(&cfg);
    assert_eq!(analysis.state(2).unwrap().get(&il::local("x")), DfType::int(1));
}

#[cfg(feature = "thread_safe")]
#[test]
fn analyses_run_on_threads() {
    use std::sync::Arc;
    use std::thread;

    let cfg = Arc::new(infinite_loop());
    let cancel = CancellationToken::new();

    let handles = (0..4)
        .map(|i| {
            let cfg = cfg.clone();
            let cancel = cancel.clone();
            thread::spawn(move || {
                let cancel = if i == 0 { Some(&cancel) } else { None };
                analysis::analyze(&cfg, &BTreeMap::new(), &Options::default(), cancel)
                    .map(|analysis| analysis.state(2).cloned())
            })
        })
        .collect::<Vec<_>>();

    for handle in handles {
        let state = handle.join().unwrap().unwrap().unwrap();
        assert_eq!(state.get(&il::local("i")), DfType::Top);
    }
}
