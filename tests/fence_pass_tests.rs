//! End-to-end tests for the fence insertion pass, driven through TIR.

use bumpalo::Bump;
use tsofence::core::{FenceError, FenceSession, IrAdaptor};
use tsofence::test_ir::{run_fence_pass, TestIR, TestIRAdaptor, TirRun};
use tsofence::tso::{
    AccessKind, FenceInsertionPass, ModuleState, PairKind, PairScope, PassConfig,
};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn parse(tir: &str) -> TestIR {
    init_logger();
    TestIR::parse(tir).unwrap_or_else(|e| panic!("Failed to parse TIR: {}", e))
}

fn run<'ir>(ir: &'ir TestIR, config: PassConfig) -> TirRun<'ir> {
    run_fence_pass(ir, config, &[]).unwrap()
}

/// Text of every instruction a fence was inserted before.
fn fenced_insts(run: &TirRun<'_>) -> Vec<String> {
    run.result
        .applied
        .iter()
        .map(|d| run.adaptor.inst_text(d.before))
        .collect()
}

const STORE_LOAD_STORE: &str = r#"
global @x

f() {
entry:
  %a = addr @x
  %v =
  store %a, %v
  %w = load %a
  store %a, %w
  terminate
}
"#;

#[test]
fn test_store_load_store_gets_one_fence() {
    let ir = parse(STORE_LOAD_STORE);
    let run = run(&ir, PassConfig::default());

    assert_eq!(run.result.state, ModuleState::Modified);
    assert!(!run.result.preserves_analyses());
    assert_eq!(fenced_insts(&run), vec!["store %a, %w"]);
    assert_eq!(run.result.applied[0].hazards, 2);

    let pairs: Vec<PairKind> = run.result.hazards.iter().map(|h| h.pair).collect();
    assert_eq!(pairs, vec![PairKind::WriteWrite, PairKind::ReadWrite]);

    let stats = &run.result.stats;
    assert_eq!(stats.functions_analyzed, 1);
    assert_eq!(stats.events_collected, 3);
    assert_eq!(stats.local_edges, 2);
    assert_eq!(stats.directives_planned, 1);
    assert_eq!(stats.fences_inserted, 1);
}

#[test]
fn test_disjoint_stack_slots_need_no_fence() {
    let ir = parse(
        r#"
global @g

f() {
entry:
  %s = alloca 4, 4
  %t = alloca 4, 4
  %u = alloca 4, 4
  %a = addr @g
  %x = load %s
  store %t, %x
  %y = load %a
  store %u, %y
  terminate
}
"#,
    );
    let run = run(&ir, PassConfig::default());

    assert!(run.result.applied.is_empty());
    assert!(run.result.hazards.is_empty());
    assert_eq!(run.result.state, ModuleState::Unmodified);
    assert!(run.result.preserves_analyses());
}

const TWO_THREADS: &str = r#"
global @g

f1() {
entry:
  %a = addr @g
  %v =
  store %a, %v
  %r = load %a
  terminate
}

f2() {
entry:
  %a = addr @g
  %v =
  store %a, %v
  %r = load %a
  terminate
}
"#;

#[test]
fn test_cross_function_hazards() {
    let ir = parse(TWO_THREADS);
    let run = run(&ir, PassConfig::default());

    // WW f1 store -> f2 store, RW f1 load -> f2 store, RR f1 load -> f2 load.
    assert_eq!(run.result.stats.cross_function_edges, 3);
    assert_eq!(run.result.stats.local_edges, 0);
    assert!(run.result.hazards.iter().all(|h| h.is_cross_function()));

    assert_eq!(fenced_insts(&run), vec!["store %a, %v", "%r = load %a"]);
    let f2 = run.adaptor.func_by_name("f2").unwrap();
    assert!(run.result.applied.iter().all(|d| d.func == f2));
}

#[test]
fn test_cross_function_with_relaxed_reads() {
    let ir = parse(TWO_THREADS);
    let run = run(&ir, PassConfig::default().with_read_read_hazards(false));

    assert_eq!(run.result.stats.cross_function_edges, 2);
    assert_eq!(fenced_insts(&run), vec!["store %a, %v"]);
}

#[test]
fn test_cross_function_step_can_be_disabled() {
    let ir = parse(TWO_THREADS);
    let run = run(&ir, PassConfig::default().with_cross_function(false));

    assert!(run.result.applied.is_empty());
    assert_eq!(run.result.state, ModuleState::Unmodified);
}

#[test]
fn test_local_accesses_stay_out_of_cross_function_step() {
    let template = |target: &str| {
        format!(
            r#"
global @g

f1() {{
entry:
  %s = alloca 4, 4
  %a = addr @g
  %v =
  store {}, %v
  terminate
}}

f2() {{
entry:
  %q =
  %v =
  store %q, %v
  terminate
}}
"#,
            target
        )
    };

    // %q is unresolved and may alias anything, but %s never leaves f1.
    let private = parse(&template("%s"));
    let run_private = run(&private, PassConfig::default());
    assert_eq!(run_private.result.stats.process_visible_events, 1);
    assert!(run_private.result.applied.is_empty());

    let shared = parse(&template("%a"));
    let run_shared = run(&shared, PassConfig::default());
    assert_eq!(fenced_insts(&run_shared), vec!["store %q, %v"]);
}

#[test]
fn test_long_range_hazard() {
    let ir = parse(
        r#"
global @a
global @b
global @c
global @d
global @e

f() {
entry:
  %pa = addr @a
  %pb = addr @b
  %pc = addr @c
  %pd = addr @d
  %pe = addr @e
  %v0 = load %pa
  store %pb, %v0
  store %pc, %v0
  %v3 = load %pd
  %v4 = load %pe
  store %pa, %v4
  terminate
}
"#,
    );
    let run = run(&ir, PassConfig::default());

    assert_eq!(run.result.hazards.len(), 1);
    let hazard = &run.result.hazards[0];
    assert_eq!(hazard.pair, PairKind::ReadWrite);
    assert_eq!((hazard.first_event, hazard.second_event), (0, 5));
    assert_eq!(fenced_insts(&run), vec!["store %pa, %v4"]);
    assert_eq!(run.result.stats.pairs_examined, 15);
}

#[test]
fn test_block_scope() {
    let ir = parse(
        r#"
global @g

f() {
entry:
  %a = addr @g
  %v = load %a
  br ^next
next:
  store %a, %v
  terminate
}
"#,
    );

    let whole = run(&ir, PassConfig::default());
    assert_eq!(fenced_insts(&whole), vec!["store %a, %v"]);

    let blocks = run(&ir, PassConfig::default().with_scope(PairScope::Block));
    assert!(blocks.result.applied.is_empty());
}

#[test]
fn test_rerun_on_fenced_output_is_noop() {
    let ir = parse(STORE_LOAD_STORE);
    let first = run(&ir, PassConfig::default());
    assert!(first.result.modified());

    let fenced = first.adaptor.fenced_ir().unwrap();
    let second = run(&fenced, PassConfig::default());

    assert_eq!(second.result.state, ModuleState::Unmodified);
    assert!(second.result.applied.is_empty());
    assert_eq!(second.result.already_fenced.len(), 1);
    assert_eq!(second.result.stats.fences_already_present, 1);
    assert_eq!(second.adaptor.fenced_ir().unwrap(), fenced);
}

#[test]
fn test_declarations_are_skipped() {
    let ir = parse(
        r#"
global @g

ext(%p)!

f(%p) {
entry:
  %a = addr @g
  %r = call @ext, %a
  terminate
}
"#,
    );
    let run = run(&ir, PassConfig::default());

    assert_eq!(run.result.stats.declarations_skipped, 1);
    assert_eq!(run.result.stats.functions_analyzed, 1);
    assert_eq!(run.result.stats.events_collected, 0);
    assert_eq!(run.result.state, ModuleState::Unmodified);
}

#[test]
fn test_missing_alias_info_leaves_function_unmodified() {
    let ir = parse(
        r#"
global @x

f() {
entry:
  %a = addr @x
  %w = load %a
  store %a, %w
  terminate
}

g() {
entry:
  %a = addr @x
  %w = load %a
  store %a, %w
  terminate
}
"#,
    );
    let config = PassConfig::default().with_cross_function(false);
    let run = run_fence_pass(&ir, config, &["f".to_string()]).unwrap();

    assert_eq!(run.result.skipped.len(), 1);
    assert!(matches!(
        &run.result.skipped[0],
        FenceError::OracleUnavailable { function } if function == "f"
    ));
    assert_eq!(run.result.stats.functions_skipped, 1);

    let g = run.adaptor.func_by_name("g").unwrap();
    assert_eq!(run.result.applied.len(), 1);
    assert_eq!(run.result.applied[0].func, g);
}

#[test]
fn test_unanalysed_function_stays_out_of_cross_function_step() {
    let ir = parse(
        r#"
global @x

g() {
entry:
  %a = addr @x
  %v =
  store %a, %v
  terminate
}

f() {
entry:
  %a = addr @x
  %w = load %a
  store %a, %w
  terminate
}
"#,
    );
    let run = run_fence_pass(&ir, PassConfig::default(), &["f".to_string()]).unwrap();

    let f = run.adaptor.func_by_name("f").unwrap();
    assert_eq!(run.result.skipped.len(), 1);
    assert_eq!(run.result.stats.cross_function_edges, 0);
    assert!(run.result.hazards.iter().all(|h| h.first_func != f && h.second_func != f));
    assert!(run.result.applied.iter().all(|d| d.func != f));
    assert!(run.events.iter().all(|e| e.func != "f"));
    assert_eq!(run.result.state, ModuleState::Unmodified);
}

#[test]
fn test_partially_overlapping_offsets_are_fenced() {
    let ir = parse(
        r#"
f() {
entry:
  %s = alloca 8, 4
  %q = offset %s, 2
  %v = load %s
  store %q, %v
  terminate
}
"#,
    );
    let run = run(&ir, PassConfig::default());

    assert_eq!(run.result.hazards.len(), 1);
    assert_eq!(run.result.hazards[0].pair, PairKind::ReadWrite);
    assert_eq!(fenced_insts(&run), vec!["store %q, %v"]);
}

#[test]
fn test_unresolved_location_is_conservative() {
    let ir = parse(
        r#"
f(%p) {
entry:
  %q = load %p
  %v =
  store %q, %v
  terminate
}
"#,
    );
    let run = run(&ir, PassConfig::default());

    assert_eq!(run.result.stats.unresolved_locations, 1);
    assert_eq!(fenced_insts(&run), vec!["store %q, %v"]);
    assert!(run.events.iter().any(|e| !e.resolved && e.process_visible));
}

#[test]
fn test_write_read_is_never_fenced() {
    let ir = parse(
        r#"
global @g

f() {
entry:
  %a = addr @g
  %v =
  store %a, %v
  %w = load %a
  terminate
}
"#,
    );
    let run = run(&ir, PassConfig::default());
    assert!(run.result.applied.is_empty());
}

#[test]
fn test_pass_api_directly() {
    let ir = parse(STORE_LOAD_STORE);
    let mut adaptor = TestIRAdaptor::new(&ir);
    let oracle = adaptor.alias_oracle();

    let arena = Bump::new();
    let session = FenceSession::new(&arena);
    let pass = FenceInsertionPass::new(&session);
    let result = pass.run(&mut adaptor, &oracle);

    assert!(result.modified());
    assert!(result.hazards.is_empty());
    assert!(result.events.is_empty());
    assert_eq!(result.stats, session.stats());

    let inserted: Vec<_> = adaptor.inserted_fences().collect();
    assert_eq!(inserted.len(), 1);
    assert!(adaptor.has_fence_before(inserted[0]));
}

#[test]
fn test_run_result_keeps_collected_events() {
    let ir = parse(STORE_LOAD_STORE);
    let mut adaptor = TestIRAdaptor::new(&ir);
    let oracle = adaptor.alias_oracle();

    let arena = Bump::new();
    let session = FenceSession::new(&arena);
    let config = PassConfig::default().with_keep_events(true);
    let result = FenceInsertionPass::with_config(&session, config).run(&mut adaptor, &oracle);

    let ids: Vec<u32> = result.events.iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![0, 1, 2]);
    let kinds: Vec<AccessKind> = result.events.iter().map(|e| e.kind).collect();
    assert_eq!(kinds, vec![AccessKind::Store, AccessKind::Load, AccessKind::Store]);
    assert!(result.events.iter().all(|e| e.resolved && e.visibility.is_process_visible()));
    assert_eq!(adaptor.inst_text(result.events[1].inst), "%w = load %a");
}
