use pretty_assertions::assert_eq;

use fuse_ir::{parse_module, verify, ArgId, Function, Inst, InstClass, Type, Value, VerifyError};

use crate::config::{AbortPolicy, GuardScope, VectorizeConfig};
use crate::guard::UnsafeAliasing;
use crate::test_helpers::{at, b, func, TWO_ADDS};

use super::{run_on_function, vectorize_function, vectorize_module, FusionStats, VectorizeError};

fn scalar_adds(f: &Function) -> usize {
    f.live_insts()
        .filter(|&id| f.inst(id).class() == InstClass::BinaryAdd)
        .count()
}

fn vector_add_widths(f: &Function) -> Vec<u32> {
    f.live_insts()
        .filter_map(|id| {
            let data = f.inst(id);
            match (data.inst(), data.ty()) {
                (Inst::Binary { .. }, Type::Vector { lanes, .. }) => Some(lanes),
                _ => None,
            }
        })
        .collect()
}

fn run(f: &mut Function, config: &VectorizeConfig) -> FusionStats {
    vectorize_function(f, config).unwrap_or_else(|e| panic!("{e}"))
}

// ── Reference scenario ──────────────────────────────────────

#[test]
fn two_adds_before_call_become_one_vector_add() {
    let mut f = func(TWO_ADDS);

    let stats = run(&mut f, &VectorizeConfig::default());

    assert_eq!(
        f.to_string(),
        "\
fn @two_adds(%a: i32, %b: i32, %c: i32, %d: i32, %p: ptr, %q: ptr) {
entry:
  %_6 = insertelement <2 x i32> splat <2 x i32> 0, %a, 0
  %_7 = insertelement <2 x i32> splat <2 x i32> 0, %b, 0
  %_8 = insertelement <2 x i32> %_6, %c, 1
  %_9 = insertelement <2 x i32> %_7, %d, 1
  %_10 = add <2 x i32> %_8, %_9
  %_11 = extractelement <2 x i32> %_10, 0
  store %_11, %p
  %_13 = extractelement <2 x i32> %_10, 1
  store %_13, %q
  store %_11, %p
  store %_13, %q
  call void @f()
  ret
}
"
    );
    assert_eq!(
        stats,
        FusionStats {
            runs: 1,
            skipped_runs: 0,
            fused_groups: 1,
            vector_adds: 1,
            fused_adds: 2,
            rewired_uses: 2,
            duplicated_stores: 2,
        }
    );
    assert_eq!(verify(&f), Ok(()));
}

#[test]
fn host_contract_reports_success_without_rewrites() {
    let mut f = func(
        "\
fn @nothing(%a: i32, %p: ptr) {
entry:
  store %a, %p
  call void @f()
  ret
}
",
    );
    let before = f.clone();
    assert!(run_on_function(&mut f, &VectorizeConfig::default()));
    assert_eq!(f, before);
}

#[test]
fn each_run_is_fused_separately() {
    let mut f = func(
        "\
fn @runs(%a: i32, %b: i32) {
entry:
  %x = add i32 %a, %b
  %y = add i32 %b, %a
  call void @f(%x, %y)
  %z = add i32 %a, 1
  call void @g(%z)
  call void @h()
  %w = add i32 %a, 2
  ret %w
}
",
    );

    let stats = run(&mut f, &VectorizeConfig::default());

    assert_eq!(
        f.to_string(),
        "\
fn @runs(%a: i32, %b: i32) {
entry:
  %_8 = insertelement <2 x i32> splat <2 x i32> 0, %a, 0
  %_9 = insertelement <2 x i32> splat <2 x i32> 0, %b, 0
  %_10 = insertelement <2 x i32> %_8, %b, 1
  %_11 = insertelement <2 x i32> %_9, %a, 1
  %_12 = add <2 x i32> %_10, %_11
  %_13 = extractelement <2 x i32> %_12, 0
  %_14 = extractelement <2 x i32> %_12, 1
  call void @f(%_13, %_14)
  %_15 = insertelement <1 x i32> splat <1 x i32> 0, %a, 0
  %_16 = insertelement <1 x i32> splat <1 x i32> 0, 1, 0
  %_17 = add <1 x i32> %_15, %_16
  %_18 = extractelement <1 x i32> %_17, 0
  call void @g(%_18)
  call void @h()
  %w = add i32 %a, 2
  ret %w
}
"
    );
    assert_eq!(stats.runs, 2);
    assert_eq!(stats.fused_groups, 2);
    assert_eq!(stats.fused_adds, 3);
    assert_eq!(verify(&f), Ok(()));
}

#[test]
fn store_in_later_block_keeps_its_duplicate_in_fused_block() {
    let mut f = func(
        "\
fn @across(%a: i32, %b: i32, %p: ptr) {
first:
  %t1 = add i32 %a, %b
  %t2 = add i32 %b, %a
  call void @f(%t2)
second:
  store %t1, %p
  call void @g()
}
",
    );

    assert!(run_on_function(&mut f, &VectorizeConfig::default()));

    assert_eq!(
        f.to_string(),
        "\
fn @across(%a: i32, %b: i32, %p: ptr) {
first:
  %_5 = insertelement <2 x i32> splat <2 x i32> 0, %a, 0
  %_6 = insertelement <2 x i32> splat <2 x i32> 0, %b, 0
  %_7 = insertelement <2 x i32> %_5, %b, 1
  %_8 = insertelement <2 x i32> %_6, %a, 1
  %_9 = add <2 x i32> %_7, %_8
  %_10 = extractelement <2 x i32> %_9, 0
  store %_10, %p
  %_12 = extractelement <2 x i32> %_9, 1
  call void @f(%_12)
second:
  store %_10, %p
  call void @g()
}
"
    );
    assert_eq!(verify(&f), Ok(()));
}

#[test]
fn store_in_later_block_to_later_slot_is_not_duplicated() {
    let mut f = func(
        "\
fn @fresh(%a: i32, %b: i32) {
first:
  %t1 = add i32 %a, %b
  call void @f()
second:
  %slot = alloca i32
  store %t1, %slot
  call void @g(%slot)
}
",
    );

    let stats = run(&mut f, &VectorizeConfig::default());

    assert_eq!(stats.fused_adds, 1);
    assert_eq!(stats.rewired_uses, 1);
    assert_eq!(stats.duplicated_stores, 0);
    assert_eq!(verify(&f), Ok(()));
    assert!(run_on_function(&mut f, &VectorizeConfig::default()));
}

// ── Trailing runs ───────────────────────────────────────────

const TAIL: &str = "\
fn @tail(%a: i32, %p: ptr, %q: ptr, %r: ptr) {
entry:
  %x = add i32 %a, 1
  %y = add i32 %a, 2
  %z = add i32 %a, 3
  store %x, %p
  store %y, %q
  store %z, %r
}
";

#[test]
fn trailing_run_is_not_fused_by_default() {
    let mut f = func(TAIL);
    let before = f.clone();

    let stats = run(&mut f, &VectorizeConfig::default());

    assert_eq!(stats, FusionStats::default());
    assert_eq!(f, before);
}

#[test]
fn trailing_run_is_fused_when_flushed() {
    let mut f = func(TAIL);
    let config = VectorizeConfig {
        flush_trailing_run: true,
        ..VectorizeConfig::default()
    };

    let stats = run(&mut f, &config);

    assert_eq!(stats.fused_adds, 3);
    assert_eq!(stats.duplicated_stores, 3);
    assert_eq!(vector_add_widths(&f), vec![3]);
    assert_eq!(scalar_adds(&f), 0);
    assert_eq!(verify(&f), Ok(()));
}

// ── Aliasing guard and abort policy ─────────────────────────

const SECOND_BLOCK_ALIASES: &str = "\
fn @two_blocks(%a: i32, %b: i32, %p: ptr, %q: ptr) {
first:
  %x = add i32 %a, %b
  store %x, %p
  call void @f()
second:
  store %a, %q
  store %b, %q
  call void @g()
}
";

fn second_block_error(f: &Function) -> VectorizeError {
    VectorizeError::UnsafeAliasing(UnsafeAliasing {
        block: b(1),
        store: at(f, b(1), 1),
        dest: Value::Arg(ArgId::new(3)),
    })
}

#[test]
fn per_block_guard_keeps_earlier_rewrites() {
    let mut f = func(SECOND_BLOCK_ALIASES);
    let expected = second_block_error(&f);

    let result = vectorize_function(&mut f, &VectorizeConfig::default());

    assert_eq!(result, Err(expected));
    assert_eq!(scalar_adds(&f), 0, "first block was rewritten before the abort");
    assert_eq!(vector_add_widths(&f), vec![1]);
}

#[test]
fn function_guard_rejects_before_any_rewrite() {
    let mut f = func(SECOND_BLOCK_ALIASES);
    let before = f.clone();
    let config = VectorizeConfig {
        guard_scope: GuardScope::Function,
        ..VectorizeConfig::default()
    };

    assert_eq!(vectorize_function(&mut f, &config), Err(second_block_error(&before)));
    assert_eq!(f, before);
}

#[test]
fn rollback_restores_function_on_abort() {
    let mut f = func(SECOND_BLOCK_ALIASES);
    let before = f.clone();
    let config = VectorizeConfig {
        on_abort: AbortPolicy::Rollback,
        ..VectorizeConfig::default()
    };

    assert!(!run_on_function(&mut f, &config));
    assert_eq!(f, before);
}

#[test]
fn aliasing_in_first_block_blocks_everything() {
    let mut f = func(
        "\
fn @early(%a: i32, %p: ptr) {
entry:
  store %a, %p
  %x = add i32 %a, %a
  store %x, %p
  call void @f()
}
",
    );
    let before = f.clone();
    assert!(!run_on_function(&mut f, &VectorizeConfig::default()));
    assert_eq!(f, before);
}

// ── Early uses ──────────────────────────────────────────────

const CHAIN: &str = "\
fn @chain(%a: i32, %b: i32, %c: i32) {
entry:
  %t1 = add i32 %a, %b
  %t2 = add i32 %t1, %c
  call void @use(%t2)
}
";

#[test]
fn chained_additions_are_skipped() {
    let mut f = func(CHAIN);
    let before = f.clone();

    let stats = run(&mut f, &VectorizeConfig::default());

    assert_eq!(stats.runs, 1);
    assert_eq!(stats.skipped_runs, 1);
    assert_eq!(f, before);
}

#[test]
fn chained_additions_break_definition_order_when_allowed() {
    let mut f = func(CHAIN);
    let config = VectorizeConfig {
        require_uses_after_anchor: false,
        ..VectorizeConfig::default()
    };

    let stats = run(&mut f, &config);

    assert_eq!(stats.fused_adds, 2);
    let errors = verify(&f).err().unwrap_or_else(|| panic!("expected verifier errors"));
    assert!(errors
        .iter()
        .any(|e| matches!(e, VerifyError::UseBeforeDef { .. })));
}

// ── Width cap ───────────────────────────────────────────────

#[test]
fn max_width_splits_group_into_chunks() {
    let mut f = func(
        "\
fn @wide(%a: i32) {
entry:
  %t0 = add i32 %a, 0
  %t1 = add i32 %a, 1
  %t2 = add i32 %a, 2
  %t3 = add i32 %a, 3
  %t4 = add i32 %a, 4
  call void @use(%t0, %t1, %t2, %t3, %t4)
}
",
    );

    let stats = run(&mut f, &VectorizeConfig::with_max_width(2));

    assert_eq!(stats.fused_groups, 1);
    assert_eq!(stats.vector_adds, 3);
    assert_eq!(stats.fused_adds, 5);
    assert_eq!(vector_add_widths(&f), vec![2, 2, 1]);
    assert_eq!(verify(&f), Ok(()));
}

// ── Repeated runs ───────────────────────────────────────────

#[test]
fn second_run_changes_nothing() {
    let config = VectorizeConfig {
        duplicate_stores: false,
        ..VectorizeConfig::default()
    };
    let mut f = func(TWO_ADDS);
    run(&mut f, &config);
    let once = f.to_string();

    let stats = run(&mut f, &config);

    assert!(!stats.changed());
    assert_eq!(stats.runs, 1);
    assert_eq!(stats.skipped_runs, 1);
    assert_eq!(f.to_string(), once);
}

#[test]
fn duplicated_stores_trip_the_guard_on_a_second_run() {
    let mut f = func(TWO_ADDS);
    run(&mut f, &VectorizeConfig::default());
    let once = f.clone();

    assert!(!run_on_function(&mut f, &VectorizeConfig::default()));
    assert_eq!(f, once);
}

// ── Modules ─────────────────────────────────────────────────

#[test]
fn module_outcomes_are_independent() {
    let mut funcs = parse_module(&format!("{TWO_ADDS}{SECOND_BLOCK_ALIASES}"))
        .unwrap_or_else(|e| panic!("{e}"));
    let config = VectorizeConfig {
        guard_scope: GuardScope::Function,
        ..VectorizeConfig::default()
    };

    let report = vectorize_module(&mut funcs, &config);

    assert_eq!(report.outcomes.len(), 2);
    assert_eq!(report.outcomes[0].function, "two_adds");
    assert_eq!(report.totals().fused_adds, 2);
    let aborted: Vec<&str> = report.aborted().map(|o| o.function.as_str()).collect();
    assert_eq!(aborted, vec!["two_blocks"]);
    assert_eq!(scalar_adds(&funcs[1]), 1);
}

#[test]
fn stats_merge_and_display() {
    let mut total = FusionStats {
        runs: 2,
        fused_groups: 1,
        vector_adds: 1,
        fused_adds: 2,
        ..FusionStats::default()
    };
    total.merge(&FusionStats {
        runs: 1,
        skipped_runs: 1,
        ..FusionStats::default()
    });
    assert_eq!(
        total.to_string(),
        "3 runs (1 skipped), 1 groups fused: 2 scalar adds into 1 vector adds, \
         0 uses rewired, 0 stores duplicated"
    );
}
