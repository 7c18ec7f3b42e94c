use nalgebra::Point2;
use proptest::prelude::*;
use sheetdfm::{
    BendLine, BendSequence, CancellationToken, CollisionSubject, Engine, EngineConfig, EngineError,
    NestPlacement, Severity, SheetNest, ToolProfile, Verdict,
    collision::check_nest,
    float_types::Real,
};
use std::sync::Arc;

mod support;

use crate::support::{
    FLANGE_R, FLANGE_T, approx_eq, block_above, block_above_flange, flange_part, flanged_plate, params_for, plate,
    square_pair_nest,
};

fn flange_clearance(gap: Real) -> sheetdfm::CollisionResult {
    let pattern = flange_part();
    let params = params_for(&pattern);
    let tool = block_above_flange(&params, gap);
    let report = sheetdfm::validate(&pattern, &params, &BendSequence::all(&pattern), &[tool], None).unwrap();
    assert_eq!(report.collision_results().len(), 1);
    report.collision_results()[0].clone()
}

#[test]
fn tool_clear_of_the_formed_flange_passes() {
    let pattern = flange_part();
    let params = params_for(&pattern);
    let tool = block_above_flange(&params, 1.0);
    let report = sheetdfm::validate(&pattern, &params, &BendSequence::all(&pattern), &[tool], None).unwrap();

    let result = &report.collision_results()[0];
    assert!(!result.collided);
    assert_eq!(result.severity, Severity::Info);
    assert!(approx_eq(result.min_clearance.unwrap(), 1.0, 1e-4));
    assert!(matches!(
        &result.subject,
        CollisionSubject::Tooling { step: 0, bend_id, tool_id } if bend_id == "b1" && tool_id == "upper"
    ));
    assert_eq!(report.verdict(), Verdict::Pass);
}

#[test]
fn near_miss_warns() {
    let result = flange_clearance(0.2);
    assert!(!result.collided);
    assert_eq!(result.severity, Severity::Warning);
}

#[test]
fn tool_inside_the_flange_path_collides() {
    let pattern = flange_part();
    let params = params_for(&pattern);
    let tool = block_above_flange(&params, -0.5);
    let report = sheetdfm::validate(&pattern, &params, &BendSequence::all(&pattern), &[tool], None).unwrap();

    let result = report.first_collision().unwrap();
    assert!(result.collided);
    assert_eq!(result.severity, Severity::Error);
    assert!(approx_eq(result.min_clearance.unwrap(), -0.5, 1e-4));
    assert_eq!(result.step(), Some(0));
    assert_eq!(report.verdict(), Verdict::Fail);
}

#[test]
fn capped_sweep_of_a_long_flange_is_not_trusted() {
    // the tip of a 1100 mm flange travels about 1730 mm: a 0.2 mm kerf asks
    // for some 8600 samples, far over the default cap of 720
    let pattern = flanged_plate(1200.0, 1100.0);
    let params = params_for(&pattern);
    let tools = [block_above(&params, 1100.0, 1.0)];
    let sequence = BendSequence::all(&pattern);

    let report = sheetdfm::validate(&pattern, &params, &sequence, &tools, None).unwrap();
    let capped = &report.collision_results()[0];
    assert!(!capped.collided);
    assert!(approx_eq(capped.min_clearance.unwrap(), 1.0, 1e-4));
    // 1 mm clears the 0.5 mm margin but not the ~2.4 mm between samples
    assert_eq!(capped.severity, Severity::Warning);
    assert!(capped.message.contains("sampling capped at 720 samples"));

    let config = EngineConfig {
        max_sweep_samples: 10_000,
        ..Default::default()
    };
    let report = Engine::new(config).unwrap().validate(&pattern, &params, &sequence, &tools, None).unwrap();
    let fine = &report.collision_results()[0];
    assert!(approx_eq(fine.min_clearance.unwrap(), 1.0, 1e-4));
    assert_eq!(fine.severity, Severity::Info);
    assert!(!fine.message.contains("capped"));
}

#[test]
fn sweep_results_are_ordered_by_step_then_tool() {
    let pattern = plate("channel", 40.0, 80.0, "mild-steel", FLANGE_T, "laser")
        .with_bend(BendLine::new("low", Point2::new(0.0, 20.0), Point2::new(40.0, 20.0), 90.0).with_radius(FLANGE_R))
        .with_bend(BendLine::new("high", Point2::new(0.0, 60.0), Point2::new(40.0, 60.0), 90.0).with_radius(FLANGE_R));
    let params = params_for(&pattern);
    let tools = vec![
        Arc::new(ToolProfile::backgauge("zeta", -120.0, 20.0, 10.0, 30.0)),
        Arc::new(ToolProfile::backgauge("alpha", -150.0, 20.0, 10.0, 30.0)),
    ];
    let report = sheetdfm::validate(&pattern, &params, &BendSequence::all(&pattern), &tools, None).unwrap();

    let order: Vec<(usize, String)> = report
        .collision_results()
        .iter()
        .map(|c| match &c.subject {
            CollisionSubject::Tooling { step, tool_id, .. } => (*step, tool_id.clone()),
            other => panic!("unexpected subject {other:?}"),
        })
        .collect();
    assert_eq!(
        order,
        vec![
            (0, "alpha".to_string()),
            (0, "zeta".to_string()),
            (1, "alpha".to_string()),
            (1, "zeta".to_string()),
        ]
    );
    assert!(report.collision_results().iter().all(|c| !c.collided));
}

#[test]
fn overlapping_nest_pair_is_reported_once() {
    let pattern = flange_part();
    let params = params_for(&pattern);
    let nest = square_pair_nest(50.0, 0.05);
    let report =
        sheetdfm::validate(&pattern, &params, &BendSequence::all(&pattern), &[], Some(&nest)).unwrap();

    assert_eq!(report.collision_results().len(), 1);
    let result = &report.collision_results()[0];
    assert!(matches!(
        &result.subject,
        CollisionSubject::PartPair { part_a, part_b } if part_a == "a" && part_b == "b"
    ));
    assert!(result.collided);
    assert!(approx_eq(result.min_clearance.unwrap(), -0.05, 1e-6));
    assert_eq!(report.verdict(), Verdict::Fail);
}

#[test]
fn touching_parts_do_not_collide() {
    let nest = square_pair_nest(50.0, 0.0);
    let results = check_nest(&nest, &EngineConfig::default(), &CancellationToken::new()).unwrap();
    assert!(results.is_empty());
}

#[test]
fn part_off_the_sheet_is_reported() {
    let square = plate("sq", 30.0, 30.0, "mild-steel", 1.5, "laser");
    let nest = SheetNest::new(100.0, 100.0).with_placement(NestPlacement::new("edge", square, 80.0, 10.0, 0.0));
    let results = check_nest(&nest, &EngineConfig::default(), &CancellationToken::new()).unwrap();
    assert_eq!(results.len(), 1);
    assert!(matches!(&results[0].subject, CollisionSubject::SheetBounds { part } if part == "edge"));
    assert!(approx_eq(results[0].min_clearance.unwrap(), -10.0, 1e-9));
}

fn grid_nest(n: usize, pitch: Real) -> SheetNest {
    let square = plate("sq", 10.0, 10.0, "mild-steel", 1.5, "laser");
    (0..n * n).fold(SheetNest::new(n as Real * pitch + 10.0, n as Real * pitch + 10.0), |nest, i| {
        let (x, y) = ((i % n) as Real * pitch, (i / n) as Real * pitch);
        nest.with_placement(NestPlacement::new(format!("p{i:02}"), square.clone(), x, y, 0.0))
    })
}

#[test]
fn indexed_broad_phase_matches_pairwise() {
    let nest = grid_nest(6, 10.5);
    let naive = EngineConfig {
        nest_min_spacing: 1.0,
        nest_index_threshold: 1000,
        ..Default::default()
    };
    let indexed = EngineConfig {
        nest_index_threshold: 4,
        ..naive.clone()
    };
    let cancel = CancellationToken::new();
    let a = check_nest(&nest, &naive, &cancel).unwrap();
    let b = check_nest(&nest, &indexed, &cancel).unwrap();
    assert!(!a.is_empty());
    assert!(a.iter().all(|r| r.severity == Severity::Warning));
    assert_eq!(a, b);
}

#[test]
fn cancelled_nest_check_returns_no_results() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = check_nest(&grid_nest(3, 12.0), &EngineConfig::default(), &cancel).unwrap_err();
    assert_eq!(err, EngineError::Cancelled);
}

#[test]
fn die_standoff_sets_the_flat_clearance() {
    let pattern = flange_part();
    let params = params_for(&pattern);
    let die = Arc::new(ToolProfile::die("vdie", 60.0, 12.0, 10.0, 20.0, 0.75));
    let report = sheetdfm::validate(&pattern, &params, &BendSequence::all(&pattern), &[die], None).unwrap();
    let result = &report.collision_results()[0];
    // the flat flange passes 0.75 mm over the die shoulder at the start of the step
    assert!(approx_eq(result.min_clearance.unwrap(), 0.75, 1e-4));
    assert!(result.references.contains(&sheetdfm::GeometryRef::Tool { id: "vdie".to_string() }));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    #[test]
    fn clearance_grows_with_tool_distance(gap in 0.0..4.0 as Real, extra in 0.1..3.0 as Real) {
        let near = flange_clearance(gap).min_clearance.unwrap();
        let far = flange_clearance(gap + extra).min_clearance.unwrap();
        prop_assert!(far > near);
        prop_assert!((far - near - extra).abs() < 1e-4);
    }
}
