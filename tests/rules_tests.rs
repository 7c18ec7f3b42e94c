use nalgebra::Point2;
use proptest::prelude::*;
use sheetdfm::{
    BendLine, BendSequence, CancellationToken, EngineConfig, FlatPattern, GeometryRef, Hole, Ring, RuleKind,
    Severity, Verdict,
    rules::{RuleContext, evaluate_rules},
};

mod support;

use crate::support::{params_for, plate};

/// 80 x 60 mild-steel blank, 1.5 mm, bent along y = 40.
fn bent_blank(radius: Option<f64>) -> FlatPattern {
    let bend = BendLine::new("b1", Point2::new(0.0, 40.0), Point2::new(80.0, 40.0), 90.0);
    let bend = match radius {
        Some(r) => bend.with_radius(r),
        None => bend,
    };
    plate("blank", 80.0, 60.0, "mild-steel", 1.5, "laser").with_bend(bend)
}

/// A pattern with something for most rules to say.
fn busy_pattern() -> FlatPattern {
    bent_blank(Some(1.0))
        .with_hole(Hole::new("near-bend", Ring::circle(Point2::new(40.0, 45.0), 3.0, 32).unwrap()))
        .with_hole(Hole::new("near-edge", Ring::circle(Point2::new(2.0, 20.0), 1.5, 32).unwrap()))
        .with_hole(Hole::new("pin", Ring::circle(Point2::new(60.0, 20.0), 0.5, 16).unwrap()))
}

fn run_all(pattern: &FlatPattern, rules: &[RuleKind]) -> Vec<sheetdfm::RuleResult> {
    let params = params_for(pattern);
    let config = EngineConfig::default();
    let ctx = RuleContext::new(pattern, &params, &config, None);
    evaluate_rules(&ctx, rules, &CancellationToken::new()).unwrap()
}

#[test]
fn radius_below_material_minimum_fails() {
    let pattern = bent_blank(Some(1.0));
    let params = params_for(&pattern);
    let report = sheetdfm::validate(&pattern, &params, &BendSequence::all(&pattern), &[], None).unwrap();

    let findings: Vec<_> = report.results_for(RuleKind::MinBendRadius).collect();
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].severity, Severity::Error);
    assert!(findings[0].references.contains(&GeometryRef::bend("b1")));
    assert!(findings[0].suggestion.as_deref().unwrap().contains(">= 1t"));
    assert_eq!(report.verdict(), Verdict::Fail);
}

#[test]
fn radius_at_material_minimum_passes() {
    let results = run_all(&bent_blank(Some(1.5)), &[RuleKind::MinBendRadius]);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].message, "passed");
}

#[test]
fn hole_close_to_bend_warns_with_its_id() {
    // the hole boundary sits 2 mm above the bend line, under 2t = 3 mm
    let pattern = bent_blank(None).with_hole(Hole::new("h1", Ring::circle(Point2::new(40.0, 45.0), 3.0, 32).unwrap()));
    let params = params_for(&pattern);
    let report = sheetdfm::validate(&pattern, &params, &BendSequence::all(&pattern), &[], None).unwrap();

    let findings: Vec<_> = report.results_for(RuleKind::HoleToBendClearance).collect();
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].severity, Severity::Warning);
    assert!(findings[0].references.contains(&GeometryRef::hole("h1")));
    assert!(findings[0].references.contains(&GeometryRef::bend("b1")));
    assert_eq!(report.verdict(), Verdict::Warn);
}

#[test]
fn optional_rules_follow_config() {
    let pattern = busy_pattern();
    let params = params_for(&pattern);
    let sequence = BendSequence::all(&pattern);

    let default = sheetdfm::validate(&pattern, &params, &sequence, &[], None).unwrap();
    assert_eq!(default.results_for(RuleKind::MinHoleDiameter).count(), 0);

    let mut config = EngineConfig::default();
    config.enabled_rules.insert(RuleKind::MinHoleDiameter);
    config.disabled_rules.insert(RuleKind::MinBendRadius);
    let report = sheetdfm::Engine::new(config)
        .unwrap()
        .validate(&pattern, &params, &sequence, &[], None)
        .unwrap();
    let small: Vec<_> = report.results_for(RuleKind::MinHoleDiameter).collect();
    assert_eq!(small.len(), 1);
    assert!(small[0].references.contains(&GeometryRef::hole("pin")));
    assert_eq!(report.results_for(RuleKind::MinBendRadius).count(), 0);
}

#[test]
fn every_rule_reports_in_registration_order() {
    let results = run_all(&busy_pattern(), &RuleKind::ALL);
    let order: Vec<RuleKind> = results.iter().map(|r| r.rule).collect();
    let mut sorted = order.clone();
    sorted.sort_by_key(|r| RuleKind::ALL.iter().position(|k| k == r));
    assert_eq!(order, sorted);
    for rule in RuleKind::ALL {
        assert!(order.contains(&rule), "{rule} reported nothing");
    }
}

#[test]
fn unrelated_features_do_not_change_a_rule() {
    let base = bent_blank(Some(1.0));
    let with_holes = busy_pattern();
    assert_eq!(
        run_all(&base, &[RuleKind::MinBendRadius]),
        run_all(&with_holes, &[RuleKind::MinBendRadius])
    );
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn any_rule_subset_matches_the_full_run(
        subset in proptest::sample::subsequence(RuleKind::ALL.to_vec(), 0..=RuleKind::ALL.len())
    ) {
        let pattern = busy_pattern();
        let full = run_all(&pattern, &RuleKind::ALL);
        let partial = run_all(&pattern, &subset);
        let expected: Vec<_> = full.into_iter().filter(|r| subset.contains(&r.rule)).collect();
        prop_assert_eq!(partial, expected);
    }
}
