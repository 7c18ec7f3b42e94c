use approx::assert_relative_eq;
use nalgebra::{Point2, Point3};
use proptest::prelude::*;
use sheetdfm::{
    BendLine, BendSequence, BendSimulator, CancellationToken, EngineConfig, EngineError, MaterialParams,
    SimulationOutcome,
    bend::allowance::{allowance_from_chord, bend_allowance, flat_length, neutral_chord},
    float_types::Real,
    pattern::Hole,
};
use std::sync::Arc;

mod support;

use crate::support::{FLANGE_R, FLANGE_T, approx_eq, flange_part, flange_top, params_for, plate, tab_on_base};

#[test]
fn flange_rises_to_its_formed_height() {
    let pattern = flange_part();
    let params = params_for(&pattern);
    let config = EngineConfig::default();
    let outcome = BendSimulator::new(&pattern, &params, &config)
        .simulate(&BendSequence::all(&pattern), &CancellationToken::new())
        .unwrap();
    assert!(outcome.aborted.is_none());
    assert_eq!(outcome.states.len(), 1);

    let state = &outcome.states[0];
    assert_eq!(state.motion.moving_faces.len(), 1);
    assert_relative_eq!(state.motion.radius, FLANGE_R);
    let flange = state.face_mesh(&outcome.model, state.motion.moving_faces[0]);
    assert!(approx_eq(flange.bounding_box().maxs.z, flange_top(&params), 1e-6));

    // the fixed side never moves
    let base = state.face_mesh(&outcome.model, state.motion.fixed_face);
    assert!(approx_eq(base.bounding_box().maxs.z, FLANGE_T, 1e-9));
    assert!(approx_eq(base.bounding_box().mins.z, 0.0, 1e-9));
}

#[test]
fn poses_interpolate_between_steps() {
    let pattern = flange_part();
    let params = params_for(&pattern);
    let config = EngineConfig::default();
    let outcome = BendSimulator::new(&pattern, &params, &config)
        .simulate(&BendSequence::all(&pattern), &CancellationToken::new())
        .unwrap();
    let state = &outcome.states[0];
    let before = outcome.poses_before(0);
    let face = state.motion.moving_faces[0];
    let probe = Point3::new(20.0, 55.0, 1.0);

    let start = state.pose_at(&before, face, 0.0) * probe;
    assert!((start - before[face] * probe).norm() < 1e-9);
    let end = state.pose_at(&before, face, 1.0) * probe;
    assert!((end - state.poses[face] * probe).norm() < 1e-9);
}

#[test]
fn rigid_motion_keeps_plate_volume() {
    let pattern = flange_part();
    let params = params_for(&pattern);
    let config = EngineConfig::default();
    let outcome = BendSimulator::new(&pattern, &params, &config)
        .simulate(&BendSequence::all(&pattern), &CancellationToken::new())
        .unwrap();
    let state = &outcome.states[0];
    for face in 0..outcome.model.face_count() {
        let flat = outcome.model.plate_mesh(face).volume();
        let formed = state.face_mesh(&outcome.model, face).volume();
        assert!(approx_eq(flat, formed, 1e-6), "face {face}: {flat} vs {formed}");
    }
}

#[test]
fn channel_folds_both_flanges_about_the_web() {
    let pattern = plate("channel", 40.0, 80.0, "mild-steel", FLANGE_T, "laser")
        .with_bend(BendLine::new("low", Point2::new(0.0, 20.0), Point2::new(40.0, 20.0), 90.0).with_radius(FLANGE_R))
        .with_bend(BendLine::new("high", Point2::new(0.0, 60.0), Point2::new(40.0, 60.0), 90.0).with_radius(FLANGE_R));
    let params = params_for(&pattern);
    let config = EngineConfig::default();
    let outcome = BendSimulator::new(&pattern, &params, &config)
        .simulate(&BendSequence::all(&pattern), &CancellationToken::new())
        .unwrap();
    assert_eq!(outcome.states.len(), 2);

    let web = outcome.model.partition().reference();
    assert_eq!(outcome.states[0].motion.fixed_face, web);
    assert_eq!(outcome.states[1].motion.fixed_face, web);

    let last = &outcome.states[1];
    for state in &outcome.states {
        let flange = state.motion.moving_faces[0];
        let mesh = last.face_mesh(&outcome.model, flange);
        assert!(approx_eq(mesh.bounding_box().maxs.z, flange_top(&params), 1e-6));
    }
}

#[test]
fn tab_bent_at_the_inside_corners_folds() {
    let pattern = tab_on_base();
    let params = params_for(&pattern);
    let config = EngineConfig::default();
    let outcome = BendSimulator::new(&pattern, &params, &config)
        .simulate(&BendSequence::all(&pattern), &CancellationToken::new())
        .unwrap();
    assert!(outcome.aborted.is_none());
    assert_eq!(outcome.states.len(), 1);

    let state = &outcome.states[0];
    let partition = outcome.model.partition();
    assert_eq!(state.motion.fixed_face, partition.reference());
    assert_eq!(state.motion.moving_faces.len(), 1);
    let tab = state.face_mesh(&outcome.model, state.motion.moving_faces[0]);
    assert!(approx_eq(tab.bounding_box().maxs.z, flange_top(&params), 1e-6));
    assert!(approx_eq(tab.bounding_box().mins.x, 25.0, 1e-6));
    assert!(approx_eq(tab.bounding_box().maxs.x, 75.0, 1e-6));
}

#[test]
fn unknown_bend_in_sequence_is_a_topology_error() {
    let pattern = flange_part();
    let params = params_for(&pattern);
    let config = EngineConfig::default();
    let err = BendSimulator::new(&pattern, &params, &config)
        .simulate(&BendSequence::new(["b1", "nope"]), &CancellationToken::new())
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidBendTopology { ref bend_id, .. } if bend_id == "nope"));
}

#[test]
fn bend_through_a_hole_aborts() {
    let pattern = plate("holed", 60.0, 60.0, "mild-steel", 1.5, "laser")
        .with_hole(Hole::new("window", sheetdfm::Ring::rectangle(20.0, 20.0, 20.0, 20.0).unwrap()))
        .with_bend(BendLine::new("b1", Point2::new(0.0, 30.0), Point2::new(60.0, 30.0), 90.0));
    let params = params_for(&pattern);
    let config = EngineConfig::default();
    let outcome = BendSimulator::new(&pattern, &params, &config)
        .simulate(&BendSequence::all(&pattern), &CancellationToken::new())
        .unwrap();
    assert!(outcome.states.is_empty());
    assert!(matches!(
        outcome.aborted,
        Some(EngineError::SimulationAborted { step: 0, ref bend_id, .. }) if bend_id == "b1"
    ));
}

#[test]
fn cancelled_simulation_stops() {
    let pattern = flange_part();
    let params = params_for(&pattern);
    let config = EngineConfig::default();
    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = BendSimulator::new(&pattern, &params, &config)
        .simulate(&BendSequence::all(&pattern), &cancel)
        .unwrap_err();
    assert_eq!(err, EngineError::Cancelled);
}

#[test]
fn flat_length_of_a_bracket() {
    // 1.5 mm mild steel, R = 1.5, K = 0.42: two 25 mm outside flanges meeting at 90 degrees
    let ba = bend_allowance(90.0, 1.5, 0.42, 1.5);
    let flat = flat_length(&[25.0, 25.0], &[(90.0, 1.5)], 0.42, 1.5);
    assert!(approx_eq(flat, 50.0 - (2.0 * 3.0 - ba), 1e-12));
}

fn fold_flange(angle: Real, radius: Real) -> (Arc<MaterialParams>, SimulationOutcome) {
    let pattern = plate("flange", 40.0, 60.0, "mild-steel", FLANGE_T, "laser")
        .with_bend(BendLine::new("b1", Point2::new(0.0, 40.0), Point2::new(40.0, 40.0), angle).with_radius(radius));
    let params = params_for(&pattern);
    let config = EngineConfig::default();
    let outcome = BendSimulator::new(&pattern, &params, &config)
        .simulate(&BendSequence::all(&pattern), &CancellationToken::new())
        .unwrap();
    (params, outcome)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn formed_flange_recovers_the_flat_length(angle in 20.0..160.0 as Real, radius in 0.5..8.0 as Real) {
        let (params, outcome) = fold_flange(angle, radius);
        let (k, t) = (params.k_factor, FLANGE_T);
        let state = &outcome.states[0];
        let before = outcome.poses_before(0);
        let flange = state.motion.moving_faces[0];
        let pose = state.pose_at(&before, flange, 1.0);

        // outside mold lines: the fixed bottom z = 0 and the flange's bottom face
        let tip = pose * Point3::new(20.0, 60.0, 0.0);
        let inner = pose * Point3::new(20.0, 50.0, 0.0);
        let along = tip - inner;
        let sharp = tip - along * (tip.z / along.z);
        let fixed_leg = sharp.y;
        let flange_leg = (tip - sharp).norm();
        let flat = flat_length(&[fixed_leg, flange_leg], &[(angle, radius)], k, t);
        prop_assert!((flat - 60.0).abs() < 1e-6, "recovered {flat} from {fixed_leg} + {flange_leg}");

        // the neutral layer keeps its length: its formed chord gives back BA
        let ba = bend_allowance(angle, radius, k, t);
        let z = t * (1.0 - k);
        let start = Point3::new(20.0, 40.0 - ba / 2.0, z);
        let end = pose * Point3::new(20.0, 40.0 + ba / 2.0, z);
        let recovered = allowance_from_chord((end - start).norm(), angle).unwrap();
        prop_assert!((recovered - ba).abs() < 1e-6);
        prop_assert!(((end - start).norm() - neutral_chord(angle, radius, k, t)).abs() < 1e-9);
    }
}
