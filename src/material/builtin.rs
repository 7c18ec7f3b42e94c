//! Reference data shipped with the engine.
//!
//! K-factors follow the usual air-bending tables (the neutral axis moves
//! toward the centre of the sheet as thickness grows); minimum radii are the
//! conservative shop values for bending across the grain.

use super::{FeatureKind, FlangeRule, KFactorBand, Material, MaterialCatalog, Process, key};
use crate::float_types::Real;
use std::collections::BTreeMap;

pub const BUILTIN_CATALOG_VERSION: &str = "builtin-1";

fn bands(rows: &[(Real, Real, Real)]) -> Vec<KFactorBand> {
    rows.iter()
        .map(|&(min_thickness, max_thickness, k_factor)| KFactorBand {
            min_thickness,
            max_thickness,
            k_factor,
        })
        .collect()
}

fn capabilities(rows: &[(FeatureKind, Real)]) -> BTreeMap<FeatureKind, Real> {
    rows.iter().copied().collect()
}

fn materials() -> Vec<Material> {
    vec![
        Material {
            name: "mild-steel".into(),
            density: 7850.0,
            k_factor_bands: bands(&[(0.4, 1.0, 0.38), (1.0, 3.0, 0.42), (3.0, 12.0, 0.45)]),
            min_bend_radius_multiplier: 1.0,
            flange_rule: FlangeRule::default(),
            max_process_temp_c: 450.0,
            grain_sensitive: false,
        },
        Material {
            name: "stainless-304".into(),
            density: 8000.0,
            k_factor_bands: bands(&[(0.4, 1.0, 0.40), (1.0, 3.0, 0.44), (3.0, 10.0, 0.47)]),
            min_bend_radius_multiplier: 1.5,
            flange_rule: FlangeRule::default(),
            max_process_temp_c: 870.0,
            grain_sensitive: false,
        },
        Material {
            name: "aluminum-5052".into(),
            density: 2680.0,
            k_factor_bands: bands(&[(0.5, 1.6, 0.40), (1.6, 3.2, 0.43), (3.2, 8.0, 0.45)]),
            min_bend_radius_multiplier: 1.0,
            flange_rule: FlangeRule::default(),
            max_process_temp_c: 150.0,
            grain_sensitive: true,
        },
        Material {
            name: "aluminum-6061-t6".into(),
            density: 2700.0,
            k_factor_bands: bands(&[(0.5, 1.6, 0.42), (1.6, 3.2, 0.45), (3.2, 6.35, 0.47)]),
            min_bend_radius_multiplier: 2.5,
            flange_rule: FlangeRule {
                thickness_factor: 2.5,
                radius_factor: 1.0,
            },
            max_process_temp_c: 150.0,
            grain_sensitive: true,
        },
    ]
}

fn processes() -> Vec<Process> {
    use FeatureKind::*;
    vec![
        Process {
            name: "laser".into(),
            kerf_width: 0.2,
            capabilities: capabilities(&[
                (HoleDiameter, 0.05),
                (HolePosition, 0.1),
                (EdgeLength, 0.1),
                (FlangeLength, 0.25),
                (BendAngle, 1.0),
            ]),
        },
        Process {
            name: "plasma".into(),
            kerf_width: 1.5,
            capabilities: capabilities(&[
                (HoleDiameter, 0.5),
                (HolePosition, 0.5),
                (EdgeLength, 0.5),
                (FlangeLength, 0.5),
                (BendAngle, 1.0),
            ]),
        },
        Process {
            name: "waterjet".into(),
            kerf_width: 0.9,
            capabilities: capabilities(&[
                (HoleDiameter, 0.1),
                (HolePosition, 0.15),
                (EdgeLength, 0.15),
                (FlangeLength, 0.25),
                (BendAngle, 1.0),
            ]),
        },
        Process {
            name: "router".into(),
            kerf_width: 3.175,
            capabilities: capabilities(&[
                (HoleDiameter, 0.1),
                (HolePosition, 0.15),
                (EdgeLength, 0.15),
                (FlangeLength, 0.3),
                (BendAngle, 1.0),
            ]),
        },
    ]
}

pub(super) fn catalog() -> MaterialCatalog {
    MaterialCatalog {
        version: BUILTIN_CATALOG_VERSION.to_string(),
        materials: materials().into_iter().map(|m| (key(&m.name), m)).collect(),
        processes: processes().into_iter().map(|p| (key(&p.name), p)).collect(),
    }
}
