//! Material & process parameter store.
//!
//! A [`MaterialCatalog`] is a versioned, immutable snapshot of material and
//! cutting-process reference data. Validation runs never see the catalog
//! itself: the host resolves one `(material, thickness, process)` triple with
//! [`MaterialCatalog::lookup`] and hands the resulting [`MaterialParams`] to
//! the engine behind an `Arc`. Updating reference data means building a new
//! catalog; in-flight runs keep the snapshot they were given.

use crate::errors::{EngineError, EngineResult};
use crate::float_types::Real;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

mod builtin;

pub use builtin::BUILTIN_CATALOG_VERSION;

/// Kinds of toleranced features a cutting/forming process has a capability for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FeatureKind {
    HoleDiameter,
    HolePosition,
    EdgeLength,
    FlangeLength,
    BendAngle,
}

impl FeatureKind {
    /// Unit the tolerance of this feature is expressed in.
    pub const fn unit(self) -> &'static str {
        match self {
            FeatureKind::BendAngle => "deg",
            _ => "mm",
        }
    }
}

/// One row of a K-factor table: `k_factor` applies for thicknesses in
/// `[min_thickness, max_thickness]` (inclusive, first matching band wins).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct KFactorBand {
    pub min_thickness: Real,
    pub max_thickness: Real,
    pub k_factor: Real,
}

impl KFactorBand {
    #[inline]
    pub fn contains(&self, thickness: Real) -> bool {
        thickness >= self.min_thickness && thickness <= self.max_thickness
    }
}

/// Minimum flange height `thickness_factor * t + radius_factor * R`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlangeRule {
    pub thickness_factor: Real,
    pub radius_factor: Real,
}

impl Default for FlangeRule {
    fn default() -> Self {
        Self {
            thickness_factor: 2.0,
            radius_factor: 1.0,
        }
    }
}

impl FlangeRule {
    #[inline]
    pub fn min_height(&self, thickness: Real, radius: Real) -> Real {
        self.thickness_factor * thickness + self.radius_factor * radius
    }
}

/// Immutable reference data for one sheet material.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    /// kg/m³
    pub density: Real,
    pub k_factor_bands: Vec<KFactorBand>,
    /// Minimum inside bend radius as a multiple of thickness.
    pub min_bend_radius_multiplier: Real,
    #[serde(default)]
    pub flange_rule: FlangeRule,
    /// °C
    pub max_process_temp_c: Real,
    #[serde(default)]
    pub grain_sensitive: bool,
}

impl Material {
    /// K-factor for `thickness`; `None` outside every band.
    pub fn k_factor(&self, thickness: Real) -> Option<Real> {
        self.k_factor_bands
            .iter()
            .find(|band| band.contains(thickness))
            .map(|band| band.k_factor)
    }

    /// Smallest and largest thickness covered by the K-factor table.
    pub fn thickness_range(&self) -> Option<(Real, Real)> {
        let min = self.k_factor_bands.iter().map(|b| b.min_thickness).reduce(Real::min)?;
        let max = self.k_factor_bands.iter().map(|b| b.max_thickness).reduce(Real::max)?;
        Some((min, max))
    }

    fn validate(&self) -> EngineResult<()> {
        let bad = |what: &str| Err(EngineError::Catalog(format!("material '{}': {what}", self.name)));
        if self.k_factor_bands.is_empty() {
            return bad("empty K-factor table");
        }
        for band in &self.k_factor_bands {
            if !(band.min_thickness.is_finite() && band.max_thickness.is_finite())
                || band.min_thickness <= 0.0
                || band.min_thickness > band.max_thickness
            {
                return bad("invalid thickness band");
            }
            if !(band.k_factor > 0.0 && band.k_factor < 1.0) {
                return bad("K-factor must lie in (0, 1)");
            }
        }
        if !(self.min_bend_radius_multiplier.is_finite() && self.min_bend_radius_multiplier >= 0.0) {
            return bad("minimum bend radius multiplier must be non-negative");
        }
        if !(self.density.is_finite() && self.density > 0.0) {
            return bad("density must be positive");
        }
        Ok(())
    }
}

/// Immutable reference data for one cutting process.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Process {
    pub name: String,
    /// mm
    pub kerf_width: Real,
    /// Achievable symmetric tolerance per feature kind (mm, or degrees for bend angles).
    #[serde(default)]
    pub capabilities: BTreeMap<FeatureKind, Real>,
}

impl Process {
    fn validate(&self) -> EngineResult<()> {
        if !(self.kerf_width.is_finite() && self.kerf_width >= 0.0) {
            return Err(EngineError::Catalog(format!(
                "process '{}': kerf width must be non-negative",
                self.name
            )));
        }
        if let Some((kind, _)) = self.capabilities.iter().find(|(_, v)| !(v.is_finite() && **v > 0.0)) {
            return Err(EngineError::Catalog(format!(
                "process '{}': capability for {kind:?} must be positive",
                self.name
            )));
        }
        Ok(())
    }
}

#[derive(Deserialize)]
struct RawCatalog {
    version: String,
    materials: Vec<Material>,
    processes: Vec<Process>,
}

/// Versioned, immutable snapshot of materials and processes.
///
/// Names are matched case-insensitively.
#[derive(Clone, Debug, PartialEq)]
pub struct MaterialCatalog {
    version: String,
    materials: BTreeMap<String, Material>,
    processes: BTreeMap<String, Process>,
}

#[inline]
fn key(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

impl MaterialCatalog {
    pub fn new(
        version: impl Into<String>,
        materials: Vec<Material>,
        processes: Vec<Process>,
    ) -> EngineResult<Self> {
        let mut catalog = MaterialCatalog {
            version: version.into(),
            materials: BTreeMap::new(),
            processes: BTreeMap::new(),
        };
        for material in materials {
            material.validate()?;
            if catalog.materials.insert(key(&material.name), material.clone()).is_some() {
                return Err(EngineError::Catalog(format!("duplicate material '{}'", material.name)));
            }
        }
        for process in processes {
            process.validate()?;
            if catalog.processes.insert(key(&process.name), process.clone()).is_some() {
                return Err(EngineError::Catalog(format!("duplicate process '{}'", process.name)));
            }
        }
        Ok(catalog)
    }

    /// Catalog shipped with the engine.
    pub fn builtin() -> Self {
        builtin::catalog()
    }

    /// Load a catalog from JSON: `{ "version", "materials": [...], "processes": [...] }`.
    pub fn from_json_str(source: &str) -> EngineResult<Self> {
        let raw: RawCatalog = serde_json::from_str(source).map_err(|e| EngineError::Catalog(e.to_string()))?;
        Self::new(raw.version, raw.materials, raw.processes)
    }

    #[inline]
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn material(&self, name: &str) -> Option<&Material> {
        self.materials.get(&key(name))
    }

    pub fn process(&self, name: &str) -> Option<&Process> {
        self.processes.get(&key(name))
    }

    pub fn materials(&self) -> impl Iterator<Item = &Material> {
        self.materials.values()
    }

    pub fn processes(&self) -> impl Iterator<Item = &Process> {
        self.processes.values()
    }

    /// Resolve the parameters for one run. Never extrapolates beyond the
    /// K-factor table.
    pub fn lookup(&self, material: &str, thickness: Real, process: &str) -> EngineResult<MaterialParams> {
        let mat = self
            .material(material)
            .ok_or_else(|| EngineError::UnknownMaterial(material.to_string()))?;
        let k_factor = if thickness.is_finite() && thickness > 0.0 {
            mat.k_factor(thickness)
        } else {
            None
        }
        .ok_or_else(|| EngineError::UnsupportedThicknessRange {
            material: mat.name.clone(),
            thickness,
        })?;
        let proc = self
            .process(process)
            .ok_or_else(|| EngineError::UnknownProcess(process.to_string()))?;

        tracing::debug!(material = %mat.name, thickness, process = %proc.name, k_factor, "resolved material parameters");

        Ok(MaterialParams {
            material: mat.name.clone(),
            process: proc.name.clone(),
            thickness,
            k_factor,
            min_bend_radius_multiplier: mat.min_bend_radius_multiplier,
            min_bend_radius: mat.min_bend_radius_multiplier * thickness,
            flange_rule: mat.flange_rule,
            kerf_width: proc.kerf_width,
            grain_sensitive: mat.grain_sensitive,
            density: mat.density,
            max_process_temp_c: mat.max_process_temp_c,
            capabilities: proc.capabilities.clone(),
            catalog_version: self.version.clone(),
        })
    }
}

/// Resolved constants for one `(material, thickness, process)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaterialParams {
    pub material: String,
    pub process: String,
    pub thickness: Real,
    pub k_factor: Real,
    pub min_bend_radius_multiplier: Real,
    /// Absolute minimum inside radius, `multiplier * thickness`.
    pub min_bend_radius: Real,
    pub flange_rule: FlangeRule,
    pub kerf_width: Real,
    pub grain_sensitive: bool,
    pub density: Real,
    pub max_process_temp_c: Real,
    pub capabilities: BTreeMap<FeatureKind, Real>,
    pub catalog_version: String,
}

impl MaterialParams {
    /// Inside radius used for a bend: the assigned one, else the material minimum.
    #[inline]
    pub fn effective_radius(&self, assigned: Option<Real>) -> Real {
        assigned.unwrap_or(self.min_bend_radius)
    }

    #[inline]
    pub fn min_flange_height(&self, radius: Real) -> Real {
        self.flange_rule.min_height(self.thickness, radius)
    }

    #[inline]
    pub fn capability(&self, kind: FeatureKind) -> Option<Real> {
        self.capabilities.get(&kind).copied()
    }
}
