//! Validation report: rule and collision results plus the overall verdict.
//!
//! A [`ValidationReport`] is built once at the end of a run and exposes its
//! contents through accessors only. Results are kept in a fixed order (rules
//! by registration order, collisions by step then tool id, then nest pairs,
//! then sheet bounds) so identical inputs serialize to identical bytes.

use crate::errors::{EngineError, EngineResult};
use crate::float_types::Real;
use crate::rules::RuleKind;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Version of the serialized report layout.
pub const SCHEMA_VERSION: &str = "dfm-report-1";

/// Version of the engine that produced a report.
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Overall outcome of a run that was evaluated successfully.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Pass,
    Warn,
    Fail,
}

impl Verdict {
    /// `fail` on any error, else `warn` on any warning, else `pass`.
    pub fn from_severities<I: IntoIterator<Item = Severity>>(severities: I) -> Verdict {
        match severities.into_iter().max() {
            Some(Severity::Error) => Verdict::Fail,
            Some(Severity::Warning) => Verdict::Warn,
            _ => Verdict::Pass,
        }
    }
}

/// Something a UI can highlight.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum GeometryRef {
    Point { x: Real, y: Real },
    Point3 { x: Real, y: Real, z: Real },
    /// Edge `index` of the outer ring (`"outer"`) or of the hole with that id.
    Edge { ring: String, index: usize },
    BendLine { id: String },
    Hole { id: String },
    SubFace { index: usize },
    Part { id: String },
    Tool { id: String },
    Step { index: usize },
}

impl GeometryRef {
    pub fn point(p: &nalgebra::Point2<Real>) -> Self {
        GeometryRef::Point { x: p.x, y: p.y }
    }

    pub fn point3(p: &nalgebra::Point3<Real>) -> Self {
        GeometryRef::Point3 { x: p.x, y: p.y, z: p.z }
    }

    pub fn bend(id: impl Into<String>) -> Self {
        GeometryRef::BendLine { id: id.into() }
    }

    pub fn hole(id: impl Into<String>) -> Self {
        GeometryRef::Hole { id: id.into() }
    }

    pub fn outer_edge(index: usize) -> Self {
        GeometryRef::Edge {
            ring: "outer".to_string(),
            index,
        }
    }

    /// Whether the reference pins down a location (and not only an entity).
    pub fn is_locatable(&self) -> bool {
        !matches!(self, GeometryRef::Part { .. } | GeometryRef::Tool { .. } | GeometryRef::Step { .. })
    }
}

/// Outcome of one rule on one finding.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RuleResult {
    pub rule: RuleKind,
    pub severity: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(default)]
    pub references: Vec<GeometryRef>,
}

impl RuleResult {
    pub fn new(rule: RuleKind, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            rule,
            severity,
            message: message.into(),
            suggestion: None,
            references: Vec::new(),
        }
    }

    pub fn info(rule: RuleKind, message: impl Into<String>) -> Self {
        Self::new(rule, Severity::Info, message)
    }

    /// The single result of a rule that found nothing.
    pub fn passed(rule: RuleKind) -> Self {
        Self::info(rule, "passed")
    }

    /// A rule that could not evaluate.
    pub fn skipped(rule: RuleKind, reason: impl std::fmt::Display) -> Self {
        Self::info(rule, format!("skipped - insufficient data: {reason}"))
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_reference(mut self, reference: GeometryRef) -> Self {
        self.references.push(reference);
        self
    }

    pub fn is_skipped(&self) -> bool {
        self.severity == Severity::Info && self.message.starts_with("skipped - insufficient data")
    }
}

/// What a collision result is about.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum CollisionSubject {
    Tooling {
        step: usize,
        bend_id: String,
        tool_id: String,
    },
    PartPair {
        part_a: String,
        part_b: String,
    },
    SheetBounds {
        part: String,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CollisionResult {
    pub subject: CollisionSubject,
    pub collided: bool,
    /// Smallest signed clearance found; negative is penetration. `None` when
    /// there was no geometry to measure.
    pub min_clearance: Option<Real>,
    pub severity: Severity,
    pub message: String,
    #[serde(default)]
    pub references: Vec<GeometryRef>,
}

impl CollisionResult {
    /// Classify a clearance: penetration is an error, anything under
    /// `margin` a warning.
    pub fn classify(clearance: Option<Real>, margin: Real) -> (bool, Severity) {
        match clearance {
            Some(d) if d < 0.0 => (true, Severity::Error),
            Some(d) if d < margin => (false, Severity::Warning),
            _ => (false, Severity::Info),
        }
    }

    pub fn step(&self) -> Option<usize> {
        match self.subject {
            CollisionSubject::Tooling { step, .. } => Some(step),
            _ => None,
        }
    }
}

/// The terminal artifact of a validation run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    schema_version: String,
    engine_version: String,
    input_hash: String,
    verdict: Verdict,
    rule_results: Vec<RuleResult>,
    collision_results: Vec<CollisionResult>,
    simulated_steps: usize,
}

impl ValidationReport {
    pub(crate) fn new(
        input_hash: String,
        rule_results: Vec<RuleResult>,
        collision_results: Vec<CollisionResult>,
        simulated_steps: usize,
    ) -> Self {
        let verdict = Verdict::from_severities(
            rule_results
                .iter()
                .map(|r| r.severity)
                .chain(collision_results.iter().map(|c| c.severity)),
        );
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            engine_version: ENGINE_VERSION.to_string(),
            input_hash,
            verdict,
            rule_results,
            collision_results,
            simulated_steps,
        }
    }

    pub fn schema_version(&self) -> &str {
        &self.schema_version
    }

    pub fn engine_version(&self) -> &str {
        &self.engine_version
    }

    /// SHA-256 (hex) of the canonical JSON of every input of the run.
    pub fn input_hash(&self) -> &str {
        &self.input_hash
    }

    pub fn verdict(&self) -> Verdict {
        self.verdict
    }

    pub fn rule_results(&self) -> &[RuleResult] {
        &self.rule_results
    }

    pub fn collision_results(&self) -> &[CollisionResult] {
        &self.collision_results
    }

    pub fn simulated_steps(&self) -> usize {
        self.simulated_steps
    }

    /// Results produced by one rule, in report order.
    pub fn results_for(&self, rule: RuleKind) -> impl Iterator<Item = &RuleResult> {
        self.rule_results.iter().filter(move |r| r.rule == rule)
    }

    /// First colliding (step, tool) pair, or the first colliding nest entry
    /// when no tooling collision was found.
    pub fn first_collision(&self) -> Option<&CollisionResult> {
        self.collision_results.iter().find(|c| c.collided)
    }

    /// Canonical compact JSON of the report.
    pub fn to_json(&self) -> EngineResult<String> {
        serde_json::to_string(self).map_err(|e| EngineError::Serialization(e.to_string()))
    }

    pub fn to_json_pretty(&self) -> EngineResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| EngineError::Serialization(e.to_string()))
    }

    pub fn from_json(source: &str) -> EngineResult<Self> {
        serde_json::from_str(source).map_err(|e| EngineError::Serialization(e.to_string()))
    }
}

/// SHA-256 (lowercase hex) of the compact JSON encoding of `value`.
pub fn content_hash<T: Serialize + ?Sized>(value: &T) -> EngineResult<String> {
    let bytes = serde_json::to_vec(value).map_err(|e| EngineError::Serialization(e.to_string()))?;
    let digest = Sha256::digest(&bytes);
    Ok(digest.iter().map(|b| format!("{b:02x}")).collect())
}
