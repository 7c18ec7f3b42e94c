//! Engine configuration.
//!
//! A plain parameter object any host can fill in, deserialize from JSON or
//! TOML, or take as [`EngineConfig::default`]. It is serialized into the
//! content hash of every report, so two runs only compare equal when they
//! were made with the same settings.

use crate::errors::{EngineError, EngineResult};
use crate::float_types::{DEFAULT_EPSILON, Real};
use crate::rules::RuleKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Coincidence tolerance shared by every geometric decision, in mm.
    pub epsilon: Real,
    /// Tool clearance below which a (step, tool) pair is a near-miss warning, in mm.
    pub safety_margin: Real,
    /// Lower bound on angular sub-samples per bend sweep.
    pub min_sweep_samples: usize,
    /// Upper bound on angular sub-samples per bend sweep.
    pub max_sweep_samples: usize,
    /// Sweep step length used when the cutting process reports no kerf, in mm.
    pub sweep_fallback_step: Real,
    /// Placement count above which the nest broad phase switches to an R-tree.
    pub nest_index_threshold: usize,
    /// Required gap between nested parts; 0 reports only true overlaps.
    pub nest_min_spacing: Real,
    /// A bend closer than this to the grain direction is flagged, in degrees.
    pub grain_tolerance_deg: Real,
    /// Optional rules switched on for this run.
    pub enabled_rules: BTreeSet<RuleKind>,
    /// Rules (default or optional) switched off for this run.
    pub disabled_rules: BTreeSet<RuleKind>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
            safety_margin: 0.5,
            min_sweep_samples: 8,
            max_sweep_samples: 720,
            sweep_fallback_step: 0.25,
            nest_index_threshold: 32,
            nest_min_spacing: 0.0,
            grain_tolerance_deg: 10.0,
            enabled_rules: BTreeSet::new(),
            disabled_rules: BTreeSet::new(),
        }
    }
}

impl EngineConfig {
    /// Parse a TOML document; missing keys keep their defaults.
    pub fn from_toml_str(source: &str) -> EngineResult<Self> {
        let config: EngineConfig =
            toml::from_str(source).map_err(|e| EngineError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON document; missing keys keep their defaults.
    pub fn from_json_str(source: &str) -> EngineResult<Self> {
        let config: EngineConfig = serde_json::from_str(source)
            .map_err(|e| EngineError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> EngineResult<()> {
        if !(self.epsilon.is_finite() && self.epsilon > 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "epsilon must be positive and finite, got {}",
                self.epsilon
            )));
        }
        if !(self.safety_margin.is_finite() && self.safety_margin >= 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "safety_margin must be non-negative, got {}",
                self.safety_margin
            )));
        }
        if self.min_sweep_samples == 0 || self.max_sweep_samples < self.min_sweep_samples {
            return Err(EngineError::InvalidConfig(format!(
                "sweep samples must satisfy 0 < min ({}) <= max ({})",
                self.min_sweep_samples, self.max_sweep_samples
            )));
        }
        if !(self.sweep_fallback_step.is_finite() && self.sweep_fallback_step > 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "sweep_fallback_step must be positive, got {}",
                self.sweep_fallback_step
            )));
        }
        if !(self.nest_min_spacing.is_finite() && self.nest_min_spacing >= 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "nest_min_spacing must be non-negative, got {}",
                self.nest_min_spacing
            )));
        }
        if !(self.grain_tolerance_deg.is_finite() && (0.0..=90.0).contains(&self.grain_tolerance_deg)) {
            return Err(EngineError::InvalidConfig(format!(
                "grain_tolerance_deg must lie in [0, 90], got {}",
                self.grain_tolerance_deg
            )));
        }
        Ok(())
    }

    /// Rules this config runs, in registration order.
    pub fn active_rules(&self) -> Vec<RuleKind> {
        RuleKind::ALL
            .iter()
            .copied()
            .filter(|kind| kind.is_default() || self.enabled_rules.contains(kind))
            .filter(|kind| !self.disabled_rules.contains(kind))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toml_overrides_keep_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            safety_margin = 1.25
            enabled_rules = ["hole-to-hole-spacing"]
            disabled_rules = ["grain-direction"]
            "#,
        )
        .expect("valid toml");

        assert_eq!(config.safety_margin, 1.25);
        assert_eq!(config.epsilon, DEFAULT_EPSILON);
        let active = config.active_rules();
        assert!(active.contains(&RuleKind::HoleToHoleSpacing));
        assert!(!active.contains(&RuleKind::GrainDirection));
        assert!(!active.contains(&RuleKind::MinHoleDiameter));
    }

    #[test]
    fn test_rejects_bad_sampling() {
        let config = EngineConfig {
            min_sweep_samples: 16,
            max_sweep_samples: 4,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(EngineError::InvalidConfig(_))));
    }
}
