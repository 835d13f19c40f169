//! Configuration types.
//!
//! [`ClassHierarchy`] is usually loaded from YAML or JSON and validated into a
//! [`ConfigError`]. The parameter structs for population refinement follow a
//! flat layout: `try_validate()` reports bad values as [`ConfigError`] and
//! `validate()` asserts on them for values built in code.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ============================================================================
// Object classes
// ============================================================================

/// One object class of the hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectClassConfig {
    pub name: String,
    /// Index of the parent class; `None` for children of the frame root.
    #[serde(default)]
    pub parent: Option<usize>,
    /// Several previous objects may link to one next object.
    #[serde(default)]
    pub allow_merge: bool,
    /// One previous object may link to several next objects.
    #[serde(default)]
    pub allow_split: bool,
}

impl ObjectClassConfig {
    pub fn new(name: impl Into<String>, parent: Option<usize>) -> Self {
        Self {
            name: name.into(),
            parent,
            allow_merge: false,
            allow_split: false,
        }
    }

    pub fn with_merge(mut self, allow: bool) -> Self {
        self.allow_merge = allow;
        self
    }

    pub fn with_split(mut self, allow: bool) -> Self {
        self.allow_split = allow;
        self
    }
}

/// Object classes in declaration order. A class may only reference a parent
/// declared before it, which rules out cycles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassHierarchy {
    pub classes: Vec<ObjectClassConfig>,
}

impl ClassHierarchy {
    pub fn new(classes: Vec<ObjectClassConfig>) -> Result<Self, ConfigError> {
        let hierarchy = Self { classes };
        hierarchy.validate()?;
        Ok(hierarchy)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let hierarchy: Self = serde_yml::from_str(yaml)?;
        hierarchy.validate()?;
        Ok(hierarchy)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let hierarchy: Self = serde_json::from_str(json)?;
        hierarchy.validate()?;
        Ok(hierarchy)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (class, config) in self.classes.iter().enumerate() {
            if config.name.trim().is_empty() {
                return Err(ConfigError::Parameter {
                    name: "name",
                    reason: format!("object class {class} has an empty name"),
                });
            }
            if let Some(parent) = config.parent {
                if parent >= class {
                    return Err(ConfigError::ParentOrder {
                        class,
                        name: config.name.clone(),
                        parent,
                    });
                }
            }
        }
        Ok(())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    #[inline]
    pub fn get(&self, class: usize) -> Option<&ObjectClassConfig> {
        self.classes.get(class)
    }

    /// Parent class index; `None` for classes attached to the frame root.
    pub fn parent_of(&self, class: usize) -> Option<usize> {
        self.classes.get(class).and_then(|c| c.parent)
    }

    /// Direct child classes of `parent` (`None` = frame root).
    pub fn children_of(&self, parent: Option<usize>) -> impl Iterator<Item = usize> + '_ {
        self.classes
            .iter()
            .enumerate()
            .filter(move |(_, c)| c.parent == parent)
            .map(|(idx, _)| idx)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.classes.iter().position(|c| c.name == name)
    }
}

// ============================================================================
// Population refinement
// ============================================================================

/// Parameters of [`RegionPopulation::local_threshold`](crate::population::RegionPopulation::local_threshold).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalThresholdParams {
    /// Threshold distance from the median in interquartile ranges.
    pub iqr_factor: f64,
    /// Objects are brighter than the background; voxels below
    /// `median - iqr_factor * IQR` are eroded. Otherwise voxels above
    /// `median + iqr_factor * IQR` are.
    pub dark_background: bool,
    /// On disconnection keep the largest piece instead of splitting.
    pub keep_only_biggest: bool,
    /// Label-wise dilation radius applied before thresholding; `0` disables.
    pub dilate_radius: f64,
}

impl Default for LocalThresholdParams {
    fn default() -> Self {
        Self {
            iqr_factor: 1.5,
            dark_background: true,
            keep_only_biggest: false,
            dilate_radius: 0.0,
        }
    }
}

impl LocalThresholdParams {
    /// Checks values that may come from a deserialized file.
    pub fn try_validate(&self) -> Result<(), ConfigError> {
        check_non_negative("iqr_factor", self.iqr_factor)?;
        check_non_negative("dilate_radius", self.dilate_radius)
    }

    /// Asserting form of [`Self::try_validate`] for values built in code.
    pub fn validate(&self) {
        if let Err(err) = self.try_validate() {
            panic!("{err}");
        }
    }
}

/// Parameters of [`RegionPopulation::smooth_regions`](crate::population::RegionPopulation::smooth_regions).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothParams {
    /// Voting neighborhood radius in xy pixels (z scaled by calibration).
    pub radius: f64,
    /// Background votes too, so border voxels may be erased.
    pub erase_if_connected_to_background: bool,
    /// Safety bound on the number of sweeps.
    pub max_iterations: usize,
}

impl Default for SmoothParams {
    fn default() -> Self {
        Self {
            radius: 1.5,
            erase_if_connected_to_background: true,
            max_iterations: 100,
        }
    }
}

impl SmoothParams {
    pub fn try_validate(&self) -> Result<(), ConfigError> {
        if !(self.radius.is_finite() && self.radius >= 1.0) {
            return Err(ConfigError::Parameter {
                name: "radius",
                reason: format!("must be at least 1, got {}", self.radius),
            });
        }
        if self.max_iterations == 0 {
            return Err(ConfigError::Parameter {
                name: "max_iterations",
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }

    pub fn validate(&self) {
        if let Err(err) = self.try_validate() {
            panic!("{err}");
        }
    }
}

fn check_non_negative(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Parameter {
            name,
            reason: format!("must be non-negative, got {value}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hierarchy_from_yaml() -> anyhow::Result<()> {
        let yaml = r#"
classes:
  - name: microchannel
  - name: bacteria
    parent: 0
    allow_split: true
  - name: spot
    parent: 1
    allow_merge: true
"#;
        let hierarchy = ClassHierarchy::from_yaml(yaml)?;
        assert_eq!(hierarchy.len(), 3);
        assert_eq!(hierarchy.parent_of(2), Some(1));
        assert!(hierarchy.classes[1].allow_split);
        assert!(!hierarchy.classes[1].allow_merge);
        assert_eq!(hierarchy.children_of(None).collect::<Vec<_>>(), vec![0]);
        assert_eq!(hierarchy.index_of("spot"), Some(2));
        Ok(())
    }

    #[test]
    fn test_hierarchy_from_json() -> anyhow::Result<()> {
        let json = r#"{"classes": [{"name": "cells"}, {"name": "nuclei", "parent": 0}]}"#;
        let hierarchy = ClassHierarchy::from_json(json)?;
        assert_eq!(hierarchy.children_of(Some(0)).collect::<Vec<_>>(), vec![1]);
        Ok(())
    }

    #[test]
    fn test_parent_must_precede_child() {
        let err = ClassHierarchy::new(vec![
            ObjectClassConfig::new("a", Some(1)),
            ObjectClassConfig::new("b", None),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::ParentOrder { class: 0, parent: 1, .. }));

        let err = ClassHierarchy::new(vec![ObjectClassConfig::new("self", Some(0))]).unwrap_err();
        assert!(matches!(err, ConfigError::ParentOrder { class: 0, parent: 0, .. }));
    }

    #[test]
    fn test_malformed_yaml_is_config_error() {
        let err = ClassHierarchy::from_yaml("classes: [name: 3").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn test_yaml_round_trip() -> anyhow::Result<()> {
        let hierarchy = ClassHierarchy::new(vec![
            ObjectClassConfig::new("cells", None).with_split(true),
            ObjectClassConfig::new("spots", Some(0)).with_merge(true),
        ])?;
        let parsed = ClassHierarchy::from_yaml(&hierarchy.to_yaml()?)?;
        assert_eq!(parsed, hierarchy);
        Ok(())
    }

    #[test]
    fn test_params_defaults_are_valid() {
        LocalThresholdParams::default().validate();
        SmoothParams::default().validate();
    }

    #[test]
    #[should_panic(expected = "invalid parameter iqr_factor")]
    fn test_negative_iqr_factor_panics() {
        LocalThresholdParams {
            iqr_factor: -1.0,
            ..Default::default()
        }
        .validate();
    }

    #[test]
    fn test_loaded_params_report_config_errors() -> anyhow::Result<()> {
        let params: LocalThresholdParams = serde_yml::from_str("dilate_radius: -2.0\n")?;
        let err = params.try_validate().unwrap_err();
        assert!(matches!(err, ConfigError::Parameter { name: "dilate_radius", .. }));

        let params: SmoothParams = serde_yml::from_str("radius: 0.5\n")?;
        assert!(matches!(
            params.try_validate(),
            Err(ConfigError::Parameter { name: "radius", .. })
        ));

        let params: SmoothParams = serde_yml::from_str("max_iterations: 0\n")?;
        assert!(matches!(
            params.try_validate(),
            Err(ConfigError::Parameter {
                name: "max_iterations",
                ..
            })
        ));
        Ok(())
    }

    #[test]
    fn test_params_deserialize_with_defaults() -> anyhow::Result<()> {
        let params: LocalThresholdParams = serde_json::from_str(r#"{"dilate_radius": 2.0}"#)?;
        assert_eq!(params.dilate_radius, 2.0);
        assert_eq!(params.iqr_factor, 1.5);
        Ok(())
    }
}
