//! Knobs that change how filters are compiled.

use crate::error::PlannerError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompilerSettings {
    /// Skip the rewrite pass entirely.
    #[serde(default)]
    pub disable_optimizer: bool,

    /// The boolean property that separates group rows from regular rows.
    #[serde(default)]
    pub group_flag: Option<GroupFlagSettings>,

    /// Where to look when the backend's string comparison mode is probed.
    #[serde(default)]
    pub case_probe: Option<CaseProbeSettings>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupFlagSettings {
    pub entity: String,
    pub property: String,

    /// Add `flag <> true` to queries that do not mention the flag.
    #[serde(default)]
    pub exclude_groups_by_default: bool,

    /// Use `flag = false` instead of `flag <> true` for the default filter.
    #[serde(default)]
    pub use_eq_false: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseProbeSettings {
    pub table: String,
    pub column: String,
}

impl CompilerSettings {
    pub fn from_json(json: &str) -> Result<Self, PlannerError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_group_flag(mut self, entity: &str, property: &str) -> Self {
        self.group_flag = Some(GroupFlagSettings {
            entity: entity.to_string(),
            property: property.to_string(),
            exclude_groups_by_default: false,
            use_eq_false: false,
        });
        self
    }

    pub fn exclude_groups_by_default(mut self, use_eq_false: bool) -> Self {
        if let Some(flag) = self.group_flag.as_mut() {
            flag.exclude_groups_by_default = true;
            flag.use_eq_false = use_eq_false;
        }
        self
    }

    /// The group flag configuration if it applies to `entity`.
    pub fn group_flag_for(&self, entity: &str) -> Option<&GroupFlagSettings> {
        self.group_flag.as_ref().filter(|flag| flag.entity == entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_from_json_defaults() {
        let settings = CompilerSettings::from_json(
            r#"{"group_flag": {"entity": "Identity", "property": "workgroup"}}"#,
        )
        .unwrap();

        assert!(!settings.disable_optimizer);
        let flag = settings.group_flag_for("Identity").unwrap();
        assert_eq!(flag.property, "workgroup");
        assert!(!flag.exclude_groups_by_default);
        assert!(settings.group_flag_for("Link").is_none());
        assert!(settings.case_probe.is_none());
    }

    #[test]
    fn test_settings_from_json_rejects_garbage() {
        assert!(matches!(
            CompilerSettings::from_json("{\"disable_optimizer\": 3}"),
            Err(PlannerError::Config(_))
        ));
    }
}
