// SPDX-License-Identifier: MIT OR Apache-2.0
//! Surface codec settings.

use serde::{Deserialize, Serialize};

/// Engine build number written into saved surfaces.
///
/// Pinned rather than tracking the running build so that saving the same
/// graph twice yields identical bytes.
pub const SAVE_ENGINE_BUILD: u32 = 6118;

/// Longest parameter name accepted on load (exclusive)
pub const DEFAULT_MAX_NAME_LENGTH: usize = 2000;

/// Settings for loading and saving surfaces
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    /// Engine build written in the header on save
    pub engine_build: u32,
    /// Parameter names of this many characters or more are rejected on load
    pub max_name_length: usize,
    /// String values of this many characters or more are rejected on load
    pub max_value_string_length: Option<usize>,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            engine_build: SAVE_ENGINE_BUILD,
            max_name_length: DEFAULT_MAX_NAME_LENGTH,
            max_value_string_length: None,
        }
    }
}

impl SurfaceConfig {
    /// Parse settings from RON; missing fields take their defaults
    pub fn from_ron(text: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(text)
    }

    /// Render settings as pretty RON
    pub fn to_ron(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SurfaceConfig::default();
        assert_eq!(config.engine_build, 6118);
        assert_eq!(config.max_name_length, 2000);
        assert!(config.max_value_string_length.is_none());
    }

    #[test]
    fn test_ron_round_trip() {
        let config = SurfaceConfig {
            max_value_string_length: Some(512),
            ..Default::default()
        };
        let text = config.to_ron().unwrap();
        assert_eq!(SurfaceConfig::from_ron(&text).unwrap(), config);
    }

    #[test]
    fn test_partial_ron() {
        let config = SurfaceConfig::from_ron("(max_name_length: 64)").unwrap();
        assert_eq!(config.max_name_length, 64);
        assert_eq!(config.engine_build, SAVE_ENGINE_BUILD);
    }
}
