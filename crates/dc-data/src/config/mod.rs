//! Inference configuration

pub mod null_handling;

pub use null_handling::NullConfig;

use dc_core::InferenceSettings;

/// Everything the type inferencer needs to classify and enrich a column
#[derive(Debug, Clone)]
pub struct InferenceConfig {
    /// Rows sampled when classifying a column
    pub sample_size: usize,

    /// Above this many distinct values no unique-value list is kept
    pub max_unique_values: usize,

    /// Empty-cell detection
    pub null_config: NullConfig,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self::from(&InferenceSettings::default())
    }
}

impl From<&InferenceSettings> for InferenceConfig {
    fn from(settings: &InferenceSettings) -> Self {
        Self {
            sample_size: settings.sample_size,
            max_unique_values: settings.max_unique_values,
            null_config: NullConfig::from_patterns(settings.null_patterns.clone()),
        }
    }
}
