//! Pipeline configuration

use crate::error::{FusionError, Result};
use crate::preprocessing::ImputeStrategy;
use crate::training::{ClassWeight, ForestConfig, ModelSpec, SVMConfig};
use serde::{Deserialize, Serialize};

/// Configuration shared by every fusion path
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    /// Statistic used to fill missing values (fit on train only)
    pub imputation: ImputeStrategy,

    /// Optional PCA stage after imputation
    pub n_components: Option<usize>,

    /// Kernel regressor settings
    pub regressor: SVMConfig,

    /// Kernel classifier settings
    pub classifier: SVMConfig,

    /// Decision-forest classifier settings
    pub forest: ForestConfig,

    /// Seed for minority-class resampling
    pub balancing_seed: u64,

    /// Exponents e of the swept C = 10^e
    pub sweep_exponents: Vec<i32>,

    /// Fan out modalities and sweep candidates on the rayon pool
    pub parallel: bool,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            imputation: ImputeStrategy::Mean,
            n_components: None,
            regressor: SVMConfig::default(),
            classifier: SVMConfig::balanced(),
            forest: ForestConfig::default(),
            balancing_seed: 123,
            sweep_exponents: (-5..=4).collect(),
            parallel: true,
        }
    }
}

impl FusionConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the imputation statistic
    pub fn with_imputation(mut self, strategy: ImputeStrategy) -> Self {
        self.imputation = strategy;
        self
    }

    /// Builder method to add a PCA stage
    pub fn with_components(mut self, n_components: usize) -> Self {
        self.n_components = Some(n_components);
        self
    }

    pub fn with_regressor(mut self, config: SVMConfig) -> Self {
        self.regressor = config;
        self
    }

    pub fn with_classifier(mut self, config: SVMConfig) -> Self {
        self.classifier = config;
        self
    }

    pub fn with_forest(mut self, config: ForestConfig) -> Self {
        self.forest = config;
        self
    }

    pub fn with_balancing_seed(mut self, seed: u64) -> Self {
        self.balancing_seed = seed;
        self
    }

    pub fn with_sweep_exponents(mut self, exponents: Vec<i32>) -> Self {
        self.sweep_exponents = exponents;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Kernel regressor spec
    pub fn regressor_spec(&self) -> ModelSpec {
        ModelSpec::SvmRegressor(self.regressor.clone())
    }

    /// Class-weight-balanced kernel classifier spec
    pub fn classifier_spec(&self) -> ModelSpec {
        ModelSpec::SvmClassifier(self.classifier.clone())
    }

    /// Decision-forest classifier spec
    pub fn forest_spec(&self) -> ModelSpec {
        ModelSpec::RandomForest(self.forest.clone())
    }

    /// Kernel classifier for already-balanced data (no class weighting)
    pub fn upsampled_classifier_spec(&self) -> ModelSpec {
        let mut config = self.classifier.clone();
        config.class_weight = ClassWeight::None;
        ModelSpec::SvmClassifier(config)
    }

    /// Parse from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check cross-field consistency
    pub fn validate(&self) -> Result<()> {
        if self.n_components == Some(0) {
            return Err(FusionError::ConfigError(
                "n_components must be at least 1 when set".to_string(),
            ));
        }
        if self.sweep_exponents.is_empty() {
            return Err(FusionError::ConfigError(
                "sweep_exponents must name at least one candidate".to_string(),
            ));
        }
        if self.forest.n_estimators == 0 {
            return Err(FusionError::ConfigError(
                "forest.n_estimators must be at least 1".to_string(),
            ));
        }
        self.regressor.validate()?;
        self.classifier.validate()?;
        Ok(())
    }
}
