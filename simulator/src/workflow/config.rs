use crate::generator::profile::{GeneratorConfig, SurveyPath};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use sonarcore::config::Channel;
use sonarcore::SurveyConfig;
use std::fs;
use std::path::Path;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub survey: SurveyConfig,
    pub generator: GeneratorConfig,
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn from_args(pings: usize, path: SurveyPath, channel: Channel, seed: u64) -> Self {
        Self {
            survey: SurveyConfig {
                channel,
                ..SurveyConfig::default()
            },
            generator: GeneratorConfig {
                pings,
                path,
                seed,
                ..GeneratorConfig::default()
            },
        }
    }
}
