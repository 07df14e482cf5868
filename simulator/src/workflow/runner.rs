use crate::generator::profile::generate_survey;
use crate::workflow::config::WorkflowConfig;
use anyhow::Context;
use log::info;
use sonarcore::{RunSummary, SurveyContext, SurveyPipeline};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

pub const SUMMARY_FILE: &str = "run_summary.json";

#[derive(Clone)]
pub struct Runner {
    config: WorkflowConfig,
    output_dir: PathBuf,
}

impl Runner {
    pub fn new(config: WorkflowConfig, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            output_dir: output_dir.into(),
        }
    }

    /// Generates the survey, runs the pipeline and writes the run summary
    /// next to the tiles.
    pub fn execute(&self) -> anyhow::Result<RunSummary> {
        let survey =
            generate_survey(&self.config.generator).context("generating synthetic survey")?;
        let first = survey
            .pings
            .first()
            .context("generator produced no pings")?;
        let context = SurveyContext::new(
            self.config.survey.clone(),
            &self.output_dir,
            first.lon,
            first.lat,
        )
        .context("building survey context")?;

        let pipeline = SurveyPipeline::new(context);
        let summary = pipeline
            .run(&survey.pings, Arc::new(survey.intensity))
            .context("running rectification pipeline")?;

        let json = summary.to_json().context("serializing run summary")?;
        let summary_path = self.output_dir.join(SUMMARY_FILE);
        fs::write(&summary_path, json)
            .with_context(|| format!("writing {}", summary_path.display()))?;
        info!("run summary written to {}", summary_path.display());
        Ok(summary)
    }
}
