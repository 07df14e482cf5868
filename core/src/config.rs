use crate::geo::projection::utm_epsg;
use crate::prelude::{StageError, StageResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const WGS84_EPSG: u16 = 4326;

/// Side-scan channel processed by one pipeline run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Channel {
    #[serde(rename = "ss_port")]
    Port,
    #[serde(rename = "ss_star")]
    Starboard,
}

impl Channel {
    pub fn beam_name(&self) -> &'static str {
        match self {
            Channel::Port => "ss_port",
            Channel::Starboard => "ss_star",
        }
    }

    /// Rotation from course-over-ground to the ping bearing, in degrees.
    pub fn rotation_deg(&self, flip: bool) -> f64 {
        let rotate = match self {
            Channel::Port => -90.0,
            Channel::Starboard => 90.0,
        };
        if flip {
            -rotate
        } else {
            rotate
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputCrs {
    Utm,
    Wgs84,
}

/// Tile variants produced per chunk.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TileKind {
    #[serde(rename = "wcp")]
    WaterColumnPresent,
    #[serde(rename = "src")]
    SlantRangeCorrected,
}

impl TileKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            TileKind::WaterColumnPresent => "rect_wcp",
            TileKind::SlantRangeCorrected => "rect_src",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SplineDegree {
    Linear,
    Cubic,
}

impl SplineDegree {
    pub fn order(&self) -> usize {
        match self {
            SplineDegree::Linear => 1,
            SplineDegree::Cubic => 3,
        }
    }

    /// Smallest control-point count a fit of this degree accepts.
    pub fn min_points(&self) -> usize {
        self.order() + 1
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    /// Keep every `filt`-th fix as a spline control point (0 or 1 keeps all).
    pub filt: usize,
    pub degree: SplineDegree,
    pub drop_duplicates: bool,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            filt: 50,
            degree: SplineDegree::Cubic,
            drop_duplicates: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlapConfig {
    pub filt: usize,
    pub bbox_tolerance_m: f64,
}

impl Default for OverlapConfig {
    fn default() -> Self {
        Self {
            filt: 50,
            bbox_tolerance_m: 5.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RectifyConfig {
    pub filt: usize,
    pub tiles: Vec<TileKind>,
    pub max_tile_pixels: usize,
}

impl Default for RectifyConfig {
    fn default() -> Self {
        Self {
            filt: 50,
            tiles: vec![TileKind::WaterColumnPresent],
            max_tile_pixels: 100_000_000,
        }
    }
}

/// User-facing survey configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SurveyConfig {
    pub project_name: String,
    pub channel: Channel,
    pub flip_channel: bool,
    pub output_crs: OutputCrs,
    pub smoothing: SmoothingConfig,
    pub overlap: OverlapConfig,
    pub rectify: RectifyConfig,
    pub workers: Option<usize>,
}

impl Default for SurveyConfig {
    fn default() -> Self {
        Self {
            project_name: "survey".to_string(),
            channel: Channel::Port,
            flip_channel: false,
            output_crs: OutputCrs::Utm,
            smoothing: SmoothingConfig::default(),
            overlap: OverlapConfig::default(),
            rectify: RectifyConfig::default(),
            workers: None,
        }
    }
}

/// Immutable per-survey context shared by every stage and chunk worker.
#[derive(Debug, Clone)]
pub struct SurveyContext {
    pub config: SurveyConfig,
    pub output_dir: PathBuf,
    /// Projected CRS fixed from the survey's first position.
    pub utm_epsg: u16,
}

impl SurveyContext {
    pub fn new(
        config: SurveyConfig,
        output_dir: impl Into<PathBuf>,
        first_lon: f64,
        first_lat: f64,
    ) -> StageResult<Self> {
        let utm_epsg = utm_epsg(first_lon, first_lat)?;
        let output_dir = output_dir.into();
        if config.project_name.trim().is_empty() {
            return Err(StageError::InvalidInput("project name is empty".into()));
        }
        Ok(Self {
            config,
            output_dir,
            utm_epsg,
        })
    }

    pub fn beam_name(&self) -> &'static str {
        self.config.channel.beam_name()
    }

    /// EPSG code the rectified tiles are written in.
    pub fn tile_epsg(&self) -> u16 {
        match self.config.output_crs {
            OutputCrs::Utm => self.utm_epsg,
            OutputCrs::Wgs84 => WGS84_EPSG,
        }
    }

    pub fn tile_path(&self, kind: TileKind, chunk_id: u32) -> PathBuf {
        self.output_dir.join(tile_file_name(
            &self.config.project_name,
            kind,
            self.beam_name(),
            chunk_id,
        ))
    }

    pub fn track_table_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("Trackline_Smth_{}.csv", self.beam_name()))
    }

    pub fn worker_count(&self) -> usize {
        self.config
            .workers
            .filter(|&workers| workers > 0)
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1)
            })
    }
}

pub fn tile_file_name(project: &str, kind: TileKind, beam: &str, chunk_id: u32) -> String {
    format!("{}_{}_{}_{:05}.tif", project, kind.prefix(), beam, chunk_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_rotation_respects_flip() {
        assert_eq!(Channel::Port.rotation_deg(false), -90.0);
        assert_eq!(Channel::Starboard.rotation_deg(false), 90.0);
        assert_eq!(Channel::Port.rotation_deg(true), 90.0);
    }

    #[test]
    fn tile_names_are_zero_padded() {
        let name = tile_file_name("lake", TileKind::SlantRangeCorrected, "ss_star", 7);
        assert_eq!(name, "lake_rect_src_ss_star_00007.tif");
    }

    #[test]
    fn context_derives_utm_zone_from_first_fix() {
        let ctx = SurveyContext::new(SurveyConfig::default(), "/tmp/out", -89.4, 43.07).unwrap();
        assert_eq!(ctx.utm_epsg, 32616);
        assert_eq!(ctx.tile_epsg(), 32616);
        assert!(ctx.worker_count() >= 1);
    }

    #[test]
    fn survey_config_fills_defaults_from_partial_json() {
        let cfg: SurveyConfig =
            serde_json::from_str(r#"{"channel": "ss_star", "rectify": {"tiles": ["wcp", "src"]}}"#)
                .unwrap();
        assert_eq!(cfg.channel, Channel::Starboard);
        assert_eq!(cfg.rectify.tiles.len(), 2);
        assert_eq!(cfg.smoothing.degree, SplineDegree::Cubic);
        assert_eq!(cfg.overlap.bbox_tolerance_m, 5.0);
    }
}
