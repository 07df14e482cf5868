use crate::generator::template::flat_bottom_ping;
use anyhow::{ensure, Context};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use sonarcore::geo::{destination_point, GeodeticProjector};
use sonarcore::{assign_chunks, InMemoryIntensity, PingRecord};

/// Shape of the synthetic survey line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SurveyPath {
    Straight,
    /// Out along the heading, a left-hand half turn, and back.
    UTurn,
}

/// Configuration for generating a synthetic survey.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub pings: usize,
    pub chunk_size: usize,
    pub ping_cnt: u32,
    pub pix_m: f64,
    pub depth_m: f64,
    pub speed_ms: f64,
    pub ping_rate_hz: f64,
    pub heading_deg: f64,
    pub origin_lon: f64,
    pub origin_lat: f64,
    pub path: SurveyPath,
    pub turn_radius_m: f64,
    pub gps_noise_m: f64,
    pub seed: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            pings: 2000,
            chunk_size: 500,
            ping_cnt: 200,
            pix_m: 0.02,
            depth_m: 1.0,
            speed_ms: 1.0,
            ping_rate_hz: 10.0,
            heading_deg: 90.0,
            origin_lon: -89.4,
            origin_lat: 43.07,
            path: SurveyPath::Straight,
            turn_radius_m: 3.0,
            gps_noise_m: 0.0,
            seed: 0,
        }
    }
}

/// Decoded-looking pings plus their intensity samples.
pub struct SyntheticSurvey {
    pub pings: Vec<PingRecord>,
    pub intensity: InMemoryIntensity,
}

/// Position and heading at `distance` metres along the path, as
/// (east, north) metres from the origin.
fn path_offset(config: &GeneratorConfig, distance: f64, total: f64) -> ((f64, f64), f64) {
    let heading = config.heading_deg.to_radians();
    let forward = (heading.sin(), heading.cos());
    let left = (-forward.1, forward.0);
    let at = |along: f64, side: f64| {
        (
            forward.0 * along + left.0 * side,
            forward.1 * along + left.1 * side,
        )
    };

    match config.path {
        SurveyPath::Straight => (at(distance, 0.0), config.heading_deg),
        SurveyPath::UTurn => {
            let radius = config.turn_radius_m.max(0.0);
            let arc = std::f64::consts::PI * radius;
            let leg = ((total - arc) / 2.0).max(0.0);
            if distance <= leg {
                (at(distance, 0.0), config.heading_deg)
            } else if distance <= leg + arc && radius > 0.0 {
                let phi = (distance - leg) / radius;
                let turned = config.heading_deg - phi.to_degrees();
                (at(leg + radius * phi.sin(), radius * (1.0 - phi.cos())), turned)
            } else {
                let back = distance - leg - arc;
                (at(leg - back, 2.0 * radius), config.heading_deg + 180.0)
            }
        }
    }
}

pub fn generate_survey(config: &GeneratorConfig) -> anyhow::Result<SyntheticSurvey> {
    ensure!(config.pings >= 2, "a survey needs at least two pings");
    ensure!(config.pix_m > 0.0, "pixel size must be positive");
    ensure!(config.ping_rate_hz > 0.0, "ping rate must be positive");

    let projector = GeodeticProjector::for_position(config.origin_lon, config.origin_lat)
        .context("selecting UTM zone for the survey origin")?;
    let mut rng = StdRng::seed_from_u64(config.seed);
    let spacing = config.speed_ms / config.ping_rate_hz;
    let total = (config.pings - 1) as f64 * spacing;
    let depth_samples = (config.depth_m / config.pix_m).round().max(0.0) as usize;

    let mut pings = Vec::with_capacity(config.pings);
    let mut intensity = InMemoryIntensity::new();
    for index in 0..config.pings {
        let ((mut east, mut north), heading) = path_offset(config, index as f64 * spacing, total);
        if config.gps_noise_m > 0.0 {
            east += rng.gen_range(-config.gps_noise_m..config.gps_noise_m);
            north += rng.gen_range(-config.gps_noise_m..config.gps_noise_m);
        }
        let bearing = east.atan2(north).to_degrees();
        let (lon, lat) = destination_point(
            config.origin_lon,
            config.origin_lat,
            bearing,
            east.hypot(north),
        );
        let (utm_e, utm_n) = projector
            .project(lon, lat)
            .with_context(|| format!("projecting ping {}", index))?;

        let record_num = index as u64;
        pings.push(PingRecord {
            record_num,
            chunk_id: 0,
            time_s: index as f64 / config.ping_rate_hz,
            ping_cnt: config.ping_cnt,
            lon,
            lat,
            utm_e,
            utm_n,
            instr_heading: heading.rem_euclid(360.0),
            speed_ms: config.speed_ms,
            inst_dep_m: config.depth_m,
            dep_m: config.depth_m,
            pix_m: config.pix_m,
        });
        intensity.insert(
            record_num,
            flat_bottom_ping(config.ping_cnt as usize, depth_samples, &mut rng),
        );
    }
    assign_chunks(&mut pings, config.chunk_size);

    Ok(SyntheticSurvey { pings, intensity })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sonarcore::IntensitySource;

    #[test]
    fn straight_survey_has_chunks_and_samples() {
        let config = GeneratorConfig {
            pings: 1100,
            ..GeneratorConfig::default()
        };
        let survey = generate_survey(&config).unwrap();
        assert_eq!(survey.pings.len(), 1100);
        assert_eq!(survey.pings.last().unwrap().chunk_id, 1);
        assert_eq!(survey.intensity.ping(5).unwrap().len(), 200);

        let first = &survey.pings[0];
        let last = &survey.pings[1099];
        assert!((last.utm_e - first.utm_e - 109.9).abs() < 0.5);
        assert!((last.time_s - 109.9).abs() < 1e-9);
    }

    #[test]
    fn u_turn_comes_back_offset_by_the_turn_diameter() {
        let config = GeneratorConfig {
            pings: 601,
            path: SurveyPath::UTurn,
            turn_radius_m: 5.0,
            heading_deg: 0.0,
            ..GeneratorConfig::default()
        };
        let survey = generate_survey(&config).unwrap();
        let first = &survey.pings[0];
        let last = &survey.pings[600];
        assert!((first.utm_e - last.utm_e - 10.0).abs() < 0.1);
        assert!((last.instr_heading - 180.0).abs() < 1e-6);
    }

    #[test]
    fn generation_is_reproducible_per_seed() {
        let config = GeneratorConfig {
            pings: 50,
            gps_noise_m: 0.3,
            seed: 42,
            ..GeneratorConfig::default()
        };
        let a = generate_survey(&config).unwrap();
        let b = generate_survey(&config).unwrap();
        assert_eq!(a.pings, b.pings);
        assert_eq!(a.intensity.ping(10), b.intensity.ping(10));
    }

    #[test]
    fn rejects_degenerate_configs() {
        let config = GeneratorConfig {
            pings: 1,
            ..GeneratorConfig::default()
        };
        assert!(generate_survey(&config).is_err());
    }
}
