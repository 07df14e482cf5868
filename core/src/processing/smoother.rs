use crate::config::{SmoothingConfig, SplineDegree};
use crate::geo::bearing::course_over_ground;
use crate::geo::projection::GeodeticProjector;
use crate::math::spline::{ParametricSpline, SplineError};
use crate::prelude::{StageError, StageResult};
use crate::telemetry::log::LogManager;
use crate::track::PingRecord;
use serde::Serialize;
use std::collections::HashSet;

/// A planar fix handed to the smoother.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackPoint {
    pub record_num: u64,
    pub time_s: f64,
    pub x: f64,
    pub y: f64,
}

/// Scalar the spline is parameterized by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SplineParameter {
    ElapsedTime,
    RecordNumber,
}

/// How the smoothed coordinates were obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SmoothingMode {
    Fitted(SplineParameter),
    /// Too few distinct control points; input coordinates passed through.
    Unsmoothed,
}

impl SmoothingMode {
    pub fn is_fallback(&self) -> bool {
        !matches!(self, SmoothingMode::Fitted(SplineParameter::ElapsedTime))
    }
}

/// One smoothed coordinate per input point.
#[derive(Debug, Clone)]
pub struct SmoothedCoords {
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
    pub mode: SmoothingMode,
    pub control_count: usize,
}

/// Smoothed trackline with projected coordinates and course over ground.
#[derive(Debug, Clone)]
pub struct SmoothedTrack {
    pub lons: Vec<f64>,
    pub lats: Vec<f64>,
    pub utm_es: Vec<f64>,
    pub utm_ns: Vec<f64>,
    pub cog: Vec<f64>,
    pub mode: SmoothingMode,
}

/// Fits an interpolating spline through a thinned set of noisy fixes and
/// re-evaluates it at every original fix.
pub struct TrackSmoother {
    filt: usize,
    degree: SplineDegree,
    drop_duplicates: bool,
    logger: LogManager,
}

impl TrackSmoother {
    pub fn new(config: &SmoothingConfig, logger: LogManager) -> Self {
        Self::with_degree(config.filt, config.degree, config.drop_duplicates, logger)
    }

    pub fn with_degree(
        filt: usize,
        degree: SplineDegree,
        drop_duplicates: bool,
        logger: LogManager,
    ) -> Self {
        Self {
            filt,
            degree,
            drop_duplicates,
            logger,
        }
    }

    /// Indices of the control points: duplicates dropped (optionally), then
    /// every `filt`-th survivor plus the last one.
    pub fn select_controls(&self, points: &[TrackPoint]) -> Vec<usize> {
        let candidates: Vec<usize> = if self.drop_duplicates {
            let mut seen = HashSet::with_capacity(points.len());
            (0..points.len())
                .filter(|&i| seen.insert((points[i].x.to_bits(), points[i].y.to_bits())))
                .collect()
        } else {
            (0..points.len()).collect()
        };
        subsample(&candidates, self.filt)
    }

    pub fn smooth(&self, points: &[TrackPoint]) -> SmoothedCoords {
        let controls = self.select_controls(points);
        self.smooth_through(points, &controls)
    }

    /// Fits through `controls` (indices into `points`) and evaluates at every point.
    pub fn smooth_through(&self, points: &[TrackPoint], controls: &[usize]) -> SmoothedCoords {
        let controls = drop_stationary(points, controls);
        if controls.len() < self.degree.min_points() {
            let err = StageError::DegenerateGeometry(format!(
                "{} distinct control points cannot carry a degree {} spline",
                controls.len(),
                self.degree.order()
            ));
            self.logger.warn(&format!("{}; keeping raw fixes", err));
            return unsmoothed(points, controls.len());
        }

        let err = match self.fit(points, &controls, SplineParameter::ElapsedTime) {
            Ok(coords) => return coords,
            Err(err) => StageError::from(err),
        };
        if !matches!(err, StageError::ParameterizationFailure(_)) {
            self.logger.warn(&format!("{}; keeping raw fixes", err));
            return unsmoothed(points, controls.len());
        }

        self.logger
            .warn(&format!("{} on elapsed time; refitting on record number", err));
        match self.fit(points, &controls, SplineParameter::RecordNumber) {
            Ok(coords) => coords,
            Err(retry_err) => {
                self.logger.warn(&format!(
                    "{} on record number; keeping raw fixes",
                    StageError::from(retry_err)
                ));
                unsmoothed(points, controls.len())
            }
        }
    }

    fn fit(
        &self,
        points: &[TrackPoint],
        controls: &[usize],
        parameter: SplineParameter,
    ) -> Result<SmoothedCoords, SplineError> {
        let mut u_all: Vec<f64> = match parameter {
            SplineParameter::ElapsedTime => points.iter().map(|p| p.time_s).collect(),
            SplineParameter::RecordNumber => points.iter().map(|p| p.record_num as f64).collect(),
        };
        if parameter == SplineParameter::ElapsedTime && has_duplicates(controls, &u_all) {
            self.logger.detail("duplicate timestamps; scaling time by record number");
            for (u, point) in u_all.iter_mut().zip(points) {
                *u *= point.record_num as f64;
            }
        }

        let u: Vec<f64> = controls.iter().map(|&i| u_all[i]).collect();
        let x: Vec<f64> = controls.iter().map(|&i| points[i].x).collect();
        let y: Vec<f64> = controls.iter().map(|&i| points[i].y).collect();
        let spline = ParametricSpline::fit(&u, &x, &y, self.degree)?;

        let (xs, ys) = spline.evaluate_all(&u_all).into_iter().unzip();
        Ok(SmoothedCoords {
            xs,
            ys,
            mode: SmoothingMode::Fitted(parameter),
            control_count: controls.len(),
        })
    }

    /// Full trackline pass: smooth lon/lat, project, and derive COG.
    pub fn smooth_track(
        &self,
        pings: &[PingRecord],
        projector: &GeodeticProjector,
    ) -> StageResult<SmoothedTrack> {
        let points: Vec<TrackPoint> = pings
            .iter()
            .map(|ping| TrackPoint {
                record_num: ping.record_num,
                time_s: ping.time_s,
                x: ping.lon,
                y: ping.lat,
            })
            .collect();
        let smoothed = self.smooth(&points);
        let (utm_es, utm_ns) = projector.project_all(&smoothed.xs, &smoothed.ys)?;
        let cog = course_over_ground(&smoothed.xs, &smoothed.ys);
        self.logger.detail(&format!(
            "trackline smoothed through {} of {} fixes ({:?})",
            smoothed.control_count,
            points.len(),
            smoothed.mode
        ));

        Ok(SmoothedTrack {
            lons: smoothed.xs,
            lats: smoothed.ys,
            utm_es,
            utm_ns,
            cog,
            mode: smoothed.mode,
        })
    }
}

/// Every `filt`-th entry plus the final one; `filt` of 0 or 1 keeps all.
pub fn subsample(indices: &[usize], filt: usize) -> Vec<usize> {
    let step = filt.max(1);
    let mut kept: Vec<usize> = indices.iter().step_by(step).copied().collect();
    if let Some(&last) = indices.last() {
        if kept.last() != Some(&last) {
            kept.push(last);
        }
    }
    kept
}

fn drop_stationary(points: &[TrackPoint], controls: &[usize]) -> Vec<usize> {
    let mut kept: Vec<usize> = Vec::with_capacity(controls.len());
    for &index in controls {
        let moved = kept.last().map_or(true, |&prev| {
            let delta =
                (points[index].x - points[prev].x).abs() + (points[index].y - points[prev].y).abs();
            delta != 0.0
        });
        if moved {
            kept.push(index);
        }
    }
    kept
}

fn has_duplicates(controls: &[usize], u: &[f64]) -> bool {
    let mut values: Vec<f64> = controls.iter().map(|&i| u[i]).collect();
    values.sort_by(|a, b| a.total_cmp(b));
    values.windows(2).any(|w| w[0] == w[1])
}

fn unsmoothed(points: &[TrackPoint], control_count: usize) -> SmoothedCoords {
    SmoothedCoords {
        xs: points.iter().map(|p| p.x).collect(),
        ys: points.iter().map(|p| p.y).collect(),
        mode: SmoothingMode::Unsmoothed,
        control_count,
    }
}
