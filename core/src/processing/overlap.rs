use crate::config::OverlapConfig;
use crate::geo::segment::PingSegment;
use crate::processing::smoother::subsample;
use crate::telemetry::log::LogManager;

/// Outcome of screening one chunk for crossing ping footprints.
///
/// Indices refer to the footprint slice passed to [`OverlapResolver::resolve`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlapResolution {
    pub candidates: Vec<usize>,
    pub removed: Vec<usize>,
    pub survivors: Vec<usize>,
}

/// Drops pings whose beam footprint crosses another ping's footprint, which
/// happens on bends tighter than the sonar range.
pub struct OverlapResolver {
    filt: usize,
    tolerance: f64,
    logger: LogManager,
}

impl OverlapResolver {
    pub fn new(config: &OverlapConfig, logger: LogManager) -> Self {
        Self::with_filter(config.filt, config.bbox_tolerance_m, logger)
    }

    pub fn with_filter(filt: usize, tolerance: f64, logger: LogManager) -> Self {
        Self {
            filt,
            tolerance,
            logger,
        }
    }

    /// Whether two footprints cross. Origins further apart than both ranges
    /// combined are rejected before any line geometry is computed.
    pub fn crosses(&self, first: &PingSegment, second: &PingSegment) -> bool {
        let reach = first.range + second.range;
        if first.origin.distance(second.origin) > reach {
            return false;
        }
        first.intersects(second, self.tolerance)
    }

    /// Screens every `filt`-th footprint plus the last one of a chunk.
    ///
    /// For each surviving candidate, later candidates crossing it are removed.
    /// The chunk's last footprint is never removed; when it is the one
    /// crossing, the earlier candidate goes instead.
    pub fn resolve(&self, footprints: &[PingSegment]) -> OverlapResolution {
        let all: Vec<usize> = (0..footprints.len()).collect();
        let candidates = subsample(&all, self.filt);
        let Some(last) = candidates.len().checked_sub(1) else {
            return OverlapResolution::default();
        };

        let mut removed = vec![false; candidates.len()];
        for i in 0..last {
            if removed[i] {
                continue;
            }
            let segment_i = &footprints[candidates[i]];
            for j in i + 1..candidates.len() {
                if removed[j] || !self.crosses(segment_i, &footprints[candidates[j]]) {
                    continue;
                }
                if j == last {
                    removed[i] = true;
                    break;
                }
                removed[j] = true;
            }
        }

        let (dropped, kept): (Vec<(usize, bool)>, Vec<(usize, bool)>) = candidates
            .iter()
            .copied()
            .zip(removed)
            .partition(|&(_, is_removed)| is_removed);
        let resolution = OverlapResolution {
            removed: dropped.into_iter().map(|(index, _)| index).collect(),
            survivors: kept.into_iter().map(|(index, _)| index).collect(),
            candidates,
        };
        if !resolution.removed.is_empty() {
            self.logger.detail(&format!(
                "removed {} of {} overlap candidates",
                resolution.removed.len(),
                resolution.candidates.len()
            ));
        }
        resolution
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::segment::Point2;
    use std::f64::consts::PI;

    fn resolver(filt: usize) -> OverlapResolver {
        OverlapResolver::with_filter(filt, 5.0, LogManager::scoped("test"))
    }

    fn footprint(origin: Point2, bearing_rad: f64, range: f64) -> PingSegment {
        let end = Point2::new(
            origin.x + range * bearing_rad.cos(),
            origin.y + range * bearing_rad.sin(),
        );
        PingSegment::new(origin, end, range)
    }

    /// Counter-clockwise half circle with the port beam pointing at the centre.
    fn u_turn(pings: usize, radius: f64, range: f64) -> Vec<PingSegment> {
        (0..pings)
            .map(|k| {
                let theta = PI * k as f64 / (pings - 1) as f64;
                let origin = Point2::new(radius * theta.cos(), radius * theta.sin());
                footprint(origin, theta + PI, range)
            })
            .collect()
    }

    fn straight(pings: usize, spacing: f64, range: f64) -> Vec<PingSegment> {
        (0..pings)
            .map(|k| footprint(Point2::new(0.0, k as f64 * spacing), PI, range))
            .collect()
    }

    fn assert_survivors_do_not_cross(
        resolver: &OverlapResolver,
        footprints: &[PingSegment],
        survivors: &[usize],
    ) {
        for (a, &i) in survivors.iter().enumerate() {
            for &j in &survivors[a + 1..] {
                assert!(
                    !resolver.crosses(&footprints[i], &footprints[j]),
                    "survivors {} and {} still cross",
                    i,
                    j
                );
            }
        }
    }

    #[test]
    fn straight_track_removes_nothing() {
        let footprints = straight(60, 0.5, 4.0);
        let result = resolver(1).resolve(&footprints);
        assert!(result.removed.is_empty());
        assert_eq!(result.survivors.len(), 60);
    }

    #[test]
    fn two_parallel_footprints_are_both_kept() {
        let footprints = straight(2, 0.5, 4.0);
        let result = resolver(1).resolve(&footprints);
        assert_eq!(result.survivors, vec![0, 1]);
    }

    #[test]
    fn crossing_pair_loses_one_member() {
        let footprints = vec![
            footprint(Point2::new(0.0, 0.0), PI / 4.0, 10.0),
            footprint(Point2::new(0.0, 10.0), -PI / 4.0, 10.0),
            footprint(Point2::new(0.0, 40.0), PI, 10.0),
        ];
        let result = resolver(1).resolve(&footprints);
        assert_eq!(result.removed, vec![1]);
        assert_eq!(result.survivors, vec![0, 2]);
    }

    #[test]
    fn tight_u_turn_flags_crossings() {
        let footprints = u_turn(40, 2.0, 10.0);
        let r = resolver(2);
        let result = r.resolve(&footprints);
        assert!(!result.removed.is_empty());
        assert_eq!(result.candidates.len(), 21);
        assert_survivors_do_not_cross(&r, &footprints, &result.survivors);
    }

    #[test]
    fn last_footprint_always_survives() {
        let pair = vec![
            footprint(Point2::new(0.0, 0.0), PI / 4.0, 10.0),
            footprint(Point2::new(0.0, 10.0), -PI / 4.0, 10.0),
        ];
        let result = resolver(1).resolve(&pair);
        assert_eq!(result.removed, vec![0]);
        assert_eq!(result.survivors, vec![1]);

        for footprints in [u_turn(25, 1.5, 8.0), u_turn(41, 3.0, 20.0), straight(9, 1.0, 3.0)] {
            for filt in [1, 3, 7] {
                let result = resolver(filt).resolve(&footprints);
                let last = footprints.len() - 1;
                assert!(!result.removed.contains(&last));
                assert_eq!(result.survivors.last(), Some(&last));
            }
        }
    }

    #[test]
    fn distant_origins_are_not_tested() {
        let r = resolver(1);
        let near = footprint(Point2::new(0.0, 0.0), 0.0, 3.0);
        let far = footprint(Point2::new(100.0, 0.0), PI, 3.0);
        assert!(!r.crosses(&near, &far));
        assert!(r.resolve(&[]).survivors.is_empty());
    }
}
