pub struct StatsHelper;

impl StatsHelper {
    /// Smallest and largest finite value, or `None` if there are none.
    pub fn min_max(samples: &[f64]) -> Option<(f64, f64)> {
        samples
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    pub fn all_finite(samples: &[f64]) -> bool {
        samples.iter().all(|v| v.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn min_max_of_empty_or_nan_is_none() {
        assert_eq!(StatsHelper::min_max(&[]), None);
        assert_eq!(StatsHelper::min_max(&[f64::NAN]), None);
    }

    #[test]
    fn min_max_skips_non_finite_values() {
        assert_eq!(
            StatsHelper::min_max(&[3.0, f64::NAN, -1.0, 7.5]),
            Some((-1.0, 7.5))
        );
        assert!(!StatsHelper::all_finite(&[1.0, f64::INFINITY]));
    }
}
