pub mod affine;
pub mod interp;
pub mod spline;
pub mod stats;

pub use affine::{Affine2, PiecewiseAffine};
pub use spline::{ParametricSpline, SplineError};
pub use stats::StatsHelper;
