pub mod bearing;
pub mod projection;
pub mod segment;

pub use bearing::{course_over_ground, destination_point, initial_bearing, normalize_bearing};
pub use projection::GeodeticProjector;
pub use segment::{LineCoefficients, PingSegment, Point2};
