pub mod geotiff;

pub use geotiff::GeoTiffWriter;
