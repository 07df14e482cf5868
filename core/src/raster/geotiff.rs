use crate::config::WGS84_EPSG;
use crate::prelude::{StageError, StageResult};
use crate::processing::rectify::RectifiedTile;
use std::io::{Seek, Write};
use std::path::Path;
use tiff::encoder::{colortype, compression::Lzw, TiffEncoder};
use tiff::tags::Tag;

const GT_MODEL_TYPE: u16 = 1024;
const GT_RASTER_TYPE: u16 = 1025;
const GEOGRAPHIC_TYPE: u16 = 2048;
const PROJECTED_CS_TYPE: u16 = 3072;
const MODEL_PROJECTED: u16 = 1;
const MODEL_GEOGRAPHIC: u16 = 2;
const RASTER_PIXEL_IS_AREA: u16 = 1;

/// Writes rectified tiles as single-band, LZW-compressed GeoTIFFs with
/// nodata 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoTiffWriter;

impl GeoTiffWriter {
    pub fn new() -> Self {
        Self
    }

    /// Encodes into a temporary file next to `path` and renames it into place,
    /// so `path` only ever holds a complete tile.
    pub fn write(&self, tile: &RectifiedTile, path: &Path) -> StageResult<()> {
        let dir = path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir)?;

        let mut staging = tempfile::NamedTempFile::new_in(dir)?;
        self.encode(tile, staging.as_file_mut())?;
        staging.as_file_mut().flush()?;
        staging
            .persist(path)
            .map_err(|err| StageError::Io(err.error))?;
        Ok(())
    }

    pub fn encode<W: Write + Seek>(&self, tile: &RectifiedTile, sink: W) -> StageResult<()> {
        if tile.width() == 0 || tile.height() == 0 {
            return Err(StageError::chunk(tile.chunk_id, "tile has no pixels"));
        }
        let width = u32::try_from(tile.width())
            .map_err(|_| StageError::chunk(tile.chunk_id, "tile too wide for TIFF"))?;
        let height = u32::try_from(tile.height())
            .map_err(|_| StageError::chunk(tile.chunk_id, "tile too tall for TIFF"))?;
        let band: Vec<u8> = tile.to_u8().iter().copied().collect();
        let t = &tile.transform;

        let mut encoder = TiffEncoder::new(sink)?;
        let mut image = encoder.new_image_with_compression::<colortype::Gray8, _>(
            width,
            height,
            Lzw::default(),
        )?;
        let directory = image.encoder();
        directory.write_tag(Tag::ModelPixelScaleTag, &[t.x_res, t.y_res, 0.0][..])?;
        directory.write_tag(
            Tag::ModelTiepointTag,
            &[0.0, 0.0, 0.0, t.x_origin, t.y_origin, 0.0][..],
        )?;
        directory.write_tag(Tag::GeoKeyDirectoryTag, &geo_keys(tile.epsg)[..])?;
        directory.write_tag(Tag::GdalNodata, "0")?;
        image.write_data(&band)?;
        Ok(())
    }
}

/// GeoKeyDirectory for either a projected EPSG code or plain WGS84.
pub fn geo_keys(epsg: u16) -> Vec<u16> {
    let (model, crs_key) = if epsg == WGS84_EPSG {
        (MODEL_GEOGRAPHIC, GEOGRAPHIC_TYPE)
    } else {
        (MODEL_PROJECTED, PROJECTED_CS_TYPE)
    };
    let header = [1, 1, 0, 3];
    let keys = [
        [GT_MODEL_TYPE, 0, 1, model],
        [GT_RASTER_TYPE, 0, 1, RASTER_PIXEL_IS_AREA],
        [crs_key, 0, 1, epsg],
    ];
    header.into_iter().chain(keys.into_iter().flatten()).collect()
}
