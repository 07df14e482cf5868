use crate::config::{OutputCrs, RectifyConfig, SurveyContext, TileKind};
use crate::geo::segment::Point2;
use crate::math::affine::{barycentric, strip_triangles, PiecewiseAffine};
use crate::math::interp::bilinear;
use crate::math::stats::StatsHelper;
use crate::prelude::{ChunkStage, StageError, StageResult};
use crate::processing::smoother::subsample;
use crate::processing::working_set::ChunkWorkingSet;
use crate::telemetry::log::LogManager;
use crate::track::TrackRow;
use ndarray::{Array2, ArrayView2};

/// North-up, pixel-is-area georeferencing of a tile.
///
/// `x_origin`/`y_origin` are the outer corner of the top-left pixel; pixel
/// sizes are positive and rows run southwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    pub x_origin: f64,
    pub y_origin: f64,
    pub x_res: f64,
    pub y_res: f64,
}

impl GeoTransform {
    pub fn pixel_center(&self, row: usize, col: usize) -> (f64, f64) {
        (
            self.x_origin + (col as f64 + 0.5) * self.x_res,
            self.y_origin - (row as f64 + 0.5) * self.y_res,
        )
    }
}

/// Rectified intensity for one chunk, NaN where no ping covered the pixel.
#[derive(Debug, Clone)]
pub struct RectifiedTile {
    pub chunk_id: u32,
    pub kind: TileKind,
    pub epsg: u16,
    pub transform: GeoTransform,
    pub data: Array2<f32>,
}

impl RectifiedTile {
    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    pub fn height(&self) -> usize {
        self.data.nrows()
    }

    /// 8-bit band with uncovered pixels set to the nodata value 0.
    pub fn to_u8(&self) -> Array2<u8> {
        self.data.mapv(|v| {
            if v.is_finite() {
                v.round().clamp(0.0, u8::MAX as f32) as u8
            } else {
                0
            }
        })
    }

    pub fn covered_pixels(&self) -> usize {
        self.data.iter().filter(|v| v.is_finite()).count()
    }
}

/// Matched control points of one chunk: ping-space and world-space, in
/// interleaved `(nadir, outer edge)` pairs.
#[derive(Debug, Clone)]
pub struct ControlGrid {
    pub pix: Vec<Point2>,
    pub dst: Vec<Point2>,
    /// Same points in UTM metres, used for the output shape.
    pub metric: Vec<Point2>,
}

/// Warps a chunk's ping-by-sample raster onto a georeferenced grid with a
/// piecewise-affine transform.
pub struct Rectifier {
    filt: usize,
    max_tile_pixels: usize,
    output_crs: OutputCrs,
    epsg: u16,
    logger: LogManager,
}

impl Rectifier {
    pub fn new(
        config: &RectifyConfig,
        output_crs: OutputCrs,
        epsg: u16,
        logger: LogManager,
    ) -> Self {
        Self {
            filt: config.filt,
            max_tile_pixels: config.max_tile_pixels,
            output_crs,
            epsg,
            logger,
        }
    }

    pub fn for_context(context: &SurveyContext, logger: LogManager) -> Self {
        Self::new(
            &context.config.rectify,
            context.config.output_crs,
            context.tile_epsg(),
            logger,
        )
    }

    /// Control points for every `filt`-th ping plus the last: sample row 0
    /// pairs with the trackline, row `samples` with the range extent.
    pub fn control_grid(&self, rows: &[TrackRow], samples: usize) -> ControlGrid {
        let all: Vec<usize> = (0..rows.len()).collect();
        let columns = subsample(&all, self.filt);

        let mut grid = ControlGrid {
            pix: Vec::with_capacity(columns.len() * 2),
            dst: Vec::with_capacity(columns.len() * 2),
            metric: Vec::with_capacity(columns.len() * 2),
        };
        for &col in &columns {
            let row = &rows[col];
            grid.pix.push(Point2::new(col as f64, 0.0));
            grid.pix.push(Point2::new(col as f64, samples as f64));
            match self.output_crs {
                OutputCrs::Utm => {
                    grid.dst.push(Point2::new(row.utm_es, row.utm_ns));
                    grid.dst.push(Point2::new(row.range_es, row.range_ns));
                }
                OutputCrs::Wgs84 => {
                    grid.dst.push(Point2::new(row.lons, row.lats));
                    grid.dst.push(Point2::new(row.range_lons, row.range_lats));
                }
            }
            grid.metric.push(Point2::new(row.utm_es, row.utm_ns));
            grid.metric.push(Point2::new(row.range_es, row.range_ns));
        }
        grid
    }

    pub fn rectify(&self, working: &ChunkWorkingSet) -> StageResult<RectifiedTile> {
        let chunk_id = working.chunk_id;
        let fail = |reason: String| StageError::chunk(chunk_id, reason);

        if working.rows.len() < 2 {
            return Err(fail(format!("{} ping(s) cannot span a tile", working.rows.len())));
        }
        let pix_m = working
            .rows
            .iter()
            .map(|row| row.pix_m)
            .filter(|p| p.is_finite() && *p > 0.0)
            .fold(f64::NAN, f64::max);
        if !pix_m.is_finite() {
            return Err(fail("no usable pixel size".into()));
        }

        let grid = self.control_grid(&working.rows, working.max_samples());
        let coords: Vec<f64> = grid
            .dst
            .iter()
            .chain(&grid.metric)
            .flat_map(|p| [p.x, p.y])
            .collect();
        if !StatsHelper::all_finite(&coords) {
            return Err(fail("non-finite control coordinates".into()));
        }

        let (x_min, x_max, y_min, y_max) = extent(&grid.dst);
        let (e_min, e_max, n_min, n_max) = extent(&grid.metric);
        let out_w = ((e_max - e_min) / pix_m).round() as usize;
        let out_h = ((n_max - n_min) / pix_m).round() as usize;
        if out_w == 0 || out_h == 0 || x_max <= x_min || y_max <= y_min {
            return Err(fail("control points have zero extent".into()));
        }
        let pixels = (out_w + 1).saturating_mul(out_h + 1);
        if pixels > self.max_tile_pixels {
            return Err(fail(format!(
                "{}x{} tile exceeds the {} pixel limit",
                out_w + 1,
                out_h + 1,
                self.max_tile_pixels
            )));
        }

        let standardized: Vec<Point2> = grid
            .dst
            .iter()
            .map(|p| {
                Point2::new(
                    (p.x - x_min) / (x_max - x_min) * out_w as f64,
                    (p.y - y_min) / (y_max - y_min) * out_h as f64,
                )
            })
            .collect();
        let warp = PiecewiseAffine::estimate(
            &grid.pix,
            &standardized,
            &strip_triangles(grid.pix.len() / 2),
        )
        .ok_or_else(|| fail("piecewise-affine transform could not be fitted".into()))?;

        let data = warp_raster(working.intensity.view(), &warp, out_w, out_h);
        let transform = GeoTransform {
            x_res: (x_max - x_min) / out_w as f64,
            y_res: (y_max - y_min) / out_h as f64,
            x_origin: x_min - (x_max - x_min) / out_w as f64 / 2.0,
            y_origin: y_max + (y_max - y_min) / out_h as f64 / 2.0,
        };
        let tile = RectifiedTile {
            chunk_id,
            kind: working.kind,
            epsg: self.epsg,
            transform,
            data,
        };
        if tile.covered_pixels() == 0 {
            return Err(fail("warp covered no pixels".into()));
        }
        self.logger.detail(&format!(
            "chunk {} warped to {}x{} through {} pieces",
            chunk_id,
            tile.width(),
            tile.height(),
            warp.pieces().len()
        ));
        Ok(tile)
    }
}

impl ChunkStage for Rectifier {
    fn name(&self) -> &'static str {
        "rectify"
    }

    fn execute(&self, mut working: ChunkWorkingSet) -> StageResult<ChunkWorkingSet> {
        let tile = self.rectify(&working)?;
        working.tile = Some(tile);
        Ok(working)
    }
}

fn extent(points: &[Point2]) -> (f64, f64, f64, f64) {
    let xs: Vec<f64> = points.iter().map(|p| p.x).collect();
    let ys: Vec<f64> = points.iter().map(|p| p.y).collect();
    let (x_min, x_max) = StatsHelper::min_max(&xs).unwrap_or((0.0, 0.0));
    let (y_min, y_max) = StatsHelper::min_max(&ys).unwrap_or((0.0, 0.0));
    (x_min, x_max, y_min, y_max)
}

/// Inverse-maps every grid node covered by a triangle back into ping space.
/// Output rows are flipped so row 0 is the northern edge.
fn warp_raster(
    intensity: ArrayView2<u8>,
    warp: &PiecewiseAffine,
    out_w: usize,
    out_h: usize,
) -> Array2<f32> {
    let mut data = Array2::<f32>::from_elem((out_h + 1, out_w + 1), f32::NAN);
    for piece in warp.pieces() {
        let xs = piece.dst.map(|p| p.x);
        let ys = piece.dst.map(|p| p.y);
        let (col_lo, col_hi) = span(xs, out_w);
        let (row_lo, row_hi) = span(ys, out_h);

        for y in row_lo..=row_hi {
            for x in col_lo..=col_hi {
                let cell = &mut data[[out_h - y, x]];
                if !cell.is_nan() {
                    continue;
                }
                let node = Point2::new(x as f64, y as f64);
                if barycentric(node, piece.dst).is_none() {
                    continue;
                }
                let src = piece.inverse.apply(node);
                *cell = bilinear(intensity, src.y, src.x);
            }
        }
    }
    data
}

/// Grid nodes `lo..=hi` spanned by a triangle's coordinates, clamped to `0..=limit`.
fn span(values: [f64; 3], limit: usize) -> (usize, usize) {
    let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    (lo.floor().max(0.0) as usize, (hi.ceil() as usize).min(limit))
}
