use crate::config::{SplineDegree, SurveyContext, TileKind};
use crate::geo::bearing::course_over_ground;
use crate::geo::projection::GeodeticProjector;
use crate::geo::segment::{PingSegment, Point2};
use crate::prelude::{ChunkStage, StageError, StageResult};
use crate::processing::overlap::{OverlapResolution, OverlapResolver};
use crate::processing::range_extent::{RangeExtent, RangeExtentEstimator};
use crate::processing::rectify::Rectifier;
use crate::processing::slant_range::SlantRangeCorrector;
use crate::processing::smoother::{SmoothingMode, TrackPoint, TrackSmoother};
use crate::processing::source::IntensitySource;
use crate::processing::working_set::ChunkWorkingSet;
use crate::raster::GeoTiffWriter;
use crate::telemetry::log::LogManager;
use crate::telemetry::metrics::{MetricsRecorder, RunSummary};
use crate::track::{PingRecord, TrackRow, TrackTable};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Overlap screening of one chunk, kept for reporting and re-checks.
#[derive(Debug, Clone)]
pub struct ChunkOverlap {
    pub chunk_id: u32,
    pub footprints: Vec<PingSegment>,
    pub resolution: OverlapResolution,
}

/// Result of the survey-wide trackline pass.
#[derive(Debug, Clone)]
pub struct TrackBuild {
    pub table: TrackTable,
    pub trackline_mode: SmoothingMode,
    pub overlaps: Vec<ChunkOverlap>,
}

/// Runs one sonar channel end to end: trackline and range-extent table for
/// the whole survey, then independent per-chunk tiles.
pub struct SurveyPipeline {
    context: Arc<SurveyContext>,
    metrics: Arc<MetricsRecorder>,
    logger: LogManager,
}

impl SurveyPipeline {
    pub fn new(context: SurveyContext) -> Self {
        let logger = LogManager::scoped(context.beam_name());
        Self {
            context: Arc::new(context),
            metrics: Arc::new(MetricsRecorder::new()),
            logger,
        }
    }

    pub fn context(&self) -> &SurveyContext {
        &self.context
    }

    pub fn metrics(&self) -> &MetricsRecorder {
        &self.metrics
    }

    /// Smooths the trackline, places every ping's range extent, drops
    /// crossing footprints per chunk and re-smooths the range extent through
    /// the survivors. Rows are collected once, in record order.
    pub fn build_track_table(&self, pings: &[PingRecord]) -> StageResult<TrackBuild> {
        let mut pings = pings.to_vec();
        pings.sort_by_key(|ping| ping.record_num);
        if pings.is_empty() {
            return Err(StageError::InvalidInput("survey has no pings".into()));
        }
        let config = &self.context.config;
        let projector = GeodeticProjector::new(self.context.utm_epsg)?;

        let smoother = TrackSmoother::new(&config.smoothing, self.logger.child("trackline"));
        let track = smoother.smooth_track(&pings, &projector)?;
        if track.mode.is_fallback() {
            self.metrics.record_fallback();
        }

        let estimator = RangeExtentEstimator::new(
            config.channel,
            config.flip_channel,
            self.logger.child("range"),
        );
        let extents = estimator.estimate(&pings, &track, &projector)?;
        self.metrics.record_dropped_rows(pings.len() - extents.len());

        let mut chunks: BTreeMap<u32, Vec<&RangeExtent>> = BTreeMap::new();
        for extent in &extents {
            chunks.entry(extent.chunk_id).or_default().push(extent);
        }

        let resolver = OverlapResolver::new(&config.overlap, self.logger.child("overlap"));
        let extent_smoother = TrackSmoother::with_degree(
            config.overlap.filt,
            SplineDegree::Linear,
            false,
            self.logger.child("range-extent"),
        );

        let mut rows = Vec::with_capacity(extents.len());
        let mut overlaps = Vec::with_capacity(chunks.len());
        for (&chunk_id, group) in &chunks {
            let footprints: Vec<PingSegment> = group
                .iter()
                .map(|e| {
                    PingSegment::new(
                        Point2::new(track.utm_es[e.index], track.utm_ns[e.index]),
                        Point2::new(e.range_e, e.range_n),
                        e.range,
                    )
                })
                .collect();
            let resolution = resolver.resolve(&footprints);
            self.metrics.record_overlap_removed(resolution.removed.len());

            let points: Vec<TrackPoint> = group
                .iter()
                .map(|e| TrackPoint {
                    record_num: e.record_num,
                    time_s: pings[e.index].time_s,
                    x: e.range_lon,
                    y: e.range_lat,
                })
                .collect();
            let smoothed = extent_smoother.smooth_through(&points, &resolution.survivors);
            if smoothed.mode.is_fallback() {
                self.metrics.record_fallback();
            }
            let (range_es, range_ns) = projector.project_all(&smoothed.xs, &smoothed.ys)?;
            let range_cog = course_over_ground(&smoothed.xs, &smoothed.ys);

            for (k, extent) in group.iter().enumerate() {
                let ping = &pings[extent.index];
                rows.push(TrackRow {
                    record_num: ping.record_num,
                    chunk_id,
                    ping_cnt: ping.ping_cnt,
                    time_s: ping.time_s,
                    pix_m: ping.pix_m,
                    dep_m: ping.depth_m(),
                    instr_heading: ping.instr_heading,
                    lons: track.lons[extent.index],
                    lats: track.lats[extent.index],
                    utm_es: track.utm_es[extent.index],
                    utm_ns: track.utm_ns[extent.index],
                    cog: track.cog[extent.index],
                    range: extent.range,
                    ping_bearing: extent.ping_bearing,
                    range_lons: smoothed.xs[k],
                    range_lats: smoothed.ys[k],
                    range_es: range_es[k],
                    range_ns: range_ns[k],
                    range_cog: range_cog[k],
                });
            }
            if !resolution.removed.is_empty() {
                self.logger.record(&format!(
                    "chunk {}: {} crossing pings removed before range-extent smoothing",
                    chunk_id,
                    resolution.removed.len()
                ));
            }
            overlaps.push(ChunkOverlap {
                chunk_id,
                footprints,
                resolution,
            });
        }

        let table = TrackTable::new(rows);
        self.metrics.record_track(pings.len(), overlaps.len());
        self.logger.record(&format!(
            "track table built: {} of {} pings in {} chunks",
            table.len(),
            pings.len(),
            overlaps.len()
        ));
        Ok(TrackBuild {
            table,
            trackline_mode: track.mode,
            overlaps,
        })
    }

    /// Rectifies every chunk on a bounded pool of blocking workers.
    ///
    /// A chunk that fails is logged and recorded as skipped; only failures
    /// of the pool itself are returned as errors.
    pub fn rectify_chunks(
        &self,
        table: Arc<TrackTable>,
        source: Arc<dyn IntensitySource>,
    ) -> StageResult<Vec<PathBuf>> {
        let workers = self.context.worker_count();
        let drive = move || -> StageResult<Vec<PathBuf>> {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(1)
                .max_blocking_threads(workers)
                .thread_name("chunk-worker")
                .build()?;
            runtime.block_on(self.dispatch(table, source, workers))
        };

        // A thread already driving a runtime cannot block on another one.
        if tokio::runtime::Handle::try_current().is_err() {
            return drive();
        }
        self.logger
            .detail("called from an async context; driving the chunk pool on its own thread");
        std::thread::scope(|scope| {
            scope
                .spawn(drive)
                .join()
                .map_err(|_| StageError::Internal("chunk pool thread panicked".into()))?
        })
    }

    async fn dispatch(
        &self,
        table: Arc<TrackTable>,
        source: Arc<dyn IntensitySource>,
        workers: usize,
    ) -> StageResult<Vec<PathBuf>> {
        let semaphore = Arc::new(Semaphore::new(workers));
        let mut jobs = Vec::new();
        for chunk_id in table.chunk_ids() {
            for &kind in &self.context.config.rectify.tiles {
                let permit = Arc::clone(&semaphore)
                    .acquire_owned()
                    .await
                    .map_err(|err| StageError::Internal(err.to_string()))?;
                let context = Arc::clone(&self.context);
                let table = Arc::clone(&table);
                let source = Arc::clone(&source);
                let logger = self.logger.child(format!("chunk {}", chunk_id));
                let handle = tokio::task::spawn_blocking(move || {
                    let _permit = permit;
                    process_chunk(&context, &table, source.as_ref(), chunk_id, kind, &logger)
                });
                jobs.push((chunk_id, kind, handle));
            }
        }

        let mut written = Vec::with_capacity(jobs.len());
        for (chunk_id, kind, handle) in jobs {
            let reason = match handle.await {
                Ok(Ok(path)) => {
                    self.metrics.record_tile();
                    written.push(path);
                    continue;
                }
                Ok(Err(err)) => err.to_string(),
                Err(err) => format!("worker aborted: {}", err),
            };
            self.logger.warn(&format!(
                "{} tile for chunk {} skipped: {}",
                kind.prefix(),
                chunk_id,
                reason
            ));
            self.metrics
                .record_skipped(chunk_id, format!("{}: {}", kind.prefix(), reason));
        }
        written.sort();
        Ok(written)
    }

    /// Full run: build the table, persist it, reload it for the chunk
    /// workers, write tiles and return the run summary.
    pub fn run(
        &self,
        pings: &[PingRecord],
        source: Arc<dyn IntensitySource>,
    ) -> StageResult<RunSummary> {
        let build = self.build_track_table(pings)?;
        let table_path = self.context.track_table_path();
        build.table.write_csv(&table_path)?;
        self.logger
            .record(&format!("track table written to {}", table_path.display()));

        let table = Arc::new(TrackTable::load_csv(&table_path)?);
        let tiles = self.rectify_chunks(table, source)?;

        let summary = self.metrics.snapshot();
        self.logger.record(&format!(
            "{} tiles written, {} skipped",
            tiles.len(),
            summary.skipped.len()
        ));
        Ok(summary)
    }
}

/// `load -> correct -> warp -> write` for one chunk and tile kind.
pub fn process_chunk(
    context: &SurveyContext,
    table: &TrackTable,
    source: &dyn IntensitySource,
    chunk_id: u32,
    kind: TileKind,
    logger: &LogManager,
) -> StageResult<PathBuf> {
    let mut working = ChunkWorkingSet::load(chunk_id, kind, table.chunk_rows(chunk_id), source)?;
    if working.missing_pings > 0 {
        logger.warn(&format!(
            "{} pings have no intensity samples",
            working.missing_pings
        ));
    }

    let mut stages: Vec<Box<dyn ChunkStage>> = Vec::new();
    if kind == TileKind::SlantRangeCorrected {
        stages.push(Box::new(SlantRangeCorrector::new(logger.clone())));
    }
    stages.push(Box::new(Rectifier::for_context(context, logger.clone())));
    for stage in &stages {
        logger.detail(&format!("running {}", stage.name()));
        working = stage.execute(working)?;
    }

    let tile = working
        .tile
        .ok_or_else(|| StageError::chunk(chunk_id, "no tile produced"))?;
    let path = context.tile_path(kind, chunk_id);
    GeoTiffWriter::new().write(&tile, &path)?;
    logger.record(&format!(
        "wrote {} ({}x{})",
        path.display(),
        tile.width(),
        tile.height()
    ));
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Channel, OverlapConfig, RectifyConfig, SmoothingConfig, SurveyConfig};
    use crate::fixtures;
    use crate::processing::source::InMemoryIntensity;
    use tiff::decoder::Decoder;

    fn context(config: SurveyConfig, dir: &std::path::Path, first: &PingRecord) -> SurveyContext {
        SurveyContext::new(config, dir, first.lon, first.lat).unwrap()
    }

    fn flat_bottom(pings: &[PingRecord]) -> Arc<dyn IntensitySource> {
        let source: InMemoryIntensity = pings
            .iter()
            .map(|p| {
                let samples = (0..p.ping_cnt as usize)
                    .map(|i| if i < 50 { 5 } else { 60 + (i % 90) as u8 })
                    .collect();
                (p.record_num, samples)
            })
            .collect();
        Arc::new(source)
    }

    fn survey_config() -> SurveyConfig {
        SurveyConfig {
            channel: Channel::Port,
            workers: Some(2),
            ..SurveyConfig::default()
        }
    }

    #[test]
    fn straight_survey_produces_two_range_tall_tiles() {
        let dir = tempfile::tempdir().unwrap();
        let (pings, _) = fixtures::straight_survey(1000, 500, 200, 0.02, 90.0);
        let pipeline = SurveyPipeline::new(context(survey_config(), dir.path(), &pings[0]));

        let build = pipeline.build_track_table(&pings).unwrap();
        assert_eq!(build.table.chunk_ids(), vec![0, 1]);
        for row in build.table.chunk_rows(0) {
            assert!((row.range - 4.0).abs() < 1e-12);
        }
        assert!(build.overlaps.iter().all(|o| o.resolution.removed.is_empty()));

        let summary = pipeline.run(&pings, flat_bottom(&pings)).unwrap();
        assert_eq!(summary.chunks, 2);
        assert_eq!(summary.tiles_written, 2);
        assert!(summary.skipped.is_empty());
        assert!(pipeline.context().track_table_path().exists());

        let tile = pipeline.context().tile_path(TileKind::WaterColumnPresent, 0);
        let mut decoder = Decoder::new(std::fs::File::open(tile).unwrap()).unwrap();
        let (width, height) = decoder.dimensions().unwrap();
        assert!((height as i64 - 201).abs() <= 1, "height {}", height);
        assert!((width as i64 - 2496).abs() <= 3, "width {}", width);
    }

    #[test]
    fn u_turn_crossings_are_removed() {
        let dir = tempfile::tempdir().unwrap();
        let (pings, _) = fixtures::u_turn_survey(200, 3.0, 500, 0.02);
        let config = SurveyConfig {
            smoothing: SmoothingConfig {
                filt: 10,
                ..SmoothingConfig::default()
            },
            overlap: OverlapConfig {
                filt: 5,
                ..OverlapConfig::default()
            },
            ..survey_config()
        };
        let pipeline = SurveyPipeline::new(context(config, dir.path(), &pings[0]));
        let build = pipeline.build_track_table(&pings).unwrap();
        assert_eq!(build.table.len(), 200);

        let overlap = &build.overlaps[0];
        assert!(!overlap.resolution.removed.is_empty());
        let resolver = OverlapResolver::new(&OverlapConfig::default(), LogManager::default());
        let survivors = &overlap.resolution.survivors;
        for (a, &i) in survivors.iter().enumerate() {
            for &j in &survivors[a + 1..] {
                assert!(!resolver.crosses(&overlap.footprints[i], &overlap.footprints[j]));
            }
        }
        assert_eq!(survivors.last(), Some(&199));
        assert_eq!(
            pipeline.metrics().snapshot().overlap_removed,
            overlap.resolution.removed.len()
        );
    }

    #[test]
    fn unusable_chunk_is_skipped_and_run_continues() {
        let dir = tempfile::tempdir().unwrap();
        let (mut pings, _) = fixtures::straight_survey(400, 200, 200, 0.02, 0.0);
        for ping in pings.iter_mut().filter(|p| p.chunk_id == 1) {
            ping.ping_cnt = 0;
        }
        let pipeline = SurveyPipeline::new(context(survey_config(), dir.path(), &pings[0]));
        let summary = pipeline.run(&pings, flat_bottom(&pings)).unwrap();

        assert_eq!(summary.tiles_written, 1);
        assert_eq!(summary.skipped.len(), 1);
        assert_eq!(summary.skipped[0].chunk_id, 1);
        assert!(pipeline
            .context()
            .tile_path(TileKind::WaterColumnPresent, 0)
            .exists());
        assert!(!pipeline
            .context()
            .tile_path(TileKind::WaterColumnPresent, 1)
            .exists());
    }

    #[test]
    fn chunk_losing_every_tile_kind_is_reported_once() {
        let dir = tempfile::tempdir().unwrap();
        let (mut pings, _) = fixtures::straight_survey(400, 200, 200, 0.02, 0.0);
        for ping in pings.iter_mut().filter(|p| p.chunk_id == 1) {
            ping.ping_cnt = 0;
        }
        let config = SurveyConfig {
            rectify: RectifyConfig {
                tiles: vec![TileKind::WaterColumnPresent, TileKind::SlantRangeCorrected],
                ..RectifyConfig::default()
            },
            ..survey_config()
        };
        let pipeline = SurveyPipeline::new(context(config, dir.path(), &pings[0]));
        let summary = pipeline.run(&pings, flat_bottom(&pings)).unwrap();

        assert_eq!(summary.tiles_written, 2);
        assert_eq!(summary.skipped.len(), 1);
        assert_eq!(summary.skipped[0].chunk_id, 1);
        assert!(summary.skipped[0].reason.contains("; "));
    }

    #[test]
    fn run_inside_an_async_runtime() {
        let dir = tempfile::tempdir().unwrap();
        let (pings, _) = fixtures::straight_survey(300, 150, 200, 0.02, 0.0);
        let pipeline = SurveyPipeline::new(context(survey_config(), dir.path(), &pings[0]));
        let source = flat_bottom(&pings);

        let multi = tokio::runtime::Builder::new_multi_thread().build().unwrap();
        let summary = multi.block_on(async { pipeline.run(&pings, Arc::clone(&source)) });
        assert_eq!(summary.unwrap().tiles_written, 2);

        let single = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let summary = single.block_on(async { pipeline.run(&pings, source) });
        assert!(summary.unwrap().skipped.is_empty());
    }

    #[test]
    fn both_tile_kinds_are_written_per_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let (pings, _) = fixtures::straight_survey(300, 150, 200, 0.02, 0.0);
        let config = SurveyConfig {
            rectify: RectifyConfig {
                tiles: vec![TileKind::WaterColumnPresent, TileKind::SlantRangeCorrected],
                ..RectifyConfig::default()
            },
            ..survey_config()
        };
        let pipeline = SurveyPipeline::new(context(config, dir.path(), &pings[0]));
        let summary = pipeline.run(&pings, flat_bottom(&pings)).unwrap();

        assert_eq!(summary.tiles_written, 4);
        for chunk in 0..2 {
            assert!(pipeline
                .context()
                .tile_path(TileKind::SlantRangeCorrected, chunk)
                .exists());
        }
    }

    #[test]
    fn empty_survey_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = SurveyContext::new(survey_config(), dir.path(), -87.0, 43.07).unwrap();
        let err = SurveyPipeline::new(ctx).build_track_table(&[]).unwrap_err();
        assert!(matches!(err, StageError::InvalidInput(_)));
    }
}
