//! The two end-to-end runs: building weather files for a period (`get`) and
//! extending an existing set of files up to the latest usable day (`update`).

use crate::config::{ExistingArtifacts, RunConfig};
use crate::error::DssatWeatherError;
use crate::fusion::{fuse_all, FusionReport};
use crate::incremental::{continuation_start, merge_wth, select_historical, MergeReport, Selection};
use crate::point_data::{FetchReport, PointFetcher};
use crate::precipitation::{merge_precipitation, preliminary_start, PrecipitationMerge};
use crate::raster::{default_opener, ChirpsDownloader, ExtractionStrategy, RasterExtractor, RasterOpener, RasterValueTable};
use crate::types::location::{Location, LocationTable};
use crate::types::ordinal_date::{DateRange, OrdinalDate};
use crate::utils::recreate_dir;
use bon::bon;
use chrono::{Days, Local, NaiveDate};
use log::info;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task;

/// Working directories of one run, all below a `temp/` folder next to the point list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    pub temp_dir: PathBuf,
    /// Raw point API documents, one per point identifier.
    pub points_dir: PathBuf,
    pub corrected_dir: PathBuf,
    pub preliminary_dir: PathBuf,
    /// Serialized precipitation tables.
    pub precipitation_dir: PathBuf,
    /// Copies of the files being extended (update runs).
    pub historical_dir: PathBuf,
    /// Fused files for the continuation window (update runs).
    pub update_dir: PathBuf,
}

impl RunContext {
    pub fn new(points_csv: &Path) -> Self {
        let base = points_csv
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let temp_dir = base.join("temp");
        Self {
            points_dir: temp_dir.join("nasap"),
            corrected_dir: temp_dir.join("in_nc_cor"),
            preliminary_dir: temp_dir.join("in_nc_pre"),
            precipitation_dir: temp_dir.join("prec"),
            historical_dir: temp_dir.join("historical"),
            update_dir: temp_dir.join("update"),
            temp_dir,
        }
    }

    /// Wipes and recreates the working tree. Point documents from earlier runs are
    /// kept when `existing` is [`ExistingArtifacts::SkipExisting`].
    pub fn prepare(&self, existing: ExistingArtifacts) -> Result<(), DssatWeatherError> {
        let wiped = match existing {
            ExistingArtifacts::Overwrite => vec![&self.temp_dir],
            ExistingArtifacts::SkipExisting => vec![
                &self.corrected_dir,
                &self.preliminary_dir,
                &self.precipitation_dir,
                &self.historical_dir,
                &self.update_dir,
            ],
        };
        for dir in wiped {
            recreate_dir(dir).map_err(|e| DssatWeatherError::WorkDir(dir.clone(), e))?;
        }
        for dir in [&self.points_dir, &self.precipitation_dir] {
            std::fs::create_dir_all(dir).map_err(|e| DssatWeatherError::WorkDir(dir.clone(), e))?;
        }
        Ok(())
    }
}

/// What a run did, for printing at the end.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    pub output_dir: PathBuf,
    pub range: Option<DateRange>,
    pub locations: usize,
    pub fetch: FetchReport,
    pub fusion: FusionReport,
    /// Locations present in only one of the corrected and preliminary tables.
    pub divergent_ids: Vec<i64>,
    pub preliminary_skipped: bool,
    /// Update runs: the historical file selection.
    pub selection: Option<Selection>,
    /// Update runs: files extended and files left unchanged.
    pub merge: Option<MergeReport>,
    /// Update runs that stopped early, either because the historical files are
    /// already current or because none were found.
    pub nothing_to_update: bool,
    pub elapsed: Duration,
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nothing_to_update {
            match &self.selection {
                Some(selection) if selection.selected.is_empty() => {
                    writeln!(f, "No historical WTH files found, nothing to update.")?
                }
                _ => writeln!(f, "Nothing to update.")?,
            }
            return write!(f, "Time for execution is: {:?}", self.elapsed);
        }
        if let Some(range) = &self.range {
            writeln!(f, "Period: {}", range)?;
        }
        writeln!(
            f,
            "Locations: {}, point files: {}/{}",
            self.locations, self.fetch.succeeded, self.fetch.requested
        )?;
        writeln!(f, "WTH files written: {} to {}", self.fusion.written.len(), self.output_dir.display())?;
        let truncated = self.fusion.qc_truncated();
        if !truncated.is_empty() {
            writeln!(f, "Truncated by SRAD quality control: {:?}", truncated)?;
        }
        if !self.divergent_ids.is_empty() {
            writeln!(f, "Missing from one precipitation product: {:?}", self.divergent_ids)?;
        }
        if let Some(selection) = &self.selection {
            if !selection.not_found.is_empty() {
                writeln!(f, "No historical file: {:?}", selection.not_found)?;
            }
            if !selection.no_records.is_empty() {
                writeln!(f, "Historical file without daily records: {:?}", selection.no_records)?;
            }
        }
        if let Some(merge) = &self.merge {
            if !merge.not_updated.is_empty() {
                writeln!(f, "Not updated: {:?}", merge.not_updated)?;
            }
        }
        write!(f, "Time for execution is: {:?}", self.elapsed)
    }
}

/// Builds and updates DSSAT weather files.
///
/// # Examples
///
/// ```no_run
/// # use dssat_weather::{DssatWeather, DssatWeatherError, RunConfig};
/// # use chrono::NaiveDate;
/// # use std::path::Path;
/// # async fn run() -> Result<(), DssatWeatherError> {
/// let app = DssatWeather::new(RunConfig::default());
/// let report = app
///     .get()
///     .points_csv(Path::new("points.csv"))
///     .start(NaiveDate::from_ymd_opt(2023, 1, 1).unwrap())
///     .end(NaiveDate::from_ymd_opt(2023, 6, 30).unwrap())
///     .out_dir(Path::new("DSSAT"))
///     .call()
///     .await?;
/// println!("{}", report);
/// # Ok(())
/// # }
/// ```
pub struct DssatWeather {
    config: RunConfig,
    opener: Arc<dyn RasterOpener>,
}

#[bon]
impl DssatWeather {
    /// Uses the raster backend compiled into this build.
    pub fn new(config: RunConfig) -> Self {
        Self::with_opener(config, Arc::from(default_opener()))
    }

    pub fn with_opener(config: RunConfig, opener: Arc<dyn RasterOpener>) -> Self {
        Self { config, opener }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Builds one WTH file per location for `start..=end` into `out_dir`.
    #[builder]
    pub async fn get(
        &self,
        points_csv: &Path,
        start: NaiveDate,
        end: NaiveDate,
        out_dir: &Path,
    ) -> Result<RunReport, DssatWeatherError> {
        let started = Instant::now();
        let range = DateRange::new(start, end)?;
        let table = load_locations(points_csv).await?;
        let ctx = RunContext::new(points_csv);
        ctx.prepare(self.config.existing_artifacts)?;
        let locations = Arc::new(table.locations().to_vec());

        println!("Getting NASA POWER data...");
        let fetch = self.fetch_points(&table.distinct_points(), range, &ctx).await?;

        println!("Getting corrected data from CHIRPS server...");
        let precipitation = self.precipitation(&ctx, Arc::clone(&locations), range).await?;

        println!("Building the WTH files...");
        let fusion = self
            .fuse(locations, &ctx.points_dir, precipitation.table, out_dir)
            .await?;

        Ok(RunReport {
            output_dir: out_dir.to_path_buf(),
            range: Some(range),
            locations: table.len(),
            fetch,
            fusion,
            divergent_ids: precipitation.divergent_ids,
            preliminary_skipped: precipitation.skipped_preliminary,
            elapsed: started.elapsed(),
            ..RunReport::default()
        })
    }

    /// Extends the files of `historical_dir` for the listed locations up to `today`
    /// (the local date when not given) minus the SRAD latency, writing the extended
    /// files to `out_dir`.
    #[builder]
    pub async fn update(
        &self,
        points_csv: &Path,
        historical_dir: &Path,
        out_dir: &Path,
        today: Option<NaiveDate>,
    ) -> Result<RunReport, DssatWeatherError> {
        let started = Instant::now();
        let table = load_locations(points_csv).await?;
        let ctx = RunContext::new(points_csv);
        ctx.prepare(self.config.existing_artifacts)?;

        println!("Selecting WTH files from repository...");
        let selection = select_historical(&table.ids(), historical_dir, &ctx.historical_dir)?;
        let mut report = RunReport {
            output_dir: out_dir.to_path_buf(),
            locations: table.len(),
            ..RunReport::default()
        };

        let today = today.unwrap_or_else(|| Local::now().date_naive());
        let end = today
            .checked_sub_days(Days::new(self.config.srad_latency_days))
            .unwrap_or(today);
        let start = match continuation_start(&ctx.historical_dir)? {
            None => {
                println!("No historical WTH files found, nothing to update.");
                None
            }
            Some(start) if start > end => {
                println!("The historical files are up to date, nothing to update.");
                None
            }
            start => start,
        };
        let Some(start) = start else {
            report.selection = Some(selection);
            report.nothing_to_update = true;
            report.elapsed = started.elapsed();
            return Ok(report);
        };
        let range = DateRange::new(start, end)?;
        info!("Update period: {}", range);

        let selected: Vec<Location> = table
            .locations()
            .iter()
            .filter(|l| selection.selected.contains(&l.id))
            .cloned()
            .collect();
        let selected_table = LocationTable::new(selected);
        let locations = Arc::new(selected_table.locations().to_vec());

        println!("Getting corrected data from CHIRPS server...");
        let precipitation = self.precipitation(&ctx, Arc::clone(&locations), range).await?;

        println!("Getting NASA POWER data...");
        let fetch = self
            .fetch_points(&selected_table.distinct_points(), range, &ctx)
            .await?;

        println!("Building the WTH files...");
        let fusion = self
            .fuse(locations, &ctx.points_dir, precipitation.table, &ctx.update_dir)
            .await?;

        println!("Merging historical with latest data...");
        let merge = merge_wth(&ctx.historical_dir, &ctx.update_dir, out_dir)?;

        report.range = Some(range);
        report.fetch = fetch;
        report.fusion = fusion;
        report.divergent_ids = precipitation.divergent_ids;
        report.preliminary_skipped = precipitation.skipped_preliminary;
        report.selection = Some(selection);
        report.merge = Some(merge);
        report.elapsed = started.elapsed();
        Ok(report)
    }
}

impl DssatWeather {
    async fn fetch_points(
        &self,
        points: &[Location],
        range: DateRange,
        ctx: &RunContext,
    ) -> Result<FetchReport, DssatWeatherError> {
        let report = PointFetcher::from_config(&self.config)
            .fetch(points, range, &ctx.points_dir)
            .await?;
        report.ensure_complete()?;
        Ok(report)
    }

    /// Corrected precipitation for `range`, topped up with preliminary data when the
    /// corrected product does not reach the end yet.
    async fn precipitation(
        &self,
        ctx: &RunContext,
        locations: Arc<Vec<Location>>,
        range: DateRange,
    ) -> Result<PrecipitationMerge, DssatWeatherError> {
        let downloader = ChirpsDownloader::from_config(&self.config)?;
        let strategy = self.config.raster_strategy.resolve(range.days());
        let end = OrdinalDate::new(range.end);

        downloader.corrected(range.start, range.end, &ctx.corrected_dir).await?;
        println!("Processing CHIRPS data...");
        let corrected = self
            .extract(ctx.corrected_dir.clone(), Arc::clone(&locations), strategy)
            .await?;
        corrected.save(&ctx.precipitation_dir.join("prec_corr.bin"))?;

        let merged = match preliminary_start(&corrected, &range) {
            Some(start) => {
                println!("Getting preliminary data from CHIRPS server...");
                downloader.preliminary(start, range.end, &ctx.preliminary_dir).await?;
                let preliminary = self
                    .extract(ctx.preliminary_dir.clone(), locations, strategy)
                    .await?;
                preliminary.save(&ctx.precipitation_dir.join("prec_prelim.bin"))?;
                merge_precipitation(&corrected, Some(&preliminary), end)?
            }
            None => merge_precipitation(&corrected, None, end)?,
        };
        merged.table.save(&ctx.precipitation_dir.join("prec.bin"))?;
        println!("CHIRPS processing data are complete.");
        Ok(merged)
    }

    async fn extract(
        &self,
        dir: PathBuf,
        locations: Arc<Vec<Location>>,
        strategy: ExtractionStrategy,
    ) -> Result<RasterValueTable, DssatWeatherError> {
        let opener = Arc::clone(&self.opener);
        let table = task::spawn_blocking(move || {
            RasterExtractor::new(opener.as_ref()).extract(&dir, &locations, strategy)
        })
        .await??;
        Ok(table)
    }

    async fn fuse(
        &self,
        locations: Arc<Vec<Location>>,
        points_dir: &Path,
        precipitation: RasterValueTable,
        out_dir: &Path,
    ) -> Result<FusionReport, DssatWeatherError> {
        let points_dir = points_dir.to_path_buf();
        let out_dir = out_dir.to_path_buf();
        let report = task::spawn_blocking(move || fuse_all(&locations, &points_dir, &precipitation, &out_dir)).await??;
        Ok(report)
    }
}

async fn load_locations(points_csv: &Path) -> Result<LocationTable, DssatWeatherError> {
    let path = points_csv.to_path_buf();
    let table = task::spawn_blocking(move || LocationTable::from_csv(&path)).await??;
    info!("Loaded {} location(s) from {}", table.len(), points_csv.display());
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fusion::output_path;
    use crate::point_data::icasa::sample_document;
    use crate::raster::extractor::tests::raster;
    use crate::raster::MemoryOpener;
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const POINTS: &str = "ID,Latitude,Longitude,nasapid,LatNP,LonNP\n\
                          1,2.5,0.5,100,2.5,0.5\n\
                          2,0.5,3.5,100,2.5,0.5\n";

    fn app(server: &MockServer, opener: MemoryOpener) -> DssatWeather {
        app_with(server, opener, ExistingArtifacts::Overwrite)
    }

    fn app_with(server: &MockServer, opener: MemoryOpener, existing: ExistingArtifacts) -> DssatWeather {
        let config = RunConfig::builder()
            .power_base_url(server.uri())
            .chirps_base_url(server.uri())
            .workers(2)
            .request_timeout(Duration::from_secs(5))
            .connect_retries(0)
            .raster_connect_retries(0)
            .existing_artifacts(existing)
            .build();
        DssatWeather::with_opener(config, Arc::new(opener))
    }

    async fn mount_power(server: &MockServer, body: String) {
        Mock::given(method("GET"))
            .and(path("/api/temporal/daily/point"))
            .and(query_param("format", "ICASA"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;
    }

    async fn mount_file(server: &MockServer, file: &str) {
        Mock::given(method("GET"))
            .and(path(file.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_bytes("netcdf"))
            .mount(server)
            .await;
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn point_requests(server: &MockServer) -> usize {
        server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .filter(|r| r.url.path() == "/api/temporal/daily/point")
            .count()
    }

    fn historical_file() -> String {
        let series =
            crate::point_data::parse_point_series(&sample_document(&[("2023100", "1.0", "18.0")]), "100.WTH").unwrap();
        crate::fusion::wth::render(&series.header, 2.5, 0.5, &series.records)
    }

    #[test]
    fn test_run_context_layout() {
        let ctx = RunContext::new(Path::new("/data/points.csv"));
        assert_eq!(ctx.temp_dir, Path::new("/data/temp"));
        assert_eq!(ctx.points_dir, Path::new("/data/temp/nasap"));
        assert_eq!(RunContext::new(Path::new("points.csv")).temp_dir, Path::new("./temp"));
    }

    #[test]
    fn test_prepare_keeps_point_documents_only_when_skipping() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = RunContext::new(&dir.path().join("points.csv"));
        let kept = ctx.points_dir.join("100.WTH");
        let stale = ctx.corrected_dir.join("corr_chirps_202301.nc");

        ctx.prepare(ExistingArtifacts::Overwrite).unwrap();
        std::fs::create_dir_all(&ctx.corrected_dir).unwrap();
        std::fs::write(&kept, "point").unwrap();
        std::fs::write(&stale, "raster").unwrap();
        ctx.prepare(ExistingArtifacts::SkipExisting).unwrap();
        assert!(kept.exists());
        assert!(!stale.exists());
        assert!(ctx.precipitation_dir.is_dir());

        ctx.prepare(ExistingArtifacts::Overwrite).unwrap();
        assert!(!kept.exists());
        assert!(ctx.points_dir.is_dir());
    }

    #[tokio::test]
    async fn test_get_fuses_corrected_and_preliminary_precipitation() {
        let server = MockServer::start().await;
        // 2023-01-01..2023-01-05 from POWER.
        mount_power(
            &server,
            sample_document(&[
                ("2023001", "1.0", "18.0"),
                ("2023002", "1.0", "-99"),
                ("2023003", "1.0", "20.0"),
                ("2023004", "1.0", "21.0"),
                ("2023005", "1.0", "22.0"),
            ]),
        )
        .await;
        // Corrected covers the first three days, preliminary the whole month.
        mount_file(&server, "/products/CHIRPS-2.0/global_daily/netcdf/p05/by_month/chirps-v2.0.2023.01.days_p05.nc").await;
        mount_file(&server, "/products/CHIRPS-2.0/prelim/global_daily/fixed/netcdf/chirps-v2.0.2023.days_p05.nc").await;
        let mut opener = MemoryOpener::new();
        opener.insert("corr_chirps_202301.nc", raster(0, 3));
        let mut preliminary = raster(0, 5);
        for band in &mut preliminary.bands {
            band[0] += 0.5;
        }
        opener.insert("prelim_nc_2023.nc", preliminary);

        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("points.csv");
        std::fs::write(&csv, POINTS).unwrap();
        let out = dir.path().join("DSSAT");

        let report = app(&server, opener)
            .get()
            .points_csv(&csv)
            .start(date(2023, 1, 1))
            .end(date(2023, 1, 5))
            .out_dir(&out)
            .call()
            .await
            .unwrap();

        assert_eq!(report.fetch.requested, 1);
        assert_eq!(report.fusion.written, [1, 2]);
        assert!(!report.preliminary_skipped);
        assert!(dir.path().join("temp/prec/prec.bin").exists());

        let text = std::fs::read_to_string(output_path(&out, 1)).unwrap();
        let rain: Vec<&str> = text
            .lines()
            .filter(|l| l.starts_with("2023"))
            .map(|l| l.split_whitespace().last().unwrap())
            .collect();
        // Corrected days 1-3 (cell 0 of band b is b * 100), preliminary days 4-5 (+0.5).
        assert_eq!(rain, ["0.0", "100.0", "200.0", "300.5", "400.5"]);
        assert!(text.contains("2023002  22.1  17.3  28.4  18.9  80.1    1.0    2.3   19.0  100.0\n"));
    }

    #[tokio::test]
    async fn test_second_get_reuses_point_documents_when_skipping() {
        let server = MockServer::start().await;
        mount_power(&server, sample_document(&[("2023001", "1.0", "18.0"), ("2023002", "1.0", "19.0")])).await;
        mount_file(&server, "/products/CHIRPS-2.0/global_daily/netcdf/p05/by_month/chirps-v2.0.2023.01.days_p05.nc").await;
        let mut opener = MemoryOpener::new();
        opener.insert("corr_chirps_202301.nc", raster(0, 2));

        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("points.csv");
        std::fs::write(&csv, POINTS).unwrap();
        let out = dir.path().join("DSSAT");
        let app = app_with(&server, opener, ExistingArtifacts::SkipExisting);

        for _ in 0..2 {
            let report = app
                .get()
                .points_csv(&csv)
                .start(date(2023, 1, 1))
                .end(date(2023, 1, 2))
                .out_dir(&out)
                .call()
                .await
                .unwrap();
            assert!(report.fetch.is_complete());
            assert_eq!(report.fusion.written, [1, 2]);
        }
        assert_eq!(point_requests(&server).await, 1);
    }

    #[tokio::test]
    async fn test_update_with_current_files_does_nothing() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("points.csv");
        std::fs::write(&csv, POINTS).unwrap();
        let repo = dir.path().join("repo");
        std::fs::create_dir(&repo).unwrap();
        let doc = sample_document(&[("2023100", "1.0", "18.0")]);
        std::fs::write(output_path(&repo, 1), doc).unwrap();
        let out = dir.path().join("out");

        // Last record 2023-04-10, today minus latency is 2023-04-10.
        let report = app(&server, MemoryOpener::new())
            .update()
            .points_csv(&csv)
            .historical_dir(&repo)
            .out_dir(&out)
            .today(date(2023, 4, 14))
            .call()
            .await
            .unwrap();

        assert!(report.nothing_to_update);
        assert!(report.to_string().starts_with("Nothing to update."));
        assert_eq!(report.selection.unwrap().not_found, [2]);
        assert!(!out.exists());
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_without_historical_files_says_so() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("points.csv");
        std::fs::write(&csv, POINTS).unwrap();
        let repo = dir.path().join("repo");
        std::fs::create_dir(&repo).unwrap();

        let report = app(&server, MemoryOpener::new())
            .update()
            .points_csv(&csv)
            .historical_dir(&repo)
            .out_dir(&dir.path().join("out"))
            .today(date(2023, 4, 14))
            .call()
            .await
            .unwrap();

        assert!(report.nothing_to_update);
        assert!(report.to_string().starts_with("No historical WTH files found"));
        assert_eq!(report.selection.as_ref().unwrap().not_found, [1, 2]);
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_leaves_out_header_only_history() {
        let server = MockServer::start().await;
        mount_power(&server, sample_document(&[("2023101", "1.0", "18.0")])).await;
        mount_file(&server, "/products/CHIRPS-2.0/global_daily/netcdf/p05/by_month/chirps-v2.0.2023.04.days_p05.nc").await;
        let mut opener = MemoryOpener::new();
        opener.insert("corr_chirps_202304.nc", raster(100, 1));

        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("points.csv");
        std::fs::write(&csv, POINTS).unwrap();
        let repo = dir.path().join("repo");
        std::fs::create_dir(&repo).unwrap();
        let historical = historical_file();
        let series =
            crate::point_data::parse_point_series(&sample_document(&[("2023100", "1.0", "18.0")]), "100.WTH").unwrap();
        std::fs::write(output_path(&repo, 1), &historical).unwrap();
        std::fs::write(
            output_path(&repo, 2),
            crate::fusion::wth::render_header(&series.header, 0.5, 3.5),
        )
        .unwrap();
        let out = dir.path().join("out");

        let report = app(&server, opener)
            .update()
            .points_csv(&csv)
            .historical_dir(&repo)
            .out_dir(&out)
            .today(date(2023, 4, 15))
            .call()
            .await
            .unwrap();

        let selection = report.selection.as_ref().unwrap();
        assert_eq!(selection.selected, [1]);
        assert_eq!(selection.no_records, [2]);
        assert_eq!(report.merge.as_ref().unwrap().merged, [1]);
        assert!(report.to_string().contains("Historical file without daily records: [2]"));
        let merged = std::fs::read_to_string(output_path(&out, 1)).unwrap();
        assert_eq!(merged.lines().filter(|l| l.starts_with("2023")).count(), 2);
        assert!(!output_path(&out, 2).exists());
    }

    #[tokio::test]
    async fn test_update_appends_continuation() {
        let server = MockServer::start().await;
        mount_power(
            &server,
            sample_document(&[("2023101", "1.0", "18.0"), ("2023102", "2.0", "19.0")]),
        )
        .await;
        mount_file(&server, "/products/CHIRPS-2.0/global_daily/netcdf/p05/by_month/chirps-v2.0.2023.04.days_p05.nc").await;
        let mut opener = MemoryOpener::new();
        // Offsets from 2023-01-01: 100 and 101 are 2023101 and 2023102.
        opener.insert("corr_chirps_202304.nc", raster(100, 2));

        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("points.csv");
        std::fs::write(&csv, POINTS).unwrap();
        let repo = dir.path().join("repo");
        std::fs::create_dir(&repo).unwrap();
        let historical = historical_file();
        std::fs::write(output_path(&repo, 1), &historical).unwrap();
        std::fs::write(output_path(&repo, 2), &historical).unwrap();
        let out = dir.path().join("out");

        let report = app(&server, opener)
            .update()
            .points_csv(&csv)
            .historical_dir(&repo)
            .out_dir(&out)
            .today(date(2023, 4, 16))
            .call()
            .await
            .unwrap();

        assert!(!report.nothing_to_update);
        assert_eq!(report.range.unwrap().start, date(2023, 4, 11));
        assert_eq!(report.range.unwrap().end, date(2023, 4, 12));
        // The corrected table reaches the end, no preliminary request.
        assert!(report.preliminary_skipped);
        assert_eq!(report.merge.as_ref().unwrap().merged, [1, 2]);

        let merged = std::fs::read_to_string(output_path(&out, 1)).unwrap();
        assert!(merged.starts_with(&historical));
        let rows: Vec<&str> = merged.lines().filter(|l| l.starts_with("2023")).collect();
        assert_eq!(rows.len(), 3);
        assert!(rows[1].starts_with("2023101"));
        assert!(rows[2].ends_with("  100.0"));
    }
}
