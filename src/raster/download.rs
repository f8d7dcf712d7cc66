//! Retrieval of CHIRPS daily NetCDF files.

use crate::config::RunConfig;
use crate::http::get_with_retry;
use crate::raster::error::RasterError;
use chrono::{Datelike, Months, NaiveDate};
use futures_util::TryStreamExt;
use log::{info, warn};
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tokio_util::io::StreamReader;

const CORRECTED_PATH: &str = "/products/CHIRPS-2.0/global_daily/netcdf/p05/by_month";
const PRELIMINARY_PATH: &str = "/products/CHIRPS-2.0/prelim/global_daily/fixed/netcdf";

/// Files written by one download call and periods the server did not serve.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadReport {
    pub downloaded: Vec<PathBuf>,
    /// Periods (`YYYYMM` or `YYYY`) answered with an HTTP error status.
    pub unavailable: Vec<String>,
}

pub struct ChirpsDownloader {
    client: Client,
    base_url: String,
    connect_retries: u32,
}

impl ChirpsDownloader {
    pub fn new(base_url: &str, timeout: Duration, connect_retries: u32) -> Result<Self, RasterError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(RasterError::ClientBuild)?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            connect_retries,
        })
    }

    pub fn from_config(config: &RunConfig) -> Result<Self, RasterError> {
        Self::new(
            &config.chirps_base_url,
            config.raster_timeout,
            config.raster_connect_retries,
        )
    }

    pub fn corrected_url(&self, year: i32, month: u32) -> String {
        format!(
            "{}{}/chirps-v2.0.{:04}.{:02}.days_p05.nc",
            self.base_url, CORRECTED_PATH, year, month
        )
    }

    pub fn preliminary_url(&self, year: i32) -> String {
        format!(
            "{}{}/chirps-v2.0.{:04}.days_p05.nc",
            self.base_url, PRELIMINARY_PATH, year
        )
    }

    /// Downloads the corrected product, one file per month touched by `start..=end`.
    pub async fn corrected(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        out_dir: &Path,
    ) -> Result<DownloadReport, RasterError> {
        create_dir(out_dir).await?;
        let mut report = DownloadReport::default();
        for month in months(start, end) {
            let period = format!("{:04}{:02}", month.year(), month.month());
            let url = self.corrected_url(month.year(), month.month());
            let target = out_dir.join(format!("corr_chirps_{}.nc", period));
            self.download_period(&url, &target, period, &mut report).await?;
        }
        Ok(report)
    }

    /// Downloads the preliminary product, one file per year touched by `start..=end`.
    pub async fn preliminary(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        out_dir: &Path,
    ) -> Result<DownloadReport, RasterError> {
        create_dir(out_dir).await?;
        let mut report = DownloadReport::default();
        for year in start.year()..=end.year() {
            let url = self.preliminary_url(year);
            let target = out_dir.join(format!("prelim_nc_{:04}.nc", year));
            self.download_period(&url, &target, format!("{:04}", year), &mut report)
                .await?;
        }
        Ok(report)
    }

    async fn download_period(
        &self,
        url: &str,
        target: &Path,
        period: String,
        report: &mut DownloadReport,
    ) -> Result<(), RasterError> {
        info!("Downloading {}", url);
        let response = get_with_retry(&self.client, url, &[], self.connect_retries)
            .await
            .map_err(|e| RasterError::NetworkRequest(url.to_string(), e))?;

        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                // Recent periods are often not published yet.
                warn!("CHIRPS file for {} not available: {}", period, e);
                report.unavailable.push(period);
                return Ok(());
            }
        };

        let stream = response
            .bytes_stream()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e));
        let mut reader = StreamReader::new(stream);

        let dir = target.parent().unwrap_or(Path::new("."));
        let write_error = |e| RasterError::DownloadWrite(target.to_path_buf(), e);
        let temp = NamedTempFile::new_in(dir).map_err(write_error)?;
        let mut file = tokio::fs::File::from_std(temp.reopen().map_err(write_error)?);
        let bytes = tokio::io::copy(&mut reader, &mut file)
            .await
            .map_err(write_error)?;
        file.flush().await.map_err(write_error)?;
        drop(file);
        temp.persist(target).map_err(|e| write_error(e.error))?;

        info!("{} downloaded ({} bytes)", target.display(), bytes);
        report.downloaded.push(target.to_path_buf());
        Ok(())
    }
}

async fn create_dir(dir: &Path) -> Result<(), RasterError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| RasterError::DirCreation(dir.to_path_buf(), e))
}

/// First day of every month from `start`'s month through `end`'s month.
fn months(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut months = Vec::new();
    let mut current = start.with_day(1);
    while let Some(month) = current {
        if (month.year(), month.month()) > (end.year(), end.month()) {
            break;
        }
        months.push(month);
        current = month.checked_add_months(Months::new(1));
    }
    months
}
