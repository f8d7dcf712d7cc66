pub mod client;
pub mod error;
pub mod fetcher;
pub mod icasa;

pub use client::PowerClient;
pub use error::PointDataError;
pub use fetcher::{artifact_path, FetchReport, FetchStatus, FetchTask, PointFetcher, ARTIFACT_EXTENSION};
pub use icasa::parse_point_series;
