pub mod dataset;
pub mod download;
pub mod error;
pub mod extractor;
pub mod memory;
#[cfg(feature = "netcdf")]
pub mod netcdf_file;
pub mod table;

pub use dataset::{default_opener, GeoTransform, RasterDataset, RasterOpener, TimeAxis, UnsupportedOpener};
pub use download::{ChirpsDownloader, DownloadReport};
pub use error::RasterError;
pub use extractor::{list_raster_files, ExtractionStrategy, RasterExtractor};
pub use memory::{MemoryOpener, MemoryRaster};
pub use table::{RasterValueTable, NO_DATA};
