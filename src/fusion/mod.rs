pub mod error;
pub mod qc;
pub mod writer;
pub mod wth;

pub use error::FusionError;
pub use qc::{is_missing_srad, repair_srad, SradAction, SradRepair, SradRule, SRAD_RULES};
pub use writer::{fuse, fuse_all, fuse_location, output_path, FusedSeries, FusionOutcome, FusionReport};
