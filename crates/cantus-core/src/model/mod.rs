pub mod histogram;
pub mod mapper;
pub mod matrix;
pub mod melody;

pub use histogram::{Fingerprint, HistogramTriple};
pub use mapper::{DatasetEntry, MapperEntry};
pub use matrix::FeatureMatrix;
pub use melody::MelodyEvent;
