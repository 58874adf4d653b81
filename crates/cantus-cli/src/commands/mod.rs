pub mod config;
pub mod dataset;
pub mod ingest;
pub mod query;
pub mod session;
pub mod transcribe;

pub use dataset::show_dataset;
pub use ingest::run_ingest;
pub use query::run_query;
pub use session::{new_session, open_session, restore_mapper};
pub use transcribe::run_transcribe;
