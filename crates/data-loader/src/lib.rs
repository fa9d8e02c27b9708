//! Energy Data Ingestion
//!
//! Parses machine energy records, coerces timestamps, sorts chronologically
//! and fills missing readings before any analysis runs.

mod error;
mod loader;
mod preprocess;

pub use error::LoadError;
pub use loader::{parse_timestamp, LoaderConfig, MachineDataLoader, RawReading, RawReadings};
pub use preprocess::{forward_fill, interpolate, preprocess, FillMethod, LoadReport};
