//! # exif-extract
//!
//! Walk a file or directory tree, read the capture time and GPS location
//! embedded in JPEG/TIFF files, and produce a flat table that lines up in a
//! spreadsheet no matter how deeply the files are nested.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use exif_extract::config::Config;
//! use exif_extract::exif::NomExifService;
//! use exif_extract::pipeline::scan;
//! use exif_extract::report::{build_report, ReportWriter};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!
//!     // Walk the tree and decode every JPEG/TIFF file
//!     let batch = scan(Path::new("./photos"), Arc::new(NomExifService::new()), &config.scan).await?;
//!
//!     // Format the whole table in memory, then write it
//!     let report = build_report(&batch, &(&config.report).into())?;
//!     ReportWriter::new(std::io::stdout().lock()).write_report(&report)?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Output
//!
//! | Column | Content |
//! |--------|---------|
//! | `Directory1..N` | One column per directory level, padded to the deepest file (optional) |
//! | `Filename` | File name |
//! | `DateTime` | IFD0 `DateTime`, `YYYY:MM:DD HH:MM:SS` |
//! | `Latitude`, `Longitude` | Decimal degrees (northern/eastern hemisphere only) |
//! | `Altitude` | Altitude minus altitude reference |
//!
//! Fields are joined with the configured separator; every occurrence of the
//! separator inside a field is prefixed with a backslash.
//!
//! ## Modules
//!
//! - [`config`] — Configuration types and loading/saving
//! - [`error`] — Error taxonomy shared by all stages
//! - [`exif`] — Metadata service trait and the `nom-exif` implementation
//! - [`pipeline`] — File collection and concurrent metadata extraction
//! - [`report`] — Column model, row formatting, and report writing

pub mod config;
pub mod error;
pub mod exif;
pub mod pipeline;
pub mod report;
