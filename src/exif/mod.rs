//! Metadata extraction service.
//!
//! The pipeline only ever talks to the [`MetadataService`] trait. The crate
//! ships [`NomExifService`], which decodes JPEG/TIFF EXIF blocks with
//! `nom-exif`; tests and embedders can plug in their own implementation.
//!
//! Whatever the decoder hands back is normalized once, here, into
//! [`Metadata`] / [`RawGpsInfo`]. Downstream stages never see decoder types.

mod reader;

pub use reader::{NomExifService, read_metadata};

use crate::error::Result;
use std::path::Path;

/// Capture time and location decoded from a single file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    /// IFD0 `DateTime`, in EXIF notation (`YYYY:MM:DD HH:MM:SS`).
    pub date_time: Option<String>,
    pub gps: Option<RawGpsInfo>,
}

/// GPS sub-record as stored in the file, before any conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct RawGpsInfo {
    /// Hemisphere reference, `"N"` expected.
    pub latitude_ref: String,
    pub latitude: Dms,
    /// Hemisphere reference, `"E"` expected.
    pub longitude_ref: String,
    pub longitude: Dms,
    pub altitude: Option<f64>,
    pub altitude_ref: Option<u8>,
}

/// A degrees/minutes/seconds angle. Minutes and seconds may be missing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dms {
    pub degrees: f64,
    pub minutes: Option<f64>,
    pub seconds: Option<f64>,
}

impl Dms {
    pub fn new(degrees: f64, minutes: Option<f64>, seconds: Option<f64>) -> Self {
        Self {
            degrees,
            minutes,
            seconds,
        }
    }

    /// Build from a `[degrees, minutes?, seconds?]` slice.
    ///
    /// Returns `None` for an empty slice or one with more than three parts.
    pub fn from_slice(parts: &[f64]) -> Option<Self> {
        match parts {
            [d] => Some(Self::new(*d, None, None)),
            [d, m] => Some(Self::new(*d, Some(*m), None)),
            [d, m, s] => Some(Self::new(*d, Some(*m), Some(*s))),
            _ => None,
        }
    }

    /// Decimal degrees. A zero or NaN minute/second part counts as absent.
    pub fn to_decimal(&self) -> f64 {
        self.degrees
            + present(self.minutes).map_or(0.0, |m| m / 60.0)
            + present(self.seconds).map_or(0.0, |s| s / 3600.0)
    }
}

/// `Some` only for values that are neither zero nor NaN.
pub(crate) fn present(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v != 0.0 && !v.is_nan())
}

/// A source of per-file metadata.
///
/// Implement this trait to swap out the decoder. Implementations must be
/// shareable across worker tasks.
///
/// # Example
///
/// ```rust
/// use exif_extract::exif::{Metadata, MetadataService};
/// use std::path::Path;
///
/// struct Fixed;
///
/// #[async_trait::async_trait]
/// impl MetadataService for Fixed {
///     fn name(&self) -> &str {
///         "fixed"
///     }
///
///     async fn parse(&self, _path: &Path) -> exif_extract::error::Result<Metadata> {
///         Ok(Metadata {
///             date_time: Some("2021:01:01 00:00:00".into()),
///             gps: None,
///         })
///     }
/// }
/// ```
#[async_trait::async_trait]
pub trait MetadataService: Send + Sync {
    /// The display name of this service, used in logs.
    fn name(&self) -> &str;
    /// Decode the metadata of the file at `path`.
    async fn parse(&self, path: &Path) -> Result<Metadata>;
}
