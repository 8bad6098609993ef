//! Turning a [`BatchReport`] into a rectangular text table.
//!
//! The column count is driven by the deepest file in the batch: every row gets
//! `depth - 1` directory columns, padded with empty strings for files that sit
//! higher up in the tree. Fields are joined with a configurable separator and
//! escaped with a single rule: each occurrence of the separator gets a
//! backslash in front of it. No quoting, nothing else is escaped.

use std::io::Write;

use crate::config::ReportConfig;
use crate::error::{ExtractError, Result};
use crate::exif::{RawGpsInfo, present};
use crate::pipeline::{BatchReport, MetadataRecord};

/// Columns that follow the directory columns, in order.
pub const FIXED_COLUMNS: [&str; 5] = ["Filename", "DateTime", "Latitude", "Longitude", "Altitude"];

/// Layout options for [`build_report`].
#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub separator: String,
    pub include_directories: bool,
}

impl From<&ReportConfig> for ReportOptions {
    fn from(config: &ReportConfig) -> Self {
        Self {
            separator: config.separator.clone(),
            include_directories: config.include_directories,
        }
    }
}

/// A fully formatted table, ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub separator: String,
    pub header: Vec<String>,
    /// Rows, already escaped and joined.
    pub rows: Vec<String>,
}

impl Report {
    pub fn header_line(&self) -> String {
        self.header.join(&self.separator)
    }
}

/// Location derived from a [`RawGpsInfo`] at formatting time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpsCoordinate {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
}

impl GpsCoordinate {
    /// Convert raw GPS info to decimal degrees.
    ///
    /// Only the northern/eastern reference frame is supported; any other
    /// reference is a data error naming `path`. The altitude reference is
    /// subtracted from the altitude as a plain number.
    pub fn from_raw(gps: &RawGpsInfo, path: &str) -> Result<Self> {
        if gps.latitude_ref != "N" {
            return Err(ExtractError::data(
                path,
                format!("uses unknown latitude reference {}.", gps.latitude_ref),
            ));
        }
        if gps.longitude_ref != "E" {
            return Err(ExtractError::data(
                path,
                format!("uses unknown longitude reference {}.", gps.longitude_ref),
            ));
        }

        Ok(Self {
            latitude: gps.latitude.to_decimal(),
            longitude: gps.longitude.to_decimal(),
            altitude: present(gps.altitude).unwrap_or(0.0) - gps.altitude_ref.map_or(0.0, f64::from),
        })
    }
}

/// Backslash-prefix every occurrence of `separator` in `value`.
pub fn escape(value: &str, separator: &str) -> String {
    value.replace(separator, &format!("\\{separator}"))
}

/// Reverse [`escape`].
pub fn unescape(value: &str, separator: &str) -> String {
    value.replace(&format!("\\{separator}"), separator)
}

/// `length` copies of `template`, with `[index]` replaced by the 1-based position.
pub fn fill(length: usize, template: &str) -> Vec<String> {
    (1..=length)
        .map(|i| template.replacen("[index]", &i.to_string(), 1))
        .collect()
}

/// Render a number the way spreadsheets expect it: shortest round-trip form,
/// no trailing `.0`, no negative zero.
///
/// Magnitudes below `1e-6` or from `1e21` up use exponent notation with an
/// explicit sign (`2.7e-8`, `1e+21`).
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    if value.is_infinite() {
        let sign = if value > 0.0 { "" } else { "-" };
        return format!("{sign}Infinity");
    }

    let magnitude = value.abs();
    if magnitude < 1e-6 || magnitude >= 1e21 {
        let exp = format!("{value:e}");
        return match exp.split_once('e') {
            Some((mantissa, power)) if !power.starts_with('-') => format!("{mantissa}e+{power}"),
            _ => exp,
        };
    }

    value.to_string()
}

/// Deepest path in the batch, counting the filename. `1` for an empty batch.
pub fn compute_depth(records: &[MetadataRecord]) -> usize {
    records
        .iter()
        .map(|r| r.segments.len())
        .max()
        .unwrap_or(1)
        .max(1)
}

/// Column names for a batch of the given depth.
pub fn build_header(depth: usize, include_directories: bool) -> Vec<String> {
    let mut header = if include_directories {
        fill(depth.saturating_sub(1), "Directory[index]")
    } else {
        Vec::new()
    };
    header.extend(FIXED_COLUMNS.iter().map(|c| c.to_string()));
    header
}

/// Format one record as an escaped, separator-joined row.
pub fn format_row(
    record: &MetadataRecord,
    depth: usize,
    separator: &str,
    include_directories: bool,
) -> Result<String> {
    let mut columns = Vec::with_capacity(depth + FIXED_COLUMNS.len());

    if include_directories {
        let dirs = record.directories();
        columns.extend(dirs.iter().map(|d| escape(d, separator)));
        columns.extend(fill(depth.saturating_sub(1).saturating_sub(dirs.len()), ""));
    }

    columns.push(escape(record.file_name(), separator));
    columns.push(escape(
        record.metadata.date_time.as_deref().unwrap_or_default(),
        separator,
    ));

    match &record.metadata.gps {
        Some(gps) => {
            let coord = GpsCoordinate::from_raw(gps, &record.display_path())?;
            for value in [coord.latitude, coord.longitude, coord.altitude] {
                columns.push(escape(&format_number(value), separator));
            }
        }
        None => columns.extend(fill(3, "")),
    }

    Ok(columns.join(separator))
}

/// Format a whole batch. Fails on the first record with bad GPS data, before
/// anything is written.
pub fn build_report(batch: &BatchReport, options: &ReportOptions) -> Result<Report> {
    let depth = compute_depth(&batch.records);
    log::debug!("Report depth: {depth}");

    let rows = batch
        .records
        .iter()
        .map(|record| {
            format_row(
                record,
                depth,
                &options.separator,
                options.include_directories,
            )
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Report {
        separator: options.separator.clone(),
        header: build_header(depth, options.include_directories),
        rows,
    })
}

/// Writes a [`Report`] to any byte sink, one line per row.
pub struct ReportWriter<W: Write> {
    out: W,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn write_report(&mut self, report: &Report) -> Result<()> {
        writeln!(self.out, "{}", report.header_line())?;
        for row in &report.rows {
            writeln!(self.out, "{row}")?;
        }
        self.out.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
