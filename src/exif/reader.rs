use nom_exif::*;
use std::path::Path;

use super::{Dms, Metadata, MetadataService, RawGpsInfo};
use crate::error::{ExtractError, Result};

/// [`MetadataService`] backed by `nom-exif`.
///
/// Decoding is blocking, so each call runs on tokio's blocking pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct NomExifService;

impl NomExifService {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl MetadataService for NomExifService {
    fn name(&self) -> &str {
        "nom-exif"
    }

    async fn parse(&self, path: &Path) -> Result<Metadata> {
        let owned = path.to_path_buf();
        tokio::task::spawn_blocking(move || read_metadata(&owned)).await?
    }
}

/// Read capture time and GPS info from an image file.
///
/// A file without a readable EXIF block is an error, not an empty record.
pub fn read_metadata(path: &Path) -> Result<Metadata> {
    let mut parser = MediaParser::new();
    let ms = MediaSource::file_path(path).map_err(|e| ExtractError::parse(path, e.to_string()))?;

    let iter: ExifIter = parser
        .parse(ms)
        .map_err(|e| ExtractError::parse(path, e.to_string()))?;

    // Parse GPS info before converting to Exif (consumes the iterator)
    let gps_info = iter
        .parse_gps_info()
        .map_err(|e| ExtractError::parse(path, format!("invalid GPS info: {e}")))?;
    let exif: Exif = iter.into();

    let date_time = exif
        .get(ExifTag::ModifyDate)
        .and_then(entry_to_string)
        .map(|s| exif_date_time(&s));

    let gps = gps_info.map(|gps| RawGpsInfo {
        latitude_ref: gps.latitude_ref.to_string(),
        latitude: latlng_to_dms(&gps.latitude),
        longitude_ref: gps.longitude_ref.to_string(),
        longitude: latlng_to_dms(&gps.longitude),
        altitude: Some(gps.altitude.0 as f64 / gps.altitude.1 as f64),
        altitude_ref: Some(gps.altitude_ref),
    });

    log::trace!("Decoded {}: date_time={date_time:?} gps={}", path.display(), gps.is_some());

    Ok(Metadata { date_time, gps })
}

/// Convert an EntryValue to an Option<String>.
fn entry_to_string(val: &EntryValue) -> Option<String> {
    let s = val.to_string();
    let s = s.trim().trim_matches('"').to_string();
    if s.is_empty() { None } else { Some(s) }
}

/// Bring a decoded timestamp back to EXIF notation.
///
/// `nom-exif` renders dates as `YYYY-MM-DDTHH:MM:SS[+offset]`; the report
/// carries the raw `YYYY:MM:DD HH:MM:SS` form. Anything else is kept as-is.
fn exif_date_time(value: &str) -> String {
    let bytes = value.as_bytes();
    if bytes.len() < 19 {
        return value.to_string();
    }

    let digits_at = |range: std::ops::Range<usize>| bytes[range].iter().all(u8::is_ascii_digit);
    let shaped = digits_at(0..4)
        && matches!(bytes[4], b'-' | b':')
        && digits_at(5..7)
        && matches!(bytes[7], b'-' | b':')
        && digits_at(8..10)
        && matches!(bytes[10], b'T' | b' ')
        && digits_at(11..13)
        && bytes[13] == b':'
        && digits_at(14..16)
        && bytes[16] == b':'
        && digits_at(17..19);

    if !shaped {
        return value.to_string();
    }

    format!(
        "{}:{}:{} {}",
        &value[0..4],
        &value[5..7],
        &value[8..10],
        &value[11..19]
    )
}

/// Convert a nom-exif LatLng (3 URationals: deg, min, sec) to a [`Dms`].
fn latlng_to_dms(latlng: &LatLng) -> Dms {
    let degrees = latlng.0.0 as f64 / latlng.0.1 as f64;
    let minutes = latlng.1.0 as f64 / latlng.1.1 as f64;
    let seconds = latlng.2.0 as f64 / latlng.2.1 as f64;

    Dms::new(degrees, Some(minutes), Some(seconds))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const ASCII: u16 = 2;
    const BYTE: u16 = 1;
    const LONG: u16 = 4;
    const RATIONAL: u16 = 5;

    fn ifd_entry(buf: &mut Vec<u8>, tag: u16, kind: u16, count: u32, value: [u8; 4]) {
        buf.extend_from_slice(&tag.to_le_bytes());
        buf.extend_from_slice(&kind.to_le_bytes());
        buf.extend_from_slice(&count.to_le_bytes());
        buf.extend_from_slice(&value);
    }

    fn rationals(buf: &mut Vec<u8>, values: &[(u32, u32)]) {
        for (num, den) in values {
            buf.extend_from_slice(&num.to_le_bytes());
            buf.extend_from_slice(&den.to_le_bytes());
        }
    }

    /// Little-endian TIFF with IFD0 `DateTime` and a GPS IFD:
    /// N 10°30'0", E 20°15'3.6", altitude 100.5 with reference 1.
    fn gps_tiff() -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"II");
        buf.extend_from_slice(&42u16.to_le_bytes());
        buf.extend_from_slice(&8u32.to_le_bytes());

        // IFD0 at 8: DateTime, GPS pointer
        buf.extend_from_slice(&2u16.to_le_bytes());
        ifd_entry(&mut buf, 0x0132, ASCII, 20, 38u32.to_le_bytes());
        ifd_entry(&mut buf, 0x8825, LONG, 1, 58u32.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        assert_eq!(buf.len(), 38);
        buf.extend_from_slice(b"2021:01:01 00:00:00\0");

        // GPS IFD at 58
        assert_eq!(buf.len(), 58);
        buf.extend_from_slice(&6u16.to_le_bytes());
        ifd_entry(&mut buf, 0x0001, ASCII, 2, *b"N\0\0\0");
        ifd_entry(&mut buf, 0x0002, RATIONAL, 3, 136u32.to_le_bytes());
        ifd_entry(&mut buf, 0x0003, ASCII, 2, *b"E\0\0\0");
        ifd_entry(&mut buf, 0x0004, RATIONAL, 3, 160u32.to_le_bytes());
        ifd_entry(&mut buf, 0x0005, BYTE, 1, [1, 0, 0, 0]);
        ifd_entry(&mut buf, 0x0006, RATIONAL, 1, 184u32.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());

        assert_eq!(buf.len(), 136);
        rationals(&mut buf, &[(10, 1), (30, 1), (0, 1)]);
        rationals(&mut buf, &[(20, 1), (15, 1), (36, 10)]);
        rationals(&mut buf, &[(201, 2)]);
        assert_eq!(buf.len(), 192);
        buf
    }

    #[test]
    fn reads_date_and_gps_from_tiff() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("located.tif");
        fs::write(&path, gps_tiff()).unwrap();

        let metadata = read_metadata(&path).unwrap();
        assert_eq!(
            metadata,
            Metadata {
                date_time: Some("2021:01:01 00:00:00".into()),
                gps: Some(RawGpsInfo {
                    latitude_ref: "N".into(),
                    latitude: Dms::new(10.0, Some(30.0), Some(0.0)),
                    longitude_ref: "E".into(),
                    longitude: Dms::new(20.0, Some(15.0), Some(3.6)),
                    altitude: Some(100.5),
                    altitude_ref: Some(1),
                }),
            }
        );
    }

    #[tokio::test]
    async fn service_decodes_on_blocking_pool() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("located.tif");
        fs::write(&path, gps_tiff()).unwrap();

        let metadata = NomExifService::new().parse(&path).await.unwrap();
        assert_eq!(metadata.date_time.as_deref(), Some("2021:01:01 00:00:00"));
        assert_eq!(metadata.gps.map(|g| g.longitude_ref), Some("E".to_string()));
    }

    #[test]
    fn date_time_from_rfc3339() {
        assert_eq!(
            exif_date_time("2023-07-09T20:36:33+08:00"),
            "2023:07:09 20:36:33"
        );
    }

    #[test]
    fn date_time_already_exif() {
        assert_eq!(exif_date_time("2021:01:01 00:00:00"), "2021:01:01 00:00:00");
    }

    #[test]
    fn date_time_unrecognized_kept() {
        assert_eq!(exif_date_time("yesterday"), "yesterday");
        assert_eq!(
            exif_date_time("not a real date at all"),
            "not a real date at all"
        );
    }

    #[test]
    fn garbage_file_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.jpg");
        fs::write(&path, b"definitely not a jpeg").unwrap();

        let err = read_metadata(&path).unwrap_err();
        assert!(matches!(err, ExtractError::Parse { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn service_reports_missing_file() {
        let dir = TempDir::new().unwrap();
        let result = NomExifService::new()
            .parse(&dir.path().join("missing.jpg"))
            .await;
        assert!(matches!(result, Err(ExtractError::Parse { .. })));
    }
}
