use std::collections::VecDeque;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinSet;

use crate::config::{ErrorMode, ScanConfig};
use crate::error::{ExtractError, Result};
use crate::exif::{Metadata, MetadataService};

/// Extensions that qualify a file for extraction when walking a directory.
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "tif", "tiff"];

/// A file's location as path components: directories first, filename last.
pub type PathSegments = Vec<String>;

/// A file selected for extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub path: PathBuf,
    pub segments: PathSegments,
}

impl ImageFile {
    pub fn new(path: PathBuf) -> Self {
        let segments = path_segments(&path);
        Self { path, segments }
    }
}

/// Metadata of one successfully decoded file, tagged with its location.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataRecord {
    pub metadata: Metadata,
    pub segments: PathSegments,
}

impl MetadataRecord {
    pub fn new(metadata: Metadata, segments: PathSegments) -> Self {
        Self { metadata, segments }
    }

    /// Last segment.
    pub fn file_name(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    /// Every segment but the last.
    pub fn directories(&self) -> &[String] {
        match self.segments.split_last() {
            Some((_, dirs)) => dirs,
            None => &[],
        }
    }

    /// Segments joined with `/`, used in error messages.
    pub fn display_path(&self) -> String {
        self.segments.join("/")
    }
}

/// A file the decoder rejected while running in [`ErrorMode::BestEffort`].
#[derive(Debug)]
pub struct FileFailure {
    pub path: PathBuf,
    pub segments: PathSegments,
    pub error: ExtractError,
}

/// Everything the extraction stage produced for one run.
///
/// Both lists are sorted by path segments.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub records: Vec<MetadataRecord>,
    pub failures: Vec<FileFailure>,
}

impl BatchReport {
    /// `true` when no file was skipped.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Options for [`collect_images`].
#[derive(Debug, Clone, Copy)]
pub struct CollectOptions {
    /// Maximum number of directories listed at once.
    pub concurrency: usize,
    pub case_insensitive: bool,
}

/// Options for [`extract_metadata`].
#[derive(Debug, Clone, Copy)]
pub struct ExtractOptions {
    /// Maximum number of files decoded at once.
    pub concurrency: usize,
    pub error_mode: ErrorMode,
}

impl From<&ScanConfig> for CollectOptions {
    fn from(scan: &ScanConfig) -> Self {
        Self {
            concurrency: scan.concurrency,
            case_insensitive: scan.case_insensitive_extensions,
        }
    }
}

impl From<&ScanConfig> for ExtractOptions {
    fn from(scan: &ScanConfig) -> Self {
        Self {
            concurrency: scan.concurrency,
            error_mode: scan.error_mode,
        }
    }
}

/// Turn a user-supplied root into a path, dropping one trailing separator.
///
/// An empty input means the current directory.
pub fn normalize_root(input: &str) -> PathBuf {
    if input.is_empty() {
        return PathBuf::from(".");
    }
    let trimmed = match input.strip_suffix(['/', std::path::MAIN_SEPARATOR]) {
        Some(rest) if !rest.is_empty() => rest,
        _ => input,
    };
    PathBuf::from(trimmed)
}

/// Split a path into its named components.
///
/// A leading `.` is dropped, as are root and drive prefixes.
pub fn path_segments(path: &Path) -> PathSegments {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            Component::CurDir | Component::RootDir | Component::Prefix(_) => None,
        })
        .collect()
}

/// Check whether a file name carries one of the image extensions.
///
/// The extension is everything after the last `.`; a name without a dot is
/// compared whole.
fn is_supported_image(name: &str, case_insensitive: bool) -> bool {
    let ext = name.rsplit('.').next().unwrap_or(name);
    if case_insensitive {
        IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str())
    } else {
        IMAGE_EXTENSIONS.contains(&ext)
    }
}

/// Entries found in one directory.
#[derive(Debug, Default)]
struct Listing {
    dirs: Vec<PathBuf>,
    images: Vec<PathBuf>,
}

async fn list_directory(dir: PathBuf, case_insensitive: bool) -> Result<Listing> {
    let mut entries = tokio::fs::read_dir(&dir)
        .await
        .map_err(|e| ExtractError::file_system(&dir, e))?;

    let mut listing = Listing::default();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| ExtractError::file_system(&dir, e))?
    {
        let path = entry.path();
        let file_type = entry
            .file_type()
            .await
            .map_err(|e| ExtractError::file_system(&path, e))?;

        if file_type.is_dir() {
            listing.dirs.push(path);
        } else if is_supported_image(&entry.file_name().to_string_lossy(), case_insensitive) {
            listing.images.push(path);
        } else {
            log::trace!("Skipping {}", path.display());
        }
    }

    log::debug!(
        "Listed {}: {} dir(s), {} image(s)",
        dir.display(),
        listing.dirs.len(),
        listing.images.len()
    );
    Ok(listing)
}

/// Collect the image files under `root`.
///
/// A root that is not a directory is returned as the only file, whatever its
/// extension. Directories are walked through a work queue with at most
/// `options.concurrency` listings in flight. The first unreadable directory
/// aborts the walk.
///
/// # Example
///
/// ```rust,no_run
/// use exif_extract::pipeline::{collect_images, CollectOptions};
/// use std::path::Path;
///
/// # async fn example() -> exif_extract::error::Result<()> {
/// let options = CollectOptions { concurrency: 8, case_insensitive: false };
/// let images = collect_images(Path::new("./photos"), &options).await?;
/// println!("Found {} images", images.len());
/// # Ok(())
/// # }
/// ```
pub async fn collect_images(root: &Path, options: &CollectOptions) -> Result<Vec<ImageFile>> {
    let stat = tokio::fs::metadata(root)
        .await
        .map_err(|e| ExtractError::file_system(root, e))?;

    if !stat.is_dir() {
        return Ok(vec![ImageFile::new(root.to_path_buf())]);
    }

    let limit = options.concurrency.max(1);
    let mut queue = VecDeque::from([root.to_path_buf()]);
    let mut workers = JoinSet::new();
    let mut images = Vec::new();

    loop {
        while workers.len() < limit {
            let Some(dir) = queue.pop_front() else { break };
            workers.spawn(list_directory(dir, options.case_insensitive));
        }

        let Some(joined) = workers.join_next().await else {
            break;
        };
        let listing = joined??;
        queue.extend(listing.dirs);
        images.extend(listing.images.into_iter().map(ImageFile::new));
    }

    images.sort_by(|a, b| a.segments.cmp(&b.segments));
    log::info!("Found {} image(s) under {}", images.len(), root.display());
    Ok(images)
}

/// Decode every file with `service`, at most `options.concurrency` at once.
///
/// In [`ErrorMode::FailFast`] the first failure cancels the remaining work and
/// is returned. In [`ErrorMode::BestEffort`] failures are collected in the
/// returned [`BatchReport`].
pub async fn extract_metadata(
    files: Vec<ImageFile>,
    service: Arc<dyn MetadataService>,
    options: &ExtractOptions,
) -> Result<BatchReport> {
    let limit = options.concurrency.max(1);
    let total = files.len();
    let mut pending = files.into_iter();
    let mut workers = JoinSet::new();
    let mut report = BatchReport::default();

    log::debug!("Extracting {total} file(s) with {}", service.name());

    loop {
        while workers.len() < limit {
            let Some(file) = pending.next() else { break };
            let service = Arc::clone(&service);
            workers.spawn(async move {
                let outcome = service.parse(&file.path).await;
                (file, outcome)
            });
        }

        let Some(joined) = workers.join_next().await else {
            break;
        };
        let (file, outcome) = joined?;

        match outcome {
            Ok(metadata) => {
                log::debug!("Extracted {}", file.path.display());
                report.records.push(MetadataRecord::new(metadata, file.segments));
            }
            Err(error) if options.error_mode == ErrorMode::FailFast => return Err(error),
            Err(error) => {
                log::warn!("Skipping {}: {error}", file.path.display());
                report.failures.push(FileFailure {
                    path: file.path,
                    segments: file.segments,
                    error,
                });
            }
        }
    }

    report.records.sort_by(|a, b| a.segments.cmp(&b.segments));
    report.failures.sort_by(|a, b| a.segments.cmp(&b.segments));

    log::info!(
        "Extracted {} of {total} file(s), {} failed",
        report.records.len(),
        report.failures.len()
    );
    Ok(report)
}

/// Collect and extract in one go.
pub async fn scan(
    root: &Path,
    service: Arc<dyn MetadataService>,
    config: &ScanConfig,
) -> Result<BatchReport> {
    let files = collect_images(root, &config.into()).await?;
    extract_metadata(files, service, &config.into()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn options() -> CollectOptions {
        CollectOptions {
            concurrency: 2,
            case_insensitive: false,
        }
    }

    // ── is_supported_image ───────────────────────────────────────────

    #[test]
    fn supported_image_extensions() {
        assert!(is_supported_image("photo.jpg", false));
        assert!(is_supported_image("photo.jpeg", false));
        assert!(is_supported_image("scan.tif", false));
        assert!(is_supported_image("scan.tiff", false));
        assert!(is_supported_image("archive.tar.jpg", false));
    }

    #[test]
    fn unsupported_image_extensions() {
        assert!(!is_supported_image("photo.png", false));
        assert!(!is_supported_image("readme.txt", false));
        assert!(!is_supported_image("photo.jpg.bak", false));
        assert!(!is_supported_image("noext", false));
    }

    #[test]
    fn extension_match_is_case_sensitive_by_default() {
        assert!(!is_supported_image("PHOTO.JPG", false));
        assert!(is_supported_image("PHOTO.JPG", true));
        assert!(is_supported_image("scan.Tiff", true));
    }

    #[test]
    fn dotless_name_compared_whole() {
        assert!(is_supported_image("jpg", false));
    }

    // ── path_segments / normalize_root ───────────────────────────────

    #[test]
    fn segments_drop_leading_dot() {
        assert_eq!(
            path_segments(Path::new("./a/b/photo.jpg")),
            vec!["a", "b", "photo.jpg"]
        );
    }

    #[test]
    fn segments_keep_relative_root() {
        assert_eq!(
            path_segments(Path::new("photos/2021/img.jpg")),
            vec!["photos", "2021", "img.jpg"]
        );
    }

    #[test]
    fn segments_skip_root_dir() {
        assert_eq!(path_segments(Path::new("/x/y.jpg")), vec!["x", "y.jpg"]);
    }

    #[test]
    fn normalize_root_strips_one_trailing_separator() {
        assert_eq!(normalize_root("photos/"), PathBuf::from("photos"));
        assert_eq!(normalize_root("photos"), PathBuf::from("photos"));
        assert_eq!(normalize_root("/"), PathBuf::from("/"));
        assert_eq!(normalize_root(""), PathBuf::from("."));
    }

    // ── MetadataRecord ───────────────────────────────────────────────

    #[test]
    fn record_accessors() {
        let record = MetadataRecord::new(
            Metadata::default(),
            vec!["a".into(), "b".into(), "c.jpg".into()],
        );
        assert_eq!(record.file_name(), "c.jpg");
        assert_eq!(record.directories(), ["a", "b"]);
        assert_eq!(record.display_path(), "a/b/c.jpg");
    }

    // ── collect_images ───────────────────────────────────────────────

    #[tokio::test]
    async fn collect_single_file_ignores_extension() {
        let dir = TempDir::new().unwrap();
        let txt = dir.path().join("notes.txt");
        fs::write(&txt, b"hello").unwrap();

        let images = collect_images(&txt, &options()).await.unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].path, txt);
        assert_eq!(images[0].segments.last().unwrap(), "notes.txt");
    }

    #[tokio::test]
    async fn collect_directory_recursive_sorted() {
        let dir = TempDir::new().unwrap();
        let deep = dir.path().join("b").join("c");
        fs::create_dir_all(&deep).unwrap();
        fs::create_dir(dir.path().join("a")).unwrap();

        fs::write(dir.path().join("z.jpg"), b"fake").unwrap();
        fs::write(deep.join("deep.tiff"), b"fake").unwrap();
        fs::write(dir.path().join("a").join("one.jpeg"), b"fake").unwrap();
        fs::write(dir.path().join("a").join("skip.png"), b"fake").unwrap();
        fs::write(deep.join("skip.txt"), b"fake").unwrap();

        let images = collect_images(dir.path(), &options()).await.unwrap();
        let names: Vec<&str> = images
            .iter()
            .map(|f| f.segments.last().unwrap().as_str())
            .collect();
        assert_eq!(names, vec!["one.jpeg", "deep.tiff", "z.jpg"]);

        let base = path_segments(dir.path()).len();
        assert_eq!(images[1].segments.len(), base + 3);
    }

    #[tokio::test]
    async fn collect_empty_dir() {
        let dir = TempDir::new().unwrap();
        let images = collect_images(dir.path(), &options()).await.unwrap();
        assert!(images.is_empty());
    }

    #[tokio::test]
    async fn collect_nonexistent_root_fails() {
        let err = collect_images(Path::new("/nonexistent/path"), &options())
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::FileSystem { .. }));
    }

    #[tokio::test]
    async fn collect_with_single_worker() {
        let dir = TempDir::new().unwrap();
        for i in 0..5 {
            let sub = dir.path().join(format!("d{i}"));
            fs::create_dir(&sub).unwrap();
            fs::write(sub.join("p.jpg"), b"fake").unwrap();
        }

        let opts = CollectOptions {
            concurrency: 1,
            case_insensitive: false,
        };
        let images = collect_images(dir.path(), &opts).await.unwrap();
        assert_eq!(images.len(), 5);
    }
}
