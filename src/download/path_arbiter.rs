//! Destination path resolution, `.matris` sidecar lifecycle, and byte-range planning.
//!
//! A file claims a destination by creating an empty `<name>.matris` sidecar
//! next to it before any bytes are written. The sidecar is the arbiter: its
//! presence means "someone is already writing here", so a second enqueue of
//! the same destination gets a numbered variant instead of colliding. On
//! success the sidecar is renamed over the final name (dropping `.matris`);
//! on failure it's deleted.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::warn;

/// Suffix marking a file claimed but not yet fully written.
const SIDECAR_SUFFIX: &str = ".matris";

/// Path of the `.matris` sidecar for a given final destination.
pub(crate) fn sidecar_path(filepath: &Path) -> PathBuf {
    let mut name = filepath.file_name().unwrap_or_default().to_os_string();
    name.push(SIDECAR_SUFFIX);
    filepath.with_file_name(name)
}

/// Resolves the path a new download should be written to, creating parent
/// directories as needed.
///
/// Four mutually exclusive cases, checked in order:
/// 1. Neither `filepath` nor its sidecar exists -> use `filepath` as-is.
/// 2. The sidecar exists -> another in-flight (or crashed) transfer claimed
///    this name; pick a numbered variant.
/// 3. `filepath` exists and `overwrite` is `false` -> pick a numbered variant.
/// 4. `filepath` exists and `overwrite` is `true` -> reuse `filepath`.
///
/// # Errors
///
/// Returns an error if the parent directory cannot be created.
pub fn resolve(filepath: &Path, overwrite: bool) -> std::io::Result<PathBuf> {
    let tempfile_path = sidecar_path(filepath);

    let final_path = if !filepath.exists() && !tempfile_path.exists() {
        filepath.to_path_buf()
    } else if tempfile_path.exists() {
        replacement_filename(filepath)
    } else if overwrite {
        filepath.to_path_buf()
    } else {
        replacement_filename(filepath)
    };

    if !final_path.exists()
        && let Some(parent) = final_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    Ok(final_path)
}

/// Splits a filename into `(name, all-suffixes)`, matching Python's
/// `pathlib.Path.suffixes` (e.g. `"archive.tar.gz"` -> `("archive", ".tar.gz")`,
/// and a leading dot in a hidden file's name is not itself a suffix).
fn split_all_suffixes(filename: &str) -> (&str, &str) {
    let search_area = filename.strip_prefix('.').unwrap_or(filename);
    match search_area.find('.') {
        Some(rel_pos) => {
            let pos = filename.len() - search_area.len() + rel_pos;
            (&filename[..pos], &filename[pos..])
        }
        None => (filename, ""),
    }
}

/// Finds the next free `name.N.ext` variant for a colliding destination,
/// checking both the candidate path and its `.matris` sidecar.
fn replacement_filename(path: &Path) -> PathBuf {
    let parent = path.parent().unwrap_or_else(|| Path::new(""));
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("download");
    let (name, suffix) = split_all_suffixes(filename);

    let mut counter: u64 = 1;
    loop {
        let new_path = parent.join(format!("{name}.{counter}{suffix}"));
        let tmp_path = sidecar_path(&new_path);
        if !new_path.exists() && !tmp_path.exists() {
            return new_path;
        }
        counter += 1;
    }
}

/// Claims `path` by creating an empty `.matris` sidecar next to it.
///
/// # Errors
///
/// Returns an error if the sidecar file cannot be created.
pub fn allocate_tempfile(path: &Path) -> std::io::Result<PathBuf> {
    let tempfile = sidecar_path(path);
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&tempfile)?;
    Ok(tempfile)
}

/// Promotes a completed `.matris` sidecar to its final name, overwriting
/// whatever (if anything) already sits at the final name.
///
/// Failures to remove the pre-existing file or to rename are logged and
/// swallowed; promotion is best-effort.
pub fn promote(tempfile_path: &Path) -> PathBuf {
    let Some(stem) = tempfile_path.file_stem() else {
        return tempfile_path.to_path_buf();
    };
    let original_path = tempfile_path.with_file_name(stem);

    if !tempfile_path.exists() {
        return original_path;
    }
    if original_path.exists() {
        remove(&original_path);
    }
    if let Err(error) = std::fs::rename(tempfile_path, &original_path) {
        warn!(
            from = %tempfile_path.display(),
            to = %original_path.display(),
            %error,
            "failed to promote tempfile"
        );
    }
    original_path
}

/// Best-effort delete; missing files are not an error, other failures are logged.
pub fn remove(path: &Path) {
    if let Err(error) = std::fs::remove_file(path)
        && error.kind() != std::io::ErrorKind::NotFound
    {
        warn!(path = %path.display(), %error, "failed to delete file");
    }
}

/// Splits a `Content-Disposition`-style header into its bare value and its
/// `name=value` parameters, honoring quoted values that contain `;`.
///
/// Ported from CPython's `cgi.parse_header`/`_parseparam` (PSF License 2.0).
fn parse_header(line: &str) -> (String, HashMap<String, String>) {
    let mut parts = split_header_params(line).into_iter();
    let key = parts.next().unwrap_or_default();
    let mut pdict = HashMap::new();
    for part in parts {
        if let Some(eq) = part.find('=') {
            let name = part[..eq].trim().to_lowercase();
            let mut value = part[eq + 1..].trim().to_string();
            if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
                value = value[1..value.len() - 1]
                    .replace("\\\\", "\\")
                    .replace("\\\"", "\"");
            }
            pdict.insert(name, value);
        }
    }
    (key, pdict)
}

fn split_header_params(line: &str) -> Vec<String> {
    let mut remaining = format!(";{line}");
    let mut parts = Vec::new();
    while let Some(rest) = remaining.strip_prefix(';') {
        let mut search_from = 0usize;
        let end = loop {
            match rest[search_from..].find(';') {
                None => break rest.len(),
                Some(rel) => {
                    let candidate = search_from + rel;
                    if candidate == 0 {
                        break candidate;
                    }
                    let prefix = &rest[..candidate];
                    let quotes = prefix.matches('"').count();
                    let escaped_quotes = prefix.matches("\\\"").count();
                    if (quotes - escaped_quotes) % 2 == 1 {
                        search_from = candidate + 1;
                    } else {
                        break candidate;
                    }
                }
            }
        };
        parts.push(rest[..end].trim().to_string());
        remaining = rest[end..].to_string();
    }
    parts
}

/// Extracts the `filename` parameter from a `Content-Disposition` header value.
#[must_use]
pub fn filename_from_content_disposition(header: &str) -> Option<String> {
    let (_, params) = parse_header(header);
    params.get("filename").cloned()
}

/// Picks the default filename for `url`, preferring a `Content-Disposition`
/// header's `filename` parameter over the URL's last path segment.
#[must_use]
pub fn default_filename(url: &str, content_disposition: Option<&str>) -> String {
    if let Some(header) = content_disposition
        && let Some(name) = filename_from_content_disposition(header)
    {
        return name;
    }
    let fallback = url.rsplit('/').next().unwrap_or(url);
    if fallback.is_empty() {
        "download".to_string()
    } else {
        fallback.to_string()
    }
}

/// A byte range to request: `start..` if `end` is `None` (request to EOF),
/// else `start..end`.
pub type ByteRange = (u64, Option<u64>);

/// Splits `content_length` bytes into up to `max_splits` contiguous ranges.
///
/// Matches `generate_range`: the final range's upper bound is left open
/// ("to end") rather than computed, so a slightly-too-short last chunk from
/// integer division still reads the remaining tail. `max_splits < 1` is
/// corrected up to 1. `content_length == 0` returns an empty plan; callers
/// should fall back to a single unranged request in that case.
#[must_use]
pub fn generate_range(content_length: u64, max_splits: u32) -> Vec<ByteRange> {
    if content_length == 0 {
        return Vec::new();
    }
    let max_splits = max_splits.max(1);
    let split_length = (content_length / u64::from(max_splits)).max(1);

    let mut ranges: Vec<ByteRange> = Vec::new();
    let mut start = 0u64;
    while start < content_length {
        ranges.push((start, Some(start + split_length)));
        start += split_length;
    }
    if let Some(last) = ranges.last_mut() {
        last.1 = None;
    }
    ranges
}
