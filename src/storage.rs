//! Filesystem side of the upload service: filename sanitization, the upload
//! directory resolver, and collision-safe path allocation.

use chrono::Utc;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};

/// Linux NAME_MAX.
const MAX_NAME_BYTES: usize = 255;

/// Upper bound on numbered disambiguation suffixes before falling back to a
/// timestamped name.
const MAX_SUFFIX_ATTEMPTS: u32 = 9999;

/// Creates the upload directory (and parents) if it does not exist yet.
/// Idempotent, called on every upload request.
pub async fn ensure_upload_dir(dir: &Path) -> io::Result<()> {
    fs::create_dir_all(dir).await
}

/// Reduces a client-supplied filename to a single safe path segment.
///
/// Directory components are dropped (only the text after the last `/` or `\`
/// survives), anything that is not ASCII-alphanumeric, `.`, or `-` becomes a
/// collapsed `_`, and leading/trailing `.`, `_`, `-` are trimmed so `.` and
/// `..` reduce to nothing. Returns `None` when nothing survives; the caller
/// substitutes a timestamped fallback name.
pub fn sanitize_filename(raw: &str) -> Option<String> {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or(raw);

    let mut out = String::with_capacity(base.len());
    let mut prev_underscore = false;
    for c in base.chars() {
        let replacement = if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
            c
        } else {
            '_'
        };
        if replacement == '_' {
            if !prev_underscore {
                out.push('_');
            }
            prev_underscore = true;
        } else {
            out.push(replacement);
            prev_underscore = false;
        }
    }

    let mut name = out.trim_matches(['.', '_', '-']).to_string();
    // Output is pure ASCII at this point, so byte truncation is safe.
    name.truncate(MAX_NAME_BYTES);

    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

/// Allocates a currently-unused path for `filename` inside `dir` and opens it
/// for writing.
///
/// Each candidate is created exclusively (`create_new`), so two concurrent
/// uploads of the same name cannot both claim one path. Candidates are tried
/// in order: the name itself, then `stem_1.ext` .. `stem_9999.ext`. If the
/// whole range is taken the name falls back to `stem_<unix-timestamp>.ext`,
/// created without exclusivity.
pub async fn create_unique(dir: &Path, filename: &str) -> io::Result<(PathBuf, File)> {
    create_unique_bounded(dir, filename, MAX_SUFFIX_ATTEMPTS).await
}

async fn create_unique_bounded(
    dir: &Path,
    filename: &str,
    max_attempts: u32,
) -> io::Result<(PathBuf, File)> {
    if let Some(created) = try_create_new(dir.join(filename)).await? {
        return Ok(created);
    }

    let (stem, suffix) = split_stem_suffix(filename);
    for idx in 1..=max_attempts {
        let candidate = dir.join(format!("{stem}_{idx}{suffix}"));
        if let Some(created) = try_create_new(candidate).await? {
            return Ok(created);
        }
    }

    let fallback = dir.join(format!("{stem}_{}{suffix}", Utc::now().timestamp()));
    let file = File::create(&fallback).await?;
    Ok((fallback, file))
}

/// Exclusive create: `Ok(None)` means the path is already taken.
async fn try_create_new(path: PathBuf) -> io::Result<Option<(PathBuf, File)>> {
    match OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .await
    {
        Ok(file) => Ok(Some((path, file))),
        Err(err) if err.kind() == ErrorKind::AlreadyExists => Ok(None),
        Err(err) => Err(err),
    }
}

/// Last-dot split into stem and suffix, with the suffix keeping its dot.
/// A dot at position zero belongs to the stem, so `.bashrc` is all stem with
/// an empty suffix.
fn split_stem_suffix(filename: &str) -> (&str, &str) {
    match filename.rfind('.') {
        Some(idx) if idx > 0 => filename.split_at(idx),
        _ => (filename, ""),
    }
}
