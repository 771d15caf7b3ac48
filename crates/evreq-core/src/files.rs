//! Download placement: filename derivation and final-path handling.
//!
//! Transfers stream into a `.part` file next to the final location; only a
//! completed transfer is moved into place, so an interrupted download never
//! leaves a half-written file under the final name.

use std::path::{Path, PathBuf};

use crate::error::Error;

/// Fallback when the URL path yields no usable filename.
const DEFAULT_FILENAME: &str = "download.bin";

/// Temporary file suffix used until the transfer completes.
pub const TEMP_SUFFIX: &str = ".part";

/// Derive a safe local filename from the URL's last path segment. Falls back
/// to `download.bin` when the path is empty or unusable.
pub fn derive_filename(url: &str) -> String {
    let candidate = url::Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path()
                .split('/')
                .filter(|s| !s.is_empty())
                .last()
                .map(str::to_string)
        })
        .map(|raw| sanitize(&raw));

    match candidate {
        Some(name) if !name.is_empty() && name != "." && name != ".." => name,
        _ => DEFAULT_FILENAME.to_string(),
    }
}

/// Replace path separators and control characters, trim leading/trailing
/// dots and spaces, cap at 255 bytes.
fn sanitize(name: &str) -> String {
    const NAME_MAX: usize = 255;

    let cleaned: String = name
        .chars()
        .map(|c| {
            if c == '/' || c == '\\' || c == '\0' || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();
    let trimmed = cleaned.trim_matches(|c| c == ' ' || c == '.');

    if trimmed.len() > NAME_MAX {
        let mut take = NAME_MAX;
        while take > 0 && !trimmed.is_char_boundary(take) {
            take -= 1;
        }
        trimmed[..take].to_string()
    } else {
        trimmed.to_string()
    }
}

/// Final path for a download: directory joined with the derived filename.
/// Fails with `FileExists` when the file is present and overwrite is off.
pub fn target_path(url: &str, directory: &Path, overwrite: bool) -> Result<PathBuf, Error> {
    let path = directory.join(derive_filename(url));
    if path.exists() && !overwrite {
        return Err(Error::file_exists(&path));
    }
    Ok(path)
}

/// Temp path next to the final one (`name.part`).
pub fn temp_path(final_path: &Path) -> PathBuf {
    let mut os = final_path.as_os_str().to_owned();
    os.push(TEMP_SUFFIX);
    PathBuf::from(os)
}

/// Move the completed temp file into place. Replaces an existing target only
/// when `overwrite` is set; falls back to copy+remove when rename crosses a
/// filesystem boundary.
pub fn place(temp: &Path, target: &Path, overwrite: bool) -> Result<(), Error> {
    if target.exists() {
        if !overwrite {
            let _ = std::fs::remove_file(temp);
            return Err(Error::file_exists(target));
        }
        std::fs::remove_file(target)
            .map_err(|e| Error::file_copy(format!("remove {}: {}", target.display(), e)))?;
    }

    if std::fs::rename(temp, target).is_ok() {
        return Ok(());
    }
    std::fs::copy(temp, target)
        .map_err(|e| Error::file_copy(format!("copy to {}: {}", target.display(), e)))?;
    let _ = std::fs::remove_file(temp);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_from_url_path() {
        assert_eq!(derive_filename("http://host/a/b/archive.zip"), "archive.zip");
        assert_eq!(derive_filename("http://host/report.pdf?token=1"), "report.pdf");
    }

    #[test]
    fn filename_fallback_for_root_paths() {
        assert_eq!(derive_filename("http://host/"), "download.bin");
        assert_eq!(derive_filename("http://host"), "download.bin");
        assert_eq!(derive_filename("not a url"), "download.bin");
    }

    #[test]
    fn sanitize_strips_separators_and_trims() {
        assert_eq!(sanitize("a/b\\c.txt"), "a_b_c.txt");
        assert_eq!(sanitize("  ..name.. "), "name");
        assert_eq!(sanitize("x\0y"), "x_y");
    }

    #[test]
    fn temp_path_appends_suffix() {
        assert_eq!(
            temp_path(Path::new("/tmp/file.zip")).to_string_lossy(),
            "/tmp/file.zip.part"
        );
    }

    #[test]
    fn target_path_respects_overwrite_flag() {
        let dir = tempfile::tempdir().unwrap();
        let existing = dir.path().join("file.bin");
        std::fs::write(&existing, b"old").unwrap();

        let err = target_path("http://host/file.bin", dir.path(), false).unwrap_err();
        assert!(matches!(err.kind, crate::error::ErrorKind::FileExists(_)));

        let ok = target_path("http://host/file.bin", dir.path(), true).unwrap();
        assert_eq!(ok, existing);
    }

    #[test]
    fn place_moves_temp_into_target() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.bin");
        let temp = temp_path(&target);
        std::fs::write(&temp, b"payload").unwrap();

        place(&temp, &target, false).unwrap();
        assert!(!temp.exists());
        assert_eq!(std::fs::read(&target).unwrap(), b"payload");
    }

    #[test]
    fn place_overwrites_only_when_asked() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.bin");
        std::fs::write(&target, b"old").unwrap();

        let temp = temp_path(&target);
        std::fs::write(&temp, b"new").unwrap();
        let err = place(&temp, &target, false).unwrap_err();
        assert!(matches!(err.kind, crate::error::ErrorKind::FileExists(_)));
        assert!(!temp.exists(), "temp file is discarded on refusal");
        assert_eq!(std::fs::read(&target).unwrap(), b"old");

        std::fs::write(&temp, b"new").unwrap();
        place(&temp, &target, true).unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"new");
    }
}
