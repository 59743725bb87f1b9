//! Ordered file concatenation with a per-file transform seam.

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// Concatenate file contents in the exact order given.
///
/// `transform` runs on each file's content before it is appended; this is
/// the seam the `pre_combine_file` hook stage plugs into. Entries that are
/// missing or not regular files are silently skipped.
pub fn combine<F>(files: &[PathBuf], mut transform: F) -> Result<Vec<u8>>
where
    F: FnMut(&Path, Vec<u8>) -> Result<Vec<u8>>,
{
    let mut content = Vec::new();

    for file in files {
        if !file.is_file() {
            continue;
        }
        let raw = match fs::read(file) {
            Ok(raw) => raw,
            Err(_) => continue,
        };
        content.extend(transform(file, raw)?);
    }

    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_combine_preserves_order() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.js");
        let b = dir.path().join("b.js");
        fs::write(&a, "var a=1;").unwrap();
        fs::write(&b, "var b=2;").unwrap();

        let out = combine(&[b.clone(), a.clone()], |_, content| Ok(content)).unwrap();
        assert_eq!(out, b"var b=2;var a=1;");
    }

    #[test]
    fn test_combine_skips_missing_and_dirs() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.js");
        fs::write(&a, "var a=1;").unwrap();
        let subdir = dir.path().join("sub");
        fs::create_dir(&subdir).unwrap();

        let files = vec![dir.path().join("ghost.js"), subdir, a];
        let out = combine(&files, |_, content| Ok(content)).unwrap();
        assert_eq!(out, b"var a=1;");
    }

    #[test]
    fn test_combine_applies_transform() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.js");
        fs::write(&a, "var a=1;").unwrap();

        let out = combine(&[a], |path, content| {
            let mut tagged = format!("/* {} */", path.file_name().unwrap().to_string_lossy())
                .into_bytes();
            tagged.extend(content);
            Ok(tagged)
        })
        .unwrap();
        assert_eq!(out, b"/* a.js */var a=1;");
    }
}
