//! Facilities for discovering input files and loading text corpora.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::IngestConfig;
use crate::error::{Result, SbpeError};

/// Discovers files rooted at the provided input paths according to the ingest configuration.
///
/// Files found under a directory are sorted by path so training stays
/// deterministic across filesystems; explicit file inputs keep their order.
pub fn collect_paths<P: AsRef<Path>>(inputs: &[P], cfg: &IngestConfig) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        let path = input.as_ref();
        if !path.exists() {
            return Err(SbpeError::InvalidArgument(format!(
                "input path {path:?} does not exist"
            )));
        }
        let metadata = path
            .metadata()
            .map_err(|err| SbpeError::io(err, Some(path.to_path_buf())))?;
        if metadata.is_dir() {
            let depth = if cfg.recursive { usize::MAX } else { 1 };
            let walker = WalkDir::new(path)
                .follow_links(cfg.follow_symlinks)
                .max_depth(depth)
                .sort_by_file_name();
            for entry in walker {
                let entry = entry.map_err(|err| SbpeError::Internal(err.to_string()))?;
                if entry.file_type().is_file() {
                    files.push(entry.into_path());
                }
            }
        } else if metadata.is_file() {
            files.push(path.to_path_buf());
        }
    }
    if files.is_empty() {
        return Err(SbpeError::InvalidArgument(
            "no files discovered in provided inputs".into(),
        ));
    }
    Ok(files)
}

/// Loads one document per discovered file.
///
/// Invalid UTF-8 is replaced with U+FFFD; empty files are skipped.
pub fn load_text_corpus<P: AsRef<Path>>(inputs: &[P], cfg: &IngestConfig) -> Result<Vec<String>> {
    let mut documents = Vec::new();
    for file_path in collect_paths(inputs, cfg)? {
        let raw = fs::read(&file_path).map_err(|err| SbpeError::io(err, Some(file_path.clone())))?;
        if raw.is_empty() {
            continue;
        }
        documents.push(String::from_utf8_lossy(&raw).into_owned());
    }
    if documents.is_empty() {
        return Err(SbpeError::InvalidArgument(
            "no text could be loaded from inputs".into(),
        ));
    }
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn collect_paths_discovers_files_recursively_in_order() {
        let dir = tempdir().expect("tempdir");
        let nested = dir.path().join("nested");
        fs::create_dir(&nested).expect("create nested directory");
        let file_a = dir.path().join("a.txt");
        let file_b = nested.join("b.txt");
        fs::write(&file_a, "alpha").expect("write a");
        fs::write(&file_b, "beta").expect("write b");

        let paths = collect_paths(&[dir.path()], &IngestConfig::default()).expect("collect paths");
        assert_eq!(paths, vec![file_a.clone(), file_b]);

        let shallow = IngestConfig {
            recursive: false,
            ..IngestConfig::default()
        };
        let paths = collect_paths(&[dir.path()], &shallow).expect("collect shallow");
        assert_eq!(paths, vec![file_a]);
    }

    #[test]
    fn missing_input_is_rejected() {
        let dir = tempdir().expect("tempdir");
        let err = collect_paths(&[dir.path().join("missing.txt")], &IngestConfig::default())
            .expect_err("missing path must fail");
        assert!(matches!(err, SbpeError::InvalidArgument(_)));
    }

    #[test]
    fn load_text_corpus_skips_empty_files() {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join("a.txt"), "Hello").expect("write a");
        fs::write(dir.path().join("b.txt"), "").expect("write b");
        fs::write(dir.path().join("c.txt"), [b'o', b'k', 0xFF]).expect("write c");
        let documents =
            load_text_corpus(&[dir.path()], &IngestConfig::default()).expect("load corpus");
        assert_eq!(documents, vec!["Hello".to_string(), "ok\u{FFFD}".to_string()]);
    }
}
