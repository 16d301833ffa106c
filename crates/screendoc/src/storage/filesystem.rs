use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::error::StorageError;

const MAX_CONFLICT_SUFFIX: u32 = 1000;

/// Writes finished documents into the output directory without ever
/// overwriting an existing file.
pub struct FileStorage {
    output_directory: PathBuf,
}

impl FileStorage {
    pub fn new<P: AsRef<Path>>(output_directory: P) -> Self {
        Self {
            output_directory: output_directory.as_ref().to_path_buf(),
        }
    }

    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }

    /// Output file name for a job: `<date>_<slug>.<extension>`.
    pub fn document_name(title: &str, extension: &str) -> String {
        format!("{}_{}.{}", Utc::now().format("%Y-%m-%d"), slugify(title), extension)
    }

    /// Stores `content` as `filename` in the output directory, appending `_2`,
    /// `_3`, ... to the stem while the name is taken.
    pub fn store(&self, content: &[u8], filename: &str) -> Result<PathBuf, StorageError> {
        ensure_directory(&self.output_directory)?;
        write_new(&self.output_directory, filename, content)
    }
}

/// Creates `filename` (or the first free `_N` variant) in `dir` with
/// `create_new`, so concurrent writers never clobber each other.
pub fn write_new(dir: &Path, filename: &str, content: &[u8]) -> Result<PathBuf, StorageError> {
    let (base, ext) = match filename.rfind('.') {
        Some(dot) if dot > 0 => (&filename[..dot], Some(&filename[dot..])),
        _ => (filename, None),
    };

    for counter in 1..=MAX_CONFLICT_SUFFIX {
        let candidate = if counter == 1 {
            filename.to_string()
        } else {
            format!("{}_{}{}", base, counter, ext.unwrap_or(""))
        };
        let path = dir.join(&candidate);

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(mut file) => {
                file.write_all(content)
                    .map_err(|e| StorageError::WriteFile {
                        path: path.clone(),
                        source: e,
                    })?;
                return Ok(path);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(StorageError::WriteFile { path, source: e }),
        }
    }

    Err(StorageError::FileExists(dir.join(filename)))
}

pub fn ensure_directory(path: &Path) -> Result<(), StorageError> {
    std::fs::create_dir_all(path).map_err(|e| StorageError::CreateDirectory {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Lowercase ASCII slug; runs of anything else collapse to one `-`.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        "document".to_string()
    } else {
        slug.to_string()
    }
}
