// src/core/fs_ops.rs
//! File system and CSV artifact operations shared by every stage

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::path::Path;
use tokio::fs;
use tracing::{info, warn};

use crate::error::PipelineResult;
use crate::types::CsvRecord;

pub struct FsOps;

/// Rows read back from an artifact, with the count of rows that failed to decode.
#[derive(Debug)]
pub struct CsvLoad<T> {
    pub rows: Vec<T>,
    pub malformed: usize,
}

impl<T> Default for CsvLoad<T> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            malformed: 0,
        }
    }
}

impl FsOps {
    /// Ensure directory exists
    pub async fn ensure_dir_exists(path: &Path) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path)
                .await
                .with_context(|| format!("Failed to create directory: {}", path.display()))?;
            info!("Created directory: {}", path.display());
        }
        Ok(())
    }

    fn ensure_parent(path: &Path) -> std::io::Result<()> {
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
            _ => Ok(()),
        }
    }

    /// Read every row of a header-described CSV artifact. A missing file is empty.
    pub fn read_records<T: DeserializeOwned>(path: &Path) -> PipelineResult<CsvLoad<T>> {
        if !path.exists() {
            return Ok(CsvLoad::default());
        }

        let mut reader = csv::Reader::from_path(path)?;
        let mut load = CsvLoad::default();
        for (idx, row) in reader.deserialize::<T>().enumerate() {
            match row {
                Ok(record) => load.rows.push(record),
                Err(e) => {
                    load.malformed += 1;
                    warn!("Skipping malformed row {} in {}: {}", idx + 2, path.display(), e);
                }
            }
        }
        Ok(load)
    }

    /// Overwrite `path` with a header row followed by `rows`.
    pub fn write_records<T: Serialize + CsvRecord>(path: &Path, rows: &[T]) -> PipelineResult<()> {
        Self::ensure_parent(path)?;
        let mut writer = csv::Writer::from_path(path)?;
        if rows.is_empty() {
            writer.write_record(T::COLUMNS)?;
        }
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        info!("Written {} rows to {}", rows.len(), path.display());
        Ok(())
    }
}

/// Append-only CSV artifact. The header is written only when the file is new or empty.
pub struct CsvAppender {
    writer: csv::Writer<File>,
}

impl CsvAppender {
    pub fn open(path: &Path) -> PipelineResult<Self> {
        FsOps::ensure_parent(path)?;
        let needs_header = std::fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        Ok(Self { writer })
    }

    /// Append rows and flush so a crash keeps everything written so far.
    pub fn append_all<T: Serialize>(&mut self, rows: &[T]) -> PipelineResult<()> {
        for row in rows {
            self.writer.serialize(row)?;
        }
        self.writer.flush()?;
        Ok(())
    }

    pub fn append<T: Serialize>(&mut self, row: &T) -> PipelineResult<()> {
        self.append_all(std::slice::from_ref(row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CompanyPortal, Platform};

    fn portal(slug: &str) -> CompanyPortal {
        CompanyPortal {
            platform: Platform::Greenhouse,
            slug: slug.to_string(),
            portal_url: format!("https://job-boards.greenhouse.io/embed/job_board?for={}", slug),
        }
    }

    #[test]
    fn test_appender_writes_header_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/portals.csv");

        CsvAppender::open(&path).unwrap().append(&portal("acme")).unwrap();
        CsvAppender::open(&path).unwrap().append(&portal("beta")).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.matches("platform,slug,portal_url").count(), 1);

        let load: CsvLoad<CompanyPortal> = FsOps::read_records(&path).unwrap();
        assert_eq!(load.rows, vec![portal("acme"), portal("beta")]);
        assert_eq!(load.malformed, 0);
    }

    #[test]
    fn test_write_no_rows_keeps_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("portals.csv");
        FsOps::write_records::<CompanyPortal>(&path, &[]).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "platform,slug,portal_url\n");
        let load: CsvLoad<CompanyPortal> = FsOps::read_records(&path).unwrap();
        assert!(load.rows.is_empty());
        assert_eq!(load.malformed, 0);
    }

    #[test]
    fn test_read_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let load: CsvLoad<CompanyPortal> =
            FsOps::read_records(&dir.path().join("absent.csv")).unwrap();
        assert!(load.rows.is_empty());
    }

    #[test]
    fn test_malformed_rows_are_counted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("portals.csv");
        std::fs::write(
            &path,
            "platform,slug,portal_url\ngreenhouse,acme,https://a\nworkday,beta,https://b\n",
        )
        .unwrap();

        let load: CsvLoad<CompanyPortal> = FsOps::read_records(&path).unwrap();
        assert_eq!(load.rows.len(), 1);
        assert_eq!(load.malformed, 1);
    }

    #[tokio::test]
    async fn test_ensure_dir_exists() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a/b/c");
        FsOps::ensure_dir_exists(&target).await.unwrap();
        assert!(target.is_dir());
    }
}
