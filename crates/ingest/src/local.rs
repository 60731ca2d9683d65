use std::path::{Path, PathBuf};

use ambari2graphite_core::error::{BridgeError, Result};
use ambari2graphite_core::sink::PointSink;

use crate::pipeline::Publisher;

/// Previously captured response files, replayed in file-name order.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalSource {
    files: Vec<PathBuf>,
}

impl LocalSource {
    /// A directory contributes its regular files (subdirectories are
    /// skipped); a plain file is replayed on its own.
    pub async fn open(path: &Path) -> Result<Self> {
        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|e| BridgeError::Io(format!("stat {} failed: {e}", path.display())))?;
        if meta.is_file() {
            return Ok(Self {
                files: vec![path.to_path_buf()],
            });
        }

        let mut entries = tokio::fs::read_dir(path)
            .await
            .map_err(|e| BridgeError::Io(format!("list {} failed: {e}", path.display())))?;
        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| BridgeError::Io(format!("list {} failed: {e}", path.display())))?
        {
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| BridgeError::Io(format!("stat {} failed: {e}", entry.path().display())))?;
            if file_type.is_dir() {
                continue;
            }
            files.push(entry.path());
        }
        files.sort();
        Ok(Self { files })
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Publishes every file. Unreadable or malformed files are skipped.
    pub async fn replay<S: PointSink>(&self, publisher: &mut Publisher<S>) -> Result<()> {
        for file in &self.files {
            let label = file.display().to_string();
            match tokio::fs::read(file).await {
                Ok(raw) => {
                    publisher.publish_raw(&label, &raw)?;
                }
                Err(e) => {
                    publisher.record_skipped(&label, &BridgeError::Io(format!("read failed: {e}")));
                }
            }
        }
        Ok(())
    }
}
