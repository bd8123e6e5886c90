use std::path::{Path, PathBuf};

use rand::{thread_rng, Rng};
use tokio::fs::{create_dir_all, remove_file, File};
use tokio::io::{AsyncWriteExt, BufWriter};

use crate::err::Error;

#[derive(Debug, Clone)]
pub struct StoredFile {
    pub filename: String,
    pub path: String,
}

/// Flat directory of uploaded files (application documents, gallery
/// images), each stored under a generated name that keeps the original
/// extension.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub async fn prepare(&self) -> anyhow::Result<()> {
        create_dir_all(&self.root).await?;
        Ok(())
    }

    /// Writes `bytes` fully under a fresh name, or fails without leaving a
    /// record-worthy file behind.
    pub async fn store(
        &self,
        prefix: &str,
        original_name: Option<&str>,
        bytes: &[u8],
    ) -> Result<StoredFile, Error> {
        let filename = unique_filename(prefix, original_name);
        let target = self.root.join(&filename);
        if target.exists() {
            log::error!("Generated filename collision: {}", target.display());
            return Err(Error::StorageError {
                message: "File storage failed. Please try again.".to_string(),
            });
        }

        let file = File::create(&target).await?;
        let mut writer = BufWriter::new(file);
        writer.write_all(bytes).await?;
        writer.flush().await?;

        Ok(StoredFile {
            filename,
            path: target.to_string_lossy().to_string(),
        })
    }

    /// Best effort: a failure is logged and reported as `false`, never
    /// propagated.
    pub async fn remove(&self, path: &str) -> bool {
        match remove_file(path).await {
            Ok(()) => true,
            Err(err) => {
                log::warn!("Could not remove stored file `{}`: {}", path, err);
                false
            }
        }
    }
}

pub fn unique_filename(prefix: &str, original_name: Option<&str>) -> String {
    let suffix_bytes: [u8; 8] = thread_rng().gen();
    let suffix = hex::encode(suffix_bytes);
    match original_name.and_then(extension_of) {
        Some(ext) => format!("{}_{}.{}", prefix, suffix, ext),
        None => format!("{}_{}", prefix, suffix),
    }
}

fn extension_of(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
}
