//! File storage collaborator. The core only ever holds the returned
//! reference string, never the bytes.

use std::path::PathBuf;

use uuid::Uuid;

use crate::errors::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub fn from_env() -> Self {
        let root = std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string());
        Self { root: PathBuf::from(root) }
    }

    /// Persist uploaded bytes and return a retrievable reference path. The
    /// stored name is prefixed with a fresh uuid so uploads never collide.
    pub async fn store(&self, file_name: &str, bytes: &[u8]) -> AppResult<String> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|err| AppError::internal(format!("failed to create upload dir: {err}")))?;

        let stored_name = format!("{}_{}", Uuid::new_v4(), sanitize(file_name));
        let path = self.root.join(&stored_name);

        tokio::fs::write(&path, bytes)
            .await
            .map_err(|err| AppError::internal(format!("failed to store file: {err}")))?;

        Ok(path.to_string_lossy().into_owned())
    }
}

fn sanitize(file_name: &str) -> String {
    file_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_path_separators() {
        assert_eq!(sanitize("../../etc/passwd"), ".._.._etc_passwd");
        assert_eq!(sanitize("report v2.pdf"), "report_v2.pdf");
    }
}
