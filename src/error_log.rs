//! Durable, append-only log of failures on the listing routes.

use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;

pub struct ErrorLog {
    path: PathBuf,
    // Keeps concurrent records from interleaving
    write_lock: Mutex<()>,
}

impl ErrorLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one timestamped record. Write failures are only traced.
    pub async fn record(&self, route: &str, message: &str) {
        let line = format!(
            "[{}] {} Error: {}\n",
            chrono::Utc::now().to_rfc3339(),
            route,
            message
        );

        let _guard = self.write_lock.lock().await;
        let result = async {
            if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent).await?;
            }
            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .await?;
            file.write_all(line.as_bytes()).await?;
            file.flush().await
        }
        .await;

        if let Err(e) = result {
            warn!(path = %self.path.display(), error = %e, "Failed to write error log");
        }
    }
}
