//! # Quote PDF Rasterization
//!
//! Prints the HTML built by `cotiza_core::pdf` with a headless Chromium.
//!
//! ```text
//!  render(html)
//!     │
//!     ├─► $TMP/cotiza-<uuid>.html
//!     ├─► chromium --headless --print-to-pdf=$TMP/cotiza-<uuid>.pdf file://...html
//!     │        (killed after the timeout)
//!     ├─► read $TMP/cotiza-<uuid>.pdf
//!     └─► remove both files
//! ```

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum PdfError {
    #[error("No se pudo iniciar {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("El navegador no terminó en {0} segundos")]
    Timeout(u64),

    #[error("El navegador falló ({status}): {stderr}")]
    Failed { status: String, stderr: String },

    #[error("Error de archivo temporal: {0}")]
    Io(#[from] std::io::Error),

    #[error("Ruta temporal no absoluta: {0}")]
    RelativePath(String),
}

/// Headless Chromium driver.
#[derive(Debug, Clone)]
pub struct ChromiumRenderer {
    binary: String,
    timeout: Duration,
    temp_dir: PathBuf,
}

impl ChromiumRenderer {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        ChromiumRenderer {
            binary: binary.into(),
            timeout,
            temp_dir: std::env::temp_dir(),
        }
    }

    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = dir.into();
        self
    }

    /// Command-line arguments for one print job. The page is passed as a
    /// percent-encoded `file://` URL, so `html_path` must be absolute.
    pub fn args(html_path: &Path, pdf_path: &Path) -> Result<Vec<String>, PdfError> {
        let page = Url::from_file_path(html_path)
            .map_err(|_| PdfError::RelativePath(html_path.display().to_string()))?;

        Ok(vec![
            "--headless".to_string(),
            "--disable-gpu".to_string(),
            "--no-sandbox".to_string(),
            "--no-pdf-header-footer".to_string(),
            format!("--print-to-pdf={}", pdf_path.display()),
            page.to_string(),
        ])
    }

    /// Renders `html` to PDF bytes.
    pub async fn render(&self, html: &str) -> Result<Vec<u8>, PdfError> {
        let job = Uuid::new_v4();
        let html_path = self.temp_dir.join(format!("cotiza-{}.html", job));
        let pdf_path = self.temp_dir.join(format!("cotiza-{}.pdf", job));

        tokio::fs::write(&html_path, html).await?;
        let result = self.print(&html_path, &pdf_path).await;

        let _ = tokio::fs::remove_file(&html_path).await;
        let _ = tokio::fs::remove_file(&pdf_path).await;

        result
    }

    async fn print(&self, html_path: &Path, pdf_path: &Path) -> Result<Vec<u8>, PdfError> {
        debug!(binary = %self.binary, html = %html_path.display(), "Starting headless browser");

        let child = Command::new(&self.binary)
            .args(Self::args(html_path, pdf_path)?)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| PdfError::Spawn {
                binary: self.binary.clone(),
                source,
            })?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| PdfError::Timeout(self.timeout.as_secs()))??;

        if !output.status.success() {
            return Err(PdfError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let bytes = tokio::fs::read(pdf_path).await?;
        info!(bytes = bytes.len(), "PDF rendered");
        Ok(bytes)
    }
}
