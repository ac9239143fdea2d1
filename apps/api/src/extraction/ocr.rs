//! OCR through the external `tesseract` binary.

use std::io::Write;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::ExtractionError;
use crate::config::Config;

/// Recognizes text in a single image.
///
/// Carried in `AppState` as `Option<Arc<dyn OcrEngine>>`; `None` means OCR is disabled.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// `extension` names the image encoding (`png`, `jpg`, `pgm`, ...).
    async fn recognize(&self, image: &[u8], extension: &str) -> Result<String, ExtractionError>;
}

/// Runs `tesseract <image> stdout -l <lang>` on a temp file.
pub struct TesseractCli {
    command: String,
    lang: String,
    timeout: Duration,
}

impl TesseractCli {
    pub fn new(command: impl Into<String>, lang: impl Into<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            lang: lang.into(),
            timeout,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.tesseract_cmd.clone(),
            config.ocr_lang.clone(),
            Duration::from_secs(config.ocr_timeout_secs),
        )
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

#[async_trait]
impl OcrEngine for TesseractCli {
    async fn recognize(&self, image: &[u8], extension: &str) -> Result<String, ExtractionError> {
        // Tesseract sniffs the format but needs a path; the file is removed on drop.
        let mut file = tempfile::Builder::new()
            .prefix("resume-ocr-")
            .suffix(&format!(".{extension}"))
            .tempfile()
            .map_err(|e| ExtractionError::Ocr(format!("could not create temp file: {e}")))?;
        file.write_all(image)
            .and_then(|_| file.flush())
            .map_err(|e| ExtractionError::Ocr(format!("could not write temp file: {e}")))?;

        let mut cmd = Command::new(&self.command);
        cmd.arg(file.path())
            .arg("stdout")
            .arg("-l")
            .arg(&self.lang)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(
            program = %self.command,
            lang = %self.lang,
            bytes = image.len(),
            "Running OCR"
        );

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| {
                ExtractionError::Ocr(format!(
                    "timed out after {} seconds",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| ExtractionError::Ocr(format!("could not run '{}': {e}", self.command)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractionError::Ocr(format!(
                "{} exited with {}: {}",
                self.command,
                output.status,
                stderr.trim()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        debug!(chars = text.len(), "OCR finished");
        Ok(text)
    }
}
