//! Raster image extractor.
//!
//! Runs optical character recognition over the whole image by shelling out to
//! `tesseract` (Japanese model by default) and wraps any recognized text as a
//! single fragment labeled `画像全体`. A missing binary, a failed run, or a
//! run exceeding the configured timeout is an [`ExtractError`]; the
//! dispatcher turns that into an empty extraction so a stalled OCR call never
//! wedges a whole batch.

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;

use crate::config::OcrConfig;
use crate::extract::{ExtractError, Extractor};
use crate::models::Fragment;

pub struct PngExtractor {
    ocr: OcrConfig,
}

impl PngExtractor {
    pub fn new(ocr: OcrConfig) -> Self {
        Self { ocr }
    }
}

#[async_trait]
impl Extractor for PngExtractor {
    fn extensions(&self) -> &[&str] {
        &["png"]
    }

    async fn extract(&self, path: &Path) -> Result<Vec<Fragment>, ExtractError> {
        let text = self.recognize(path).await?;
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![Fragment::new("画像全体", text.trim())])
    }
}

impl PngExtractor {
    /// `tesseract <image> stdout -l <lang>` with a hard timeout. The child is
    /// killed when the timeout drops the future, so a hung recognizer does not
    /// outlive its file.
    async fn recognize(&self, path: &Path) -> Result<String, ExtractError> {
        let run = Command::new(&self.ocr.command)
            .arg(path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.ocr.lang)
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(Duration::from_secs(self.ocr.timeout_secs), run)
            .await
            .map_err(|_| {
                ExtractError::Ocr(format!(
                    "{} timed out after {}s",
                    self.ocr.command, self.ocr.timeout_secs
                ))
            })?
            .map_err(|e| ExtractError::Ocr(format!("{}: {}", self.ocr.command, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractError::Ocr(format!(
                "{} exited with {}: {}",
                self.ocr.command,
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor_with_command(command: &str) -> PngExtractor {
        PngExtractor::new(OcrConfig {
            command: command.to_string(),
            lang: "jpn".to_string(),
            timeout_secs: 5,
        })
    }

    #[tokio::test]
    async fn missing_binary_is_an_ocr_error() {
        let ex = extractor_with_command("/nonexistent/tesseract");
        let err = ex.extract(Path::new("scan.png")).await.unwrap_err();
        assert!(matches!(err, ExtractError::Ocr(_)));
    }

    #[tokio::test]
    async fn failing_process_is_an_ocr_error() {
        let ex = extractor_with_command("false");
        let err = ex.extract(Path::new("scan.png")).await.unwrap_err();
        assert!(matches!(err, ExtractError::Ocr(_)));
    }

    #[tokio::test]
    async fn recognized_text_becomes_one_labeled_fragment() {
        // `echo` stands in for tesseract: it prints its arguments, which is
        // non-blank output on stdout with exit 0.
        let ex = extractor_with_command("echo");
        let frags = ex.extract(Path::new("scan.png")).await.unwrap();
        assert_eq!(frags.len(), 1);
        assert_eq!(frags[0].label, "画像全体");
        assert!(frags[0].text.contains("scan.png"));
    }

    #[tokio::test]
    async fn hung_process_times_out_as_ocr_error() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("slow-ocr.sh");
        std::fs::write(&script, "#!/bin/sh\nsleep 10\n").unwrap();
        let mut perms = std::fs::metadata(&script).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&script, perms).unwrap();

        let ex = PngExtractor::new(OcrConfig {
            command: script.display().to_string(),
            lang: "jpn".to_string(),
            timeout_secs: 1,
        });
        let err = ex.extract(Path::new("scan.png")).await.unwrap_err();
        assert!(matches!(err, ExtractError::Ocr(_)));
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn blank_output_yields_no_fragments() {
        // `true` exits 0 with empty stdout, like OCR finding no text.
        let ex = extractor_with_command("true");
        let frags = ex.extract(Path::new("scan.png")).await.unwrap();
        assert!(frags.is_empty());
    }
}
