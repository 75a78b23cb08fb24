//! Line-oriented devices backed by a terminal.
//!
//! A keyboard-wedge barcode scanner types the code followed by Enter, so the
//! scanner and the editor both read a line. The camera reads the path of a photo
//! the device already stored. End of input always counts as cancelling.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Lines, Stdin, Stdout,
};

use crate::capture::{BarcodeEditor, BarcodeScanner, Camera, DeviceOutcome};
use crate::core::record::ImageSide;
use crate::error::{CaptureError, CaptureResult};

/// Typed at the editor prompt to close it without a value.
pub const CANCEL_COMMAND: &str = ":cancel";

/// Prompts on `out`, reads answers from `input`.
pub struct Console<R, W> {
    lines: Lines<R>,
    out: W,
}

impl Console<BufReader<Stdin>, Stdout> {
    /// Console on the process's stdin and stdout.
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl<R, W> Console<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(input: R, out: W) -> Self {
        Self {
            lines: input.lines(),
            out,
        }
    }

    /// Write `text` without a newline and read one line; `None` at end of input.
    pub async fn prompt(&mut self, text: &str) -> CaptureResult<Option<String>> {
        self.write(text).await?;
        self.lines
            .next_line()
            .await
            .map_err(|e| CaptureError::io("read console input", e))
    }

    /// Write one line.
    pub async fn say(&mut self, text: &str) -> CaptureResult<()> {
        self.write(&format!("{text}\n")).await
    }

    pub fn into_writer(self) -> W {
        self.out
    }

    async fn write(&mut self, text: &str) -> CaptureResult<()> {
        self.out
            .write_all(text.as_bytes())
            .await
            .map_err(|e| CaptureError::io("write console output", e))?;
        self.out
            .flush()
            .await
            .map_err(|e| CaptureError::io("write console output", e))
    }
}

#[async_trait]
impl<R, W> BarcodeScanner for Console<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn scan(&mut self) -> CaptureResult<DeviceOutcome<String>> {
        let line = self.prompt("scan barcode (blank to cancel): ").await?;
        Ok(match line.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => DeviceOutcome::Captured(code.to_string()),
            _ => DeviceOutcome::Cancelled,
        })
    }
}

#[async_trait]
impl<R, W> Camera for Console<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn take_photo(&mut self, side: ImageSide) -> CaptureResult<DeviceOutcome<Vec<u8>>> {
        let line = self
            .prompt(&format!("{side} photo file (blank to cancel): "))
            .await?;
        let path = match line.as_deref().map(str::trim) {
            Some(path) if !path.is_empty() => PathBuf::from(path),
            _ => return Ok(DeviceOutcome::Cancelled),
        };
        let bytes = tokio::fs::read(&path).await.map_err(|e| {
            CaptureError::io("read photo", e).with_path(path.display().to_string())
        })?;
        Ok(DeviceOutcome::Captured(bytes))
    }
}

#[async_trait]
impl<R, W> BarcodeEditor for Console<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn edit(
        &mut self,
        current: Option<&str>,
        rejection: Option<&str>,
    ) -> CaptureResult<DeviceOutcome<String>> {
        if let Some(reason) = rejection {
            self.say(reason).await?;
        }
        let prompt = match current {
            Some(value) => format!("barcode [{value}] ({CANCEL_COMMAND} to cancel): "),
            None => format!("barcode ({CANCEL_COMMAND} to cancel): "),
        };
        Ok(match self.prompt(&prompt).await? {
            Some(line) if line.trim() != CANCEL_COMMAND => DeviceOutcome::Captured(line),
            _ => DeviceOutcome::Cancelled,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn console(input: &'static str) -> Console<&'static [u8], Vec<u8>> {
        Console::new(input.as_bytes(), Vec::new())
    }

    #[tokio::test]
    async fn test_scanner_trims_and_cancels_on_blank() {
        let mut dev = console("  4006381333931 \n\n");
        assert_eq!(
            dev.scan().await.unwrap(),
            DeviceOutcome::Captured("4006381333931".to_string())
        );
        assert!(dev.scan().await.unwrap().is_cancelled());
        // end of input
        assert!(dev.scan().await.unwrap().is_cancelled());
    }

    #[tokio::test]
    async fn test_editor_shows_rejection_and_keeps_blank_entries() {
        let mut dev = console("   \n:cancel\n");
        assert_eq!(
            dev.edit(Some("123"), None).await.unwrap(),
            DeviceOutcome::Captured("   ".to_string())
        );
        assert!(
            dev.edit(None, Some("Barcode cannot be empty"))
                .await
                .unwrap()
                .is_cancelled()
        );
        let written = String::from_utf8(dev.into_writer()).unwrap();
        assert!(written.contains("barcode [123]"));
        assert!(written.contains("Barcode cannot be empty\n"));
    }

    #[tokio::test]
    async fn test_camera_reads_photo_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("front.jpg");
        std::fs::write(&path, b"jpeg-bytes").unwrap();

        let input: &'static str = Box::leak(format!("{}\n\n", path.display()).into_boxed_str());
        let mut dev = console(input);
        assert_eq!(
            dev.take_photo(ImageSide::Front).await.unwrap(),
            DeviceOutcome::Captured(b"jpeg-bytes".to_vec())
        );
        assert!(dev.take_photo(ImageSide::Back).await.unwrap().is_cancelled());
    }

    #[tokio::test]
    async fn test_camera_missing_file_is_io_error() {
        let mut dev = console("/definitely/not/here.jpg\n");
        let err = dev.take_photo(ImageSide::Back).await.unwrap_err();
        assert_eq!(err.category(), "io");
    }
}
