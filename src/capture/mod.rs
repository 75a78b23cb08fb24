//! # Capture Devices
//!
//! Abstract interfaces for the interactive devices the coordinator drives: a barcode
//! scanner, a camera, and a barcode editor. Each call suspends until the operator
//! produces a value or closes the activity; closing is reported as
//! [`DeviceOutcome::Cancelled`], never as an error.
//!
//! [`console`] provides line-oriented implementations for the `fieldcap run` loop.

use async_trait::async_trait;

use crate::core::record::ImageSide;
use crate::error::CaptureResult;

pub mod console;

pub use console::Console;

/// Result of one device interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceOutcome<T> {
    Captured(T),
    Cancelled,
}

impl<T> DeviceOutcome<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> DeviceOutcome<U> {
        match self {
            DeviceOutcome::Captured(value) => DeviceOutcome::Captured(f(value)),
            DeviceOutcome::Cancelled => DeviceOutcome::Cancelled,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, DeviceOutcome::Cancelled)
    }

    pub fn captured(self) -> Option<T> {
        match self {
            DeviceOutcome::Captured(value) => Some(value),
            DeviceOutcome::Cancelled => None,
        }
    }
}

/// Reads one barcode.
#[async_trait]
pub trait BarcodeScanner: Send {
    async fn scan(&mut self) -> CaptureResult<DeviceOutcome<String>>;
}

/// Takes one raw photo (encoded image bytes as produced by the device).
#[async_trait]
pub trait Camera: Send {
    async fn take_photo(&mut self, side: ImageSide) -> CaptureResult<DeviceOutcome<Vec<u8>>>;
}

/// Lets the operator type a barcode by hand.
#[async_trait]
pub trait BarcodeEditor: Send {
    /// `current` is the value being edited. `rejection` carries the reason the
    /// previous entry was refused, if any.
    async fn edit(
        &mut self,
        current: Option<&str>,
        rejection: Option<&str>,
    ) -> CaptureResult<DeviceOutcome<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_helpers() {
        let captured = DeviceOutcome::Captured(3).map(|n| n * 2);
        assert_eq!(captured, DeviceOutcome::Captured(6));
        assert_eq!(captured.captured(), Some(6));

        let cancelled: DeviceOutcome<u8> = DeviceOutcome::Cancelled;
        assert!(cancelled.is_cancelled());
        assert_eq!(cancelled.captured(), None);
    }
}
