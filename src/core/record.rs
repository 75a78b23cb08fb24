//! Capture records: one barcode plus a front and a back photo per physical product.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CaptureError;
use crate::processing::EncodedImage;

/// Which side of the product a photo shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageSide {
    Front,
    Back,
}

impl fmt::Display for ImageSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageSide::Front => write!(f, "front"),
            ImageSide::Back => write!(f, "back"),
        }
    }
}

impl FromStr for ImageSide {
    type Err = CaptureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "front" | "f" => Ok(ImageSide::Front),
            "back" | "b" => Ok(ImageSide::Back),
            other => Err(CaptureError::validation(
                "side",
                "must be 'front' or 'back'",
                other,
            )),
        }
    }
}

/// The unit of data collected per product instance.
///
/// `barcode` holds only what the operator scanned or typed. A synthetic identifier
/// substituted at submission time is never written back here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRecord {
    pub barcode: Option<String>,
    pub front_image: Option<EncodedImage>,
    pub back_image: Option<EncodedImage>,
}

impl CaptureRecord {
    pub fn blank() -> Self {
        Self::default()
    }

    /// True when nothing has been captured for this record.
    pub fn is_blank(&self) -> bool {
        self.operator_barcode().is_none() && self.front_image.is_none() && self.back_image.is_none()
    }

    /// The operator-supplied barcode, if it is non-empty after trimming.
    pub fn operator_barcode(&self) -> Option<&str> {
        self.barcode
            .as_deref()
            .filter(|code| !code.trim().is_empty())
    }

    pub fn image(&self, side: ImageSide) -> Option<&EncodedImage> {
        match side {
            ImageSide::Front => self.front_image.as_ref(),
            ImageSide::Back => self.back_image.as_ref(),
        }
    }

    /// Apply a single field mutation.
    pub fn apply(&mut self, field: RecordField) {
        match field {
            RecordField::Barcode(code) => self.barcode = Some(code),
            RecordField::Image(ImageSide::Front, image) => self.front_image = Some(image),
            RecordField::Image(ImageSide::Back, image) => self.back_image = Some(image),
        }
    }
}

/// A mutation of one record field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordField {
    Barcode(String),
    Image(ImageSide, EncodedImage),
}

impl RecordField {
    /// Field name used in errors and logs.
    pub fn name(&self) -> &'static str {
        match self {
            RecordField::Barcode(_) => "barcode",
            RecordField::Image(ImageSide::Front, _) => "front_image",
            RecordField::Image(ImageSide::Back, _) => "back_image",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_record() {
        let record = CaptureRecord::blank();
        assert!(record.is_blank());
        assert_eq!(record.operator_barcode(), None);
    }

    #[test]
    fn test_whitespace_barcode_counts_as_missing() {
        let record = CaptureRecord {
            barcode: Some("   ".into()),
            ..CaptureRecord::default()
        };
        assert!(record.is_blank());
        assert_eq!(record.operator_barcode(), None);
    }

    #[test]
    fn test_apply_fields() {
        let mut record = CaptureRecord::blank();
        let image = EncodedImage::from_bytes(b"jpeg", 100, 80, 10);
        record.apply(RecordField::Image(ImageSide::Back, image.clone()));
        record.apply(RecordField::Barcode("4006381333931".into()));

        assert_eq!(record.image(ImageSide::Back), Some(&image));
        assert_eq!(record.image(ImageSide::Front), None);
        assert_eq!(record.operator_barcode(), Some("4006381333931"));
        assert!(!record.is_blank());
    }

    #[test]
    fn test_side_parsing() {
        assert_eq!("Front".parse::<ImageSide>().unwrap(), ImageSide::Front);
        assert_eq!("b".parse::<ImageSide>().unwrap(), ImageSide::Back);
        assert!("top".parse::<ImageSide>().is_err());
    }
}
