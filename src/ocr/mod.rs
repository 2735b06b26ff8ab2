//! Modular OCR provider abstraction for identity-document recognition.
//!
//! Defines the [`OcrProvider`] trait and the unified record types so different
//! recognition backends (FPT.AI Vision, a scripted test double, etc.) can be
//! swapped without touching the pipeline.

pub mod fpt;

use std::collections::HashMap;
use std::fmt;

/// Which physical side of the card a capture is claimed (or detected) to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Front,
    Back,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Front => write!(f, "front"),
            Side::Back => write!(f, "back"),
        }
    }
}

/// Document-type classification assigned by the recognition provider.
///
/// Covers the three card generations (9-digit CMND, 12-digit CCCD, chip card)
/// on both sides. Tags the provider may emit that we have no opinion on fall
/// into [`DocType::Unrecognized`] so parsing stays total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocType {
    OldFront,
    OldBack,
    NewFront,
    NewBack,
    ChipFront,
    ChipBack,
    Unrecognized,
}

impl DocType {
    /// Parse a provider tag string. Unknown tags map to `Unrecognized`.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "old" | "cmnd_09_front" => Self::OldFront,
            "old_back" | "cmnd_09_back" => Self::OldBack,
            "new" | "cccd_12_front" => Self::NewFront,
            "new_back" | "cccd_12_back" => Self::NewBack,
            "chip_front" | "cccd_chip_front" => Self::ChipFront,
            "chip_back" | "cccd_chip_back" => Self::ChipBack,
            _ => Self::Unrecognized,
        }
    }

    /// The side this tag denotes, if the tag was recognized at all.
    pub fn detected_side(self) -> Option<Side> {
        match self {
            Self::OldFront | Self::NewFront | Self::ChipFront => Some(Side::Front),
            Self::OldBack | Self::NewBack | Self::ChipBack => Some(Side::Back),
            Self::Unrecognized => None,
        }
    }
}

/// A field the provider may extract from a capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKey {
    /// Identity card number printed on the face.
    Id,
    /// Full name.
    Name,
    /// Date of birth.
    Dob,
    /// Sex.
    Sex,
    /// Nationality.
    Nationality,
    /// Place of origin ("quê quán").
    Home,
    /// Place of residence.
    Address,
    /// Date of expiry.
    Doe,
    /// Personal identification / anti-forgery features.
    Features,
    /// Date of issue.
    IssueDate,
    /// Issuing authority location (old-format back only).
    IssueLoc,
    /// Ethnicity (old-format back only).
    Ethnicity,
    /// Religion (old-format back only).
    Religion,
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FieldKey::Id => "id number",
            FieldKey::Name => "full name",
            FieldKey::Dob => "date of birth",
            FieldKey::Sex => "sex",
            FieldKey::Nationality => "nationality",
            FieldKey::Home => "place of origin",
            FieldKey::Address => "place of residence",
            FieldKey::Doe => "date of expiry",
            FieldKey::Features => "identification features",
            FieldKey::IssueDate => "date of issue",
            FieldKey::IssueLoc => "issuing authority",
            FieldKey::Ethnicity => "ethnicity",
            FieldKey::Religion => "religion",
        };
        write!(f, "{}", s)
    }
}

/// An extracted field value.
///
/// The wire format uses the literal `"N/A"` for fields the provider could not
/// read; that sentinel is converted to `NotAvailable` at the provider boundary
/// so the rest of the pipeline never string-compares against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Present(String),
    NotAvailable,
}

impl FieldValue {
    /// The extracted text, or `None` for `NotAvailable`.
    pub fn as_present(&self) -> Option<&str> {
        match self {
            FieldValue::Present(s) => Some(s),
            FieldValue::NotAvailable => None,
        }
    }

    /// The extracted text, defaulting to empty for `NotAvailable`.
    pub fn text_or_empty(&self) -> String {
        self.as_present().unwrap_or_default().to_string()
    }

    /// True when the field carries no usable text: `NotAvailable`, or a
    /// present value that is empty/whitespace.
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::NotAvailable => true,
            FieldValue::Present(s) => s.trim().is_empty(),
        }
    }
}

/// Unified recognition result returned by every provider.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrRecord {
    pub doc_type: DocType,
    pub fields: HashMap<FieldKey, FieldValue>,
    /// Overall provider confidence, 0–100.
    pub overall_score: f64,
    /// Card number as read from the visible face (front captures).
    pub extracted_id: Option<String>,
    /// Card number decoded from the machine-readable zone (back captures).
    pub mrz_id: Option<String>,
}

impl OcrRecord {
    /// Look up a field, treating an absent key like `NotAvailable`.
    pub fn field(&self, key: FieldKey) -> &FieldValue {
        self.fields.get(&key).unwrap_or(&FieldValue::NotAvailable)
    }
}

/// Input to an OCR provider — either raw bytes or a remote URL.
pub enum OcrInput {
    Bytes { filename: String, data: Vec<u8> },
    Url { url: String },
}

/// Errors crossing the provider boundary.
///
/// Provider-assigned codes are carried verbatim; [`OcrError::user_message`]
/// maps them to notification text without otherwise interpreting them.
#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error("recognition provider error {code}: {message}")]
    Provider { code: u32, message: String },

    #[error("recognition request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unparseable provider response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("provider returned no document data")]
    EmptyResponse,
}

impl OcrError {
    /// Human-readable text for a user-facing notification.
    pub fn user_message(&self) -> String {
        match self {
            OcrError::Provider { code, .. } => match code {
                1 => "The recognition request was malformed. Please try again.".to_string(),
                2 => "The ID card is cropped or has missing corners. Please retake the photo."
                    .to_string(),
                3 => "No ID card could be detected in the image.".to_string(),
                5 => "The uploaded image could not be read.".to_string(),
                7 => "Unsupported image file type.".to_string(),
                8 => "The image file is too large.".to_string(),
                other => format!("ID recognition failed (code {}).", other),
            },
            OcrError::Transport(_) => {
                "Could not reach the ID recognition service. Check your connection and try again."
                    .to_string()
            }
            OcrError::Decode(_) | OcrError::EmptyResponse => {
                "The ID recognition service returned an unexpected response.".to_string()
            }
        }
    }
}

/// Async trait implemented by each recognition backend.
#[async_trait::async_trait]
pub trait OcrProvider: Send + Sync {
    fn name(&self) -> &str;
    async fn recognize(&self, input: &OcrInput) -> Result<OcrRecord, OcrError>;
}
