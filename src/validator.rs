//! Per-image validator.
//!
//! Pure verdict computation over one OCR record: checks the catalog's
//! required fields and whether the detected side matches the side the user
//! claimed to upload. No side effects, callable repeatedly.

use std::fmt;

use crate::catalog;
use crate::ocr::{FieldKey, OcrRecord, Side};

/// Why a capture was judged invalid (or `Ok` if it was not).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerdictReason {
    Ok,
    MissingRequiredFields(Vec<FieldKey>),
    SideMismatch {
        claimed: Side,
        detected: Option<Side>,
    },
}

/// Valid/invalid judgement for a single capture, for inline display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub is_valid: bool,
    pub reason: VerdictReason,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            VerdictReason::Ok => write!(f, "valid capture"),
            VerdictReason::MissingRequiredFields(missing) => {
                let names: Vec<String> = missing.iter().map(|k| k.to_string()).collect();
                write!(
                    f,
                    "{} required field(s) unreadable: {}",
                    missing.len(),
                    names.join(", ")
                )
            }
            VerdictReason::SideMismatch { claimed, detected } => match detected {
                Some(side) => write!(
                    f,
                    "this looks like the {} of the card, not the {}",
                    side, claimed
                ),
                None => write!(f, "this does not look like the {} of an ID card", claimed),
            },
        }
    }
}

/// Validate one OCR record against the side the user claimed to upload.
///
/// A side mismatch takes precedence over missing fields in the reported
/// reason — it is the more actionable signal for the user.
pub fn validate(record: &OcrRecord, claimed: Side) -> Verdict {
    let entry = catalog::lookup(record.doc_type);

    // Absent, sentinel, and empty/whitespace values all count as missing.
    let missing: Vec<FieldKey> = entry
        .required
        .iter()
        .copied()
        .filter(|&key| record.field(key).is_blank())
        .collect();

    let detected = record.doc_type.detected_side();
    let side_mismatch = detected != Some(claimed);

    let reason = if side_mismatch {
        VerdictReason::SideMismatch { claimed, detected }
    } else if !missing.is_empty() {
        VerdictReason::MissingRequiredFields(missing.clone())
    } else {
        VerdictReason::Ok
    };

    Verdict {
        is_valid: missing.is_empty() && !side_mismatch,
        reason,
    }
}
