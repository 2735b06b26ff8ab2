//! Host-form boundary.
//!
//! The pipeline populates a form owned by the surrounding application. That
//! form grants write access through the [`HostForm`] trait; the pipeline is
//! the only holder of the capability, so derived fields have a single writer.

use chrono::NaiveDate;

use crate::ocr::{FieldKey, OcrRecord};

/// Domain sex value mapped from the card's raw token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    /// Cards print "NAM" for male; any other present token is read as female.
    pub fn from_raw(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("NAM") {
            Gender::Male
        } else {
            Gender::Female
        }
    }
}

/// An image attached to the form, either freshly selected or previously saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    File { filename: String, data: Vec<u8> },
    Url(String),
}

/// The partial record the pipeline writes into the host form.
///
/// String fields default to empty when the OCR value was unavailable;
/// `DerivedFields::cleared()` is the rollback payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DerivedFields {
    pub full_name: String,
    pub gender: Option<Gender>,
    pub dob: Option<NaiveDate>,
    pub identity_card_number: String,
    pub address: String,
    pub front_file: Option<ImageSource>,
    pub back_file: Option<ImageSource>,
}

impl DerivedFields {
    /// The all-empty payload written on rollback.
    pub fn cleared() -> Self {
        Self::default()
    }

    /// Build the propagation payload from an accepted front-side record.
    pub fn from_front_record(
        front: &OcrRecord,
        front_file: Option<ImageSource>,
        back_file: Option<ImageSource>,
    ) -> Self {
        Self {
            full_name: front.field(FieldKey::Name).text_or_empty(),
            gender: front
                .field(FieldKey::Sex)
                .as_present()
                .map(Gender::from_raw),
            dob: front.field(FieldKey::Dob).as_present().and_then(parse_dob),
            identity_card_number: front.field(FieldKey::Id).text_or_empty(),
            address: front.field(FieldKey::Address).text_or_empty(),
            front_file,
            back_file,
        }
    }
}

/// Parse the card's `dd/mm/yyyy` date format. Unparseable dates are dropped
/// rather than failing the propagation.
pub fn parse_dob(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%d/%m/%Y").ok()
}

/// Write capability over the host form's derived fields.
///
/// The host clears a field when the corresponding payload value is
/// empty/`None`; passing `DerivedFields::cleared()` resets everything.
pub trait HostForm {
    fn set_derived_fields(&mut self, fields: DerivedFields);
}
