//! Field requirement catalog.
//!
//! A static table mapping each recognized document type to the fields that
//! must be present for the capture to be usable, plus fields that are
//! informative but optional. Pure data consulted by the validator; lookup is
//! total — unrecognized types resolve to an empty required set, so a capture
//! can never be marked "missing fields" for a type the catalog has no
//! opinion on.

use crate::ocr::{DocType, FieldKey};

/// Requirement row for one document type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequirementEntry {
    pub required: &'static [FieldKey],
    pub optional: &'static [FieldKey],
}

use FieldKey::*;

/// Identity fields every front capture must carry.
const OLD_FRONT_REQUIRED: &[FieldKey] = &[Id, Name, Dob, Home, Address];
/// Modern fronts additionally print sex, nationality and expiry.
const MODERN_FRONT_REQUIRED: &[FieldKey] = &[Id, Name, Dob, Sex, Nationality, Home, Address, Doe];
const MODERN_BACK_REQUIRED: &[FieldKey] = &[Features, IssueDate];
const OLD_BACK_REQUIRED: &[FieldKey] = &[Features, IssueDate, IssueLoc, Ethnicity, Religion];

const OLD_FRONT_OPTIONAL: &[FieldKey] = &[Doe];
const MODERN_BACK_OPTIONAL: &[FieldKey] = &[];
const NONE: &[FieldKey] = &[];

/// Look up the requirement entry for a document type.
///
/// Total function: every `DocType` has a row, `Unrecognized` has an empty one.
pub fn lookup(doc_type: DocType) -> RequirementEntry {
    match doc_type {
        DocType::OldFront => RequirementEntry {
            required: OLD_FRONT_REQUIRED,
            optional: OLD_FRONT_OPTIONAL,
        },
        DocType::NewFront | DocType::ChipFront => RequirementEntry {
            required: MODERN_FRONT_REQUIRED,
            optional: NONE,
        },
        DocType::NewBack | DocType::ChipBack => RequirementEntry {
            required: MODERN_BACK_REQUIRED,
            optional: MODERN_BACK_OPTIONAL,
        },
        DocType::OldBack => RequirementEntry {
            required: OLD_BACK_REQUIRED,
            optional: NONE,
        },
        DocType::Unrecognized => RequirementEntry {
            required: NONE,
            optional: NONE,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_TYPES: &[DocType] = &[
        DocType::OldFront,
        DocType::OldBack,
        DocType::NewFront,
        DocType::NewBack,
        DocType::ChipFront,
        DocType::ChipBack,
        DocType::Unrecognized,
    ];

    #[test]
    fn test_lookup_is_total() {
        for &dt in ALL_TYPES {
            let _ = lookup(dt);
        }
    }

    #[test]
    fn test_modern_front_requires_full_identity_set() {
        let entry = lookup(DocType::NewFront);
        for key in [Id, Name, Dob, Sex, Nationality, Home, Address, Doe] {
            assert!(entry.required.contains(&key), "missing {:?}", key);
        }
        assert_eq!(lookup(DocType::ChipFront), entry);
    }

    #[test]
    fn test_old_front_does_not_require_modern_fields() {
        let entry = lookup(DocType::OldFront);
        assert!(!entry.required.contains(&Sex));
        assert!(!entry.required.contains(&Nationality));
        assert!(!entry.required.contains(&Doe));
        assert!(entry.optional.contains(&Doe));
    }

    #[test]
    fn test_old_back_requires_issuer_fields() {
        let entry = lookup(DocType::OldBack);
        for key in [Features, IssueDate, IssueLoc, Ethnicity, Religion] {
            assert!(entry.required.contains(&key), "missing {:?}", key);
        }
        let modern = lookup(DocType::ChipBack);
        assert!(!modern.required.contains(&IssueLoc));
    }

    #[test]
    fn test_unrecognized_has_no_requirements() {
        let entry = lookup(DocType::Unrecognized);
        assert!(entry.required.is_empty());
        assert!(entry.optional.is_empty());
    }
}
