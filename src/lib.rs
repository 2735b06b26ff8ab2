//! CCCD intake-and-verification pipeline.
//!
//! Accepts front/back captures of a Vietnamese national ID card, submits each
//! to an OCR recognition provider, validates every capture against a
//! per-document-type field requirement catalog, cross-checks that the two
//! sides belong to the same physical card, and rolls all derived state back
//! atomically on any cross-document inconsistency.
//!
//! The host application drives the [`coordinator::OcrCoordinator`] from its
//! UI events and receives derived identity fields through the
//! [`form::HostForm`] capability plus user-facing events through
//! [`notify::Notifier`].

pub mod catalog;
pub mod coordinator;
pub mod form;
pub mod notify;
pub mod ocr;
pub mod pipeline;
pub mod validator;

pub use coordinator::OcrCoordinator;
pub use form::{DerivedFields, Gender, HostForm, ImageSource};
pub use notify::{Notifier, Severity, TracingNotifier};
pub use ocr::{DocType, FieldKey, FieldValue, OcrError, OcrProvider, OcrRecord, Side};
pub use pipeline::{IntakePipeline, Phase, SubmissionTicket};
pub use validator::{validate, Verdict, VerdictReason};

/// Install the default env-filtered tracing subscriber.
///
/// For host binaries and demos; embedding applications that already own a
/// subscriber should skip this.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cccd_intake=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
