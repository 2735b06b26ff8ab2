//! Intake pipeline: per-slot capture state, cross-document reconciliation and
//! rollback.
//!
//! The pipeline owns the two capture slots (front, back), the host-form write
//! capability and the notification sink. It is driven by explicit events —
//! submission start, submission settlement, image removal — rather than by a
//! reactive framework: every settlement runs the reconcile step, which either
//! does nothing (a slot is still unsettled), propagates the accepted fields
//! into the host form, or rolls everything back on a front/back identifier
//! mismatch.
//!
//! Stale-response protection: each slot carries a monotonically increasing
//! submission sequence. A settlement whose ticket does not carry the slot's
//! current sequence is discarded, so a slow response can never clobber a
//! newer selection and removal during an in-flight call is always safe.

use tracing::{debug, info, warn};

use crate::form::{DerivedFields, HostForm, ImageSource};
use crate::notify::{Notifier, Severity};
use crate::ocr::{OcrError, OcrRecord, Side};
use crate::validator::{validate, Verdict};

/// State of one capture slot.
#[derive(Debug, Default)]
pub struct SlotState {
    source: Option<ImageSource>,
    result: Option<OcrRecord>,
    is_loading: bool,
    seq: u64,
}

impl SlotState {
    pub fn source(&self) -> Option<&ImageSource> {
        self.source.as_ref()
    }

    pub fn result(&self) -> Option<&OcrRecord> {
        self.result.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    fn clear(&mut self) {
        self.source = None;
        self.result = None;
        self.is_loading = false;
        // Invalidates any settlement still in flight for this slot.
        self.seq += 1;
    }
}

/// Proof that a submission was started; settlement requires it back.
///
/// Carries the slot sequence issued at submission start so late settlements
/// can be recognized and discarded.
#[derive(Debug, Clone, Copy)]
pub struct SubmissionTicket {
    side: Side,
    seq: u64,
}

impl SubmissionTicket {
    pub fn side(&self) -> Side {
        self.side
    }
}

/// Observable pipeline phase, derived from slot state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No capture selected on either side.
    Empty,
    /// At least one side captured, but the pair has not fully settled.
    PartiallyCaptured,
    /// Both sides captured and submitted; waiting for settlements.
    BothResolving,
    /// Identifiers matched and fields were propagated to the host form.
    Consistent,
}

/// The front/back intake pipeline.
///
/// `F` is the host form's write capability; handing it to the pipeline (and
/// nowhere else) is what keeps derived fields single-writer.
pub struct IntakePipeline<F: HostForm, N: Notifier> {
    front: SlotState,
    back: SlotState,
    form: F,
    notifier: N,
    /// True while the current pair of results has been propagated.
    propagated: bool,
}

impl<F: HostForm, N: Notifier> IntakePipeline<F, N> {
    pub fn new(form: F, notifier: N) -> Self {
        Self {
            front: SlotState::default(),
            back: SlotState::default(),
            form,
            notifier,
            propagated: false,
        }
    }

    pub fn slot(&self, side: Side) -> &SlotState {
        match side {
            Side::Front => &self.front,
            Side::Back => &self.back,
        }
    }

    fn slot_mut(&mut self, side: Side) -> &mut SlotState {
        match side {
            Side::Front => &mut self.front,
            Side::Back => &mut self.back,
        }
    }

    /// Record a new selection for `side` and open a submission.
    ///
    /// Any stale result for the slot is cleared immediately; the returned
    /// ticket must be passed back to [`complete_submission`] once the
    /// provider call settles.
    ///
    /// [`complete_submission`]: IntakePipeline::complete_submission
    pub fn begin_submission(&mut self, side: Side, source: ImageSource) -> SubmissionTicket {
        let slot = self.slot_mut(side);
        slot.source = Some(source);
        slot.result = None;
        slot.is_loading = true;
        slot.seq += 1;
        let ticket = SubmissionTicket {
            side,
            seq: slot.seq,
        };
        self.propagated = false;
        debug!("pipeline: submission {} opened for {} slot", ticket.seq, side);
        ticket
    }

    /// Settle a submission with the provider's outcome.
    ///
    /// Settlements for superseded submissions (the slot moved on: new file,
    /// removal, rollback) are discarded silently — routine, not an error.
    pub fn complete_submission(
        &mut self,
        ticket: SubmissionTicket,
        outcome: Result<OcrRecord, OcrError>,
    ) {
        let slot = self.slot_mut(ticket.side);
        if ticket.seq != slot.seq {
            debug!(
                "pipeline: discarding stale settlement {} for {} slot (current {})",
                ticket.seq, ticket.side, slot.seq
            );
            return;
        }
        slot.is_loading = false;
        match outcome {
            Ok(record) => {
                info!(
                    "pipeline: {} slot recognized as {:?} (score {:.1})",
                    ticket.side, record.doc_type, record.overall_score
                );
                slot.result = Some(record);
                self.reconcile();
            }
            Err(err) => {
                warn!("pipeline: {} slot recognition failed: {}", ticket.side, err);
                self.notifier.notify(Severity::Error, &err.user_message());
            }
        }
    }

    /// Attach a previously-persisted image to `side` without a provider call.
    pub fn init_from_saved(&mut self, side: Side, url: String) {
        let slot = self.slot_mut(side);
        slot.clear();
        slot.source = Some(ImageSource::Url(url));
        self.propagated = false;
    }

    /// User removed the image for `side`. Safe in every phase; an in-flight
    /// settlement for the slot becomes stale and is discarded on arrival.
    pub fn remove_image(&mut self, side: Side) {
        info!("pipeline: {} slot removed by user", side);
        self.slot_mut(side).clear();
        self.propagated = false;
        self.reconcile();
    }

    /// Per-slot display verdict; `None` while the slot has no result.
    pub fn verdict(&self, side: Side) -> Option<Verdict> {
        self.slot(side).result.as_ref().map(|r| validate(r, side))
    }

    pub fn phase(&self) -> Phase {
        if self.propagated {
            return Phase::Consistent;
        }
        match (&self.front.source, &self.back.source) {
            (None, None) => Phase::Empty,
            (Some(_), Some(_)) => {
                let settled_or_pending = |s: &SlotState| s.is_loading || s.result.is_some();
                if settled_or_pending(&self.front) && settled_or_pending(&self.back) {
                    Phase::BothResolving
                } else {
                    Phase::PartiallyCaptured
                }
            }
            _ => Phase::PartiallyCaptured,
        }
    }

    /// Cross-document reconcile step.
    ///
    /// Runs after every settlement or removal. No-op unless both slots hold a
    /// result carrying a non-empty identifier; then either rolls back on
    /// mismatch or propagates the front record's fields into the host form.
    /// Idempotent for an unchanged pair.
    fn reconcile(&mut self) {
        let (front_rec, back_rec) = match (&self.front.result, &self.back.result) {
            (Some(f), Some(b)) => (f, b),
            _ => return,
        };
        let front_id = front_rec.extracted_id.as_deref().filter(|s| !s.is_empty());
        let back_id = back_rec.mrz_id.as_deref().filter(|s| !s.is_empty());
        let (front_id, back_id) = match (front_id, back_id) {
            (Some(f), Some(b)) => (f, b),
            _ => return,
        };

        if front_id != back_id {
            warn!(
                "pipeline: identifier mismatch (front {} vs mrz {}), rolling back",
                front_id, back_id
            );
            self.rollback();
            return;
        }

        if self.propagated {
            return;
        }

        let payload = DerivedFields::from_front_record(
            front_rec,
            self.front.source.clone(),
            self.back.source.clone(),
        );
        info!("pipeline: front/back identifiers match, propagating fields");
        self.form.set_derived_fields(payload);
        self.propagated = true;
    }

    /// Atomic rollback: both slots and every derived form field are cleared
    /// in one step, followed by a single error notification.
    fn rollback(&mut self) {
        self.front.clear();
        self.back.clear();
        self.propagated = false;
        self.form.set_derived_fields(DerivedFields::cleared());
        self.notifier.notify(
            Severity::Error,
            "The front and back images do not belong to the same ID card. Both images were removed, please upload them again.",
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::{DocType, FieldKey, FieldValue};
    use chrono::NaiveDate;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct SharedForm {
        writes: Arc<Mutex<Vec<DerivedFields>>>,
    }

    impl HostForm for SharedForm {
        fn set_derived_fields(&mut self, fields: DerivedFields) {
            self.writes.lock().unwrap().push(fields);
        }
    }

    #[derive(Clone, Default)]
    struct SharedNotifier {
        events: Arc<Mutex<Vec<(Severity, String)>>>,
    }

    impl Notifier for SharedNotifier {
        fn notify(&mut self, severity: Severity, message: &str) {
            self.events
                .lock()
                .unwrap()
                .push((severity, message.to_string()));
        }
    }

    fn pipeline() -> (
        IntakePipeline<SharedForm, SharedNotifier>,
        Arc<Mutex<Vec<DerivedFields>>>,
        Arc<Mutex<Vec<(Severity, String)>>>,
    ) {
        let form = SharedForm::default();
        let notifier = SharedNotifier::default();
        let writes = form.writes.clone();
        let events = notifier.events.clone();
        (IntakePipeline::new(form, notifier), writes, events)
    }

    fn front_record(id: &str) -> OcrRecord {
        let mut fields = HashMap::new();
        fields.insert(FieldKey::Id, FieldValue::Present(id.to_string()));
        fields.insert(
            FieldKey::Name,
            FieldValue::Present("Nguyen Van A".to_string()),
        );
        fields.insert(FieldKey::Dob, FieldValue::Present("01/01/1990".to_string()));
        fields.insert(FieldKey::Sex, FieldValue::Present("NAM".to_string()));
        fields.insert(FieldKey::Address, FieldValue::Present("Hanoi".to_string()));
        OcrRecord {
            doc_type: DocType::NewFront,
            fields,
            overall_score: 97.0,
            extracted_id: Some(id.to_string()),
            mrz_id: None,
        }
    }

    fn back_record(mrz_id: &str) -> OcrRecord {
        let mut fields = HashMap::new();
        fields.insert(
            FieldKey::Features,
            FieldValue::Present("scar above left eyebrow".to_string()),
        );
        fields.insert(
            FieldKey::IssueDate,
            FieldValue::Present("01/01/2021".to_string()),
        );
        OcrRecord {
            doc_type: DocType::NewBack,
            fields,
            overall_score: 96.0,
            extracted_id: None,
            mrz_id: Some(mrz_id.to_string()),
        }
    }

    fn file(name: &str) -> ImageSource {
        ImageSource::File {
            filename: name.to_string(),
            data: vec![0u8; 4],
        }
    }

    #[test]
    fn test_matching_pair_propagates_fields() {
        let (mut p, writes, events) = pipeline();
        let t1 = p.begin_submission(Side::Front, file("front.jpg"));
        p.complete_submission(t1, Ok(front_record("001234567890")));
        let t2 = p.begin_submission(Side::Back, file("back.jpg"));
        p.complete_submission(t2, Ok(back_record("001234567890")));

        let writes = writes.lock().unwrap();
        assert_eq!(writes.len(), 1);
        let w = &writes[0];
        assert_eq!(w.full_name, "Nguyen Van A");
        assert_eq!(w.gender, Some(crate::form::Gender::Male));
        assert_eq!(w.dob, NaiveDate::from_ymd_opt(1990, 1, 1));
        assert_eq!(w.identity_card_number, "001234567890");
        assert_eq!(w.address, "Hanoi");
        assert!(w.front_file.is_some());
        assert!(w.back_file.is_some());
        assert_eq!(p.phase(), Phase::Consistent);
        assert!(events.lock().unwrap().is_empty());
    }

    #[test]
    fn test_mismatch_rolls_back_completely() {
        let (mut p, writes, events) = pipeline();
        let t1 = p.begin_submission(Side::Front, file("front.jpg"));
        p.complete_submission(t1, Ok(front_record("001234567890")));
        let t2 = p.begin_submission(Side::Back, file("back.jpg"));
        p.complete_submission(t2, Ok(back_record("009999999999")));

        // Both slots emptied, one cleared write, one error notification.
        assert!(p.slot(Side::Front).source().is_none());
        assert!(p.slot(Side::Front).result().is_none());
        assert!(p.slot(Side::Back).source().is_none());
        assert!(p.slot(Side::Back).result().is_none());
        assert_eq!(p.phase(), Phase::Empty);

        let writes = writes.lock().unwrap();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0], DerivedFields::cleared());

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, Severity::Error);
    }

    #[test]
    fn test_rollback_independent_of_settlement_order() {
        let (mut p, writes, events) = pipeline();
        // Back settles first this time.
        let t2 = p.begin_submission(Side::Back, file("back.jpg"));
        let t1 = p.begin_submission(Side::Front, file("front.jpg"));
        p.complete_submission(t2, Ok(back_record("009999999999")));
        p.complete_submission(t1, Ok(front_record("001234567890")));

        assert_eq!(p.phase(), Phase::Empty);
        assert_eq!(writes.lock().unwrap().len(), 1);
        assert_eq!(events.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_no_propagation_while_one_slot_unsettled() {
        let (mut p, writes, _) = pipeline();
        let t1 = p.begin_submission(Side::Front, file("front.jpg"));
        p.complete_submission(t1, Ok(front_record("001234567890")));
        let _t2 = p.begin_submission(Side::Back, file("back.jpg"));

        assert!(writes.lock().unwrap().is_empty());
        assert_eq!(p.phase(), Phase::BothResolving);
    }

    #[test]
    fn test_stale_settlement_is_discarded() {
        let (mut p, _, _) = pipeline();
        let t1 = p.begin_submission(Side::Front, file("first.jpg"));
        let t2 = p.begin_submission(Side::Front, file("second.jpg"));
        // First submission resolves late.
        p.complete_submission(t1, Ok(front_record("111111111111")));
        assert!(p.slot(Side::Front).result().is_none());
        assert!(p.slot(Side::Front).is_loading());
        // The live submission still settles normally.
        p.complete_submission(t2, Ok(front_record("001234567890")));
        assert_eq!(
            p.slot(Side::Front).result().unwrap().extracted_id.as_deref(),
            Some("001234567890")
        );
    }

    #[test]
    fn test_removal_during_flight_discards_settlement() {
        let (mut p, _, _) = pipeline();
        let _t_back = p.begin_submission(Side::Back, file("back.jpg"));
        let t1 = p.begin_submission(Side::Front, file("front.jpg"));
        p.remove_image(Side::Front);
        p.complete_submission(t1, Ok(front_record("001234567890")));

        assert!(p.slot(Side::Front).source().is_none());
        assert!(p.slot(Side::Front).result().is_none());
        assert_eq!(p.phase(), Phase::PartiallyCaptured);
    }

    #[test]
    fn test_provider_error_notifies_and_leaves_result_unset() {
        let (mut p, writes, events) = pipeline();
        let t1 = p.begin_submission(Side::Front, file("front.jpg"));
        p.complete_submission(
            t1,
            Err(OcrError::Provider {
                code: 3,
                message: "no card".to_string(),
            }),
        );

        assert!(p.slot(Side::Front).result().is_none());
        assert!(!p.slot(Side::Front).is_loading());
        // Source stays so the user can see what they selected and retry.
        assert!(p.slot(Side::Front).source().is_some());
        assert!(writes.lock().unwrap().is_empty());
        let events = events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, Severity::Error);
    }

    #[test]
    fn test_reconcile_idempotent_for_unchanged_pair() {
        let (mut p, writes, events) = pipeline();
        let t1 = p.begin_submission(Side::Front, file("front.jpg"));
        p.complete_submission(t1, Ok(front_record("001234567890")));
        let t2 = p.begin_submission(Side::Back, file("back.jpg"));
        p.complete_submission(t2, Ok(back_record("001234567890")));

        // Replace the back with an identical capture; the pair re-propagates
        // but never rolls back.
        let t3 = p.begin_submission(Side::Back, file("back2.jpg"));
        p.complete_submission(t3, Ok(back_record("001234567890")));

        let writes = writes.lock().unwrap();
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[0].identity_card_number, writes[1].identity_card_number);
        assert!(events.lock().unwrap().is_empty());
        assert_eq!(p.phase(), Phase::Consistent);
    }

    #[test]
    fn test_saved_url_does_not_submit() {
        let (mut p, writes, _) = pipeline();
        p.init_from_saved(Side::Front, "https://cdn.example/front.jpg".to_string());
        assert!(!p.slot(Side::Front).is_loading());
        assert!(p.slot(Side::Front).result().is_none());
        assert!(writes.lock().unwrap().is_empty());
        assert_eq!(p.phase(), Phase::PartiallyCaptured);
    }

    #[test]
    fn test_phase_progression() {
        let (mut p, _, _) = pipeline();
        assert_eq!(p.phase(), Phase::Empty);
        let t1 = p.begin_submission(Side::Front, file("front.jpg"));
        assert_eq!(p.phase(), Phase::PartiallyCaptured);
        let t2 = p.begin_submission(Side::Back, file("back.jpg"));
        assert_eq!(p.phase(), Phase::BothResolving);
        p.complete_submission(t1, Ok(front_record("001234567890")));
        assert_eq!(p.phase(), Phase::BothResolving);
        p.complete_submission(t2, Ok(back_record("001234567890")));
        assert_eq!(p.phase(), Phase::Consistent);
    }

    #[test]
    fn test_verdict_reflects_slot_result() {
        let (mut p, _, _) = pipeline();
        assert!(p.verdict(Side::Front).is_none());
        let t1 = p.begin_submission(Side::Front, file("front.jpg"));
        p.complete_submission(t1, Ok(back_record("001234567890")));
        let verdict = p.verdict(Side::Front).unwrap();
        assert!(!verdict.is_valid);
    }
}
