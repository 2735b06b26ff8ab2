//! OCR submission coordinator.
//!
//! Pairs the intake pipeline with a recognition backend: opens a submission
//! on the pipeline, performs the provider call with the lock released, and
//! settles the pipeline with the outcome. Provider failures are absorbed
//! here — they become notifications inside the pipeline, never panics or
//! propagated errors.
//!
//! Overlapping calls for the same slot are allowed; the pipeline's sequence
//! guard makes the latest selection win regardless of response arrival order.

use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::form::{HostForm, ImageSource};
use crate::notify::Notifier;
use crate::ocr::{OcrInput, OcrProvider, Side};
use crate::pipeline::{IntakePipeline, Phase};
use crate::validator::Verdict;

pub struct OcrCoordinator<F: HostForm, N: Notifier> {
    provider: Arc<dyn OcrProvider>,
    pipeline: Arc<Mutex<IntakePipeline<F, N>>>,
}

impl<F: HostForm, N: Notifier> Clone for OcrCoordinator<F, N> {
    fn clone(&self) -> Self {
        Self {
            provider: self.provider.clone(),
            pipeline: self.pipeline.clone(),
        }
    }
}

impl<F, N> OcrCoordinator<F, N>
where
    F: HostForm + Send + 'static,
    N: Notifier + Send + 'static,
{
    pub fn new(provider: Arc<dyn OcrProvider>, pipeline: IntakePipeline<F, N>) -> Self {
        Self {
            provider,
            pipeline: Arc::new(Mutex::new(pipeline)),
        }
    }

    /// User selected a file for `side`: submit it for recognition and settle
    /// the pipeline with whatever comes back.
    ///
    /// The pipeline lock is never held across the provider call.
    pub async fn select_file(&self, side: Side, filename: String, data: Vec<u8>) {
        let input = OcrInput::Bytes {
            filename: filename.clone(),
            data: data.clone(),
        };
        let source = ImageSource::File { filename, data };

        let ticket = self
            .pipeline
            .lock()
            .unwrap()
            .begin_submission(side, source);
        debug!(
            "coordinator: submitting {} slot to provider '{}'",
            side,
            self.provider.name()
        );

        let outcome = self.provider.recognize(&input).await;

        self.pipeline
            .lock()
            .unwrap()
            .complete_submission(ticket, outcome);
    }

    /// User removed the image for `side`.
    pub fn remove_image(&self, side: Side) {
        self.pipeline.lock().unwrap().remove_image(side);
    }

    /// Attach a previously-saved image URL to `side` (no provider call).
    pub fn init_from_saved(&self, side: Side, url: String) {
        self.pipeline.lock().unwrap().init_from_saved(side, url);
    }

    pub fn verdict(&self, side: Side) -> Option<Verdict> {
        self.pipeline.lock().unwrap().verdict(side)
    }

    pub fn is_loading(&self, side: Side) -> bool {
        self.pipeline.lock().unwrap().slot(side).is_loading()
    }

    pub fn phase(&self) -> Phase {
        self.pipeline.lock().unwrap().phase()
    }
}
