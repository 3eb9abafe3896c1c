use crate::candidate::{CandidateId, DropPayload, ImageCandidate, RawFile};
use crate::error::ClassifyError;

/// Turns picked, dropped and fetched files into [`ImageCandidate`]s.
///
/// Acceptance is unconditional: type and size hints are advisory and the
/// backend is the final arbiter.
#[derive(Debug, Default)]
pub struct AcquisitionController {
    last_id: u64,
    is_drag_over: bool,
    fetch_error: Option<String>,
}

impl AcquisitionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_drag_over(&self) -> bool {
        self.is_drag_over
    }

    /// Message left by the last failed example fetch, if any.
    pub fn fetch_error(&self) -> Option<&str> {
        self.fetch_error.as_deref()
    }

    pub fn clear_fetch_error(&mut self) {
        self.fetch_error = None;
    }

    pub fn accept_file(&mut self, raw: RawFile) -> ImageCandidate {
        self.last_id += 1;
        self.fetch_error = None;
        tracing::debug!(
            "Accepted {} ({}, {} bytes)",
            raw.name,
            raw.mime_type,
            raw.bytes.len()
        );
        ImageCandidate::new(CandidateId(self.last_id), raw)
    }

    /// Only the first dropped file is used. An empty drop is ignored.
    pub fn accept_drop(&mut self, payload: DropPayload) -> Option<ImageCandidate> {
        self.is_drag_over = false;
        let raw = payload.files.into_iter().next()?;
        Some(self.accept_file(raw))
    }

    pub fn drag_entered(&mut self) {
        self.is_drag_over = true;
    }

    pub fn drag_left(&mut self) {
        self.is_drag_over = false;
    }

    /// Completes an example fetch. On failure nothing but the error message
    /// changes.
    pub fn example_fetched(
        &mut self,
        result: Result<RawFile, ClassifyError>,
    ) -> Option<ImageCandidate> {
        match result {
            Ok(raw) => Some(self.accept_file(raw)),
            Err(e) => {
                tracing::warn!("Example image fetch failed: {}", e);
                self.fetch_error = Some(e.to_string());
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(name: &str) -> RawFile {
        RawFile::with_mime_type(name, "image/jpeg", vec![1u8, 2, 3])
    }

    #[test]
    fn test_accept_file_assigns_fresh_ids() {
        let mut controller = AcquisitionController::new();

        let first = controller.accept_file(raw("a.jpg"));
        let second = controller.accept_file(raw("b.jpg"));

        assert_ne!(first.id(), second.id());
        assert_eq!(second.origin_filename(), "b.jpg");
        assert_eq!(second.mime_type(), "image/jpeg");
        assert_eq!(second.displayable_source(), None);
    }

    #[test]
    fn test_accept_file_does_not_filter_types() {
        let mut controller = AcquisitionController::new();
        let candidate = controller.accept_file(RawFile::new("notes.txt", b"hello".to_vec()));
        assert_eq!(candidate.mime_type(), "application/octet-stream");
    }

    #[test]
    fn test_empty_drop_is_ignored() {
        let mut controller = AcquisitionController::new();
        controller.drag_entered();

        assert!(controller.accept_drop(DropPayload::default()).is_none());
        assert!(!controller.is_drag_over());
        assert_eq!(controller.fetch_error(), None);
    }

    #[test]
    fn test_drop_takes_first_file() {
        let mut controller = AcquisitionController::new();
        controller.drag_entered();

        let candidate = controller
            .accept_drop(DropPayload::new(vec![raw("first.jpg"), raw("second.jpg")]))
            .unwrap();

        assert_eq!(candidate.origin_filename(), "first.jpg");
        assert!(!controller.is_drag_over());
    }

    #[test]
    fn test_failed_example_sets_error_until_next_acquisition() {
        let mut controller = AcquisitionController::new();

        let result = controller.example_fetched(Err(ClassifyError::AcquisitionFetch(
            "404".to_string(),
        )));
        assert!(result.is_none());
        assert_eq!(
            controller.fetch_error(),
            Some("Failed to load example image: 404")
        );

        controller.accept_file(raw("c.jpg"));
        assert_eq!(controller.fetch_error(), None);
    }

    #[test]
    fn test_successful_example_becomes_candidate() {
        let mut controller = AcquisitionController::new();
        let candidate = controller
            .example_fetched(Ok(raw("car-example.jpg")))
            .unwrap();
        assert_eq!(candidate.origin_filename(), "car-example.jpg");
    }
}
