use crate::candidate::{CandidateId, ImageCandidate};
use crate::error::ClassifyError;
use crate::prediction::PredictionResult;
use std::mem;

/// Identity of one outbound classification request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub candidate: CandidateId,
    pub request: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum SessionState {
    #[default]
    Idle,
    HasCandidate(ImageCandidate),
    Submitting(ImageCandidate),
    Succeeded(ImageCandidate, PredictionResult),
    Failed(ImageCandidate, String),
}

impl SessionState {
    pub fn candidate(&self) -> Option<&ImageCandidate> {
        match self {
            SessionState::Idle => None,
            SessionState::HasCandidate(c)
            | SessionState::Submitting(c)
            | SessionState::Succeeded(c, _)
            | SessionState::Failed(c, _) => Some(c),
        }
    }

    fn candidate_mut(&mut self) -> Option<&mut ImageCandidate> {
        match self {
            SessionState::Idle => None,
            SessionState::HasCandidate(c)
            | SessionState::Submitting(c)
            | SessionState::Succeeded(c, _)
            | SessionState::Failed(c, _) => Some(c),
        }
    }

    pub fn is_submitting(&self) -> bool {
        matches!(self, SessionState::Submitting(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "Idle",
            SessionState::HasCandidate(_) => "HasCandidate",
            SessionState::Submitting(_) => "Submitting",
            SessionState::Succeeded(..) => "Succeeded",
            SessionState::Failed(..) => "Failed",
        }
    }
}

/// Lifecycle of classification requests for the current candidate.
///
/// At most one request is in flight. A settlement is applied only when its
/// ticket matches the in-flight one; anything else is a stale response.
#[derive(Debug, Default)]
pub struct ClassificationSession {
    state: SessionState,
    last_request: u64,
    in_flight: Option<Ticket>,
}

impl ClassificationSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn in_flight(&self) -> Option<Ticket> {
        self.in_flight
    }

    /// Replaces the candidate and discards any result, error or pending request.
    pub fn candidate_acquired(&mut self, candidate: ImageCandidate) {
        if let Some(ticket) = self.in_flight.take() {
            tracing::debug!(
                "Candidate {} superseded while request {} is in flight",
                ticket.candidate,
                ticket.request
            );
        }
        self.state = SessionState::HasCandidate(candidate);
    }

    /// Starts a submission. Returns `None` without a candidate or while a
    /// request is already in flight.
    pub fn classify(&mut self) -> Option<(Ticket, ImageCandidate)> {
        let candidate = match &self.state {
            SessionState::HasCandidate(c)
            | SessionState::Succeeded(c, _)
            | SessionState::Failed(c, _) => c.clone(),
            SessionState::Idle => {
                tracing::debug!("Classify ignored: no candidate");
                return None;
            }
            SessionState::Submitting(_) => {
                tracing::debug!("Classify ignored: request already in flight");
                return None;
            }
        };

        self.last_request += 1;
        let ticket = Ticket {
            candidate: candidate.id(),
            request: self.last_request,
        };
        self.in_flight = Some(ticket);
        self.state = SessionState::Submitting(candidate.clone());

        Some((ticket, candidate))
    }

    /// Applies the outcome of `ticket`. Returns `false` for stale responses,
    /// which leave the state untouched.
    pub fn settle(
        &mut self,
        ticket: Ticket,
        result: Result<PredictionResult, ClassifyError>,
    ) -> bool {
        if self.in_flight != Some(ticket) || !self.state.is_submitting() {
            tracing::debug!(
                "Discarding stale response for candidate {} (request {})",
                ticket.candidate,
                ticket.request
            );
            return false;
        }
        self.in_flight = None;

        let SessionState::Submitting(candidate) = mem::take(&mut self.state) else {
            return false;
        };

        self.state = match result {
            Ok(prediction) => {
                tracing::info!(
                    "Candidate {} classified as {} ({:.3})",
                    candidate.id(),
                    prediction.top_label,
                    prediction.top_confidence
                );
                SessionState::Succeeded(candidate, prediction)
            }
            Err(e) => {
                tracing::warn!("Classification of candidate {} failed: {}", candidate.id(), e);
                SessionState::Failed(candidate, e.to_string())
            }
        };
        true
    }

    /// Attaches a decoded preview if `candidate` is still the current one.
    pub fn preview_resolved(&mut self, candidate: CandidateId, source: String) -> bool {
        match self.state.candidate_mut() {
            Some(current) if current.id() == candidate => {
                current.set_displayable_source(source);
                true
            }
            _ => false,
        }
    }
}
