use crate::acquisition::AcquisitionController;
use crate::candidate::{CandidateId, DropPayload, ImageCandidate, RawFile};
use crate::error::ClassifyError;
use crate::prediction::PredictionResult;
use crate::render::View;
use crate::session::{ClassificationSession, SessionState, Ticket};
use bytes::Bytes;

#[derive(Debug)]
pub enum Event {
    FileSelected(RawFile),
    FilesDropped(DropPayload),
    DragEntered,
    DragLeft,
    ExampleRequested {
        url: String,
        name: String,
    },
    ExampleFetched(Result<RawFile, ClassifyError>),
    PreviewResolved {
        candidate: CandidateId,
        source: String,
    },
    ClassifyRequested,
    PredictionSettled {
        ticket: Ticket,
        result: Result<PredictionResult, ClassifyError>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    ResolvePreview {
        candidate: CandidateId,
        payload: Bytes,
        mime_type: String,
    },
    FetchExample {
        url: String,
        name: String,
    },
    SubmitPrediction {
        ticket: Ticket,
        candidate: ImageCandidate,
    },
}

impl Effect {
    pub fn to_display_string(&self) -> String {
        match self {
            Effect::ResolvePreview {
                candidate,
                payload,
                mime_type,
            } => format!(
                "ResolvePreview {{ candidate: {}, mime_type: {}, len: {} }}",
                candidate,
                mime_type,
                payload.len()
            ),
            effect => format!("{:?}", effect),
        }
    }
}

/// Acquisition and session bound together behind one event-driven
/// transition function.
#[derive(Debug, Default)]
pub struct Workflow {
    acquisition: AcquisitionController,
    session: ClassificationSession,
}

impl Workflow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SessionState {
        self.session.state()
    }

    pub fn view(&self) -> View {
        View::project(&self.acquisition, self.session.state())
    }

    pub fn transition(&mut self, event: Event) -> Vec<Effect> {
        match event {
            Event::FileSelected(raw) => {
                let candidate = self.acquisition.accept_file(raw);
                self.adopt(candidate)
            }
            Event::FilesDropped(payload) => match self.acquisition.accept_drop(payload) {
                Some(candidate) => self.adopt(candidate),
                None => vec![],
            },
            Event::DragEntered => {
                self.acquisition.drag_entered();
                vec![]
            }
            Event::DragLeft => {
                self.acquisition.drag_left();
                vec![]
            }
            Event::ExampleRequested { url, name } => vec![Effect::FetchExample { url, name }],
            Event::ExampleFetched(result) => match self.acquisition.example_fetched(result) {
                Some(candidate) => self.adopt(candidate),
                None => vec![],
            },
            Event::PreviewResolved { candidate, source } => {
                if !self.session.preview_resolved(candidate, source) {
                    tracing::debug!("Dropping preview for superseded candidate {}", candidate);
                }
                vec![]
            }
            Event::ClassifyRequested => match self.session.classify() {
                Some((ticket, candidate)) => {
                    self.acquisition.clear_fetch_error();
                    vec![Effect::SubmitPrediction { ticket, candidate }]
                }
                None => vec![],
            },
            Event::PredictionSettled { ticket, result } => {
                self.session.settle(ticket, result);
                vec![]
            }
        }
    }

    fn adopt(&mut self, candidate: ImageCandidate) -> Vec<Effect> {
        let effect = Effect::ResolvePreview {
            candidate: candidate.id(),
            payload: candidate.payload().clone(),
            mime_type: candidate.mime_type().to_string(),
        };
        self.session.candidate_acquired(candidate);
        vec![effect]
    }
}
