use crate::acquisition::AcquisitionController;
use crate::candidate::ImageCandidate;
use crate::ranking::{format_confidence, rank};
use crate::session::SessionState;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct CandidateView {
    pub file_name: String,
    pub mime_type: String,
    pub size_bytes: usize,
    pub preview_ready: bool,
    pub advisory: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowView {
    pub label: String,
    pub confidence: String,
    pub highlighted: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Status {
    Empty,
    Ready,
    Analyzing,
    Done {
        headline: String,
        confidence: String,
        rows: Vec<RowView>,
    },
    Error(String),
}

/// Everything the screen shows, derived from state alone.
#[derive(Debug, Clone, PartialEq)]
pub struct View {
    pub drag_over: bool,
    pub notice: Option<String>,
    pub candidate: Option<CandidateView>,
    pub can_classify: bool,
    pub status: Status,
}

impl View {
    pub fn project(acquisition: &AcquisitionController, session: &SessionState) -> Self {
        let status = match session {
            SessionState::Idle => Status::Empty,
            SessionState::HasCandidate(_) => Status::Ready,
            SessionState::Submitting(_) => Status::Analyzing,
            SessionState::Succeeded(_, result) => Status::Done {
                headline: result.top_label.clone(),
                confidence: format_confidence(result.top_confidence),
                rows: rank(result)
                    .into_iter()
                    .map(|r| RowView {
                        label: r.label.to_string(),
                        confidence: format_confidence(r.confidence),
                        highlighted: r.is_top,
                    })
                    .collect(),
            },
            SessionState::Failed(_, message) => Status::Error(message.clone()),
        };

        Self {
            drag_over: acquisition.is_drag_over(),
            notice: acquisition.fetch_error().map(str::to_string),
            candidate: session.candidate().map(candidate_view),
            can_classify: session.candidate().is_some() && !session.is_submitting(),
            status,
        }
    }
}

fn candidate_view(candidate: &ImageCandidate) -> CandidateView {
    CandidateView {
        file_name: candidate.origin_filename().to_string(),
        mime_type: candidate.mime_type().to_string(),
        size_bytes: candidate.payload().len(),
        preview_ready: candidate.displayable_source().is_some(),
        advisory: candidate.upload_advisory(),
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.candidate {
            None if self.drag_over => writeln!(f, "[ release to drop your image ]")?,
            None => writeln!(
                f,
                "Drop your image here, or browse (PNG, JPG, JPEG, BMP, GIF up to 10MB)"
            )?,
            Some(c) => {
                let preview = if c.preview_ready { "preview ready" } else { "loading preview" };
                writeln!(
                    f,
                    "Image: {} ({}, {} bytes, {})",
                    c.file_name, c.mime_type, c.size_bytes, preview
                )?;
                if let Some(advisory) = &c.advisory {
                    writeln!(f, "  ! {}", advisory)?;
                }
            }
        }

        if let Some(notice) = &self.notice {
            writeln!(f, "Error: {}", notice)?;
        }

        match &self.status {
            Status::Empty => {}
            Status::Ready => writeln!(f, "Ready: type `classify` to analyze")?,
            Status::Analyzing => writeln!(f, "Analyzing...")?,
            Status::Done {
                headline,
                confidence,
                rows,
            } => {
                writeln!(f, "Prediction: {} ({} confidence)", headline, confidence)?;
                for row in rows {
                    let marker = if row.highlighted { "*" } else { " " };
                    writeln!(f, " {} {:<15} {:>6}", marker, row.label, row.confidence)?;
                }
            }
            Status::Error(message) => writeln!(f, "Error: {}", message)?,
        }

        Ok(())
    }
}
