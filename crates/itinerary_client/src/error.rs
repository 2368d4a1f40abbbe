use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("itinerary request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("itinerary service returned {status}{}", render_detail(.detail))]
    Status {
        status: StatusCode,
        detail: Option<String>,
    },
    #[error("malformed itinerary response: {0}")]
    MalformedResponse(String),
    #[error("an itinerary request is already pending")]
    Busy,
    #[error("itinerary request superseded by a newer submission")]
    Superseded,
    #[error("itinerary request cancelled")]
    Cancelled,
}

impl SubmitError {
    /// True for the "request failed" class: transport errors, non-2xx
    /// statuses and unusable response bodies.
    pub fn is_request_failure(&self) -> bool {
        matches!(
            self,
            SubmitError::Transport(_)
                | SubmitError::Status { .. }
                | SubmitError::MalformedResponse(_)
        )
    }
}

fn render_detail(detail: &Option<String>) -> String {
    match detail {
        Some(detail) => format!(": {detail}"),
        None => String::new(),
    }
}
