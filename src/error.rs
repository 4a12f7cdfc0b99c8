use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("malformed run record #{index}: {reason}")]
    MalformedRunRecord { index: usize, reason: String },
    #[error("history archive rejected snapshot: {0}")]
    Archival(String),
}

impl ImportError {
    pub fn malformed(index: usize, reason: impl Into<String>) -> Self {
        ImportError::MalformedRunRecord {
            index,
            reason: reason.into(),
        }
    }
}

impl From<ureq::Error> for ImportError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(code, response) => ImportError::Transport(format!(
                "{} returned HTTP {code}",
                response.get_url()
            )),
            ureq::Error::Transport(transport) => ImportError::Transport(transport.to_string()),
        }
    }
}
