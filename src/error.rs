use thiserror::Error;

#[derive(Error, Debug)]
pub enum HubError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, HubError>;

/// Why a page fetch did not produce items.
///
/// `Cancelled` is a control signal, not a failure: feeds never surface it to
/// the user and never stop paging because of it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("network error: {0}")]
    Transport(String),

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("request cancelled")]
    Cancelled,
}

impl FetchError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetchError::Cancelled)
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Decode(err.to_string())
    }
}

impl From<FetchError> for HubError {
    fn from(err: FetchError) -> Self {
        HubError::Api(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_json_is_a_decode_error() {
        let err = serde_json::from_str::<Vec<u32>>("{not json").unwrap_err();
        assert!(matches!(FetchError::from(err), FetchError::Decode(_)));
    }

    #[test]
    fn only_cancelled_reports_cancellation() {
        assert!(FetchError::Cancelled.is_cancelled());
        assert!(!FetchError::Transport("timeout".into()).is_cancelled());
        assert!(!FetchError::Decode("missing field".into()).is_cancelled());
    }

    #[test]
    fn fetch_error_converts_to_api_error() {
        let err: HubError = FetchError::Transport("offline".into()).into();
        assert_eq!(err.to_string(), "API error: network error: offline");
    }
}
