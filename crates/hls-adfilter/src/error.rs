use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum AdFilterError {
    #[error("invalid URL `{input}`: {reason}")]
    InvalidUrl { input: String, reason: String },

    #[error("HTTP request failed: {source}")]
    Network {
        #[from]
        source: reqwest::Error,
    },

    #[error("request failed with HTTP {status} for {url}")]
    HttpStatus { status: StatusCode, url: String },

    #[error("invalid playlist content from {url}: {reason}")]
    InvalidContent { url: String, reason: String },

    #[error("playlist error: {reason}")]
    Playlist { reason: String },

    #[error("configuration error: {reason}")]
    Configuration { reason: String },
}

impl AdFilterError {
    pub fn invalid_url(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            input: input.into(),
            reason: reason.into(),
        }
    }

    pub fn http_status(status: StatusCode, url: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            url: url.into(),
        }
    }

    pub fn invalid_content(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidContent {
            url: url.into(),
            reason: reason.into(),
        }
    }

    pub fn playlist(reason: impl Into<String>) -> Self {
        Self::Playlist {
            reason: reason.into(),
        }
    }

    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Whether the failure originated upstream (network or HTTP status).
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::HttpStatus { .. })
    }
}

pub type Result<T, E = AdFilterError> = std::result::Result<T, E>;
