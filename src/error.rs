use thiserror::Error;

/// Every way a client operation can fail. The `Display` text is the message
/// callers show to users.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("HTTP {0}")]
    Http(u16),

    #[error("Sweetistics request failed: {0}")]
    Transport(String),

    #[error("Sweetistics response parse failed: {0}")]
    Parse(String),

    #[error("Sweetistics {stage} decode failed: {message}")]
    Decode {
        stage: DecodeStage,
        message: String,
    },

    #[error("{0}")]
    Envelope(String),

    #[error("Missing data in Sweetistics {context}response")]
    MissingData { context: &'static str },

    #[error("Malformed tweet payload from Sweetistics")]
    MalformedPayload,

    #[error("Conversation empty or unavailable")]
    EmptyConversation,

    #[error("{0}")]
    Rejected(String),

    #[error("Sweetistics API key is required")]
    MissingApiKey,
}

/// Which pipeline stage decoded the payload, so failures stay diagnosable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStage {
    Search,
    Response,
}

impl std::fmt::Display for DecodeStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeStage::Search => f.write_str("search"),
            DecodeStage::Response => f.write_str("response"),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(ClientError::Http(404).to_string(), "HTTP 404");
        assert_eq!(
            ClientError::Decode {
                stage: DecodeStage::Search,
                message: "bad".to_string()
            }
            .to_string(),
            "Sweetistics search decode failed: bad"
        );
        assert_eq!(
            ClientError::Decode {
                stage: DecodeStage::Response,
                message: "bad".to_string()
            }
            .to_string(),
            "Sweetistics response decode failed: bad"
        );
        assert_eq!(
            ClientError::MissingData { context: "search " }.to_string(),
            "Missing data in Sweetistics search response"
        );
        assert_eq!(
            ClientError::MissingData { context: "" }.to_string(),
            "Missing data in Sweetistics response"
        );
    }
}
