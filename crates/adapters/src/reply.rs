use veranda_core::query_service::{QueryService, ServiceError};
use veranda_core::raw_response::RawResponse;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind<'a> {
    Error(&'a str),
    Data(&'a str),
}

/// Splits textual replies the way the service's existing clients do: any
/// payload containing `"Error"` is an error message.
#[must_use]
pub fn classify_reply(payload: &str) -> ReplyKind<'_> {
    if ServiceError::is_error_reply(payload) {
        ReplyKind::Error(payload)
    } else {
        ReplyKind::Data(payload)
    }
}

/// A transport that only moves text: a command out, a textual reply back.
pub trait TextTransport {
    fn send(&self, command: &str) -> Result<String, ServiceError>;
}

impl<F> TextTransport for F
where
    F: Fn(&str) -> Result<String, ServiceError>,
{
    fn send(&self, command: &str) -> Result<String, ServiceError> {
        self(command)
    }
}

/// Adapts a [`TextTransport`] whose data replies are JSON-encoded
/// [`RawResponse`] documents.
#[derive(Debug, Clone)]
pub struct TextReplyService<T> {
    transport: T,
}

impl<T: TextTransport> TextReplyService<T> {
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self { transport }
    }
}

impl<T: TextTransport> QueryService for TextReplyService<T> {
    fn execute(&self, command: &str) -> Result<RawResponse, ServiceError> {
        let payload = self.transport.send(command)?;
        match classify_reply(&payload) {
            ReplyKind::Error(message) => Err(ServiceError::new(message)),
            ReplyKind::Data(data) => serde_json::from_str(data)
                .map_err(|error| ServiceError::new(format!("undecodable reply: {error}"))),
        }
    }
}
