use thiserror::Error;

use crate::raw_response::RawResponse;

/// Marker the remote service embeds in textual error replies.
pub const ERROR_REPLY_MARKER: &str = "Error";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ServiceError {
    message: String,
}

impl ServiceError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Legacy convention: a textual reply is an error when it contains
    /// [`ERROR_REPLY_MARKER`] anywhere.
    #[must_use]
    pub fn is_error_reply(reply: &str) -> bool {
        reply.contains(ERROR_REPLY_MARKER)
    }
}

/// Synchronous seam to the remote database-abstraction service.
pub trait QueryService {
    fn execute(&self, command: &str) -> Result<RawResponse, ServiceError>;
}

impl<S: QueryService + ?Sized> QueryService for &S {
    fn execute(&self, command: &str) -> Result<RawResponse, ServiceError> {
        (**self).execute(command)
    }
}

impl<S: QueryService + ?Sized> QueryService for Box<S> {
    fn execute(&self, command: &str) -> Result<RawResponse, ServiceError> {
        (**self).execute(command)
    }
}

#[cfg(test)]
mod tests {
    use super::{QueryService, ServiceError};
    use crate::raw_response::RawResponse;

    struct EchoService;

    impl QueryService for EchoService {
        fn execute(&self, command: &str) -> Result<RawResponse, ServiceError> {
            if command.is_empty() {
                return Err(ServiceError::new("Error: empty command"));
            }
            Ok(RawResponse::default())
        }
    }

    #[test]
    fn error_reply_detection_is_substring_based() {
        assert!(ServiceError::is_error_reply(
            "System.Data.SqlClient.SqlException: Error near 'x'"
        ));
        assert!(ServiceError::is_error_reply("Error"));
        assert!(!ServiceError::is_error_reply("error in lower case"));
        assert!(!ServiceError::is_error_reply("3 rows"));
    }

    #[test]
    fn boxed_and_borrowed_services_delegate() {
        let boxed: Box<dyn QueryService> = Box::new(EchoService);
        assert!(boxed.execute("select 1").is_ok());

        let borrowed = &EchoService;
        let error = borrowed.execute("").expect_err("empty command fails");
        assert_eq!(error.message(), "Error: empty command");
    }
}
