// src/action/error.rs

use std::fmt;
use std::io;

/// Broad category of a failed action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActionErrorKind {
    /// The client driver lost or could not use its connection.
    Driver,
    /// The cluster could not serve the request (missing primary, no quorum).
    Availability,
    /// The operation failed part way and may or may not have applied.
    OpFailed,
    Timeout,
    /// The query ran and was rejected by the server.
    Runtime,
    /// The query was malformed.
    Compile,
    /// Anything without structure; only its message is kept.
    Other,
}

impl ActionErrorKind {
    /// Name used as the prefix of an error description, `None` for
    /// unstructured errors.
    pub fn name(self) -> Option<&'static str> {
        match self {
            ActionErrorKind::Driver => Some("DriverError"),
            ActionErrorKind::Availability => Some("AvailabilityError"),
            ActionErrorKind::OpFailed => Some("OpFailedError"),
            ActionErrorKind::Timeout => Some("TimeoutError"),
            ActionErrorKind::Runtime => Some("RuntimeError"),
            ActionErrorKind::Compile => Some("CompileError"),
            ActionErrorKind::Other => None,
        }
    }
}

impl fmt::Display for ActionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name().unwrap_or("Other"))
    }
}

/// Failure of a single continuous action invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionError {
    pub kind: ActionErrorKind,
    pub message: String,
}

impl fmt::Display for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&describe(self))
    }
}

impl std::error::Error for ActionError {}

impl ActionError {
    pub fn new(kind: ActionErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(ActionErrorKind::Other, message)
    }
}

impl From<anyhow::Error> for ActionError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<ActionError>() {
            Ok(action) => action,
            Err(err) => match err.downcast_ref::<io::Error>() {
                Some(io) => ActionError::new(io_kind(io), format!("{err:#}")),
                None => ActionError::other(format!("{err:#}")),
            },
        }
    }
}

impl From<io::Error> for ActionError {
    fn from(err: io::Error) -> Self {
        ActionError::new(io_kind(&err), err.to_string())
    }
}

impl From<tokio::time::error::Elapsed> for ActionError {
    fn from(err: tokio::time::error::Elapsed) -> Self {
        ActionError::new(ActionErrorKind::Timeout, err.to_string())
    }
}

fn io_kind(err: &io::Error) -> ActionErrorKind {
    match err.kind() {
        io::ErrorKind::TimedOut => ActionErrorKind::Timeout,
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::NotConnected
        | io::ErrorKind::BrokenPipe
        | io::ErrorKind::UnexpectedEof => ActionErrorKind::Driver,
        _ => ActionErrorKind::Other,
    }
}

/// Split an error into its kind and message.
pub fn classify(err: &ActionError) -> (ActionErrorKind, String) {
    (err.kind, err.message.clone())
}

/// Description used as the tally key: `"<Kind> <message>"`, or just the
/// message for unstructured errors.
pub fn describe(err: &ActionError) -> String {
    let (kind, message) = classify(err);
    match kind.name() {
        Some(name) => format!("{name} {message}"),
        None => message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_errors_are_prefixed_with_their_kind() {
        let err = ActionError::new(ActionErrorKind::Availability, "primary replica unavailable");
        assert_eq!(describe(&err), "AvailabilityError primary replica unavailable");
        assert_eq!(err.to_string(), describe(&err));
    }

    #[test]
    fn unstructured_errors_keep_only_their_message() {
        let err: ActionError = anyhow::anyhow!("table `test` does not exist").into();
        assert_eq!(classify(&err).0, ActionErrorKind::Other);
        assert_eq!(describe(&err), "table `test` does not exist");
    }

    #[test]
    fn io_errors_map_to_driver_and_timeout_kinds() {
        let refused: ActionError = io::Error::from(io::ErrorKind::ConnectionRefused).into();
        assert_eq!(refused.kind, ActionErrorKind::Driver);

        let timed_out: ActionError = io::Error::new(io::ErrorKind::TimedOut, "slow").into();
        assert_eq!(describe(&timed_out), "TimeoutError slow");
    }

    #[test]
    fn wrapped_action_errors_survive_anyhow() {
        let original = ActionError::new(ActionErrorKind::OpFailed, "write may have applied");
        let round: ActionError = anyhow::Error::new(original.clone()).into();
        assert_eq!(round, original);
    }
}
