//! Shared transport types

/// Outcome a handler reports for one delivered message.
///
/// Each adapter maps it to its broker's disposition: the queue side
/// acks, naks, or terminates the delivery; the topic side commits or
/// withholds the offset. The consume loops never treat any variant as
/// fatal, so one bad message cannot halt a stream.
#[derive(Debug)]
pub enum ProcessingResult {
    /// Message was successfully processed
    Success,

    /// Message failed but can be retried (redelivered later)
    RetryableError(String),

    /// Message failed and must not be redelivered
    PermanentError(String),
}

impl ProcessingResult {
    /// Label used for metrics and logs
    pub fn outcome_label(&self) -> &'static str {
        match self {
            ProcessingResult::Success => "success",
            ProcessingResult::RetryableError(_) => "retryable_error",
            ProcessingResult::PermanentError(_) => "permanent_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_labels() {
        assert_eq!(ProcessingResult::Success.outcome_label(), "success");
        assert_eq!(
            ProcessingResult::RetryableError("db down".to_string()).outcome_label(),
            "retryable_error"
        );
        assert_eq!(
            ProcessingResult::PermanentError("bad json".to_string()).outcome_label(),
            "permanent_error"
        );
    }
}
