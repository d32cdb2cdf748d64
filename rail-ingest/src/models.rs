// Wire types for train events

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Queue carrying activation events
pub const ACTIVATION_QUEUE: &str = "train_activation_queue";

/// Queue carrying cancellation events
pub const CANCELLATION_QUEUE: &str = "train_cancellation_queue";

/// Topic carrying activation events
pub const ACTIVATION_TOPIC: &str = "train_activation";

/// Topic carrying cancellation events
pub const CANCELLATION_TOPIC: &str = "train_cancellation";

/// A train entering service; one row in `active_trains`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActivationEvent {
    pub train_id: String,
    pub stanox: String,
    pub timestamp: DateTime<Utc>,
}

/// A cancelled train; one row in `cancelled_trains`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CancellationEvent {
    pub train_id: String,
    pub stanox: String,
    pub reason_code: String,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_activation_wire_format() {
        let payload = r#"{"trainId":"T123","stanox":"12345","timestamp":"2024-01-01T10:00:00Z"}"#;
        let event: ActivationEvent = serde_json::from_str(payload).unwrap();

        assert_eq!(event.train_id, "T123");
        assert_eq!(event.stanox, "12345");
        assert_eq!(
            event.timestamp,
            Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_cancellation_wire_format() {
        let payload =
            r#"{"trainId":"T999","stanox":"99999","reasonCode":"AB","timestamp":"2024-06-01T08:30:00Z"}"#;
        let event: CancellationEvent = serde_json::from_str(payload).unwrap();

        assert_eq!(event.train_id, "T999");
        assert_eq!(event.reason_code, "AB");
    }

    #[test]
    fn test_offset_timestamp_converts_to_utc() {
        let payload =
            r#"{"trainId":"T1","stanox":"00001","timestamp":"2024-01-01T12:00:00+02:00"}"#;
        let event: ActivationEvent = serde_json::from_str(payload).unwrap();

        assert_eq!(
            event.timestamp,
            Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_missing_reason_code_rejected() {
        let payload = r#"{"trainId":"T999","stanox":"99999","timestamp":"2024-06-01T08:30:00Z"}"#;
        assert!(serde_json::from_str::<CancellationEvent>(payload).is_err());
    }
}
