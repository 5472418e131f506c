//! Idempotency layer: recognizes previously-completed operations and
//! surfaces in-flight duplicates.

use serde_json::Value;

use crate::model::{IdempotencyRecord, UserId};

/// The outcome of consulting the idempotency layer before starting an
/// operation.
#[derive(Debug, Clone)]
pub enum IdempotencyDecision {
    /// No record exists; the engine should proceed and call `record` after
    /// a successful commit.
    Proceed,
    /// A completed record exists; its body should be replayed verbatim.
    Replay(Value),
    /// A record exists but is not yet completed — a concurrent duplicate is
    /// in flight. The engine reports `DUPLICATE_OPERATION`.
    InFlight,
}

/// Looks up the record for `(operation_key, user_id, operation_path)` and
/// turns it into a decision. `operation_path` is matched for documentation
/// purposes only — uniqueness is keyed on `(operation_key, user_id)` alone.
pub fn decide(existing: Option<&IdempotencyRecord>) -> IdempotencyDecision {
    match existing {
        None => IdempotencyDecision::Proceed,
        Some(record) if record.completed => IdempotencyDecision::Replay(
            record
                .response_body
                .clone()
                .unwrap_or(Value::Null),
        ),
        Some(_) => IdempotencyDecision::InFlight,
    }
}

/// Builds the record the engine should write through the store after a
/// successful commit.
pub fn completed_record(
    user_id: UserId,
    operation_path: &str,
    operation_key: crate::amount::OperationKey,
    response_body: Value,
    now: chrono::DateTime<chrono::Utc>,
) -> IdempotencyRecord {
    IdempotencyRecord {
        operation_key,
        user_id,
        operation_path: operation_path.to_string(),
        completed: true,
        response_body: Some(response_body),
        created_at: now,
        updated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn no_record_proceeds() {
        assert!(matches!(decide(None), IdempotencyDecision::Proceed));
    }

    #[test]
    fn completed_record_replays() {
        let record = completed_record(
            Uuid::new_v4(),
            "deposit",
            crate::amount::OperationKey::parse("k1").unwrap(),
            serde_json::json!({"ok": true}),
            chrono::Utc::now(),
        );
        match decide(Some(&record)) {
            IdempotencyDecision::Replay(body) => assert_eq!(body, serde_json::json!({"ok": true})),
            other => panic!("expected Replay, got {other:?}"),
        }
    }

    #[test]
    fn incomplete_record_is_in_flight() {
        let mut record = completed_record(
            Uuid::new_v4(),
            "deposit",
            crate::amount::OperationKey::parse("k1").unwrap(),
            serde_json::Value::Null,
            chrono::Utc::now(),
        );
        record.completed = false;
        assert!(matches!(decide(Some(&record)), IdempotencyDecision::InFlight));
    }
}
