use serde::Serialize;
use serde_json::Value;
use tracing::warn;

/// Structural equality between two payloads, ignoring fields the submission
/// workflow populates itself.
///
/// Only used to tell a harmless replay from a conflicting resubmission under the
/// same idempotency key. It says nothing about business validity.
pub trait Fingerprint: Serialize {
    /// Object keys removed at any depth before comparing.
    const VOLATILE_FIELDS: &'static [&'static str] = &[];

    fn equal_payload(&self, other: &Self) -> bool {
        match (
            fingerprint(self, Self::VOLATILE_FIELDS),
            fingerprint(other, Self::VOLATILE_FIELDS),
        ) {
            (Some(a), Some(b)) => a == b,
            // Unprojectable payloads never count as a replay.
            _ => false,
        }
    }
}

impl Fingerprint for Value {}

fn fingerprint<T: Serialize + ?Sized>(payload: &T, volatile: &[&str]) -> Option<Value> {
    match serde_json::to_value(payload) {
        Ok(mut value) => {
            strip(&mut value, volatile);
            Some(value)
        }
        Err(e) => {
            warn!("Payload could not be fingerprinted: {}", e);
            None
        }
    }
}

fn strip(value: &mut Value, volatile: &[&str]) {
    match value {
        Value::Object(map) => {
            map.retain(|key, _| !volatile.contains(&key.as_str()));
            for nested in map.values_mut() {
                strip(nested, volatile);
            }
        }
        Value::Array(items) => {
            for item in items {
                strip(item, volatile);
            }
        }
        _ => {}
    }
}
