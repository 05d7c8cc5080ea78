//! JSON decoding of invocation payloads into a typed `Event`.

use serde::Deserialize;
use std::{error::Error, fmt};

/// Event payload deserialization error. Reported to the Runtime API as a
/// `RequestDecoding` invocation error.
#[derive(Debug)]
pub struct DeserializeError {
    inner: serde_path_to_error::Error<serde_json::Error>,
}

impl fmt::Display for DeserializeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = self.inner.path().to_string();
        if path == "." {
            write!(f, "failed to deserialize the invocation payload: {}", self.inner)
        } else {
            write!(f, "failed to deserialize the invocation payload: [{path}] {}", self.inner)
        }
    }
}

impl Error for DeserializeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.inner)
    }
}

/// Decode `body` into `T`, tracking the failing field path on error so a
/// malformed nested field doesn't just say "invalid input" at the top level.
pub fn deserialize<T>(body: &[u8]) -> Result<T, DeserializeError>
where
    T: for<'de> Deserialize<'de>,
{
    let jd = &mut serde_json::Deserializer::from_slice(body);
    serde_path_to_error::deserialize(jd).map_err(|inner| DeserializeError { inner })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Event {
        n: u32,
    }

    #[test]
    fn decodes_valid_payload() {
        let event: Event = deserialize(br#"{"n":3}"#).unwrap();
        assert_eq!(event.n, 3);
    }

    #[test]
    fn reports_field_path_on_type_mismatch() {
        let err = deserialize::<Event>(br#"{"n":"bad"}"#).unwrap_err();
        assert!(err.to_string().contains("n"));
    }

    #[test]
    fn reports_on_malformed_json() {
        assert!(deserialize::<Event>(b"not json").is_err());
    }
}
