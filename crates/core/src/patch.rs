//! Tri-state patch field: distinguishes "field omitted" from "field explicitly null".
//!
//! Buyer tooling resends full line item lists without repeating every tracking
//! field. A key absent from the payload means "keep the prior value"; a key
//! present but `null` means "clear it". A plain `Option<T>` cannot tell those
//! apart after deserialization, so patchable fields use `Patch<T>` with
//! `#[serde(default, skip_serializing_if = "Patch::is_omitted")]`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A patchable optional field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Patch<T> {
    /// The key was not present in the payload; keep the prior value.
    Omitted,
    /// The key was present and `null`; clear the prior value.
    Null,
    /// The key was present with a value.
    Value(T),
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Patch::Omitted
    }
}

impl<T> Patch<T> {
    pub fn is_omitted(&self) -> bool {
        matches!(self, Patch::Omitted)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Patch::Null)
    }

    /// Resolve against the prior value: omitted keeps it, null clears it,
    /// a value replaces it.
    pub fn resolve(self, prior: Option<T>) -> Option<T> {
        match self {
            Patch::Omitted => prior,
            Patch::Null => None,
            Patch::Value(v) => Some(v),
        }
    }

    pub fn as_ref(&self) -> Patch<&T> {
        match self {
            Patch::Omitted => Patch::Omitted,
            Patch::Null => Patch::Null,
            Patch::Value(v) => Patch::Value(v),
        }
    }
}

impl<T> From<Option<T>> for Patch<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            None => Patch::Null,
            Some(v) => Patch::Value(v),
        }
    }
}

impl<T: Serialize> Serialize for Patch<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Patch::Omitted | Patch::Null => serializer.serialize_none(),
            Patch::Value(v) => serializer.serialize_some(v),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Only ever reached when the key is present: serde uses `Default`
        // (Omitted) for missing keys, so a deserialized `None` is a real null.
        Option::<T>::deserialize(deserializer).map(Patch::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Payload {
        #[serde(default)]
        tracking: Patch<String>,
    }

    #[test]
    fn missing_key_is_omitted() {
        let p: Payload = serde_json::from_str("{}").unwrap();
        assert!(p.tracking.is_omitted());
    }

    #[test]
    fn explicit_null_clears_prior() {
        let p: Payload = serde_json::from_str(r#"{"tracking":null}"#).unwrap();
        assert!(p.tracking.is_null());
        assert_eq!(p.tracking.resolve(Some("prior".to_string())), None);
    }

    #[test]
    fn value_replaces_prior() {
        let p: Payload = serde_json::from_str(r#"{"tracking":"t-1"}"#).unwrap();
        assert_eq!(
            p.tracking.resolve(Some("prior".to_string())),
            Some("t-1".to_string())
        );
    }

    #[test]
    fn omitted_keeps_prior() {
        assert_eq!(Patch::Omitted.resolve(Some(7)), Some(7));
        assert_eq!(Patch::<i64>::Omitted.resolve(None), None);
    }
}
