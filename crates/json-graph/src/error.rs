//! Error types for encoding, decoding and registration.

use thiserror::Error;

/// Failure reported by a user-supplied payload hook.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct HookError(String);

impl HookError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("tag `{0}` is reserved for a built-in kind")]
    ReservedTag(String),
}

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("no class tag registered for type `{class}`")]
    UnregisteredType { class: String },
    #[error("object #{index} does not belong to the encoded graph")]
    UnknownObject { index: usize },
    #[error("to_payload hook for `{tag}` failed: {source}")]
    Hook {
        tag: String,
        #[source]
        source: HookError,
    },
    #[error("failed to print document: {0}")]
    Print(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("unknown class tag `{tag}` on node {id}")]
    UnknownClassTag { tag: String, id: u64 },
    #[error("malformed node (tag {tag:?}, id {id:?}): {reason}")]
    MalformedNode {
        tag: Option<String>,
        id: Option<u64>,
        reason: &'static str,
    },
    #[error("dangling reference to node {id} (tag `{tag}`)")]
    DanglingReference { tag: String, id: u64 },
    #[error("from_payload hook for `{tag}` failed on node {id}: {source}")]
    Hook {
        tag: String,
        id: u64,
        #[source]
        source: HookError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_tag_and_id() {
        let err = DecodeError::UnknownClassTag {
            tag: "Point".into(),
            id: 3,
        };
        assert_eq!(err.to_string(), "unknown class tag `Point` on node 3");

        let err = DecodeError::DanglingReference {
            tag: "Object".into(),
            id: 9,
        };
        assert_eq!(err.to_string(), "dangling reference to node 9 (tag `Object`)");

        let err = DecodeError::MalformedNode {
            tag: Some("Map".into()),
            id: Some(2),
            reason: "map entry must be a [key, value] pair",
        };
        assert_eq!(
            err.to_string(),
            "malformed node (tag Some(\"Map\"), id Some(2)): map entry must be a [key, value] pair"
        );

        let err = EncodeError::UnregisteredType {
            class: "geo::Line".into(),
        };
        assert_eq!(err.to_string(), "no class tag registered for type `geo::Line`");
    }

    #[test]
    fn hook_error_is_source() {
        let err = EncodeError::Hook {
            tag: "Point".into(),
            source: HookError::new("boom"),
        };
        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "boom");
    }
}
