//! Errors surfaced to scripts by the sprite bridge.

use rhai::{EvalAltResult, Position};

/// Validation failures raised by sprite operations.
///
/// Every variant is a caller mistake. A lookup miss is not represented here;
/// it is an ordinary `None`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SpriteError {
    /// The UID requested at allocation belongs to a live sprite.
    #[error("UID {uid} is already used.")]
    DuplicateIdentifier { uid: u64 },

    /// A massivity name outside the script-selectable set.
    #[error("Invalid type '{name}'.")]
    InvalidEnumerant { name: String },

    /// The callback handed to `register` cannot be invoked.
    #[error("No function given (got {found}).")]
    InvalidCallback { found: String },

    /// `register` was called on something that is not a sprite.
    #[error("No receiver (sprite) given (got {found}).")]
    InvalidReceiver { found: String },

    /// An argument had the wrong shape, e.g. a string where a number belongs.
    #[error("Invalid argument '{argument}': expected {expected}, got {found}.")]
    InvalidArgumentType { argument: &'static str, expected: &'static str, found: String },

    /// Event names must be non-empty.
    #[error("Event name must not be empty.")]
    InvalidEventName,

    /// The handle outlived the sprite it pointed at (the level was unloaded).
    #[error("Sprite handle {entity} no longer refers to a live sprite.")]
    StaleHandle { entity: String },
}

impl SpriteError {
    pub(crate) fn argument(argument: &'static str, expected: &'static str, found: impl Into<String>) -> Self {
        SpriteError::InvalidArgumentType { argument, expected, found: found.into() }
    }
}

impl From<SpriteError> for Box<EvalAltResult> {
    fn from(err: SpriteError) -> Self {
        Box::new(EvalAltResult::ErrorRuntime(err.to_string().into(), Position::NONE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_readable() {
        assert_eq!(SpriteError::DuplicateIdentifier { uid: 33 }.to_string(), "UID 33 is already used.");
        assert_eq!(
            SpriteError::InvalidEnumerant { name: "enemy".to_string() }.to_string(),
            "Invalid type 'enemy'."
        );
        let err = SpriteError::argument("x", "a number", "string");
        assert_eq!(err.to_string(), "Invalid argument 'x': expected a number, got string.");
    }

    #[test]
    fn converts_into_script_runtime_error() {
        let err: Box<EvalAltResult> = SpriteError::InvalidEventName.into();
        match *err {
            EvalAltResult::ErrorRuntime(value, _) => {
                assert_eq!(value.into_string().expect("string payload"), "Event name must not be empty.");
            }
            other => panic!("unexpected error kind: {other:?}"),
        }
    }
}
