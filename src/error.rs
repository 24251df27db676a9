//! Configuration errors.
//!
//! Everything in this crate is total over its numeric domain, so the only
//! errors are developer-facing configuration mistakes that must be caught
//! before the first physics tick.

use bevy::prelude::*;
use thiserror::Error;

/// A configuration problem that prevents a controller from operating.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required collaborator was never supplied to the builder.
    #[error("missing collaborator: {0}")]
    MissingCollaborator(&'static str),

    /// A tuning parameter is outside its valid range.
    #[error("invalid parameter `{name}` = {value}: expected {expected}")]
    InvalidParameter {
        name: &'static str,
        value: f32,
        expected: &'static str,
    },

    /// No entity carries a [`LocomotionCamera`](crate::state::LocomotionCamera).
    #[error("no entity with a LocomotionCamera component exists")]
    MissingCamera,

    /// A controller entity lacks a component its physics backend needs.
    #[error("entity {entity} is missing physics component `{component}`")]
    MissingPhysicsComponent {
        entity: Entity,
        component: &'static str,
    },

    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_parameter_message_names_the_field() {
        let err = ConfigError::InvalidParameter {
            name: "turn_speed",
            value: 1.5,
            expected: "a value in [0, 1]",
        };
        let message = err.to_string();
        assert!(message.contains("turn_speed"));
        assert!(message.contains("1.5"));
    }

    #[test]
    fn missing_collaborator_message() {
        let err = ConfigError::MissingCollaborator("camera");
        assert_eq!(err.to_string(), "missing collaborator: camera");
    }
}
