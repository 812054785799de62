use thiserror::Error;

/// Errors surfaced by the scene, camera, and frame-driver layers.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    #[error("invalid camera parameters: {reason}")]
    InvalidCamera { reason: String },
    #[error("sphere index {index} out of bounds (capacity {capacity})")]
    SphereIndexOutOfBounds { index: usize, capacity: usize },
    #[error("frame driver is not rendering")]
    DriverStopped,
    #[error("GPU device lost: {reason}")]
    DeviceLost { reason: String },
}

impl EngineError {
    pub(crate) fn invalid_camera(reason: impl Into<String>) -> Self {
        Self::InvalidCamera {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_values() {
        let err = EngineError::SphereIndexOutOfBounds {
            index: 50,
            capacity: 50,
        };
        assert_eq!(
            err.to_string(),
            "sphere index 50 out of bounds (capacity 50)"
        );

        let err = EngineError::invalid_camera("near plane must be positive");
        assert!(err.to_string().contains("near plane"));
    }
}
