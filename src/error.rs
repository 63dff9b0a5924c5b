//! Error types

use thiserror::Error;

/// Render graph error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Resource '{type_name}' was not published this frame")]
    ResourceNotPublished { type_name: &'static str },
    #[error("Stale handle {kind}#{index} from generation {generation}")]
    StaleHandle {
        kind: &'static str,
        index: u32,
        generation: u32,
    },
    #[error("Handle {kind}#{index} refers to a released resource")]
    ReleasedHandle { kind: &'static str, index: u32 },
    #[error("Resource '{name}' is not declared by pass '{pass}'")]
    UndeclaredResource { name: String, pass: String },
    #[error("Resource '{name}' has no backing at this point of the frame")]
    UnresolvedResource { name: String },
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

pub type GraphResult<T> = Result<T, GraphError>;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Serialization error: {0}")]
    Serialize(String),
    #[error("Invalid setting: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GraphError::ResourceNotPublished {
            type_name: "ShadowRendererResult",
        };
        assert_eq!(
            err.to_string(),
            "Resource 'ShadowRendererResult' was not published this frame"
        );

        let err = GraphError::InvalidArgument("near must be positive".to_string());
        assert_eq!(err.to_string(), "Invalid argument: near must be positive");
    }
}
