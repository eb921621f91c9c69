//! Error types for custom element substitution

use thiserror::Error;

/// Errors that can occur while substituting custom elements
///
/// Malformed *input* content never produces an error: the HTML5 parser
/// recovers and the best-effort tree is used. Errors only come from handlers,
/// either directly or through the markup they return.
#[derive(Debug, Error)]
pub enum SubstitutionError {
    /// Markup returned by a handler did not parse cleanly as a fragment
    #[error("handler for <{tag}> returned malformed markup: {}", errors.join("; "))]
    MalformedMarkup {
        /// Tag name of the element whose handler produced the markup
        tag: String,
        /// Parse errors reported by the fragment parser
        errors: Vec<String>,
    },
    /// A handler reported a failure while rendering an element
    #[error("handler for <{tag}> failed: {message}")]
    Handler {
        /// Tag name of the element being rendered
        tag: String,
        /// Handler-provided description of the failure
        message: String,
    },
    /// A handler returned the element's parent (or an ancestor of it) as the replacement
    #[error("handler for <{tag}> returned an ancestor of the element as its replacement")]
    InvalidReplacement {
        /// Tag name of the element being rendered
        tag: String,
    },
    /// Handlers re-entered the parser more deeply than allowed
    #[error("custom element nesting exceeded the limit of {limit} levels")]
    NestingTooDeep {
        /// Configured nesting limit
        limit: usize,
    },
    /// Writing the serialized document failed
    #[error("failed to serialize document: {0}")]
    Serialize(#[from] std::io::Error),
}

impl SubstitutionError {
    /// Build a [`SubstitutionError::Handler`] from any displayable message
    pub fn handler(tag: impl Into<String>, message: impl std::fmt::Display) -> Self {
        SubstitutionError::Handler {
            tag: tag.into(),
            message: message.to_string(),
        }
    }

    /// Get numeric error code, stable across releases
    pub fn code(&self) -> u32 {
        match self {
            SubstitutionError::MalformedMarkup { .. } => 1,
            SubstitutionError::Handler { .. } => 2,
            SubstitutionError::NestingTooDeep { .. } => 3,
            SubstitutionError::InvalidReplacement { .. } => 4,
            SubstitutionError::Serialize(_) => 99,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_markup_message_lists_errors() {
        let err = SubstitutionError::MalformedMarkup {
            tag: "gallery".to_string(),
            errors: vec!["Unexpected token".to_string(), "Bad end tag".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "handler for <gallery> returned malformed markup: Unexpected token; Bad end tag"
        );
    }

    #[test]
    fn test_handler_constructor() {
        let err = SubstitutionError::handler("video", "missing data-id");
        assert_eq!(err.to_string(), "handler for <video> failed: missing data-id");
        assert_eq!(err.code(), 2);
    }

    #[test]
    fn test_error_codes_are_distinct() {
        let codes = [
            SubstitutionError::MalformedMarkup {
                tag: String::new(),
                errors: Vec::new(),
            }
            .code(),
            SubstitutionError::handler("x", "y").code(),
            SubstitutionError::NestingTooDeep { limit: 1 }.code(),
            SubstitutionError::InvalidReplacement { tag: String::new() }.code(),
        ];
        assert_eq!(codes, [1, 2, 3, 4]);
    }
}
