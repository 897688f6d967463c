//! Error types for interaction loading and constraint operations.

use thiserror::Error;

/// Errors that can occur while loading, saving, or mutating interactions.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConstraintError {
    /// XML parsing error.
    #[error("XML parse error: {0}")]
    XmlParse(String),

    /// Missing required attribute on an interaction element.
    #[error("missing required attribute: {attribute} on {element}")]
    MissingAttribute {
        /// The missing attribute name.
        attribute: &'static str,
        /// The element that should have the attribute.
        element: String,
    },

    /// Invalid attribute value.
    #[error("invalid value for {attribute} on {element}: {message}")]
    InvalidAttribute {
        /// The attribute with the invalid value.
        attribute: &'static str,
        /// The element containing the attribute.
        element: String,
        /// Description of why the value is invalid.
        message: String,
    },

    /// Interactions were loaded before any parts exist in the model.
    #[error("parts must be loaded before interaction {element}")]
    PartsNotLoaded {
        /// The element being loaded.
        element: String,
    },

    /// A named part could not be found in the model.
    #[error("part not found: {part} (referenced by {element})")]
    PartNotFound {
        /// The part name that failed to resolve.
        part: String,
        /// The element referencing the part.
        element: String,
    },

    /// A named marker could not be found within its resolved part.
    #[error("marker not found: {marker} on part {part} (referenced by {element})")]
    MarkerNotFound {
        /// The marker name that failed to resolve.
        marker: String,
        /// The part that was searched.
        part: String,
        /// The element referencing the marker.
        element: String,
    },

    /// A marker id no longer resolves into the model (e.g. when saving).
    #[error("dangling marker reference in {element}")]
    DanglingReference {
        /// The element holding the stale reference.
        element: String,
    },

    /// An axis selector outside the 0-5 range of the relative-motion space.
    #[error("axis index out of range: {axis} (expected 0-5)")]
    AxisOutOfRange {
        /// The rejected axis index.
        axis: usize,
    },

    /// A vector had the wrong length for the constraint dimension.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected length.
        expected: usize,
        /// Provided length.
        actual: usize,
    },
}

impl ConstraintError {
    /// Create an XML parse error from any displayable source.
    #[must_use]
    pub fn xml(err: impl std::fmt::Display) -> Self {
        Self::XmlParse(err.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ConstraintError::MissingAttribute {
            attribute: "prt_m",
            element: "r1".to_string(),
        };
        assert!(err.to_string().contains("prt_m"));
        assert!(err.to_string().contains("r1"));

        let err = ConstraintError::MarkerNotFound {
            marker: "joint_i".to_string(),
            part: "link1".to_string(),
            element: "r1".to_string(),
        };
        assert!(err.to_string().contains("joint_i"));
        assert!(err.to_string().contains("link1"));
    }

    #[test]
    fn test_axis_out_of_range() {
        let err = ConstraintError::AxisOutOfRange { axis: 7 };
        assert!(err.to_string().contains('7'));
    }

    #[test]
    fn test_dimension_mismatch() {
        let err = ConstraintError::DimensionMismatch {
            expected: 5,
            actual: 3,
        };
        assert!(err.to_string().contains('5'));
        assert!(err.to_string().contains('3'));
    }
}
