//! Unified error handling for dealport.
//!
//! This module provides a centralized error hierarchy for the controller
//! layer, with automatic conversions and metric labeling.

use crate::router::StateSegment;
use dealport_collab::{RecordId, StoreError};
use thiserror::Error;

// ============================================================================
// Acquisition Errors (collaborative contexts)
// ============================================================================

/// Errors raised while acquiring collaborative contexts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AcquisitionError {
    /// The collaborative store could not be reached or refused the request.
    #[error("collaborative store error: {0}")]
    Store(#[from] StoreError),

    /// A newer acquisition (or a release) happened while this one was in flight.
    #[error("acquisition {generation} superseded by a newer request")]
    Superseded { generation: u64 },

    /// The acquisition was already released.
    #[error("acquisition released")]
    Released,
}

impl AcquisitionError {
    /// Get a static error code string for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Store(e) => e.error_code(),
            Self::Superseded { .. } => "superseded",
            Self::Released => "released",
        }
    }
}

// ============================================================================
// Submission Errors (change flush)
// ============================================================================

/// Errors raised while flushing captured edits. Only ever logged.
#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("submitting operations for {id} failed: {source}")]
    Operations {
        id: RecordId,
        #[source]
        source: StoreError,
    },

    #[error("uploading logo for {id} failed: {source}")]
    Logo {
        id: RecordId,
        #[source]
        source: ResourceError,
    },
}

impl SubmissionError {
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Operations { .. } => "operations",
            Self::Logo { .. } => "logo",
        }
    }
}

// ============================================================================
// Resource Errors (service calls)
// ============================================================================

/// Errors raised by the resource services.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("acquisition error: {0}")]
    Acquisition(#[from] AcquisitionError),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("request rejected: {0}")]
    Rejected(String),
}

impl ResourceError {
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Store(e) => e.error_code(),
            Self::Acquisition(e) => e.error_code(),
            Self::NotFound(_) => "not_found",
            Self::Rejected(_) => "rejected",
        }
    }
}

// ============================================================================
// Hydration Errors (attaching to existing markup)
// ============================================================================

/// Existing markup did not have the expected shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HydrateError {
    #[error("missing element matching `{selector}`")]
    MissingElement { selector: String },

    #[error("element `.{class}` lacks attribute `{attribute}`")]
    MissingAttribute { class: &'static str, attribute: &'static str },

    #[error("element is not a `.{expected}`")]
    WrongComponent { expected: &'static str },

    #[error("unable to match a page view")]
    NoMatchingView,
}

// ============================================================================
// Validation Errors (public submission form)
// ============================================================================

/// Invalid data on the public submission form. Shown inline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),

    #[error("`{0}` is not a valid homepage address")]
    InvalidHomepage(String),

    #[error("`{0}` is not a valid e-mail address")]
    InvalidEmail(String),
}

// ============================================================================
// Transition Errors (controller state machine)
// ============================================================================

/// Errors that abort a state transition. Propagated to the router.
#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("controller `{controller}` has no state `{state}`")]
    UnknownState {
        controller: &'static str,
        state: StateSegment,
    },

    #[error("hydration failed: {0}")]
    Hydrate(#[from] HydrateError),

    #[error("context acquisition failed: {0}")]
    Acquisition(#[from] AcquisitionError),

    #[error("resource call failed: {0}")]
    Resource(#[from] ResourceError),

    #[error("no page view is mounted")]
    NoPageView,
}

impl TransitionError {
    /// Get a static error code string for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownState { .. } => "unknown_state",
            Self::Hydrate(_) => "hydrate",
            Self::Acquisition(e) => e.error_code(),
            Self::Resource(e) => e.error_code(),
            Self::NoPageView => "no_page_view",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_error_codes_bubble_up() {
        let err = TransitionError::from(AcquisitionError::from(StoreError::Unreachable("down".into())));
        assert_eq!(err.error_code(), "unreachable");

        let err = TransitionError::from(AcquisitionError::Superseded { generation: 3 });
        assert_eq!(err.error_code(), "superseded");
    }

    #[test]
    fn messages_name_the_failure() {
        let err = TransitionError::UnknownState {
            controller: "home",
            state: StateSegment::name("bogus"),
        };
        assert_eq!(err.to_string(), "controller `home` has no state `bogus`");

        let err = HydrateError::MissingElement {
            selector: "> .HomePage".into(),
        };
        assert_eq!(err.to_string(), "missing element matching `> .HomePage`");
    }
}
