//! Validation for VStore.
//!
//! Three families of checks live here:
//!
//! - [`rules`]: content rules for object element values, dispatched by
//!   element type and evaluated against the constraints for the object's
//!   language.
//! - [`template`]: sanity checks of a template's element descriptors and
//!   their constraint sets.
//! - [`binary`]: metadata, header and content checks of uploaded binaries.
//!
//! All checks are pure functions. Callers decide how to schedule them and
//! aggregate the results.

pub mod binary;
pub mod color;
pub mod composite;
pub mod date;
pub mod error;
pub mod html;
pub mod image;
pub mod link;
pub mod rules;
pub mod template;
pub mod text;

pub use binary::{check_binary, validate_binary_value, ResolvedBinary};
pub use error::{
    merge_errors, BinaryValidationError, ConstraintViolation, ElementValidationError,
    ObjectValidationErrors, TemplateElementValidationKind, TemplateValidationError,
};
pub use rules::{rules_for, validate_element, validate_elements, Rule};
pub use template::TemplateChecker;
pub use text::TextLimits;
