//! Shape agreement between an object and the elements it must match.
//!
//! The reference side is a template's elements on create and upgrade, and
//! the current object version's elements on modify.

use std::collections::{HashMap, HashSet};

use vstore_types::ElementShape;

use crate::error::{VStoreError, VStoreResult};

/// Every incoming element must have a reference element with the same
/// template code, the same type and a structurally equal constraint set.
/// Incoming template codes must be unique.
pub fn ensure_elements_state<R, I>(reference: &[R], incoming: &[I]) -> VStoreResult<()>
where
    R: ElementShape,
    I: ElementShape,
{
    let by_code: HashMap<_, _> = reference.iter().map(|e| (e.template_code(), e)).collect();
    let mut seen = HashSet::with_capacity(incoming.len());

    for element in incoming {
        let code = element.template_code();
        let Some(expected) = by_code.get(&code) else {
            return Err(VStoreError::Inconsistent(format!(
                "element with template code {code} has no counterpart"
            )));
        };
        if !seen.insert(code) {
            return Err(VStoreError::Inconsistent(format!(
                "template code {code} is used by more than one element"
            )));
        }
        if element.element_type() != expected.element_type() {
            return Err(VStoreError::Inconsistent(format!(
                "element {code} is {}, expected {}",
                element.element_type(),
                expected.element_type()
            )));
        }
        if element.constraints() != expected.constraints() {
            return Err(VStoreError::Inconsistent(format!(
                "constraints of element {code} differ"
            )));
        }
    }
    Ok(())
}
