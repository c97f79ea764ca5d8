//! Link-set computation for a new object version.

use std::collections::HashSet;

use vstore_store::ObjectElementLinkRecord;
use vstore_types::{ElementId, ObjectId, VersionId};

/// Links of a new object version.
///
/// Starts from `previous` retargeted to the new version, replaces or appends
/// a link for every element in `written`, then keeps only the element ids in
/// `keep` when given. Unchanged elements keep their element version id.
pub fn compute_links(
    object_id: ObjectId,
    version_id: &VersionId,
    previous: &[ObjectElementLinkRecord],
    written: &[(ElementId, VersionId)],
    keep: Option<&HashSet<ElementId>>,
) -> Vec<ObjectElementLinkRecord> {
    let link = |element_id: ElementId, element_version_id: VersionId| ObjectElementLinkRecord {
        object_id,
        object_version_id: version_id.clone(),
        element_id,
        element_version_id,
    };

    let mut links: Vec<_> = previous
        .iter()
        .map(|l| link(l.element_id, l.element_version_id.clone()))
        .collect();
    for (element_id, element_version_id) in written {
        match links.iter_mut().find(|l| l.element_id == *element_id) {
            Some(existing) => existing.element_version_id = element_version_id.clone(),
            None => links.push(link(*element_id, element_version_id.clone())),
        }
    }
    if let Some(keep) = keep {
        links.retain(|l| keep.contains(&l.element_id));
    }
    links
}
