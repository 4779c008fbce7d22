//! De-duplication of included resources.

use crate::document::{Linkage, PrimaryData, ResourceObject};
use std::collections::{BTreeMap, HashSet};

/// The resources collected for the `included` member of one compound document.
///
/// Objects are keyed by type and id, so a resource reached along several relationship paths is
/// included once. Inserting the same resource twice keeps the first object, which is harmless
/// because a resource always renders the same way within one document.
#[derive(Clone, Debug, Default)]
pub struct IncludedCache {
    objects: BTreeMap<String, BTreeMap<String, ResourceObject>>,
    /// Resources whose relations have already been walked, with the include paths walked.
    visited: HashSet<(Linkage, Vec<String>)>,
}

impl IncludedCache {
    /// Add a resource object. Objects without an id are ignored.
    pub fn insert(&mut self, object: ResourceObject) {
        let Some(id) = object.id.clone() else {
            return;
        };
        self.objects
            .entry(object.ty.clone())
            .or_default()
            .entry(id)
            .or_insert(object);
    }

    pub fn contains(&self, linkage: &Linkage) -> bool {
        self.objects
            .get(&linkage.ty)
            .map(|ids| ids.contains_key(&linkage.id))
            .unwrap_or(false)
    }

    /// Record that the relations of `linkage` are being walked along `paths`.
    ///
    /// Returns `false` if they already have been, in which case the walk can stop here.
    pub fn visit(&mut self, linkage: Linkage, paths: Vec<String>) -> bool {
        self.visited.insert((linkage, paths))
    }

    /// Drop every resource which also appears in the primary data.
    pub fn remove_primary(&mut self, data: &PrimaryData) {
        for linkage in data.linkages() {
            if let Some(ids) = self.objects.get_mut(&linkage.ty) {
                ids.remove(&linkage.id);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.objects.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The collected objects, sorted by type and then by id.
    pub fn into_sorted(self) -> Vec<ResourceObject> {
        self.objects
            .into_values()
            .flat_map(BTreeMap::into_values)
            .collect()
    }
}
