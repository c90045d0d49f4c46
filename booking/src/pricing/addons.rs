use std::collections::HashSet;

use crate::model::{AddOn, AddOnId};

/// Selected add-ons for one booking session. Membership only: selecting an
/// add-on twice is the same as selecting it once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddOnSelection {
    selected: HashSet<AddOnId>,
}

impl AddOnSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip membership of `id`. Returns true if it is selected afterwards.
    pub fn toggle(&mut self, id: AddOnId) -> bool {
        if self.selected.remove(&id) {
            false
        } else {
            self.selected.insert(id);
            true
        }
    }

    pub fn contains(&self, id: &AddOnId) -> bool {
        self.selected.contains(id)
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    /// Selected ids in a stable order.
    pub fn ids(&self) -> Vec<AddOnId> {
        let mut ids: Vec<AddOnId> = self.selected.iter().copied().collect();
        ids.sort();
        ids
    }

    /// Catalog entries that are selected, in catalog order. Ids missing from
    /// the catalog are ignored.
    pub fn resolve(&self, catalog: &[AddOn]) -> Vec<AddOn> {
        catalog
            .iter()
            .filter(|a| self.selected.contains(&a.id))
            .cloned()
            .collect()
    }
}
