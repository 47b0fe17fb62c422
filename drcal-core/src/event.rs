//! Event grouping.

use crate::collection::{HitCollection, McCollection};
use crate::hit::HitSchema;
use std::collections::BTreeMap;

/// One event: a hit collection and, when resolvable, an MC particle
/// collection.
///
/// An absent hit sub-collection at the source is normalized to an empty
/// [`HitCollection`] before the entry is built; an absent particle
/// collection is kept as `None` so the writer can drop the event with a
/// diagnostic.
#[derive(Debug, Clone)]
pub struct EventEntry {
    pub hits: HitCollection,
    pub particles: Option<McCollection>,
}

/// Events keyed by event number, iterated in ascending order.
#[derive(Debug, Clone, Default)]
pub struct EventSet {
    events: BTreeMap<usize, EventEntry>,
}

impl EventSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an event, replacing any previous entry with the same
    /// number.
    pub fn insert(&mut self, number: usize, entry: EventEntry) {
        self.events.insert(number, entry);
    }

    /// Number of events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns true if the set has no events.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Looks up one event.
    #[must_use]
    pub fn get(&self, number: usize) -> Option<&EventEntry> {
        self.events.get(&number)
    }

    /// Iterates events in ascending event-number order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &EventEntry)> {
        self.events.iter().map(|(&n, e)| (n, e))
    }

    /// The hit schema variant of the set, taken from the first event.
    ///
    /// `None` when the set is empty.
    #[must_use]
    pub fn schema(&self) -> Option<HitSchema> {
        self.events.values().next().map(|e| e.hits.schema())
    }
}

impl<'a> IntoIterator for &'a EventSet {
    type Item = (usize, &'a EventEntry);
    type IntoIter = Box<dyn Iterator<Item = (usize, &'a EventEntry)> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(schema: HitSchema) -> EventEntry {
        EventEntry {
            hits: HitCollection::empty(schema),
            particles: Some(McCollection::new(Vec::new())),
        }
    }

    #[test]
    fn test_iteration_is_ascending() {
        let mut set = EventSet::new();
        set.insert(5, entry(HitSchema::ProductionCounts));
        set.insert(1, entry(HitSchema::ProductionCounts));
        set.insert(3, entry(HitSchema::ProductionCounts));

        let order: Vec<usize> = set.iter().map(|(n, _)| n).collect();
        assert_eq!(order, vec![1, 3, 5]);
    }

    #[test]
    fn test_schema_from_first_event() {
        let mut set = EventSet::new();
        assert!(set.schema().is_none());
        set.insert(0, entry(HitSchema::PhotonArrays));
        assert_eq!(set.schema(), Some(HitSchema::PhotonArrays));
    }
}
