use bytes::Bytes;

use crate::utils::Fingerprint;

/// Common view of a decoded VPS, SPS or PPS.
pub trait ParameterSet {
    /// Kind for log and error messages, e.g. "SPS"
    const KIND: &'static str;

    /// The set's own id
    fn id(&self) -> u32;

    /// Id of the set this one refers to (SPS for a PPS, VPS for an SPS)
    fn parent_id(&self) -> Option<u32>;

    /// Bytes as received, NAL unit header and emulation prevention included
    fn raw(&self) -> &Bytes;

    /// Fingerprint of [`ParameterSet::raw`]
    fn fingerprint(&self) -> Fingerprint;
}

/// Result of comparing a new parameter set with the stored ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// No set with this id so far
    New,
    /// Same id, different content
    Changed {
        /// The parent id differs from the replaced set's
        parent_changed: bool,
    },
    /// Identical to the stored set
    Unchanged,
}

/// Parameter sets of one kind, unique by id, in order of first appearance.
#[derive(Debug, Clone)]
pub struct ParameterSetList<T> {
    sets: Vec<T>,
}

impl<T> Default for ParameterSetList<T> {
    fn default() -> Self {
        ParameterSetList { sets: Vec::new() }
    }
}

impl<T: ParameterSet> ParameterSetList<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn classify(&self, set: &T) -> Classification {
        match self.get(set.id()) {
            None => Classification::New,
            Some(existing) if existing.fingerprint() == set.fingerprint() => {
                Classification::Unchanged
            }
            Some(existing) => Classification::Changed {
                parent_changed: existing.parent_id() != set.parent_id(),
            },
        }
    }

    /// Appends a new set or replaces the one with the same id in place.
    pub fn upsert(&mut self, set: T) -> Classification {
        let classification = self.classify(&set);
        match classification {
            Classification::New => {
                log::debug!("new {} {} ({})", T::KIND, set.id(), set.fingerprint());
                self.sets.push(set);
            }
            Classification::Changed { .. } => {
                log::debug!("{} {} changed ({})", T::KIND, set.id(), set.fingerprint());
                if let Some(slot) = self.sets.iter_mut().find(|s| s.id() == set.id()) {
                    *slot = set;
                }
            }
            Classification::Unchanged => {}
        }
        classification
    }

    pub fn get(&self, id: u32) -> Option<&T> {
        self.sets.iter().find(|s| s.id() == id)
    }

    pub fn first(&self) -> Option<&T> {
        self.sets.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.sets.iter()
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn clear(&mut self) {
        self.sets.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone)]
    struct Dummy {
        id: u32,
        parent: u32,
        raw: Bytes,
    }

    impl ParameterSet for Dummy {
        const KIND: &'static str = "dummy";

        fn id(&self) -> u32 {
            self.id
        }

        fn parent_id(&self) -> Option<u32> {
            Some(self.parent)
        }

        fn raw(&self) -> &Bytes {
            &self.raw
        }

        fn fingerprint(&self) -> Fingerprint {
            Fingerprint::of(&self.raw)
        }
    }

    fn dummy(id: u32, parent: u32, raw: &'static [u8]) -> Dummy {
        Dummy {
            id,
            parent,
            raw: Bytes::from_static(raw),
        }
    }

    #[test]
    fn test_upsert_classification() {
        let mut list = ParameterSetList::new();
        assert_eq!(list.upsert(dummy(0, 0, b"a")), Classification::New);
        assert_eq!(list.upsert(dummy(1, 0, b"b")), Classification::New);
        assert_eq!(list.upsert(dummy(0, 0, b"a")), Classification::Unchanged);
        assert_eq!(
            list.upsert(dummy(0, 0, b"c")),
            Classification::Changed { parent_changed: false }
        );
        assert_eq!(
            list.upsert(dummy(1, 3, b"d")),
            Classification::Changed { parent_changed: true }
        );

        assert_eq!(list.len(), 2);
        assert_eq!(list.first().map(|s| s.raw.clone()), Some(Bytes::from_static(b"c")));
        assert_eq!(list.get(1).map(|s| s.parent), Some(3));
    }
}
