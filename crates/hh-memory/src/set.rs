//! Sorted address sets

use std::cmp::Ordering;

/// Sorted, deduplicated collection of addresses
///
/// Sets are produced by snapshot filters and combined with the algebra
/// below; they are never mutated after construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct AddressSet {
    elements: Vec<u32>,
}

impl AddressSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from addresses in any order
    pub fn from_unsorted(mut elements: Vec<u32>) -> Self {
        elements.sort_unstable();
        elements.dedup();
        Self { elements }
    }

    /// Build a set from addresses already in strictly ascending order
    pub(crate) fn from_sorted(elements: Vec<u32>) -> Self {
        debug_assert!(elements.windows(2).all(|w| w[0] < w[1]));
        Self { elements }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn contains(&self, address: u32) -> bool {
        self.elements.binary_search(&address).is_ok()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, u32> {
        self.elements.iter()
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.elements
    }

    /// Addresses present in either set
    pub fn union(&self, other: &AddressSet) -> AddressSet {
        let (a, b) = (&self.elements, &other.elements);
        let mut result = Vec::with_capacity(a.len() + b.len());
        let (mut i, mut j) = (0, 0);

        while i < a.len() && j < b.len() {
            match a[i].cmp(&b[j]) {
                Ordering::Less => {
                    result.push(a[i]);
                    i += 1;
                }
                Ordering::Greater => {
                    result.push(b[j]);
                    j += 1;
                }
                Ordering::Equal => {
                    result.push(a[i]);
                    i += 1;
                    j += 1;
                }
            }
        }

        result.extend_from_slice(&a[i..]);
        result.extend_from_slice(&b[j..]);
        result.shrink_to_fit();
        AddressSet::from_sorted(result)
    }

    /// Addresses present in both sets
    pub fn intersection(&self, other: &AddressSet) -> AddressSet {
        let (a, b) = (&self.elements, &other.elements);
        let mut result = Vec::with_capacity(a.len().min(b.len()));
        let (mut i, mut j) = (0, 0);

        while i < a.len() && j < b.len() {
            match a[i].cmp(&b[j]) {
                Ordering::Less => i += 1,
                Ordering::Greater => j += 1,
                Ordering::Equal => {
                    result.push(a[i]);
                    i += 1;
                    j += 1;
                }
            }
        }

        result.shrink_to_fit();
        AddressSet::from_sorted(result)
    }

    /// Addresses of this set that are not in `other`
    pub fn difference(&self, other: &AddressSet) -> AddressSet {
        let (a, b) = (&self.elements, &other.elements);
        let mut result = Vec::with_capacity(a.len());
        let (mut i, mut j) = (0, 0);

        while i < a.len() {
            if j == b.len() {
                result.extend_from_slice(&a[i..]);
                break;
            }

            match a[i].cmp(&b[j]) {
                Ordering::Less => {
                    result.push(a[i]);
                    i += 1;
                }
                Ordering::Greater => j += 1,
                Ordering::Equal => {
                    i += 1;
                    j += 1;
                }
            }
        }

        result.shrink_to_fit();
        AddressSet::from_sorted(result)
    }
}

impl FromIterator<u32> for AddressSet {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        Self::from_unsorted(iter.into_iter().collect())
    }
}

impl IntoIterator for AddressSet {
    type Item = u32;
    type IntoIter = std::vec::IntoIter<u32>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.into_iter()
    }
}

impl<'a> IntoIterator for &'a AddressSet {
    type Item = &'a u32;
    type IntoIter = std::slice::Iter<'a, u32>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}
