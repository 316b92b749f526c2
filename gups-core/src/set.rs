//! Sets of logins
//!
//! [`Set`] is the unit every pool, label list and pick result is expressed in.
//! It is backed by an ordered container so iteration, display and test
//! assertions are lexicographic, but equality only ever looks at membership.

use std::collections::BTreeSet;
use std::fmt;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// An unordered collection of unique identities (logins or label names)
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Set {
    items: BTreeSet<String>,
}

impl Set {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the set has no members
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of members
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Membership test
    pub fn contains(&self, item: &str) -> bool {
        self.items.contains(item)
    }

    /// Add a member, returning `false` if it was already present
    pub fn insert(&mut self, item: impl Into<String>) -> bool {
        self.items.insert(item.into())
    }

    /// Remove a member, returning `false` if it was absent
    pub fn remove(&mut self, item: &str) -> bool {
        self.items.remove(item)
    }

    /// Add every member of `other` to this set
    pub fn extend_from(&mut self, other: &Set) {
        self.items.extend(other.items.iter().cloned());
    }

    /// Members of either set
    pub fn union(&self, other: &Set) -> Set {
        self.items.union(&other.items).cloned().collect()
    }

    /// Members of both sets
    pub fn intersect(&self, other: &Set) -> Set {
        self.items.intersection(&other.items).cloned().collect()
    }

    /// Members of this set that are not in `other`
    pub fn difference(&self, other: &Set) -> Set {
        self.items.difference(&other.items).cloned().collect()
    }

    /// Iterate members in lexicographic order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(String::as_str)
    }

    /// Members in lexicographic order
    pub fn to_vec(&self) -> Vec<String> {
        self.items.iter().cloned().collect()
    }

    /// Choose `min(n, len)` distinct members uniformly at random
    ///
    /// When `n` covers the whole set a copy is returned and `rng` is untouched.
    pub fn sample<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Set {
        if n >= self.items.len() {
            return self.clone();
        }

        let mut members: Vec<&String> = self.items.iter().collect();
        members.shuffle(rng);
        members.into_iter().take(n).cloned().collect()
    }
}

impl fmt::Display for Set {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", item)?;
        }
        write!(f, "]")
    }
}

impl<S: Into<String>> FromIterator<S> for Set {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl<S: Into<String>> Extend<S> for Set {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        self.items.extend(iter.into_iter().map(Into::into));
    }
}

impl IntoIterator for Set {
    type Item = String;
    type IntoIter = std::collections::btree_set::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Set {
    type Item = &'a String;
    type IntoIter = std::collections::btree_set::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<const N: usize> From<[&str; N]> for Set {
    fn from(items: [&str; N]) -> Self {
        items.into_iter().collect()
    }
}
