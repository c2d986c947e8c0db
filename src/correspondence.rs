use rayon::prelude::*;

use crate::error::Error;

/// Ordered pairs of `(source_index, target_index)` matched by an upstream search.
///
/// Duplicated pairs are allowed and count as many times as they appear.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorrespondenceSet(Vec<(usize, usize)>);

impl CorrespondenceSet {
    pub fn new(pairs: Vec<(usize, usize)>) -> Self {
        Self(pairs)
    }

    /// Matches the point `i` of the source with the point `i` of the target, for `i` in `0..len`.
    pub fn identity(len: usize) -> Self {
        Self((0..len).map(|i| (i, i)).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[(usize, usize)] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, (usize, usize)> {
        self.0.iter()
    }

    /// Checks that the set is not empty and every index is inside its cloud.
    ///
    /// # Arguments
    ///
    /// * `source_len` - Number of points in the source cloud.
    /// * `target_len` - Number of points in the target cloud.
    pub fn validate(&self, source_len: usize, target_len: usize) -> Result<(), Error> {
        if self.is_empty() {
            return Err(Error::EmptyCorrespondenceSet);
        }

        match self
            .0
            .par_iter()
            .enumerate()
            .find_any(|(_, (i, j))| *i >= source_len || *j >= target_len)
        {
            Some((position, (i, j))) => Err(Error::invalid_input(format!(
                "correspondence #{position} ({i}, {j}) out of bounds for clouds of sizes ({source_len}, {target_len})"
            ))),
            None => Ok(()),
        }
    }
}

impl From<Vec<(usize, usize)>> for CorrespondenceSet {
    fn from(pairs: Vec<(usize, usize)>) -> Self {
        Self(pairs)
    }
}

impl FromIterator<(usize, usize)> for CorrespondenceSet {
    fn from_iter<I: IntoIterator<Item = (usize, usize)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a CorrespondenceSet {
    type Item = &'a (usize, usize);
    type IntoIter = std::slice::Iter<'a, (usize, usize)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
