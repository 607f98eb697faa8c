//! Selection of element indices.

use std::ops::Range;

/// A sorted set of element indices, either a contiguous range or an explicit
/// list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IndexMask {
  Range(Range<usize>),
  Indices(Vec<usize>),
}

impl IndexMask {
  /// Mask covering `0..size`.
  #[inline]
  pub fn full(size: usize) -> Self {
    IndexMask::Range(0..size)
  }

  /// Mask over explicit indices. They are sorted and deduplicated.
  pub fn from_indices(mut indices: Vec<usize>) -> Self {
    indices.sort_unstable();
    indices.dedup();
    IndexMask::Indices(indices)
  }

  /// Indices for which `predicate` holds, within `0..size`.
  pub fn from_predicate(size: usize, predicate: impl Fn(usize) -> bool) -> Self {
    IndexMask::Indices((0..size).filter(|&i| predicate(i)).collect())
  }

  #[inline]
  pub fn len(&self) -> usize {
    match self {
      IndexMask::Range(range) => range.len(),
      IndexMask::Indices(indices) => indices.len(),
    }
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// One past the largest index, zero when empty.
  pub fn min_array_size(&self) -> usize {
    match self {
      IndexMask::Range(range) => range.end,
      IndexMask::Indices(indices) => indices.last().map_or(0, |last| last + 1),
    }
  }

  /// True when the mask is exactly `0..size`.
  pub fn is_full(&self, size: usize) -> bool {
    match self {
      IndexMask::Range(range) => range.start == 0 && range.end == size,
      IndexMask::Indices(indices) => {
        indices.len() == size && indices.last().map_or(true, |&last| last + 1 == size)
      }
    }
  }

  pub fn iter(&self) -> IndexMaskIter<'_> {
    match self {
      IndexMask::Range(range) => IndexMaskIter::Range(range.clone()),
      IndexMask::Indices(indices) => IndexMaskIter::Indices(indices.iter()),
    }
  }
}

pub enum IndexMaskIter<'a> {
  Range(Range<usize>),
  Indices(std::slice::Iter<'a, usize>),
}

impl Iterator for IndexMaskIter<'_> {
  type Item = usize;

  #[inline]
  fn next(&mut self) -> Option<usize> {
    match self {
      IndexMaskIter::Range(range) => range.next(),
      IndexMaskIter::Indices(iter) => iter.next().copied(),
    }
  }

  fn size_hint(&self) -> (usize, Option<usize>) {
    match self {
      IndexMaskIter::Range(range) => range.size_hint(),
      IndexMaskIter::Indices(iter) => iter.size_hint(),
    }
  }
}

impl ExactSizeIterator for IndexMaskIter<'_> {}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_full_mask() {
    let mask = IndexMask::full(4);
    assert_eq!(mask.iter().collect::<Vec<_>>(), vec![0, 1, 2, 3]);
    assert!(mask.is_full(4));
    assert!(!mask.is_full(5));
  }

  #[test]
  fn test_indices_are_sorted_and_unique() {
    let mask = IndexMask::from_indices(vec![5, 1, 5, 3]);
    assert_eq!(mask.iter().collect::<Vec<_>>(), vec![1, 3, 5]);
    assert_eq!(mask.min_array_size(), 6);
  }

  #[test]
  fn test_predicate_mask() {
    let mask = IndexMask::from_predicate(6, |i| i % 2 == 0);
    assert_eq!(mask.len(), 3);
    assert_eq!(mask.iter().collect::<Vec<_>>(), vec![0, 2, 4]);
  }
}
