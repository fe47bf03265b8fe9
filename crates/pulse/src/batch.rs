//! Partitioning rows into annotation-sized batches

/// Largest number of texts the annotation service accepts per call
pub const MAX_BATCH_SIZE: usize = 25;

/// A contiguous slice of the input together with its position in it
#[derive(Debug, Clone)]
pub struct Batch<'a, T> {
  /// Global index of the first item
  pub offset: usize,
  pub items: &'a [T],
}

impl<'a, T> Batch<'a, T> {
  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  /// Pairs each item with its global index
  pub fn indexed(&self) -> impl Iterator<Item = (usize, &'a T)> + 'a {
    let offset = self.offset;
    self.items.iter().enumerate().map(move |(i, item)| (offset + i, item))
  }
}

/// Lazily split `items` into batches of at most [`MAX_BATCH_SIZE`], in order
pub fn partition<T>(items: &[T]) -> impl Iterator<Item = Batch<'_, T>> {
  items
    .chunks(MAX_BATCH_SIZE)
    .enumerate()
    .map(|(n, chunk)| Batch { offset: n * MAX_BATCH_SIZE, items: chunk })
}

pub fn batch_count(len: usize) -> usize {
  len.div_ceil(MAX_BATCH_SIZE)
}
