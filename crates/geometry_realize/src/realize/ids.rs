//! Result ids for realized elements.

use rayon::prelude::*;

use crate::noise::hash2;
use crate::threading::{parallel_copy, parallel_fill, ELEMENT_GRAIN_SIZE};

/// Fill the ids of one task's elements.
///
/// With `keep_original_ids` the stored ids are copied verbatim (zero where
/// the source has none). Otherwise every id is `hash2(task_id, local)`,
/// where `local` is the stored id or the element index.
pub(crate) fn create_result_ids(
  keep_original_ids: bool,
  stored_ids: Option<&[i32]>,
  task_id: u32,
  dst: &mut [i32],
) {
  if keep_original_ids {
    match stored_ids {
      Some(stored_ids) => parallel_copy(stored_ids, dst),
      None => parallel_fill(0, dst),
    }
    return;
  }

  dst
    .par_chunks_mut(ELEMENT_GRAIN_SIZE)
    .enumerate()
    .for_each(|(chunk_index, chunk)| {
      let start = chunk_index * ELEMENT_GRAIN_SIZE;
      for (offset, id) in chunk.iter_mut().enumerate() {
        let index = start + offset;
        let local = match stored_ids {
          Some(stored_ids) => stored_ids[index] as u32,
          None => index as u32,
        };
        *id = hash2(task_id, local) as i32;
      }
    });
}
