//! Fan-out batch splitting.
//!
//! Fan-out message batches never exceed [`MAX_FANOUT_BATCH`] artifact ids,
//! bounding both message size and per-message transaction scope on the
//! consuming side.

use crate::types::DbId;

/// Maximum artifact ids carried by a single fan-out message.
pub const MAX_FANOUT_BATCH: usize = 100;

/// Split an id list into batches of at most `batch_size` ids.
///
/// Produces `ceil(ids.len() / batch_size)` batches; an empty input produces
/// no batches.
pub fn chunk_ids(ids: &[DbId], batch_size: usize) -> Vec<Vec<DbId>> {
    assert!(batch_size > 0, "batch size must be positive");
    ids.chunks(batch_size).map(|chunk| chunk.to_vec()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_produces_no_batches() {
        assert!(chunk_ids(&[], MAX_FANOUT_BATCH).is_empty());
    }

    #[test]
    fn exact_multiple_fills_every_batch() {
        let ids: Vec<DbId> = (1..=200).collect();
        let batches = chunk_ids(&ids, 100);
        assert_eq!(batches.len(), 2);
        assert!(batches.iter().all(|b| b.len() == 100));
    }

    #[test]
    fn remainder_goes_into_a_final_short_batch() {
        let ids: Vec<DbId> = (1..=205).collect();
        let batches = chunk_ids(&ids, 100);
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[2].len(), 5);
        // Order within and across batches is preserved.
        assert_eq!(batches[0][0], 1);
        assert_eq!(batches[2][4], 205);
    }

    #[test]
    fn batch_count_is_ceiling_of_count_over_size() {
        for count in [1usize, 99, 100, 101, 250] {
            let ids: Vec<DbId> = (0..count as DbId).collect();
            let batches = chunk_ids(&ids, 100);
            assert_eq!(batches.len(), count.div_ceil(100));
            assert!(batches.iter().all(|b| b.len() <= 100));
        }
    }
}
