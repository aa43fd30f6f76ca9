//! Defines a hough forest that jointly classifies feature vectors and
//! casts votes into a per-class hough space.
//! For literature see
//! * J. Gall and V. Lempitsky, "Class-Specific Hough Forests for Object Detection", CVPR 2009
//!
//! The background class always has index 0. It never receives votes and
//! is ignored by the regression part of the splitting criterion.

pub mod options;
pub mod training_data;
pub mod cache;
pub mod node;
pub mod split;
pub mod houghtree;
pub mod vote;
pub mod houghforest;
pub mod persist;

pub use self::options::{Options, EmptyLeafPolicy};
pub use self::training_data::{TrainingData, ExampleSet};
pub use self::vote::{Vote, VoteCallback};
pub use self::houghforest::HoughForest;
pub use self::houghtree::HoughTree;
pub use self::persist::Codec;

use rand::{SeedableRng, XorShiftRng};

/// Index of the background class.
pub const BACKGROUND_CLASS: usize = 0;

/// Creates a reproducible random number generator from a 64 bit seed.
/// Every draw made by the forest (features, thresholds, leaf sampling)
/// comes from a generator passed in by the caller, so the same seed
/// gives the same forest and the same votes.
pub fn seeded_rng(seed: u64) -> XorShiftRng {
    let lo = seed as u32;
    let hi = (seed >> 32) as u32;
    // last word is never zero, xorshift refuses an all zero state
    XorShiftRng::from_seed([lo ^ 0x9E37_79B9, hi ^ 0x85EB_CA6B, lo.rotate_left(16) ^ 0xC2B2_AE35, 0x27D4_EB2F])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_seeded_rng_is_reproducible() {
        let mut a = seeded_rng(17);
        let mut b = seeded_rng(17);
        let mut c = seeded_rng(18);
        let xs: Vec<u32> = (0..8).map(|_| a.next_u32()).collect();
        let ys: Vec<u32> = (0..8).map(|_| b.next_u32()).collect();
        let zs: Vec<u32> = (0..8).map(|_| c.next_u32()).collect();
        assert_eq!(xs, ys);
        assert!(xs != zs);
    }

    #[test]
    fn test_zero_seed_works() {
        let mut rng = seeded_rng(0);
        let _ = rng.gen::<f64>();
    }
}
