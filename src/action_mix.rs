//! Weighted discrete sampler over operation kinds ("Action Mix").
//!
//! Materializes a length-100 lookup table by repeating each op its weight
//! times, then samples a uniform index. The reference behavior requires
//! `sum(weights) == 100`; constructing with any other sum is a programmer
//! error and fails loudly rather than silently truncating or resampling.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::hash::Hash;

use crate::error::{DriverError, DriverResult};

const TABLE_SIZE: usize = 100;

pub struct ActionMix<T> {
    table: Vec<T>,
    rng: StdRng,
}

impl<T: Clone + Eq + Hash> ActionMix<T> {
    /// Builds the mix from `(op, weight)` pairs. `weights` order is
    /// preserved within each op's run of slots but is otherwise
    /// immaterial to sampling.
    pub fn new(weights: impl IntoIterator<Item = (T, u32)>) -> DriverResult<Self> {
        let mut table = Vec::with_capacity(TABLE_SIZE);
        for (op, weight) in weights {
            for _ in 0..weight {
                table.push(op.clone());
            }
        }
        if table.len() != TABLE_SIZE {
            return Err(DriverError::InvalidWeights(table.len() as u32));
        }
        Ok(Self {
            table,
            rng: StdRng::from_entropy(),
        })
    }

    /// Samples one op uniformly from the length-100 table.
    pub fn next(&mut self) -> T {
        let index = self.rng.gen_range(0..TABLE_SIZE);
        self.table[index].clone()
    }
}
