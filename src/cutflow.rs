//! Accumulation of event yields across chunks
//!
//! Every processed chunk produces a cutflow, which records for its dataset how
//! many events went through each selection stage. Cutflows of different
//! chunks are then merged into the cutflow of the whole run.

use crate::{mask::Mask, numeric::Float};

use num_traits::Zero;

use std::{
    collections::BTreeMap,
    ops::{Add, AddAssign},
};

/// Number of events at some selection stage
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Yield {
    /// Number of events
    pub events: u64,

    /// Sum of the signs of the generator weights of these events
    ///
    /// Negative-weight simulated events subtract from this sum. For collision
    /// data, it is equal to the number of events.
    ///
    pub sum_sign_weights: Float,
}
//
impl Yield {
    /// Yield of the events selected by a mask
    pub fn selected(mask: &Mask, gen_weights: &[Float]) -> Self {
        assert_eq!(mask.len(), gen_weights.len(), "Mask and weights must cover the same events");
        mask.iter()
            .zip(gen_weights)
            .filter(|(keep, _)| *keep)
            .fold(Self::zero(), |acc, (_, &weight)| {
                acc + Self {
                    events: 1,
                    sum_sign_weights: sign(weight),
                }
            })
    }
}
//
impl Add for Yield {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            events: self.events + rhs.events,
            sum_sign_weights: self.sum_sign_weights + rhs.sum_sign_weights,
        }
    }
}
//
impl AddAssign for Yield {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}
//
impl Zero for Yield {
    fn zero() -> Self {
        Self {
            events: 0,
            sum_sign_weights: 0.,
        }
    }

    fn is_zero(&self) -> bool {
        self.events == 0 && self.sum_sign_weights == 0.
    }
}

/// Sign of a generator weight, with zero weights counting for nothing
fn sign(weight: Float) -> Float {
    if weight > 0. {
        1.
    } else if weight < 0. {
        -1.
    } else {
        0.
    }
}

/// Yields of one dataset at each selection stage
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DatasetCutflow {
    /// Number of chunks that were processed
    pub num_chunks: usize,

    /// Every event that was read
    pub processed: Yield,

    /// Events which passed the trigger skim
    pub skim: Yield,

    /// Events which passed the preselection, and were written out
    pub preselection: Yield,

    /// Events in each category
    pub categories: BTreeMap<String, Yield>,
}
//
impl DatasetCutflow {
    /// Merge the yields of another set of chunks into this one
    pub fn merge(&mut self, other: Self) {
        self.num_chunks += other.num_chunks;
        self.processed += other.processed;
        self.skim += other.skim;
        self.preselection += other.preselection;
        for (name, yields) in other.categories {
            *self.categories.entry(name).or_insert_with(Yield::zero) += yields;
        }
    }
}

/// Yields of every processed dataset
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Cutflow {
    datasets: BTreeMap<String, DatasetCutflow>,
}
//
impl Cutflow {
    /// Start with an empty cutflow
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the selection decisions of one chunk of events
    pub fn record_chunk(
        &mut self,
        dataset: &str,
        gen_weights: &[Float],
        skim: &Mask,
        preselection: &Mask,
        categories: &[(String, Mask)],
    ) {
        let chunk = DatasetCutflow {
            num_chunks: 1,
            processed: Yield::selected(&Mask::all(gen_weights.len()), gen_weights),
            skim: Yield::selected(skim, gen_weights),
            preselection: Yield::selected(preselection, gen_weights),
            categories: categories
                .iter()
                .map(|(name, mask)| (name.clone(), Yield::selected(mask, gen_weights)))
                .collect(),
        };
        self.datasets
            .entry(dataset.to_owned())
            .or_default()
            .merge(chunk);
    }

    /// Merge the cutflow of other chunks into this one
    pub fn merge(&mut self, other: Self) {
        for (name, dataset) in other.datasets {
            self.datasets.entry(name).or_default().merge(dataset);
        }
    }

    /// Yields of each dataset, by dataset name
    pub fn datasets(&self) -> &BTreeMap<String, DatasetCutflow> {
        &self.datasets
    }

    /// Total number of events that were processed
    pub fn total_processed(&self) -> u64 {
        self.datasets.values().map(|d| d.processed.events).sum()
    }

    /// Total number of events that were written out
    pub fn total_selected(&self) -> u64 {
        self.datasets.values().map(|d| d.preselection.events).sum()
    }
}
