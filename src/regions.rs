//! Composition of cuts into selection regions
//!
//! A region is an ordered list of cuts, which selects the events passing all
//! of them on top of some prior selection. Regions of one chunk share a mask
//! cache, so that a cut which appears in several regions is only evaluated
//! once per chunk.

use crate::{
    cuts::Cut,
    event::RawEvents,
    mask::Mask,
    pipeline::Events,
    Result,
};

use eyre::format_err;
use serde::Deserialize;

use std::collections::HashMap;

/// Per-chunk cache of cut decisions, keyed by cut name
pub struct MaskCache<'ev> {
    /// Events of the chunk
    events: &'ev Events,

    /// Decisions of the cuts evaluated so far
    masks: HashMap<String, Mask>,
}
//
impl<'ev> MaskCache<'ev> {
    /// Start caching the cut decisions of a chunk of events
    pub fn new(events: &'ev Events) -> Self {
        Self {
            events,
            masks: HashMap::new(),
        }
    }

    /// Decision of a cut, evaluated on first use
    pub fn mask(&mut self, cut: &Cut) -> &Mask {
        let events = self.events;
        self.masks
            .entry(cut.name.clone())
            .or_insert_with(|| cut.evaluate(events))
    }

    /// Number of distinct cuts evaluated so far
    pub fn num_evaluated(&self) -> usize {
        self.masks.len()
    }
}

/// Named conjunction of cuts
#[derive(Clone, Debug, PartialEq)]
pub struct Region {
    /// Name of the region, as found in the output
    pub name: String,

    /// Cuts which an event must pass to be in the region
    pub cuts: Vec<Cut>,
}
//
impl Region {
    /// Set up a region
    pub fn new(name: impl Into<String>, cuts: Vec<Cut>) -> Self {
        Self {
            name: name.into(),
            cuts,
        }
    }

    /// Select the events of the region among those of a prior selection
    ///
    /// A region without cuts selects exactly the prior selection.
    ///
    pub fn select(&self, prior: &Mask, cache: &mut MaskCache) -> Mask {
        let mut mask = prior.clone();
        for cut in &self.cuts {
            mask &= cache.mask(cut);
        }
        mask
    }
}

/// Trigger skim, applied before any other selection
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Skim {
    /// HLT paths (without the `HLT_` prefix), any of which must have fired
    pub triggers: Vec<String>,
}
//
impl Skim {
    /// Select the events which fired at least one of the triggers
    ///
    /// Without triggers, every event is selected.
    ///
    pub fn select(&self, raw: &RawEvents) -> Result<Mask> {
        if self.triggers.is_empty() {
            return Ok(Mask::all(raw.len()));
        }
        let mut fired = vec![false; raw.len()];
        for path in &self.triggers {
            let bits = raw
                .hlt
                .get(path)
                .ok_or_else(|| format_err!("Trigger path HLT_{} was not read", path))?;
            for (fired, &bit) in fired.iter_mut().zip(bits) {
                *fired |= bit;
            }
        }
        Ok(Mask::from(fired))
    }
}
