//! Per-event selection decisions
//!
//! Cut predicates compute their decision event by event using `Option<bool>`,
//! where `None` means that an input of the decision (leading lepton, dilepton
//! candidate, second jet...) does not exist in that event. Such events must
//! fail the cut, and [`coerce`] is the one place where this happens.

use std::ops::{BitAnd, BitAndAssign};

/// Three-valued per-event decision, as computed by cut predicates
pub type TriMask = Vec<Option<bool>>;

/// Evaluate a three-valued decision for each of `num_events` events
pub fn per_event(num_events: usize, decide: impl FnMut(usize) -> Option<bool>) -> TriMask {
    (0..num_events).map(decide).collect()
}

/// Resolve undefined decisions to rejection
pub fn coerce(tri: TriMask) -> Mask {
    Mask(tri.into_iter().map(|decision| decision.unwrap_or(false)).collect())
}

/// Two-valued per-event decision
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Mask(Vec<bool>);
//
impl Mask {
    /// Mask which selects all of `num_events` events
    pub fn all(num_events: usize) -> Self {
        Self(vec![true; num_events])
    }

    /// Number of events covered by the mask
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Truth that the mask covers no event
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Decision for one event
    pub fn get(&self, event: usize) -> bool {
        self.0[event]
    }

    /// Per-event decisions
    pub fn as_slice(&self) -> &[bool] {
        &self.0
    }

    /// Iterate over per-event decisions
    pub fn iter(&self) -> impl ExactSizeIterator<Item = bool> + '_ {
        self.0.iter().copied()
    }

    /// Number of selected events
    pub fn count_selected(&self) -> usize {
        self.0.iter().filter(|&&keep| keep).count()
    }

    /// Indices of the selected events
    pub fn selected_indices(&self) -> Vec<usize> {
        self.iter()
            .enumerate()
            .filter_map(|(idx, keep)| keep.then_some(idx))
            .collect()
    }
}
//
impl From<Vec<bool>> for Mask {
    fn from(decisions: Vec<bool>) -> Self {
        Self(decisions)
    }
}
//
impl FromIterator<bool> for Mask {
    fn from_iter<I: IntoIterator<Item = bool>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
//
impl BitAndAssign<&Mask> for Mask {
    fn bitand_assign(&mut self, rhs: &Mask) {
        assert_eq!(self.len(), rhs.len(), "Cannot combine masks of different chunks");
        for (lhs, &rhs) in self.0.iter_mut().zip(&rhs.0) {
            *lhs &= rhs;
        }
    }
}
//
impl BitAnd<&Mask> for &Mask {
    type Output = Mask;

    fn bitand(self, rhs: &Mask) -> Mask {
        let mut result = self.clone();
        result &= rhs;
        result
    }
}
