//! Storage for per-event collections of variable length
//!
//! A jagged collection stores the objects of every event of a chunk in a single
//! flat buffer, along with the offsets at which each event's objects start.
//! This is the same layout as an Arrow list column, which lets chunks be
//! decoded without per-event allocations.

use eyre::ensure;

use crate::Result;

/// Jagged collection: one variable-length row of `T` per event
#[derive(Clone, Debug, PartialEq)]
pub struct Jagged<T> {
    /// Row boundaries, `offsets[i]..offsets[i + 1]` are the objects of event i
    offsets: Vec<usize>,

    /// Flat object storage
    values: Vec<T>,
}
//
impl<T> Jagged<T> {
    /// Build a jagged collection with `num_rows` empty rows
    pub fn empty(num_rows: usize) -> Self {
        Self {
            offsets: vec![0; num_rows + 1],
            values: Vec::new(),
        }
    }

    /// Build a jagged collection from raw offsets and values, checking that
    /// they describe a valid layout
    pub fn from_parts(offsets: Vec<usize>, values: Vec<T>) -> Result<Self> {
        ensure!(!offsets.is_empty(), "Jagged offsets must hold at least one entry");
        ensure!(offsets[0] == 0, "Jagged offsets must start at zero");
        ensure!(
            offsets.windows(2).all(|w| w[0] <= w[1]),
            "Jagged offsets must be monotonically increasing"
        );
        ensure!(
            offsets[offsets.len() - 1] == values.len(),
            "Jagged offsets end at {} but there are {} values",
            offsets[offsets.len() - 1],
            values.len()
        );
        Ok(Self { offsets, values })
    }

    /// Build a jagged collection from per-event rows
    pub fn from_rows<Row: IntoIterator<Item = T>>(rows: impl IntoIterator<Item = Row>) -> Self {
        let mut offsets = vec![0];
        let mut values = Vec::new();
        for row in rows {
            values.extend(row);
            offsets.push(values.len());
        }
        Self { offsets, values }
    }

    /// Number of events
    pub fn num_rows(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Objects of one event
    pub fn row(&self, event: usize) -> &[T] {
        &self.values[self.offsets[event]..self.offsets[event + 1]]
    }

    /// Iterate over the rows of every event
    pub fn rows(&self) -> impl ExactSizeIterator<Item = &[T]> + '_ {
        self.offsets
            .windows(2)
            .map(move |w| &self.values[w[0]..w[1]])
    }

    /// Number of objects in each event
    pub fn counts(&self) -> Vec<usize> {
        self.offsets.windows(2).map(|w| w[1] - w[0]).collect()
    }

    /// First object of each event, if any
    pub fn firsts(&self) -> Vec<Option<&T>> {
        self.rows().map(|row| row.first()).collect()
    }

    /// Evaluate a predicate on every object, keeping the jagged structure
    pub fn mask(&self, pred: impl FnMut(&T) -> bool) -> Jagged<bool> {
        Jagged {
            offsets: self.offsets.clone(),
            values: self.values.iter().map(pred).collect(),
        }
    }

    /// Transform every object, keeping the jagged structure
    pub fn map<U>(&self, f: impl FnMut(&T) -> U) -> Jagged<U> {
        Jagged {
            offsets: self.offsets.clone(),
            values: self.values.iter().map(f).collect(),
        }
    }

    /// Number of objects passing a predicate in each event
    pub fn count_where(&self, mut pred: impl FnMut(&T) -> bool) -> Vec<usize> {
        self.rows()
            .map(|row| row.iter().filter(|obj| pred(obj)).count())
            .collect()
    }
}
//
impl<T: Clone> Jagged<T> {
    /// Keep the objects for which an aligned object mask is true
    pub fn select(&self, mask: &Jagged<bool>) -> Self {
        assert_eq!(
            self.offsets, mask.offsets,
            "Object masks must be aligned with the collection they select"
        );
        Self::from_rows(self.rows().zip(mask.rows()).map(|(row, keep)| {
            row.iter()
                .zip(keep)
                .filter_map(|(obj, &keep)| keep.then(|| obj.clone()))
                .collect::<Vec<_>>()
        }))
    }

    /// Keep the objects which pass a predicate
    pub fn filter(&self, pred: impl FnMut(&T) -> bool) -> Self {
        self.select(&self.mask(pred))
    }

    /// Concatenate the rows of two collections event by event
    pub fn concat(&self, other: &Self) -> Self {
        assert_eq!(self.num_rows(), other.num_rows(), "Cannot concatenate chunks of different sizes");
        Self::from_rows(
            self.rows()
                .zip(other.rows())
                .map(|(a, b)| a.iter().chain(b).cloned().collect::<Vec<_>>()),
        )
    }

    /// Sort the objects of each event (stable sort)
    pub fn sorted_by(&self, mut cmp: impl FnMut(&T, &T) -> std::cmp::Ordering) -> Self {
        Self::from_rows(self.rows().map(|row| {
            let mut row = row.to_vec();
            row.sort_by(&mut cmp);
            row
        }))
    }
}
