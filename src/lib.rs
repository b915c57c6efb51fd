//! btv-wc: W+c event selection for BTV commissioning
//!
//!
//! # Introduction (for the physicist)
//!
//! This program selects W+c candidate events from NanoAOD-flattened collision
//! data and simulation. A W boson decaying leptonically is produced together
//! with a charm jet, which is tagged by a soft muon found inside of it. Such
//! events are used to measure the performance of charm-tagging algorithms.
//!
//! Control regions (Z+jets, top pair, QCD-enriched...) are built out of the
//! same library of cuts, so that the selection of any region is only a matter
//! of configuration.
//!
//!
//! # Introduction (for the computer guy)
//!
//! Event files are split into chunks of a bounded number of events, which are
//! processed independently of one another:
//!
//! * read the chunk's columns from its Parquet source file
//! * select good muons, electrons and jets, and compute derived quantities
//! * evaluate the trigger skim, the preselection and the analysis categories,
//!   each of which is a conjunction of named cuts
//! * write the preselected events to one Parquet file per chunk
//! * count the events at each stage in a cutflow
//!
//! Chunk cutflows are then merged into a run-wide report. The chunks may be
//! processed sequentially or on multiple threads.

#![warn(missing_docs)]

pub mod config;
pub mod cutflow;
pub mod cuts;
pub mod derived;
pub mod event;
pub mod jagged;
pub mod mask;
pub mod momentum;
pub mod numeric;
pub mod output;
pub mod pipeline;
pub mod preselect;
pub mod regions;
pub mod scheduling;
pub mod sink;
pub mod source;

/// We'll use eyre's type-erased result type throughout the application
pub type Result<T> = eyre::Result<T>;
