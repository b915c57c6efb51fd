//! Processing of one chunk of events, from raw input to written output
//!
//! Each chunk goes through the object preselection, the computation of derived
//! quantities, the trigger skim and preselection cuts, the analysis categories
//! and finally the output sink. Chunks are independent from one another.

use crate::{
    config::Configuration,
    cutflow::Cutflow,
    derived::DerivedVars,
    event::{ChunkMeta, RawEvents},
    preselect::{LeadingPairing, ObjectPreselection, Objects, Pairing},
    regions::{MaskCache, Region, Skim},
    sink::OutputSink,
    source, Result,
};

use eyre::WrapErr;
use log::{debug, warn};

use std::path::PathBuf;

/// Chunk of events, enriched with good objects and derived quantities
#[derive(Clone, Debug)]
pub struct Events {
    /// Events as read from the input
    pub raw: RawEvents,

    /// Good objects
    pub objects: Objects,

    /// Derived quantities
    pub vars: DerivedVars,
}
//
impl Events {
    /// Run the object preselection and compute derived quantities
    pub fn enrich(raw: RawEvents, cfg: &ObjectPreselection, pairing: &impl Pairing) -> Self {
        let objects = Objects::select(&raw, cfg, pairing);
        let vars = DerivedVars::compute(&raw, &objects, pairing);
        Self { raw, objects, vars }
    }

    /// Number of events
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    /// Truth that the chunk has no event
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }
}

/// Per-chunk processor
pub struct Processor<P: Pairing = LeadingPairing> {
    /// Good object selection thresholds
    objects: ObjectPreselection,

    /// Trigger skim
    skim: Skim,

    /// Cuts which every written event passes
    preselection: Region,

    /// Analysis categories
    categories: Vec<Region>,

    /// Where selected events go
    sink: OutputSink,

    /// Lepton pairing policy
    pairing: P,
}
//
impl Processor {
    /// Set up a processor with the default lepton pairing
    pub fn new(cfg: &Configuration) -> Result<Self> {
        Self::with_pairing(cfg, LeadingPairing)
    }
}
//
impl<P: Pairing> Processor<P> {
    /// Set up a processor with a custom lepton pairing
    pub fn with_pairing(cfg: &Configuration, pairing: P) -> Result<Self> {
        Ok(Self {
            objects: cfg.object_preselection.clone(),
            skim: cfg.skim.clone(),
            preselection: cfg.preselection_region()?,
            categories: cfg.category_regions()?,
            sink: OutputSink::new(&cfg.run.output_dir),
            pairing,
        })
    }

    /// Output sink of the processor
    pub fn sink(&self) -> &OutputSink {
        &self.sink
    }

    /// Read, select and write out a chunk of events
    pub fn process(&self, meta: &ChunkMeta) -> Result<Cutflow> {
        let raw = source::read_chunk(meta, &self.skim.triggers)?;
        self.process_events(meta, raw)
            .wrap_err_with(|| format!("Failed to process chunk {}", meta))
    }

    /// Select and write out a chunk of events that was already read
    pub fn process_events(&self, meta: &ChunkMeta, raw: RawEvents) -> Result<Cutflow> {
        raw.check_shape()?;
        let skimmed = self.skim.select(&raw)?;
        let events = Events::enrich(raw, &self.objects, &self.pairing);

        // Cut decisions are shared by the preselection and the categories
        let mut cache = MaskCache::new(&events);
        let preselected = self.preselection.select(&skimmed, &mut cache);
        let categories = self
            .categories
            .iter()
            .map(|region| (region.name.clone(), region.select(&preselected, &mut cache)))
            .collect::<Vec<_>>();

        let num_selected = preselected.count_selected();
        if num_selected == 0 {
            warn!("No event of chunk {} passed the preselection", meta);
        }
        let path: PathBuf = self.sink.write(meta, &events, &preselected, &categories)?;
        debug!(
            "Chunk {}: {} events, {} skimmed, {} preselected, written to {}",
            meta,
            events.len(),
            skimmed.count_selected(),
            num_selected,
            path.display()
        );

        let mut cutflow = Cutflow::new();
        cutflow.record_chunk(
            &meta.dataset,
            &events.raw.gen_weight,
            &skimmed,
            &preselected,
            &categories,
        );
        Ok(cutflow)
    }
}
