//! Mechanism for loading and sharing the analysis configuration

use crate::{
    cuts::{self, Cut, CutKind},
    preselect::ObjectPreselection,
    regions::{Region, Skim},
    sink::output_stem,
    Result,
};

use eyre::{bail, ensure, WrapErr};
use serde::Deserialize;

use std::{
    collections::{BTreeMap, BTreeSet},
    fs,
    path::Path,
    path::PathBuf,
};

/// Execution settings
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Directory where the per-chunk outputs and the cutflow report go
    pub output_dir: PathBuf,

    /// Maximal number of events per chunk
    pub chunk_size: usize,
}

/// Input dataset
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Dataset {
    /// NanoAOD-flattened Parquet files of the dataset
    pub files: Vec<PathBuf>,

    /// Whether the dataset is simulation, in which case events carry a
    /// generator weight
    pub is_mc: bool,
}

/// Analysis configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Configuration {
    /// Execution settings
    pub run: RunConfig,

    /// Input datasets, by name
    pub datasets: BTreeMap<String, Dataset>,

    /// Thresholds of the good object selections
    pub object_preselection: ObjectPreselection,

    /// Trigger skim
    #[serde(default)]
    pub skim: Skim,

    /// Cuts which every written event must pass
    pub preselections: Vec<String>,

    /// Analysis categories: region name -> cut names
    pub categories: BTreeMap<String, Vec<String>>,

    /// Cuts defined by this configuration, which take precedence over the
    /// standard cuts of the same name
    #[serde(default)]
    pub cuts: BTreeMap<String, CutKind>,
}
//
impl Configuration {
    /// Load the configuration from a file, check it, and print it out
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config_str = fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read configuration file {}", path.display()))?;
        let config = Self::parse(&config_str)
            .wrap_err_with(|| format!("Invalid configuration file {}", path.display()))?;
        config.print();
        Ok(config)
    }

    /// Parse and check a configuration
    pub fn parse(config_str: &str) -> Result<Self> {
        let config: Self = toml::from_str(config_str)?;
        config.check()?;
        Ok(config)
    }

    /// Check the consistency of the configuration
    fn check(&self) -> Result<()> {
        ensure!(self.run.chunk_size > 0, "Chunks must hold at least one event");
        ensure!(!self.datasets.is_empty(), "Please configure at least one dataset");
        for (name, dataset) in &self.datasets {
            ensure!(!dataset.files.is_empty(), "Dataset {} has no input file", name);
            let mut stems = BTreeSet::new();
            for file in &dataset.files {
                let stem = output_stem(file);
                ensure!(
                    !stems.contains(&stem),
                    "Several files of dataset {} would be written as {}_*_vars.parquet",
                    name,
                    stem
                );
                stems.insert(stem);
            }
        }
        for trigger in &self.skim.triggers {
            ensure!(
                !trigger.starts_with("HLT_"),
                "Trigger paths are named without their HLT_ prefix, got {}",
                trigger
            );
        }

        // Resolving the regions checks every cut reference
        self.preselection_region()?;
        let categories = self.category_regions()?;
        ensure!(
            categories.iter().all(|region| region.name != "preselection"),
            "\"preselection\" is reserved and cannot name a category"
        );
        Ok(())
    }

    /// Resolve a cut name, first among the configured cuts then among the
    /// standard cuts
    pub fn cut(&self, name: &str) -> Result<Cut> {
        if let Some(kind) = self.cuts.get(name) {
            return Ok(Cut::new(name, kind.clone()));
        }
        match cuts::preset(name) {
            Some(kind) => Ok(Cut::new(name, kind)),
            None => bail!(
                "Unknown cut {}, which is neither configured in [cuts] nor a standard cut ({})",
                name,
                cuts::PRESET_NAMES.join(", ")
            ),
        }
    }

    fn region(&self, name: &str, cut_names: &[String]) -> Result<Region> {
        let cuts = cut_names
            .iter()
            .map(|cut| self.cut(cut))
            .collect::<Result<Vec<_>>>()
            .wrap_err_with(|| format!("Invalid cut list of region {}", name))?;
        Ok(Region::new(name, cuts))
    }

    /// Region which every written event belongs to
    pub fn preselection_region(&self) -> Result<Region> {
        self.region("preselection", &self.preselections)
    }

    /// Analysis categories, by name
    pub fn category_regions(&self) -> Result<Vec<Region>> {
        self.categories
            .iter()
            .map(|(name, cut_names)| self.region(name, cut_names))
            .collect()
    }

    /// Display the configuration
    pub fn print(&self) {
        println!("OUTPUT DIR     : {}", self.run.output_dir.display());
        println!("CHUNK SIZE     : {}", self.run.chunk_size);
        for (name, dataset) in &self.datasets {
            println!(
                "DATASET        : {} ({}, {} files)",
                name,
                if dataset.is_mc { "MC" } else { "data" },
                dataset.files.len()
            );
        }
        let presel = &self.object_preselection;
        println!(
            "MUON           : pt > {}, |eta| < {}, iso < {}, {:?}",
            presel.muon.pt, presel.muon.eta, presel.muon.iso, presel.muon.id
        );
        println!(
            "SOFT MUON      : pt > {}, |eta| < {}, iso > {}, {:?}",
            presel.soft_muon.pt, presel.soft_muon.eta, presel.soft_muon.iso, presel.soft_muon.id
        );
        println!(
            "ELECTRON       : pt > {}, |etaSC| < {}, iso < {}, {:?}, gap veto: {}",
            presel.electron.pt,
            presel.electron.eta,
            presel.electron.iso,
            presel.electron.id,
            presel.electron.eta_gap_veto
        );
        println!(
            "JET            : pt > {}, |eta| < {}, jetId >= {}, puId >= {} (pt < {}), dR(lep) > {}",
            presel.jet.pt,
            presel.jet.eta,
            presel.jet.jet_id,
            presel.jet.pu_id,
            presel.jet.pu_id_max_pt,
            presel.jet.dr_lepton
        );
        println!("TRIGGERS       : {}", self.skim.triggers.join(" | "));
        println!("PRESELECTIONS  : {}", self.preselections.join(" & "));
        for (name, cuts) in &self.categories {
            println!("CATEGORY       : {} = {}", name, cuts.join(" & "));
        }
    }
}
