//! This module defines the physics objects of reconstructed events and the
//! storage of a chunk of events

// Object fields are named after their NanoAOD branches
#![allow(missing_docs)]

use crate::{
    jagged::Jagged,
    momentum::{Kinematics, Momentum},
    numeric::Float,
};

use std::{collections::BTreeMap, fmt::Display, path::PathBuf};

/// Reconstructed muon
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Muon {
    pub pt: Float,
    pub eta: Float,
    pub phi: Float,
    pub mass: Float,
    pub charge: i32,
    /// Passes the tight identification working point
    pub tight_id: bool,
    /// Passes the loose identification working point
    pub loose_id: bool,
    /// Relative PF isolation in a ΔR < 0.4 cone (all charged and neutral)
    pub pf_rel_iso04_all: Float,
    /// Transverse impact parameter (cm)
    pub dxy: Float,
    /// Longitudinal impact parameter (cm)
    pub dz: Float,
    /// 3D impact parameter significance
    pub sip3d: Float,
}

/// Reconstructed electron
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Electron {
    pub pt: Float,
    pub eta: Float,
    pub phi: Float,
    pub mass: Float,
    pub charge: i32,
    /// Difference between supercluster and track pseudorapidity
    pub delta_eta_sc: Float,
    /// Relative PF isolation in a ΔR < 0.3 cone
    pub pf_rel_iso03_all: Float,
    /// Passes the isolated MVA identification at 80% efficiency
    pub mva_iso_wp80: bool,
    /// Passes the isolated MVA identification at 90% efficiency
    pub mva_iso_wp90: bool,
}
//
impl Electron {
    /// Supercluster pseudorapidity
    pub fn eta_sc(&self) -> Float {
        self.eta + self.delta_eta_sc
    }
}

/// Reconstructed AK4 jet
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Jet {
    pub pt: Float,
    pub eta: Float,
    pub phi: Float,
    pub mass: Float,
    /// Jet identification bitmask
    pub jet_id: i32,
    /// Pile-up identification bitmask
    pub pu_id: i32,
    /// DeepJet b-tag discriminant
    pub btag_deep_flav_b: Float,
    /// DeepJet c-vs-light discriminant
    pub btag_deep_flav_cvl: Float,
    /// DeepJet c-vs-b discriminant
    pub btag_deep_flav_cvb: Float,
    /// Index of the first matching muon in the muon collection, -1 if none
    pub muon_idx1: i32,
    /// Index of the second matching muon in the muon collection, -1 if none
    pub muon_idx2: i32,
    /// Muon energy fraction
    pub mu_ef: Float,
    /// Neutral electromagnetic energy fraction
    pub ne_em_ef: Float,
}
//
impl Jet {
    /// Whether a muon was clustered into this jet
    pub fn has_muon(&self) -> bool {
        self.muon_idx1 != -1 || self.muon_idx2 != -1
    }
}

/// Missing transverse momentum
///
/// Its 4-vector representation is massless and central (eta = 0).
///
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Met {
    pub pt: Float,
    pub phi: Float,
}

/// Lepton flavour
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Flavour {
    Muon,
    Electron,
}

/// Lepton of either flavour, as stored in the combined good lepton collection
#[derive(Clone, Debug, PartialEq)]
pub struct Lepton {
    pub pt: Float,
    pub eta: Float,
    pub phi: Float,
    pub mass: Float,
    pub charge: i32,
    pub flavour: Flavour,
}
//
impl From<&Muon> for Lepton {
    fn from(mu: &Muon) -> Self {
        Self {
            pt: mu.pt,
            eta: mu.eta,
            phi: mu.phi,
            mass: mu.mass,
            charge: mu.charge,
            flavour: Flavour::Muon,
        }
    }
}
//
impl From<&Electron> for Lepton {
    fn from(el: &Electron) -> Self {
        Self {
            pt: el.pt,
            eta: el.eta,
            phi: el.phi,
            mass: el.mass,
            charge: el.charge,
            flavour: Flavour::Electron,
        }
    }
}

/// Composite object built from two leptons
#[derive(Clone, Debug, PartialEq)]
pub struct Candidate {
    /// Summed 4-momentum of both legs
    pub p4: Momentum,

    /// Charge of each leg
    pub leg_charges: [i32; 2],

    /// Angular separation between the legs
    pub delta_r: Float,
}
//
impl Candidate {
    /// Total electric charge
    pub fn charge(&self) -> i32 {
        self.leg_charges.iter().sum()
    }
}

macro_rules! impl_stored_kinematics {
    ($($t:ty),*) => {
        $(
            impl Kinematics for $t {
                fn pt(&self) -> Float { self.pt }
                fn eta(&self) -> Float { self.eta }
                fn phi(&self) -> Float { self.phi }
                fn mass(&self) -> Float { self.mass }
            }
        )*
    };
}
impl_stored_kinematics!(Muon, Electron, Jet, Lepton);

impl Kinematics for Met {
    fn pt(&self) -> Float {
        self.pt
    }

    fn eta(&self) -> Float {
        0.
    }

    fn phi(&self) -> Float {
        self.phi
    }

    fn mass(&self) -> Float {
        0.
    }
}

impl Kinematics for Candidate {
    fn pt(&self) -> Float {
        self.p4.pt()
    }

    fn eta(&self) -> Float {
        self.p4.eta()
    }

    fn phi(&self) -> Float {
        self.p4.phi()
    }

    fn mass(&self) -> Float {
        self.p4.mass()
    }

    fn p4(&self) -> Momentum {
        self.p4
    }
}

/// Where a chunk of events comes from
///
/// Chunks are identified by their dataset, source file and entry range, which
/// is also what names their output file.
///
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ChunkMeta {
    /// Name of the dataset the source file belongs to
    pub dataset: String,

    /// Source file
    pub filename: PathBuf,

    /// First entry of the chunk in the source file
    pub entry_start: usize,

    /// One past the last entry of the chunk in the source file
    pub entry_stop: usize,

    /// Whether the dataset is simulation (and thus has generator weights)
    pub is_mc: bool,
}
//
impl ChunkMeta {
    /// Number of entries in the chunk
    pub fn num_entries(&self) -> usize {
        self.entry_stop - self.entry_start
    }
}
//
impl Display for ChunkMeta {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            fmt,
            "{}:{}[{}..{}]",
            self.dataset,
            self.filename.display(),
            self.entry_start,
            self.entry_stop
        )
    }
}

/// Raw reconstructed events of one chunk, as read from the input
#[derive(Clone, Debug, PartialEq)]
pub struct RawEvents {
    pub muons: Jagged<Muon>,
    pub electrons: Jagged<Electron>,
    pub jets: Jagged<Jet>,
    pub puppi_met: Vec<Met>,
    /// Generator weight (1 for collision data)
    pub gen_weight: Vec<Float>,
    /// Trigger decisions, keyed by HLT path name without the `HLT_` prefix
    pub hlt: BTreeMap<String, Vec<bool>>,
}
//
impl RawEvents {
    /// Number of events in the chunk
    pub fn len(&self) -> usize {
        self.puppi_met.len()
    }

    /// Truth that the chunk contains no event
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check that every per-event column covers the same events
    pub fn check_shape(&self) -> crate::Result<()> {
        let n = self.len();
        eyre::ensure!(
            self.muons.num_rows() == n
                && self.electrons.num_rows() == n
                && self.jets.num_rows() == n
                && self.gen_weight.len() == n
                && self.hlt.values().all(|bits| bits.len() == n),
            "Event columns of a chunk must all have {} rows",
            n
        );
        Ok(())
    }
}
