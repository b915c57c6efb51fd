//! Mechanism to apply cuts to preselected events
//!
//! A cut is a named, parameterized predicate over an enriched chunk of events,
//! which yields one decision per event. Predicates are written in terms of
//! three-valued decisions (see `mask`) and every cut goes through the same
//! coercion step before its decision is handed out.

// Cut parameters are named after their configuration keys
#![allow(missing_docs)]

mod predicates;
mod presets;

pub use self::presets::{preset, PRESET_NAMES};

use crate::{
    mask::{coerce, Mask, TriMask},
    numeric::Float,
    pipeline::Events,
};

use serde::Deserialize;

/// Which lepton flavours a combinatorial cut should consider
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
pub enum LeptonFlavour {
    /// Muons only
    #[serde(rename = "mu", alias = "muon")]
    Muon,
    /// Electrons only
    #[serde(rename = "el", alias = "electron")]
    Electron,
    /// Muons or electrons
    #[serde(rename = "both", alias = "either")]
    Either,
}

/// Open mass interval (GeV)
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MassWindow {
    pub low: Float,
    pub high: Float,
}
//
impl MassWindow {
    /// Truth that a mass lies strictly inside the window
    pub fn contains(&self, mass: Float) -> bool {
        mass > self.low && mass < self.high
    }
}

/// Same-flavour opposite-sign dilepton on the Z peak
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DileptonParams {
    /// Minimal leading lepton pt
    pub pt_leading_lep: Float,
    /// Dilepton mass window
    pub mll: MassWindow,
}

/// Two leptons of the requested flavour and two jets
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TwoLepTwoJetsParams {
    pub lep_flav: LeptonFlavour,
    /// Minimal dilepton pt
    pub pt_dilep: Float,
    /// Dilepton mass window
    pub mll: MassWindow,
}

/// Exactly one lepton and MET
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LeptonMetParams {
    /// Minimal lepton pt
    pub pt_lep: Float,
    /// Minimal MET
    pub pt_met: Float,
}

/// MET, two jets and no lepton
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MetTwoJetsParams {
    pub pt_met: Float,
    /// Minimal leading jet pt
    pub pt_jet1: Float,
    /// Minimal subleading jet pt
    pub pt_jet2: Float,
}

/// Leptonic W recoiling against two jets
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct WLnuParams {
    pub lep_flav: LeptonFlavour,
    /// Minimal pt of the leading lepton + MET system
    pub pt_w: Float,
}

/// Leading c-vs-light jet discriminant
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CtagParams {
    /// Minimal DeepJet CvsL score of the most c-like good jet
    pub cvsl: Float,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DijetPtParams {
    pub pt_dijet: Float,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DeltaPhiJetMetParams {
    /// Minimal |Δφ| between each of the two leading jets and MET
    pub jet_met_dphi_cut: Float,
}

/// Good jet with a clustered muon
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MuonInJetParams {
    /// Maximal muon + neutral electromagnetic energy fraction of the jet
    pub max_mu_em_fraction: Float,
}

/// Inclusive range of object multiplicities
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MultiplicityParams {
    pub min: usize,
    pub max: usize,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CountParams {
    /// Required exact multiplicity
    pub count: usize,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MinCountParams {
    /// Required minimal multiplicity
    pub min: usize,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MaxRatioParams {
    /// Exclusive upper bound on the pt ratio
    pub max_ratio: Float,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MinRatioParams {
    /// Exclusive lower bound on the pt ratio
    pub min_ratio: Float,
}

/// Prompt, well-isolated leading muon
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct QcdVetoParams {
    /// Maximal relative isolation
    pub iso: Float,
    /// Maximal |dz| (cm)
    pub dz: Float,
    /// Maximal |dxy| (cm)
    pub dxy: Float,
    /// Maximal 3D impact parameter significance
    pub sip3d: Float,
}

/// Muon quality used by the dimuon selection and veto
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DimuonBtvParams {
    pub pt: Float,
    pub eta: Float,
    /// Maximal relative isolation (inclusive)
    pub iso: Float,
}

/// Electron quality used by the dielectron selection and veto
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DielectronBtvParams {
    pub pt: Float,
}

/// Veto on a given number of dilepton-quality leptons
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DileptonVetoParams {
    pub muon: DimuonBtvParams,
    pub electron: DielectronBtvParams,
    /// Events with exactly this many qualifying leptons are rejected
    pub count: usize,
}

/// Mass of the leading muon + leading soft muon system
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DileptonMassParams {
    /// Exclusive lower bound
    pub min_mass: Float,
    /// Resonance band which is rejected
    pub veto: MassWindow,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TransverseMassParams {
    /// Exclusive lower bound on the W transverse mass
    pub min_mt: Float,
}

/// Selection criterion of a cut, along with its parameters
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(tag = "function", rename_all = "snake_case")]
pub enum CutKind {
    /// Selects every event
    Passthrough,
    /// At least two good muons
    TwoMuons,
    /// At least two good electrons
    TwoElectrons,
    /// At least two good jets
    TwoJets,
    Dilepton(DileptonParams),
    TwoLepTwoJets(TwoLepTwoJetsParams),
    OneLeptonPlusMet(LeptonMetParams),
    LepMetTwoJets(LeptonMetParams),
    MetTwoJetsNoLep(MetTwoJetsParams),
    WLnuTwoJets(WLnuParams),
    Ctag(CtagParams),
    DijetPt(DijetPtParams),
    DeltaPhiJetMet(DeltaPhiJetMetParams),
    MuonInJet(MuonInJetParams),
    JetMultiplicity(MultiplicityParams),
    MuonCount(CountParams),
    SoftMuonCount(MinCountParams),
    SoftMuonJetRatio(MaxRatioParams),
    QcdVetoRatio(MinRatioParams),
    QcdVeto(QcdVetoParams),
    DimuonBtv(DimuonBtvParams),
    DielectronBtv(DielectronBtvParams),
    DileptonVeto(DileptonVetoParams),
    DileptonMass(DileptonMassParams),
    TransverseMass(TransverseMassParams),
}
//
impl CutKind {
    /// Compute the three-valued decision of each event
    fn decide(&self, events: &Events) -> TriMask {
        use self::predicates as p;
        match self {
            CutKind::Passthrough => p::passthrough(events),
            CutKind::TwoMuons => p::two_muons(events),
            CutKind::TwoElectrons => p::two_electrons(events),
            CutKind::TwoJets => p::two_jets(events),
            CutKind::Dilepton(params) => p::dilepton(events, params),
            CutKind::TwoLepTwoJets(params) => p::two_lep_two_jets(events, params),
            CutKind::OneLeptonPlusMet(params) => p::one_lepton_plus_met(events, params),
            CutKind::LepMetTwoJets(params) => p::lep_met_two_jets(events, params),
            CutKind::MetTwoJetsNoLep(params) => p::met_two_jets_no_lep(events, params),
            CutKind::WLnuTwoJets(params) => p::w_lnu_two_jets(events, params),
            CutKind::Ctag(params) => p::ctag(events, params),
            CutKind::DijetPt(params) => p::dijet_pt(events, params),
            CutKind::DeltaPhiJetMet(params) => p::delta_phi_jet_met(events, params),
            CutKind::MuonInJet(params) => p::muon_in_jet(events, params),
            CutKind::JetMultiplicity(params) => p::jet_multiplicity(events, params),
            CutKind::MuonCount(params) => p::muon_count(events, params),
            CutKind::SoftMuonCount(params) => p::soft_muon_count(events, params),
            CutKind::SoftMuonJetRatio(params) => p::soft_muon_jet_ratio(events, params),
            CutKind::QcdVetoRatio(params) => p::qcd_veto_ratio(events, params),
            CutKind::QcdVeto(params) => p::qcd_veto(events, params),
            CutKind::DimuonBtv(params) => p::dimuon_btv(events, params),
            CutKind::DielectronBtv(params) => p::dielectron_btv(events, params),
            CutKind::DileptonVeto(params) => p::dilepton_veto(events, params),
            CutKind::DileptonMass(params) => p::dilepton_mass(events, params),
            CutKind::TransverseMass(params) => p::transverse_mass(events, params),
        }
    }
}

/// Named event cut
#[derive(Clone, Debug, PartialEq)]
pub struct Cut {
    /// Name under which regions refer to this cut
    pub name: String,

    /// What the cut selects
    pub kind: CutKind,
}
//
impl Cut {
    /// Set up a named cut
    pub fn new(name: impl Into<String>, kind: CutKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Decide which events of a chunk pass the cut
    ///
    /// Events for which the decision could not be made, because they lack
    /// one of the objects which the cut looks at, are rejected.
    ///
    pub fn evaluate(&self, events: &Events) -> Mask {
        let decisions = self.kind.decide(events);
        debug_assert_eq!(decisions.len(), events.len());
        coerce(decisions)
    }
}
