//! Object preselection: from raw reconstructed collections to "good" objects
//!
//! Every selection here is a pure function of the raw chunk and of the
//! configured thresholds. Selected collections keep one (possibly empty) row
//! per event, in the order of the input collection unless stated otherwise.

use crate::{
    event::{Candidate, Electron, Jet, Lepton, Muon, RawEvents},
    jagged::Jagged,
    momentum::Kinematics,
    numeric::Float,
};

use prefix_num_ops::real::*;
use serde::Deserialize;

/// Electron supercluster pseudorapidity range of the ECAL barrel-endcap gap
const ECAL_GAP: (Float, Float) = (1.4442, 1.5660);

/// Muon identification working point
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
pub enum MuonId {
    #[serde(rename = "tightId")]
    Tight,
    #[serde(rename = "looseId")]
    Loose,
}
//
impl MuonId {
    fn passes(self, mu: &Muon) -> bool {
        match self {
            MuonId::Tight => mu.tight_id,
            MuonId::Loose => mu.loose_id,
        }
    }
}

/// Electron identification working point
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
pub enum ElectronId {
    #[serde(rename = "mvaFall17V2Iso_WP80")]
    MvaIsoWp80,
    #[serde(rename = "mvaFall17V2Iso_WP90")]
    MvaIsoWp90,
}
//
impl ElectronId {
    fn passes(self, el: &Electron) -> bool {
        match self {
            ElectronId::MvaIsoWp80 => el.mva_iso_wp80,
            ElectronId::MvaIsoWp90 => el.mva_iso_wp90,
        }
    }
}

/// Thresholds of the isolated (prompt) muon selection
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MuonSelection {
    /// Minimal transverse momentum (GeV)
    pub pt: Float,
    /// Maximal |eta|
    pub eta: Float,
    /// Maximal relative isolation
    pub iso: Float,
    /// Identification working point
    pub id: MuonId,
}
//
impl MuonSelection {
    /// Decide whether a muon is a good isolated muon
    pub fn keep(&self, mu: &Muon) -> bool {
        mu.pt > self.pt
            && abs(mu.eta) < self.eta
            && mu.pf_rel_iso04_all < self.iso
            && self.id.passes(mu)
    }
}

/// Thresholds of the soft (non-isolated, in-jet) muon selection
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SoftMuonSelection {
    /// Minimal transverse momentum (GeV)
    pub pt: Float,
    /// Maximal |eta|
    pub eta: Float,
    /// Minimal relative isolation
    pub iso: Float,
    /// Identification working point
    pub id: MuonId,
}
//
impl SoftMuonSelection {
    /// Decide whether a muon is a good soft muon
    pub fn keep(&self, mu: &Muon) -> bool {
        mu.pt > self.pt
            && abs(mu.eta) < self.eta
            && mu.pf_rel_iso04_all > self.iso
            && self.id.passes(mu)
    }
}

/// Thresholds of the electron selection
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ElectronSelection {
    /// Minimal transverse momentum (GeV)
    pub pt: Float,
    /// Maximal supercluster |eta|
    pub eta: Float,
    /// Maximal relative isolation
    pub iso: Float,
    /// Identification working point
    pub id: ElectronId,
    /// Reject electrons in the ECAL barrel-endcap transition region
    pub eta_gap_veto: bool,
}
//
impl ElectronSelection {
    /// Decide whether an electron is a good electron
    pub fn keep(&self, el: &Electron) -> bool {
        let abs_eta_sc = abs(el.eta_sc());
        let in_gap = abs_eta_sc > ECAL_GAP.0 && abs_eta_sc < ECAL_GAP.1;
        el.pt > self.pt
            && abs_eta_sc < self.eta
            && !(self.eta_gap_veto && in_gap)
            && el.pf_rel_iso03_all < self.iso
            && self.id.passes(el)
    }
}

/// Thresholds of the jet selection
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct JetSelection {
    /// Minimal transverse momentum (GeV)
    pub pt: Float,
    /// Maximal |eta|
    pub eta: Float,
    /// Minimal jet identification bitmask
    pub jet_id: i32,
    /// Minimal pile-up identification bitmask
    pub pu_id: i32,
    /// Jets at or above this transverse momentum are exempt from pile-up ID
    pub pu_id_max_pt: Float,
    /// Minimal ΔR to any good lepton
    pub dr_lepton: Float,
}
//
impl JetSelection {
    /// Decide whether a jet is a good jet, given the good leptons of its event
    pub fn keep(&self, jet: &Jet, leptons: &[Lepton]) -> bool {
        let passes_kinematics = jet.pt > self.pt && abs(jet.eta) < self.eta;
        let passes_id = jet.jet_id >= self.jet_id;
        let passes_pileup = jet.pu_id >= self.pu_id || jet.pt >= self.pu_id_max_pt;
        let is_clean = leptons.iter().all(|lep| jet.delta_r(lep) > self.dr_lepton);
        passes_kinematics && passes_id && passes_pileup && is_clean
    }
}

/// Thresholds of all object selections
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ObjectPreselection {
    /// Isolated muons
    pub muon: MuonSelection,
    /// Soft muons
    pub soft_muon: SoftMuonSelection,
    /// Electrons
    pub electron: ElectronSelection,
    /// Jets
    pub jet: JetSelection,
}

/// Select good isolated muons
pub fn select_muons(muons: &Jagged<Muon>, sel: &MuonSelection) -> Jagged<Muon> {
    muons.filter(|mu| sel.keep(mu))
}

/// Select good soft muons
pub fn select_soft_muons(muons: &Jagged<Muon>, sel: &SoftMuonSelection) -> Jagged<Muon> {
    muons.filter(|mu| sel.keep(mu))
}

/// Select good electrons
pub fn select_electrons(electrons: &Jagged<Electron>, sel: &ElectronSelection) -> Jagged<Electron> {
    electrons.filter(|el| sel.keep(el))
}

/// Select good jets, away from the good leptons
///
/// Also returns the object mask that was applied, which is aligned with the
/// input jet collection so that jet indices can be matched back to it.
///
pub fn select_jets(
    jets: &Jagged<Jet>,
    leptons: &Jagged<Lepton>,
    sel: &JetSelection,
) -> (Jagged<Jet>, Jagged<bool>) {
    let mask = Jagged::from_rows(
        jets.rows()
            .zip(leptons.rows())
            .map(|(jets, leptons)| jets.iter().map(|jet| sel.keep(jet, leptons)).collect::<Vec<_>>()),
    );
    (jets.select(&mask), mask)
}

/// Merge good muons and electrons into a single collection, sorted by
/// decreasing transverse momentum
pub fn combine_leptons(muons: &Jagged<Muon>, electrons: &Jagged<Electron>) -> Jagged<Lepton> {
    let muons = muons.map(|mu| Lepton::from(mu));
    let electrons = electrons.map(|el| Lepton::from(el));
    muons
        .concat(&electrons)
        .sorted_by(|a, b| b.pt.total_cmp(&a.pt))
}

/// Kinematic pairing of two lepton collections into a two-lepton candidate
pub trait Pairing {
    /// Build the candidate of one event, if the event has a suitable pair
    fn pair(&self, first: &[Lepton], second: &[Lepton]) -> Option<Candidate>;

    /// Build the candidates of every event of a chunk
    fn pair_events(&self, first: &Jagged<Lepton>, second: &Jagged<Lepton>) -> Vec<Option<Candidate>> {
        first
            .rows()
            .zip(second.rows())
            .map(|(first, second)| self.pair(first, second))
            .collect()
    }
}

/// Pair the leading leptons of an event
///
/// The two leading entries of each collection are considered, those of the
/// first collection coming first. A candidate is only built if exactly two
/// leptons remain, otherwise the event has no candidate.
///
#[derive(Clone, Copy, Debug, Default)]
pub struct LeadingPairing;
//
impl Pairing for LeadingPairing {
    fn pair(&self, first: &[Lepton], second: &[Lepton]) -> Option<Candidate> {
        let legs = first
            .iter()
            .take(2)
            .chain(second.iter().take(2))
            .collect::<Vec<_>>();
        match legs[..] {
            [l1, l2] => Some(Candidate {
                p4: l1.p4() + l2.p4(),
                leg_charges: [l1.charge, l2.charge],
                delta_r: l1.delta_r(l2),
            }),
            _ => None,
        }
    }
}

/// Good objects of a chunk of events
#[derive(Clone, Debug)]
pub struct Objects {
    /// Good isolated muons
    pub muon_good: Jagged<Muon>,
    /// Good soft muons
    pub soft_muon_good: Jagged<Muon>,
    /// Good electrons
    pub electron_good: Jagged<Electron>,
    /// Good muons and electrons, by decreasing transverse momentum
    pub lepton_good: Jagged<Lepton>,
    /// Good jets, in input order
    pub jet_good: Jagged<Jet>,
    /// Good jet mask, aligned with the raw jet collection
    pub jet_good_mask: Jagged<bool>,
    /// Dilepton candidate built from the good muons and electrons
    pub ll: Vec<Option<Candidate>>,
}
//
impl Objects {
    /// Run the object preselection on a chunk of events
    pub fn select(raw: &RawEvents, cfg: &ObjectPreselection, pairing: &impl Pairing) -> Self {
        let muon_good = select_muons(&raw.muons, &cfg.muon);
        let soft_muon_good = select_soft_muons(&raw.muons, &cfg.soft_muon);
        let electron_good = select_electrons(&raw.electrons, &cfg.electron);
        let lepton_good = combine_leptons(&muon_good, &electron_good);
        let ll = pairing.pair_events(
            &muon_good.map(|mu| Lepton::from(mu)),
            &electron_good.map(|el| Lepton::from(el)),
        );
        let (jet_good, jet_good_mask) = select_jets(&raw.jets, &lepton_good, &cfg.jet);
        Self {
            muon_good,
            soft_muon_good,
            electron_good,
            lepton_good,
            jet_good,
            jet_good_mask,
            ll,
        }
    }
}
