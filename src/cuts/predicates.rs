//! Event selection predicates
//!
//! Each predicate computes a three-valued decision per event. A predicate
//! yields `None` for events which lack an object it needs to look at (leading
//! lepton, dilepton candidate, second jet...), and these events are rejected
//! when the decision is coerced by `Cut::evaluate`.

use super::{
    CtagParams, CountParams, DeltaPhiJetMetParams, DielectronBtvParams, DijetPtParams,
    DileptonMassParams, DileptonParams, DileptonVetoParams, DimuonBtvParams, LeptonFlavour,
    LeptonMetParams, MaxRatioParams, MetTwoJetsParams, MinCountParams, MinRatioParams,
    MultiplicityParams, MuonInJetParams, QcdVetoParams, TransverseMassParams,
    TwoLepTwoJetsParams, WLnuParams,
};
use crate::{
    event::{Electron, Muon},
    mask::{per_event, TriMask},
    momentum::Kinematics,
    pipeline::Events,
};

use prefix_num_ops::real::*;

pub fn passthrough(ev: &Events) -> TriMask {
    per_event(ev.len(), |_| Some(true))
}

pub fn two_muons(ev: &Events) -> TriMask {
    per_event(ev.len(), |i| Some(ev.vars.n_muon_good[i] >= 2))
}

pub fn two_electrons(ev: &Events) -> TriMask {
    per_event(ev.len(), |i| Some(ev.vars.n_electron_good[i] >= 2))
}

pub fn two_jets(ev: &Events) -> TriMask {
    per_event(ev.len(), |i| Some(ev.vars.n_jet_good[i] >= 2))
}

/// Same-flavour opposite-sign lepton pair within a mass window
pub fn dilepton(ev: &Events, params: &DileptonParams) -> TriMask {
    per_event(ev.len(), |i| {
        let (n_mu, n_el) = (ev.vars.n_muon_good[i], ev.vars.n_electron_good[i]);
        let same_flavour = (n_mu == 2 && n_el == 0) || (n_mu == 0 && n_el == 2);
        let ll = ev.objects.ll[i].as_ref()?;
        let leading = ev.objects.lepton_good.row(i).first()?;
        Some(
            same_flavour
                && ll.charge() == 0
                && leading.pt > params.pt_leading_lep
                && params.mll.contains(ll.mass()),
        )
    })
}

/// Truth that an event has at least `min` good leptons of some flavour
fn has_leptons(ev: &Events, i: usize, flavour: LeptonFlavour, min: usize) -> bool {
    match flavour {
        LeptonFlavour::Muon => ev.vars.n_muon_good[i] >= min,
        LeptonFlavour::Electron => ev.vars.n_electron_good[i] >= min,
        LeptonFlavour::Either => ev.vars.n_lepton_good[i] >= min,
    }
}

/// Boosted dilepton recoiling against at least two jets
pub fn two_lep_two_jets(ev: &Events, params: &TwoLepTwoJetsParams) -> TriMask {
    per_event(ev.len(), |i| {
        let ll = ev.objects.ll[i].as_ref()?;
        Some(
            ev.vars.n_jet_good[i] >= 2
                && has_leptons(ev, i, params.lep_flav, 2)
                && ll.pt() > params.pt_dilep
                && params.mll.contains(ll.mass()),
        )
    })
}

/// Exactly one good lepton and significant MET
pub fn one_lepton_plus_met(ev: &Events, params: &LeptonMetParams) -> TriMask {
    per_event(ev.len(), |i| {
        let leading = ev.objects.lepton_good.row(i).first()?;
        Some(
            ev.vars.n_lepton_good[i] == 1
                && leading.pt > params.pt_lep
                && ev.raw.puppi_met[i].pt > params.pt_met,
        )
    })
}

/// Exactly one good lepton, significant MET and at least two jets
pub fn lep_met_two_jets(ev: &Events, params: &LeptonMetParams) -> TriMask {
    per_event(ev.len(), |i| {
        let leading = ev.objects.lepton_good.row(i).first()?;
        Some(
            ev.vars.n_lepton_good[i] == 1
                && leading.pt > params.pt_lep
                && ev.raw.puppi_met[i].pt > params.pt_met
                && ev.vars.n_jet_good[i] >= 2,
        )
    })
}

/// Large MET, two hard jets and no lepton
pub fn met_two_jets_no_lep(ev: &Events, params: &MetTwoJetsParams) -> TriMask {
    per_event(ev.len(), |i| {
        let jets = ev.objects.jet_good.row(i);
        let leading = jets.first()?;
        let subleading = jets.get(1)?;
        Some(
            ev.vars.n_lepton_good[i] == 0
                && ev.raw.puppi_met[i].pt > params.pt_met
                && ev.vars.n_jet_good[i] >= 2
                && leading.pt > params.pt_jet1
                && subleading.pt > params.pt_jet2,
        )
    })
}

/// Leptonic W candidate with large pt and two jets
pub fn w_lnu_two_jets(ev: &Events, params: &WLnuParams) -> TriMask {
    per_event(ev.len(), |i| {
        let leading = ev.objects.lepton_good.row(i).first()?;
        let w = leading.p4() + ev.vars.met[i];
        let flavour_ok = match params.lep_flav {
            LeptonFlavour::Muon => ev.vars.n_muon_good[i] == 1,
            LeptonFlavour::Electron => ev.vars.n_electron_good[i] == 1,
            LeptonFlavour::Either => true,
        };
        Some(ev.vars.n_jet_good[i] >= 2 && flavour_ok && w.pt() > params.pt_w)
    })
}

/// Most c-like good jet passes a CvsL working point
pub fn ctag(ev: &Events, params: &CtagParams) -> TriMask {
    per_event(ev.len(), |i| {
        let jet = ev.vars.jets_cvsl.row(i).first()?;
        Some(jet.btag_deep_flav_cvl > params.cvsl)
    })
}

pub fn dijet_pt(ev: &Events, params: &DijetPtParams) -> TriMask {
    per_event(ev.len(), |i| {
        let dijet = ev.vars.dijet[i]?;
        Some(ev.vars.n_jet_good[i] >= 2 && dijet.pt() > params.pt_dijet)
    })
}

/// Neither of the two leading jets is aligned with MET
pub fn delta_phi_jet_met(ev: &Events, params: &DeltaPhiJetMetParams) -> TriMask {
    per_event(ev.len(), |i| {
        let dphi1 = ev.vars.delta_phi_jet1_met[i]?;
        let dphi2 = ev.vars.delta_phi_jet2_met[i]?;
        Some(dphi1 > params.jet_met_dphi_cut && dphi2 > params.jet_met_dphi_cut)
    })
}

/// At least one good jet with a clustered muon and a small muon + EM fraction
pub fn muon_in_jet(ev: &Events, params: &MuonInJetParams) -> TriMask {
    let num_jets = ev
        .objects
        .jet_good
        .count_where(|jet| jet.has_muon() && jet.mu_ef + jet.ne_em_ef < params.max_mu_em_fraction);
    per_event(ev.len(), |i| Some(num_jets[i] >= 1))
}

pub fn jet_multiplicity(ev: &Events, params: &MultiplicityParams) -> TriMask {
    per_event(ev.len(), |i| {
        let n = ev.vars.n_jet_good[i];
        Some(n >= params.min && n <= params.max)
    })
}

pub fn muon_count(ev: &Events, params: &CountParams) -> TriMask {
    per_event(ev.len(), |i| Some(ev.vars.n_muon_good[i] == params.count))
}

pub fn soft_muon_count(ev: &Events, params: &MinCountParams) -> TriMask {
    per_event(ev.len(), |i| Some(ev.vars.n_soft_muon_good[i] >= params.min))
}

/// Soft muon carries a small fraction of the leading jet pt
pub fn soft_muon_jet_ratio(ev: &Events, params: &MaxRatioParams) -> TriMask {
    per_event(ev.len(), |i| Some(ev.vars.soft_l_ptratio[i]? < params.max_ratio))
}

/// Isolated muon carries a large fraction of the leading jet pt
pub fn qcd_veto_ratio(ev: &Events, params: &MinRatioParams) -> TriMask {
    per_event(ev.len(), |i| Some(ev.vars.hl_ptratio[i]? > params.min_ratio))
}

/// Leading good muon is isolated and prompt
pub fn qcd_veto(ev: &Events, params: &QcdVetoParams) -> TriMask {
    per_event(ev.len(), |i| {
        let mu = ev.objects.muon_good.row(i).first()?;
        Some(
            mu.pf_rel_iso04_all < params.iso
                && abs(mu.dz) < params.dz
                && abs(mu.dxy) < params.dxy
                && mu.sip3d < params.sip3d,
        )
    })
}

/// Muon quality of the dimuon selection
fn dimuon_btv_muon(mu: &Muon, params: &DimuonBtvParams) -> bool {
    mu.pt > params.pt
        && abs(mu.eta) < params.eta
        && mu.tight_id
        && mu.pf_rel_iso04_all <= params.iso
}

/// Electron quality of the dielectron selection
///
/// Reads as (pt cut AND barrel) OR (endcap AND identification). The pt cut
/// does not apply to endcap electrons, the identification does not apply to
/// barrel electrons, and the endcap window is only checked at positive eta.
fn dielectron_btv_electron(el: &Electron, params: &DielectronBtvParams) -> bool {
    (el.pt > params.pt && abs(el.eta) < 1.4442)
        || ((el.eta < 2.5) && (el.eta > 1.566) && el.mva_iso_wp80)
}

/// Leading good muon has dimuon quality
pub fn dimuon_btv(ev: &Events, params: &DimuonBtvParams) -> TriMask {
    per_event(ev.len(), |i| {
        let mu = ev.objects.muon_good.row(i).first()?;
        Some(dimuon_btv_muon(mu, params))
    })
}

/// Leading good electron has dielectron quality
pub fn dielectron_btv(ev: &Events, params: &DielectronBtvParams) -> TriMask {
    per_event(ev.len(), |i| {
        let el = ev.objects.electron_good.row(i).first()?;
        Some(dielectron_btv_electron(el, params))
    })
}

/// Reject events with exactly `count` dilepton-quality leptons
pub fn dilepton_veto(ev: &Events, params: &DileptonVetoParams) -> TriMask {
    let n_el = ev
        .objects
        .electron_good
        .count_where(|el| dielectron_btv_electron(el, &params.electron));
    let n_mu = ev
        .objects
        .muon_good
        .count_where(|mu| dimuon_btv_muon(mu, &params.muon));
    per_event(ev.len(), |i| Some(n_el[i] + n_mu[i] != params.count))
}

/// Leading muon + leading soft muon mass above threshold and off resonance
pub fn dilepton_mass(ev: &Events, params: &DileptonMassParams) -> TriMask {
    per_event(ev.len(), |i| {
        let mu = ev.objects.muon_good.row(i).first()?;
        let soft = ev.objects.soft_muon_good.row(i).first()?;
        let mass = (mu.p4() + soft.p4()).mass();
        let on_resonance = (params.veto.low..=params.veto.high).contains(&mass);
        Some(mass > params.min_mass && !on_resonance)
    })
}

/// W transverse mass above threshold
pub fn transverse_mass(ev: &Events, params: &TransverseMassParams) -> TriMask {
    per_event(ev.len(), |i| Some(ev.vars.mt_w[i]? > params.min_mt))
}
