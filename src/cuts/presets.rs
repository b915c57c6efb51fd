//! Standard cuts of the W+c analysis, available by name

use super::{
    CtagParams, CountParams, CutKind, DeltaPhiJetMetParams, DielectronBtvParams, DijetPtParams,
    DileptonMassParams, DileptonParams, DileptonVetoParams, DimuonBtvParams, LeptonFlavour,
    LeptonMetParams, MassWindow, MaxRatioParams, MetTwoJetsParams, MinCountParams,
    MinRatioParams, MultiplicityParams, MuonInJetParams, QcdVetoParams, TransverseMassParams,
    TwoLepTwoJetsParams, WLnuParams,
};

/// Names of the standard cuts
pub const PRESET_NAMES: &[&str] = &[
    "passthrough",
    "mumu",
    "ee",
    "two_jets",
    "dilepton",
    "ll_2j",
    "mumu_2j",
    "ee_2j",
    "onelep_plus_met",
    "lep_met_2jets",
    "met_2jets_0lep",
    "wlnu_plus_2j",
    "wmunu_plus_2j",
    "welnu_plus_2j",
    "ctag",
    "dijet_pt_cut",
    "jet_met_dphi_cut",
    "mujetselbtv",
    "jetselbtv",
    "reqmuon",
    "reqsoftmuon",
    "ptratiobtv",
    "qcdvetoratio",
    "qcdveto",
    "dimubtv",
    "dielebtv",
    "req_dilepveto",
    "req_dilepmass",
    "req_mtw",
];

const Z_WINDOW: MassWindow = MassWindow {
    low: 60.,
    high: 120.,
};

const BOOSTED_Z_WINDOW: MassWindow = MassWindow {
    low: 70.,
    high: 120.,
};

const DIMUON_BTV: DimuonBtvParams = DimuonBtvParams {
    pt: 12.,
    eta: 2.4,
    iso: 0.15,
};

const DIELECTRON_BTV: DielectronBtvParams = DielectronBtvParams { pt: 12. };

fn two_lep_two_jets(lep_flav: LeptonFlavour) -> CutKind {
    CutKind::TwoLepTwoJets(TwoLepTwoJetsParams {
        lep_flav,
        pt_dilep: 60.,
        mll: BOOSTED_Z_WINDOW,
    })
}

fn w_lnu_two_jets(lep_flav: LeptonFlavour) -> CutKind {
    CutKind::WLnuTwoJets(WLnuParams {
        lep_flav,
        pt_w: 100.,
    })
}

/// Look up a standard cut by name
pub fn preset(name: &str) -> Option<CutKind> {
    let kind = match name {
        "passthrough" => CutKind::Passthrough,
        "mumu" => CutKind::TwoMuons,
        "ee" => CutKind::TwoElectrons,
        "two_jets" => CutKind::TwoJets,
        "dilepton" => CutKind::Dilepton(DileptonParams {
            pt_leading_lep: 33.,
            mll: Z_WINDOW,
        }),
        "ll_2j" => two_lep_two_jets(LeptonFlavour::Either),
        "mumu_2j" => two_lep_two_jets(LeptonFlavour::Muon),
        "ee_2j" => two_lep_two_jets(LeptonFlavour::Electron),
        "onelep_plus_met" => CutKind::OneLeptonPlusMet(LeptonMetParams {
            pt_lep: 33.,
            pt_met: 10.,
        }),
        "lep_met_2jets" => CutKind::LepMetTwoJets(LeptonMetParams {
            pt_lep: 33.,
            pt_met: 10.,
        }),
        "met_2jets_0lep" => CutKind::MetTwoJetsNoLep(MetTwoJetsParams {
            pt_met: 170.,
            pt_jet1: 60.,
            pt_jet2: 35.,
        }),
        "wlnu_plus_2j" => w_lnu_two_jets(LeptonFlavour::Either),
        "wmunu_plus_2j" => w_lnu_two_jets(LeptonFlavour::Muon),
        "welnu_plus_2j" => w_lnu_two_jets(LeptonFlavour::Electron),
        "ctag" => CutKind::Ctag(CtagParams { cvsl: 0.2 }),
        "dijet_pt_cut" => CutKind::DijetPt(DijetPtParams { pt_dijet: 120. }),
        "jet_met_dphi_cut" => CutKind::DeltaPhiJetMet(DeltaPhiJetMetParams {
            jet_met_dphi_cut: 0.6,
        }),
        "mujetselbtv" => CutKind::MuonInJet(MuonInJetParams {
            max_mu_em_fraction: 0.7,
        }),
        "jetselbtv" => CutKind::JetMultiplicity(MultiplicityParams { min: 1, max: 3 }),
        "reqmuon" => CutKind::MuonCount(CountParams { count: 1 }),
        "reqsoftmuon" => CutKind::SoftMuonCount(MinCountParams { min: 1 }),
        "ptratiobtv" => CutKind::SoftMuonJetRatio(MaxRatioParams { max_ratio: 0.4 }),
        "qcdvetoratio" => CutKind::QcdVetoRatio(MinRatioParams { min_ratio: 0.75 }),
        "qcdveto" => CutKind::QcdVeto(QcdVetoParams {
            iso: 0.05,
            dz: 0.01,
            dxy: 0.002,
            sip3d: 2.,
        }),
        "dimubtv" => CutKind::DimuonBtv(DIMUON_BTV),
        "dielebtv" => CutKind::DielectronBtv(DIELECTRON_BTV),
        "req_dilepveto" => CutKind::DileptonVeto(DileptonVetoParams {
            muon: DIMUON_BTV,
            electron: DIELECTRON_BTV,
            count: 2,
        }),
        "req_dilepmass" => CutKind::DileptonMass(DileptonMassParams {
            min_mass: 12.,
            veto: MassWindow {
                low: 80.,
                high: 100.,
            },
        }),
        "req_mtw" => CutKind::TransverseMass(TransverseMassParams { min_mt: 55. }),
        _ => return None,
    };
    Some(kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_listed_preset_exists() {
        for name in PRESET_NAMES {
            assert!(preset(name).is_some(), "Missing preset {}", name);
        }
        assert_eq!(preset("no_such_cut"), None);
    }
}
