//! Event-level quantities derived from the good objects
//!
//! Most of these quantities are built from the leading object of some
//! collection, which an event may not have. In that case the quantity is
//! `None` for that event, never an error.

use crate::{
    event::{Candidate, Jet, Lepton, Met, RawEvents},
    jagged::Jagged,
    momentum::{transverse_mass, Kinematics, Momentum},
    numeric::Float,
    preselect::{Objects, Pairing},
};

/// Quantities derived from the good objects of a chunk of events
#[derive(Clone, Debug)]
pub struct DerivedVars {
    // ### OBJECT COUNTS ###
    /// Number of good muons
    pub n_muon_good: Vec<usize>,
    /// Number of good soft muons
    pub n_soft_muon_good: Vec<usize>,
    /// Number of good electrons
    pub n_electron_good: Vec<usize>,
    /// Number of good leptons of either flavour
    pub n_lepton_good: Vec<usize>,
    /// Number of raw (unselected) jets
    pub n_jet: Vec<usize>,
    /// Number of good jets
    pub n_jet_good: Vec<usize>,

    // ### COMPOSITE OBJECTS ###
    /// Missing transverse momentum, as a massless central 4-vector
    pub met: Vec<Momentum>,
    /// Leading good muon + MET
    pub w: Vec<Option<Momentum>>,
    /// Pairing of good muons with soft muons
    pub z: Vec<Option<Candidate>>,
    /// Sum of the two leading good jets
    pub dijet: Vec<Option<Momentum>>,
    /// Good jets by decreasing c-vs-light discriminant
    pub jets_cvsl: Jagged<Jet>,

    // ### SCALARS ###
    /// Leading good muon pt / leading good jet pt
    pub hl_ptratio: Vec<Option<Float>>,
    /// Leading soft muon pt / leading good jet pt
    pub soft_l_ptratio: Vec<Option<Float>>,
    /// ΔR(leading good jet, leading soft muon)
    pub dr_soft_l_jet: Vec<Option<Float>>,
    /// ΔR(leading good jet, leading good muon)
    pub dr_l_jet: Vec<Option<Float>>,
    /// ΔR(leading good muon, leading soft muon)
    pub dr_l_soft_l: Vec<Option<Float>>,
    /// Transverse mass of the leading good muon and MET
    pub mt_w: Vec<Option<Float>>,
    /// |Δφ(leading good jet, MET)|
    pub delta_phi_jet1_met: Vec<Option<Float>>,
    /// |Δφ(subleading good jet, MET)|
    pub delta_phi_jet2_met: Vec<Option<Float>>,
}
//
impl DerivedVars {
    /// Compute the derived quantities of a chunk of events
    pub fn compute(raw: &RawEvents, objects: &Objects, pairing: &impl Pairing) -> Self {
        let met = raw.puppi_met.iter().map(Met::p4).collect::<Vec<_>>();

        let lead_muon = objects.muon_good.firsts();
        let lead_soft_muon = objects.soft_muon_good.firsts();
        let lead_jet = objects.jet_good.firsts();
        let sublead_jet = objects
            .jet_good
            .rows()
            .map(|jets| jets.get(1))
            .collect::<Vec<_>>();

        // Combine two optional per-event inputs
        fn zip_with<A: Copy, B: Copy, T>(
            a: &[Option<A>],
            b: &[Option<B>],
            f: impl Fn(A, B) -> T,
        ) -> Vec<Option<T>> {
            a.iter()
                .zip(b)
                .map(|(&a, &b)| Some(f(a?, b?)))
                .collect()
        }

        // Azimuthal separation of a jet from the MET direction
        fn jet_met_dphi(jets: &[Option<&Jet>], met: &[Met]) -> Vec<Option<Float>> {
            jets.iter()
                .zip(met)
                .map(|(jet, met)| jet.map(|jet| jet.delta_phi(met).abs()))
                .collect()
        }

        let good_muons = objects.muon_good.map(|mu| Lepton::from(mu));
        let soft_muons = objects.soft_muon_good.map(|mu| Lepton::from(mu));

        Self {
            n_muon_good: objects.muon_good.counts(),
            n_soft_muon_good: objects.soft_muon_good.counts(),
            n_electron_good: objects.electron_good.counts(),
            n_lepton_good: objects.lepton_good.counts(),
            n_jet: raw.jets.counts(),
            n_jet_good: objects.jet_good.counts(),

            w: lead_muon
                .iter()
                .zip(&met)
                .map(|(mu, met)| mu.map(|mu| mu.p4() + met))
                .collect(),
            z: pairing.pair_events(&good_muons, &soft_muons),
            dijet: lead_jet
                .iter()
                .zip(&sublead_jet)
                .map(|(&j1, &j2)| Some(j1?.p4() + j2?.p4()))
                .collect(),
            jets_cvsl: objects
                .jet_good
                .sorted_by(|a, b| b.btag_deep_flav_cvl.total_cmp(&a.btag_deep_flav_cvl)),

            hl_ptratio: zip_with(&lead_muon, &lead_jet, |mu, jet| mu.pt / jet.pt),
            soft_l_ptratio: zip_with(&lead_soft_muon, &lead_jet, |mu, jet| mu.pt / jet.pt),
            dr_soft_l_jet: zip_with(&lead_jet, &lead_soft_muon, |jet, mu| jet.delta_r(mu)),
            dr_l_jet: zip_with(&lead_jet, &lead_muon, |jet, mu| jet.delta_r(mu)),
            dr_l_soft_l: zip_with(&lead_muon, &lead_soft_muon, |mu, soft| mu.delta_r(soft)),
            mt_w: lead_muon
                .iter()
                .zip(&raw.puppi_met)
                .map(|(mu, met)| mu.map(|mu| transverse_mass(mu, met)))
                .collect(),
            delta_phi_jet1_met: jet_met_dphi(&lead_jet, &raw.puppi_met),
            delta_phi_jet2_met: jet_met_dphi(&sublead_jet, &raw.puppi_met),

            met,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        event::Muon,
        numeric::floats::consts::PI,
        preselect::{
            tests::{jet, muon, preselection},
            LeadingPairing,
        },
    };
    use approx::assert_relative_eq;
    use std::collections::BTreeMap;

    fn chunk(muons: Vec<Vec<Muon>>, jets: Vec<Vec<Jet>>, met: Vec<Met>) -> RawEvents {
        let n = met.len();
        RawEvents {
            muons: Jagged::from_rows(muons),
            electrons: Jagged::empty(n),
            jets: Jagged::from_rows(jets),
            puppi_met: met,
            gen_weight: vec![1.; n],
            hlt: BTreeMap::new(),
        }
    }

    fn derive(raw: &RawEvents) -> DerivedVars {
        let objects = Objects::select(raw, &preselection(), &LeadingPairing);
        DerivedVars::compute(raw, &objects, &LeadingPairing)
    }

    #[test]
    fn met_is_massless_and_central() {
        let raw = chunk(vec![vec![]], vec![vec![]], vec![Met { pt: 50., phi: 1. }]);
        let vars = derive(&raw);
        assert_relative_eq!(vars.met[0].pt(), 50., epsilon = 1e-9);
        assert_relative_eq!(vars.met[0].phi(), 1., epsilon = 1e-9);
        assert_eq!(vars.met[0].eta(), 0.);
        assert_relative_eq!(vars.met[0].mass(), 0., epsilon = 1e-6);
    }

    #[test]
    fn empty_collections_give_missing_values() {
        let raw = chunk(vec![vec![]], vec![vec![]], vec![Met { pt: 50., phi: 1. }]);
        let vars = derive(&raw);
        assert_eq!(vars.w[0], None);
        assert_eq!(vars.z[0], None);
        assert_eq!(vars.dijet[0], None);
        assert_eq!(vars.hl_ptratio[0], None);
        assert_eq!(vars.soft_l_ptratio[0], None);
        assert_eq!(vars.dr_l_jet[0], None);
        assert_eq!(vars.mt_w[0], None);
        assert_eq!(vars.delta_phi_jet1_met[0], None);
        assert_eq!(vars.n_jet[0], 0);
    }

    #[test]
    fn muon_jet_quantities() {
        let soft = Muon {
            pf_rel_iso04_all: 0.8,
            ..muon(8., 0.3, 2.0, -1)
        };
        let raw = chunk(
            vec![vec![muon(40., 0., 0., 1), soft]],
            vec![vec![jet(80., 0.3, 2.1), jet(30., -1., -1.)]],
            vec![Met { pt: 40., phi: PI }],
        );
        let vars = derive(&raw);
        assert_eq!(vars.n_muon_good[0], 1);
        assert_eq!(vars.n_soft_muon_good[0], 1);
        assert_eq!(vars.n_jet_good[0], 2);
        assert_relative_eq!(vars.hl_ptratio[0].unwrap(), 0.5, epsilon = 1e-12);
        assert_relative_eq!(vars.soft_l_ptratio[0].unwrap(), 0.1, epsilon = 1e-12);
        assert_relative_eq!(vars.dr_soft_l_jet[0].unwrap(), 0.1, epsilon = 1e-9);
        assert_relative_eq!(vars.mt_w[0].unwrap(), 80., epsilon = 1e-9);
        assert_relative_eq!(vars.delta_phi_jet1_met[0].unwrap(), PI - 2.1, epsilon = 1e-9);
        assert_relative_eq!(vars.delta_phi_jet2_met[0].unwrap(), PI - 1., epsilon = 1e-9);

        // W = muon + MET, back to back with equal pt
        let w = vars.w[0].unwrap();
        assert!(w.pt() < 1e-9);

        // Z = good muon + soft muon, with opposite charges
        let z = vars.z[0].as_ref().unwrap();
        assert_eq!(z.charge(), 0);
        assert_eq!(z.leg_charges, [1, -1]);
    }
}
