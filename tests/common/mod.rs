//! Toy NanoAOD generation shared by the integration tests

#![allow(dead_code)]

use arrow::{
    array::{ArrayRef, BooleanArray, BooleanBuilder, Float32Array, ListArray, ListBuilder},
    datatypes::{Float32Type, Int32Type},
    record_batch::RecordBatch,
};
use btv_wc::{
    event::{Electron, Jet, Met, Muon, RawEvents},
    jagged::Jagged,
    numeric::{floats::consts::PI, Float},
};
use parquet::{arrow::ArrowWriter, file::properties::WriterProperties};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

use std::{
    collections::BTreeMap,
    fs::File,
    path::{Path, PathBuf},
    sync::Arc,
};

/// Trigger paths fired by the toy events
pub const TRIGGERS: [&str; 2] = ["IsoMu24", "Ele32_WPTight_Gsf"];

/// Reproducible random number generator
pub fn rng(seed: u64) -> Xoshiro256PlusPlus {
    Xoshiro256PlusPlus::seed_from_u64(seed)
}

// NanoAOD stores kinematics in single precision
fn f32_value(rng: &mut impl Rng, range: std::ops::Range<f32>) -> Float {
    rng.gen_range(range) as Float
}

fn toy_muon(rng: &mut impl Rng) -> Muon {
    Muon {
        pt: f32_value(rng, 3.0..80.0),
        eta: f32_value(rng, -2.6..2.6),
        phi: f32_value(rng, -PI as f32..PI as f32),
        mass: 0.10566_f32 as Float,
        charge: if rng.gen_bool(0.5) { 1 } else { -1 },
        tight_id: rng.gen_bool(0.8),
        loose_id: rng.gen_bool(0.95),
        pf_rel_iso04_all: f32_value(rng, 0.0..0.6),
        dxy: f32_value(rng, -0.01..0.01),
        dz: f32_value(rng, -0.03..0.03),
        sip3d: f32_value(rng, 0.0..4.0),
    }
}

fn toy_electron(rng: &mut impl Rng) -> Electron {
    Electron {
        pt: f32_value(rng, 10.0..80.0),
        eta: f32_value(rng, -2.6..2.6),
        phi: f32_value(rng, -PI as f32..PI as f32),
        mass: 0.000511_f32 as Float,
        charge: if rng.gen_bool(0.5) { 1 } else { -1 },
        delta_eta_sc: f32_value(rng, -0.05..0.05),
        pf_rel_iso03_all: f32_value(rng, 0.0..0.5),
        mva_iso_wp80: rng.gen_bool(0.7),
        mva_iso_wp90: rng.gen_bool(0.85),
    }
}

fn toy_jet(rng: &mut impl Rng, num_muons: usize) -> Jet {
    let muon_idx1 = if num_muons > 0 && rng.gen_bool(0.4) {
        rng.gen_range(0..num_muons) as i32
    } else {
        -1
    };
    Jet {
        pt: f32_value(rng, 15.0..200.0),
        eta: f32_value(rng, -2.7..2.7),
        phi: f32_value(rng, -PI as f32..PI as f32),
        mass: f32_value(rng, 2.0..20.0),
        jet_id: [0, 2, 6][rng.gen_range(0..3)],
        pu_id: [0, 4, 7][rng.gen_range(0..3)],
        btag_deep_flav_b: f32_value(rng, 0.0..1.0),
        btag_deep_flav_cvl: f32_value(rng, 0.0..1.0),
        btag_deep_flav_cvb: f32_value(rng, 0.0..1.0),
        muon_idx1,
        muon_idx2: -1,
        mu_ef: f32_value(rng, 0.0..1.0),
        ne_em_ef: f32_value(rng, 0.0..1.0),
    }
}

/// Generate a chunk of toy events
///
/// Collision data events get a unit generator weight, simulated events a
/// weight of either sign.
///
pub fn toy_events(rng: &mut impl Rng, num_events: usize, is_mc: bool) -> RawEvents {
    let mut muons = Vec::with_capacity(num_events);
    let mut electrons = Vec::with_capacity(num_events);
    let mut jets = Vec::with_capacity(num_events);
    let mut puppi_met = Vec::with_capacity(num_events);
    let mut gen_weight = Vec::with_capacity(num_events);
    for _ in 0..num_events {
        let event_muons = (0..rng.gen_range(0..4)).map(|_| toy_muon(rng)).collect::<Vec<_>>();
        let num_muons = event_muons.len();
        muons.push(event_muons);
        electrons.push((0..rng.gen_range(0..3)).map(|_| toy_electron(rng)).collect::<Vec<_>>());
        jets.push(
            (0..rng.gen_range(0..6))
                .map(|_| toy_jet(rng, num_muons))
                .collect::<Vec<_>>(),
        );
        puppi_met.push(Met {
            pt: f32_value(rng, 0.0..150.0),
            phi: f32_value(rng, -PI as f32..PI as f32),
        });
        gen_weight.push(if is_mc && rng.gen_bool(0.2) { -1. } else { 1. });
    }
    let hlt = TRIGGERS
        .iter()
        .map(|&path| {
            let bits = (0..num_events).map(|_| rng.gen_bool(0.7)).collect();
            (path.to_owned(), bits)
        })
        .collect::<BTreeMap<_, _>>();
    RawEvents {
        muons: Jagged::from_rows(muons),
        electrons: Jagged::from_rows(electrons),
        jets: Jagged::from_rows(jets),
        puppi_met,
        gen_weight,
        hlt,
    }
}

fn float_list<T>(objects: &Jagged<T>, field: impl Fn(&T) -> Float) -> ArrayRef {
    Arc::new(ListArray::from_iter_primitive::<Float32Type, _, _>(
        objects
            .rows()
            .map(|row| Some(row.iter().map(|obj| Some(field(obj) as f32)).collect::<Vec<_>>())),
    ))
}

fn int_list<T>(objects: &Jagged<T>, field: impl Fn(&T) -> i32) -> ArrayRef {
    Arc::new(ListArray::from_iter_primitive::<Int32Type, _, _>(
        objects
            .rows()
            .map(|row| Some(row.iter().map(|obj| Some(field(obj))).collect::<Vec<_>>())),
    ))
}

fn bool_list<T>(objects: &Jagged<T>, field: impl Fn(&T) -> bool) -> ArrayRef {
    let mut builder = ListBuilder::new(BooleanBuilder::new());
    for row in objects.rows() {
        for obj in row {
            builder.values().append_value(field(obj));
        }
        builder.append(true);
    }
    Arc::new(builder.finish())
}

fn float_scalar(values: impl Iterator<Item = Float>) -> ArrayRef {
    Arc::new(values.map(|x| x as f32).collect::<Float32Array>())
}

/// Columns of a NanoAOD-flattened table holding some events
///
/// Branches listed in `skipped` are left out.
///
pub fn nanoaod_batch(events: &RawEvents, is_mc: bool, skipped: &[&str]) -> RecordBatch {
    let (mu, el, jet) = (&events.muons, &events.electrons, &events.jets);
    let mut columns: Vec<(String, ArrayRef)> = vec![
        ("Muon_pt".into(), float_list(mu, |m| m.pt)),
        ("Muon_eta".into(), float_list(mu, |m| m.eta)),
        ("Muon_phi".into(), float_list(mu, |m| m.phi)),
        ("Muon_mass".into(), float_list(mu, |m| m.mass)),
        ("Muon_charge".into(), int_list(mu, |m| m.charge)),
        ("Muon_tightId".into(), bool_list(mu, |m| m.tight_id)),
        ("Muon_looseId".into(), bool_list(mu, |m| m.loose_id)),
        ("Muon_pfRelIso04_all".into(), float_list(mu, |m| m.pf_rel_iso04_all)),
        ("Muon_dxy".into(), float_list(mu, |m| m.dxy)),
        ("Muon_dz".into(), float_list(mu, |m| m.dz)),
        ("Muon_sip3d".into(), float_list(mu, |m| m.sip3d)),
        ("Electron_pt".into(), float_list(el, |e| e.pt)),
        ("Electron_eta".into(), float_list(el, |e| e.eta)),
        ("Electron_phi".into(), float_list(el, |e| e.phi)),
        ("Electron_mass".into(), float_list(el, |e| e.mass)),
        ("Electron_charge".into(), int_list(el, |e| e.charge)),
        ("Electron_deltaEtaSC".into(), float_list(el, |e| e.delta_eta_sc)),
        ("Electron_pfRelIso03_all".into(), float_list(el, |e| e.pf_rel_iso03_all)),
        ("Electron_mvaFall17V2Iso_WP80".into(), bool_list(el, |e| e.mva_iso_wp80)),
        ("Electron_mvaFall17V2Iso_WP90".into(), bool_list(el, |e| e.mva_iso_wp90)),
        ("Jet_pt".into(), float_list(jet, |j| j.pt)),
        ("Jet_eta".into(), float_list(jet, |j| j.eta)),
        ("Jet_phi".into(), float_list(jet, |j| j.phi)),
        ("Jet_mass".into(), float_list(jet, |j| j.mass)),
        ("Jet_jetId".into(), int_list(jet, |j| j.jet_id)),
        ("Jet_puId".into(), int_list(jet, |j| j.pu_id)),
        ("Jet_btagDeepFlavB".into(), float_list(jet, |j| j.btag_deep_flav_b)),
        ("Jet_btagDeepFlavCvL".into(), float_list(jet, |j| j.btag_deep_flav_cvl)),
        ("Jet_btagDeepFlavCvB".into(), float_list(jet, |j| j.btag_deep_flav_cvb)),
        ("Jet_muonIdx1".into(), int_list(jet, |j| j.muon_idx1)),
        ("Jet_muonIdx2".into(), int_list(jet, |j| j.muon_idx2)),
        ("Jet_muEF".into(), float_list(jet, |j| j.mu_ef)),
        ("Jet_neEmEF".into(), float_list(jet, |j| j.ne_em_ef)),
        ("PuppiMET_pt".into(), float_scalar(events.puppi_met.iter().map(|m| m.pt))),
        ("PuppiMET_phi".into(), float_scalar(events.puppi_met.iter().map(|m| m.phi))),
    ];
    if is_mc {
        columns.push(("genWeight".into(), float_scalar(events.gen_weight.iter().copied())));
    }
    for (path, bits) in &events.hlt {
        let array: ArrayRef = Arc::new(BooleanArray::from(bits.clone()));
        columns.push((format!("HLT_{}", path), array));
    }
    columns.retain(|(name, _)| !skipped.contains(&name.as_str()));
    RecordBatch::try_from_iter(columns).unwrap()
}

/// Write events to a NanoAOD-flattened Parquet file, with small row groups so
/// that chunks straddle row group boundaries
pub fn write_nanoaod(path: &Path, events: &RawEvents, is_mc: bool, skipped: &[&str]) {
    let batch = nanoaod_batch(events, is_mc, skipped);
    let props = WriterProperties::builder().set_max_row_group_size(7).build();
    let mut writer = ArrowWriter::try_new(File::create(path).unwrap(), batch.schema(), Some(props)).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();
}

/// Configuration of a run over some datasets, with the standard W+c thresholds
///
/// Datasets are given as (name, files, is_mc).
///
pub fn config_toml(output_dir: &Path, datasets: &[(&str, Vec<PathBuf>, bool)], chunk_size: usize) -> String {
    let mut toml = format!(
        r#"
        preselections = ["reqmuon", "jetselbtv", "mujetselbtv", "reqsoftmuon"]

        [run]
        output_dir = '{}'
        chunk_size = {}

        [object_preselection.muon]
        pt = 30
        eta = 2.4
        iso = 0.15
        id = "tightId"

        [object_preselection.soft_muon]
        pt = 3
        eta = 2.4
        iso = 0.2
        id = "looseId"

        [object_preselection.electron]
        pt = 34
        eta = 2.5
        iso = 0.3
        id = "mvaFall17V2Iso_WP80"
        eta_gap_veto = true

        [object_preselection.jet]
        pt = 20
        eta = 2.5
        jet_id = 2
        pu_id = 4
        pu_id_max_pt = 50
        dr_lepton = 0.4

        [skim]
        triggers = ["IsoMu24"]

        [categories]
        inclusive = []
        signal = ["ptratiobtv", "qcdveto", "req_dilepmass", "req_mtw"]
        ctagged = ["ptratiobtv", "ctag"]
        "#,
        output_dir.display(),
        chunk_size
    );
    for (name, files, is_mc) in datasets {
        let files = files
            .iter()
            .map(|path| format!("'{}'", path.display()))
            .collect::<Vec<_>>()
            .join(", ");
        toml.push_str(&format!(
            "\n[datasets.{}]\nfiles = [{}]\nis_mc = {}\n",
            name, files, is_mc
        ));
    }
    toml
}
