//! Properties of the selection which hold for any batch of events

mod common;

use btv_wc::{
    config::Configuration,
    cuts::{self, Cut},
    event::{Candidate, Lepton, Met, RawEvents},
    jagged::Jagged,
    mask::Mask,
    momentum::Kinematics,
    pipeline::Events,
    preselect::{LeadingPairing, ObjectPreselection, Pairing},
    regions::{MaskCache, Region},
};
use rand::{seq::SliceRandom, Rng};

use std::{collections::BTreeMap, path::PathBuf};

fn configuration() -> Configuration {
    let toml = common::config_toml(
        &PathBuf::from("output"),
        &[("WJets", vec![PathBuf::from("wjets.parquet")], true)],
        100,
    );
    Configuration::parse(&toml).unwrap()
}

fn objects() -> ObjectPreselection {
    configuration().object_preselection
}

fn preset(name: &str) -> Cut {
    Cut::new(name, cuts::preset(name).unwrap())
}

/// Events `start..stop` of a chunk
fn slice(raw: &RawEvents, start: usize, stop: usize) -> RawEvents {
    fn rows<T: Clone>(jagged: &Jagged<T>, start: usize, stop: usize) -> Jagged<T> {
        Jagged::from_rows((start..stop).map(|idx| jagged.row(idx).to_vec()))
    }
    RawEvents {
        muons: rows(&raw.muons, start, stop),
        electrons: rows(&raw.electrons, start, stop),
        jets: rows(&raw.jets, start, stop),
        puppi_met: raw.puppi_met[start..stop].to_vec(),
        gen_weight: raw.gen_weight[start..stop].to_vec(),
        hlt: raw
            .hlt
            .iter()
            .map(|(path, bits)| (path.clone(), bits[start..stop].to_vec()))
            .collect(),
    }
}

#[test]
fn no_object_no_selection() {
    let mut rng = common::rng(1);
    let num_events = 50;
    let raw = RawEvents {
        muons: Jagged::empty(num_events),
        electrons: Jagged::empty(num_events),
        jets: Jagged::empty(num_events),
        puppi_met: (0..num_events)
            .map(|_| Met {
                pt: rng.gen_range(0.0..500.0),
                phi: rng.gen_range(-3.0..3.0),
            })
            .collect(),
        gen_weight: vec![1.; num_events],
        hlt: BTreeMap::new(),
    };
    let events = Events::enrich(raw, &objects(), &LeadingPairing);

    for &name in cuts::PRESET_NAMES {
        let mask = preset(name).evaluate(&events);
        assert_eq!(mask.len(), num_events);
        // Only cuts that ask for an absence of objects can select such events
        let expected = matches!(name, "passthrough" | "req_dilepveto");
        assert!(
            mask.iter().all(|keep| keep == expected),
            "Cut {} selected {} events",
            name,
            mask.count_selected()
        );
    }
}

#[test]
fn cut_order_does_not_matter() {
    let mut rng = common::rng(2);
    let events = Events::enrich(
        common::toy_events(&mut rng, 300, true),
        &objects(),
        &LeadingPairing,
    );
    let prior = Mask::from((0..events.len()).map(|_| rng.gen_bool(0.8)).collect::<Vec<_>>());

    let mut names = vec![
        "reqmuon",
        "two_jets",
        "jetselbtv",
        "reqsoftmuon",
        "ptratiobtv",
        "onelep_plus_met",
        "req_mtw",
    ];
    let reference = Region::new("reference", names.iter().map(|&n| preset(n)).collect())
        .select(&prior, &mut MaskCache::new(&events));
    for _ in 0..10 {
        names.shuffle(&mut rng);
        let shuffled = Region::new("shuffled", names.iter().map(|&n| preset(n)).collect());
        assert_eq!(shuffled.select(&prior, &mut MaskCache::new(&events)), reference);
    }
}

#[test]
fn more_cuts_select_fewer_events() {
    let mut rng = common::rng(3);
    let events = Events::enrich(
        common::toy_events(&mut rng, 300, true),
        &objects(),
        &LeadingPairing,
    );
    let prior = Mask::all(events.len());
    let mut cache = MaskCache::new(&events);

    let mut cuts = Vec::new();
    let mut previous = prior.clone();
    for name in ["jetselbtv", "reqmuon", "mujetselbtv", "reqsoftmuon", "ptratiobtv"] {
        cuts.push(preset(name));
        let selected = Region::new("growing", cuts.clone()).select(&prior, &mut cache);
        assert!(selected
            .iter()
            .zip(previous.iter())
            .all(|(now, before)| !now || before));
        previous = selected;
    }
    assert_eq!(cache.num_evaluated(), 5);
}

#[test]
fn chunks_are_independent() {
    let mut rng = common::rng(4);
    let raw = common::toy_events(&mut rng, 120, true);
    let cfg = configuration();
    let regions = cfg.category_regions().unwrap();

    let select = |raw: RawEvents| {
        let events = Events::enrich(raw, &cfg.object_preselection, &LeadingPairing);
        let mut cache = MaskCache::new(&events);
        let prior = cfg.preselection_region().unwrap().select(&Mask::all(events.len()), &mut cache);
        regions
            .iter()
            .map(|region| region.select(&prior, &mut cache).as_slice().to_vec())
            .collect::<Vec<_>>()
    };

    let whole = select(raw.clone());
    let head = select(slice(&raw, 0, 45));
    let tail = select(slice(&raw, 45, 120));
    for ((whole, head), tail) in whole.into_iter().zip(head).zip(tail) {
        assert_eq!(whole, [head, tail].concat());
    }
}

/// Pairing that only builds opposite-charge candidates
struct OppositeCharge;
//
impl Pairing for OppositeCharge {
    fn pair(&self, first: &[Lepton], second: &[Lepton]) -> Option<Candidate> {
        let candidate = LeadingPairing.pair(first, second)?;
        (candidate.leg_charges[0] != candidate.leg_charges[1]).then_some(candidate)
    }
}

#[test]
fn custom_pairing() {
    let mut rng = common::rng(5);
    let raw = common::toy_events(&mut rng, 300, true);
    let leading = Events::enrich(raw.clone(), &objects(), &LeadingPairing);
    let opposite = Events::enrich(raw, &objects(), &OppositeCharge);

    for (lead, opp) in leading.objects.ll.iter().zip(&opposite.objects.ll) {
        match (lead, opp) {
            (Some(lead), Some(opp)) => {
                assert_eq!(opp.charge(), 0);
                assert_eq!(lead.p4, opp.p4);
                assert_eq!(lead.mass(), opp.mass());
            }
            (Some(lead), None) => assert_ne!(lead.charge(), 0),
            (None, opp) => assert!(opp.is_none()),
        }
    }
}
