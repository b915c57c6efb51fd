//! Reading chunks of events from NanoAOD-flattened Parquet files
//!
//! Input files hold one row per event. Object collections are stored as one
//! list column per object field (`Muon_pt`, `Muon_eta`...), event quantities
//! as scalar columns (`PuppiMET_pt`, `genWeight`, `HLT_IsoMu24`...). Numeric
//! columns of any integer, floating-point or boolean type are accepted, and
//! flags are considered set when they exceed one half.

use crate::{
    config::Dataset,
    event::{ChunkMeta, Electron, Jet, Met, Muon, RawEvents},
    jagged::Jagged,
    numeric::Float,
    Result,
};

use arrow::{
    array::{Array, ArrayRef, AsArray},
    compute::{cast, concat_batches},
    datatypes::{DataType, Float64Type},
    record_batch::{RecordBatch, RecordBatchReader},
};
use eyre::{bail, ensure, format_err, WrapErr};
use log::{debug, warn};
use parquet::arrow::{arrow_reader::ParquetRecordBatchReaderBuilder, ProjectionMask};

use std::{collections::BTreeMap, fs::File, path::Path};

const MUON_FIELDS: [&str; 11] = [
    "pt",
    "eta",
    "phi",
    "mass",
    "charge",
    "tightId",
    "looseId",
    "pfRelIso04_all",
    "dxy",
    "dz",
    "sip3d",
];

const ELECTRON_FIELDS: [&str; 9] = [
    "pt",
    "eta",
    "phi",
    "mass",
    "charge",
    "deltaEtaSC",
    "pfRelIso03_all",
    "mvaFall17V2Iso_WP80",
    "mvaFall17V2Iso_WP90",
];

const JET_FIELDS: [&str; 13] = [
    "pt",
    "eta",
    "phi",
    "mass",
    "jetId",
    "puId",
    "btagDeepFlavB",
    "btagDeepFlavCvL",
    "btagDeepFlavCvB",
    "muonIdx1",
    "muonIdx2",
    "muEF",
    "neEmEF",
];

/// Interpret a numeric flag
fn flag(value: Float) -> bool {
    value > 0.5
}

/// Split `num_entries` entries into `[start, stop)` ranges of at most
/// `chunk_size` entries
pub fn chunk_ranges(num_entries: usize, chunk_size: usize) -> Vec<(usize, usize)> {
    assert!(chunk_size > 0, "Chunks must hold at least one entry");
    (0..num_entries)
        .step_by(chunk_size)
        .map(|start| (start, (start + chunk_size).min(num_entries)))
        .collect()
}

/// Number of events in a Parquet file, from its metadata
pub fn num_entries(path: &Path) -> Result<usize> {
    let file = File::open(path).wrap_err_with(|| format!("Failed to open {}", path.display()))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .wrap_err_with(|| format!("Failed to read Parquet metadata of {}", path.display()))?;
    let num_rows = builder.metadata().file_metadata().num_rows();
    Ok(usize::try_from(num_rows)?)
}

/// Split the files of every dataset into chunks of at most `chunk_size` events
pub fn plan_chunks(datasets: &BTreeMap<String, Dataset>, chunk_size: usize) -> Result<Vec<ChunkMeta>> {
    let mut chunks = Vec::new();
    for (name, dataset) in datasets {
        for filename in &dataset.files {
            let entries = num_entries(filename)?;
            if entries == 0 {
                warn!("Input file {} of dataset {} holds no event", filename.display(), name);
            }
            chunks.extend(chunk_ranges(entries, chunk_size).into_iter().map(
                |(entry_start, entry_stop)| ChunkMeta {
                    dataset: name.clone(),
                    filename: filename.clone(),
                    entry_start,
                    entry_stop,
                    is_mc: dataset.is_mc,
                },
            ));
        }
    }
    Ok(chunks)
}

/// Names of the input columns needed to process a chunk
pub fn required_branches(is_mc: bool, triggers: &[String]) -> Vec<String> {
    let collection = |prefix: &str, fields: &[&str]| {
        fields
            .iter()
            .map(|field| format!("{}_{}", prefix, field))
            .collect::<Vec<_>>()
    };
    let mut branches = collection("Muon", &MUON_FIELDS);
    branches.extend(collection("Electron", &ELECTRON_FIELDS));
    branches.extend(collection("Jet", &JET_FIELDS));
    branches.extend(collection("PuppiMET", &["pt", "phi"]));
    if is_mc {
        branches.push("genWeight".to_owned());
    }
    branches.extend(triggers.iter().map(|path| format!("HLT_{}", path)));
    branches
}

/// Read a chunk of events, along with the decisions of some triggers
pub fn read_chunk(meta: &ChunkMeta, triggers: &[String]) -> Result<RawEvents> {
    let batch = read_batch(meta, &required_branches(meta.is_mc, triggers))
        .wrap_err_with(|| format!("Failed to read chunk {}", meta))?;
    let raw = decode(&batch, meta.is_mc, triggers)
        .wrap_err_with(|| format!("Failed to decode chunk {}", meta))?;
    ensure!(
        raw.len() == meta.num_entries(),
        "Expected {} events in chunk {}, but read {}",
        meta.num_entries(),
        meta,
        raw.len()
    );
    Ok(raw)
}

/// Read the requested columns of the entry range of a chunk
fn read_batch(meta: &ChunkMeta, branches: &[String]) -> Result<RecordBatch> {
    let file = File::open(&meta.filename)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;

    let schema = builder.schema().clone();
    let roots = branches
        .iter()
        .map(|name| {
            schema
                .index_of(name)
                .map_err(|_| format_err!("Input has no branch named {}", name))
        })
        .collect::<Result<Vec<_>>>()?;
    let projection = ProjectionMask::roots(builder.parquet_schema(), roots);

    let reader = builder
        .with_projection(projection)
        .with_offset(meta.entry_start)
        .with_limit(meta.num_entries())
        .build()?;
    let schema = reader.schema();
    let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
    debug!("Read {} record batches for chunk {}", batches.len(), meta);
    Ok(concat_batches(&schema, &batches)?)
}

/// Fetch a column by name
fn column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a ArrayRef> {
    batch
        .column_by_name(name)
        .ok_or_else(|| format_err!("Input has no branch named {}", name))
}

/// Convert a numeric array to floating-point values
fn to_floats(array: &dyn Array, name: &str) -> Result<Vec<Float>> {
    ensure!(
        array.null_count() == 0,
        "Branch {} has {} missing values",
        name,
        array.null_count()
    );
    let array = cast(array, &DataType::Float64)
        .wrap_err_with(|| format!("Branch {} is not numeric", name))?;
    Ok(array.as_primitive::<Float64Type>().values().to_vec())
}

/// Read a per-event scalar branch
fn scalar(batch: &RecordBatch, name: &str) -> Result<Vec<Float>> {
    to_floats(column(batch, name)?.as_ref(), name)
}

/// Read a per-object list branch into offsets (starting at 0) and values
fn list(batch: &RecordBatch, name: &str) -> Result<(Vec<usize>, Vec<Float>)> {
    let array = column(batch, name)?;
    let (offsets, values) = match array.data_type() {
        DataType::List(_) => {
            let list = array.as_list::<i32>();
            let offsets = list.value_offsets().iter().map(|&o| o as usize).collect::<Vec<_>>();
            (offsets, list.values().clone())
        }
        DataType::LargeList(_) => {
            let list = array.as_list::<i64>();
            let offsets = list.value_offsets().iter().map(|&o| o as usize).collect::<Vec<_>>();
            (offsets, list.values().clone())
        }
        other => bail!("Branch {} should be a list, but has type {}", name, other),
    };
    let (first, last) = (offsets[0], offsets[offsets.len() - 1]);
    let values = to_floats(values.slice(first, last - first).as_ref(), name)?;
    let offsets = offsets.into_iter().map(|o| o - first).collect();
    Ok((offsets, values))
}

/// List branches of one object collection, sharing the same event offsets
struct Collection {
    offsets: Vec<usize>,
    fields: Vec<Vec<Float>>,
}
//
impl Collection {
    /// Read the branches `<prefix>_<field>` of a collection
    fn read(batch: &RecordBatch, prefix: &str, field_names: &[&str]) -> Result<Self> {
        let branch = |field: &str| format!("{}_{}", prefix, field);
        let (offsets, first) = list(batch, &branch(field_names[0]))?;
        let mut fields = Vec::with_capacity(field_names.len());
        fields.push(first);
        for field in &field_names[1..] {
            let name = branch(field);
            let (field_offsets, values) = list(batch, &name)?;
            ensure!(
                field_offsets == offsets,
                "Branch {} does not have the same lengths as the rest of the {} collection",
                name,
                prefix
            );
            fields.push(values);
        }
        Ok(Self { offsets, fields })
    }

    /// Build the objects of the collection from their fields
    fn build<T>(self, make: impl Fn(&[Float]) -> T) -> Result<Jagged<T>> {
        let num_objects = self.offsets[self.offsets.len() - 1];
        let mut record = vec![0.; self.fields.len()];
        let mut objects = Vec::with_capacity(num_objects);
        for idx in 0..num_objects {
            for (value, field) in record.iter_mut().zip(&self.fields) {
                *value = field[idx];
            }
            objects.push(make(&record));
        }
        Jagged::from_parts(self.offsets, objects)
    }
}

/// Decode a record batch of NanoAOD events
fn decode(batch: &RecordBatch, is_mc: bool, triggers: &[String]) -> Result<RawEvents> {
    let muons = Collection::read(batch, "Muon", &MUON_FIELDS)?.build(|f| Muon {
        pt: f[0],
        eta: f[1],
        phi: f[2],
        mass: f[3],
        charge: f[4] as i32,
        tight_id: flag(f[5]),
        loose_id: flag(f[6]),
        pf_rel_iso04_all: f[7],
        dxy: f[8],
        dz: f[9],
        sip3d: f[10],
    })?;

    let electrons = Collection::read(batch, "Electron", &ELECTRON_FIELDS)?.build(|f| Electron {
        pt: f[0],
        eta: f[1],
        phi: f[2],
        mass: f[3],
        charge: f[4] as i32,
        delta_eta_sc: f[5],
        pf_rel_iso03_all: f[6],
        mva_iso_wp80: flag(f[7]),
        mva_iso_wp90: flag(f[8]),
    })?;

    let jets = Collection::read(batch, "Jet", &JET_FIELDS)?.build(|f| Jet {
        pt: f[0],
        eta: f[1],
        phi: f[2],
        mass: f[3],
        jet_id: f[4] as i32,
        pu_id: f[5] as i32,
        btag_deep_flav_b: f[6],
        btag_deep_flav_cvl: f[7],
        btag_deep_flav_cvb: f[8],
        muon_idx1: f[9] as i32,
        muon_idx2: f[10] as i32,
        mu_ef: f[11],
        ne_em_ef: f[12],
    })?;

    let puppi_met = scalar(batch, "PuppiMET_pt")?
        .into_iter()
        .zip(scalar(batch, "PuppiMET_phi")?)
        .map(|(pt, phi)| Met { pt, phi })
        .collect::<Vec<_>>();

    let gen_weight = if is_mc {
        scalar(batch, "genWeight")?
    } else {
        vec![1.; batch.num_rows()]
    };

    let hlt = triggers
        .iter()
        .map(|path| {
            let bits = scalar(batch, &format!("HLT_{}", path))?;
            Ok((path.clone(), bits.into_iter().map(flag).collect()))
        })
        .collect::<Result<BTreeMap<_, _>>>()?;

    let raw = RawEvents {
        muons,
        electrons,
        jets,
        puppi_met,
        gen_weight,
        hlt,
    };
    raw.check_shape()?;
    Ok(raw)
}
