//! Persistence of the selected events' derived variables
//!
//! Every chunk of events gets its own Parquet file, named after the dataset,
//! source file and entry range of the chunk. Writing the same chunk twice thus
//! overwrites the same file with the same content.

use crate::{
    event::{Candidate, ChunkMeta, Met},
    mask::Mask,
    momentum::{Kinematics, Momentum},
    numeric::Float,
    pipeline::Events,
    Result,
};

use arrow::{
    array::{ArrayRef, BooleanArray, Float64Array, UInt64Array},
    datatypes::{Field, Schema},
    record_batch::RecordBatch,
};
use eyre::WrapErr;
use parquet::{
    arrow::ArrowWriter,
    basic::Compression,
    file::properties::WriterProperties,
};

use std::{
    fs::{self, File},
    path::{Path, PathBuf},
    sync::Arc,
};

/// Source file extensions which are not part of output file names
const SOURCE_EXTENSIONS: [&str; 2] = [".root", ".parquet"];

/// Part of the output file names which comes from the source file
///
/// Two source files of a dataset must not share it, or their chunks would be
/// written to the same files.
///
pub fn output_stem(source: &Path) -> String {
    let file_name = source
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    SOURCE_EXTENSIONS
        .iter()
        .find_map(|ext| file_name.strip_suffix(ext))
        .unwrap_or(&file_name)
        .to_owned()
}

/// Per-chunk Parquet writer of the selected events
#[derive(Clone, Debug)]
pub struct OutputSink {
    /// Directory under which per-dataset output directories are created
    root: PathBuf,
}
//
impl OutputSink {
    /// Set up an output sink writing under some directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Output file of a chunk of events
    pub fn output_path(&self, meta: &ChunkMeta) -> PathBuf {
        self.root.join(&meta.dataset).join(format!(
            "{}_{}_{}_vars.parquet",
            output_stem(&meta.filename),
            meta.entry_start,
            meta.entry_stop
        ))
    }

    /// Write the variables of the selected events of a chunk
    ///
    /// `selection` tells which events get a row, and `categories` adds one
    /// boolean column per region telling whether each of these events is in
    /// that region. Returns the path of the file that was written.
    ///
    pub fn write(
        &self,
        meta: &ChunkMeta,
        events: &Events,
        selection: &Mask,
        categories: &[(String, Mask)],
    ) -> Result<PathBuf> {
        let path = self.output_path(meta);
        let batch = variables(events, selection, categories)?;

        // create_dir_all succeeds if another worker created the directory first
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .wrap_err_with(|| format!("Failed to create output directory {}", dir.display()))?;
        }

        let file = File::create(&path)
            .wrap_err_with(|| format!("Failed to create output file {}", path.display()))?;
        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();
        let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
        writer
            .write(&batch)
            .wrap_err_with(|| format!("Failed to write {}", path.display()))?;
        writer
            .close()
            .wrap_err_with(|| format!("Failed to finalize {}", path.display()))?;
        Ok(path)
    }
}

/// Build the table of derived variables of the selected events
fn variables(events: &Events, selection: &Mask, categories: &[(String, Mask)]) -> Result<RecordBatch> {
    let rows = selection.selected_indices();
    let vars = &events.vars;

    let counts = |values: &[usize]| -> ArrayRef {
        Arc::new(UInt64Array::from_iter_values(
            rows.iter().map(|&i| values[i] as u64),
        ))
    };
    let optional = |values: &[Option<Float>]| -> ArrayRef {
        Arc::new(Float64Array::from_iter(rows.iter().map(|&i| values[i])))
    };
    let z = |f: fn(&Candidate) -> Float| -> ArrayRef {
        Arc::new(Float64Array::from_iter(
            rows.iter().map(|&i| vars.z[i].as_ref().map(f)),
        ))
    };
    let w = |f: fn(&Momentum) -> Float| -> ArrayRef {
        Arc::new(Float64Array::from_iter(
            rows.iter().map(|&i| vars.w[i].as_ref().map(f)),
        ))
    };
    let met = |f: fn(&Met) -> Float| -> ArrayRef {
        Arc::new(Float64Array::from_iter_values(
            rows.iter().map(|&i| f(&events.raw.puppi_met[i])),
        ))
    };

    let mut columns: Vec<(&str, ArrayRef, bool)> = vec![
        ("nJet", counts(&vars.n_jet), false),
        ("nMuon", counts(&vars.n_muon_good), false),
        ("nSoftMuon", counts(&vars.n_soft_muon_good), false),
        ("hl_ptratio", optional(&vars.hl_ptratio), true),
        ("soft_l_ptratio", optional(&vars.soft_l_ptratio), true),
        ("dr_soft_l_jet", optional(&vars.dr_soft_l_jet), true),
        ("dr_l_jet", optional(&vars.dr_l_jet), true),
        ("dr_l_soft_l", optional(&vars.dr_l_soft_l), true),
        ("Z_pt", z(|c| c.pt()), true),
        ("Z_mass", z(|c| c.mass()), true),
        ("Z_eta", z(|c| c.eta()), true),
        ("Z_phi", z(|c| c.phi()), true),
        ("W_pt", w(|p| p.pt()), true),
        ("W_mass", w(|p| p.mass()), true),
        ("W_eta", w(|p| p.eta()), true),
        ("W_phi", w(|p| p.phi()), true),
        ("MET_pt", met(|m| m.pt), false),
        ("MET_phi", met(|m| m.phi), false),
    ];
    for (name, mask) in categories {
        let column: ArrayRef = Arc::new(BooleanArray::from(
            rows.iter().map(|&i| mask.get(i)).collect::<Vec<_>>(),
        ));
        columns.push((name.as_str(), column, false));
    }

    let schema = Schema::new(
        columns
            .iter()
            .map(|(name, column, nullable)| Field::new(*name, column.data_type().clone(), *nullable))
            .collect::<Vec<_>>(),
    );
    let batch = RecordBatch::try_new(
        Arc::new(schema),
        columns.into_iter().map(|(_, column, _)| column).collect(),
    )?;
    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        pipeline::tests::events,
        preselect::tests::{jet, muon},
    };
    use arrow::array::Array;
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

    fn meta() -> ChunkMeta {
        ChunkMeta {
            dataset: "WJets".to_owned(),
            filename: PathBuf::from("/store/mc/nano_1.root"),
            entry_start: 0,
            entry_stop: 3,
            is_mc: true,
        }
    }

    fn sample() -> Events {
        events(
            vec![vec![muon(40., 0., 0., 1)], vec![], vec![muon(35., 1., 1., -1)]],
            vec![vec![jet(80., 0., 2.)], vec![jet(50., 0., 0.)], vec![]],
            vec![Met { pt: 30., phi: 0.5 }; 3],
        )
    }

    fn read_back(path: &Path) -> RecordBatch {
        let file = File::open(path).unwrap();
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)
            .unwrap()
            .build()
            .unwrap();
        let batches = reader.collect::<std::result::Result<Vec<_>, _>>().unwrap();
        arrow::compute::concat_batches(&batches[0].schema(), &batches).unwrap()
    }

    #[test]
    fn output_file_naming() {
        let sink = OutputSink::new("out");
        assert_eq!(
            sink.output_path(&meta()),
            PathBuf::from("out/WJets/nano_1_0_3_vars.parquet")
        );
        let parquet_input = ChunkMeta {
            filename: PathBuf::from("nano_2.parquet"),
            entry_start: 100,
            entry_stop: 200,
            ..meta()
        };
        assert_eq!(
            sink.output_path(&parquet_input),
            PathBuf::from("out/WJets/nano_2_100_200_vars.parquet")
        );
    }

    #[test]
    fn writes_selected_rows_and_categories() {
        let dir = tempfile::tempdir().unwrap();
        let sink = OutputSink::new(dir.path());
        let events = sample();
        let selection = Mask::from(vec![true, false, true]);
        let categories = vec![("baseline".to_owned(), Mask::from(vec![true, true, false]))];
        let path = sink.write(&meta(), &events, &selection, &categories).unwrap();
        assert!(path.starts_with(dir.path().join("WJets")));

        let batch = read_back(&path);
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.num_columns(), 19);
        let schema = batch.schema();
        assert_eq!(schema.field(0).name(), "nJet");
        assert_eq!(schema.field(18).name(), "baseline");

        let baseline = batch
            .column(18)
            .as_any()
            .downcast_ref::<BooleanArray>()
            .unwrap();
        assert_eq!(baseline.values().iter().collect::<Vec<_>>(), vec![true, false]);

        // Second selected event has no jet, so jet ratios are missing
        let hl_ptratio = batch
            .column(3)
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap();
        assert!((hl_ptratio.value(0) - 0.5).abs() < 1e-12);
        assert!(hl_ptratio.is_null(1));
    }

    #[test]
    fn rewriting_a_chunk_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let sink = OutputSink::new(dir.path());
        let events = sample();
        let selection = Mask::all(3);

        let first = sink.write(&meta(), &events, &selection, &[]).unwrap();
        let first_bytes = fs::read(&first).unwrap();
        let second = sink.write(&meta(), &events, &selection, &[]).unwrap();
        let second_bytes = fs::read(&second).unwrap();

        assert_eq!(first, second);
        assert_eq!(first_bytes, second_bytes);
        let (a, b) = (read_back(&first), read_back(&second));
        assert_eq!(a.num_rows(), b.num_rows());
        assert_eq!(a.schema(), b.schema());
    }

    #[test]
    fn empty_selection_still_writes_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let sink = OutputSink::new(dir.path());
        let path = sink
            .write(&meta(), &sample(), &Mask::from(vec![false; 3]), &[])
            .unwrap();
        assert!(path.exists());
    }
}
