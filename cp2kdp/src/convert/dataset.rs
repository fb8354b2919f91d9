use std::path::Path;

use shared::info;

use crate::convert::aligner::{AlignOptions, RunDescriptor};
use crate::convert::assembler::{assemble, AssembledTrajectory, UnitConversion};
use crate::convert::config::ConvertConfig;
use crate::convert::splitter::{plan_subsets, SplitPlan, Subset, TrainTestSplit};
use crate::convert::writer::{write_dataset, OutputDtype};
use crate::error::ConvertError;


/// A fully validated conversion, ready to be written.
#[derive(Clone, Debug)]
pub struct DpDataset {
    assembled: AssembledTrajectory,
    subsets:   Vec<Subset>,
    dtype:     OutputDtype,
}


impl DpDataset {
    pub fn from_config(cfg: &ConvertConfig) -> Result<Self, ConvertError> {
        Self::from_runs(&cfg.run_descriptors(), &cfg.align_options(), cfg.unit_conversion(),
                        cfg.split_plan(), cfg.train_test_split(), cfg.get_dtype())
    }

    /// Parses and stacks every run, then lays out the sets. Nothing touches the disk.
    pub fn from_runs(runs: &[RunDescriptor], opts: &AlignOptions, units: UnitConversion,
                     plan: SplitPlan, train_test: Option<TrainTestSplit>, dtype: OutputDtype) -> Result<Self, ConvertError> {
        let assembled = assemble(runs, opts, units)?;
        let subsets = plan_subsets(assembled.nframes(), plan, train_test)?;
        Ok(Self { assembled, subsets, dtype })
    }

    pub fn assembled(&self) -> &AssembledTrajectory { &self.assembled }
    pub fn subsets(&self) -> &[Subset] { &self.subsets }

    pub fn log_summary(&self) {
        let vocab = &self.assembled.vocabulary;
        info!("Type map ({} types): {}", vocab.ntypes(), vocab);
        for (name, range) in self.assembled.run_ranges.iter() {
            info!("    run {:?} => frames {} .. {}", name, range.start, range.end);
        }
        for subset in self.subsets.iter() {
            info!("    {} => {} sets, {} frames",
                  subset.dir.unwrap_or("."), subset.sets.len(), subset.nframes());
        }
    }

    pub fn save_to_dir(&self, root: &Path) -> Result<(), ConvertError> {
        info!("Writing {} frames as {} to {:?} ...", self.assembled.nframes(), self.dtype, root);
        write_dataset(root, &self.assembled.vocabulary, &self.assembled.trajectory, &self.subsets, self.dtype)
    }
}
