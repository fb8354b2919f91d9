pub mod selector;
pub use selector::StepSelector;

pub mod vocabulary;
pub use vocabulary::{AtomType, TypeMismatch, TypeVocabulary};

pub mod frames;
pub use frames::{EnergyColumn, FrameReader, FrameRecord, FrameSources};

pub mod aligner;
pub use aligner::{align_run, AlignOptions, AlignedRun, RunDescriptor, RunFiles};

pub mod assembler;
pub use assembler::{assemble, AssembledTrajectory, UnitConversion};

pub mod splitter;
pub use splitter::{SetRange, SplitPlan, Subset, TrainTestSplit};

pub mod writer;
pub use writer::OutputDtype;

pub mod config;
pub use config::ConvertConfig;

pub mod dataset;
pub use dataset::DpDataset;

pub mod command;
pub use command::ConvertCommand;
