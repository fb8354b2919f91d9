use std::io;
use std::path::PathBuf;

use thiserror::Error;
use ndarray_npy::WriteNpyError;
use cp2k_parsers::ParseError;

use crate::convert::vocabulary::TypeMismatch;


/// Failures of the conversion pipeline. Every one of them aborts the whole conversion.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("run {run:?}: {source}")]
    Parse {
        run: String,
        #[source]
        source: ParseError,
    },

    #[error("run {run:?}, step {step}: atom types differ from the established vocabulary: {reason}")]
    TypeMismatch {
        run: String,
        step: usize,
        #[source]
        reason: TypeMismatch,
    },

    #[error("run {run:?} is incomplete: {details}")]
    IncompleteRun {
        run: String,
        details: String,
    },

    #[error("invalid split: {0}")]
    InvalidSplit(String),

    #[error("no frames selected from any run, nothing to convert")]
    EmptyTrajectory,

    #[error("failed to write {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Internal(#[from] shared::anyhow::Error),

    #[error("failed to write {path:?}: {source}")]
    Npy {
        path: PathBuf,
        #[source]
        source: WriteNpyError,
    },
}


impl ConvertError {
    pub fn parse(run: &str, source: ParseError) -> Self {
        Self::Parse { run: run.to_owned(), source }
    }

    pub fn incomplete(run: &str, details: impl Into<String>) -> Self {
        Self::IncompleteRun { run: run.to_owned(), details: details.into() }
    }

    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}
