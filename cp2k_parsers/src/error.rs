use std::io;
use thiserror::Error;


#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to read {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {name} (at line {line}): {details}")]
    Malformed {
        name: String,
        line: usize,
        details: String,
    },

    #[error("no {channel} entry for step {step} in {name}")]
    MissingStep {
        name: String,
        channel: &'static str,
        step: usize,
    },

    #[error("{name} ends before the {channel} entry of step {step}")]
    EndOfData {
        name: String,
        channel: &'static str,
        step: usize,
    },
}


impl ParseError {
    pub fn malformed(name: &str, line: usize, details: impl Into<String>) -> Self {
        Self::Malformed {
            name: name.to_owned(),
            line,
            details: details.into(),
        }
    }

    pub fn missing_step(name: &str, channel: &'static str, step: usize) -> Self {
        Self::MissingStep {
            name: name.to_owned(),
            channel,
            step,
        }
    }

    pub fn end_of_data(name: &str, channel: &'static str, step: usize) -> Self {
        Self::EndOfData {
            name: name.to_owned(),
            channel,
            step,
        }
    }
}
