//! Readers for CP2K force output.
//!
//! CP2K writes forces either as an xyz trajectory (`FORMAT XMOL`, handled by
//! [`XyzReader`]) or as `ATOMIC FORCES` blocks, which carry no step index:
//!
//! ```text
//!  ATOMIC FORCES in [a.u.]
//!
//!  # Atom   Kind   Element          X              Y              Z
//!       1      1      O           0.00000000     0.00000000    -0.01286017
//!       2      2      H           0.00000000    -0.00768178     0.00643009
//!  SUM OF ATOMIC FORCES           0.00000000     0.00000000    -0.00000000     0.00000000
//! ```

use std::fmt;
use std::io::BufRead;

use crate::error::ParseError;
use crate::lines::{LineReader, parse_vec3};
use crate::xyz::{StepBlock, XyzReader};


#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ForceFormat {
    Xyz,
    AtomicForces,
}


impl fmt::Display for ForceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", match self {
            ForceFormat::Xyz          => "xyz",
            ForceFormat::AtomicForces => "ATOMIC FORCES",
        })
    }
}


impl ForceFormat {
    /// Guesses the format from the first non-blank line. An empty source is treated as xyz.
    pub fn detect<R: BufRead>(lines: &mut LineReader<R>) -> Result<Self, ParseError> {
        lines.skip_blank()?;
        let first = match lines.peek_line()? {
            None => return Ok(ForceFormat::Xyz),
            Some(l) => l.trim().to_owned(),
        };

        if first.parse::<usize>().is_ok() {
            Ok(ForceFormat::Xyz)
        } else if first.contains("ATOMIC FORCES") {
            Ok(ForceFormat::AtomicForces)
        } else {
            Err(ParseError::malformed(lines.name(), lines.lineno() + 1,
                format!("cannot recognize force format from line {:?}", first)))
        }
    }
}


/// Streams `ATOMIC FORCES` blocks, numbering them `first_step`, `first_step + stride`, ...
pub struct AtomicForcesReader<R> {
    lines:      LineReader<R>,
    first_step: usize,
    stride:     usize,
    iblock:     usize,
    done:       bool,
}


impl<R: BufRead> AtomicForcesReader<R> {
    pub fn new(lines: LineReader<R>, first_step: usize, stride: usize) -> Self {
        Self {
            lines,
            first_step,
            stride,
            iblock: 0,
            done: false,
        }
    }

    pub fn name(&self) -> &str { self.lines.name() }

    fn is_block_header(line: &str) -> bool {
        line.contains("ATOMIC FORCES") && !line.contains("SUM OF")
    }

    fn read_block(&mut self) -> Result<Option<StepBlock>, ParseError> {
        loop {
            match self.lines.next_line()? {
                None => return Ok(None),
                Some(l) if Self::is_block_header(&l) => break,
                Some(_) => continue,
            }
        }

        let step = self.first_step + self.iblock * self.stride;

        loop {
            match self.lines.next_line()? {
                None => return Err(self.lines.malformed(format!(
                            "forces block #{} (step {}) ends before its `# Atom` header", self.iblock, step))),
                Some(l) if l.trim_start().starts_with("# Atom") => break,
                Some(_) => continue,
            }
        }

        let mut labels  = vec![];
        let mut vectors = vec![];

        loop {
            let line = self.lines.next_line()?
                .ok_or_else(|| self.lines.malformed(format!(
                    "forces block #{} (step {}) is truncated before `SUM OF ATOMIC FORCES`", self.iblock, step)))?;
            let trimmed = line.trim();
            if trimmed.starts_with("SUM OF ATOMIC FORCES") {
                break;
            }
            if trimmed.is_empty() {
                continue;
            }

            let toks = trimmed.split_whitespace().collect::<Vec<_>>();
            if toks.len() < 6 {
                return Err(self.lines.malformed(format!("expected `<atom> <kind> <element> <x> <y> <z>`, found {:?}", trimmed)));
            }

            let iatom = toks[0].parse::<usize>()
                .map_err(|_| self.lines.malformed(format!("invalid atom index {:?}", toks[0])))?;
            if iatom != labels.len() + 1 {
                return Err(self.lines.malformed(format!(
                    "atom index {} out of sequence in forces block of step {}, expected {}", iatom, step, labels.len() + 1)));
            }

            let v = parse_vec3(&toks[3..6])
                .ok_or_else(|| self.lines.malformed(format!("non-numeric field in force line {:?}", trimmed)))?;
            labels.push(toks[2].to_owned());
            vectors.push(v);
        }

        self.iblock += 1;
        Ok(Some(StepBlock { step, time: None, energy: None, labels, vectors }))
    }
}


impl<R: BufRead> Iterator for AtomicForcesReader<R> {
    type Item = Result<StepBlock, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let ret = self.read_block().transpose();
        if !matches!(ret, Some(Ok(_))) {
            self.done = true;
        }
        ret
    }
}


/// Force channel of one run, in whichever format the file was written.
pub enum ForceReader<R> {
    Xyz(XyzReader<R>),
    AtomicForces(AtomicForcesReader<R>),
}


impl<R: BufRead> ForceReader<R> {
    /// Detects the format and builds the matching reader. `first_step` and `stride`
    /// number the blocks of formats that do not record their step.
    pub fn new(mut lines: LineReader<R>, first_step: usize, stride: usize) -> Result<Self, ParseError> {
        Ok(match ForceFormat::detect(&mut lines)? {
            ForceFormat::Xyz          => ForceReader::Xyz(XyzReader::new(lines)),
            ForceFormat::AtomicForces => ForceReader::AtomicForces(AtomicForcesReader::new(lines, first_step, stride)),
        })
    }

    pub fn name(&self) -> &str {
        match self {
            ForceReader::Xyz(r)          => r.name(),
            ForceReader::AtomicForces(r) => r.name(),
        }
    }

    pub fn format(&self) -> ForceFormat {
        match self {
            ForceReader::Xyz(_)          => ForceFormat::Xyz,
            ForceReader::AtomicForces(_) => ForceFormat::AtomicForces,
        }
    }
}


impl<R: BufRead> Iterator for ForceReader<R> {
    type Item = Result<StepBlock, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            ForceReader::Xyz(r)          => r.next(),
            ForceReader::AtomicForces(r) => r.next(),
        }
    }
}
