//! Reader for CP2K trajectories in xyz format (`*-pos-1.xyz`, `*-frc-1.xyz`).
//!
//! Every block looks like
//!
//! ```text
//!      3
//!  i =        5, time =        2.500, E =       -17.1643447508
//!   O         0.0000000000        0.0000000000        0.1192620000
//!   H         0.0000000000        0.7632390000       -0.4770470000
//!   H         0.0000000000       -0.7632390000       -0.4770470000
//! ```

use std::io::BufRead;
use std::sync::OnceLock;

use shared::{MatX3, Regex};

use crate::error::ParseError;
use crate::lines::{LineReader, parse_f64, parse_vec3};


/// One step worth of per-atom vectors (positions or forces) read from a trajectory file.
#[derive(Clone, Debug, PartialEq)]
pub struct StepBlock {
    pub step:    usize,
    pub time:    Option<f64>,
    pub energy:  Option<f64>,
    pub labels:  Vec<String>,
    pub vectors: MatX3<f64>,
}


impl StepBlock {
    pub fn natoms(&self) -> usize { self.labels.len() }
}


fn re_step() -> &'static Regex {
    static INSTANCE: OnceLock<Regex> = OnceLock::new();
    INSTANCE.get_or_init(|| Regex::new(r"\bi\s*=\s*(\d+)").unwrap())
}

fn re_time() -> &'static Regex {
    static INSTANCE: OnceLock<Regex> = OnceLock::new();
    INSTANCE.get_or_init(|| Regex::new(r"\btime\s*=\s*([-+0-9.EeDd]+)").unwrap())
}

fn re_energy() -> &'static Regex {
    static INSTANCE: OnceLock<Regex> = OnceLock::new();
    INSTANCE.get_or_init(|| Regex::new(r"\bE\s*=\s*([-+0-9.EeDd]+)").unwrap())
}


/// Extracts `(step, time, energy)` from a CP2K xyz comment line.
pub fn parse_comment(line: &str) -> Option<(usize, Option<f64>, Option<f64>)> {
    let step = re_step().captures(line)?.get(1)?.as_str().parse().ok()?;
    let time = re_time().captures(line)
        .and_then(|c| parse_f64(c.get(1)?.as_str()));
    let energy = re_energy().captures(line)
        .and_then(|c| parse_f64(c.get(1)?.as_str()));
    Some((step, time, energy))
}


/// Streams [`StepBlock`]s from an xyz trajectory in file order.
///
/// The reader stops at the first error; step indices must be strictly increasing.
pub struct XyzReader<R> {
    lines:     LineReader<R>,
    last_step: Option<usize>,
    done:      bool,
}


impl<R: BufRead> XyzReader<R> {
    pub fn new(lines: LineReader<R>) -> Self {
        Self {
            lines,
            last_step: None,
            done: false,
        }
    }

    pub fn name(&self) -> &str { self.lines.name() }

    fn atom_line_ahead(&mut self) -> Result<bool, ParseError> {
        Ok(self.lines.peek_line()?
            .map_or(false, |l| l.split_whitespace().count() == 4))
    }

    fn read_block(&mut self) -> Result<Option<StepBlock>, ParseError> {
        self.lines.skip_blank()?;
        let natoms = match self.lines.next_line()? {
            None => return Ok(None),
            Some(line) => line.trim().parse::<usize>()
                .map_err(|_| self.lines.malformed(format!("expected an atom count, found {:?}", line.trim())))?,
        };

        let comment = self.lines.next_line()?
            .ok_or_else(|| self.lines.malformed("unexpected end of file after the atom count"))?;
        let (step, time, energy) = parse_comment(&comment)
            .ok_or_else(|| self.lines.malformed(format!("cannot find `i = <step>` in comment line {:?}", comment.trim())))?;

        if let Some(last) = self.last_step {
            if step <= last {
                return Err(self.lines.malformed(format!("step {} does not follow step {}", step, last)));
            }
        }

        let mut labels  = Vec::with_capacity(natoms);
        let mut vectors = Vec::with_capacity(natoms);

        for iatom in 0 .. natoms {
            if !self.atom_line_ahead()? {
                return Err(self.lines.malformed(format!(
                    "block of step {} declares {} atoms but only {} atom lines are present",
                    step, natoms, iatom)));
            }
            let line = self.lines.next_line()?.unwrap_or_default();

            let toks = line.split_whitespace().collect::<Vec<_>>();
            let v = parse_vec3(&toks[1..])
                .ok_or_else(|| self.lines.malformed(format!("non-numeric field in atom line {:?}", line.trim())))?;
            labels.push(toks[0].to_owned());
            vectors.push(v);
        }

        self.lines.skip_blank()?;
        if self.atom_line_ahead()? {
            return Err(ParseError::malformed(self.lines.name(), self.lines.lineno() + 1, format!(
                "block of step {} declares {} atoms but has more atom lines", step, natoms)));
        }

        self.last_step = Some(step);
        Ok(Some(StepBlock { step, time, energy, labels, vectors }))
    }
}


impl<R: BufRead> Iterator for XyzReader<R> {
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
