use std::io::BufRead;

use crate::error::ParseError;
use crate::lines::{LineReader, parse_f64};


/// Whitespace separated numeric table with `#` comments whose first column is the step.
///
/// Used for the `.ener` and `.cell` outputs of CP2K molecular dynamics.
pub struct StepTable<R> {
    lines:     LineReader<R>,
    ncols:     usize,
    last_step: Option<usize>,
    done:      bool,
}


impl<R: BufRead> StepTable<R> {
    pub fn new(lines: LineReader<R>, ncols: usize) -> Self {
        Self {
            lines,
            ncols,
            last_step: None,
            done: false,
        }
    }

    pub fn name(&self) -> &str { self.lines.name() }

    fn read_row(&mut self) -> Result<Option<(usize, Vec<f64>)>, ParseError> {
        let line = loop {
            match self.lines.next_line()? {
                None => return Ok(None),
                Some(l) => {
                    let t = l.trim();
                    if t.is_empty() || t.starts_with('#') {
                        continue;
                    }
                    break l;
                }
            }
        };

        let toks = line.split_whitespace().collect::<Vec<_>>();
        if toks.len() != self.ncols {
            return Err(self.lines.malformed(format!(
                "expected {} columns, found {}", self.ncols, toks.len())));
        }

        let step = toks[0].parse::<usize>()
            .map_err(|_| self.lines.malformed(format!("invalid step index {:?}", toks[0])))?;

        if let Some(last) = self.last_step {
            if step <= last {
                return Err(self.lines.malformed(format!("step {} does not follow step {}", step, last)));
            }
        }

        let values = toks[1..].iter()
            .map(|t| parse_f64(t).ok_or_else(|| self.lines.malformed(format!("cannot parse {:?} as a float", t))))
            .collect::<Result<Vec<_>, _>>()?;

        self.last_step = Some(step);
        Ok(Some((step, values)))
    }
}


impl<R: BufRead> Iterator for StepTable<R> {
    type Item = Result<(usize, Vec<f64>), ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let ret = self.read_row().transpose();
        if !matches!(ret, Some(Ok(_))) {
            self.done = true;
        }
        ret
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn table(s: &str, ncols: usize) -> StepTable<Cursor<&str>> {
        StepTable::new(LineReader::new(Cursor::new(s), "t"), ncols)
    }

    #[test]
    fn test_rows() {
        let rows = table("# a b c\n\n 1 0.5 2\n 3 1.5 4\n", 3)
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(rows, vec![(1, vec![0.5, 2.0]), (3, vec![1.5, 4.0])]);
    }

    #[test]
    fn test_bad_rows() {
        assert!(table("1 2\n", 3).next().unwrap().is_err());
        assert!(table("1 2 x\n", 3).next().unwrap().is_err());
        assert!(table("1.5 2 3\n", 3).next().unwrap().is_err());

        let mut t = table("2 0 0\n1 0 0\n", 3);
        assert!(t.next().unwrap().is_ok());
        assert!(matches!(t.next().unwrap(), Err(ParseError::Malformed { line: 2, .. })));
        assert!(t.next().is_none());
    }
}
