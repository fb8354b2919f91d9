use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::read::MultiGzDecoder;

use crate::error::ParseError;


/// Line-oriented cursor over a text source with one line of lookahead.
///
/// Line numbers count from 1 and refer to the line most recently returned by
/// [`LineReader::next_line`].
pub struct LineReader<R> {
    inner:  R,
    name:   String,
    lineno: usize,
    peeked: Option<Option<String>>,
}


impl<R: BufRead> LineReader<R> {
    pub fn new(inner: R, name: impl Into<String>) -> Self {
        Self {
            inner,
            name: name.into(),
            lineno: 0,
            peeked: None,
        }
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn lineno(&self) -> usize { self.lineno }

    fn read_raw(&mut self) -> Result<Option<String>, ParseError> {
        let mut buf = String::new();
        let n = self.inner.read_line(&mut buf)
            .map_err(|source| ParseError::Io { name: self.name.clone(), source })?;
        if n == 0 {
            return Ok(None);
        }
        while buf.ends_with('\n') || buf.ends_with('\r') {
            buf.pop();
        }
        Ok(Some(buf))
    }

    pub fn next_line(&mut self) -> Result<Option<String>, ParseError> {
        let line = match self.peeked.take() {
            Some(line) => line,
            None => self.read_raw()?,
        };
        if line.is_some() {
            self.lineno += 1;
        }
        Ok(line)
    }

    pub fn peek_line(&mut self) -> Result<Option<&str>, ParseError> {
        if self.peeked.is_none() {
            let line = self.read_raw()?;
            self.peeked = Some(line);
        }
        Ok(self.peeked.as_ref().and_then(|l| l.as_deref()))
    }

    /// Drops blank lines, leaving the cursor before the next non-blank one (or EOF).
    pub fn skip_blank(&mut self) -> Result<(), ParseError> {
        while let Some(line) = self.peek_line()? {
            if !line.trim().is_empty() {
                break;
            }
            self.next_line()?;
        }
        Ok(())
    }

    pub fn malformed(&self, details: impl Into<String>) -> ParseError {
        ParseError::malformed(&self.name, self.lineno, details)
    }
}


/// Opens a text source for line reading. Files ending with `.gz` are decompressed on the fly.
pub fn open_source<P>(path: P) -> Result<LineReader<Box<dyn BufRead + Send>>, ParseError>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let name = path.display().to_string();
    let file = File::open(path)
        .map_err(|source| ParseError::Io { name: name.clone(), source })?;

    let is_gz = path.extension().map_or(false, |ext| ext == "gz");
    let inner: Box<dyn BufRead + Send> = if is_gz {
        Box::new(BufReader::new(MultiGzDecoder::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };

    Ok(LineReader::new(inner, name))
}


pub(crate) fn parse_f64(tok: &str) -> Option<f64> {
    // Fortran double precision exponents, e.g. `1.0D-03`
    if tok.contains(&['D', 'd'][..]) {
        tok.replace(&['D', 'd'][..], "E").parse().ok()
    } else {
        tok.parse().ok()
    }
}


pub(crate) fn parse_vec3(toks: &[&str]) -> Option<[f64; 3]> {
    match toks {
        [x, y, z] => Some([parse_f64(x)?, parse_f64(y)?, parse_f64(z)?]),
        _ => None,
    }
}
