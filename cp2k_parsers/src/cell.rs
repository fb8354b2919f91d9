//! Reader for the CP2K MD cell log (`*-1.cell`).
//!
//! ```text
//! #   Step   Time [fs]       Ax [Angstrom]       Ay [Angstrom]       Az [Angstrom]       Bx [Angstrom]       By [Angstrom]       Bz [Angstrom]       Cx [Angstrom]       Cy [Angstrom]       Cz [Angstrom]      Volume [Angstrom^3]
//!        0       0.000       12.4138000000        0.0000000000        0.0000000000        0.0000000000       12.4138000000        0.0000000000        0.0000000000        0.0000000000       12.4138000000         1912.9802
//! ```

use std::io::BufRead;

use shared::Mat33;

use crate::error::ParseError;
use crate::lines::LineReader;
use crate::table::StepTable;


#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellRecord {
    pub step:   usize,
    pub time:   f64,        // fs
    pub cell:   Mat33<f64>, // rows are A, B, C in Angstrom
    pub volume: f64,        // Angstrom^3
}


pub struct CellReader<R> {
    table: StepTable<R>,
}


impl<R: BufRead> CellReader<R> {
    pub const NCOLS: usize = 12;

    pub fn new(lines: LineReader<R>) -> Self {
        Self { table: StepTable::new(lines, Self::NCOLS) }
    }

    pub fn name(&self) -> &str { self.table.name() }
}


impl<R: BufRead> Iterator for CellReader<R> {
    type Item = Result<CellRecord, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        let ret = self.table.next()?.map(|(step, v)| CellRecord {
            step,
            time: v[0],
            cell: [
                [v[1], v[2], v[3]],
                [v[4], v[5], v[6]],
                [v[7], v[8], v[9]],
            ],
            volume: v[10],
        });
        Some(ret)
    }
}
