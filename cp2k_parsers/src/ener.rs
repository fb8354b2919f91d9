//! Reader for the CP2K MD energy log (`*-1.ener`).
//!
//! ```text
//! #     Step Nr.          Time[fs]        Kin.[a.u.]          Temp[K]            Pot.[a.u.]        Cons Qty[a.u.]        UsedTime[s]
//!          0            0.000000         0.001425197       300.000000000       -17.164344751       -17.162919554         0.000000000
//! ```

use std::io::BufRead;

use crate::error::ParseError;
use crate::lines::LineReader;
use crate::table::StepTable;


#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnergyRecord {
    pub step:        usize,
    pub time:        f64,   // fs
    pub kinetic:     f64,   // Hartree
    pub temperature: f64,   // K
    pub potential:   f64,   // Hartree
    pub conserved:   f64,   // Hartree
    pub used_time:   f64,   // s
}


pub struct EnergyReader<R> {
    table: StepTable<R>,
}


impl<R: BufRead> EnergyReader<R> {
    pub const NCOLS: usize = 7;

    pub fn new(lines: LineReader<R>) -> Self {
        Self { table: StepTable::new(lines, Self::NCOLS) }
    }

    pub fn name(&self) -> &str { self.table.name() }
}


impl<R: BufRead> Iterator for EnergyReader<R> {
    type Item = Result<EnergyRecord, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        let ret = self.table.next()?.map(|(step, v)| EnergyRecord {
            step,
            time:        v[0],
            kinetic:     v[1],
            temperature: v[2],
            potential:   v[3],
            conserved:   v[4],
            used_time:   v[5],
        });
        Some(ret)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const ENER: &str = "\
#     Step Nr.          Time[fs]        Kin.[a.u.]          Temp[K]            Pot.[a.u.]        Cons Qty[a.u.]        UsedTime[s]
         0            0.000000         0.001425197       300.000000000       -17.164344751       -17.162919554         0.000000000
         1            0.500000         0.001379026       290.284751443       -17.164298405       -17.162919379         1.532049417
";

    #[test]
    fn test_read_ener() {
        let recs = EnergyReader::new(LineReader::new(Cursor::new(ENER), "x.ener"))
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[1].step, 1);
        assert_eq!(recs[1].time, 0.5);
        assert_eq!(recs[1].potential, -17.164298405);
        assert_eq!(recs[1].conserved, -17.162919379);
        assert_eq!(recs[0].temperature, 300.0);
    }

    #[test]
    fn test_read_ener_bad() {
        let txt = ENER.replacen("-17.164298405", "nan?", 1);
        let mut r = EnergyReader::new(LineReader::new(Cursor::new(txt.as_str()), "x.ener"));
        assert!(r.next().unwrap().is_ok());
        assert!(r.next().unwrap().is_err());
        assert!(r.next().is_none());
    }
}
