//! Merges the position, force, energy and cell channels of one run into frames.

use std::fmt;
use std::io::BufRead;

use cp2k_parsers::{
    open_source,
    CellReader,
    CellRecord,
    EnergyReader,
    EnergyRecord,
    ForceReader,
    ParseError,
    StepBlock,
    XyzReader,
};
use shared::{Mat33, MatX3};

use crate::convert::aligner::RunFiles;
use crate::convert::selector::StepSelector;


#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnergyColumn {
    Potential,
    Conserved,
}


impl fmt::Display for EnergyColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", match self {
            EnergyColumn::Potential => "potential",
            EnergyColumn::Conserved => "conserved",
        })
    }
}


impl EnergyColumn {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "potential" | "pot"                  => Some(EnergyColumn::Potential),
            "conserved" | "cons" | "cons_qty"    => Some(EnergyColumn::Conserved),
            _ => None,
        }
    }
}


/// One aligned simulation step.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameRecord {
    pub step:         usize,                // counted from the start of the run
    pub time:         f64,                  // fs, as logged in the energy file
    pub labels:       Vec<String>,          // species of the position channel
    pub force_labels: Vec<String>,          // species of the force channel
    pub positions:    MatX3<f64>,
    pub forces:       MatX3<f64>,
    pub energy:       f64,
    pub cell:         Option<Mat33<f64>>,
}


impl FrameRecord {
    pub fn natoms(&self) -> usize { self.labels.len() }
}


pub struct FrameSources<R> {
    pub positions: XyzReader<R>,
    pub forces:    ForceReader<R>,
    pub energies:  EnergyReader<R>,
    pub cells:     Option<CellReader<R>>,
}


impl FrameSources<Box<dyn BufRead + Send>> {
    /// Opens every channel of a run. Force blocks without step indices are numbered from
    /// `step_offset` with a stride of `trajectory_cadence`.
    pub fn open(files: &RunFiles, step_offset: usize, trajectory_cadence: usize) -> Result<Self, ParseError> {
        let positions = XyzReader::new(open_source(&files.positions)?);
        let forces    = ForceReader::new(open_source(&files.forces)?, step_offset, trajectory_cadence)?;
        let energies  = EnergyReader::new(open_source(&files.energy)?);
        let cells     = match files.cell.as_ref() {
            Some(path) => Some(CellReader::new(open_source(path)?)),
            None => None,
        };

        Ok(Self { positions, forces, energies, cells })
    }
}


/// Advances `iter` to the record logged at `step`.
///
/// Fails with `MissingStep` if a later step shows up first, `EndOfData` if the source runs out.
fn seek<T, I>(iter: &mut I, step_of: fn(&T) -> usize, step: usize, name: &str, channel: &'static str) -> Result<T, ParseError>
where
    I: Iterator<Item = Result<T, ParseError>>,
{
    for rec in iter {
        let rec = rec?;
        let s = step_of(&rec);
        if s == step {
            return Ok(rec);
        }
        if s > step {
            return Err(ParseError::missing_step(name, channel, step));
        }
    }
    Err(ParseError::end_of_data(name, channel, step))
}


/// Lazily yields the frames of the steps accepted by a [`StepSelector`].
///
/// Each input is consumed once, front to back. Steps in the files are absolute;
/// `step_offset` is subtracted before selection.
pub struct FrameReader<R> {
    sources:         FrameSources<R>,
    selector:        StepSelector,
    step_offset:     usize,
    energy_column:   EnergyColumn,
    blocks_in_range: usize,
    off_cadence:     Vec<usize>,
    done:            bool,
}


impl<R: BufRead> FrameReader<R> {
    pub fn new(sources: FrameSources<R>, selector: StepSelector, step_offset: usize, energy_column: EnergyColumn) -> Self {
        Self {
            sources,
            selector,
            step_offset,
            energy_column,
            blocks_in_range: 0,
            off_cadence: vec![],
            done: false,
        }
    }

    /// Position blocks met so far within the selector's step range.
    pub fn blocks_in_range(&self) -> usize { self.blocks_in_range }

    /// Steps of position blocks that are not a multiple of the trajectory cadence.
    pub fn off_cadence_steps(&self) -> &[usize] { &self.off_cadence }

    fn read_frame(&mut self) -> Result<Option<FrameRecord>, ParseError> {
        let pos = loop {
            let block = match self.sources.positions.next() {
                None => return Ok(None),
                Some(b) => b?,
            };

            let step = match block.step.checked_sub(self.step_offset) {
                Some(s) => s,
                None => continue,
            };
            if step > self.selector.last_step() {
                return Ok(None);
            }
            if !self.selector.in_range(step) {
                continue;
            }

            self.blocks_in_range += 1;
            if step % self.selector.trajectory_cadence() != 0 {
                self.off_cadence.push(step);
            }
            if self.selector.contains(step) {
                break block;
            }
        };

        let abs_step = pos.step;
        let step = abs_step - self.step_offset;

        let forces = {
            let name = self.sources.forces.name().to_owned();
            seek(&mut self.sources.forces, |b: &StepBlock| b.step, abs_step, &name, "forces")?
        };

        let ener = {
            let name = self.sources.energies.name().to_owned();
            seek(&mut self.sources.energies, |e: &EnergyRecord| e.step, abs_step, &name, "energy")?
        };

        let cell = match self.sources.cells.as_mut() {
            Some(cells) => {
                let name = cells.name().to_owned();
                Some(seek(cells, |c: &CellRecord| c.step, abs_step, &name, "cell")?.cell)
            },
            None => None,
        };

        let energy = match self.energy_column {
            EnergyColumn::Potential => ener.potential,
            EnergyColumn::Conserved => ener.conserved,
        };

        Ok(Some(FrameRecord {
            step,
            time: ener.time,
            labels: pos.labels,
            force_labels: forces.labels,
            positions: pos.vectors,
            forces: forces.vectors,
            energy,
            cell,
        }))
    }
}


impl<R: BufRead> Iterator for FrameReader<R> {
    type Item = Result<FrameRecord, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let ret = self.read_frame().transpose();
        if !matches!(ret, Some(Ok(_))) {
            self.done = true;
        }
        ret
    }
}


#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::fmt::Write as _;
    use std::io::Cursor;
    use cp2k_parsers::LineReader;

    pub(crate) type MemReader = Cursor<String>;

    /// xyz trajectory of a water molecule at `steps`, with coordinates tagged by step.
    pub(crate) fn xyz_text(steps: &[usize], labels: &[&str], scale: f64) -> String {
        let mut s = String::new();
        for &step in steps {
            writeln!(s, "{:8}", labels.len()).unwrap();
            writeln!(s, " i = {:8}, time = {:12.3}, E = {:20.10}", step, step as f64 * 0.5, -17.0).unwrap();
            for (i, l) in labels.iter().enumerate() {
                writeln!(s, "  {:2} {:16.8} {:16.8} {:16.8}", l, scale * step as f64, i as f64, -(i as f64)).unwrap();
            }
        }
        s
    }

    pub(crate) fn ener_text(steps: &[usize]) -> String {
        let mut s = String::from("#     Step Nr.          Time[fs]        Kin.[a.u.]          Temp[K]            Pot.[a.u.]        Cons Qty[a.u.]        UsedTime[s]\n");
        for &step in steps {
            writeln!(s, "{:10} {:16.6} {:16.9} {:16.9} {:16.9} {:16.9} {:16.9}",
                step, step as f64 * 0.5, 0.001, 300.0, -(step as f64), -(step as f64) + 0.5, 1.0).unwrap();
        }
        s
    }

    pub(crate) fn cell_text(steps: &[usize]) -> String {
        let mut s = String::from("#   Step   Time [fs]  Ax Ay Az Bx By Bz Cx Cy Cz Volume\n");
        for &step in steps {
            writeln!(s, "{:8} {:10.3} 10 0 0 0 10 0 0 0 {} {}", step, step as f64 * 0.5, 10 + step, 100 * (10 + step)).unwrap();
        }
        s
    }

    pub(crate) fn sources(pos: String, frc: String, ener: String, cell: Option<String>, stride: usize) -> FrameSources<MemReader> {
        FrameSources {
            positions: XyzReader::new(LineReader::new(Cursor::new(pos), "pos.xyz")),
            forces:    ForceReader::new(LineReader::new(Cursor::new(frc), "frc.xyz"), 0, stride).unwrap(),
            energies:  EnergyReader::new(LineReader::new(Cursor::new(ener), "md.ener")),
            cells:     cell.map(|c| CellReader::new(LineReader::new(Cursor::new(c), "md.cell"))),
        }
    }

    const WATER: [&str; 3] = ["O", "H", "H"];

    #[test]
    fn test_dual_cadence_frames() {
        let traj_steps = (0 ..= 10).step_by(5).collect::<Vec<_>>();
        let ener_steps = (0 ..= 10).step_by(2).collect::<Vec<_>>();
        let src = sources(xyz_text(&traj_steps, &WATER, 1.0), xyz_text(&traj_steps, &WATER, -1.0), ener_text(&ener_steps), None, 5);

        let sel = StepSelector::new(2, 5, true, 10);
        let mut reader = FrameReader::new(src, sel, 0, EnergyColumn::Potential);
        let frames = reader.by_ref().collect::<Result<Vec<_>, _>>().unwrap();

        assert_eq!(frames.iter().map(|f| f.step).collect::<Vec<_>>(), vec![0, 10]);
        assert_eq!(frames[1].positions[0], [10.0, 0.0, 0.0]);
        assert_eq!(frames[1].forces[0], [-10.0, 0.0, 0.0]);
        assert_eq!(frames[1].energy, -10.0);
        assert_eq!(frames[1].time, 5.0);
        assert_eq!(reader.blocks_in_range(), 3);
        assert!(reader.off_cadence_steps().is_empty());
    }

    #[test]
    fn test_energy_column_and_cell() {
        let steps = [1, 2, 3];
        let src = sources(xyz_text(&steps, &WATER, 1.0), xyz_text(&steps, &WATER, 1.0),
                          ener_text(&steps), Some(cell_text(&steps)), 1);
        let sel = StepSelector::new(1, 1, false, 3);
        let frames = FrameReader::new(src, sel, 0, EnergyColumn::Conserved)
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[2].energy, -2.5);
        assert_eq!(frames[2].cell.unwrap()[2], [0.0, 0.0, 13.0]);
    }

    #[test]
    fn test_step_offset() {
        let steps = [100, 101, 102, 103];
        let src = sources(xyz_text(&steps, &WATER, 1.0), xyz_text(&steps, &WATER, 1.0), ener_text(&steps), None, 1);
        let sel = StepSelector::new(1, 1, false, 2);
        let frames = FrameReader::new(src, sel, 100, EnergyColumn::Potential)
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(frames.iter().map(|f| f.step).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(frames[0].positions[0][0], 101.0);
    }

    #[test]
    fn test_missing_energy() {
        let steps = [1, 2, 3];
        let src = sources(xyz_text(&steps, &WATER, 1.0), xyz_text(&steps, &WATER, 1.0), ener_text(&[1, 3]), None, 1);
        let sel = StepSelector::new(1, 1, false, 3);
        let mut reader = FrameReader::new(src, sel, 0, EnergyColumn::Potential);
        assert!(reader.next().unwrap().is_ok());
        let err = reader.next().unwrap().unwrap_err();
        assert!(matches!(err, ParseError::MissingStep { channel: "energy", step: 2, .. }), "{}", err);
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_forces_end_early() {
        let steps = [1, 2, 3];
        let src = sources(xyz_text(&steps, &WATER, 1.0), xyz_text(&[1, 2], &WATER, 1.0), ener_text(&steps), None, 1);
        let sel = StepSelector::new(1, 1, false, 3);
        let err = FrameReader::new(src, sel, 0, EnergyColumn::Potential)
            .collect::<Result<Vec<_>, _>>()
            .unwrap_err();
        assert!(matches!(err, ParseError::EndOfData { channel: "forces", step: 3, .. }), "{}", err);
    }

    #[test]
    fn test_gap_in_forces() {
        let steps = [1, 2, 3];
        let src = sources(xyz_text(&steps, &WATER, 1.0), xyz_text(&[1, 3], &WATER, 1.0), ener_text(&steps), None, 1);
        let sel = StepSelector::new(1, 1, false, 3);
        let err = FrameReader::new(src, sel, 0, EnergyColumn::Potential)
            .collect::<Result<Vec<_>, _>>()
            .unwrap_err();
        assert!(matches!(err, ParseError::MissingStep { channel: "forces", step: 2, .. }), "{}", err);
    }

    #[test]
    fn test_off_cadence_blocks_are_reported() {
        let steps = [1, 2, 3, 4];
        let src = sources(xyz_text(&steps, &WATER, 1.0), xyz_text(&steps, &WATER, 1.0), ener_text(&steps), None, 1);
        let sel = StepSelector::new(1, 2, false, 4);
        let mut reader = FrameReader::new(src, sel, 0, EnergyColumn::Potential);
        let n = reader.by_ref().filter(|f| f.is_ok()).count();
        assert_eq!(n, 2);
        assert_eq!(reader.off_cadence_steps(), &[1, 3]);
    }
}
