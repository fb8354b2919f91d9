use std::io::BufRead;
use std::path::PathBuf;

use cp2k_parsers::ParseError;

use shared::{
    info,
    warn,
    Array1,
    Array2,
    Array3,
    Mat33,
    Trajectory,
};

use crate::constants::TIME_TOLERANCE_FS;
use crate::convert::frames::{EnergyColumn, FrameReader, FrameRecord, FrameSources};
use crate::convert::selector::StepSelector;
use crate::convert::vocabulary::TypeVocabulary;
use crate::error::ConvertError;


#[derive(Clone, Debug, PartialEq)]
pub struct RunFiles {
    pub positions: PathBuf,
    pub forces:    PathBuf,
    pub energy:    PathBuf,
    pub cell:      Option<PathBuf>,
}


/// One simulation run, in the order it takes in the final trajectory.
#[derive(Clone, Debug, PartialEq)]
pub struct RunDescriptor {
    pub name:        String,
    pub index:       usize,
    pub nsteps:      usize,
    /// Absolute step number of the run's step 0 in its output files.
    pub step_offset: usize,
    pub files:       RunFiles,
}


#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AlignOptions {
    pub scalar_cadence:     usize,
    pub trajectory_cadence: usize,
    pub zero_based:         bool,
    pub energy_column:      EnergyColumn,
    pub timestep_fs:        f64,
}


impl AlignOptions {
    pub fn selector(&self, nsteps: usize) -> StepSelector {
        StepSelector::new(self.scalar_cadence, self.trajectory_cadence, self.zero_based, nsteps)
    }
}


/// Frames of a single run stacked into tensors.
#[derive(Clone, Debug)]
pub struct AlignedRun {
    pub name:       String,
    pub index:      usize,
    pub steps:      Vec<usize>,
    /// `None` only if no frame was selected from the run.
    pub vocabulary: Option<TypeVocabulary>,
    pub trajectory: Trajectory,
}


impl AlignedRun {
    pub fn nframes(&self) -> usize { self.steps.len() }
}


#[derive(Default)]
struct FrameStack {
    steps:    Vec<usize>,
    coords:   Vec<[f64; 3]>,
    forces:   Vec<[f64; 3]>,
    energies: Vec<f64>,
    cells:    Vec<Mat33<f64>>,
}


impl FrameStack {
    fn push(&mut self, frame: FrameRecord) {
        self.steps.push(frame.step);
        self.coords.extend(frame.positions);
        self.forces.extend(frame.forces);
        self.energies.push(frame.energy);
        if let Some(c) = frame.cell {
            self.cells.push(c);
        }
    }

    fn into_trajectory(self, natoms: usize, with_cell: bool) -> Trajectory {
        let nframes = self.steps.len();
        if nframes == 0 {
            return Trajectory::empty(natoms, with_cell);
        }

        let coords = Array3::from_shape_fn((nframes, natoms, 3), |(i, j, k)| self.coords[i * natoms + j][k]);
        let forces = Array3::from_shape_fn((nframes, natoms, 3), |(i, j, k)| self.forces[i * natoms + j][k]);
        let cells  = with_cell.then(|| Array2::from_shape_fn((nframes, 9), |(i, k)| self.cells[i][k / 3][k % 3]));

        Trajectory {
            coords,
            forces,
            energies: Array1::from(self.energies),
            cells,
        }
    }
}


/// Parses one run from disk. See [`align_frames`].
pub fn align_run(run: &RunDescriptor, opts: &AlignOptions) -> Result<AlignedRun, ConvertError> {
    info!("Processing run #{} {:?} with {} declared steps ...", run.index + 1, run.name, run.nsteps);
    let sources = FrameSources::open(&run.files, run.step_offset, opts.trajectory_cadence)
        .map_err(|e| ConvertError::parse(&run.name, e))?;
    info!("Run {:?}: reading forces as {} blocks from {:?}", run.name, sources.forces.format(), run.files.forces);
    align_frames(run, sources, opts)
}


/// Collects the frames on the common multiples of both cadences within the declared steps.
///
/// Fails with [`ConvertError::IncompleteRun`] if the trajectory holds fewer blocks than the
/// declared step count implies. Every frame is validated against the vocabulary of the
/// run's first frame.
pub fn align_frames<R: BufRead>(run: &RunDescriptor, sources: FrameSources<R>, opts: &AlignOptions) -> Result<AlignedRun, ConvertError> {
    let selector = opts.selector(run.nsteps);
    let with_cell = sources.cells.is_some();
    let mut reader = FrameReader::new(sources, selector, run.step_offset, opts.energy_column);

    let mut stack = FrameStack::default();
    let mut vocabulary: Option<TypeVocabulary> = None;
    let mut time_warned = false;

    for frame in reader.by_ref() {
        let frame = frame.map_err(|e| match e {
            ParseError::EndOfData { name, channel: "forces", step } => ConvertError::incomplete(&run.name, format!(
                "force trajectory {} ends before step {}", name, step)),
            e => ConvertError::parse(&run.name, e),
        })?;

        let vocab = vocabulary.get_or_insert_with(|| TypeVocabulary::from_frame(&frame));
        vocab.validate(&frame)
            .map_err(|reason| ConvertError::TypeMismatch { run: run.name.clone(), step: frame.step, reason })?;

        let expected_time = (run.step_offset + frame.step) as f64 * opts.timestep_fs;
        if !time_warned && (frame.time - expected_time).abs() > TIME_TOLERANCE_FS {
            warn!("Run {:?}: step {} is logged at {} fs, but {} fs is expected from timestep_fs = {}.",
                  run.name, frame.step, frame.time, expected_time, opts.timestep_fs);
            time_warned = true;
        }

        stack.push(frame);
    }

    if !reader.off_cadence_steps().is_empty() {
        warn!("Run {:?}: {} trajectory blocks lie off the trajectory cadence {} (first at step {}), check the cadence settings.",
              run.name, reader.off_cadence_steps().len(), selector.trajectory_cadence(), reader.off_cadence_steps()[0]);
    }

    let expected_blocks = selector.expected_trajectory_blocks();
    if reader.blocks_in_range() < expected_blocks {
        return Err(ConvertError::incomplete(&run.name, format!(
            "expected {} trajectory blocks in steps [{}, {}] at cadence {}, found {}",
            expected_blocks, selector.first_step(), selector.last_step(),
            selector.trajectory_cadence(), reader.blocks_in_range())));
    }

    let nframes = stack.steps.len();
    if nframes < selector.expected_frames() {
        let missing = selector.steps().find(|s| !stack.steps.contains(s)).unwrap_or_default();
        return Err(ConvertError::incomplete(&run.name, format!(
            "expected {} frames on multiples of {}, found {} (step {} is missing)",
            selector.expected_frames(), selector.period(), nframes, missing)));
    }

    let natoms = vocabulary.as_ref().map_or(0, |v| v.natoms());
    info!("Run {:?}: {} frames aligned from {} trajectory blocks (period {} steps).",
          run.name, nframes, reader.blocks_in_range(), selector.period());

    Ok(AlignedRun {
        name: run.name.clone(),
        index: run.index,
        steps: stack.steps.clone(),
        vocabulary,
        trajectory: stack.into_trajectory(natoms, with_cell),
    })
}
