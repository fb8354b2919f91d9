use std::ops::Range;

use rayon::prelude::*;
use shared::{info, Trajectory};

use crate::constants::{HARTREE_TO_EV, FORCE_AU_TO_EV_PER_ANGSTROM};
use crate::convert::aligner::{align_run, AlignOptions, AlignedRun, RunDescriptor};
use crate::convert::vocabulary::TypeVocabulary;
use crate::error::ConvertError;


/// Scale factors applied to energies and forces after stacking.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UnitConversion {
    pub energy: f64,
    pub force:  f64,
}


impl UnitConversion {
    pub fn identity() -> Self {
        Self { energy: 1.0, force: 1.0 }
    }

    /// Hartree => eV, Hartree/Bohr => eV/Angstrom.
    pub fn atomic_to_metal() -> Self {
        Self { energy: HARTREE_TO_EV, force: FORCE_AU_TO_EV_PER_ANGSTROM }
    }

    pub fn from_flag(convert_units: bool) -> Self {
        if convert_units { Self::atomic_to_metal() } else { Self::identity() }
    }

    fn apply(&self, traj: &mut Trajectory) {
        if self.energy != 1.0 {
            traj.energies *= self.energy;
        }
        if self.force != 1.0 {
            traj.forces *= self.force;
        }
    }
}


impl Default for UnitConversion {
    fn default() -> Self { Self::identity() }
}


#[derive(Clone, Debug)]
pub struct AssembledTrajectory {
    pub vocabulary: TypeVocabulary,
    pub trajectory: Trajectory,
    /// Frame range each run occupies, in run order.
    pub run_ranges: Vec<(String, Range<usize>)>,
}


impl AssembledTrajectory {
    pub fn nframes(&self) -> usize { self.trajectory.nframes() }
}


/// Parses every run, in parallel on the current rayon pool, and stacks them in list order.
pub fn assemble(runs: &[RunDescriptor], opts: &AlignOptions, units: UnitConversion) -> Result<AssembledTrajectory, ConvertError> {
    let aligned = runs.par_iter()
        .map(|run| align_run(run, opts))
        .collect::<Result<Vec<_>, _>>()?;
    merge_runs(aligned, units)
}


/// Concatenates aligned runs in the given order.
///
/// The vocabulary is taken from the first run holding any frame; all other runs must carry
/// the same ordered atom list.
pub fn merge_runs(runs: Vec<AlignedRun>, units: UnitConversion) -> Result<AssembledTrajectory, ConvertError> {
    let vocabulary = runs.iter()
        .find_map(|r| r.vocabulary.clone())
        .ok_or(ConvertError::EmptyTrajectory)?;

    let mut run_ranges = Vec::with_capacity(runs.len());
    let mut parts = Vec::with_capacity(runs.len());
    let mut start = 0;

    for run in runs.into_iter() {
        if let Some(v) = run.vocabulary.as_ref() {
            vocabulary.validate_labels("positions", v.atom_labels())
                .map_err(|reason| ConvertError::TypeMismatch {
                    run: run.name.clone(),
                    step: run.steps[0],
                    reason,
                })?;
        }

        let nframes = run.nframes();
        let end = start + nframes;
        run_ranges.push((run.name, start .. end));
        start = end;

        if nframes > 0 {
            parts.push(run.trajectory);
        }
    }

    let mut trajectory = Trajectory::concatenate(&parts)?;
    units.apply(&mut trajectory);

    info!("Assembled {} frames of {} atoms from {} runs.", trajectory.nframes(), vocabulary.natoms(), run_ranges.len());

    Ok(AssembledTrajectory { vocabulary, trajectory, run_ranges })
}
