//! Step selection shared by the energy log and the trajectory log.
//!
//! CP2K samples the energy log every `scalar_cadence` steps and the trajectory every
//! `trajectory_cadence` steps. A frame is complete only on steps present in both logs,
//! i.e. on the common multiples of the two cadences.


#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StepSelector {
    scalar_cadence:     usize,
    trajectory_cadence: usize,
    first_step:         usize,
    last_step:          usize,
}


fn gcd(a: usize, b: usize) -> usize {
    if b == 0 { a } else { gcd(b, a % b) }
}


/// Number of multiples of `m` in the closed interval `[lo, hi]`.
fn count_multiples(m: usize, lo: usize, hi: usize) -> usize {
    let first = (lo + m - 1) / m;
    let last  = hi / m;
    if hi < lo || last < first { 0 } else { last - first + 1 }
}


impl StepSelector {
    /// Cadences of zero are treated as one.
    pub fn new(scalar_cadence: usize, trajectory_cadence: usize, zero_based: bool, declared_steps: usize) -> Self {
        Self {
            scalar_cadence:     scalar_cadence.max(1),
            trajectory_cadence: trajectory_cadence.max(1),
            first_step:         if zero_based { 0 } else { 1 },
            last_step:          declared_steps,
        }
    }

    pub fn first_step(&self) -> usize { self.first_step }
    pub fn last_step(&self) -> usize { self.last_step }
    pub fn scalar_cadence(&self) -> usize { self.scalar_cadence }
    pub fn trajectory_cadence(&self) -> usize { self.trajectory_cadence }

    /// Least common multiple of both cadences.
    pub fn period(&self) -> usize {
        self.scalar_cadence / gcd(self.scalar_cadence, self.trajectory_cadence) * self.trajectory_cadence
    }

    pub fn in_range(&self, step: usize) -> bool {
        (self.first_step ..= self.last_step).contains(&step)
    }

    pub fn contains(&self, step: usize) -> bool {
        self.in_range(step) && step % self.period() == 0
    }

    /// All selected steps in increasing order.
    pub fn steps(&self) -> impl Iterator<Item = usize> {
        let period = self.period();
        let start  = (self.first_step + period - 1) / period * period;
        (start ..= self.last_step).step_by(period)
    }

    pub fn expected_frames(&self) -> usize {
        count_multiples(self.period(), self.first_step, self.last_step)
    }

    /// Trajectory blocks the run must contain within `[first_step, last_step]`.
    pub fn expected_trajectory_blocks(&self) -> usize {
        count_multiples(self.trajectory_cadence, self.first_step, self.last_step)
    }
}
