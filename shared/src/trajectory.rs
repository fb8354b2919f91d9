use std::ops::Range;

use ndarray::{
    s,
    concatenate,
    Axis,
    ArrayView,
    Dimension,
};

use crate::{
    Array1,
    Array2,
    Array3,
    Result,
    bail,
    ensure,
};


/// Stacked per-frame tensors of one trajectory, all indexed by frame along axis 0.
#[derive(Clone, Debug, PartialEq)]
pub struct Trajectory {
    pub coords:   Array3<f64>,          // iframe, iatom, ixyz
    pub forces:   Array3<f64>,          // iframe, iatom, ixyz
    pub energies: Array1<f64>,          // iframe
    pub cells:    Option<Array2<f64>>,  // iframe, 9
}


impl Trajectory {
    pub fn empty(natoms: usize, with_cell: bool) -> Self {
        Self {
            coords:   Array3::zeros((0, natoms, 3)),
            forces:   Array3::zeros((0, natoms, 3)),
            energies: Array1::zeros(0),
            cells:    with_cell.then(|| Array2::zeros((0, 9))),
        }
    }

    pub fn nframes(&self) -> usize { self.energies.len() }
    pub fn natoms(&self) -> usize { self.coords.shape()[1] }

    /// Copies out the frames in `range`. Panics if the range is out of bounds.
    pub fn slice(&self, range: Range<usize>) -> Self {
        Self {
            coords:   self.coords.slice(s![range.clone(), .., ..]).to_owned(),
            forces:   self.forces.slice(s![range.clone(), .., ..]).to_owned(),
            energies: self.energies.slice(s![range.clone()]).to_owned(),
            cells:    self.cells.as_ref().map(|c| c.slice(s![range, ..]).to_owned()),
        }
    }

    /// Joins trajectories along the frame axis, keeping their order.
    pub fn concatenate(parts: &[Trajectory]) -> Result<Self> {
        ensure!(!parts.is_empty(), "Nothing to concatenate: no trajectory given.");

        let natoms = parts[0].natoms();
        let with_cell = parts[0].cells.is_some();
        for (i, p) in parts.iter().enumerate() {
            ensure!(p.natoms() == natoms,
                "Trajectory #{} has {} atoms while the first one has {}.", i, p.natoms(), natoms);
            if p.cells.is_some() != with_cell {
                bail!("Trajectory #{} disagrees with the first one on whether cells are present.", i);
            }
        }

        let cells = if with_cell {
            Some(stack_views(parts.iter().filter_map(|p| p.cells.as_ref()).map(|c| c.view()))?)
        } else {
            None
        };

        Ok(Self {
            coords:   stack_views(parts.iter().map(|p| p.coords.view()))?,
            forces:   stack_views(parts.iter().map(|p| p.forces.view()))?,
            energies: stack_views(parts.iter().map(|p| p.energies.view()))?,
            cells,
        })
    }
}


fn stack_views<'a, D, I>(views: I) -> Result<ndarray::Array<f64, D>>
where
    D: Dimension + ndarray::RemoveAxis,
    I: Iterator<Item = ArrayView<'a, f64, D>>,
{
    let views = views.collect::<Vec<_>>();
    Ok(concatenate(Axis(0), &views)?)
}


#[cfg(test)]
mod tests {
    use super::*;

    fn make(nframes: usize, natoms: usize, base: f64) -> Trajectory {
        let coords = Array3::from_shape_fn((nframes, natoms, 3), |(i, j, k)| base + (i * 100 + j * 10 + k) as f64);
        Trajectory {
            forces:   coords.mapv(|x| -x),
            coords,
            energies: Array1::from_shape_fn(nframes, |i| base + i as f64),
            cells:    None,
        }
    }

    #[test]
    fn test_slice_and_concatenate() {
        let t = make(7, 2, 0.0);
        let a = t.slice(0 .. 3);
        let b = t.slice(3 .. 7);
        assert_eq!(a.nframes(), 3);
        assert_eq!(b.nframes(), 4);
        assert_eq!(Trajectory::concatenate(&[a, b]).unwrap(), t);
    }

    #[test]
    fn test_concatenate_mismatch() {
        let a = make(2, 2, 0.0);
        let b = make(2, 3, 0.0);
        assert!(Trajectory::concatenate(&[a.clone(), b]).is_err());

        let mut c = make(1, 2, 0.0);
        c.cells = Some(Array2::zeros((1, 9)));
        assert!(Trajectory::concatenate(&[a, c]).is_err());
        assert!(Trajectory::concatenate(&[]).is_err());
    }

    #[test]
    fn test_empty() {
        let t = Trajectory::empty(5, true);
        assert_eq!(t.nframes(), 0);
        assert_eq!(t.natoms(), 5);
        assert_eq!(t.cells.unwrap().shape(), &[0, 9]);
    }
}
