//! Writes the DeePMD-kit `npy` dataset layout.
//!
//! ```text
//! save_path/
//! ├── type.raw          per-atom type id
//! ├── type_map.raw      species label of each type id
//! ├── set.000/
//! │   ├── coord.npy     [nframes, natoms, 3]
//! │   ├── force.npy     [nframes, natoms, 3]
//! │   ├── energy.npy    [nframes]
//! │   └── box.npy       [nframes, 9], only with cells
//! └── ...
//! ```

use std::fmt;
use std::fs;
use std::path::Path;

use itertools::Itertools;
use ndarray_npy::write_npy;
use shared::{info, ndarray::{ArrayBase, Data, Dimension}, Trajectory};

use crate::convert::splitter::Subset;
use crate::convert::vocabulary::TypeVocabulary;
use crate::error::ConvertError;


#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputDtype {
    F32,
    F64,
}


impl fmt::Display for OutputDtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", match self {
            OutputDtype::F32 => "f32",
            OutputDtype::F64 => "f64",
        })
    }
}


impl OutputDtype {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "f32" | "float32" | "single" => Some(OutputDtype::F32),
            "f64" | "float64" | "double" => Some(OutputDtype::F64),
            _ => None,
        }
    }
}


fn write_array<S, D>(path: &Path, arr: &ArrayBase<S, D>, dtype: OutputDtype) -> Result<(), ConvertError>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    let ret = match dtype {
        OutputDtype::F64 => write_npy(path, arr),
        OutputDtype::F32 => write_npy(path, &arr.mapv(|x| x as f32)),
    };
    ret.map_err(|source| ConvertError::Npy { path: path.to_owned(), source })
}


/// Writes `type.raw` and `type_map.raw` into `dir`.
pub fn write_type_files(dir: &Path, vocabulary: &TypeVocabulary) -> Result<(), ConvertError> {
    fs::create_dir_all(dir).map_err(|e| ConvertError::io(dir, e))?;

    let type_raw = dir.join("type.raw");
    let content = vocabulary.atom_types().iter().join("\n") + "\n";
    fs::write(&type_raw, content).map_err(|e| ConvertError::io(&type_raw, e))?;

    let type_map = dir.join("type_map.raw");
    let content = vocabulary.types().iter().map(|t| t.label.as_str()).join("\n") + "\n";
    fs::write(&type_map, content).map_err(|e| ConvertError::io(&type_map, e))?;

    Ok(())
}


/// Writes the frames of `traj` as one set directory.
pub fn write_set(dir: &Path, traj: &Trajectory, dtype: OutputDtype) -> Result<(), ConvertError> {
    fs::create_dir_all(dir).map_err(|e| ConvertError::io(dir, e))?;

    write_array(&dir.join("coord.npy"),  &traj.coords,   dtype)?;
    write_array(&dir.join("force.npy"),  &traj.forces,   dtype)?;
    write_array(&dir.join("energy.npy"), &traj.energies, dtype)?;
    if let Some(cells) = traj.cells.as_ref() {
        write_array(&dir.join("box.npy"), cells, dtype)?;
    }

    Ok(())
}


fn is_set_dir_name(name: &str) -> bool {
    name.strip_prefix("set.")
        .map_or(false, |n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}


/// Removes every `set.NNN` directory directly under `dir`. A missing `dir` is fine.
pub fn remove_set_dirs(dir: &Path) -> Result<(), ConvertError> {
    if !dir.is_dir() {
        return Ok(());
    }

    for entry in fs::read_dir(dir).map_err(|e| ConvertError::io(dir, e))? {
        let entry = entry.map_err(|e| ConvertError::io(dir, e))?;
        let path = entry.path();
        let is_set = entry.file_name().to_str().map_or(false, is_set_dir_name);
        if is_set && path.is_dir() {
            fs::remove_dir_all(&path).map_err(|e| ConvertError::io(&path, e))?;
            info!("Removed stale set {:?}", path);
        }
    }

    Ok(())
}


/// Writes every planned subset under `root`. The plan must fit into `traj`.
///
/// Sets left by an earlier conversion into `root`, `root/train` or `root/test` are removed first,
/// so a smaller split count never leaves extra sets behind.
pub fn write_dataset(root: &Path, vocabulary: &TypeVocabulary, traj: &Trajectory,
                     subsets: &[Subset], dtype: OutputDtype) -> Result<(), ConvertError> {
    for dir in [root.to_owned(), root.join("train"), root.join("test")] {
        remove_set_dirs(&dir)?;
    }

    for subset in subsets {
        let dir = match subset.dir {
            Some(d) => root.join(d),
            None => root.to_owned(),
        };
        write_type_files(&dir, vocabulary)?;

        for set in subset.sets.iter() {
            let set_dir = dir.join(&set.name);
            write_set(&set_dir, &traj.slice(set.range.clone()), dtype)?;
            info!("Written {:>6} frames ({} .. {}) to {:?}", set.len(), set.range.start, set.range.end, set_dir);
        }
    }

    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;
    use ndarray_npy::read_npy;
    use shared::{Array1, Array2, Array3};
    use crate::convert::splitter::{plan_subsets, SplitPlan, TrainTestSplit};

    fn trajectory(nframes: usize, with_cell: bool) -> Trajectory {
        Trajectory {
            coords:   Array3::from_shape_fn((nframes, 3, 3), |(i, j, k)| (i * 100 + j * 10 + k) as f64),
            forces:   Array3::from_shape_fn((nframes, 3, 3), |(i, j, k)| -((i * 100 + j * 10 + k) as f64)),
            energies: Array1::from_shape_fn(nframes, |i| i as f64 * 0.25),
            cells:    with_cell.then(|| Array2::from_shape_fn((nframes, 9), |(i, k)| (i + k) as f64)),
        }
    }

    #[test]
    fn test_write_type_files() {
        let dir = tempfile::tempdir().unwrap();
        let vocab = TypeVocabulary::from_labels(&["O", "H", "H", "C", "O"]);
        write_type_files(dir.path(), &vocab).unwrap();

        let type_raw = fs::read_to_string(dir.path().join("type.raw")).unwrap();
        assert_eq!(type_raw, "0\n1\n1\n2\n0\n");
        let type_map = fs::read_to_string(dir.path().join("type_map.raw")).unwrap();
        assert_eq!(type_map, "O\nH\nC\n");
    }

    #[test]
    fn test_write_sets() {
        let dir = tempfile::tempdir().unwrap();
        let vocab = TypeVocabulary::from_labels(&["O", "H", "H"]);
        let traj = trajectory(7, true);
        let subsets = plan_subsets(7, SplitPlan::new(3), None).unwrap();
        write_dataset(dir.path(), &vocab, &traj, &subsets, OutputDtype::F64).unwrap();

        let coord: Array3<f64> = read_npy(dir.path().join("set.001/coord.npy")).unwrap();
        assert_eq!(coord.shape(), &[2, 3, 3]);
        assert_eq!(coord[[0, 2, 1]], 321.0);

        let energy: Array1<f64> = read_npy(dir.path().join("set.002/energy.npy")).unwrap();
        assert_eq!(energy.to_vec(), vec![1.25, 1.5]);

        let cells: Array2<f64> = read_npy(dir.path().join("set.000/box.npy")).unwrap();
        assert_eq!(cells.shape(), &[3, 9]);
        assert!(!dir.path().join("set.003").exists());
    }

    #[test]
    fn test_write_f32_train_test() {
        let dir = tempfile::tempdir().unwrap();
        let vocab = TypeVocabulary::from_labels(&["O", "H", "H"]);
        let traj = trajectory(10, false);
        let subsets = plan_subsets(10, SplitPlan::single(), Some(TrainTestSplit::new(0.8))).unwrap();
        write_dataset(dir.path(), &vocab, &traj, &subsets, OutputDtype::F32).unwrap();

        let force: Array3<f32> = read_npy(dir.path().join("test/set.000/force.npy")).unwrap();
        assert_eq!(force.shape(), &[2, 3, 3]);
        assert_eq!(force[[0, 0, 0]], -800.0);
        assert!(dir.path().join("train/type.raw").is_file());
        assert!(dir.path().join("test/type_map.raw").is_file());
        assert!(!dir.path().join("train/set.000/box.npy").exists());
    }

    #[test]
    fn test_rewrite_with_fewer_sets() {
        let dir = tempfile::tempdir().unwrap();
        let vocab = TypeVocabulary::from_labels(&["O", "H", "H"]);
        let traj = trajectory(10, true);

        let subsets = plan_subsets(10, SplitPlan::new(3), Some(TrainTestSplit::new(0.8))).unwrap();
        write_dataset(dir.path(), &vocab, &traj, &subsets, OutputDtype::F64).unwrap();
        assert!(dir.path().join("train/set.002").is_dir());
        assert!(dir.path().join("test/set.000").is_dir());

        let subsets = plan_subsets(10, SplitPlan::new(3), None).unwrap();
        write_dataset(dir.path(), &vocab, &traj, &subsets, OutputDtype::F64).unwrap();
        assert!(!dir.path().join("train/set.000").exists());
        assert!(dir.path().join("set.002/box.npy").is_file());

        fs::write(dir.path().join("set.notes"), "kept").unwrap();
        let traj = trajectory(10, false);
        let subsets = plan_subsets(10, SplitPlan::single(), None).unwrap();
        write_dataset(dir.path(), &vocab, &traj, &subsets, OutputDtype::F64).unwrap();

        assert!(!dir.path().join("set.001").exists());
        assert!(!dir.path().join("set.002").exists());
        assert!(!dir.path().join("set.000/box.npy").exists());
        assert!(dir.path().join("set.notes").is_file());

        let coord: Array3<f64> = read_npy(dir.path().join("set.000/coord.npy")).unwrap();
        assert_eq!(coord.shape(), &[10, 3, 3]);
    }

    #[test]
    fn test_set_dir_names() {
        assert!(is_set_dir_name("set.000"));
        assert!(is_set_dir_name("set.1234"));
        assert!(!is_set_dir_name("set."));
        assert!(!is_set_dir_name("set.notes"));
        assert!(!is_set_dir_name("type.raw"));
    }

    #[test]
    fn test_dtype_names() {
        assert_eq!(OutputDtype::from_str("F32"), Some(OutputDtype::F32));
        assert_eq!(OutputDtype::from_str("double"), Some(OutputDtype::F64));
        assert_eq!(OutputDtype::from_str("f16"), None);
        assert_eq!(OutputDtype::F32.to_string(), "f32");
    }
}
