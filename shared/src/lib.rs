use std::fs;
use std::path::Path;

pub use anyhow::{
    self,
    Result,
    Context,
    bail,
    ensure,
};
pub use ndarray::{
    self,
    Array1,
    Array2,
    Array3,
};
pub use regex::Regex;
pub use log::{
    self,
    warn,
    info,
    debug,
    error,
};

pub mod trajectory;
pub use trajectory::Trajectory;

// Convenient types
pub type MatX3<T> = Vec<[T;3]>;  // Nx3 matrix
pub type Mat33<T> = [[T;3];3];   // 3x3 matrix


/// Copies the contents of one file to another. Permission bits are preserved.
///
/// If `to` will be overwritten if it exists. If `to` is a directory, a file with same name of
/// `from` will be created and written inside it.
pub fn copy_file_to<P, Q>(from: P, to: Q) -> Result<u64>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let from = from.as_ref();
    ensure!(from.is_file(), "Cannot copy {:?}: not a regular file.", from);

    if !to.as_ref().is_dir() {
        return Ok(fs::copy(from, to)?);
    }

    let fname = from.file_name()
        .with_context(|| format!("Cannot extract file name from {:?}.", from))?;
    let target = to.as_ref().join(fname);
    Ok(fs::copy(from, target)?)
}


#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_copy_file_to_dir() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("convert_config.toml");
        fs::write(&src, "runs = []\n").unwrap();

        let dst = dir.path().join("out");
        fs::create_dir(&dst).unwrap();

        let n = copy_file_to(&src, &dst).unwrap();
        assert_eq!(n, 10);
        assert_eq!(fs::read_to_string(dst.join("convert_config.toml")).unwrap(), "runs = []\n");
    }

    #[test]
    fn test_copy_file_to_missing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(copy_file_to(dir.path().join("nope"), dir.path()).is_err());
    }
}
