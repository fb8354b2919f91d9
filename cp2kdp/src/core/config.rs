use std::fs;
use std::fmt;
use std::path::Path;

use serde::Deserialize;
use shared::{
    log,
    anyhow::ensure,
    Context,
    Result,
};


/// TOML-backed configuration. `Display` must render a valid config file.
pub trait DpConfig: Clone + Sized + Default + fmt::Display + for<'a> Deserialize<'a> {
    /// Semantic checks on top of deserialization.
    fn check_config(&self) -> Result<()>;

    fn from_file<P>(fname: P) -> Result<Self>
    where P: AsRef<Path> {
        let fname = fname.as_ref();
        ensure!(fname.is_file(), "Config file {:?} not available.", fname);
        let raw = fs::read_to_string(fname)?;
        let cfg = toml::from_str::<Self>(&raw)
            .with_context(|| format!("Failed to parse config file {:?}.", fname))?;
        cfg.check_config()?;
        Ok(cfg)
    }

    fn to_file<P>(&self, fname: P) -> Result<()>
    where P: AsRef<Path> {
        if fname.as_ref().is_file() {
            log::warn!("File {:?} exists, overwriting ...", fname.as_ref());
        }
        log::info!("Writing config to file {:?}", fname.as_ref());
        fs::write(fname.as_ref(), self.to_string())?;
        Ok(())
    }
}
