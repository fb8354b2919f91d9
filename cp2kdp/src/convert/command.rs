use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use shared::{
    copy_file_to,
    log,
    Context,
    Result,
};

use crate::OptProcess;
use crate::core::DpConfig;
use crate::convert::{ConvertConfig, DpDataset};
use crate::logging::logger_redirect;


#[derive(Debug, Parser)]
/// Convert CP2K AIMD trajectories into DeePMD-kit training data.
///
/// Positions, forces and energies (and optionally cells) of every run are aligned on the
/// steps where all of them were logged, stacked in run order and written as `npy` sets.
pub struct ConvertCommand {
    #[arg(short='n', long, default_value_t=0)]
    /// Number of threads for parsing runs in parallel.
    ///
    /// If 0 is set, it will fall back to the number of logic CPU cores of you machine.
    nthreads: usize,

    #[arg(short='c', long, default_value="convert_config.toml", aliases=["cfg", "conf"])]
    /// Config file name.
    ///
    /// Aliases: "cfg", "conf".
    config: PathBuf,

    #[arg(long, value_enum, alias="gen")]
    /// Generate auxiliary files for the conversion.
    ///
    /// The conversion will not run if this flag is set.
    ///
    /// Alias: "gen"
    generate: Option<TemplateGenerator>,
}


#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum TemplateGenerator {
    #[value(aliases=["config", "cfg", "conf"])]
    /// Generate config template for the conversion. Aliases: "config", "cfg", "conf".
    ConfigTemplate,
}


fn same_dir(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}


impl OptProcess for ConvertCommand {
    fn process(&self) -> Result<()> {
        use TemplateGenerator::*;

        if let Some(g) = self.generate {
            return match g {
                ConfigTemplate => ConvertConfig::default().to_file("convert_config_template.toml"),
            }
        }

        rayon::ThreadPoolBuilder::new().num_threads(self.nthreads).build_global()?;

        let cfg = ConvertConfig::from_file(&self.config)?;
        cfg.print_to_log();

        let dataset = DpDataset::from_config(&cfg)?;
        dataset.log_summary();

        let save_path = cfg.get_save_path();
        fs::create_dir_all(save_path)
            .with_context(|| format!("Cannot create output directory {:?}.", save_path))?;
        logger_redirect(save_path)?;
        log::info!("Log redirected to {:?}", save_path.join("run.log"));

        dataset.save_to_dir(save_path)?;

        let config_dir = self.config.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
        if !same_dir(config_dir, save_path) {
            copy_file_to(&self.config, save_path)?;
        }

        log::info!("Conversion finished, dataset written to {:?}", save_path);
        Ok(())
    }
}
