use std::fmt;
use std::path::{Path, PathBuf};

use serde::{de::Error, Deserialize, Deserializer};
use shared::{
    log,
    bail,
    Result,
};

use crate::core::DpConfig;
use crate::convert::aligner::{AlignOptions, RunDescriptor, RunFiles};
use crate::convert::assembler::UnitConversion;
use crate::convert::frames::EnergyColumn;
use crate::convert::splitter::{SplitPlan, TrainTestSplit};
use crate::convert::writer::OutputDtype;


#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConvertConfig {
    #[serde(default = "ConvertConfig::default_main_path")]
    main_path: PathBuf,

    // Output directory, falls back to `main_path` if absent.
    save_path: Option<PathBuf>,

    // Run prefixes, resolved as `main_path/<run><suffix>` for every channel.
    // The order of this list is the order of frames in the output.
    runs: Vec<String>,
    steps_per_run: Vec<usize>,

    #[serde(default = "ConvertConfig::default_cadence")]
    scalar_log_cadence: usize,

    // Defaults to `scalar_log_cadence`.
    trajectory_log_cadence: Option<usize>,

    timestep_fs: f64,

    #[serde(default)]
    zero_based_steps: bool,

    split_count: Option<usize>,

    // Absolute step number of each run's first step, for restarted runs that keep counting.
    step_offsets: Option<Vec<usize>>,

    #[serde(default = "ConvertConfig::default_energy_column",
            deserialize_with = "ConvertConfig::parse_energy_column")]
    energy_column: EnergyColumn,

    #[serde(default)]
    with_cell: bool,

    #[serde(default)]
    convert_units: bool,

    #[serde(default = "ConvertConfig::default_dtype",
            deserialize_with = "ConvertConfig::parse_dtype")]
    dtype: OutputDtype,

    train_fraction: Option<f64>,

    // Whether `split_count` also applies to `train/` and `test/`.
    #[serde(default = "ConvertConfig::default_split_train")]
    split_train: bool,
    #[serde(default)]
    split_test: bool,

    #[serde(default = "ConvertConfig::default_pos_suffix")]
    pos_suffix: String,
    #[serde(default = "ConvertConfig::default_force_suffix")]
    force_suffix: String,
    #[serde(default = "ConvertConfig::default_energy_suffix")]
    energy_suffix: String,
    #[serde(default = "ConvertConfig::default_cell_suffix")]
    cell_suffix: String,
}


impl ConvertConfig {
    fn default_main_path() -> PathBuf { PathBuf::from(".") }
    fn default_cadence() -> usize { 1 }
    fn default_energy_column() -> EnergyColumn { EnergyColumn::Conserved }
    fn default_dtype() -> OutputDtype { OutputDtype::F64 }
    fn default_split_train() -> bool { true }
    fn default_pos_suffix() -> String { "-pos-1.xyz".into() }
    fn default_force_suffix() -> String { "-frc-1.xyz".into() }
    fn default_energy_suffix() -> String { "-1.ener".into() }
    fn default_cell_suffix() -> String { "-1.cell".into() }

    fn parse_energy_column<'de, D>(deserializer: D) -> std::result::Result<EnergyColumn, D::Error>
    where D: Deserializer<'de> {
        let s = String::deserialize(deserializer)?;
        EnergyColumn::from_str(&s).ok_or_else(|| D::Error::custom(
            format!("Invalid energy_column from input: {}, available columns: conserved, potential", &s)
        ))
    }

    fn parse_dtype<'de, D>(deserializer: D) -> std::result::Result<OutputDtype, D::Error>
    where D: Deserializer<'de> {
        let s = String::deserialize(deserializer)?;
        OutputDtype::from_str(&s).ok_or_else(|| D::Error::custom(
            format!("Invalid dtype from input: {}, available types: f64, f32", &s)
        ))
    }


    pub fn get_main_path(&self) -> &PathBuf { &self.main_path }
    pub fn get_save_path(&self) -> &PathBuf { self.save_path.as_ref().unwrap_or(&self.main_path) }
    pub fn get_runs(&self) -> &[String] { &self.runs }
    pub fn get_steps_per_run(&self) -> &[usize] { &self.steps_per_run }
    pub fn get_scalar_log_cadence(&self) -> usize { self.scalar_log_cadence }
    pub fn get_trajectory_log_cadence(&self) -> usize { self.trajectory_log_cadence.unwrap_or(self.scalar_log_cadence) }
    pub fn get_timestep_fs(&self) -> f64 { self.timestep_fs }
    pub fn get_zero_based_steps(&self) -> bool { self.zero_based_steps }
    pub fn get_split_count(&self) -> usize { self.split_count.unwrap_or(1) }
    pub fn get_energy_column(&self) -> EnergyColumn { self.energy_column }
    pub fn get_with_cell(&self) -> bool { self.with_cell }
    pub fn get_convert_units(&self) -> bool { self.convert_units }
    pub fn get_dtype(&self) -> OutputDtype { self.dtype }
    pub fn get_train_fraction(&self) -> Option<f64> { self.train_fraction }
    pub fn get_split_train(&self) -> bool { self.split_train }
    pub fn get_split_test(&self) -> bool { self.split_test }

    pub fn get_step_offset(&self, irun: usize) -> usize {
        self.step_offsets.as_ref()
            .and_then(|o| o.get(irun).copied())
            .unwrap_or(0)
    }


    pub fn run_files(&self, run: &str) -> RunFiles {
        let file = |suffix: &str| self.main_path.join(format!("{}{}", run, suffix));
        RunFiles {
            positions: file(&self.pos_suffix),
            forces:    file(&self.force_suffix),
            energy:    file(&self.energy_suffix),
            cell:      self.with_cell.then(|| file(&self.cell_suffix)),
        }
    }

    pub fn run_descriptors(&self) -> Vec<RunDescriptor> {
        self.runs.iter()
            .zip(self.steps_per_run.iter())
            .enumerate()
            .map(|(index, (name, &nsteps))| RunDescriptor {
                name: name.clone(),
                index,
                nsteps,
                step_offset: self.get_step_offset(index),
                files: self.run_files(name),
            })
            .collect()
    }

    pub fn align_options(&self) -> AlignOptions {
        AlignOptions {
            scalar_cadence:     self.scalar_log_cadence,
            trajectory_cadence: self.get_trajectory_log_cadence(),
            zero_based:         self.zero_based_steps,
            energy_column:      self.energy_column,
            timestep_fs:        self.timestep_fs,
        }
    }

    pub fn unit_conversion(&self) -> UnitConversion { UnitConversion::from_flag(self.convert_units) }
    pub fn split_plan(&self) -> SplitPlan { SplitPlan::new(self.get_split_count()) }
    pub fn train_test_split(&self) -> Option<TrainTestSplit> {
        self.train_fraction
            .map(|f| TrainTestSplit::new(f).with_split_parts(self.split_train, self.split_test))
    }


    fn check_input_files(&self, errors: &mut Vec<String>) {
        if !self.main_path.is_dir() {
            errors.push(format!("Field 'main_path' {:?} is not a directory.", self.main_path));
            return;
        }

        for run in self.run_descriptors() {
            let files = run.files;
            let paths = [Some(&files.positions), Some(&files.forces), Some(&files.energy), files.cell.as_ref()];
            for path in paths.into_iter().flatten() {
                if !is_input_file(path) {
                    errors.push(format!("Input file {:?} of run {:?} not found.", path, run.name));
                }
            }
        }
    }

    fn check_fields(&self, errors: &mut Vec<String>) {
        let nruns = self.runs.len();
        if nruns == 0 {
            errors.push("Field 'runs' must contain at least one run.".into());
        }

        if self.runs.iter().any(|r| r.trim().is_empty()) {
            errors.push("Field 'runs' contains empty entries, which is not allowed.".into());
        }

        if self.steps_per_run.len() != nruns {
            errors.push(format!("Number of entries in 'steps_per_run' is not consistent with 'runs': {} != {}",
                                self.steps_per_run.len(), nruns));
        }

        if let Some(offsets) = self.step_offsets.as_ref() {
            if offsets.len() != nruns {
                errors.push(format!("Number of entries in 'step_offsets' is not consistent with 'runs': {} != {}",
                                    offsets.len(), nruns));
            }
        }

        if self.scalar_log_cadence == 0 {
            errors.push("Field 'scalar_log_cadence' cannot be 0.".into());
        }

        if self.trajectory_log_cadence == Some(0) {
            errors.push("Field 'trajectory_log_cadence' cannot be 0.".into());
        }

        if !(self.timestep_fs > 0.0 && self.timestep_fs.is_finite()) {
            errors.push(format!("Field 'timestep_fs' must be a positive number, got {}.", self.timestep_fs));
        }

        if self.split_count == Some(0) {
            errors.push("Field 'split_count' cannot be 0.".into());
        }

        if let Some(f) = self.train_fraction {
            if !(f > 0.0 && f < 1.0) {
                errors.push(format!("Field 'train_fraction' must lie strictly between 0 and 1, got {}.", f));
            }
        }

        for (key, suffix) in [("pos_suffix", &self.pos_suffix), ("force_suffix", &self.force_suffix),
                              ("energy_suffix", &self.energy_suffix), ("cell_suffix", &self.cell_suffix)] {
            if suffix.is_empty() {
                errors.push(format!("Field '{}' cannot be empty.", key));
            }
        }
    }

    pub fn print_to_log(&self) {
        let input_print = format!("{}", self);
        let hashtag_line = "#".repeat(120);
        log::info!("Input file loaded. The formatted input is:\n\n{hashtag_line}\n{}\n{hashtag_line}\n\n", input_print);
    }
}


/// Accepts plain and gzip-compressed inputs.
fn is_input_file(path: &Path) -> bool {
    if path.is_file() {
        return true;
    }
    let mut gz = path.as_os_str().to_owned();
    gz.push(".gz");
    Path::new(&gz).is_file()
}


impl fmt::Display for ConvertConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# cp2kdp config for converting CP2K AIMD output into DeePMD-kit training data")?;
        writeln!(f)?;

        writeln!(f, " {:>22} = {:?}", "main_path", self.main_path)?;
        if let Some(save_path) = self.save_path.as_ref() {
            writeln!(f, " {:>22} = {:?}", "save_path", save_path)?;
        } else {
            writeln!(f, "#{:>22} = \"deepmd\"  # defaults to main_path", "save_path")?;
        }
        writeln!(f, " {:>22} = {:?}", "runs", self.runs)?;
        writeln!(f, " {:>22} = {:?}", "steps_per_run", self.steps_per_run)?;
        writeln!(f, " {:>22} = {}",   "scalar_log_cadence", self.scalar_log_cadence)?;
        if let Some(c) = self.trajectory_log_cadence {
            writeln!(f, " {:>22} = {}", "trajectory_log_cadence", c)?;
        } else {
            writeln!(f, "#{:>22} = 1  # defaults to scalar_log_cadence", "trajectory_log_cadence")?;
        }
        writeln!(f, " {:>22} = {:?}", "timestep_fs", self.timestep_fs)?;
        writeln!(f, " {:>22} = {}",   "zero_based_steps", self.zero_based_steps)?;
        if let Some(k) = self.split_count {
            writeln!(f, " {:>22} = {}", "split_count", k)?;
        } else {
            writeln!(f, "#{:>22} = 10  # everything goes to set.000 if absent", "split_count")?;
        }
        if let Some(offsets) = self.step_offsets.as_ref() {
            writeln!(f, " {:>22} = {:?}", "step_offsets", offsets)?;
        } else {
            writeln!(f, "#{:>22} = [0, 4000]  # one per run", "step_offsets")?;
        }
        writeln!(f, " {:>22} = \"{}\"", "energy_column", self.energy_column)?;
        writeln!(f, " {:>22} = {}",   "with_cell", self.with_cell)?;
        writeln!(f, " {:>22} = {}",   "convert_units", self.convert_units)?;
        writeln!(f, " {:>22} = \"{}\"", "dtype", self.dtype)?;
        if let Some(frac) = self.train_fraction {
            writeln!(f, " {:>22} = {:?}", "train_fraction", frac)?;
        } else {
            writeln!(f, "#{:>22} = 0.8  # writes train/ and test/ if present", "train_fraction")?;
        }
        writeln!(f, " {:>22} = {}",   "split_train", self.split_train)?;
        writeln!(f, " {:>22} = {}",   "split_test", self.split_test)?;
        writeln!(f, " {:>22} = {:?}", "pos_suffix", self.pos_suffix)?;
        writeln!(f, " {:>22} = {:?}", "force_suffix", self.force_suffix)?;
        writeln!(f, " {:>22} = {:?}", "energy_suffix", self.energy_suffix)?;
        writeln!(f, " {:>22} = {:?}", "cell_suffix", self.cell_suffix)?;

        Ok(())
    }
}


impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            main_path: PathBuf::from("."),
            save_path: Some(PathBuf::from("deepmd")),
            runs: vec!["md-00000-04000".into(), "md-04000-06000".into()],
            steps_per_run: vec![4000, 2000],
            scalar_log_cadence: 1,
            trajectory_log_cadence: None,
            timestep_fs: 0.5,
            zero_based_steps: false,
            split_count: None,
            step_offsets: None,
            energy_column: EnergyColumn::Conserved,
            with_cell: false,
            convert_units: false,
            dtype: OutputDtype::F64,
            train_fraction: None,
            split_train: true,
            split_test: false,
            pos_suffix: Self::default_pos_suffix(),
            force_suffix: Self::default_force_suffix(),
            energy_suffix: Self::default_energy_suffix(),
            cell_suffix: Self::default_cell_suffix(),
        }
    }
}


impl DpConfig for ConvertConfig {
    fn check_config(&self) -> Result<()> {
        let mut errors = vec![];
        self.check_fields(&mut errors);
        if errors.is_empty() {
            self.check_input_files(&mut errors);
        }

        if !errors.is_empty() {
            bail!("Invalid config:\n  - {}", errors.join("\n  - "));
        }

        if self.train_fraction.is_none() && (!self.split_train || self.split_test) {
            log::warn!("Fields 'split_train' and 'split_test' only take effect with 'train_fraction'.");
        }

        let save_path = self.get_save_path();
        if ["set.000", "train", "test"].iter().any(|d| save_path.join(d).exists()) {
            log::warn!("Output directory {:?} already holds a dataset, its sets will be replaced.", save_path);
        }

        Ok(())
    }
}
