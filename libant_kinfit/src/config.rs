use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::analysis::reference::ReferenceConfig;
use super::analysis::signal::SignalConfig;
use super::analysis::PreselectionConfig;
use super::error::ConfigError;
use super::fit::settings::{FitSettings, ZVertex};
use super::prompt_random::{PromptRandomConfig, PromptRandomWindow};
use super::uncertainty::UncertaintyModelKind;

/// Settings shared by all fitters of the analysis
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FitConfig {
    pub z_vertex: ZVertex,
    pub settings: FitSettings,
}

/// Additional smearing of simulated events
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MCSmearConfig {
    pub model: UncertaintyModelKind,
    pub seed: u64,
}

/// Structure representing the application configuration. Contains pathing, run information
/// and every cut of the analysis.
/// Configs are seralizable and deserializable to YAML using serde and serde_yaml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub first_run_number: i32,
    pub last_run_number: i32,
    #[serde(default)]
    pub prompt_random: PromptRandomConfig,
    #[serde(default)]
    pub fit: FitConfig,
    #[serde(default)]
    pub preselection: PreselectionConfig,
    #[serde(default)]
    pub signal: SignalConfig,
    #[serde(default)]
    pub reference: ReferenceConfig,
    #[serde(default)]
    pub uncertainty_model: UncertaintyModelKind,
    #[serde(default)]
    pub mc_smear: Option<MCSmearConfig>,
}

impl Default for Config {
    /// Generate a new Config object. Paths will be invalid, the analysis settings are the
    /// standard ones.
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("None"),
            output_path: PathBuf::from("None"),
            first_run_number: 0,
            last_run_number: 0,
            prompt_random: PromptRandomConfig::default(),
            fit: FitConfig::default(),
            preselection: PreselectionConfig::default(),
            signal: SignalConfig::default(),
            reference: ReferenceConfig::default(),
            uncertainty_model: UncertaintyModelKind::default(),
            mc_smear: None,
        }
    }
}

impl Config {
    /// Read the configuration in a YAML file
    /// Returns a Config if successful
    pub fn read_config_file(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            return Err(ConfigError::BadFilePath(config_path.to_path_buf()));
        }

        let yaml_str = std::fs::read_to_string(config_path)?;

        Ok(serde_yaml::from_str::<Self>(&yaml_str)?)
    }

    /// Write the configuration to a YAML file
    pub fn write_config_file(&self, config_path: &Path) -> Result<(), ConfigError> {
        let yaml_str = serde_yaml::to_string(self)?;
        std::fs::write(config_path, yaml_str)?;
        Ok(())
    }

    /// Check the values that serde cannot check for us
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.signal.filter.n_photons != 4 {
            return Err(ConfigError::InvalidValue(
                String::from("signal.filter.n_photons"),
                format!("{} (the signal channel has 4 photons)", self.signal.filter.n_photons),
            ));
        }
        if self.reference.filter.n_photons != 2 {
            return Err(ConfigError::InvalidValue(
                String::from("reference.filter.n_photons"),
                format!(
                    "{} (the reference channel has 2 photons)",
                    self.reference.filter.n_photons
                ),
            ));
        }
        if self.fit.settings.max_iterations == 0 {
            return Err(ConfigError::InvalidValue(
                String::from("fit.settings.max_iterations"),
                String::from("0"),
            ));
        }
        if let ZVertex::Fitted { sigma } = self.fit.z_vertex {
            if !(sigma >= 0.0) {
                return Err(ConfigError::InvalidValue(
                    String::from("fit.z_vertex.sigma"),
                    sigma.to_string(),
                ));
            }
        }
        let models = std::iter::once(("uncertainty_model", &self.uncertainty_model))
            .chain(self.mc_smear.iter().map(|smear| ("mc_smear.model", &smear.model)));
        for (section, model) in models {
            if let Some((name, sigma)) = model.invalid_sigma() {
                return Err(ConfigError::InvalidValue(
                    format!("{section}.{name}"),
                    sigma.to_string(),
                ));
            }
        }
        if self.first_run_number > self.last_run_number {
            return Err(ConfigError::InvalidValue(
                String::from("last_run_number"),
                format!(
                    "{} (smaller than first_run_number {})",
                    self.last_run_number, self.first_run_number
                ),
            ));
        }
        PromptRandomWindow::from_config(&self.prompt_random)?;
        Ok(())
    }

    /// Check if a specific run exists by evaluating the existance of its input directory
    pub fn does_run_exist(&self, run_number: i32) -> bool {
        self.input_path.join(self.get_run_str(run_number)).exists()
    }

    /// Get the Path to the directory holding the event files of a run
    pub fn get_run_directory(&self, run_number: i32) -> Result<PathBuf, ConfigError> {
        let run_dir: PathBuf = self.input_path.join(self.get_run_str(run_number));
        if run_dir.exists() {
            Ok(run_dir)
        } else {
            Err(ConfigError::BadFilePath(run_dir))
        }
    }

    /// Get the path to an output file of a run, e.g. `run_0001_sig.yml` for the suffix `sig`
    pub fn get_output_file_name(
        &self,
        run_number: i32,
        suffix: &str,
    ) -> Result<PathBuf, ConfigError> {
        let file_path: PathBuf = self
            .output_path
            .join(format!("{}_{suffix}.yml", self.get_run_str(run_number)));
        if self.output_path.exists() {
            Ok(file_path)
        } else {
            Err(ConfigError::BadFilePath(self.output_path.clone()))
        }
    }

    /// Construct the run string, `run_0001`
    fn get_run_str(&self, run_number: i32) -> String {
        format!("run_{run_number:0>4}")
    }
}
