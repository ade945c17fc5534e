use std::path::PathBuf;
use thiserror::Error;

use super::particle_type::ParticleType;
use super::worker_status::WorkerStatus;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PromptRandomError {
    #[error("PromptRandom window has no prompt range")]
    NoPromptRange,
    #[error("PromptRandom window has no random range")]
    NoRandomRange,
    #[error("PromptRandom window was given the empty range [{0}, {1})")]
    EmptyRange(f64, f64),
    #[error("PromptRandom window was given the range [{0}, {1}) overlapping with [{2}, {3})")]
    OverlappingRanges(f64, f64, f64, f64),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TopologyError {
    #[error("Topology contains unknown particle {0}")]
    UnknownParticle(String),
    #[error("Topology description is empty")]
    Empty,
    #[error("Topology has unbalanced parentheses at position {0}")]
    UnbalancedParentheses(usize),
    #[error("Topology has an unexpected token {0:?} at position {1}")]
    UnexpectedToken(String, usize),
    #[error("Topology node {0} must decay into at least two daughters")]
    TooFewDaughters(ParticleType),
    #[error("Topology leaf {0} must be a photon")]
    BadLeaf(ParticleType),
    #[error("Topology node {0} is not a resonance and cannot decay")]
    NotDecaying(ParticleType),
    #[error("Topology has no node of type {0}")]
    NoSuchNode(ParticleType),
    #[error("Topology has {0} photon leaves, which exceeds the supported maximum of {1}")]
    TooManyLeaves(usize, usize),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitterError {
    #[error("Fitter failed due to topology error: {0}")]
    Topology(#[from] TopologyError),
    #[error("Fitter was given invalid settings: {0}")]
    InvalidSettings(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SmearError {
    #[error("MCSmear received an invalid width {0} for the normal distribution")]
    BadWidth(f64),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration as file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Config failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Config failed to parse YAML: {0}")]
    ParsingError(#[from] serde_yaml::Error),
    #[error("Config has invalid value for {0}: {1}")]
    InvalidValue(String, String),
    #[error("Config failed due to PromptRandom error: {0}")]
    PromptRandom(#[from] PromptRandomError),
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Analysis failed due to configuration error: {0}")]
    ConfigError(#[from] ConfigError),
    #[error("Analysis failed due to fitter error: {0}")]
    FitterError(#[from] FitterError),
    #[error("Analysis failed due to topology error: {0}")]
    TopologyError(#[from] TopologyError),
    #[error("Analysis failed due to PromptRandom error: {0}")]
    PromptRandom(#[from] PromptRandomError),
    #[error("Analysis failed due to smearing error: {0}")]
    SmearError(#[from] SmearError),
}

#[derive(Debug, Error)]
pub enum EventFileError {
    #[error("Could not open EventFile because file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("EventFile failed to parse an event: {0}")]
    ParsingError(#[from] serde_yaml::Error),
    #[error("EventFile failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum EventStackError {
    #[error("EventStack failed with IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("EventStack did not find any matching files in the run directory {0:?}")]
    NoMatchingFiles(PathBuf),
    #[error("EventStack failed due to EventFile error: {0}")]
    FileError(#[from] EventFileError),
}

#[derive(Debug, Error)]
pub enum RecordWriterError {
    #[error("RecordWriter failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("RecordWriter failed to convert to yaml: {0}")]
    ParsingError(#[from] serde_yaml::Error),
}

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("Processor failed due to Config error: {0}")]
    ConfigError(#[from] ConfigError),
    #[error("Processor failed due to Analysis error: {0}")]
    AnalysisError(#[from] AnalysisError),
    #[error("Processor failed due to EventStack error: {0}")]
    EventStackError(#[from] EventStackError),
    #[error("Processor failed due to RecordWriter error: {0}")]
    RecordWriterError(#[from] RecordWriterError),
    #[error("Processor failed due to Send error: {0}")]
    SendError(#[from] std::sync::mpsc::SendError<WorkerStatus>),
    #[error("Processor failed due to IO error: {0}")]
    IoError(#[from] std::io::Error),
}
