use serde::{Deserialize, Serialize};

use super::error::PromptRandomError;

/// Classification of a tagger time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Case {
    Prompt,
    Random,
    Outside,
}

/// Half-open time range `[start, stop)` in ns
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: f64,
    pub stop: f64,
}

impl TimeRange {
    pub fn new(start: f64, stop: f64) -> Self {
        Self { start, stop }
    }

    pub fn width(&self) -> f64 {
        self.stop - self.start
    }

    pub fn contains(&self, time: f64) -> bool {
        time >= self.start && time < self.stop
    }

    fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.stop && other.start < self.stop
    }
}

/// Configuration of the PromptRandomWindow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptRandomConfig {
    pub prompt: Vec<TimeRange>,
    pub random: Vec<TimeRange>,
    /// Take tagger times relative to the CB average time of the event
    pub correct_tagger_time: bool,
}

impl Default for PromptRandomConfig {
    fn default() -> Self {
        Self {
            prompt: vec![TimeRange::new(-7.0, 7.0)],
            random: vec![TimeRange::new(-65.0, -10.0), TimeRange::new(10.0, 65.0)],
            correct_tagger_time: false,
        }
    }
}

/// Tagger timing window for prompt-random background subtraction.
///
/// Hits in a random range get the negative weight `-(prompt width / random width)`, such that
/// the weighted sum of a flat (accidental) time distribution cancels under the prompt peak.
#[derive(Debug, Clone)]
pub struct PromptRandomWindow {
    prompt: Vec<TimeRange>,
    random: Vec<TimeRange>,
    ratio: f64,
    state: Case,
}

impl PromptRandomWindow {
    pub fn new(prompt: Vec<TimeRange>, random: Vec<TimeRange>) -> Result<Self, PromptRandomError> {
        if prompt.is_empty() {
            return Err(PromptRandomError::NoPromptRange);
        }
        if random.is_empty() {
            return Err(PromptRandomError::NoRandomRange);
        }

        let all: Vec<&TimeRange> = prompt.iter().chain(random.iter()).collect();
        for (idx, range) in all.iter().enumerate() {
            if !(range.start < range.stop) {
                return Err(PromptRandomError::EmptyRange(range.start, range.stop));
            }
            for other in all.iter().skip(idx + 1) {
                if range.overlaps(other) {
                    return Err(PromptRandomError::OverlappingRanges(
                        range.start,
                        range.stop,
                        other.start,
                        other.stop,
                    ));
                }
            }
        }

        let prompt_width: f64 = prompt.iter().map(|r| r.width()).sum();
        let random_width: f64 = random.iter().map(|r| r.width()).sum();

        Ok(Self {
            prompt,
            random,
            ratio: prompt_width / random_width,
            state: Case::Outside,
        })
    }

    pub fn from_config(config: &PromptRandomConfig) -> Result<Self, PromptRandomError> {
        Self::new(config.prompt.clone(), config.random.clone())
    }

    /// Classify the time and remember the result
    pub fn set_time(&mut self, time: f64) -> Case {
        self.state = if self.prompt.iter().any(|r| r.contains(time)) {
            Case::Prompt
        } else if self.random.iter().any(|r| r.contains(time)) {
            Case::Random
        } else {
            Case::Outside
        };
        self.state
    }

    pub fn state(&self) -> Case {
        self.state
    }

    /// Weight of the last classified time. Outside hits have no weight.
    pub fn fill_weight(&self) -> Option<f64> {
        match self.state {
            Case::Prompt => Some(1.0),
            Case::Random => Some(-self.ratio),
            Case::Outside => None,
        }
    }

    /// Ratio of prompt to random width
    pub fn ratio(&self) -> f64 {
        self.ratio
    }
}
