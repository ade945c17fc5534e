use fxhash::FxHashMap;
use serde::Serialize;

/// Ordered set of named, weighted counters.
///
/// Labels keep the order of their first fill, which is the order of the cuts in the analysis.
#[derive(Debug, Clone, Default)]
pub struct CutCounter {
    labels: Vec<String>,
    counts: FxHashMap<String, f64>,
}

/// Snapshot of one counter for the run summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CutCount {
    pub label: String,
    pub count: f64,
}

impl CutCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fill(&mut self, label: &str) {
        self.fill_weighted(label, 1.0);
    }

    pub fn fill_weighted(&mut self, label: &str, weight: f64) {
        match self.counts.get_mut(label) {
            Some(count) => *count += weight,
            None => {
                self.labels.push(label.to_string());
                self.counts.insert(label.to_string(), weight);
            }
        }
    }

    /// Unknown labels count zero
    pub fn get(&self, label: &str) -> f64 {
        self.counts.get(label).copied().unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.labels
            .iter()
            .map(|label| (label.as_str(), self.get(label)))
    }

    pub fn snapshot(&self) -> Vec<CutCount> {
        self.iter()
            .map(|(label, count)| CutCount {
                label: label.to_string(),
                count,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_and_weights() {
        let mut counter = CutCounter::new();
        counter.fill("Seen");
        counter.fill("MM ok");
        counter.fill("Seen");
        counter.fill_weighted("Tagger", -0.25);
        let labels: Vec<&str> = counter.iter().map(|(l, _)| l).collect();
        assert_eq!(labels, vec!["Seen", "MM ok", "Tagger"]);
        assert_eq!(counter.get("Seen"), 2.0);
        assert_eq!(counter.get("Tagger"), -0.25);
        assert_eq!(counter.get("Never"), 0.0);
        assert_eq!(counter.snapshot()[1], CutCount { label: "MM ok".into(), count: 1.0 });
    }
}
