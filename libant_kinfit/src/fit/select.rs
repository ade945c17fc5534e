use super::result::FitResult;
use super::treefit::TreeFitResult;

/// Anything that can compete in a best-probability selection.
///
/// Only successful fits with a finite probability take part.
pub trait FitProbability {
    fn fit_probability(&self) -> Option<f64>;
}

impl FitProbability for FitResult {
    fn fit_probability(&self) -> Option<f64> {
        if self.is_success() && self.probability.is_finite() {
            Some(self.probability)
        } else {
            None
        }
    }
}

impl FitProbability for TreeFitResult {
    fn fit_probability(&self) -> Option<f64> {
        self.fit.fit_probability()
    }
}

/// A result tagged with extra data, e.g. the index of its combination
impl<T: FitProbability, U> FitProbability for (T, U) {
    fn fit_probability(&self) -> Option<f64> {
        self.0.fit_probability()
    }
}

impl<T: FitProbability> FitProbability for &T {
    fn fit_probability(&self) -> Option<f64> {
        (**self).fit_probability()
    }
}

/// The item with the highest probability. Ties keep the earliest item, failed and NaN items
/// never win, and a sequence without any valid item gives `None`.
pub fn select_best<T, I>(items: I) -> Option<T>
where
    T: FitProbability,
    I: IntoIterator<Item = T>,
{
    items
        .into_iter()
        .fold(None, |best: Option<(f64, T)>, item| {
            let Some(probability) = item.fit_probability() else {
                return best;
            };
            match best {
                Some((best_probability, _)) if probability <= best_probability => best,
                _ => Some((probability, item)),
            }
        })
        .map(|(_, item)| item)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::result::{FailureKind, FitStatus};

    fn with_probability(probability: f64) -> FitResult {
        let mut result = FitResult::failed(FailureKind::NotConverged);
        result.status = FitStatus::Success;
        result.probability = probability;
        result
    }

    fn probabilities(order: &[usize]) -> Vec<FitResult> {
        let all = [
            with_probability(0.2),
            with_probability(f64::NAN),
            with_probability(0.8),
            FitResult::failed(FailureKind::Singular),
        ];
        order.iter().map(|&i| all[i].clone()).collect()
    }

    #[test]
    fn test_best_independent_of_order() {
        for order in [[0, 1, 2, 3], [3, 2, 1, 0], [1, 3, 0, 2], [2, 0, 3, 1]] {
            let best = select_best(probabilities(&order)).unwrap();
            assert_eq!(best.probability, 0.8);
        }
    }

    #[test]
    fn test_no_valid_result() {
        assert!(select_best(probabilities(&[1, 3])).is_none());
        assert!(select_best(Vec::<FitResult>::new()).is_none());
    }

    #[test]
    fn test_ties_keep_first() {
        let results = vec![
            (with_probability(0.5), "first"),
            (with_probability(0.5), "second"),
            (with_probability(0.1), "third"),
        ];
        let (best, tag) = select_best(results).unwrap();
        assert_eq!(best.probability, 0.5);
        assert_eq!(tag, "first");
    }

    #[test]
    fn test_by_reference() {
        let results = probabilities(&[0, 2]);
        let best = select_best(results.iter()).unwrap();
        assert_eq!(best.probability, 0.8);
        assert_eq!(results.len(), 2);
    }
}
