/// A single hough vote.
/// The referenced parameters and features belong to the forest
/// and are only borrowed for the duration of the callback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vote<'a> {
    target_class: usize,
    params: &'a [f64],
    weight: f64,
    index: Option<usize>,
    features: Option<&'a [f64]>,
}

impl<'a> Vote<'a> {
    /// Creates a vote.
    ///
    /// # Arguments
    /// * `target_class` - class the vote is cast for
    /// * `params` - position in the hough space of the class
    /// * `weight` - weight of the vote
    /// * `index` - training example the vote was taken from, if known
    /// * `features` - features of the point used to compute the vote, if known
    pub fn new(target_class: usize,
               params: &'a [f64],
               weight: f64,
               index: Option<usize>,
               features: Option<&'a [f64]>)
               -> Vote<'a> {
        Vote {
            target_class: target_class,
            params: params,
            weight: weight,
            index: index,
            features: features,
        }
    }

    pub fn target_class(&self) -> usize {
        self.target_class
    }

    /// Dimension of the hough space the vote lives in.
    pub fn num_parameters(&self) -> usize {
        self.params.len()
    }

    pub fn parameters(&self) -> &'a [f64] {
        self.params
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn training_example_index(&self) -> Option<usize> {
        self.index
    }

    pub fn voting_features(&self) -> Option<&'a [f64]> {
        self.features
    }
}

/// Receives every vote cast by the forest.
/// Implemented for every `FnMut(&Vote)`, so a closure can be passed directly.
pub trait VoteCallback {
    fn vote(&mut self, vote: &Vote);
}

impl<F> VoteCallback for F
    where F: FnMut(&Vote)
{
    fn vote(&mut self, vote: &Vote) {
        self(vote)
    }
}

/// Collects owned copies of votes, e.g. for later clustering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VoteCollector {
    pub target_classes: Vec<usize>,
    pub params: Vec<Vec<f64>>,
    pub weights: Vec<f64>,
    pub indices: Vec<Option<usize>>,
}

impl VoteCollector {
    pub fn new() -> VoteCollector {
        VoteCollector::default()
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Weighted mean of the collected parameters, None if nothing was collected
    /// or the weights sum to zero.
    pub fn weighted_mean(&self) -> Option<Vec<f64>> {
        let total: f64 = self.weights.iter().sum();
        if self.params.is_empty() || total <= 0.0 {
            return None;
        }
        let dim = self.params[0].len();
        let mut mean = vec![0f64; dim];
        for (p, w) in self.params.iter().zip(self.weights.iter()) {
            for (m, x) in mean.iter_mut().zip(p.iter()) {
                *m += w * x;
            }
        }
        for m in mean.iter_mut() {
            *m /= total;
        }
        Some(mean)
    }
}

impl VoteCallback for VoteCollector {
    fn vote(&mut self, vote: &Vote) {
        self.target_classes.push(vote.target_class());
        self.params.push(vote.parameters().to_vec());
        self.weights.push(vote.weight());
        self.indices.push(vote.training_example_index());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vote_accessors() {
        let params = [1.0, 2.0];
        let features = [0.5];
        let v = Vote::new(3, &params, 0.25, Some(7), Some(&features));
        assert_eq!(v.target_class(), 3);
        assert_eq!(v.num_parameters(), 2);
        assert_eq!(v.parameters(), &[1.0, 2.0]);
        assert_eq!(v.weight(), 0.25);
        assert_eq!(v.training_example_index(), Some(7));
        assert_eq!(v.voting_features(), Some(&features[..]));
    }

    #[test]
    fn test_closure_and_collector_callbacks() {
        let params = [4.0, 6.0];
        let mut count = 0;
        {
            let mut cb = |v: &Vote| {
                assert_eq!(v.target_class(), 1);
                count += 1;
            };
            cb.vote(&Vote::new(1, &params, 1.0, None, None));
            cb.vote(&Vote::new(1, &params, 1.0, None, None));
        }
        assert_eq!(count, 2);

        let mut collector = VoteCollector::new();
        assert!(collector.weighted_mean().is_none());
        collector.vote(&Vote::new(1, &[0.0, 0.0], 1.0, Some(0), None));
        collector.vote(&Vote::new(1, &params, 3.0, Some(1), None));
        assert_eq!(collector.len(), 2);
        assert_eq!(collector.indices, vec![Some(0), Some(1)]);
        assert_eq!(collector.weighted_mean().unwrap(), vec![3.0, 4.5]);
    }
}
