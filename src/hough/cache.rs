//! Flattened copy of the training set kept by a forest.
//! Trees only store example indices into this table.

use super::training_data::TrainingData;

/// Row-major copy of all features, classes and self-votes.
/// Self-votes are padded with zeros to the largest vote dimension of any class.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ExampleCache {
    num_features: usize,
    max_vote_params: usize,
    classes: Vec<usize>,
    features: Vec<f64>,
    self_votes: Vec<f64>,
}

impl ExampleCache {
    /// Copies every example of `data`.
    /// `num_vote_params[c]` gives the vote dimension of class `c`.
    pub fn from_training_data<T: TrainingData + ?Sized>(data: &T, num_vote_params: &[usize]) -> ExampleCache {
        let n = data.num_examples();
        let num_features = data.num_features();
        let max_vote_params = num_vote_params.iter().cloned().max().unwrap_or(0);

        let mut classes = vec![0usize; n];
        data.get_classes(&mut classes);

        let mut features = vec![0f64; n * num_features];
        let mut column = vec![0f64; n];
        for f in 0..num_features {
            data.get_features(f, &mut column);
            for (i, v) in column.iter().enumerate() {
                features[i * num_features + f] = *v;
            }
        }

        let mut self_votes = vec![0f64; n * max_vote_params];
        for i in 0..n {
            let dim = num_vote_params[classes[i]];
            let start = i * max_vote_params;
            data.get_self_vote(i, &mut self_votes[start..start + dim]);
        }

        ExampleCache {
            num_features: num_features,
            max_vote_params: max_vote_params,
            classes: classes,
            features: features,
            self_votes: self_votes,
        }
    }

    /// Builds a cache from already flattened arrays, e.g. while reading a stream.
    /// Returns None if the array sizes do not agree.
    pub fn from_parts(num_features: usize,
                      max_vote_params: usize,
                      classes: Vec<usize>,
                      features: Vec<f64>,
                      self_votes: Vec<f64>)
                      -> Option<ExampleCache> {
        let cache = ExampleCache {
            num_features: num_features,
            max_vote_params: max_vote_params,
            classes: classes,
            features: features,
            self_votes: self_votes,
        };
        if cache.has_consistent_sizes() {
            Some(cache)
        } else {
            None
        }
    }

    /// True if the feature and self-vote tables hold exactly one row per example.
    pub fn has_consistent_sizes(&self) -> bool {
        let n = self.classes.len();
        n.checked_mul(self.num_features) == Some(self.features.len()) &&
        n.checked_mul(self.max_vote_params) == Some(self.self_votes.len())
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn num_features(&self) -> usize {
        self.num_features
    }

    pub fn max_vote_params(&self) -> usize {
        self.max_vote_params
    }

    #[inline]
    pub fn class(&self, example: usize) -> usize {
        self.classes[example]
    }

    #[inline]
    pub fn feature(&self, example: usize, feature: usize) -> f64 {
        self.features[example * self.num_features + feature]
    }

    /// All features of an example.
    pub fn features(&self, example: usize) -> &[f64] {
        let start = example * self.num_features;
        &self.features[start..start + self.num_features]
    }

    /// The self-vote of an example, including the zero padding.
    pub fn self_vote(&self, example: usize) -> &[f64] {
        let start = example * self.max_vote_params;
        &self.self_votes[start..start + self.max_vote_params]
    }

    pub fn classes(&self) -> &[usize] {
        &self.classes
    }

    pub fn raw_features(&self) -> &[f64] {
        &self.features
    }

    pub fn raw_self_votes(&self) -> &[f64] {
        &self.self_votes
    }

    /// Indices of all examples of a class, in ascending order.
    pub fn examples_of_class(&self, class: usize) -> Vec<usize> {
        self.classes
            .iter()
            .enumerate()
            .filter(|&(_, c)| *c == class)
            .map(|(i, _)| i)
            .collect()
    }

    /// Number of examples per class, for classes `0..num_classes`.
    pub fn class_histogram(&self, num_classes: usize) -> Vec<usize> {
        let mut hist = vec![0usize; num_classes];
        for &c in &self.classes {
            hist[c] += 1;
        }
        hist
    }
}
