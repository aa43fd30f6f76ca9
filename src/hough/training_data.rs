//! Access to the training examples of a hough forest.

use errors::*;

/// Interface for accessing training data.
///
/// Every example has a feature vector of length `num_features()`,
/// a class label in `0..num_classes()` (0 is background) and a self-vote,
/// the hough parameters pointing from the example to the reference point
/// of the object it belongs to. The self-vote of an example of class `c`
/// has `num_vote_parameters(c)` values.
///
/// Output slices are allocated by the caller with the exact required length.
pub trait TrainingData {
    /// Number of training examples.
    fn num_examples(&self) -> usize;

    /// Number of possible class labels (some may be absent in the data).
    fn num_classes(&self) -> usize;

    /// Number of features per example.
    fn num_features(&self) -> usize;

    /// Number of parameters (dimensions) of the hough space of a class.
    fn num_vote_parameters(&self, class_index: usize) -> usize;

    /// Writes the values of one feature for all examples into `values`
    /// (`num_examples()` values).
    fn get_features(&self, feature_index: usize, values: &mut [f64]);

    /// Writes the values of one feature for the selected examples into `values`
    /// (`selected.len()` values).
    fn get_features_subset(&self, feature_index: usize, selected: &[usize], values: &mut [f64]) {
        assert_eq!(values.len(), selected.len(), "Output slice does not match the selection");
        let mut all = vec![0f64; self.num_examples()];
        self.get_features(feature_index, &mut all);
        for (v, &i) in values.iter_mut().zip(selected.iter()) {
            *v = all[i];
        }
    }

    /// Writes the classes of all examples into `classes`.
    fn get_classes(&self, classes: &mut [usize]);

    /// Writes the classes of the selected examples into `classes`.
    fn get_classes_subset(&self, selected: &[usize], classes: &mut [usize]) {
        assert_eq!(classes.len(), selected.len(), "Output slice does not match the selection");
        let mut all = vec![0usize; self.num_examples()];
        self.get_classes(&mut all);
        for (c, &i) in classes.iter_mut().zip(selected.iter()) {
            *c = all[i];
        }
    }

    /// Writes the self-vote of an example into `params`.
    fn get_self_vote(&self, example_index: usize, params: &mut [f64]);
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
struct Example {
    features: Vec<f64>,
    class: usize,
    self_vote: Vec<f64>,
}

/// Training examples held in memory.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ExampleSet {
    num_classes: usize,
    num_features: usize,
    num_vote_params: Vec<usize>,
    examples: Vec<Example>,
}

impl ExampleSet {
    /// Creates an empty set.
    /// `num_vote_params[c]` is the dimension of the hough space of class `c`.
    pub fn new(num_classes: usize, num_features: usize, num_vote_params: Vec<usize>) -> Result<ExampleSet> {
        if num_vote_params.len() != num_classes {
            bail!(ErrorKind::InvalidConfiguration(format!("{} vote dimensions given for {} classes",
                                                          num_vote_params.len(),
                                                          num_classes)));
        }
        Ok(ExampleSet {
            num_classes: num_classes,
            num_features: num_features,
            num_vote_params: num_vote_params,
            examples: vec![],
        })
    }

    /// Adds an example. Fails if the lengths do not fit the set.
    pub fn add_example(&mut self, features: Vec<f64>, class: usize, self_vote: Vec<f64>) -> Result<()> {
        if class >= self.num_classes {
            bail!(ErrorKind::TrainingDataMismatch(format!("class {} out of range 0..{}", class, self.num_classes)));
        }
        if features.len() != self.num_features {
            bail!(ErrorKind::TrainingDataMismatch(format!("expected {} features, got {}",
                                                          self.num_features,
                                                          features.len())));
        }
        if self_vote.len() != self.num_vote_params[class] {
            bail!(ErrorKind::TrainingDataMismatch(format!("class {} votes with {} parameters, got {}",
                                                          class,
                                                          self.num_vote_params[class],
                                                          self_vote.len())));
        }
        self.examples.push(Example {
            features: features,
            class: class,
            self_vote: self_vote,
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    /// Features of one example.
    pub fn features(&self, example_index: usize) -> &[f64] {
        &self.examples[example_index].features
    }

    pub fn class(&self, example_index: usize) -> usize {
        self.examples[example_index].class
    }

    /// Mean feature vector of all examples of a class, None if there are none.
    pub fn class_centroid(&self, class: usize) -> Option<Vec<f64>> {
        let rows: Vec<&[f64]> = self.examples
            .iter()
            .filter(|e| e.class == class)
            .map(|e| &e.features[..])
            .collect();
        ::meancov_estimation::estimate_mean(&rows[..])
    }
}

impl TrainingData for ExampleSet {
    fn num_examples(&self) -> usize {
        self.examples.len()
    }

    fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn num_features(&self) -> usize {
        self.num_features
    }

    fn num_vote_parameters(&self, class_index: usize) -> usize {
        self.num_vote_params[class_index]
    }

    fn get_features(&self, feature_index: usize, values: &mut [f64]) {
        assert_eq!(values.len(), self.examples.len());
        for (v, e) in values.iter_mut().zip(self.examples.iter()) {
            *v = e.features[feature_index];
        }
    }

    fn get_features_subset(&self, feature_index: usize, selected: &[usize], values: &mut [f64]) {
        assert_eq!(values.len(), selected.len());
        for (v, &i) in values.iter_mut().zip(selected.iter()) {
            *v = self.examples[i].features[feature_index];
        }
    }

    fn get_classes(&self, classes: &mut [usize]) {
        assert_eq!(classes.len(), self.examples.len());
        for (c, e) in classes.iter_mut().zip(self.examples.iter()) {
            *c = e.class;
        }
    }

    fn get_classes_subset(&self, selected: &[usize], classes: &mut [usize]) {
        assert_eq!(classes.len(), selected.len());
        for (c, &i) in classes.iter_mut().zip(selected.iter()) {
            *c = self.examples[i].class;
        }
    }

    fn get_self_vote(&self, example_index: usize, params: &mut [f64]) {
        let vote = &self.examples[example_index].self_vote;
        assert_eq!(params.len(), vote.len());
        params.copy_from_slice(vote);
    }
}

/// Two classes, four features, class 1 votes in a 2d space.
/// Objects form a tight cluster around (1, 1, 1, 1) and vote near (5, 5);
/// background examples are spread over [-5, 5]^4 and do not vote.
#[cfg(test)]
pub fn clustered_example_set(seed: u64, num_objects: usize, num_background: usize) -> ExampleSet {
    use hough::seeded_rng;
    use rand::Rng;
    let mut rng = seeded_rng(seed);
    let mut set = ExampleSet::new(2, 4, vec![0, 2]).unwrap();
    for _ in 0..num_objects {
        let features = (0..4).map(|_| 1.0 + rng.gen_range(-0.2, 0.2)).collect();
        let vote = vec![5.0 + rng.gen_range(-0.3, 0.3), 5.0 + rng.gen_range(-0.3, 0.3)];
        set.add_example(features, 1, vote).unwrap();
    }
    for _ in 0..num_background {
        let features = (0..4).map(|_| rng.gen_range(-5.0, 5.0)).collect();
        set.add_example(features, 0, vec![]).unwrap();
    }
    set
}
