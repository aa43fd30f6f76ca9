//! Functions and structs for training a hough forest and casting votes with it.

use super::cache::ExampleCache;
use super::houghtree::HoughTree;
use super::node::Node;
use super::options::{EmptyLeafPolicy, Options};
use super::split::SplitSearch;
use super::training_data::TrainingData;
use super::vote::{Vote, VoteCallback};
use super::BACKGROUND_CLASS;
use errors::*;
use rand::{Rng, SeedableRng, XorShiftRng};
use rayon::prelude::*;

/// An ensemble of hough trees together with the training examples
/// their leaves refer to.
///
/// Every tree is grown on the whole training set; the trees only differ
/// through the random choice of candidate features and thresholds.
/// Votes are looked up in the cached examples, so a forest is self-contained
/// once trained or loaded.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct HoughForest {
    num_classes: usize,
    num_features: usize,
    num_vote_params: Vec<usize>,
    /// Options as given by the user
    options: Options,
    /// Options the current trees were grown with, nothing left to auto-select
    resolved_options: Options,
    trees: Vec<HoughTree>,
    cache: ExampleCache,
}

/// The examples of the queried class a vote may be drawn from.
struct VotePool {
    members: Vec<usize>,
    /// share of the queried class among the examples the pool was taken from
    fraction: f64,
}

impl HoughForest {
    /// Creates an untrained forest.
    ///
    /// # Arguments
    /// * `num_classes` - number of classes including the background class 0
    /// * `num_features` - number of features per example
    /// * `num_vote_params` - dimension of the hough space of every class
    /// * `options` - options used for training and voting
    pub fn new(num_classes: usize,
               num_features: usize,
               num_vote_params: &[usize],
               options: Options)
               -> Result<HoughForest> {
        if num_classes < 2 {
            bail!(ErrorKind::InvalidConfiguration(format!("need the background class and at least one \
                                                           object class, got {} classes",
                                                          num_classes)));
        }
        if num_features == 0 {
            bail!(ErrorKind::InvalidConfiguration("need at least one feature".to_string()));
        }
        if num_vote_params.len() != num_classes {
            bail!(ErrorKind::InvalidConfiguration(format!("{} vote dimensions given for {} classes",
                                                          num_vote_params.len(),
                                                          num_classes)));
        }
        Ok(HoughForest {
            num_classes: num_classes,
            num_features: num_features,
            num_vote_params: num_vote_params.to_vec(),
            options: options,
            resolved_options: options,
            trees: vec![],
            cache: ExampleCache::default(),
        })
    }

    /// Assembles a forest from decoded parts and checks that they fit together.
    pub(crate) fn from_parts(num_classes: usize,
                             num_features: usize,
                             num_vote_params: Vec<usize>,
                             options: Options,
                             trees: Vec<HoughTree>,
                             cache: ExampleCache)
                             -> Result<HoughForest> {
        let mut forest = HoughForest::new(num_classes, num_features, &num_vote_params, options)
            .chain_err(|| ErrorKind::CorruptForest("invalid forest header".to_string()))?;
        forest.trees = trees;
        forest.cache = cache;
        forest.check_consistency()?;
        Ok(forest)
    }

    /// Verifies everything voting relies on, so a decoded forest can never panic later.
    pub(crate) fn check_consistency(&self) -> Result<()> {
        let corrupt = |msg: String| -> Error { ErrorKind::CorruptForest(msg).into() };
        if self.num_vote_params.len() != self.num_classes {
            return Err(corrupt(format!("{} vote dimensions for {} classes",
                                       self.num_vote_params.len(),
                                       self.num_classes)));
        }
        if !self.cache.has_consistent_sizes() {
            return Err(corrupt(format!("example table of {} examples has {} feature and {} vote values",
                                       self.cache.len(),
                                       self.cache.raw_features().len(),
                                       self.cache.raw_self_votes().len())));
        }
        if !self.trees.is_empty() && !self.resolved_options.is_resolved() {
            return Err(corrupt("trained forest without resolved options".to_string()));
        }
        if !self.cache.is_empty() && self.cache.num_features() != self.num_features {
            return Err(corrupt(format!("cached examples have {} features, forest has {}",
                                       self.cache.num_features(),
                                       self.num_features)));
        }
        let max_vote_params = self.num_vote_params.iter().cloned().max().unwrap_or(0);
        if !self.cache.is_empty() && self.cache.max_vote_params() != max_vote_params {
            return Err(corrupt(format!("cached votes have {} parameters, expected {}",
                                       self.cache.max_vote_params(),
                                       max_vote_params)));
        }
        if let Some(c) = self.cache.classes().iter().find(|&&c| c >= self.num_classes) {
            return Err(corrupt(format!("cached example has class {} of {}", c, self.num_classes)));
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.num_features, self.cache.len())
                .map_err(|msg| corrupt(format!("tree {}: {}", i, msg)))?;
        }
        Ok(())
    }

    /// Resets the forest to the untrained state. The options are kept.
    pub fn clear(&mut self) {
        self.trees.clear();
        self.cache = ExampleCache::default();
        self.resolved_options = self.options;
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    pub fn num_features(&self) -> usize {
        self.num_features
    }

    /// Dimension of the hough space of a class.
    pub fn num_vote_parameters(&self, class_index: usize) -> usize {
        self.num_vote_params[class_index]
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    /// Number of cached training examples.
    pub fn num_examples(&self) -> usize {
        self.cache.len()
    }

    pub fn trees(&self) -> &[HoughTree] {
        &self.trees
    }

    pub(crate) fn cache(&self) -> &ExampleCache {
        &self.cache
    }

    pub fn is_trained(&self) -> bool {
        !self.trees.is_empty()
    }

    /// Options as given at construction.
    pub fn get_options(&self) -> &Options {
        &self.options
    }

    /// Options the trees were grown with. Equal to `get_options()` before training.
    pub fn get_resolved_options(&self) -> &Options {
        &self.resolved_options
    }

    /// Changes the verbosity, overriding the value of the options.
    pub fn set_verbose(&mut self, level: i32) {
        self.options = self.options.verbose(level);
        self.resolved_options = self.resolved_options.verbose(level);
    }

    /// Trains the forest with `num_trees` trees, grown one after another.
    /// Replaces any previously trained trees. On error the forest is left unchanged.
    pub fn train<T, R>(&mut self, num_trees: usize, training_data: &T, rng: &mut R) -> Result<()>
        where T: TrainingData + ?Sized,
              R: Rng
    {
        self.train_impl(num_trees, training_data, rng, false)
    }

    /// Like `train`, but the trees are grown in parallel.
    /// Gives the same forest as `train` for the same random number generator state.
    pub fn train_parallel<T, R>(&mut self, num_trees: usize, training_data: &T, rng: &mut R) -> Result<()>
        where T: TrainingData + ?Sized,
              R: Rng
    {
        self.train_impl(num_trees, training_data, rng, true)
    }

    fn train_impl<T, R>(&mut self,
                        num_trees: usize,
                        training_data: &T,
                        rng: &mut R,
                        parallel: bool)
                        -> Result<()>
        where T: TrainingData + ?Sized,
              R: Rng
    {
        self.check_training_data(num_trees, training_data)?;
        let cache = ExampleCache::from_training_data(training_data, &self.num_vote_params);
        let resolved = self.options.auto_select(cache.len(), self.num_classes, self.num_features);
        resolved.validate()?;

        let verbose = resolved.get_verbose();
        if verbose >= 1 {
            info!("Training {} trees on {} examples", num_trees, cache.len());
            debug!("Resolved options: {:?}", resolved);
        }

        // seeds are drawn up front so the result does not depend on scheduling
        let seeds: Vec<(usize, [u32; 4])> = (0..num_trees)
            .map(|i| (i, [rng.next_u32(), rng.next_u32(), rng.next_u32(), rng.next_u32() | 1]))
            .collect();
        let trees: Vec<HoughTree> = {
            let search = SplitSearch {
                cache: &cache,
                num_vote_params: &self.num_vote_params,
                options: &resolved,
            };
            if parallel {
                seeds.into_par_iter().map(|(i, seed)| grow_tree(&search, i, num_trees, seed)).collect()
            } else {
                seeds.into_iter().map(|(i, seed)| grow_tree(&search, i, num_trees, seed)).collect()
            }
        };

        self.trees = trees;
        self.cache = cache;
        self.resolved_options = resolved;
        if verbose >= 1 {
            info!("Trained forest with {} trees", self.trees.len());
        }
        Ok(())
    }

    fn check_training_data<T: TrainingData + ?Sized>(&self, num_trees: usize, data: &T) -> Result<()> {
        if num_trees == 0 {
            bail!(ErrorKind::InvalidConfiguration("a forest needs at least one tree".to_string()));
        }
        if data.num_examples() == 0 {
            bail!(ErrorKind::EmptyTrainingSet);
        }
        if data.num_classes() != self.num_classes {
            bail!(ErrorKind::TrainingDataMismatch(format!("data has {} classes, forest has {}",
                                                          data.num_classes(),
                                                          self.num_classes)));
        }
        if data.num_features() != self.num_features {
            bail!(ErrorKind::TrainingDataMismatch(format!("data has {} features, forest has {}",
                                                          data.num_features(),
                                                          self.num_features)));
        }
        for c in 0..self.num_classes {
            if data.num_vote_parameters(c) != self.num_vote_params[c] {
                bail!(ErrorKind::TrainingDataMismatch(format!("class {} votes with {} parameters in the data, \
                                                               {} in the forest",
                                                              c,
                                                              data.num_vote_parameters(c),
                                                              self.num_vote_params[c])));
            }
        }
        let mut classes = vec![0usize; data.num_examples()];
        data.get_classes(&mut classes);
        if let Some(c) = classes.iter().find(|&&c| c >= self.num_classes) {
            bail!(ErrorKind::TrainingDataMismatch(format!("example with class {} of {}", c, self.num_classes)));
        }
        Ok(())
    }

    /// Casts `num_votes` votes for the reference point of an object of class `query_class`
    /// seen from a point with the given features. Returns the number of votes actually cast.
    ///
    /// Vote `i` descends tree `i % num_trees()` (round-robin) and takes the self-vote of an
    /// example of `query_class` stored in the leaf reached. Without probabilistic sampling the
    /// examples of a leaf are used in stored order, one per visit; with it they are drawn
    /// uniformly from `rng` and every vote is weighted by the share of the queried class in
    /// the leaf. The base weight of a vote is `1 / num_votes`.
    ///
    /// If the leaf holds no example of the class, the empty leaf policy decides: draw from
    /// all training examples of the class, or skip the vote.
    ///
    /// # Panics
    /// If `query_class` is the background class or out of range, if `features` does not
    /// have `num_features()` values or if the forest is neither trained nor loaded.
    pub fn vote_self<R, C>(&self,
                           query_class: usize,
                           features: &[f64],
                           num_votes: usize,
                           rng: &mut R,
                           callback: &mut C)
                           -> usize
        where R: Rng,
              C: VoteCallback + ?Sized
    {
        assert!(query_class != BACKGROUND_CLASS,
                "Votes cannot be cast for the background class");
        assert!(query_class < self.num_classes,
                "Query class {} out of range 0..{}",
                query_class,
                self.num_classes);
        assert_eq!(features.len(),
                   self.num_features,
                   "Expected {} features for voting",
                   self.num_features);
        assert!(self.is_trained(), "Forest must be trained or loaded before voting");

        if num_votes == 0 {
            return 0;
        }

        let dim = self.num_vote_params[query_class];
        let probabilistic = self.resolved_options.get_probabilistic_sampling();
        let base_weight = 1.0 / num_votes as f64;

        let leaves: Vec<VotePool> = self.trees
            .iter()
            .map(|tree| self.pool_of(tree.find_leaf(features), query_class))
            .collect();
        let global = match self.resolved_options.get_empty_leaf_policy() {
            EmptyLeafPolicy::GlobalClassPool if leaves.iter().any(|l| l.members.is_empty()) => {
                Some(self.global_pool(query_class))
            }
            _ => None,
        };

        let num_trees = self.trees.len();
        let mut cast = 0;
        for i in 0..num_votes {
            let pool = match leaves[i % num_trees] {
                ref leaf if !leaf.members.is_empty() => leaf,
                _ => {
                    match global {
                        Some(ref g) if !g.members.is_empty() => g,
                        _ => continue,
                    }
                }
            };
            let k = if probabilistic {
                rng.gen_range(0, pool.members.len())
            } else {
                (i / num_trees) % pool.members.len()
            };
            let example = pool.members[k];
            let weight = if probabilistic { base_weight * pool.fraction } else { base_weight };
            let vote = Vote::new(query_class,
                                 &self.cache.self_vote(example)[..dim],
                                 weight,
                                 Some(example),
                                 Some(self.cache.features(example)));
            callback.vote(&vote);
            cast += 1;
        }
        if cast < num_votes && self.resolved_options.get_verbose() >= 2 {
            debug!("Cast {} of {} requested votes for class {}", cast, num_votes, query_class);
        }
        cast
    }

    fn pool_of(&self, examples: &[usize], class: usize) -> VotePool {
        let members: Vec<usize> = examples.iter().cloned().filter(|&e| self.cache.class(e) == class).collect();
        let fraction = if examples.is_empty() {
            0.0
        } else {
            members.len() as f64 / examples.len() as f64
        };
        VotePool {
            members: members,
            fraction: fraction,
        }
    }

    /// All cached examples of a class, weighted by the share of the class in the training set.
    fn global_pool(&self, class: usize) -> VotePool {
        let histogram = self.cache.class_histogram(self.num_classes);
        let fraction = if self.cache.is_empty() {
            0.0
        } else {
            histogram[class] as f64 / self.cache.len() as f64
        };
        VotePool {
            members: self.cache.examples_of_class(class),
            fraction: fraction,
        }
    }

    /// Logs the structure of the forest: a summary per tree at info level,
    /// every node at trace level.
    pub fn dump_to_log(&self) {
        info!("Hough forest: {} classes, {} features, vote dimensions {:?}, {} trees, {} examples",
              self.num_classes,
              self.num_features,
              self.num_vote_params,
              self.trees.len(),
              self.cache.len());
        for (t, tree) in self.trees.iter().enumerate() {
            info!("Tree {}: {} nodes, {} leaves, depth {}",
                  t,
                  tree.num_nodes(),
                  tree.num_leaves(),
                  tree.depth());
            for (i, node) in tree.nodes().iter().enumerate() {
                match *node {
                    Node::Split { feature, threshold, left, right } => {
                        trace!("  [{}] feature {} <= {} ? {} : {}", i, feature, threshold, left, right)
                    }
                    Node::Leaf { ref examples } => trace!("  [{}] leaf {:?}", i, examples),
                }
            }
        }
    }
}

fn grow_tree(search: &SplitSearch, index: usize, num_trees: usize, seed: [u32; 4]) -> HoughTree {
    let mut rng = XorShiftRng::from_seed(seed);
    let tree = HoughTree::train(search, (0..search.cache.len()).collect(), &mut rng);
    if search.options.get_verbose() >= 1 {
        info!("Tree {} of {}: {} nodes, {} leaves, depth {}",
              index + 1,
              num_trees,
              tree.num_nodes(),
              tree.num_leaves(),
              tree.depth());
    }
    tree
}

#[cfg(test)]
mod tests {
    use super::*;
    use hough::seeded_rng;
    use hough::training_data::{clustered_example_set, ExampleSet};
    use hough::vote::VoteCollector;

    fn trained_forest(seed: u64, options: Options) -> (HoughForest, ExampleSet) {
        let set = clustered_example_set(seed, 20, 20);
        let mut forest = HoughForest::new(2, 4, &[0, 2], options).unwrap();
        let mut rng = seeded_rng(seed);
        forest.train(10, &set, &mut rng).unwrap();
        (forest, set)
    }

    /// Background on feature values 0..10, objects on 100..110.
    fn separated_forest(policy: EmptyLeafPolicy, probabilistic: bool) -> HoughForest {
        let mut set = ExampleSet::new(2, 1, vec![0, 1]).unwrap();
        for i in 0..10 {
            set.add_example(vec![i as f64], 0, vec![]).unwrap();
            set.add_example(vec![100.0 + i as f64], 1, vec![i as f64]).unwrap();
        }
        let options = Options::new()
            .max_leaf_elements(10)
            .empty_leaf_policy(policy)
            .probabilistic_sampling(probabilistic)
            .verbose(0);
        let mut forest = HoughForest::new(2, 1, &[0, 1], options).unwrap();
        forest.train(3, &set, &mut seeded_rng(8)).unwrap();
        forest
    }

    #[test]
    fn test_new_validates_counts() {
        assert!(HoughForest::new(1, 4, &[0], Options::new()).is_err());
        assert!(HoughForest::new(2, 0, &[0, 2], Options::new()).is_err());
        assert!(HoughForest::new(2, 4, &[0, 2, 3], Options::new()).is_err());
        let forest = HoughForest::new(3, 4, &[0, 2, 3], Options::new()).unwrap();
        assert_eq!(forest.num_vote_parameters(2), 3);
        assert_eq!(forest.num_trees(), 0);
        assert!(!forest.is_trained());
    }

    #[test]
    fn test_end_to_end_votes_near_reference_point() {
        let (forest, set) = trained_forest(42, Options::new().verbose(0));
        assert_eq!(forest.num_trees(), 10);
        assert_eq!(forest.num_examples(), 40);

        let centroid = set.class_centroid(1).unwrap();
        let mut votes = VoteCollector::new();
        let cast = forest.vote_self(1, &centroid, 100, &mut seeded_rng(1), &mut votes);
        assert_eq!(cast, 100);
        assert_eq!(votes.len(), 100);
        assert!(votes.target_classes.iter().all(|&c| c == 1));
        assert!(votes.params.iter().all(|p| p.len() == 2));
        assert!(votes.weights.iter().all(|&w| (w - 0.01).abs() < 1e-12));
        let mean = votes.weighted_mean().unwrap();
        assert!((mean[0] - 5.0).abs() < 0.35, "mean {:?}", mean);
        assert!((mean[1] - 5.0).abs() < 0.35, "mean {:?}", mean);
    }

    #[test]
    fn test_votes_carry_provenance() {
        let (forest, set) = trained_forest(5, Options::new().verbose(0));
        let query = set.features(0).to_vec();
        let mut calls = 0;
        let cast = forest.vote_self(1,
                                    &query,
                                    25,
                                    &mut seeded_rng(2),
                                    &mut |v: &Vote| {
            let idx = v.training_example_index().unwrap();
            assert_eq!(set.class(idx), 1);
            assert_eq!(v.voting_features().unwrap(), set.features(idx));
            assert_eq!(v.target_class(), 1);
            calls += 1;
        });
        assert_eq!(cast, 25);
        assert_eq!(calls, 25);
    }

    #[test]
    fn test_zero_votes_never_calls_back() {
        let (forest, set) = trained_forest(6, Options::new().verbose(0));
        let mut called = false;
        let cast = forest.vote_self(1, set.features(3), 0, &mut seeded_rng(0), &mut |_: &Vote| called = true);
        assert_eq!(cast, 0);
        assert!(!called);
    }

    #[test]
    fn test_leaf_sizes_respect_options() {
        let (forest, _) = trained_forest(7, Options::new().max_leaf_elements(4).verbose(0));
        let opts = *forest.get_resolved_options();
        assert!(opts.is_resolved());
        assert_eq!(forest.get_options().get_max_depth(), -1);
        for tree in forest.trees() {
            for (depth, examples) in tree.leaves() {
                assert!(examples.len() <= 4 || depth as i64 == opts.get_max_depth());
            }
        }
    }

    #[test]
    fn test_same_seed_same_forest() {
        let opts = Options::new().probabilistic_sampling(true).verbose(0);
        let (a, _) = trained_forest(12, opts);
        let (b, _) = trained_forest(12, opts);
        assert_eq!(a, b);

        let set = clustered_example_set(12, 20, 20);
        let mut c = HoughForest::new(2, 4, &[0, 2], opts).unwrap();
        c.train_parallel(10, &set, &mut seeded_rng(12)).unwrap();
        assert_eq!(a, c);
    }

    #[test]
    fn test_probabilistic_votes_are_reproducible() {
        let opts = Options::new().probabilistic_sampling(true).verbose(0);
        let (forest, set) = trained_forest(13, opts);
        let centroid = set.class_centroid(1).unwrap();
        let mut a = VoteCollector::new();
        let mut b = VoteCollector::new();
        forest.vote_self(1, &centroid, 50, &mut seeded_rng(77), &mut a);
        forest.vote_self(1, &centroid, 50, &mut seeded_rng(77), &mut b);
        assert_eq!(a, b);
        assert!(a.weights.iter().all(|&w| w > 0.0 && w <= 1.0 / 50.0));
    }

    #[test]
    fn test_empty_training_set_keeps_forest() {
        let (mut forest, set) = trained_forest(14, Options::new().verbose(0));
        let before = forest.clone();
        let empty = ExampleSet::new(2, 4, vec![0, 2]).unwrap();
        match forest.train(3, &empty, &mut seeded_rng(1)) {
            Err(Error(ErrorKind::EmptyTrainingSet, _)) => (),
            other => panic!("unexpected result {:?}", other),
        }
        assert_eq!(forest, before);
        assert!(forest.train(0, &set, &mut seeded_rng(1)).is_err());
        assert_eq!(forest, before);
    }

    #[test]
    fn test_mismatching_training_data_is_rejected() {
        let mut forest = HoughForest::new(2, 4, &[0, 3], Options::new().verbose(0)).unwrap();
        let set = clustered_example_set(1, 5, 5);
        assert!(forest.train(2, &set, &mut seeded_rng(1)).is_err());
        let mut forest = HoughForest::new(3, 4, &[0, 2, 2], Options::new().verbose(0)).unwrap();
        assert!(forest.train(2, &set, &mut seeded_rng(1)).is_err());
        assert!(!forest.is_trained());
    }

    #[test]
    fn test_invalid_options_are_rejected() {
        let set = clustered_example_set(1, 5, 5);
        let mut forest = HoughForest::new(2, 4, &[0, 2], Options::new().max_leaf_elements(0)).unwrap();
        assert!(forest.train(2, &set, &mut seeded_rng(1)).is_err());
        assert!(!forest.is_trained());
    }

    #[test]
    fn test_retraining_replaces_trees() {
        let (mut forest, set) = trained_forest(15, Options::new().verbose(0));
        forest.train(4, &set, &mut seeded_rng(3)).unwrap();
        assert_eq!(forest.num_trees(), 4);
    }

    #[test]
    fn test_clear_keeps_options() {
        let (mut forest, _) = trained_forest(16, Options::new().max_leaf_elements(3).verbose(0));
        forest.clear();
        assert_eq!(forest.num_trees(), 0);
        assert_eq!(forest.num_examples(), 0);
        assert_eq!(forest.get_options().get_max_leaf_elements(), 3);
        assert_eq!(forest.get_resolved_options(), forest.get_options());
        forest.set_verbose(2);
        assert_eq!(forest.get_options().get_verbose(), 2);
    }

    #[test]
    fn test_empty_leaf_skip_policy() {
        let forest = separated_forest(EmptyLeafPolicy::Skip, false);
        let mut calls = 0;
        let cast = forest.vote_self(1, &[0.0], 10, &mut seeded_rng(1), &mut |_: &Vote| calls += 1);
        assert_eq!(cast, 0);
        assert_eq!(calls, 0);
        // the object side still votes normally
        let cast = forest.vote_self(1, &[105.0], 10, &mut seeded_rng(1), &mut |_: &Vote| ());
        assert_eq!(cast, 10);
    }

    #[test]
    fn test_empty_leaf_global_pool_policy() {
        let forest = separated_forest(EmptyLeafPolicy::GlobalClassPool, false);
        let mut votes = VoteCollector::new();
        let cast = forest.vote_self(1, &[0.0], 10, &mut seeded_rng(1), &mut votes);
        assert_eq!(cast, 10);
        for idx in votes.indices.iter() {
            assert_eq!(forest.cache().class(idx.unwrap()), 1);
        }
        assert!(votes.weights.iter().all(|&w| (w - 0.1).abs() < 1e-12));
        // objects sit at the odd indices, visited in ascending order one round per tree cycle
        let used: Vec<usize> = votes.indices.iter().map(|i| i.unwrap()).collect();
        assert_eq!(used, vec![1, 1, 1, 3, 3, 3, 5, 5, 5, 7]);

        let forest = separated_forest(EmptyLeafPolicy::GlobalClassPool, true);
        let mut votes = VoteCollector::new();
        forest.vote_self(1, &[0.0], 10, &mut seeded_rng(1), &mut votes);
        // half of all examples are objects
        assert!(votes.weights.iter().all(|&w| (w - 0.05).abs() < 1e-12));
    }

    #[test]
    fn test_deterministic_sampling_cycles_through_leaf() {
        let forest = separated_forest(EmptyLeafPolicy::Skip, false);
        let mut votes = VoteCollector::new();
        forest.vote_self(1, &[109.0], 30, &mut seeded_rng(1), &mut votes);
        let mut used = votes.indices.iter().map(|i| i.unwrap()).collect::<Vec<_>>();
        used.sort();
        used.dedup();
        // every tree keeps the objects in a single leaf of 10 examples
        assert_eq!(used.len(), 10);
    }

    #[test]
    #[should_panic]
    fn test_background_query_panics() {
        let (forest, set) = trained_forest(17, Options::new().verbose(0));
        forest.vote_self(0, set.features(0), 1, &mut seeded_rng(1), &mut VoteCollector::new());
    }

    #[test]
    #[should_panic]
    fn test_wrong_feature_count_panics() {
        let (forest, _) = trained_forest(18, Options::new().verbose(0));
        forest.vote_self(1, &[1.0, 2.0], 1, &mut seeded_rng(1), &mut VoteCollector::new());
    }

    #[test]
    #[should_panic]
    fn test_untrained_vote_panics() {
        let forest = HoughForest::new(2, 1, &[0, 1], Options::new()).unwrap();
        forest.vote_self(1, &[1.0], 1, &mut seeded_rng(1), &mut VoteCollector::new());
    }
}
