//! Options controlling how the trees of a hough forest are grown and how votes are drawn.

use errors::*;
use serde_json;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Auto-selected number of feature expansion rounds.
const DEFAULT_FEATURE_EXPANSIONS: i64 = 3;
/// Auto-selected number of thresholds tried per candidate feature.
const DEFAULT_CANDIDATE_THRESHOLDS: i64 = 10;
/// Auto-selected splitting sensitivity.
const DEFAULT_DOMINANT_FRACTION: f64 = 0.9;

/// x * log2(x) with 0 * log2(0) = 0
macro_rules! xlog2x {
    ($x: expr) => {if $x <= 0f64 {0f64} else {$x * $x.log2()} }
}

/// What to do if the leaf reached by a query holds no example of the queried class.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyLeafPolicy {
    /// Draw the vote from all training examples of the queried class.
    GlobalClassPool,
    /// Do not cast this vote.
    Skip,
}

/// Options for a hough forest.
/// Passing a negative value for a normally non-negative parameter
/// selects a suitable value from the training data when training starts.
///
/// The splitting sensitivity can be given either as minimum class uncertainty
/// or as maximum dominant fraction. Both describe the same quantity; it is
/// stored as dominant fraction `f` and converted through the binary entropy
/// `H(f) = -f log2 f - (1 - f) log2 (1 - f)` for `f` in [0.5, 1].
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Options {
    /// Maximum depth of a tree. The root has depth 0.
    max_depth: i64,
    /// Maximum number of examples in a leaf, unless the maximum depth is reached.
    max_leaf_elements: i64,
    /// Number of features considered for splitting in the first search round.
    max_candidate_features: i64,
    /// Number of times the candidate feature set is enlarged if no split was found.
    num_feature_expansions: i64,
    /// Number of thresholds tried per candidate feature.
    max_candidate_thresholds: i64,
    /// A node whose most frequent class covers less than this fraction
    /// of its examples is split to reduce class uncertainty,
    /// otherwise to make the votes more compact.
    max_dominant_fraction: f64,
    /// Draw thresholds and leaf votes randomly instead of from fixed grids.
    probabilistic_sampling: bool,
    empty_leaf_policy: EmptyLeafPolicy,
    /// 0 = silent, 1 = progress per tree, 2 and above = per node
    verbose: i32,
}

impl Default for Options {
    fn default() -> Options {
        Options::new()
    }
}

impl Options {
    /// Creates options where every numeric parameter is auto-selected.
    pub fn new() -> Options {
        Options {
            max_depth: -1,
            max_leaf_elements: -1,
            max_candidate_features: -1,
            num_feature_expansions: -1,
            max_candidate_thresholds: -1,
            max_dominant_fraction: -1.0,
            probabilistic_sampling: false,
            empty_leaf_policy: EmptyLeafPolicy::GlobalClassPool,
            verbose: 1,
        }
    }

    /// Sets the maximum depth of a tree
    pub fn max_depth(mut self, value: i64) -> Self {
        self.max_depth = value;
        self
    }

    /// Sets the maximum number of examples in a leaf.
    /// Leaves at the maximum depth may hold more.
    pub fn max_leaf_elements(mut self, value: i64) -> Self {
        self.max_leaf_elements = value;
        self
    }

    pub fn max_candidate_features(mut self, value: i64) -> Self {
        self.max_candidate_features = value;
        self
    }

    pub fn num_feature_expansions(mut self, value: i64) -> Self {
        self.num_feature_expansions = value;
        self
    }

    pub fn max_candidate_thresholds(mut self, value: i64) -> Self {
        self.max_candidate_thresholds = value;
        self
    }

    /// Sets the splitting sensitivity as maximum dominant fraction.
    /// A negative value selects it automatically.
    pub fn max_dominant_fraction(mut self, value: f64) -> Self {
        self.max_dominant_fraction = if value < 0.0 { -1.0 } else { value };
        self
    }

    /// Sets the splitting sensitivity as minimum class uncertainty (in bits).
    /// A negative value selects it automatically.
    pub fn min_class_uncertainty(mut self, value: f64) -> Self {
        self.max_dominant_fraction = if value < 0.0 {
            -1.0
        } else {
            dominant_fraction_for_uncertainty(value)
        };
        self
    }

    pub fn probabilistic_sampling(mut self, value: bool) -> Self {
        self.probabilistic_sampling = value;
        self
    }

    pub fn empty_leaf_policy(mut self, value: EmptyLeafPolicy) -> Self {
        self.empty_leaf_policy = value;
        self
    }

    pub fn verbose(mut self, value: i32) -> Self {
        self.verbose = value;
        self
    }

    pub fn get_max_depth(&self) -> i64 {
        self.max_depth
    }

    pub fn get_max_leaf_elements(&self) -> i64 {
        self.max_leaf_elements
    }

    pub fn get_max_candidate_features(&self) -> i64 {
        self.max_candidate_features
    }

    pub fn get_num_feature_expansions(&self) -> i64 {
        self.num_feature_expansions
    }

    pub fn get_max_candidate_thresholds(&self) -> i64 {
        self.max_candidate_thresholds
    }

    /// Returns the maximum dominant fraction, negative if auto-selected.
    pub fn get_max_dominant_fraction(&self) -> f64 {
        self.max_dominant_fraction
    }

    /// Returns the minimum class uncertainty in bits, negative if auto-selected.
    pub fn get_min_class_uncertainty(&self) -> f64 {
        if self.max_dominant_fraction < 0.0 {
            return -1.0;
        }
        binary_entropy(self.max_dominant_fraction.max(0.5))
    }

    pub fn get_probabilistic_sampling(&self) -> bool {
        self.probabilistic_sampling
    }

    pub fn get_empty_leaf_policy(&self) -> EmptyLeafPolicy {
        self.empty_leaf_policy
    }

    pub fn get_verbose(&self) -> i32 {
        self.verbose
    }

    /// True if no parameter is left to be auto-selected.
    pub fn is_resolved(&self) -> bool {
        self.max_depth >= 0 && self.max_leaf_elements >= 0 && self.max_candidate_features >= 0 &&
        self.num_feature_expansions >= 0 && self.max_candidate_thresholds >= 0 &&
        self.max_dominant_fraction >= 0.0
    }

    /// Returns a copy where every negative parameter is replaced by a value
    /// derived from the size of the training set.
    /// The result only depends on the arguments, never on random state.
    pub fn auto_select(&self,
                       num_examples: usize,
                       num_classes: usize,
                       num_features: usize)
                       -> Options {
        let mut res = *self;
        let n = num_examples.max(1) as i64;
        if res.max_leaf_elements < 0 {
            let per_class = n / (16 * num_classes.max(1) as i64);
            res.max_leaf_elements = n.min(per_class.max(5));
        }
        if res.max_depth < 0 {
            let ratio = (n as f64 / res.max_leaf_elements.max(1) as f64).max(1.0);
            res.max_depth = 2 * ratio.log2().ceil() as i64 + 2;
        }
        if res.max_candidate_features < 0 {
            let f = (num_features as f64).sqrt().round() as i64;
            res.max_candidate_features = f.max(1).min(num_features.max(1) as i64);
        }
        if res.num_feature_expansions < 0 {
            res.num_feature_expansions = DEFAULT_FEATURE_EXPANSIONS;
        }
        if res.max_candidate_thresholds < 0 {
            res.max_candidate_thresholds = DEFAULT_CANDIDATE_THRESHOLDS;
        }
        if res.max_dominant_fraction < 0.0 {
            res.max_dominant_fraction = DEFAULT_DOMINANT_FRACTION;
        }
        res
    }

    /// Checks that resolved options can be used to grow a tree.
    pub fn validate(&self) -> Result<()> {
        if !self.is_resolved() {
            bail!(ErrorKind::InvalidConfiguration("options contain unresolved values".to_string()));
        }
        if self.max_leaf_elements < 1 {
            bail!(ErrorKind::InvalidConfiguration(format!("max_leaf_elements must be at least 1, got {}",
                                                          self.max_leaf_elements)));
        }
        if self.max_candidate_features < 1 {
            bail!(ErrorKind::InvalidConfiguration(format!("max_candidate_features must be at least 1, got {}",
                                                          self.max_candidate_features)));
        }
        if self.max_candidate_thresholds < 1 {
            bail!(ErrorKind::InvalidConfiguration(format!("max_candidate_thresholds must be at least 1, got {}",
                                                          self.max_candidate_thresholds)));
        }
        if !(self.max_dominant_fraction > 0.0 && self.max_dominant_fraction <= 1.0) {
            bail!(ErrorKind::InvalidConfiguration(format!("max_dominant_fraction must be in (0, 1], got {}",
                                                          self.max_dominant_fraction)));
        }
        Ok(())
    }

    /// Load options from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Options> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            warn!("Cannot open options file {}: {}", path.display(), e);
            e
        })?;
        let opts = serde_json::from_reader(BufReader::new(file))?;
        Ok(opts)
    }

    /// Save options to a JSON file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| {
            warn!("Cannot create options file {}: {}", path.display(), e);
            e
        })?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }
}

/// Entropy in bits of a two class distribution with proportions `f` and `1 - f`.
pub fn binary_entropy(f: f64) -> f64 {
    -(xlog2x!(f) + xlog2x!(1f64 - f))
}

/// Inverse of `binary_entropy` on [0.5, 1].
/// Uncertainties of at least one bit map to 0.5, non-positive ones to 1.
pub fn dominant_fraction_for_uncertainty(uncertainty: f64) -> f64 {
    if uncertainty >= 1.0 {
        return 0.5;
    }
    if uncertainty <= 0.0 {
        return 1.0;
    }
    // binary_entropy is decreasing on [0.5, 1]
    let (mut lo, mut hi) = (0.5f64, 1f64);
    for _ in 0..64 {
        let mid = 0.5 * (lo + hi);
        if binary_entropy(mid) > uncertainty {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    0.5 * (lo + hi)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;

    #[test]
    fn test_defaults_are_unresolved() {
        let opts = Options::new();
        assert!(!opts.is_resolved());
        assert_eq!(opts.get_max_depth(), -1);
        assert_eq!(opts.get_min_class_uncertainty(), -1.0);
        assert_eq!(opts.get_empty_leaf_policy(), EmptyLeafPolicy::GlobalClassPool);
        assert!(opts.validate().is_err());
    }

    #[test]
    fn test_uncertainty_and_fraction_are_one_setting() {
        let opts = Options::new().max_dominant_fraction(0.9);
        let u = opts.get_min_class_uncertainty();
        assert!((u - 0.4689955935892812).abs() < 1e-9);

        let back = Options::new().min_class_uncertainty(u);
        assert!((back.get_max_dominant_fraction() - 0.9).abs() < 1e-9);

        assert_eq!(Options::new().min_class_uncertainty(1.5).get_max_dominant_fraction(), 0.5);
        assert_eq!(Options::new().min_class_uncertainty(0.0).get_max_dominant_fraction(), 1.0);
        assert_eq!(Options::new().min_class_uncertainty(-2.0).get_max_dominant_fraction(), -1.0);
    }

    #[test]
    fn test_binary_entropy() {
        assert_eq!(binary_entropy(1.0), 0.0);
        assert!((binary_entropy(0.5) - 1.0).abs() < 1e-12);
        assert!(binary_entropy(0.7) > binary_entropy(0.8));
    }

    #[test]
    fn test_auto_select_is_deterministic() {
        let opts = Options::new().max_candidate_thresholds(4);
        let a = opts.auto_select(40, 2, 4);
        let b = opts.auto_select(40, 2, 4);
        assert_eq!(a, b);
        assert!(a.is_resolved());
        assert!(a.validate().is_ok());
        assert_eq!(a.get_max_leaf_elements(), 5);
        assert_eq!(a.get_max_depth(), 8);
        assert_eq!(a.get_max_candidate_features(), 2);
        assert_eq!(a.get_num_feature_expansions(), 3);
        // explicitly set values are kept
        assert_eq!(a.get_max_candidate_thresholds(), 4);
        assert_eq!(a.get_max_dominant_fraction(), 0.9);
    }

    #[test]
    fn test_auto_select_small_sets() {
        let a = Options::new().auto_select(3, 2, 1);
        assert_eq!(a.get_max_leaf_elements(), 3);
        assert_eq!(a.get_max_depth(), 2);
        assert_eq!(a.get_max_candidate_features(), 1);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let base = Options::new().auto_select(100, 3, 9);
        assert!(base.validate().is_ok());
        assert!(base.max_leaf_elements(0).validate().is_err());
        assert!(base.max_candidate_features(0).validate().is_err());
        assert!(base.max_candidate_thresholds(0).validate().is_err());
        assert!(base.max_dominant_fraction(1.5).validate().is_err());
        assert!(base.max_dominant_fraction(0.0).validate().is_err());
    }

    #[test]
    fn test_save_load() {
        let path = env::temp_dir().join(format!("houghvote_options_{}.json", ::std::process::id()));
        let opts = Options::new()
            .max_depth(7)
            .max_leaf_elements(3)
            .min_class_uncertainty(0.25)
            .probabilistic_sampling(true)
            .empty_leaf_policy(EmptyLeafPolicy::Skip)
            .verbose(0);
        opts.save(&path).unwrap();
        let loaded = Options::load(&path).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(opts, loaded);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let path = env::temp_dir().join("houghvote_options_does_not_exist.json");
        assert!(Options::load(&path).is_err());
    }
}
