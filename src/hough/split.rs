//! Randomized search for the split of a tree node.
//!
//! A node whose examples are still mixed (the most frequent class covers less
//! than `max_dominant_fraction` of them) is split to reduce the class entropy.
//! Once a node is dominated by one class it is split to make the self-votes
//! more compact, measured as the summed scatter of the votes of every
//! non-background class around their class mean.

use super::cache::ExampleCache;
use super::options::Options;
use super::BACKGROUND_CLASS;
use meancov_estimation::MomentAccumulator;
use rand::Rng;

/// rel!(a,b) = a / b where a and b are forced to be a f64
macro_rules! rel {
    ($x: expr, $y: expr) => {($x as f64) / ($y as f64)}
}

/// x * log2(x) with 0 * log2(0) = 0
macro_rules! xlog2x {
    ($x: expr) => {if $x <= 0f64 {0f64} else {$x * $x.log2()} }
}

/// Class counts and vote moments of a set of examples.
#[derive(Debug, Clone)]
pub struct NodeStats {
    counts: Vec<usize>,
    total: usize,
    votes: Vec<MomentAccumulator>,
}

impl NodeStats {
    pub fn new(num_vote_params: &[usize]) -> NodeStats {
        NodeStats {
            counts: vec![0; num_vote_params.len()],
            total: 0,
            votes: num_vote_params.iter().map(|&d| MomentAccumulator::new(d)).collect(),
        }
    }

    /// Collects the statistics of the given examples.
    pub fn of_examples(cache: &ExampleCache, num_vote_params: &[usize], examples: &[usize]) -> NodeStats {
        let mut stats = NodeStats::new(num_vote_params);
        for &e in examples {
            stats.add(cache, e);
        }
        stats
    }

    pub fn add(&mut self, cache: &ExampleCache, example: usize) {
        let class = cache.class(example);
        self.counts[class] += 1;
        self.total += 1;
        if class != BACKGROUND_CLASS {
            self.votes[class].add(cache.self_vote(example));
        }
    }

    pub fn clear(&mut self) {
        for c in self.counts.iter_mut() {
            *c = 0;
        }
        for v in self.votes.iter_mut() {
            v.clear();
        }
        self.total = 0;
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn count(&self, class: usize) -> usize {
        self.counts[class]
    }

    /// Entropy of the class distribution in bits, background included.
    pub fn entropy(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        -self.counts.iter().map(|&c| xlog2x!(rel!(c, self.total))).sum::<f64>()
    }

    /// Fraction of the examples covered by the most frequent class.
    /// An empty set counts as fully dominated.
    pub fn dominant_fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        rel!(self.counts.iter().cloned().max().unwrap_or(0), self.total)
    }

    /// Summed scatter of the self-votes of all non-background classes.
    pub fn vote_scatter(&self) -> f64 {
        self.votes.iter().skip(1).map(|v| v.scatter()).sum()
    }
}

/// What a node split tries to improve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Criterion {
    ClassUncertainty,
    VoteCompactness,
}

impl Criterion {
    /// Selects the criterion for a node from its statistics.
    pub fn for_node(stats: &NodeStats, options: &Options) -> Criterion {
        if stats.dominant_fraction() < options.get_max_dominant_fraction() {
            Criterion::ClassUncertainty
        } else {
            Criterion::VoteCompactness
        }
    }

    fn impurity(self, stats: &NodeStats) -> f64 {
        match self {
            Criterion::ClassUncertainty => stats.entropy(),
            Criterion::VoteCompactness => stats.vote_scatter(),
        }
    }

    /// Reduction of impurity achieved by splitting `parent` into `left` and `right`.
    fn gain(self, parent: f64, left: &NodeStats, right: &NodeStats) -> f64 {
        match self {
            Criterion::ClassUncertainty => {
                let n = left.total() + right.total();
                parent - rel!(left.total(), n) * left.entropy() - rel!(right.total(), n) * right.entropy()
            }
            Criterion::VoteCompactness => parent - left.vote_scatter() - right.vote_scatter(),
        }
    }
}

/// A feature and threshold that divide a node into two non-empty parts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitCandidate {
    pub feature: usize,
    pub threshold: f64,
    pub score: f64,
    pub num_left: usize,
    pub num_right: usize,
}

/// Everything the split search reads. Shared by all nodes of all trees.
pub struct SplitSearch<'a> {
    pub cache: &'a ExampleCache,
    pub num_vote_params: &'a [usize],
    /// Must be resolved
    pub options: &'a Options,
}

impl<'a> SplitSearch<'a> {
    /// Searches a split for the node holding `examples` (with statistics `stats`).
    ///
    /// Each round draws a fresh random set of candidate features, which grows by
    /// `max_candidate_features` per round; further rounds only run while no valid
    /// split has been found. Returns None if no feature/threshold pair leaves both
    /// sides non-empty. Among equally good candidates the first one found wins.
    pub fn find_split<R: Rng>(&self,
                              examples: &[usize],
                              stats: &NodeStats,
                              rng: &mut R)
                              -> Option<SplitCandidate> {
        let num_features = self.cache.num_features();
        if examples.len() < 2 || num_features == 0 {
            return None;
        }
        let criterion = Criterion::for_node(stats, self.options);
        let parent = criterion.impurity(stats);
        let max_df = self.options.get_max_dominant_fraction();
        let num_thresholds = self.options.get_max_candidate_thresholds().max(1) as usize;
        let base_features = self.options.get_max_candidate_features().max(1) as usize;
        let rounds = self.options.get_num_feature_expansions().max(0) as usize + 1;

        let mut values = vec![0f64; examples.len()];
        let mut left = NodeStats::new(self.num_vote_params);
        let mut right = NodeStats::new(self.num_vote_params);
        let mut best: Option<SplitCandidate> = None;

        for round in 0..rounds {
            let num_candidates = (base_features * (round + 1)).min(num_features);
            for feature in sample_features(num_features, num_candidates, rng) {
                for (v, &e) in values.iter_mut().zip(examples.iter()) {
                    *v = self.cache.feature(e, feature);
                }
                let lo = values.iter().cloned().fold(::std::f64::INFINITY, f64::min);
                let hi = values.iter().cloned().fold(::std::f64::NEG_INFINITY, f64::max);
                if !(lo < hi) || !lo.is_finite() || !hi.is_finite() {
                    continue;
                }

                for t in 0..num_thresholds {
                    let threshold = if self.options.get_probabilistic_sampling() {
                        rng.gen_range(lo, hi)
                    } else {
                        lo + (hi - lo) * rel!(t + 1, num_thresholds + 1)
                    };

                    left.clear();
                    right.clear();
                    for (v, &e) in values.iter().zip(examples.iter()) {
                        if *v <= threshold {
                            left.add(self.cache, e);
                        } else {
                            right.add(self.cache, e);
                        }
                    }
                    if left.total() == 0 || right.total() == 0 {
                        continue;
                    }

                    let candidate = SplitCandidate {
                        feature: feature,
                        threshold: threshold,
                        score: criterion.gain(parent, &left, &right),
                        num_left: left.total(),
                        num_right: right.total(),
                    };
                    // both sides already dominated by one class: good enough
                    if criterion == Criterion::ClassUncertainty && left.dominant_fraction() >= max_df &&
                       right.dominant_fraction() >= max_df {
                        return Some(candidate);
                    }
                    let better = match best {
                        Some(ref b) => candidate.score > b.score,
                        None => true,
                    };
                    if better {
                        best = Some(candidate);
                    }
                }
            }
            if best.is_some() {
                break;
            }
        }
        best
    }
}

/// Draws `k` distinct feature indices out of `0..num_features`.
pub fn sample_features<R: Rng>(num_features: usize, k: usize, rng: &mut R) -> Vec<usize> {
    let k = k.min(num_features);
    let mut pool: Vec<usize> = (0..num_features).collect();
    for i in 0..k {
        let j = rng.gen_range(i, num_features);
        pool.swap(i, j);
    }
    pool.truncate(k);
    pool
}
