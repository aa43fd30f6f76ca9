//! Mean, covariance and scatter of vectors whose dimension is only known at runtime.
//! Vote spaces differ per class, so nothing here is fixed-size.

/// Trait which defines functions needed for square matrices.
pub trait MatrixFuncSimple {
    type Output;
    fn trace(&self) -> Self::Output;
}

impl MatrixFuncSimple for Vec<Vec<f64>> {
    type Output = f64;
    fn trace(&self) -> f64 {
        self.iter().enumerate().map(|(i, row)| row[i]).sum()
    }
}

/// Accumulates first and second moments of a stream of vectors
/// so the scatter of a set can be updated one element at a time.
#[derive(Debug, Clone, PartialEq)]
pub struct MomentAccumulator {
    count: usize,
    sum: Vec<f64>,
    sum_sq: Vec<f64>,
}

impl MomentAccumulator {
    /// Creates an empty accumulator for vectors of dimension `dim`.
    pub fn new(dim: usize) -> MomentAccumulator {
        MomentAccumulator {
            count: 0,
            sum: vec![0.0; dim],
            sum_sq: vec![0.0; dim],
        }
    }

    pub fn dim(&self) -> usize {
        self.sum.len()
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Adds a vector. Only the first `dim()` values are used.
    pub fn add(&mut self, v: &[f64]) {
        debug_assert!(v.len() >= self.dim());
        for (i, x) in v.iter().take(self.sum.len()).enumerate() {
            self.sum[i] += *x;
            self.sum_sq[i] += *x * *x;
        }
        self.count += 1;
    }

    /// Resets the accumulator to the empty state, keeping its dimension.
    pub fn clear(&mut self) {
        self.count = 0;
        for x in self.sum.iter_mut().chain(self.sum_sq.iter_mut()) {
            *x = 0.0;
        }
    }

    /// Returns the mean of all added vectors or None if nothing was added.
    pub fn mean(&self) -> Option<Vec<f64>> {
        if self.count == 0 {
            return None;
        }
        let n = self.count as f64;
        Some(self.sum.iter().map(|s| s / n).collect())
    }

    /// Sum of squared deviations from the mean, over all dimensions.
    /// This is the trace of the (unnormalized) scatter matrix.
    pub fn scatter(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        let n = self.count as f64;
        let s: f64 = self.sum
            .iter()
            .zip(self.sum_sq.iter())
            .map(|(s, sq)| sq - s * s / n)
            .sum();
        // cancellation may leave tiny negative values
        if s < 0.0 { 0.0 } else { s }
    }
}

/// Estimate the mean value of the given set.
pub fn estimate_mean<V: AsRef<[f64]>>(set: &[V]) -> Option<Vec<f64>> {
    if set.is_empty() {
        return None;
    }
    let dim = set[0].as_ref().len();
    let mut acc = MomentAccumulator::new(dim);
    for v in set {
        acc.add(v.as_ref());
    }
    acc.mean()
}

/// Estimate the mean value and the covariance matrix
/// of the given set. All vectors must have the same dimension
/// and at least two vectors are needed.
pub fn estimate_mean_cov<V: AsRef<[f64]>>(set: &[V]) -> Option<(Vec<f64>, Vec<Vec<f64>>)> {
    if set.len() < 2 {
        return None;
    }
    let mean = match estimate_mean(set) {
        Some(m) => m,
        None => return None,
    };
    let dim = mean.len();
    let mut cov = vec![vec![0f64; dim]; dim];
    for v in set {
        let v = v.as_ref();
        for j in 0..dim {
            let dj = v[j] - mean[j];
            for i in 0..dim {
                cov[j][i] += dj * (v[i] - mean[i]);
            }
        }
    }
    let denom = (set.len() - 1) as f64;
    for row in cov.iter_mut() {
        for x in row.iter_mut() {
            *x /= denom;
        }
    }
    Some((mean, cov))
}
