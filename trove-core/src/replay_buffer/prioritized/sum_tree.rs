//! Sum tree for prioritized sampling.
//!
//! Code is adapted from https://github.com/jaromiru/AI-blog/blob/master/SumTree.py and
//! https://github.com/openai/baselines/blob/master/baselines/deepq/replay_buffer.py
use crate::TroveError;
use anyhow::Result;
use rand::Rng;
use segment_tree::{ops::MaxIgnoreNaN, SegmentPoint};

/// Binary tree whose leaves hold the sampling mass `(p + eps)^alpha` of each
/// slot and whose internal nodes hold the sum of their children.
///
/// Leaf of slot `ix` is at `ix + capacity - 1`. Raw priorities are kept
/// alongside, with a max tree for the priority of newly added slots.
#[derive(Debug)]
pub struct SumTree {
    eps: f32,
    alpha: f32,
    capacity: usize,
    n_samples: usize,
    tree: Vec<f64>,
    priorities: Vec<f32>,
    max_tree: SegmentPoint<f32, MaxIgnoreNaN>,
}

impl SumTree {
    pub fn new(capacity: usize, alpha: f32, eps: f32) -> Self {
        Self {
            eps,
            alpha,
            capacity,
            n_samples: 0,
            tree: vec![0f64; 2 * capacity - 1],
            priorities: vec![0f32; capacity],
            max_tree: SegmentPoint::build(vec![0f32; capacity], MaxIgnoreNaN),
        }
    }

    fn retrieve(&self, mut s: f64) -> usize {
        let mut ix = 0;
        loop {
            let left = 2 * ix + 1;
            let right = left + 1;

            if left >= self.tree.len() {
                return ix;
            }

            if s < self.tree[left] || self.tree[right] <= 0f64 {
                ix = left;
            } else {
                s -= self.tree[left];
                ix = right;
            }
        }
    }

    /// Number of slots holding a priority.
    pub fn len(&self) -> usize {
        self.n_samples
    }

    /// Total sampling mass.
    pub fn total(&self) -> f64 {
        self.tree[0]
    }

    /// Maximum raw priority, or 1 if no slot has been added yet.
    pub fn max(&self) -> f32 {
        if self.n_samples == 0 {
            1f32
        } else {
            self.max_tree.query(0, self.capacity)
        }
    }

    /// Raw priority of slot `ix`.
    pub fn priority(&self, ix: usize) -> f32 {
        self.priorities[ix]
    }

    /// Sampling mass of slot `ix`, i.e., `(p + eps)^alpha`.
    pub fn mass(&self, ix: usize) -> f64 {
        self.tree[ix + self.capacity - 1]
    }

    /// Sets priority `p` for the slot `ix` being filled by a push.
    ///
    /// `ix` is either the next empty slot or, once full, an overwritten one.
    pub fn add(&mut self, ix: usize, p: f32) {
        debug_assert!(ix <= self.n_samples);

        self.update(ix, p);

        if self.n_samples < self.capacity {
            self.n_samples += 1;
        }
    }

    /// Updates the priority of slot `ix`.
    pub fn update(&mut self, ix: usize, p: f32) {
        debug_assert!(ix < self.capacity);

        self.priorities[ix] = p;
        self.max_tree.modify(ix, p);

        let mut node = ix + self.capacity - 1;
        self.tree[node] = ((p + self.eps) as f64).powf(self.alpha as f64);
        while node > 0 {
            node = (node - 1) / 2;
            self.tree[node] = self.tree[2 * node + 1] + self.tree[2 * node + 2];
        }
    }

    /// Returns the slot where the cumulative mass first exceeds `s`.
    pub fn get(&self, s: f64) -> usize {
        let ix = self.retrieve(s);
        debug_assert!(ix >= (self.capacity - 1));
        ix + 1 - self.capacity
    }

    /// Samples `batch_size` slots with replacement and returns them with their
    /// importance sampling weights.
    ///
    /// The weight is $w_i=\left(N P(i)\right)^{-\beta}$ and it is normalized by
    /// $\max_i w_i$ within the batch.
    pub fn sample<R: Rng>(
        &self,
        batch_size: usize,
        beta: f32,
        rng: &mut R,
    ) -> Result<(Vec<usize>, Vec<f32>)> {
        if batch_size == 0 {
            return Ok((vec![], vec![]));
        }

        let p_sum = self.total();
        if !(p_sum.is_finite() && p_sum > 0f64) {
            return Err(TroveError::DegenerateDistribution(p_sum).into());
        }

        let ixs = (0..batch_size)
            .map(|_| self.get(p_sum * rng.gen::<f64>()).min(self.n_samples - 1))
            .collect::<Vec<_>>();

        let n = self.n_samples as f64 / p_sum;
        let ws = ixs
            .iter()
            .map(|&ix| (n * self.mass(ix)).powf(-beta as f64))
            .collect::<Vec<_>>();

        // normalizer within batch
        let w_max = ws.iter().cloned().fold(f64::MIN, f64::max);
        let ws = ws.iter().map(|w| (w / w_max) as f32).collect();

        Ok((ixs, ws))
    }
}

#[cfg(test)]
mod tests {
    use super::SumTree;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_sum_tree_odd() {
        let data = vec![0.5f32, 0.2, 0.8, 0.3, 1.1, 2.5, 3.9];
        let mut sum_tree = SumTree::new(8, 1.0, 0.0);
        for ix in 0..data.len() {
            sum_tree.add(ix, data[ix]);
        }

        assert_eq!(sum_tree.get(0.0), 0);
        assert_eq!(sum_tree.get(0.4), 0);
        assert_eq!(sum_tree.get(0.6), 1);
        assert_eq!(sum_tree.get(1.2), 2);
        assert_eq!(sum_tree.get(1.6), 3);
        assert_eq!(sum_tree.get(2.0), 4);
        assert_eq!(sum_tree.get(2.8), 4);
        assert_eq!(sum_tree.get(9.0), 6);

        let mut rng = StdRng::seed_from_u64(42);
        let n_samples = 100_000;
        let (ixs, _) = sum_tree.sample(n_samples, 1.0, &mut rng).unwrap();
        assert!(ixs.iter().all(|&ix| ix < data.len()));
        (0..data.len()).for_each(|ix| {
            let p = data[ix] as f64 / sum_tree.total();
            let n = ixs.iter().filter(|&&e| e == ix).count();
            let freq = n as f64 / n_samples as f64;
            println!("ix={:?}: {:?} (p={:?})", ix, freq, p);
            assert!((freq - p).abs() < 0.01);
        })
    }

    #[test]
    fn test_importance_sampling_weights() {
        // masses 1 and 3, so N P(i) is 0.5 and 1.5
        let mut sum_tree = SumTree::new(2, 1.0, 0.0);
        sum_tree.add(0, 1.0);
        sum_tree.add(1, 3.0);

        let mut rng = StdRng::seed_from_u64(42);
        let (ixs, ws) = sum_tree.sample(64, 0.5, &mut rng).unwrap();
        assert!(ixs.contains(&0) && ixs.contains(&1));
        for (&ix, &w) in ixs.iter().zip(ws.iter()) {
            let expected = if ix == 0 { 1.0 } else { (1f32 / 3.0).powf(0.5) };
            assert!((w - expected).abs() < 1e-6, "ix={}, w={}", ix, w);
        }

        // no correction at beta = 0, full correction at beta = 1
        let (_, ws) = sum_tree.sample(64, 0.0, &mut rng).unwrap();
        assert!(ws.iter().all(|&w| (w - 1.0).abs() < 1e-6));
        let (ixs, ws) = sum_tree.sample(64, 1.0, &mut rng).unwrap();
        assert!(ixs.contains(&0));
        for (&ix, &w) in ixs.iter().zip(ws.iter()) {
            let expected = if ix == 0 { 1.0 } else { 1.0 / 3.0 };
            assert!((w - expected).abs() < 1e-6, "ix={}, w={}", ix, w);
        }
    }

    #[test]
    fn test_total_is_exact_after_many_updates() {
        let mut sum_tree = SumTree::new(5, 1.0, 0.0);
        for ix in 0..5 {
            sum_tree.add(ix, 1.0);
        }
        for k in 0..1000 {
            sum_tree.update(k % 5, (k % 7) as f32 * 0.1);
        }
        let expected: f64 = (0..5).map(|ix| sum_tree.mass(ix)).sum();
        assert!((sum_tree.total() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_max_tracks_raw_priorities() {
        let mut sum_tree = SumTree::new(4, 0.6, 1e-5);
        assert_eq!(sum_tree.max(), 1.0);

        sum_tree.add(0, 1.0);
        sum_tree.update(0, 3.0);
        sum_tree.add(1, 0.5);
        assert_eq!(sum_tree.max(), 3.0);
        assert_eq!(sum_tree.priority(1), 0.5);

        sum_tree.update(0, 0.1);
        assert_eq!(sum_tree.max(), 0.5);
    }

    #[test]
    fn test_zero_mass_is_never_sampled() {
        let mut sum_tree = SumTree::new(6, 1.0, 0.0);
        for ix in 0..6 {
            sum_tree.add(ix, if ix % 2 == 0 { 0.0 } else { 1.0 });
        }
        let mut rng = StdRng::seed_from_u64(0);
        let (ixs, ws) = sum_tree.sample(10_000, 0.5, &mut rng).unwrap();
        assert!(ixs.iter().all(|&ix| ix % 2 == 1));
        assert!(ws.iter().all(|&w| (w - 1.0).abs() < 1e-6));
    }
}
