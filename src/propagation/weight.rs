// Neighbor weighting strategies.
//
// A weight function turns a neighbor's distance into its share of the
// propagated embedding. Contract: the result is finite, non-negative and
// does not increase as distance grows.

/// Distance -> weight.
pub trait NeighborWeight {
    fn weight(&self, distance: f64) -> f64;
}

/// Every neighbor counts the same.
#[derive(Debug, Clone, Copy, Default)]
pub struct Uniform;

impl NeighborWeight for Uniform {
    fn weight(&self, _distance: f64) -> f64 {
        1.0
    }
}

/// `1 / (epsilon + distance)`. The epsilon keeps an exact match finite while
/// still letting it dominate the average.
#[derive(Debug, Clone, Copy)]
pub struct InverseDistance {
    pub epsilon: f64,
}

impl Default for InverseDistance {
    fn default() -> Self {
        Self { epsilon: 1e-5 }
    }
}

impl NeighborWeight for InverseDistance {
    fn weight(&self, distance: f64) -> f64 {
        1.0 / (self.epsilon + distance)
    }
}

impl<F> NeighborWeight for F
where
    F: Fn(f64) -> f64,
{
    fn weight(&self, distance: f64) -> f64 {
        self(distance)
    }
}
