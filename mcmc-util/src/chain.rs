/// Log-likelihood recorded at selected sweeps of a Gibbs chain.
#[derive(Debug, Clone, Default)]
pub struct McmcTrace {
    pub sweeps: Vec<usize>,
    pub log_likelihoods: Vec<f64>,
}

impl McmcTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sweep: usize, llik: f64) {
        self.sweeps.push(sweep);
        self.log_likelihoods.push(llik);
    }

    pub fn len(&self) -> usize {
        self.log_likelihoods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log_likelihoods.is_empty()
    }

    pub fn last(&self) -> Option<f64> {
        self.log_likelihoods.last().copied()
    }

    pub fn best(&self) -> Option<f64> {
        self.log_likelihoods
            .iter()
            .copied()
            .fold(None, |acc, x| match acc {
                Some(y) if y >= x => Some(y),
                _ => Some(x),
            })
    }

    /// Mean over the last `window` recorded values (all of them if fewer).
    pub fn tail_mean(&self, window: usize) -> Option<f64> {
        let n = self.len();
        if n == 0 || window == 0 {
            return None;
        }
        let start = n.saturating_sub(window);
        let tail = &self.log_likelihoods[start..];
        Some(tail.iter().sum::<f64>() / tail.len() as f64)
    }

    /// Relative change between the means of the last two windows.
    ///
    /// `None` until at least `2 * window` values are recorded.
    pub fn relative_change(&self, window: usize) -> Option<f64> {
        let n = self.len();
        if window == 0 || n < 2 * window {
            return None;
        }
        let prev = &self.log_likelihoods[(n - 2 * window)..(n - window)];
        let curr = &self.log_likelihoods[(n - window)..];
        let prev_mean = prev.iter().sum::<f64>() / window as f64;
        let curr_mean = curr.iter().sum::<f64>() / window as f64;
        let denom = prev_mean.abs().max(f64::MIN_POSITIVE);
        Some((curr_mean - prev_mean) / denom)
    }

    /// One `sweep<TAB>llik` line per record
    pub fn to_lines(&self) -> Vec<Box<str>> {
        self.sweeps
            .iter()
            .zip(self.log_likelihoods.iter())
            .map(|(s, l)| format!("{}\t{}", s, l).into_boxed_str())
            .collect()
    }
}
