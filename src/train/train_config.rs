/// Configuration for a `train_loop` run.
///
/// # Fields
/// - `epochs`:        total number of full passes over the training data
/// - `learning_rate`: fixed gradient-descent step size
/// - `shuffle_seed`:  when set, the example order is reshuffled every epoch
///                     by a generator seeded with this value; when `None`
///                     examples are visited in dataset order
/// - `log_every`:     emit a progress event every this many examples;
///                     `0` disables per-example progress
#[derive(Debug, Clone, PartialEq)]
pub struct TrainConfig {
    pub epochs: usize,
    pub learning_rate: f64,
    pub shuffle_seed: Option<u64>,
    pub log_every: usize,
}

impl TrainConfig {
    /// Creates a `TrainConfig` that visits examples in order and logs only
    /// per-epoch summaries.
    pub fn new(epochs: usize, learning_rate: f64) -> Self {
        TrainConfig {
            epochs,
            learning_rate,
            shuffle_seed: None,
            log_every: 0,
        }
    }

    pub fn with_shuffle_seed(mut self, seed: u64) -> Self {
        self.shuffle_seed = Some(seed);
        self
    }

    pub fn with_log_every(mut self, log_every: usize) -> Self {
        self.log_every = log_every;
        self
    }
}
