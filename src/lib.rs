pub mod error;
pub mod math;
pub mod activation;
pub mod layers;
pub mod network;
pub mod loss;
pub mod train;
pub mod data;

// Convenience re-exports
pub use error::{NetworkError, Result};
pub use math::matrix::Matrix;
pub use activation::activation::ActivationFunction;
pub use layers::dense::{Layer, LayerParams, RandomizeMode};
pub use network::network::{Network, NetworkParams};
pub use network::spec::{LayerSpec, NetworkSpec};
pub use loss::mse::MseLoss;
pub use train::{train_loop, train_network, TrainConfig};
pub use data::idx::{load_idx_pair, Dataset};
