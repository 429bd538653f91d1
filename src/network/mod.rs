pub mod network;
pub mod spec;

pub use network::{Network, NetworkParams};
pub use spec::{NetworkSpec, LayerSpec};
