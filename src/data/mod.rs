pub mod idx;

pub use idx::{argmax, load_idx_pair, one_hot, Dataset};
