use serde::{Serialize, Deserialize};
use tracing::info;

use crate::activation::activation::ActivationFunction;
use crate::error::Result;
use crate::layers::dense::{Layer, RandomizeMode};
use crate::network::network::Network;

/// Describes one layer in a network specification.
///
/// Fields:
/// - `input_size`:  number of values feeding into this layer (the output
///                   size of the previous layer, or the raw input dimension
///                   for the first layer)
/// - `output_size`: number of neurons in this layer
/// - `activation`:  activation function applied after the affine transform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    pub input_size: usize,
    pub output_size: usize,
    pub activation: ActivationFunction,
}

/// A serializable description of a network architecture, without weights.
///
/// `NetworkSpec` can be saved to / loaded from JSON so an architecture can be
/// chosen before training starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSpec {
    /// Ordered list of layer descriptions (input → output).
    pub layers: Vec<LayerSpec>,
}

impl NetworkSpec {
    /// Builds a spec from a list of sizes, one activation for every layer.
    /// `[784, 15, 10]` gives two layers, 784 → 15 and 15 → 10.
    pub fn from_sizes(sizes: &[usize], activation: ActivationFunction) -> NetworkSpec {
        NetworkSpec {
            layers: sizes
                .windows(2)
                .map(|pair| LayerSpec {
                    input_size: pair[0],
                    output_size: pair[1],
                    activation,
                })
                .collect(),
        }
    }

    /// 784 → 15 → 10, sigmoid throughout: 28×28 digit images in, one score
    /// per digit out.
    pub fn mnist_default() -> NetworkSpec {
        NetworkSpec::from_sizes(&[784, 15, 10], ActivationFunction::Sigmoid)
    }

    /// Connects freshly randomized layers. Layer `i` is seeded with
    /// `seed + i`, so the same spec and seed always give the same network.
    pub fn build(&self, seed: u64) -> Result<Network> {
        let mut network = Network::new();
        for (i, spec) in self.layers.iter().enumerate() {
            let mut layer = Layer::with_seed(
                spec.input_size,
                spec.output_size,
                spec.activation,
                seed.wrapping_add(i as u64),
            );
            layer.randomize(RandomizeMode::Continuous);
            network.connect_layer(layer)?;
        }
        info!(layers = network.len(), seed, "built network");
        Ok(network)
    }

    /// Serializes the spec to a pretty-printed JSON file.
    pub fn save_json(&self, path: &str) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Deserializes a `NetworkSpec` from a JSON file.
    pub fn load_json(path: &str) -> Result<NetworkSpec> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}
