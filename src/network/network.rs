use std::path::Path;

use serde::{Serialize, Deserialize};
use tracing::{debug, info, trace};

use crate::{
    error::{check_len, NetworkError, Result},
    layers::dense::{Layer, LayerParams},
    loss::mse::MseLoss,
};

/// Serialized form of a network: its layers, input side first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkParams {
    pub layers: Vec<LayerParams>,
}

/// An ordered stack of dense layers.
///
/// Adjacent layers always agree on size: `layers[i].output_size()` equals
/// `layers[i + 1].input_size()`. The empty network is the identity.
#[derive(Debug, Clone, Default)]
pub struct Network {
    layers: Vec<Layer>,
}

impl Network {
    pub fn new() -> Network {
        Network { layers: Vec::new() }
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Input size of the first layer, `None` for the empty network.
    pub fn input_size(&self) -> Option<usize> {
        self.layers.first().map(Layer::input_size)
    }

    /// Output size of the last layer, `None` for the empty network.
    pub fn output_size(&self) -> Option<usize> {
        self.layers.last().map(Layer::output_size)
    }

    /// Checks whether `layer` could be appended, without taking it.
    pub fn can_connect(&self, layer: &Layer) -> Result<()> {
        if !layer.is_valid() {
            return Err(NetworkError::InvalidLayer(format!(
                "cannot connect empty {} -> {} layer",
                layer.input_size(), layer.output_size()
            )));
        }
        if let Some(last) = self.layers.last() {
            check_len("layer connection", last.output_size(), layer.input_size())?;
        }
        Ok(())
    }

    /// Appends `layer` if its input size matches the current output size.
    /// On error the network is left exactly as it was and `layer` is dropped;
    /// call [`Network::can_connect`] first to keep a rejected layer.
    pub fn connect_layer(&mut self, layer: Layer) -> Result<()> {
        self.can_connect(&layer)?;
        debug!(
            index = self.layers.len(),
            input_size = layer.input_size(),
            output_size = layer.output_size(),
            activation = %layer.activation(),
            "connected layer"
        );
        self.layers.push(layer);
        Ok(())
    }

    /// Removes and returns the last layer. Does nothing on the empty network.
    pub fn disconnect_layer(&mut self) -> Option<Layer> {
        self.layers.pop()
    }

    /// Runs every layer and returns the whole activation trace: element 0 is
    /// `input`, element `k` is the output of layer `k`.
    pub fn forward(&self, input: &[f64]) -> Result<Vec<Vec<f64>>> {
        self.check_input(input)?;
        let mut trace = Vec::with_capacity(self.layers.len() + 1);
        trace.push(input.to_vec());
        for layer in &self.layers {
            let next = layer.forward(&trace[trace.len() - 1])?;
            trace.push(next);
        }
        Ok(trace)
    }

    /// Output of the last layer, without keeping intermediate activations.
    pub fn eval(&self, input: &[f64]) -> Result<Vec<f64>> {
        self.check_input(input)?;
        self.layers
            .iter()
            .try_fold(input.to_vec(), |current, layer| layer.forward(&current))
    }

    /// One step of per-example gradient descent on the squared error between
    /// the network output and `target`.
    ///
    /// Every error signal is derived from the same forward trace before any
    /// parameter changes. Returns the mean squared error measured before the
    /// update.
    pub fn train(&mut self, learning_rate: f64, input: &[f64], target: &[f64]) -> Result<f64> {
        let trace = self.forward(input)?;
        let output = &trace[trace.len() - 1];
        check_len("target", output.len(), target.len())?;

        let loss = MseLoss::loss(output, target);
        let deltas = self.error_signals(&trace, target);
        for ((layer, delta), layer_input) in self.layers.iter_mut().zip(&deltas).zip(&trace) {
            layer.apply_gradients(delta, layer_input, learning_rate);
        }
        trace!(loss, learning_rate, "train step");
        Ok(loss)
    }

    /// Gradient of the loss with respect to `input`, for a fixed `target`.
    /// Nothing is updated. For the empty network this is `input - target`.
    pub fn input_gradient(&self, input: &[f64], target: &[f64]) -> Result<Vec<f64>> {
        let trace = self.forward(input)?;
        let output = &trace[trace.len() - 1];
        check_len("target", output.len(), target.len())?;

        let deltas = self.error_signals(&trace, target);
        Ok(match (self.layers.first(), deltas.first()) {
            (Some(first), Some(delta)) => first.back_propagate(delta),
            _ => MseLoss::derivative(output, target),
        })
    }

    /// Per-layer error signals, walking back from the output layer.
    fn error_signals(&self, trace: &[Vec<f64>], target: &[f64]) -> Vec<Vec<f64>> {
        let n = self.layers.len();
        let mut deltas = vec![Vec::new(); n];
        if n == 0 {
            return deltas;
        }

        let dc_da = MseLoss::derivative(&trace[n], target);
        deltas[n - 1] = self.layers[n - 1].error_signal(&dc_da, &trace[n]);
        for l in (0..n - 1).rev() {
            let upstream = self.layers[l + 1].back_propagate(&deltas[l + 1]);
            deltas[l] = self.layers[l].error_signal(&upstream, &trace[l + 1]);
        }
        deltas
    }

    fn check_input(&self, input: &[f64]) -> Result<()> {
        match self.input_size() {
            Some(expected) => check_len("network input", expected, input.len()),
            None => Ok(()),
        }
    }

    pub fn serialize(&self) -> NetworkParams {
        NetworkParams {
            layers: self.layers.iter().map(Layer::serialize).collect(),
        }
    }

    /// Rebuilds a network, validating every layer and every connection.
    pub fn load(params: NetworkParams) -> Result<Network> {
        let mut network = Network::new();
        for layer_params in params.layers {
            network.connect_layer(Layer::try_from(layer_params)?)?;
        }
        Ok(network)
    }

    /// Serializes the network parameters to a pretty-printed JSON file.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = std::fs::File::create(path.as_ref())?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, &self.serialize())?;
        info!(path = %path.as_ref().display(), layers = self.layers.len(), "saved network");
        Ok(())
    }

    /// Deserializes a network from a JSON file previously written by `save_json`.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Network> {
        let file = std::fs::File::open(path.as_ref())?;
        let reader = std::io::BufReader::new(file);
        let params: NetworkParams = serde_json::from_reader(reader)?;
        let network = Network::load(params)?;
        info!(path = %path.as_ref().display(), layers = network.len(), "loaded network");
        Ok(network)
    }
}
