use std::fmt;

use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Serialize, Deserialize};

use crate::{
    activation::activation::ActivationFunction,
    error::{check_len, NetworkError, Result},
    math::matrix::{hadamard, Matrix},
};

/// Seed of the generator a layer starts with when none is given.
pub const DEFAULT_SEED: u64 = 1;

/// How `Layer::randomize` fills weights and biases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RandomizeMode {
    /// Independent uniform samples in `[-1, 1]`. Use this for training.
    Continuous,
    /// Raw non-negative integers in `[0, 2^31)`. Diagnostic only: gradient
    /// descent needs signed values.
    Discrete,
}

/// Serialized form of a layer: the activation by name, the declared sizes,
/// and the parameters as plain nested sequences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerParams {
    #[serde(rename = "activation_name")]
    pub activation: ActivationFunction,
    pub input_size: usize,
    pub output_size: usize,
    /// Row-major, `output_size` rows of `input_size` columns.
    pub weights: Vec<Vec<f64>>,
    pub biases: Vec<f64>,
}

/// One dense layer: `output = activation(weights · input + biases)`.
///
/// `weights` is `output_size × input_size` and `biases` has `output_size`
/// entries. The layer owns its random generator, so randomization is
/// reproducible once the seed is fixed.
#[derive(Debug, Clone)]
pub struct Layer{
    weights: Matrix,
    biases: Vec<f64>,
    activation: ActivationFunction,
    rng: ChaCha8Rng,
}

impl Layer {
    /// Allocates zeroed parameters. Call `randomize` before training.
    pub fn new(input_size: usize, output_size: usize, activation: ActivationFunction) -> Layer {
        Layer::with_seed(input_size, output_size, activation, DEFAULT_SEED)
    }

    pub fn with_seed(
        input_size: usize,
        output_size: usize,
        activation: ActivationFunction,
        seed: u64,
    ) -> Layer {
        Layer {
            weights: Matrix::zeros(output_size, input_size),
            biases: vec![0.0; output_size],
            activation,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Reseeds the layer's generator.
    pub fn seed(&mut self, seed: u64) {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
    }

    pub fn input_size(&self) -> usize {
        self.weights.cols
    }

    pub fn output_size(&self) -> usize {
        self.weights.rows
    }

    pub fn weights(&self) -> &Matrix {
        &self.weights
    }

    pub fn biases(&self) -> &[f64] {
        &self.biases
    }

    pub fn activation(&self) -> ActivationFunction {
        self.activation
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// A layer is usable iff it is non-empty and its weights and biases agree
    /// on the output size.
    pub fn is_valid(&self) -> bool {
        !self.is_empty() && self.weights.rows == self.biases.len()
    }

    /// Replaces weights and biases. The new parameters must keep the layer's
    /// current shape.
    pub fn set_parameters(&mut self, weights: Matrix, biases: Vec<f64>) -> Result<()> {
        check_len("weight rows", self.output_size(), weights.rows)?;
        check_len("weight columns", self.input_size(), weights.cols)?;
        check_len("biases", self.output_size(), biases.len())?;
        self.weights = weights;
        self.biases = biases;
        Ok(())
    }

    pub fn randomize(&mut self, mode: RandomizeMode) {
        let rng = &mut self.rng;
        let mut sample = || match mode {
            RandomizeMode::Continuous => rng.gen_range(-1.0f64..=1.0),
            RandomizeMode::Discrete => (rng.next_u32() >> 1) as f64,
        };
        self.weights.fill_with(&mut sample);
        for b in &mut self.biases {
            *b = sample();
        }
    }

    pub fn forward(&self, input: &[f64]) -> Result<Vec<f64>> {
        self.ensure_valid()?;
        check_len("layer input", self.input_size(), input.len())?;
        let z = self.weights.mul_vec(input);
        Ok(z.iter()
            .zip(&self.biases)
            .map(|(z, b)| self.activation.function(z + b))
            .collect())
    }

    /// Activation derivative evaluated at this layer's outputs.
    pub fn derivative(&self, output: &[f64]) -> Vec<f64> {
        output.iter().map(|&a| self.activation.derivative(a)).collect()
    }

    /// `weightsᵗ · delta`: carries an error signal back to this layer's input.
    pub fn back_propagate(&self, delta: &[f64]) -> Vec<f64> {
        self.weights.transpose_mul_vec(delta)
    }

    /// Gradient step for one example:
    /// `weights -= lr · (delta ⊗ input)` and `biases -= lr · delta`.
    pub fn apply_gradients(&mut self, delta: &[f64], input: &[f64], lr: f64) {
        self.weights.sub_scaled_outer(lr, delta, input);
        for (b, d) in self.biases.iter_mut().zip(delta) {
            *b -= lr * d;
        }
    }

    /// Error signal of this layer, `upstream ⊙ f'(a)`, where `upstream` is
    /// the loss gradient with respect to the layer's output `a`.
    pub fn error_signal(&self, upstream: &[f64], output: &[f64]) -> Vec<f64> {
        hadamard(upstream, &self.derivative(output))
    }

    pub fn serialize(&self) -> LayerParams {
        LayerParams {
            activation: self.activation,
            input_size: self.input_size(),
            output_size: self.output_size(),
            weights: self.weights.data.clone(),
            biases: self.biases.clone(),
        }
    }

    /// Replaces this layer's activation and parameters with `params`.
    ///
    /// On failure the layer is left empty (and therefore invalid) rather than
    /// half-loaded. The random generator is untouched either way.
    pub fn load(&mut self, params: LayerParams) -> Result<()> {
        match check_params(params) {
            Ok((activation, weights, biases)) => {
                self.activation = activation;
                self.weights = weights;
                self.biases = biases;
                Ok(())
            }
            Err(e) => {
                self.weights = Matrix::default();
                self.biases.clear();
                Err(e)
            }
        }
    }

    fn ensure_valid(&self) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(NetworkError::InvalidLayer(format!(
                "{}x{} weights with {} biases",
                self.weights.rows, self.weights.cols, self.biases.len()
            )))
        }
    }
}

/// Checks declared sizes against the data actually present.
fn check_params(params: LayerParams) -> Result<(ActivationFunction, Matrix, Vec<f64>)> {
    let LayerParams { activation, input_size, output_size, weights, biases } = params;
    if input_size == 0 || output_size == 0 {
        return Err(NetworkError::InvalidLayer(format!(
            "declared size {} -> {} is empty",
            input_size, output_size
        )));
    }
    if weights.len() != output_size {
        return Err(NetworkError::InvalidLayer(format!(
            "declared {} outputs but found {} weight rows",
            output_size, weights.len()
        )));
    }
    if let Some((i, row)) = weights.iter().enumerate().find(|(_, row)| row.len() != input_size) {
        return Err(NetworkError::InvalidLayer(format!(
            "declared {} inputs but weight row {} has {} columns",
            input_size, i, row.len()
        )));
    }
    if biases.len() != output_size {
        return Err(NetworkError::InvalidLayer(format!(
            "declared {} outputs but found {} biases",
            output_size, biases.len()
        )));
    }
    Ok((activation, Matrix::from_data(weights)?, biases))
}

impl TryFrom<LayerParams> for Layer {
    type Error = NetworkError;

    fn try_from(params: LayerParams) -> Result<Layer> {
        let mut layer = Layer::new(0, 0, params.activation);
        layer.load(params)?;
        Ok(layer)
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Layer<{}> {} -> {}:", self.activation, self.input_size(), self.output_size())?;
        writeln!(f, "  Weights: {:?}", self.weights.data)?;
        write!(f, "  Biases: {:?}", self.biases)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn identity_layer() -> Layer {
        let mut layer = Layer::new(3, 2, ActivationFunction::Identity);
        layer.set_parameters(
            Matrix::from_data(vec![vec![1.0, 0.0, -1.0], vec![0.5, 0.5, 0.5]]).unwrap(),
            vec![0.25, -1.0],
        ).unwrap();
        layer
    }

    #[test]
    fn new_layer_has_zeroed_parameters_of_requested_shape() {
        let layer = Layer::new(4, 3, ActivationFunction::Sigmoid);
        assert_eq!(layer.input_size(), 4);
        assert_eq!(layer.output_size(), 3);
        assert_eq!(layer.biases(), &[0.0; 3]);
        assert!(layer.weights().data.iter().flatten().all(|&w| w == 0.0));
        assert!(layer.is_valid());
    }

    #[test]
    fn empty_layers_are_invalid() {
        assert!(!Layer::new(0, 3, ActivationFunction::Sigmoid).is_valid());
        assert!(!Layer::new(3, 0, ActivationFunction::Sigmoid).is_valid());
        let err = Layer::new(0, 3, ActivationFunction::Sigmoid).forward(&[]).unwrap_err();
        assert!(matches!(err, NetworkError::InvalidLayer(_)));
    }

    #[test]
    fn identity_forward_is_the_affine_map() {
        let layer = identity_layer();
        let out = layer.forward(&[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(out, vec![1.0 - 3.0 + 0.25, 3.0 - 1.0]);
    }

    #[test]
    fn forward_is_deterministic_and_sized() {
        let mut layer = Layer::with_seed(5, 4, ActivationFunction::Tanh, 7);
        layer.randomize(RandomizeMode::Continuous);
        let input = [0.1, -0.2, 0.3, 0.0, 1.0];
        let first = layer.forward(&input).unwrap();
        assert_eq!(first.len(), 4);
        assert_eq!(first, layer.forward(&input).unwrap());
    }

    #[test]
    fn forward_rejects_wrong_input_length() {
        let err = identity_layer().forward(&[1.0, 2.0]).unwrap_err();
        match err {
            NetworkError::DimensionMismatch { expected, found, .. } => {
                assert_eq!((expected, found), (3, 2));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn continuous_randomize_stays_in_unit_interval_and_is_seeded() {
        let mut a = Layer::with_seed(20, 10, ActivationFunction::Sigmoid, 42);
        let mut b = Layer::with_seed(20, 10, ActivationFunction::Sigmoid, 42);
        a.randomize(RandomizeMode::Continuous);
        b.randomize(RandomizeMode::Continuous);
        assert_eq!(a.weights(), b.weights());
        assert_eq!(a.biases(), b.biases());
        let all: Vec<f64> = a.weights().data.iter().flatten().chain(a.biases()).copied().collect();
        assert!(all.iter().all(|x| (-1.0..=1.0).contains(x)));
        assert!(all.iter().any(|&x| x < 0.0));
        assert!(all.iter().any(|&x| x > 0.0));
    }

    #[test]
    fn reseeding_changes_the_draw() {
        let mut layer = Layer::with_seed(3, 3, ActivationFunction::Sigmoid, 1);
        layer.randomize(RandomizeMode::Continuous);
        let first = layer.weights().clone();
        layer.seed(2);
        layer.randomize(RandomizeMode::Continuous);
        assert_ne!(&first, layer.weights());
    }

    #[test]
    fn discrete_randomize_gives_non_negative_integers() {
        let mut layer = Layer::with_seed(6, 4, ActivationFunction::Identity, 3);
        layer.randomize(RandomizeMode::Discrete);
        for &x in layer.weights().data.iter().flatten().chain(layer.biases()) {
            assert!(x >= 0.0);
            assert!(x < 2f64.powi(31));
            assert_eq!(x.fract(), 0.0);
        }
    }

    #[test]
    fn set_parameters_keeps_shape() {
        let mut layer = Layer::new(3, 2, ActivationFunction::Identity);
        assert!(layer.set_parameters(Matrix::zeros(3, 2), vec![0.0; 2]).is_err());
        assert!(layer.set_parameters(Matrix::zeros(2, 3), vec![0.0; 3]).is_err());
        assert!(layer.set_parameters(Matrix::zeros(2, 3), vec![1.0; 2]).is_ok());
    }

    #[test]
    fn back_propagate_uses_transposed_weights() {
        let layer = identity_layer();
        assert_eq!(layer.back_propagate(&[2.0, 4.0]), vec![4.0, 2.0, 0.0]);
    }

    #[test]
    fn apply_gradients_subtracts_outer_product() {
        let mut layer = identity_layer();
        layer.apply_gradients(&[1.0, 0.0], &[1.0, 2.0, 3.0], 0.5);
        assert_eq!(layer.weights().data[0], vec![0.5, -1.0, -2.5]);
        assert_eq!(layer.weights().data[1], vec![0.5, 0.5, 0.5]);
        assert_eq!(layer.biases(), &[-0.25, -1.0]);
    }

    #[test]
    fn serialize_then_load_reproduces_layer() {
        let mut layer = Layer::with_seed(4, 3, ActivationFunction::Sigmoid, 11);
        layer.randomize(RandomizeMode::Continuous);
        let params = layer.serialize();
        assert_eq!(params.input_size, 4);
        assert_eq!(params.output_size, 3);

        let restored = Layer::try_from(params.clone()).unwrap();
        assert_eq!(restored.weights(), layer.weights());
        assert_eq!(restored.biases(), layer.biases());
        assert_eq!(restored.activation(), ActivationFunction::Sigmoid);
        assert_eq!(restored.serialize(), params);
    }

    #[test]
    fn params_json_names_the_activation() {
        let json = serde_json::to_value(identity_layer().serialize()).unwrap();
        assert_eq!(json["activation_name"], "identity");
        assert_eq!(json["weights"][1][2], 0.5);
    }

    #[test]
    fn load_rejects_mismatched_declarations_and_empties_layer() {
        let good = identity_layer().serialize();

        let mut wrong_rows = good.clone();
        wrong_rows.output_size = 3;
        let mut wrong_cols = good.clone();
        wrong_cols.weights[1].push(9.0);
        let mut wrong_biases = good.clone();
        wrong_biases.biases.pop();
        let mut empty = good.clone();
        empty.input_size = 0;

        for bad in [wrong_rows, wrong_cols, wrong_biases, empty] {
            let mut layer = identity_layer();
            let err = layer.load(bad).unwrap_err();
            assert!(matches!(err, NetworkError::InvalidLayer(_)));
            assert!(layer.is_empty());
            assert!(!layer.is_valid());
        }
    }

    #[test]
    fn sigmoid_error_signal_uses_post_activation_values() {
        let layer = Layer::new(1, 2, ActivationFunction::Sigmoid);
        let delta = layer.error_signal(&[1.0, -2.0], &[0.5, 0.25]);
        assert_relative_eq!(delta[0], 0.25);
        assert_relative_eq!(delta[1], -2.0 * 0.25 * 0.75);
    }

    #[test]
    fn display_shows_shape_and_activation() {
        let text = identity_layer().to_string();
        assert!(text.starts_with("Layer<identity> 3 -> 2:"));
        assert!(text.contains("Biases: [0.25, -1.0]"));
    }
}
