use tracing::debug;

use crate::{
    error::{check_len, NetworkError, Result},
    network::network::Network,
};

/// One pass of per-example gradient descent over the dataset, in order.
/// Returns the mean loss.
pub fn train_network(
    network: &mut Network,
    inputs: &[Vec<f64>],
    expected_outputs: &[Vec<f64>],
    learning_rate: f64,
) -> Result<f64> {
    let order: Vec<usize> = (0..inputs.len()).collect();
    train_epoch(network, inputs, expected_outputs, learning_rate, &order, 0)
}

/// One pass of per-example gradient descent, visiting `inputs[i]` for each
/// `i` in `order`. Every example updates the network before the next one is
/// seen. Returns the mean loss over the visited examples.
///
/// Every index and example size is checked before the first update, so an
/// `Err` leaves the network untouched.
///
/// A `debug!` event is emitted every `log_every` examples (never for `0`).
pub fn train_epoch(
    network: &mut Network,
    inputs: &[Vec<f64>],
    expected_outputs: &[Vec<f64>],
    learning_rate: f64,
    order: &[usize],
    log_every: usize,
) -> Result<f64> {
    check_len("expected outputs", inputs.len(), expected_outputs.len())?;
    if order.is_empty() {
        return Ok(0.0);
    }
    let examples = select_examples(network, inputs, expected_outputs, order)?;

    let mut total_loss = 0.0;
    for (step, (input, expected)) in examples.into_iter().enumerate() {
        total_loss += network.train(learning_rate, input, expected)?;

        if log_every > 0 && (step + 1) % log_every == 0 {
            debug!(
                trained = step + 1,
                of = order.len(),
                mean_loss = total_loss / (step + 1) as f64,
                "training progress"
            );
        }
    }

    Ok(total_loss / order.len() as f64)
}

/// Resolves `order` into `(input, expected)` pairs sized for `network`.
fn select_examples<'a>(
    network: &Network,
    inputs: &'a [Vec<f64>],
    expected_outputs: &'a [Vec<f64>],
    order: &[usize],
) -> Result<Vec<(&'a [f64], &'a [f64])>> {
    order
        .iter()
        .map(|&idx| {
            let (input, expected) = inputs.get(idx).zip(expected_outputs.get(idx)).ok_or_else(|| {
                NetworkError::Dataset(format!(
                    "example index {} out of range for {} examples",
                    idx, inputs.len()
                ))
            })?;
            if let Some(n) = network.input_size() {
                check_len("input", n, input.len())?;
            }
            // The empty network is the identity.
            let out = network.output_size().unwrap_or(input.len());
            check_len("target", out, expected.len())?;
            Ok((input.as_slice(), expected.as_slice()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{activation::activation::ActivationFunction, network::spec::NetworkSpec};

    fn xor() -> (Vec<Vec<f64>>, Vec<Vec<f64>>) {
        let inputs = vec![
            vec![1.0, 0.0],
            vec![1.0, 1.0],
            vec![0.0, 1.0],
            vec![0.0, 0.0],
        ];
        let expected = vec![vec![1.0], vec![0.0], vec![1.0], vec![0.0]];
        (inputs, expected)
    }

    #[test]
    fn epochs_reduce_mean_loss() {
        let (inputs, expected) = xor();
        let mut network = NetworkSpec::from_sizes(&[2, 4, 1], ActivationFunction::Sigmoid)
            .build(3)
            .unwrap();
        let first = train_network(&mut network, &inputs, &expected, 0.5).unwrap();
        let mut last = first;
        for _ in 0..500 {
            last = train_network(&mut network, &inputs, &expected, 0.5).unwrap();
        }
        assert!(last < first, "{last} >= {first}");
    }

    #[test]
    fn rejects_mismatched_lengths_and_bad_indices() {
        let (inputs, expected) = xor();
        let mut network = NetworkSpec::from_sizes(&[2, 1], ActivationFunction::Sigmoid)
            .build(0)
            .unwrap();
        assert!(train_network(&mut network, &inputs, &expected[..3], 0.1).is_err());
        assert!(matches!(
            train_epoch(&mut network, &inputs, &expected, 0.1, &[0, 9], 0),
            Err(NetworkError::Dataset(_))
        ));
    }

    #[test]
    fn failed_epoch_leaves_network_untouched() {
        let (inputs, mut expected) = xor();
        let mut network = NetworkSpec::from_sizes(&[2, 3, 1], ActivationFunction::Sigmoid)
            .build(7)
            .unwrap();
        let before = network.serialize();

        // Out-of-range index after two valid ones.
        assert!(train_epoch(&mut network, &inputs, &expected, 0.5, &[0, 1, 4], 0).is_err());
        assert_eq!(network.serialize(), before);

        // Malformed target on the last visited example.
        expected[3] = vec![0.0, 0.0];
        assert!(matches!(
            train_network(&mut network, &inputs, &expected, 0.5),
            Err(NetworkError::DimensionMismatch { context: "target", expected: 1, found: 2 })
        ));
        assert_eq!(network.serialize(), before);
    }

    #[test]
    fn empty_order_is_zero_loss() {
        let mut network = Network::new();
        assert_eq!(train_network(&mut network, &[], &[], 1.0).unwrap(), 0.0);
    }
}
