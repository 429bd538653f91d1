use ffnn::{ActivationFunction, Layer, Network, RandomizeMode, TrainConfig, train_loop};

fn main() -> ffnn::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let mut hidden = Layer::with_seed(2, 3, ActivationFunction::Sigmoid, 1);
    let mut output = Layer::with_seed(3, 1, ActivationFunction::Sigmoid, 2);
    hidden.randomize(RandomizeMode::Continuous);
    output.randomize(RandomizeMode::Continuous);

    let mut network = Network::new();
    network.connect_layer(hidden)?;
    network.connect_layer(output)?;

    let inputs = vec![
        vec![1.0, 0.0],
        vec![1.0, 1.0],
        vec![0.0, 1.0],
        vec![0.0, 0.0],
    ];
    let expected_outputs = vec![
        vec![1.0],
        vec![0.0],
        vec![1.0],
        vec![0.0],
    ];

    let config = TrainConfig::new(5000, 2.0).with_shuffle_seed(7);
    let history = train_loop(&mut network, &inputs, &expected_outputs, None, &config)?;
    for stats in history.iter().step_by(1000) {
        println!("Epoch {}: loss = {:.6}", stats.epoch, stats.train_loss);
    }

    for input in &inputs {
        println!("Input: {:?} -> Output: {:.4}", input, network.eval(input)?[0]);
    }
    Ok(())
}
