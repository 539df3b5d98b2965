use std::num::NonZeroUsize;

use mlp_engine::{
    ActFn, ErrKind, Mlp, MlpErr,
    specs::{MlpSpec, TrainingSpec},
    training::{Dataset, Sgd},
};
use ndarray::{Array1, Array2, array};

fn network() -> Mlp {
    let mut mlp = Mlp::with_seed(2024);
    mlp.init(4, 3, &[6, 5], ActFn::Tanh, ActFn::Sigmoid)
        .unwrap();
    mlp
}

fn inputs(rows: usize) -> Array2<f64> {
    Array2::from_shape_fn((rows, 4), |(i, j)| ((i * 4 + j) as f64 * 0.37).sin())
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-12
}

#[test]
fn forward_shape() {
    let mut mlp = network();

    for rows in [1, 7, 32] {
        let x = inputs(rows);
        let y = mlp.forward(x.view()).unwrap();
        assert_eq!(y.dim(), (rows, 3));
        assert!(y.iter().all(|&y| (0. ..=1.).contains(&y)));
    }

    assert_eq!(mlp.dims(), 4);
    assert_eq!(mlp.len(), 3);
}

#[test]
fn ranged_forward_matches_truncated_network() {
    let mut mlp = network();
    let x = inputs(5);

    for end in 0..mlp.len() {
        let mut truncated = Mlp::with_seed(0);
        let hidden: Vec<_> = (0..end).map(|i| mlp.output_size(i)).collect();
        truncated
            .init(4, mlp.output_size(end), &hidden, ActFn::Tanh, ActFn::Tanh)
            .unwrap();

        for i in 0..=end {
            let params = mlp.params(i).unwrap();
            truncated
                .set_params(i, params.weights.view(), params.bias.view(), params.act_fn)
                .unwrap();
        }

        let expected = truncated.forward(x.view()).unwrap().to_owned();
        let got = mlp.forward_range(x.view(), 0, end).unwrap();
        assert_eq!(got, expected);

        // `start` does not skip layers.
        let got = mlp.forward_range(x.view(), end, end).unwrap();
        assert_eq!(got, expected);
    }
}

#[test]
fn frame_matches_batch_row() {
    let mut mlp = network();
    let x = inputs(3);
    let batch = mlp.forward(x.view()).unwrap().to_owned();

    for (row, expected) in x.rows().into_iter().zip(batch.rows()) {
        let mut output = Array1::zeros(3);
        mlp.process_frame(row, output.view_mut()).unwrap();

        assert!(
            output.iter().zip(expected).all(|(&a, &b)| close(a, b)),
            "{output} vs {expected}"
        );
    }

    let mut hidden = Array1::zeros(6);
    mlp.process_frame_range(x.row(0), hidden.view_mut(), 0, 0)
        .unwrap();
    let expected = mlp.forward_range(x.view(), 0, 0).unwrap();
    assert!(
        hidden
            .iter()
            .zip(expected.row(0))
            .all(|(&a, &b)| close(a, b))
    );
}

#[test]
fn params_round_trip() {
    let mut mlp = network();
    let weights = Array2::from_shape_fn((5, 6), |(i, j)| i as f64 - j as f64 * 0.5);
    let bias = Array1::linspace(-1., 1., 5);

    mlp.set_params(1, weights.view(), bias.view(), ActFn::Relu)
        .unwrap();

    let params = mlp.params(1).unwrap();
    assert_eq!(params.weights, weights);
    assert_eq!(params.bias, bias);
    assert_eq!(params.act_fn, ActFn::Relu);

    let err = mlp
        .set_params(1, weights.t(), bias.view(), ActFn::Relu)
        .unwrap_err();
    assert!(matches!(err, MlpErr::SizeMismatch { .. }));
    assert_eq!(mlp.params(1).unwrap(), params);
}

#[test]
fn clear_keeps_the_topology() {
    let mut mlp = network();
    let topology = mlp.topology().unwrap();
    let before = mlp.params(0).unwrap();
    mlp.set_trained(true);

    mlp.clear().unwrap();

    assert_eq!(mlp.topology().unwrap(), topology);
    assert_ne!(mlp.params(0).unwrap().weights, before.weights);
    assert!(mlp.initialized());
    assert!(!mlp.trained());

    let mut unbuilt = Mlp::new();
    unbuilt.clear().unwrap();
    assert!(!unbuilt.initialized());
    assert!(unbuilt.is_empty());
}

#[test]
fn errors() {
    let mut mlp = network();

    let err = mlp.forward(Array2::zeros((2, 5)).view()).unwrap_err();
    assert_eq!(err.kind(), ErrKind::Configuration);

    let err = mlp
        .forward_range(inputs(2).view(), 0, 9)
        .unwrap_err();
    assert_eq!(err, MlpErr::LayerOutOfRange { layer: 9, len: 3 });

    let err = mlp.backward(Array2::zeros((2, 3)).view()).unwrap_err();
    assert_eq!(err, MlpErr::NoForwardPass);
    assert_eq!(err.kind(), ErrKind::NotReady);

    let err = Mlp::loss(array![[1., 2.]].view(), array![[1.]].view()).unwrap_err();
    assert!(matches!(err, MlpErr::SizeMismatch { .. }));

    assert_eq!(ActFn::try_from(7usize), Err(MlpErr::UnknownActivation(7)));
}

#[test]
fn build_from_json() {
    let json = r#"{
        "input_size": 2,
        "output_size": 1,
        "hidden_sizes": [3],
        "hidden_act": "relu",
        "output_act": "sigmoid",
        "seed": 12
    }"#;

    let spec: MlpSpec = serde_json::from_str(json).unwrap();
    let a = Mlp::from_spec(&spec).unwrap();
    let b = Mlp::from_spec(&spec).unwrap();

    assert_eq!(a.topology().unwrap(), spec.topology);
    assert_eq!(a.params(0).unwrap(), b.params(0).unwrap());
    assert_eq!(a.params(1).unwrap().act_fn, ActFn::Sigmoid);
}

#[test]
fn train_regression() {
    let x = Array2::from_shape_fn((64, 2), |(i, j)| ((i * 2 + j) as f64 * 0.61).cos());
    let y = Array2::from_shape_fn((64, 1), |(i, _)| 0.5 * x[[i, 0]] - 0.25 * x[[i, 1]]);
    let dataset = Dataset::new(x, y).unwrap();

    let mut mlp = Mlp::with_seed(6);
    mlp.init(2, 1, &[4], ActFn::Tanh, ActFn::Identity)
        .unwrap();

    let spec = TrainingSpec {
        epochs: 300,
        batch_size: NonZeroUsize::new(16).unwrap(),
        learning_rate: 0.05,
        momentum: 0.9,
        validation: 0.,
        seed: Some(1),
    };
    let mut sgd = Sgd::from_spec(&spec).unwrap();
    let loss = sgd.train(&mut mlp, &dataset).unwrap();

    assert!(loss < 5e-3, "loss: {loss}");
    assert!(mlp.trained());
}
