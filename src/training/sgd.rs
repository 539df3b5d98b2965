use std::num::NonZeroUsize;

use log::{debug, info};
use rand::rngs::StdRng;

use super::Dataset;
use crate::{
    MlpErr, Mlp, Result,
    arch::loss::{LossFn, Mse},
    error::check_size,
    specs::{TrainingSpec, generate_rng},
};

/// Epochs without an improvement of the validation loss before training stops.
const PATIENCE: usize = 5;

/// Mini-batch stochastic gradient descent with momentum.
///
/// Drives an `Mlp` through `forward`, `backward` and `update` for each batch, shuffling the
/// dataset on every epoch.
pub struct Sgd<L: LossFn = Mse> {
    loss_fn: L,
    epochs: usize,
    batch_size: NonZeroUsize,
    learning_rate: f64,
    momentum: f64,
    validation: f64,
    rng: StdRng,
}

impl Sgd<Mse> {
    /// Returns a new `Sgd` minimizing the mean squared error, without validation.
    ///
    /// # Arguments
    /// * `epochs` - The amount of passes over the dataset per `train` call.
    /// * `batch_size` - The amount of samples per parameter update.
    /// * `learning_rate` - The *length* of the steps taken on each update.
    /// * `momentum` - How much of the previous update is carried to the next one.
    pub fn new(
        epochs: usize,
        batch_size: NonZeroUsize,
        learning_rate: f64,
        momentum: f64,
    ) -> Self {
        Self {
            loss_fn: Mse,
            epochs,
            batch_size,
            learning_rate,
            momentum,
            validation: 0.,
            rng: generate_rng(None),
        }
    }

    /// Builds a new `Sgd` following a spec.
    ///
    /// # Returns
    /// An error if there are no epochs, the validation fraction is not in `[0, 1)` or the
    /// hyperparameters are not finite.
    pub fn from_spec(spec: &TrainingSpec) -> Result<Self> {
        if spec.epochs == 0 {
            return Err(MlpErr::InvalidInput("at least one epoch is required"));
        }

        if !spec.learning_rate.is_finite() || !spec.momentum.is_finite() {
            return Err(MlpErr::InvalidInput(
                "the learning rate and momentum must be finite",
            ));
        }

        let mut sgd = Self::new(
            spec.epochs,
            spec.batch_size,
            spec.learning_rate,
            spec.momentum,
        )
        .with_validation(spec.validation)?;

        sgd.rng = generate_rng(spec.seed);
        Ok(sgd)
    }
}

impl<L: LossFn> Sgd<L> {
    /// Holds out `fraction` of the samples on each `train` call to decide when to stop early.
    pub fn with_validation(mut self, fraction: f64) -> Result<Self> {
        if !(0. ..1.).contains(&fraction) {
            return Err(MlpErr::InvalidInput(
                "the validation fraction must be in [0, 1)",
            ));
        }

        self.validation = fraction;
        Ok(self)
    }

    /// Swaps the objective being minimized.
    pub fn with_loss_fn<M: LossFn>(self, loss_fn: M) -> Sgd<M> {
        Sgd {
            loss_fn,
            epochs: self.epochs,
            batch_size: self.batch_size,
            learning_rate: self.learning_rate,
            momentum: self.momentum,
            validation: self.validation,
            rng: self.rng,
        }
    }

    /// Trains `mlp` on `dataset` and flags it as trained.
    ///
    /// # Returns
    /// The loss of the last epoch: the mean batch loss over the training samples or, when
    /// validating, the loss over the held out samples. Fails without touching `mlp` when the
    /// trainer has no epochs to run.
    pub fn train(&mut self, mlp: &mut Mlp, dataset: &Dataset) -> Result<f64> {
        if !mlp.initialized() || mlp.is_empty() {
            return Err(MlpErr::NotInitialized);
        }

        if self.epochs == 0 {
            return Err(MlpErr::InvalidInput("at least one epoch is required"));
        }

        check_size("dataset inputs", dataset.x_size(), mlp.dims())?;
        check_size(
            "dataset outputs",
            dataset.y_size(),
            mlp.output_size(mlp.len() - 1),
        )?;

        let mut data = dataset.clone();
        data.shuffle(&mut self.rng);

        let (mut train, valid) = data.split(self.validation);
        if train.is_empty() {
            return Err(MlpErr::InvalidInput(
                "the validation split left no samples to train on",
            ));
        }

        let mut best = f64::INFINITY;
        let mut strikes = 0;
        let mut loss = f64::NAN;

        for epoch in 0..self.epochs {
            train.shuffle(&mut self.rng);
            loss = self.epoch(mlp, &train)?;

            if let Some(valid) = &valid {
                let y_pred = mlp.forward(valid.x())?;
                loss = self.loss_fn.loss(y_pred, valid.y())?;

                if loss < best {
                    best = loss;
                    strikes = 0;
                } else {
                    strikes += 1;
                }
            }

            debug!(epoch = epoch, loss = loss; "finished epoch");

            if strikes == PATIENCE {
                info!(epoch = epoch, best = best; "validation loss stopped improving");
                break;
            }
        }

        mlp.set_trained(true);
        info!(epochs = self.epochs, loss = loss; "training finished");

        Ok(loss)
    }

    fn epoch(&self, mlp: &mut Mlp, train: &Dataset) -> Result<f64> {
        let mut total = 0.;
        let mut num_batches = 0;

        for (x, y) in train.batches(self.batch_size) {
            let y_pred = mlp.forward(x.view())?;
            total += self.loss_fn.loss(y_pred, y.view())?;

            let d = self.loss_fn.loss_prime(y_pred, y.view())?;
            mlp.backward(d.view())?;
            mlp.update(self.learning_rate, self.momentum);
            num_batches += 1;
        }

        Ok(total / num_batches.max(1) as f64)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use ndarray::{Array2, ArrayView2, array};

    use super::*;
    use crate::ActFn;

    /// A flat objective that never improves, counting how often it is evaluated.
    struct Plateau<'a> {
        calls: &'a Cell<usize>,
    }

    impl LossFn for Plateau<'_> {
        fn loss(&self, _y_pred: ArrayView2<f64>, _y: ArrayView2<f64>) -> Result<f64> {
            self.calls.set(self.calls.get() + 1);
            Ok(1.)
        }

        fn loss_prime(
            &self,
            y_pred: ArrayView2<f64>,
            _y: ArrayView2<f64>,
        ) -> Result<Array2<f64>> {
            Ok(Array2::zeros(y_pred.raw_dim()))
        }
    }

    fn spec(validation: f64) -> TrainingSpec {
        TrainingSpec {
            epochs: 200,
            batch_size: NonZeroUsize::new(8).unwrap(),
            learning_rate: 0.05,
            momentum: 0.9,
            validation,
            seed: Some(3),
        }
    }

    fn line(n: usize) -> Dataset {
        let x = Array2::from_shape_fn((n, 1), |(i, _)| i as f64 / n as f64);
        let y = x.mapv(|x| 3. * x - 1.);
        Dataset::new(x, y).unwrap()
    }

    #[test]
    fn fits_a_line() {
        let mut mlp = Mlp::with_seed(9);
        mlp.init(1, 1, &[], ActFn::Identity, ActFn::Identity)
            .unwrap();

        let mut sgd = Sgd::from_spec(&spec(0.)).unwrap();
        let loss = sgd.train(&mut mlp, &line(32)).unwrap();

        assert!(loss < 1e-4, "loss: {loss}");
        assert!(mlp.trained());

        let params = mlp.params(0).unwrap();
        assert!((params.weights[[0, 0]] - 3.).abs() < 0.05);
        assert!((params.bias[0] + 1.).abs() < 0.05);
    }

    #[test]
    fn validation_loss_is_reported() {
        let mut mlp = Mlp::with_seed(9);
        mlp.init(1, 1, &[], ActFn::Identity, ActFn::Identity)
            .unwrap();

        let spec = TrainingSpec {
            learning_rate: 0.2,
            momentum: 0.,
            ..spec(0.25)
        };
        let mut sgd = Sgd::from_spec(&spec).unwrap();
        let loss = sgd.train(&mut mlp, &line(32)).unwrap();

        assert!(loss.is_finite());
        assert!(loss < 1e-2, "loss: {loss}");
    }

    #[test]
    fn stops_once_validation_stalls() {
        let mut mlp = Mlp::with_seed(9);
        mlp.init(1, 1, &[], ActFn::Identity, ActFn::Identity)
            .unwrap();

        let calls = Cell::new(0);
        let spec = TrainingSpec {
            epochs: 100,
            batch_size: NonZeroUsize::new(8).unwrap(),
            ..spec(0.25)
        };
        let mut sgd = Sgd::from_spec(&spec)
            .unwrap()
            .with_loss_fn(Plateau { calls: &calls });

        let loss = sgd.train(&mut mlp, &line(8)).unwrap();
        assert_eq!(loss, 1.);
        assert!(mlp.trained());

        // One training batch plus one validation pass per epoch: the first epoch sets the best
        // loss and the next `PATIENCE` ones fail to beat it.
        assert_eq!(calls.get(), 2 * (PATIENCE + 1));
    }

    #[test]
    fn no_epochs_leaves_the_network_untouched() {
        let spec = TrainingSpec {
            epochs: 0,
            ..spec(0.)
        };
        assert!(matches!(
            Sgd::from_spec(&spec),
            Err(MlpErr::InvalidInput(_))
        ));

        let mut mlp = Mlp::with_seed(9);
        mlp.init(1, 1, &[], ActFn::Identity, ActFn::Identity)
            .unwrap();
        let before = mlp.params(0).unwrap();

        let mut sgd = Sgd::new(0, NonZeroUsize::new(4).unwrap(), 0.1, 0.);
        let err = sgd.train(&mut mlp, &line(8)).unwrap_err();

        assert!(matches!(err, MlpErr::InvalidInput(_)));
        assert!(!mlp.trained());
        assert_eq!(mlp.params(0).unwrap(), before);
    }

    #[test]
    fn invalid_configuration() {
        assert!(matches!(
            Sgd::from_spec(&spec(1.)),
            Err(MlpErr::InvalidInput(_))
        ));

        let mut mlp = Mlp::with_seed(0);
        let mut sgd = Sgd::from_spec(&spec(0.)).unwrap();
        assert_eq!(
            sgd.train(&mut mlp, &line(4)).unwrap_err(),
            MlpErr::NotInitialized
        );

        mlp.init(2, 1, &[], ActFn::Identity, ActFn::Identity)
            .unwrap();
        let err = sgd.train(&mut mlp, &line(4)).unwrap_err();
        assert!(matches!(err, MlpErr::SizeMismatch { .. }));

        let tiny = Dataset::new(array![[0., 1.]], array![[1.]]).unwrap();
        let mut sgd = Sgd::from_spec(&spec(0.9)).unwrap();
        let err = sgd.train(&mut mlp, &tiny).unwrap_err();
        assert!(matches!(err, MlpErr::InvalidInput(_)));
    }
}
