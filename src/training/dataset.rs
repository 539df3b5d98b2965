use std::num::NonZeroUsize;

use ndarray::{Array2, ArrayView2, Axis};
use rand::{Rng, seq::SliceRandom};

use crate::{MlpErr, Result, error::check_size};

/// An in-memory supervised dataset: row `i` of `x` is the input for row `i` of `y`.
///
/// Batches follow a shuffleable order over the rows.
#[derive(Clone, Debug)]
pub struct Dataset {
    x: Array2<f64>,
    y: Array2<f64>,
    order: Vec<usize>,
}

impl Dataset {
    /// Creates a new `Dataset`.
    ///
    /// # Arguments
    /// * `x` - The `(samples, inputs)` input matrix.
    /// * `y` - The `(samples, outputs)` target matrix.
    ///
    /// # Returns
    /// An error if the amount of rows differ or there are none.
    pub fn new(x: Array2<f64>, y: Array2<f64>) -> Result<Self> {
        check_size("target rows", y.nrows(), x.nrows())?;

        if x.nrows() == 0 {
            return Err(MlpErr::InvalidInput("the dataset has no samples"));
        }

        Ok(Self {
            order: (0..x.nrows()).collect(),
            x,
            y,
        })
    }

    pub fn len(&self) -> usize {
        self.x.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.x.nrows() == 0
    }

    pub fn x_size(&self) -> usize {
        self.x.ncols()
    }

    pub fn y_size(&self) -> usize {
        self.y.ncols()
    }

    /// All the inputs, in storage order.
    pub fn x(&self) -> ArrayView2<'_, f64> {
        self.x.view()
    }

    /// All the targets, in storage order.
    pub fn y(&self) -> ArrayView2<'_, f64> {
        self.y.view()
    }

    /// Shuffles the order in which `batches` yields the samples.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.order.shuffle(rng);
    }

    /// Iterates the samples in the current order, `batch_size` rows at a time. The last batch
    /// may be smaller.
    pub fn batches(
        &self,
        batch_size: NonZeroUsize,
    ) -> impl Iterator<Item = (Array2<f64>, Array2<f64>)> + '_ {
        self.order.chunks(batch_size.get()).map(|rows| {
            let x = self.x.select(Axis(0), rows);
            let y = self.y.select(Axis(0), rows);
            (x, y)
        })
    }

    /// Splits off the last `fraction` of the samples, in the current order.
    ///
    /// # Returns
    /// The remaining samples and, unless it would be empty, the split off part.
    pub fn split(&self, fraction: f64) -> (Dataset, Option<Dataset>) {
        let tail = ((self.len() as f64 * fraction).round() as usize).min(self.len());
        let (head_rows, tail_rows) = self.order.split_at(self.len() - tail);

        let part = |rows: &[usize]| Dataset {
            x: self.x.select(Axis(0), rows),
            y: self.y.select(Axis(0), rows),
            order: (0..rows.len()).collect(),
        };

        let rest = (!tail_rows.is_empty()).then(|| part(tail_rows));
        (part(head_rows), rest)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn counting(n: usize) -> Dataset {
        let x = Array2::from_shape_fn((n, 1), |(i, _)| i as f64);
        let y = Array2::from_shape_fn((n, 1), |(i, _)| i as f64 + 100.);
        Dataset::new(x, y).unwrap()
    }

    #[test]
    fn rows_must_match() {
        let err = Dataset::new(array![[1.], [2.]], array![[1.]]).unwrap_err();
        assert!(matches!(err, MlpErr::SizeMismatch { .. }));

        let err = Dataset::new(Array2::zeros((0, 2)), Array2::zeros((0, 1))).unwrap_err();
        assert!(matches!(err, MlpErr::InvalidInput(_)));
    }

    #[test]
    fn batches_cover_every_sample_once() {
        let mut dataset = counting(7);
        dataset.shuffle(&mut StdRng::seed_from_u64(5));

        let batches: Vec<_> = dataset.batches(NonZeroUsize::new(3).unwrap()).collect();
        assert_eq!(
            batches.iter().map(|(x, _)| x.nrows()).collect::<Vec<_>>(),
            [3, 3, 1]
        );

        let mut seen: Vec<_> = batches
            .iter()
            .flat_map(|(x, y)| {
                x.iter()
                    .zip(y.iter())
                    .map(|(&x, &y)| {
                        assert_eq!(y, x + 100.);
                        x as usize
                    })
                    .collect::<Vec<_>>()
            })
            .collect();
        seen.sort();
        assert_eq!(seen, (0..7).collect::<Vec<_>>());
    }

    #[test]
    fn split() {
        let dataset = counting(10);

        let (train, valid) = dataset.split(0.2);
        assert_eq!(train.len(), 8);
        assert_eq!(valid.unwrap().x(), array![[8.], [9.]]);

        let (train, valid) = dataset.split(0.);
        assert_eq!(train.len(), 10);
        assert!(valid.is_none());
    }
}
