use ndarray::{ArrayBase, Data, DataMut, Dimension};
use serde::{Deserialize, Serialize};

use super::{identity, relu, sigmoid, tanh};
use crate::{MlpErr, Result};

type Pair = (fn(f64) -> f64, fn(f64) -> f64);

/// Forward function and derivative for each activation, indexed by id.
///
/// Every derivative is expressed in terms of the activation's own output.
const TABLE: [Pair; 4] = [
    (identity::f, identity::df),
    (sigmoid::f, sigmoid::df),
    (relu::f, relu::df),
    (tanh::f, tanh::df),
];

/// An element-wise nonlinearity, identified by a small stable integer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActFn {
    #[default]
    Identity = 0,
    Sigmoid = 1,
    Relu = 2,
    Tanh = 3,
}
use ActFn::*;

impl ActFn {
    /// Returns the raw id of this activation.
    pub fn id(self) -> usize {
        self as usize
    }

    /// Evaluates the nonlinearity at `z`.
    pub fn f(self, z: f64) -> f64 {
        (TABLE[self.id()].0)(z)
    }

    /// Evaluates the derivative given the already computed output `y = f(z)`.
    pub fn df(self, y: f64) -> f64 {
        (TABLE[self.id()].1)(y)
    }

    /// Replaces every pre-activation in `z` with its activation.
    pub fn apply<S, D>(self, z: &mut ArrayBase<S, D>)
    where
        S: DataMut<Elem = f64>,
        D: Dimension,
    {
        if self == Identity {
            return;
        }

        let f = TABLE[self.id()].0;
        z.mapv_inplace(f);
    }

    /// Multiplies every element of `d` by the derivative at the matching output in `y`.
    ///
    /// # Arguments
    /// * `d` - The gradient with respect to the activation's output.
    /// * `y` - The activation's output, same shape as `d`.
    pub fn chain<S, T, D>(self, d: &mut ArrayBase<S, D>, y: &ArrayBase<T, D>)
    where
        S: DataMut<Elem = f64>,
        T: Data<Elem = f64>,
        D: Dimension,
    {
        if self == Identity {
            return;
        }

        let df = TABLE[self.id()].1;
        d.zip_mut_with(y, |d, &y| *d *= df(y));
    }
}

impl TryFrom<usize> for ActFn {
    type Error = MlpErr;

    fn try_from(id: usize) -> Result<Self> {
        let act_fn = match id {
            0 => Identity,
            1 => Sigmoid,
            2 => Relu,
            3 => Tanh,
            _ => return Err(MlpErr::UnknownActivation(id)),
        };

        Ok(act_fn)
    }
}

impl From<ActFn> for usize {
    fn from(act_fn: ActFn) -> Self {
        act_fn.id()
    }
}
