mod model;
mod training;

pub use model::{MlpSpec, Topology};
pub use training::TrainingSpec;

use rand::{SeedableRng, rngs::StdRng};

/// Seeds a generator from `seed`, or from the OS when there is none.
pub(crate) fn generate_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}
