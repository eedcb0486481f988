//! Per-session question order.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::model::Question;

/// Produces randomized question orders from an explicit random source.
///
/// A seeded shuffler replays the same sequence of orders, which is what tests rely on;
/// an entropy-backed one gives every permutation equal probability.
#[derive(Debug, Clone)]
pub struct Shuffler {
    rng: StdRng,
}

impl Shuffler {
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Seeded from the thread-local generator.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_rng(&mut rand::rng()),
        }
    }

    /// Next order drawn from this shuffler's source.
    #[must_use]
    pub fn next_order(&mut self, questions: &[Question]) -> Vec<Question> {
        Self::shuffle(questions, &mut self.rng)
    }

    /// Fisher-Yates permutation of `questions`; the input is left untouched.
    #[must_use]
    pub fn shuffle<R: Rng + ?Sized>(questions: &[Question], rng: &mut R) -> Vec<Question> {
        let mut order = questions.to_vec();
        order.as_mut_slice().shuffle(rng);
        order
    }
}

impl Default for Shuffler {
    fn default() -> Self {
        Self::from_entropy()
    }
}
