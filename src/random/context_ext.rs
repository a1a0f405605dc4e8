use std::any::TypeId;
use std::cell::RefMut;

use log::trace;

use crate::context::Context;
use crate::hashing::hash_str;
use crate::rand::distr::uniform::{SampleRange, SampleUniform};
use crate::rand::distr::Distribution;
use crate::rand::{Rng, SeedableRng};
use crate::random::{RngHolder, RngId, RngPlugin};

/// Gets a mutable reference to the stream associated with the given [`RngId`], creating it
/// from the base seed on first use.
fn get_rng<R: RngId + 'static>(context: &Context) -> RefMut<'_, R::RngType> {
    let data_container = context
        .get_data_container(RngPlugin)
        .expect("You must initialize the random number generator with a base seed");
    let base_seed = data_container
        .base_seed
        .expect("You must initialize the random number generator with a base seed");

    let rng_holders = data_container
        .rng_holders
        .try_borrow_mut()
        .expect("A random stream is already borrowed");
    RefMut::map(rng_holders, |holders| {
        holders
            .entry(TypeId::of::<R>())
            .or_insert_with(|| {
                trace!("creating new RNG {} (seed={base_seed})", R::get_name());
                let seed_offset = hash_str(R::get_name());
                RngHolder {
                    rng: Box::new(R::RngType::seed_from_u64(
                        base_seed.wrapping_add(seed_offset),
                    )),
                }
            })
            .rng
            .downcast_mut::<R::RngType>()
            .expect("Stream registered with a different generator type")
    })
}

/// Random number generation on `Context`. Every draw names the stream it comes from, so
/// adding draws to one module never perturbs the sequence seen by another.
pub trait ContextRandomExt {
    /// Sets the base seed and discards any existing streams so they are re-seeded on next use.
    fn init_random(&mut self, base_seed: u64);

    /// Applies `sampler` to the stream for `R`.
    ///
    /// # Panics
    ///
    /// Panics if `init_random` has not been called, or if `sampler` itself draws from a
    /// stream (streams are lent out one at a time).
    fn sample<R: RngId + 'static, T>(
        &self,
        rng_id: R,
        sampler: impl FnOnce(&mut R::RngType) -> T,
    ) -> T;

    /// Draws one value from `distribution` using the stream for `R`.
    fn sample_distr<R: RngId + 'static, T>(&self, rng_id: R, distribution: impl Distribution<T>) -> T
    where
        R::RngType: Rng,
    {
        self.sample(rng_id, |rng| distribution.sample(rng))
    }

    /// Draws uniformly from `range` using the stream for `R`.
    fn sample_range<R: RngId + 'static, S, T>(&self, rng_id: R, range: S) -> T
    where
        R::RngType: Rng,
        S: SampleRange<T>,
        T: SampleUniform,
    {
        self.sample(rng_id, |rng| rng.random_range(range))
    }

    /// Returns true with probability `p`, which is clamped to [0, 1].
    fn sample_bool<R: RngId + 'static>(&self, rng_id: R, p: f64) -> bool
    where
        R::RngType: Rng,
    {
        self.sample(rng_id, |rng| rng.random_bool(p.clamp(0.0, 1.0)))
    }
}

impl ContextRandomExt for Context {
    fn init_random(&mut self, base_seed: u64) {
        trace!("initializing random module");
        let data_container = self.get_data_container_mut(RngPlugin);
        data_container.base_seed = Some(base_seed);
        data_container.rng_holders.get_mut().clear();
    }

    fn sample<R: RngId + 'static, T>(
        &self,
        _rng_id: R,
        sampler: impl FnOnce(&mut R::RngType) -> T,
    ) -> T {
        let mut rng = get_rng::<R>(self);
        sampler(&mut rng)
    }
}
