mod context_ext;
mod macros;

use std::any::{Any, TypeId};
use std::cell::RefCell;

pub use context_ext::ContextRandomExt;
pub use macros::define_rng;

use crate::define_data_plugin;
use crate::rand::SeedableRng;
use crate::HashMap;

pub trait RngId: Copy + Clone {
    type RngType: SeedableRng;
    fn get_name() -> &'static str;
}

// Type-erased so that streams of different generator types can share one map.
struct RngHolder {
    rng: Box<dyn Any>,
}

struct RngData {
    base_seed: Option<u64>,
    rng_holders: RefCell<HashMap<TypeId, RngHolder>>,
}

// Registers a data container which stores:
// * base_seed: the seed every stream is derived from, unset until `init_random`
// * rng_holders: the lazily created streams, keyed by their RngId. Held in a
//   RefCell so streams can be drawn from with only a shared borrow of the
//   Context.
define_data_plugin!(
    RngPlugin,
    RngData,
    RngData {
        base_seed: None,
        rng_holders: RefCell::new(HashMap::default()),
    }
);
