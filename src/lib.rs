//! Disease progression and budgeted contact-tracing message exchange for
//! agent-based epidemic models.
//!
//! The crate has two halves that meet in a discrete-event simulation:
//!
//! * [`disease`] turns an individual's risk factors and a random seed into a
//!   viral load curve, an infectiousness profile and a day-by-day set of
//!   symptoms, alongside the colds, flus and allergies that mimic them.
//! * [`contact_book`], [`risk`], [`mailbox`] and [`dispatch`] implement the
//!   tracing app: individuals re-estimate their risk, propose update messages
//!   to past contacts, and a [`dispatch::MessageDispatcher`] admits senders
//!   under a fixed daily message budget.
//!
//! Everything else is the simulation shell. The central object is the
//! [`context::Context`], which keeps the clock, the plan queue and a
//! type-keyed store of module data. Each module keeps its state in a data
//! plugin and exposes a `Context*Ext` trait:
//! * [`population`] holds the individuals in a flat arena indexed by
//!   [`population::PersonId`].
//! * [`encounters`] is a minimal random-mixing contact process that records
//!   encounters and transmits infection.
//! * [`tracing_manager`] runs the tracing slots and the daily bookkeeping.
//! * [`parameters`], [`global_properties`], [`report`], [`log`] and
//!   [`runner`] handle configuration, output and the command line.
pub mod contact_book;
pub mod context;
pub mod disease;
pub mod dispatch;
pub mod distributions;
pub mod encounters;
pub mod error;
pub mod execution_stats;
pub mod global_properties;
pub mod hashing;
pub mod log;
pub mod mailbox;
pub mod parameters;
pub mod plan;
pub mod population;
pub mod random;
pub mod report;
pub mod risk;
pub mod runner;
pub mod tracing_manager;

// Re-exports for use in macros
pub use paste;
pub use rand;

pub use hashing::{HashMap, HashSet};
