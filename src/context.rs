//! The central simulation object.
//!
//! `Context` owns the simulated clock (in days), the plan queue of future
//! events, and a type-keyed store of module data ("data plugins"). Every other module of the crate is expressed as
//! data plugins plus a `Context*Ext` trait that operates on them.
use std::any::{Any, TypeId};

use log::trace;

use crate::plan::{ExecutionPhase, PlanQueue};
use crate::HashMap;

/// A trait for types that can provide a data container held by `Context`.
pub trait DataPlugin: Any {
    type DataContainer: 'static;

    fn create_data_container() -> Self::DataContainer;
}

/// Defines a new type for storing data in `Context`.
///
/// The container is created lazily, from `$default`, the first time it is
/// requested mutably.
#[macro_export]
macro_rules! define_data_plugin {
    ($plugin:ident, $data_container:ty, $default:expr) => {
        #[derive(Copy, Clone)]
        struct $plugin;

        impl $crate::context::DataPlugin for $plugin {
            type DataContainer = $data_container;

            fn create_data_container() -> Self::DataContainer {
                $default
            }
        }
    };
}
pub use define_data_plugin;

type Callback = dyn FnOnce(&mut Context);

pub struct Context {
    plan_queue: PlanQueue<Box<Callback>>,
    data_plugins: HashMap<TypeId, Box<dyn Any>>,
    current_time: f64,
    shutdown_requested: bool,
}

impl Context {
    #[must_use]
    pub fn new() -> Context {
        Context {
            plan_queue: PlanQueue::new(),
            data_plugins: HashMap::default(),
            current_time: 0.0,
            shutdown_requested: false,
        }
    }

    /// Schedules `callback` to run at `time` in the `Normal` phase.
    ///
    /// # Panics
    ///
    /// Panics if `time` is NaN, infinite, or earlier than the current time.
    pub fn add_plan(&mut self, time: f64, callback: impl FnOnce(&mut Context) + 'static) {
        self.add_plan_with_phase(time, callback, ExecutionPhase::Normal)
    }

    /// Schedules `callback` to run at `time` in the given phase.
    ///
    /// # Panics
    ///
    /// Panics if `time` is NaN, infinite, or earlier than the current time.
    pub fn add_plan_with_phase(
        &mut self,
        time: f64,
        callback: impl FnOnce(&mut Context) + 'static,
        phase: ExecutionPhase,
    ) {
        assert!(
            !time.is_nan() && !time.is_infinite() && time >= self.current_time,
            "Time {time} is invalid"
        );
        self.plan_queue.add_plan(time, Box::new(callback), phase)
    }

    /// Stops `execute` once the currently running callback returns. Remaining
    /// plans are discarded.
    pub fn shutdown(&mut self) {
        trace!("shutdown requested at t={}", self.current_time);
        self.shutdown_requested = true;
    }

    pub fn get_data_container_mut<T: DataPlugin>(&mut self, _plugin: T) -> &mut T::DataContainer {
        self.data_plugins
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(T::create_data_container()))
            .downcast_mut::<T::DataContainer>()
            .expect("Data plugin has an unexpected container type")
    }

    pub fn get_data_container<T: DataPlugin>(&self, _plugin: T) -> Option<&T::DataContainer> {
        self.data_plugins
            .get(&TypeId::of::<T>())
            .and_then(|container| container.downcast_ref::<T::DataContainer>())
    }

    /// Lends `f` a mutable borrow of one plugin's container together with a
    /// shared borrow of the rest of the context (other plugins, RNG streams).
    ///
    /// The container is detached for the duration of the call, so `f` must
    /// not look up the same plugin through the context it is given.
    pub fn with_data_mut<T: DataPlugin, R>(
        &mut self,
        plugin: T,
        f: impl FnOnce(&mut T::DataContainer, &Context) -> R,
    ) -> R {
        self.get_data_container_mut(plugin);
        let type_id = TypeId::of::<T>();
        let mut boxed = self
            .data_plugins
            .remove(&type_id)
            .expect("Data plugin was just created");
        let container = boxed
            .downcast_mut::<T::DataContainer>()
            .expect("Data plugin has an unexpected container type");
        let result = f(container, self);
        self.data_plugins.insert(type_id, boxed);
        result
    }

    #[must_use]
    pub fn get_current_time(&self) -> f64 {
        self.current_time
    }

    /// Whole simulated days elapsed since t=0.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn get_current_day(&self) -> i64 {
        self.current_time.floor() as i64
    }

    /// Runs timed plans until the queue is empty or `shutdown` is called.
    pub fn execute(&mut self) {
        loop {
            if self.shutdown_requested {
                self.plan_queue.clear();
                break;
            }

            if let Some(plan) = self.plan_queue.get_next_plan() {
                self.current_time = plan.time;
                (plan.data)(self);
            } else {
                break;
            }
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    define_data_plugin!(ComponentA, Vec<u32>, vec![]);
    define_data_plugin!(ComponentB, u32, 7);

    fn add_plan(context: &mut Context, time: f64, value: u32) {
        context.add_plan(time, move |context| {
            context.get_data_container_mut(ComponentA).push(value);
        });
    }

    #[test]
    #[should_panic(expected = "Time -1 is invalid")]
    fn negative_plan_time() {
        let mut context = Context::new();
        add_plan(&mut context, -1.0, 0);
    }

    #[test]
    #[should_panic(expected = "is invalid")]
    fn nan_plan_time() {
        let mut context = Context::new();
        add_plan(&mut context, f64::NAN, 0);
    }

    #[test]
    fn empty_context() {
        let mut context = Context::new();
        context.execute();
        assert_eq!(context.get_current_time(), 0.0);
        assert!(context.get_data_container(ComponentA).is_none());
    }

    #[test]
    fn timed_plan_advances_clock() {
        let mut context = Context::new();
        add_plan(&mut context, 1.5, 1);
        context.execute();
        assert_eq!(context.get_current_time(), 1.5);
        assert_eq!(context.get_current_day(), 1);
        assert_eq!(*context.get_data_container_mut(ComponentA), vec![1]);
    }

    #[test]
    fn plans_added_while_running_are_executed() {
        let mut context = Context::new();
        context.add_plan(1.0, |context| add_plan(context, 1.0, 2));
        add_plan(&mut context, 1.0, 1);
        context.execute();
        assert_eq!(*context.get_data_container_mut(ComponentA), vec![1, 2]);
    }

    #[test]
    fn phases_order_plans_at_same_time() {
        let mut context = Context::new();
        context.add_plan_with_phase(
            1.0,
            |context| context.get_data_container_mut(ComponentA).push(3),
            ExecutionPhase::Last,
        );
        add_plan(&mut context, 1.0, 2);
        context.add_plan_with_phase(
            1.0,
            |context| context.get_data_container_mut(ComponentA).push(1),
            ExecutionPhase::First,
        );
        context.execute();
        assert_eq!(*context.get_data_container_mut(ComponentA), vec![1, 2, 3]);
    }

    #[test]
    fn shutdown_discards_remaining_plans() {
        let mut context = Context::new();
        add_plan(&mut context, 1.0, 1);
        context.add_plan(2.0, Context::shutdown);
        add_plan(&mut context, 3.0, 3);
        context.execute();
        assert_eq!(context.get_current_time(), 2.0);
        assert_eq!(*context.get_data_container_mut(ComponentA), vec![1]);
    }

    #[test]
    fn with_data_mut_sees_other_plugins() {
        let mut context = Context::new();
        context.get_data_container_mut(ComponentB);
        let seen = context.with_data_mut(ComponentA, |values, context| {
            let b = *context.get_data_container(ComponentB).unwrap();
            values.push(b);
            // The borrowed plugin is detached while the closure runs.
            context.get_data_container(ComponentA).is_none()
        });
        assert!(seen);
        assert_eq!(*context.get_data_container_mut(ComponentA), vec![7]);
    }
}
