//! Run-wide configuration values stored on `Context`.
//!
//! A global property is declared with [`define_global_property!`], which names
//! a key type, the type of its value and an optional validation function.
//! Values are either set directly or loaded from a JSON file whose top-level
//! object maps property names (`"<crate>.<Property>"`) to values:
//!
//! ```json
//! { "tracesim.Params": { "population": 1000, "max_days": 60 } }
//! ```
//!
//! Only properties registered with `register_global_property` can be loaded
//! from a file; an unknown key is an error. Values are validated when they are
//! stored, never when they are read.

use std::any::{Any, TypeId};
use std::fs;
use std::path::Path;

use log::{info, trace};
use serde::de::DeserializeOwned;

use crate::context::Context;
use crate::define_data_plugin;
use crate::error::SimError;
use crate::HashMap;

/// Defines a global property with the following parameters:
/// * `$global_property`: Name for the identifier type of the global property
/// * `$value`: The type of the property's value
/// * `$validate`: A function (or closure) that checks the validity of the property (optional)
#[macro_export]
macro_rules! define_global_property {
    ($global_property:ident, $value:ty, $validate:expr) => {
        #[derive(Copy, Clone)]
        pub struct $global_property;

        impl $crate::global_properties::GlobalProperty for $global_property {
            type Value = $value;

            fn name() -> &'static str {
                concat!(env!("CARGO_PKG_NAME"), ".", stringify!($global_property))
            }

            fn validate(value: &$value) -> Result<(), $crate::error::SimError> {
                $validate(value)
            }
        }
    };

    ($global_property:ident, $value:ty) => {
        $crate::define_global_property!($global_property, $value, |_| { Ok(()) });
    };
}
pub use define_global_property;

pub trait GlobalProperty: Any + Copy {
    type Value: Any + DeserializeOwned;

    fn name() -> &'static str;

    /// # Errors
    ///
    /// Returns an error describing why `value` cannot be used.
    fn validate(value: &Self::Value) -> Result<(), SimError>;
}

type PropertyLoader = fn(&mut GlobalPropertiesData, serde_json::Value) -> Result<(), SimError>;

struct GlobalPropertiesData {
    values: HashMap<TypeId, Box<dyn Any>>,
    loaders: HashMap<&'static str, PropertyLoader>,
}

define_data_plugin!(
    GlobalPropertiesPlugin,
    GlobalPropertiesData,
    GlobalPropertiesData {
        values: HashMap::default(),
        loaders: HashMap::default(),
    }
);

impl GlobalPropertiesData {
    fn set<T: GlobalProperty>(&mut self, value: T::Value) -> Result<(), SimError> {
        T::validate(&value)?;
        trace!("setting global property {}", T::name());
        self.values.insert(TypeId::of::<T>(), Box::new(value));
        Ok(())
    }

    fn load<T: GlobalProperty>(&mut self, raw: serde_json::Value) -> Result<(), SimError> {
        let value: T::Value = serde_json::from_value(raw)?;
        self.set::<T>(value)
    }
}

pub trait ContextGlobalPropertiesExt {
    /// Validates and stores `value`, replacing any earlier value.
    ///
    /// # Errors
    ///
    /// Returns the property's validation error.
    fn set_global_property_value<T: GlobalProperty>(
        &mut self,
        property: T,
        value: T::Value,
    ) -> Result<(), SimError>;

    fn get_global_property_value<T: GlobalProperty>(&self, property: T) -> Option<&T::Value>;

    /// Allows `T` to be loaded by [`ContextGlobalPropertiesExt::load_global_properties`].
    fn register_global_property<T: GlobalProperty>(&mut self, property: T);

    /// Loads every property in the JSON object stored at `file_path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, names an
    /// unregistered property, or holds a value that fails validation.
    fn load_global_properties(&mut self, file_path: &Path) -> Result<(), SimError>;
}

impl ContextGlobalPropertiesExt for Context {
    fn set_global_property_value<T: GlobalProperty>(
        &mut self,
        _property: T,
        value: T::Value,
    ) -> Result<(), SimError> {
        self.get_data_container_mut(GlobalPropertiesPlugin).set::<T>(value)
    }

    fn get_global_property_value<T: GlobalProperty>(&self, _property: T) -> Option<&T::Value> {
        self.get_data_container(GlobalPropertiesPlugin)?
            .values
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T::Value>())
    }

    fn register_global_property<T: GlobalProperty>(&mut self, _property: T) {
        self.get_data_container_mut(GlobalPropertiesPlugin)
            .loaders
            .insert(T::name(), GlobalPropertiesData::load::<T>);
    }

    fn load_global_properties(&mut self, file_path: &Path) -> Result<(), SimError> {
        info!("loading global properties from {}", file_path.display());
        let contents = fs::read_to_string(file_path)?;
        let properties: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&contents)?;
        let data = self.get_data_container_mut(GlobalPropertiesPlugin);
        for (name, raw) in properties {
            let loader = *data
                .loaders
                .get(name.as_str())
                .ok_or_else(|| SimError::SimError(format!("No global property: {name}")))?;
            loader(data, raw)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_derive::Deserialize;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[derive(Debug, Clone, PartialEq, Deserialize)]
    pub struct Window {
        days: u32,
    }

    define_global_property!(WindowProperty, Window, |value: &Window| {
        if value.days == 0 {
            Err(SimError::InvalidParameter("days must be positive".to_string()))
        } else {
            Ok(())
        }
    });
    define_global_property!(LabelProperty, String);

    fn write_json(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn set_and_get() {
        let mut context = Context::new();
        assert!(context.get_global_property_value(LabelProperty).is_none());
        context
            .set_global_property_value(LabelProperty, "baseline".to_string())
            .unwrap();
        assert_eq!(
            context.get_global_property_value(LabelProperty).map(String::as_str),
            Some("baseline")
        );
    }

    #[test]
    fn validation_runs_on_set() {
        let mut context = Context::new();
        let result = context.set_global_property_value(WindowProperty, Window { days: 0 });
        assert!(matches!(result, Err(SimError::InvalidParameter(_))));
        assert!(context.get_global_property_value(WindowProperty).is_none());
    }

    #[test]
    fn property_names_include_crate() {
        assert_eq!(WindowProperty::name(), "tracesim.WindowProperty");
    }

    #[test]
    fn load_from_file() {
        let file = write_json(r#"{"tracesim.WindowProperty": {"days": 14}, "tracesim.LabelProperty": "gaen"}"#);
        let mut context = Context::new();
        context.register_global_property(WindowProperty);
        context.register_global_property(LabelProperty);
        context.load_global_properties(file.path()).unwrap();
        assert_eq!(
            context.get_global_property_value(WindowProperty),
            Some(&Window { days: 14 })
        );
        assert_eq!(
            context.get_global_property_value(LabelProperty).map(String::as_str),
            Some("gaen")
        );
    }

    #[test]
    fn load_rejects_unknown_and_invalid() {
        let mut context = Context::new();
        context.register_global_property(WindowProperty);

        let unknown = write_json(r#"{"tracesim.Missing": 3}"#);
        let error = context.load_global_properties(unknown.path()).unwrap_err();
        assert_eq!(error.to_string(), "Error: SimError(\"No global property: tracesim.Missing\")");

        let invalid = write_json(r#"{"tracesim.WindowProperty": {"days": 0}}"#);
        assert!(matches!(
            context.load_global_properties(invalid.path()),
            Err(SimError::InvalidParameter(_))
        ));

        let malformed = write_json("{not json");
        assert!(matches!(
            context.load_global_properties(malformed.path()),
            Err(SimError::JsonError(_))
        ));
    }
}
