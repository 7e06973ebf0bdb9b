// ============================================================================
// Structural Capabilities
// ============================================================================
//
// Provider command types publish a static table of named properties. The
// table is the runtime description of the type: callers that do not know the
// concrete type can still find a property by name, check its shape and set it
// through a value-erased setter.
//
// `CapabilityCache` resolves one property name per concrete type once and
// keeps the typed accessor it builds for every later command of that type.
//
// ============================================================================

pub mod cache;

use crate::command::DbCommand;
use crate::core::{DbError, Result, Value};
use std::any::{Any, TypeId};
use std::fmt;

pub use cache::{BoolAccessor, CapabilityCache};

/// Name of the provider property that switches parameter binding from
/// positional to by-name
pub const BIND_BY_NAME: &str = "BindByName";

/// Value-erased setter: downcasts the target and applies the value
pub type ReflectSetter = fn(&mut dyn Any, Value) -> Result<()>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyType {
    Boolean,
    Integer,
    Text,
    Other(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Internal,
    Private,
}

/// Description of one named property of a provider type
#[derive(Clone, Copy)]
pub struct PropertyInfo {
    pub name: &'static str,
    pub value_type: PropertyType,
    pub visibility: Visibility,
    pub is_static: bool,
    /// Number of indexer arguments; plain properties have none
    pub index_parameters: usize,
    pub setter: Option<ReflectSetter>,
}

impl PropertyInfo {
    /// A public, instance-level, non-indexed property
    pub const fn public(name: &'static str, value_type: PropertyType) -> Self {
        Self {
            name,
            value_type,
            visibility: Visibility::Public,
            is_static: false,
            index_parameters: 0,
            setter: None,
        }
    }

    pub const fn with_setter(mut self, setter: ReflectSetter) -> Self {
        self.setter = Some(setter);
        self
    }

    pub const fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub const fn with_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub const fn with_index_parameters(mut self, count: usize) -> Self {
        self.index_parameters = count;
        self
    }

    pub fn can_write(&self) -> bool {
        self.setter.is_some()
    }

    /// Set the property on `target` through the value-erased setter
    pub fn set_value(&self, target: &mut dyn Any, value: Value) -> Result<()> {
        match self.setter {
            Some(setter) => setter(target, value),
            None => Err(DbError::UnsupportedOperation(format!(
                "Property '{}' is read-only",
                self.name
            ))),
        }
    }
}

impl fmt::Debug for PropertyInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyInfo")
            .field("name", &self.name)
            .field("value_type", &self.value_type)
            .field("visibility", &self.visibility)
            .field("is_static", &self.is_static)
            .field("index_parameters", &self.index_parameters)
            .field("can_write", &self.can_write())
            .finish()
    }
}

/// Runtime identity and property table of a concrete command type
#[derive(Debug, Clone, Copy)]
pub struct RuntimeType {
    pub id: TypeId,
    pub name: &'static str,
    pub properties: &'static [PropertyInfo],
}

impl RuntimeType {
    pub fn of(command: &dyn DbCommand) -> Self {
        Self {
            id: command.as_any().type_id(),
            name: command.type_name(),
            properties: command.properties(),
        }
    }

    /// Public instance property with the given name
    pub fn property(&self, name: &str) -> Option<&'static PropertyInfo> {
        self.properties
            .iter()
            .find(|p| p.name == name && p.visibility == Visibility::Public && !p.is_static)
    }
}

/// Downcast helper for `ReflectSetter` implementations.
///
/// ```ignore
/// fn set_bind_by_name(target: &mut dyn Any, value: Value) -> Result<()> {
///     let (cmd, flag) = downcast_bool::<OracleCommand>(target, value, "BindByName")?;
///     cmd.bind_by_name = flag;
///     Ok(())
/// }
/// ```
pub fn downcast_bool<'a, T: Any>(
    target: &'a mut dyn Any,
    value: Value,
    property: &str,
) -> Result<(&'a mut T, bool)> {
    let flag = value.as_bool().ok_or_else(|| {
        DbError::TypeMismatch(format!(
            "Property '{}' expects BOOLEAN, got {}",
            property,
            value.type_name()
        ))
    })?;
    let target = target.downcast_mut::<T>().ok_or_else(|| {
        DbError::TypeMismatch(format!(
            "Property '{}' is not defined on the target type",
            property
        ))
    })?;
    Ok((target, flag))
}
