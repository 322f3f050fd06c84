//! The name binding table expressions are evaluated against.
//!
//! An [`Environment`] maps identifiers to constants, native functions, or the
//! session's output history. It is assembled once through an
//! [`EnvironmentBuilder`] and is immutable afterwards; the only state that
//! changes over a session's lifetime is the contents of the history list the
//! `Out` binding refers to.

use std::rc::Rc;

use heapless::FnvIndexMap;

use crate::builtins::register_builtins;
use crate::constants;
use crate::error::{ExprError, Result};
use crate::functions::register_math_functions;
use crate::session::OutputHistory;
use crate::types::{CallArgs, NativeFunction, Signature};
use crate::value::Value;

/// Longest identifier that can be bound, in bytes.
pub const MAX_BINDING_NAME_LEN: usize = 32;

/// Capacity of the binding table. Must be a power of two.
pub const MAX_BINDINGS: usize = 64;

/// Fixed-capacity identifier used as a binding key.
pub type BindingName = heapless::String<MAX_BINDING_NAME_LEN>;

type BindingMap = FnvIndexMap<BindingName, Binding, MAX_BINDINGS>;

/// Conversion of string slices into binding keys.
pub trait TryIntoBindingName {
    fn try_into_binding_name(&self) -> Result<BindingName>;
}

impl TryIntoBindingName for str {
    fn try_into_binding_name(&self) -> Result<BindingName> {
        BindingName::try_from(self).map_err(|_| ExprError::NameTooLong(self.to_string()))
    }
}

/// What a name in the environment refers to.
#[derive(Debug, Clone)]
pub enum Binding {
    /// An immutable value such as `pi` or `True`.
    Constant(Value),
    /// A callable implemented in Rust.
    Function(Rc<NativeFunction>),
    /// The session's output history, shared by identity.
    History(OutputHistory),
}

impl Binding {
    /// The value an identifier bound to this evaluates to.
    pub fn value(&self) -> Value {
        match self {
            Binding::Constant(value) => value.clone(),
            Binding::Function(function) => Value::Function(Rc::clone(function)),
            Binding::History(history) => history.as_value(),
        }
    }
}

/// An immutable mapping from identifier to [`Binding`].
///
/// # Examples
///
/// ```
/// use calclark::context::Environment;
/// use calclark::engine::interp;
///
/// let env = Environment::standard().unwrap();
/// assert!(env.contains("sin"));
/// assert!(env.contains("pi"));
/// assert_eq!(interp("max(1, 2.5)", &env).unwrap().to_string(), "2.5");
/// ```
#[derive(Debug, Clone)]
pub struct Environment {
    bindings: BindingMap,
}

impl Environment {
    pub fn builder() -> EnvironmentBuilder {
        EnvironmentBuilder::new()
    }

    /// Language builtins, `pi` and the math library, without an output history.
    pub fn standard() -> Result<Self> {
        let mut builder = EnvironmentBuilder::new();
        builder
            .with_universe()?
            .register_constant("pi", constants::PI)?
            .with_math_library()?;
        Ok(builder.build())
    }

    /// Looks up the binding for `name`.
    pub fn get(&self, name: &str) -> Option<&Binding> {
        let key = name.try_into_binding_name().ok()?;
        self.bindings.get(&key)
    }

    /// Resolves `name` to the value an identifier expression produces.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        self.get(name).map(Binding::value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Bound names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(|name| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Assembles an [`Environment`], rejecting duplicate names.
///
/// ```
/// use calclark::context::EnvironmentBuilder;
/// use calclark::engine::interp;
/// use calclark::types::{Param, Signature};
/// use calclark::value::Value;
///
/// const X: &[Param] = &[Param::required("x")];
///
/// let mut builder = EnvironmentBuilder::new();
/// builder
///     .register_constant("answer", Value::int(42))
///     .unwrap()
///     .register_native_function("twice", Signature::Fixed(X), |args| {
///         let x = args.required(0)?;
///         Ok(Value::list(vec![x.clone(), x.clone()]))
///     })
///     .unwrap();
/// let env = builder.build();
///
/// assert_eq!(interp("twice(answer)", &env).unwrap().to_string(), "[42, 42]");
/// assert!(EnvironmentBuilder::new()
///     .register_constant("a", Value::None)
///     .unwrap()
///     .register_constant("a", Value::None)
///     .is_err());
/// ```
#[derive(Debug, Default)]
pub struct EnvironmentBuilder {
    bindings: BindingMap,
}

impl EnvironmentBuilder {
    pub fn new() -> Self {
        Self {
            bindings: BindingMap::new(),
        }
    }

    fn bind(&mut self, name: &str, binding: Binding) -> Result<&mut Self> {
        let key = name.try_into_binding_name()?;
        if self.bindings.contains_key(&key) {
            return Err(ExprError::DuplicateBinding {
                name: name.to_string(),
            });
        }
        self.bindings
            .insert(key, binding)
            .map_err(|_| ExprError::CapacityExceeded("environment bindings"))?;
        tracing::trace!(name, "bound");
        Ok(self)
    }

    /// Binds `name` to an immutable value.
    pub fn register_constant(&mut self, name: &str, value: impl Into<Value>) -> Result<&mut Self> {
        self.bind(name, Binding::Constant(value.into()))
    }

    /// Binds a prepared native function under its own name.
    pub fn register_function(&mut self, function: NativeFunction) -> Result<&mut Self> {
        let name = function.name.clone();
        self.bind(&name, Binding::Function(Rc::new(function)))
    }

    /// Registers a native function in the environment.
    ///
    /// The implementation receives the call's arguments already bound to the
    /// parameters described by `signature`.
    pub fn register_native_function<F>(
        &mut self,
        name: &str,
        signature: Signature,
        implementation: F,
    ) -> Result<&mut Self>
    where
        F: Fn(&CallArgs<'_>) -> Result<Value> + 'static,
    {
        self.register_function(NativeFunction {
            name: name.to_string(),
            signature,
            implementation: Rc::new(implementation),
            description: None,
        })
    }

    /// Exposes `history` to expressions under `name`.
    pub fn bind_history(&mut self, name: &str, history: &OutputHistory) -> Result<&mut Self> {
        self.bind(name, Binding::History(history.clone()))
    }

    /// Adds `True`, `False`, `None` and the general-purpose builtins.
    pub fn with_universe(&mut self) -> Result<&mut Self> {
        register_builtins(self)?;
        Ok(self)
    }

    /// Adds every function of the math library.
    pub fn with_math_library(&mut self) -> Result<&mut Self> {
        register_math_functions(self)?;
        Ok(self)
    }

    pub fn build(self) -> Environment {
        Environment {
            bindings: self.bindings,
        }
    }
}
