//! Class descriptors, instances and callables.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use quill_core::Expr;

use super::{BoundArgs, EvalError, ParamSpec, Value};
use crate::context::Context;

/// Mint a process-unique object identity.
pub fn next_id() -> u64 {
    static NEXT_ID: AtomicU64 = AtomicU64::new(1);
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

pub type MethodFn = fn(&Value, &BoundArgs<'_>) -> Result<Value, EvalError>;
pub type NativeFn = fn(&BoundArgs<'_>) -> Result<Value, EvalError>;
pub type ConstructorFn = fn(&Arc<Class>, &BoundArgs<'_>) -> Result<Value, EvalError>;
pub type ToNativeFn = fn(&Instance) -> Result<serde_json::Value, EvalError>;

// ──────────────────────────────────────────────
// Classes
// ──────────────────────────────────────────────

/// Whether a method binds to the instance or to its class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Instance,
    Class,
}

#[derive(Debug)]
pub struct Method {
    pub name: &'static str,
    pub kind: MethodKind,
    pub params: ParamSpec,
    pub func: MethodFn,
}

/// An immutable class descriptor.
#[derive(Debug)]
pub struct Class {
    pub id: u64,
    pub name: &'static str,
    pub base: Option<Arc<Class>>,
    methods: BTreeMap<&'static str, Arc<Method>>,
    constructor: Option<(ParamSpec, ConstructorFn)>,
    to_native: Option<ToNativeFn>,
}

impl Class {
    pub fn builder(name: &'static str) -> ClassBuilder {
        ClassBuilder {
            name,
            base: None,
            methods: BTreeMap::new(),
            constructor: None,
            to_native: None,
        }
    }

    /// The class followed by its ancestors.
    pub fn mro(&self) -> impl Iterator<Item = &Class> {
        std::iter::successors(Some(self), |class| class.base.as_deref())
    }

    pub fn find_method(&self, name: &str) -> Option<&Arc<Method>> {
        self.mro().find_map(|class| class.methods.get(name))
    }

    pub fn constructor(&self) -> Option<&(ParamSpec, ConstructorFn)> {
        self.mro().find_map(|class| class.constructor.as_ref())
    }

    pub fn to_native_fn(&self) -> Option<ToNativeFn> {
        self.mro().find_map(|class| class.to_native)
    }

    pub fn is_subclass_of(&self, other: &Class) -> bool {
        self.mro().any(|class| class.id == other.id)
    }
}

pub struct ClassBuilder {
    name: &'static str,
    base: Option<Arc<Class>>,
    methods: BTreeMap<&'static str, Arc<Method>>,
    constructor: Option<(ParamSpec, ConstructorFn)>,
    to_native: Option<ToNativeFn>,
}

impl ClassBuilder {
    pub fn base(mut self, base: &Arc<Class>) -> Self {
        self.base = Some(Arc::clone(base));
        self
    }

    fn add(mut self, name: &'static str, kind: MethodKind, params: ParamSpec, func: MethodFn) -> Self {
        self.methods.insert(
            name,
            Arc::new(Method {
                name,
                kind,
                params,
                func,
            }),
        );
        self
    }

    pub fn method(self, name: &'static str, params: ParamSpec, func: MethodFn) -> Self {
        self.add(name, MethodKind::Instance, params, func)
    }

    pub fn classmethod(self, name: &'static str, params: ParamSpec, func: MethodFn) -> Self {
        self.add(name, MethodKind::Class, params, func)
    }

    pub fn constructor(mut self, params: ParamSpec, func: ConstructorFn) -> Self {
        self.constructor = Some((params, func));
        self
    }

    pub fn to_native(mut self, func: ToNativeFn) -> Self {
        self.to_native = Some(func);
        self
    }

    pub fn build(self) -> Arc<Class> {
        Arc::new(Class {
            id: next_id(),
            name: self.name,
            base: self.base,
            methods: self.methods,
            constructor: self.constructor,
            to_native: self.to_native,
        })
    }
}

// ──────────────────────────────────────────────
// Instances
// ──────────────────────────────────────────────

#[derive(Debug)]
pub struct Instance {
    pub id: u64,
    pub class: Arc<Class>,
    pub fields: BTreeMap<String, Value>,
}

impl Instance {
    pub fn new(class: &Arc<Class>, fields: BTreeMap<String, Value>) -> Value {
        Value::Instance(Arc::new(Instance {
            id: next_id(),
            class: Arc::clone(class),
            fields,
        }))
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Integer field, as stored by the date/time classes.
    pub fn int_field(&self, name: &str) -> Result<i64, EvalError> {
        self.fields
            .get(name)
            .and_then(Value::as_integer)
            .ok_or_else(|| {
                EvalError::type_error(format!(
                    "'{}' object has no integer field '{name}'",
                    self.class.name
                ))
            })
    }

    pub fn is_instance_of(&self, class: &Class) -> bool {
        self.class.is_subclass_of(class)
    }
}

// ──────────────────────────────────────────────
// Callables
// ──────────────────────────────────────────────

#[derive(Debug)]
pub enum FunctionBody {
    Native(NativeFn),
    /// A `lambda`, closing over the context it was created in.
    Lambda { body: Arc<Expr>, closure: Context },
}

#[derive(Debug)]
pub struct Function {
    pub id: u64,
    pub name: String,
    pub params: ParamSpec,
    pub body: FunctionBody,
}

impl Function {
    pub fn native(name: &str, params: ParamSpec, func: NativeFn) -> Value {
        Value::Function(Arc::new(Function {
            id: next_id(),
            name: name.to_owned(),
            params,
            body: FunctionBody::Native(func),
        }))
    }
}

/// A method bound to its receiver (an instance, or a class for class methods).
#[derive(Debug)]
pub struct BoundMethod {
    pub receiver: Value,
    pub method: Arc<Method>,
}
