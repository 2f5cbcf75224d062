//! Component props and identity comparison.
//!
//! A custom component re-renders on reload only when its props changed.
//! "Changed" is a shallow identity test: [`PropValue::is`] compares scalars
//! by value and shared values by pointer, and [`PropBag`] applies it key by
//! key. Typed props use `PartialEq` through the blanket [`Props`] impl.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

/// Props accepted by a component definition.
///
/// The blanket impl compares typed props with `PartialEq`. That is a deep
/// comparison for collections, and for `Rc<T>` too, since its `PartialEq`
/// compares the pointees: a reload with a fresh but equal `Vec` is skipped.
/// To re-render whenever a new allocation arrives, pass the value as a
/// [`PropValue::Shared`] inside a [`PropBag`], which compares by pointer.
pub trait Props: 'static {
    /// Whether `self` and `other` are the same for memoization purposes.
    fn same(&self, other: &Self) -> bool;
}

impl<T: PartialEq + 'static> Props for T {
    fn same(&self, other: &Self) -> bool {
        self == other
    }
}

/// A single prop or effect dependency.
#[derive(Clone)]
pub enum PropValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    /// Any other value, compared by allocation.
    Shared(Rc<dyn Any>),
}

impl PropValue {
    /// Wrap an arbitrary value in a fresh shared allocation.
    pub fn shared<T: Any>(value: T) -> Self {
        PropValue::Shared(Rc::new(value))
    }

    /// Share an existing allocation.
    pub fn from_rc<T: Any>(value: Rc<T>) -> Self {
        PropValue::Shared(value)
    }

    /// Identity comparison. Scalars and strings compare by value, floats by
    /// bit pattern with every NaN equal to itself (so `0.0` and `-0.0`
    /// differ), shared values by pointer.
    pub fn is(&self, other: &PropValue) -> bool {
        match (self, other) {
            (PropValue::Null, PropValue::Null) => true,
            (PropValue::Bool(a), PropValue::Bool(b)) => a == b,
            (PropValue::Int(a), PropValue::Int(b)) => a == b,
            (PropValue::Float(a), PropValue::Float(b)) => {
                a.to_bits() == b.to_bits() || (a.is_nan() && b.is_nan())
            }
            (PropValue::Str(a), PropValue::Str(b)) => a == b,
            (PropValue::Shared(a), PropValue::Shared(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            PropValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            PropValue::Float(value) => Some(*value),
            PropValue::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropValue::Str(value) => Some(&**value),
            _ => None,
        }
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            PropValue::Shared(value) => value.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Text form used when a prop is rendered as a child.
    pub fn to_text(&self) -> String {
        match self {
            PropValue::Null | PropValue::Shared(_) => String::new(),
            PropValue::Bool(value) => value.to_string(),
            PropValue::Int(value) => value.to_string(),
            PropValue::Float(value) => value.to_string(),
            PropValue::Str(value) => value.to_string(),
        }
    }
}

impl PartialEq for PropValue {
    fn eq(&self, other: &Self) -> bool {
        self.is(other)
    }
}

impl fmt::Debug for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropValue::Null => f.write_str("Null"),
            PropValue::Bool(value) => write!(f, "Bool({value})"),
            PropValue::Int(value) => write!(f, "Int({value})"),
            PropValue::Float(value) => write!(f, "Float({value})"),
            PropValue::Str(value) => write!(f, "Str({value:?})"),
            PropValue::Shared(value) => write!(f, "Shared({:p})", Rc::as_ptr(value)),
        }
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        PropValue::Bool(value)
    }
}

impl From<i32> for PropValue {
    fn from(value: i32) -> Self {
        PropValue::Int(i64::from(value))
    }
}

impl From<i64> for PropValue {
    fn from(value: i64) -> Self {
        PropValue::Int(value)
    }
}

impl From<u32> for PropValue {
    fn from(value: u32) -> Self {
        PropValue::Int(i64::from(value))
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        PropValue::Float(value)
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        PropValue::Str(Rc::from(value))
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        PropValue::Str(Rc::from(value))
    }
}

impl From<Rc<str>> for PropValue {
    fn from(value: Rc<str>) -> Self {
        PropValue::Str(value)
    }
}

impl<T: Into<PropValue>> From<Option<T>> for PropValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(PropValue::Null, Into::into)
    }
}

/// An ordered bag of named props.
///
/// Two bags are equal when they have the same key set and every value is
/// [`is`](PropValue::is)-equal; key order does not matter.
#[derive(Clone, Default)]
pub struct PropBag {
    entries: IndexMap<String, PropValue>,
}

impl PropBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<PropValue>) -> Option<PropValue> {
        self.entries.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&PropValue> {
        self.entries.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PartialEq for PropBag {
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .all(|(key, value)| other.entries.get(key).is_some_and(|theirs| value.is(theirs)))
    }
}

impl fmt::Debug for PropBag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.iter()).finish()
    }
}
