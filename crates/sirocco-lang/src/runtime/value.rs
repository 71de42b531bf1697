use std::cell::{Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::runtime::functions::FuncHead;
use crate::runtime::prototype::ProtoRef;
use crate::syntax::ast::{Stmt, Type};

/// Whether a binding accepts later mutation. Constants reject every write,
/// including compound assignment and mutating built-in methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutability {
    Const,
    Var,
}

// ─── Runtime types ───────────────────────────────────────────────────────────

/// The runtime kind of a value. `Unresolved` is the transient placeholder for
/// empty array literals before inference and for the bare `Array` annotation;
/// it never survives into a declared binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataType {
    Int,
    Double,
    Character,
    Str,
    Bool,
    Void,
    Struct,
    Enum,
    Function,
    Array(Box<DataType>),
    Unresolved,
}

impl DataType {
    pub fn from_annotation(ty: &Type) -> Self {
        match ty {
            Type::Int => Self::Int,
            Type::Double => Self::Double,
            Type::Character => Self::Character,
            Type::Str => Self::Str,
            Type::Bool => Self::Bool,
            Type::Void => Self::Void,
            Type::Function => Self::Function,
            Type::Struct => Self::Struct,
            Type::Enum => Self::Enum,
            Type::Array(None) => Self::Array(Box::new(Self::Unresolved)),
            Type::Array(Some(inner)) => Self::Array(Box::new(Self::from_annotation(inner))),
        }
    }

    pub fn name(&self) -> String {
        match self {
            Self::Int => "Int".into(),
            Self::Double => "Double".into(),
            Self::Character => "Character".into(),
            Self::Str => "String".into(),
            Self::Bool => "Bool".into(),
            Self::Void => "Void".into(),
            Self::Struct => "Struct".into(),
            Self::Enum => "Enum".into(),
            Self::Function => "Function".into(),
            Self::Array(inner) => format!("[{}]", inner.name()),
            Self::Unresolved => "_".into(),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Int | Self::Double | Self::Bool)
    }
}

// ─── Content ─────────────────────────────────────────────────────────────────

/// A function value: its signature, shared body, and the block frames captured
/// at the declaration site (closure environment, shared by handle).
#[derive(Debug, Clone)]
pub struct FunctionValue {
    pub head: FuncHead,
    pub body: Rc<Vec<Stmt>>,
    pub captured: Vec<HashMap<String, Value>>,
}

/// The payload of a literal. `Void` is the designated "no value" marker that a
/// value-less `return` or a fall-off-the-end call produces. Struct fields keep
/// their declaration order.
#[derive(Debug, Clone)]
pub enum Content {
    Int(i64),
    Double(f64),
    Bool(bool),
    Char(char),
    Str(String),
    Struct(IndexMap<String, Value>),
    Function(FunctionValue),
    Array { elem: DataType, items: Vec<Value> },
    Void,
}

impl Content {
    pub fn kind(&self) -> DataType {
        match self {
            Self::Int(_) => DataType::Int,
            Self::Double(_) => DataType::Double,
            Self::Bool(_) => DataType::Bool,
            Self::Char(_) => DataType::Character,
            Self::Str(_) => DataType::Str,
            Self::Struct(_) => DataType::Struct,
            Self::Function(_) => DataType::Function,
            Self::Array { elem, .. } => DataType::Array(Box::new(elem.clone())),
            Self::Void => DataType::Void,
        }
    }

    /// Recursive copy: struct fields and array elements get fresh cells, so
    /// the copy and the original never alias.
    pub fn deep_copy(&self) -> Content {
        match self {
            Self::Struct(fields) => Self::Struct(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.deep_copy_as(v.mutability())))
                    .collect(),
            ),
            Self::Array { elem, items } => Self::Array {
                elem: elem.clone(),
                items: items.iter().map(|v| v.deep_copy_as(v.mutability())).collect(),
            },
            other => other.clone(),
        }
    }
}

// ─── Literal & Value ─────────────────────────────────────────────────────────

/// One storage cell: mutability, prototype link, and payload. Assignment
/// mutates the cell in place so every handle to it observes the change.
#[derive(Debug)]
pub struct Literal {
    pub mutability: Mutability,
    pub proto: ProtoRef,
    pub content: Content,
}

/// Shared handle to a literal. Cloning a `Value` aliases; `deep_copy_as`
/// detaches.
#[derive(Debug, Clone)]
pub struct Value(Rc<RefCell<Literal>>);

impl Value {
    pub fn new(mutability: Mutability, proto: ProtoRef, content: Content) -> Self {
        Self(Rc::new(RefCell::new(Literal { mutability, proto, content })))
    }

    pub fn borrow(&self) -> Ref<'_, Literal> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, Literal> {
        self.0.borrow_mut()
    }

    pub fn ptr_eq(&self, other: &Value) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn mutability(&self) -> Mutability {
        self.0.borrow().mutability
    }

    pub fn is_const(&self) -> bool {
        self.mutability() == Mutability::Const
    }

    pub fn kind(&self) -> DataType {
        self.0.borrow().content.kind()
    }

    pub fn proto(&self) -> ProtoRef {
        self.0.borrow().proto.clone()
    }

    pub fn deep_copy_as(&self, mutability: Mutability) -> Value {
        let lit = self.0.borrow();
        Value::new(mutability, lit.proto.clone(), lit.content.deep_copy())
    }

    pub fn as_int(&self) -> Option<i64> {
        match self.0.borrow().content {
            Content::Int(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self.0.borrow().content {
            Content::Int(n) => Some(n as f64),
            Content::Double(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.0.borrow().content {
            Content::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_char(&self) -> Option<char> {
        match self.0.borrow().content {
            Content::Char(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<String> {
        match &self.0.borrow().content {
            Content::Str(s) => Some(s.clone()),
            _ => None,
        }
    }

    /// Human-readable rendering, used by `print` and `toString`.
    pub fn render(&self) -> String {
        render_content(&self.0.borrow().content)
    }
}

fn render_content(content: &Content) -> String {
    match content {
        Content::Int(n) => n.to_string(),
        Content::Double(v) => {
            if v.is_finite() && v.fract() == 0.0 {
                format!("{v:.1}")
            } else {
                v.to_string()
            }
        }
        Content::Bool(b) => b.to_string(),
        Content::Char(c) => c.to_string(),
        Content::Str(s) => s.clone(),
        Content::Void => "void".into(),
        Content::Array { items, .. } => {
            let inner: Vec<String> = items.iter().map(Value::render).collect();
            format!("[{}]", inner.join(", "))
        }
        Content::Struct(fields) => {
            let inner: Vec<String> = fields
                .iter()
                .map(|(n, v)| format!("{n}: {}", v.render()))
                .collect();
            format!("{{{}}}", inner.join(", "))
        }
        Content::Function(f) => format!("<func {}>", f.head.name),
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
