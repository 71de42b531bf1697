use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::runtime::value::{DataType, Value};
use crate::syntax::ast::StructDecl;

pub type ProtoRef = Rc<RefCell<Prototype>>;

/// Cap on parent hops when walking a prototype chain. Member assignment can
/// splice arbitrary links, so the walk refuses to follow a chain forever.
const MAX_PROTO_HOPS: usize = 32;

/// A prototype: member table in declaration order plus an optional parent
/// link. Struct prototypes additionally carry their declaration for
/// instantiation.
#[derive(Debug)]
pub struct Prototype {
    pub name: String,
    pub members: IndexMap<String, Value>,
    pub parent: Option<ProtoRef>,
    pub ctor: Option<Rc<StructDecl>>,
}

impl Prototype {
    pub fn new(name: impl Into<String>) -> ProtoRef {
        Rc::new(RefCell::new(Self {
            name: name.into(),
            members: IndexMap::new(),
            parent: None,
            ctor: None,
        }))
    }
}

/// Walks the chain from `start` outward and returns the first member with the
/// given name. Iterative with a hop cap; a cyclic chain yields `None`.
pub fn lookup_member(start: &ProtoRef, name: &str) -> Option<Value> {
    let mut current = start.clone();
    for _ in 0..MAX_PROTO_HOPS {
        let next = {
            let proto = current.borrow();
            if let Some(member) = proto.members.get(name) {
                return Some(member.clone());
            }
            proto.parent.clone()
        };
        match next {
            Some(parent) => current = parent,
            None => return None,
        }
    }
    None
}

// ─── Type table ──────────────────────────────────────────────────────────────

/// Registry of named prototypes: the eight built-in type prototypes created
/// once at interpreter start, plus one per declared struct or enum.
#[derive(Debug)]
pub struct TypeTable {
    named: HashMap<String, ProtoRef>,
}

const BUILTIN_PROTOS: [&str; 8] =
    ["Int", "Double", "Character", "String", "Bool", "Void", "Function", "Array"];

impl TypeTable {
    pub fn new() -> Self {
        let mut named = HashMap::new();
        for name in BUILTIN_PROTOS {
            named.insert(name.to_string(), Prototype::new(name));
        }
        Self { named }
    }

    /// The built-in prototype backing a primitive value of the given kind.
    /// Struct and enum instances carry their declaration's prototype instead;
    /// this returns the `Void` prototype for them as a neutral fallback.
    pub fn proto_for(&self, kind: &DataType) -> ProtoRef {
        let name = match kind {
            DataType::Int => "Int",
            DataType::Double => "Double",
            DataType::Character => "Character",
            DataType::Str => "String",
            DataType::Bool => "Bool",
            DataType::Function => "Function",
            DataType::Array(_) => "Array",
            DataType::Void | DataType::Unresolved | DataType::Struct | DataType::Enum => "Void",
        };
        self.named[name].clone()
    }

    pub fn by_name(&self, name: &str) -> Option<ProtoRef> {
        self.named.get(name).cloned()
    }

    pub fn register(&mut self, name: &str, proto: ProtoRef) {
        self.named.insert(name.to_string(), proto);
    }
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::value::{Content, Mutability};

    fn member(types: &TypeTable, n: i64) -> Value {
        Value::new(Mutability::Var, types.proto_for(&DataType::Int), Content::Int(n))
    }

    #[test]
    fn lookup_walks_the_parent_chain() {
        let types = TypeTable::new();
        let parent = Prototype::new("Parent");
        parent.borrow_mut().members.insert("shared".into(), member(&types, 7));
        let child = Prototype::new("Child");
        child.borrow_mut().parent = Some(parent);

        let found = lookup_member(&child, "shared").unwrap();
        assert_eq!(found.as_int(), Some(7));
        assert!(lookup_member(&child, "missing").is_none());
    }

    #[test]
    fn own_member_shadows_the_parent() {
        let types = TypeTable::new();
        let parent = Prototype::new("Parent");
        parent.borrow_mut().members.insert("x".into(), member(&types, 1));
        let child = Prototype::new("Child");
        child.borrow_mut().members.insert("x".into(), member(&types, 2));
        child.borrow_mut().parent = Some(parent);

        assert_eq!(lookup_member(&child, "x").unwrap().as_int(), Some(2));
    }

    #[test]
    fn cyclic_chain_terminates() {
        let a = Prototype::new("A");
        let b = Prototype::new("B");
        a.borrow_mut().parent = Some(b.clone());
        b.borrow_mut().parent = Some(a.clone());

        assert!(lookup_member(&a, "anything").is_none());
    }

    #[test]
    fn builtin_prototypes_exist() {
        let types = TypeTable::new();
        for name in BUILTIN_PROTOS {
            assert!(types.by_name(name).is_some(), "missing prototype {name}");
        }
    }
}
