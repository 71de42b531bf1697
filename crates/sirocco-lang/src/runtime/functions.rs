use crate::error::RuntimeError;
use crate::runtime::value::{DataType, Value};

/// A function signature. Full equality (derived) is what function-value `==`
/// compares; `structural_eq` ignores parameter names and the return type and
/// is what gates redeclaration and drives overload resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct FuncHead {
    pub name: String,
    pub params: Vec<String>,
    pub types: Vec<DataType>,
    pub refs: Vec<bool>,
    pub ret: DataType,
}

impl FuncHead {
    pub fn structural_eq(&self, other: &FuncHead) -> bool {
        self.name == other.name && self.types == other.types && self.refs == other.refs
    }
}

/// Whether a declared parameter type accepts an argument of the given kind.
/// `Unresolved` (untyped array slots) accepts anything of the right shape and
/// `Double` accepts an `Int` by promotion.
pub fn param_accepts(param: &DataType, arg: &DataType) -> bool {
    match (param, arg) {
        (DataType::Unresolved, _) => true,
        (DataType::Double, DataType::Int) => true,
        (DataType::Array(p), DataType::Array(a)) => {
            **p == DataType::Unresolved || **a == DataType::Unresolved || p == a
        }
        _ => param == arg,
    }
}

// ─── Registry ────────────────────────────────────────────────────────────────

/// The global function registry. Declaration order is preserved; overloads of
/// one name coexist as long as their structural signatures differ.
#[derive(Debug, Default)]
pub struct FunctionTable {
    entries: Vec<(FuncHead, Value)>,
    anon: usize,
}

impl FunctionTable {
    pub fn declare(&mut self, head: FuncHead, func: Value) -> Result<(), RuntimeError> {
        if self.entries.iter().any(|(h, _)| h.structural_eq(&head)) {
            return Err(RuntimeError::DuplicateFunction(head.name));
        }
        self.entries.push((head, func));
        Ok(())
    }

    /// Synthesizes the next `$#<n>` name for an anonymous function.
    pub fn next_anon_name(&mut self) -> String {
        self.anon += 1;
        format!("$#{}", self.anon)
    }

    /// First declared function with the given name regardless of signature,
    /// for referencing a function as a plain value.
    pub fn first_by_name(&self, name: &str) -> Option<Value> {
        self.entries
            .iter()
            .find(|(h, _)| h.name == name)
            .map(|(_, v)| v.clone())
    }

    /// Overload resolution: candidates by name, then by arity, then an exact
    /// type match, then a unique compatible match under `param_accepts`.
    pub fn resolve(&self, name: &str, args: &[DataType]) -> Result<Value, RuntimeError> {
        let by_name: Vec<&(FuncHead, Value)> =
            self.entries.iter().filter(|(h, _)| h.name == name).collect();
        if by_name.is_empty() {
            return Err(RuntimeError::UndeclaredVariable(name.to_string()));
        }

        let by_arity: Vec<&&(FuncHead, Value)> =
            by_name.iter().filter(|(h, _)| h.types.len() == args.len()).collect();
        if by_arity.is_empty() {
            return Err(RuntimeError::ArityMismatch {
                name: name.to_string(),
                expected: by_name[0].0.types.len(),
                got: args.len(),
            });
        }

        for (head, func) in by_arity.iter().map(|e| &***e) {
            if head.types.as_slice() == args {
                return Ok(func.clone());
            }
        }

        let fits: Vec<&Value> = by_arity
            .iter()
            .filter(|(h, _)| h.types.iter().zip(args).all(|(p, a)| param_accepts(p, a)))
            .map(|(_, v)| v)
            .collect();
        match fits.as_slice() {
            [func] => Ok((*func).clone()),
            [] => Err(RuntimeError::UnsupportedOperation(format!(
                "no overload of `{name}` matches the argument types"
            ))),
            _ => Err(RuntimeError::UnsupportedOperation(format!(
                "ambiguous call to `{name}`"
            ))),
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::prototype::TypeTable;
    use crate::runtime::value::{Content, Mutability};

    fn head(name: &str, types: Vec<DataType>) -> FuncHead {
        let n = types.len();
        FuncHead {
            name: name.into(),
            params: (0..n).map(|i| format!("p{i}")).collect(),
            types,
            refs: vec![false; n],
            ret: DataType::Void,
        }
    }

    fn marker(n: i64) -> Value {
        let types = TypeTable::new();
        Value::new(Mutability::Const, types.proto_for(&DataType::Int), Content::Int(n))
    }

    #[test]
    fn same_signature_twice_is_rejected() {
        let mut table = FunctionTable::default();
        table.declare(head("f", vec![DataType::Int]), marker(1)).unwrap();
        let err = table.declare(head("f", vec![DataType::Int]), marker(2)).unwrap_err();
        assert_eq!(err, RuntimeError::DuplicateFunction("f".into()));
    }

    #[test]
    fn overloads_by_type_coexist_and_resolve_exactly() {
        let mut table = FunctionTable::default();
        table.declare(head("f", vec![DataType::Int]), marker(1)).unwrap();
        table.declare(head("f", vec![DataType::Str]), marker(2)).unwrap();

        let v = table.resolve("f", &[DataType::Str]).unwrap();
        assert_eq!(v.as_int(), Some(2));
    }

    #[test]
    fn int_argument_promotes_to_double_parameter() {
        let mut table = FunctionTable::default();
        table.declare(head("f", vec![DataType::Double]), marker(1)).unwrap();
        assert!(table.resolve("f", &[DataType::Int]).is_ok());
    }

    #[test]
    fn wrong_arity_is_reported() {
        let mut table = FunctionTable::default();
        table.declare(head("f", vec![DataType::Int, DataType::Int]), marker(1)).unwrap();
        let err = table.resolve("f", &[DataType::Int]).unwrap_err();
        assert_eq!(
            err,
            RuntimeError::ArityMismatch { name: "f".into(), expected: 2, got: 1 }
        );
    }

    #[test]
    fn unknown_name_reads_as_undeclared() {
        let table = FunctionTable::default();
        let err = table.resolve("ghost", &[]).unwrap_err();
        assert_eq!(err, RuntimeError::UndeclaredVariable("ghost".into()));
    }

    #[test]
    fn return_type_does_not_split_overloads() {
        let mut table = FunctionTable::default();
        let mut a = head("f", vec![DataType::Int]);
        a.ret = DataType::Int;
        let mut b = head("f", vec![DataType::Int]);
        b.ret = DataType::Double;
        table.declare(a, marker(1)).unwrap();
        assert!(table.declare(b, marker(2)).is_err());
    }
}
