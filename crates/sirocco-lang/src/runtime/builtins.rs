use crate::error::RuntimeError;
use crate::runtime::prototype::TypeTable;
use crate::runtime::value::{Content, DataType, Mutability, Value};

/// Built-in method dispatch, tried after own fields and the prototype chain.
/// Returns `Ok(None)` when the receiver's kind has no method of that name so
/// the caller can report the member as missing. Higher-order array methods
/// live in the interpreter because they call back into the evaluator.
pub fn dispatch(
    types: &TypeTable,
    recv: &Value,
    method: &str,
    args: &[Value],
) -> Result<Option<Value>, RuntimeError> {
    // universal methods
    match method {
        "toString" => {
            expect_arity(method, 0, args)?;
            return Ok(Some(make(types, Content::Str(recv.render()))));
        }
        "typeof" => {
            expect_arity(method, 0, args)?;
            return Ok(Some(make(types, Content::Str(recv.kind().name()))));
        }
        _ => {}
    }

    match recv.kind() {
        DataType::Str => string_method(types, recv, method, args),
        DataType::Bool => bool_method(types, recv, method, args),
        DataType::Character => char_method(types, recv, method, args),
        DataType::Struct | DataType::Enum => struct_method(types, recv, method, args),
        DataType::Array(_) => array_method(types, recv, method, args),
        _ => Ok(None),
    }
}

// ─── String ──────────────────────────────────────────────────────────────────

fn string_method(
    types: &TypeTable,
    recv: &Value,
    method: &str,
    args: &[Value],
) -> Result<Option<Value>, RuntimeError> {
    let s = match recv.as_str() {
        Some(s) => s,
        None => return Ok(None),
    };
    let out = match method {
        "size" => {
            expect_arity(method, 0, args)?;
            Content::Int(s.chars().count() as i64)
        }
        "replace" => {
            expect_arity(method, 2, args)?;
            let from = want_str(method, &args[0])?;
            let to = want_str(method, &args[1])?;
            Content::Str(s.replace(&from, &to))
        }
        "subStr" => {
            expect_arity(method, 2, args)?;
            let start = want_int(method, &args[0])?;
            let end = want_int(method, &args[1])?;
            let chars: Vec<char> = s.chars().collect();
            let len = chars.len();
            if start < 0 || end < start || end as usize > len {
                return Err(RuntimeError::IndexOutOfBounds { index: end, len });
            }
            Content::Str(chars[start as usize..end as usize].iter().collect())
        }
        "toCharArray" => {
            expect_arity(method, 0, args)?;
            let items = s
                .chars()
                .map(|c| make(types, Content::Char(c)))
                .collect();
            Content::Array { elem: DataType::Character, items }
        }
        _ => return Ok(None),
    };
    Ok(Some(make(types, out)))
}

// ─── Bool ────────────────────────────────────────────────────────────────────

fn bool_method(
    types: &TypeTable,
    recv: &Value,
    method: &str,
    args: &[Value],
) -> Result<Option<Value>, RuntimeError> {
    let b = match recv.as_bool() {
        Some(b) => b,
        None => return Ok(None),
    };
    let out = match method {
        "not" => {
            expect_arity(method, 0, args)?;
            !b
        }
        "and" => {
            expect_arity(method, 1, args)?;
            b && want_bool(method, &args[0])?
        }
        "or" => {
            expect_arity(method, 1, args)?;
            b || want_bool(method, &args[0])?
        }
        "xor" => {
            expect_arity(method, 1, args)?;
            b ^ want_bool(method, &args[0])?
        }
        _ => return Ok(None),
    };
    Ok(Some(make(types, Content::Bool(out))))
}

// ─── Character ───────────────────────────────────────────────────────────────

fn char_method(
    types: &TypeTable,
    recv: &Value,
    method: &str,
    args: &[Value],
) -> Result<Option<Value>, RuntimeError> {
    let c = match recv.as_char() {
        Some(c) => c,
        None => return Ok(None),
    };
    let out = match method {
        "isDigit" => Content::Bool(c.is_ascii_digit()),
        "isAlpha" => Content::Bool(c.is_alphabetic()),
        "isUpper" => Content::Bool(c.is_uppercase()),
        "isLower" => Content::Bool(c.is_lowercase()),
        "toInt" => Content::Int(c as i64),
        _ => return Ok(None),
    };
    expect_arity(method, 0, args)?;
    Ok(Some(make(types, out)))
}

// ─── Struct ──────────────────────────────────────────────────────────────────

fn struct_method(
    types: &TypeTable,
    recv: &Value,
    method: &str,
    args: &[Value],
) -> Result<Option<Value>, RuntimeError> {
    match method {
        "count" => {
            expect_arity(method, 0, args)?;
            let n = match &recv.borrow().content {
                Content::Struct(fields) => fields.len() as i64,
                _ => return Ok(None),
            };
            Ok(Some(make(types, Content::Int(n))))
        }
        "erase" => {
            expect_arity(method, 1, args)?;
            let name = want_str(method, &args[0])?;
            if recv.is_const() {
                return Err(RuntimeError::ConstantMutation);
            }
            let removed = match &mut recv.borrow_mut().content {
                Content::Struct(fields) => fields.shift_remove(&name).is_some(),
                _ => return Ok(None),
            };
            Ok(Some(make(types, Content::Bool(removed))))
        }
        "clear" => {
            expect_arity(method, 0, args)?;
            if recv.is_const() {
                return Err(RuntimeError::ConstantMutation);
            }
            match &mut recv.borrow_mut().content {
                Content::Struct(fields) => fields.clear(),
                _ => return Ok(None),
            }
            Ok(Some(make(types, Content::Void)))
        }
        _ => Ok(None),
    }
}

// ─── Array ───────────────────────────────────────────────────────────────────

fn array_method(
    types: &TypeTable,
    recv: &Value,
    method: &str,
    args: &[Value],
) -> Result<Option<Value>, RuntimeError> {
    match method {
        "size" => {
            expect_arity(method, 0, args)?;
            let n = with_items(recv, |items| items.len() as i64)?;
            Ok(Some(make(types, Content::Int(n))))
        }
        "first" | "last" => {
            expect_arity(method, 0, args)?;
            let item = with_items(recv, |items| {
                let picked = if method == "first" { items.first() } else { items.last() };
                picked.cloned().ok_or(RuntimeError::IndexOutOfBounds { index: 0, len: 0 })
            })??;
            Ok(Some(item))
        }
        "clear" => {
            expect_arity(method, 0, args)?;
            require_var(recv)?;
            if let Content::Array { items, .. } = &mut recv.borrow_mut().content {
                items.clear();
            }
            Ok(Some(make(types, Content::Void)))
        }
        "swap" => {
            expect_arity(method, 2, args)?;
            require_var(recv)?;
            let i = want_int(method, &args[0])?;
            let j = want_int(method, &args[1])?;
            let mut lit = recv.borrow_mut();
            if let Content::Array { items, .. } = &mut lit.content {
                let len = items.len();
                for idx in [i, j] {
                    if idx < 0 || idx as usize >= len {
                        return Err(RuntimeError::IndexOutOfBounds { index: idx, len });
                    }
                }
                items.swap(i as usize, j as usize);
            }
            Ok(Some(make(types, Content::Void)))
        }
        "pushBack" | "pushFront" => {
            expect_arity(method, 1, args)?;
            require_var(recv)?;
            let incoming = args[0].deep_copy_as(Mutability::Var);
            let kind = incoming.kind();
            let mut lit = recv.borrow_mut();
            if let Content::Array { elem, items } = &mut lit.content {
                if *elem == DataType::Unresolved {
                    *elem = kind;
                } else if kind != *elem {
                    return Err(RuntimeError::ArrayTypeMismatch);
                }
                if method == "pushBack" {
                    items.push(incoming);
                } else {
                    items.insert(0, incoming);
                }
            }
            Ok(Some(make(types, Content::Void)))
        }
        "popBack" | "popFront" => {
            expect_arity(method, 0, args)?;
            require_var(recv)?;
            let mut lit = recv.borrow_mut();
            if let Content::Array { items, .. } = &mut lit.content {
                if items.is_empty() {
                    return Err(RuntimeError::IndexOutOfBounds { index: 0, len: 0 });
                }
                let item = if method == "popBack" {
                    items.pop()
                } else {
                    Some(items.remove(0))
                };
                return Ok(item);
            }
            Ok(None)
        }
        _ => Ok(None),
    }
}

fn with_items<T>(recv: &Value, f: impl FnOnce(&Vec<Value>) -> T) -> Result<T, RuntimeError> {
    match &recv.borrow().content {
        Content::Array { items, .. } => Ok(f(items)),
        _ => Err(RuntimeError::UnsupportedOperation(
            "array method on a non-array receiver".into(),
        )),
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn make(types: &TypeTable, content: Content) -> Value {
    let proto = types.proto_for(&content.kind());
    Value::new(Mutability::Var, proto, content)
}

fn require_var(recv: &Value) -> Result<(), RuntimeError> {
    if recv.is_const() {
        Err(RuntimeError::ConstantMutation)
    } else {
        Ok(())
    }
}

fn expect_arity(method: &str, expected: usize, args: &[Value]) -> Result<(), RuntimeError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(RuntimeError::ArityMismatch {
            name: method.to_string(),
            expected,
            got: args.len(),
        })
    }
}

fn want_int(method: &str, v: &Value) -> Result<i64, RuntimeError> {
    v.as_int().ok_or_else(|| {
        RuntimeError::UnsupportedOperation(format!("`{method}` expects an Int argument"))
    })
}

fn want_str(method: &str, v: &Value) -> Result<String, RuntimeError> {
    v.as_str().ok_or_else(|| {
        RuntimeError::UnsupportedOperation(format!("`{method}` expects a String argument"))
    })
}

fn want_bool(method: &str, v: &Value) -> Result<bool, RuntimeError> {
    v.as_bool().ok_or_else(|| {
        RuntimeError::UnsupportedOperation(format!("`{method}` expects a Bool argument"))
    })
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn types() -> TypeTable {
        TypeTable::new()
    }

    fn int(t: &TypeTable, n: i64) -> Value {
        make(t, Content::Int(n))
    }

    #[test]
    fn string_size_counts_chars() {
        let t = types();
        let s = make(&t, Content::Str("héllo".into()));
        let out = dispatch(&t, &s, "size", &[]).unwrap().unwrap();
        assert_eq!(out.as_int(), Some(5));
    }

    #[test]
    fn sub_str_takes_a_char_range() {
        let t = types();
        let s = make(&t, Content::Str("playground".into()));
        let a = int(&t, 0);
        let b = int(&t, 4);
        let out = dispatch(&t, &s, "subStr", &[a, b]).unwrap().unwrap();
        assert_eq!(out.as_str().as_deref(), Some("play"));
    }

    #[test]
    fn sub_str_out_of_bounds() {
        let t = types();
        let s = make(&t, Content::Str("ab".into()));
        let a = int(&t, 0);
        let b = int(&t, 5);
        let err = dispatch(&t, &s, "subStr", &[a, b]).unwrap_err();
        assert_eq!(err, RuntimeError::IndexOutOfBounds { index: 5, len: 2 });
    }

    #[test]
    fn bool_xor() {
        let t = types();
        let a = make(&t, Content::Bool(true));
        let b = make(&t, Content::Bool(true));
        let out = dispatch(&t, &a, "xor", &[b]).unwrap().unwrap();
        assert_eq!(out.as_bool(), Some(false));
    }

    #[test]
    fn char_predicates_and_code_point() {
        let t = types();
        let c = make(&t, Content::Char('A'));
        assert_eq!(dispatch(&t, &c, "isUpper", &[]).unwrap().unwrap().as_bool(), Some(true));
        assert_eq!(dispatch(&t, &c, "isDigit", &[]).unwrap().unwrap().as_bool(), Some(false));
        assert_eq!(dispatch(&t, &c, "toInt", &[]).unwrap().unwrap().as_int(), Some(65));
    }

    #[test]
    fn push_back_enforces_the_element_type() {
        let t = types();
        let arr = make(&t, Content::Array { elem: DataType::Int, items: vec![] });
        let ok = dispatch(&t, &arr, "pushBack", &[int(&t, 1)]);
        assert!(ok.is_ok());
        let bad = make(&t, Content::Str("no".into()));
        let err = dispatch(&t, &arr, "pushBack", &[bad]).unwrap_err();
        assert_eq!(err, RuntimeError::ArrayTypeMismatch);
    }

    #[test]
    fn push_into_empty_untyped_array_fixes_its_type() {
        let t = types();
        let arr = make(&t, Content::Array { elem: DataType::Unresolved, items: vec![] });
        dispatch(&t, &arr, "pushBack", &[int(&t, 3)]).unwrap();
        assert_eq!(arr.kind(), DataType::Array(Box::new(DataType::Int)));
    }

    #[test]
    fn pop_back_returns_the_removed_element() {
        let t = types();
        let arr = make(&t, Content::Array {
            elem: DataType::Int,
            items: vec![int(&t, 1), int(&t, 2)],
        });
        let out = dispatch(&t, &arr, "popBack", &[]).unwrap().unwrap();
        assert_eq!(out.as_int(), Some(2));
        assert_eq!(dispatch(&t, &arr, "size", &[]).unwrap().unwrap().as_int(), Some(1));
    }

    #[test]
    fn mutating_a_const_array_is_rejected() {
        let t = types();
        let arr = Value::new(
            Mutability::Const,
            t.proto_for(&DataType::Array(Box::new(DataType::Int))),
            Content::Array { elem: DataType::Int, items: vec![] },
        );
        let err = dispatch(&t, &arr, "pushBack", &[int(&t, 1)]).unwrap_err();
        assert_eq!(err, RuntimeError::ConstantMutation);
    }

    #[test]
    fn struct_count_and_erase() {
        let t = types();
        let mut fields = indexmap::IndexMap::new();
        fields.insert("x".to_string(), int(&t, 1));
        fields.insert("y".to_string(), int(&t, 2));
        let s = make(&t, Content::Struct(fields));

        assert_eq!(dispatch(&t, &s, "count", &[]).unwrap().unwrap().as_int(), Some(2));
        let name = make(&t, Content::Str("x".into()));
        assert_eq!(dispatch(&t, &s, "erase", &[name]).unwrap().unwrap().as_bool(), Some(true));
        assert_eq!(dispatch(&t, &s, "count", &[]).unwrap().unwrap().as_int(), Some(1));
    }

    #[test]
    fn unknown_method_yields_none() {
        let t = types();
        let v = int(&t, 1);
        assert!(dispatch(&t, &v, "frobnicate", &[]).unwrap().is_none());
    }

    #[test]
    fn to_string_and_typeof_work_on_everything() {
        let t = types();
        let v = int(&t, 42);
        assert_eq!(dispatch(&t, &v, "toString", &[]).unwrap().unwrap().as_str().as_deref(), Some("42"));
        assert_eq!(dispatch(&t, &v, "typeof", &[]).unwrap().unwrap().as_str().as_deref(), Some("Int"));
    }
}
