use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::error::RuntimeError;
use crate::runtime::builtins;
use crate::runtime::functions::{FuncHead, FunctionTable, param_accepts};
use crate::runtime::prototype::{ProtoRef, Prototype, TypeTable, lookup_member};
use crate::runtime::scope::{Activation, Scopes};
use crate::runtime::value::{Content, DataType, FunctionValue, Mutability, Value};
use crate::runtime::world::{NullWorld, WorldRef};
use crate::syntax::ast::*;

/// How a statement finished. Loops absorb `Breaking`/`Continuing`, calls
/// absorb `Returning`; everything else passes the completion upward.
#[derive(Debug)]
pub enum Completion {
    Normal(Option<Value>),
    Returning(Option<Value>),
    Breaking,
    Continuing,
}

const WORLD_QUERIES: [&str; 7] = [
    "isOnGem",
    "isOnOpenedSwitch",
    "isOnClosedSwitch",
    "isBlocked",
    "isBlockedLeft",
    "isBlockedRight",
    "collectedGem",
];

const WORLD_COMMANDS: [&str; 8] = [
    "moveForward",
    "turnLeft",
    "collectGem",
    "toggleSwitch",
    "takeBeeper",
    "dropBeeper",
    "turnLockUp",
    "turnLockDown",
];

const ARRAY_HOFS: [&str; 5] = ["foreach", "map", "filter", "all", "any"];

/// The tree-walking evaluator. One instance exclusively owns its scope and
/// function tables; runs are single-threaded and synchronous.
pub struct Interpreter {
    program: Rc<Vec<Stmt>>,
    scopes: Scopes,
    functions: FunctionTable,
    types: TypeTable,
    world: WorldRef,
    output: String,
}

impl Interpreter {
    pub fn new(program: Program) -> Self {
        Self::with_world(program, Rc::new(RefCell::new(NullWorld)))
    }

    pub fn with_world(program: Program, world: WorldRef) -> Self {
        Self {
            program: Rc::new(program.stmts),
            scopes: Scopes::default(),
            functions: FunctionTable::default(),
            types: TypeTable::new(),
            world,
            output: String::new(),
        }
    }

    /// Runs the whole program and returns the value of the last top-level
    /// statement, if it produced one.
    pub fn run(&mut self) -> Result<Option<Value>, RuntimeError> {
        let program = Rc::clone(&self.program);
        let mut last = None;
        for stmt in program.iter() {
            match self.exec_stmt(stmt).map_err(RuntimeError::in_statements)? {
                Completion::Normal(v) => last = v,
                Completion::Returning(_) => {
                    return Err(RuntimeError::ReturnOutsideFunction.in_statements());
                }
                Completion::Breaking | Completion::Continuing => {
                    return Err(RuntimeError::UnsupportedOperation(
                        "break or continue outside of a loop".into(),
                    )
                    .in_statements());
                }
            }
        }
        Ok(last)
    }

    /// Drains everything `print` produced so far.
    pub fn take_output(&mut self) -> String {
        std::mem::take(&mut self.output)
    }

    /// Scope lookup from the outside, for hosts inspecting a finished run.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        self.scopes.lookup(name)
    }

    // ─── Statements ──────────────────────────────────────────────────────────

    fn exec_stmts(&mut self, stmts: &[Stmt]) -> Result<Completion, RuntimeError> {
        let mut last = None;
        for stmt in stmts {
            match self.exec_stmt(stmt)? {
                Completion::Normal(v) => last = v,
                other => return Ok(other),
            }
        }
        Ok(Completion::Normal(last))
    }

    fn exec_block(&mut self, stmts: &[Stmt]) -> Result<Completion, RuntimeError> {
        self.scopes.enter_block();
        let outcome = self.exec_stmts(stmts);
        self.scopes.exit_block();
        outcome
    }

    fn exec_stmt(&mut self, stmt: &Stmt) -> Result<Completion, RuntimeError> {
        match stmt {
            Stmt::VarDecl(decl) => {
                if !legal_ident(&decl.name) {
                    return Err(RuntimeError::IllegalIdentifier(decl.name.clone()));
                }
                let init = self.eval_expr(&decl.initializer)?;
                let bound = self.make_binding(decl.ty.as_ref(), &init, decl.is_const)?;
                self.scopes.declare(&decl.name, bound);
                Ok(Completion::Normal(None))
            }

            Stmt::FuncDecl(decl) => {
                let name = match &decl.name {
                    Some(n) => {
                        if !legal_ident(n) {
                            return Err(RuntimeError::IllegalIdentifier(n.clone()));
                        }
                        n.clone()
                    }
                    None => self.functions.next_anon_name(),
                };
                let (head, value) = self.function_value(decl, name);
                self.functions.declare(head, value)?;
                Ok(Completion::Normal(None))
            }

            Stmt::StructDecl(decl) => {
                self.exec_struct_decl(decl)?;
                Ok(Completion::Normal(None))
            }

            Stmt::EnumDecl(decl) => {
                self.exec_enum_decl(decl)?;
                Ok(Completion::Normal(None))
            }

            Stmt::Assign(assign) => {
                self.exec_assign(assign)?;
                Ok(Completion::Normal(None))
            }

            Stmt::If(stmt) => {
                let cond = self.eval_expr(&stmt.condition)?;
                if truthy(&cond)? {
                    self.exec_block(&stmt.then_block)
                } else if let Some(else_block) = &stmt.else_block {
                    self.exec_block(else_block)
                } else {
                    Ok(Completion::Normal(None))
                }
            }

            Stmt::While(stmt) => {
                loop {
                    let cond = self.eval_expr(&stmt.condition)?;
                    if !truthy(&cond)? {
                        break;
                    }
                    match self.exec_block(&stmt.body)? {
                        Completion::Breaking => break,
                        Completion::Returning(v) => return Ok(Completion::Returning(v)),
                        Completion::Normal(_) | Completion::Continuing => {}
                    }
                }
                Ok(Completion::Normal(None))
            }

            Stmt::RepeatWhile(stmt) => {
                loop {
                    match self.exec_block(&stmt.body)? {
                        Completion::Breaking => break,
                        Completion::Returning(v) => return Ok(Completion::Returning(v)),
                        Completion::Normal(_) | Completion::Continuing => {}
                    }
                    let cond = self.eval_expr(&stmt.condition)?;
                    if !truthy(&cond)? {
                        break;
                    }
                }
                Ok(Completion::Normal(None))
            }

            Stmt::ForIn(stmt) => self.exec_for_in(stmt),

            Stmt::Break(_) => Ok(Completion::Breaking),
            Stmt::Continue(_) => Ok(Completion::Continuing),

            Stmt::Return(expr, _) => {
                let value = match expr {
                    Some(e) => Some(self.eval_expr(e)?),
                    None => None,
                };
                Ok(Completion::Returning(value))
            }

            Stmt::Assert(expr, _) => {
                let v = self.eval_expr(expr)?;
                if truthy(&v)? {
                    Ok(Completion::Normal(None))
                } else {
                    Err(RuntimeError::AssertionFailed)
                }
            }

            Stmt::Expr(expr) => {
                let v = self.eval_expr(expr)?;
                Ok(Completion::Normal(Some(v)))
            }
        }
    }

    fn exec_for_in(&mut self, stmt: &ForInStmt) -> Result<Completion, RuntimeError> {
        let bind_name = match &stmt.pattern {
            Pattern::Name(n) => {
                if !legal_ident(n) {
                    return Err(RuntimeError::IllegalIdentifier(n.clone()));
                }
                Some(n.clone())
            }
            Pattern::Wildcard => None,
        };

        match &stmt.iterable {
            Expr::Range { lo, hi, step, kind, .. } => {
                let lo = self.range_bound(lo)?;
                let hi = self.range_bound(hi)?;
                let step = match step {
                    Some(e) => self.range_bound(e)?,
                    None => 1,
                };
                if step <= 0 {
                    return Err(RuntimeError::UnsupportedOperation(
                        "range step must be positive".into(),
                    ));
                }

                let mut current = lo;
                loop {
                    let done = match kind {
                        RangeKind::Until => current >= hi,
                        RangeKind::Through => current > hi,
                        RangeKind::DownUntil => current <= hi,
                        RangeKind::DownThrough => current < hi,
                    };
                    if done {
                        break;
                    }
                    let binding = bind_name
                        .as_deref()
                        .map(|n| (n, self.make(Content::Int(current))));
                    match self.run_loop_body(&stmt.body, binding)? {
                        Completion::Breaking => break,
                        Completion::Returning(v) => return Ok(Completion::Returning(v)),
                        Completion::Normal(_) | Completion::Continuing => {}
                    }
                    match kind {
                        RangeKind::Until | RangeKind::Through => current += step,
                        RangeKind::DownUntil | RangeKind::DownThrough => current -= step,
                    }
                }
                Ok(Completion::Normal(None))
            }

            other => {
                let seq = self.eval_expr(other)?;
                let items = match &seq.borrow().content {
                    Content::Array { items, .. } => items.clone(),
                    content => {
                        return Err(RuntimeError::UnsupportedOperation(format!(
                            "for-in over {}",
                            content.kind().name()
                        )));
                    }
                };
                // the loop variable aliases the element, so writes through it
                // land in the array
                for item in items {
                    let binding = bind_name.as_deref().map(|n| (n, item.clone()));
                    match self.run_loop_body(&stmt.body, binding)? {
                        Completion::Breaking => break,
                        Completion::Returning(v) => return Ok(Completion::Returning(v)),
                        Completion::Normal(_) | Completion::Continuing => {}
                    }
                }
                Ok(Completion::Normal(None))
            }
        }
    }

    /// One loop iteration: the binding lives in the body's block and vanishes
    /// with it.
    fn run_loop_body(
        &mut self,
        body: &[Stmt],
        binding: Option<(&str, Value)>,
    ) -> Result<Completion, RuntimeError> {
        self.scopes.enter_block();
        if let Some((name, value)) = binding {
            self.scopes.declare(name, value);
        }
        let outcome = self.exec_stmts(body);
        self.scopes.exit_block();
        outcome
    }

    fn range_bound(&mut self, expr: &Expr) -> Result<i64, RuntimeError> {
        let v = self.eval_expr(expr)?;
        v.as_int().ok_or_else(|| {
            RuntimeError::UnsupportedOperation("range bounds must be Int".into())
        })
    }

    // ─── Declarations ────────────────────────────────────────────────────────

    /// Builds the storage cell for a declaration: declared-type check, array
    /// element check, Int→Double promotion, then a detached deep copy with the
    /// requested mutability.
    fn make_binding(
        &self,
        declared: Option<&Type>,
        init: &Value,
        constant: bool,
    ) -> Result<Value, RuntimeError> {
        let mutability = if constant { Mutability::Const } else { Mutability::Var };
        let kind = init.kind();
        let declared = declared.map(DataType::from_annotation);

        if let Some(want) = &declared {
            if !declaration_fits(want, &kind) {
                return Err(match (want, &kind) {
                    (DataType::Array(_), DataType::Array(_)) => RuntimeError::ArrayTypeMismatch,
                    _ => RuntimeError::DeclarationType,
                });
            }
        }

        let copy = init.deep_copy_as(mutability);
        match &declared {
            Some(DataType::Double) if kind == DataType::Int => {
                let n = copy.as_int().unwrap_or(0);
                let mut lit = copy.borrow_mut();
                lit.content = Content::Double(n as f64);
                lit.proto = self.types.proto_for(&DataType::Double);
            }
            Some(DataType::Array(want_elem)) if **want_elem != DataType::Unresolved => {
                // an empty literal adopts the annotated element type
                if let Content::Array { elem, .. } = &mut copy.borrow_mut().content {
                    *elem = (**want_elem).clone();
                }
            }
            _ => {}
        }
        Ok(copy)
    }

    fn function_value(&mut self, decl: &FuncDecl, name: String) -> (FuncHead, Value) {
        let head = head_of(decl, name);
        let fv = FunctionValue {
            head: head.clone(),
            body: Rc::new(decl.body.clone()),
            captured: self.scopes.capture(),
        };
        let value = Value::new(
            Mutability::Const,
            self.types.proto_for(&DataType::Function),
            Content::Function(fv),
        );
        (head, value)
    }

    fn exec_struct_decl(&mut self, decl: &StructDecl) -> Result<(), RuntimeError> {
        if !legal_ident(&decl.name) {
            return Err(RuntimeError::IllegalIdentifier(decl.name.clone()));
        }
        let proto = Prototype::new(decl.name.clone());
        {
            let mut p = proto.borrow_mut();
            p.ctor = Some(Rc::new(decl.clone()));
        }
        for method in &decl.methods {
            let Some(name) = method.name.clone() else { continue };
            let (_, value) = self.function_value(method, name.clone());
            proto.borrow_mut().members.insert(name, value);
        }
        self.types.register(&decl.name, proto);
        Ok(())
    }

    /// Enum cases become constant Int members of a constant struct-shaped
    /// binding; auto raw values count up from the previous case.
    fn exec_enum_decl(&mut self, decl: &EnumDecl) -> Result<(), RuntimeError> {
        if !legal_ident(&decl.name) {
            return Err(RuntimeError::IllegalIdentifier(decl.name.clone()));
        }
        let proto = Prototype::new(decl.name.clone());
        let mut fields = IndexMap::new();
        let mut next_raw = 0i64;
        for (case, raw) in &decl.cases {
            let value = raw.unwrap_or(next_raw);
            next_raw = value + 1;
            fields.insert(
                case.clone(),
                Value::new(
                    Mutability::Const,
                    self.types.proto_for(&DataType::Int),
                    Content::Int(value),
                ),
            );
        }
        let binding = Value::new(Mutability::Const, proto.clone(), Content::Struct(fields));
        self.types.register(&decl.name, proto);
        self.scopes.declare(&decl.name, binding);
        Ok(())
    }

    // ─── Assignment ──────────────────────────────────────────────────────────

    fn exec_assign(&mut self, assign: &AssignStmt) -> Result<(), RuntimeError> {
        if !legal_ident(assign.target.root()) {
            return Err(RuntimeError::IllegalIdentifier(assign.target.root().to_string()));
        }
        let rhs = self.eval_expr(&assign.value)?;

        // `Type.prototype.member = value` extends a prototype in place
        if let Target::Member(base, member, _) = &assign.target {
            if let Some(proto) = self.prototype_target(base)? {
                if assign.op != AssignOp::Set {
                    return Err(RuntimeError::UnsupportedOperation(
                        "compound assignment to a prototype member".into(),
                    ));
                }
                proto
                    .borrow_mut()
                    .members
                    .insert(member.clone(), rhs.deep_copy_as(Mutability::Var));
                return Ok(());
            }
        }

        match &assign.target {
            Target::Name(name, _) => {
                let place = self
                    .scopes
                    .lookup(name)
                    .ok_or_else(|| RuntimeError::UndeclaredVariable(name.clone()))?;
                self.assign_into(&place, assign.op, &rhs)
            }

            Target::Member(base, field, _) => {
                let (container, frozen) = self.resolve_target(base)?;
                // a constant binding freezes its whole contents
                if frozen {
                    return Err(RuntimeError::ConstantMutation);
                }
                let existing = match &container.borrow().content {
                    Content::Struct(fields) => fields.get(field).cloned(),
                    _ => None,
                };
                match existing {
                    Some(slot) => self.assign_into(&slot, assign.op, &rhs),
                    None => {
                        let is_struct =
                            matches!(container.borrow().content, Content::Struct(_));
                        if !is_struct || assign.op != AssignOp::Set {
                            return Err(RuntimeError::NoSuchMember {
                                type_name: self.type_name_of(&container),
                                member: field.clone(),
                            });
                        }
                        let fresh = rhs.deep_copy_as(Mutability::Var);
                        if let Content::Struct(fields) = &mut container.borrow_mut().content {
                            fields.insert(field.clone(), fresh);
                        }
                        Ok(())
                    }
                }
            }

            Target::Index(base, index, _) => {
                let (container, frozen) = self.resolve_target(base)?;
                if frozen {
                    return Err(RuntimeError::ConstantMutation);
                }
                let slot = self.index_slot(&container, index)?;
                self.assign_into(&slot, assign.op, &rhs)
            }
        }
    }

    /// Recognizes `TypeName.prototype` as an assignment base. A scope binding
    /// with the same name wins over the type table.
    fn prototype_target(&self, base: &Target) -> Result<Option<ProtoRef>, RuntimeError> {
        let Target::Member(inner, member, _) = base else { return Ok(None) };
        if member != "prototype" {
            return Ok(None);
        }
        let Target::Name(type_name, _) = &**inner else { return Ok(None) };
        if self.scopes.lookup(type_name).is_some() {
            return Ok(None);
        }
        match self.types.by_name(type_name) {
            Some(proto) => Ok(Some(proto)),
            None => Err(RuntimeError::UndeclaredVariable(type_name.clone())),
        }
    }

    /// Resolves the storage place an assignment base names. The flag reports
    /// whether any cell along the chain is constant, so writes through a
    /// `let`-bound container fail no matter how mutable the leaf slot is.
    fn resolve_target(&mut self, target: &Target) -> Result<(Value, bool), RuntimeError> {
        match target {
            Target::Name(name, _) => {
                let v = self
                    .scopes
                    .lookup(name)
                    .ok_or_else(|| RuntimeError::UndeclaredVariable(name.clone()))?;
                let frozen = v.is_const();
                Ok((v, frozen))
            }
            Target::Member(base, field, _) => {
                let (container, frozen) = self.resolve_target(base)?;
                let own = match &container.borrow().content {
                    Content::Struct(fields) => fields.get(field).cloned(),
                    _ => None,
                };
                let slot = own
                    .or_else(|| lookup_member(&container.proto(), field))
                    .ok_or_else(|| RuntimeError::NoSuchMember {
                        type_name: self.type_name_of(&container),
                        member: field.clone(),
                    })?;
                let frozen = frozen || slot.is_const();
                Ok((slot, frozen))
            }
            Target::Index(base, index, _) => {
                let (container, frozen) = self.resolve_target(base)?;
                let slot = self.index_slot(&container, index)?;
                let frozen = frozen || slot.is_const();
                Ok((slot, frozen))
            }
        }
    }

    fn index_slot(&mut self, container: &Value, index: &Expr) -> Result<Value, RuntimeError> {
        let idx_v = self.eval_expr(index)?;
        let idx = idx_v.as_int().ok_or_else(|| {
            RuntimeError::UnsupportedOperation("subscript index must be Int".into())
        })?;
        match &container.borrow().content {
            Content::Array { items, .. } => {
                if idx < 0 || idx as usize >= items.len() {
                    return Err(RuntimeError::IndexOutOfBounds { index: idx, len: items.len() });
                }
                Ok(items[idx as usize].clone())
            }
            content => Err(RuntimeError::UnsupportedOperation(format!(
                "subscript on {}",
                content.kind().name()
            ))),
        }
    }

    /// Writes into an existing cell. Simple assignment replaces content after
    /// a kind check; compound assignment coerces a Bool right operand to 0/1,
    /// requires matching kinds, computes, and writes back.
    fn assign_into(
        &mut self,
        place: &Value,
        op: AssignOp,
        rhs: &Value,
    ) -> Result<(), RuntimeError> {
        if place.is_const() {
            return Err(RuntimeError::ConstantMutation);
        }
        match op {
            AssignOp::Set => {
                let lk = place.kind();
                let rk = rhs.kind();
                if !assignment_fits(&lk, &rk) {
                    return Err(match (&lk, &rk) {
                        (DataType::Array(_), DataType::Array(_)) => {
                            RuntimeError::ArrayTypeMismatch
                        }
                        _ => RuntimeError::AssignmentTypeMismatch,
                    });
                }
                if place.ptr_eq(rhs) {
                    return Ok(());
                }
                let (mut content, proto) = {
                    let b = rhs.borrow();
                    (b.content.deep_copy(), b.proto.clone())
                };
                // an empty rhs literal keeps the target's element type
                if let (DataType::Array(want), Content::Array { elem, .. }) = (&lk, &mut content)
                {
                    if *elem == DataType::Unresolved {
                        *elem = (**want).clone();
                    }
                }
                let mut lit = place.borrow_mut();
                lit.content = content;
                lit.proto = proto;
                Ok(())
            }

            compound => {
                let bin = match compound {
                    AssignOp::Add => BinOp::Add,
                    AssignOp::Sub => BinOp::Sub,
                    AssignOp::Mul => BinOp::Mul,
                    AssignOp::Div => BinOp::Div,
                    AssignOp::Mod => BinOp::Mod,
                    AssignOp::Set => return Ok(()),
                };
                let rhs_content = {
                    let b = rhs.borrow();
                    match &b.content {
                        Content::Bool(v) => Content::Int(*v as i64),
                        other => other.clone(),
                    }
                };
                let lk = place.kind();
                if lk == DataType::Str && bin != BinOp::Add {
                    return Err(RuntimeError::UnsupportedOperation(format!(
                        "`{}=` on String",
                        bin.symbol()
                    )));
                }
                if lk != rhs_content.kind() {
                    return Err(RuntimeError::AssignmentTypeMismatch);
                }
                let result = {
                    let b = place.borrow();
                    arith(bin, &b.content, &rhs_content)?
                };
                place.borrow_mut().content = result;
                Ok(())
            }
        }
    }

    // ─── Expressions ─────────────────────────────────────────────────────────

    fn eval_expr(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Int(n, _) => Ok(self.make(Content::Int(*n))),
            Expr::Double(v, _) => Ok(self.make(Content::Double(*v))),
            Expr::Bool(b, _) => Ok(self.make(Content::Bool(*b))),
            Expr::Char(c, _) => Ok(self.make(Content::Char(*c))),
            Expr::Str(s, _) => Ok(self.make(Content::Str(s.clone()))),

            Expr::Ident(name, _) => {
                if let Some(v) = self.scopes.lookup(name) {
                    return Ok(v);
                }
                if let Some(f) = self.functions.first_by_name(name) {
                    return Ok(f);
                }
                Err(RuntimeError::UndeclaredVariable(name.clone()))
            }

            Expr::Array(items, _) => {
                let mut vals = Vec::new();
                for item in items {
                    vals.push(self.eval_expr(item)?.deep_copy_as(Mutability::Var));
                }
                let elem = infer_elem(&vals)?;
                Ok(self.make(Content::Array { elem, items: vals }))
            }

            Expr::Binary { left, op, right, .. } => self.eval_binary(*op, left, right),

            Expr::Unary { op, operand, .. } => {
                let v = self.eval_expr(operand)?;
                match op {
                    UnOp::Not => Ok(self.make(Content::Bool(!truthy(&v)?))),
                    UnOp::Neg => {
                        let content = match &v.borrow().content {
                            Content::Int(n) => Content::Int(-n),
                            Content::Double(f) => Content::Double(-f),
                            Content::Bool(b) => Content::Int(-(*b as i64)),
                            other => {
                                return Err(RuntimeError::UnsupportedOperation(format!(
                                    "negation of {}",
                                    other.kind().name()
                                )));
                            }
                        };
                        Ok(self.make(content))
                    }
                }
            }

            Expr::Range { .. } => Err(RuntimeError::UnsupportedOperation(
                "range used outside of a for-in loop".into(),
            )),

            Expr::Call { callee, args, .. } => self.eval_call(callee, args),

            Expr::MethodCall { recv, method, args, .. } => {
                self.eval_method_call(recv, method, args)
            }

            Expr::Member { recv, name, .. } => {
                let v = self.eval_expr(recv)?;
                if let Content::Struct(fields) = &v.borrow().content {
                    if let Some(f) = fields.get(name) {
                        return Ok(f.clone());
                    }
                }
                if let Some(m) = lookup_member(&v.proto(), name) {
                    return Ok(m);
                }
                Err(RuntimeError::NoSuchMember {
                    type_name: self.type_name_of(&v),
                    member: name.clone(),
                })
            }

            Expr::Index { recv, index, .. } => {
                let base = self.eval_expr(recv)?;
                let is_string = matches!(base.borrow().content, Content::Str(_));
                if is_string {
                    let idx_v = self.eval_expr(index)?;
                    let idx = idx_v.as_int().ok_or_else(|| {
                        RuntimeError::UnsupportedOperation("subscript index must be Int".into())
                    })?;
                    let chars: Vec<char> = match &base.borrow().content {
                        Content::Str(s) => s.chars().collect(),
                        _ => Vec::new(),
                    };
                    if idx < 0 || idx as usize >= chars.len() {
                        return Err(RuntimeError::IndexOutOfBounds {
                            index: idx,
                            len: chars.len(),
                        });
                    }
                    return Ok(self.make(Content::Char(chars[idx as usize])));
                }
                self.index_slot(&base, index)
            }

            Expr::Func(decl) => {
                let name = self.functions.next_anon_name();
                let (_, value) = self.function_value(decl, name);
                Ok(value)
            }
        }
    }

    fn eval_binary(&mut self, op: BinOp, left: &Expr, right: &Expr) -> Result<Value, RuntimeError> {
        match op {
            BinOp::And | BinOp::Or => {
                let lv = self.eval_expr(left)?;
                let lb = truthy(&lv)?;
                if op == BinOp::And && !lb {
                    return Ok(self.make(Content::Bool(false)));
                }
                if op == BinOp::Or && lb {
                    return Ok(self.make(Content::Bool(true)));
                }
                let rv = self.eval_expr(right)?;
                let rb = truthy(&rv)?;
                Ok(self.make(Content::Bool(rb)))
            }

            BinOp::Eq | BinOp::NotEq => {
                let lv = self.eval_expr(left)?;
                let rv = self.eval_expr(right)?;
                let eq = equal_values(&lv, &rv);
                Ok(self.make(Content::Bool(if op == BinOp::Eq { eq } else { !eq })))
            }

            BinOp::Lt | BinOp::LtEq | BinOp::Gt | BinOp::GtEq => {
                let lv = self.eval_expr(left)?;
                let rv = self.eval_expr(right)?;
                let (Some(a), Some(b)) = (lv.as_f64(), rv.as_f64()) else {
                    return Err(RuntimeError::UnsupportedOperation(format!(
                        "`{}` between {} and {}",
                        op.symbol(),
                        lv.kind().name(),
                        rv.kind().name()
                    )));
                };
                let out = match op {
                    BinOp::Lt => a < b,
                    BinOp::LtEq => a <= b,
                    BinOp::Gt => a > b,
                    _ => a >= b,
                };
                Ok(self.make(Content::Bool(out)))
            }

            _ => {
                let lv = self.eval_expr(left)?;
                let rv = self.eval_expr(right)?;
                let content = {
                    let (lb, rb) = (lv.borrow(), rv.borrow());
                    arith(op, &lb.content, &rb.content)?
                };
                Ok(self.make(content))
            }
        }
    }

    // ─── Calls ───────────────────────────────────────────────────────────────

    fn eval_call(&mut self, callee: &str, args: &[Arg]) -> Result<Value, RuntimeError> {
        if callee == "print" {
            let mut parts = Vec::new();
            for arg in args {
                parts.push(self.eval_expr(&arg.value)?.render());
            }
            self.output.push_str(&parts.join(" "));
            self.output.push('\n');
            return Ok(self.void());
        }

        // world intrinsics resolve ahead of any user binding
        if let Some(v) = self.try_world_intrinsic(callee, args)? {
            return Ok(v);
        }

        let mut arg_vals = Vec::new();
        for arg in args {
            arg_vals.push(self.eval_expr(&arg.value)?);
        }
        let kinds: Vec<DataType> = arg_vals.iter().map(Value::kind).collect();

        match self.functions.resolve(callee, &kinds) {
            Ok(func) => self.call_function(&func, &arg_vals, None),
            Err(RuntimeError::UndeclaredVariable(_)) => {
                if let Some(v) = self.scopes.lookup(callee) {
                    if v.kind() == DataType::Function {
                        self.call_function(&v, &arg_vals, None)
                    } else {
                        Err(RuntimeError::NotCallable(callee.to_string()))
                    }
                } else if let Some(proto) = self.types.by_name(callee) {
                    self.construct_struct(&proto, args, &arg_vals)
                } else {
                    Err(RuntimeError::UndeclaredVariable(callee.to_string()))
                }
            }
            Err(e) => Err(e),
        }
    }

    fn call_function(
        &mut self,
        func: &Value,
        args: &[Value],
        receiver: Option<&Value>,
    ) -> Result<Value, RuntimeError> {
        let fv = match &func.borrow().content {
            Content::Function(f) => f.clone(),
            content => return Err(RuntimeError::NotCallable(content.kind().name())),
        };
        if args.len() != fv.head.types.len() {
            return Err(RuntimeError::ArityMismatch {
                name: fv.head.name.clone(),
                expected: fv.head.types.len(),
                got: args.len(),
            });
        }

        let mut activation = Activation::new(fv.captured.clone());
        if let Some(recv) = receiver {
            // methods see their receiver as a by-ref `self`
            activation.declare("self", recv.clone());
        }
        for (i, arg) in args.iter().enumerate() {
            let pty = &fv.head.types[i];
            if !param_accepts(pty, &arg.kind()) {
                return Err(RuntimeError::DeclarationType);
            }
            let bound = if fv.head.refs[i] {
                arg.clone()
            } else {
                let copy = arg.deep_copy_as(Mutability::Const);
                if *pty == DataType::Double && arg.kind() == DataType::Int {
                    let n = copy.as_int().unwrap_or(0);
                    let mut lit = copy.borrow_mut();
                    lit.content = Content::Double(n as f64);
                    lit.proto = self.types.proto_for(&DataType::Double);
                }
                copy
            };
            activation.declare(&fv.head.params[i], bound);
        }

        self.scopes.push_activation(activation);
        let outcome = self.exec_stmts(&fv.body);
        self.scopes.pop_activation();

        match outcome? {
            Completion::Returning(v) => Ok(v.unwrap_or_else(|| self.void())),
            Completion::Normal(_) => Ok(self.void()),
            Completion::Breaking | Completion::Continuing => {
                Err(RuntimeError::UnsupportedOperation(
                    "break or continue crossed a function boundary".into(),
                ))
            }
        }
    }

    fn eval_method_call(
        &mut self,
        recv: &Expr,
        method: &str,
        args: &[Arg],
    ) -> Result<Value, RuntimeError> {
        let recv_v = self.eval_expr(recv)?;
        let mut arg_vals = Vec::new();
        for arg in args {
            arg_vals.push(self.eval_expr(&arg.value)?);
        }

        // own field first
        let own = match &recv_v.borrow().content {
            Content::Struct(fields) => fields.get(method).cloned(),
            _ => None,
        };
        if let Some(member) = own {
            return if member.kind() == DataType::Function {
                self.call_function(&member, &arg_vals, Some(&recv_v))
            } else {
                Err(RuntimeError::NotCallable(method.to_string()))
            };
        }

        // then the prototype chain
        if let Some(member) = lookup_member(&recv_v.proto(), method) {
            return if member.kind() == DataType::Function {
                self.call_function(&member, &arg_vals, Some(&recv_v))
            } else {
                Err(RuntimeError::NotCallable(method.to_string()))
            };
        }

        // higher-order array methods call back into the evaluator
        if matches!(recv_v.kind(), DataType::Array(_)) && ARRAY_HOFS.contains(&method) {
            return self.eval_hof(&recv_v, method, &arg_vals);
        }

        if let Some(v) = builtins::dispatch(&self.types, &recv_v, method, &arg_vals)? {
            return Ok(v);
        }

        Err(RuntimeError::NoSuchMember {
            type_name: self.type_name_of(&recv_v),
            member: method.to_string(),
        })
    }

    fn eval_hof(
        &mut self,
        recv: &Value,
        method: &str,
        args: &[Value],
    ) -> Result<Value, RuntimeError> {
        if args.len() != 1 {
            return Err(RuntimeError::ArityMismatch {
                name: method.to_string(),
                expected: 1,
                got: args.len(),
            });
        }
        let func = &args[0];
        if func.kind() != DataType::Function {
            return Err(RuntimeError::NotCallable(method.to_string()));
        }
        let (elem, items) = match &recv.borrow().content {
            Content::Array { elem, items } => (elem.clone(), items.clone()),
            content => {
                return Err(RuntimeError::UnsupportedOperation(format!(
                    "`{method}` on {}",
                    content.kind().name()
                )));
            }
        };

        match method {
            "foreach" => {
                for item in &items {
                    self.call_function(func, std::slice::from_ref(item), None)?;
                }
                Ok(self.void())
            }
            "map" => {
                let mut out = Vec::new();
                for item in &items {
                    out.push(self.call_function(func, std::slice::from_ref(item), None)?);
                }
                let elem = infer_elem(&out)?;
                Ok(self.make(Content::Array { elem, items: out }))
            }
            "filter" => {
                let mut kept = Vec::new();
                for item in &items {
                    let verdict = self.call_function(func, std::slice::from_ref(item), None)?;
                    if truthy(&verdict)? {
                        kept.push(item.deep_copy_as(item.mutability()));
                    }
                }
                Ok(self.make(Content::Array { elem, items: kept }))
            }
            "all" | "any" => {
                let mut result = method == "all";
                for item in &items {
                    let verdict = self.call_function(func, std::slice::from_ref(item), None)?;
                    let hit = truthy(&verdict)?;
                    if method == "all" && !hit {
                        result = false;
                        break;
                    }
                    if method == "any" && hit {
                        result = true;
                        break;
                    }
                }
                Ok(self.make(Content::Bool(result)))
            }
            _ => Err(RuntimeError::NoSuchMember {
                type_name: recv.kind().name(),
                member: method.to_string(),
            }),
        }
    }

    /// Instantiates a struct: labeled arguments override the named fields,
    /// positional arguments fill the rest in declaration order, and remaining
    /// fields re-evaluate their declared initializers.
    fn construct_struct(
        &mut self,
        proto: &ProtoRef,
        args: &[Arg],
        vals: &[Value],
    ) -> Result<Value, RuntimeError> {
        let (name, decl) = {
            let p = proto.borrow();
            (p.name.clone(), p.ctor.clone())
        };
        let decl = decl.ok_or_else(|| RuntimeError::NotCallable(name.clone()))?;

        let mut by_label: HashMap<String, Value> = HashMap::new();
        let mut positional: Vec<Value> = Vec::new();
        for (arg, val) in args.iter().zip(vals) {
            match &arg.label {
                Some(label) => {
                    by_label.insert(label.clone(), val.clone());
                }
                None => positional.push(val.clone()),
            }
        }
        if positional.len() > decl.fields.len() {
            return Err(RuntimeError::ArityMismatch {
                name,
                expected: decl.fields.len(),
                got: vals.len(),
            });
        }
        let mut positional = positional.into_iter();

        let mut fields = IndexMap::new();
        for field in &decl.fields {
            let init = if let Some(v) = by_label.remove(&field.name) {
                v
            } else if let Some(v) = positional.next() {
                v
            } else {
                self.eval_expr(&field.initializer)?
            };
            let bound = self.make_binding(field.ty.as_ref(), &init, field.is_const)?;
            fields.insert(field.name.clone(), bound);
        }
        if let Some(stray) = by_label.keys().next() {
            return Err(RuntimeError::NoSuchMember {
                type_name: name,
                member: stray.clone(),
            });
        }
        Ok(Value::new(Mutability::Var, proto.clone(), Content::Struct(fields)))
    }

    fn try_world_intrinsic(
        &mut self,
        name: &str,
        args: &[Arg],
    ) -> Result<Option<Value>, RuntimeError> {
        let query = WORLD_QUERIES.contains(&name);
        let command = WORLD_COMMANDS.contains(&name);
        if !query && !command {
            return Ok(None);
        }
        if !args.is_empty() {
            return Err(RuntimeError::ArityMismatch {
                name: name.to_string(),
                expected: 0,
                got: args.len(),
            });
        }
        let id = self.world.borrow().first_id();
        let Some(id) = id else {
            let v = if name == "collectedGem" {
                self.make(Content::Int(0))
            } else {
                self.make(Content::Bool(false))
            };
            return Ok(Some(v));
        };

        let content = if query {
            let world = self.world.borrow();
            match name {
                "isOnGem" => Content::Bool(world.is_on_gem(id)),
                "isOnOpenedSwitch" => Content::Bool(world.is_on_opened_switch(id)),
                "isOnClosedSwitch" => Content::Bool(world.is_on_closed_switch(id)),
                "isBlocked" => Content::Bool(world.is_blocked(id)),
                "isBlockedLeft" => Content::Bool(world.is_blocked_left(id)),
                "isBlockedRight" => Content::Bool(world.is_blocked_right(id)),
                "collectedGem" => Content::Int(world.collected_gem(id)),
                _ => return Ok(None),
            }
        } else {
            let mut world = self.world.borrow_mut();
            match name {
                "moveForward" => Content::Bool(world.move_forward(id)),
                "turnLeft" => Content::Bool(world.turn_left(id)),
                "collectGem" => Content::Bool(world.collect_gem(id)),
                "toggleSwitch" => Content::Bool(world.toggle_switch(id)),
                "takeBeeper" => Content::Bool(world.take_beeper(id)),
                "dropBeeper" => Content::Bool(world.drop_beeper(id)),
                "turnLockUp" => Content::Bool(world.turn_lock_up(id)),
                "turnLockDown" => Content::Bool(world.turn_lock_down(id)),
                _ => return Ok(None),
            }
        };
        Ok(Some(self.make(content)))
    }

    // ─── Helpers ─────────────────────────────────────────────────────────────

    fn make(&self, content: Content) -> Value {
        let proto = self.types.proto_for(&content.kind());
        Value::new(Mutability::Var, proto, content)
    }

    fn void(&self) -> Value {
        self.make(Content::Void)
    }

    fn type_name_of(&self, v: &Value) -> String {
        match v.kind() {
            DataType::Struct => v.proto().borrow().name.clone(),
            kind => kind.name(),
        }
    }
}

// ─── Free helpers ────────────────────────────────────────────────────────────

fn head_of(decl: &FuncDecl, name: String) -> FuncHead {
    FuncHead {
        name,
        params: decl.params.iter().map(|p| p.name.clone()).collect(),
        types: decl.params.iter().map(|p| DataType::from_annotation(&p.ty)).collect(),
        refs: decl.params.iter().map(|p| p.by_ref).collect(),
        ret: decl
            .return_ty
            .as_ref()
            .map(DataType::from_annotation)
            .unwrap_or(DataType::Void),
    }
}

fn legal_ident(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}

fn declaration_fits(want: &DataType, actual: &DataType) -> bool {
    match (want, actual) {
        (DataType::Unresolved, _) => true,
        (DataType::Double, DataType::Int) => true,
        (DataType::Enum, DataType::Struct) => true,
        (DataType::Array(w), DataType::Array(a)) => {
            **w == DataType::Unresolved || **a == DataType::Unresolved || w == a
        }
        _ => want == actual,
    }
}

fn assignment_fits(lhs: &DataType, rhs: &DataType) -> bool {
    match (lhs, rhs) {
        (DataType::Array(l), DataType::Array(r)) => **r == DataType::Unresolved || l == r,
        _ => lhs == rhs,
    }
}

/// Truth test with numeric coercion: Bool as itself, Int/Double by zero test.
fn truthy(v: &Value) -> Result<bool, RuntimeError> {
    match &v.borrow().content {
        Content::Bool(b) => Ok(*b),
        Content::Int(n) => Ok(*n != 0),
        Content::Double(f) => Ok(*f != 0.0),
        other => Err(RuntimeError::UnsupportedOperation(format!(
            "truth test on {}",
            other.kind().name()
        ))),
    }
}

fn infer_elem(items: &[Value]) -> Result<DataType, RuntimeError> {
    let mut elem = DataType::Unresolved;
    for item in items {
        let kind = item.kind();
        if elem == DataType::Unresolved {
            elem = kind;
        } else if kind != elem {
            return Err(RuntimeError::ArrayTypeInference);
        }
    }
    Ok(elem)
}

/// Structural equality. Always produces a fresh verdict; operands are never
/// touched. A Bool against an Int or Double compares against the number's
/// zero test; Int against Double compares by value; functions compare by
/// full signature.
fn equal_values(a: &Value, b: &Value) -> bool {
    if a.ptr_eq(b) {
        return true;
    }
    let (ab, bb) = (a.borrow(), b.borrow());
    equal_contents(&ab.content, &bb.content)
}

fn equal_contents(a: &Content, b: &Content) -> bool {
    match (a, b) {
        (Content::Int(x), Content::Int(y)) => x == y,
        (Content::Char(x), Content::Char(y)) => x == y,
        (Content::Str(x), Content::Str(y)) => x == y,
        (Content::Void, Content::Void) => true,
        (Content::Array { items: x, .. }, Content::Array { items: y, .. }) => {
            x.len() == y.len() && x.iter().zip(y).all(|(i, j)| equal_values(i, j))
        }
        (Content::Struct(x), Content::Struct(y)) => {
            x.len() == y.len()
                && x.iter().all(|(k, v)| y.get(k).is_some_and(|w| equal_values(v, w)))
        }
        (Content::Function(f), Content::Function(g)) => f.head == g.head,
        (Content::Bool(b), other) if other.kind().is_numeric() => (num_of(other) != 0.0) == *b,
        (other, Content::Bool(b)) if other.kind().is_numeric() => (num_of(other) != 0.0) == *b,
        (x, y) if x.kind().is_numeric() && y.kind().is_numeric() => num_of(x) == num_of(y),
        _ => false,
    }
}

fn num_of(c: &Content) -> f64 {
    match c {
        Content::Int(n) => *n as f64,
        Content::Double(f) => *f,
        Content::Bool(b) => *b as i64 as f64,
        _ => f64::NAN,
    }
}

/// Arithmetic and exponentiation. Bool operands count as 0/1; a Double on
/// either side makes the result Double; Int division truncates and Int
/// division by zero is a native arithmetic fault.
fn arith(op: BinOp, l: &Content, r: &Content) -> Result<Content, RuntimeError> {
    if op == BinOp::Add {
        match (l, r) {
            (Content::Str(a), Content::Str(b)) => return Ok(Content::Str(format!("{a}{b}"))),
            (Content::Str(a), Content::Char(b)) => return Ok(Content::Str(format!("{a}{b}"))),
            (Content::Char(a), Content::Str(b)) => return Ok(Content::Str(format!("{a}{b}"))),
            (Content::Char(a), Content::Char(b)) => return Ok(Content::Str(format!("{a}{b}"))),
            _ => {}
        }
    }

    let unsupported = || {
        RuntimeError::UnsupportedOperation(format!(
            "`{}` between {} and {}",
            op.symbol(),
            l.kind().name(),
            r.kind().name()
        ))
    };

    let as_int = |c: &Content| match c {
        Content::Int(n) => Some(*n),
        Content::Bool(b) => Some(*b as i64),
        _ => None,
    };

    if let (Some(a), Some(b)) = (as_int(l), as_int(r)) {
        let out = match op {
            BinOp::Add => Content::Int(a + b),
            BinOp::Sub => Content::Int(a - b),
            BinOp::Mul => Content::Int(a * b),
            BinOp::Div => Content::Int(a / b),
            BinOp::Mod => Content::Int(a % b),
            BinOp::Pow => {
                if b >= 0 {
                    Content::Int(a.pow(b as u32))
                } else {
                    Content::Double((a as f64).powi(b as i32))
                }
            }
            _ => return Err(unsupported()),
        };
        return Ok(out);
    }

    let as_f64 = |c: &Content| match c {
        Content::Int(n) => Some(*n as f64),
        Content::Double(f) => Some(*f),
        Content::Bool(b) => Some(*b as i64 as f64),
        _ => None,
    };

    match (as_f64(l), as_f64(r)) {
        (Some(a), Some(b)) => {
            let out = match op {
                BinOp::Add => a + b,
                BinOp::Sub => a - b,
                BinOp::Mul => a * b,
                BinOp::Div => a / b,
                BinOp::Mod => a % b,
                BinOp::Pow => a.powf(b),
                _ => return Err(unsupported()),
            };
            Ok(Content::Double(out))
        }
        _ => Err(unsupported()),
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
