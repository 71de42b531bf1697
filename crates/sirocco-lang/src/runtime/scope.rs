use std::collections::HashMap;

use crate::runtime::value::Value;

// ─── Global scope ────────────────────────────────────────────────────────────

/// The top-level scope: one flat name table plus a parallel name→depth map.
/// Entering a block bumps the depth; leaving it prunes every binding declared
/// at or below the departed depth.
#[derive(Debug, Default)]
pub struct GlobalScope {
    table: HashMap<String, Value>,
    depth_of: HashMap<String, usize>,
    depth: usize,
}

impl GlobalScope {
    fn declare(&mut self, name: &str, value: Value) {
        self.table.insert(name.to_string(), value);
        self.depth_of.insert(name.to_string(), self.depth);
    }

    fn lookup(&self, name: &str) -> Option<Value> {
        self.table.get(name).cloned()
    }

    fn enter(&mut self) {
        self.depth += 1;
    }

    fn exit(&mut self) {
        let departing = self.depth;
        let doomed: Vec<String> = self
            .depth_of
            .iter()
            .filter(|(_, d)| **d >= departing)
            .map(|(n, _)| n.clone())
            .collect();
        for name in doomed {
            self.table.remove(&name);
            self.depth_of.remove(&name);
        }
        self.depth = self.depth.saturating_sub(1);
    }
}

// ─── Function activations ────────────────────────────────────────────────────

/// One function call's local scope: captured closure frames (shared handles),
/// then the parameter frame, then one frame per entered block.
#[derive(Debug)]
pub struct Activation {
    frames: Vec<HashMap<String, Value>>,
}

impl Activation {
    /// Builds an activation whose outer frames are the closure captures; the
    /// final pushed frame receives the parameters.
    pub fn new(captured: Vec<HashMap<String, Value>>) -> Self {
        let mut frames = captured;
        frames.push(HashMap::new());
        Self { frames }
    }

    pub fn declare(&mut self, name: &str, value: Value) {
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name.to_string(), value);
        }
    }

    fn lookup(&self, name: &str) -> Option<Value> {
        self.frames.iter().rev().find_map(|f| f.get(name).cloned())
    }

    fn push_frame(&mut self) {
        self.frames.push(HashMap::new());
    }

    fn pop_frame(&mut self) {
        self.frames.pop();
    }

    fn frames_snapshot(&self) -> Vec<HashMap<String, Value>> {
        self.frames.clone()
    }
}

// ─── Combined view ───────────────────────────────────────────────────────────

/// Scope resolution as the evaluator sees it: the innermost activation's
/// frames first, then the global table. No activation means plain global
/// block-depth tracking.
#[derive(Debug, Default)]
pub struct Scopes {
    globals: GlobalScope,
    activations: Vec<Activation>,
}

impl Scopes {
    pub fn declare(&mut self, name: &str, value: Value) {
        match self.activations.last_mut() {
            Some(act) => act.declare(name, value),
            None => self.globals.declare(name, value),
        }
    }

    pub fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(act) = self.activations.last() {
            if let Some(v) = act.lookup(name) {
                return Some(v);
            }
        }
        self.globals.lookup(name)
    }

    pub fn enter_block(&mut self) {
        match self.activations.last_mut() {
            Some(act) => act.push_frame(),
            None => self.globals.enter(),
        }
    }

    pub fn exit_block(&mut self) {
        match self.activations.last_mut() {
            Some(act) => act.pop_frame(),
            None => self.globals.exit(),
        }
    }

    pub fn push_activation(&mut self, activation: Activation) {
        self.activations.push(activation);
    }

    pub fn pop_activation(&mut self) {
        self.activations.pop();
    }

    /// The current activation's frames, cloned for closure capture. Handles
    /// are shared, so captured bindings stay live after the activation pops.
    pub fn capture(&self) -> Vec<HashMap<String, Value>> {
        self.activations
            .last()
            .map(Activation::frames_snapshot)
            .unwrap_or_default()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::prototype::TypeTable;
    use crate::runtime::value::{Content, DataType, Mutability};

    fn val(n: i64) -> Value {
        let types = TypeTable::new();
        Value::new(Mutability::Var, types.proto_for(&DataType::Int), Content::Int(n))
    }

    #[test]
    fn block_exit_prunes_inner_globals() {
        let mut scopes = Scopes::default();
        scopes.declare("outer", val(1));
        scopes.enter_block();
        scopes.declare("inner", val(2));
        assert!(scopes.lookup("inner").is_some());
        scopes.exit_block();
        assert!(scopes.lookup("inner").is_none());
        assert!(scopes.lookup("outer").is_some());
    }

    #[test]
    fn activation_hides_nothing_global() {
        let mut scopes = Scopes::default();
        scopes.declare("g", val(10));
        scopes.push_activation(Activation::new(Vec::new()));
        scopes.declare("local", val(1));
        assert_eq!(scopes.lookup("g").unwrap().as_int(), Some(10));
        assert_eq!(scopes.lookup("local").unwrap().as_int(), Some(1));
        scopes.pop_activation();
        assert!(scopes.lookup("local").is_none());
    }

    #[test]
    fn inner_frame_shadows_outer_frame() {
        let mut scopes = Scopes::default();
        scopes.push_activation(Activation::new(Vec::new()));
        scopes.declare("x", val(1));
        scopes.enter_block();
        scopes.declare("x", val(2));
        assert_eq!(scopes.lookup("x").unwrap().as_int(), Some(2));
        scopes.exit_block();
        assert_eq!(scopes.lookup("x").unwrap().as_int(), Some(1));
    }

    #[test]
    fn captured_frames_alias_live_bindings() {
        let mut scopes = Scopes::default();
        scopes.push_activation(Activation::new(Vec::new()));
        let cell = val(5);
        scopes.declare("captured", cell.clone());
        let frames = scopes.capture();
        scopes.pop_activation();

        cell.borrow_mut().content = Content::Int(6);
        let seen = frames[0].get("captured").unwrap();
        assert_eq!(seen.as_int(), Some(6));
    }
}
