use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::evaluator::Value;

/// A frame of name bindings with an optional enclosing frame. Cloning
/// is shallow: clones share the same frame, which is what closure
/// capture relies on.
#[derive(Debug, Clone)]
pub struct Environment {
    inner: Rc<RefCell<Frame>>,
}

#[derive(Debug)]
struct Frame {
    bindings: HashMap<String, Value>,
    parent: Option<Environment>,
}

impl Environment {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Frame {
                bindings: HashMap::new(),
                parent: None,
            })),
        }
    }

    pub fn new_enclosed(parent: Environment) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Frame {
                bindings: HashMap::new(),
                parent: Some(parent),
            })),
        }
    }

    /// Binds `name` in this frame only, shadowing any outer binding.
    pub fn define(&self, name: impl Into<String>, value: Value) {
        self.inner.borrow_mut().bindings.insert(name.into(), value);
    }

    /// Looks `name` up along the chain, innermost frame first.
    pub fn get(&self, name: &str) -> Option<Value> {
        let parent = {
            let frame = self.inner.borrow();
            if let Some(value) = frame.bindings.get(name) {
                return Some(value.clone());
            }
            frame.parent.clone()
        };

        parent.and_then(|scope| scope.get(name))
    }

    /// Overwrites `name` in the nearest frame that already binds it.
    /// Returns false when no frame does; this never creates a binding.
    pub fn update(&self, name: &str, value: &Value) -> bool {
        let parent = {
            let mut frame = self.inner.borrow_mut();
            if frame.bindings.contains_key(name) {
                frame.bindings.insert(name.to_string(), value.clone());
                return true;
            }
            frame.parent.clone()
        };

        parent.is_some_and(|scope| scope.update(name, value))
    }

    pub fn is_defined(&self, name: &str) -> bool {
        let parent = {
            let frame = self.inner.borrow();
            if frame.bindings.contains_key(name) {
                return true;
            }
            frame.parent.clone()
        };

        parent.is_some_and(|scope| scope.is_defined(name))
    }

    /// Every name visible from this frame, deduped and sorted.
    pub fn visible_names(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut names = Vec::new();
        self.collect_visible_names(&mut seen, &mut names);
        names.sort();
        names
    }

    fn collect_visible_names(&self, seen: &mut HashSet<String>, names: &mut Vec<String>) {
        let parent = {
            let frame = self.inner.borrow();
            for name in frame.bindings.keys() {
                if seen.insert(name.clone()) {
                    names.push(name.clone());
                }
            }
            frame.parent.clone()
        };

        if let Some(parent) = parent {
            parent.collect_visible_names(seen, names);
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
