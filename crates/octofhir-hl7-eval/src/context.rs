//! Evaluation context for a single message conversion

use indexmap::IndexMap;
use octofhir_hl7_types::{EvaluationResult, Value};
use std::collections::HashMap;

/// Default maximum template nesting depth
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Position in the resource bookkeeping of a context
///
/// Taken before evaluating a composite; restoring it forgets the resources,
/// references and ids issued since.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    referenced: usize,
    references: usize,
    next_id: usize,
}

/// Evaluation context for mapping expressions
///
/// One context lives for exactly one message conversion. It holds the named
/// results produced so far (variables and expression results), which later
/// expressions read through `$name` references and conditions.
#[derive(Debug, Clone)]
pub struct EvaluationContext {
    /// Named results visible to later evaluation steps
    locals: HashMap<String, EvaluationResult>,
    /// Resources produced by reference expressions, in creation order
    referenced: Vec<Value>,
    /// Reference strings already issued, keyed by template and source
    references: IndexMap<String, String>,
    /// Sequence for generated resource ids
    next_id: usize,
    /// Current template nesting depth
    depth: usize,
    max_depth: usize,
}

impl Default for EvaluationContext {
    fn default() -> Self {
        Self::new()
    }
}

impl EvaluationContext {
    /// Create a new empty context
    pub fn new() -> Self {
        Self::with_max_depth(DEFAULT_MAX_DEPTH)
    }

    /// Create a context with a custom nesting limit
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            locals: HashMap::new(),
            referenced: Vec::new(),
            references: IndexMap::new(),
            next_id: 0,
            depth: 0,
            max_depth,
        }
    }

    /// Set a named result, replacing any earlier value
    pub fn set_local(&mut self, name: &str, value: EvaluationResult) {
        self.locals.insert(normalize_name(name).to_string(), value);
    }

    /// Get a named result
    pub fn get_local(&self, name: &str) -> Option<&EvaluationResult> {
        self.locals.get(normalize_name(name))
    }

    /// True when the name is bound, even to `Empty`
    pub fn has_local(&self, name: &str) -> bool {
        self.locals.contains_key(normalize_name(name))
    }

    /// Bind a value under a name, with `Empty` for an absent value
    pub fn bind(&mut self, name: &str, value: Option<&EvaluationResult>) {
        self.set_local(name, value.cloned().unwrap_or_default());
    }

    /// Enter a nested template; false once the depth limit is reached
    pub fn enter_recursion(&mut self) -> bool {
        if self.depth >= self.max_depth {
            return false;
        }
        self.depth += 1;
        true
    }

    /// Leave a nested template
    pub fn exit_recursion(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Next generated resource id (1-based, unique per conversion)
    pub fn next_resource_id(&mut self) -> String {
        self.next_id += 1;
        self.next_id.to_string()
    }

    /// Record a resource created through a reference expression
    pub fn add_referenced_resource(&mut self, resource: Value) {
        self.referenced.push(resource);
    }

    /// Reference previously issued for the same key
    pub fn cached_reference(&self, key: &str) -> Option<&str> {
        self.references.get(key).map(String::as_str)
    }

    pub fn cache_reference(&mut self, key: impl Into<String>, reference: impl Into<String>) {
        self.references.insert(key.into(), reference.into());
    }

    pub fn referenced_resources(&self) -> &[Value] {
        &self.referenced
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            referenced: self.referenced.len(),
            references: self.references.len(),
            next_id: self.next_id,
        }
    }

    /// Drop everything issued after `checkpoint`
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        self.referenced.truncate(checkpoint.referenced);
        self.references.truncate(checkpoint.references);
        self.next_id = checkpoint.next_id;
    }

    /// Drain the referenced resources collected so far
    pub fn take_referenced_resources(&mut self) -> Vec<Value> {
        std::mem::take(&mut self.referenced)
    }
}

/// Key under which a reference to `template` evaluated over `base` is cached
///
/// Raw HL7 values render in their canonical encoding, so the key does not
/// depend on the delimiters a message declares.
pub fn reference_key(template: &str, base: &Value) -> String {
    format!("{}#{}", template, base)
}

/// Canonical form of a variable name: without the `$` sigil and surrounding blanks
pub fn normalize_name(name: &str) -> &str {
    let trimmed = name.trim();
    trimmed.strip_prefix('$').unwrap_or(trimmed).trim()
}
