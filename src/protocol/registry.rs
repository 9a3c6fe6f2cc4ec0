//! Per-session action registry
//!
//! Maps action names to the descriptor a game registered. Owned by exactly one
//! session and never shared, so there is no locking here.

use std::collections::HashMap;

use crate::logging::LogSink;
use crate::protocol::packet::ActionDescriptor;
use crate::protocol::schema_guard::{self, CompiledSchema, SchemaError};

/// What happened to one descriptor passed to [`ActionRegistry::register_all`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// Inserted. `forbidden_keys` lists unsupported schema keywords that were
    /// flagged but tolerated.
    Registered {
        name: String,
        forbidden_keys: Vec<String>,
    },
    /// Name already present; the existing entry was kept
    Duplicate { name: String },
    /// Schema did not compile; nothing inserted
    Rejected { name: String, error: SchemaError },
}

#[derive(Debug)]
struct Entry {
    descriptor: ActionDescriptor,
    schema: CompiledSchema,
}

#[derive(Debug, Default)]
pub struct ActionRegistry {
    actions: HashMap<String, Entry>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register each descriptor in order. The first registration of a name
    /// wins; later ones are skipped with a warning.
    pub fn register_all(
        &mut self,
        actions: Vec<ActionDescriptor>,
        log: &dyn LogSink,
    ) -> Vec<RegisterOutcome> {
        actions
            .into_iter()
            .map(|action| self.register(action, log))
            .collect()
    }

    fn register(&mut self, action: ActionDescriptor, log: &dyn LogSink) -> RegisterOutcome {
        let name = action.name.clone();

        if self.actions.contains_key(&name) {
            log.warn(&format!(
                "Action \"{}\" is already registered, ignoring the new registration",
                name
            ));
            return RegisterOutcome::Duplicate { name };
        }

        let forbidden_keys = schema_guard::scan_forbidden_keys(&action.schema);
        if !forbidden_keys.is_empty() {
            log.warn(&format!(
                "Action \"{}\" uses unsupported schema keys: {}",
                name,
                forbidden_keys.join(", ")
            ));
        }

        let schema = match schema_guard::validate(&action.schema) {
            Ok(schema) => schema,
            Err(error) => {
                log.error(&format!("Rejected action \"{}\": {}", name, error));
                return RegisterOutcome::Rejected { name, error };
            }
        };

        log.info(&format!("Registered action \"{}\"", name));
        self.actions.insert(
            name.clone(),
            Entry {
                descriptor: action,
                schema,
            },
        );
        RegisterOutcome::Registered {
            name,
            forbidden_keys,
        }
    }

    /// Remove each present name. Names that were never registered are
    /// skipped without a log line. Returns the names actually removed.
    pub fn unregister_all(&mut self, names: &[String], log: &dyn LogSink) -> Vec<String> {
        let mut removed = Vec::new();
        for name in names {
            if self.actions.remove(name).is_some() {
                log.info(&format!("Unregistered action \"{}\"", name));
                removed.push(name.clone());
            }
        }
        removed
    }

    pub fn clear(&mut self) {
        self.actions.clear();
    }

    pub fn get(&self, name: &str) -> Option<&ActionDescriptor> {
        self.actions.get(name).map(|entry| &entry.descriptor)
    }

    /// The compiled schema of a registered action
    pub fn schema(&self, name: &str) -> Option<&CompiledSchema> {
        self.actions.get(name).map(|entry| &entry.schema)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.actions.keys().cloned().collect();
        names.sort();
        names
    }
}
