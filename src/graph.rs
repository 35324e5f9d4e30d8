//! Module Graph
//!
//! The module graph holds all modules of a build invocation. It is built in
//! two phases:
//!
//!  1. All schema modules are registered via `Graph::register()`. Names must
//!     be unique.
//!
//!  2. `Graph::derive_docs()` visits every schema module once and creates its
//!     documentation module, unless it already exists. Derived modules are
//!     never visited themselves, and running the pass again has no effect.
//!
//! Modules are kept sorted by name, so iteration order only depends on the
//! set of registered modules.

/// Graph Errors
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A module with the specified name is already registered.
    #[error("duplicate module '{0}'")]
    Duplicate(String),
    /// The documentation module name of the specified parent is taken by an
    /// unrelated module.
    #[error("cannot derive '{docs}' from '{parent}': name is taken")]
    DocsConflict {
        parent: String,
        docs: String,
    },
    /// A target of the specified module has the name of a target that is
    /// already declared by another module.
    #[error("module '{module}': target '{target}' is already declared by '{owner}'")]
    TargetConflict {
        module: String,
        target: String,
        owner: String,
    },
}

/// Graph Node
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Module {
    /// A schema module, as registered in phase 1.
    XsdConfig(crate::descriptor::Descriptor),
    /// A documentation module, as derived in phase 2.
    Docs(crate::op::docs::DocsModule),
}

impl Module {
    pub fn name(&self) -> &str {
        match self {
            Module::XsdConfig(v) => v.name(),
            Module::Docs(v) => &v.name,
        }
    }
}

/// Module Graph
///
/// See the module documentation for details.
#[derive(Debug, Default)]
pub struct Graph {
    modules: std::collections::BTreeMap<String, Module>,
    processed: std::collections::BTreeSet<String>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a schema module
    ///
    /// Add a schema module to the graph. Fails if a module of the same name
    /// is already present.
    pub fn register(
        &mut self,
        descriptor: crate::descriptor::Descriptor,
    ) -> Result<(), Error> {
        match self.modules.entry(descriptor.name().to_string()) {
            std::collections::btree_map::Entry::Occupied(v) => {
                Err(Error::Duplicate(v.key().clone()))
            },
            std::collections::btree_map::Entry::Vacant(v) => {
                tracing::debug!(module = descriptor.name(), "registered module");
                v.insert(Module::XsdConfig(descriptor));
                Ok(())
            },
        }
    }

    /// Derive documentation modules
    ///
    /// Visit all schema modules that have not been visited before and create
    /// their documentation modules. A documentation module that already
    /// exists for the same parent is kept as is. If its name is taken by any
    /// other module, a conflict is reported for this parent and the pass
    /// continues with the remaining modules.
    ///
    /// Returns the number of created modules and the conflicts.
    pub fn derive_docs(&mut self) -> (usize, Vec<Error>) {
        let pending: Vec<crate::op::docs::DocsModule> = self.modules.values()
            .filter_map(|v| match v {
                Module::XsdConfig(d) if !self.processed.contains(d.name()) => {
                    Some(crate::op::docs::derive(d))
                },
                _ => None,
            })
            .collect();

        let mut created = 0;
        let mut errors = Vec::new();

        for docs in pending {
            let parent = crate::op::docs::parent_name(&docs)
                .map(|v| v.to_string())
                .unwrap_or_default();

            match self.modules.get(&docs.name) {
                None => {
                    tracing::debug!(module = docs.name.as_str(), "derived docs module");
                    self.modules.insert(docs.name.clone(), Module::Docs(docs));
                    created += 1;
                },
                Some(Module::Docs(v)) if *v == docs => {},
                Some(_) => {
                    tracing::warn!(module = docs.name.as_str(), "docs module name is taken");
                    errors.push(Error::DocsConflict {
                        parent: parent.clone(),
                        docs: docs.name.clone(),
                    });
                },
            }

            self.processed.insert(parent);
        }

        (created, errors)
    }

    pub fn get(&self, name: &str) -> Option<&Module> {
        self.modules.get(name)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Iterate over all modules, sorted by name.
    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.modules.values()
    }

    /// Iterate over all schema modules, sorted by name.
    pub fn descriptors(&self) -> impl Iterator<Item = &crate::descriptor::Descriptor> {
        self.modules.values().filter_map(|v| match v {
            Module::XsdConfig(d) => Some(d),
            _ => None,
        })
    }

    /// Iterate over all documentation modules, sorted by name.
    pub fn docs_modules(&self) -> impl Iterator<Item = &crate::op::docs::DocsModule> {
        self.modules.values().filter_map(|v| match v {
            Module::Docs(d) => Some(d),
            _ => None,
        })
    }
}
