//! cli::router
//!
//! Turns command-line tokens into an operation run.
//!
//! # Architecture
//!
//! The [`Router`] owns a [`CommandTree`] built once from the registry paths
//! plus the discovered catalogue. Routing a token list:
//!
//! 1. Expand a leading alias from the linking table
//! 2. Resolve the tokens against the tree
//! 3. Reject namespaces and unknown names
//! 4. Look the leaf up in the registry; a leaf nothing implements is a
//!    malformed operation
//! 5. Run the lifecycle with the remaining tokens layered over the alias
//!    defaults and any base mapping (an OB)
//!
//! No operation runs unless every step succeeds.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use translator_module::builtin;
//! use translator_module::cli::router::{RouteOutcome, Router};
//! use translator_module::engine::Context;
//! use translator_module::keywords::MemoryKeywords;
//!
//! let registry = builtin::registry(Arc::new(MemoryKeywords::new())).unwrap();
//! let router = Router::new("translator", Vec::new(), registry);
//!
//! match router.route(&["util", "echo", "hi"], None, &Context::default()).unwrap() {
//!     RouteOutcome::Completed { outcome, .. } => assert_eq!(outcome.value["message"], "hi"),
//!     RouteOutcome::Help { .. } => unreachable!(),
//! }
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;

use crate::core::config::LinkEntry;
use crate::core::tree::CommandTree;
use crate::core::types::{ArgumentSet, OperationPath};
use crate::engine::{lifecycle, Arguments, Context, LifecycleError, Operation, Outcome, Registry};

/// Errors from routing.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("no function given; use --list to see the available functions")]
    NoFunction,

    /// Nothing in the tree matches the first token.
    #[error("'{0}' is not a known function")]
    Unresolved(String),

    /// The tokens stop at a node with children.
    #[error("'{path}' is not an operation, it is a namespace (contains: {})", children.join(", "))]
    Namespace { path: String, children: Vec<String> },

    /// The leaf exists but nothing implements it.
    #[error("'{0}' is a malformed operation: no implementation is registered")]
    Malformed(OperationPath),

    /// An alias points at an invalid path.
    #[error("alias '{alias}' expands to an invalid function '{function}'")]
    BadAlias { alias: String, function: String },

    /// The operation ran and failed.
    #[error("{path}: {source}")]
    Lifecycle {
        path: OperationPath,
        #[source]
        source: LifecycleError,
    },
}

/// A resolved function, ready to run.
#[derive(Clone)]
pub struct Resolved {
    pub path: OperationPath,
    pub operation: Arc<dyn Operation>,
    /// Tokens after the function path.
    pub remaining: Vec<String>,
    /// Defaults contributed by an alias.
    pub defaults: ArgumentSet,
    /// The alias used, if any.
    pub alias: Option<String>,
}

impl std::fmt::Debug for Resolved {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolved")
            .field("path", &self.path)
            .field("remaining", &self.remaining)
            .field("defaults", &self.defaults)
            .field("alias", &self.alias)
            .finish()
    }
}

/// Result of routing.
#[derive(Debug)]
pub enum RouteOutcome {
    /// The lifecycle ran to completion.
    Completed { path: OperationPath, outcome: Outcome },
    /// The tokens asked for the function's help; nothing ran.
    Help { path: OperationPath, text: String },
}

/// Token router over a fixed catalogue.
#[derive(Debug)]
pub struct Router {
    tree: CommandTree,
    registry: Registry,
    links: BTreeMap<String, LinkEntry>,
}

impl Router {
    /// Build the tree from the registry paths followed by `catalogue`.
    pub fn new(
        root: &str,
        catalogue: impl IntoIterator<Item = OperationPath>,
        registry: Registry,
    ) -> Self {
        let mut tree = CommandTree::new(root);
        for path in registry.paths() {
            tree.insert(path.segments());
        }
        for path in catalogue {
            tree.insert(path.segments());
        }
        Self {
            tree,
            registry,
            links: BTreeMap::new(),
        }
    }

    /// Attach a linking table.
    pub fn with_links(mut self, links: BTreeMap<String, LinkEntry>) -> Self {
        self.links = links;
        self
    }

    pub fn tree(&self) -> &CommandTree {
        &self.tree
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn links(&self) -> &BTreeMap<String, LinkEntry> {
        &self.links
    }

    /// Replace a leading alias by its function path.
    fn expand<S: AsRef<str>>(
        &self,
        tokens: &[S],
    ) -> Result<(Vec<String>, ArgumentSet, Option<String>), RouteError> {
        let mut tokens: Vec<String> = tokens.iter().map(|t| t.as_ref().to_string()).collect();
        if tokens.first().map(String::as_str) == Some(self.tree.root_label()) {
            tokens.remove(0);
        }

        let Some(first) = tokens.first() else {
            return Ok((tokens, ArgumentSet::new(), None));
        };
        let shadowed = self
            .tree
            .children(self.tree.root())
            .iter()
            .any(|c| self.tree.content(*c) == first);
        let entry = match self.links.get(first) {
            Some(entry) if !shadowed => entry,
            _ => return Ok((tokens, ArgumentSet::new(), None)),
        };

        let alias = first.clone();
        let target = entry.path().map_err(|_| RouteError::BadAlias {
            alias: alias.clone(),
            function: entry.function.clone(),
        })?;
        tracing::debug!(alias = %alias, function = %target, "expanding alias");

        let mut expanded: Vec<String> = target.segments().to_vec();
        expanded.extend(tokens.into_iter().skip(1));
        Ok((
            expanded,
            ArgumentSet::from(entry.json_arguments()),
            Some(alias),
        ))
    }

    /// Resolve tokens to a registered operation.
    ///
    /// # Errors
    ///
    /// - `RouteError::NoFunction` for an empty token list
    /// - `RouteError::Unresolved` if the first token names nothing
    /// - `RouteError::Namespace` if the tokens stop at a namespace
    /// - `RouteError::Malformed` if the leaf has no implementation
    pub fn resolve<S: AsRef<str>>(&self, tokens: &[S]) -> Result<Resolved, RouteError> {
        let (tokens, defaults, alias) = self.expand(tokens)?;
        if tokens.is_empty() {
            return Err(RouteError::NoFunction);
        }

        let resolution = self.tree.resolve(&tokens);
        if resolution.matched.is_empty() {
            return Err(RouteError::Unresolved(tokens[0].clone()));
        }
        if !resolution.is_leaf {
            let node = self.node_at(&resolution.matched);
            let children = node
                .map(|id| {
                    self.tree
                        .children(id)
                        .iter()
                        .map(|c| self.tree.content(*c).to_string())
                        .collect()
                })
                .unwrap_or_default();
            return Err(RouteError::Namespace {
                path: resolution.prefix(),
                children,
            });
        }

        let path = OperationPath::new(&resolution.matched)
            .map_err(|_| RouteError::Unresolved(resolution.prefix()))?;
        let operation = self
            .registry
            .get(&path)
            .ok_or_else(|| RouteError::Malformed(path.clone()))?;

        Ok(Resolved {
            path,
            operation,
            remaining: resolution.remaining,
            defaults,
            alias,
        })
    }

    fn node_at(&self, segments: &[String]) -> Option<crate::core::tree::NodeId> {
        let mut node = self.tree.root();
        for segment in segments {
            node = self
                .tree
                .children(node)
                .iter()
                .copied()
                .find(|c| self.tree.content(*c) == segment)?;
        }
        Some(node)
    }

    /// Run a resolved operation.
    ///
    /// Arguments are layered: alias defaults, then `base`, then the
    /// remaining tokens.
    pub fn invoke(
        &self,
        resolved: Resolved,
        base: Option<ArgumentSet>,
        ctx: &Context,
    ) -> Result<RouteOutcome, RouteError> {
        let Resolved {
            path,
            operation,
            remaining,
            defaults,
            ..
        } = resolved;

        let mut layered = defaults;
        if let Some(base) = base {
            layered.merge(base);
        }
        let args = Arguments::Overlay {
            base: layered,
            tokens: remaining,
        };

        match lifecycle::execute(&path, operation.as_ref(), args, ctx) {
            Ok(outcome) => Ok(RouteOutcome::Completed { path, outcome }),
            Err(LifecycleError::HelpRequested(text)) => Ok(RouteOutcome::Help { path, text }),
            Err(source) => Err(RouteError::Lifecycle { path, source }),
        }
    }

    /// Resolve and run in one step.
    pub fn route<S: AsRef<str>>(
        &self,
        tokens: &[S],
        base: Option<ArgumentSet>,
        ctx: &Context,
    ) -> Result<RouteOutcome, RouteError> {
        let resolved = self.resolve(tokens)?;
        self.invoke(resolved, base, ctx)
    }
}
