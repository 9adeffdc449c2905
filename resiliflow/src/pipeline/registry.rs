//! Registry of named pipelines.

use super::{PipelineDeclaration, ResiliencePipeline, ResiliencePipelineBuilder};
use crate::errors::PipelineConfigError;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Mapping from pipeline name to built pipeline.
///
/// Populate it during startup through `&mut self`, then share it as
/// `Arc<PipelineRegistry>`. After that it is read-only, so lookups need no
/// synchronization. Every pipeline is built exactly once, at registration.
pub struct PipelineRegistry<T: Send + 'static = ()> {
    pipelines: HashMap<String, Arc<ResiliencePipeline<T>>>,
}

impl<T: Send + 'static> PipelineRegistry<T> {
    /// Creates a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pipelines: HashMap::new(),
        }
    }

    /// Builds and stores a pipeline under `name`.
    ///
    /// # Errors
    ///
    /// Returns `DuplicatePipeline` if the name is taken (the configure callback
    /// is not invoked), or `InvalidOptions` if a strategy fails validation.
    pub fn register<F>(&mut self, name: impl Into<String>, configure: F) -> Result<(), PipelineConfigError>
    where
        F: FnOnce(&mut ResiliencePipelineBuilder<T>),
    {
        self.try_register(name, |builder| {
            configure(builder);
            Ok(())
        })
    }

    /// Builds and stores a pipeline under `name` with a fallible configure callback.
    ///
    /// # Errors
    ///
    /// As [`register`](Self::register), plus `BuildFailed` if `configure` returns an error.
    pub fn try_register<F>(&mut self, name: impl Into<String>, configure: F) -> Result<(), PipelineConfigError>
    where
        F: FnOnce(&mut ResiliencePipelineBuilder<T>) -> anyhow::Result<()>,
    {
        let name = name.into();
        if self.pipelines.contains_key(&name) {
            return Err(PipelineConfigError::duplicate(name));
        }

        let mut builder = ResiliencePipelineBuilder::named(name.clone());
        configure(&mut builder).map_err(|err| PipelineConfigError::build_failed(&name, &err))?;
        let pipeline = builder.build()?;

        debug!(
            pipeline = %name,
            strategies = ?pipeline.strategy_names(),
            "Registered resilience pipeline"
        );
        self.pipelines.insert(name, Arc::new(pipeline));
        Ok(())
    }

    /// Resolves a pipeline by name.
    ///
    /// Repeated lookups return the same instance.
    ///
    /// # Errors
    ///
    /// Returns `PipelineNotFound` if nothing is registered under `name`.
    pub fn resolve(&self, name: &str) -> Result<Arc<ResiliencePipeline<T>>, PipelineConfigError> {
        self.pipelines
            .get(name)
            .cloned()
            .ok_or_else(|| PipelineConfigError::not_found(name))
    }

    /// Checks if a pipeline is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.pipelines.contains_key(name)
    }

    /// Returns the registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.pipelines.keys().cloned().collect();
        names.sort();
        names
    }

    /// Returns the number of registered pipelines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    /// Returns true if no pipeline is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }
}

impl<T: Default + Send + 'static> PipelineRegistry<T> {
    /// Registers a pipeline from a data-only declaration.
    ///
    /// # Errors
    ///
    /// As [`register`](Self::register).
    pub fn register_declaration(&mut self, declaration: &PipelineDeclaration) -> Result<(), PipelineConfigError> {
        self.register(declaration.name.clone(), |builder| declaration.apply(builder))
    }

    /// Creates a registry from declarations.
    ///
    /// # Errors
    ///
    /// Returns the first registration error.
    pub fn from_declarations<'a, I>(declarations: I) -> Result<Self, PipelineConfigError>
    where
        I: IntoIterator<Item = &'a PipelineDeclaration>,
    {
        let mut registry = Self::new();
        for declaration in declarations {
            registry.register_declaration(declaration)?;
        }
        Ok(registry)
    }
}

impl<T: Send + 'static> Default for PipelineRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> std::fmt::Debug for PipelineRegistry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineRegistry")
            .field("pipelines", &self.names())
            .finish()
    }
}
