// crates/input_core/src/registry.rs
//! Name → factory tables for the open sets of composite, interaction and
//! processor kinds. Lookups are case-insensitive.

use crate::composites::Composite;
use crate::error::Result;
use crate::interactions::Interaction;
use crate::params::NameAndParameters;
use crate::processors::Processor;

type Factory<B> = Box<dyn Fn(&NameAndParameters) -> Result<B>>;

/// `B` is the boxed product, e.g. `Box<dyn Composite>`.
struct KindRegistry<B> {
    entries: Vec<(String, Factory<B>)>,
}

impl<B> Default for KindRegistry<B> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<B> KindRegistry<B> {
    fn register(&mut self, name: &str, factory: Factory<B>) {
        // Re-registering replaces the previous factory.
        self.entries.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        self.entries.push((name.to_string(), factory));
    }

    fn find(&self, name: &str) -> Option<&Factory<B>> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, f)| f)
    }

    /// `None` if no kind of that name is registered.
    fn create(&self, params: &NameAndParameters) -> Option<Result<B>> {
        self.find(&params.name).map(|factory| factory(params))
    }
}

#[derive(Default)]
pub struct Registries {
    composites: KindRegistry<Box<dyn Composite>>,
    interactions: KindRegistry<Box<dyn Interaction>>,
    processors: KindRegistry<Box<dyn Processor>>,
}

impl Registries {
    pub fn register_composite<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&NameAndParameters) -> Result<Box<dyn Composite>> + 'static,
    {
        self.composites.register(name, Box::new(factory));
    }

    pub fn register_interaction<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&NameAndParameters) -> Result<Box<dyn Interaction>> + 'static,
    {
        self.interactions.register(name, Box::new(factory));
    }

    pub fn register_processor<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&NameAndParameters) -> Result<Box<dyn Processor>> + 'static,
    {
        self.processors.register(name, Box::new(factory));
    }

    pub fn has_composite(&self, name: &str) -> bool {
        self.composites.find(name).is_some()
    }

    pub fn has_interaction(&self, name: &str) -> bool {
        self.interactions.find(name).is_some()
    }

    pub fn has_processor(&self, name: &str) -> bool {
        self.processors.find(name).is_some()
    }

    pub(crate) fn create_composite(
        &self,
        params: &NameAndParameters,
    ) -> Option<Result<Box<dyn Composite>>> {
        self.composites.create(params)
    }

    pub(crate) fn create_interaction(
        &self,
        params: &NameAndParameters,
    ) -> Option<Result<Box<dyn Interaction>>> {
        self.interactions.create(params)
    }

    pub(crate) fn create_processor(
        &self,
        params: &NameAndParameters,
    ) -> Option<Result<Box<dyn Processor>>> {
        self.processors.create(params)
    }
}
