//! Module loader and resolver tables
//!
//! Loaders serve built-in modules by exact id. Resolvers map a module id to
//! an asset path; they are consulted in registration order and the first
//! one that recognizes the id wins.

use crate::core::StringName;
use crate::errors::{BridgeError, Result};
use rustc_hash::FxHashMap;

/// Provider of a built-in module
pub trait ModuleLoader {
    /// Source text of the module
    fn load(&self, module_id: &str) -> Option<String>;
}

/// Maps module ids to source assets
pub trait ModuleResolver {
    /// Asset path holding the source of `module_id`, if this resolver knows it
    fn get_source_info(&self, module_id: &str) -> Option<String>;
}

#[derive(Default)]
pub struct ModuleTables {
    loaders: FxHashMap<StringName, Box<dyn ModuleLoader>>,
    resolvers: Vec<Box<dyn ModuleResolver>>,
}

impl ModuleTables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_loader(&mut self, module_id: impl Into<StringName>, loader: Box<dyn ModuleLoader>) -> Result<()> {
        let module_id = module_id.into();
        if self.loaders.contains_key(&module_id) {
            return Err(BridgeError::DuplicateModuleLoader(module_id));
        }
        self.loaders.insert(module_id, loader);
        Ok(())
    }

    pub fn find_loader(&self, module_id: &str) -> Option<&dyn ModuleLoader> {
        self.loaders.get(module_id).map(|loader| loader.as_ref())
    }

    pub fn add_resolver(&mut self, resolver: Box<dyn ModuleResolver>) {
        self.resolvers.push(resolver);
    }

    /// First resolver recognizing `module_id`, with the asset path it gave
    pub fn find_resolver(&self, module_id: &str) -> Option<(&dyn ModuleResolver, String)> {
        self.resolvers.iter().find_map(|resolver| {
            resolver
                .get_source_info(module_id)
                .map(|asset_path| (resolver.as_ref(), asset_path))
        })
    }

    /// Locate `module_id` through a loader first, then the resolvers
    pub fn locate(&self, module_id: &str) -> Option<ModuleSource> {
        if self.loaders.contains_key(module_id) {
            return Some(ModuleSource::Builtin(StringName::new(module_id)));
        }
        self.find_resolver(module_id)
            .map(|(_, asset_path)| ModuleSource::Asset(asset_path))
    }

    pub fn loader_count(&self) -> usize {
        self.loaders.len()
    }

    pub fn resolver_count(&self) -> usize {
        self.resolvers.len()
    }
}

/// Where a module comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleSource {
    Builtin(StringName),
    Asset(String),
}
