#![doc(hidden)]

use anyhow::Error;
use teloxide::prelude::*;
use teloxide::types::BotCommand;

use crate::types::TeloxideHandler;

#[async_trait]
pub(crate) trait Module {
    async fn register_dependency(&mut self, dep_map: &mut DependencyMap) -> Result<(), Error>;

    fn handler_chain(&self) -> TeloxideHandler {
        dptree::entry()
    }

    fn commands(&self) -> Vec<BotCommand> {
        vec![]
    }
}

pub(crate) struct ModuleManager {
    modules: Vec<Box<dyn Module + Send + 'static>>,
}

impl ModuleManager {
    pub fn new() -> Self {
        Self { modules: vec![] }
    }

    pub fn register_module<M>(&mut self, module: M)
    where
        M: Module + Send + 'static,
    {
        self.modules.push(Box::new(module));
    }

    pub fn with_all_modules<F>(&self, mut f: F)
    where
        F: FnMut(&dyn Module),
    {
        for module in self.modules.iter() {
            f(module.as_ref());
        }
    }

    /// Lets every module insert its services, in registration order.
    pub async fn register_dependencies(&mut self, dep_map: &mut DependencyMap) -> Result<(), Error> {
        for module in self.modules.iter_mut() {
            module.register_dependency(dep_map).await?;
        }
        Ok(())
    }
}
