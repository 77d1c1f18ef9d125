//! Output plugins by name, and loading them from an agent configuration file.

use crate::config::IotHubConfig;
use crate::error::OutputError;
use crate::iothub::IotHubOutput;
use crate::Output;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Builds an output from its configuration table
pub type Creator = fn(toml::Value) -> Result<Box<dyn Output>, OutputError>;

pub struct Registry {
    creators: BTreeMap<&'static str, Creator>,
}

#[derive(Deserialize)]
struct AgentConfig {
    #[serde(default)]
    outputs: BTreeMap<String, Vec<toml::Value>>,
}

fn azure_iothub(table: toml::Value) -> Result<Box<dyn Output>, OutputError> {
    let config: IotHubConfig = table.try_into()?;
    Ok(Box::new(IotHubOutput::new(config)))
}

impl Default for Registry {
    fn default() -> Self {
        let mut registry = Registry::empty();
        registry.add("azure_iothub", azure_iothub);
        registry
    }
}

impl Registry {
    pub fn empty() -> Registry {
        Registry {
            creators: BTreeMap::new(),
        }
    }

    pub fn add(&mut self, name: &'static str, creator: Creator) {
        self.creators.insert(name, creator);
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.creators.keys().cloned().collect()
    }

    pub fn create(&self, name: &str, table: toml::Value) -> Result<Box<dyn Output>, OutputError> {
        let creator = self
            .creators
            .get(name)
            .ok_or_else(|| OutputError::UnknownOutput(name.to_owned()))?;
        creator(table)
    }

    /// Builds every `[[outputs.<name>]]` table of an agent configuration
    pub fn load_outputs(&self, text: &str) -> Result<Vec<Box<dyn Output>>, OutputError> {
        let agent: AgentConfig = toml::from_str(text)?;
        let mut outputs = Vec::new();
        for (name, tables) in agent.outputs {
            for table in tables {
                debug!("Creating output {}", name);
                outputs.push(self.create(&name, table)?);
            }
        }
        Ok(outputs)
    }
}
