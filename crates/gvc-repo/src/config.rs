//! Repository configuration, read from and written to TOML.

use std::path::Path;

use gvc_tree::TreeConfig;
use gvc_types::Person;
use serde::{Deserialize, Serialize};

use crate::error::RepoResult;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Branch `HEAD` attaches to on init.
    pub default_branch: String,
    pub user: UserConfig,
    pub tree: TreeConfig,
    pub transaction: TransactionConfig,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            default_branch: "master".into(),
            user: UserConfig::default(),
            tree: TreeConfig::default(),
            transaction: TransactionConfig::default(),
        }
    }
}

impl RepositoryConfig {
    pub fn from_toml_str(s: &str) -> RepoResult<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: impl AsRef<Path>) -> RepoResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> RepoResult<String> {
        Ok(toml::to_string(self)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> RepoResult<()> {
        std::fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    /// Author and committer signature for new commits and tags.
    pub fn signature(&self) -> Person {
        Person::now(
            self.user.name.as_deref().unwrap_or("gvc"),
            self.user.email.as_deref().unwrap_or(""),
        )
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionConfig {
    /// Attempts to republish after losing a ref race.
    pub max_retries: u32,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self { max_retries: 3 }
    }
}
