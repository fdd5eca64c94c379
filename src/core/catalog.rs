//! Test catalog
//!
//! Maps test names to the API calls that provoke a notification, and carries
//! the discovery plan and configuration queries. The built-in catalog is a
//! TOML document compiled into the binary; `TestCatalog::from_file` loads a
//! replacement with the same schema.

use super::session::ApiCall;
use crate::utils::CatalogError;
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

const DEFAULT_CATALOG: &str = include_str!("default_catalog.toml");

/// A named action that provokes the NAS into emitting a notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestDefinition {
    pub name: String,
    pub description: String,
    pub call: ApiCall,
    /// Expand into one invocation per listed item instead of a single call
    pub fan_out: Option<FanOut>,
}

/// Lists items on the NAS and sets one parameter from each
///
/// The `webhook` test uses this to send one `send_test` per configured
/// provider `profile_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FanOut {
    /// Parameter filled from each listed item
    pub param: String,
    /// Call whose reply carries the item array
    pub source: ApiCall,
    /// Key of the array under `data`
    pub items: String,
}

/// A named read-only query shown by `--config`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigQuery {
    pub name: String,
    pub call: ApiCall,
}

/// What discovery mode looks for
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DiscoverPlan {
    /// Lowercase substrings matched against advertised API names
    pub keywords: Vec<String>,
    /// Endpoints probed one by one
    pub candidates: Vec<ApiCall>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawCatalog {
    #[serde(default, rename = "test")]
    tests: Vec<RawEntry>,
    #[serde(default, rename = "config")]
    configs: Vec<RawEntry>,
    #[serde(default)]
    discover: RawDiscover,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDiscover {
    #[serde(default)]
    keywords: Vec<String>,
    #[serde(default, rename = "candidate")]
    candidates: Vec<RawEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawEntry {
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
    api: String,
    method: String,
    version: u32,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    params: BTreeMap<String, String>,
    #[serde(default)]
    fan_out: Option<RawFanOut>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawFanOut {
    param: String,
    api: String,
    method: String,
    version: u32,
    #[serde(default)]
    path: Option<String>,
    #[serde(default = "default_items_key")]
    items: String,
}

fn default_items_key() -> String {
    "list".to_string()
}

impl RawFanOut {
    fn into_fan_out(self, test: &str) -> Result<FanOut, CatalogError> {
        if self.param.trim().is_empty() || self.items.trim().is_empty() {
            return Err(CatalogError::Invalid(format!(
                "fan_out of '{}' needs a param and an items key",
                test
            )));
        }
        if self.api.trim().is_empty() || self.method.trim().is_empty() || self.version == 0 {
            return Err(CatalogError::Invalid(format!(
                "fan_out of '{}' needs a non-empty api, method and version",
                test
            )));
        }
        let mut source = ApiCall::new(self.api, self.method, self.version);
        if let Some(path) = self.path {
            source = source.with_path(path);
        }
        Ok(FanOut {
            param: self.param,
            source,
            items: self.items,
        })
    }
}

impl RawEntry {
    fn into_call(self) -> Result<(String, String, ApiCall), CatalogError> {
        if self.api.trim().is_empty() || self.method.trim().is_empty() {
            return Err(CatalogError::Invalid(format!(
                "entry '{}' needs a non-empty api and method",
                self.name
            )));
        }
        if self.version == 0 {
            return Err(CatalogError::Invalid(format!(
                "entry '{}' ({}) has version 0",
                self.name, self.api
            )));
        }

        let mut call = ApiCall::new(self.api, self.method, self.version);
        if let Some(path) = self.path {
            call = call.with_path(path);
        }
        call.params = self.params;
        Ok((self.name, self.description, call))
    }
}

fn reject_fan_out(entry: &RawEntry) -> Result<(), CatalogError> {
    match entry.fan_out {
        Some(_) => Err(CatalogError::Invalid(format!(
            "fan_out is only allowed on tests ({})",
            entry.api
        ))),
        None => Ok(()),
    }
}

/// Read-only catalog of tests, configuration queries and discovery candidates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCatalog {
    tests: Vec<TestDefinition>,
    configs: Vec<ConfigQuery>,
    discover: DiscoverPlan,
}

impl TestCatalog {
    /// The catalog compiled into the binary
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_toml(DEFAULT_CATALOG)
    }

    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let text = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, CatalogError> {
        let raw: RawCatalog = toml::from_str(text)?;

        if raw.tests.is_empty() {
            return Err(CatalogError::Invalid("catalog defines no tests".into()));
        }

        let mut seen = HashSet::new();
        let mut tests = Vec::with_capacity(raw.tests.len());
        for mut entry in raw.tests {
            let fan_out = entry.fan_out.take();
            let (name, description, call) = entry.into_call()?;
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(CatalogError::Invalid(format!(
                    "test for {} has no name",
                    call.api
                )));
            }
            if name.eq_ignore_ascii_case("all") {
                return Err(CatalogError::Invalid("'all' is reserved".into()));
            }
            if !seen.insert(name.clone()) {
                return Err(CatalogError::Invalid(format!("duplicate test '{}'", name)));
            }
            let fan_out = fan_out.map(|f| f.into_fan_out(&name)).transpose()?;
            tests.push(TestDefinition {
                name,
                description,
                call,
                fan_out,
            });
        }

        let configs = raw
            .configs
            .into_iter()
            .map(|entry| {
                reject_fan_out(&entry)?;
                let (name, _, call) = entry.into_call()?;
                let name = if name.trim().is_empty() {
                    call.api.clone()
                } else {
                    name
                };
                Ok(ConfigQuery { name, call })
            })
            .collect::<Result<Vec<_>, CatalogError>>()?;

        let candidates = raw
            .discover
            .candidates
            .into_iter()
            .map(|entry| {
                reject_fan_out(&entry)?;
                entry.into_call().map(|(_, _, call)| call)
            })
            .collect::<Result<Vec<_>, CatalogError>>()?;

        let keywords = raw
            .discover
            .keywords
            .into_iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();

        Ok(Self {
            tests,
            configs,
            discover: DiscoverPlan {
                keywords,
                candidates,
            },
        })
    }

    /// All tests in catalog order
    pub fn tests(&self) -> &[TestDefinition] {
        &self.tests
    }

    pub fn names(&self) -> Vec<&str> {
        self.tests.iter().map(|t| t.name.as_str()).collect()
    }

    /// Look up a test by name
    pub fn get(&self, name: &str) -> Result<&TestDefinition, CatalogError> {
        self.tests
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| CatalogError::UnknownTest {
                name: name.to_string(),
                known: self.names().join(", "),
            })
    }

    pub fn config_queries(&self) -> &[ConfigQuery] {
        &self.configs
    }

    pub fn discover_plan(&self) -> &DiscoverPlan {
        &self.discover
    }

    /// Pin a parameter on every test that declares or fans out over it
    ///
    /// Used for `--profile-id`: a pinned value replaces the provider listing
    /// of the `webhook` test.
    pub fn override_param(&mut self, key: &str, value: &str) {
        for test in &mut self.tests {
            let fans_out = test.fan_out.as_ref().is_some_and(|f| f.param == key);
            if fans_out {
                test.fan_out = None;
            }
            if fans_out || test.call.params.contains_key(key) {
                test.call.params.insert(key.to_string(), value.to_string());
            }
        }
    }
}
