//! Local machine discovery: container registries with stored credentials and
//! Kubernetes contexts the user already has configured.
//!
//! Both stores are optional. An absent store contributes nothing, while a store
//! that exists but cannot be read or parsed is a hard error the user has to fix.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// Raw contents of a store plus where it came from.
#[derive(Debug, Clone)]
pub struct StoreContents {
    pub path: PathBuf,
    pub raw: String,
}

/// Source of the docker-style credential store.
pub trait RegistryStoreReader {
    /// `Ok(None)` when the store does not exist.
    fn read_registry_store(&self) -> Result<Option<StoreContents>, ConfigStoreError>;
}

/// Source of the kube-style context store.
pub trait ContextStoreReader {
    /// `Ok(None)` when the store does not exist.
    fn read_context_store(&self) -> Result<Option<StoreContents>, ConfigStoreError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Docker,
    Kube,
}

impl StoreKind {
    fn label(self) -> &'static str {
        match self {
            StoreKind::Docker => "Docker config.json",
            StoreKind::Kube => "Kubernetes config",
        }
    }

    fn format(self) -> &'static str {
        match self {
            StoreKind::Docker => "json",
            StoreKind::Kube => "yaml",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreFailure {
    Read,
    Parse,
}

#[derive(Debug)]
pub struct ConfigStoreError {
    pub store: StoreKind,
    pub failure: StoreFailure,
    pub path: PathBuf,
    pub detail: String,
}

impl ConfigStoreError {
    fn read(store: StoreKind, path: &Path, err: &io::Error) -> Self {
        Self {
            store,
            failure: StoreFailure::Read,
            path: path.to_path_buf(),
            detail: err.to_string(),
        }
    }

    fn parse(store: StoreKind, path: &Path, detail: impl Into<String>) -> Self {
        Self {
            store,
            failure: StoreFailure::Parse,
            path: path.to_path_buf(),
            detail: detail.into(),
        }
    }
}

impl fmt::Display for ConfigStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "It seems you have a {} file at {}, but it is not valid {}, or unreadable!",
            self.store.label(),
            self.path.display(),
            self.store.format()
        )
    }
}

impl std::error::Error for ConfigStoreError {}

/// Reads both stores from their conventional locations under a home directory.
#[derive(Debug, Clone)]
pub struct HomeStores {
    home: Option<PathBuf>,
}

impl HomeStores {
    /// Rooted at the current user's home directory, if one can be resolved.
    pub fn from_env() -> Self {
        Self {
            home: dirs::home_dir(),
        }
    }

    pub fn at(home: impl Into<PathBuf>) -> Self {
        Self {
            home: Some(home.into()),
        }
    }

    pub fn docker_config_path(&self) -> Option<PathBuf> {
        self.home
            .as_ref()
            .map(|home| home.join(".docker").join("config.json"))
    }

    pub fn kube_config_path(&self) -> Option<PathBuf> {
        self.home.as_ref().map(|home| home.join(".kube").join("config"))
    }
}

fn read_optional(
    store: StoreKind,
    path: Option<PathBuf>,
) -> Result<Option<StoreContents>, ConfigStoreError> {
    let Some(path) = path else {
        return Ok(None);
    };
    if !path.exists() {
        debug!(path = %path.display(), "no {} found", store.label());
        return Ok(None);
    }
    let raw =
        fs::read_to_string(&path).map_err(|err| ConfigStoreError::read(store, &path, &err))?;
    Ok(Some(StoreContents { path, raw }))
}

impl RegistryStoreReader for HomeStores {
    fn read_registry_store(&self) -> Result<Option<StoreContents>, ConfigStoreError> {
        read_optional(StoreKind::Docker, self.docker_config_path())
    }
}

impl ContextStoreReader for HomeStores {
    fn read_context_store(&self) -> Result<Option<StoreContents>, ConfigStoreError> {
        read_optional(StoreKind::Kube, self.kube_config_path())
    }
}

/// Discovered candidates with a well-known fallback always in last position.
///
/// Entries are unique. The fallback never appears anywhere but last, so it
/// reads as the "none of the above" option in a picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateList {
    entries: Vec<String>,
}

impl CandidateList {
    fn with_fallback(discovered: Vec<String>, fallback: &str) -> Self {
        let mut entries: Vec<String> = Vec::with_capacity(discovered.len() + 1);
        for entry in discovered {
            if entry != fallback && !entries.contains(&entry) {
                entries.push(entry);
            }
        }
        entries.push(fallback.to_string());
        Self { entries }
    }

    pub fn as_slice(&self) -> &[String] {
        &self.entries
    }

    pub fn first(&self) -> &str {
        // never empty: the fallback is always pushed
        &self.entries[0]
    }
}

pub type RegistryList = CandidateList;
pub type ContextList = CandidateList;

/// Registry hostnames from the credential store's `auths` keys, then `default_registry`.
pub fn discover_registries(
    reader: &dyn RegistryStoreReader,
    default_registry: &str,
) -> Result<RegistryList, ConfigStoreError> {
    let discovered = match reader.read_registry_store()? {
        Some(contents) => registries_from_docker_config(&contents)?,
        None => Vec::new(),
    };
    debug!(count = discovered.len(), "discovered container registries");
    Ok(CandidateList::with_fallback(discovered, default_registry))
}

fn registries_from_docker_config(
    contents: &StoreContents,
) -> Result<Vec<String>, ConfigStoreError> {
    let parse_error =
        |detail: String| ConfigStoreError::parse(StoreKind::Docker, &contents.path, detail);
    let document: Value =
        serde_json::from_str(&contents.raw).map_err(|err| parse_error(err.to_string()))?;
    let auths = document
        .get("auths")
        .and_then(Value::as_object)
        .ok_or_else(|| parse_error("missing `auths` object".to_string()))?;
    Ok(auths.keys().cloned().collect())
}

#[derive(Debug, Deserialize)]
struct KubeConfig {
    contexts: Vec<KubeContextEntry>,
}

#[derive(Debug, Deserialize)]
struct KubeContextEntry {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    context: Option<KubeContextRef>,
}

#[derive(Debug, Deserialize)]
struct KubeContextRef {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    cluster: Option<String>,
}

/// Context names from the context store's `contexts` list, then `default_context`.
///
/// Each entry resolves to its own name, else its nested context name, else its
/// nested cluster name. Entries that resolve to nothing are dropped.
pub fn discover_contexts(
    reader: &dyn ContextStoreReader,
    default_context: &str,
) -> Result<ContextList, ConfigStoreError> {
    let discovered = match reader.read_context_store()? {
        Some(contents) => contexts_from_kube_config(&contents)?,
        None => Vec::new(),
    };
    debug!(count = discovered.len(), "discovered kubernetes contexts");
    Ok(CandidateList::with_fallback(discovered, default_context))
}

fn contexts_from_kube_config(contents: &StoreContents) -> Result<Vec<String>, ConfigStoreError> {
    let parse_error =
        |detail: String| ConfigStoreError::parse(StoreKind::Kube, &contents.path, detail);
    let config: KubeConfig =
        serde_yaml_bw::from_str(&contents.raw).map_err(|err| parse_error(err.to_string()))?;

    let mut names = Vec::with_capacity(config.contexts.len());
    for (index, entry) in config.contexts.into_iter().enumerate() {
        if let Some(name) = non_empty(entry.name) {
            names.push(name);
            continue;
        }
        let Some(context) = entry.context else {
            return Err(parse_error(format!(
                "context entry {index} has neither `name` nor `context`"
            )));
        };
        if let Some(name) = non_empty(context.name).or_else(|| non_empty(context.cluster)) {
            names.push(name);
        }
    }
    Ok(names)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}
