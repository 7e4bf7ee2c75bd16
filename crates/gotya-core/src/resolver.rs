//! The dependency resolver (§4.7): drives the index store with
//! constraint accumulation across a batch of requests and emits a
//! topologically ordered, action-tagged plan.

use std::collections::{HashMap, HashSet};

use gotya_schema::ArtifactDescriptor;
use thiserror::Error;

use crate::constraint;
use crate::index_store::{IndexStore, IndexStoreError};

/// A single request in a resolve batch: either a user-requested artifact
/// or a synthesized request preserving an already-installed one.
#[derive(Debug, Clone)]
pub struct ResolveRequest {
    /// Artifact name.
    pub name: String,
    /// Constraint string; empty normalizes to `">= 0.0.0"`.
    pub version_constraint: String,
    /// Requested platform.
    pub os: String,
    /// Requested architecture.
    pub arch: String,
    /// Currently installed version, if this name is already installed.
    pub old_version: Option<String>,
    /// Soft preference: try to keep `old_version` unless a harder
    /// constraint elsewhere forces a change.
    pub keep_version: bool,
}

impl ResolveRequest {
    /// A fresh request with no installed-version preference.
    #[must_use]
    pub fn new(name: impl Into<String>, version_constraint: impl Into<String>, os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version_constraint: version_constraint.into(),
            os: os.into(),
            arch: arch.into(),
            old_version: None,
            keep_version: false,
        }
    }
}

/// The verb a [`PlanStep`] carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// The artifact is not currently installed.
    Install,
    /// The artifact is installed at a different version.
    Update,
    /// The artifact is already installed at the selected version.
    Skip,
}

/// One entry in a resolved plan, in dependency-before-dependent order.
#[derive(Debug, Clone)]
pub struct PlanStep {
    /// Artifact name.
    pub name: String,
    /// Selected version.
    pub version: String,
    /// Selected platform.
    pub os: String,
    /// Selected architecture.
    pub arch: String,
    /// Download URL, relative or absolute depending on whether the
    /// orchestrator has resolved it against the repository origin yet.
    pub source_url: String,
    /// Expected SHA-256 checksum.
    pub checksum: String,
    /// install / update / skip.
    pub action: Action,
    /// Human-readable justification for `action`.
    pub reason: String,
}

impl PlanStep {
    /// This step's unique identifier within the plan, `"name@version"`.
    #[must_use]
    pub fn id(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }
}

/// Errors resolving a batch of requests.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// The dependency graph reachable from the request set contains a
    /// cycle through the named artifact.
    #[error("dependency cycle detected at {0}")]
    DependencyCycle(String),
    /// A name could not be resolved against the index store: either no
    /// repository lists it, or no version satisfies the accumulated
    /// constraint and platform filter (the underlying message lists
    /// platform-compatible versions that were rejected).
    #[error(transparent)]
    NotFound(#[from] IndexStoreError),
}

#[derive(Debug, Clone, Default)]
struct Preference {
    old_version: Option<String>,
    keep_version: bool,
}

/// Per-call resolver state, owned for the duration of one [`resolve`] and
/// discarded afterward.
struct Resolution<'a> {
    store: &'a IndexStore,
    os: String,
    arch: String,
    constraints: HashMap<String, Vec<String>>,
    selected: HashMap<String, ArtifactDescriptor>,
    selection_order: Vec<String>,
    deps: HashMap<String, Vec<String>>,
    visiting: HashSet<String>,
    preferences: HashMap<String, Preference>,
}

impl<'a> Resolution<'a> {
    fn resolve_name(&mut self, name: &str) -> Result<(), ResolveError> {
        if self.visiting.contains(name) {
            return Err(ResolveError::DependencyCycle(name.to_string()));
        }
        self.visiting.insert(name.to_string());

        let combined = constraint::combine(self.constraints.get(name).map_or(&[][..], Vec::as_slice));
        let pref = self.preferences.get(name).cloned();

        let descriptor = self.select(name, &combined, pref.as_ref())?;

        if let Some(existing) = self.selected.get(name) {
            if existing.version == descriptor.version
                && existing.os == descriptor.os
                && existing.arch == descriptor.arch
            {
                self.visiting.remove(name);
                return Ok(());
            }
        } else {
            self.selection_order.push(name.to_string());
        }

        let dependency_names: Vec<String> = descriptor
            .dependencies
            .iter()
            .map(|d| d.name.clone())
            .collect();
        self.deps.insert(name.to_string(), dependency_names);
        self.selected.insert(name.to_string(), descriptor.clone());

        for dep in &descriptor.dependencies {
            self.constraints
                .entry(dep.name.clone())
                .or_default()
                .push(dep.version_constraint.clone());
            self.resolve_name(&dep.name)?;
        }

        self.visiting.remove(name);
        Ok(())
    }

    fn select(
        &self,
        name: &str,
        combined: &str,
        pref: Option<&Preference>,
    ) -> Result<ArtifactDescriptor, ResolveError> {
        if let Some(pref) = pref {
            if pref.keep_version {
                if let Some(old) = pref.old_version.as_deref().filter(|v| !v.is_empty()) {
                    let pinned = format!("{combined}, = {old}");
                    if let Ok(d) = self.store.resolve_artifact(name, &pinned, &self.os, &self.arch) {
                        return Ok(d);
                    }
                }
            }
        }
        Ok(self.store.resolve_artifact(name, combined, &self.os, &self.arch)?)
    }

    /// Post-order DFS over `deps`, starting from each requested name, then
    /// sweeping any remaining selected name not yet emitted.
    fn topological_order(&self, requested: &[String]) -> Vec<String> {
        let mut emitted = HashSet::new();
        let mut order = Vec::with_capacity(self.selection_order.len());
        for name in requested {
            self.visit(name, &mut emitted, &mut order);
        }
        for name in &self.selection_order {
            self.visit(name, &mut emitted, &mut order);
        }
        order
    }

    fn visit(&self, name: &str, emitted: &mut HashSet<String>, order: &mut Vec<String>) {
        if emitted.contains(name) {
            return;
        }
        emitted.insert(name.to_string());
        if let Some(deps) = self.deps.get(name) {
            for dep in deps {
                self.visit(dep, emitted, order);
            }
        }
        order.push(name.to_string());
    }
}

/// Determine the (os, arch) pair every resolve lookup uses: the common
/// value across all requests if they agree, else a fixed fallback.
/// Callers are expected to pass a homogeneous os/arch set; this only
/// guards against the corner case where they don't.
fn common_platform(requests: &[ResolveRequest]) -> (String, String) {
    let mut distinct: Vec<(&str, &str)> = Vec::new();
    for r in requests {
        let pair = (r.os.as_str(), r.arch.as_str());
        if !distinct.contains(&pair) {
            distinct.push(pair);
        }
    }
    match distinct.as_slice() {
        [(os, arch)] => ((*os).to_string(), (*arch).to_string()),
        _ => ("linux".to_string(), "amd64".to_string()),
    }
}

/// Resolve a batch of requests against `store`, returning a topologically
/// ordered, action-tagged plan.
///
/// # Errors
///
/// Returns [`ResolveError::DependencyCycle`] if the dependency graph
/// reachable from `requests` contains a cycle, or [`ResolveError::NotFound`]
/// if any name/constraint/platform combination cannot be satisfied.
pub fn resolve(requests: &[ResolveRequest], store: &IndexStore) -> Result<Vec<PlanStep>, ResolveError> {
    tracing::debug!("resolving {} request(s)", requests.len());
    let (os, arch) = common_platform(requests);

    let mut preferences = HashMap::new();
    let mut constraints: HashMap<String, Vec<String>> = HashMap::new();
    let mut requested_order: Vec<String> = Vec::new();

    for request in requests {
        preferences.insert(
            request.name.clone(),
            Preference {
                old_version: request.old_version.clone(),
                keep_version: request.keep_version,
            },
        );
        constraints
            .entry(request.name.clone())
            .or_default()
            .push(constraint::normalize(&request.version_constraint));
        if !requested_order.contains(&request.name) {
            requested_order.push(request.name.clone());
        }
    }

    let mut resolution = Resolution {
        store,
        os,
        arch,
        constraints,
        selected: HashMap::new(),
        selection_order: Vec::new(),
        deps: HashMap::new(),
        visiting: HashSet::new(),
        preferences,
    };

    for name in &requested_order {
        resolution.resolve_name(name)?;
    }

    let order = resolution.topological_order(&requested_order);

    Ok(order
        .into_iter()
        .map(|name| {
            let descriptor = resolution
                .selected
                .get(&name)
                .expect("every emitted name was resolved")
                .clone();
            let pref = resolution.preferences.get(&name);
            let (action, reason) = classify(pref, &descriptor.version);
            PlanStep {
                name: descriptor.name,
                version: descriptor.version,
                os: descriptor.os,
                arch: descriptor.arch,
                source_url: descriptor.url,
                checksum: descriptor.checksum,
                action,
                reason,
            }
        })
        .collect())
}

fn classify(pref: Option<&Preference>, selected_version: &str) -> (Action, String) {
    match pref.and_then(|p| p.old_version.as_deref()).filter(|v| !v.is_empty()) {
        Some(old) if old == selected_version => (
            Action::Skip,
            "already at the required version".to_string(),
        ),
        Some(old) => (
            Action::Update,
            format!("updating from {old} to {selected_version}"),
        ),
        None => (Action::Install, "new artifact installation".to_string()),
    }
}
