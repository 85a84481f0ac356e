//! Testing utilities for the duro workspace
//!
//! Shared fixtures and a wired-up in-memory engine.

#![allow(missing_docs)]

use duro_core::{
    ConvergenceEngine, MemoryArtifactStore, MemoryResourceStore, OperatorConfig, RecordingEventSink,
};
use duro_model::{ConfigObject, DashboardApp, DashboardAppSpec, ObjectKey};
use std::sync::Arc;

pub fn app(id: &str, name: &str, category: &str, priority: i32) -> DashboardApp {
    DashboardApp::new(
        id,
        DashboardAppSpec {
            name: name.to_string(),
            url: format!("https://{id}.example.com"),
            category: category.to_string(),
            icon: format!("<svg id=\"{id}\"/>"),
            groups: vec!["family".to_string()],
            priority,
        },
    )
}

pub fn app_in_groups(id: &str, category: &str, groups: &[&str]) -> DashboardApp {
    let mut app = app(id, &id.to_uppercase(), category, 0);
    app.spec.groups = groups.iter().map(|g| (*g).to_string()).collect();
    app
}

/// Three media apps that differ only in priority
pub fn media_trio() -> Vec<DashboardApp> {
    vec![
        app("a", "Alpha", "media", 50),
        app("b", "Beta", "media", 0),
        app("c", "Gamma", "media", 10),
    ]
}

/// One app per category, listed out of category order
pub fn mixed_trio() -> Vec<DashboardApp> {
    vec![
        app("x", "Xylo", "admin", 1),
        app("y", "Yak", "media", 999),
        app("z", "Zed", "ai", 1),
    ]
}

pub fn artifact_key() -> ObjectKey {
    OperatorConfig::default().artifact_key()
}

/// Engine over in-memory stores, with handles kept for assertions
pub struct Harness {
    pub resources: Arc<MemoryResourceStore>,
    pub artifacts: Arc<MemoryArtifactStore>,
    pub events: Arc<RecordingEventSink>,
    pub engine: ConvergenceEngine,
}

impl Harness {
    pub fn new(apps: impl IntoIterator<Item = DashboardApp>) -> Self {
        let resources = Arc::new(MemoryResourceStore::with_apps(apps));
        let artifacts = Arc::new(MemoryArtifactStore::new());
        let events = Arc::new(RecordingEventSink::new());
        let engine = ConvergenceEngine::new(
            Arc::clone(&resources) as _,
            Arc::clone(&artifacts) as _,
            Arc::clone(&events) as _,
            artifact_key(),
        );
        Self {
            resources,
            artifacts,
            events,
            engine,
        }
    }

    /// Stored apps config object
    pub fn artifact(&self) -> Option<ConfigObject> {
        self.artifacts.object(&artifact_key())
    }

    /// Published `apps.json`
    pub fn document(&self) -> Option<String> {
        self.artifact()
            .and_then(|object| object.apps_body().map(str::to_string))
    }

    /// Resource ids in published order
    pub fn published_ids(&self) -> Vec<String> {
        let Some(document) = self.document() else {
            return Vec::new();
        };
        let entries: Vec<serde_json::Value> = serde_json::from_str(&document).unwrap();
        entries
            .iter()
            .map(|e| e["id"].as_str().unwrap().to_string())
            .collect()
    }

    /// Whether `name` is marked ready
    pub fn is_ready(&self, name: &str) -> bool {
        self.resources.get(name).is_some_and(|a| a.status.ready)
    }
}
