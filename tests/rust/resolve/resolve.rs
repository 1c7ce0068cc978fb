//! Copyright © 2025-2026 Gearbox Team. All Rights Reserved.
//!
//! This file is part of Cog.
//! The Cog project belongs to the Gearbox Team.

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::Arc;

use cogx::errors::{CogError, Result};
use cogx::loader::CogStaticLoader;
use cogx::manifest::CogPluginMetadata;
use cogx::plugin::{
    CogDependencyRequirement, CogInstanceConfig, CogPlugin, CogPluginFactory, CogPluginKind,
};
use cogx::resolve::CogDependencyResolver;

#[derive(Debug)]
struct TestPlugin {
    identifier: String,
    requirements: Vec<CogDependencyRequirement>,
}

impl CogPlugin for TestPlugin {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn set_identifier(&mut self, identifier: &str) {
        self.identifier = identifier.to_string();
    }

    fn kind(&self) -> CogPluginKind {
        CogPluginKind::Tool
    }

    fn display_name(&self) -> String {
        self.identifier.clone()
    }

    fn description(&self) -> String {
        String::new()
    }

    fn requirements(&self) -> Vec<CogDependencyRequirement> {
        self.requirements.clone()
    }

    fn run(&mut self) -> Result<()> {
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        Ok(())
    }
}

struct TestFactory {
    requirements: Vec<CogDependencyRequirement>,
}

impl CogPluginFactory for TestFactory {
    fn create(&self, config: CogInstanceConfig) -> Result<Box<dyn CogPlugin>> {
        Ok(Box::new(TestPlugin {
            identifier: config.metadata.main_entry.clone(),
            requirements: self.requirements.clone(),
        }))
    }
}

struct RefusingFactory;

impl CogPluginFactory for RefusingFactory {
    fn create(&self, config: CogInstanceConfig) -> Result<Box<dyn CogPlugin>> {
        Err(CogError::instantiation(
            config.metadata.main_entry.clone(),
            "constructor always fails",
        ))
    }
}

fn metadata(main_entry: &str) -> Arc<CogPluginMetadata> {
    Arc::new(CogPluginMetadata {
        archive_path: PathBuf::from(format!("{}.zip", main_entry)),
        main_entry: main_entry.to_string(),
        version: "1.0".to_string(),
        author: "test".to_string(),
        default_name: main_entry.to_string(),
        default_description: String::new(),
        has_help: false,
        locales: BTreeSet::new(),
        default_locale: "en".to_string(),
    })
}

struct Fixture {
    discovered: HashMap<String, Arc<CogPluginMetadata>>,
    factories: HashMap<String, Arc<dyn CogPluginFactory>>,
}

impl Fixture {
    fn new() -> Self {
        Fixture {
            discovered: HashMap::new(),
            factories: HashMap::new(),
        }
    }

    fn with_entry(mut self, id: &str, requirements: Vec<CogDependencyRequirement>) -> Self {
        self.discovered.insert(id.to_string(), metadata(id));
        self.factories
            .insert(id.to_string(), Arc::new(TestFactory { requirements }));
        self
    }
}

#[test]
fn test_entry_without_requirements_survives() {
    let fixture = Fixture::new().with_entry("demo.Plain", vec![]);
    let survivors = CogDependencyResolver::resolve(
        &fixture.discovered,
        &fixture.factories,
        &[],
        &CogStaticLoader::new(),
    );
    assert!(survivors.contains("demo.Plain"));
    assert_eq!(survivors.len(), 1);
}

#[test]
fn test_unsatisfiable_external_archive_is_pruned() {
    let fixture = Fixture::new()
        .with_entry("demo.P", vec![])
        .with_entry(
            "demo.Q",
            vec![CogDependencyRequirement::Entry("demo.P".to_string())],
        )
        .with_entry(
            "demo.R",
            vec![CogDependencyRequirement::ExternalArchive("lib.jar".to_string())],
        );
    let survivors = CogDependencyResolver::resolve(
        &fixture.discovered,
        &fixture.factories,
        &[],
        &CogStaticLoader::new(),
    );
    assert_eq!(survivors.identifiers(), vec!["demo.P", "demo.Q"]);
}

#[test]
fn test_classpath_archive_satisfies_external_requirement() {
    let fixture = Fixture::new().with_entry(
        "demo.R",
        vec![CogDependencyRequirement::ExternalArchive("lib.jar".to_string())],
    );
    let survivors = CogDependencyResolver::resolve(
        &fixture.discovered,
        &fixture.factories,
        &["lib.jar".to_string()],
        &CogStaticLoader::new(),
    );
    assert!(survivors.contains("demo.R"));
}

#[test]
fn test_removal_cascades_to_validated_dependents() {
    // "app.Alpha" is validated first (sorted order) against "app.Zulu",
    // which is later pruned; the cascade must take Alpha down with it.
    let fixture = Fixture::new()
        .with_entry(
            "app.Alpha",
            vec![CogDependencyRequirement::Entry("app.Zulu".to_string())],
        )
        .with_entry(
            "app.Zulu",
            vec![CogDependencyRequirement::ExternalArchive(
                "missing.jar".to_string(),
            )],
        );
    let survivors = CogDependencyResolver::resolve(
        &fixture.discovered,
        &fixture.factories,
        &[],
        &CogStaticLoader::new(),
    );
    assert!(survivors.is_empty());
}

#[test]
fn test_cascade_spares_independent_entries() {
    let fixture = Fixture::new()
        .with_entry(
            "app.Alpha",
            vec![CogDependencyRequirement::Entry("app.Zulu".to_string())],
        )
        .with_entry("app.Solo", vec![])
        .with_entry(
            "app.Zulu",
            vec![CogDependencyRequirement::ExternalArchive(
                "missing.jar".to_string(),
            )],
        );
    let survivors = CogDependencyResolver::resolve(
        &fixture.discovered,
        &fixture.factories,
        &[],
        &CogStaticLoader::new(),
    );
    assert_eq!(survivors.identifiers(), vec!["app.Solo"]);
}

#[test]
fn test_host_class_satisfies_entry_requirement() {
    let fixture = Fixture::new().with_entry(
        "demo.Needy",
        vec![CogDependencyRequirement::Entry("host.Util".to_string())],
    );

    let survivors = CogDependencyResolver::resolve(
        &fixture.discovered,
        &fixture.factories,
        &[],
        &CogStaticLoader::new(),
    );
    assert!(survivors.is_empty());

    let mut loader = CogStaticLoader::new();
    loader.register_host_class("host.Util");
    let survivors = CogDependencyResolver::resolve(
        &fixture.discovered,
        &fixture.factories,
        &[],
        &loader,
    );
    assert!(survivors.contains("demo.Needy"));
}

#[test]
fn test_entry_without_factory_is_pruned() {
    let mut fixture = Fixture::new().with_entry("demo.Keeper", vec![]);
    fixture
        .discovered
        .insert("demo.Orphan".to_string(), metadata("demo.Orphan"));

    let survivors = CogDependencyResolver::resolve(
        &fixture.discovered,
        &fixture.factories,
        &[],
        &CogStaticLoader::new(),
    );
    assert_eq!(survivors.identifiers(), vec!["demo.Keeper"]);
}

#[test]
fn test_failing_factory_prunes_entry_and_dependents() {
    let mut fixture = Fixture::new().with_entry(
        "demo.Leaner",
        vec![CogDependencyRequirement::Entry("demo.Shaky".to_string())],
    );
    fixture
        .discovered
        .insert("demo.Shaky".to_string(), metadata("demo.Shaky"));
    fixture
        .factories
        .insert("demo.Shaky".to_string(), Arc::new(RefusingFactory));

    let survivors = CogDependencyResolver::resolve(
        &fixture.discovered,
        &fixture.factories,
        &[],
        &CogStaticLoader::new(),
    );
    // Shaky's requirements can never be read, and Leaner depends on it.
    assert!(survivors.is_empty());
}
