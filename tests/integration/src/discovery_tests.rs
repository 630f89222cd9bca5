//! Discovery of conventions exported by linked modules
//!
//! This binary exports four modules:
//!
//! - `integration-tests` (the package itself): core services
//! - `integration-plugins`, referencing it: test-only services
//! - `broken-plugin`, referencing it: fails to load
//! - `unrelated`: references nothing and is never a candidate

use std::sync::Arc;

use conv_contracts::{BoxError, Configuration, ServiceCollection};
use conv_core::{
    CancellationToken, ConventionContext, ConventionEntry, ConventionHostBuilder, ConventionId,
    ConventionResult, Diagnostic, Direction, HostSettings, HostType, ServiceConvention,
};
use conv_test_utils::SimpleProviderFactory;
use pretty_assertions::assert_eq;

trait Greeter: Send + Sync {
    fn greet(&self) -> &'static str;
}

struct English;

impl Greeter for English {
    fn greet(&self) -> &'static str {
        "hello"
    }
}

struct Canned;

impl Greeter for Canned {
    fn greet(&self) -> &'static str {
        "canned greeting"
    }
}

struct CoreServices;

impl ServiceConvention for CoreServices {
    fn register(
        &self,
        _context: &mut ConventionContext,
        services: &mut ServiceCollection,
        _configuration: &Configuration,
    ) -> ConventionResult {
        services.add_singleton::<dyn Greeter>(Arc::new(English));
        Ok(())
    }
}

struct TestServices;

impl ServiceConvention for TestServices {
    fn register(
        &self,
        _context: &mut ConventionContext,
        services: &mut ServiceCollection,
        _configuration: &Configuration,
    ) -> ConventionResult {
        services.add_singleton::<dyn Greeter>(Arc::new(Canned));
        Ok(())
    }
}

struct UnrelatedServices;

impl ServiceConvention for UnrelatedServices {
    fn register(
        &self,
        _context: &mut ConventionContext,
        _services: &mut ServiceCollection,
        _configuration: &Configuration,
    ) -> ConventionResult {
        Err("unrelated module must not be scanned".into())
    }
}

fn core_exports() -> Result<Vec<ConventionEntry>, BoxError> {
    Ok(vec![ConventionEntry::services(CoreServices)])
}

fn plugin_exports() -> Result<Vec<ConventionEntry>, BoxError> {
    Ok(vec![
        ConventionEntry::services(TestServices)
            .after(ConventionId::of::<CoreServices>())
            .only_for(HostType::UnitTest),
    ])
}

fn broken_exports() -> Result<Vec<ConventionEntry>, BoxError> {
    Err("missing native library".into())
}

fn unrelated_exports() -> Result<Vec<ConventionEntry>, BoxError> {
    Ok(vec![ConventionEntry::services(UnrelatedServices)])
}

conv_core::export_conventions!(exports: core_exports);

conv_core::export_conventions!(
    name: "integration-plugins",
    references: ["integration-tests"],
    exports: plugin_exports,
);

conv_core::export_conventions!(
    name: "broken-plugin",
    references: ["integration-tests"],
    exports: broken_exports,
);

conv_core::export_conventions!(
    name: "unrelated",
    references: [],
    exports: unrelated_exports,
);

fn scanning_builder(host_type: HostType) -> ConventionHostBuilder {
    let mut builder = ConventionHostBuilder::new();
    builder
        .with_host_type(host_type)
        .scan(["integration-tests"]);
    builder
}

#[test]
fn test_scan_orders_dependents_after_their_references() {
    let plan = scanning_builder(HostType::UnitTest).plan().unwrap();

    assert_eq!(
        plan.ids(),
        vec![
            ConventionId::of::<CoreServices>(),
            ConventionId::of::<TestServices>()
        ]
    );
}

#[test]
fn test_module_failure_is_reported_not_fatal() {
    let plan = scanning_builder(HostType::Live).plan().unwrap();

    assert_eq!(plan.ids(), vec![ConventionId::of::<CoreServices>()]);
    assert!(matches!(
        plan.diagnostics(),
        [Diagnostic::DiscoveryFailure { module, reason }]
            if module == "broken-plugin" && reason.contains("missing native library")
    ));
}

#[tokio::test]
async fn test_test_services_override_core_for_unit_tests() {
    let host = scanning_builder(HostType::UnitTest)
        .build_host(SimpleProviderFactory, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        host.provider().required::<dyn Greeter>().greet(),
        "canned greeting"
    );
    assert_eq!(host.provider().get_all::<dyn Greeter>().len(), 2);
}

#[tokio::test]
async fn test_live_host_keeps_core_services() {
    let host = scanning_builder(HostType::Live)
        .build_host(SimpleProviderFactory, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(host.provider().required::<dyn Greeter>().greet(), "hello");
}

#[test]
fn test_dependency_direction_skips_siblings() {
    let mut builder = ConventionHostBuilder::new();
    builder
        .with_host_type(HostType::UnitTest)
        .scan(["integration-plugins"])
        .with_scan_direction(Direction::Dependencies);

    let plan = builder.plan().unwrap();
    assert_eq!(plan.len(), 2);
    assert!(plan.diagnostics().is_empty());
}

#[test]
fn test_settings_enable_scanning_and_exclusion() {
    let settings = HostSettings::parse(
        r#"
[host]
host_type = "unit-test"

[conventions]
scan = true
seeds = ["integration-tests"]
exclude = ["TestServices"]
"#,
        std::path::Path::new("conventions.toml"),
    )
    .unwrap();

    let plan = ConventionHostBuilder::from_settings(&settings).plan().unwrap();
    assert_eq!(plan.ids(), vec![ConventionId::of::<CoreServices>()]);
}
