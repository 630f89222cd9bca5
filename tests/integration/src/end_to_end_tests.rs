//! End-to-end composition of a host from explicit conventions
//!
//! Every contract is exercised once, with a mix of instance conventions,
//! delegates, and async registrations.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clap::{Arg, Command};
use conv_contracts::{
    CommandLineBuilder, Configuration, ConfigurationBuilder, HostHandle, LoggingBuilder,
    ServiceCollection,
};
use conv_core::{
    AsyncHostCreatedConvention, AsyncSetupConvention, CancellationToken, CommandLineConvention,
    ConfigurationConvention, ContractKind, ConventionContext, ConventionEntry,
    ConventionHostBuilder, ConventionId, ConventionMetadata, ConventionResult, Delegate, Error,
    Host, HostEnvironment, HostType, LoggingConvention, PropertyKey, ServiceConvention,
};
use conv_test_utils::{Journal, SimpleProviderFactory, SimpleServiceProvider};
use pretty_assertions::assert_eq;
use serde::Deserialize;
use tracing::level_filters::LevelFilter;

const CONNECTION: PropertyKey<String> = PropertyKey::new("connection-string");

#[derive(Debug, Deserialize, PartialEq)]
struct DatabaseOptions {
    host: String,
    port: u16,
}

trait Repository: Send + Sync {
    fn describe(&self) -> String;
}

struct SqlRepository {
    options: DatabaseOptions,
}

impl Repository for SqlRepository {
    fn describe(&self) -> String {
        format!("sql://{}:{}", self.options.host, self.options.port)
    }
}

struct InMemoryRepository;

impl Repository for InMemoryRepository {
    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// Loads a connection string the way a secret store would.
struct SecretsSetup;

#[async_trait]
impl AsyncSetupConvention for SecretsSetup {
    async fn register(
        &self,
        context: &mut ConventionContext,
        cancellation: CancellationToken,
    ) -> ConventionResult {
        tokio::select! {
            _ = cancellation.cancelled() => return Err("secret lookup cancelled".into()),
            _ = tokio::time::sleep(Duration::from_millis(1)) => {}
        }
        context.set_keyed(&CONNECTION, "db.internal:5432".to_string());
        Ok(())
    }
}

struct DatabaseConfiguration;

impl ConfigurationConvention for DatabaseConfiguration {
    fn register(
        &self,
        context: &mut ConventionContext,
        builder: &mut ConfigurationBuilder,
    ) -> ConventionResult {
        let connection = context
            .get_keyed(&CONNECTION)
            .ok_or("connection string not loaded")?;
        let (host, port) = connection
            .split_once(':')
            .ok_or("connection string has no port")?;
        builder.add_in_memory([("database:host", host), ("database:port", port)]);
        Ok(())
    }
}

struct CoreServices;

impl ServiceConvention for CoreServices {
    fn register(
        &self,
        _context: &mut ConventionContext,
        services: &mut ServiceCollection,
        configuration: &Configuration,
    ) -> ConventionResult {
        let options: DatabaseOptions = configuration.bind("database")?;
        services.add_singleton::<dyn Repository>(Arc::new(SqlRepository { options }));
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
        services.add_singleton::<dyn Repository>(Arc::new(InMemoryRepository));
        Ok(())
    }
}

struct MigrateCommand;

impl CommandLineConvention for MigrateCommand {
    fn register(
        &self,
        context: &mut ConventionContext,
        command_line: &mut CommandLineBuilder,
    ) -> ConventionResult {
        context.logger().debug("adding migrate command");
        command_line.add_command(
            Command::new("migrate").arg(Arg::new("target").long("target").required(false)),
        );
        Ok(())
    }
}

struct QuietInProduction;

impl LoggingConvention for QuietInProduction {
    fn register(
        &self,
        context: &mut ConventionContext,
        logging: &mut LoggingBuilder,
    ) -> ConventionResult {
        if context.environment().is_production() {
            logging.set_minimum_level(LevelFilter::WARN);
        } else {
            logging.set_minimum_level(LevelFilter::DEBUG);
        }
        logging.add_directive("sqlx=warn");
        Ok(())
    }
}

/// Marks the host as warmed up once the provider is available.
struct Warmup {
    journal: Journal,
}

#[async_trait]
impl AsyncHostCreatedConvention for Warmup {
    async fn register(
        &self,
        context: &mut ConventionContext,
        host: HostHandle<'_>,
        _cancellation: CancellationToken,
    ) -> ConventionResult {
        let host = host
            .downcast_ref::<Host<SimpleServiceProvider>>()
            .ok_or("unexpected host type")?;
        let repository = host.provider().required::<dyn Repository>();
        self.journal.record(format!("warmed {}", repository.describe()));
        context.set(true);
        Ok(())
    }
}

fn application(journal: &Journal) -> ConventionHostBuilder {
    let mut builder = ConventionHostBuilder::new();
    builder
        .with_environment(HostEnvironment::new(HostEnvironment::DEVELOPMENT, "/srv/app"))
        // Declared out of dependency order on purpose.
        .append_convention(
            ConventionEntry::services(TestServices)
                .after(ConventionId::of::<CoreServices>())
                .only_for(HostType::UnitTest),
        )
        .append_convention(ConventionEntry::services(CoreServices))
        .append_convention(ConventionEntry::configuration(DatabaseConfiguration))
        .append_convention(ConventionEntry::setup_async(SecretsSetup))
        .append_convention(ConventionEntry::command_line(MigrateCommand))
        .append_convention(ConventionEntry::logging(QuietInProduction))
        .append_convention(ConventionEntry::host_created_async(Warmup {
            journal: journal.clone(),
        }))
        .append_delegate(
            Delegate::webjobs(|_, webjobs| {
                webjobs.configure_extension("timers", "schedule", "*/5 * * * *");
                Ok(())
            }),
            ConventionMetadata::new(),
        );
    builder
}

#[tokio::test]
async fn test_unit_test_host_uses_test_services() {
    let journal = Journal::new();
    let mut builder = application(&journal);
    builder.with_host_type(HostType::UnitTest);

    let host = builder
        .build_host(SimpleProviderFactory, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(host.provider().required::<dyn Repository>().describe(), "memory");
    assert_eq!(journal.records(), vec!["warmed memory"]);
    assert_eq!(host.applied(ContractKind::Services), 2);
    assert_eq!(host.properties().get::<bool>(), Some(&true));
}

#[tokio::test]
async fn test_live_host_binds_configuration() {
    let journal = Journal::new();
    let mut builder = application(&journal);
    builder.with_host_type(HostType::Live);

    let host = builder
        .build_host(SimpleProviderFactory, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        host.provider().required::<dyn Repository>().describe(),
        "sql://db.internal:5432"
    );
    assert_eq!(
        host.configuration().bind::<DatabaseOptions>("database").unwrap(),
        DatabaseOptions {
            host: "db.internal".to_string(),
            port: 5432,
        }
    );
    assert_eq!(host.command_line().subcommand_names(), vec!["migrate"]);
    assert_eq!(host.logging().minimum_level(), LevelFilter::DEBUG);
    assert_eq!(host.logging().directives(), &["sqlx=warn".to_string()]);
    assert!(host.webjobs().has_extension("timers"));
    assert_eq!(host.host_type(), HostType::Live);
    assert!(host.environment().is_development());
}

#[tokio::test]
async fn test_failing_configuration_aborts_before_services() {
    let journal = Journal::new();
    let mut builder = application(&journal);
    builder
        .with_host_type(HostType::Live)
        .exclude(ConventionId::of::<SecretsSetup>());

    let err = builder
        .build_host(SimpleProviderFactory, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        &err,
        Error::ConventionFailed { id, contract: ContractKind::Configuration, .. }
            if *id == ConventionId::of::<DatabaseConfiguration>()
    ));
    assert!(err.to_string().contains("connection string not loaded"));
    assert!(journal.is_empty());
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let journal = Journal::new();
    let builder = application(&journal);
    let cancellation = CancellationToken::new();
    cancellation.cancel();

    let err = builder
        .build_host(SimpleProviderFactory, &cancellation)
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert!(journal.is_empty());
}

#[test]
fn test_plan_lists_every_contract() {
    let journal = Journal::new();
    let mut builder = application(&journal);
    builder.with_host_type(HostType::UnitTest);

    let plan = builder.plan().unwrap();
    let contracts: Vec<ContractKind> = plan.entries().iter().map(|e| e.contract()).collect();

    assert_eq!(plan.len(), 8);
    for contract in ContractKind::ALL {
        assert!(contracts.contains(&contract), "{contract} missing from plan");
    }
    let core = plan
        .ids()
        .iter()
        .position(|id| *id == ConventionId::of::<CoreServices>());
    let test = plan
        .ids()
        .iter()
        .position(|id| *id == ConventionId::of::<TestServices>());
    assert!(core < test);
}
