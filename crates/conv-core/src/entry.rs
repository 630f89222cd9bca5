//! Convention entries
//!
//! A [`ConventionEntry`] is one unit of composition logic: an identity, the
//! contract it registers against, a sync or async callback, and ordering
//! metadata. Instance conventions and bare delegates both end up as entries;
//! the composer dispatches on the [`Registration`] variant and never needs to
//! know which kind it was given.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use conv_contracts::{
    BoxError, CommandLineBuilder, Configuration, ConfigurationBuilder, HostHandle, LoggingBuilder,
    ServiceCollection, WebJobsBuilder,
};
use tokio_util::sync::CancellationToken;

use crate::capability::{
    AsyncHostCreatedConvention, AsyncSetupConvention, CommandLineConvention,
    ConfigurationConvention, HostCreatedConvention, LoggingConvention, ServiceConvention,
    SetupConvention, WebJobsConvention,
};
use crate::context::{ConventionContext, HostType};
use crate::id::{ContractKind, ConventionId};

/// Outcome of a single convention invocation.
pub type ConventionResult = std::result::Result<(), BoxError>;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub type SetupFn = Arc<dyn Fn(&mut ConventionContext) -> ConventionResult + Send + Sync>;
pub type AsyncSetupFn = Arc<
    dyn for<'a> Fn(&'a mut ConventionContext, CancellationToken) -> BoxFuture<'a, ConventionResult>
        + Send
        + Sync,
>;

pub type ConfigurationFn = Arc<
    dyn Fn(&mut ConventionContext, &mut ConfigurationBuilder) -> ConventionResult + Send + Sync,
>;
pub type AsyncConfigurationFn = Arc<
    dyn for<'a> Fn(
            &'a mut ConventionContext,
            &'a mut ConfigurationBuilder,
            CancellationToken,
        ) -> BoxFuture<'a, ConventionResult>
        + Send
        + Sync,
>;

pub type ServicesFn = Arc<
    dyn Fn(&mut ConventionContext, &mut ServiceCollection, &Configuration) -> ConventionResult
        + Send
        + Sync,
>;
pub type AsyncServicesFn = Arc<
    dyn for<'a> Fn(
            &'a mut ConventionContext,
            &'a mut ServiceCollection,
            &'a Configuration,
            CancellationToken,
        ) -> BoxFuture<'a, ConventionResult>
        + Send
        + Sync,
>;

pub type CommandLineFn = Arc<
    dyn Fn(&mut ConventionContext, &mut CommandLineBuilder) -> ConventionResult + Send + Sync,
>;
pub type AsyncCommandLineFn = Arc<
    dyn for<'a> Fn(
            &'a mut ConventionContext,
            &'a mut CommandLineBuilder,
            CancellationToken,
        ) -> BoxFuture<'a, ConventionResult>
        + Send
        + Sync,
>;

pub type LoggingFn =
    Arc<dyn Fn(&mut ConventionContext, &mut LoggingBuilder) -> ConventionResult + Send + Sync>;
pub type AsyncLoggingFn = Arc<
    dyn for<'a> Fn(
            &'a mut ConventionContext,
            &'a mut LoggingBuilder,
            CancellationToken,
        ) -> BoxFuture<'a, ConventionResult>
        + Send
        + Sync,
>;

pub type WebJobsFn =
    Arc<dyn Fn(&mut ConventionContext, &mut WebJobsBuilder) -> ConventionResult + Send + Sync>;
pub type AsyncWebJobsFn = Arc<
    dyn for<'a> Fn(
            &'a mut ConventionContext,
            &'a mut WebJobsBuilder,
            CancellationToken,
        ) -> BoxFuture<'a, ConventionResult>
        + Send
        + Sync,
>;

pub type HostCreatedFn =
    Arc<dyn Fn(&mut ConventionContext, HostHandle<'_>) -> ConventionResult + Send + Sync>;
pub type AsyncHostCreatedFn = Arc<
    dyn for<'a> Fn(
            &'a mut ConventionContext,
            HostHandle<'a>,
            CancellationToken,
        ) -> BoxFuture<'a, ConventionResult>
        + Send
        + Sync,
>;

/// A callback that either completes inline or must be awaited.
#[derive(Clone)]
pub enum Handler<S, A> {
    Sync(S),
    Async(A),
}

impl<S, A> Handler<S, A> {
    pub fn is_async(&self) -> bool {
        matches!(self, Handler::Async(_))
    }
}

/// The contract an entry registers against, with its callback.
#[derive(Clone)]
pub enum Registration {
    Setup(Handler<SetupFn, AsyncSetupFn>),
    Configuration(Handler<ConfigurationFn, AsyncConfigurationFn>),
    Services(Handler<ServicesFn, AsyncServicesFn>),
    CommandLine(Handler<CommandLineFn, AsyncCommandLineFn>),
    Logging(Handler<LoggingFn, AsyncLoggingFn>),
    WebJobs(Handler<WebJobsFn, AsyncWebJobsFn>),
    HostCreated(Handler<HostCreatedFn, AsyncHostCreatedFn>),
}

impl Registration {
    pub fn contract(&self) -> ContractKind {
        match self {
            Registration::Setup(_) => ContractKind::Setup,
            Registration::Configuration(_) => ContractKind::Configuration,
            Registration::Services(_) => ContractKind::Services,
            Registration::CommandLine(_) => ContractKind::CommandLine,
            Registration::Logging(_) => ContractKind::Logging,
            Registration::WebJobs(_) => ContractKind::WebJobs,
            Registration::HostCreated(_) => ContractKind::HostCreated,
        }
    }

    pub fn is_async(&self) -> bool {
        match self {
            Registration::Setup(h) => h.is_async(),
            Registration::Configuration(h) => h.is_async(),
            Registration::Services(h) => h.is_async(),
            Registration::CommandLine(h) => h.is_async(),
            Registration::Logging(h) => h.is_async(),
            Registration::WebJobs(h) => h.is_async(),
            Registration::HostCreated(h) => h.is_async(),
        }
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shape = if self.is_async() { "async" } else { "sync" };
        write!(f, "{}({shape})", self.contract())
    }
}

/// Ordering and applicability hints attached to an entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConventionMetadata {
    after: Vec<ConventionId>,
    before: Vec<ConventionId>,
    required: Vec<ConventionId>,
    priority: i32,
    host_types: Vec<HostType>,
}

impl ConventionMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run after `id` when it is present. An absent target is ignored.
    pub fn after(mut self, id: ConventionId) -> Self {
        if !self.after.contains(&id) {
            self.after.push(id);
        }
        self
    }

    /// Run after `id`, which must be present in the resolved catalog.
    pub fn depends_on(mut self, id: ConventionId) -> Self {
        if !self.required.contains(&id) {
            self.required.push(id);
        }
        self.after(id)
    }

    /// Run before `id` when it is present.
    pub fn before(mut self, id: ConventionId) -> Self {
        if !self.before.contains(&id) {
            self.before.push(id);
        }
        self
    }

    /// Lower priorities sort earlier among otherwise unordered entries.
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Restrict the entry to a host type. May be called more than once.
    pub fn only_for(mut self, host_type: HostType) -> Self {
        if !self.host_types.contains(&host_type) {
            self.host_types.push(host_type);
        }
        self
    }

    pub fn run_after(&self) -> &[ConventionId] {
        &self.after
    }

    pub fn run_before(&self) -> &[ConventionId] {
        &self.before
    }

    pub fn required(&self) -> &[ConventionId] {
        &self.required
    }

    pub fn priority_value(&self) -> i32 {
        self.priority
    }

    pub fn host_types(&self) -> &[HostType] {
        &self.host_types
    }

    /// An empty restriction applies to every host type.
    pub fn applies_to(&self, host_type: HostType) -> bool {
        self.host_types.is_empty() || self.host_types.contains(&host_type)
    }
}

/// How an entry was registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Instance,
    Delegate,
}

/// A bare function registered as a convention.
///
/// A capture-free function is identified by its type, so registering the
/// same function item twice yields the same identity. A capturing closure
/// gets a fresh identity per delegate, even when several come from the same
/// source location; clones of a delegate keep its identity.
#[derive(Clone)]
pub struct Delegate {
    id: ConventionId,
    registration: Registration,
}

impl Delegate {
    fn new<F: 'static>(registration: Registration) -> Self {
        // Closures from one site share a type whatever they capture.
        let id = if std::mem::size_of::<F>() == 0 {
            ConventionId::of::<F>()
        } else {
            ConventionId::unique(std::any::type_name::<F>())
        };
        Self { id, registration }
    }

    pub fn setup<F>(f: F) -> Self
    where
        F: Fn(&mut ConventionContext) -> ConventionResult + Send + Sync + 'static,
    {
        Self::new::<F>(Registration::Setup(Handler::Sync(Arc::new(f))))
    }

    pub fn setup_async<F>(f: F) -> Self
    where
        F: for<'a> Fn(&'a mut ConventionContext, CancellationToken) -> BoxFuture<'a, ConventionResult>
            + Send
            + Sync
            + 'static,
    {
        Self::new::<F>(Registration::Setup(Handler::Async(Arc::new(f))))
    }

    pub fn configuration<F>(f: F) -> Self
    where
        F: Fn(&mut ConventionContext, &mut ConfigurationBuilder) -> ConventionResult
            + Send
            + Sync
            + 'static,
    {
        Self::new::<F>(Registration::Configuration(Handler::Sync(Arc::new(f))))
    }

    pub fn configuration_async<F>(f: F) -> Self
    where
        F: for<'a> Fn(
                &'a mut ConventionContext,
                &'a mut ConfigurationBuilder,
                CancellationToken,
            ) -> BoxFuture<'a, ConventionResult>
            + Send
            + Sync
            + 'static,
    {
        Self::new::<F>(Registration::Configuration(Handler::Async(Arc::new(f))))
    }

    pub fn services<F>(f: F) -> Self
    where
        F: Fn(&mut ConventionContext, &mut ServiceCollection, &Configuration) -> ConventionResult
            + Send
            + Sync
            + 'static,
    {
        Self::new::<F>(Registration::Services(Handler::Sync(Arc::new(f))))
    }

    pub fn services_async<F>(f: F) -> Self
    where
        F: for<'a> Fn(
                &'a mut ConventionContext,
                &'a mut ServiceCollection,
                &'a Configuration,
                CancellationToken,
            ) -> BoxFuture<'a, ConventionResult>
            + Send
            + Sync
            + 'static,
    {
        Self::new::<F>(Registration::Services(Handler::Async(Arc::new(f))))
    }

    pub fn command_line<F>(f: F) -> Self
    where
        F: Fn(&mut ConventionContext, &mut CommandLineBuilder) -> ConventionResult
            + Send
            + Sync
            + 'static,
    {
        Self::new::<F>(Registration::CommandLine(Handler::Sync(Arc::new(f))))
    }

    pub fn command_line_async<F>(f: F) -> Self
    where
        F: for<'a> Fn(
                &'a mut ConventionContext,
                &'a mut CommandLineBuilder,
                CancellationToken,
            ) -> BoxFuture<'a, ConventionResult>
            + Send
            + Sync
            + 'static,
    {
        Self::new::<F>(Registration::CommandLine(Handler::Async(Arc::new(f))))
    }

    pub fn logging<F>(f: F) -> Self
    where
        F: Fn(&mut ConventionContext, &mut LoggingBuilder) -> ConventionResult
            + Send
            + Sync
            + 'static,
    {
        Self::new::<F>(Registration::Logging(Handler::Sync(Arc::new(f))))
    }

    pub fn logging_async<F>(f: F) -> Self
    where
        F: for<'a> Fn(
                &'a mut ConventionContext,
                &'a mut LoggingBuilder,
                CancellationToken,
            ) -> BoxFuture<'a, ConventionResult>
            + Send
            + Sync
            + 'static,
    {
        Self::new::<F>(Registration::Logging(Handler::Async(Arc::new(f))))
    }

    pub fn webjobs<F>(f: F) -> Self
    where
        F: Fn(&mut ConventionContext, &mut WebJobsBuilder) -> ConventionResult
            + Send
            + Sync
            + 'static,
    {
        Self::new::<F>(Registration::WebJobs(Handler::Sync(Arc::new(f))))
    }

    pub fn webjobs_async<F>(f: F) -> Self
    where
        F: for<'a> Fn(
                &'a mut ConventionContext,
                &'a mut WebJobsBuilder,
                CancellationToken,
            ) -> BoxFuture<'a, ConventionResult>
            + Send
            + Sync
            + 'static,
    {
        Self::new::<F>(Registration::WebJobs(Handler::Async(Arc::new(f))))
    }

    pub fn host_created<F>(f: F) -> Self
    where
        F: Fn(&mut ConventionContext, HostHandle<'_>) -> ConventionResult + Send + Sync + 'static,
    {
        Self::new::<F>(Registration::HostCreated(Handler::Sync(Arc::new(f))))
    }

    pub fn host_created_async<F>(f: F) -> Self
    where
        F: for<'a> Fn(
                &'a mut ConventionContext,
                HostHandle<'a>,
                CancellationToken,
            ) -> BoxFuture<'a, ConventionResult>
            + Send
            + Sync
            + 'static,
    {
        Self::new::<F>(Registration::HostCreated(Handler::Async(Arc::new(f))))
    }

    /// Replace the type-derived identity with a stable name.
    pub fn named(mut self, name: &'static str) -> Self {
        self.id = ConventionId::named(name);
        self
    }

    pub fn id(&self) -> ConventionId {
        self.id
    }

    pub fn contract(&self) -> ContractKind {
        self.registration.contract()
    }

    pub fn into_entry(self, metadata: ConventionMetadata) -> ConventionEntry {
        ConventionEntry {
            id: self.id,
            origin: Origin::Delegate,
            registration: self.registration,
            metadata,
        }
    }
}

impl fmt::Debug for Delegate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delegate")
            .field("id", &self.id)
            .field("registration", &self.registration)
            .finish()
    }
}

/// One registered convention, ready for resolution.
#[derive(Clone)]
pub struct ConventionEntry {
    id: ConventionId,
    origin: Origin,
    registration: Registration,
    metadata: ConventionMetadata,
}

impl ConventionEntry {
    pub fn new(id: ConventionId, registration: Registration) -> Self {
        Self {
            id,
            origin: Origin::Instance,
            registration,
            metadata: ConventionMetadata::default(),
        }
    }

    fn from_instance<C: 'static>(delegate: Delegate) -> Self {
        Self::new(ConventionId::of::<C>(), delegate.registration)
    }

    pub fn setup<C: SetupConvention>(convention: C) -> Self {
        Self::from_instance::<C>(Delegate::setup(move |context| convention.register(context)))
    }

    pub fn setup_async<C: AsyncSetupConvention>(convention: C) -> Self {
        let convention = Arc::new(convention);
        Self::from_instance::<C>(Delegate::setup_async(move |context, cancellation| {
            let convention = Arc::clone(&convention);
            Box::pin(async move { convention.register(context, cancellation).await })
        }))
    }

    pub fn configuration<C: ConfigurationConvention>(convention: C) -> Self {
        Self::from_instance::<C>(Delegate::configuration(move |context, builder| {
            convention.register(context, builder)
        }))
    }

    pub fn services<C: ServiceConvention>(convention: C) -> Self {
        Self::from_instance::<C>(Delegate::services(move |context, services, configuration| {
            convention.register(context, services, configuration)
        }))
    }

    pub fn command_line<C: CommandLineConvention>(convention: C) -> Self {
        Self::from_instance::<C>(Delegate::command_line(move |context, command_line| {
            convention.register(context, command_line)
        }))
    }

    pub fn logging<C: LoggingConvention>(convention: C) -> Self {
        Self::from_instance::<C>(Delegate::logging(move |context, logging| {
            convention.register(context, logging)
        }))
    }

    pub fn webjobs<C: WebJobsConvention>(convention: C) -> Self {
        Self::from_instance::<C>(Delegate::webjobs(move |context, webjobs| {
            convention.register(context, webjobs)
        }))
    }

    pub fn host_created<C: HostCreatedConvention>(convention: C) -> Self {
        Self::from_instance::<C>(Delegate::host_created(move |context, host| {
            convention.register(context, host)
        }))
    }

    pub fn host_created_async<C: AsyncHostCreatedConvention>(convention: C) -> Self {
        let convention = Arc::new(convention);
        Self::from_instance::<C>(Delegate::host_created_async(
            move |context, host, cancellation| {
                let convention = Arc::clone(&convention);
                Box::pin(async move { convention.register(context, host, cancellation).await })
            },
        ))
    }

    pub fn named(mut self, name: &'static str) -> Self {
        self.id = ConventionId::named(name);
        self
    }

    pub fn with_metadata(mut self, metadata: ConventionMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn after(mut self, id: ConventionId) -> Self {
        self.metadata = self.metadata.after(id);
        self
    }

    pub fn depends_on(mut self, id: ConventionId) -> Self {
        self.metadata = self.metadata.depends_on(id);
        self
    }

    pub fn before(mut self, id: ConventionId) -> Self {
        self.metadata = self.metadata.before(id);
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.metadata = self.metadata.priority(priority);
        self
    }

    pub fn only_for(mut self, host_type: HostType) -> Self {
        self.metadata = self.metadata.only_for(host_type);
        self
    }

    pub fn id(&self) -> ConventionId {
        self.id
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn contract(&self) -> ContractKind {
        self.registration.contract()
    }

    pub fn is_async(&self) -> bool {
        self.registration.is_async()
    }

    pub fn registration(&self) -> &Registration {
        &self.registration
    }

    pub fn metadata(&self) -> &ConventionMetadata {
        &self.metadata
    }
}

impl From<Delegate> for ConventionEntry {
    fn from(delegate: Delegate) -> Self {
        delegate.into_entry(ConventionMetadata::default())
    }
}

impl fmt::Debug for ConventionEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConventionEntry")
            .field("id", &self.id)
            .field("origin", &self.origin)
            .field("registration", &self.registration)
            .field("metadata", &self.metadata)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ConventionLogger, HostEnvironment};
    use crate::properties::PropertyBag;

    struct CoreServices;

    impl ServiceConvention for CoreServices {
        fn register(
            &self,
            _context: &mut ConventionContext,
            services: &mut ServiceCollection,
            _configuration: &Configuration,
        ) -> ConventionResult {
            services.add_singleton(Arc::new(42u32));
            Ok(())
        }
    }

    struct Warmup;

    #[async_trait::async_trait]
    impl AsyncSetupConvention for Warmup {
        async fn register(
            &self,
            context: &mut ConventionContext,
            _cancellation: CancellationToken,
        ) -> ConventionResult {
            context.set("warm".to_string());
            Ok(())
        }
    }

    fn add_defaults(
        _context: &mut ConventionContext,
        builder: &mut ConfigurationBuilder,
    ) -> ConventionResult {
        builder.add_in_memory([("mode", "default")]);
        Ok(())
    }

    fn context() -> ConventionContext {
        ConventionContext::new(
            HostEnvironment::default(),
            ConventionLogger::disabled(),
            PropertyBag::new(),
        )
    }

    #[test]
    fn test_instance_identity_is_concrete_type() {
        let entry = ConventionEntry::services(CoreServices);
        assert_eq!(entry.id(), ConventionId::of::<CoreServices>());
        assert_eq!(entry.origin(), Origin::Instance);
        assert_eq!(entry.contract(), ContractKind::Services);
        assert!(!entry.is_async());
    }

    #[test]
    fn test_same_function_has_same_identity() {
        let a = Delegate::configuration(add_defaults);
        let b = Delegate::configuration(add_defaults);
        assert_eq!(a.id(), b.id());
        assert_eq!(a.id(), ConventionId::of_val(&add_defaults));
    }

    fn record(value: u32) -> Delegate {
        Delegate::setup(move |ctx| {
            ctx.get_or_add(Vec::<u32>::new).push(value);
            Ok(())
        })
    }

    #[test]
    fn test_capturing_closures_from_one_site_are_distinct() {
        let first = record(1);
        let second = record(2);
        assert_ne!(first.id(), second.id());
        assert_eq!(first.id(), first.clone().id());
    }

    #[test]
    fn test_capture_free_closures_use_type_identity() {
        fn noop() -> Delegate {
            Delegate::setup(|_| Ok(()))
        }
        assert_eq!(noop().id(), noop().id());
        assert_ne!(Delegate::setup(|_| Ok(())).id(), noop().id());
    }

    #[test]
    fn test_delegate_entry_carries_metadata() {
        let entry = Delegate::configuration(add_defaults).into_entry(
            ConventionMetadata::new()
                .after(ConventionId::of::<CoreServices>())
                .priority(-5)
                .only_for(HostType::UnitTest),
        );

        assert_eq!(entry.origin(), Origin::Delegate);
        assert_eq!(entry.metadata().priority_value(), -5);
        assert_eq!(
            entry.metadata().run_after(),
            &[ConventionId::of::<CoreServices>()]
        );
        assert!(entry.metadata().applies_to(HostType::UnitTest));
        assert!(!entry.metadata().applies_to(HostType::Live));
    }

    #[test]
    fn test_depends_on_is_required_and_after() {
        let target = ConventionId::named("core");
        let metadata = ConventionMetadata::new().depends_on(target).depends_on(target);
        assert_eq!(metadata.required(), &[target]);
        assert_eq!(metadata.run_after(), &[target]);
    }

    #[test]
    fn test_unrestricted_entry_applies_everywhere() {
        let metadata = ConventionMetadata::new();
        assert!(metadata.applies_to(HostType::Live));
        assert!(metadata.applies_to(HostType::UnitTest));
        assert!(metadata.applies_to(HostType::Undefined));
    }

    #[test]
    fn test_sync_instance_invokes_convention() {
        let entry = ConventionEntry::services(CoreServices);
        let mut ctx = context();
        let mut services = ServiceCollection::new();
        let configuration = ConfigurationBuilder::new().build().unwrap();

        match entry.registration() {
            Registration::Services(Handler::Sync(f)) => {
                f(&mut ctx, &mut services, &configuration).unwrap()
            }
            other => panic!("unexpected registration {other:?}"),
        }
        assert!(services.contains::<u32>());
    }

    #[tokio::test]
    async fn test_async_instance_invokes_convention() {
        let entry = ConventionEntry::setup_async(Warmup);
        assert!(entry.is_async());
        assert_eq!(format!("{:?}", entry.registration()), "setup(async)");

        let mut ctx = context();
        match entry.registration() {
            Registration::Setup(Handler::Async(f)) => {
                f(&mut ctx, CancellationToken::new()).await.unwrap()
            }
            other => panic!("unexpected registration {other:?}"),
        }
        assert_eq!(ctx.get::<String>().map(String::as_str), Some("warm"));
    }

    #[test]
    fn test_named_overrides_identity() {
        let entry = ConventionEntry::services(CoreServices).named("core-services");
        assert_eq!(entry.id(), ConventionId::named("core-services"));
    }
}
