use core::fmt;
use std::sync::Arc;

use derive_more::Display;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::category::IoCategory;
use crate::config::{ContextConfig, IoConfig};
use crate::error::{Error, ExtensionLoadReport, Result, ShutdownReport};
use crate::event::{LifecycleEvent, LifecycleListener, ListenerId, Listeners};
use crate::inject::{self, InjectionError, InjectionRequest, Wired, Wiring};
use crate::io::{IoInstance, TypedIo};
use crate::platform::{self, Platform};
use crate::plugin::{Plugin, PluginService};
use crate::provider::{self, Provider};
use crate::registry::Registry;

/// Lifecycle of a [`Context`].
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    /// No platform active yet.
    #[display("uninitialized")]
    Uninitialized,
    #[display("activated")]
    Activated,
    #[display("shut down")]
    ShutDown,
}

struct Extensions {
    state: ContextState,
    providers: Vec<Arc<dyn Provider>>,
    platforms: Vec<Arc<dyn Platform>>,
    active: Option<Arc<dyn Platform>>,
}

impl Extensions {
    fn ensure_running(&self) -> Result<()> {
        match self.state {
            ContextState::ShutDown => Err(Error::ShutDown),
            _ => Ok(()),
        }
    }

    /// Commit staged registrations, all or nothing.
    fn commit(&mut self, service: PluginService) -> Result<(usize, usize)> {
        self.ensure_running()?;
        service.check_ids(
            self.providers.iter().map(|p| p.id()),
            self.platforms.iter().map(|p| p.id()),
        )?;
        let (providers, platforms) = service.into_parts();
        let counts = (providers.len(), platforms.len());
        self.providers.extend(providers);
        self.platforms.extend(platforms);
        Ok(counts)
    }

    fn ensure_activatable(&self) -> Result<()> {
        match (&self.state, &self.active) {
            (ContextState::ShutDown, _) => Err(Error::ShutDown),
            (ContextState::Activated, Some(active)) => {
                Err(Error::AlreadyActivated { id: active.id().to_owned() })
            }
            _ => Ok(()),
        }
    }

    /// Provider for `config`: the one it names, else one the active
    /// platform lists, else any by priority.
    fn provider_for(&self, config: &IoConfig) -> Result<Arc<dyn Provider>> {
        let category = config.category();
        let unavailable = || Error::ProviderUnavailable { category };

        if let Some(id) = config.provider() {
            return self
                .providers
                .iter()
                .find(|p| p.id() == id && p.category() == category)
                .cloned()
                .ok_or_else(unavailable);
        }

        if let Some(platform) = &self.active {
            let preferred = platform.provider_ids();
            let listed: Vec<Arc<dyn Provider>> = self
                .providers
                .iter()
                .filter(|p| preferred.iter().any(|id| id == p.id()))
                .cloned()
                .collect();
            if let Some(found) = provider::by_priority(&listed, category) {
                return Ok(found.clone());
            }
        }

        provider::by_priority(&self.providers, category)
            .cloned()
            .ok_or_else(unavailable)
    }
}

/// Root owner of the registry, the registered extensions and the active
/// platform.
///
/// Dropping a context that was not shut down shuts it down and logs any
/// failures.
pub struct Context {
    config: ContextConfig,
    registry: Registry,
    extensions: RwLock<Extensions>,
    // Lock order: `extensions` before `plugins`.
    plugins: Mutex<Vec<Box<dyn Plugin>>>,
    lifecycle: Listeners<dyn LifecycleListener>,
}

impl Context {
    /// An empty context; see [`Context::builder`] for the usual path.
    pub fn new(config: ContextConfig) -> Self {
        Self {
            config,
            registry: Registry::new(),
            extensions: RwLock::new(Extensions {
                state: ContextState::Uninitialized,
                providers: Vec::new(),
                platforms: Vec::new(),
                active: None,
            }),
            plugins: Mutex::new(Vec::new()),
            lifecycle: Listeners::new(),
        }
    }

    pub fn builder() -> ContextBuilder {
        ContextBuilder::default()
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    pub fn state(&self) -> ContextState {
        self.extensions.read().state
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn active_platform(&self) -> Option<Arc<dyn Platform>> {
        self.extensions.read().active.clone()
    }

    pub fn providers(&self) -> Vec<Arc<dyn Provider>> {
        self.extensions.read().providers.clone()
    }

    pub fn platforms(&self) -> Vec<Arc<dyn Platform>> {
        self.extensions.read().platforms.clone()
    }

    /// Listen for activation and shutdown. Listeners run on the thread
    /// driving the transition, with no context lock held.
    pub fn add_lifecycle_listener(
        &self,
        listener: Arc<dyn LifecycleListener>,
    ) -> ListenerId {
        self.lifecycle.add(listener)
    }

    pub fn remove_lifecycle_listener(&self, id: ListenerId) -> bool {
        self.lifecycle.remove(id)
    }

    pub fn clear_lifecycle_listeners(&self) {
        self.lifecycle.clear();
    }

    fn notify(&self, event: LifecycleEvent) {
        self.lifecycle.dispatch(|l| l.on_lifecycle(&event));
    }

    /// Ids of the plugins loaded so far, in load order.
    pub fn plugin_ids(&self) -> Vec<String> {
        self.plugins.lock().iter().map(|p| p.id().to_owned()).collect()
    }

    pub fn register_provider(&self, provider: impl Provider) -> Result<()> {
        let mut service = PluginService::new();
        service.register_provider(provider);
        self.extensions.write().commit(service).map(drop)
    }

    pub fn register_platform(&self, platform: impl Platform) -> Result<()> {
        let mut service = PluginService::new();
        service.register_platform(platform);
        self.extensions.write().commit(service).map(drop)
    }

    /// Initialize `plugin` and commit what it registered.
    ///
    /// If initialization fails nothing it registered is kept and
    /// [`Error::ExtensionLoad`] is returned.
    pub fn register_plugin(&self, plugin: impl Plugin) -> Result<()> {
        self.load_plugin(Box::new(plugin))
    }

    /// Load every plugin in turn. A failing plugin does not stop the
    /// others; all failures are reported together.
    pub fn register_plugins<I>(
        &self,
        plugins: I,
    ) -> core::result::Result<(), ExtensionLoadReport>
    where
        I: IntoIterator<Item = Box<dyn Plugin>>,
    {
        let mut report = ExtensionLoadReport::default();
        for plugin in plugins {
            let id = plugin.id().to_owned();
            if let Err(err) = self.load_plugin(plugin) {
                report.push(&id, err);
            }
        }
        if report.is_empty() {
            Ok(())
        } else {
            Err(report)
        }
    }

    fn load_plugin(&self, mut plugin: Box<dyn Plugin>) -> Result<()> {
        let id = plugin.id().to_owned();
        self.extensions.read().ensure_running()?;

        if plugin.is_mock() && !self.config.auto_detect_mock {
            debug!(plugin = %id, "mock plugin skipped");
            return Ok(());
        }

        let mut service = PluginService::new();
        if let Err(err) = plugin.initialize(&mut service) {
            warn!(plugin = %id, "plugin failed to initialize: {err}");
            return Err(Error::ExtensionLoad {
                plugin: id,
                reason: err.to_string(),
            });
        }

        let mut extensions = self.extensions.write();
        match extensions.commit(service) {
            Ok((providers, platforms)) => {
                self.plugins.lock().push(plugin);
                debug!(plugin = %id, providers, platforms, "plugin loaded");
                Ok(())
            }
            Err(err) => {
                drop(extensions);
                warn!(plugin = %id, "plugin registrations rejected: {err}");
                if let Err(e) = plugin.shutdown() {
                    warn!(plugin = %id, "plugin failed to shut down: {e}");
                }
                match err {
                    Error::ShutDown => Err(Error::ShutDown),
                    other => Err(Error::ExtensionLoad {
                        plugin: id,
                        reason: other.to_string(),
                    }),
                }
            }
        }
    }

    /// Activate the platform named `id`, or auto-detect one.
    ///
    /// Auto-detection picks the highest priority platform whose predicate
    /// matches, falling back to the configured default platform.
    /// Predicates run without any context lock held.
    pub fn activate_platform(
        &self,
        id: Option<&str>,
    ) -> Result<Arc<dyn Platform>> {
        let platforms = {
            let extensions = self.extensions.read();
            extensions.ensure_activatable()?;
            extensions.platforms.clone()
        };

        let find = |id: &str| {
            platforms
                .iter()
                .find(|p| p.id() == id)
                .cloned()
                .ok_or_else(|| Error::PlatformNotFound { id: Some(id.to_owned()) })
        };
        let platform = match id {
            Some(id) => find(id)?,
            None => match platform::select(&platforms) {
                Some(found) => found.clone(),
                None => match self.config.default_platform.as_deref() {
                    Some(fallback) => {
                        debug!(platform = fallback, "no platform detected");
                        find(fallback)?
                    }
                    None => return Err(Error::PlatformNotFound { id: None }),
                },
            },
        };

        {
            let mut extensions = self.extensions.write();
            extensions.ensure_activatable()?;
            extensions.active = Some(platform.clone());
            extensions.state = ContextState::Activated;
        }
        info!(
            platform = platform.id(),
            priority = platform.priority(),
            "platform activated"
        );
        self.notify(LifecycleEvent::Initialized {
            platform: platform.id().to_owned(),
        });
        Ok(platform)
    }

    /// Create the instance `config` describes and register it.
    pub fn create_instance(&self, config: IoConfig) -> Result<IoInstance> {
        let provider = {
            let extensions = self.extensions.read();
            extensions.ensure_running()?;
            if self.registry.exists(config.id()) {
                return Err(Error::AlreadyExists { id: config.id().to_owned() });
            }
            extensions.provider_for(&config)?
        };

        let instance = provider.create(&config)?;
        let checked = if instance.category() != config.category() {
            Err(Error::TypeMismatch {
                id: config.id().to_owned(),
                expected: config.category(),
                actual: instance.category(),
            })
        } else {
            // Registration and shutdown's drain are ordered by the
            // extensions lock.
            let extensions = self.extensions.read();
            extensions
                .ensure_running()
                .and_then(|()| self.registry.register(instance.clone()))
        };

        if let Err(err) = checked {
            if let Err(close_err) = instance.close() {
                warn!(id = config.id(), "failed to close rejected instance: {close_err}");
            }
            return Err(err);
        }

        debug!(
            id = config.id(),
            category = %config.category(),
            provider = provider.id(),
            "instance created"
        );
        Ok(instance)
    }

    /// Typed [`create_instance`](Self::create_instance), e.g.
    /// `create::<dyn DigitalOutput>(config)`.
    pub fn create<T: TypedIo + ?Sized>(&self, config: IoConfig) -> Result<Arc<T>> {
        if config.category() != T::CATEGORY {
            return Err(Error::TypeMismatch {
                id: config.id().to_owned(),
                expected: T::CATEGORY,
                actual: config.category(),
            });
        }
        self.create_instance(config)?.expect_typed::<T>()
    }

    pub fn get(&self, id: &str, category: IoCategory) -> Result<IoInstance> {
        self.registry.get(id, category)
    }

    /// Typed lookup, e.g. `get_as::<dyn I2c>("bme280")`.
    pub fn get_as<T: TypedIo + ?Sized>(&self, id: &str) -> Result<Arc<T>> {
        self.registry.get_typed::<T>(id)
    }

    pub fn exists(&self, id: &str) -> bool {
        self.registry.exists(id)
    }

    /// Unregister and close one instance.
    pub fn remove(&self, id: &str) -> Result<()> {
        let instance = self.registry.remove(id)?;
        debug!(id = instance.id(), "instance removed");
        instance.close()
    }

    pub fn resolve(&self, request: &InjectionRequest) -> Result<IoInstance> {
        inject::resolve(&self.registry, request)
    }

    pub fn wire(
        &self,
        wiring: &Wiring,
    ) -> core::result::Result<Wired, InjectionError> {
        wiring.resolve(&self.registry)
    }

    /// Close every instance, newest first, then shut plugins down.
    ///
    /// Keeps going past failures and returns all of them. Calling it again
    /// is a no-op.
    pub fn shutdown(&self) -> core::result::Result<(), ShutdownReport> {
        let plugins = {
            let mut extensions = self.extensions.write();
            if extensions.state == ContextState::ShutDown {
                return Ok(());
            }
            extensions.state = ContextState::ShutDown;
            core::mem::take(&mut *self.plugins.lock())
        };

        self.notify(LifecycleEvent::BeforeShutdown);

        let mut report = ShutdownReport::default();
        for instance in self.registry.drain_reverse() {
            match instance.close() {
                Ok(()) => debug!(id = instance.id(), "instance closed"),
                Err(err) => {
                    warn!(id = instance.id(), "failed to close instance: {err}");
                    report.failures.push((instance.id().to_owned(), err));
                }
            }
        }

        for mut plugin in plugins.into_iter().rev() {
            let id = plugin.id().to_owned();
            if let Err(err) = plugin.shutdown() {
                warn!(plugin = %id, "plugin failed to shut down: {err}");
                report.failures.push((
                    id.clone(),
                    Error::PluginShutdown { plugin: id, reason: err.to_string() },
                ));
            }
        }

        info!(failures = report.failures.len(), "context shut down");
        self.notify(LifecycleEvent::ShutDown);
        if report.is_empty() {
            Ok(())
        } else {
            Err(report)
        }
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        if let Err(report) = self.shutdown() {
            error!("{report}");
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let extensions = self.extensions.read();
        f.debug_struct("Context")
            .field("state", &extensions.state)
            .field("platform", &extensions.active.as_ref().map(|p| p.id()))
            .field("providers", &extensions.providers.len())
            .field("instances", &self.registry.len())
            .finish()
    }
}

/// Assembles a [`Context`]: extensions first, then optional platform
/// activation, then the instances declared in the config.
#[derive(Default)]
pub struct ContextBuilder {
    config: ContextConfig,
    providers: Vec<Arc<dyn Provider>>,
    platforms: Vec<Arc<dyn Platform>>,
    plugins: Vec<Box<dyn Plugin>>,
}

impl ContextBuilder {
    pub fn config(mut self, config: ContextConfig) -> Self {
        self.config = config;
        self
    }

    pub fn default_platform(mut self, id: impl Into<String>) -> Self {
        self.config.default_platform = Some(id.into());
        self
    }

    pub fn auto_detect_mock(mut self, enabled: bool) -> Self {
        self.config.auto_detect_mock = enabled;
        self
    }

    pub fn auto_activate(mut self, enabled: bool) -> Self {
        self.config.auto_activate = enabled;
        self
    }

    pub fn instance(mut self, config: IoConfig) -> Self {
        self.config.instances.push(config);
        self
    }

    pub fn provider(mut self, provider: impl Provider) -> Self {
        self.providers.push(Arc::new(provider));
        self
    }

    pub fn platform(mut self, platform: impl Platform) -> Self {
        self.platforms.push(Arc::new(platform));
        self
    }

    pub fn plugin(mut self, plugin: impl Plugin) -> Self {
        self.plugins.push(Box::new(plugin));
        self
    }

    pub fn plugins<I>(mut self, plugins: I) -> Self
    where
        I: IntoIterator<Item = Box<dyn Plugin>>,
    {
        self.plugins.extend(plugins);
        self
    }

    /// Build the context. Plugin load failures are logged, not returned;
    /// use [`build_with_report`](Self::build_with_report) to see them.
    pub fn build(self) -> Result<Context> {
        let (context, report) = self.build_with_report()?;
        if !report.is_empty() {
            warn!("{report}");
        }
        Ok(context)
    }

    pub fn build_with_report(self) -> Result<(Context, ExtensionLoadReport)> {
        let context = Context::new(self.config);

        let mut service = PluginService::new();
        service
            .register_providers(self.providers)
            .register_platforms(self.platforms);
        context.extensions.write().commit(service)?;

        let report = match context.register_plugins(self.plugins) {
            Ok(()) => ExtensionLoadReport::default(),
            Err(report) => report,
        };

        if context.config.auto_activate {
            context.activate_platform(None)?;
        }

        let declared = context.config.instances.clone();
        for config in declared {
            context.create_instance(config)?;
        }

        Ok((context, report))
    }
}
