use std::collections::HashSet;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::platform::Platform;
use crate::provider::Provider;

pub type PluginError = Box<dyn std::error::Error + Send + Sync>;

/// Extension unit contributing providers and platforms to a context.
pub trait Plugin: Send + 'static {
    /// Name used in logs and failure reports.
    fn id(&self) -> &str;

    /// Mock plugins are skipped when the context config disables them.
    fn is_mock(&self) -> bool {
        false
    }

    /// Called exactly once per context. Registrations are only committed
    /// if this returns `Ok`.
    fn initialize(
        &mut self,
        service: &mut PluginService,
    ) -> core::result::Result<(), PluginError>;

    /// Called once while the context shuts down, after every instance has
    /// been closed.
    fn shutdown(&mut self) -> core::result::Result<(), PluginError> {
        Ok(())
    }
}

/// Registration surface handed to [`Plugin::initialize`].
///
/// Everything registered here is staged; the context commits it only after
/// the plugin finished initializing successfully.
#[derive(Default)]
pub struct PluginService {
    providers: Vec<Arc<dyn Provider>>,
    platforms: Vec<Arc<dyn Platform>>,
}

impl PluginService {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub fn register_provider(
        &mut self,
        provider: impl Provider,
    ) -> &mut Self {
        self.providers.push(Arc::new(provider));
        self
    }

    pub fn register_providers<I>(&mut self, providers: I) -> &mut Self
    where
        I: IntoIterator<Item = Arc<dyn Provider>>,
    {
        self.providers.extend(providers);
        self
    }

    pub fn register_platform(
        &mut self,
        platform: impl Platform,
    ) -> &mut Self {
        self.platforms.push(Arc::new(platform));
        self
    }

    pub fn register_platforms<I>(&mut self, platforms: I) -> &mut Self
    where
        I: IntoIterator<Item = Arc<dyn Platform>>,
    {
        self.platforms.extend(platforms);
        self
    }

    /// Check staged ids against each other and against `taken`.
    pub(crate) fn check_ids<'a>(
        &self,
        taken_providers: impl Iterator<Item = &'a str>,
        taken_platforms: impl Iterator<Item = &'a str>,
    ) -> Result<()> {
        let mut seen: HashSet<String> =
            taken_providers.map(str::to_owned).collect();
        for provider in &self.providers {
            if !seen.insert(provider.id().to_owned()) {
                return Err(Error::AlreadyExists {
                    id: provider.id().to_owned(),
                });
            }
        }
        let mut seen: HashSet<String> =
            taken_platforms.map(str::to_owned).collect();
        for platform in &self.platforms {
            if !seen.insert(platform.id().to_owned()) {
                return Err(Error::AlreadyExists {
                    id: platform.id().to_owned(),
                });
            }
        }
        Ok(())
    }

    pub(crate) fn into_parts(
        self,
    ) -> (Vec<Arc<dyn Provider>>, Vec<Arc<dyn Platform>>) {
        (self.providers, self.platforms)
    }
}
