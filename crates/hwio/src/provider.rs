use std::sync::Arc;

use crate::category::IoCategory;
use crate::config::IoConfig;
use crate::error::Result;
use crate::io::IoInstance;

/// Creates live instances of one category.
///
/// `create` returns a fully usable instance or an error, never something
/// half-opened. Native failures come back as [`Error::Io`] unchanged.
///
/// [`Error::Io`]: crate::Error::Io
pub trait Provider: Send + Sync + 'static {
    fn id(&self) -> &str;

    fn name(&self) -> &str;

    fn category(&self) -> IoCategory;

    /// Precedence among providers of one category when no platform picks
    /// one. Higher wins.
    fn priority(&self) -> i32 {
        0
    }

    fn create(&self, config: &IoConfig) -> Result<IoInstance>;
}

/// Pick the provider for `category` when neither the config nor the active
/// platform names one: highest priority, first registered on ties.
pub(crate) fn by_priority<'a>(
    providers: &'a [Arc<dyn Provider>],
    category: IoCategory,
) -> Option<&'a Arc<dyn Provider>> {
    let mut best: Option<&Arc<dyn Provider>> = None;
    for provider in providers.iter().filter(|p| p.category() == category) {
        if best.map_or(true, |b| provider.priority() > b.priority()) {
            best = Some(provider);
        }
    }
    best
}
