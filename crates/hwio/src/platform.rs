use core::fmt;
use std::sync::Arc;

/// Named bundle of providers for one kind of hardware.
pub trait Platform: Send + Sync + 'static {
    fn id(&self) -> &str;

    fn name(&self) -> &str;

    /// Precedence among matching platforms during auto-detection.
    fn priority(&self) -> i32 {
        0
    }

    /// Returns `true` if this platform can run on the current host. Must
    /// not have side effects.
    fn matches(&self) -> bool;

    /// Ids of the providers this platform prefers, any category.
    fn provider_ids(&self) -> Vec<String>;
}

/// Select the platform for auto-detection: the highest priority among the
/// ones whose predicate matches, the first registered on ties.
///
/// Predicates run one after another in registration order.
pub fn select(platforms: &[Arc<dyn Platform>]) -> Option<&Arc<dyn Platform>> {
    let mut best: Option<&Arc<dyn Platform>> = None;
    for platform in platforms {
        if !platform.matches() {
            continue;
        }
        if best.map_or(true, |b| platform.priority() > b.priority()) {
            best = Some(platform);
        }
    }
    best
}

type Detect = Box<dyn Fn() -> bool + Send + Sync>;

/// [`Platform`] assembled from plain values.
pub struct BasicPlatform {
    id: String,
    name: String,
    priority: i32,
    providers: Vec<String>,
    detect: Detect,
}

impl BasicPlatform {
    /// A platform that always matches and lists no providers.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            priority: 0,
            providers: Vec::new(),
            detect: Box::new(|| true),
        }
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn provider(mut self, id: impl Into<String>) -> Self {
        self.providers.push(id.into());
        self
    }

    pub fn providers<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.providers.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn detect(
        mut self,
        detect: impl Fn() -> bool + Send + Sync + 'static,
    ) -> Self {
        self.detect = Box::new(detect);
        self
    }
}

impl Platform for BasicPlatform {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn matches(&self) -> bool {
        (self.detect)()
    }

    fn provider_ids(&self) -> Vec<String> {
        self.providers.clone()
    }
}

impl fmt::Debug for BasicPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicPlatform")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("providers", &self.providers)
            .finish_non_exhaustive()
    }
}
