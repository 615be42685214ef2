//! Startup preload cache.
//!
//! At startup the console eagerly fetches the catalog collections that most
//! screens need (projects, task history and the installed-extension lists)
//! so those screens can render from memory instead of showing a spinner.
//!
//! ## Slots
//!
//! Each collection lives in its own slot. A slot is either ready (holding the
//! fetched records) or unready; the two can never disagree because the ready
//! flag *is* the `Some` of the stored `Option`. Reads of unready slots return
//! `None`, never stale or default data.
//!
//! ## Lifecycle
//!
//! [`PreloadCache::start`] fans out one loader per slot and returns a
//! [`PreloadHandle`] that settles once every loader has finished, whatever the
//! outcome. Loader failures are logged and leave the slot unready. Mutations
//! elsewhere in the app call [`PreloadCache::invalidate`] so later readers
//! fall back to a direct fetch instead of reusing outdated data.
//!
//! The cache is an explicit context object: clones share state, and tests
//! create isolated instances with [`PreloadCache::new`].

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::watch;

use crate::api::{
    ApiError, McpInstall, McpServer, Plugin, PluginInstall, Project, Skill, SkillInstall,
    TaskHistoryItem,
};

/// Names of the preload slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PreloadKey {
    Projects,
    TaskHistory,
    McpServers,
    McpInstalls,
    Skills,
    SkillInstalls,
    Plugins,
    PluginInstalls,
}

impl PreloadKey {
    /// Every slot, in load order.
    pub const ALL: [Self; 8] = [
        Self::Projects,
        Self::TaskHistory,
        Self::McpServers,
        Self::McpInstalls,
        Self::Skills,
        Self::SkillInstalls,
        Self::Plugins,
        Self::PluginInstalls,
    ];

    /// Returns the slot name used in logs and CLI output.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Projects => "projects",
            Self::TaskHistory => "taskHistory",
            Self::McpServers => "mcpServers",
            Self::McpInstalls => "mcpInstalls",
            Self::Skills => "skills",
            Self::SkillInstalls => "skillInstalls",
            Self::Plugins => "plugins",
            Self::PluginInstalls => "pluginInstalls",
        }
    }
}

impl fmt::Display for PreloadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Contents of every slot. `None` means the slot is not ready.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreloadState {
    pub projects: Option<Vec<Project>>,
    pub task_history: Option<Vec<TaskHistoryItem>>,
    pub mcp_servers: Option<Vec<McpServer>>,
    pub mcp_installs: Option<Vec<McpInstall>>,
    pub skills: Option<Vec<Skill>>,
    pub skill_installs: Option<Vec<SkillInstall>>,
    pub plugins: Option<Vec<Plugin>>,
    pub plugin_installs: Option<Vec<PluginInstall>>,
}

impl PreloadState {
    /// Returns whether the slot named by `key` holds data.
    #[must_use]
    pub const fn is_ready(&self, key: PreloadKey) -> bool {
        match key {
            PreloadKey::Projects => self.projects.is_some(),
            PreloadKey::TaskHistory => self.task_history.is_some(),
            PreloadKey::McpServers => self.mcp_servers.is_some(),
            PreloadKey::McpInstalls => self.mcp_installs.is_some(),
            PreloadKey::Skills => self.skills.is_some(),
            PreloadKey::SkillInstalls => self.skill_installs.is_some(),
            PreloadKey::Plugins => self.plugins.is_some(),
            PreloadKey::PluginInstalls => self.plugin_installs.is_some(),
        }
    }

    /// Empties the slot named by `key`.
    pub fn clear(&mut self, key: PreloadKey) {
        match key {
            PreloadKey::Projects => self.projects = None,
            PreloadKey::TaskHistory => self.task_history = None,
            PreloadKey::McpServers => self.mcp_servers = None,
            PreloadKey::McpInstalls => self.mcp_installs = None,
            PreloadKey::Skills => self.skills = None,
            PreloadKey::SkillInstalls => self.skill_installs = None,
            PreloadKey::Plugins => self.plugins = None,
            PreloadKey::PluginInstalls => self.plugin_installs = None,
        }
    }
}

/// A typed handle on one slot of [`PreloadState`].
///
/// Implemented by the zero-sized markers in [`slots`], so reads are typed:
/// `cache.get::<slots::Skills>()` yields `Option<Vec<Skill>>`.
pub trait PreloadSlot {
    /// Record type stored in the slot.
    type Value: Clone + Send + Sync + 'static;

    /// Key of this slot.
    const KEY: PreloadKey;

    /// Borrows the slot.
    fn slot(state: &PreloadState) -> &Option<Vec<Self::Value>>;

    /// Mutably borrows the slot.
    fn slot_mut(state: &mut PreloadState) -> &mut Option<Vec<Self::Value>>;
}

/// Marker types naming each slot.
pub mod slots {
    use super::{PreloadKey, PreloadSlot, PreloadState};
    use crate::api::{
        McpInstall, McpServer, Plugin, PluginInstall, Project, Skill, SkillInstall,
        TaskHistoryItem,
    };

    macro_rules! preload_slot {
        ($marker:ident, $field:ident, $value:ty) => {
            #[doc = concat!("The `", stringify!($field), "` slot.")]
            #[derive(Debug, Clone, Copy)]
            pub struct $marker;

            impl PreloadSlot for $marker {
                type Value = $value;
                const KEY: PreloadKey = PreloadKey::$marker;

                fn slot(state: &PreloadState) -> &Option<Vec<Self::Value>> {
                    &state.$field
                }

                fn slot_mut(state: &mut PreloadState) -> &mut Option<Vec<Self::Value>> {
                    &mut state.$field
                }
            }
        };
    }

    preload_slot!(Projects, projects, Project);
    preload_slot!(TaskHistory, task_history, TaskHistoryItem);
    preload_slot!(McpServers, mcp_servers, McpServer);
    preload_slot!(McpInstalls, mcp_installs, McpInstall);
    preload_slot!(Skills, skills, Skill);
    preload_slot!(SkillInstalls, skill_installs, SkillInstall);
    preload_slot!(Plugins, plugins, Plugin);
    preload_slot!(PluginInstalls, plugin_installs, PluginInstall);
}

/// Loaders for every slot, one request each.
///
/// Implemented by [`crate::api::ApiClient`]; tests supply mocks.
#[async_trait]
pub trait PreloadSource: Send + Sync {
    async fn projects(&self) -> Result<Vec<Project>, ApiError>;
    async fn task_history(&self) -> Result<Vec<TaskHistoryItem>, ApiError>;
    async fn mcp_servers(&self) -> Result<Vec<McpServer>, ApiError>;
    async fn mcp_installs(&self) -> Result<Vec<McpInstall>, ApiError>;
    async fn skills(&self) -> Result<Vec<Skill>, ApiError>;
    async fn skill_installs(&self) -> Result<Vec<SkillInstall>, ApiError>;
    async fn plugins(&self) -> Result<Vec<Plugin>, ApiError>;
    async fn plugin_installs(&self) -> Result<Vec<PluginInstall>, ApiError>;
}

/// Handle on a running or finished preload.
///
/// Cloning is cheap; every clone observes the same completion.
#[derive(Debug, Clone)]
pub struct PreloadHandle {
    settled: watch::Receiver<bool>,
}

impl PreloadHandle {
    fn settled_now() -> Self {
        let (_tx, rx) = watch::channel(true);
        Self { settled: rx }
    }

    /// Returns true once every loader has finished.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        *self.settled.borrow()
    }

    /// Waits until every loader has finished. Never fails.
    pub async fn settled(&self) {
        let mut rx = self.settled.clone();
        // A closed channel means the preload task is gone; nothing left to wait for.
        let _ = rx.wait_for(|settled| *settled).await;
    }
}

#[derive(Debug, Default)]
struct Inner {
    state: Mutex<PreloadState>,
    handle: Mutex<Option<PreloadHandle>>,
}

/// Process-wide cache of eagerly loaded catalog data.
#[derive(Debug, Clone, Default)]
pub struct PreloadCache {
    inner: Arc<Inner>,
}

impl PreloadCache {
    /// Creates an empty cache with every slot unready.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, PreloadState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts the preload, or returns the handle of the one already started.
    ///
    /// Loaders run concurrently on the current tokio runtime. Outside a
    /// runtime nothing is started and an already-settled handle is returned,
    /// leaving [`Self::handle`] empty.
    pub fn start(&self, source: Arc<dyn PreloadSource>) -> PreloadHandle {
        let mut slot = self
            .inner
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = slot.as_ref() {
            return handle.clone();
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::debug!("No async runtime, skipping startup preload");
            return PreloadHandle::settled_now();
        };

        let (tx, rx) = watch::channel(false);
        let handle = PreloadHandle { settled: rx };
        *slot = Some(handle.clone());
        drop(slot);

        let cache = self.clone();
        runtime.spawn(async move {
            tokio::join!(
                cache.load::<slots::Projects, _>(source.projects()),
                cache.load::<slots::TaskHistory, _>(source.task_history()),
                cache.load::<slots::McpServers, _>(source.mcp_servers()),
                cache.load::<slots::McpInstalls, _>(source.mcp_installs()),
                cache.load::<slots::Skills, _>(source.skills()),
                cache.load::<slots::SkillInstalls, _>(source.skill_installs()),
                cache.load::<slots::Plugins, _>(source.plugins()),
                cache.load::<slots::PluginInstalls, _>(source.plugin_installs()),
            );
            let _ = tx.send(true);
        });

        handle
    }

    async fn load<S, F>(&self, loader: F)
    where
        S: PreloadSlot,
        F: Future<Output = Result<Vec<S::Value>, ApiError>>,
    {
        match loader.await {
            Ok(values) => self.set::<S>(values),
            Err(e) => {
                tracing::warn!(slot = %S::KEY, error = %e, "Failed to preload");
            }
        }
    }

    /// Returns the handle of the started preload, if any.
    #[must_use]
    pub fn handle(&self) -> Option<PreloadHandle> {
        self.inner
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns whether the slot holds data.
    #[must_use]
    pub fn has_value(&self, key: PreloadKey) -> bool {
        self.state().is_ready(key)
    }

    /// Returns whether every listed slot holds data.
    #[must_use]
    pub fn has_all(&self, keys: &[PreloadKey]) -> bool {
        let state = self.state();
        keys.iter().all(|key| state.is_ready(*key))
    }

    /// Returns a copy of the slot's records, or `None` if it is not ready.
    #[must_use]
    pub fn get<S: PreloadSlot>(&self) -> Option<Vec<S::Value>> {
        S::slot(&self.state()).clone()
    }

    /// Stores records in a slot and marks it ready.
    pub fn set<S: PreloadSlot>(&self, values: Vec<S::Value>) {
        *S::slot_mut(&mut self.state()) = Some(values);
    }

    /// Clears a slot's data and readiness.
    pub fn invalidate(&self, key: PreloadKey) {
        self.state().clear(key);
    }

    /// Clears several slots under a single lock.
    pub fn invalidate_many(&self, keys: &[PreloadKey]) {
        let mut state = self.state();
        for key in keys {
            state.clear(*key);
        }
    }

    /// Returns the keys of all ready slots.
    #[must_use]
    pub fn ready_keys(&self) -> Vec<PreloadKey> {
        let state = self.state();
        PreloadKey::ALL
            .into_iter()
            .filter(|key| state.is_ready(*key))
            .collect()
    }
}
