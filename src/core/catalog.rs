//! Installable-extension catalogs (skills, plugins, MCP servers).
//!
//! A [`Catalog`] is what a catalog screen holds: the available items, the
//! user's installs, and the operations that change them. It is the main
//! consumer of the [`PreloadCache`]:
//!
//! 1. If both of its slots are preloaded it uses them right away
//!    ([`Hydration::Preloaded`]); the caller should follow up with
//!    [`Catalog::refresh_silently`].
//! 2. Otherwise, if a preload is in flight, it waits for it and checks again
//!    ([`Hydration::AwaitedPreload`]).
//! 3. Otherwise it fetches directly ([`Hydration::Fetched`]).
//!
//! Only the direct fetch can fail, so a failed or missing preload never
//! turns into an error for the user.
//!
//! Every write invalidates the slots it affects so that later screens do not
//! hydrate from outdated preload data.

use std::sync::Arc;

use async_trait::async_trait;

use super::preload::{PreloadCache, PreloadKey, PreloadSlot, slots};
use crate::api::{ApiError, McpInstall, McpServer, Plugin, PluginInstall, Skill, SkillInstall};

/// An entry that can be installed.
pub trait CatalogItem: Clone + Send + Sync + 'static {
    fn id(&self) -> i64;
    fn name(&self) -> &str;
}

/// A user's installation of a [`CatalogItem`].
pub trait InstallRecord: Clone + Send + Sync + 'static {
    fn id(&self) -> i64;
    /// Id of the installed item.
    fn item_id(&self) -> i64;
    fn enabled(&self) -> bool;
    fn set_enabled(&mut self, enabled: bool);
}

/// Ties a kind of catalog to its record types and preload slots.
pub trait CatalogKind: Send + Sync + 'static {
    type Item: CatalogItem;
    type Install: InstallRecord;
    type ItemsSlot: PreloadSlot<Value = Self::Item>;
    type InstallsSlot: PreloadSlot<Value = Self::Install>;

    /// Name used in log messages.
    const LABEL: &'static str;
}

/// Skills catalog.
#[derive(Debug, Clone, Copy)]
pub struct Skills;

/// Plugins catalog.
#[derive(Debug, Clone, Copy)]
pub struct Plugins;

/// MCP servers catalog.
#[derive(Debug, Clone, Copy)]
pub struct McpServers;

impl CatalogKind for Skills {
    type Item = Skill;
    type Install = SkillInstall;
    type ItemsSlot = slots::Skills;
    type InstallsSlot = slots::SkillInstalls;
    const LABEL: &'static str = "Skills";
}

impl CatalogKind for Plugins {
    type Item = Plugin;
    type Install = PluginInstall;
    type ItemsSlot = slots::Plugins;
    type InstallsSlot = slots::PluginInstalls;
    const LABEL: &'static str = "Plugins";
}

impl CatalogKind for McpServers {
    type Item = McpServer;
    type Install = McpInstall;
    type ItemsSlot = slots::McpServers;
    type InstallsSlot = slots::McpInstalls;
    const LABEL: &'static str = "MCP";
}

impl CatalogItem for Skill {
    fn id(&self) -> i64 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl CatalogItem for Plugin {
    fn id(&self) -> i64 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl CatalogItem for McpServer {
    fn id(&self) -> i64 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl InstallRecord for SkillInstall {
    fn id(&self) -> i64 {
        self.id
    }

    fn item_id(&self) -> i64 {
        self.skill_id
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}

impl InstallRecord for PluginInstall {
    fn id(&self) -> i64 {
        self.id
    }

    fn item_id(&self) -> i64 {
        self.plugin_id
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}

impl InstallRecord for McpInstall {
    fn id(&self) -> i64 {
        self.id
    }

    fn item_id(&self) -> i64 {
        self.server_id
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}

/// Backend operations a catalog needs.
#[async_trait]
pub trait CatalogApi<K: CatalogKind>: Send + Sync {
    async fn list_items(&self) -> Result<Vec<K::Item>, ApiError>;
    async fn list_installs(&self) -> Result<Vec<K::Install>, ApiError>;
    /// Installs an item, enabled.
    async fn create_install(&self, item_id: i64) -> Result<K::Install, ApiError>;
    async fn update_install(&self, install_id: i64, enabled: bool)
    -> Result<K::Install, ApiError>;
    async fn delete_item(&self, item_id: i64) -> Result<(), ApiError>;
}

/// How [`Catalog::hydrate`] obtained its data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hydration {
    /// Both slots were already preloaded.
    Preloaded,
    /// The in-flight preload finished with both slots ready.
    AwaitedPreload,
    /// No usable preload; data was fetched directly.
    Fetched,
}

impl Hydration {
    /// Returns true when the data came from the preload cache and a
    /// background refresh should follow.
    #[must_use]
    pub const fn needs_refresh(self) -> bool {
        matches!(self, Self::Preloaded | Self::AwaitedPreload)
    }
}

/// An item joined with its install, if any.
#[derive(Debug, Clone, Copy)]
pub struct CatalogEntry<'a, K: CatalogKind> {
    pub item: &'a K::Item,
    pub install: Option<&'a K::Install>,
}

/// State and operations of one catalog screen.
pub struct Catalog<K: CatalogKind> {
    api: Arc<dyn CatalogApi<K>>,
    cache: PreloadCache,
    items: Vec<K::Item>,
    installs: Vec<K::Install>,
    busy_id: Option<i64>,
}

impl<K: CatalogKind> Catalog<K> {
    /// Creates an empty catalog. Call [`Self::hydrate`] to fill it.
    #[must_use]
    pub fn new(api: Arc<dyn CatalogApi<K>>, cache: PreloadCache) -> Self {
        Self {
            api,
            cache,
            items: Vec::new(),
            installs: Vec::new(),
            busy_id: None,
        }
    }

    /// Available items.
    #[must_use]
    pub fn items(&self) -> &[K::Item] {
        &self.items
    }

    /// The user's installs.
    #[must_use]
    pub fn installs(&self) -> &[K::Install] {
        &self.installs
    }

    /// Id of the item or install currently being changed, if any.
    #[must_use]
    pub const fn busy_id(&self) -> Option<i64> {
        self.busy_id
    }

    /// Each item with the install that refers to it.
    #[must_use]
    pub fn entries(&self) -> Vec<CatalogEntry<'_, K>> {
        self.items
            .iter()
            .map(|item| CatalogEntry {
                item,
                install: self.installs.iter().find(|i| i.item_id() == item.id()),
            })
            .collect()
    }

    fn slot_keys() -> [PreloadKey; 2] {
        [
            <K::ItemsSlot as PreloadSlot>::KEY,
            <K::InstallsSlot as PreloadSlot>::KEY,
        ]
    }

    /// Copies both slots out of the cache if both are ready.
    fn take_preloaded(&mut self) -> bool {
        let items = self.cache.get::<K::ItemsSlot>();
        let installs = self.cache.get::<K::InstallsSlot>();
        match (items, installs) {
            (Some(items), Some(installs)) => {
                self.items = items;
                self.installs = installs;
                true
            }
            _ => false,
        }
    }

    /// Fills the catalog, preferring preloaded data.
    ///
    /// # Errors
    ///
    /// Returns an error only when the preload could not be used and the
    /// direct fetch failed.
    pub async fn hydrate(&mut self) -> Result<Hydration, ApiError> {
        if self.take_preloaded() {
            return Ok(Hydration::Preloaded);
        }

        if let Some(handle) = self.cache.handle() {
            handle.settled().await;
            if self.take_preloaded() {
                return Ok(Hydration::AwaitedPreload);
            }
        }

        self.refresh().await?;
        Ok(Hydration::Fetched)
    }

    /// Fetches items and installs concurrently, replacing local state.
    ///
    /// # Errors
    ///
    /// Returns the first failing request's error; local state is unchanged.
    pub async fn refresh(&mut self) -> Result<(), ApiError> {
        let (items, installs) =
            tokio::try_join!(self.api.list_items(), self.api.list_installs())?;
        self.items = items;
        self.installs = installs;
        Ok(())
    }

    /// Like [`Self::refresh`], but failures are only logged.
    ///
    /// Returns whether the refresh succeeded.
    pub async fn refresh_silently(&mut self) -> bool {
        match self.refresh().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(catalog = K::LABEL, error = %e, "Silent refresh failed");
                false
            }
        }
    }

    /// Installs an item and puts the new install first.
    ///
    /// # Errors
    ///
    /// Returns the backend error; local state is unchanged on failure.
    pub async fn install(&mut self, item_id: i64) -> Result<(), ApiError> {
        self.busy_id = Some(item_id);
        let result = self.api.create_install(item_id).await;
        self.busy_id = None;

        let created = result.inspect_err(|e| {
            tracing::warn!(catalog = K::LABEL, item_id, error = %e, "Install failed");
        })?;
        self.installs.insert(0, created);
        self.cache
            .invalidate(<K::InstallsSlot as PreloadSlot>::KEY);
        Ok(())
    }

    /// Deletes an item together with its installs.
    ///
    /// # Errors
    ///
    /// Returns the backend error; local state is unchanged on failure.
    pub async fn delete(&mut self, item_id: i64) -> Result<(), ApiError> {
        self.busy_id = Some(item_id);
        let result = self.api.delete_item(item_id).await;
        self.busy_id = None;

        result.inspect_err(|e| {
            tracing::warn!(catalog = K::LABEL, item_id, error = %e, "Delete failed");
        })?;
        self.items.retain(|item| item.id() != item_id);
        self.installs.retain(|install| install.item_id() != item_id);
        self.cache.invalidate_many(&Self::slot_keys());
        Ok(())
    }

    /// Enables or disables an install.
    ///
    /// The local state flips immediately. If the backend rejects the change
    /// the previous installs are restored and the error is returned.
    ///
    /// # Errors
    ///
    /// Returns the backend error after rolling back.
    pub async fn set_enabled(&mut self, install_id: i64, enabled: bool) -> Result<(), ApiError> {
        let snapshot = self.installs.clone();
        for install in &mut self.installs {
            if install.id() == install_id {
                install.set_enabled(enabled);
            }
        }

        self.busy_id = Some(install_id);
        let result = self.api.update_install(install_id, enabled).await;
        self.busy_id = None;

        match result {
            Ok(updated) => {
                for install in &mut self.installs {
                    if install.id() == install_id {
                        *install = updated.clone();
                    }
                }
                self.cache
                    .invalidate(<K::InstallsSlot as PreloadSlot>::KEY);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(catalog = K::LABEL, install_id, error = %e, "Toggle failed, rolling back");
                self.installs = snapshot;
                Err(e)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::core::preload::tests::{
        MockPreloadSource, sample_skill_installs, sample_skills,
    };
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    /// In-memory skills backend recording calls.
    #[derive(Debug, Default)]
    struct MockSkillsApi {
        fail: AtomicBool,
        list_calls: AtomicU32,
        updates: Mutex<Vec<(i64, bool)>>,
    }

    impl MockSkillsApi {
        fn failing() -> Self {
            let api = Self::default();
            api.fail.store(true, Ordering::SeqCst);
            api
        }

        fn check(&self) -> Result<(), ApiError> {
            if self.fail.load(Ordering::SeqCst) {
                Err(ApiError::Status {
                    status: 503,
                    message: "down".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl CatalogApi<Skills> for MockSkillsApi {
        async fn list_items(&self) -> Result<Vec<Skill>, ApiError> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            self.check()?;
            let mut skills = sample_skills();
            skills.push(Skill {
                id: 3,
                name: "fresh".to_string(),
                description: None,
                source: None,
            });
            Ok(skills)
        }

        async fn list_installs(&self) -> Result<Vec<SkillInstall>, ApiError> {
            self.check()?;
            Ok(sample_skill_installs())
        }

        async fn create_install(&self, item_id: i64) -> Result<SkillInstall, ApiError> {
            self.check()?;
            Ok(SkillInstall {
                id: 100 + item_id,
                skill_id: item_id,
                enabled: true,
            })
        }

        async fn update_install(
            &self,
            install_id: i64,
            enabled: bool,
        ) -> Result<SkillInstall, ApiError> {
            self.updates.lock().unwrap().push((install_id, enabled));
            self.check()?;
            Ok(SkillInstall {
                id: install_id,
                skill_id: 1,
                enabled,
            })
        }

        async fn delete_item(&self, _item_id: i64) -> Result<(), ApiError> {
            self.check()
        }
    }

    fn preloaded_cache() -> PreloadCache {
        let cache = PreloadCache::new();
        cache.set::<slots::Skills>(sample_skills());
        cache.set::<slots::SkillInstalls>(sample_skill_installs());
        cache
    }

    #[tokio::test]
    async fn hydrate_prefers_ready_preload() {
        let api = Arc::new(MockSkillsApi::default());
        let mut catalog = Catalog::<Skills>::new(api.clone(), preloaded_cache());

        let hydration = catalog.hydrate().await.unwrap();

        assert_eq!(hydration, Hydration::Preloaded);
        assert!(hydration.needs_refresh());
        assert_eq!(catalog.items(), sample_skills().as_slice());
        assert_eq!(api.list_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn hydrate_waits_for_inflight_preload() {
        let cache = PreloadCache::new();
        cache.start(Arc::new(MockPreloadSource::default()));
        let api = Arc::new(MockSkillsApi::default());
        let mut catalog = Catalog::<Skills>::new(api.clone(), cache);

        let hydration = catalog.hydrate().await.unwrap();

        assert_eq!(hydration, Hydration::AwaitedPreload);
        assert_eq!(catalog.items().len(), 2);
        assert_eq!(api.list_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn hydrate_fetches_when_preload_failed() {
        let cache = PreloadCache::new();
        cache.start(Arc::new(MockPreloadSource::failing(&[PreloadKey::SkillInstalls])));
        let api = Arc::new(MockSkillsApi::default());
        let mut catalog = Catalog::<Skills>::new(api.clone(), cache);

        let hydration = catalog.hydrate().await.unwrap();

        assert_eq!(hydration, Hydration::Fetched);
        assert!(!hydration.needs_refresh());
        assert_eq!(catalog.items().len(), 3);
        assert_eq!(api.list_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn hydrate_fetches_without_preload() {
        let api = Arc::new(MockSkillsApi::default());
        let mut catalog = Catalog::<Skills>::new(api, PreloadCache::new());
        assert_eq!(catalog.hydrate().await.unwrap(), Hydration::Fetched);
        assert_eq!(catalog.installs(), sample_skill_installs().as_slice());
    }

    #[tokio::test]
    async fn hydrate_surfaces_only_direct_fetch_errors() {
        let api = Arc::new(MockSkillsApi::failing());
        let mut catalog = Catalog::<Skills>::new(api.clone(), PreloadCache::new());
        assert!(catalog.hydrate().await.is_err());

        let mut preloaded = Catalog::<Skills>::new(api, preloaded_cache());
        assert_eq!(preloaded.hydrate().await.unwrap(), Hydration::Preloaded);
    }

    #[tokio::test]
    async fn silent_refresh_keeps_preload_data_on_failure() {
        let api = Arc::new(MockSkillsApi::failing());
        let mut catalog = Catalog::<Skills>::new(api, preloaded_cache());
        catalog.hydrate().await.unwrap();

        assert!(!catalog.refresh_silently().await);
        assert_eq!(catalog.items(), sample_skills().as_slice());
    }

    #[tokio::test]
    async fn silent_refresh_replaces_data_on_success() {
        let api = Arc::new(MockSkillsApi::default());
        let mut catalog = Catalog::<Skills>::new(api, preloaded_cache());
        catalog.hydrate().await.unwrap();

        assert!(catalog.refresh_silently().await);
        assert_eq!(catalog.items().len(), 3);
    }

    #[tokio::test]
    async fn install_prepends_and_invalidates_installs_slot() {
        let cache = preloaded_cache();
        let api = Arc::new(MockSkillsApi::default());
        let mut catalog = Catalog::<Skills>::new(api, cache.clone());
        catalog.hydrate().await.unwrap();

        catalog.install(2).await.unwrap();

        assert_eq!(catalog.installs()[0].skill_id, 2);
        assert_eq!(catalog.installs().len(), 2);
        assert!(!cache.has_value(PreloadKey::SkillInstalls));
        assert!(cache.has_value(PreloadKey::Skills));
        assert!(catalog.busy_id().is_none());
    }

    #[tokio::test]
    async fn delete_removes_item_and_installs() {
        let cache = preloaded_cache();
        let api = Arc::new(MockSkillsApi::default());
        let mut catalog = Catalog::<Skills>::new(api, cache.clone());
        catalog.hydrate().await.unwrap();

        catalog.delete(1).await.unwrap();

        assert!(catalog.items().iter().all(|s| s.id != 1));
        assert!(catalog.installs().is_empty());
        assert!(!cache.has_value(PreloadKey::Skills));
        assert!(!cache.has_value(PreloadKey::SkillInstalls));
    }

    #[tokio::test]
    async fn failed_delete_keeps_state_and_cache() {
        let cache = preloaded_cache();
        let api = Arc::new(MockSkillsApi::default());
        let mut catalog = Catalog::<Skills>::new(api.clone(), cache.clone());
        catalog.hydrate().await.unwrap();
        api.fail.store(true, Ordering::SeqCst);

        assert!(catalog.delete(1).await.is_err());
        assert_eq!(catalog.items().len(), 2);
        assert!(cache.has_value(PreloadKey::Skills));
    }

    #[tokio::test]
    async fn set_enabled_applies_server_record() {
        let cache = preloaded_cache();
        let api = Arc::new(MockSkillsApi::default());
        let mut catalog = Catalog::<Skills>::new(api.clone(), cache.clone());
        catalog.hydrate().await.unwrap();

        catalog.set_enabled(10, false).await.unwrap();

        assert!(!catalog.installs()[0].enabled);
        assert_eq!(*api.updates.lock().unwrap(), vec![(10, false)]);
        assert!(!cache.has_value(PreloadKey::SkillInstalls));
    }

    #[tokio::test]
    async fn set_enabled_rolls_back_on_failure() {
        let cache = preloaded_cache();
        let api = Arc::new(MockSkillsApi::default());
        let mut catalog = Catalog::<Skills>::new(api.clone(), cache.clone());
        catalog.hydrate().await.unwrap();
        api.fail.store(true, Ordering::SeqCst);

        let result = catalog.set_enabled(10, false).await;

        assert!(result.is_err());
        assert!(catalog.installs()[0].enabled);
        assert!(cache.has_value(PreloadKey::SkillInstalls));
    }

    #[tokio::test]
    async fn entries_join_items_with_installs() {
        let api = Arc::new(MockSkillsApi::default());
        let mut catalog = Catalog::<Skills>::new(api, preloaded_cache());
        catalog.hydrate().await.unwrap();

        let entries = catalog.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].install.map(|i| i.id), Some(10));
        assert!(entries[1].install.is_none());
        assert_eq!(entries[0].item.name(), "pdf");
    }
}
