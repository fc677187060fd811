use color_eyre::eyre::{
    Result,
    eyre,
};
use std::{
    collections::HashSet,
    sync::Arc,
};
use tokio::sync::OnceCell;

/// An activated game module, ready to mount. The host decides how to present
/// it; the core only hands out the handle.
pub trait GameApp: Send + Sync {
    fn title(&self) -> &str;
}

/// Fetches and initializes the executable module behind a descriptor's
/// `module_ref`. External collaborator (a bundler, an embedded game table, a
/// plugin host).
pub trait ModuleLoader {
    fn load(
        &self,
        module_ref: &str,
    ) -> impl Future<Output = Result<Arc<dyn GameApp>>> + Send;
}

/// Presentation metadata for one catalog entry; opaque to the core.
#[derive(Clone, Debug)]
pub struct GameMeta {
    pub name: String,
    pub description: String,
    pub image: String,
    pub background: String,
    pub tag: Option<String>,
}

/// One catalog record: a stable id plus the reference the loader uses to
/// produce the executable module.
#[derive(Clone, Debug)]
pub struct GameDescriptor {
    pub id: String,
    pub meta: GameMeta,
    pub module_ref: String,
}

struct CatalogEntry {
    descriptor: GameDescriptor,
    module: OnceCell<Arc<dyn GameApp>>,
}

/// Immutable catalog of game descriptors keyed by id. Constructed once at
/// startup; offers no mutation after that.
pub struct GameRegistry<L> {
    loader: L,
    entries: Vec<CatalogEntry>,
}

impl<L: ModuleLoader> GameRegistry<L> {
    /// Builds the registry from a catalog. Ids must be unique.
    pub fn new(loader: L, catalog: Vec<GameDescriptor>) -> Result<Self> {
        let mut seen = HashSet::new();
        for descriptor in &catalog {
            if !seen.insert(descriptor.id.clone()) {
                return Err(eyre!("duplicate game id '{}' in catalog", descriptor.id));
            }
        }
        let entries = catalog
            .into_iter()
            .map(|descriptor| CatalogEntry {
                descriptor,
                module: OnceCell::new(),
            })
            .collect();
        Ok(Self { loader, entries })
    }

    pub fn catalog(&self) -> impl Iterator<Item = &GameDescriptor> {
        self.entries.iter().map(|entry| &entry.descriptor)
    }

    /// Exact-match lookup; no normalization, no fuzzy matching.
    pub fn resolve(&self, id: &str) -> Option<&GameDescriptor> {
        self.entries
            .iter()
            .map(|entry| &entry.descriptor)
            .find(|descriptor| descriptor.id == id)
    }

    /// Activates the module behind `id`, loading it on first use. A
    /// successful load is cached for the process lifetime; a failed load is
    /// not, so the caller may re-request.
    pub async fn activate(&self, id: &str) -> Result<Arc<dyn GameApp>> {
        let entry = self
            .entries
            .iter()
            .find(|entry| entry.descriptor.id == id)
            .ok_or_else(|| eyre!("no game registered under id '{id}'"))?;
        let module = entry
            .module
            .get_or_try_init(|| self.loader.load(&entry.descriptor.module_ref))
            .await?;
        Ok(Arc::clone(module))
    }
}

/// The catalog shipped with the reference deployment.
pub fn builtin_catalog() -> Vec<GameDescriptor> {
    vec![GameDescriptor {
        id: "rps".to_string(),
        meta: GameMeta {
            name: "Rock Paper Scissors".to_string(),
            description: "Challenge other players in the classic Rock Paper \
                          Scissors game with real SOL betting. Create or join \
                          matches, place your bets, make your choice, and win \
                          big! Secure commitment-reveal scheme ensures fair \
                          play for all players."
                .to_string(),
            image: "/rps-icon.png".to_string(),
            background: "#ff6490".to_string(),
            tag: Some("PvP".to_string()),
        },
        module_ref: "games/rps".to_string(),
    }]
}
