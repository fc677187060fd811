use crate::registry::{
    GameApp,
    GameRegistry,
    ModuleLoader,
};
use std::{
    fmt,
    sync::Arc,
};
use tracing::{
    debug,
    warn,
};

pub const HOME_PATH: &str = "/";

/// Host-owned navigation collaborator (browser history, a screen stack).
pub trait Navigator {
    fn go_to(&self, path: &str);
}

/// Route lifecycle for one requested game id. `NotFound` and `LoadFailed`
/// are terminal for that id; a new [`GameRouter::navigate`] restarts from
/// `Resolving`.
pub enum RouteState {
    Resolving,
    Ready(Arc<dyn GameApp>),
    NotFound(String),
    LoadFailed { id: String, error: String },
}

impl fmt::Debug for RouteState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteState::Resolving => write!(f, "Resolving"),
            RouteState::Ready(app) => write!(f, "Ready({})", app.title()),
            RouteState::NotFound(id) => write!(f, "NotFound({id})"),
            RouteState::LoadFailed { id, error } => {
                write!(f, "LoadFailed({id}: {error})")
            }
        }
    }
}

pub struct GameRouter<L> {
    registry: Arc<GameRegistry<L>>,
    default_id: String,
    state: RouteState,
}

impl<L: ModuleLoader> GameRouter<L> {
    pub fn new(registry: Arc<GameRegistry<L>>, default_id: impl Into<String>) -> Self {
        Self {
            registry,
            default_id: default_id.into(),
            state: RouteState::Resolving,
        }
    }

    pub fn state(&self) -> &RouteState {
        &self.state
    }

    /// Drives the route machine for one requested id. An empty or absent id
    /// falls back to the default id exactly once; an unknown default still
    /// ends in `NotFound`. The router reports `Resolving` while the module
    /// load is in flight, and no automatic retry happens after `LoadFailed`.
    pub async fn navigate(&mut self, requested: Option<&str>) -> &RouteState {
        self.state = RouteState::Resolving;
        let id = match requested {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => self.default_id.clone(),
        };
        if self.registry.resolve(&id).is_none() {
            warn!(game = %id, "requested game is not in the catalog");
            self.state = RouteState::NotFound(id);
            return &self.state;
        }
        debug!(game = %id, "activating game module");
        self.state = match self.registry.activate(&id).await {
            Ok(app) => RouteState::Ready(app),
            Err(err) => {
                warn!(game = %id, ?err, "game module failed to load");
                RouteState::LoadFailed {
                    id,
                    error: err.to_string(),
                }
            }
        };
        &self.state
    }

    /// Recovery affordance: jump back to the home screen. Only armed while
    /// the router sits in `NotFound`; returns whether navigation fired.
    pub fn return_home<N: Navigator>(&self, nav: &N) -> bool {
        match &self.state {
            RouteState::NotFound(_) => {
                nav.go_to(HOME_PATH);
                true
            }
            _ => false,
        }
    }
}
