use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use shared::protocol::{DataLayerEntry, GtagCommand};

/// The analytics event queue and its dispatch function.
///
/// One instance is shared by everything on a page. `ensure_queue` must keep
/// whatever a previous snippet already queued.
pub trait DataLayer {
    fn ensure_queue(&self);
    fn install_dispatch(&self);
    /// Appends the command's arguments as a single queue entry.
    fn dispatch(&self, command: &GtagCommand);
}

#[derive(Debug, Default)]
struct QueueState {
    entries: Option<Vec<DataLayerEntry>>,
    dispatch_installed: bool,
}

/// In-process data layer. Clones refer to the same queue.
#[derive(Debug, Clone, Default)]
pub struct SharedDataLayer {
    state: Arc<Mutex<QueueState>>,
}

static GLOBAL: OnceLock<SharedDataLayer> = OnceLock::new();

impl SharedDataLayer {
    /// A page with no queue yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// A page where another snippet already created the queue.
    pub fn with_entries(entries: Vec<DataLayerEntry>) -> Self {
        Self {
            state: Arc::new(Mutex::new(QueueState {
                entries: Some(entries),
                dispatch_installed: false,
            })),
        }
    }

    /// Process-wide instance, created on first use.
    pub fn global() -> Self {
        GLOBAL.get_or_init(Self::new).clone()
    }

    pub fn exists(&self) -> bool {
        self.lock().entries.is_some()
    }

    pub fn dispatch_installed(&self) -> bool {
        self.lock().dispatch_installed
    }

    pub fn entries(&self) -> Vec<DataLayerEntry> {
        self.lock().entries.clone().unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DataLayer for SharedDataLayer {
    fn ensure_queue(&self) {
        self.lock().entries.get_or_insert_with(Vec::new);
    }

    fn install_dispatch(&self) {
        self.lock().dispatch_installed = true;
    }

    fn dispatch(&self, command: &GtagCommand) {
        self.lock()
            .entries
            .get_or_insert_with(Vec::new)
            .push(DataLayerEntry::from(command));
    }
}
