use std::cell::RefCell;
use std::rc::Rc;

use ahash::AHashMap;
use gtk4::Window;

use mate_panel_core::ToplevelId;

/// GTK window of every live toplevel, shared between the driver that
/// creates them and the backends that place them
#[derive(Debug, Clone, Default)]
pub struct WindowRegistry {
    windows: Rc<RefCell<AHashMap<ToplevelId, Window>>>,
}

impl WindowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, toplevel: ToplevelId, window: Window) {
        self.windows.borrow_mut().insert(toplevel, window);
    }

    pub fn remove(&self, toplevel: ToplevelId) -> Option<Window> {
        self.windows.borrow_mut().remove(&toplevel)
    }

    pub fn get(&self, toplevel: ToplevelId) -> Option<Window> {
        self.windows.borrow().get(&toplevel).cloned()
    }

    pub fn contains(&self, toplevel: ToplevelId) -> bool {
        self.windows.borrow().contains_key(&toplevel)
    }

    pub fn ids(&self) -> Vec<ToplevelId> {
        self.windows.borrow().keys().copied().collect()
    }
}
