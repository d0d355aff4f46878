use crate::error::Result;

use super::Monitor;

/// A way of discovering monitor rectangles.
///
/// `Ok(None)` means the method is available but produced nothing usable, in
/// which case the registry moves on to the next source.
pub trait MonitorSource {
    fn name(&self) -> &'static str;

    fn enumerate(&mut self) -> Result<Option<Vec<Monitor>>>;
}

/// Fixed monitor list, used for headless runs and tests
#[derive(Debug, Clone, Default)]
pub struct StaticMonitorSource {
    monitors: Vec<Monitor>,
}

impl StaticMonitorSource {
    pub fn new(monitors: Vec<Monitor>) -> Self {
        Self { monitors }
    }

    pub fn set_monitors(&mut self, monitors: Vec<Monitor>) {
        self.monitors = monitors;
    }
}

impl MonitorSource for StaticMonitorSource {
    fn name(&self) -> &'static str {
        "static"
    }

    fn enumerate(&mut self) -> Result<Option<Vec<Monitor>>> {
        if self.monitors.is_empty() {
            Ok(None)
        } else {
            Ok(Some(self.monitors.clone()))
        }
    }
}

/// Shared handle onto a static source so tests can hot-plug monitors
#[derive(Debug, Clone, Default)]
pub struct SharedMonitorSource {
    monitors: std::rc::Rc<std::cell::RefCell<Vec<Monitor>>>,
}

impl SharedMonitorSource {
    pub fn new(monitors: Vec<Monitor>) -> Self {
        Self {
            monitors: std::rc::Rc::new(std::cell::RefCell::new(monitors)),
        }
    }

    pub fn set_monitors(&self, monitors: Vec<Monitor>) {
        *self.monitors.borrow_mut() = monitors;
    }
}

impl MonitorSource for SharedMonitorSource {
    fn name(&self) -> &'static str {
        "shared"
    }

    fn enumerate(&mut self) -> Result<Option<Vec<Monitor>>> {
        let monitors = self.monitors.borrow();
        if monitors.is_empty() {
            Ok(None)
        } else {
            Ok(Some(monitors.clone()))
        }
    }
}
