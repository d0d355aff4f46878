//! Monitor enumeration through GDK, used where RandR is unavailable

use gtk4::gdk;
use gtk4::prelude::*;
use tracing::debug;

use mate_panel_core::{Monitor, MonitorSource, PanelError, Rect};

const SOURCE_NAME: &str = "gdk";

/// Monitor source reading the default display's monitor list
#[derive(Debug, Default)]
pub struct GdkMonitorSource;

impl GdkMonitorSource {
    pub fn new() -> Self {
        Self
    }
}

impl MonitorSource for GdkMonitorSource {
    fn name(&self) -> &'static str {
        SOURCE_NAME
    }

    fn enumerate(&mut self) -> mate_panel_core::Result<Option<Vec<Monitor>>> {
        let display = gdk::Display::default().ok_or_else(|| PanelError::MonitorEnumeration {
            source_name: SOURCE_NAME,
            reason: "no default display".to_string(),
        })?;

        let list = display.monitors();
        let monitors: Vec<Monitor> = (0..list.n_items())
            .filter_map(|i| list.item(i).and_downcast::<gdk::Monitor>())
            .map(|m| {
                let g = m.geometry();
                let mut monitor = Monitor::new(Rect::new(g.x(), g.y(), g.width(), g.height()))
                    .with_scale(m.scale_factor());
                if let Some(connector) = m.connector() {
                    monitor = monitor.with_connector(connector.as_str());
                }
                monitor
            })
            .collect();

        debug!("GDK reports {} monitor(s)", monitors.len());
        Ok((!monitors.is_empty()).then_some(monitors))
    }
}
