//! Per-output enumeration through the X RandR extension

use tracing::{debug, warn};
use x11rb::connection::Connection;
use x11rb::protocol::randr::{self, ConnectionExt as _};
use x11rb::rust_connection::RustConnection;

use crate::error::{PanelError, Result};
use crate::geometry::Rect;

use super::{Monitor, MonitorSource};

const SOURCE_NAME: &str = "randr";

/// Output name prefixes of built-in laptop displays
const BUILTIN_PREFIXES: [&str; 5] = ["LVDS", "Lvds", "LCD", "eDP", "DSI"];

fn enumeration_error(reason: impl ToString) -> PanelError {
    PanelError::MonitorEnumeration {
        source_name: SOURCE_NAME,
        reason: reason.to_string(),
    }
}

/// Monitor source backed by RandR 1.3 screen resources.
///
/// The connection is opened on first use and kept for later rebuilds.
#[derive(Default)]
pub struct RandrMonitorSource {
    connection: Option<(RustConnection, usize)>,
}

impl RandrMonitorSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn connection(&mut self) -> Result<&(RustConnection, usize)> {
        if self.connection.is_none() {
            let (conn, screen) = x11rb::connect(None).map_err(enumeration_error)?;

            let version = conn
                .randr_query_version(1, 3)
                .map_err(enumeration_error)?
                .reply()
                .map_err(enumeration_error)?;
            if version.major_version < 1 || (version.major_version == 1 && version.minor_version < 3) {
                return Err(enumeration_error(format!(
                    "server speaks RandR {}.{}, need 1.3",
                    version.major_version, version.minor_version
                )));
            }

            self.connection = Some((conn, screen));
        }

        self.connection
            .as_ref()
            .ok_or_else(|| enumeration_error("no connection"))
    }
}

impl MonitorSource for RandrMonitorSource {
    fn name(&self) -> &'static str {
        SOURCE_NAME
    }

    fn enumerate(&mut self) -> Result<Option<Vec<Monitor>>> {
        let (conn, screen_num) = self.connection()?;
        let root = conn.setup().roots[*screen_num].root;

        let resources = conn
            .randr_get_screen_resources_current(root)
            .map_err(enumeration_error)?
            .reply()
            .map_err(enumeration_error)?;

        let primary = conn
            .randr_get_output_primary(root)
            .map_err(enumeration_error)?
            .reply()
            .map_err(enumeration_error)?
            .output;

        let mut outputs = Vec::with_capacity(resources.outputs.len());
        for &output in &resources.outputs {
            let info = conn
                .randr_get_output_info(output, resources.config_timestamp)
                .map_err(enumeration_error)?
                .reply()
                .map_err(enumeration_error)?;

            let name = String::from_utf8_lossy(&info.name).into_owned();

            // Pre-1.2 drivers expose a single fake output; treat as unusable
            if name == "default" {
                debug!("RandR reports an output named 'default', ignoring RandR");
                return Ok(None);
            }

            if info.connection != randr::Connection::CONNECTED || info.crtc == 0 {
                continue;
            }

            let crtc = conn
                .randr_get_crtc_info(info.crtc, resources.config_timestamp)
                .map_err(enumeration_error)?
                .reply()
                .map_err(enumeration_error)?;

            let geometry = Rect::new(
                i32::from(crtc.x),
                i32::from(crtc.y),
                i32::from(crtc.width),
                i32::from(crtc.height),
            );

            outputs.push((output == primary, Monitor::new(geometry).with_connector(name)));
        }

        if outputs.is_empty() {
            warn!("RandR returned no connected outputs with a CRTC");
            return Ok(None);
        }

        Ok(Some(order_outputs(outputs)))
    }
}

/// Put the primary output first, or a built-in display when there is no
/// primary. Everything else keeps discovery order.
fn order_outputs(mut outputs: Vec<(bool, Monitor)>) -> Vec<Monitor> {
    let lead = outputs.iter().position(|(primary, _)| *primary).or_else(|| {
        outputs.iter().position(|(_, monitor)| {
            monitor
                .connector
                .as_deref()
                .is_some_and(|name| BUILTIN_PREFIXES.iter().any(|p| name.starts_with(p)))
        })
    });

    if let Some(index) = lead {
        let entry = outputs.remove(index);
        outputs.insert(0, entry);
    }

    outputs.into_iter().map(|(_, monitor)| monitor).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(name: &str, primary: bool, x: i32) -> (bool, Monitor) {
        (
            primary,
            Monitor::new(Rect::new(x, 0, 1920, 1080)).with_connector(name),
        )
    }

    fn names(monitors: &[Monitor]) -> Vec<&str> {
        monitors
            .iter()
            .map(|m| m.connector.as_deref().unwrap_or(""))
            .collect()
    }

    #[test]
    fn test_primary_goes_first() {
        let ordered = order_outputs(vec![
            output("HDMI-1", false, 0),
            output("eDP-1", false, 1920),
            output("DP-2", true, 3840),
        ]);
        assert_eq!(names(&ordered), vec!["DP-2", "HDMI-1", "eDP-1"]);
    }

    #[test]
    fn test_builtin_display_goes_first_without_primary() {
        let ordered = order_outputs(vec![
            output("HDMI-1", false, 0),
            output("LVDS1", false, 1920),
        ]);
        assert_eq!(names(&ordered), vec!["LVDS1", "HDMI-1"]);
    }

    #[test]
    fn test_order_untouched_without_hints() {
        let ordered = order_outputs(vec![output("DP-1", false, 0), output("DP-2", false, 1920)]);
        assert_eq!(names(&ordered), vec!["DP-1", "DP-2"]);
    }
}
