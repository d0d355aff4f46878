//! Edge-strut placement through EWMH window properties

use ahash::AHashMap;
use compact_str::CompactString;
use tracing::{debug, info, warn};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{
    Atom, AtomEnum, ConfigureWindowAux, ConnectionExt as _, PropMode, Window,
};
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;

use crate::error::{PanelError, Result};
use crate::toplevel::{window_title, ToplevelId};

use super::{Placement, PlacementBackend};

const BACKEND: &str = "x11";

fn x11_error(reason: impl ToString) -> PanelError {
    PanelError::backend(BACKEND, reason)
}

struct Atoms {
    net_wm_strut: Atom,
    net_wm_strut_partial: Atom,
    net_wm_window_type: Atom,
    net_wm_window_type_dock: Atom,
    net_supporting_wm_check: Atom,
    net_wm_name: Atom,
    utf8_string: Atom,
}

impl Atoms {
    fn new(conn: &RustConnection) -> Result<Self> {
        let intern = |name: &[u8]| -> Result<Atom> {
            Ok(conn
                .intern_atom(false, name)
                .map_err(x11_error)?
                .reply()
                .map_err(x11_error)?
                .atom)
        };

        Ok(Self {
            net_wm_strut: intern(b"_NET_WM_STRUT")?,
            net_wm_strut_partial: intern(b"_NET_WM_STRUT_PARTIAL")?,
            net_wm_window_type: intern(b"_NET_WM_WINDOW_TYPE")?,
            net_wm_window_type_dock: intern(b"_NET_WM_WINDOW_TYPE_DOCK")?,
            net_supporting_wm_check: intern(b"_NET_SUPPORTING_WM_CHECK")?,
            net_wm_name: intern(b"_NET_WM_NAME")?,
            utf8_string: intern(b"UTF8_STRING")?,
        })
    }
}

/// Publishes struts and moves panel windows on an X11 display.
///
/// Panel windows are found by their title (see [`window_title`]) and cached.
pub struct X11StrutBackend {
    conn: RustConnection,
    root: Window,
    atoms: Atoms,
    windows: AHashMap<ToplevelId, Window>,
}

impl X11StrutBackend {
    pub fn connect() -> Result<Self> {
        let (conn, screen_num) = x11rb::connect(None).map_err(x11_error)?;
        let root = conn.setup().roots[screen_num].root;
        let atoms = Atoms::new(&conn)?;

        info!("X11 strut backend connected (root window 0x{:x})", root);

        Ok(Self {
            conn,
            root,
            atoms,
            windows: AHashMap::new(),
        })
    }

    fn read_utf8(&self, window: Window, property: Atom, kind: Atom) -> Result<Option<String>> {
        let reply = self
            .conn
            .get_property(false, window, property, kind, 0, 1024)
            .map_err(x11_error)?
            .reply()
            .map_err(x11_error)?;

        if reply.value.is_empty() {
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(&reply.value).into_owned()))
    }

    fn window_name(&self, window: Window) -> Result<Option<String>> {
        if let Some(name) = self.read_utf8(window, self.atoms.net_wm_name, self.atoms.utf8_string)? {
            return Ok(Some(name));
        }
        self.read_utf8(window, AtomEnum::WM_NAME.into(), AtomEnum::STRING.into())
    }

    /// Find the window titled for `toplevel` among the root's children and
    /// their direct children (reparenting window managers).
    fn lookup_window(&mut self, toplevel: ToplevelId) -> Result<Option<Window>> {
        if let Some(window) = self.windows.get(&toplevel) {
            return Ok(Some(*window));
        }

        let wanted = window_title(toplevel);
        let top = self
            .conn
            .query_tree(self.root)
            .map_err(x11_error)?
            .reply()
            .map_err(x11_error)?
            .children;

        for candidate in top {
            if self.window_name(candidate)?.as_deref() == Some(wanted.as_str()) {
                self.windows.insert(toplevel, candidate);
                return Ok(Some(candidate));
            }

            let nested = self
                .conn
                .query_tree(candidate)
                .map_err(x11_error)?
                .reply()
                .map_err(x11_error)?
                .children;
            for child in nested {
                if self.window_name(child)?.as_deref() == Some(wanted.as_str()) {
                    self.windows.insert(toplevel, child);
                    return Ok(Some(child));
                }
            }
        }

        Ok(None)
    }
}

impl PlacementBackend for X11StrutBackend {
    fn name(&self) -> &'static str {
        BACKEND
    }

    fn apply_placement(&mut self, toplevel: ToplevelId, placement: &Placement) -> Result<()> {
        let Some(window) = self.lookup_window(toplevel)? else {
            debug!("No X window for toplevel {} yet", toplevel);
            return Ok(());
        };

        self.conn
            .change_property32(
                PropMode::REPLACE,
                window,
                self.atoms.net_wm_window_type,
                AtomEnum::ATOM,
                &[self.atoms.net_wm_window_type_dock],
            )
            .map_err(x11_error)?;

        let g = placement.geometry;
        self.conn
            .configure_window(
                window,
                &ConfigureWindowAux::new()
                    .x(g.x)
                    .y(g.y)
                    .width(g.width.max(1) as u32)
                    .height(g.height.max(1) as u32),
            )
            .map_err(x11_error)?;

        match placement.strut {
            Some(strut) => {
                self.conn
                    .change_property32(
                        PropMode::REPLACE,
                        window,
                        self.atoms.net_wm_strut,
                        AtomEnum::CARDINAL,
                        &strut.legacy(),
                    )
                    .map_err(x11_error)?;
                self.conn
                    .change_property32(
                        PropMode::REPLACE,
                        window,
                        self.atoms.net_wm_strut_partial,
                        AtomEnum::CARDINAL,
                        &strut.partial(),
                    )
                    .map_err(x11_error)?;
            }
            None => {
                self.conn
                    .delete_property(window, self.atoms.net_wm_strut)
                    .map_err(x11_error)?;
                self.conn
                    .delete_property(window, self.atoms.net_wm_strut_partial)
                    .map_err(x11_error)?;
            }
        }

        self.conn.flush().map_err(x11_error)?;
        Ok(())
    }

    fn clear_placement(&mut self, toplevel: ToplevelId) -> Result<()> {
        let Some(window) = self.windows.remove(&toplevel) else {
            return Ok(());
        };

        // The window may already be gone; failures here are expected
        if let Err(e) = self.conn.delete_property(window, self.atoms.net_wm_strut_partial) {
            debug!("Could not clear strut of destroyed toplevel {}: {}", toplevel, e);
        }
        if let Err(e) = self.conn.delete_property(window, self.atoms.net_wm_strut) {
            debug!("Could not clear strut of destroyed toplevel {}: {}", toplevel, e);
        }
        self.conn.flush().map_err(x11_error)?;
        Ok(())
    }

    fn warp_pointer(&mut self, x: i32, y: i32) -> Result<()> {
        self.conn
            .warp_pointer(x11rb::NONE, self.root, 0, 0, 0, 0, x as i16, y as i16)
            .map_err(x11_error)?;
        self.conn.flush().map_err(x11_error)?;
        Ok(())
    }

    fn window_manager_name(&mut self) -> Result<Option<CompactString>> {
        let reply = self
            .conn
            .get_property(
                false,
                self.root,
                self.atoms.net_supporting_wm_check,
                AtomEnum::WINDOW,
                0,
                1,
            )
            .map_err(x11_error)?
            .reply()
            .map_err(x11_error)?;

        let Some(check) = reply.value32().and_then(|mut values| values.next()) else {
            warn!("Window manager does not set _NET_SUPPORTING_WM_CHECK");
            return Ok(None);
        };

        let name = self.read_utf8(check, self.atoms.net_wm_name, self.atoms.utf8_string)?;
        Ok(name.map(CompactString::from))
    }
}
