//! Transport-area navigation section: three mode buttons (Nav, Zoom,
//! SelAdj) selecting how the four cursor keys are interpreted, each
//! mode prefixing the cursor key's OSC address differently.
//!
//! Grounded on `ReaNav` (original_source/ReaCommon.py).

use crate::modemgr::ModeManager;

struct NavModeInfo {
    osc_prefix: &'static str,
}

pub struct Nav {
    modemgr: ModeManager<NavModeInfo>,
}

const MODE_NAV: &str = "Nav";
const MODE_ZOOM: &str = "Zoom";
const MODE_SELADJ: &str = "SelAdj";

impl Default for Nav {
    fn default() -> Self {
        let modes = vec![
            (
                MODE_NAV,
                NavModeInfo {
                    osc_prefix: "/nav/",
                },
            ),
            (
                MODE_ZOOM,
                NavModeInfo {
                    osc_prefix: "/zoom/",
                },
            ),
            (
                MODE_SELADJ,
                NavModeInfo {
                    osc_prefix: "/seladj/",
                },
            ),
        ];
        Nav {
            modemgr: ModeManager::new(modes, MODE_NAV),
        }
    }
}

impl Nav {
    pub fn mode(&self) -> &'static str {
        self.modemgr.mode()
    }

    /// Desk to computer: a press under the nav section. Mode buttons
    /// switch `ModeManager`'s current mode and return `None` (the
    /// caller is expected to follow up with `led_updates` to resync all
    /// three mode LEDs, mirroring `ReaNav.update`). Cursor keys return
    /// the OSC address to forward, prefixed by the active mode.
    pub fn d_c(&mut self, button: &str, value_is_press: bool) -> Option<String> {
        if !value_is_press {
            return None;
        }
        match button {
            MODE_NAV | MODE_ZOOM | MODE_SELADJ => {
                self.modemgr.set_mode(button);
                None
            }
            _ => Some(format!("{}{}", self.modemgr.data().osc_prefix, button)),
        }
    }

    /// The three mode-button addresses and whether each is currently
    /// lit, for resyncing LED state after a mode switch.
    pub fn led_updates(&self) -> [(&'static str, bool); 3] {
        let active = self.modemgr.mode();
        [
            (MODE_NAV, active == MODE_NAV),
            (MODE_ZOOM, active == MODE_ZOOM),
            (MODE_SELADJ, active == MODE_SELADJ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_nav_mode() {
        let nav = Nav::default();
        assert_eq!(nav.mode(), MODE_NAV);
    }

    #[test]
    fn mode_button_switches_without_forwarding() {
        let mut nav = Nav::default();
        assert!(nav.d_c(MODE_ZOOM, true).is_none());
        assert_eq!(nav.mode(), MODE_ZOOM);
    }

    #[test]
    fn cursor_key_is_prefixed_by_active_mode() {
        let mut nav = Nav::default();
        let addr = nav.d_c("CursorLeft", true).unwrap();
        assert_eq!(addr, "/nav/CursorLeft");
        nav.d_c(MODE_ZOOM, true);
        let addr = nav.d_c("CursorLeft", true).unwrap();
        assert_eq!(addr, "/zoom/CursorLeft");
    }

    #[test]
    fn release_is_ignored() {
        let mut nav = Nav::default();
        assert!(nav.d_c("CursorLeft", false).is_none());
    }

    #[test]
    fn led_updates_reflect_active_mode_only() {
        let mut nav = Nav::default();
        nav.d_c(MODE_SELADJ, true);
        let updates = nav.led_updates();
        assert_eq!(updates, [(MODE_NAV, false), (MODE_ZOOM, false), (MODE_SELADJ, true)]);
    }
}
