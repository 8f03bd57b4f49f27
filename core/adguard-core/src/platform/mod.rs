//! OS bindings behind the discovery traits.
//!
//! The real implementations are Windows-only. Other targets get inert
//! fallbacks so the engine builds and its tests run anywhere.

#[cfg(windows)]
pub(crate) mod win32;

use crate::error::Result;
use crate::path_resolver::RegistryReader;
use crate::process::WindowHandle;

/// Reads `HKEY_CLASSES_ROOT` on Windows; reports every key missing elsewhere.
#[derive(Debug, Clone, Default)]
pub struct SystemRegistry;

impl RegistryReader for SystemRegistry {
    fn read_default_value(&self, subkey: &str) -> Result<Option<String>> {
        #[cfg(windows)]
        {
            win32::read_classes_root_default(subkey)
        }
        #[cfg(not(windows))]
        {
            tracing::debug!(key = %subkey, "No registry on this platform");
            Ok(None)
        }
    }
}

/// First visible, unowned top-level window belonging to `pid`.
pub fn main_window(pid: u32) -> Option<WindowHandle> {
    #[cfg(windows)]
    {
        win32::find_main_window(pid)
    }
    #[cfg(not(windows))]
    {
        let _ = pid;
        None
    }
}

/// Detaches from the console window, if any. Returns whether it did.
pub fn detach_console() -> bool {
    #[cfg(windows)]
    {
        win32::free_console()
    }
    #[cfg(not(windows))]
    {
        false
    }
}
