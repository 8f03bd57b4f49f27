use std::path::PathBuf;
use std::ptr;

use tracing::debug;
use windows::Win32::Foundation::{
    CloseHandle, ERROR_FILE_NOT_FOUND, ERROR_SUCCESS, HWND, LPARAM, WIN32_ERROR,
};
use windows::Win32::System::Console::FreeConsole;
use windows::Win32::System::Registry::{
    HKEY, HKEY_CLASSES_ROOT, KEY_READ, REG_EXPAND_SZ, REG_SZ, REG_VALUE_TYPE, RegCloseKey,
    RegOpenKeyExW, RegQueryValueExW,
};
use windows::Win32::System::Threading::{
    OpenProcess, PROCESS_NAME_FORMAT, PROCESS_QUERY_LIMITED_INFORMATION,
    QueryFullProcessImageNameW,
};
use windows::Win32::UI::WindowsAndMessaging::{
    EnumWindows, GW_OWNER, GetWindow, GetWindowThreadProcessId, IsWindowVisible,
};
use windows::core::{BOOL, PCWSTR, PWSTR};

use crate::error::{AdguardError, Result};
use crate::process::WindowHandle;

fn to_wide(value: &str) -> Vec<u16> {
    value.encode_utf16().chain(std::iter::once(0)).collect()
}

fn widestr_to_string(buf: &[u16]) -> String {
    let end = buf.iter().position(|&c| c == 0).unwrap_or(buf.len());
    String::from_utf16_lossy(&buf[..end])
}

/// Open registry key, closed on drop.
struct RegKey(HKEY);

impl RegKey {
    fn open_classes_root(subkey: &str) -> std::result::Result<Self, WIN32_ERROR> {
        let wide = to_wide(subkey);
        let mut h = HKEY(ptr::null_mut());
        let status = unsafe {
            RegOpenKeyExW(HKEY_CLASSES_ROOT, PCWSTR(wide.as_ptr()), None, KEY_READ, &mut h)
        };
        if status == ERROR_SUCCESS {
            Ok(RegKey(h))
        } else {
            Err(status)
        }
    }

    fn default_string(&self) -> std::result::Result<String, WIN32_ERROR> {
        let mut kind = REG_VALUE_TYPE(0);
        let mut size = 0u32;
        let status = unsafe {
            RegQueryValueExW(
                self.0,
                PCWSTR::null(),
                None,
                Some(&mut kind),
                None,
                Some(&mut size),
            )
        };
        if status != ERROR_SUCCESS {
            return Err(status);
        }
        if kind != REG_SZ && kind != REG_EXPAND_SZ {
            return Ok(String::new());
        }

        let mut buf = vec![0u16; (size as usize).div_ceil(2) + 1];
        let mut size = (buf.len() * 2) as u32;
        let status = unsafe {
            RegQueryValueExW(
                self.0,
                PCWSTR::null(),
                None,
                None,
                Some(buf.as_mut_ptr() as *mut u8),
                Some(&mut size),
            )
        };
        if status != ERROR_SUCCESS {
            return Err(status);
        }
        Ok(widestr_to_string(&buf))
    }
}

impl Drop for RegKey {
    fn drop(&mut self) {
        if !self.0.is_invalid() {
            debug!("Closing registry key handle");
            unsafe {
                let _ = RegCloseKey(self.0);
            }
        }
    }
}

pub(crate) fn read_classes_root_default(subkey: &str) -> Result<Option<String>> {
    let key = match RegKey::open_classes_root(subkey) {
        Ok(key) => key,
        Err(status) if status == ERROR_FILE_NOT_FOUND => return Ok(None),
        Err(status) => {
            return Err(AdguardError::RegistryReadFailed {
                key: subkey.to_string(),
                details: format!("open status={:?}", status),
            })
        }
    };

    key.default_string()
        .map(Some)
        .map_err(|status| AdguardError::RegistryReadFailed {
            key: subkey.to_string(),
            details: format!("query status={:?}", status),
        })
}

pub(crate) fn query_process_path(pid: u32) -> Result<PathBuf> {
    unsafe {
        let h = OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, false, pid).map_err(|err| {
            AdguardError::ModulePathUnreadable {
                pid,
                details: err.to_string(),
            }
        })?;
        let mut buf = vec![0u16; 4096];
        let mut len: u32 = buf.len() as u32;
        let queried = QueryFullProcessImageNameW(
            h,
            PROCESS_NAME_FORMAT(0),
            PWSTR(buf.as_mut_ptr()),
            &mut len as *mut u32,
        );
        let _ = CloseHandle(h);
        queried.map_err(|err| AdguardError::ModulePathUnreadable {
            pid,
            details: err.to_string(),
        })?;
        buf.truncate(len as usize);
        Ok(PathBuf::from(String::from_utf16_lossy(&buf)))
    }
}

pub(crate) fn find_main_window(pid: u32) -> Option<WindowHandle> {
    struct WindowSearch {
        pid: u32,
        found: Option<HWND>,
    }

    unsafe extern "system" fn enum_windows_cb(hwnd: HWND, lparam: LPARAM) -> BOOL {
        if lparam.0 == 0 {
            return BOOL(1);
        }
        let search = unsafe { &mut *(lparam.0 as *mut WindowSearch) };

        let mut window_pid = 0u32;
        unsafe {
            GetWindowThreadProcessId(hwnd, Some(&mut window_pid));
        }
        if window_pid != search.pid {
            return BOOL(1);
        }

        if unsafe { !IsWindowVisible(hwnd).as_bool() } {
            return BOOL(1);
        }

        let owned = unsafe { GetWindow(hwnd, GW_OWNER) }.is_ok_and(|owner| !owner.is_invalid());
        if owned {
            return BOOL(1);
        }

        search.found = Some(hwnd);
        BOOL(0)
    }

    let mut search = WindowSearch { pid, found: None };
    unsafe {
        let _ = EnumWindows(
            Some(enum_windows_cb),
            LPARAM(&mut search as *mut _ as isize),
        );
    }
    search
        .found
        .and_then(|hwnd| WindowHandle::new(hwnd.0 as isize))
}

pub(crate) fn free_console() -> bool {
    unsafe { FreeConsole() }.is_ok()
}
