//! C FFI bindings for mml-core
//!
//! This crate provides a C-compatible API so a host UI can hand over the two
//! file texts and get the processed destination text back.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

thread_local! {
    static LAST_ERROR: RefCell<Option<String>> = const { RefCell::new(None) };
}

fn set_last_error(message: impl Into<String>) {
    LAST_ERROR.with(|e| *e.borrow_mut() = Some(message.into()));
}

fn clear_last_error() {
    LAST_ERROR.with(|e| *e.borrow_mut() = None);
}

unsafe fn str_arg<'a>(ptr: *const c_char, name: &str) -> Option<&'a str> {
    if ptr.is_null() {
        set_last_error(format!("{} is null", name));
        return None;
    }
    match CStr::from_ptr(ptr).to_str() {
        Ok(s) => Some(s),
        Err(_) => {
            set_last_error(format!("{} is not valid UTF-8", name));
            None
        }
    }
}

/// Sync draw orders from source text into destination text
///
/// On success returns the processed destination text and stores the number
/// of lines affected in `lines_affected` (when non-null).
///
/// # Safety
/// - `source` and `destination` must be valid NUL-terminated C strings
/// - `lines_affected` must be null or point to writable memory
/// - Returns null on error; see `mml_last_error`
/// - Caller must free the returned string with `mml_free_string`
#[no_mangle]
pub unsafe extern "C" fn mml_sync_text(
    source: *const c_char,
    destination: *const c_char,
    lines_affected: *mut usize,
) -> *mut c_char {
    clear_last_error();

    let Some(source) = str_arg(source, "source") else {
        return ptr::null_mut();
    };
    let Some(destination) = str_arg(destination, "destination") else {
        return ptr::null_mut();
    };

    let outcome = match mml_core::sync_text(source, destination) {
        Ok(outcome) => outcome,
        Err(e) => {
            set_last_error(e.to_string());
            return ptr::null_mut();
        }
    };

    match CString::new(outcome.text) {
        Ok(text) => {
            if !lines_affected.is_null() {
                *lines_affected = outcome.lines_affected;
            }
            text.into_raw()
        }
        Err(_) => {
            set_last_error("processed text contains a NUL byte");
            ptr::null_mut()
        }
    }
}

/// Get the message of the last error raised on this thread
///
/// # Safety
/// - Returns null if there was no error
/// - Caller must free the returned string with `mml_free_string`
#[no_mangle]
pub unsafe extern "C" fn mml_last_error() -> *mut c_char {
    LAST_ERROR
        .with(|e| e.borrow().clone())
        .and_then(|msg| CString::new(msg).ok())
        .map(|s| s.into_raw())
        .unwrap_or(ptr::null_mut())
}

/// Free a string returned by other FFI functions
///
/// # Safety
/// - `s` must be a valid pointer returned by a mml_* function or null
#[no_mangle]
pub unsafe extern "C" fn mml_free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "<Compact_Sonar_Files>\n<CSFFILE1>1,2,3&quot;A.CSF&quot;,&quot;FOO.jsf&quot;,&quot;Label&quot;,7,42</CSFFILE1>\n</Compact_Sonar_Files>";
    const DEST: &str = "<Compact_Sonar_Files>\n<CSFFILE1>1,2,3&quot;A.CSF&quot;,&quot;FOO.jsf&quot;,&quot;Label&quot;,7,7</CSFFILE1>\n</Compact_Sonar_Files>";

    unsafe fn take_string(ptr: *mut c_char) -> String {
        let s = CStr::from_ptr(ptr).to_str().unwrap().to_string();
        mml_free_string(ptr);
        s
    }

    #[test]
    fn test_sync_text() {
        let source = CString::new(SOURCE).unwrap();
        let dest = CString::new(DEST).unwrap();
        let mut affected = 0usize;

        unsafe {
            let out = mml_sync_text(source.as_ptr(), dest.as_ptr(), &mut affected);
            assert!(!out.is_null());
            assert_eq!(take_string(out), SOURCE);
            assert!(mml_last_error().is_null());
        }
        assert_eq!(affected, 1);
    }

    #[test]
    fn test_sync_text_error() {
        let source = CString::new("not an mml file").unwrap();
        let dest = CString::new(DEST).unwrap();

        unsafe {
            let out = mml_sync_text(source.as_ptr(), dest.as_ptr(), ptr::null_mut());
            assert!(out.is_null());
            let err = mml_last_error();
            assert!(!err.is_null());
            assert_eq!(take_string(err), "unrecognised MML file structure");
        }
    }

    #[test]
    fn test_null_argument() {
        let dest = CString::new(DEST).unwrap();
        unsafe {
            assert!(mml_sync_text(ptr::null(), dest.as_ptr(), ptr::null_mut()).is_null());
            assert_eq!(take_string(mml_last_error()), "source is null");
        }
    }
}
