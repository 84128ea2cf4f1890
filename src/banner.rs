// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

/// Prints the application banner and, on Windows, the file versions of the
/// system libraries the back ends drive.
pub fn print() {
    println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    #[cfg(windows)]
    print_library_versions();
    println!();
}

#[cfg(windows)]
fn print_library_versions() {
    for (label, dll) in [
        ("DirectSound API", "dsound.dll"),
        ("WinMM", "winmm.dll"),
        ("Windows", "ntdll.dll"),
    ] {
        match library_version(dll) {
            Ok(version) => println!("{}: {} version: {}", label, dll, version),
            // A missing version resource is not worth failing over.
            Err(err) => tracing::warn!(dll, err = %err, "Unable to read library version."),
        }
    }
}

/// Reads the file version of a library in the system directory through the
/// version-info resource API.
#[cfg(windows)]
fn library_version(dll: &str) -> Result<String, crate::error::Error> {
    use std::ffi::c_void;

    use windows::core::{w, PCWSTR};
    use windows::Win32::Storage::FileSystem::{
        GetFileVersionInfoSizeW, GetFileVersionInfoW, VerQueryValueW, VS_FIXEDFILEINFO,
    };
    use windows::Win32::System::SystemInformation::GetSystemDirectoryW;

    use crate::error::{Error, ResultCode};

    fn last_err(function: &'static str) -> Error {
        let err = windows::core::Error::from_win32();
        Error::Provider {
            function,
            code: ResultCode::with_message(err.code().0, err.message().to_string()),
        }
    }

    let mut system = [0u16; 260];
    let len = unsafe { GetSystemDirectoryW(Some(&mut system)) };
    if len == 0 {
        return Err(last_err("GetSystemDirectoryW"));
    }

    let path_w: Vec<u16> = system[..len as usize]
        .iter()
        .copied()
        .chain("\\".encode_utf16())
        .chain(dll.encode_utf16())
        .chain(std::iter::once(0))
        .collect();
    let path = PCWSTR(path_w.as_ptr());

    let size = unsafe { GetFileVersionInfoSizeW(path, None) };
    if size == 0 {
        return Err(last_err("GetFileVersionInfoSizeW"));
    }

    let mut info = vec![0u8; size as usize];
    unsafe { GetFileVersionInfoW(path, 0, size, info.as_mut_ptr() as *mut c_void) }.map_err(
        |err| Error::Provider {
            function: "GetFileVersionInfoW",
            code: ResultCode::with_message(err.code().0, err.message().to_string()),
        },
    )?;

    let mut fixed: *mut VS_FIXEDFILEINFO = std::ptr::null_mut();
    let mut fixed_len = 0u32;
    let found = unsafe {
        VerQueryValueW(
            info.as_ptr() as *const c_void,
            w!("\\"),
            &mut fixed as *mut *mut VS_FIXEDFILEINFO as *mut *mut c_void,
            &mut fixed_len,
        )
    };
    if !found.as_bool() || fixed.is_null() {
        return Err(last_err("VerQueryValueW"));
    }

    let fixed = unsafe { *fixed };
    Ok(format!(
        "{}.{}.{}.{}",
        fixed.dwFileVersionMS >> 16,
        fixed.dwFileVersionMS & 0xFFFF,
        fixed.dwFileVersionLS >> 16,
        fixed.dwFileVersionLS & 0xFFFF
    ))
}
