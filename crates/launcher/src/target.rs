//! Resolving what to launch and checking it can host the proxy

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use d3d9_proxy_core::config::LauncherSection;
use d3d9_proxy_sdk::win32::{IMAGE_FILE_MACHINE_AMD64, IMAGE_FILE_MACHINE_I386};

use crate::error::LaunchError;

pub const IMAGE_FILE_MACHINE_ARM64: u16 = 0xAA64;

/// Executable and the command line tail passed to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchTarget {
    pub exe: PathBuf,
    pub args: String,
}

impl LaunchTarget {
    /// Full command line, program name first
    pub fn command_line(&self) -> String {
        let program = quote_arg(&self.exe.to_string_lossy());
        if self.args.is_empty() {
            program
        } else {
            format!("{} {}", program, self.args)
        }
    }
}

/// Strip surrounding whitespace and quotes from a configured value
pub fn clean(value: &str) -> &str {
    value.trim().trim_matches('"').trim()
}

/// Quote one argument for a Windows command line if it needs it
pub fn quote_arg(arg: &str) -> String {
    if !arg.is_empty() && !arg.contains([' ', '\t', '"']) {
        return arg.to_string();
    }
    let mut quoted = String::with_capacity(arg.len() + 2);
    quoted.push('"');
    let mut backslashes = 0;
    for c in arg.chars() {
        match c {
            '\\' => backslashes += 1,
            '"' => {
                // backslashes before a quote are doubled, then the quote escaped
                quoted.extend(std::iter::repeat('\\').take(backslashes + 1));
                backslashes = 0;
            }
            _ => backslashes = 0,
        }
        quoted.push(c);
    }
    quoted.extend(std::iter::repeat('\\').take(backslashes));
    quoted.push('"');
    quoted
}

/// Pick the target from the command line, falling back to the config
pub fn resolve(
    exe: Option<PathBuf>,
    args: &[String],
    config: Option<&LauncherSection>,
) -> Result<LaunchTarget, LaunchError> {
    if let Some(exe) = exe {
        let exe = PathBuf::from(clean(&exe.to_string_lossy()));
        if !exe.as_os_str().is_empty() {
            let args = args.iter().map(|a| quote_arg(a)).collect::<Vec<_>>().join(" ");
            return Ok(LaunchTarget { exe, args });
        }
    }

    let config = config.ok_or(LaunchError::NoTarget)?;
    let exe = config.app_exe.as_deref().map(clean).unwrap_or_default();
    if exe.is_empty() {
        return Err(LaunchError::NoTarget);
    }
    Ok(LaunchTarget {
        exe: PathBuf::from(exe),
        args: config.app_args.as_deref().map(str::trim).unwrap_or_default().to_string(),
    })
}

/// `Machine` field of a PE image
pub fn pe_machine<R: Read + Seek>(mut reader: R) -> Option<u16> {
    let mut dos = [0u8; 0x40];
    reader.read_exact(&mut dos).ok()?;
    if &dos[..2] != b"MZ" {
        return None;
    }
    let nt = u32::from_le_bytes(dos[0x3C..0x40].try_into().ok()?);
    reader.seek(SeekFrom::Start(u64::from(nt))).ok()?;
    let mut header = [0u8; 6];
    reader.read_exact(&mut header).ok()?;
    if &header[..4] != b"PE\0\0" {
        return None;
    }
    Some(u16::from_le_bytes([header[4], header[5]]))
}

/// Machine this launcher was built for
pub const fn host_machine() -> u16 {
    if cfg!(target_arch = "x86") {
        IMAGE_FILE_MACHINE_I386
    } else if cfg!(target_arch = "aarch64") {
        IMAGE_FILE_MACHINE_ARM64
    } else {
        IMAGE_FILE_MACHINE_AMD64
    }
}

pub fn machine_name(machine: u16) -> &'static str {
    match machine {
        IMAGE_FILE_MACHINE_I386 => "x86",
        IMAGE_FILE_MACHINE_AMD64 => "x64",
        IMAGE_FILE_MACHINE_ARM64 => "arm64",
        _ => "unknown",
    }
}

/// Machine of the PE image at `path`
pub fn image_machine(path: &Path) -> Result<u16, LaunchError> {
    if !path.is_file() {
        return Err(LaunchError::MissingFile(path.to_path_buf()));
    }
    let file = File::open(path).map_err(|source| LaunchError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let machine = pe_machine(file).ok_or_else(|| LaunchError::InvalidImage(path.to_path_buf()))?;
    tracing::debug!("{} is {}", path.display(), machine_name(machine));
    Ok(machine)
}

/// Fail unless the proxy module and the program both match the launcher
///
/// Both images are read before comparing, so a mismatch reports all three
/// machines at once.
pub fn check_images(module: &Path, target: &Path) -> Result<(), LaunchError> {
    let module_machine = image_machine(module)?;
    let target_machine = image_machine(target)?;
    let host = host_machine();
    if module_machine != host || target_machine != host {
        return Err(LaunchError::ArchitectureMismatch {
            launcher: machine_name(host),
            module: module.to_path_buf(),
            module_machine: machine_name(module_machine),
            target: target.to_path_buf(),
            target_machine: machine_name(target_machine),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn image(machine: u16) -> Vec<u8> {
        let mut bytes = vec![0u8; 0x80 + 6];
        bytes[..2].copy_from_slice(b"MZ");
        bytes[0x3C..0x40].copy_from_slice(&0x80u32.to_le_bytes());
        bytes[0x80..0x84].copy_from_slice(b"PE\0\0");
        bytes[0x84..0x86].copy_from_slice(&machine.to_le_bytes());
        bytes
    }

    fn section(exe: &str, args: &str) -> LauncherSection {
        LauncherSection {
            app_exe: Some(exe.to_string()),
            app_args: Some(args.to_string()),
        }
    }

    #[test]
    fn test_pe_machine() {
        assert_eq!(pe_machine(Cursor::new(image(IMAGE_FILE_MACHINE_I386))), Some(0x014C));
        assert_eq!(pe_machine(Cursor::new(image(IMAGE_FILE_MACHINE_AMD64))), Some(0x8664));
    }

    #[test]
    fn test_pe_machine_rejects_garbage() {
        assert_eq!(pe_machine(Cursor::new(b"not an image".to_vec())), None);

        let mut bytes = image(IMAGE_FILE_MACHINE_AMD64);
        bytes[0x80] = b'X';
        assert_eq!(pe_machine(Cursor::new(bytes)), None);

        let mut bytes = image(IMAGE_FILE_MACHINE_AMD64);
        bytes[0x3C..0x40].copy_from_slice(&0x1000u32.to_le_bytes());
        assert_eq!(pe_machine(Cursor::new(bytes)), None);
    }

    #[test]
    fn test_machine_names() {
        assert_eq!(machine_name(IMAGE_FILE_MACHINE_I386), "x86");
        assert_eq!(machine_name(IMAGE_FILE_MACHINE_AMD64), "x64");
        assert_eq!(machine_name(0x1234), "unknown");
        assert_ne!(machine_name(host_machine()), "unknown");
    }

    #[test]
    fn test_clean_strips_quotes() {
        assert_eq!(clean("  \"C:\\Games\\game.exe\" "), "C:\\Games\\game.exe");
        assert_eq!(clean("game.exe"), "game.exe");
        assert_eq!(clean("  "), "");
    }

    #[test]
    fn test_quote_arg() {
        assert_eq!(quote_arg("plain"), "plain");
        assert_eq!(quote_arg(""), "\"\"");
        assert_eq!(quote_arg("two words"), "\"two words\"");
        assert_eq!(quote_arg("say \"hi\""), "\"say \\\"hi\\\"\"");
        assert_eq!(quote_arg("dir with space\\"), "\"dir with space\\\\\"");
    }

    #[test]
    fn test_resolve_prefers_command_line() {
        let config = section("other.exe", "-config");
        let target = resolve(
            Some(PathBuf::from("game.exe")),
            &["-windowed".to_string(), "two words".to_string()],
            Some(&config),
        )
        .unwrap();
        assert_eq!(target.exe, PathBuf::from("game.exe"));
        assert_eq!(target.args, "-windowed \"two words\"");
        assert_eq!(target.command_line(), "game.exe -windowed \"two words\"");
    }

    #[test]
    fn test_resolve_falls_back_to_config() {
        let config = section(" \"C:\\Program Files\\Game\\game.exe\" ", " -nosound ");
        let target = resolve(None, &[], Some(&config)).unwrap();
        assert_eq!(target.exe, PathBuf::from("C:\\Program Files\\Game\\game.exe"));
        assert_eq!(target.args, "-nosound");
        assert_eq!(
            target.command_line(),
            "\"C:\\Program Files\\Game\\game.exe\" -nosound"
        );
    }

    #[test]
    fn test_resolve_without_target() {
        assert!(matches!(resolve(None, &[], None), Err(LaunchError::NoTarget)));
        let config = section("", "");
        assert!(matches!(
            resolve(None, &[], Some(&config)),
            Err(LaunchError::NoTarget)
        ));
    }

    fn other_machine() -> u16 {
        if host_machine() == IMAGE_FILE_MACHINE_I386 {
            IMAGE_FILE_MACHINE_AMD64
        } else {
            IMAGE_FILE_MACHINE_I386
        }
    }

    #[test]
    fn test_image_machine_missing_file() {
        let path = PathBuf::from("/definitely/not/here.exe");
        assert!(matches!(image_machine(&path), Err(LaunchError::MissingFile(_))));
    }

    #[test]
    fn test_check_images_architecture() {
        let dir = std::env::temp_dir().join(format!("d3d9-proxy-launcher-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let good_dll = dir.join("good.dll");
        std::fs::write(&good_dll, image(host_machine())).unwrap();
        let good_exe = dir.join("good.exe");
        std::fs::write(&good_exe, image(host_machine())).unwrap();
        assert!(check_images(&good_dll, &good_exe).is_ok());
        assert_eq!(image_machine(&good_exe).unwrap(), host_machine());

        let bad_exe = dir.join("bad.exe");
        std::fs::write(&bad_exe, image(other_machine())).unwrap();
        match check_images(&good_dll, &bad_exe) {
            Err(LaunchError::ArchitectureMismatch {
                launcher,
                module_machine,
                target,
                target_machine,
                ..
            }) => {
                assert_eq!(launcher, machine_name(host_machine()));
                assert_eq!(module_machine, machine_name(host_machine()));
                assert_eq!(target, bad_exe);
                assert_eq!(target_machine, machine_name(other_machine()));
            }
            other => panic!("expected a mismatch, got {:?}", other),
        }

        // A foreign module is still reported alongside the program's machine
        let bad_dll = dir.join("bad.dll");
        std::fs::write(&bad_dll, image(other_machine())).unwrap();
        let err = check_images(&bad_dll, &good_exe).unwrap_err();
        let text = err.to_string();
        assert!(text.contains(&format!("bad.dll is {}", machine_name(other_machine()))));
        assert!(text.contains(&format!("good.exe is {}", machine_name(host_machine()))));
        assert!(text.contains(&format!("launcher is {}", machine_name(host_machine()))));

        let text_exe = dir.join("text.exe");
        std::fs::write(&text_exe, b"hello").unwrap();
        assert!(matches!(
            check_images(&good_dll, &text_exe),
            Err(LaunchError::InvalidImage(_))
        ));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
