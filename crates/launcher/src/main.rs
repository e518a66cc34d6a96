//! d3d9 proxy launcher
//!
//! Starts a program suspended, loads `d3d9.dll` from beside the launcher
//! into it and resumes it, so the proxy is in place before the program
//! runs any code of its own.
//!
//! ```text
//! d3d9-proxy-launcher [EXE] [ARGS]...
//! ```
//!
//! Without `EXE`, `[launcher] app_exe` and `app_args` are read from
//! `d3d9-proxy.toml` next to the launcher.

mod error;
#[cfg(windows)]
mod inject;
mod target;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use d3d9_proxy_core::config::{config_path_beside, ProxyConfig};
use tracing_subscriber::EnvFilter;

use crate::error::LaunchError;
use crate::target::{check_images, resolve, LaunchTarget};

/// Module loaded into the target
const PROXY_MODULE: &str = "d3d9.dll";

#[derive(Parser, Debug)]
#[command(name = "d3d9-proxy-launcher", version, about)]
struct Cli {
    /// Program to start; defaults to `[launcher] app_exe`
    exe: Option<PathBuf>,

    /// Arguments passed through to the program
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("D3D9_PROXY_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(pid) => {
            tracing::info!("Started process {}", pid);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli) -> Result<u32, LaunchError> {
    let launcher = std::env::current_exe().map_err(|source| LaunchError::Io {
        path: PathBuf::from("<current exe>"),
        source,
    })?;
    let dir = launcher.parent().unwrap_or(Path::new("."));

    let config = if cli.exe.is_none() {
        load_config(&launcher)
    } else {
        None
    };
    let target = resolve(cli.exe, &cli.args, config.as_ref().map(|c| &c.launcher))?;
    let target = LaunchTarget {
        exe: absolute(&target.exe, dir),
        ..target
    };

    let module = dir.join(PROXY_MODULE);
    check_images(&module, &target.exe)?;

    start(&target, &module)
}

/// Config beside the launcher; never created here
fn load_config(launcher: &Path) -> Option<ProxyConfig> {
    let path = config_path_beside(launcher)?;
    if !path.is_file() {
        tracing::debug!("No config at {}", path.display());
        return None;
    }
    match std::fs::read_to_string(&path)
        .map_err(d3d9_proxy_core::ConfigError::from)
        .and_then(|content| ProxyConfig::from_toml_str(&content))
    {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!("Ignoring {}: {}", path.display(), e);
            None
        }
    }
}

/// Relative targets resolve against the working directory, then the launcher's
fn absolute(exe: &Path, launcher_dir: &Path) -> PathBuf {
    if exe.is_absolute() || exe.is_file() {
        return exe.to_path_buf();
    }
    launcher_dir.join(exe)
}

#[cfg(windows)]
fn start(target: &LaunchTarget, module: &Path) -> Result<u32, LaunchError> {
    inject::launch(target, module)
}

#[cfg(not(windows))]
fn start(_target: &LaunchTarget, _module: &Path) -> Result<u32, LaunchError> {
    Err(LaunchError::Unsupported)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_passes_hyphen_args_through() {
        let cli = Cli::parse_from(["launcher", "game.exe", "-windowed", "+map", "de_dust"]);
        assert_eq!(cli.exe, Some(PathBuf::from("game.exe")));
        assert_eq!(cli.args, vec!["-windowed", "+map", "de_dust"]);
    }

    #[test]
    fn test_cli_without_target() {
        let cli = Cli::parse_from(["launcher"]);
        assert!(cli.exe.is_none());
        assert!(cli.args.is_empty());
    }

    #[test]
    fn test_absolute_joins_launcher_dir() {
        let dir = Path::new("/games/app");
        assert_eq!(
            absolute(Path::new("no-such-game.exe"), dir),
            PathBuf::from("/games/app/no-such-game.exe")
        );
        assert_eq!(
            absolute(Path::new("/opt/game.exe"), dir),
            PathBuf::from("/opt/game.exe")
        );
    }

    #[test]
    fn test_load_config_missing_is_none() {
        assert!(load_config(Path::new("/definitely/not/here/launcher.exe")).is_none());
    }
}
