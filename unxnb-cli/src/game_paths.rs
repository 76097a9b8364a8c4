//! Locates the game install and its content folder.

use std::path::{Path, PathBuf};
use unxnb_core::Platform;

/// Conventional install locations scanned when no game path is given.
fn default_install_paths(platform: Platform) -> Vec<PathBuf> {
    let mut paths = Vec::new();

    match platform {
        Platform::Windows => {
            for program_files in [
                "C:/Program Files",
                "C:/Program Files (x86)",
                "D:/Program Files",
                "D:/Program Files (x86)",
            ] {
                paths.push(PathBuf::from(format!(
                    "{program_files}/Steam/steamapps/common/Stardew Valley"
                )));
                paths.push(PathBuf::from(format!(
                    "{program_files}/GalaxyClient/Games/Stardew Valley"
                )));
                paths.push(PathBuf::from(format!(
                    "{program_files}/GOG Galaxy/Games/Stardew Valley"
                )));
            }
        }
        Platform::Linux => {
            if let Some(home) = std::env::var_os("HOME") {
                let home = PathBuf::from(home);
                paths.push(home.join(".steam/steam/steamapps/common/Stardew Valley"));
                paths.push(home.join(".local/share/Steam/steamapps/common/Stardew Valley"));
                paths.push(home.join("GOG Games/Stardew Valley/game"));
            }
        }
        Platform::Mac => {
            if let Some(home) = std::env::var_os("HOME") {
                let home = PathBuf::from(home);
                paths.push(home.join(
                    "Library/Application Support/Steam/steamapps/common/Stardew Valley/Contents/MacOS",
                ));
            }
            paths.push(PathBuf::from(
                "/Applications/Stardew Valley.app/Contents/MacOS",
            ));
        }
    }

    paths
}

/// Resolve the game folder: an explicit path wins, otherwise the first
/// conventional install location that exists.
pub fn find_game_folder(explicit: Option<&Path>, platform: Platform) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.is_dir().then(|| path.to_path_buf());
    }

    default_install_paths(platform)
        .into_iter()
        .find(|path| path.is_dir())
}

/// Resolve the content folder within (or beside) a game folder.
///
/// On macOS the game executable lives inside the app bundle, so the content
/// folder sits one or two levels up under `Resources`.
pub fn find_content_folder(game_folder: &Path, platform: Platform) -> Option<PathBuf> {
    let mut candidates = vec![game_folder.join("Content")];
    if platform == Platform::Mac {
        candidates.push(game_folder.join("../Resources/Content"));
        candidates.push(game_folder.join("../../Resources/Content"));
    }

    candidates.into_iter().find(|path| path.is_dir())
}
