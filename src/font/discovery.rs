//! Locating a monospace font file on disk when none is configured.

use std::path::PathBuf;

#[cfg(target_os = "windows")]
const CANDIDATES: &[&str] = &[
    r"C:\Windows\Fonts\JetBrainsMono-Regular.ttf",
    r"C:\Windows\Fonts\CascadiaMono.ttf",
    r"C:\Windows\Fonts\consola.ttf",
    r"C:\Windows\Fonts\cour.ttf",
];

#[cfg(not(target_os = "windows"))]
const CANDIDATES: &[&str] = &[
    "JetBrainsMono-Regular.ttf",
    "JetBrainsMonoNerdFont-Regular.ttf",
    "UbuntuMono-Regular.ttf",
    "DejaVuSansMono.ttf",
    "LiberationMono-Regular.ttf",
    "NotoSansMono-Regular.ttf",
];

/// First installed candidate in priority order.
#[cfg(target_os = "windows")]
pub fn find_monospace_font() -> Option<PathBuf> {
    CANDIDATES
        .iter()
        .map(PathBuf::from)
        .find(|p| p.is_file())
}

/// First installed candidate in priority order, searching the user and
/// system font directories recursively.
#[cfg(not(target_os = "windows"))]
pub fn find_monospace_font() -> Option<PathBuf> {
    let mut index = hashbrown::HashMap::new();
    for dir in font_dirs() {
        index_font_dir(&dir, &mut index);
    }
    pick_candidate(&index)
}

#[cfg(not(target_os = "windows"))]
fn font_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Some(home) = std::env::var_os("HOME") {
        dirs.push(PathBuf::from(home).join(".local/share/fonts"));
    }
    dirs.push(PathBuf::from("/usr/share/fonts"));
    dirs.push(PathBuf::from("/usr/local/share/fonts"));
    dirs
}

/// Filename to full path, first hit wins.
#[cfg(not(target_os = "windows"))]
fn index_font_dir(dir: &std::path::Path, index: &mut hashbrown::HashMap<String, PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            index_font_dir(&path, index);
        } else if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            index.entry(name.to_owned()).or_insert(path);
        } else {
            // Non-UTF-8 filename.
        }
    }
}

#[cfg(not(target_os = "windows"))]
fn pick_candidate(index: &hashbrown::HashMap<String, PathBuf>) -> Option<PathBuf> {
    CANDIDATES.iter().find_map(|name| index.get(*name).cloned())
}
