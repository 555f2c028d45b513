//! ROM scanning functionality

use crate::{LibraryError, NewGame, Platform, detect_platform};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Result of a ROM scan
#[derive(Debug, Default)]
pub struct ScanResult {
    /// Games with an identified platform
    pub games: Vec<NewGame>,
    /// ROM-like files whose platform could not be identified
    pub unrecognized: Vec<PathBuf>,
}

/// ROM scanner configuration
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// File extensions to scan
    pub extensions: HashSet<String>,

    /// Directories to skip
    pub skip_dirs: HashSet<String>,

    /// Scan subdirectories
    pub recursive: bool,

    /// Skip hidden files/directories
    pub skip_hidden: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        let extensions = [
            "nes", "fds", "unf", "smc", "sfc", "fig", "swc", "n64", "z64", "v64", "gb", "gbc",
            "gba", "nds", "dsi", "3ds", "cia", "cci", "cxi", "gcm", "wbfs", "wad", "rvz", "gcz",
            "ciso", "nsp", "xci", "nro", "md", "gen", "smd", "sms", "gg", "gdi", "cdi", "pbp",
            "cso", "xbe", "pce", "iso", "bin", "cue", "chd", "img", "m3u", "zip", "7z",
        ]
        .into_iter()
        .map(String::from)
        .collect();

        let skip_dirs = ["bios", "saves", "states", "screenshots", "firmware"]
            .into_iter()
            .map(String::from)
            .collect();

        Self {
            extensions,
            skip_dirs,
            recursive: true,
            skip_hidden: true,
        }
    }
}

/// ROM scanner
pub struct RomScanner {
    config: ScanConfig,
}

impl Default for RomScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl RomScanner {
    /// Create a new scanner with default config
    pub fn new() -> Self {
        Self {
            config: ScanConfig::default(),
        }
    }

    /// Create with custom config
    pub fn with_config(config: ScanConfig) -> Self {
        Self { config }
    }

    /// Scan a directory for ROMs, identifying each file's platform
    pub fn scan(&self, path: &Path) -> Result<ScanResult, LibraryError> {
        if !path.is_dir() {
            return Err(LibraryError::PathNotFound(path.to_path_buf()));
        }

        let mut result = ScanResult::default();
        self.scan_dir(path, &mut result)?;
        Ok(result)
    }

    fn scan_dir(&self, path: &Path, result: &mut ScanResult) -> Result<(), LibraryError> {
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            let entry_path = entry.path();
            let name = entry.file_name().to_string_lossy().to_string();

            if self.config.skip_hidden && name.starts_with('.') {
                continue;
            }

            if entry_path.is_dir() {
                if self.config.skip_dirs.contains(&name.to_lowercase()) {
                    continue;
                }

                if self.config.recursive {
                    self.scan_dir(&entry_path, result)?;
                }
            } else if entry_path.is_file() {
                let Some(ext) = entry_path.extension().and_then(|e| e.to_str()) else {
                    continue;
                };
                let ext = ext.to_lowercase();
                if !self.config.extensions.contains(&ext) {
                    continue;
                }

                // Tracks referenced by a sibling cue sheet are imported through the sheet
                if ext == "bin" && entry_path.with_extension("cue").is_file() {
                    continue;
                }

                match detect_platform(&entry_path) {
                    Platform::Unknown => result.unrecognized.push(entry_path),
                    platform => {
                        tracing::debug!("Found {} ROM: {}", platform, entry_path.display());
                        result.games.push(NewGame {
                            name: Self::clean_game_name(&entry_path),
                            path: entry_path,
                            platform,
                        });
                    }
                }
            }
        }

        Ok(())
    }

    /// Display name from a ROM file name, without region and dump tags
    fn clean_game_name(path: &Path) -> String {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        let mut clean = String::with_capacity(stem.len());
        let mut depth = 0usize;
        for c in stem.chars() {
            match c {
                '(' | '[' => depth += 1,
                ')' | ']' => depth = depth.saturating_sub(1),
                _ if depth == 0 => clean.push(c),
                _ => {}
            }
        }

        let clean = clean.split_whitespace().collect::<Vec<_>>().join(" ");
        if clean.is_empty() { stem } else { clean }
    }
}
