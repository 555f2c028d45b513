//! Controller profile auto-configuration for Dolphin

use crate::HostOs;
use romdock_config::ControllerProfile;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const PAD_CONFIG_FILE: &str = "GCPadNew.ini";
const PAD_SECTION: &str = "GCPad1";

/// Dolphin's GameCube pad configuration file for an installation.
///
/// Portable installs (a `portable.txt` beside the executable) keep their
/// config under `User/Config`; otherwise Dolphin uses the per-user config root.
pub fn dolphin_pad_config_path(
    executable: &Path,
    os: HostOs,
    config_root: Option<&Path>,
) -> Option<PathBuf> {
    if let Some(exe_dir) = executable.parent()
        && exe_dir.join("portable.txt").is_file()
    {
        return Some(exe_dir.join("User").join("Config").join(PAD_CONFIG_FILE));
    }

    let root = config_root?;
    let config_dir = match os {
        HostOs::Windows => root.join("Dolphin Emulator").join("Config"),
        HostOs::MacOs => root.join("Dolphin").join("Config"),
        HostOs::Linux => root.join("dolphin-emu"),
    };
    Some(config_dir.join(PAD_CONFIG_FILE))
}

/// Write `profile` as the first GameCube pad, keeping every other section of the file
pub fn apply_dolphin_profile(profile: &ControllerProfile, config_file: &Path) -> io::Result<()> {
    let existing = match fs::read_to_string(config_file) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e),
    };

    let mut body = vec![format!("Device = {}", profile.device)];
    body.extend(
        profile
            .buttons
            .iter()
            .map(|(control, input)| format!("{} = {}", control, input)),
    );

    if let Some(parent) = config_file.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(config_file, replace_section(&existing, PAD_SECTION, &body))?;

    tracing::info!("Applied controller profile to {}", config_file.display());
    Ok(())
}

/// Replace (or append) one `[section]` of an INI document
fn replace_section(existing: &str, section: &str, body: &[String]) -> String {
    let header = format!("[{}]", section);
    let mut out = Vec::new();
    let mut in_target = false;
    let mut replaced = false;

    for line in existing.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with('[') && trimmed.ends_with(']') {
            in_target = trimmed.eq_ignore_ascii_case(&header);
            if in_target {
                out.push(header.clone());
                out.extend(body.iter().cloned());
                replaced = true;
                continue;
            }
        }
        if !in_target {
            out.push(line.to_string());
        }
    }

    if !replaced {
        if out.last().is_some_and(|l| !l.trim().is_empty()) {
            out.push(String::new());
        }
        out.push(header);
        out.extend(body.iter().cloned());
    }

    let mut text = out.join("\n");
    text.push('\n');
    text
}
