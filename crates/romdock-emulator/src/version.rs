//! Emulator version probing

use crate::ResolvedEmulator;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// How long an emulator gets to answer `--version`
pub const VERSION_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Version reported by an emulator binary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmulatorVersion {
    /// First non-empty line of output
    pub raw: String,
    /// Parsed version, when the output contains one
    pub semver: Option<semver::Version>,
}

impl EmulatorVersion {
    pub fn parse(output: &str) -> Option<Self> {
        let raw = output
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())?
            .to_string();
        let semver = extract_semver(&raw);
        Some(Self { raw, semver })
    }
}

/// Ask the emulator for its version.
///
/// Returns `None` for emulators that do not support the flag, on any
/// failure, or when no answer arrives within [`VERSION_PROBE_TIMEOUT`]; the
/// child is killed in that case.
pub async fn probe_version(emulator: &ResolvedEmulator) -> Option<EmulatorVersion> {
    let definition = &emulator.definition;
    if definition.skips_version_check || !definition.supports_version_flag {
        return None;
    }
    probe_executable(&emulator.executable, VERSION_PROBE_TIMEOUT).await
}

pub(crate) async fn probe_executable(executable: &Path, limit: Duration) -> Option<EmulatorVersion> {
    let child = Command::new(executable)
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .output();

    let output = match tokio::time::timeout(limit, child).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            tracing::debug!("Version probe for {} failed: {}", executable.display(), e);
            return None;
        }
        Err(_) => {
            tracing::warn!(
                "{} did not report a version within {:?}",
                executable.display(),
                limit
            );
            return None;
        }
    };

    EmulatorVersion::parse(&String::from_utf8_lossy(&output.stdout))
}

/// First dotted numeric token, padded to three components
fn extract_semver(text: &str) -> Option<semver::Version> {
    text.split(|c: char| c.is_whitespace() || c == '-' || c == '(' || c == ')' || c == ',')
        .map(|token| token.trim_start_matches(['v', 'V']))
        .filter(|token| token.contains('.'))
        .find_map(|token| {
            let numeric: Vec<&str> = token.split('.').take(3).collect();
            if numeric
                .iter()
                .any(|part| part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()))
            {
                return None;
            }
            let mut parts = numeric;
            while parts.len() < 3 {
                parts.push("0");
            }
            semver::Version::parse(&parts.join(".")).ok()
        })
}
