//! Platform detection and library rule evaluation.

use crate::game::profile::version_parser::{Rule, RuleAction};

/// Operating system names as they appear in version JSON rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OsName {
    Windows,
    Osx,
    Linux,
}

impl OsName {
    pub fn current() -> Self {
        match std::env::consts::OS {
            "windows" => OsName::Windows,
            "macos" => OsName::Osx,
            _ => OsName::Linux,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OsName::Windows => "windows",
            OsName::Osx => "osx",
            OsName::Linux => "linux",
        }
    }
}

/// The machine a plan is expanded for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    pub os: OsName,
    pub os_version: String,
    /// Normalized architecture: `x86_64`, `x86`, `aarch64` or `arm`
    pub arch: String,
}

impl Platform {
    pub fn new(os: OsName, os_version: impl Into<String>, arch: &str) -> Self {
        Self {
            os,
            os_version: os_version.into(),
            arch: normalize_arch(arch).to_string(),
        }
    }

    /// Detect the host platform.
    pub fn current() -> Self {
        let os_version = sysinfo::System::os_version().unwrap_or_default();
        Self::new(OsName::current(), os_version, std::env::consts::ARCH)
    }

    /// Value substituted for `${arch}` in native classifiers.
    pub fn arch_bits(&self) -> &'static str {
        match self.arch.as_str() {
            "x86" | "arm" => "32",
            _ => "64",
        }
    }
}

fn normalize_arch(arch: &str) -> &str {
    match arch {
        "x64" | "amd64" | "x86_64" => "x86_64",
        "x86" | "i386" | "i686" => "x86",
        "arm64" | "aarch64" => "aarch64",
        "arm32" | "arm" => "arm",
        other => other,
    }
}

/// Decide whether a rule list admits the platform.
///
/// An empty list allows. Otherwise rules are evaluated in order starting from
/// "disallowed", and the last rule that matches decides.
pub fn rules_allow(rules: &[Rule], platform: &Platform) -> bool {
    if rules.is_empty() {
        return true;
    }
    let mut allowed = false;
    for rule in rules {
        if rule_matches(rule, platform) {
            allowed = rule.action == RuleAction::Allow;
        }
    }
    allowed
}

fn rule_matches(rule: &Rule, platform: &Platform) -> bool {
    if let Some(ref os_rule) = rule.os {
        if let Some(ref name) = os_rule.name {
            if name != platform.os.as_str() {
                return false;
            }
        }

        if let Some(ref arch) = os_rule.arch {
            if normalize_arch(arch) != platform.arch {
                return false;
            }
        }

        if let Some(ref pattern) = os_rule.version {
            match regex::Regex::new(pattern) {
                Ok(re) => {
                    if !re.is_match(&platform.os_version) {
                        return false;
                    }
                }
                Err(e) => {
                    log::warn!("Ignoring rule with invalid os.version pattern {:?}: {}", pattern, e);
                    return false;
                }
            }
        }
    }

    // No launcher features are enabled while installing.
    if let Some(ref features) = rule.features {
        if features.values().any(|required| *required) {
            return false;
        }
    }

    true
}
