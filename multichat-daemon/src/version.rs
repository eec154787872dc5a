//! Version information and build metadata display

use std::fmt;

pub struct VersionInfo {
    /// Package version from Cargo.toml
    pub daemon_version: &'static str,
    /// Target triple (e.g., x86_64-unknown-linux-gnu)
    pub target: &'static str,
    /// Build profile (debug or release)
    pub profile: &'static str,
    /// Git commit hash (if available)
    pub git_commit: Option<&'static str>,
    pub build_timestamp: &'static str,
}

impl VersionInfo {
    pub fn current() -> Self {
        Self {
            daemon_version: env!("CARGO_PKG_VERSION"),
            target: env!("MULTICHAT_BUILD_TARGET"),
            profile: if cfg!(debug_assertions) {
                "debug"
            } else {
                "release"
            },
            git_commit: option_env!("MULTICHAT_GIT_COMMIT"),
            build_timestamp: env!("MULTICHAT_BUILT_AT"),
        }
    }

    /// Chat platforms this build can read from
    pub fn platforms(&self) -> Vec<&'static str> {
        vec![
            "Twitch (IRC chat)",
            "YouTube (Data API v3 live chat)",
            "TikTok (webcast relay)",
        ]
    }
}

impl fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "multichat-daemon {}", self.daemon_version)?;
        writeln!(f)?;

        writeln!(f, "Build Information:")?;
        writeln!(f, "  Target:       {}", self.target)?;
        writeln!(f, "  Profile:      {}", self.profile)?;
        writeln!(f, "  Build Date:   {}", self.build_timestamp)?;

        if let Some(commit) = self.git_commit {
            writeln!(f, "  Git Commit:   {}", commit)?;
        }

        writeln!(f)?;
        writeln!(f, "Platforms:")?;
        for platform in self.platforms() {
            writeln!(f, "  • {}", platform)?;
        }

        Ok(())
    }
}

/// Short version string (for --version)
pub fn version_short() -> String {
    format!("multichat-daemon {}", env!("CARGO_PKG_VERSION"))
}

/// Long version string (for the `version` subcommand)
pub fn version_long() -> String {
    VersionInfo::current().to_string()
}
