use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// Matches the `(vMAJOR.MINOR)` tag the server appends to its advertised name.
static NAME_VERSION: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\(v([0-9]+\.[0-9]*)\)").ok());

/// Dotted server build number, `major.minor[.build[.revision]]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ServerVersion {
    pub major: u32,
    pub minor: u32,
    pub build: Option<u32>,
    pub revision: Option<u32>,
}

impl ServerVersion {
    pub fn new(major: u32, minor: u32) -> Self {
        Self {
            major,
            minor,
            build: None,
            revision: None,
        }
    }

    /// Extract the version from an advertised server name such as
    /// `"MyServer (v301.42)"`. Names without a well-formed tag yield `None`.
    pub fn from_server_name(name: &str) -> Option<Self> {
        let regex = NAME_VERSION.as_ref()?;
        let captures = regex.captures(name)?;
        captures.get(1)?.as_str().parse().ok()
    }
}

/// Returned when a version string is not `major.minor[.build[.revision]]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseVersionError(pub String);

impl fmt::Display for ParseVersionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid server version '{}'", self.0)
    }
}

impl std::error::Error for ParseVersionError {}

impl FromStr for ServerVersion {
    type Err = ParseVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseVersionError(s.to_string());
        let parts = s
            .trim()
            .split('.')
            .map(|part| part.parse::<u32>().map_err(|_| invalid()))
            .collect::<Result<Vec<_>, _>>()?;

        match parts.as_slice() {
            [major, minor] => Ok(Self::new(*major, *minor)),
            [major, minor, build] => Ok(Self {
                build: Some(*build),
                ..Self::new(*major, *minor)
            }),
            [major, minor, build, revision] => Ok(Self {
                major: *major,
                minor: *minor,
                build: Some(*build),
                revision: Some(*revision),
            }),
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)?;
        if let Some(build) = self.build {
            write!(f, ".{build}")?;
            if let Some(revision) = self.revision {
                write!(f, ".{revision}")?;
            }
        }
        Ok(())
    }
}
