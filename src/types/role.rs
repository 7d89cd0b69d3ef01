use std::fmt;
use std::str::FromStr;

/// Role of a node in the wall
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Role {
    /// Authoritative for the shared timeline
    Master,
    /// Follows the master's timeline
    #[default]
    Slave,
}

impl Role {
    /// Check if this is the master role
    #[must_use]
    pub fn is_master(self) -> bool {
        self == Self::Master
    }

    /// Lower-case name used on the wire and in snapshots
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Master => "master",
            Self::Slave => "slave",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "master" => Ok(Self::Master),
            "slave" => Ok(Self::Slave),
            other => Err(format!("unknown role: {other}")),
        }
    }
}
