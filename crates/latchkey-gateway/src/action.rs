//! Request actions.

use std::fmt;
use std::str::FromStr;

/// Action named by the `action` request parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Open the latch.
    Open,
    /// Close the latch.
    Close,
    /// Run the reference cycle.
    Reset,
    /// Report the cached state.
    State,
}

impl Action {
    /// Parameter value for this action.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Close => "close",
            Self::Reset => "reset",
            Self::State => "state",
        }
    }

    /// Returns `true` if the action moves the latch and needs a valid token.
    pub fn requires_auth(self) -> bool {
        !matches!(self, Self::State)
    }
}

impl FromStr for Action {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "close" => Ok(Self::Close),
            "reset" => Ok(Self::Reset),
            "state" => Ok(Self::State),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
