//! Coverage goals.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Structural location of a goal's instrumentation point.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GoalLocation {
    /// Enclosing unit (class, module, subject).
    pub unit: String,
    /// Enclosing function or method.
    pub function: String,
    /// Source line of the capture point.
    pub line: u32,
}

/// A single coverage target.
///
/// Goals are immutable and compared by identity (id plus location), so they
/// can key ordered sets and maps.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Goal {
    id: String,
    location: GoalLocation,
}

impl Goal {
    /// Create a goal.
    pub fn new(id: impl Into<String>, location: GoalLocation) -> Self {
        Self {
            id: id.into(),
            location,
        }
    }

    /// Create a goal at a `unit::function:line` location.
    pub fn at(
        id: impl Into<String>,
        unit: impl Into<String>,
        function: impl Into<String>,
        line: u32,
    ) -> Self {
        Self::new(
            id,
            GoalLocation {
                unit: unit.into(),
                function: function.into(),
                line,
            },
        )
    }

    /// Instrumentation id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Structural location.
    pub fn location(&self) -> &GoalLocation {
        &self.location
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}::{}:{})",
            self.id, self.location.unit, self.location.function, self.location.line
        )
    }
}
