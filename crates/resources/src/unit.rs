//! Units and their titles

use serde::{Deserialize, Serialize};
use std::fmt;

/// Rank of a unit, from fresh recruit to battle-hardened warrior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Title {
    Recruit,
    Soldier,
    Warrior,
}

impl fmt::Display for Title {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Title::Recruit => write!(f, "recruit"),
            Title::Soldier => write!(f, "soldier"),
            Title::Warrior => write!(f, "warrior"),
        }
    }
}

/// A named unit passed between resources by value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Unit {
    pub name: String,
    pub title: Title,
}

impl Unit {
    pub fn new(name: impl Into<String>, title: Title) -> Self {
        Self {
            name: name.into(),
            title,
        }
    }

    pub fn recruit(name: impl Into<String>) -> Self {
        Self::new(name, Title::Recruit)
    }

    /// The same unit under a new title
    pub fn promoted(&self, title: Title) -> Self {
        Self::new(self.name.clone(), title)
    }

    pub fn present(&self) -> String {
        format!("I am {}, {}", self.name, self.title)
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.title)
    }
}
