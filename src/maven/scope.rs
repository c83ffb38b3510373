//! Maven dependency scopes and the fixed transitivity table.
//!
//! The table is the one from the Maven dependency mechanism documentation:
//! rows are the scope a dependency is declared with, columns the scope of
//! the path leading to it. It is a constant of the system and not
//! overridable.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Dependency scope. A closed set; unknown strings map to [`Scope::Invalid`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    /// The root of a resolution tree.
    None,
    Compile,
    Provided,
    Runtime,
    Test,
    System,
    Invalid,
}

impl Scope {
    /// Parse a scope tag value. A missing tag defaults to `Compile`;
    /// anything unrecognized is `Invalid`.
    pub fn from_name(name: Option<&str>) -> Scope {
        match name {
            None => Scope::Compile,
            Some(name) => match name.to_ascii_lowercase().as_str() {
                "compile" => Scope::Compile,
                "provided" => Scope::Provided,
                "runtime" => Scope::Runtime,
                "test" => Scope::Test,
                "system" => Scope::System,
                _ => Scope::Invalid,
            },
        }
    }

    /// The scope `self` contributes when reached through a path of scope
    /// `parent`, or `None` when it is not transitively visible.
    pub fn transitive_of(self, parent: Scope) -> Option<Scope> {
        match parent {
            Scope::None => Some(self),
            Scope::Compile => match self {
                Scope::Compile => Some(Scope::Compile),
                Scope::Runtime => Some(Scope::Runtime),
                _ => None,
            },
            Scope::Provided => match self {
                Scope::Compile | Scope::Runtime => Some(Scope::Provided),
                _ => None,
            },
            Scope::Runtime => match self {
                Scope::Compile | Scope::Runtime => Some(Scope::Runtime),
                _ => None,
            },
            Scope::Test => match self {
                Scope::Compile | Scope::Runtime | Scope::Test => Some(Scope::Test),
                _ => None,
            },
            _ => None,
        }
    }

    /// Whether a dependency in scope `self` would be on the classpath
    /// queried with `query`.
    pub fn is_in_classpath_of(self, query: Scope) -> bool {
        self.transitive_of(query) == Some(query)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Scope::None => "none",
            Scope::Compile => "compile",
            Scope::Provided => "provided",
            Scope::Runtime => "runtime",
            Scope::Test => "test",
            Scope::System => "system",
            Scope::Invalid => "invalid",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Scope; 7] = [
        Scope::None,
        Scope::Compile,
        Scope::Provided,
        Scope::Runtime,
        Scope::Test,
        Scope::System,
        Scope::Invalid,
    ];

    #[test]
    fn from_name_defaults_and_invalid() {
        assert_eq!(Scope::from_name(None), Scope::Compile);
        assert_eq!(Scope::from_name(Some("RUNTIME")), Scope::Runtime);
        assert_eq!(Scope::from_name(Some("import")), Scope::Invalid);
        assert_eq!(Scope::from_name(Some("whatever")), Scope::Invalid);
    }

    #[test]
    fn transitivity_table() {
        // Declared compile, reached through compile: stays compile.
        assert_eq!(
            Scope::Compile.transitive_of(Scope::Compile),
            Some(Scope::Compile)
        );
        // Declared runtime, reached through compile: runtime.
        assert_eq!(
            Scope::Runtime.transitive_of(Scope::Compile),
            Some(Scope::Runtime)
        );
        // Test and provided never travel.
        assert_eq!(Scope::Test.transitive_of(Scope::Compile), None);
        assert_eq!(Scope::Provided.transitive_of(Scope::Compile), None);
        // Everything declared compile/runtime narrows to the path scope.
        assert_eq!(
            Scope::Compile.transitive_of(Scope::Provided),
            Some(Scope::Provided)
        );
        assert_eq!(
            Scope::Compile.transitive_of(Scope::Test),
            Some(Scope::Test)
        );
        // At the root everything is itself.
        for scope in ALL {
            assert_eq!(scope.transitive_of(Scope::None), Some(scope));
        }
    }

    #[test]
    fn classpath_membership_matches_table() {
        for scope in ALL {
            for query in ALL {
                assert_eq!(
                    scope.is_in_classpath_of(query),
                    scope.transitive_of(query) == Some(query),
                );
            }
        }
        assert!(Scope::Compile.is_in_classpath_of(Scope::Test));
        assert!(!Scope::Test.is_in_classpath_of(Scope::Compile));
    }
}
