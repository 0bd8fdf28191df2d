use std::fmt;

use crate::Fingerprint;

/// Qualified name: a declaring scope path plus a simple name.
///
/// Used for template names, implementation names and named type references.
///
/// # Examples
///
/// ```
/// use stencil_core::QualifiedName;
///
/// let comparer = QualifiedName::global("Comparer");
/// assert_eq!(comparer.to_string(), "Comparer");
///
/// let scoped = QualifiedName::new("Comparer", vec!["Collections".into(), "Generic".into()]);
/// assert_eq!(scoped.to_string(), "Collections::Generic::Comparer");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QualifiedName {
    /// Simple name (e.g., "Comparer")
    pub name: String,
    /// Declaring scope path (e.g., ["Collections", "Generic"]).
    /// Empty for the global scope.
    pub scope: Vec<String>,
}

impl QualifiedName {
    /// Create a new qualified name inside a scope.
    pub fn new(name: impl Into<String>, scope: Vec<String>) -> Self {
        Self {
            name: name.into(),
            scope,
        }
    }

    /// Create a qualified name in the global scope.
    pub fn global(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scope: Vec::new(),
        }
    }

    /// Parse a `::`-separated path. The last segment is the name.
    /// A leading `::` is ignored: "::A::B" == "A::B".
    pub fn from_qualified_string(s: &str) -> Self {
        let mut parts: Vec<String> = s
            .split("::")
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();
        match parts.pop() {
            Some(name) => Self { name, scope: parts },
            None => Self::global(""),
        }
    }

    pub fn is_global(&self) -> bool {
        self.scope.is_empty()
    }

    pub fn simple_name(&self) -> &str {
        &self.name
    }

    pub fn scope_path(&self) -> &[String] {
        &self.scope
    }

    /// Get the scope as a joined string.
    pub fn scope_string(&self) -> String {
        self.scope.join("::")
    }

    /// Identifier-safe rendering (`Collections_Generic_Comparer`), used when
    /// deriving output names.
    pub fn mangled(&self) -> String {
        let mut out = String::new();
        for segment in &self.scope {
            out.push_str(segment);
            out.push('_');
        }
        out.push_str(&self.name);
        out
    }

    /// Create a child name within this scope.
    ///
    /// Example: `Collections` + `Comparer` = `Collections::Comparer`
    pub fn child(&self, name: impl Into<String>) -> Self {
        let mut child_scope = self.scope.clone();
        child_scope.push(self.name.clone());
        Self {
            name: name.into(),
            scope: child_scope,
        }
    }

    /// Sibling name in the same scope.
    pub fn sibling(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scope: self.scope.clone(),
        }
    }

    /// Fingerprint of the full path.
    pub fn fingerprint(&self) -> Fingerprint {
        let mut builder = Fingerprint::builder(Fingerprint::TYPE).len(self.scope.len());
        for segment in &self.scope {
            builder = builder.str(segment);
        }
        builder.str(&self.name).finish()
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scope.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}::{}", self.scope.join("::"), self.name)
        }
    }
}

impl From<&str> for QualifiedName {
    fn from(s: &str) -> Self {
        Self::from_qualified_string(s)
    }
}

impl From<String> for QualifiedName {
    fn from(s: String) -> Self {
        Self::from_qualified_string(&s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_global() {
        let name = QualifiedName::from_qualified_string("Comparer");
        assert!(name.is_global());
        assert_eq!(name.simple_name(), "Comparer");
    }

    #[test]
    fn parse_scoped_and_leading_separator() {
        let a = QualifiedName::from_qualified_string("::Collections::Comparer");
        let b = QualifiedName::from("Collections::Comparer");
        assert_eq!(a, b);
        assert_eq!(a.scope_path(), &["Collections".to_string()]);
        assert_eq!(a.scope_string(), "Collections");
    }

    #[test]
    fn parse_empty() {
        let name = QualifiedName::from_qualified_string("::");
        assert_eq!(name, QualifiedName::global(""));
    }

    #[test]
    fn mangled_joins_with_underscore() {
        let name = QualifiedName::from("A::B::Comparer");
        assert_eq!(name.mangled(), "A_B_Comparer");
    }

    #[test]
    fn child_and_sibling() {
        let base = QualifiedName::from("Collections::Comparer");
        assert_eq!(base.child("Impl").to_string(), "Collections::Comparer::Impl");
        assert_eq!(base.sibling("Hasher").to_string(), "Collections::Hasher");
    }

    #[test]
    fn fingerprint_distinguishes_scope() {
        let a = QualifiedName::from("A::Comparer");
        let b = QualifiedName::from("B::Comparer");
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint(), QualifiedName::from("A::Comparer").fingerprint());
    }
}
