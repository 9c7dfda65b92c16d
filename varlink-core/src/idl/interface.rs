//! The `Interface` AST produced by the parser (§3).

use std::collections::HashMap;

use super::type_::{Field, Type};

/// One declared member of an interface: an `Alias` (`type` declaration), a
/// `Method`, or an `Error`. Disjoint, as §3 requires.
#[derive(Debug, Clone)]
pub enum Member {
    Alias {
        name: String,
        ty: Type,
        doc: Option<String>,
    },
    Method {
        name: String,
        input: Vec<Field>,
        output: Vec<Field>,
        doc: Option<String>,
    },
    Error {
        name: String,
        ty: Type,
        doc: Option<String>,
    },
}

impl Member {
    pub fn name(&self) -> &str {
        match self {
            Member::Alias { name, .. } => name,
            Member::Method { name, .. } => name,
            Member::Error { name, .. } => name,
        }
    }

    pub fn doc(&self) -> Option<&str> {
        match self {
            Member::Alias { doc, .. } => doc.as_deref(),
            Member::Method { doc, .. } => doc.as_deref(),
            Member::Error { doc, .. } => doc.as_deref(),
        }
    }
}

/// A fully parsed interface document. Immutable once built; §3's lifecycle
/// says `Interface` objects are created by parsing and never mutated.
#[derive(Debug, Clone)]
pub struct Interface {
    name: String,
    doc: Option<String>,
    members: Vec<Member>,
    index: HashMap<String, usize>,
    source: String,
}

impl Interface {
    pub(super) fn new(
        name: String,
        doc: Option<String>,
        members: Vec<Member>,
        source: String,
    ) -> Self {
        let index = members
            .iter()
            .enumerate()
            .map(|(i, m)| (m.name().to_string(), i))
            .collect();
        Interface { name, doc, members, index, source }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    /// The original IDL source text, preserved verbatim for introspection
    /// (§8 property 9, `GetInterfaceDescription`).
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn member(&self, name: &str) -> Option<&Member> {
        self.index.get(name).map(|&i| &self.members[i])
    }

    pub fn members(&self) -> impl Iterator<Item = &Member> {
        self.members.iter()
    }

    pub fn method(&self, name: &str) -> Option<(&[Field], &[Field])> {
        match self.member(name)? {
            Member::Method { input, output, .. } => Some((input, output)),
            _ => None,
        }
    }

    pub fn error(&self, name: &str) -> Option<&Type> {
        match self.member(name)? {
            Member::Error { ty, .. } => Some(ty),
            _ => None,
        }
    }

    /// Resolves a `CustomRef` to the `Type` of the `Alias` it names. Per
    /// §3: "`CustomRef` must resolve to an `Alias`; following `.type`
    /// terminates at a non-`Alias` node" — so this does not recurse through
    /// chains of aliases referring to other aliases beyond one hop's worth
    /// of lookup, it simply returns whatever type the alias body declares
    /// (which may itself be another `CustomRef`, resolved again by the
    /// caller).
    pub fn resolve_alias(&self, name: &str) -> Option<&Type> {
        match self.member(name)? {
            Member::Alias { ty, .. } => Some(ty),
            _ => None,
        }
    }
}
