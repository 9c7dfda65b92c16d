//! Type nodes of the Varlink type model (§3).

use std::fmt;

/// A single named field of a `Struct`, or a single parameter in a method's
/// input/output list.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub ty: Type,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Field { name: name.into(), ty }
    }
}

/// A type node, recursively describing an IDL type (§3).
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Bool,
    Int,
    Float,
    String,
    /// Untyped JSON escape hatch; round-trips opaque JSON.
    Object,
    Array(Box<Type>),
    Map(Box<Type>),
    /// `Map<string, {}>` on the wire; semantically an unordered set of
    /// strings.
    Set,
    /// Optional; absent or null is legal only for this wrapper. May not
    /// directly nest (`??T` is rejected by the parser).
    Maybe(Box<Type>),
    /// Ordered, closed set of named fields.
    Struct(Vec<Field>),
    /// Closed set of string tags.
    Enum(Vec<String>),
    /// By-name reference to another member of the same interface, resolved
    /// lazily by the parser's resolution pass.
    CustomRef(String),
}

impl Type {
    pub fn as_maybe(&self) -> Option<&Type> {
        match self {
            Type::Maybe(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&[Field]> {
        match self {
            Type::Struct(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn is_maybe(&self) -> bool {
        matches!(self, Type::Maybe(_))
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Bool => write!(f, "bool"),
            Type::Int => write!(f, "int"),
            Type::Float => write!(f, "float"),
            Type::String => write!(f, "string"),
            Type::Object => write!(f, "object"),
            Type::Array(elem) => write!(f, "[]{elem}"),
            Type::Map(elem) => write!(f, "[string]{elem}"),
            Type::Set => write!(f, "[string]()"),
            Type::Maybe(elem) => write!(f, "?{elem}"),
            Type::Struct(fields) => {
                write!(f, "(")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", field.name, field.ty)?;
                }
                write!(f, ")")
            }
            Type::Enum(tags) => {
                write!(f, "(")?;
                for (i, tag) in tags.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{tag}")?;
                }
                write!(f, ")")
            }
            Type::CustomRef(name) => write!(f, "{name}"),
        }
    }
}
