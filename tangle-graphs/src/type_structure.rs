use std::fmt;

use serde::{Deserialize, Serialize};

// ── Wildcards ──────────────────────────────────────────────────────

/// Bound carried by a type argument (`?`, `? extends X`, `? super X`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WildcardBound {
    /// A plain, non-wildcard argument.
    #[default]
    None,
    /// `? extends X` (signature marker `+`).
    Extends,
    /// `? super X` (signature marker `-`).
    Super,
    /// `?` with no bound (signature marker `*`). Carries no class.
    Unbounded,
}

// ── Primitives ─────────────────────────────────────────────────────

/// JVM base types. `Void` only appears as a method return type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Primitive {
    Byte,
    Char,
    Double,
    Float,
    Int,
    Long,
    Short,
    Boolean,
    Void,
}

impl Primitive {
    pub fn from_descriptor(c: char) -> Option<Self> {
        Some(match c {
            'B' => Self::Byte,
            'C' => Self::Char,
            'D' => Self::Double,
            'F' => Self::Float,
            'I' => Self::Int,
            'J' => Self::Long,
            'S' => Self::Short,
            'Z' => Self::Boolean,
            'V' => Self::Void,
            _ => return None,
        })
    }

    pub fn from_keyword(kw: &str) -> Option<Self> {
        Some(match kw {
            "byte" => Self::Byte,
            "char" => Self::Char,
            "double" => Self::Double,
            "float" => Self::Float,
            "int" => Self::Int,
            "long" => Self::Long,
            "short" => Self::Short,
            "boolean" => Self::Boolean,
            "void" => Self::Void,
            _ => return None,
        })
    }

    pub fn descriptor(self) -> char {
        match self {
            Self::Byte => 'B',
            Self::Char => 'C',
            Self::Double => 'D',
            Self::Float => 'F',
            Self::Int => 'I',
            Self::Long => 'J',
            Self::Short => 'S',
            Self::Boolean => 'Z',
            Self::Void => 'V',
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Self::Byte => "byte",
            Self::Char => "char",
            Self::Double => "double",
            Self::Float => "float",
            Self::Int => "int",
            Self::Long => "long",
            Self::Short => "short",
            Self::Boolean => "boolean",
            Self::Void => "void",
        }
    }
}

// ── TypeStructure ──────────────────────────────────────────────────

/// A parsed type: the recursive, immutable result of reading a descriptor
/// or generic signature.
///
/// Exactly one of `class_name`, `type_variable` and `primitive` is set,
/// except for an unbounded wildcard (`?`), which carries none of them.
/// The position of an argument in `type_arguments` is its type-argument
/// index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct TypeStructure {
    /// Fully-qualified binary name (`java.util.Map`, `a.b.Outer$Inner`).
    pub class_name: Option<String>,
    /// Array nesting depth; zero for non-arrays.
    pub array_depth: u8,
    pub type_arguments: Vec<TypeStructure>,
    pub wildcard: WildcardBound,
    /// Name of the referenced type parameter, when this node is one.
    pub type_variable: Option<String>,
    pub primitive: Option<Primitive>,
    /// Parameterization of the enclosing class for inner-class types
    /// such as `Outer<K>.Inner<V>`.
    pub enclosing: Option<Box<TypeStructure>>,
}

impl TypeStructure {
    pub fn class(name: impl Into<String>) -> Self {
        Self {
            class_name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn generic(name: impl Into<String>, args: Vec<TypeStructure>) -> Self {
        Self {
            class_name: Some(name.into()),
            type_arguments: args,
            ..Self::default()
        }
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Self {
            type_variable: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn primitive(p: Primitive) -> Self {
        Self {
            primitive: Some(p),
            ..Self::default()
        }
    }

    pub fn unbounded_wildcard() -> Self {
        Self {
            wildcard: WildcardBound::Unbounded,
            ..Self::default()
        }
    }

    /// Conservative stand-in when nothing could be parsed at all.
    pub fn object() -> Self {
        Self::class("java.lang.Object")
    }

    #[must_use]
    pub fn with_wildcard(mut self, bound: WildcardBound) -> Self {
        self.wildcard = bound;
        self
    }

    #[must_use]
    pub fn into_array(mut self, extra_dims: u8) -> Self {
        self.array_depth = self.array_depth.saturating_add(extra_dims);
        self
    }

    pub fn is_array(&self) -> bool {
        self.array_depth > 0
    }

    pub fn is_type_variable(&self) -> bool {
        self.type_variable.is_some()
    }

    pub fn is_primitive(&self) -> bool {
        self.primitive.is_some()
    }

    pub fn is_generic(&self) -> bool {
        !self.type_arguments.is_empty()
            || self.enclosing.as_ref().is_some_and(|e| e.is_generic())
    }

    /// Deepest generic nesting below this node (`List<Map<K, V>>` → 2).
    pub fn generic_depth(&self) -> usize {
        let own = self
            .type_arguments
            .iter()
            .map(|a| 1 + a.generic_depth())
            .max()
            .unwrap_or(0);
        let outer = self.enclosing.as_ref().map_or(0, |e| e.generic_depth());
        own.max(outer)
    }
}

impl fmt::Display for TypeStructure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.wildcard {
            WildcardBound::Unbounded => return f.write_str("?"),
            WildcardBound::Extends => f.write_str("? extends ")?,
            WildcardBound::Super => f.write_str("? super ")?,
            WildcardBound::None => {}
        }
        if let Some(p) = self.primitive {
            f.write_str(p.keyword())?;
        } else if let Some(var) = &self.type_variable {
            f.write_str(var)?;
        } else if let Some(name) = &self.class_name {
            f.write_str(name)?;
        } else {
            f.write_str("<unknown>")?;
        }
        if !self.type_arguments.is_empty() {
            f.write_str("<")?;
            for (i, arg) in self.type_arguments.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{arg}")?;
            }
            f.write_str(">")?;
        }
        for _ in 0..self.array_depth {
            f.write_str("[]")?;
        }
        Ok(())
    }
}

// ── Declarations ───────────────────────────────────────────────────

/// A declared type parameter, e.g. `T extends Comparable<T> & Serializable`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeParameter {
    pub name: String,
    /// Class bound followed by interface bounds; empty means `Object`.
    pub bounds: Vec<TypeStructure>,
}

/// Parsed shape of a class declaration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClassType {
    pub type_parameters: Vec<TypeParameter>,
    pub super_class: Option<TypeStructure>,
    pub interfaces: Vec<TypeStructure>,
}

/// Parsed shape of a method declaration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MethodType {
    pub type_parameters: Vec<TypeParameter>,
    pub parameters: Vec<TypeStructure>,
    /// `None` for `void`.
    pub return_type: Option<TypeStructure>,
    pub throws: Vec<TypeStructure>,
}
