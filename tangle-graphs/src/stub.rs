use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Declaration flavour of a class-like type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ClassKind {
    #[default]
    Class,
    Interface,
    Enum,
    Annotation,
    Record,
}

impl ClassKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Class => "class",
            Self::Interface => "interface",
            Self::Enum => "enum",
            Self::Annotation => "annotation",
            Self::Record => "record",
        }
    }
}

/// Where a stub was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StubOrigin {
    Binary,
    Source,
}

/// Declared shape of one class: everything the coupling builder needs,
/// nothing from method bodies.
///
/// Type references are kept in their encoded form (descriptor plus
/// optional generic signature) so binary and source origins go through
/// the same parser. Annotations are stored as type descriptors
/// (`Ljavax/inject/Inject;`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassStub {
    /// Binary name, dotted, `$` for nesting (`com.acme.Outer$Inner`).
    pub name: String,
    pub kind: ClassKind,
    #[serde(default)]
    pub is_abstract: bool,
    pub signature: Option<String>,
    /// Internal or binary name of the superclass; `None` for
    /// `java.lang.Object` itself and for interfaces.
    pub super_class: Option<String>,
    #[serde(default)]
    pub interfaces: Vec<String>,
    #[serde(default)]
    pub annotations: Vec<String>,
    #[serde(default)]
    pub fields: Vec<FieldStub>,
    #[serde(default)]
    pub methods: Vec<MethodStub>,
    pub origin: StubOrigin,
    /// Source names the reader could not pin to one class: the binary
    /// name written into descriptors → every class it may denote, in
    /// Java lookup order (same package, on-demand imports, `java.lang`).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub name_candidates: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldStub {
    pub name: String,
    pub descriptor: String,
    pub signature: Option<String>,
    #[serde(default)]
    pub annotations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodStub {
    pub name: String,
    pub descriptor: String,
    pub signature: Option<String>,
    /// Declared exceptions from the `Exceptions` attribute / `throws`.
    #[serde(default)]
    pub exceptions: Vec<String>,
    #[serde(default)]
    pub annotations: Vec<String>,
    /// One list of annotation descriptors per parameter.
    #[serde(default)]
    pub parameter_annotations: Vec<Vec<String>>,
}

impl ClassStub {
    pub fn new(name: impl Into<String>, kind: ClassKind, origin: StubOrigin) -> Self {
        Self {
            name: name.into(),
            kind,
            is_abstract: false,
            signature: None,
            super_class: None,
            interfaces: Vec::new(),
            annotations: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            origin,
            name_candidates: BTreeMap::new(),
        }
    }

    /// Package part of the binary name; empty for the default package.
    pub fn package_name(&self) -> &str {
        self.name.rsplit_once('.').map_or("", |(pkg, _)| pkg)
    }

    /// Simple name, with the enclosing-class prefix removed.
    pub fn simple_name(&self) -> &str {
        let tail = self.name.rsplit_once('.').map_or(self.name.as_str(), |(_, n)| n);
        tail.rsplit_once('$').map_or(tail, |(_, n)| n)
    }

    /// Binary name of the enclosing class for nested types.
    pub fn outer_class(&self) -> Option<&str> {
        self.name.rsplit_once('$').map(|(outer, _)| outer)
    }
}

/// Binary class name from an annotation or field descriptor
/// (`Lcom/acme/Inject;` → `com.acme.Inject`).
pub fn class_name_from_descriptor(descriptor: &str) -> Option<String> {
    let inner = descriptor.strip_prefix('L')?.strip_suffix(';')?;
    if inner.is_empty() {
        return None;
    }
    Some(crate::signature::internal_to_binary(inner))
}

/// Descriptor for a binary class name (`com.acme.User` → `Lcom/acme/User;`).
pub fn descriptor_for_class(binary_name: &str) -> String {
    format!("L{};", binary_name.replace('.', "/"))
}
