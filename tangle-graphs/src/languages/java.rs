//! Java source reader.
//!
//! Walks a tree-sitter-java syntax tree and produces one [`ClassStub`] per
//! declared type. Source-level types are resolved to binary names and
//! lowered to JVM descriptors and generic signatures, so the rest of the
//! engine treats source and class files alike.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};

use tree_sitter::{Node, Tree};

use crate::languages::helpers::{
    child_by_field, dimension_count, find_child_by_kind, has_token, named_children, node_text,
    strip_type_arguments,
};
use crate::stub::{ClassKind, ClassStub, FieldStub, MethodStub, StubOrigin, descriptor_for_class};
use crate::type_structure::{Primitive, TypeParameter, TypeStructure, WildcardBound};
use crate::{GraphError, Result};

/// `java.lang` types that resolve without an import.
const JAVA_LANG: &[&str] = &[
    "AutoCloseable", "Boolean", "Byte", "CharSequence", "Character", "Class", "Cloneable",
    "CloneNotSupportedException", "Comparable", "Deprecated", "Double", "Enum", "Error",
    "Exception", "Float", "FunctionalInterface", "IllegalArgumentException",
    "IllegalStateException", "IndexOutOfBoundsException", "Integer", "InterruptedException",
    "Iterable", "Long", "Math", "NullPointerException", "Number", "Object", "Override",
    "Record", "Runnable", "RuntimeException", "SafeVarargs", "Short", "String",
    "StringBuilder", "SuppressWarnings", "System", "Thread", "Throwable",
    "UnsupportedOperationException", "Void",
];

/// Everything read from one `.java` file.
#[derive(Debug, Clone, Default)]
pub struct SourceFile {
    /// Declared package; empty for the default package.
    pub package: String,
    pub types: Vec<ClassStub>,
    /// The parser recovered from syntax errors; stubs are best-effort.
    pub has_syntax_errors: bool,
}

/// Parse Java source text into a tree-sitter tree.
pub fn parse_tree(source: &str) -> Result<Tree> {
    let mut parser = tree_sitter::Parser::new();
    parser
        .set_language(&tree_sitter_java::LANGUAGE.into())
        .map_err(|e| GraphError::TreeSitter(format!("Failed to set language: {e}")))?;
    parser
        .parse(source, None)
        .ok_or_else(|| GraphError::TreeSitter("tree-sitter parse returned None".to_string()))
}

/// Read declared types from an already-parsed tree.
pub fn read_source(tree: &Tree, source: &str) -> SourceFile {
    let root = tree.root_node();
    let mut resolver = Resolver::default();

    for child in named_children(root) {
        match child.kind() {
            "package_declaration" => {
                if let Some(name) = named_children(child)
                    .into_iter()
                    .find(|n| matches!(n.kind(), "identifier" | "scoped_identifier"))
                {
                    resolver.package = node_text(name, source).to_string();
                }
            }
            "import_declaration" => resolver.add_import(child, source),
            _ => {}
        }
    }

    for child in named_children(root) {
        resolver.collect_declared(child, source, None);
    }

    let mut types = Vec::new();
    for child in named_children(root) {
        resolver.read_declaration(child, source, None, &mut types);
    }

    SourceFile {
        package: resolver.package.clone(),
        types,
        has_syntax_errors: root.has_error(),
    }
}

/// Parse and read in one step.
pub fn read_source_str(source: &str) -> Result<SourceFile> {
    let tree = parse_tree(source)?;
    Ok(read_source(&tree, source))
}

fn is_type_declaration(kind: &str) -> bool {
    matches!(
        kind,
        "class_declaration"
            | "interface_declaration"
            | "enum_declaration"
            | "record_declaration"
            | "annotation_type_declaration"
    )
}

// ── Resolution ─────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Resolver {
    package: String,
    /// Simple name → binary name from single-type imports.
    single_imports: HashMap<String, String>,
    /// Simple name → binary name for every type declared in this file.
    local_types: HashMap<String, String>,
    /// Package or class prefixes of non-static `import x.y.*;`.
    on_demand: Vec<String>,
    /// Names resolved with more than one candidate since the last
    /// declaration was finished.
    candidates: RefCell<BTreeMap<String, Vec<String>>>,
    /// Type-parameter scopes, innermost last: name → erasure.
    scopes: Vec<HashMap<String, String>>,
}

impl Resolver {
    fn add_import(&mut self, node: Node<'_>, source: &str) {
        let text = node_text(node, source)
            .trim_start_matches("import")
            .trim_end_matches(';')
            .trim();
        let is_static = text.starts_with("static ");
        let path: String = text
            .trim_start_matches("static")
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        if is_static || path.is_empty() {
            return;
        }
        if let Some(prefix) = path.strip_suffix(".*") {
            self.on_demand.push(prefix.to_string());
            return;
        }
        if let Some((_, simple)) = path.rsplit_once('.') {
            self.single_imports
                .insert(simple.to_string(), binary_from_dotted(&path));
        }
    }

    fn qualify(&self, name: &str, outer: Option<&str>) -> String {
        match outer {
            Some(o) => format!("{o}${name}"),
            None if self.package.is_empty() => name.to_string(),
            None => format!("{}.{name}", self.package),
        }
    }

    fn collect_declared(&mut self, node: Node<'_>, source: &str, outer: Option<&str>) {
        if !is_type_declaration(node.kind()) {
            return;
        }
        let Some(name_node) = child_by_field(node, "name") else {
            return;
        };
        let name = node_text(name_node, source);
        let binary = self.qualify(name, outer);
        self.local_types
            .entry(name.to_string())
            .or_insert_with(|| binary.clone());
        for member in body_members(node) {
            self.collect_declared(member, source, Some(&binary));
        }
    }

    fn type_variable_erasure(&self, name: &str) -> Option<&str> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).map(String::as_str))
    }

    /// Resolve a (possibly dotted) source type name to a binary name.
    fn resolve_class(&self, text: &str) -> String {
        let text = strip_type_arguments(text);
        if let Some((head, rest)) = text.split_once('.') {
            // `Map.Entry` where `Map` is itself resolvable.
            if head.starts_with(char::is_uppercase) {
                return self.resolve_nested(head, &format!("${}", rest.replace('.', "$")));
            }
            return binary_from_dotted(&text);
        }
        self.resolve_simple(&text)
    }

    /// Single-type imports and types of this file are exact. Anything
    /// else may live in the same package, behind an on-demand import, or
    /// in `java.lang`; which one holds depends on classes outside this
    /// file, so every candidate is recorded for the coupling builder.
    fn resolve_simple(&self, name: &str) -> String {
        self.resolve_nested(name, "")
    }

    /// Resolve `name` and append the binary `nested` suffix (`$Entry`)
    /// to every candidate.
    fn resolve_nested(&self, name: &str, nested: &str) -> String {
        if let Some(b) = self.single_imports.get(name) {
            return format!("{b}{nested}");
        }
        if let Some(b) = self.local_types.get(name) {
            return format!("{b}{nested}");
        }
        let mut candidates = vec![format!("{}{nested}", self.qualify(name, None))];
        for prefix in &self.on_demand {
            candidates.push(format!("{}{nested}", binary_from_dotted(&format!("{prefix}.{name}"))));
        }
        let lang = JAVA_LANG
            .contains(&name)
            .then(|| format!("java.lang.{name}{nested}"));
        candidates.extend(lang.clone());
        candidates.dedup();

        // Written name: the platform type when the name is a well-known
        // one, the same-package class otherwise.
        let written = lang.unwrap_or_else(|| candidates[0].clone());
        if candidates.len() > 1 {
            self.candidates
                .borrow_mut()
                .entry(written.clone())
                .or_insert(candidates);
        }
        written
    }

    fn annotation_descriptors(&self, node: Node<'_>, source: &str) -> Vec<String> {
        let Some(modifiers) = find_child_by_kind(node, "modifiers") else {
            return Vec::new();
        };
        named_children(modifiers)
            .into_iter()
            .filter(|m| matches!(m.kind(), "marker_annotation" | "annotation"))
            .filter_map(|a| child_by_field(a, "name"))
            .map(|n| descriptor_for_class(&self.resolve_class(node_text(n, source))))
            .collect()
    }

    // ── Type lowering ──────────────────────────────────────────────

    fn lower(&self, node: Node<'_>, source: &str) -> TypeStructure {
        match node.kind() {
            "integral_type" | "floating_point_type" | "boolean_type" | "void_type" => {
                Primitive::from_keyword(node_text(node, source).trim())
                    .map_or_else(TypeStructure::object, TypeStructure::primitive)
            }
            "type_identifier" => {
                let name = node_text(node, source);
                if self.type_variable_erasure(name).is_some() {
                    TypeStructure::variable(name)
                } else if name == "var" {
                    TypeStructure::object()
                } else {
                    TypeStructure::class(self.resolve_simple(name))
                }
            }
            "scoped_type_identifier" => {
                TypeStructure::class(self.resolve_class(node_text(node, source)))
            }
            "generic_type" => {
                let children = named_children(node);
                let base = children
                    .iter()
                    .find(|c| matches!(c.kind(), "type_identifier" | "scoped_type_identifier"))
                    .map_or_else(TypeStructure::object, |b| self.lower(*b, source));
                let args = children
                    .iter()
                    .find(|c| c.kind() == "type_arguments")
                    .map(|ta| {
                        named_children(*ta)
                            .into_iter()
                            .filter(|a| !is_annotation(a.kind()))
                            .map(|a| self.lower_argument(a, source))
                            .collect()
                    })
                    .unwrap_or_default();
                TypeStructure {
                    type_arguments: args,
                    ..base
                }
            }
            "array_type" => {
                let dims = child_by_field(node, "dimensions")
                    .map_or(1, |d| dimension_count(d, source));
                child_by_field(node, "element")
                    .map_or_else(TypeStructure::object, |e| self.lower(e, source))
                    .into_array(dims)
            }
            "annotated_type" => named_children(node)
                .into_iter()
                .rfind(|c| !is_annotation(c.kind()))
                .map_or_else(TypeStructure::object, |t| self.lower(t, source)),
            _ => TypeStructure::object(),
        }
    }

    fn lower_argument(&self, node: Node<'_>, source: &str) -> TypeStructure {
        if node.kind() != "wildcard" {
            return self.lower(node, source);
        }
        let bound = named_children(node)
            .into_iter()
            .find(|c| !is_annotation(c.kind()) && c.kind() != "super");
        match bound {
            None => TypeStructure::unbounded_wildcard(),
            Some(b) => {
                let kind = if has_token(node, "super") {
                    WildcardBound::Super
                } else {
                    WildcardBound::Extends
                };
                self.lower(b, source).with_wildcard(kind)
            }
        }
    }

    /// Read `<T extends A & B, U>` and push a scope for it.
    fn push_type_parameters(&mut self, owner: Node<'_>, source: &str) -> Vec<TypeParameter> {
        let Some(list) = child_by_field(owner, "type_parameters") else {
            self.scopes.push(HashMap::new());
            return Vec::new();
        };
        let params: Vec<Node<'_>> = named_children(list)
            .into_iter()
            .filter(|p| p.kind() == "type_parameter")
            .collect();

        // Names first, so bounds may refer to sibling parameters.
        let mut scope: HashMap<String, String> = HashMap::new();
        for p in &params {
            if let Some(name) = find_child_by_kind(*p, "type_identifier") {
                scope.insert(node_text(name, source).to_string(), "java.lang.Object".to_string());
            }
        }
        self.scopes.push(scope);

        let mut out = Vec::new();
        for p in params {
            let Some(name_node) = find_child_by_kind(p, "type_identifier") else {
                continue;
            };
            let name = node_text(name_node, source).to_string();
            let bounds: Vec<TypeStructure> = find_child_by_kind(p, "type_bound")
                .map(|b| {
                    named_children(b)
                        .into_iter()
                        .filter(|t| !is_annotation(t.kind()))
                        .map(|t| self.lower(t, source))
                        .collect()
                })
                .unwrap_or_default();
            let erasure = bounds
                .first()
                .and_then(|b| self.erasure(b))
                .unwrap_or_else(|| "java.lang.Object".to_string());
            if let Some(scope) = self.scopes.last_mut() {
                scope.insert(name.clone(), erasure);
            }
            out.push(TypeParameter { name, bounds });
        }
        out
    }

    fn erasure(&self, t: &TypeStructure) -> Option<String> {
        if let Some(var) = &t.type_variable {
            return self.type_variable_erasure(var).map(str::to_string);
        }
        t.class_name.clone()
    }

    // ── Encoding ───────────────────────────────────────────────────

    fn descriptor(&self, t: &TypeStructure) -> String {
        let mut out = "[".repeat(usize::from(t.array_depth));
        if let Some(p) = t.primitive {
            out.push(p.descriptor());
        } else {
            let name = self
                .erasure(t)
                .unwrap_or_else(|| "java.lang.Object".to_string());
            out.push_str(&descriptor_for_class(&name));
        }
        out
    }

    fn method_descriptor(&self, params: &[TypeStructure], ret: &TypeStructure) -> String {
        let mut out = String::from("(");
        for p in params {
            out.push_str(&self.descriptor(p));
        }
        out.push(')');
        out.push_str(&self.descriptor(ret));
        out
    }

    // ── Declarations ───────────────────────────────────────────────

    fn read_declaration(
        &mut self,
        node: Node<'_>,
        source: &str,
        outer: Option<&str>,
        out: &mut Vec<ClassStub>,
    ) {
        if !is_type_declaration(node.kind()) {
            return;
        }
        let Some(name_node) = child_by_field(node, "name") else {
            return;
        };
        let binary = self.qualify(node_text(name_node, source), outer);
        let kind = match node.kind() {
            "interface_declaration" => ClassKind::Interface,
            "enum_declaration" => ClassKind::Enum,
            "record_declaration" => ClassKind::Record,
            "annotation_type_declaration" => ClassKind::Annotation,
            _ => ClassKind::Class,
        };

        let mut stub = ClassStub::new(binary.clone(), kind, StubOrigin::Source);
        stub.annotations = self.annotation_descriptors(node, source);
        stub.is_abstract = kind == ClassKind::Class
            && find_child_by_kind(node, "modifiers")
                .is_some_and(|m| has_token(m, "abstract"));

        let type_params = self.push_type_parameters(node, source);

        let super_type = match kind {
            ClassKind::Class => Some(
                child_by_field(node, "superclass")
                    .and_then(|s| named_children(s).into_iter().find(|c| !is_annotation(c.kind())))
                    .map_or_else(
                        || TypeStructure::class("java.lang.Object"),
                        |t| self.lower(t, source),
                    ),
            ),
            ClassKind::Enum => Some(TypeStructure::generic(
                "java.lang.Enum",
                vec![TypeStructure::class(binary.clone())],
            )),
            ClassKind::Record => Some(TypeStructure::class("java.lang.Record")),
            ClassKind::Interface | ClassKind::Annotation => None,
        };

        let interface_list = match kind {
            ClassKind::Interface => find_child_by_kind(node, "extends_interfaces"),
            _ => child_by_field(node, "interfaces"),
        };
        let mut interfaces: Vec<TypeStructure> = interface_list
            .and_then(|l| find_child_by_kind(l, "type_list"))
            .map(|tl| {
                named_children(tl)
                    .into_iter()
                    .map(|t| self.lower(t, source))
                    .collect()
            })
            .unwrap_or_default();
        if kind == ClassKind::Annotation {
            interfaces.push(TypeStructure::class("java.lang.annotation.Annotation"));
        }

        stub.super_class = super_type.as_ref().and_then(|s| s.class_name.clone());
        stub.interfaces = interfaces
            .iter()
            .filter_map(|i| i.class_name.clone())
            .collect();

        let generic_header = !type_params.is_empty()
            || super_type.as_ref().is_some_and(TypeStructure::is_generic)
            || interfaces.iter().any(TypeStructure::is_generic);
        if generic_header {
            let mut sig = encode_type_parameters(&type_params);
            let object = TypeStructure::class("java.lang.Object");
            sig.push_str(&encode_signature(super_type.as_ref().unwrap_or(&object)));
            for i in &interfaces {
                sig.push_str(&encode_signature(i));
            }
            stub.signature = Some(sig);
        }

        if kind == ClassKind::Record {
            if let Some(params) = child_by_field(node, "parameters") {
                for (field, _) in self.read_parameters(params, source) {
                    stub.fields.push(field);
                }
            }
        }

        let mut nested = Vec::new();
        for member in body_members(node) {
            match member.kind() {
                "field_declaration" | "constant_declaration" => {
                    self.read_fields(member, source, &mut stub.fields);
                }
                "method_declaration"
                | "constructor_declaration"
                | "annotation_type_element_declaration" => {
                    if let Some(m) = self.read_method(member, source) {
                        stub.methods.push(m);
                    }
                }
                k if is_type_declaration(k) => nested.push(member),
                _ => {}
            }
        }

        stub.name_candidates = self.candidates.take();
        out.push(stub);
        for member in nested {
            self.read_declaration(member, source, Some(&binary), out);
        }
        self.scopes.pop();
    }

    fn read_fields(&self, node: Node<'_>, source: &str, out: &mut Vec<FieldStub>) {
        let Some(type_node) = child_by_field(node, "type") else {
            return;
        };
        let base = self.lower(type_node, source);
        let annotations = self.annotation_descriptors(node, source);

        let mut cursor = node.walk();
        for declarator in node.children_by_field_name("declarator", &mut cursor) {
            let Some(name) = child_by_field(declarator, "name") else {
                continue;
            };
            let dims = child_by_field(declarator, "dimensions")
                .map_or(0, |d| dimension_count(d, source));
            let t = base.clone().into_array(dims);
            out.push(FieldStub {
                name: node_text(name, source).to_string(),
                descriptor: self.descriptor(&t),
                signature: needs_signature(&t).then(|| encode_signature(&t)),
                annotations: annotations.clone(),
            });
        }
    }

    /// Formal parameters as record-component fields plus their
    /// per-parameter annotations.
    fn read_parameters(&self, params: Node<'_>, source: &str) -> Vec<(FieldStub, TypeStructure)> {
        let mut out = Vec::new();
        for p in named_children(params) {
            let (type_node, extra_dims, name) = match p.kind() {
                "formal_parameter" => {
                    let dims = child_by_field(p, "dimensions")
                        .map_or(0, |d| dimension_count(d, source));
                    let name = child_by_field(p, "name")
                        .map(|n| node_text(n, source).to_string())
                        .unwrap_or_default();
                    (child_by_field(p, "type"), dims, name)
                }
                "spread_parameter" => {
                    let type_node = named_children(p)
                        .into_iter()
                        .find(|c| c.kind() != "modifiers" && c.kind() != "variable_declarator");
                    let name = find_child_by_kind(p, "variable_declarator")
                        .and_then(|d| child_by_field(d, "name"))
                        .map(|n| node_text(n, source).to_string())
                        .unwrap_or_default();
                    (type_node, 1, name)
                }
                _ => continue,
            };
            let t = type_node
                .map_or_else(TypeStructure::object, |n| self.lower(n, source))
                .into_array(extra_dims);
            out.push((
                FieldStub {
                    name,
                    descriptor: self.descriptor(&t),
                    signature: needs_signature(&t).then(|| encode_signature(&t)),
                    annotations: self.annotation_descriptors(p, source),
                },
                t,
            ));
        }
        out
    }

    fn read_method(&mut self, node: Node<'_>, source: &str) -> Option<MethodStub> {
        let is_constructor = node.kind() == "constructor_declaration";
        let name = if is_constructor {
            "<init>".to_string()
        } else {
            node_text(child_by_field(node, "name")?, source).to_string()
        };

        let type_params = self.push_type_parameters(node, source);

        let params = child_by_field(node, "parameters")
            .map(|p| self.read_parameters(p, source))
            .unwrap_or_default();
        let return_type = if is_constructor {
            TypeStructure::primitive(Primitive::Void)
        } else {
            let dims = child_by_field(node, "dimensions").map_or(0, |d| dimension_count(d, source));
            child_by_field(node, "type")
                .map_or_else(TypeStructure::object, |t| self.lower(t, source))
                .into_array(dims)
        };

        let throws: Vec<TypeStructure> = find_child_by_kind(node, "throws")
            .map(|t| {
                named_children(t)
                    .into_iter()
                    .filter(|c| !is_annotation(c.kind()))
                    .map(|c| self.lower(c, source))
                    .collect()
            })
            .unwrap_or_default();

        let param_types: Vec<TypeStructure> = params.iter().map(|(_, t)| t.clone()).collect();
        let descriptor = self.method_descriptor(&param_types, &return_type);

        let variable_throws: Vec<&TypeStructure> =
            throws.iter().filter(|t| t.is_type_variable()).collect();
        let generic = !type_params.is_empty()
            || !variable_throws.is_empty()
            || needs_signature(&return_type)
            || param_types.iter().any(needs_signature);
        let signature = generic.then(|| {
            let mut sig = encode_type_parameters(&type_params);
            sig.push('(');
            for p in &param_types {
                sig.push_str(&encode_signature(p));
            }
            sig.push(')');
            sig.push_str(&encode_signature(&return_type));
            for t in &variable_throws {
                sig.push('^');
                sig.push_str(&encode_signature(t));
            }
            sig
        });

        let method = MethodStub {
            name,
            descriptor,
            signature,
            exceptions: throws.iter().filter_map(|t| t.class_name.clone()).collect(),
            annotations: self.annotation_descriptors(node, source),
            parameter_annotations: params.into_iter().map(|(f, _)| f.annotations).collect(),
        };
        self.scopes.pop();
        Some(method)
    }
}

fn is_annotation(kind: &str) -> bool {
    matches!(kind, "marker_annotation" | "annotation")
}

fn needs_signature(t: &TypeStructure) -> bool {
    t.is_generic() || t.is_type_variable()
}

/// Members of a declaration body, flattening the enum body's trailing
/// declaration section.
fn body_members(node: Node<'_>) -> Vec<Node<'_>> {
    let Some(body) = child_by_field(node, "body") else {
        return Vec::new();
    };
    let mut out = Vec::new();
    for child in named_children(body) {
        if child.kind() == "enum_body_declarations" {
            out.extend(named_children(child));
        } else {
            out.push(child);
        }
    }
    out
}

/// `com.acme.Outer.Inner` → `com.acme.Outer$Inner` (first capitalised
/// segment starts the class part).
fn binary_from_dotted(path: &str) -> String {
    let segments: Vec<&str> = path.split('.').collect();
    let class_start = segments
        .iter()
        .position(|s| s.starts_with(char::is_uppercase))
        .unwrap_or(segments.len().saturating_sub(1));
    let (pkg, class) = segments.split_at(class_start);
    let class = class.join("$");
    if pkg.is_empty() {
        class
    } else {
        format!("{}.{class}", pkg.join("."))
    }
}

fn encode_signature(t: &TypeStructure) -> String {
    let mut out = String::new();
    match t.wildcard {
        WildcardBound::Unbounded => return "*".to_string(),
        WildcardBound::Extends => out.push('+'),
        WildcardBound::Super => out.push('-'),
        WildcardBound::None => {}
    }
    out.push_str(&"[".repeat(usize::from(t.array_depth)));
    if let Some(p) = t.primitive {
        out.push(p.descriptor());
    } else if let Some(var) = &t.type_variable {
        out.push('T');
        out.push_str(var);
        out.push(';');
    } else {
        let name = t.class_name.as_deref().unwrap_or("java.lang.Object");
        out.push('L');
        out.push_str(&name.replace('.', "/"));
        if !t.type_arguments.is_empty() {
            out.push('<');
            for a in &t.type_arguments {
                out.push_str(&encode_signature(a));
            }
            out.push('>');
        }
        out.push(';');
    }
    out
}

fn encode_type_parameters(params: &[TypeParameter]) -> String {
    if params.is_empty() {
        return String::new();
    }
    let mut out = String::from("<");
    for p in params {
        out.push_str(&p.name);
        out.push(':');
        if p.bounds.is_empty() {
            out.push_str("Ljava/lang/Object;");
        }
        for (i, b) in p.bounds.iter().enumerate() {
            if i > 0 {
                out.push(':');
            }
            out.push_str(&encode_signature(b));
        }
    }
    out.push('>');
    out
}
