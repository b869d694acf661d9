//! Coupling edge derivation.
//!
//! [`CouplingGraphBuilder`] walks the declared shape of one class (its
//! header, fields, methods and annotations), parses every type reference
//! and emits typed, deduplicated edges. It never touches a store: callers
//! receive a [`CouplingReport`] and decide how to commit it.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::signature::{self, Degradation};
use crate::stub::{ClassStub, class_name_from_descriptor};
use crate::type_structure::{TypeParameter, TypeStructure, WildcardBound};

// ── Edge vocabulary ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipKind {
    Extends,
    Implements,
    Uses,
    AnnotatedWith,
    TypeParameter,
    Throws,
    TypeVariable,
}

impl RelationshipKind {
    pub const ALL: [Self; 7] = [
        Self::Extends,
        Self::Implements,
        Self::Uses,
        Self::AnnotatedWith,
        Self::TypeParameter,
        Self::Throws,
        Self::TypeVariable,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Extends => "extends",
            Self::Implements => "implements",
            Self::Uses => "uses",
            Self::AnnotatedWith => "annotated_with",
            Self::TypeParameter => "type_parameter",
            Self::Throws => "throws",
            Self::TypeVariable => "type_variable",
        }
    }

    /// `uses` and its two refinements.
    pub fn is_usage(self) -> bool {
        matches!(self, Self::Uses | Self::TypeParameter | Self::TypeVariable)
    }
}

impl fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelationshipKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown relationship kind: {s}"))
    }
}

/// Bound of a wildcard type argument that produced an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WildcardKind {
    Extends,
    Super,
}

impl WildcardKind {
    pub fn from_bound(bound: WildcardBound) -> Option<Self> {
        match bound {
            WildcardBound::Extends => Some(Self::Extends),
            WildcardBound::Super => Some(Self::Super),
            WildcardBound::None | WildcardBound::Unbounded => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Extends => "extends",
            Self::Super => "super",
        }
    }
}

impl FromStr for WildcardKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "extends" => Ok(Self::Extends),
            "super" => Ok(Self::Super),
            other => Err(format!("unknown wildcard kind: {other}")),
        }
    }
}

/// Structural attributes of an edge that came from a type argument.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct EdgeProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_argument_index: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wildcard_kind: Option<WildcardKind>,
}

impl EdgeProperties {
    pub fn is_empty(&self) -> bool {
        self.container_type.is_none()
            && self.type_argument_index.is_none()
            && self.wildcard_kind.is_none()
    }
}

/// One derived edge. Field order is the identity order, so the derived
/// `Ord` makes a `BTreeSet<CouplingEdge>` deduplicate on the full tuple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CouplingEdge {
    pub source: String,
    pub target: String,
    pub kind: RelationshipKind,
    #[serde(default)]
    pub properties: EdgeProperties,
}

impl fmt::Display for CouplingEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} [{}", self.source, self.target, self.kind)?;
        if let Some(c) = &self.properties.container_type {
            write!(f, " container={c}")?;
        }
        if let Some(i) = self.properties.type_argument_index {
            write!(f, " index={i}")?;
        }
        if let Some(w) = self.properties.wildcard_kind {
            write!(f, " wildcard={}", w.as_str())?;
        }
        f.write_str("]")
    }
}

// ── Options ────────────────────────────────────────────────────────

/// What to do with an edge whose target is outside the analysed code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExternalPolicy {
    #[default]
    Drop,
    Placeholder,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouplingOptions {
    /// Binary-name prefixes of the platform library.
    pub platform_prefixes: Vec<String>,
    pub platform_policy: ExternalPolicy,
}

impl Default for CouplingOptions {
    fn default() -> Self {
        Self {
            platform_prefixes: ["java.", "javax.", "jdk.", "sun.", "com.sun."]
                .into_iter()
                .map(String::from)
                .collect(),
            platform_policy: ExternalPolicy::Drop,
        }
    }
}

impl CouplingOptions {
    /// Options that keep every edge, platform targets included.
    pub fn keep_all() -> Self {
        Self {
            platform_prefixes: Vec::new(),
            platform_policy: ExternalPolicy::Drop,
        }
    }

    pub fn is_platform(&self, class_name: &str) -> bool {
        self.platform_prefixes
            .iter()
            .any(|p| class_name.starts_with(p.as_str()))
    }
}

// ── Report ─────────────────────────────────────────────────────────

/// A parse degradation tied to the member it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberDegradation {
    /// `Class`, `Class#field` or `Class#method(descriptor)`.
    pub member: String,
    pub degradation: Degradation,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouplingReport {
    pub edges: BTreeSet<CouplingEdge>,
    /// Platform targets kept under [`ExternalPolicy::Placeholder`].
    pub platform_targets: BTreeSet<String>,
    /// Edges suppressed by the platform filter.
    pub filtered: usize,
    pub degradations: Vec<MemberDegradation>,
    /// Deepest generic nesting seen in any member type.
    pub max_generic_depth: usize,
    /// Bounds declared on class and method type parameters.
    pub type_variable_bounds: usize,
}

impl CouplingReport {
    /// Distinct edge targets: the class's efferent coupling.
    pub fn efferent(&self) -> usize {
        self.edges
            .iter()
            .map(|e| e.target.as_str())
            .collect::<BTreeSet<_>>()
            .len()
    }
}

// ── Builder ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct CouplingGraphBuilder {
    options: CouplingOptions,
}

impl CouplingGraphBuilder {
    pub fn new(options: CouplingOptions) -> Self {
        Self { options }
    }

    /// Derive every edge implied by the declared shape of `stub`, with
    /// no classes known beyond the platform prefixes.
    pub fn build(&self, stub: &ClassStub) -> CouplingReport {
        self.build_resolved(stub, &|_: &str| false)
    }

    /// Like [`build`](Self::build), settling each of the stub's
    /// [`name_candidates`](ClassStub::name_candidates) on the first
    /// candidate `is_known` accepts, else the first platform candidate,
    /// else the written name.
    pub fn build_resolved(&self, stub: &ClassStub, is_known: &dyn Fn(&str) -> bool) -> CouplingReport {
        let mut walk = Walk {
            options: &self.options,
            source: &stub.name,
            candidates: &stub.name_candidates,
            is_known,
            report: CouplingReport::default(),
        };

        let header = signature::parse_class(
            stub.signature.as_deref(),
            stub.super_class.as_deref(),
            &stub.interfaces,
        );
        walk.note(&stub.name, header.degradation);
        let header = header.value;
        if let Some(sup) = &header.super_class {
            walk.reference(sup, RelationshipKind::Extends);
        }
        for iface in &header.interfaces {
            walk.reference(iface, RelationshipKind::Implements);
        }
        walk.type_parameters(&header.type_parameters);
        walk.annotations(&stub.annotations);

        for field in &stub.fields {
            let parsed = signature::parse(&field.descriptor, field.signature.as_deref());
            walk.note(&format!("{}#{}", stub.name, field.name), parsed.degradation);
            walk.reference(&parsed.value, RelationshipKind::Uses);
            walk.annotations(&field.annotations);
        }

        for method in &stub.methods {
            let parsed = signature::parse_method(&method.descriptor, method.signature.as_deref());
            walk.note(
                &format!("{}#{}{}", stub.name, method.name, method.descriptor),
                parsed.degradation,
            );
            let m = parsed.value;
            walk.type_parameters(&m.type_parameters);
            for p in &m.parameters {
                walk.reference(p, RelationshipKind::Uses);
            }
            if let Some(ret) = &m.return_type {
                walk.reference(ret, RelationshipKind::Uses);
            }

            // A signature lists throws only when one of them is generic;
            // otherwise the `Exceptions` attribute is authoritative.
            if m.throws.is_empty() {
                for ex in &method.exceptions {
                    walk.emit(ex, RelationshipKind::Throws, EdgeProperties::default());
                }
            } else {
                for t in &m.throws {
                    walk.reference(t, RelationshipKind::Throws);
                }
            }

            walk.annotations(&method.annotations);
            for param in &method.parameter_annotations {
                walk.annotations(param);
            }
        }

        let report = walk.report;
        debug!(
            class = %stub.name,
            edges = report.edges.len(),
            filtered = report.filtered,
            degraded = report.degradations.len(),
            "Built coupling edges"
        );
        report
    }
}

struct Walk<'a> {
    options: &'a CouplingOptions,
    source: &'a str,
    candidates: &'a BTreeMap<String, Vec<String>>,
    is_known: &'a dyn Fn(&str) -> bool,
    report: CouplingReport,
}

impl Walk<'_> {
    fn settle(&self, written: &str) -> String {
        let Some(candidates) = self.candidates.get(written) else {
            return written.to_string();
        };
        candidates
            .iter()
            .find(|c| (self.is_known)(c))
            .or_else(|| candidates.iter().find(|c| self.options.is_platform(c)))
            .map_or_else(|| written.to_string(), Clone::clone)
    }

    fn note(&mut self, member: &str, degradation: Option<Degradation>) {
        if let Some(degradation) = degradation {
            debug!(member, reason = %degradation.reason, "Signature degraded to descriptor");
            self.report.degradations.push(MemberDegradation {
                member: member.to_string(),
                degradation,
            });
        }
    }

    /// Edge to the outermost class, then its arguments depth-first.
    fn reference(&mut self, t: &TypeStructure, kind: RelationshipKind) {
        self.report.max_generic_depth = self.report.max_generic_depth.max(t.generic_depth());
        if let Some(name) = &t.class_name {
            self.emit(name, kind, EdgeProperties::default());
        }
        self.arguments(t);
    }

    fn arguments(&mut self, t: &TypeStructure) {
        if let Some(enclosing) = &t.enclosing {
            self.arguments(enclosing);
        }
        for (index, arg) in t.type_arguments.iter().enumerate() {
            if arg.wildcard == WildcardBound::Unbounded {
                continue;
            }
            if let Some(name) = &arg.class_name {
                let props = EdgeProperties {
                    container_type: t.class_name.as_deref().map(|c| self.settle(c)),
                    type_argument_index: u32::try_from(index).ok(),
                    wildcard_kind: WildcardKind::from_bound(arg.wildcard),
                };
                self.emit(name, RelationshipKind::TypeParameter, props);
            }
            self.arguments(arg);
        }
    }

    fn type_parameters(&mut self, params: &[TypeParameter]) {
        for p in params {
            for bound in &p.bounds {
                self.report.type_variable_bounds += 1;
                self.report.max_generic_depth =
                    self.report.max_generic_depth.max(bound.generic_depth());
                if let Some(name) = &bound.class_name {
                    self.emit(name, RelationshipKind::TypeVariable, EdgeProperties::default());
                }
                self.arguments(bound);
            }
        }
    }

    fn annotations(&mut self, descriptors: &[String]) {
        for d in descriptors {
            if let Some(name) = class_name_from_descriptor(d) {
                self.emit(&name, RelationshipKind::AnnotatedWith, EdgeProperties::default());
            }
        }
    }

    fn emit(&mut self, target: &str, kind: RelationshipKind, properties: EdgeProperties) {
        let target = self.settle(target);
        let target = target.as_str();
        if target == self.source {
            return;
        }
        if self.options.is_platform(target) {
            match self.options.platform_policy {
                ExternalPolicy::Drop => {
                    self.report.filtered += 1;
                    return;
                }
                ExternalPolicy::Placeholder => {
                    self.report.platform_targets.insert(target.to_string());
                }
            }
        }
        self.report.edges.insert(CouplingEdge {
            source: self.source.to_string(),
            target: target.to_string(),
            kind,
            properties,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stub::{ClassKind, FieldStub, MethodStub, StubOrigin};

    fn field(name: &str, descriptor: &str, signature: Option<&str>) -> FieldStub {
        FieldStub {
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            signature: signature.map(str::to_string),
            annotations: Vec::new(),
        }
    }

    fn class_with(name: &str, fields: Vec<FieldStub>) -> ClassStub {
        let mut stub = ClassStub::new(name, ClassKind::Class, StubOrigin::Binary);
        stub.fields = fields;
        stub
    }

    fn render(report: &CouplingReport) -> String {
        report
            .edges
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn nested_generics_yield_four_usage_edges() {
        let stub = class_with(
            "com.acme.Holder",
            vec![field(
                "byGroup",
                "Ljava/util/Map;",
                Some("Ljava/util/Map<Ljava/lang/String;Ljava/util/List<Lcom/acme/User;>;>;"),
            )],
        );
        let report = CouplingGraphBuilder::new(CouplingOptions::keep_all()).build(&stub);

        assert_eq!(report.edges.len(), 4);
        assert!(report.edges.iter().all(|e| e.kind.is_usage()));
        insta::assert_snapshot!(render(&report), @r"
        com.acme.Holder -> com.acme.User [type_parameter container=java.util.List index=0]
        com.acme.Holder -> java.lang.String [type_parameter container=java.util.Map index=0]
        com.acme.Holder -> java.util.List [type_parameter container=java.util.Map index=1]
        com.acme.Holder -> java.util.Map [uses]
        ");
        assert_eq!(report.max_generic_depth, 2);
    }

    #[test]
    fn self_references_are_dropped() {
        let stub = class_with(
            "com.acme.Node",
            vec![
                field("next", "Lcom/acme/Node;", None),
                field(
                    "children",
                    "Ljava/util/List;",
                    Some("Ljava/util/List<Lcom/acme/Node;>;"),
                ),
            ],
        );
        let report = CouplingGraphBuilder::new(CouplingOptions::keep_all()).build(&stub);
        assert!(report.edges.iter().all(|e| e.target != "com.acme.Node"));
        assert_eq!(report.edges.len(), 1);
    }

    #[test]
    fn bounded_wildcard_sets_wildcard_kind() {
        let stub = class_with(
            "com.acme.Stats",
            vec![
                field(
                    "values",
                    "Ljava/util/List;",
                    Some("Ljava/util/List<+Ljava/lang/Number;>;"),
                ),
                field("any", "Ljava/util/List;", Some("Ljava/util/List<*>;")),
            ],
        );
        let report = CouplingGraphBuilder::new(CouplingOptions::keep_all()).build(&stub);
        let number: Vec<&CouplingEdge> = report
            .edges
            .iter()
            .filter(|e| e.target == "java.lang.Number")
            .collect();
        assert_eq!(number.len(), 1);
        assert_eq!(number[0].kind, RelationshipKind::TypeParameter);
        assert_eq!(number[0].properties.wildcard_kind, Some(WildcardKind::Extends));
        assert_eq!(number[0].properties.container_type.as_deref(), Some("java.util.List"));
        assert_eq!(number[0].properties.type_argument_index, Some(0));
        // `List<?>` adds nothing beyond the shared `List` usage edge.
        assert_eq!(report.edges.len(), 2);
    }

    #[test]
    fn rebuilding_is_byte_identical() {
        let stub = class_with(
            "com.acme.Holder",
            vec![
                field("a", "Lcom/acme/User;", None),
                field("b", "Lcom/acme/User;", None),
                field("c", "Ljava/util/List;", Some("Ljava/util/List<Lcom/acme/User;>;")),
            ],
        );
        let builder = CouplingGraphBuilder::new(CouplingOptions::keep_all());
        let first = serde_json::to_vec(&builder.build(&stub).edges).unwrap();
        let second = serde_json::to_vec(&builder.build(&stub).edges).unwrap();
        assert_eq!(first, second);
        assert_eq!(builder.build(&stub).edges.len(), 3);
    }

    #[test]
    fn platform_targets_are_dropped_by_default() {
        let stub = class_with(
            "com.acme.Holder",
            vec![field(
                "users",
                "Ljava/util/List;",
                Some("Ljava/util/List<Lcom/acme/User;>;"),
            )],
        );
        let report = CouplingGraphBuilder::default().build(&stub);
        assert_eq!(report.edges.len(), 1);
        let edge = report.edges.first().unwrap();
        assert_eq!(edge.target, "com.acme.User");
        assert_eq!(edge.properties.container_type.as_deref(), Some("java.util.List"));
        assert_eq!(report.filtered, 1);
        assert!(report.platform_targets.is_empty());
    }

    #[test]
    fn placeholder_policy_keeps_platform_targets() {
        let stub = class_with("com.acme.Holder", vec![field("s", "Ljava/lang/String;", None)]);
        let options = CouplingOptions {
            platform_policy: ExternalPolicy::Placeholder,
            ..CouplingOptions::default()
        };
        let report = CouplingGraphBuilder::new(options).build(&stub);
        assert_eq!(report.edges.len(), 1);
        assert!(report.platform_targets.contains("java.lang.String"));
    }

    #[test]
    fn primitives_never_produce_edges() {
        let stub = class_with(
            "com.acme.Counter",
            vec![field("n", "I", None), field("grid", "[[J", None)],
        );
        let report = CouplingGraphBuilder::new(CouplingOptions::keep_all()).build(&stub);
        assert!(report.edges.is_empty());
    }

    #[test]
    fn header_members_and_annotations() {
        let mut stub = ClassStub::new("com.acme.Service", ClassKind::Class, StubOrigin::Binary);
        stub.signature =
            Some("<T:Lcom/acme/Entity;>Lcom/acme/Base<TT;>;Lcom/acme/Api;".to_string());
        stub.super_class = Some("com.acme.Base".to_string());
        stub.interfaces = vec!["com.acme.Api".to_string()];
        stub.annotations = vec!["Lcom/acme/Marker;".to_string(), "Lcom/acme/Marker;".to_string()];
        stub.fields.push(field("items", "[Lcom/acme/Item;", None));
        stub.methods.push(MethodStub {
            name: "run".to_string(),
            descriptor: "(Lcom/acme/Request;)Lcom/acme/Response;".to_string(),
            signature: None,
            exceptions: vec!["com.acme.Failure".to_string()],
            annotations: vec!["Lcom/acme/Timed;".to_string()],
            parameter_annotations: vec![vec!["Lcom/acme/Valid;".to_string()]],
        });

        let report = CouplingGraphBuilder::new(CouplingOptions::keep_all()).build(&stub);
        let kind_of = |target: &str| -> Vec<RelationshipKind> {
            report
                .edges
                .iter()
                .filter(|e| e.target == target)
                .map(|e| e.kind)
                .collect()
        };

        assert_eq!(kind_of("com.acme.Base"), vec![RelationshipKind::Extends]);
        assert_eq!(kind_of("com.acme.Api"), vec![RelationshipKind::Implements]);
        assert_eq!(kind_of("com.acme.Entity"), vec![RelationshipKind::TypeVariable]);
        assert_eq!(kind_of("com.acme.Marker"), vec![RelationshipKind::AnnotatedWith]);
        assert_eq!(kind_of("com.acme.Item"), vec![RelationshipKind::Uses]);
        assert_eq!(kind_of("com.acme.Request"), vec![RelationshipKind::Uses]);
        assert_eq!(kind_of("com.acme.Response"), vec![RelationshipKind::Uses]);
        assert_eq!(kind_of("com.acme.Failure"), vec![RelationshipKind::Throws]);
        assert_eq!(kind_of("com.acme.Timed"), vec![RelationshipKind::AnnotatedWith]);
        assert_eq!(kind_of("com.acme.Valid"), vec![RelationshipKind::AnnotatedWith]);
        assert_eq!(report.type_variable_bounds, 1);
        assert!(report.degradations.is_empty());
        assert_eq!(report.efferent(), 10);
    }

    #[test]
    fn generic_throws_come_from_the_signature() {
        let mut stub = ClassStub::new("com.acme.Task", ClassKind::Class, StubOrigin::Binary);
        stub.methods.push(MethodStub {
            name: "call".to_string(),
            descriptor: "()V".to_string(),
            signature: Some("<X:Lcom/acme/Failure;>()V^TX;^Lcom/acme/Timeout;".to_string()),
            exceptions: vec!["com.acme.Failure".to_string(), "com.acme.Timeout".to_string()],
            annotations: Vec::new(),
            parameter_annotations: Vec::new(),
        });
        let report = CouplingGraphBuilder::new(CouplingOptions::keep_all()).build(&stub);
        let rendered = render(&report);
        assert!(rendered.contains("com.acme.Task -> com.acme.Failure [type_variable]"));
        assert!(rendered.contains("com.acme.Task -> com.acme.Timeout [throws]"));
        assert_eq!(report.edges.len(), 2);
    }

    #[test]
    fn degraded_signature_still_couples_to_erasure() {
        let stub = class_with(
            "com.acme.Holder",
            vec![field("users", "Lcom/acme/Users;", Some("Lcom/acme/Users<"))],
        );
        let report = CouplingGraphBuilder::new(CouplingOptions::keep_all()).build(&stub);
        assert_eq!(report.degradations.len(), 1);
        assert_eq!(report.degradations[0].member, "com.acme.Holder#users");
        assert_eq!(report.edges.len(), 1);
        assert_eq!(report.edges.first().unwrap().target, "com.acme.Users");
    }

    #[test]
    fn name_candidates_settle_on_known_classes() {
        let mut stub = class_with(
            "com.acme.Ledger",
            vec![
                field("last", "Ljava/lang/Record;", None),
                field("owner", "Lcom/acme/User;", None),
                field("tags", "Ljava/util/List;", Some("Ljava/util/List<Lcom/acme/Tag;>;")),
            ],
        );
        stub.name_candidates = BTreeMap::from([
            (
                "java.lang.Record".to_string(),
                vec!["com.acme.Record".to_string(), "java.lang.Record".to_string()],
            ),
            (
                "com.acme.User".to_string(),
                vec!["com.acme.User".to_string(), "com.acme.model.User".to_string()],
            ),
            (
                "com.acme.Tag".to_string(),
                vec!["com.acme.Tag".to_string(), "com.acme.model.Tag".to_string()],
            ),
        ]);
        let builder = CouplingGraphBuilder::default();

        let known = ["com.acme.Record", "com.acme.model.User", "com.acme.model.Tag"];
        let report = builder.build_resolved(&stub, &|n: &str| known.contains(&n));
        insta::assert_snapshot!(render(&report), @r"
        com.acme.Ledger -> com.acme.Record [uses]
        com.acme.Ledger -> com.acme.model.Tag [type_parameter container=java.util.List index=0]
        com.acme.Ledger -> com.acme.model.User [uses]
        ");

        // Nothing known: the platform candidate wins, else the written name
        let report = builder.build(&stub);
        let targets: Vec<&str> = report.edges.iter().map(|e| e.target.as_str()).collect();
        assert_eq!(targets, vec!["com.acme.Tag", "com.acme.User"]);
        assert_eq!(report.filtered, 2);
    }

    #[test]
    fn relationship_kind_round_trips_through_strings() {
        for kind in RelationshipKind::ALL {
            assert_eq!(kind.as_str().parse::<RelationshipKind>(), Ok(kind));
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
        assert!("contains".parse::<RelationshipKind>().is_err());
    }
}
