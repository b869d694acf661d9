// Integration test utilities and fixture builders for tangle.

use std::collections::HashMap;
use std::path::Path;

use tangle_core::config::TangleConfig;
use tangle_core::pipeline::{AnalysisPipeline, AnalysisReport};
use tangle_core::store::SqliteStore;

// ── Java project fixtures ──────────────────────────────────────────

/// A Java source (and class) tree in a temporary directory.
#[derive(Debug)]
pub struct JavaProject {
    pub dir: tempfile::TempDir,
}

impl JavaProject {
    pub fn empty() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create tempdir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `text` at `rel`, creating parent directories.
    #[must_use]
    pub fn with_file(self, rel: &str, text: &str) -> Self {
        self.write(rel, text.as_bytes());
        self
    }

    #[must_use]
    pub fn with_class_file(self, rel: &str, bytes: &[u8]) -> Self {
        self.write(rel, bytes);
        self
    }

    /// Write `.tangle/config.toml`.
    #[must_use]
    pub fn with_config(self, toml: &str) -> Self {
        self.with_file(".tangle/config.toml", toml)
    }

    pub fn write(&self, rel: &str, bytes: &[u8]) {
        let path = self.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, bytes).unwrap();
    }

    /// An order domain in `com.acme.shop`:
    ///
    /// - `Order extends Entity<Long> implements Priced`, holds
    ///   `List<LineItem>` and a `Customer`
    /// - `Customer` holds `Set<Order>` (cycle with `Order`)
    /// - `Entity<ID extends Serializable>` is abstract and generic
    /// - `Priced` is an interface, `Status` an enum, `LineItem` a record
    /// - `OrderService` depends on `Repository<Order>` and throws
    ///   `OrderException`
    pub fn order_domain() -> Self {
        Self::empty()
            .with_file(
                "src/main/java/com/acme/shop/Entity.java",
                "package com.acme.shop;\n\nimport java.io.Serializable;\n\npublic abstract class Entity<ID extends Serializable> {\n    protected ID id;\n    public ID getId() { return id; }\n}\n",
            )
            .with_file(
                "src/main/java/com/acme/shop/Priced.java",
                "package com.acme.shop;\n\nimport java.math.BigDecimal;\n\npublic interface Priced {\n    BigDecimal total();\n}\n",
            )
            .with_file(
                "src/main/java/com/acme/shop/Status.java",
                "package com.acme.shop;\n\npublic enum Status { OPEN, PAID, SHIPPED }\n",
            )
            .with_file(
                "src/main/java/com/acme/shop/LineItem.java",
                "package com.acme.shop;\n\nimport java.math.BigDecimal;\n\npublic record LineItem(String sku, int quantity, BigDecimal price) {}\n",
            )
            .with_file(
                "src/main/java/com/acme/shop/Order.java",
                "package com.acme.shop;\n\nimport java.math.BigDecimal;\nimport java.util.List;\n\npublic class Order extends Entity<Long> implements Priced {\n    private List<LineItem> items;\n    private Customer customer;\n    private Status status;\n\n    @Override\n    public BigDecimal total() { return BigDecimal.ZERO; }\n}\n",
            )
            .with_file(
                "src/main/java/com/acme/shop/Customer.java",
                "package com.acme.shop;\n\nimport java.util.Set;\n\npublic class Customer extends Entity<String> {\n    private Set<Order> orders;\n}\n",
            )
            .with_file(
                "src/main/java/com/acme/shop/Repository.java",
                "package com.acme.shop;\n\nimport java.util.Optional;\n\npublic interface Repository<T extends Entity<?>> {\n    Optional<T> find(Object id);\n}\n",
            )
            .with_file(
                "src/main/java/com/acme/shop/OrderException.java",
                "package com.acme.shop;\n\npublic class OrderException extends Exception {}\n",
            )
            .with_file(
                "src/main/java/com/acme/shop/OrderService.java",
                "package com.acme.shop;\n\npublic class OrderService {\n    private final Repository<Order> orders;\n\n    public OrderService(Repository<Order> orders) { this.orders = orders; }\n\n    public Order place(Customer customer) throws OrderException { return null; }\n}\n",
            )
    }
}

/// Run the full pipeline with the project's config over an in-memory store.
pub fn analyze(project: &JavaProject) -> (AnalysisReport, SqliteStore) {
    let config = TangleConfig::load(project.path()).expect("load config");
    analyze_with(project, config)
}

pub fn analyze_with(project: &JavaProject, config: TangleConfig) -> (AnalysisReport, SqliteStore) {
    let store = SqliteStore::in_memory().expect("open store");
    let pipeline = AnalysisPipeline::new(project.path(), config).expect("build pipeline");
    let report = pipeline.run(&store).expect("run pipeline");
    (report, store)
}

// ── Synthetic class files ──────────────────────────────────────────

pub const ACC_PUBLIC: u16 = 0x0001;
pub const ACC_BRIDGE: u16 = 0x0040;
pub const ACC_INTERFACE: u16 = 0x0200;
pub const ACC_ABSTRACT: u16 = 0x0400;
pub const ACC_SYNTHETIC: u16 = 0x1000;
pub const ACC_ANNOTATION: u16 = 0x2000;
pub const ACC_ENUM: u16 = 0x4000;

#[derive(Debug, Clone)]
struct Member {
    access: u16,
    name: String,
    descriptor: String,
    signature: Option<String>,
    exceptions: Vec<String>,
    annotations: Vec<String>,
}

/// Builds the bytes of a JVM class file with just enough structure for
/// the class-file reader: constant pool, supertypes, members and the
/// `Signature`, `Exceptions` and `RuntimeVisibleAnnotations` attributes.
///
/// Names are internal (`com/acme/Order`).
#[derive(Debug, Clone)]
pub struct ClassFileBuilder {
    access: u16,
    this_class: String,
    super_class: Option<String>,
    interfaces: Vec<String>,
    signature: Option<String>,
    annotations: Vec<String>,
    fields: Vec<Member>,
    methods: Vec<Member>,
    long_constants: Vec<i64>,
    unknown_attribute: bool,
}

impl ClassFileBuilder {
    pub fn class(internal_name: &str) -> Self {
        Self {
            access: ACC_PUBLIC,
            this_class: internal_name.to_string(),
            super_class: Some("java/lang/Object".to_string()),
            interfaces: Vec::new(),
            signature: None,
            annotations: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            long_constants: Vec::new(),
            unknown_attribute: false,
        }
    }

    pub fn interface(internal_name: &str) -> Self {
        Self::class(internal_name).access(ACC_PUBLIC | ACC_INTERFACE | ACC_ABSTRACT)
    }

    #[must_use]
    pub fn access(mut self, access: u16) -> Self {
        self.access = access;
        self
    }

    #[must_use]
    pub fn extends(mut self, internal_name: &str) -> Self {
        self.super_class = Some(internal_name.to_string());
        self
    }

    #[must_use]
    pub fn implements(mut self, internal_name: &str) -> Self {
        self.interfaces.push(internal_name.to_string());
        self
    }

    #[must_use]
    pub fn signature(mut self, signature: &str) -> Self {
        self.signature = Some(signature.to_string());
        self
    }

    /// Class-level annotation by descriptor (`Ljavax/inject/Singleton;`).
    #[must_use]
    pub fn annotated(mut self, descriptor: &str) -> Self {
        self.annotations.push(descriptor.to_string());
        self
    }

    #[must_use]
    pub fn field(mut self, name: &str, descriptor: &str, signature: Option<&str>) -> Self {
        self.fields.push(member(ACC_PUBLIC, name, descriptor, signature));
        self
    }

    #[must_use]
    pub fn method(
        mut self,
        name: &str,
        descriptor: &str,
        signature: Option<&str>,
        exceptions: &[&str],
    ) -> Self {
        let mut m = member(ACC_PUBLIC, name, descriptor, signature);
        m.exceptions = exceptions.iter().map(ToString::to_string).collect();
        self.methods.push(m);
        self
    }

    /// A compiler-generated method the reader must skip.
    #[must_use]
    pub fn synthetic_method(mut self, name: &str, descriptor: &str) -> Self {
        self.methods
            .push(member(ACC_SYNTHETIC | ACC_BRIDGE, name, descriptor, None));
        self
    }

    /// Add a `Long` constant, which takes two pool slots.
    #[must_use]
    pub fn long_constant(mut self, value: i64) -> Self {
        self.long_constants.push(value);
        self
    }

    /// Attach a class attribute the reader does not know.
    #[must_use]
    pub fn with_unknown_attribute(mut self) -> Self {
        self.unknown_attribute = true;
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut pool = Pool::default();
        for value in &self.long_constants {
            pool.long(*value);
        }

        let mut body = Vec::new();
        put_u2(&mut body, self.access);
        put_u2(&mut body, pool.class(&self.this_class));
        let super_index = self.super_class.as_deref().map_or(0, |s| pool.class(s));
        put_u2(&mut body, super_index);
        put_u2(&mut body, len_u16(self.interfaces.len()));
        for iface in &self.interfaces {
            put_u2(&mut body, pool.class(iface));
        }

        for members in [&self.fields, &self.methods] {
            put_u2(&mut body, len_u16(members.len()));
            for m in members {
                put_u2(&mut body, m.access);
                put_u2(&mut body, pool.utf8(&m.name));
                put_u2(&mut body, pool.utf8(&m.descriptor));
                let attrs = attributes(&mut pool, m.signature.as_deref(), &m.exceptions, &m.annotations);
                body.extend(attrs);
            }
        }

        let mut class_attrs = attributes(
            &mut pool,
            self.signature.as_deref(),
            &[],
            &self.annotations,
        );
        if self.unknown_attribute {
            // Patch the attribute count and append a skipped attribute.
            let count = u16::from_be_bytes([class_attrs[0], class_attrs[1]]) + 1;
            class_attrs[..2].copy_from_slice(&count.to_be_bytes());
            put_u2(&mut class_attrs, pool.utf8("SourceDebugExtension"));
            put_u4(&mut class_attrs, 3);
            class_attrs.extend([1, 2, 3]);
        }
        body.extend(class_attrs);

        let mut out = Vec::new();
        put_u4(&mut out, 0xCAFE_BABE);
        put_u2(&mut out, 0); // minor
        put_u2(&mut out, 61); // major: Java 17
        put_u2(&mut out, pool.next);
        out.extend(&pool.bytes);
        out.extend(body);
        out
    }
}

fn member(access: u16, name: &str, descriptor: &str, signature: Option<&str>) -> Member {
    Member {
        access,
        name: name.to_string(),
        descriptor: descriptor.to_string(),
        signature: signature.map(str::to_string),
        exceptions: Vec::new(),
        annotations: Vec::new(),
    }
}

fn attributes(
    pool: &mut Pool,
    signature: Option<&str>,
    exceptions: &[String],
    annotations: &[String],
) -> Vec<u8> {
    let mut out = Vec::new();
    let mut count = 0u16;
    let mut attrs = Vec::new();

    if let Some(sig) = signature {
        count += 1;
        put_u2(&mut attrs, pool.utf8("Signature"));
        put_u4(&mut attrs, 2);
        put_u2(&mut attrs, pool.utf8(sig));
    }
    if !exceptions.is_empty() {
        count += 1;
        put_u2(&mut attrs, pool.utf8("Exceptions"));
        put_u4(&mut attrs, 2 + 2 * len_u32(exceptions.len()));
        put_u2(&mut attrs, len_u16(exceptions.len()));
        for ex in exceptions {
            put_u2(&mut attrs, pool.class(ex));
        }
    }
    if !annotations.is_empty() {
        count += 1;
        put_u2(&mut attrs, pool.utf8("RuntimeVisibleAnnotations"));
        put_u4(&mut attrs, 2 + 4 * len_u32(annotations.len()));
        put_u2(&mut attrs, len_u16(annotations.len()));
        for a in annotations {
            put_u2(&mut attrs, pool.utf8(a));
            put_u2(&mut attrs, 0); // no element-value pairs
        }
    }

    put_u2(&mut out, count);
    out.extend(attrs);
    out
}

#[derive(Debug)]
struct Pool {
    bytes: Vec<u8>,
    next: u16,
    utf8: HashMap<String, u16>,
    classes: HashMap<String, u16>,
}

impl Default for Pool {
    fn default() -> Self {
        Self {
            bytes: Vec::new(),
            next: 1,
            utf8: HashMap::new(),
            classes: HashMap::new(),
        }
    }
}

impl Pool {
    fn utf8(&mut self, s: &str) -> u16 {
        if let Some(index) = self.utf8.get(s) {
            return *index;
        }
        let index = self.next;
        self.next += 1;
        let encoded = modified_utf8(s);
        self.bytes.push(1);
        put_u2(&mut self.bytes, len_u16(encoded.len()));
        self.bytes.extend(encoded);
        self.utf8.insert(s.to_string(), index);
        index
    }

    fn class(&mut self, internal_name: &str) -> u16 {
        if let Some(index) = self.classes.get(internal_name) {
            return *index;
        }
        let name = self.utf8(internal_name);
        let index = self.next;
        self.next += 1;
        self.bytes.push(7);
        put_u2(&mut self.bytes, name);
        self.classes.insert(internal_name.to_string(), index);
        index
    }

    fn long(&mut self, value: i64) {
        self.bytes.push(5);
        self.bytes.extend(value.to_be_bytes());
        self.next += 2;
    }
}

fn put_u2(out: &mut Vec<u8>, v: u16) {
    out.extend(v.to_be_bytes());
}

fn put_u4(out: &mut Vec<u8>, v: u32) {
    out.extend(v.to_be_bytes());
}

/// The class-file string encoding: UTF-16 units, NUL as two bytes.
fn modified_utf8(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len());
    for unit in s.encode_utf16() {
        match unit {
            0x01..=0x7F => out.push(unit as u8),
            0x00 | 0x80..=0x7FF => {
                out.push(0xC0 | (unit >> 6) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
            _ => {
                out.push(0xE0 | (unit >> 12) as u8);
                out.push(0x80 | ((unit >> 6) & 0x3F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
        }
    }
    out
}

fn len_u16(n: usize) -> u16 {
    u16::try_from(n).expect("fixture too large")
}

fn len_u32(n: usize) -> u32 {
    u32::try_from(n).expect("fixture too large")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn built_class_reads_back() {
        let bytes = ClassFileBuilder::class("com/acme/Order")
            .extends("com/acme/Entity")
            .implements("com/acme/Priced")
            .long_constant(42)
            .field("items", "Ljava/util/List;", Some("Ljava/util/List<Lcom/acme/LineItem;>;"))
            .method("place", "()V", None, &["com/acme/OrderException"])
            .synthetic_method("access$000", "()V")
            .annotated("Ljavax/inject/Singleton;")
            .with_unknown_attribute()
            .build();

        let stub = tangle_graphs::classfile::read_class(&bytes).unwrap();
        assert_eq!(stub.name, "com.acme.Order");
        assert_eq!(stub.super_class.as_deref(), Some("com.acme.Entity"));
        assert_eq!(stub.interfaces, ["com.acme.Priced"]);
        assert_eq!(stub.fields.len(), 1);
        assert_eq!(stub.methods.len(), 1);
        assert_eq!(stub.methods[0].exceptions, ["com.acme.OrderException"]);
        assert_eq!(stub.annotations, ["Ljavax/inject/Singleton;"]);
    }
}
