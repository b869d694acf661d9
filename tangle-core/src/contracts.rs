//! Canonical tag, property and metric keys.
//!
//! Inspectors name their `consumes` and `produces` sets with these
//! strings, and the CLI reads them back, so they live in one place.

/// Tags (presence markers).
pub mod tags {
    pub const FILE_READ: &str = "file.read";
    pub const LANG_JAVA_SOURCE: &str = "lang.java-source";
    pub const LANG_JAVA_BINARY: &str = "lang.java-binary";
    pub const SOURCE_PARSED: &str = "java.sourceParsed";
    pub const BINARY_PARSED: &str = "java.binaryParsed";
    pub const PACKAGE_INDEXED: &str = "package.indexed";

    pub const INTERFACE: &str = "java.interface";
    pub const ENUM: &str = "java.enum";
    pub const ANNOTATION: &str = "java.annotation";
    pub const RECORD: &str = "java.record";
    pub const ABSTRACT: &str = "java.abstract";
    pub const GENERIC: &str = "java.generic";

    pub const COUPLING_COMPUTED: &str = "coupling.computed";
    pub const COUPLING_CYCLE: &str = "coupling.cycle";

    /// Placeholder for a class outside the analysed code.
    pub const EXTERNAL: &str = "external";
    pub const EXTERNAL_PLATFORM: &str = "external.platform";
    pub const EXTERNAL_UNRESOLVED: &str = "external.unresolved";
}

/// Properties (arbitrary JSON values).
pub mod properties {
    pub const FILE_PATH: &str = "file.path";
    pub const FILE_EXTENSION: &str = "file.extension";
    pub const FILE_SIZE: &str = "file.size";
    pub const FILE_HASH: &str = "file.hash";

    pub const PACKAGE: &str = "java.package";
    pub const DECLARED_TYPES: &str = "java.declaredTypes";
    pub const CLASS_STUB: &str = "java.classStub";
    pub const SOURCE_FILE: &str = "java.sourceFile";
    pub const SIMPLE_NAME: &str = "java.simpleName";
    pub const PACKAGE_NAME: &str = "java.packageName";
    pub const CLASS_KIND: &str = "java.kind";
}

/// Metrics (numbers with keep-maximum merge).
pub mod metrics {
    pub const PACKAGE_TYPE_COUNT: &str = "package.typeCount";
    pub const MIGRATION_COMPLEXITY: &str = "migration.complexity";
    pub const COUPLING_EFFERENT: &str = "coupling.efferent";
    pub const COUPLING_AFFERENT: &str = "coupling.afferent";
    pub const COUPLING_INSTABILITY: &str = "coupling.instability";
}
