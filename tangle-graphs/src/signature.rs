//! JVM descriptor and generic-signature parsing.
//!
//! Every entry point is total: malformed input never panics and never
//! returns an error. When a generic signature cannot be read, or disagrees
//! with the erased descriptor, the result falls back to the descriptor's
//! flat shape and a [`Degradation`] records why.

use serde::{Deserialize, Serialize};

use crate::type_structure::{
    ClassType, MethodType, Primitive, TypeParameter, TypeStructure, WildcardBound,
};

/// Nesting bound for hostile input; real code stays far below it.
const MAX_DEPTH: usize = 64;

/// Why a parse fell back to a conservative shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Degradation {
    /// The text that could not be used (signature, or descriptor).
    pub input: String,
    pub reason: String,
}

/// A parse result that always carries a usable value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOutcome<T> {
    pub value: T,
    pub degradation: Option<Degradation>,
}

impl<T> ParseOutcome<T> {
    fn clean(value: T) -> Self {
        Self {
            value,
            degradation: None,
        }
    }

    fn degraded(value: T, input: &str, reason: impl Into<String>) -> Self {
        Self {
            value,
            degradation: Some(Degradation {
                input: input.to_string(),
                reason: reason.into(),
            }),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degradation.is_some()
    }
}

/// Convert an internal name (`java/util/Map$Entry`) to a binary name
/// (`java.util.Map$Entry`).
pub fn internal_to_binary(name: &str) -> String {
    name.replace('/', ".")
}

// ── Entry points ───────────────────────────────────────────────────

/// Parse a field (or any single value) type.
pub fn parse(descriptor: &str, signature: Option<&str>) -> ParseOutcome<TypeStructure> {
    let erased = Cursor::new(descriptor).complete(Cursor::java_type);

    let Some(sig) = signature.filter(|s| !s.is_empty()) else {
        return match erased {
            Ok(t) => ParseOutcome::clean(t),
            Err(e) => ParseOutcome::degraded(TypeStructure::object(), descriptor, e),
        };
    };

    match (Cursor::new(sig).complete(Cursor::java_type), erased) {
        (Ok(generic), Ok(flat)) => {
            if shapes_agree(&generic, &flat) {
                ParseOutcome::clean(generic)
            } else {
                ParseOutcome::degraded(flat, sig, "signature disagrees with descriptor")
            }
        }
        (Ok(generic), Err(e)) => {
            ParseOutcome::degraded(generic, descriptor, format!("descriptor unparseable: {e}"))
        }
        (Err(e), Ok(flat)) => ParseOutcome::degraded(flat, sig, e),
        (Err(e), Err(_)) => ParseOutcome::degraded(TypeStructure::object(), sig, e),
    }
}

/// Parse a method's parameter, return and throws types.
pub fn parse_method(descriptor: &str, signature: Option<&str>) -> ParseOutcome<MethodType> {
    let erased = Cursor::new(descriptor).complete(Cursor::method_descriptor);

    let Some(sig) = signature.filter(|s| !s.is_empty()) else {
        return match erased {
            Ok(m) => ParseOutcome::clean(m),
            Err(e) => ParseOutcome::degraded(MethodType::default(), descriptor, e),
        };
    };

    match (Cursor::new(sig).complete(Cursor::method_signature), erased) {
        (Ok(generic), Ok(flat)) => {
            if generic.parameters.len() != flat.parameters.len() {
                let reason = format!(
                    "signature declares {} parameters, descriptor {}",
                    generic.parameters.len(),
                    flat.parameters.len()
                );
                ParseOutcome::degraded(flat, sig, reason)
            } else if generic.return_type.is_some() != flat.return_type.is_some() {
                ParseOutcome::degraded(flat, sig, "return type disagrees with descriptor")
            } else {
                ParseOutcome::clean(generic)
            }
        }
        (Ok(generic), Err(e)) => {
            ParseOutcome::degraded(generic, descriptor, format!("descriptor unparseable: {e}"))
        }
        (Err(e), Ok(flat)) => ParseOutcome::degraded(flat, sig, e),
        (Err(e), Err(_)) => ParseOutcome::degraded(MethodType::default(), sig, e),
    }
}

/// Parse a class's type parameters, superclass and interfaces.
///
/// `super_class` and `interfaces` are the erased names (internal or
/// binary form) used when the signature is absent or unusable.
pub fn parse_class(
    signature: Option<&str>,
    super_class: Option<&str>,
    interfaces: &[String],
) -> ParseOutcome<ClassType> {
    let erased = ClassType {
        type_parameters: Vec::new(),
        super_class: super_class.map(|s| TypeStructure::class(internal_to_binary(s))),
        interfaces: interfaces
            .iter()
            .map(|i| TypeStructure::class(internal_to_binary(i)))
            .collect(),
    };

    let Some(sig) = signature.filter(|s| !s.is_empty()) else {
        return ParseOutcome::clean(erased);
    };

    match Cursor::new(sig).complete(Cursor::class_signature) {
        Ok(mut generic) => {
            if generic.interfaces.len() != erased.interfaces.len() {
                return ParseOutcome::degraded(
                    erased,
                    sig,
                    format!(
                        "signature declares {} interfaces, class file {}",
                        generic.interfaces.len(),
                        interfaces.len()
                    ),
                );
            }
            // Interfaces carry `Object` as superclass in their signature.
            if super_class.is_none() {
                generic.super_class = None;
            }
            ParseOutcome::clean(generic)
        }
        Err(e) => ParseOutcome::degraded(erased, sig, e),
    }
}

fn shapes_agree(generic: &TypeStructure, flat: &TypeStructure) -> bool {
    if generic.array_depth != flat.array_depth {
        // `T[]` erases to its bound's array; depth still has to match.
        return false;
    }
    if generic.is_type_variable() {
        return flat.class_name.is_some();
    }
    generic.class_name == flat.class_name && generic.primitive == flat.primitive
}

// ── Cursor ─────────────────────────────────────────────────────────

type PResult<T> = std::result::Result<T, String>;

struct Cursor<'a> {
    src: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0, depth: 0 }
    }

    /// Run `f` and require it to consume the whole input.
    fn complete<T>(mut self, f: impl FnOnce(&mut Self) -> PResult<T>) -> PResult<T> {
        let value = f(&mut self)?;
        if self.pos == self.src.len() {
            Ok(value)
        } else {
            Err(format!("trailing input at offset {}", self.pos))
        }
    }

    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    fn expect(&mut self, want: u8) -> PResult<()> {
        match self.bump() {
            Some(b) if b == want => Ok(()),
            Some(b) => Err(format!(
                "expected '{}' at offset {}, found '{}'",
                want as char,
                self.pos - 1,
                b as char
            )),
            None => Err(format!("expected '{}', found end of input", want as char)),
        }
    }

    /// Read an identifier up to (not including) one of `stops`.
    fn identifier(&mut self, stops: &[u8]) -> PResult<&'a str> {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if stops.contains(&b) {
                break;
            }
            self.pos += 1;
        }
        if self.pos == start {
            return Err(format!("empty identifier at offset {start}"));
        }
        // Stops are all ASCII, so this never splits a UTF-8 sequence.
        self.src
            .get(start..self.pos)
            .ok_or_else(|| format!("invalid identifier at offset {start}"))
    }

    fn enter(&mut self) -> PResult<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            Err(format!("nesting deeper than {MAX_DEPTH}"))
        } else {
            Ok(())
        }
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    // ── Grammar ────────────────────────────────────────────────────

    fn java_type(&mut self) -> PResult<TypeStructure> {
        self.enter()?;
        let result = match self.peek() {
            Some(b'L') => self.class_type(),
            Some(b'T') => self.type_variable(),
            Some(b'[') => {
                self.bump();
                self.java_type().map(|t| t.into_array(1))
            }
            Some(c) => match Primitive::from_descriptor(c as char) {
                Some(Primitive::Void) | None => {
                    Err(format!("unexpected '{}' at offset {}", c as char, self.pos))
                }
                Some(p) => {
                    self.bump();
                    Ok(TypeStructure::primitive(p))
                }
            },
            None => Err("unexpected end of input".to_string()),
        };
        self.leave();
        result
    }

    fn type_variable(&mut self) -> PResult<TypeStructure> {
        self.expect(b'T')?;
        let name = self.identifier(b";<>.:/[")?;
        self.expect(b';')?;
        Ok(TypeStructure::variable(name))
    }

    fn class_type(&mut self) -> PResult<TypeStructure> {
        self.expect(b'L')?;
        let mut name = internal_to_binary(self.identifier(b";<>.:[")?);
        let mut args = self.optional_type_arguments()?;
        let mut enclosing: Option<Box<TypeStructure>> = None;

        while self.peek() == Some(b'.') {
            self.bump();
            let inner = self.identifier(b";<>.:/[")?;
            let outer = TypeStructure {
                class_name: Some(name.clone()),
                type_arguments: args,
                enclosing,
                ..TypeStructure::default()
            };
            enclosing = outer.is_generic().then(|| Box::new(outer));
            name = format!("{name}${inner}");
            args = self.optional_type_arguments()?;
        }
        self.expect(b';')?;

        Ok(TypeStructure {
            class_name: Some(name),
            type_arguments: args,
            enclosing,
            ..TypeStructure::default()
        })
    }

    fn optional_type_arguments(&mut self) -> PResult<Vec<TypeStructure>> {
        if self.peek() != Some(b'<') {
            return Ok(Vec::new());
        }
        self.bump();
        let mut args = Vec::new();
        while self.peek() != Some(b'>') {
            if self.peek().is_none() {
                return Err("unterminated type argument list".to_string());
            }
            args.push(self.type_argument()?);
        }
        self.bump();
        if args.is_empty() {
            return Err("empty type argument list".to_string());
        }
        Ok(args)
    }

    fn type_argument(&mut self) -> PResult<TypeStructure> {
        match self.peek() {
            Some(b'*') => {
                self.bump();
                Ok(TypeStructure::unbounded_wildcard())
            }
            Some(b'+') => {
                self.bump();
                Ok(self.reference_type()?.with_wildcard(WildcardBound::Extends))
            }
            Some(b'-') => {
                self.bump();
                Ok(self.reference_type()?.with_wildcard(WildcardBound::Super))
            }
            _ => self.reference_type(),
        }
    }

    fn reference_type(&mut self) -> PResult<TypeStructure> {
        let t = self.java_type()?;
        if t.is_primitive() && !t.is_array() {
            return Err("primitive used as type argument".to_string());
        }
        Ok(t)
    }

    fn type_parameters(&mut self) -> PResult<Vec<TypeParameter>> {
        if self.peek() != Some(b'<') {
            return Ok(Vec::new());
        }
        self.bump();
        let mut params = Vec::new();
        while self.peek() != Some(b'>') {
            let name = self.identifier(b":;<>.[/")?.to_string();
            self.expect(b':')?;
            let mut bounds = Vec::new();
            // Class bound may be empty (`T::Ljava/lang/Comparable;`).
            if matches!(self.peek(), Some(b'L' | b'T' | b'[')) {
                bounds.push(self.reference_type()?);
            }
            while self.peek() == Some(b':') {
                self.bump();
                bounds.push(self.reference_type()?);
            }
            params.push(TypeParameter { name, bounds });
            if self.peek().is_none() {
                return Err("unterminated type parameter list".to_string());
            }
        }
        self.bump();
        if params.is_empty() {
            return Err("empty type parameter list".to_string());
        }
        Ok(params)
    }

    fn return_type(&mut self) -> PResult<Option<TypeStructure>> {
        if self.peek() == Some(b'V') {
            self.bump();
            Ok(None)
        } else {
            self.java_type().map(Some)
        }
    }

    fn parameter_list(&mut self) -> PResult<Vec<TypeStructure>> {
        self.expect(b'(')?;
        let mut params = Vec::new();
        while self.peek() != Some(b')') {
            if self.peek().is_none() {
                return Err("unterminated parameter list".to_string());
            }
            params.push(self.java_type()?);
        }
        self.bump();
        Ok(params)
    }

    fn method_descriptor(&mut self) -> PResult<MethodType> {
        let parameters = self.parameter_list()?;
        let return_type = self.return_type()?;
        Ok(MethodType {
            type_parameters: Vec::new(),
            parameters,
            return_type,
            throws: Vec::new(),
        })
    }

    fn method_signature(&mut self) -> PResult<MethodType> {
        let type_parameters = self.type_parameters()?;
        let parameters = self.parameter_list()?;
        let return_type = self.return_type()?;
        let mut throws = Vec::new();
        while self.peek() == Some(b'^') {
            self.bump();
            throws.push(self.reference_type()?);
        }
        Ok(MethodType {
            type_parameters,
            parameters,
            return_type,
            throws,
        })
    }

    fn class_signature(&mut self) -> PResult<ClassType> {
        let type_parameters = self.type_parameters()?;
        let super_class = self.class_type()?;
        let mut interfaces = Vec::new();
        while self.peek().is_some() {
            interfaces.push(self.class_type()?);
        }
        Ok(ClassType {
            type_parameters,
            super_class: Some(super_class),
            interfaces,
        })
    }
}
