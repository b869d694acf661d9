//! Minimal JVM class-file reader.
//!
//! Reads only what declared-signature analysis needs: names, supertypes,
//! member descriptors and signatures, declared exceptions and annotation
//! types. Method bodies and every other attribute are skipped by length.

use crate::signature::internal_to_binary;
use crate::stub::{ClassKind, ClassStub, FieldStub, MethodStub, StubOrigin};
use crate::{GraphError, Result};

const MAGIC: u32 = 0xCAFE_BABE;

const ACC_BRIDGE: u16 = 0x0040;
const ACC_INTERFACE: u16 = 0x0200;
const ACC_ABSTRACT: u16 = 0x0400;
const ACC_SYNTHETIC: u16 = 0x1000;
const ACC_ANNOTATION: u16 = 0x2000;
const ACC_ENUM: u16 = 0x4000;
const ACC_MODULE: u16 = 0x8000;

#[derive(Debug, Clone)]
enum Constant {
    Utf8(String),
    Class(u16),
    /// Any entry the reader does not need, and the phantom slot after
    /// `Long`/`Double`.
    Other,
}

/// Read a class file into a [`ClassStub`].
pub fn read_class(bytes: &[u8]) -> Result<ClassStub> {
    let mut r = Reader::new(bytes);

    if r.u4()? != MAGIC {
        return Err(GraphError::ClassFormat("bad magic number".to_string()));
    }
    let _minor = r.u2()?;
    let _major = r.u2()?;
    let pool = read_constant_pool(&mut r)?;

    let access = r.u2()?;
    if access & ACC_MODULE != 0 {
        return Err(GraphError::ClassFormat("module descriptor, not a class".to_string()));
    }
    let this_name = class_name(&pool, r.u2()?)?;
    let super_index = r.u2()?;
    let super_name = if super_index == 0 {
        None
    } else {
        Some(class_name(&pool, super_index)?)
    };

    let interface_count = r.u2()?;
    let mut interfaces = Vec::with_capacity(usize::from(interface_count));
    for _ in 0..interface_count {
        interfaces.push(class_name(&pool, r.u2()?)?);
    }

    let kind = if access & ACC_ANNOTATION != 0 {
        ClassKind::Annotation
    } else if access & ACC_INTERFACE != 0 {
        ClassKind::Interface
    } else if access & ACC_ENUM != 0 {
        ClassKind::Enum
    } else if super_name.as_deref() == Some("java.lang.Record") {
        ClassKind::Record
    } else {
        ClassKind::Class
    };

    let mut stub = ClassStub::new(this_name, kind, StubOrigin::Binary);
    stub.is_abstract = access & ACC_ABSTRACT != 0 && access & ACC_INTERFACE == 0;
    stub.super_class = if kind == ClassKind::Interface || kind == ClassKind::Annotation {
        None
    } else {
        super_name
    };
    stub.interfaces = interfaces;

    let field_count = r.u2()?;
    for _ in 0..field_count {
        let access = r.u2()?;
        let name = utf8(&pool, r.u2()?)?.to_string();
        let descriptor = utf8(&pool, r.u2()?)?.to_string();
        let attrs = read_member_attributes(&mut r, &pool)?;
        if access & ACC_SYNTHETIC != 0 {
            continue;
        }
        stub.fields.push(FieldStub {
            name,
            descriptor,
            signature: attrs.signature,
            annotations: attrs.annotations,
        });
    }

    let method_count = r.u2()?;
    for _ in 0..method_count {
        let access = r.u2()?;
        let name = utf8(&pool, r.u2()?)?.to_string();
        let descriptor = utf8(&pool, r.u2()?)?.to_string();
        let attrs = read_member_attributes(&mut r, &pool)?;
        if access & (ACC_SYNTHETIC | ACC_BRIDGE) != 0 || name == "<clinit>" {
            continue;
        }
        stub.methods.push(MethodStub {
            name,
            descriptor,
            signature: attrs.signature,
            exceptions: attrs.exceptions,
            annotations: attrs.annotations,
            parameter_annotations: attrs.parameter_annotations,
        });
    }

    let class_attrs = read_member_attributes(&mut r, &pool)?;
    stub.signature = class_attrs.signature;
    stub.annotations = class_attrs.annotations;

    Ok(stub)
}

fn read_constant_pool(r: &mut Reader<'_>) -> Result<Vec<Constant>> {
    let count = r.u2()?;
    // Index 0 is unused.
    let mut pool = vec![Constant::Other];
    let mut index = 1;
    while index < count {
        let tag = r.u1()?;
        let entry = match tag {
            1 => {
                let len = r.u2()?;
                let raw = r.take(usize::from(len))?;
                Constant::Utf8(decode_modified_utf8(raw, index)?)
            }
            7 => Constant::Class(r.u2()?),
            3 | 4 | 9 | 10 | 11 | 12 | 17 | 18 => {
                r.skip(4)?;
                Constant::Other
            }
            5 | 6 => {
                r.skip(8)?;
                pool.push(Constant::Other);
                index += 1;
                Constant::Other
            }
            8 | 16 | 19 | 20 => {
                r.skip(2)?;
                Constant::Other
            }
            15 => {
                r.skip(3)?;
                Constant::Other
            }
            other => {
                return Err(GraphError::ClassFormat(format!(
                    "unknown constant pool tag {other} at index {index}"
                )));
            }
        };
        pool.push(entry);
        index += 1;
    }
    Ok(pool)
}

/// Decode a `CONSTANT_Utf8` payload. Modified UTF-8 writes NUL as
/// `C0 80` and a supplementary character as two three-byte surrogates;
/// a lone surrogate (legal in string constants) decodes to U+FFFD.
fn decode_modified_utf8(raw: &[u8], index: u16) -> Result<String> {
    if raw.iter().all(|b| (0x01..0x80).contains(b)) {
        return Ok(raw.iter().map(|b| char::from(*b)).collect());
    }
    let malformed = |at: usize| {
        GraphError::ClassFormat(format!("malformed modified UTF-8 at byte {at} of constant {index}"))
    };
    let mut units: Vec<u16> = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        let b = raw[i];
        let (unit, width) = match b {
            0x01..=0x7F => (u16::from(b), 1),
            0xC0..=0xDF => {
                let b2 = continuation(raw, i + 1).ok_or_else(|| malformed(i))?;
                ((u16::from(b & 0x1F) << 6) | b2, 2)
            }
            0xE0..=0xEF => {
                let b2 = continuation(raw, i + 1).ok_or_else(|| malformed(i))?;
                let b3 = continuation(raw, i + 2).ok_or_else(|| malformed(i))?;
                ((u16::from(b & 0x0F) << 12) | (b2 << 6) | b3, 3)
            }
            _ => return Err(malformed(i)),
        };
        units.push(unit);
        i += width;
    }
    Ok(String::from_utf16_lossy(&units))
}

/// Payload bits of the continuation byte at `at`.
fn continuation(raw: &[u8], at: usize) -> Option<u16> {
    raw.get(at)
        .filter(|b| **b & 0xC0 == 0x80)
        .map(|b| u16::from(b & 0x3F))
}

fn utf8(pool: &[Constant], index: u16) -> Result<&str> {
    match pool.get(usize::from(index)) {
        Some(Constant::Utf8(s)) => Ok(s),
        _ => Err(GraphError::ClassFormat(format!(
            "constant {index} is not a UTF-8 entry"
        ))),
    }
}

fn class_name(pool: &[Constant], index: u16) -> Result<String> {
    match pool.get(usize::from(index)) {
        Some(Constant::Class(name_index)) => Ok(internal_to_binary(utf8(pool, *name_index)?)),
        _ => Err(GraphError::ClassFormat(format!(
            "constant {index} is not a class entry"
        ))),
    }
}

#[derive(Debug, Default)]
struct MemberAttributes {
    signature: Option<String>,
    exceptions: Vec<String>,
    annotations: Vec<String>,
    parameter_annotations: Vec<Vec<String>>,
}

fn read_member_attributes(r: &mut Reader<'_>, pool: &[Constant]) -> Result<MemberAttributes> {
    let mut attrs = MemberAttributes::default();
    let count = r.u2()?;
    for _ in 0..count {
        let name = utf8(pool, r.u2()?)?;
        let len = r.u4()? as usize;
        let body = r.take(len)?;
        let mut a = Reader::new(body);
        match name {
            "Signature" => attrs.signature = Some(utf8(pool, a.u2()?)?.to_string()),
            "Exceptions" => {
                let n = a.u2()?;
                for _ in 0..n {
                    attrs.exceptions.push(class_name(pool, a.u2()?)?);
                }
            }
            "RuntimeVisibleAnnotations" | "RuntimeInvisibleAnnotations" => {
                attrs.annotations.extend(read_annotations(&mut a, pool)?);
            }
            "RuntimeVisibleParameterAnnotations" | "RuntimeInvisibleParameterAnnotations" => {
                let params = usize::from(a.u1()?);
                if attrs.parameter_annotations.len() < params {
                    attrs.parameter_annotations.resize(params, Vec::new());
                }
                for slot in attrs.parameter_annotations.iter_mut().take(params) {
                    slot.extend(read_annotations(&mut a, pool)?);
                }
            }
            _ => {}
        }
    }
    Ok(attrs)
}

fn read_annotations(r: &mut Reader<'_>, pool: &[Constant]) -> Result<Vec<String>> {
    let n = r.u2()?;
    let mut out = Vec::with_capacity(usize::from(n));
    for _ in 0..n {
        out.push(read_annotation(r, pool, 0)?);
    }
    Ok(out)
}

/// Read one annotation, returning its type descriptor and skipping values.
fn read_annotation(r: &mut Reader<'_>, pool: &[Constant], depth: usize) -> Result<String> {
    let type_descriptor = utf8(pool, r.u2()?)?.to_string();
    let pairs = r.u2()?;
    for _ in 0..pairs {
        r.skip(2)?;
        skip_element_value(r, pool, depth + 1)?;
    }
    Ok(type_descriptor)
}

fn skip_element_value(r: &mut Reader<'_>, pool: &[Constant], depth: usize) -> Result<()> {
    if depth > 32 {
        return Err(GraphError::ClassFormat("annotation nesting too deep".to_string()));
    }
    match r.u1()? {
        b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' | b's' | b'c' => r.skip(2),
        b'e' => r.skip(4),
        b'@' => read_annotation(r, pool, depth).map(|_| ()),
        b'[' => {
            let n = r.u2()?;
            for _ in 0..n {
                skip_element_value(r, pool, depth + 1)?;
            }
            Ok(())
        }
        other => Err(GraphError::ClassFormat(format!(
            "unknown element value tag '{}'",
            other as char
        ))),
    }
}

// ── Byte reader ────────────────────────────────────────────────────

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| {
                GraphError::ClassFormat(format!("truncated at offset {} (wanted {n} bytes)", self.pos))
            })?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn skip(&mut self, n: usize) -> Result<()> {
        self.take(n).map(|_| ())
    }

    fn u1(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u2(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u4(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_magic() {
        let err = read_class(&[0xDE, 0xAD, 0xBE, 0xEF, 0, 0, 0, 52]).unwrap_err();
        assert!(err.to_string().contains("magic"));
    }

    #[test]
    fn rejects_truncated_input() {
        let err = read_class(&[0xCA, 0xFE, 0xBA, 0xBE, 0, 0]).unwrap_err();
        assert!(err.to_string().contains("truncated"));
    }

    #[test]
    fn rejects_unknown_constant_tag() {
        let bytes = [0xCA, 0xFE, 0xBA, 0xBE, 0, 0, 0, 52, 0, 2, 99];
        let err = read_class(&bytes).unwrap_err();
        assert!(err.to_string().contains("unknown constant pool tag"));
    }

    #[test]
    fn modified_utf8_decodes_nul_and_surrogate_pairs() {
        assert_eq!(decode_modified_utf8(b"com/acme/Order", 1).unwrap(), "com/acme/Order");
        assert_eq!(decode_modified_utf8(&[b'a', 0xC0, 0x80, b'b'], 1).unwrap(), "a\0b");
        assert_eq!(decode_modified_utf8(&[b'C', b'a', b'f', 0xC3, 0xA9], 1).unwrap(), "Caf\u{e9}");
        assert_eq!(decode_modified_utf8(&[0xE2, 0x82, 0xAC], 1).unwrap(), "\u{20ac}");
        // U+1F600 as a surrogate pair, not a four-byte sequence
        assert_eq!(
            decode_modified_utf8(&[0xED, 0xA0, 0xBD, 0xED, 0xB8, 0x80], 1).unwrap(),
            "\u{1F600}"
        );
        assert_eq!(decode_modified_utf8(&[0xED, 0xA0, 0xBD], 1).unwrap(), "\u{FFFD}");
    }

    #[test]
    fn malformed_modified_utf8_is_rejected() {
        for raw in [&[0x00][..], &[0xC3], &[0xE2, 0x82], &[0xC3, 0x41], &[0xF0, 0x9F, 0x98, 0x80]] {
            let err = decode_modified_utf8(raw, 7).unwrap_err();
            assert!(err.to_string().contains("constant 7"), "{err}");
        }
    }

    #[test]
    fn empty_input_is_an_error_not_a_panic() {
        assert!(read_class(&[]).is_err());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn arbitrary_bytes_never_panic(tail in proptest::collection::vec(any::<u8>(), 0..256)) {
                let mut bytes = vec![0xCA, 0xFE, 0xBA, 0xBE, 0, 0, 0, 52];
                bytes.extend(tail);
                let _ = read_class(&bytes);
            }
        }
    }
}
