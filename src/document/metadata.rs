//! Incremental rewrite of a document's creation/modification dates.
//!
//! The update appends a new revision to the existing file instead of
//! resaving the object graph: a replacement `/Info` dictionary, a classic
//! cross-reference subsection for that one object, and a trailer whose
//! `Prev` entry chains back to the previous revision. Trailer `ID` entries
//! are carried over verbatim. Encrypted documents are refused: the date
//! strings we append are plaintext, and under a security handler a
//! conforming reader would run them through the file key and read garbage.

use std::fs;
use std::path::Path;

use chrono::NaiveDateTime;
use lopdf::{Dictionary, Document, Object, StringFormat};

use crate::dates::format_pdf_date;
use crate::error::MetadataError;

/// Rewrite the `/Info` date fields of the PDF at `path` in place.
///
/// This is a partial update: a `None` field is left exactly as it was,
/// along with every unrelated `/Info` entry (Title, Author, Producer, ...).
/// The appended revision is fully serialized in memory before the file is
/// touched. A document with a trailer `Encrypt` entry is refused with
/// `MetadataError::Encrypted` and its bytes are left unchanged.
pub fn rewrite_dates(
    path: &Path,
    creation: Option<NaiveDateTime>,
    modification: Option<NaiveDateTime>,
) -> Result<(), MetadataError> {
    if creation.is_none() && modification.is_none() {
        return Ok(());
    }

    let original = fs::read(path)?;
    let doc = Document::load_mem(&original).map_err(|e| MetadataError::Load(e.to_string()))?;
    if doc.trailer.get(b"Encrypt").is_ok() {
        return Err(MetadataError::Encrypted);
    }
    let prev_xref = find_startxref(&original).ok_or(MetadataError::MissingStartXref)?;

    let (info_id, mut info) = existing_info(&doc);
    if let Some(instant) = creation {
        info.set(
            "CreationDate",
            Object::string_literal(format_pdf_date(instant)),
        );
    }
    if let Some(instant) = modification {
        info.set("ModDate", Object::string_literal(format_pdf_date(instant)));
    }

    let revision = serialize_revision(&doc, &original, prev_xref, info_id, info);

    let mut updated = original;
    updated.extend_from_slice(&revision);
    fs::write(path, updated)?;
    log::info!("Appended metadata revision to {}", path.display());
    Ok(())
}

/// The document's `/Info` object id and a copy of its dictionary, or a
/// fresh id past `max_id` when the document has none.
fn existing_info(doc: &Document) -> ((u32, u16), Dictionary) {
    if let Ok(Object::Reference(id)) = doc.trailer.get(b"Info") {
        let dict = doc
            .get_dictionary(*id)
            .map(|d| d.clone())
            .unwrap_or_else(|_| Dictionary::new());
        return (*id, dict);
    }
    ((doc.max_id + 1, 0), Dictionary::new())
}

fn serialize_revision(
    doc: &Document,
    original: &[u8],
    prev_xref: usize,
    info_id: (u32, u16),
    info: Dictionary,
) -> Vec<u8> {
    let mut out = Vec::new();
    if !original.ends_with(b"\n") {
        out.push(b'\n');
    }

    let object_offset = original.len() + out.len();
    out.extend_from_slice(format!("{} {} obj\n", info_id.0, info_id.1).as_bytes());
    serialize_object(&Object::Dictionary(info), &mut out);
    out.extend_from_slice(b"\nendobj\n");

    // Classic xref: the free-list head plus the one rewritten object.
    let xref_offset = original.len() + out.len();
    out.extend_from_slice(b"xref\n0 1\n0000000000 65535 f \n");
    out.extend_from_slice(
        format!("{} 1\n{:010} {:05} n \n", info_id.0, object_offset, info_id.1).as_bytes(),
    );

    let mut trailer = Dictionary::new();
    trailer.set("Size", i64::from(doc.max_id.max(info_id.0)) + 1);
    if let Ok(root) = doc.trailer.get(b"Root") {
        trailer.set("Root", root.clone());
    }
    trailer.set("Prev", prev_xref as i64);
    trailer.set("Info", Object::Reference(info_id));
    if let Ok(id) = doc.trailer.get(b"ID") {
        trailer.set("ID", id.clone());
    }

    out.extend_from_slice(b"trailer\n");
    serialize_object(&Object::Dictionary(trailer), &mut out);
    out.extend_from_slice(format!("\nstartxref\n{}\n%%EOF\n", xref_offset).as_bytes());
    out
}

/// Locate the `startxref` offset of the file's last revision.
fn find_startxref(bytes: &[u8]) -> Option<usize> {
    let tail_start = bytes.len().saturating_sub(1024);
    let tail = &bytes[tail_start..];
    let keyword = b"startxref";
    let at = tail
        .windows(keyword.len())
        .rposition(|window| window == keyword)?;

    let after = &tail[at + keyword.len()..];
    let digits: String = after
        .iter()
        .map(|&b| b as char)
        .skip_while(|c| c.is_whitespace())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Serialize an object in PDF syntax. Covers the subset that can occur in
/// a trailer or `/Info` dictionary.
fn serialize_object(object: &Object, out: &mut Vec<u8>) {
    match object {
        Object::Null => out.extend_from_slice(b"null"),
        Object::Boolean(b) => out.extend_from_slice(if *b { b"true" } else { b"false" }),
        Object::Integer(i) => out.extend_from_slice(i.to_string().as_bytes()),
        Object::Real(r) => out.extend_from_slice(r.to_string().as_bytes()),
        Object::Name(name) => serialize_name(name, out),
        Object::String(bytes, format) => serialize_string(bytes, *format, out),
        Object::Reference((number, generation)) => {
            out.extend_from_slice(format!("{} {} R", number, generation).as_bytes())
        }
        Object::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b' ');
                }
                serialize_object(item, out);
            }
            out.push(b']');
        }
        Object::Dictionary(dict) => serialize_dictionary(dict, out),
        Object::Stream(stream) => {
            // Streams never occur in the revisions we emit, but serialize
            // a well-formed one rather than panicking.
            serialize_dictionary(&stream.dict, out);
            out.extend_from_slice(b"\nstream\n");
            out.extend_from_slice(&stream.content);
            out.extend_from_slice(b"\nendstream");
        }
    }
}

fn serialize_dictionary(dict: &Dictionary, out: &mut Vec<u8>) {
    out.extend_from_slice(b"<<");
    for (key, value) in dict.iter() {
        out.push(b' ');
        serialize_name(key, out);
        out.push(b' ');
        serialize_object(value, out);
    }
    out.extend_from_slice(b" >>");
}

/// `/Name` with `#xx` escapes for delimiters and non-regular characters.
fn serialize_name(name: &[u8], out: &mut Vec<u8>) {
    out.push(b'/');
    for &byte in name {
        let regular = (b'!'..=b'~').contains(&byte)
            && !matches!(byte, b'#' | b'/' | b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'%');
        if regular {
            out.push(byte);
        } else {
            out.extend_from_slice(format!("#{:02X}", byte).as_bytes());
        }
    }
}

fn serialize_string(bytes: &[u8], format: StringFormat, out: &mut Vec<u8>) {
    match format {
        StringFormat::Literal => {
            out.push(b'(');
            for &byte in bytes {
                match byte {
                    b'(' | b')' | b'\\' => {
                        out.push(b'\\');
                        out.push(byte);
                    }
                    b'\n' => out.extend_from_slice(b"\\n"),
                    b'\r' => out.extend_from_slice(b"\\r"),
                    0x20..=0x7E => out.push(byte),
                    _ => out.extend_from_slice(format!("\\{:03o}", byte).as_bytes()),
                }
            }
            out.push(b')');
        }
        StringFormat::Hexadecimal => {
            out.push(b'<');
            for &byte in bytes {
                out.extend_from_slice(format!("{:02X}", byte).as_bytes());
            }
            out.push(b'>');
        }
    }
}
