//! Object-graph compaction: garbage collection, stream deflation, and
//! dense renumbering.

use std::collections::{HashMap, HashSet};
use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::{Document, Object, ObjectId};

use crate::error::CompactError;

/// How aggressively unreferenced material is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum GcLevel {
    /// Leave the object table alone; only deflate and renumber.
    None,
    /// Drop objects unreachable from the trailer.
    Unreachable,
    /// Additionally drop zero-length streams, nulling references to them.
    OrphanStreams,
    /// Additionally deduplicate byte-identical streams.
    Full,
}

/// Rewrites a document into a smaller equivalent one.
///
/// Consumes the input and returns an independently owned result. Compacting
/// an already-compacted document with the same level is a no-op apart from
/// stable renumbering.
pub struct Compactor {
    level: GcLevel,
}

impl Compactor {
    pub fn new(level: GcLevel) -> Self {
        Self { level }
    }

    pub fn compact(&self, mut doc: Document) -> Result<Document, CompactError> {
        if self.level >= GcLevel::Unreachable {
            let reachable = reachable_set(&doc)?;
            let before = doc.objects.len();
            doc.objects.retain(|id, _| reachable.contains(id));
            if before > doc.objects.len() {
                log::debug!("Dropped {} unreachable objects", before - doc.objects.len());
            }
        }

        if self.level >= GcLevel::OrphanStreams {
            drop_empty_streams(&mut doc);
        }

        if self.level >= GcLevel::Full {
            deduplicate_streams(&mut doc);
        }

        deflate_streams(&mut doc)?;
        doc.renumber_objects();
        Ok(doc)
    }
}

/// Worklist walk over every reference reachable from the trailer.
///
/// A visited set makes this terminate on cyclic graphs (page trees carry
/// parent back-references by construction).
fn reachable_set(doc: &Document) -> Result<HashSet<ObjectId>, CompactError> {
    let root_id = doc
        .trailer
        .get(b"Root")
        .map_err(|_| CompactError::MissingRoot)?
        .as_reference()
        .map_err(|_| CompactError::InvalidRoot)?;
    match doc.get_object(root_id) {
        Ok(Object::Dictionary(_)) => {}
        Ok(_) => return Err(CompactError::InvalidRoot),
        Err(_) => {
            return Err(CompactError::Malformed(format!(
                "root object {} {} is missing",
                root_id.0, root_id.1
            )))
        }
    }

    let mut pending: Vec<ObjectId> = Vec::new();
    for (_, value) in doc.trailer.iter() {
        collect_references(value, &mut pending);
    }

    let mut visited: HashSet<ObjectId> = HashSet::new();
    while let Some(id) = pending.pop() {
        if !visited.insert(id) {
            continue;
        }
        // Dangling references are dropped here rather than treated as
        // fatal; lopdf resolves them to null on save.
        if let Ok(object) = doc.get_object(id) {
            collect_references(object, &mut pending);
        }
    }

    Ok(visited)
}

fn collect_references(object: &Object, out: &mut Vec<ObjectId>) {
    match object {
        Object::Reference(id) => out.push(*id),
        Object::Array(items) => {
            for item in items {
                collect_references(item, out);
            }
        }
        Object::Dictionary(dict) => {
            for (_, value) in dict.iter() {
                collect_references(value, out);
            }
        }
        Object::Stream(stream) => {
            for (_, value) in stream.dict.iter() {
                collect_references(value, out);
            }
        }
        _ => {}
    }
}

/// Remove zero-length streams and null out references to them.
fn drop_empty_streams(doc: &mut Document) {
    let empty: HashSet<ObjectId> = doc
        .objects
        .iter()
        .filter_map(|(id, object)| match object {
            Object::Stream(stream) if stream.content.is_empty() => Some(*id),
            _ => None,
        })
        .collect();

    if empty.is_empty() {
        return;
    }

    doc.objects.retain(|id, _| !empty.contains(id));
    rewrite_references(doc, &|id| {
        if empty.contains(&id) {
            Some(Object::Null)
        } else {
            None
        }
    });
    log::debug!("Dropped {} empty streams", empty.len());
}

/// Collapse byte-identical streams (dictionary and content both equal)
/// onto a single object, redirecting references.
fn deduplicate_streams(doc: &mut Document) {
    let mut seen: HashMap<(String, Vec<u8>), ObjectId> = HashMap::new();
    let mut remap: HashMap<ObjectId, ObjectId> = HashMap::new();

    for (id, object) in doc.objects.iter() {
        if let Object::Stream(stream) = object {
            let key = (format!("{:?}", stream.dict), stream.content.clone());
            match seen.get(&key) {
                Some(keeper) => {
                    remap.insert(*id, *keeper);
                }
                None => {
                    seen.insert(key, *id);
                }
            }
        }
    }

    if remap.is_empty() {
        return;
    }

    doc.objects.retain(|id, _| !remap.contains_key(id));
    rewrite_references(doc, &|id| remap.get(&id).map(|to| Object::Reference(*to)));
    log::debug!("Deduplicated {} identical streams", remap.len());
}

/// Apply `replace` to every reference in the document, including the
/// trailer. `None` leaves a reference untouched.
fn rewrite_references(doc: &mut Document, replace: &dyn Fn(ObjectId) -> Option<Object>) {
    for object in doc.objects.values_mut() {
        rewrite_object(object, replace);
    }
    let keys: Vec<Vec<u8>> = doc.trailer.iter().map(|(k, _)| k.clone()).collect();
    for key in keys {
        if let Ok(value) = doc.trailer.get_mut(&key) {
            rewrite_object(value, replace);
        }
    }
}

fn rewrite_object(object: &mut Object, replace: &dyn Fn(ObjectId) -> Option<Object>) {
    match object {
        Object::Reference(id) => {
            if let Some(new) = replace(*id) {
                *object = new;
            }
        }
        Object::Array(items) => {
            for item in items {
                rewrite_object(item, replace);
            }
        }
        Object::Dictionary(dict) => {
            let keys: Vec<Vec<u8>> = dict.iter().map(|(k, _)| k.clone()).collect();
            for key in keys {
                if let Ok(value) = dict.get_mut(&key) {
                    rewrite_object(value, replace);
                }
            }
        }
        Object::Stream(stream) => {
            let keys: Vec<Vec<u8>> = stream.dict.iter().map(|(k, _)| k.clone()).collect();
            for key in keys {
                if let Ok(value) = stream.dict.get_mut(&key) {
                    rewrite_object(value, replace);
                }
            }
        }
        _ => {}
    }
}

/// Deflate every stream that carries no filter yet. Streams where zlib
/// does not help (already-dense data) are left as they were, which also
/// keeps the pass idempotent.
fn deflate_streams(doc: &mut Document) -> Result<(), CompactError> {
    for object in doc.objects.values_mut() {
        let Object::Stream(stream) = object else {
            continue;
        };
        if stream.dict.get(b"Filter").is_ok() || stream.content.is_empty() {
            continue;
        }

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(&stream.content)
            .and_then(|_| encoder.finish())
            .map_err(|e| CompactError::Malformed(format!("deflate failed: {}", e)))
            .map(|compressed| {
                if compressed.len() < stream.content.len() {
                    stream.dict.set("Filter", Object::Name(b"FlateDecode".to_vec()));
                    stream.set_content(compressed);
                }
            })?;
    }
    Ok(())
}
