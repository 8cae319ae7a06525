//! XML cache codec for the corpus index, the alias registry, and the final
//! network document.
//!
//! Three document shapes:
//!
//! - co-mentions: `<corpus><document name=".." sentences=".."><sentence>
//!   <entity>key</entity>..</sentence>..</document>..</corpus>`
//! - aliases: `<aliases><entity key=".."><alias>..</alias>..</entity>..
//!   </aliases>`
//! - network: `<graph><edge weight=".." sentences=".." documents="..">
//!   <node>key</node><node>key</node></edge>..</graph>`
//!
//! Loading is strict: unknown structure, an entity key missing from the
//! aliases table, or a duplicate document name all abort the load. Loaded
//! sentences are taken as-is and never re-filtered.

use std::collections::{HashMap, HashSet};
use std::io::{BufRead, Write};

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::{Error, Result};
use crate::index::{CorpusIndex, IndexedDocument};
use crate::registry::{EntityId, NamedEntity, Registry};
use crate::score::EntityPair;

fn new_writer<W: Write>(out: W) -> Writer<W> {
    Writer::new_with_indent(out, b' ', 2)
}

fn write_decl<W: Write>(writer: &mut Writer<W>) -> Result<()> {
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    Ok(())
}

fn write_text_element<W: Write>(writer: &mut Writer<W>, tag: &str, text: &str) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(tag)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(tag)))?;
    Ok(())
}

/// Serialize the co-mention index. Entity nodes carry the canonical key at
/// save time, so a stale cache never leaks pre-growth keys back in.
pub fn save_comentions<W: Write>(out: W, registry: &Registry, index: &CorpusIndex) -> Result<()> {
    let mut writer = new_writer(out);
    write_decl(&mut writer)?;
    writer.write_event(Event::Start(BytesStart::new("corpus")))?;
    for document in index.documents() {
        let mut el = BytesStart::new("document");
        el.push_attribute(("name", document.name.as_str()));
        el.push_attribute(("sentences", document.total_sentences.to_string().as_str()));
        writer.write_event(Event::Start(el))?;
        for sentence in &document.interesting {
            writer.write_event(Event::Start(BytesStart::new("sentence")))?;
            for &id in sentence {
                write_text_element(&mut writer, "entity", &registry.get(id).key)?;
            }
            writer.write_event(Event::End(BytesEnd::new("sentence")))?;
        }
        writer.write_event(Event::End(BytesEnd::new("document")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("corpus")))?;
    Ok(())
}

/// Serialize the alias registry. Duplicate canonical keys mean resolution
/// failed to collapse an identity and are rejected here rather than
/// persisted.
pub fn save_aliases<W: Write>(out: W, registry: &Registry) -> Result<()> {
    let mut keys: HashSet<&str> = HashSet::new();
    for (_, entity) in registry.iter() {
        if !keys.insert(entity.key.as_str()) {
            return Err(Error::consistency(format!(
                "duplicate canonical key {:?} on distinct entities",
                entity.key
            )));
        }
    }

    let mut writer = new_writer(out);
    write_decl(&mut writer)?;
    writer.write_event(Event::Start(BytesStart::new("aliases")))?;
    for (_, entity) in registry.iter() {
        let mut el = BytesStart::new("entity");
        el.push_attribute(("key", entity.key.as_str()));
        writer.write_event(Event::Start(el))?;
        for alias in &entity.aliases {
            write_text_element(&mut writer, "alias", alias)?;
        }
        writer.write_event(Event::End(BytesEnd::new("entity")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("aliases")))?;
    Ok(())
}

/// Serialize the scored network.
pub fn save_network<W: Write>(out: W, network: &[EntityPair]) -> Result<()> {
    let mut writer = new_writer(out);
    write_decl(&mut writer)?;
    writer.write_event(Event::Start(BytesStart::new("graph")))?;
    for pair in network {
        let mut el = BytesStart::new("edge");
        el.push_attribute(("weight", pair.weight.to_string().as_str()));
        el.push_attribute(("sentences", pair.sentences.to_string().as_str()));
        el.push_attribute(("documents", pair.documents.to_string().as_str()));
        writer.write_event(Event::Start(el))?;
        write_text_element(&mut writer, "node", &pair.a_key)?;
        write_text_element(&mut writer, "node", &pair.b_key)?;
        writer.write_event(Event::End(BytesEnd::new("edge")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("graph")))?;
    Ok(())
}

fn required_attribute(el: &BytesStart<'_>, name: &str) -> Result<String> {
    let attr = el
        .try_get_attribute(name)?
        .ok_or_else(|| Error::format(format!("<{}> missing {name} attribute", tag_name(el))))?;
    Ok(attr.unescape_value()?.into_owned())
}

fn tag_name(el: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(el.name().as_ref()).into_owned()
}

/// Deserialize an alias registry. Deletion tolerances are not persisted;
/// loaded entities start back at zero.
pub fn load_aliases<R: BufRead>(input: R) -> Result<Registry> {
    let mut reader = Reader::from_reader(input);
    reader.config_mut().trim_text(true);

    let mut registry = Registry::new();
    let mut seen_keys: HashSet<String> = HashSet::new();
    let mut current: Option<NamedEntity> = None;
    let mut in_alias = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(el) => match el.name().as_ref() {
                b"aliases" => {}
                b"entity" => {
                    let key = required_attribute(&el, "key")?;
                    if !seen_keys.insert(key.clone()) {
                        return Err(Error::format(format!(
                            "duplicate entity key {key:?} in aliases document"
                        )));
                    }
                    current = Some(NamedEntity::new(key));
                }
                b"alias" => {
                    if current.is_none() {
                        return Err(Error::format("<alias> outside <entity>"));
                    }
                    in_alias = true;
                }
                other => {
                    return Err(Error::format(format!(
                        "unexpected element <{}> in aliases document",
                        String::from_utf8_lossy(other)
                    )));
                }
            },
            Event::Text(text) => {
                if in_alias {
                    if let Some(entity) = current.as_mut() {
                        entity.push_alias(&text.unescape()?);
                    }
                }
            }
            Event::End(el) => match el.name().as_ref() {
                b"alias" => in_alias = false,
                b"entity" => {
                    if let Some(entity) = current.take() {
                        registry.insert(entity);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(registry)
}

/// Deserialize a co-mention index against an already-loaded alias registry.
/// Every entity node must name a canonical key present in the registry.
pub fn load_comentions<R: BufRead>(input: R, registry: &Registry) -> Result<CorpusIndex> {
    let by_key: HashMap<&str, EntityId> = registry
        .iter()
        .map(|(id, entity)| (entity.key.as_str(), id))
        .collect();

    let mut reader = Reader::from_reader(input);
    reader.config_mut().trim_text(true);

    let mut index = CorpusIndex::new();
    let mut current_doc: Option<IndexedDocument> = None;
    let mut current_sentence: Option<Vec<EntityId>> = None;
    let mut in_entity = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(el) => match el.name().as_ref() {
                b"corpus" => {}
                b"document" => {
                    let name = required_attribute(&el, "name")?;
                    if index.documents().iter().any(|d| d.name == name) {
                        return Err(Error::format(format!(
                            "duplicate document name {name:?} in co-mentions document"
                        )));
                    }
                    let total_sentences: usize = required_attribute(&el, "sentences")?
                        .parse()
                        .map_err(|e| Error::format(format!("bad sentences attribute: {e}")))?;
                    current_doc = Some(IndexedDocument {
                        name,
                        total_sentences,
                        interesting: Vec::new(),
                    });
                }
                b"sentence" => {
                    if current_doc.is_none() {
                        return Err(Error::format("<sentence> outside <document>"));
                    }
                    current_sentence = Some(Vec::new());
                }
                b"entity" => {
                    if current_sentence.is_none() {
                        return Err(Error::format("<entity> outside <sentence>"));
                    }
                    in_entity = true;
                }
                other => {
                    return Err(Error::format(format!(
                        "unexpected element <{}> in co-mentions document",
                        String::from_utf8_lossy(other)
                    )));
                }
            },
            Event::Text(text) => {
                if in_entity {
                    let key = text.unescape()?;
                    let id = *by_key.get(key.as_ref()).ok_or_else(|| {
                        Error::format(format!("entity key {key:?} absent from aliases document"))
                    })?;
                    if let Some(sentence) = current_sentence.as_mut() {
                        sentence.push(id);
                    }
                }
            }
            Event::End(el) => match el.name().as_ref() {
                b"entity" => in_entity = false,
                b"sentence" => {
                    if let (Some(doc), Some(sentence)) =
                        (current_doc.as_mut(), current_sentence.take())
                    {
                        doc.interesting.push(sentence);
                    }
                }
                b"document" => {
                    if let Some(doc) = current_doc.take() {
                        index.push(doc);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(index)
}
