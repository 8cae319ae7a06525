//! Batch pipeline: ingest corpus, resolve entities, index co-mentions,
//! score the network. Single-threaded by design; entity resolution ratchets
//! shared registry state, so occurrence order is part of the contract.
//!
//! The expensive indexing stage is cached as two XML documents. A run
//! reuses them unless a refresh is forced or either file is missing; when
//! cache paths are omitted the index is rebuilt every time and streamed to
//! standard output instead.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

use log::info;

use crate::codec;
use crate::error::Result;
use crate::index::{index_corpus, CorpusIndex};
use crate::registry::Registry;
use crate::score::{score_network, EntityPair};
use crate::source::SourceDocument;

/// Where the two cache documents live, if anywhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct CachePaths<'a> {
    /// Co-mentions document path; `None` streams to standard output.
    pub comentions: Option<&'a Path>,
    /// Aliases document path; `None` streams to standard output.
    pub aliases: Option<&'a Path>,
}

impl CachePaths<'_> {
    fn reusable(&self) -> bool {
        matches!((self.comentions, self.aliases), (Some(c), Some(a)) if c.exists() && a.exists())
    }
}

/// Run the full pipeline and return the scored network, ascending by
/// weight.
///
/// With a usable cache and no forced refresh, `documents` is never touched;
/// otherwise the corpus is re-indexed and the cache rewritten.
pub fn generate_network(
    documents: &[SourceDocument],
    caches: CachePaths<'_>,
    force_refresh: bool,
) -> Result<Vec<EntityPair>> {
    let reuse = !force_refresh && caches.reusable();
    let (registry, index) = match (reuse, caches.comentions, caches.aliases) {
        (true, Some(comentions), Some(aliases)) => load_cache(comentions, aliases)?,
        _ => {
            info!("indexing {} documents", documents.len());
            let mut registry = Registry::new();
            let index = index_corpus(&mut registry, documents);
            write_cache(caches, &registry, &index)?;
            (registry, index)
        }
    };

    score_network(&registry, &index)
}

fn write_cache(caches: CachePaths<'_>, registry: &Registry, index: &CorpusIndex) -> Result<()> {
    match caches.comentions {
        Some(path) => {
            replace_file(path, |out| codec::save_comentions(out, registry, index))?;
        }
        None => {
            let stdout = io::stdout();
            codec::save_comentions(stdout.lock(), registry, index)?;
            println!();
        }
    }
    match caches.aliases {
        Some(path) => {
            replace_file(path, |out| codec::save_aliases(out, registry))?;
        }
        None => {
            let stdout = io::stdout();
            codec::save_aliases(stdout.lock(), registry)?;
            println!();
        }
    }
    Ok(())
}

/// Write through a sibling temp file and rename into place, so a failed
/// write leaves the destination as it was from a prior run.
fn replace_file(
    path: &Path,
    write: impl FnOnce(&mut BufWriter<File>) -> Result<()>,
) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = Path::new(&tmp);

    let result: Result<()> = (|| {
        let mut out = BufWriter::new(File::create(tmp)?);
        write(&mut out)?;
        out.flush()?;
        Ok(())
    })();
    if let Err(e) = result {
        let _ = fs::remove_file(tmp);
        return Err(e);
    }
    fs::rename(tmp, path)?;
    Ok(())
}

fn load_cache(comentions_path: &Path, aliases_path: &Path) -> Result<(Registry, CorpusIndex)> {
    info!("loading cached index from {}", comentions_path.display());
    let registry = codec::load_aliases(BufReader::new(File::open(aliases_path)?))?;
    let index = codec::load_comentions(BufReader::new(File::open(comentions_path)?), &registry)?;
    Ok((registry, index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{Mention, Span};

    fn corpus() -> Vec<SourceDocument> {
        vec![SourceDocument {
            name: "d1".to_string(),
            sentences: vec![
                "Acme Corp. sued Widget Inc. today ."
                    .split_whitespace()
                    .map(str::to_string)
                    .collect(),
            ],
            mentions: vec![
                Mention {
                    span: Span { sentence: 0, start_token: 0, end_token: 2 },
                    text: "Acme Corp.".to_string(),
                },
                Mention {
                    span: Span { sentence: 0, start_token: 3, end_token: 5 },
                    text: "Widget Inc.".to_string(),
                },
            ],
            corefs: Vec::new(),
        }]
    }

    fn paths(dir: &tempfile::TempDir) -> (std::path::PathBuf, std::path::PathBuf) {
        (dir.path().join("comentions.xml"), dir.path().join("aliases.xml"))
    }

    #[test]
    fn first_run_writes_cache_files() {
        let dir = tempfile::tempdir().unwrap();
        let (comentions, aliases) = paths(&dir);
        let caches = CachePaths {
            comentions: Some(&comentions),
            aliases: Some(&aliases),
        };
        let network = generate_network(&corpus(), caches, false).unwrap();
        assert_eq!(network.len(), 1);
        assert!(comentions.exists());
        assert!(aliases.exists());
    }

    #[test]
    fn second_run_reuses_cache_and_ignores_corpus() {
        let dir = tempfile::tempdir().unwrap();
        let (comentions, aliases) = paths(&dir);
        let caches = CachePaths {
            comentions: Some(&comentions),
            aliases: Some(&aliases),
        };
        let first = generate_network(&corpus(), caches, false).unwrap();
        // An empty corpus with a warm cache must reproduce the network.
        let second = generate_network(&[], caches, false).unwrap();
        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.a_key, b.a_key);
            assert_eq!(a.b_key, b.b_key);
            assert_eq!(a.weight.to_bits(), b.weight.to_bits());
            assert_eq!(a.sentences, b.sentences);
            assert_eq!(a.documents, b.documents);
        }
    }

    #[test]
    fn forced_refresh_reindexes() {
        let dir = tempfile::tempdir().unwrap();
        let (comentions, aliases) = paths(&dir);
        let caches = CachePaths {
            comentions: Some(&comentions),
            aliases: Some(&aliases),
        };
        generate_network(&corpus(), caches, false).unwrap();
        let refreshed = generate_network(&[], caches, true).unwrap();
        assert!(refreshed.is_empty());
    }

    #[test]
    fn missing_cache_file_triggers_rebuild() {
        let dir = tempfile::tempdir().unwrap();
        let (comentions, aliases) = paths(&dir);
        let caches = CachePaths {
            comentions: Some(&comentions),
            aliases: Some(&aliases),
        };
        generate_network(&corpus(), caches, false).unwrap();
        std::fs::remove_file(&aliases).unwrap();
        let network = generate_network(&corpus(), caches, false).unwrap();
        assert_eq!(network.len(), 1);
        assert!(aliases.exists());
    }
}
