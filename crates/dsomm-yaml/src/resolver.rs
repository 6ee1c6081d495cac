//! Recursive `$ref` substitution
//!
//! A reference is a mapping of the shape `{ $ref: "<file>#<yPath>" }`.
//! The file half is resolved relative to the referencing document and
//! loaded through the [`DocumentSource`]; the yPath half walks into the
//! lookup root. Either half may be empty: no file means the current
//! document, no yPath means the whole target.
//!
//! Every referenced file is fetched, parsed and resolved at most once,
//! cached by absolute path. Cycles between files are detected through an
//! in-progress visiting chain and reported as circular-reference errors;
//! pathological in-document nesting trips a fixed depth ceiling instead.

use serde_yaml::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use crate::cache::DocumentCache;
use crate::error::YamlError;
use crate::filepath::make_full_path;
use crate::parse::{self, Document};
use crate::source::DocumentSource;
use crate::ypath::{get_ypath, MAX_DEPTH};

/// The mapping key that marks a reference node.
const REF_KEY: &str = "$ref";

/// Loads YAML documents from a source and substitutes `$ref` markers.
///
/// Owns the path-addressed [`DocumentCache`]; one loader instance has at
/// most one in-flight resolution walk at a time, and repeated loads of
/// the same file hit the cache.
#[derive(Debug)]
pub struct YamlLoader<S> {
    source: S,
    cache: DocumentCache,
}

impl<S: DocumentSource> YamlLoader<S> {
    /// Create a loader over `source` with a default-capacity cache.
    #[inline]
    #[must_use]
    pub fn new(source: S) -> Self {
        Self::with_cache(source, DocumentCache::default())
    }

    /// Create a loader over `source` with an explicitly owned cache.
    #[inline]
    #[must_use]
    pub fn with_cache(source: S, cache: DocumentCache) -> Self {
        Self { source, cache }
    }

    /// The resolved-document cache.
    #[inline]
    #[must_use]
    pub fn cache(&self) -> &DocumentCache {
        &self.cache
    }

    /// The underlying document source.
    #[inline]
    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fetch and parse a single-document YAML file.
    ///
    /// # Errors
    /// Fetch failures and malformed YAML are fatal.
    pub async fn load(&self, path: &str) -> Result<Document, YamlError> {
        let text = self.fetch_timed(path).await?;
        let started = Instant::now();
        let doc = parse::parse(&text).map_err(|source| YamlError::Syntax {
            path: path.to_string(),
            source,
        })?;
        tracing::debug!(
            path,
            parse_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "parsed yaml"
        );
        Ok(doc)
    }

    /// Fetch and parse a multi-document YAML stream.
    ///
    /// # Errors
    /// Fetch failures and malformed YAML are fatal.
    pub async fn load_multi(&self, path: &str) -> Result<Vec<Document>, YamlError> {
        let text = self.fetch_timed(path).await?;
        parse::parse_multi(&text).map_err(|source| YamlError::Syntax {
            path: path.to_string(),
            source,
        })
    }

    /// Fetch, parse and resolve every reference in the file at `path`.
    ///
    /// # Errors
    /// Any fetch, parse or reference failure aborts the whole load.
    pub async fn load_resolved(&self, path: &str) -> Result<Document, YamlError> {
        let doc = self.load(path).await?;
        self.resolve_refs(doc, path).await
    }

    /// Substitute every `$ref` marker in `doc`.
    ///
    /// `reference_path` is the path `doc` was loaded from; relative file
    /// halves of references inside it resolve against that path.
    ///
    /// # Errors
    /// Unresolvable references, sandbox violations, reference cycles and
    /// depth-ceiling trips are fatal.
    pub async fn resolve_refs(
        &self,
        doc: Document,
        reference_path: &str,
    ) -> Result<Document, YamlError> {
        let mut visiting = vec![reference_path.to_string()];
        let org = Arc::new(doc.clone());
        self.substitute(doc, &org, reference_path, &mut visiting, 1)
            .await
    }

    async fn fetch_timed(&self, path: &str) -> Result<String, YamlError> {
        tracing::debug!(path, "fetching yaml");
        let started = Instant::now();
        let text = self.source.fetch(path).await?;
        tracing::debug!(
            path,
            fetch_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "retrieved yaml"
        );
        Ok(text)
    }

    /// Depth-first walk of one document.
    ///
    /// Children are visited in insertion order; a mapping carrying a
    /// `$ref` key is replaced wholesale by its fetched target, which is
    /// itself substituted before being returned so that same-document
    /// targets containing further references resolve in any key order.
    fn substitute<'a>(
        &'a self,
        node: Value,
        org: &'a Arc<Document>,
        reference_path: &'a str,
        visiting: &'a mut Vec<String>,
        depth: usize,
    ) -> Pin<Box<dyn Future<Output = Result<Value, YamlError>> + Send + 'a>> {
        Box::pin(async move {
            if depth > MAX_DEPTH {
                return Err(YamlError::RecursiveLoop { limit: MAX_DEPTH });
            }

            match node {
                Value::Mapping(map) => {
                    let ref_key = Value::from(REF_KEY);
                    if let Some(Value::String(reference)) = map.get(&ref_key) {
                        let reference = reference.clone();
                        let fetched = self
                            .fetch_ref(&reference, org, reference_path, visiting)
                            .await?;
                        return self
                            .substitute(fetched, org, reference_path, visiting, depth + 1)
                            .await;
                    }

                    let mut resolved = serde_yaml::Mapping::new();
                    for (key, value) in map {
                        let value = self
                            .substitute(value, org, reference_path, visiting, depth + 1)
                            .await?;
                        resolved.insert(key, value);
                    }
                    Ok(Value::Mapping(resolved))
                }
                Value::Sequence(seq) => {
                    let mut resolved = Vec::with_capacity(seq.len());
                    for value in seq {
                        resolved.push(
                            self.substitute(value, org, reference_path, visiting, depth + 1)
                                .await?,
                        );
                    }
                    Ok(Value::Sequence(resolved))
                }
                scalar => Ok(scalar),
            }
        })
    }

    /// Parse a reference string, load its target and return the value.
    async fn fetch_ref(
        &self,
        reference: &str,
        org: &Arc<Document>,
        reference_path: &str,
        visiting: &mut Vec<String>,
    ) -> Result<Value, YamlError> {
        let (file, ypath) = split_ref(reference);

        let target: Arc<Document> = if file.is_empty() {
            Arc::clone(org)
        } else {
            self.load_ref(file, reference_path, visiting).await?
        };

        if ypath.is_empty() {
            return Ok((*target).clone());
        }

        match get_ypath(&target, ypath) {
            Ok(value) => Ok(value.clone()),
            Err(YamlError::MissingPath { ypath, .. }) => {
                let file = if file.is_empty() {
                    "yaml file".to_string()
                } else {
                    file.to_string()
                };
                Err(YamlError::MissingPath { ypath, file })
            }
            Err(other) => Err(other),
        }
    }

    /// Cache-through load of a referenced file, fully resolved.
    ///
    /// Re-entry on a path that is still being resolved is a cycle.
    async fn load_ref(
        &self,
        filepath: &str,
        reference_path: &str,
        visiting: &mut Vec<String>,
    ) -> Result<Arc<Document>, YamlError> {
        let abs = make_full_path(filepath, reference_path)?;

        if visiting.iter().any(|seen| *seen == abs) {
            let mut chain = visiting.clone();
            chain.push(abs);
            return Err(YamlError::CircularReference { chain });
        }
        if let Some(cached) = self.cache.get(&abs).await {
            return Ok(cached);
        }

        visiting.push(abs.clone());
        let resolved = match self.load(&abs).await {
            Ok(doc) => {
                let org = Arc::new(doc.clone());
                self.substitute(doc, &org, &abs, visiting, 1).await
            }
            Err(err) => Err(err),
        };
        visiting.pop();

        let resolved = Arc::new(resolved?);
        self.cache.insert(abs, Arc::clone(&resolved)).await;
        Ok(resolved)
    }
}

/// Split a reference into its file and yPath halves on the first `#`.
///
/// Both halves are trimmed and both may be empty; an entirely empty
/// reference targets the whole current document.
fn split_ref(reference: &str) -> (&str, &str) {
    let (file, ypath) = match reference.split_once('#') {
        Some((file, ypath)) => (file, ypath),
        None => (reference, ""),
    };
    (file.trim(), ypath.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// In-memory source recording how often each path was fetched.
    #[derive(Debug, Default)]
    struct MapSource {
        documents: HashMap<String, String>,
        fetches: Mutex<HashMap<String, usize>>,
        total: AtomicUsize,
    }

    impl MapSource {
        fn with(documents: &[(&str, &str)]) -> Self {
            Self {
                documents: documents
                    .iter()
                    .map(|(path, text)| ((*path).to_string(), (*text).to_string()))
                    .collect(),
                ..Self::default()
            }
        }

        fn fetch_count(&self, path: &str) -> usize {
            self.fetches.lock().unwrap().get(path).copied().unwrap_or(0)
        }
    }

    #[async_trait]
    impl DocumentSource for MapSource {
        async fn fetch(&self, path: &str) -> Result<String, FetchError> {
            self.total.fetch_add(1, Ordering::SeqCst);
            *self
                .fetches
                .lock()
                .unwrap()
                .entry(path.to_string())
                .or_default() += 1;
            self.documents
                .get(path)
                .cloned()
                .ok_or_else(|| FetchError::Unavailable {
                    path: path.to_string(),
                    reason: "Not Found".to_string(),
                })
        }
    }

    fn loader(documents: &[(&str, &str)]) -> YamlLoader<MapSource> {
        YamlLoader::new(MapSource::with(documents))
    }

    #[tokio::test]
    async fn documents_without_refs_pass_through_unchanged() {
        let loader = loader(&[]);
        let doc = parse::parse("a:\n  b: 1\nc:\n  - x\n  - y\n").unwrap();

        let resolved = loader.resolve_refs(doc.clone(), "f.yaml").await.unwrap();
        assert_eq!(resolved, doc);
    }

    #[tokio::test]
    async fn same_document_ref_substitutes_by_value() {
        let loader = loader(&[]);
        let doc = parse::parse("a:\n  b: 1\nc:\n  $ref: '#/a/b'\n").unwrap();

        let resolved = loader.resolve_refs(doc, "f.yaml").await.unwrap();
        assert_eq!(resolved["c"], Value::from(1));
    }

    #[tokio::test]
    async fn empty_ypath_targets_whole_file() {
        let loader = loader(&[("sub/other.yaml", "x: 7\n")]);
        let doc = parse::parse("a:\n  $ref: 'other.yaml#'\n").unwrap();

        let resolved = loader.resolve_refs(doc, "sub/main.yaml").await.unwrap();
        assert_eq!(resolved["a"]["x"], Value::from(7));
    }

    #[tokio::test]
    async fn cross_file_ref_resolves_nested_refs_in_target() {
        let loader = loader(&[(
            "sub/other.yaml",
            "shared:\n  deep:\n    $ref: '#/origin'\norigin: 42\n",
        )]);
        let doc = parse::parse("a:\n  $ref: 'other.yaml#/shared'\n").unwrap();

        let resolved = loader.resolve_refs(doc, "sub/main.yaml").await.unwrap();
        assert_eq!(resolved["a"]["deep"], Value::from(42));
    }

    #[tokio::test]
    async fn referenced_file_is_fetched_once() {
        let loader = loader(&[("sub/other.yaml", "x: 7\ny: 8\n")]);
        let doc = parse::parse(
            "a:\n  $ref: 'other.yaml#/x'\nb:\n  $ref: 'other.yaml#/y'\n",
        )
        .unwrap();

        let resolved = loader.resolve_refs(doc, "sub/main.yaml").await.unwrap();
        assert_eq!(resolved["a"], Value::from(7));
        assert_eq!(resolved["b"], Value::from(8));
        assert_eq!(loader.source().fetch_count("sub/other.yaml"), 1);
    }

    #[tokio::test]
    async fn second_resolution_hits_the_cache() {
        let loader = loader(&[("sub/other.yaml", "x: 7\n")]);

        for _ in 0..2 {
            let doc = parse::parse("a:\n  $ref: 'other.yaml#/x'\n").unwrap();
            loader.resolve_refs(doc, "sub/main.yaml").await.unwrap();
        }
        assert_eq!(loader.source().fetch_count("sub/other.yaml"), 1);
    }

    #[tokio::test]
    async fn missing_path_names_the_file() {
        let loader = loader(&[("sub/other.yaml", "x: 7\n")]);
        let doc = parse::parse("a:\n  $ref: 'other.yaml#/missing'\n").unwrap();

        let err = loader.resolve_refs(doc, "sub/main.yaml").await.unwrap_err();
        assert_eq!(err.to_string(), "Cannot find '/missing' in other.yaml");
    }

    #[tokio::test]
    async fn missing_path_in_same_document_names_yaml_file() {
        let loader = loader(&[]);
        let doc = parse::parse("a:\n  $ref: '#/missing'\n").unwrap();

        let err = loader.resolve_refs(doc, "f.yaml").await.unwrap_err();
        assert_eq!(err.to_string(), "Cannot find '/missing' in yaml file");
    }

    #[tokio::test]
    async fn file_cycle_is_a_circular_reference_error() {
        let loader = loader(&[
            ("sub/a.yaml", "x:\n  $ref: 'b.yaml#/y'\n"),
            ("sub/b.yaml", "y:\n  $ref: 'a.yaml#/x'\n"),
        ]);
        let doc = parse::parse("entry:\n  $ref: 'a.yaml#/x'\n").unwrap();

        let err = loader.resolve_refs(doc, "sub/main.yaml").await.unwrap_err();
        assert!(matches!(err, YamlError::CircularReference { .. }));
        assert!(err.to_string().contains("sub/a.yaml"));
        assert!(err.to_string().contains("sub/b.yaml"));
    }

    #[tokio::test]
    async fn self_referential_pair_trips_the_depth_guard() {
        let loader = loader(&[]);
        let doc = parse::parse("a:\n  $ref: '#/b'\nb:\n  $ref: '#/a'\n").unwrap();

        let err = loader.resolve_refs(doc, "f.yaml").await.unwrap_err();
        assert!(matches!(err, YamlError::RecursiveLoop { .. }));
    }

    #[tokio::test]
    async fn escaping_ref_is_a_sandbox_violation() {
        let loader = loader(&[]);
        let doc = parse::parse("a:\n  $ref: '../outside.yaml#/x'\n").unwrap();

        let err = loader.resolve_refs(doc, "sub/main.yaml").await.unwrap_err();
        assert!(matches!(err, YamlError::SandboxViolation { .. }));
    }

    #[tokio::test]
    async fn refs_inside_sequences_resolve() {
        let loader = loader(&[("sub/other.yaml", "x: 7\n")]);
        let doc = parse::parse("list:\n  - $ref: 'other.yaml#/x'\n  - 2\n").unwrap();

        let resolved = loader.resolve_refs(doc, "sub/main.yaml").await.unwrap();
        assert_eq!(
            resolved["list"],
            Value::Sequence(vec![Value::from(7), Value::from(2)])
        );
    }

    #[test]
    fn split_ref_halves() {
        assert_eq!(split_ref("file.yaml#/a/b"), ("file.yaml", "/a/b"));
        assert_eq!(split_ref("#/a/b"), ("", "/a/b"));
        assert_eq!(split_ref("file.yaml#"), ("file.yaml", ""));
        assert_eq!(split_ref(" file.yaml # /a "), ("file.yaml", "/a"));
        assert_eq!(split_ref(""), ("", ""));
    }
}
