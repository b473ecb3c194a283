//! Per-chunk transformation and in-order reassembly.

use thiserror::Error;
use tracing::{debug, info};

use super::splitter::Chunk;
use crate::transform::{TextTransform, TransformError};

/// Failure of the chunked processing stage. A single failed chunk fails the
/// whole document: silently dropping one chunk would yield an incomplete
/// but plausible-looking result.
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("transform failed for chunk {index}: {source}")]
    ChunkFailed {
        index: usize,
        #[source]
        source: TransformError,
    },
}

/// Apply `transform` to every chunk and join the outputs with single spaces
/// in chunk-index order.
///
/// Chunks are transformed independently; the transform never sees another
/// chunk's output. An empty chunk sequence yields an empty result without
/// invoking the transform.
pub async fn process(
    chunks: &[Chunk],
    transform: &dyn TextTransform,
) -> Result<String, ProcessingError> {
    let mut pieces = Vec::with_capacity(chunks.len());

    for chunk in chunks {
        debug!(
            "Transforming chunk {} ({} chars)",
            chunk.index,
            chunk.text.len()
        );
        let output = transform
            .transform(&chunk.text)
            .await
            .map_err(|source| ProcessingError::ChunkFailed {
                index: chunk.index,
                source,
            })?;
        pieces.push(output);
    }

    let result = pieces.join(" ");
    info!(
        "Processed {} chunks into {} chars",
        chunks.len(),
        result.len()
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Identity;

    #[async_trait]
    impl TextTransform for Identity {
        async fn transform(&self, text: &str) -> Result<String, TransformError> {
            Ok(text.to_string())
        }
    }

    struct FailAt {
        fail_index: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TextTransform for FailAt {
        async fn transform(&self, text: &str) -> Result<String, TransformError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call == self.fail_index {
                Err(TransformError::EmptyResponse)
            } else {
                Ok(text.to_uppercase())
            }
        }
    }

    fn chunks(texts: &[&str]) -> Vec<Chunk> {
        let mut start = 0;
        texts
            .iter()
            .enumerate()
            .map(|(index, text)| {
                let chunk = Chunk {
                    index,
                    start,
                    end: start + text.len(),
                    text: text.to_string(),
                };
                start += text.len();
                chunk
            })
            .collect()
    }

    #[tokio::test]
    async fn test_identity_transform_joins_in_index_order() {
        let chunks = chunks(&["alpha", "beta", "gamma"]);
        let result = process(&chunks, &Identity).await.unwrap();
        assert_eq!(result, "alpha beta gamma");
    }

    #[tokio::test]
    async fn test_empty_sequence_yields_empty_result_without_calls() {
        struct Panic;
        #[async_trait]
        impl TextTransform for Panic {
            async fn transform(&self, _text: &str) -> Result<String, TransformError> {
                panic!("transform must not be invoked for an empty sequence");
            }
        }
        let result = process(&[], &Panic).await.unwrap();
        assert_eq!(result, "");
    }

    #[tokio::test]
    async fn test_single_chunk_has_no_separator() {
        let chunks = chunks(&["only"]);
        assert_eq!(process(&chunks, &Identity).await.unwrap(), "only");
    }

    #[tokio::test]
    async fn test_failed_chunk_fails_the_whole_document() {
        let chunks = chunks(&["one", "two", "three"]);
        let transform = FailAt {
            fail_index: 1,
            calls: AtomicUsize::new(0),
        };

        let err = process(&chunks, &transform).await.unwrap_err();
        let ProcessingError::ChunkFailed { index, .. } = err;
        assert_eq!(index, 1);
    }

    #[tokio::test]
    async fn test_no_further_chunks_transformed_after_failure() {
        let chunks = chunks(&["one", "two", "three", "four"]);
        let transform = FailAt {
            fail_index: 0,
            calls: AtomicUsize::new(0),
        };

        assert!(process(&chunks, &transform).await.is_err());
        assert_eq!(transform.calls.load(Ordering::SeqCst), 1);
    }
}
