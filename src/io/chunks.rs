use crate::error::{DocumentError, DocumentResult};

/// A contiguous run of tokens sharing a chunk label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Phrase label ("NP", "VP", ...); `None` for tokens outside any chunk
    pub label: Option<String>,
    pub start: usize,
    /// Exclusive
    pub end: usize,
}

/// Decode per-token BIO tags (`B-NP`, `I-NP`, `O`) into chunks.
///
/// An `I-` tag must continue a chunk with the same label; one at the start of the
/// sentence, after `O` or after a different label is an [`DocumentError::IllegalChunkTag`].
pub fn decode_chunks(tags: &[String]) -> DocumentResult<Vec<Chunk>> {
    let mut chunks: Vec<Chunk> = Vec::new();
    for (index, tag) in tags.iter().enumerate() {
        let illegal = || DocumentError::IllegalChunkTag {
            index,
            tag: tag.clone(),
        };
        if tag == "O" {
            chunks.push(Chunk {
                label: None,
                start: index,
                end: index + 1,
            });
            continue;
        }
        let (prefix, label) = tag.split_once('-').ok_or_else(illegal)?;
        match prefix {
            "B" => chunks.push(Chunk {
                label: Some(label.to_string()),
                start: index,
                end: index + 1,
            }),
            "I" => {
                let current = chunks
                    .last_mut()
                    .filter(|c| c.end == index && c.label.as_deref() == Some(label))
                    .ok_or_else(illegal)?;
                current.end = index + 1;
            }
            _ => return Err(illegal()),
        }
    }
    Ok(chunks)
}
