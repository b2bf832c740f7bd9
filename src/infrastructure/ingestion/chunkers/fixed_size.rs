//! Fixed-size chunking strategy with overlap

use crate::domain::ingestion::{chunker::helpers, Chunk, ChunkMetadata, ChunkingConfig, ChunkingStrategy};
use crate::domain::DomainError;

/// Chunking strategy that splits text into fixed-size overlapping chunks.
///
/// The scan is left to right. Each chunk nominally spans `chunk_size`
/// characters; within the trailing 20% of that window the cut is snapped
/// back to the last whitespace or sentence-ending punctuation so words are
/// not split mid-way. The next chunk starts `chunk_overlap` characters
/// before the previous cut, so consecutive chunks share exactly
/// `chunk_overlap` characters even when the cut was snapped.
///
/// All sizes are character counts (Unicode scalar values), not bytes - the
/// corpus is French and multi-byte characters are everywhere.
#[derive(Debug, Clone)]
pub struct FixedSizeChunker {
    /// Whether to snap cuts to word/sentence boundaries
    respect_boundaries: bool,
}

impl FixedSizeChunker {
    pub fn new() -> Self {
        Self {
            respect_boundaries: true,
        }
    }

    /// Set whether cuts snap to word/sentence boundaries
    pub fn with_boundaries(mut self, respect: bool) -> Self {
        self.respect_boundaries = respect;
        self
    }

    /// Snap a nominal cut back to the closest break character within the
    /// trailing window. Returns the nominal cut when no break exists there.
    fn snap_to_boundary(
        &self,
        chars: &[char],
        start: usize,
        nominal_end: usize,
        config: &ChunkingConfig,
    ) -> usize {
        let window = (config.chunk_size / 5).max(1);
        // never snap so far back that the next chunk would fail to advance
        let floor = nominal_end
            .saturating_sub(window)
            .max(start + config.chunk_overlap + 1);

        for position in (floor..=nominal_end).rev() {
            if helpers::is_break_char(chars[position - 1]) {
                return position;
            }
        }

        nominal_end
    }
}

impl Default for FixedSizeChunker {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkingStrategy for FixedSizeChunker {
    fn chunk(&self, content: &str, config: &ChunkingConfig) -> Result<Vec<Chunk>, DomainError> {
        config.validate()?;

        if content.trim().is_empty() {
            return Ok(vec![]);
        }

        let char_offsets: Vec<usize> = content.char_indices().map(|(offset, _)| offset).collect();
        let total = char_offsets.len();
        let byte_at = |char_position: usize| {
            char_offsets
                .get(char_position)
                .copied()
                .unwrap_or(content.len())
        };

        if total <= config.chunk_size {
            return Ok(vec![Chunk::new(content, ChunkMetadata::new(0, 0, total))]);
        }

        let chars: Vec<char> = content.chars().collect();
        let mut chunks = Vec::new();
        let mut start = 0;

        loop {
            let nominal_end = (start + config.chunk_size).min(total);
            let end = if nominal_end == total || !self.respect_boundaries {
                nominal_end
            } else {
                self.snap_to_boundary(&chars, start, nominal_end, config)
            };

            chunks.push(Chunk::new(
                &content[byte_at(start)..byte_at(end)],
                ChunkMetadata::new(chunks.len(), start, end),
            ));

            if end == total {
                break;
            }

            start = end - config.chunk_overlap;
        }

        Ok(chunks)
    }

    fn name(&self) -> &'static str {
        "fixed_size"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk_texts(content: &str, size: usize, overlap: usize) -> Vec<String> {
        let chunker = FixedSizeChunker::new();
        let config = ChunkingConfig::new(size, overlap);
        chunker
            .chunk(content, &config)
            .unwrap()
            .into_iter()
            .map(|c| c.content)
            .collect()
    }

    /// Dropping the final `overlap` chars of chunk i and appending chunk i+1
    /// must reconstruct the original text, with no gaps and no invented
    /// characters.
    fn assert_reconstructs(content: &str, size: usize, overlap: usize) {
        let chunks = chunk_texts(content, size, overlap);

        let mut rebuilt = String::new();
        for (i, chunk) in chunks.iter().enumerate() {
            if i + 1 < chunks.len() {
                let keep = chunk.chars().count() - overlap;
                rebuilt.extend(chunk.chars().take(keep));
            } else {
                rebuilt.push_str(chunk);
            }
        }

        assert_eq!(rebuilt, content);
    }

    #[test]
    fn test_empty_content() {
        assert!(chunk_texts("", 100, 10).is_empty());
    }

    #[test]
    fn test_whitespace_only_content() {
        assert!(chunk_texts("   \n\t  ", 100, 10).is_empty());
    }

    #[test]
    fn test_short_content_single_chunk() {
        let chunks = chunk_texts("Bonjour tout le monde", 100, 10);

        assert_eq!(chunks, vec!["Bonjour tout le monde"]);
    }

    #[test]
    fn test_content_exactly_chunk_size() {
        let content = "a".repeat(50);
        let chunks = chunk_texts(&content, 50, 10);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], content);
    }

    #[test]
    fn test_exact_offsets_without_boundaries() {
        let chunker = FixedSizeChunker::new().with_boundaries(false);
        let config = ChunkingConfig::new(6, 2);

        let chunks = chunker.chunk("abcdefghijklmnop", &config).unwrap();
        let texts: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();

        // step is 4: [0,6) [4,10) [8,14) [12,16)
        assert_eq!(texts, vec!["abcdef", "efghij", "ijklmn", "mnop"]);
    }

    #[test]
    fn test_consecutive_chunks_share_exact_overlap() {
        let content = "Les aides à la formation professionnelle sont versées chaque mois aux salariés.";
        let overlap = 8;
        let chunks = chunk_texts(content, 30, overlap);

        assert!(chunks.len() > 1);
        for pair in chunks.windows(2) {
            let tail: String = pair[0]
                .chars()
                .skip(pair[0].chars().count() - overlap)
                .collect();
            let head: String = pair[1].chars().take(overlap).collect();
            assert_eq!(tail, head, "chunks must share exactly {} chars", overlap);
        }
    }

    #[test]
    fn test_reconstruction_property() {
        let content = "Le contrat de travail est un accord par lequel une personne s'engage à travailler pour un employeur en échange d'une rémunération.";

        assert_reconstructs(content, 40, 10);
        assert_reconstructs(content, 25, 0);
        assert_reconstructs(content, 13, 5);
        assert_reconstructs("abcdefghijklmnopqrstuvwxyz", 7, 3);
    }

    #[test]
    fn test_quick_brown_fox_example() {
        let chunks = chunk_texts("The quick brown fox jumps.", 10, 3);

        assert_eq!(
            chunks,
            vec!["The quick ", "ck brown ", "wn fox jum", "jumps."]
        );
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 10);
        }
    }

    #[test]
    fn test_indices_are_contiguous_from_zero() {
        let chunker = FixedSizeChunker::new();
        let config = ChunkingConfig::new(20, 5);
        let content = "Une phrase assez longue pour produire plusieurs chunks successifs.";

        let chunks = chunker.chunk(content, &config).unwrap();

        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.metadata.chunk_index, i);
        }
    }

    #[test]
    fn test_char_offsets_cover_text() {
        let chunker = FixedSizeChunker::new();
        let config = ChunkingConfig::new(15, 4);
        let content = "début du texte, puis la suite, et enfin la fin";

        let chunks = chunker.chunk(content, &config).unwrap();
        let total = content.chars().count();

        assert_eq!(chunks.first().unwrap().metadata.char_start, 0);
        assert_eq!(chunks.last().unwrap().metadata.char_end, total);
        for pair in chunks.windows(2) {
            assert_eq!(
                pair[1].metadata.char_start,
                pair[0].metadata.char_end - config.chunk_overlap
            );
        }
    }

    #[test]
    fn test_multibyte_characters() {
        // every char is 2 bytes in UTF-8; arithmetic must stay on chars
        let content = "éèêëàâäôöùûüçîï".repeat(4);
        let chunks = chunk_texts(&content, 10, 2);

        for chunk in &chunks {
            assert!(chunk.chars().count() <= 10);
        }
        assert_reconstructs(&content, 10, 2);
    }

    #[test]
    fn test_boundary_snapping_avoids_mid_word_cut() {
        // the space at offset 8 sits inside the trailing window of the first
        // chunk, so the cut snaps back to it instead of splitting "bcdef"
        let chunks = chunk_texts("aaaaaaaa bcdef", 10, 0);
        assert_eq!(chunks, vec!["aaaaaaaa ", "bcdef"]);

        // no boundary anywhere: exact cut at the nominal offset
        let hard = chunk_texts("bbbbbbbbbbbbbbb", 10, 0);
        assert_eq!(hard[0].chars().count(), 10);
    }

    #[test]
    fn test_final_chunk_not_padded() {
        let chunker = FixedSizeChunker::new().with_boundaries(false);
        let config = ChunkingConfig::new(10, 0);

        let chunks = chunker.chunk("abcdefghijklm", &config).unwrap();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].content, "klm");
    }

    #[test]
    fn test_invalid_config_rejected() {
        let chunker = FixedSizeChunker::new();

        assert!(chunker
            .chunk("contenu", &ChunkingConfig::new(0, 0))
            .is_err());
        assert!(chunker
            .chunk("contenu", &ChunkingConfig::new(10, 10))
            .is_err());
    }

    #[test]
    fn test_restartable_identical_output() {
        let chunker = FixedSizeChunker::new();
        let config = ChunkingConfig::new(18, 6);
        let content = "Une même entrée produit toujours la même sortie, appel après appel.";

        let first: Vec<String> = chunker
            .chunk(content, &config)
            .unwrap()
            .into_iter()
            .map(|c| c.content)
            .collect();
        let second: Vec<String> = chunker
            .chunk(content, &config)
            .unwrap()
            .into_iter()
            .map(|c| c.content)
            .collect();

        assert_eq!(first, second);
    }

    #[test]
    fn test_name() {
        assert_eq!(FixedSizeChunker::new().name(), "fixed_size");
    }
}
