use crate::models::Chunk;

pub const DEFAULT_MAX_CHUNK_CHARS: usize = 2000;

pub struct ContentChunker;

impl ContentChunker {
    /// Split text into consecutive pieces of at most `max_chars` characters.
    ///
    /// Lengths are counted in chars, not bytes, so multi-byte text is never cut
    /// inside a code point. Boundaries ignore word and sentence structure.
    pub fn split(content: &str, max_chars: usize) -> Vec<Chunk> {
        if content.is_empty() {
            return vec![];
        }

        let max_chars = max_chars.max(1);
        let mut chunks = Vec::new();
        let mut chunk_start = 0;
        let mut chars_in_chunk = 0;

        for (byte_pos, _) in content.char_indices() {
            if chars_in_chunk == max_chars {
                chunks.push(Chunk {
                    text: content[chunk_start..byte_pos].to_string(),
                    index: chunks.len(),
                });
                chunk_start = byte_pos;
                chars_in_chunk = 0;
            }
            chars_in_chunk += 1;
        }

        chunks.push(Chunk {
            text: content[chunk_start..].to_string(),
            index: chunks.len(),
        });

        chunks
    }
}
