use crate::error::ConfigError;
use crate::models::{Chunk, PageText};
use sha2::{Digest, Sha256};
use tracing::debug;
use uuid::Uuid;

/// Boundaries tried in order when picking where a chunk ends. The cut lands
/// right after the separator.
const SEPARATORS: [&str; 6] = ["\n\n", "\n", ". ", "! ", "? ", " "];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1_000,
            chunk_overlap: 200,
        }
    }
}

impl ChunkingConfig {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, ConfigError> {
        let config = Self {
            chunk_size,
            chunk_overlap,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::InvalidChunking(
                "chunk size must be greater than zero".to_string(),
            ));
        }
        if self.chunk_size <= self.chunk_overlap {
            return Err(ConfigError::InvalidChunking(format!(
                "chunk size {} must be greater than overlap {}",
                self.chunk_size, self.chunk_overlap
            )));
        }
        Ok(())
    }
}

/// Splits one page of text into windows of at most `chunk_size` characters
/// where each window repeats the last `chunk_overlap` characters of the one
/// before it.
pub fn split_text(text: &str, config: ChunkingConfig) -> Result<Vec<String>, ConfigError> {
    config.validate()?;

    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return Ok(Vec::new());
    }

    let mut windows = Vec::new();
    let mut start = 0;
    loop {
        let limit = start + config.chunk_size;
        if limit >= chars.len() {
            windows.push(chars[start..].iter().collect());
            break;
        }

        let earliest = start + (config.chunk_overlap + 1).max(config.chunk_size / 2);
        let end = find_cut(&chars, earliest, limit).unwrap_or(limit);
        windows.push(chars[start..end].iter().collect());

        // end > start + overlap, so this always advances
        start = end - config.chunk_overlap;
    }

    Ok(windows)
}

/// Latest position in `earliest..=limit` that directly follows a separator,
/// trying coarser separators first.
fn find_cut(chars: &[char], earliest: usize, limit: usize) -> Option<usize> {
    SEPARATORS.iter().find_map(|separator| {
        let separator: Vec<char> = separator.chars().collect();
        (earliest..=limit)
            .rev()
            .find(|&cut| cut >= separator.len() && chars[cut - separator.len()..cut] == separator[..])
    })
}

/// Inverse of [`split_text`]: drops the repeated overlap from every window
/// after the first.
pub fn reassemble<S: AsRef<str>>(windows: &[S], chunk_overlap: usize) -> String {
    let mut text = String::new();
    for (index, window) in windows.iter().enumerate() {
        let window = window.as_ref();
        if index == 0 {
            text.push_str(window);
        } else {
            text.extend(window.chars().skip(chunk_overlap));
        }
    }
    text
}

/// Chunks every page of a document. Chunk indexes run across the whole
/// document, not per page.
pub fn chunk_pages(
    pages: &[PageText],
    document_id: &str,
    config: ChunkingConfig,
) -> Result<Vec<Chunk>, ConfigError> {
    config.validate()?;

    let mut chunks = Vec::new();
    let mut cursor = 0u32;

    for page in pages {
        for content in split_text(&page.text, config)? {
            chunks.push(Chunk {
                id: make_chunk_id(document_id, page.number, cursor, &content),
                document_id: document_id.to_string(),
                page: page.number,
                chunk_index: cursor,
                content,
            });
            cursor = cursor.saturating_add(1);
        }
    }

    debug!(
        document_id,
        pages = pages.len(),
        chunks = chunks.len(),
        "chunked document"
    );
    Ok(chunks)
}

fn make_chunk_id(document_id: &str, page: u32, index: u32, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(document_id.as_bytes());
    hasher.update(page.to_le_bytes());
    hasher.update(index.to_le_bytes());
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();

    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    uuid::Builder::from_random_bytes(bytes).into_uuid().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn financial_text(len: usize) -> String {
        let sentence = "Total revenue for the fiscal year increased by 12 percent. ";
        let mut text = String::new();
        let mut paragraph = 0;
        while text.chars().count() < len {
            text.push_str(sentence);
            paragraph += 1;
            if paragraph % 5 == 0 {
                text.push_str("\n\n");
            }
        }
        text.chars().take(len).collect()
    }

    #[test]
    fn overlap_not_below_size_is_rejected() {
        assert!(ChunkingConfig::new(200, 200).is_err());
        assert!(ChunkingConfig::new(100, 200).is_err());
        assert!(ChunkingConfig::new(0, 0).is_err());

        let config = ChunkingConfig {
            chunk_size: 10,
            chunk_overlap: 10,
        };
        assert!(matches!(
            split_text("some text", config),
            Err(ConfigError::InvalidChunking(_))
        ));
    }

    #[test]
    fn page_of_2500_chars_reassembles_exactly() {
        let config = ChunkingConfig::new(1_000, 200).unwrap();
        let text = financial_text(2_500);
        assert_eq!(text.chars().count(), 2_500);

        let windows = split_text(&text, config).unwrap();

        assert!(windows.len() >= 3);
        assert!(windows.iter().all(|window| window.chars().count() <= 1_000));
        for pair in windows.windows(2) {
            let tail: String = pair[0].chars().skip(pair[0].chars().count() - 200).collect();
            let head: String = pair[1].chars().take(200).collect();
            assert_eq!(tail, head);
        }
        assert_eq!(reassemble(&windows, 200), text);
    }

    #[test]
    fn cuts_prefer_paragraph_breaks() {
        let first = "a".repeat(60);
        let second = "b".repeat(60);
        let text = format!("{first}\n\n{second}");
        let config = ChunkingConfig::new(100, 10).unwrap();

        let windows = split_text(&text, config).unwrap();

        assert_eq!(windows[0], format!("{first}\n\n"));
        assert_eq!(reassemble(&windows, 10), text);
    }

    #[test]
    fn text_without_boundaries_is_hard_cut() {
        let text = "x".repeat(250);
        let config = ChunkingConfig::new(100, 20).unwrap();

        let windows = split_text(&text, config).unwrap();

        assert_eq!(windows[0].len(), 100);
        assert_eq!(reassemble(&windows, 20), text);
    }

    #[test]
    fn short_and_empty_pages() {
        let config = ChunkingConfig::default();
        assert!(split_text("", config).unwrap().is_empty());
        assert_eq!(split_text("Net income", config).unwrap(), vec!["Net income"]);
    }

    #[test]
    fn multibyte_text_is_split_on_characters() {
        let text = "Laba bersih naik 5% - € 1.200 juta. ".repeat(20);
        let config = ChunkingConfig::new(50, 10).unwrap();

        let windows = split_text(&text, config).unwrap();

        assert!(windows.iter().all(|window| window.chars().count() <= 50));
        assert_eq!(reassemble(&windows, 10), text);
    }

    #[test]
    fn chunk_pages_keeps_page_numbers_and_indexes() {
        let pages = vec![
            PageText {
                number: 1,
                text: financial_text(300),
            },
            PageText {
                number: 4,
                text: "Notes to the statements.".to_string(),
            },
        ];
        let config = ChunkingConfig::new(120, 20).unwrap();

        let chunks = chunk_pages(&pages, "doc-1", config).unwrap();

        let last = chunks.last().unwrap();
        assert_eq!(last.page, 4);
        assert!(chunks.iter().all(|chunk| chunk.document_id == "doc-1"));
        assert!(chunks.iter().all(|chunk| chunk.page == 1 || chunk.page == 4));
        assert_eq!(
            chunks.iter().map(|chunk| chunk.chunk_index).collect::<Vec<_>>(),
            (0..chunks.len() as u32).collect::<Vec<_>>()
        );

        let page_one: Vec<&str> = chunks
            .iter()
            .filter(|chunk| chunk.page == 1)
            .map(|chunk| chunk.content.as_str())
            .collect();
        assert_eq!(reassemble(&page_one, 20), pages[0].text);
    }

    #[test]
    fn chunk_ids_are_stable_uuids() {
        let pages = vec![PageText {
            number: 1,
            text: "Operating expenses".to_string(),
        }];
        let config = ChunkingConfig::default();

        let first = chunk_pages(&pages, "doc-1", config).unwrap();
        let second = chunk_pages(&pages, "doc-1", config).unwrap();
        let other = chunk_pages(&pages, "doc-2", config).unwrap();

        assert_eq!(first[0].id, second[0].id);
        assert_ne!(first[0].id, other[0].id);
        assert!(Uuid::parse_str(&first[0].id).is_ok());
    }

    proptest! {
        #[test]
        fn split_is_lossless_and_bounded(
            text in "[a-z .\n]{0,600}",
            chunk_size in 2usize..120,
            overlap_ratio in 0.0f64..1.0,
        ) {
            let chunk_overlap = ((chunk_size - 1) as f64 * overlap_ratio) as usize;
            let config = ChunkingConfig::new(chunk_size, chunk_overlap).unwrap();

            let windows = split_text(&text, config).unwrap();

            prop_assert!(windows.iter().all(|window| {
                let len = window.chars().count();
                len > 0 && len <= chunk_size
            }), "every window must be non-empty and at most chunk_size chars");
            prop_assert_eq!(reassemble(&windows, chunk_overlap), text);
        }
    }
}
