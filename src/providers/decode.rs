//! Incremental JSON extraction for streamed chat responses
//!
//! The generation API streams newline-delimited JSON objects, but network
//! chunks split them arbitrarily. The decoder accumulates bytes and
//! extracts every complete top-level object with a single-pass
//! bracket-matching scan that is string- and escape-aware.

use crate::errors::{AssistantError, Result};

/// Maximum accumulation buffer (1MB)
pub const MAX_BUFFER_SIZE: usize = 1_048_576;

/// Stateful extractor of complete JSON objects from a byte stream
#[derive(Debug)]
pub struct JsonChunkDecoder {
    buffer: Vec<u8>,
    max_buffer_size: usize,
}

impl JsonChunkDecoder {
    /// Create a decoder with the default buffer bound
    pub fn new() -> Self {
        Self::with_capacity(MAX_BUFFER_SIZE)
    }

    /// Create a decoder with a custom buffer bound
    pub fn with_capacity(max_buffer_size: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(4096),
            max_buffer_size,
        }
    }

    /// Append bytes and drain every complete JSON object now available
    pub fn push(&mut self, bytes: &[u8]) -> Result<Vec<String>> {
        if self.buffer.len() + bytes.len() > self.max_buffer_size {
            return Err(AssistantError::Streaming(format!(
                "decode buffer overflow: {} bytes exceeds maximum {}",
                self.buffer.len() + bytes.len(),
                self.max_buffer_size
            )));
        }

        self.buffer.extend_from_slice(bytes);

        let mut objects = Vec::new();
        while let Some((start, end)) = self.find_complete_object()? {
            let json = String::from_utf8_lossy(&self.buffer[start..=end]).into_owned();
            self.buffer.drain(..=end);
            objects.push(json);
        }
        Ok(objects)
    }

    /// Locate the first complete top-level object via bracket matching
    ///
    /// Braces inside string literals (including escaped quotes) are
    /// ignored. Returns byte indices of the object's `{` and `}`.
    fn find_complete_object(&self) -> Result<Option<(usize, usize)>> {
        let mut depth = 0i32;
        let mut start: Option<usize> = None;
        let mut in_string = false;
        let mut escape_next = false;

        for (i, &byte) in self.buffer.iter().enumerate() {
            if escape_next {
                escape_next = false;
                continue;
            }

            if byte == b'\\' && in_string {
                escape_next = true;
                continue;
            }

            if byte == b'"' {
                in_string = !in_string;
                continue;
            }

            if in_string {
                continue;
            }

            match byte {
                b'{' => {
                    if depth == 0 {
                        start = Some(i);
                    }
                    depth += 1;
                }
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        if let Some(start) = start {
                            return Ok(Some((start, i)));
                        }
                    }
                    if depth < 0 {
                        return Err(AssistantError::Streaming(
                            "mismatched braces in stream".to_string(),
                        ));
                    }
                }
                _ => {}
            }
        }

        Ok(None)
    }

    /// Bytes currently buffered
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

impl Default for JsonChunkDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_object_in_one_push() {
        let mut decoder = JsonChunkDecoder::new();

        let json = r#"{"message": {"content": "hola"}, "done": false}"#;
        let objects = decoder.push(json.as_bytes()).unwrap();

        assert_eq!(objects, [json]);
        assert!(decoder.is_empty());
    }

    #[test]
    fn test_object_split_across_pushes() {
        let mut decoder = JsonChunkDecoder::new();

        assert!(decoder.push(br#"{"message": {"con"#).unwrap().is_empty());
        let objects = decoder.push(br#"tent": "ho"}, "done": false}"#).unwrap();

        assert_eq!(objects.len(), 1);
        assert!(objects[0].contains("done"));
    }

    #[test]
    fn test_multiple_objects_drained_at_once() {
        let mut decoder = JsonChunkDecoder::new();

        let data = "{\"a\": 1}\n{\"b\": 2}\n";
        let objects = decoder.push(data.as_bytes()).unwrap();

        assert_eq!(objects, [r#"{"a": 1}"#, r#"{"b": 2}"#]);
    }

    #[test]
    fn test_braces_inside_strings_ignored() {
        let mut decoder = JsonChunkDecoder::new();

        let json = r#"{"content": "llaves {dentro} y \"comillas\""}"#;
        let objects = decoder.push(json.as_bytes()).unwrap();

        assert_eq!(objects, [json]);
    }

    #[test]
    fn test_buffer_overflow_is_error() {
        let mut decoder = JsonChunkDecoder::with_capacity(16);

        let result = decoder.push(&[b'a'; 32]);
        assert!(matches!(result, Err(AssistantError::Streaming(_))));
    }
}
