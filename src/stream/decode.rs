//! Newline-delimited JSON decoding of the stream response body.

use futures::{Stream, StreamExt};
use serde::Deserialize;

use crate::error::StreamError;

/// One decoded stream item. Objects without a `text` field (limit notices,
/// deletes) decode with empty text and match nothing.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct StreamItem {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Default)]
struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    fn extend(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    fn next_line(&mut self) -> Option<Vec<u8>> {
        let pos = self.buf.iter().position(|b| *b == b'\n')?;
        let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Some(line)
    }

    fn take_rest(&mut self) -> Option<Vec<u8>> {
        if self.buf.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.buf))
        }
    }
}

fn parse_line(line: &[u8]) -> Result<Option<StreamItem>, StreamError> {
    if line.iter().all(u8::is_ascii_whitespace) {
        // keep-alive
        return Ok(None);
    }
    Ok(Some(serde_json::from_slice(line)?))
}

/// Decode a chunked body into items. The stream ends when the body ends; a
/// transport or decode error is yielded once and ends it too.
pub fn decode_items<S, B, E>(body: S) -> impl Stream<Item = Result<StreamItem, StreamError>>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    StreamError: From<E>,
{
    async_stream::try_stream! {
        let mut lines = LineBuffer::default();
        futures::pin_mut!(body);

        while let Some(chunk) = body.next().await {
            lines.extend(chunk?.as_ref());
            while let Some(line) = lines.next_line() {
                if let Some(item) = parse_line(&line)? {
                    yield item;
                }
            }
        }

        if let Some(rest) = lines.take_rest() {
            if let Some(item) = parse_line(&rest)? {
                yield item;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    async fn collect(chunks: Vec<&'static str>) -> Vec<Result<StreamItem, StreamError>> {
        let body = stream::iter(
            chunks
                .into_iter()
                .map(|c| Ok::<_, serde_json::Error>(c.as_bytes())),
        );
        decode_items(body).collect().await
    }

    #[tokio::test]
    async fn test_items_split_across_chunks() {
        let items = collect(vec!["{\"text\":\"hel", "lo\"}\r\n{\"te", "xt\":\"world\"}\r\n"]).await;
        let texts: Vec<_> = items.into_iter().map(|i| i.unwrap().text).collect();
        assert_eq!(texts, vec!["hello", "world"]);
    }

    #[tokio::test]
    async fn test_keep_alive_lines_are_skipped() {
        let items = collect(vec!["\r\n", "\r\n{\"text\":\"a\"}\r\n", "  \n"]).await;
        assert_eq!(items.len(), 1);
    }

    #[tokio::test]
    async fn test_item_without_text_decodes_empty() {
        let items = collect(vec!["{\"limit\":{\"track\":3}}\n"]).await;
        assert_eq!(items[0].as_ref().unwrap(), &StreamItem::default());
    }

    #[tokio::test]
    async fn test_trailing_line_without_newline() {
        let items = collect(vec!["{\"text\":\"last\"}"]).await;
        assert_eq!(items[0].as_ref().unwrap().text, "last");
    }

    #[tokio::test]
    async fn test_malformed_json_ends_stream() {
        let items = collect(vec!["{\"text\":\"ok\"}\nnot json\n{\"text\":\"never\"}\n"]).await;
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(matches!(items[1], Err(StreamError::Decode(_))));
    }
}
