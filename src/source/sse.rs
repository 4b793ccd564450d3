//! Event-stream frame decoding.
//!
//! Reads a `text/event-stream` body line by line and yields the raw `data`
//! payload of each dispatched event. Payloads are bytes: a frame that is not
//! valid UTF-8 is the caller's parse error, not a broken stream.

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Decodes server-sent events from a buffered async reader.
///
/// # Example
///
/// ```
/// use std::io::Cursor;
/// use statuswatch::source::EventStreamReader;
///
/// # tokio_test::block_on(async {
/// let body = Cursor::new(b"data: {\"siteStatuses\":{}}\n\n".to_vec());
/// let mut reader = EventStreamReader::new(body);
///
/// let frame = reader.next_event().await.unwrap();
/// assert_eq!(frame.as_deref(), Some(&b"{\"siteStatuses\":{}}"[..]));
/// assert_eq!(reader.next_event().await.unwrap(), None);
/// # });
/// ```
#[derive(Debug)]
pub struct EventStreamReader<R> {
    reader: R,
    line: Vec<u8>,
    data: Vec<u8>,
    has_data: bool,
}

impl<R> EventStreamReader<R>
where
    R: AsyncBufRead + Unpin,
{
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: Vec::new(),
            data: Vec::new(),
            has_data: false,
        }
    }

    /// Read until the next event is dispatched.
    ///
    /// Returns `Ok(None)` at end of stream. A partially received event is
    /// discarded at that point. Errors are I/O errors of the underlying
    /// reader only.
    pub async fn next_event(&mut self) -> std::io::Result<Option<Vec<u8>>> {
        loop {
            self.line.clear();
            if self.reader.read_until(b'\n', &mut self.line).await? == 0 {
                self.data.clear();
                self.has_data = false;
                return Ok(None);
            }

            let line = trim_line_end(&self.line);

            if line.is_empty() {
                let dispatch = self.has_data && !self.data.is_empty();
                self.has_data = false;
                let data = std::mem::take(&mut self.data);
                if dispatch {
                    return Ok(Some(data));
                }
                continue;
            }

            if line[0] == b':' {
                continue;
            }

            let (field, value) = match line.iter().position(|&b| b == b':') {
                Some(colon) => {
                    let value = &line[colon + 1..];
                    (&line[..colon], value.strip_prefix(b" ").unwrap_or(value))
                }
                None => (line, &[][..]),
            };

            // event, id and retry carry nothing the dashboard uses
            if field == b"data" {
                if self.has_data {
                    self.data.push(b'\n');
                }
                self.data.extend_from_slice(value);
                self.has_data = true;
            }
        }
    }
}

fn trim_line_end(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}
