use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

/// Initial read capacity for a captured stream.
const INITIAL_BUFFER_CAPACITY: usize = 64 * 1024;

/// Ceiling for a single accumulated line. A line longer than this is
/// reported as a stream error rather than truncated.
const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Turns a raw byte stream into normalized text lines.
///
/// Lines are split on `\n`; trailing `\r\n`, `\n` and `\r` variants are
/// stripped. The accumulation buffer grows adaptively for long lines up to
/// [`MAX_LINE_BYTES`]. A non-EOF read fault is downgraded to one synthetic
/// `[stream error: ...]` line, after which the framer stops. Not restartable.
pub struct LineFramer<R> {
    reader: BufReader<R>,
    pending: Vec<u8>,
    done: bool,
}

impl<R: AsyncRead + Unpin> LineFramer<R> {
    pub fn new(source: R) -> Self {
        Self {
            reader: BufReader::with_capacity(INITIAL_BUFFER_CAPACITY, source),
            pending: Vec::new(),
            done: false,
        }
    }

    /// Next normalized line, or `None` once the stream is exhausted.
    ///
    /// Invalid UTF-8 is replaced lossily. A trailing line without a final
    /// newline is still yielded.
    pub async fn next_line(&mut self) -> Option<String> {
        if self.done {
            return None;
        }
        loop {
            let chunk = match self.reader.fill_buf().await {
                Ok(chunk) => chunk,
                Err(err) => {
                    self.done = true;
                    return Some(format!("[stream error: {err}]"));
                }
            };

            if chunk.is_empty() {
                // Clean end of stream.
                self.done = true;
                if self.pending.is_empty() {
                    return None;
                }
                return Some(normalize(std::mem::take(&mut self.pending)));
            }

            if let Some(pos) = chunk.iter().position(|&b| b == b'\n') {
                self.pending.extend_from_slice(&chunk[..=pos]);
                self.reader.consume(pos + 1);
                return Some(normalize(std::mem::take(&mut self.pending)));
            }

            self.pending.extend_from_slice(chunk);
            let consumed = chunk.len();
            self.reader.consume(consumed);

            if self.pending.len() > MAX_LINE_BYTES {
                self.done = true;
                return Some(format!("[stream error: line exceeds {MAX_LINE_BYTES} bytes]"));
            }
        }
    }
}

/// Strip trailing CR/LF variants and decode lossily.
fn normalize(mut bytes: Vec<u8>) -> String {
    while matches!(bytes.last(), Some(b'\n' | b'\r')) {
        bytes.pop();
    }
    String::from_utf8_lossy(&bytes).into_owned()
}
