//! Incremental `text/event-stream` parser.

const BOM: &[u8] = b"\xEF\xBB\xBF";

/// A dispatched server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// Event type, `message` unless the stream set one.
    pub event: String,
    pub data: String,
    /// Last event id seen on the stream.
    pub id: Option<String>,
}

/// Turns byte chunks of an event stream into [`SseEvent`]s.
///
/// Lines may end in LF, CRLF or CR, and a chunk boundary may fall anywhere,
/// including inside a multi-byte character or between CR and LF.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    bom_checked: bool,
    skip_lf: bool,
    event: Option<String>,
    data: Vec<String>,
    last_id: Option<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and collect every event it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);

        // A byte order mark is only allowed at the very start of the stream.
        if !self.bom_checked {
            if self.buffer.len() < BOM.len() && BOM.starts_with(&self.buffer) {
                return Vec::new();
            }
            if self.buffer.starts_with(BOM) {
                self.buffer.drain(..BOM.len());
            }
            self.bom_checked = true;
        }

        let mut events = Vec::new();
        let mut start = 0;

        while start < self.buffer.len() {
            if self.skip_lf {
                self.skip_lf = false;
                if self.buffer[start] == b'\n' {
                    start += 1;
                    continue;
                }
            }

            let Some(offset) = self.buffer[start..]
                .iter()
                .position(|byte| *byte == b'\n' || *byte == b'\r')
            else {
                break;
            };

            let end = start + offset;
            self.skip_lf = self.buffer[end] == b'\r';
            let line = String::from_utf8_lossy(&self.buffer[start..end]).into_owned();
            start = end + 1;

            if let Some(event) = self.process_line(&line) {
                events.push(event);
            }
        }

        self.buffer.drain(..start);
        events
    }

    fn process_line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "data" => self.data.push(value.to_string()),
            "event" => self.event = Some(value.to_string()),
            "id" if !value.contains('\0') => self.last_id = Some(value.to_string()),
            // retry and unknown fields are ignored: there is no reconnection.
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }

        let data = self.data.join("\n");
        self.data.clear();

        Some(SseEvent {
            event: event
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| "message".to_string()),
            data,
            id: self.last_id.clone(),
        })
    }
}
