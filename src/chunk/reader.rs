use std::collections::HashMap;
use std::io::Result as IoResult;
use log::debug;
use crate::chunk::stream::ChunkStreamState;
use crate::protocol::{MessageHeader, RtmpMessage, DEFAULT_CHUNK_SIZE, EXTENDED_TIMESTAMP};
use crate::{ByteReader, Error, InputBuffer, Result};

/// One chunk whose header and slice are fully buffered
#[derive(Debug, Clone, Copy)]
struct ParsedChunk {
    format: u8,
    header: MessageHeader,
    timestamp_delta: u32,
    extended_timestamp: bool,
    /// Continues the message already being assembled on this id
    continuation: bool,
    header_len: usize,
    slice_len: usize,
}

/// Incremental chunk demultiplexer.
///
/// Input is only consumed one whole chunk (header plus payload slice) at a
/// time, so a chunk split across reads is simply picked up on the next call.
pub struct ChunkDecoder {
    /// Reassembly contexts by chunk stream id
    chunk_streams: HashMap<u32, ChunkStreamState>,

    /// Current chunk size for reading
    chunk_size_in: usize,
}

impl Default for ChunkDecoder {
    fn default() -> Self {
        ChunkDecoder::new()
    }
}

impl ChunkDecoder {
    /// Create new chunk decoder
    pub fn new() -> Self {
        ChunkDecoder {
            chunk_streams: HashMap::new(),
            chunk_size_in: DEFAULT_CHUNK_SIZE as usize,
        }
    }

    /// Set incoming chunk size
    pub fn set_chunk_size(&mut self, size: u32) {
        self.chunk_size_in = size.max(1) as usize;
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size_in
    }

    /// Reassembly context of a chunk stream id, if one exists
    pub fn chunk_stream(&self, chunk_stream_id: u32) -> Option<&ChunkStreamState> {
        self.chunk_streams.get(&chunk_stream_id)
    }

    /// Discard the partial message on a chunk stream (abort message)
    pub fn abort(&mut self, chunk_stream_id: u32) {
        if let Some(state) = self.chunk_streams.get_mut(&chunk_stream_id) {
            debug!("Aborting partial message on chunk stream {}", chunk_stream_id);
            state.abort();
        }
    }

    /// Consume chunks until one message completes or the input runs short.
    ///
    /// Returns after each completed message so that a set-chunk-size it
    /// carries can be applied before the next chunk is parsed.
    pub fn decode(&mut self, input: &mut InputBuffer) -> Result<Option<RtmpMessage>> {
        while let Some(chunk) = self.parse_chunk(input.peek())? {
            let csid = chunk.header.chunk_stream_id;
            let state = self
                .chunk_streams
                .entry(csid)
                .or_insert_with(|| ChunkStreamState::new(csid));

            state.format = chunk.format;
            state.timestamp_delta = chunk.timestamp_delta;
            state.extended_timestamp = chunk.extended_timestamp;
            if !chunk.continuation {
                state.start_message(chunk.header);
            }

            let end = chunk.header_len + chunk.slice_len;
            let completed = state.add_chunk_data(&input.peek()[chunk.header_len..end]);
            input.consume(end);

            if completed.is_some() {
                return Ok(completed);
            }
        }
        Ok(None)
    }

    /// Parse the chunk at the front of `data` without consuming anything.
    /// `Ok(None)` means more bytes are needed.
    fn parse_chunk(&self, data: &[u8]) -> Result<Option<ParsedChunk>> {
        let mut reader = ByteReader::new(data);

        let Some((format, csid)) = read_basic_header(&mut reader) else {
            return Ok(None);
        };

        let fresh;
        let prev = match self.chunk_streams.get(&csid) {
            Some(state) => state,
            None if format == 0 => {
                fresh = ChunkStreamState::new(csid);
                &fresh
            }
            None => {
                return Err(Error::chunk(format!(
                    "Format {} chunk on chunk stream {} without a previous header",
                    format, csid
                )));
            }
        };

        let Ok(mut chunk) = read_message_header(&mut reader, format, prev) else {
            return Ok(None);
        };
        chunk.header.chunk_stream_id = csid;
        chunk.header_len = reader.position();

        let message_remaining = if chunk.continuation {
            prev.bytes_remaining()
        } else {
            chunk.header.message_length as usize
        };
        chunk.slice_len = message_remaining.min(self.chunk_size_in);

        if !reader.has_remaining(chunk.slice_len) {
            return Ok(None);
        }
        Ok(Some(chunk))
    }
}

/// Basic header: format in the top two bits, chunk stream id in 1-3 bytes
fn read_basic_header(reader: &mut ByteReader) -> Option<(u8, u32)> {
    let first = reader.read_u8().ok()?;
    let format = first >> 6;
    let csid = match first & 0x3F {
        0 => reader.read_u8().ok()? as u32 + 64,
        1 => reader.read_u16_le().ok()? as u32 + 64,
        n => n as u32,
    };
    Some((format, csid))
}

fn read_message_header(
    reader: &mut ByteReader,
    format: u8,
    prev: &ChunkStreamState,
) -> IoResult<ParsedChunk> {
    let mut header = prev.header;
    let mut timestamp_delta = prev.timestamp_delta;
    let mut continuation = false;
    let extended_timestamp;

    match format {
        0 => {
            let timestamp = reader.read_u24_be()?;
            header.message_length = reader.read_u24_be()?;
            header.message_type = reader.read_u8()?;
            header.message_stream_id = reader.read_u32_le()?;
            extended_timestamp = timestamp == EXTENDED_TIMESTAMP;
            header.timestamp = if extended_timestamp {
                reader.read_u32_be()?
            } else {
                timestamp
            };
            timestamp_delta = 0;
        }
        1 | 2 => {
            let mut delta = reader.read_u24_be()?;
            if format == 1 {
                header.message_length = reader.read_u24_be()?;
                header.message_type = reader.read_u8()?;
            }
            extended_timestamp = delta == EXTENDED_TIMESTAMP;
            if extended_timestamp {
                delta = reader.read_u32_be()?;
            }
            header.timestamp = prev.header.timestamp.wrapping_add(delta);
            timestamp_delta = delta;
        }
        _ => {
            extended_timestamp = prev.extended_timestamp;
            if extended_timestamp {
                reader.skip(4)?;
            }
            if prev.is_assembling() {
                continuation = true;
            } else {
                header.timestamp = prev.header.timestamp.wrapping_add(prev.timestamp_delta);
            }
        }
    }

    Ok(ParsedChunk {
        format,
        header,
        timestamp_delta,
        extended_timestamp,
        continuation,
        header_len: 0,
        slice_len: 0,
    })
}
