use byteorder::{LittleEndian, WriteBytesExt};

use crate::framing::types::{ChunkHeader, FramedChunk};

/// Encode a framed chunk into canonical wire format.
///
/// Layout:
///
/// ```text
/// [ sequence_index (4) ]
/// [ total_chunks   (4) ]
/// [ payload_length (4) ]
/// [ checksum      (16) ]
/// [ chunk_bytes    (N) ]
/// ```
pub fn encode_chunk(chunk: &FramedChunk) -> Vec<u8> {
    let expected = chunk.wire_len();
    let mut wire = Vec::with_capacity(expected);

    // --- Header ---
    write_header(&mut wire, &chunk.header);

    // --- Body ---
    wire.extend_from_slice(&chunk.data);

    debug_assert_eq!(wire.len(), expected);
    wire
}

fn write_header(wire: &mut Vec<u8>, header: &ChunkHeader) {
    // Writes into a Vec cannot fail.
    let _ = wire.write_u32::<LittleEndian>(header.sequence_index);
    let _ = wire.write_u32::<LittleEndian>(header.total_chunks);
    let _ = wire.write_u32::<LittleEndian>(header.payload_length);
    wire.extend_from_slice(&header.checksum);
}
