use std::io::{Cursor, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::SyncError;

const LONG_FRAME: usize = 64 * 1024;

fn frame_len(body_len: usize) -> anyhow::Result<u32> {
    u32::try_from(body_len).map_err(|_| anyhow::anyhow!("frame body of {body_len} bytes does not fit a u32 length"))
}

/// Writes `msg` as one frame: u32 little-endian body length, then the JSON body.
pub fn pack<T: Serialize>(msg: &T, wtr: &mut impl Write) -> anyhow::Result<()> {
    let body = serde_json::to_vec(msg)?;
    wtr.write_u32::<LittleEndian>(frame_len(body.len())?)?;
    wtr.write_all(&body)?;
    Ok(())
}

pub fn to_frame<T: Serialize>(msg: &T) -> Result<Vec<u8>, SyncError> {
    let mut frame = Vec::new();
    pack(msg, &mut frame).map_err(|e| SyncError::Malformed(e.to_string()))?;
    Ok(frame)
}

/// Returns the body range of the first complete frame in `input_buffer`.
pub fn dequeue_msg(input_buffer: &[u8]) -> Option<(usize, usize)> {
    if input_buffer.len() < 4 {
        return None
    }

    let mut rdr = Cursor::new(input_buffer);
    let msg_ln = rdr.read_u32::<LittleEndian>().ok()? as usize;

    if msg_ln > LONG_FRAME {
        tracing::debug!(len = msg_ln, "long frame");
    }

    let end = msg_ln + 4;

    if input_buffer.len() < end {
        return None
    }

    Some((4, end))
}

/// Decodes a single complete frame.
pub fn decode<T: DeserializeOwned>(frame: &[u8]) -> Result<T, SyncError> {
    let Some((begin, end)) = dequeue_msg(frame) else {
        return Err(SyncError::Malformed(format!("incomplete frame of {} bytes", frame.len())));
    };
    if end != frame.len() {
        return Err(SyncError::Malformed(format!("{} trailing bytes after frame", frame.len() - end)));
    }
    serde_json::from_slice(&frame[begin..end]).map_err(|e| SyncError::Malformed(e.to_string()))
}

/// Pops and decodes every complete frame at the front of `input_buffer`.
pub fn dequeue_and_decode<T: DeserializeOwned>(input_buffer: &mut Vec<u8>) -> Option<Result<T, SyncError>> {
    let (begin, end) = dequeue_msg(input_buffer)?;
    let msg = serde_json::from_slice(&input_buffer[begin..end]).map_err(|e| SyncError::Malformed(e.to_string()));
    input_buffer.drain(..end);
    Some(msg)
}
