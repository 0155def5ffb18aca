use bytes::{BufMut, Bytes, BytesMut};

/// Removes emulation prevention bytes (the `03` in `00 00 03`) from a NAL unit.
///
/// A `00 00 03` at the very end of the buffer is also collapsed, which is what
/// a cabac_zero_word trailer looks like.
pub fn nalu_to_rbsp(data: &[u8]) -> Bytes {
    let mut buffer = BytesMut::with_capacity(data.len());
    let mut zeros = 0;

    for &byte in data {
        if zeros >= 2 && byte == 0x03 {
            zeros = 0;
            continue;
        }
        buffer.put_u8(byte);
        zeros = if byte == 0 { zeros + 1 } else { 0 };
    }

    buffer.freeze()
}

/// Inserts emulation prevention bytes so that no start code can appear in the payload.
pub fn rbsp_to_nalu(data: &[u8]) -> Bytes {
    let mut buffer = BytesMut::with_capacity(data.len() + data.len() / 64 + 1);
    let mut zeros = 0;

    for &byte in data {
        if zeros >= 2 && byte <= 0x03 {
            buffer.put_u8(0x03);
            zeros = 0;
        }
        buffer.put_u8(byte);
        zeros = if byte == 0 { zeros + 1 } else { 0 };
    }

    buffer.freeze()
}

/// Length of `data` without its trailing zero bytes.
pub fn trimmed_len(data: &[u8]) -> usize {
    data.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1)
}
