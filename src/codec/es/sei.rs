/// payloadType of a recovery point SEI message, in both codecs
pub const SEI_RECOVERY_POINT: u32 = 6;

/// payloadType of a user data unregistered SEI message
pub const SEI_USER_DATA_UNREGISTERED: u32 = 5;

/// Splits an SEI RBSP into `(payload_type, payload)` messages.
///
/// Stops at the trailing bits or at the first truncated message.
pub fn sei_messages(rbsp: &[u8]) -> Vec<(u32, &[u8])> {
    let mut messages = Vec::new();
    let mut pos = 0;

    while pos < rbsp.len() && rbsp[pos] != 0x80 {
        let Some(payload_type) = read_value(rbsp, &mut pos) else {
            break;
        };
        let Some(payload_size) = read_value(rbsp, &mut pos) else {
            break;
        };
        let Some(payload) = rbsp.get(pos..pos + payload_size as usize) else {
            break;
        };
        messages.push((payload_type, payload));
        pos += payload_size as usize;
    }

    messages
}

// 0xFF-extended payloadType / payloadSize
fn read_value(data: &[u8], pos: &mut usize) -> Option<u32> {
    let mut value = 0u32;
    loop {
        let byte = *data.get(*pos)?;
        *pos += 1;
        value = value.checked_add(byte as u32)?;
        if byte != 0xFF {
            return Some(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_sei_messages() {
        let rbsp = [0x06, 0x01, 0x84, 0x05, 0x02, 0xAA, 0xBB, 0x80];
        let messages = sei_messages(&rbsp);
        assert_eq!(messages, vec![(6, &[0x84][..]), (5, &[0xAA, 0xBB][..])]);
    }

    #[test]
    fn test_extended_payload_type() {
        let rbsp = [0xFF, 0x03, 0x00, 0x80];
        assert_eq!(sei_messages(&rbsp), vec![(258, &[][..])]);
    }

    #[test]
    fn test_truncated_message() {
        let rbsp = [0x06, 0x05, 0x84];
        assert!(sei_messages(&rbsp).is_empty());
    }
}
