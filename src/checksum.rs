/// Checksums protecting sensor payloads
use crate::error::ReadError;

/// CRC-8 generator x^8 + x^5 + x^4 + 1; the x^8 term is implicit in the shift.
const CRC8_POLYNOMIAL: u8 = 0x31;

/// Low byte of the sum of the payload bytes.
pub fn additive(payload: &[u8]) -> u8 {
    payload.iter().fold(0u8, |sum, &b| sum.wrapping_add(b))
}

/// Check a pulse-protocol frame: four payload bytes followed by their sum.
pub fn verify_additive(frame: &[u8]) -> Result<(), ReadError> {
    let Some((&expected, payload)) = frame.split_last() else {
        return Err(ReadError::Frame {
            expected: 5,
            found: 0,
        });
    };

    let computed = additive(payload);
    if computed != expected {
        return Err(ReadError::ChecksumMismatch { expected, computed });
    }
    Ok(())
}

/// CRC-8 with polynomial 0x131, initial value 0, no final XOR.
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc = 0u8;
    for &byte in data {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ CRC8_POLYNOMIAL
            } else {
                crc << 1
            };
        }
    }
    crc
}

/// Check `data` against the CRC byte the sensor sent after it.
pub fn verify_crc8(data: &[u8], expected: u8) -> Result<(), ReadError> {
    let computed = crc8(data);
    if computed != expected {
        return Err(ReadError::ChecksumMismatch { expected, computed });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Polynomial long division of the message times x^8, a byte at a time.
    fn reference_crc(data: &[u8]) -> u8 {
        let mut remainder: u32 = 0;
        for &byte in data {
            remainder = (remainder ^ u32::from(byte)) << 8;
            for bit in (8..16).rev() {
                if remainder & (1 << bit) != 0 {
                    remainder ^= 0x131 << (bit - 8);
                }
            }
        }
        (remainder & 0xFF) as u8
    }

    #[test]
    fn additive_accepts_matching_sum() {
        assert_eq!(verify_additive(&[0x37, 0x00, 0x16, 0x00, 0x4D]), Ok(()));
        // sum wraps past 255
        assert_eq!(verify_additive(&[0xFF, 0x02, 0x00, 0x00, 0x01]), Ok(()));
    }

    #[test]
    fn additive_rejects_wrong_sum() {
        assert_eq!(
            verify_additive(&[0x37, 0x00, 0x16, 0x00, 0x4E]),
            Err(ReadError::ChecksumMismatch {
                expected: 0x4E,
                computed: 0x4D
            })
        );
    }

    #[test]
    fn crc_matches_datasheet_examples() {
        assert_eq!(crc8(&[0x00, 0xDC]), 0x79);
        assert_eq!(crc8(&[0x68, 0x3A]), 0x7C);
        assert_eq!(crc8(&[0x4E, 0x85]), 0x6B);
        assert_eq!(crc8(&[]), 0x00);
    }

    #[test]
    fn crc_agrees_with_long_division() {
        for a in (0..=255u8).step_by(7) {
            for b in (0..=255u8).step_by(5) {
                assert_eq!(crc8(&[a]), reference_crc(&[a]));
                assert_eq!(crc8(&[a, b]), reference_crc(&[a, b]), "{a:#x} {b:#x}");
                assert_eq!(crc8(&[b, a, b]), reference_crc(&[b, a, b]));
            }
        }
    }

    #[test]
    fn verify_crc_accepts_iff_reference_matches() {
        let (a, b) = (0x68, 0x3A);
        for c in 0..=255u8 {
            let accepted = verify_crc8(&[a, b], c).is_ok();
            assert_eq!(accepted, reference_crc(&[a, b]) == c);
        }
    }
}
