//! Message integrity checksum.
//!
//! A 32-bit wrapping sum of every byte. This guards against line noise, not
//! tampering: any single corrupted byte changes the sum.

/// Compute the checksum over `data`.
pub fn checksum(data: &[u8]) -> u32 {
    data.iter()
        .fold(0u32, |acc, byte| acc.wrapping_add(u32::from(*byte)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_is_zero() {
        assert_eq!(checksum(&[]), 0);
    }

    #[test]
    fn sums_bytes() {
        assert_eq!(checksum(&[0x01, 0x02, 0xFF]), 0x102);
    }

    #[test]
    fn single_byte_change_is_detected() {
        let data = [0x10u8, 0x20, 0x30, 0x40];
        let base = checksum(&data);
        for i in 0..data.len() {
            for mask in [0x01u8, 0x80, 0xFF] {
                let mut corrupted = data;
                corrupted[i] ^= mask;
                assert_ne!(checksum(&corrupted), base, "byte {i} mask {mask:#x}");
            }
        }
    }
}
