//! E2 packet error check bytes.
//!
//! The device uses a plain modulo-256 sum, not a CRC. It must stay that way to
//! interoperate with real sensors.

/// Checksum of a read frame: `control + data`.
pub const fn checksum_read(control: u8, data: u8) -> u8 {
    control.wrapping_add(data)
}

/// Checksum of a write frame: `control + address + data`.
pub const fn checksum_write(control: u8, address: u8, data: u8) -> u8 {
    control.wrapping_add(address).wrapping_add(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_checksum_wraps_modulo_256() {
        assert_eq!(checksum_read(0x71, 0x00), 0x71);
        assert_eq!(checksum_read(0xF5, 0x20), 0x15);
    }

    #[test]
    fn write_checksum_sums_three_bytes() {
        assert_eq!(checksum_write(0x10, 0x10, 0x55), 0x75);
        assert_eq!(checksum_write(0x50, 0x00, 0xFF), 0x4F);
    }
}
