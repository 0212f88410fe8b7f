//! Whole E2 frames composed from the framing engine and the checksum.
//!
//! Read frame: `START, control, ACK, data, ACK, checksum, NACK, STOP`.
//! Write frame: `START, control, ACK, address, ACK, data, ACK, checksum, ACK, STOP`.
//!
//! Once START has been issued every error path issues STOP before returning.

use crate::checksum::{checksum_read, checksum_write};
use crate::config::Config;
use crate::error::{Error, ErrorKind, Result};
use crate::framing::Framer;
use crate::interface::E2Bus;
use crate::log;

impl<B> Framer<'_, B>
where
    B: E2Bus,
{
    /// Runs `body` between START and STOP. A failing body still gets its STOP;
    /// the body's error wins over a STOP failure.
    fn framed<T>(&mut self, body: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.start()?;
        match body(self) {
            Ok(value) => {
                self.stop()?;
                Ok(value)
            }
            Err(err) => {
                let _ = self.stop();
                Err(err)
            }
        }
    }

    fn send_acked(&mut self, byte: u8, nack_message: &'static str) -> Result<()> {
        let mut elapsed = 0;
        self.write_byte(byte, &mut elapsed)?;
        if !self.read_ack(&mut elapsed)? {
            return Err(Error::new(ErrorKind::Nack, nack_message));
        }
        Ok(())
    }

    fn receive(&mut self, ack: bool) -> Result<u8> {
        let mut elapsed = 0;
        let value = self.read_byte(&mut elapsed)?;
        self.send_ack(ack, &mut elapsed)?;
        Ok(value)
    }
}

/// Reads the single data byte selected by `control` and verifies its checksum.
pub(crate) fn read_control_byte<B: E2Bus>(bus: &mut B, config: &Config, control: u8) -> Result<u8> {
    let (data, pec) = Framer::new(bus, config).framed(|framer| {
        framer.send_acked(control, "Control byte NACK")?;
        let data = framer.receive(true)?;
        // The last byte of a read is always NACKed.
        let pec = framer.receive(false)?;
        Ok((data, pec))
    })?;

    if pec != checksum_read(control, data) {
        log::trace!("ee871: checksum mismatch control={=u8:#x} pec={=u8:#x}", control, pec);
        return Err(Error::with_detail(
            ErrorKind::ChecksumMismatch,
            "PEC mismatch",
            i32::from(pec),
        ));
    }
    Ok(data)
}

/// Writes `data` to `address` under the command encoded in `control`.
pub(crate) fn write_command<B: E2Bus>(
    bus: &mut B,
    config: &Config,
    control: u8,
    address: u8,
    data: u8,
) -> Result<()> {
    Framer::new(bus, config).framed(|framer| {
        framer.send_acked(control, "Control byte NACK")?;
        framer.send_acked(address, "Address byte NACK")?;
        framer.send_acked(data, "Data byte NACK")?;
        framer.send_acked(checksum_write(control, address, data), "PEC NACK")
    })
}
