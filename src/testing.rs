//! Bit-level EE871 bus simulator for unit tests.
//!
//! Models the slave side of the E2 protocol: it watches the master's line
//! changes, detects START/STOP, samples bits on rising clock edges and drives
//! its own data output after falling edges, exactly as a real device would.

use crate::checksum::{checksum_read, checksum_write};
use crate::interface::E2Bus;
use crate::registers::{
    MAIN_AVAIL_MEAS, MAIN_CUSTOM_PTR, MAIN_CUSTOM_WRITE, MAIN_TYPE_HI, MAIN_TYPE_LO,
    MAIN_TYPE_SUB,
};

pub(crate) struct SimDevice {
    pub address: u8,
    pub main: [u8; 16],
    pub memory: [u8; 256],
    pub pointer: u8,

    // Fault injection.
    pub respond: bool,
    pub nack_data: bool,
    pub corrupt_checksum: bool,
    pub ignore_writes: bool,
    pub scl_stuck_low: bool,
    pub stretch_us: u32,
    sda_held_pulses: Option<u32>,

    // Observations.
    pub starts: u32,
    pub stops: u32,
    pub writes: u32,
    pub pulses: u32,
    pub waited_us: u64,

    // Line state; `true` means released.
    m_scl: bool,
    m_sda: bool,
    d_sda: bool,
    stretch_left: u32,

    // Slave protocol state.
    active: bool,
    ignoring: bool,
    rose: bool,
    bit: u8,
    shift: u8,
    frame: u8,
    transmitting: bool,
    tx: u8,
    control: u8,
    tx_data: u8,
    received: [u8; 3],
    complete: bool,
}

impl SimDevice {
    /// A responsive EE871 at address 0 advertising every feature.
    pub fn new() -> Self {
        let mut main = [0u8; 16];
        main[usize::from(MAIN_TYPE_LO)] = 0x67;
        main[usize::from(MAIN_TYPE_HI)] = 0x03;
        main[usize::from(MAIN_TYPE_SUB)] = 0x09;
        main[usize::from(MAIN_AVAIL_MEAS)] = 0x08;

        let mut memory = [0u8; 256];
        memory[0x07] = 0xF7;
        memory[0x08] = 0x03;
        memory[0x09] = 0x01;

        Self {
            address: 0,
            main,
            memory,
            pointer: 0,
            respond: true,
            nack_data: false,
            corrupt_checksum: false,
            ignore_writes: false,
            scl_stuck_low: false,
            stretch_us: 0,
            sda_held_pulses: None,
            starts: 0,
            stops: 0,
            writes: 0,
            pulses: 0,
            waited_us: 0,
            m_scl: true,
            m_sda: true,
            d_sda: true,
            stretch_left: 0,
            active: false,
            ignoring: false,
            rose: false,
            bit: 0,
            shift: 0,
            frame: 0,
            transmitting: false,
            tx: 0,
            control: 0,
            tx_data: 0,
            received: [0; 3],
            complete: false,
        }
    }

    /// Holds the data line low until `pulses` more clock pulses have been seen.
    pub fn hold_sda_for_pulses(&mut self, pulses: u32) {
        self.pulses = 0;
        self.sda_held_pulses = Some(pulses);
    }

    pub fn set_main_u16(&mut self, low: u8, high: u8, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        self.main[usize::from(low)] = lo;
        self.main[usize::from(high)] = hi;
    }

    pub fn set_memory_u16(&mut self, low: u8, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        self.memory[usize::from(low)] = lo;
        self.memory[usize::from(low) + 1] = hi;
    }

    fn sda_held(&self) -> bool {
        self.sda_held_pulses.is_some_and(|n| self.pulses < n)
    }

    fn on_start(&mut self) {
        self.starts += 1;
        self.active = true;
        self.ignoring = false;
        self.rose = false;
        self.bit = 0;
        self.shift = 0;
        self.frame = 0;
        self.transmitting = false;
        self.complete = false;
        self.d_sda = true;
    }

    fn on_stop(&mut self) {
        self.stops += 1;
        if self.active && self.complete {
            self.commit_write();
        }
        self.active = false;
        self.d_sda = true;
    }

    fn on_rise(&mut self) {
        if !self.active || self.ignoring {
            return;
        }
        self.rose = true;
        if self.bit < 8 && !self.transmitting {
            self.shift = (self.shift << 1) | u8::from(self.m_sda);
        }
    }

    fn on_fall(&mut self) {
        if !self.active || self.ignoring || !self.rose {
            return;
        }
        self.rose = false;
        self.bit += 1;
        match self.bit {
            8 if self.transmitting => self.d_sda = true,
            8 => {
                let byte = self.shift;
                let ack = self.accept(byte);
                self.d_sda = !ack;
            }
            9 => {
                self.d_sda = true;
                self.bit = 0;
                self.shift = 0;
                self.next_frame();
            }
            n if self.transmitting => self.d_sda = self.tx & (0x80 >> n) != 0,
            _ => {}
        }
    }

    /// Handles a fully received byte; returns whether to acknowledge it.
    fn accept(&mut self, byte: u8) -> bool {
        if self.frame == 0 {
            self.control = byte;
            return self.respond && (byte >> 1) & 0x07 == self.address;
        }
        if self.nack_data {
            return false;
        }
        self.received[usize::from(self.frame - 1)] = byte;
        true
    }

    fn next_frame(&mut self) {
        if self.frame == 0 && !(self.respond && (self.control >> 1) & 0x07 == self.address) {
            self.ignoring = true;
            return;
        }
        if self.frame > 0 && !self.transmitting && self.nack_data {
            self.ignoring = true;
            return;
        }
        self.frame += 1;
        let reading = self.control & 0x01 != 0;
        match (reading, self.frame) {
            (true, 1) => {
                self.tx_data = self.read_register(self.control >> 4);
                self.begin_transmit(self.tx_data);
            }
            (true, 2) => {
                let mut pec = checksum_read(self.control, self.tx_data);
                if self.corrupt_checksum {
                    pec ^= 0x01;
                }
                self.begin_transmit(pec);
            }
            (false, 1..=3) => {}
            (false, 4) => {
                self.complete = true;
                self.ignoring = true;
            }
            _ => {
                self.transmitting = false;
                self.ignoring = true;
            }
        }
    }

    fn begin_transmit(&mut self, byte: u8) {
        self.transmitting = true;
        self.tx = byte;
        self.d_sda = byte & 0x80 != 0;
    }

    fn read_register(&mut self, nibble: u8) -> u8 {
        if nibble == MAIN_CUSTOM_PTR {
            let value = self.memory[usize::from(self.pointer)];
            self.pointer = self.pointer.wrapping_add(1);
            value
        } else {
            self.main[usize::from(nibble)]
        }
    }

    fn commit_write(&mut self) {
        let [address, data, pec] = self.received;
        if pec != checksum_write(self.control, address, data) {
            return;
        }
        self.writes += 1;
        match self.control >> 4 {
            MAIN_CUSTOM_WRITE if !self.ignore_writes => {
                self.memory[usize::from(address)] = data;
            }
            MAIN_CUSTOM_PTR if address == 0 => self.pointer = data,
            _ => {}
        }
    }
}

impl E2Bus for SimDevice {
    fn set_scl(&mut self, level: bool) {
        let previous = self.m_scl;
        self.m_scl = level;
        if level && !previous {
            self.pulses = self.pulses.saturating_add(1);
            self.stretch_left = self.stretch_us;
            self.on_rise();
        } else if !level && previous {
            self.on_fall();
        }
    }

    fn set_sda(&mut self, level: bool) {
        let previous = self.m_sda;
        self.m_sda = level;
        if self.m_scl && previous != level {
            if level {
                self.on_stop();
            } else {
                self.on_start();
            }
        }
    }

    fn read_scl(&mut self) -> bool {
        self.m_scl && !self.scl_stuck_low && self.stretch_left == 0
    }

    fn read_sda(&mut self) -> bool {
        self.m_sda && self.d_sda && !self.sda_held()
    }

    fn delay_us(&mut self, us: u32) {
        self.waited_us += u64::from(us);
        self.stretch_left = self.stretch_left.saturating_sub(us);
    }
}
