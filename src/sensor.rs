//! TMP102 temperature client.
//!
//! Register-read only - the part's configuration surface belongs to board
//! init. The bus itself is a seam so the client tests on the host.

use core::fmt::Write;

/// Default TMP102 bus address (ADD0 to ground).
pub const TMP102_ADDR: u8 = 0x48;

/// Temperature register.
const REG_TEMPERATURE: u8 = 0x00;

/// Bus read failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusError;

/// Two-byte register read, as the I2C peripheral exposes it.
pub trait RegisterBus {
    fn read_reg(&mut self, addr: u8, reg: u8, out: &mut [u8; 2]) -> Result<(), BusError>;
}

/// Minimal TMP102 client.
pub struct Tmp102<B: RegisterBus> {
    bus: B,
    addr: u8,
}

impl<B: RegisterBus> Tmp102<B> {
    pub fn new(bus: B) -> Self {
        Self::with_addr(bus, TMP102_ADDR)
    }

    pub fn with_addr(bus: B, addr: u8) -> Self {
        Self { bus, addr }
    }

    /// Temperature in hundredths of a degree Celsius.
    ///
    /// The register is 12-bit left-justified, 0.0625 degC per LSB.
    pub fn read_centi_celsius(&mut self) -> Result<i32, BusError> {
        let mut raw = [0u8; 2];
        self.bus.read_reg(self.addr, REG_TEMPERATURE, &mut raw)?;

        let value = (((raw[0] as i8) as i16) << 4) | ((raw[1] >> 4) as i16);
        Ok(value as i32 * 625 / 100)
    }
}

/// Render centi-degrees as `NN.NN`, sign preserved for values above -1.
pub fn write_centi(out: &mut dyn Write, centi: i32) -> core::fmt::Result {
    let whole = centi / 100;
    let frac = (centi % 100).unsigned_abs();
    if centi < 0 && whole == 0 {
        write!(out, "-0.{:02}", frac)
    } else {
        write!(out, "{}.{:02}", whole, frac)
    }
}
