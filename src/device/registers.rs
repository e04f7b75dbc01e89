use super::memory::Registers;
use crate::pin_map::PinNumber;
use derive_try_from_primitive::TryFromPrimitive;
use embedded_hal::blocking::delay::DelayUs;
use log::trace;
use std::fmt;
use std::thread;
use std::time::Duration;

/// Minimum time the pull control and pull clock signals need to propagate, in microseconds.
pub const PULL_SETTLE_US: u32 = 5;

/// Low two bits of GPPUD carry the pull direction code.
const PUD_MASK: u32 = 0b11;

/// Function select encoding of a pin, as written into its 3-bit GPFSEL field.
///
/// The alternate functions are not numbered in order, see "BCM2835 ARM Peripherals", table 6-2.
#[repr(u8)]
#[derive(TryFromPrimitive, Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Function {
    Input = 0b000,
    Output = 0b001,
    Alt0 = 0b100,
    Alt1 = 0b101,
    Alt2 = 0b110,
    Alt3 = 0b111,
    Alt4 = 0b011,
    Alt5 = 0b010,
}

impl Function {
    fn from_field(bits: u32) -> Self {
        use Function::*;

        match bits & 0b111 {
            0b000 => Input,
            0b001 => Output,
            0b100 => Alt0,
            0b101 => Alt1,
            0b110 => Alt2,
            0b011 => Alt4,
            0b010 => Alt5,
            _ => Alt3,
        }
    }
}

/// Built-in pull resistor setting of a pin, as written into GPPUD.
#[repr(u8)]
#[derive(TryFromPrimitive, Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum PullDirection {
    Off = 0b00,
    PullDown = 0b01,
    PullUp = 0b10,
}

impl fmt::Display for PullDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            PullDirection::Off => write!(f, "off"),
            PullDirection::PullDown => write!(f, "pull-down"),
            PullDirection::PullUp => write!(f, "pull-up"),
        }
    }
}

/// Blocking delay backed by `std::thread::sleep`.
///
/// The sleep may overshoot, it never returns early.
#[derive(Copy, Clone, Debug, Default)]
pub struct StdDelay;

impl DelayUs<u32> for StdDelay {
    fn delay_us(&mut self, us: u32) {
        thread::sleep(Duration::from_micros(u64::from(us)));
    }
}

impl Registers {
    /* GPSET and GPCLR are write-only: writing 1 to a bit acts on that pin, zeros are ignored.
     * A plain write with only the target bit set is therefore enough and never disturbs other pins.
     */
    pub fn set_pin(&self, pin: PinNumber) {
        let location = pin.bank_bit();
        self.set[location.slot].write(location.mask);
    }

    pub fn clear_pin(&self, pin: PinNumber) {
        let location = pin.bank_bit();
        self.clr[location.slot].write(location.mask);
    }

    pub fn level(&self, pin: PinNumber) -> bool {
        let location = pin.bank_bit();
        self.lev[location.slot].read() & location.mask == location.mask
    }

    /// Replaces the 3-bit function field of `pin`, keeping the fields of the other 9 pins of the register.
    pub fn function_select(&self, pin: PinNumber, function: Function) {
        let location = pin.function_field();
        let value = u32::from(function as u8) << location.shift;

        self.fsel[location.slot].modify(|current| (current & !location.mask) | value);
    }

    pub fn function(&self, pin: PinNumber) -> Function {
        let location = pin.function_field();
        Function::from_field(self.fsel[location.slot].read() >> location.shift)
    }

    /// Runs the GPPUD / GPPUDCLK latch sequence for a single pin.
    ///
    /// Order matters: control code, settle, clock the pin, settle, then drop control and clock.
    pub fn configure_pull<D>(&self, pin: PinNumber, direction: PullDirection, delay: &mut D)
    where
        D: DelayUs<u32>,
    {
        let location = pin.bank_bit();
        let clock = &self.pud_clk[location.slot];

        trace!("latching {} on {}", direction, pin);

        self.pud
            .modify(|current| (current & !PUD_MASK) | u32::from(direction as u8));
        delay.delay_us(PULL_SETTLE_US);

        clock.write(location.mask);
        delay.delay_us(PULL_SETTLE_US);

        self.pud.modify(|current| current & !PUD_MASK);
        clock.write(0);
    }
}
