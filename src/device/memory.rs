use super::error::DeviceError;
use std::array;
use std::fmt;
use std::mem::{align_of, size_of};
use std::ptr::{self, NonNull};

/* Byte offsets of the GPIO registers inside the BCM2835 GPIO block.
 * See "BCM2835 ARM Peripherals", section 6.1. Registers inside a group are consecutive words.
 */
const GPFSEL0: usize = 0x00;
const GPSET0: usize = 0x1C;
const GPCLR0: usize = 0x28;
const GPLEV0: usize = 0x34;
const GPPUD: usize = 0x94;
const GPPUDCLK0: usize = 0x98;

/// First byte past the last register used by this crate (`GPPUDCLK1`).
pub(crate) const REGISTERS_END: usize = GPPUDCLK0 + 2 * size_of::<u32>();

/// One 32-bit hardware register inside the mapped GPIO block.
///
/// Reads and writes are volatile, so every access reaches the peripheral in program order.
pub(crate) struct Register(NonNull<u32>);

impl Register {
    pub fn read(&self) -> u32 {
        // SAFETY: Pointer was checked to be aligned and inside a live block in `Registers::from_block`.
        unsafe { ptr::read_volatile(self.0.as_ptr()) }
    }

    pub fn write(&self, value: u32) {
        // SAFETY: See `read`.
        unsafe { ptr::write_volatile(self.0.as_ptr(), value) }
    }

    pub fn modify<F>(&self, f: F)
    where
        F: FnOnce(u32) -> u32,
    {
        self.write(f(self.read()));
    }
}

impl fmt::Debug for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Register({:p})", self.0)
    }
}

// The block behind a `Register` is hardware memory shared by the whole process.
// Serializing read-modify-write sequences is left to callers, as documented on `Device`.
unsafe impl Send for Register {}
unsafe impl Sync for Register {}

/// Typed views into the GPIO block, one array per register group.
///
/// Group sizes cover all 54 pins: 6 function select registers of 10 pins each,
/// and 2 registers of 32 pins each for the set, clear, level and pull clock groups.
#[derive(Debug)]
pub(crate) struct Registers {
    pub fsel: [Register; 6],
    pub set: [Register; 2],
    pub clr: [Register; 2],
    pub lev: [Register; 2],
    pub pud: Register,
    pub pud_clk: [Register; 2],
}

impl Registers {
    /// Carves register views out of a mapped GPIO block.
    ///
    /// This is the only place where raw memory is reinterpreted as registers.
    ///
    /// # Safety
    ///
    /// The memory behind `block` must stay mapped, at the same address, for as long as the returned
    /// `Registers` (or anything borrowing them) is alive. It must not be accessed through `block` afterwards.
    pub unsafe fn from_block(block: &mut [u8]) -> Result<Self, DeviceError> {
        let len = block.len();
        let base = block.as_mut_ptr();

        if len < REGISTERS_END || (base as usize) % align_of::<u32>() != 0 {
            return Err(DeviceError::BlockTooSmall { len });
        }

        let at = |offset: usize| {
            // SAFETY: `offset + 4 <= REGISTERS_END <= len` for every register offset used below,
            // and `base` is word-aligned, so is `base + offset`.
            Register(NonNull::new_unchecked(base.add(offset) as *mut u32))
        };

        Ok(Self {
            fsel: array::from_fn(|i| at(GPFSEL0 + i * size_of::<u32>())),
            set: array::from_fn(|i| at(GPSET0 + i * size_of::<u32>())),
            clr: array::from_fn(|i| at(GPCLR0 + i * size_of::<u32>())),
            lev: array::from_fn(|i| at(GPLEV0 + i * size_of::<u32>())),
            pud: at(GPPUD),
            pud_clk: array::from_fn(|i| at(GPPUDCLK0 + i * size_of::<u32>())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word_block(words: usize) -> Vec<u32> {
        vec![0; words]
    }

    fn as_bytes(words: &mut [u32]) -> &mut [u8] {
        let len = words.len() * size_of::<u32>();
        unsafe { std::slice::from_raw_parts_mut(words.as_mut_ptr() as *mut u8, len) }
    }

    #[test]
    fn views_land_on_datasheet_offsets() {
        let mut words = word_block(1024);
        let registers = unsafe { Registers::from_block(as_bytes(&mut words)) }.unwrap();

        registers.fsel[5].write(1);
        registers.set[1].write(2);
        registers.clr[0].write(3);
        registers.lev[1].write(4);
        registers.pud.write(5);
        registers.pud_clk[1].write(6);

        assert_eq!(words[0x14 / 4], 1);
        assert_eq!(words[0x20 / 4], 2);
        assert_eq!(words[0x28 / 4], 3);
        assert_eq!(words[0x38 / 4], 4);
        assert_eq!(words[0x94 / 4], 5);
        assert_eq!(words[0x9C / 4], 6);
        assert_eq!(words.iter().filter(|&&w| w != 0).count(), 6);
    }

    #[test]
    fn rejects_blocks_ending_before_last_register() {
        let mut words = word_block(REGISTERS_END / 4 - 1);
        let result = unsafe { Registers::from_block(as_bytes(&mut words)) };

        assert!(matches!(
            result,
            Err(DeviceError::BlockTooSmall { len }) if len == REGISTERS_END - 4
        ));
    }

    #[test]
    fn modify_keeps_untouched_bits() {
        let mut words = word_block(REGISTERS_END / 4);
        let registers = unsafe { Registers::from_block(as_bytes(&mut words)) }.unwrap();

        registers.pud.write(0xF0F0_0000);
        registers.pud.modify(|v| v | 0b10);

        assert_eq!(registers.pud.read(), 0xF0F0_0002);
    }
}
