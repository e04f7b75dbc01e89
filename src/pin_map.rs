use derive_try_from_primitive::TryFromPrimitive;
use std::convert::TryFrom;
use std::fmt;

use crate::device::error::PinError;

/// Number of GPIO lines driven by the BCM2835 GPIO block (`GPIO0` up to `GPIO53`).
pub const PIN_COUNT: u8 = 54;

/// BCM number of a GPIO line, guaranteed to be lower than `PIN_COUNT`.
///
/// Every register operation of this crate accepts a `PinNumber` instead of a raw integer.
/// The range check happens once, here, so register group and bit offset arithmetic never
/// points outside of the mapped register groups.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct PinNumber(u8);

impl PinNumber {
    /// Validates a raw BCM pin number.
    ///
    /// Fails with `PinError::InvalidPin` for numbers outside of `0..PIN_COUNT`.
    pub fn new(number: u8) -> Result<Self, PinError> {
        if number < PIN_COUNT {
            Ok(Self(number))
        } else {
            Err(PinError::InvalidPin(number))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Slot and bit of this pin in the set, clear, level and pull clock groups.
    pub(crate) fn bank_bit(self) -> Location {
        Layout::BANK.locate(self)
    }

    /// Slot and 3-bit field of this pin in the function select group.
    pub(crate) fn function_field(self) -> Location {
        Layout::FUNCTION_SELECT.locate(self)
    }
}

impl TryFrom<u8> for PinNumber {
    type Error = PinError;

    fn try_from(number: u8) -> Result<Self, Self::Error> {
        Self::new(number)
    }
}

impl From<HeaderPin> for PinNumber {
    fn from(pin: HeaderPin) -> Self {
        Self(pin as u8)
    }
}

impl fmt::Display for PinNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GPIO{}", self.0)
    }
}

/// Shape of one register group: how many 32-bit slots it has and how pins are packed into them.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) struct Layout {
    pub slots: usize,
    pub pins_per_slot: u8,
    pub bits_per_pin: u32,
}

impl Layout {
    /// GPSET, GPCLR, GPLEV and GPPUDCLK: one bit per pin, 32 pins per register.
    pub const BANK: Layout = Layout {
        slots: 2,
        pins_per_slot: 32,
        bits_per_pin: 1,
    };

    /// GPFSEL: 3 bits per pin, 10 pins per register. Bits 30 and 31 are reserved.
    pub const FUNCTION_SELECT: Layout = Layout {
        slots: 6,
        pins_per_slot: 10,
        bits_per_pin: 3,
    };

    pub fn locate(&self, pin: PinNumber) -> Location {
        let slot = usize::from(pin.0 / self.pins_per_slot);
        let shift = u32::from(pin.0 % self.pins_per_slot) * self.bits_per_pin;

        Location {
            slot,
            shift,
            mask: self.field_mask() << shift,
        }
    }

    fn field_mask(&self) -> u32 {
        (1 << self.bits_per_pin) - 1
    }
}

/// Position of a single pin inside a register group.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) struct Location {
    pub slot: usize,
    pub shift: u32,
    pub mask: u32,
}

/// Mapping from physical position on the Raspberry Pi (revision 2) P1 header to BCM GPIO numbers.
///
/// Pass it wherever a `PinNumber` is expected: `PinNumber::from(HeaderPin::Phy11)` is `GPIO17`.
/// Header positions not listed here are power or ground pins.
#[repr(u8)]
#[derive(TryFromPrimitive, Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum HeaderPin {
    Phy3 = 2,
    Phy5 = 3,
    Phy7 = 4,
    Phy8 = 14,
    Phy10 = 15,
    Phy11 = 17,
    Phy12 = 18,
    Phy13 = 27,
    Phy15 = 22,
    Phy16 = 23,
    Phy18 = 24,
    Phy19 = 10,
    Phy21 = 9,
    Phy22 = 25,
    Phy23 = 11,
    Phy24 = 8,
    Phy26 = 7,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const LAYOUTS: [Layout; 2] = [Layout::BANK, Layout::FUNCTION_SELECT];

    #[test]
    fn rejects_pins_past_the_last_gpio() {
        assert_eq!(PinNumber::new(53).map(PinNumber::get), Ok(53));
        assert_eq!(PinNumber::new(54), Err(PinError::InvalidPin(54)));
        assert_eq!(PinNumber::try_from(255), Err(PinError::InvalidPin(255)));
    }

    #[test]
    fn bank_bit_of_pin_17_is_bit_17_of_first_slot() {
        let location = PinNumber(17).bank_bit();
        assert_eq!(location.slot, 0);
        assert_eq!(location.shift, 17);
        assert_eq!(location.mask, 1 << 17);
    }

    #[test]
    fn bank_bit_wraps_into_second_slot() {
        let location = PinNumber(53).bank_bit();
        assert_eq!(location.slot, 1);
        assert_eq!(location.mask, 1 << 21);
    }

    #[test]
    fn function_field_of_pin_40_starts_slot_4() {
        let location = PinNumber(40).function_field();
        assert_eq!(location.slot, 4);
        assert_eq!(location.shift, 0);
        assert_eq!(location.mask, 0b111);
    }

    #[test]
    fn function_field_of_pin_29_is_the_top_field() {
        let location = PinNumber(29).function_field();
        assert_eq!(location.slot, 2);
        assert_eq!(location.shift, 27);
        assert_eq!(location.mask, 0b111 << 27);
    }

    #[test]
    fn no_two_pins_share_bits_within_a_group() {
        for layout in LAYOUTS.iter() {
            for a in 0..PIN_COUNT {
                for b in (a + 1)..PIN_COUNT {
                    let (la, lb) = (layout.locate(PinNumber(a)), layout.locate(PinNumber(b)));
                    assert!(
                        la.slot != lb.slot || la.mask & lb.mask == 0,
                        "{:?}: pins {} and {} overlap",
                        layout,
                        a,
                        b
                    );
                }
            }
        }
    }

    #[test]
    fn header_pins_translate_to_bcm_numbers() {
        assert_eq!(PinNumber::from(HeaderPin::Phy11).get(), 17);
        assert_eq!(PinNumber::from(HeaderPin::Phy3).get(), 2);
        assert_eq!(HeaderPin::try_from(27u8).ok(), Some(HeaderPin::Phy13));
        assert!(HeaderPin::try_from(0u8).is_err());
    }

    proptest! {
        #[test]
        fn every_pin_lands_inside_its_group(number in 0u8..PIN_COUNT) {
            let pin = PinNumber::new(number).unwrap();

            for layout in LAYOUTS.iter() {
                let location = layout.locate(pin);
                prop_assert!(location.slot < layout.slots);
                prop_assert!(location.shift + layout.bits_per_pin <= 32);
                prop_assert_eq!(location.mask.count_ones(), layout.bits_per_pin);
                prop_assert_eq!(location.mask >> location.shift, layout.field_mask());
            }
        }

        #[test]
        fn out_of_range_numbers_never_validate(number in PIN_COUNT..=u8::MAX) {
            prop_assert_eq!(PinNumber::new(number), Err(PinError::InvalidPin(number)));
        }
    }
}
