use super::{Device, Function, PullDirection};
use crate::pin_map::PinNumber;
use embedded_hal::digital::v2 as eh;
use embedded_hal::digital::v2::toggleable;
use std::convert::Infallible;
use std::ops::{Deref, DerefMut};

/// Minimal capability set of a digital pin.
///
/// `Pin` implements it with direct register access. Other implementations (a sysfs or character device
/// backed pin, a mock) can be wrapped by `Pin` to get the fast path for these three operations.
pub trait GpioPin {
    /// Drives the pin high.
    fn set(&mut self);
    /// Drives the pin low.
    fn clear(&mut self);
    /// Reads the pin level, `true` meaning high.
    fn get(&self) -> bool;
}

/// A GPIO pin with a register fast path for `set`, `clear` and `get`.
///
/// `P` is the upstream pin implementation this handle extends: whatever opened and configured the pin
/// (exporting it, setting its direction, watching edges) stays reachable through `Deref`. Pass `()`
/// when there is none.
///
/// A `Pin` owns no hardware state and does not keep track of other handles to the same pin.
#[derive(Debug)]
pub struct Pin<'device, P = ()> {
    device: &'device Device,
    number: PinNumber,
    inner: P,
}

impl<'device, P> Pin<'device, P> {
    pub(crate) fn new(device: &'device Device, number: PinNumber, inner: P) -> Self {
        Self {
            device,
            number,
            inner,
        }
    }

    pub fn number(&self) -> PinNumber {
        self.number
    }

    pub fn into_inner(self) -> P {
        self.inner
    }

    /// See `Device::function_select`.
    pub fn function_select(&self, function: Function) {
        self.device.function_select(self.number, function);
    }

    pub fn function(&self) -> Function {
        self.device.function(self.number)
    }

    /// See `Device::configure_pull`.
    pub fn configure_pull(&self, direction: PullDirection) {
        self.device.configure_pull(self.number, direction);
    }
}

impl<'device, P> Deref for Pin<'device, P> {
    type Target = P;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<'device, P> DerefMut for Pin<'device, P> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

impl<'device, P> GpioPin for Pin<'device, P> {
    fn set(&mut self) {
        self.device.set(self.number);
    }

    fn clear(&mut self) {
        self.device.clear(self.number);
    }

    fn get(&self) -> bool {
        self.device.get(self.number)
    }
}

impl<'device, P> eh::InputPin for Pin<'device, P> {
    type Error = Infallible;

    fn is_high(&self) -> Result<bool, Self::Error> {
        Ok(GpioPin::get(self))
    }

    fn is_low(&self) -> Result<bool, Self::Error> {
        self.is_high().map(|v| !v)
    }
}

impl<'device, P> eh::OutputPin for Pin<'device, P> {
    type Error = Infallible;

    fn set_low(&mut self) -> Result<(), Self::Error> {
        GpioPin::clear(self);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        GpioPin::set(self);
        Ok(())
    }
}

// GPLEV reflects the pad of output pins too.
impl<'device, P> eh::StatefulOutputPin for Pin<'device, P> {
    fn is_set_high(&self) -> Result<bool, Self::Error> {
        Ok(GpioPin::get(self))
    }

    fn is_set_low(&self) -> Result<bool, Self::Error> {
        self.is_set_high().map(|v| !v)
    }
}

impl<'device, P> toggleable::Default for Pin<'device, P> {}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::digital::v2::{InputPin, OutputPin, StatefulOutputPin, ToggleableOutputPin};

    /// Upstream pin that only counts how often it was driven.
    #[derive(Debug, Default)]
    struct CountingPin {
        writes: usize,
        label: &'static str,
    }

    impl GpioPin for CountingPin {
        fn set(&mut self) {
            self.writes += 1;
        }

        fn clear(&mut self) {
            self.writes += 1;
        }

        fn get(&self) -> bool {
            false
        }
    }

    fn pin(number: u8) -> PinNumber {
        PinNumber::new(number).unwrap()
    }

    #[test]
    fn fast_path_bypasses_the_wrapped_pin() {
        let device = Device::simulated().unwrap();
        let mut led = device.pin(pin(17), CountingPin::default());

        GpioPin::set(&mut led);
        assert_eq!(device.registers().set[0].read(), 1 << 17);

        led.clear();
        assert_eq!(device.registers().clr[0].read(), 1 << 17);

        assert_eq!(led.writes, 0);
        assert_eq!(led.into_inner().writes, 0);
    }

    #[test]
    fn other_capabilities_come_from_the_wrapped_pin() {
        let device = Device::simulated().unwrap();
        let mut wrapped = device.pin(
            pin(4),
            CountingPin {
                writes: 0,
                label: "button",
            },
        );

        assert_eq!(wrapped.label, "button");
        wrapped.label = "switch";
        assert_eq!(wrapped.into_inner().label, "switch");
    }

    #[test]
    fn get_reads_the_level_register() {
        let device = Device::simulated().unwrap();
        let button = device.pin(pin(35), ());

        assert!(!GpioPin::get(&button));
        device.registers().lev[1].write(1 << 3);
        assert!(GpioPin::get(&button));
        assert_eq!(button.is_low(), Ok(false));
    }

    #[test]
    fn embedded_hal_output_writes_registers() {
        let device = Device::simulated().unwrap();
        let mut led = device.pin(pin(18), ());

        led.set_high().unwrap();
        assert_eq!(device.registers().set[0].read(), 1 << 18);

        device.registers().lev[0].write(1 << 18);
        assert_eq!(led.is_set_high(), Ok(true));

        led.toggle().unwrap();
        assert_eq!(device.registers().clr[0].read(), 1 << 18);
    }

    #[test]
    fn handle_configures_its_own_pin() {
        let device = Device::simulated().unwrap();
        let led = device.pin(pin(12), ());

        led.function_select(Function::Output);
        led.configure_pull(PullDirection::PullDown);

        assert_eq!(led.function(), Function::Output);
        assert_eq!(device.registers().fsel[1].read(), 0b001 << 6);
        assert_eq!(device.registers().pud.read(), 0);
        assert_eq!(device.registers().pud_clk[0].read(), 0);
    }
}
