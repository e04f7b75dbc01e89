//! A very basic example of a program blinking a LED diode using native library API.
//!
//! This example assumes that GPIO17 (physical pin #11) is connected to diode's anode (+).
//! Make sure to put resistor to reduce current flowing through the diode.

use bcm2835_mmap_gpio::{open_pin, Function, GpioPin, HeaderPin, PinNumber};
use std::error::Error;
use std::thread::sleep;
use std::time::Duration;

fn main() -> Result<(), Box<dyn Error>> {
    let number = PinNumber::from(HeaderPin::Phy11);
    let mut led_pin = open_pin(number.get(), ())?;
    let blink_interval = Duration::from_millis(500);

    led_pin.function_select(Function::Output);

    loop {
        led_pin.set();
        sleep(blink_interval);
        led_pin.clear();
        sleep(blink_interval);
    }
}
