//! This example demonstrates the usage of embedded_hal trait usage.
//!
//! The main benefit over the blinking_led example is that `blink_led`
//! can be used for _any_ device with embedded-hal digital pins abstraction.
//!
//! This example assumes that GPIO17 (physical pin #11) is connected to diode's anode (+).
//! Make sure to put resistor to reduce current flowing through the diode.

use bcm2835_mmap_gpio::{open_pin, Function};
use embedded_hal::digital::v2::*;
use std::error::Error;
use std::thread::sleep;
use std::time::Duration;

fn blink_led<T: OutputPin<Error = impl Error + 'static>>(mut pin: T) -> Result<(), Box<dyn Error>> {
    let blink_interval = Duration::from_millis(500);

    loop {
        // In our case these operations cannot fail.
        // However, if we want to keep `blink_led` generic we need to anticipate errors here.
        pin.set_high()?;
        sleep(blink_interval);
        pin.set_low()?;
        sleep(blink_interval);
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let led_pin = open_pin(17, ())?;
    led_pin.function_select(Function::Output);

    blink_led(led_pin)?;
    Ok(())
}
