//! Polled button driver.
//!
//! ## Hardware
//!
//! Active-low momentary switch on the boot button GPIO with the internal
//! pull-up enabled. No ISR: the main loop samples the level at the
//! configured poll interval and this driver reports the falling edge.
//! The poll interval itself is the debounce — bounce shorter than one
//! poll period is never observed.

/// Falling-edge detector over successive level samples.
pub struct ButtonDriver {
    gpio: i32,
    was_pressed: bool,
}

impl ButtonDriver {
    pub fn new(gpio: i32) -> Self {
        Self {
            gpio,
            was_pressed: false,
        }
    }

    /// GPIO pin this button is attached to.
    pub fn gpio(&self) -> i32 {
        self.gpio
    }

    /// Feed one level sample (`true` = held down). Returns `true` exactly
    /// once per press, on the released→pressed transition.
    pub fn on_sample(&mut self, pressed: bool) -> bool {
        let edge = pressed && !self.was_pressed;
        self.was_pressed = pressed;
        edge
    }
}

/// Configure the button GPIO as an input with pull-up.
#[cfg(target_os = "espidf")]
pub fn init_gpio(gpio: i32) -> Result<(), crate::error::Error> {
    use esp_idf_svc::sys::*;
    // SAFETY: plain register configuration from the single main task
    // before the poll loop starts.
    unsafe {
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << gpio,
            mode: gpio_mode_t_GPIO_MODE_INPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_ENABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        };
        if gpio_config(&cfg) != ESP_OK {
            return Err(crate::error::Error::Init("button GPIO config failed"));
        }
    }
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_gpio(_gpio: i32) -> Result<(), crate::error::Error> {
    Ok(())
}

/// Read the raw level. `true` when the button is held down (line low).
#[cfg(target_os = "espidf")]
pub fn sample(gpio: i32) -> bool {
    // SAFETY: gpio_get_level is a plain register read, callable from
    // any task context.
    unsafe { esp_idf_svc::sys::gpio_get_level(gpio) == 0 }
}

#[cfg(not(target_os = "espidf"))]
pub fn sample(_gpio: i32) -> bool {
    false
}
