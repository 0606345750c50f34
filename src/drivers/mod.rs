//! Low-level drivers: the button sampler and the esp_timer wrappers.

pub mod button;
pub mod hw_timer;
