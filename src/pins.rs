//! GPIO assignments for the hybrid BT relay board.
//!
//! Single source of truth — drivers reference this module rather than
//! hard-coding pin numbers.

/// Boot button (active-low, internal pull-up). Doubles as the manual
/// wake trigger: a falling edge bumps the radio out of Idle.
pub const BUTTON_GPIO: i32 = 0;
