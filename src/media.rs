//! Contract of the host media element the engine drives.
//!
//! Only the session state machine calls these methods; the attention monitor
//! and checkpoint resolution request transitions instead of touching the
//! element directly.

use crate::error::Result;

pub trait MediaHost: Send {
    fn current_time(&self) -> f64;

    fn set_current_time(&mut self, time: f64) -> Result<()>;

    fn duration(&self) -> Option<f64>;

    fn play(&mut self) -> Result<()>;

    fn pause(&mut self) -> Result<()>;
}
