//! Control-object implementations: one module per surface element
//! type named in the mapping tree's `HandlerTag`. Each exposes a
//! `d_c` (desk to computer) and/or `c_d` (computer to desk) method,
//! mirroring the `d_c`/`c_d` pair every control class implements in
//! the original (original_source/ReaCommon.py, control24osc.py).

pub mod automode;
pub mod button;
pub mod clock;
pub mod fader;
pub mod jog;
pub mod modifiers;
pub mod nav;
pub mod scribble;
pub mod vpot;
pub mod vu;

pub use automode::AutoMode;
pub use button::ButtonLed;
pub use clock::Clock;
pub use fader::Fader;
pub use jog::Jog;
pub use modifiers::Modifiers;
pub use nav::Nav;
pub use scribble::ScribStrip;
pub use vpot::Vpot;
pub use vu::Vu;
