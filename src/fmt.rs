//! Logging shims.
//!
//! The crate logs through `log` or `defmt` depending on which feature is
//! enabled. With neither feature the macros still type-check their arguments
//! but emit nothing.
#![allow(unused_macros)]

cfg_if::cfg_if! {
    if #[cfg(feature = "defmt")] {
        macro_rules! trace { ($($arg:tt)+) => { ::defmt::trace!($($arg)+) }; }
        macro_rules! debug { ($($arg:tt)+) => { ::defmt::debug!($($arg)+) }; }
        macro_rules! info { ($($arg:tt)+) => { ::defmt::info!($($arg)+) }; }
        macro_rules! warn { ($($arg:tt)+) => { ::defmt::warn!($($arg)+) }; }
        macro_rules! error { ($($arg:tt)+) => { ::defmt::error!($($arg)+) }; }
    } else if #[cfg(feature = "log")] {
        macro_rules! trace { ($($arg:tt)+) => { ::log::trace!($($arg)+) }; }
        macro_rules! debug { ($($arg:tt)+) => { ::log::debug!($($arg)+) }; }
        macro_rules! info { ($($arg:tt)+) => { ::log::info!($($arg)+) }; }
        macro_rules! warn { ($($arg:tt)+) => { ::log::warn!($($arg)+) }; }
        macro_rules! error { ($($arg:tt)+) => { ::log::error!($($arg)+) }; }
    } else {
        macro_rules! trace { ($fmt:literal $(, $arg:expr)* $(,)?) => {{ $( let _ = &$arg; )* }}; }
        macro_rules! debug { ($fmt:literal $(, $arg:expr)* $(,)?) => {{ $( let _ = &$arg; )* }}; }
        macro_rules! info { ($fmt:literal $(, $arg:expr)* $(,)?) => {{ $( let _ = &$arg; )* }}; }
        macro_rules! warn { ($fmt:literal $(, $arg:expr)* $(,)?) => {{ $( let _ = &$arg; )* }}; }
        macro_rules! error { ($fmt:literal $(, $arg:expr)* $(,)?) => {{ $( let _ = &$arg; )* }}; }
    }
}
