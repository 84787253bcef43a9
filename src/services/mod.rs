//! Domain services over the metrics store.

pub mod engagement;
pub mod hr;
pub mod sync;
pub mod webinars;
