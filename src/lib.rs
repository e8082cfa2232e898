//! Race-and-settlement engine for instructor-led class slots.
//!
//! Players reserve seats against one group-size option of a slot; options
//! race against each other, exactly one may win, and winning confirms the
//! slot onto a physical court while every other hold is released. Vacated
//! capacity on a confirmed slot is resold for loyalty points.

pub mod adapters;
pub mod commands;
pub mod domain;
pub mod ports;
