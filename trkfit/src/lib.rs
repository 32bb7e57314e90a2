// src/lib.rs
pub mod config;
pub mod error;
pub mod finder;
pub mod io;
pub mod plane_fit;

pub mod segment {
    pub mod record;
    pub mod compat;
    pub mod seeds;
    pub mod candidate;
    pub mod gate;
    pub mod grow;
    pub mod select;
    pub mod track;
    pub mod station;
}

#[cfg(test)]
mod test_utils;
