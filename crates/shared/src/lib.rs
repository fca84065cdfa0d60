//! Wire types shared between the BINET admin client crates.

pub mod domain;
pub mod error;
pub mod protocol;
