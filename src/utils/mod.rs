// src/utils/mod.rs
pub mod numeric;
