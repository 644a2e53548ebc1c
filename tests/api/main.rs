//! tests/api/main.rs
mod end_to_end;
mod helpers;
mod master;
