//! src/naming.rs
//!
//! Deterministic names for the intermediate artifacts, so every node can
//! address a peer's files without coordination.

pub fn map_source_file(n: usize) -> String {
    format!("map_{n}_source.db")
}

pub fn map_input_file(n: usize) -> String {
    format!("map_{n}_input.db")
}

pub fn map_output_file(n: usize, r: usize) -> String {
    format!("map_{n}_output_{r}.db")
}

pub fn reduce_input_file(n: usize) -> String {
    format!("reduce_{n}_input.db")
}

pub fn reduce_output_file(n: usize) -> String {
    format!("reduce_{n}_output.db")
}

pub fn reduce_temp_file(n: usize) -> String {
    format!("reduce_{n}_temp.db")
}

pub fn make_url(host: &str, file: &str) -> String {
    format!("http://{host}/data/{file}")
}
