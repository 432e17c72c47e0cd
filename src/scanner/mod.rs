//! Input discovery and file fingerprints

pub mod file_scanner;
pub mod hashing;

pub use file_scanner::collect_inputs;
pub use hashing::compute_file_hash;
