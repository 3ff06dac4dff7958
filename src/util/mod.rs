// Utilities
// Key encoding and file handling around the RSA core

pub mod file_ops;
pub mod key_format;
