// rsa_oaep
// RSA key generation and OAEP encryption over a bundled big integer core

pub mod config;
pub mod rsa;
pub mod util;
