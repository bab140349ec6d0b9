//! PIN hashing

mod pin_kdf;

pub use pin_kdf::{
    constant_time_eq, generate_salt, PinHash, PinKdf, DEFAULT_ITERATIONS, HASH_LEN, SALT_LEN,
};
