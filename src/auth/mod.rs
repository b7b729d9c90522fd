//! Authentication for the Blob Storage API.

mod middleware;
mod sas;
mod shared_key;

pub use middleware::*;
pub use sas::{
    build_string_to_sign as build_sas_string_to_sign, has_sas_signature, validate_sas,
    validate_sas_at,
};
pub use shared_key::{
    build_string_to_sign, sign_string, validate_shared_key, CANONICAL_HEADER_PREFIX,
};
