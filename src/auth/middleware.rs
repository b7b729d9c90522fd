//! Authentication entry point for the Blob Storage API.

use crate::config::Account;
use crate::context::RequestContext;
use crate::error::StorageResult;

use super::{
    sas::{has_sas_signature, validate_sas},
    shared_key::validate_shared_key,
};

/// How a request proved its identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Query-string shared access signature (`sig` parameter).
    SharedAccessSignature,
    /// `Authorization: SharedKey` header.
    SharedKey,
}

/// Authentication result containing the authenticated account.
#[derive(Debug, Clone)]
pub struct AuthResult {
    pub account: String,
    pub mode: AuthMode,
}

/// Authenticates a request. A non-empty `sig` query parameter selects
/// shared access signature validation; every other request must carry a
/// SharedKey header.
pub fn authenticate(ctx: &RequestContext, account: &Account) -> StorageResult<AuthResult> {
    let mode = if has_sas_signature(ctx) {
        validate_sas(ctx, account)?;
        AuthMode::SharedAccessSignature
    } else {
        validate_shared_key(ctx, account)?;
        AuthMode::SharedKey
    };

    Ok(AuthResult {
        account: account.name().to_string(),
        mode,
    })
}
