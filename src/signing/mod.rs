/// Document signing subsystem
///
/// Each signing tag owns an RSA keypair. The public half is stored as plain
/// PEM; the private half is wrapped with AES-256-GCM under a master key that
/// lives only in configuration.

pub mod crypto;
mod keystore;

pub use crypto::{content_hash, generate_keypair, sign_data, verify_doc_signature, KeyPairPem, KeyWrap, WrappedKey};
pub use keystore::{KeyStore, STATE_ACTIVE, STATE_CREATED, STATE_DELETED};

use crate::db::models::SigningKeyRecord;
use serde::Serialize;

/// External shape of a signing key record. Wrapped key material is exposed as
/// ciphertext plus nonce metadata; the wrap key itself is never part of it.
#[derive(Debug, Clone, Serialize)]
pub struct SigningKeyView {
    pub title: String,
    pub tag: String,
    pub public_key: String,
    pub private_key: WrappedKeyView,
    pub state: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct WrappedKeyView {
    pub encrypted_key: String,
    pub metadata: WrappedKeyMetadata,
}

#[derive(Debug, Clone, Serialize)]
pub struct WrappedKeyMetadata {
    pub iv: String,
    pub tag: String,
}

impl From<&SigningKeyRecord> for SigningKeyView {
    fn from(record: &SigningKeyRecord) -> Self {
        SigningKeyView {
            title: record.title.clone(),
            tag: record.tag.clone(),
            public_key: record.public_key.clone(),
            private_key: WrappedKeyView {
                encrypted_key: record.encrypted_private_key.clone(),
                metadata: WrappedKeyMetadata {
                    iv: record.iv.clone(),
                    tag: record.tag.clone(),
                },
            },
            state: record.state.clone(),
        }
    }
}
