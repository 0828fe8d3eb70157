//! OpenPGP backend for [`SignatureVerifier`].
//!
//! Stored keys are ASCII-armored transferable public keys
//! (`-----BEGIN PGP PUBLIC KEY BLOCK-----`). Replies are cleartext-signed
//! messages (`-----BEGIN PGP SIGNED MESSAGE-----`), as produced by
//! `gpg --clearsign` or OpenPGP.js `createCleartextMessage` + `sign`.

use chrono::SubsecRound;
use pgp::composed::cleartext::CleartextSignedMessage;
use pgp::packet::{SignatureConfig, SignatureType, Subpacket, SubpacketData};
use pgp::types::{KeyVersion, PublicKeyTrait, SecretKeyTrait};
use pgp::{ArmorOptions, Deserializable, SignedPublicKey, SignedSecretKey};

use crate::{SignatureVerifier, Verification, VerifyError};

/// Verifies OpenPGP cleartext signatures.
///
/// A signature by the primary key or by any of its subkeys counts.
#[derive(Debug, Clone, Copy, Default)]
pub struct PgpVerifier;

impl SignatureVerifier for PgpVerifier {
    fn verify(
        &self,
        public_key: &str,
        signed_message: &str,
    ) -> Result<Verification, VerifyError> {
        let key = parse_public_key(public_key)?;
        let (message, _headers) = CleartextSignedMessage::from_string(signed_message)
            .map_err(|e| VerifyError::Malformed(e.to_string()))?;

        let signed_by_key = message.verify(&key).is_ok()
            || key
                .public_subkeys
                .iter()
                .any(|subkey| message.verify(subkey).is_ok());
        if !signed_by_key {
            tracing::debug!(key_id = ?key.key_id(), "no signature matched the stored key");
            return Ok(Verification::Invalid);
        }

        Ok(Verification::Valid {
            cleartext: message.signed_text().replace("\r\n", "\n"),
        })
    }
}

/// Parses an armored OpenPGP public key.
pub fn parse_public_key(armored: &str) -> Result<SignedPublicKey, VerifyError> {
    let (key, _headers) = SignedPublicKey::from_string(armored)
        .map_err(|e| VerifyError::InvalidKey(e.to_string()))?;
    Ok(key)
}

/// Produces the cleartext-signed armor a client sends back for `text`.
///
/// `key` must be an unprotected v4 secret key.
pub fn sign_cleartext(key: &SignedSecretKey, text: &str) -> pgp::errors::Result<String> {
    if key.version() != KeyVersion::V4 {
        return Err(pgp::errors::Error::Unsupported(format!(
            "signing with {:?} keys",
            key.version()
        )));
    }

    let mut config = SignatureConfig::v4(SignatureType::Text, key.algorithm(), key.hash_alg());
    config.hashed_subpackets = vec![
        Subpacket::regular(SubpacketData::IssuerFingerprint(key.fingerprint())),
        Subpacket::regular(SubpacketData::SignatureCreationTime(
            chrono::Utc::now().trunc_subsecs(0),
        )),
    ];
    config.unhashed_subpackets = vec![Subpacket::regular(SubpacketData::Issuer(key.key_id()))];

    CleartextSignedMessage::new(text, config, key, String::new)?
        .to_armored_string(ArmorOptions::default())
}
