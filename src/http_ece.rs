//! The aes128gcm content-coding pipeline (RFC 8188 §2, RFC 8291 §3.4): the
//! deterministic binary transformation from plaintext + subscriber key
//! material to a fixed-size encrypted record.

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::Aes128Gcm;
use hkdf::Hkdf;
use p256::ecdh::diffie_hellman;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::{PublicKey, SecretKey};
use sha2::Sha256;

use crate::clock::{Clock, ClockRng};
use crate::error::WebPushError;

/// The largest encrypted body guaranteed to be accepted by push services.
pub const MAX_ENCRYPTED_PAYLOAD: usize = 4096;
/// The largest plaintext that fits `MAX_ENCRYPTED_PAYLOAD` after framing (4096 - 103).
pub const MAX_PLAINTEXT: usize = 3993;

const SALT_LEN: usize = 16;
const KEY_ID_LEN: usize = 65;
const HEADER_LEN: usize = SALT_LEN + 4 + 1 + KEY_ID_LEN;
const TAG_LEN: usize = 16;

/// Returns `Err(MessageTooLarge)` if `plaintext` exceeds [`MAX_PLAINTEXT`].
/// Callers opt into this pre-check explicitly; by default oversized
/// plaintexts are sent anyway (the push service enforces its own limit).
pub fn check_size(plaintext: &[u8]) -> Result<(), WebPushError> {
    if plaintext.len() > MAX_PLAINTEXT {
        Err(WebPushError::MessageTooLarge)
    } else {
        Ok(())
    }
}

fn pad(plaintext: &[u8]) -> Vec<u8> {
    let mut padded = Vec::with_capacity(plaintext.len() + 1 + MAX_PLAINTEXT.saturating_sub(plaintext.len()));
    padded.extend_from_slice(plaintext);
    padded.push(0x02);
    if plaintext.len() <= MAX_PLAINTEXT {
        padded.resize(padded.len() + (MAX_PLAINTEXT - plaintext.len()), 0);
    } else {
        log::warn!(
            "plaintext of {} bytes exceeds the {}-byte padding budget; sending without trailing zero padding",
            plaintext.len(),
            MAX_PLAINTEXT
        );
    }
    padded
}

fn unpad(padded: &[u8]) -> Result<Vec<u8>, WebPushError> {
    let mut end = padded.len();
    while end > 0 && padded[end - 1] == 0 {
        end -= 1;
    }
    if end == 0 || padded[end - 1] != 0x02 {
        return Err(WebPushError::Transport("malformed padding in decrypted record".to_string()));
    }
    Ok(padded[..end - 1].to_vec())
}

fn derive_keys(shared_secret: &[u8], auth_secret: &[u8], ua_pub: &[u8], as_pub: &[u8], salt: &[u8]) -> ([u8; 16], [u8; 12]) {
    let mut ikm_info = Vec::with_capacity(14 + ua_pub.len() + as_pub.len());
    ikm_info.extend_from_slice(b"WebPush: info\0");
    ikm_info.extend_from_slice(ua_pub);
    ikm_info.extend_from_slice(as_pub);

    let ikm_hk = Hkdf::<Sha256>::new(Some(auth_secret), shared_secret);
    let mut ikm = [0u8; 32];
    ikm_hk.expand(&ikm_info, &mut ikm).expect("32 bytes is within HKDF-SHA256's limit");

    let okm_hk = Hkdf::<Sha256>::new(Some(salt), &ikm);

    let mut cek = [0u8; 16];
    okm_hk
        .expand(b"Content-Encoding: aes128gcm\0", &mut cek)
        .expect("16 bytes is within HKDF-SHA256's limit");

    let mut nonce = [0u8; 12];
    okm_hk
        .expand(b"Content-Encoding: nonce\0", &mut nonce)
        .expect("12 bytes is within HKDF-SHA256's limit");

    (cek, nonce)
}

/// Encrypts `plaintext` for a subscriber's `(ua_public_key, auth_secret)`,
/// producing the full aes128gcm wire body: content-coding header, ciphertext,
/// tag. The ephemeral AS key pair and the salt are drawn from `clock`'s RNG,
/// not a bare `OsRng`, so callers can substitute a deterministic clock in
/// tests.
pub fn encrypt(plaintext: &[u8], ua_public_key: &PublicKey, auth_secret: &[u8; 16], clock: &dyn Clock) -> Result<Vec<u8>, WebPushError> {
    let as_secret = SecretKey::random(&mut ClockRng(clock));
    let as_pub = as_secret.public_key().to_encoded_point(false).as_bytes().to_vec();
    let ua_pub = ua_public_key.to_encoded_point(false).as_bytes().to_vec();

    let shared = diffie_hellman(as_secret.to_nonzero_scalar(), ua_public_key.as_affine());
    let shared_bytes = shared.raw_secret_bytes().to_vec();

    let mut salt = [0u8; SALT_LEN];
    salt.copy_from_slice(&clock.random_bytes(SALT_LEN));

    let padded = pad(plaintext);

    let mut header = Vec::with_capacity(HEADER_LEN);
    header.extend_from_slice(&salt);
    header.extend_from_slice(&((padded.len() + TAG_LEN) as u32).to_be_bytes());
    header.push(KEY_ID_LEN as u8);
    header.extend_from_slice(&as_pub);

    let (cek, nonce) = derive_keys(&shared_bytes, auth_secret, &ua_pub, &as_pub, &salt);

    let cipher = Aes128Gcm::new((&cek).into());
    let sealed = cipher
        .encrypt((&nonce).into(), Payload { msg: &padded, aad: &[] })
        .map_err(|_| WebPushError::Transport("AES-128-GCM seal failed".to_string()))?;

    let mut wire_body = header;
    wire_body.extend_from_slice(&sealed);
    Ok(wire_body)
}

/// Reverses the aes128gcm pipeline given the subscriber's own private key.
/// Used for round-trip tests and as the reference inverse named in the
/// testable properties; application servers never call this (they hold no
/// subscriber private keys).
pub fn decrypt(wire_body: &[u8], ua_private_key: &SecretKey, auth_secret: &[u8; 16]) -> Result<Vec<u8>, WebPushError> {
    if wire_body.len() < HEADER_LEN + TAG_LEN {
        return Err(WebPushError::Transport("wire body shorter than the content-coding header".to_string()));
    }

    let salt = &wire_body[0..SALT_LEN];
    let record_size = u32::from_be_bytes(wire_body[SALT_LEN..SALT_LEN + 4].try_into().unwrap()) as usize;
    let key_id_len = wire_body[SALT_LEN + 4] as usize;
    let as_pub_offset = SALT_LEN + 5;
    let as_pub = &wire_body[as_pub_offset..as_pub_offset + key_id_len];
    let ciphertext = &wire_body[as_pub_offset + key_id_len..];

    if ciphertext.len() != record_size {
        return Err(WebPushError::Transport("record size does not match ciphertext length".to_string()));
    }

    let as_public_key =
        PublicKey::from_sec1_bytes(as_pub).map_err(|_| WebPushError::Transport("invalid ephemeral public key in header".to_string()))?;
    let ua_pub = ua_private_key.public_key().to_encoded_point(false).as_bytes().to_vec();

    let shared = diffie_hellman(ua_private_key.to_nonzero_scalar(), as_public_key.as_affine());
    let shared_bytes = shared.raw_secret_bytes().to_vec();

    let (cek, nonce) = derive_keys(&shared_bytes, auth_secret, &ua_pub, as_pub, salt);

    let cipher = Aes128Gcm::new((&cek).into());
    let padded = cipher
        .decrypt((&nonce).into(), Payload { msg: ciphertext, aad: &[] })
        .map_err(|_| WebPushError::Transport("AES-128-GCM open failed".to_string()))?;

    unpad(&padded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;

    fn subscriber_key_pair() -> (SecretKey, PublicKey) {
        let secret = SecretKey::random(&mut rand::rngs::OsRng);
        let public = secret.public_key();
        (secret, public)
    }

    #[test]
    fn conformant_message_yields_exactly_4096_bytes() {
        let (_secret, public) = subscriber_key_pair();
        let auth = [7u8; 16];
        let plaintext = b"hello";

        let wire_body = encrypt(plaintext, &public, &auth, &SystemClock).unwrap();
        assert_eq!(wire_body.len(), MAX_ENCRYPTED_PAYLOAD);
    }

    #[test]
    fn encrypted_record_size_matches_formula_for_any_length() {
        let (_secret, public) = subscriber_key_pair();
        let auth = [7u8; 16];

        for len in [0usize, 1, 100, 3993] {
            let plaintext = vec![0x41u8; len];
            let wire_body = encrypt(&plaintext, &public, &auth, &SystemClock).unwrap();
            let expected = HEADER_LEN + len + 1 + (MAX_PLAINTEXT - len) + TAG_LEN;
            assert_eq!(wire_body.len(), expected);
        }
    }

    #[test]
    fn oversized_message_is_sent_with_message_length_as_its_own_padding() {
        let (_secret, public) = subscriber_key_pair();
        let auth = [7u8; 16];
        let plaintext = vec![0x42u8; 4000];

        let wire_body = encrypt(&plaintext, &public, &auth, &SystemClock).unwrap();
        assert_eq!(wire_body.len(), HEADER_LEN + plaintext.len() + 1 + TAG_LEN);
    }

    #[test]
    fn decrypt_is_the_inverse_of_encrypt() {
        let (secret, public) = subscriber_key_pair();
        let auth = [9u8; 16];
        let plaintext = b"the quick brown fox jumps over the lazy dog";

        let wire_body = encrypt(plaintext, &public, &auth, &SystemClock).unwrap();
        let decrypted = decrypt(&wire_body, &secret, &auth).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn decrypt_rejects_wrong_auth_secret() {
        let (secret, public) = subscriber_key_pair();
        let wire_body = encrypt(b"hello", &public, &[1u8; 16], &SystemClock).unwrap();
        assert!(decrypt(&wire_body, &secret, &[2u8; 16]).is_err());
    }

    #[test]
    fn check_size_rejects_oversized_plaintext() {
        assert!(check_size(&vec![0u8; MAX_PLAINTEXT]).is_ok());
        assert!(check_size(&vec![0u8; MAX_PLAINTEXT + 1]).is_err());
    }
}
