//! Signer recovery for claim messages.
//!
//! Pure functions, no state. Given a [`ClaimMessage`] and the 65-byte
//! `r || s || v` signature a payer produced over it, recover the secp256k1
//! identity that signed. Rejected as [`MicropayError::InvalidSignature`]:
//!
//! - any length other than 65 bytes
//! - a recovery byte outside `{0, 1, 27, 28}`
//! - `r == 0`, `s == 0`, or `s` in the upper half of the curve order
//! - a point that does not recover, or recovery to the zero address

use alloy_primitives::{Address, B256, Signature, U256, uint};
use micropay_types::{ClaimMessage, MicropayError, Result, constants};

/// Half the secp256k1 group order. Signatures with a larger `s` are the
/// malleable twin of a canonical signature.
const SECP256K1N_HALF: U256 =
    uint!(0x7FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF5D576E7357A4501DDFE92F46681B20A0_U256);

/// Recover the signer of `message` from `signature`.
pub fn recover_signer(message: &ClaimMessage, signature: &[u8]) -> Result<Address> {
    recover_signer_from_digest(&message.signing_digest(), signature)
}

/// Recover the signer of an already computed 32-byte digest.
pub fn recover_signer_from_digest(digest: &B256, signature: &[u8]) -> Result<Address> {
    let signature = parse_signature(signature)?;
    let signer = signature
        .recover_address_from_prehash(digest)
        .map_err(|err| invalid(err.to_string()))?;
    if signer.is_zero() {
        return Err(invalid("signature recovers to the zero address"));
    }
    Ok(signer)
}

fn parse_signature(raw: &[u8]) -> Result<Signature> {
    if raw.len() != constants::SIGNATURE_LEN {
        return Err(invalid(format!(
            "expected {} bytes, got {}",
            constants::SIGNATURE_LEN,
            raw.len()
        )));
    }

    let r = U256::from_be_slice(&raw[..32]);
    let s = U256::from_be_slice(&raw[32..64]);
    let y_parity = match raw[64] {
        0 | 27 => false,
        1 | 28 => true,
        v => return Err(invalid(format!("invalid recovery byte {v}"))),
    };

    if r.is_zero() || s.is_zero() {
        return Err(invalid("zero r or s"));
    }
    if s > SECP256K1N_HALF {
        return Err(invalid("s is in the upper half of the curve order"));
    }

    Ok(Signature::new(r, s, y_parity))
}

fn invalid(reason: impl Into<String>) -> MicropayError {
    MicropayError::InvalidSignature {
        reason: reason.into(),
    }
}
