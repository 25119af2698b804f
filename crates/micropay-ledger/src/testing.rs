//! Test payers that sign vouchers the way payer tooling does.
//!
//! Only compiled with the `test-helpers` feature.

use alloy_primitives::{Address, B256, Bytes, Signature, U256};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use micropay_types::{ClaimMessage, Nonce, Voucher, constants};

/// A payer with a deterministic secp256k1 key.
#[derive(Debug, Clone)]
pub struct TestPayer {
    signer: PrivateKeySigner,
}

impl TestPayer {
    /// Key `seed` repeated 32 times. `seed` must not be `0x00` or `0xff`.
    #[must_use]
    pub fn from_seed(seed: u8) -> Self {
        let signer = PrivateKeySigner::from_bytes(&B256::repeat_byte(seed))
            .expect("seed yields a valid secp256k1 scalar");
        Self { signer }
    }

    #[must_use]
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Sign `message` as an EIP-191 personal message over its hash.
    #[must_use]
    pub fn sign(&self, message: &ClaimMessage) -> Bytes {
        let signature = self
            .signer
            .sign_message_sync(message.hash().as_slice())
            .expect("local signing does not fail");
        encode_signature(&signature)
    }

    /// A voucher paying `amount` to `collector` on engine `domain`.
    #[must_use]
    pub fn voucher(&self, collector: Address, domain: Address, amount: u64, nonce: Nonce) -> Voucher {
        let amount = U256::from(amount);
        let message = ClaimMessage::new(collector, amount, nonce, domain);
        Voucher {
            sender: self.address(),
            amount,
            nonce,
            signature: self.sign(&message),
        }
    }
}

/// `r || s || v` with `v` in `{27, 28}`.
#[must_use]
pub fn encode_signature(signature: &Signature) -> Bytes {
    let mut out = Vec::with_capacity(constants::SIGNATURE_LEN);
    out.extend_from_slice(&signature.r().to_be_bytes::<32>());
    out.extend_from_slice(&signature.s().to_be_bytes::<32>());
    out.push(27 + u8::from(signature.v()));
    Bytes::from(out)
}
