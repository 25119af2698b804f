//! System-wide constants for the Micropay settlement engine.

/// Default maximum number of vouchers accepted in a single claim batch.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 1024;

/// Length of an encoded voucher signature: `r (32) || s (32) || v (1)`.
pub const SIGNATURE_LEN: usize = 65;

/// Length of the ABI-encoded claim message: four 32-byte words.
pub const CLAIM_MESSAGE_LEN: usize = 128;

/// Length of a voucher nonce in bytes.
pub const NONCE_LEN: usize = 32;
