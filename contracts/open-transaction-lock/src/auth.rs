use ckb_hash::blake2b_256;
use secp256k1::{
    ecdsa::{RecoverableSignature, RecoveryId},
    Message, Secp256k1,
};
use subtle::ConstantTimeEq;

use crate::error::Error;

pub const BLAKE160_SIZE: usize = 20;

const RECID_INDEX: usize = 64;

/// Recover the signing key and match its blake160 against the script args.
pub fn verify_pubkey_blake160(
    pubkey_hash: &[u8],
    signature: &[u8; 65],
    message_digest: &[u8; 32],
) -> Result<(), Error> {
    let recid = RecoveryId::from_i32(signature[RECID_INDEX] as i32)
        .map_err(|_| Error::SecpParseSignature)?;
    let signature = RecoverableSignature::from_compact(&signature[..RECID_INDEX], recid)
        .map_err(|_| Error::SecpParseSignature)?;

    let secp = Secp256k1::new();
    let pubkey = secp
        .recover_ecdsa(&Message::from_digest(*message_digest), &signature)
        .map_err(|_| Error::SecpRecoverPubkey)?;

    let recovered_hash = blake2b_256(pubkey.serialize());
    if bool::from(recovered_hash[..BLAKE160_SIZE].ct_eq(pubkey_hash)) {
        Ok(())
    } else {
        Err(Error::PubkeyBlake160Hash)
    }
}
