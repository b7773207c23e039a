//! Construction of the signing message.
//!
//! The message is a Blake2b-256 digest over, in order: every input of the
//! current script group, the fragments selected by the coverage array, the
//! length-framed first group witness with its signature bytes cleared, the
//! remaining group witnesses, and every witness past the input count. Any
//! reordering changes the message, so the sequence here is the wire
//! contract shared with the signer's off-chain tooling.

use ckb_hash::{new_blake2b, Blake2b};
use ckb_std::{
    ckb_constants::Source,
    ckb_types::packed::{CellInput, WitnessArgsReader},
    error::SysError,
    syscalls,
};
use molecule::{prelude::Reader, NUMBER_SIZE};

use crate::{
    cover::{Entry, ENTRY_SIZE},
    error::Error,
    loader::{self, MAX_WITNESS_SIZE},
};

pub const SIGNATURE_SIZE: usize = 65;
pub const BLAKE2B_BLOCK_SIZE: usize = 32;

/// Build the 32-byte signing message and return it together with the
/// signature extracted from the lock field.
pub fn build_signing_message() -> Result<([u8; BLAKE2B_BLOCK_SIZE], [u8; SIGNATURE_SIZE]), Error> {
    let mut witness = [0u8; MAX_WITNESS_SIZE];
    let witness_len = match syscalls::load_witness(&mut witness, 0, 0, Source::GroupInput) {
        Ok(len) => len,
        Err(SysError::LengthNotEnough(_)) => return Err(Error::WitnessSize),
        Err(_) => return Err(Error::Syscall),
    };

    let (lock_start, lock_len) = locate_lock_field(&witness[..witness_len])?;
    // At minimum a signature plus the list terminator.
    if lock_len <= SIGNATURE_SIZE {
        return Err(Error::ArgumentsLen);
    }

    let mut hasher = new_blake2b();

    // The signature always commits to the outpoints this signer claims to
    // spend: a valid coverage+signature pair cannot be replayed against a
    // different group input set.
    let mut index = 0;
    loop {
        match loader::hash_input(&mut hasher, index, Source::GroupInput) {
            Ok(()) => index += 1,
            Err(Error::Sys(SysError::IndexOutOfBound)) => break,
            Err(err) => return Err(err),
        }
    }

    // Walk the coverage list. The entry count, terminator included, fixes
    // where the signature starts.
    let lock = &witness[lock_start..lock_start + lock_len];
    let mut consumed = 0;
    loop {
        let at = consumed * ENTRY_SIZE;
        if at + ENTRY_SIZE > lock_len {
            return Err(Error::InvalidLabel);
        }
        let entry = Entry::parse([lock[at], lock[at + 1], lock[at + 2]])?;
        consumed += 1;
        if entry.is_end_of_list() {
            break;
        }
        entry.absorb(&mut hasher)?;
    }
    let sig_offset = consumed * ENTRY_SIZE;
    if lock_len != sig_offset + SIGNATURE_SIZE {
        return Err(Error::ArgumentsLen);
    }

    // Save the signature, then clear it in place so the digest is a fixed
    // point over its own seal, and fold the first witness length-framed.
    let sig_start = lock_start + sig_offset;
    let mut signature = [0u8; SIGNATURE_SIZE];
    signature.copy_from_slice(&witness[sig_start..sig_start + SIGNATURE_SIZE]);
    witness[sig_start..sig_start + SIGNATURE_SIZE].fill(0);
    hasher.update(&(witness_len as u64).to_le_bytes());
    hasher.update(&witness[..witness_len]);

    // Remaining witnesses of the group, then every witness not claimed by
    // an input. Witnesses of other script groups are deliberately free.
    fold_witnesses(&mut hasher, 1, Source::GroupInput)?;
    fold_witnesses(&mut hasher, count_inputs()?, Source::Input)?;

    let mut message = [0u8; BLAKE2B_BLOCK_SIZE];
    hasher.finalize(&mut message);
    Ok((message, signature))
}

fn locate_lock_field(witness: &[u8]) -> Result<(usize, usize), Error> {
    let witness_args = WitnessArgsReader::from_slice(witness)?;
    let lock = witness_args.lock().to_opt().ok_or(Error::Encoding)?.raw_data();
    let start = lock.as_ptr() as usize - witness.as_ptr() as usize;
    Ok((start, lock.len()))
}

fn fold_witnesses(hasher: &mut Blake2b, start: usize, source: Source) -> Result<(), Error> {
    let mut buf = [0u8; MAX_WITNESS_SIZE];
    let mut index = start;
    loop {
        let len = match syscalls::load_witness(&mut buf, 0, index, source) {
            Ok(len) => len,
            Err(SysError::IndexOutOfBound) => return Ok(()),
            Err(SysError::LengthNotEnough(_)) => return Err(Error::WitnessSize),
            Err(_) => return Err(Error::Syscall),
        };
        hasher.update(&(len as u64).to_le_bytes());
        hasher.update(&buf[..len]);
        index += 1;
    }
}

/// Number of inputs in the transaction, read without materializing it.
///
/// The serialized transaction starts with
/// full-size|raw-offset|witnesses-offset|raw-full-size|version-offset|
/// cell_deps-offset|header_deps-offset|inputs-offset|outputs-offset|...
/// where every field is 4 bytes, so the inputs and outputs offsets sit at
/// bytes [28, 36) and their difference counts the fixed-size inputs.
fn count_inputs() -> Result<usize, Error> {
    let mut offsets = [0u8; 8];
    match syscalls::load_transaction(&mut offsets, 28) {
        // Always returns LengthNotEnough since only 8 bytes are read.
        Err(SysError::LengthNotEnough(_)) => {}
        Err(err) => return Err(err.into()),
        Ok(_) => return Err(Error::Encoding),
    }
    let inputs_offset = u32::from_le_bytes(offsets[0..4].try_into().unwrap());
    let outputs_offset = u32::from_le_bytes(offsets[4..8].try_into().unwrap());
    Ok((outputs_offset as usize - inputs_offset as usize - NUMBER_SIZE) / CellInput::TOTAL_SIZE)
}
