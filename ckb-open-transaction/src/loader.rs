//! Chunked loading of transaction components into the digest.
//!
//! Components are absorbed through a fixed 16 KiB batch buffer so that
//! arbitrarily large cells and data blobs never have to be materialized in
//! full. The buffer sizes here are part of the wire contract: the signing
//! side reproduces the digest without knowing how the verifier buffers its
//! reads, which only works because chunking adds no framing.

use ckb_hash::Blake2b;
use ckb_std::{ckb_constants::Source, error::SysError, syscalls};

use crate::error::Error;

/// Upper bound on a single witness and on the current script.
pub const MAX_WITNESS_SIZE: usize = 32768;
pub const MAX_SCRIPT_SIZE: usize = 32768;
/// Batch size for chunked component reads.
pub const ONE_BATCH_SIZE: usize = 16384;
/// Buffer for a serialized OutPoint field.
pub const MAX_INPUT_FIELD_SIZE: usize = 4096;

type LoadFn = fn(&mut [u8], usize, usize, Source) -> Result<usize, SysError>;

/// Absorb the complete serialized form of one component, 16 KiB at a time.
///
/// A partial read reports the length still remaining past the current
/// offset, so the loop terminates exactly when a read fits its batch.
/// Zero-length components absorb nothing.
fn load_and_hash(
    hasher: &mut Blake2b,
    index: usize,
    source: Source,
    load: LoadFn,
) -> Result<(), Error> {
    let mut buf = [0u8; ONE_BATCH_SIZE];
    let mut offset = match load(&mut buf, 0, index, source) {
        Ok(len) => {
            hasher.update(&buf[..len]);
            return Ok(());
        }
        Err(SysError::LengthNotEnough(_)) => {
            hasher.update(&buf);
            ONE_BATCH_SIZE
        }
        Err(err) => return Err(err.into()),
    };
    loop {
        match load(&mut buf, offset, index, source) {
            Ok(len) => {
                hasher.update(&buf[..len]);
                return Ok(());
            }
            Err(SysError::LengthNotEnough(_)) => {
                hasher.update(&buf);
                offset += ONE_BATCH_SIZE;
            }
            Err(err) => return Err(err.into()),
        }
    }
}

pub fn hash_cell(hasher: &mut Blake2b, index: usize, source: Source) -> Result<(), Error> {
    load_and_hash(hasher, index, source, syscalls::load_cell)
}

pub fn hash_cell_data(hasher: &mut Blake2b, index: usize, source: Source) -> Result<(), Error> {
    load_and_hash(hasher, index, source, syscalls::load_cell_data)
}

pub fn hash_input(hasher: &mut Blake2b, index: usize, source: Source) -> Result<(), Error> {
    load_and_hash(hasher, index, source, syscalls::load_input)
}
