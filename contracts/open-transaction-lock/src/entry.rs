use ckb_open_transaction::{digest::build_signing_message, loader::MAX_SCRIPT_SIZE};
use ckb_std::{ckb_types::packed::ScriptReader, error::SysError, syscalls};
use core::result::Result;
use molecule::prelude::Reader;

use crate::{
    auth::{verify_pubkey_blake160, BLAKE160_SIZE},
    error::Error,
};

pub fn main() -> Result<(), Error> {
    let (message, signature) = build_signing_message()?;

    let mut script = [0u8; MAX_SCRIPT_SIZE];
    let script_len = match syscalls::load_script(&mut script, 0) {
        Ok(len) => len,
        Err(SysError::LengthNotEnough(_)) => return Err(Error::ScriptTooLong),
        Err(_) => return Err(Error::Syscall),
    };
    let script = ScriptReader::from_slice(&script[..script_len]).map_err(|_| Error::Encoding)?;
    let args = script.args().raw_data();
    if args.len() != BLAKE160_SIZE {
        return Err(Error::ArgumentsLen);
    }

    verify_pubkey_blake160(args, &signature, &message)
}
