//! The coverage array: the signer-authored opcode stream embedded in the
//! lock field that selects which transaction fragments the signature binds.
//!
//! Each entry is 3 bytes on the wire, `label:4 | index:12 | mask:8`. Entries
//! are decoded into [`Entry`] in a single parse step and absorbed into the
//! digest one at a time, in the order the signer listed them. Sub-field
//! order inside an entry is fixed here and not signer-controlled.

use ckb_hash::Blake2b;
use ckb_std::{
    ckb_constants::{CellField, InputField, Source},
    ckb_types::packed::{OutPointReader, ScriptReader},
    error::SysError,
    syscalls,
};
use molecule::prelude::Reader;

use crate::{
    error::Error,
    loader::{self, MAX_INPUT_FIELD_SIZE, MAX_SCRIPT_SIZE},
};

pub const ENTRY_SIZE: usize = 3;

pub const LABEL_SIGHASH_ALL: u8 = 0x0;
pub const LABEL_OUTPUT: u8 = 0x1;
pub const LABEL_INPUT_CELL: u8 = 0x2;
pub const LABEL_INPUT_CELL_SINCE: u8 = 0x3;
pub const LABEL_INPUT_OUTPOINT: u8 = 0x4;
pub const LABEL_END_OF_LIST: u8 = 0xF;

pub const MASK_CELL_CAPACITY: u8 = 0x01;
pub const MASK_CELL_TYPE_CODE_HASH: u8 = 0x02;
pub const MASK_CELL_TYPE_ARGS: u8 = 0x04;
pub const MASK_CELL_TYPE_HASH_TYPE: u8 = 0x08;
pub const MASK_CELL_LOCK_CODE_HASH: u8 = 0x10;
pub const MASK_CELL_LOCK_ARGS: u8 = 0x20;
pub const MASK_CELL_LOCK_HASH_TYPE: u8 = 0x40;
pub const MASK_CELL_DATA: u8 = 0x80;

pub const MASK_OUTPOINT_TX_HASH: u8 = 0x01;
pub const MASK_OUTPOINT_INDEX: u8 = 0x02;
pub const MASK_OUTPOINT_SINCE: u8 = 0x04;

/// Whole-object shortcut. Deliberately framed differently from setting
/// every individual bit: the whole serialized object is streamed instead
/// of its projected fields.
pub const MASK_ALL: u8 = 0xFF;

const OUTPOINT_KNOWN_BITS: u8 = MASK_OUTPOINT_TX_HASH | MASK_OUTPOINT_INDEX | MASK_OUTPOINT_SINCE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellMask(u8);

impl CellMask {
    pub fn covers_all(self) -> bool {
        self.0 == MASK_ALL
    }

    fn capacity(self) -> bool {
        self.0 & MASK_CELL_CAPACITY != 0
    }

    fn data(self) -> bool {
        self.0 & MASK_CELL_DATA != 0
    }

    fn type_fields(self) -> Option<ScriptFields> {
        ScriptFields::select(
            self.0 & MASK_CELL_TYPE_CODE_HASH != 0,
            self.0 & MASK_CELL_TYPE_ARGS != 0,
            self.0 & MASK_CELL_TYPE_HASH_TYPE != 0,
        )
    }

    fn lock_fields(self) -> Option<ScriptFields> {
        ScriptFields::select(
            self.0 & MASK_CELL_LOCK_CODE_HASH != 0,
            self.0 & MASK_CELL_LOCK_ARGS != 0,
            self.0 & MASK_CELL_LOCK_HASH_TYPE != 0,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutpointMask(u8);

impl OutpointMask {
    /// Bits outside the documented set are reserved and rejected, except
    /// through the `0xFF` shortcut.
    fn parse(mask: u8) -> Result<OutpointMask, Error> {
        if mask != MASK_ALL && mask & !OUTPOINT_KNOWN_BITS != 0 {
            return Err(Error::InvalidMask);
        }
        Ok(OutpointMask(mask))
    }

    pub fn covers_all(self) -> bool {
        self.0 == MASK_ALL
    }

    fn tx_hash(self) -> bool {
        self.0 & MASK_OUTPOINT_TX_HASH != 0
    }

    fn index(self) -> bool {
        self.0 & MASK_OUTPOINT_INDEX != 0
    }

    fn since(self) -> bool {
        self.0 & MASK_OUTPOINT_SINCE != 0
    }
}

#[derive(Debug, Clone, Copy)]
struct ScriptFields {
    code_hash: bool,
    args: bool,
    hash_type: bool,
}

impl ScriptFields {
    fn select(code_hash: bool, args: bool, hash_type: bool) -> Option<ScriptFields> {
        if code_hash || args || hash_type {
            Some(ScriptFields {
                code_hash,
                args,
                hash_type,
            })
        } else {
            None
        }
    }
}

/// One decoded coverage entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry {
    SighashAll,
    Output { index: usize, mask: CellMask },
    InputCell { index: usize, mask: CellMask },
    InputCellSince { index: usize, mask: CellMask },
    InputOutpoint { index: usize, mask: OutpointMask },
    EndOfList,
}

impl Entry {
    pub fn parse(raw: [u8; ENTRY_SIZE]) -> Result<Entry, Error> {
        let label = raw[0] >> 4;
        let index = ((raw[0] & 0x0F) as usize) << 8 | raw[1] as usize;
        let mask = raw[2];
        match label {
            LABEL_SIGHASH_ALL => Ok(Entry::SighashAll),
            LABEL_OUTPUT => Ok(Entry::Output {
                index,
                mask: CellMask(mask),
            }),
            LABEL_INPUT_CELL => Ok(Entry::InputCell {
                index,
                mask: CellMask(mask),
            }),
            LABEL_INPUT_CELL_SINCE => Ok(Entry::InputCellSince {
                index,
                mask: CellMask(mask),
            }),
            LABEL_INPUT_OUTPOINT => Ok(Entry::InputOutpoint {
                index,
                mask: OutpointMask::parse(mask)?,
            }),
            LABEL_END_OF_LIST => Ok(Entry::EndOfList),
            _ => Err(Error::InvalidLabel),
        }
    }

    pub fn is_end_of_list(&self) -> bool {
        matches!(self, Entry::EndOfList)
    }

    /// Absorb the fragments this entry selects. `EndOfList` absorbs nothing.
    pub fn absorb(&self, hasher: &mut Blake2b) -> Result<(), Error> {
        match *self {
            Entry::SighashAll => absorb_tx_hash(hasher),
            Entry::Output { index, mask } => absorb_cell(hasher, index, Source::Output, mask),
            Entry::InputCell { index, mask } => absorb_cell(hasher, index, Source::Input, mask),
            Entry::InputCellSince { index, mask } => {
                absorb_cell(hasher, index, Source::Input, mask)?;
                absorb_since(hasher, index)
            }
            Entry::InputOutpoint { index, mask } => absorb_outpoint(hasher, index, mask),
            Entry::EndOfList => Ok(()),
        }
    }
}

fn absorb_tx_hash(hasher: &mut Blake2b) -> Result<(), Error> {
    let mut tx_hash = [0u8; 32];
    let len = syscalls::load_tx_hash(&mut tx_hash, 0)?;
    if len != tx_hash.len() {
        return Err(Error::Syscall);
    }
    hasher.update(&tx_hash);
    Ok(())
}

// Sub-field order is fixed: capacity, type script fields, lock script
// fields, data, and for INPUT_CELL_SINCE the trailing since.
fn absorb_cell(
    hasher: &mut Blake2b,
    index: usize,
    source: Source,
    mask: CellMask,
) -> Result<(), Error> {
    if mask.covers_all() {
        loader::hash_cell(hasher, index, source)?;
        return loader::hash_cell_data(hasher, index, source);
    }
    if mask.capacity() {
        let mut capacity = [0u8; 8];
        syscalls::load_cell_by_field(&mut capacity, 0, index, source, CellField::Capacity)?;
        hasher.update(&capacity);
    }
    if let Some(fields) = mask.type_fields() {
        absorb_script_fields(hasher, index, source, CellField::Type, fields)?;
    }
    if let Some(fields) = mask.lock_fields() {
        absorb_script_fields(hasher, index, source, CellField::Lock, fields)?;
    }
    if mask.data() {
        loader::hash_cell_data(hasher, index, source)?;
    }
    Ok(())
}

fn absorb_script_fields(
    hasher: &mut Blake2b,
    index: usize,
    source: Source,
    field: CellField,
    fields: ScriptFields,
) -> Result<(), Error> {
    let mut buf = [0u8; MAX_SCRIPT_SIZE];
    let len = match syscalls::load_cell_by_field(&mut buf, 0, index, source, field) {
        Ok(len) => len,
        Err(SysError::LengthNotEnough(_)) => return Err(Error::ScriptTooLong),
        Err(err) => return Err(err.into()),
    };
    let script = ScriptReader::from_slice(&buf[..len])?;
    if fields.code_hash {
        hasher.update(script.code_hash().as_slice());
    }
    // The args segment is absorbed with its molecule length header.
    if fields.args {
        hasher.update(script.args().as_slice());
    }
    if fields.hash_type {
        hasher.update(script.hash_type().as_slice());
    }
    Ok(())
}

fn absorb_since(hasher: &mut Blake2b, index: usize) -> Result<(), Error> {
    let mut since = [0u8; 8];
    syscalls::load_input_by_field(&mut since, 0, index, Source::Input, InputField::Since)?;
    hasher.update(&since);
    Ok(())
}

fn absorb_outpoint(hasher: &mut Blake2b, index: usize, mask: OutpointMask) -> Result<(), Error> {
    if mask.covers_all() {
        return loader::hash_input(hasher, index, Source::Input);
    }
    if mask.since() {
        absorb_since(hasher, index)?;
    }
    let mut buf = [0u8; MAX_INPUT_FIELD_SIZE];
    let len = syscalls::load_input_by_field(&mut buf, 0, index, Source::Input, InputField::OutPoint)?;
    let out_point = OutPointReader::from_slice(&buf[..len])?;
    if mask.tx_hash() {
        hasher.update(out_point.tx_hash().as_slice());
    }
    if mask.index() {
        hasher.update(out_point.index().as_slice());
    }
    Ok(())
}
