#![cfg_attr(not(test), no_std)]
#![cfg_attr(not(test), no_main)]

#[cfg(not(test))]
ckb_std::entry!(program_entry);
#[cfg(not(test))]
ckb_std::default_alloc!();

mod auth;
mod entry;
mod error;

pub fn program_entry() -> i8 {
    match entry::main() {
        Ok(()) => 0,
        Err(err) => {
            ckb_std::debug!("open transaction lock rejected: {:?}", err);
            err as i8
        }
    }
}
