use ckb_open_transaction::error::Error as CoreError;
use ckb_std::error::SysError;

/// Exit codes. Host codes 1..3 pass through unchanged; everything the
/// script decides on its own is negative.
#[repr(i8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    IndexOutOfBound = 1,
    ItemMissing = 2,
    LengthNotEnough = 3,
    ArgumentsLen = -1,
    Encoding = -2,
    Syscall = -3,
    SecpRecoverPubkey = -11,
    SecpVerification = -12,
    SecpParsePubkey = -13,
    SecpParseSignature = -14,
    SecpSerializePubkey = -15,
    ScriptTooLong = -21,
    WitnessSize = -22,
    PubkeyBlake160Hash = -31,
    InvalidLabel = -50,
    InvalidMask = -51,
}

impl From<SysError> for Error {
    fn from(err: SysError) -> Self {
        match err {
            SysError::IndexOutOfBound => Self::IndexOutOfBound,
            SysError::ItemMissing => Self::ItemMissing,
            SysError::LengthNotEnough(_) => Self::LengthNotEnough,
            _ => Self::Syscall,
        }
    }
}

impl From<CoreError> for Error {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Sys(e) => e.into(),
            CoreError::ArgumentsLen => Self::ArgumentsLen,
            CoreError::Encoding => Self::Encoding,
            CoreError::Syscall => Self::Syscall,
            CoreError::ScriptTooLong => Self::ScriptTooLong,
            CoreError::WitnessSize => Self::WitnessSize,
            CoreError::InvalidLabel => Self::InvalidLabel,
            CoreError::InvalidMask => Self::InvalidMask,
        }
    }
}
