//! The single status type every fallible strait operation reports through.

/// Outcome of any strait operation.
///
/// Errors abort the current codec pass and propagate up unchanged.
/// `NoFurtherProcessingRequired` is not a failure: it is a cooperative
/// signal from the version converter or the simply-assignable fast path
/// meaning "the value has been fully handled, do not emit the remaining
/// fields". Generated struct routines intercept it; it must never escape
/// to a caller as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Status {
    #[error("no further processing required")]
    NoFurtherProcessingRequired,

    // Protocol-level disagreements.
    #[error("peer protocol version is not supported")]
    ErrorNotSupportedProtocolVersion,
    #[error("common flags violate a party's mandatory/forbidden set")]
    ErrorNotCompatibleCommonFlagsSettings,

    // Schema-level disagreements.
    #[error("interface version is outside the supported range")]
    ErrorNotSupportedInterfaceVersion,
    #[error("input or output interface version is outside the supported range")]
    ErrorNotSupportedInOutInterfaceVersion,
    #[error("struct id in the message does not match the expected type")]
    ErrorMismatchOfStructId,
    #[error("data flags violate the struct's mandatory/forbidden set")]
    ErrorNotCompatibleDataFlagsSettings,
    #[error("current serialization settings cannot represent this struct")]
    ErrorNotSupportedSerializationSettingsForStruct,
    #[error("value on the wire is not valid for the target type")]
    ErrorInvalidType,
    #[error("integer wider than eight bytes on the wire")]
    ErrorTypeSizeIsTooBig,

    // Buffer-level failures.
    #[error("read past the end of the buffer")]
    ErrorOverflow,
    #[error("message bytes are inconsistent or truncated")]
    ErrorDataCorrupted,

    // Registry lookups.
    #[error("no handler is registered for this struct id")]
    ErrorNoSuchHandler,
    #[error("more than one handler is registered for this struct id")]
    ErrorMoreEntries,

    // Resources.
    #[error("allocation failed")]
    ErrorNoMemory,

    // API usage.
    #[error("invalid argument")]
    ErrorInvalidArgument,
    #[error("already initialized")]
    ErrorAlreadyInited,
    #[error("not initialized")]
    ErrorNotInited,
    #[error("internal invariant violated")]
    ErrorInternal,
}

/// Wire code for a successful operation. Never constructed as a `Status`
/// value in-process (success is `Ok`), but status replies carry it when a
/// peer asked for an explicit acknowledgment.
pub const NO_ERROR_CODE: u32 = 0;

impl Status {
    /// Stable numeric code used in status-message framing.
    pub fn code(self) -> u32 {
        match self {
            Status::NoFurtherProcessingRequired => 1,
            Status::ErrorNotSupportedProtocolVersion => 2,
            Status::ErrorNotCompatibleCommonFlagsSettings => 3,
            Status::ErrorNotSupportedInterfaceVersion => 4,
            Status::ErrorNotSupportedInOutInterfaceVersion => 5,
            Status::ErrorMismatchOfStructId => 6,
            Status::ErrorNotCompatibleDataFlagsSettings => 7,
            Status::ErrorNotSupportedSerializationSettingsForStruct => 8,
            Status::ErrorInvalidType => 9,
            Status::ErrorTypeSizeIsTooBig => 10,
            Status::ErrorOverflow => 11,
            Status::ErrorDataCorrupted => 12,
            Status::ErrorNoSuchHandler => 13,
            Status::ErrorMoreEntries => 14,
            Status::ErrorNoMemory => 15,
            Status::ErrorInvalidArgument => 16,
            Status::ErrorAlreadyInited => 17,
            Status::ErrorNotInited => 18,
            Status::ErrorInternal => 19,
        }
    }

    /// Inverse of [`code`](Self::code). `None` for `NO_ERROR_CODE` (success
    /// has no `Status` value) and for codes this build does not know.
    pub fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            1 => Status::NoFurtherProcessingRequired,
            2 => Status::ErrorNotSupportedProtocolVersion,
            3 => Status::ErrorNotCompatibleCommonFlagsSettings,
            4 => Status::ErrorNotSupportedInterfaceVersion,
            5 => Status::ErrorNotSupportedInOutInterfaceVersion,
            6 => Status::ErrorMismatchOfStructId,
            7 => Status::ErrorNotCompatibleDataFlagsSettings,
            8 => Status::ErrorNotSupportedSerializationSettingsForStruct,
            9 => Status::ErrorInvalidType,
            10 => Status::ErrorTypeSizeIsTooBig,
            11 => Status::ErrorOverflow,
            12 => Status::ErrorDataCorrupted,
            13 => Status::ErrorNoSuchHandler,
            14 => Status::ErrorMoreEntries,
            15 => Status::ErrorNoMemory,
            16 => Status::ErrorInvalidArgument,
            17 => Status::ErrorAlreadyInited,
            18 => Status::ErrorNotInited,
            19 => Status::ErrorInternal,
            _ => return None,
        })
    }

    /// True for the sentinel, false for every real error.
    pub fn is_success(self) -> bool {
        self == Status::NoFurtherProcessingRequired
    }
}

pub type Result<T = ()> = core::result::Result<T, Status>;
