//! Error types for the port layer
//!
//! Uses Rust's Result pattern instead of C-style error pointers.

/// Port layer error type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum PortError {
    // ============ Fatal errors ============
    /// Task returned from its entry function
    FatalReturn = 15001,

    // ============ ISR errors ============
    /// Voluntary context switch requested from interrupt context
    CtxSwIsr = 10002,
    /// Interrupt nesting deeper than the configured maximum
    IntNestingOvf = 10003,

    // ============ OS state errors ============
    /// OS is not running
    OsNotRunning = 24201,
    /// OS is already running
    OsRunning = 24202,
    /// Port not initialized
    OsNotInit = 24203,

    // ============ Configuration errors ============
    /// Hook table already installed
    HooksInstalled = 24301,

    // ============ Stack errors ============
    /// Invalid stack pointer
    StkInvalid = 28207,
    /// Invalid stack size
    StkSizeInvalid = 28208,
    /// Stack overflow detected
    StkOvf = 28210,

    // ============ TCB errors ============
    /// Invalid TCB pointer
    TcbInvalid = 29101,
}

/// Result type alias for port operations
pub type PortResult<T> = Result<T, PortError>;

impl PortError {
    /// Numeric error code
    #[inline]
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Whether the caller must halt rather than continue
    #[inline]
    pub fn is_fatal(self) -> bool {
        matches!(
            self,
            PortError::FatalReturn | PortError::IntNestingOvf | PortError::StkOvf
        )
    }
}
