//! Domain primitives, services and ports.
//!
//! Purpose: Define strongly typed records for users and access codes, the
//! services that issue and verify codes, and the ports those services drive.
//! Persistence lives behind the ports in `crate::outbound`.
//!
//! Public surface:
//! - Error (alias to `error::Error`) with its stable `ErrorCode`.
//! - User, NewUser, UserChanges: user directory records.
//! - AccessCode, NewAccessCode, AccessCodeFilter, CodeRole: code records.
//! - CodeLifecycleService: retires and issues codes (`AccessCodeCommand`).
//! - CodeVerificationService: resolves presented codes
//!   (`CodeVerificationQuery`).

pub mod access_code;
pub mod code_generator;
pub mod code_lifecycle_service;
pub mod code_verification_service;
pub mod error;
pub mod ports;
pub mod read_back;
pub mod tier;
pub mod user;
pub mod verification;

pub use self::access_code::{
    AccessCode, AccessCodeFilter, AccessCodeId, CodeRole, IssuedCodes, NewAccessCode,
    UnknownCodeRole,
};
pub use self::code_generator::{CodeGenerator, RandomCodeGenerator};
pub use self::code_lifecycle_service::{
    CandidateExhaustion, CodeLifecycleConfig, CodeLifecycleService,
};
pub use self::code_verification_service::{CodeVerificationConfig, CodeVerificationService};
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::read_back::{ReadBackPolicy, Sleeper, TokioSleeper, read_back};
pub use self::tier::{Tier, YEARLY_MARKERS};
pub use self::user::{NewUser, User, UserChanges, UserId, UserValidationError};
pub use self::verification::{
    CompanionCodes, IdentityClaims, InvalidReason, VerificationOutcome, VerifiedAccess,
};
