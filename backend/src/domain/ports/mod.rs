//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Driven ports ([`UserRepository`], [`AccessCodeRepository`]) describe the
//! record store; driving ports ([`AccessCodeCommand`],
//! [`CodeVerificationQuery`]) describe the use cases inbound adapters call.
//! Each driven port exposes a strongly typed error so adapters map their
//! failures into predictable variants.

mod macros;
pub(crate) use macros::define_port_error;

mod access_code_command;
mod access_code_repository;
mod code_verification_query;
mod user_repository;

#[cfg(test)]
pub use access_code_command::MockAccessCodeCommand;
pub use access_code_command::AccessCodeCommand;
#[cfg(test)]
pub use access_code_repository::MockAccessCodeRepository;
pub use access_code_repository::{AccessCodeRepository, AccessCodeRepositoryError};
#[cfg(test)]
pub use code_verification_query::MockCodeVerificationQuery;
pub use code_verification_query::CodeVerificationQuery;
#[cfg(test)]
pub use user_repository::MockUserRepository;
pub use user_repository::{UserRepository, UserRepositoryError};
