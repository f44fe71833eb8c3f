use std::{error::Error, fmt};

pub type PolicyResult<T> = Result<T, PolicyError>;

/// Any reason a policy submission can be rejected. A rejected install
/// leaves the previously committed policy untouched, so from the table's
/// perspective a failed install never happened.
///
/// Enumeration past the end of the policy is not in this taxonomy; it is
/// a defined no-more-data signal, modeled as `None` from the ordinal
/// accessors.
#[derive(Debug)]
pub enum PolicyError {
    /// The install buffer exceeds the accepted maximum; rejected before
    /// any parsing is attempted.
    BufferTooLarge { size: usize, limit: usize },
    /// A token could not be parsed as an unsigned 64-bit integer.
    MalformedNumber { text: String },
    /// A record was started but the buffer ended before all three of its
    /// tokens were found.
    PrematureEndOfInput,
    /// Two records in the same submission name the same register.
    DuplicateRegister { register: u64 },
    /// Staging or table memory could not be obtained.
    AllocationFailure,
}

impl fmt::Display for PolicyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyError::BufferTooLarge { size, limit } => {
                write!(f, "{size} byte policy buffer exceeds {limit} byte limit")
            }
            PolicyError::MalformedNumber { text } => {
                write!(f, "'{text}' is not an unsigned 64-bit integer")
            }
            PolicyError::PrematureEndOfInput => {
                write!(f, "input ended in the middle of a record")
            }
            PolicyError::DuplicateRegister { register } => {
                write!(f, "register 0x{register:X} appears more than once")
            }
            PolicyError::AllocationFailure => write!(f, "policy storage allocation failed"),
        }
    }
}

impl Error for PolicyError {}
