/*!
# Error types

This module holds the error types returned by the various constructors of
this crate.

Lookups which may legitimately come up empty (an unknown symbol, an unbound
namespace prefix) return [`Option`] instead of an error. Violations of
internal invariants (for example a hash table losing entries during a
rehash) are programming errors and cause a panic with a diagnostic message.
*/
use std::error;
use std::fmt;
use std::result::Result as StdResult;

/// Invalid configuration passed to a constructor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigError {
	/// The initial size of a table was zero.
	ZeroInitialSize,

	/// The fill factor was outside of `(0.01, 10.0]`.
	///
	/// The contained value is the rejected fill factor.
	FillFactorOutOfRange(f32),

	/// A segment length was zero or the maximum segment length was below
	/// the initial segment length.
	InvalidSegmentLength(usize),
}

impl fmt::Display for ConfigError {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::ZeroInitialSize => f.write_str("can not use zero initial size"),
			Self::FillFactorOutOfRange(v) if *v < MIN_FILL_FACTOR => {
				write!(f, "fill factor {} is lower than {}", v, MIN_FILL_FACTOR)
			}
			Self::FillFactorOutOfRange(v) => {
				write!(f, "fill factor {} is higher than {}", v, MAX_FILL_FACTOR)
			}
			Self::InvalidSegmentLength(v) => write!(f, "invalid segment length: {}", v),
		}
	}
}

impl error::Error for ConfigError {}

/// Smallest accepted fill factor (exclusive).
pub const MIN_FILL_FACTOR: f32 = 0.01;
/// Largest accepted fill factor (inclusive).
pub const MAX_FILL_FACTOR: f32 = 10.0;

/// Error types which may be returned by the constructors in this crate.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
	/// A constructor was called with an invalid configuration.
	Config(ConfigError),

	/// A word set or word resolver was to be built from an empty vocabulary.
	EmptyVocabulary,

	/// The encoded form of a word set does not fit into its compact storage.
	///
	/// The contained value is the number of storage cells which would have
	/// been needed.
	VocabularyTooLarge(usize),
}

pub type Result<T> = StdResult<T, Error>;

impl From<ConfigError> for Error {
	fn from(e: ConfigError) -> Error {
		Error::Config(e)
	}
}

impl fmt::Display for Error {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		match self {
			Error::Config(e) => write!(f, "invalid configuration: {}", e),
			Error::EmptyVocabulary => f.write_str("vocabulary must not be empty"),
			Error::VocabularyTooLarge(n) => {
				write!(f, "vocabulary too large: encoding needs {} cells", n)
			}
		}
	}
}

impl error::Error for Error {
	fn source(&self) -> Option<&(dyn error::Error + 'static)> {
		match self {
			Error::Config(e) => Some(e),
			Error::EmptyVocabulary | Error::VocabularyTooLarge(_) => None,
		}
	}
}
