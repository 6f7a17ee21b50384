// SPDX-License-Identifier: Apache-2.0
// Copyright © 2022 QI2 lab
#[cfg(feature = "std")]
extern crate std;

use alloc::string::String;
use core::fmt;

use crate::driver::DmdInterface;

/// Errors raised while resolving or synthesizing a pattern sequence.
///
/// All of these are detected before any device interaction takes place, and
/// carry enough context (channel name, mode name, offending index) to diagnose
/// a bad request without a debugger attached.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SequenceError {
    /// The requested channel is not present in the catalog.
    UnknownChannel(String),

    /// The channel exists, but does not define the requested mode.
    UnknownMode { channel: String, mode: String },

    /// A broadcastable request field has a length that is neither 1 nor the
    /// number of requested channels.
    ArityMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A pattern subset index falls outside the resolved pattern set.
    IndexOutOfRange {
        channel: String,
        index: usize,
        len: usize,
    },

    /// A repeat count was negative.
    InvalidRepeatCount { channel: String, count: i32 },
}

impl fmt::Display for SequenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SequenceError::UnknownChannel(channel) => {
                write!(f, "unknown channel {:?}", channel)
            }
            SequenceError::UnknownMode { channel, mode } => {
                write!(f, "channel {:?} does not define mode {:?}", channel, mode)
            }
            SequenceError::ArityMismatch {
                field,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "field {:?} has {} entries, expected 1 or {}",
                    field, actual, expected
                )
            }
            SequenceError::IndexOutOfRange {
                channel,
                index,
                len,
            } => {
                write!(
                    f,
                    "pattern index {} out of range for channel {:?} ({} patterns)",
                    index, channel, len
                )
            }
            SequenceError::InvalidRepeatCount { channel, count } => {
                write!(
                    f,
                    "repeat count {} for channel {:?} must be non-negative",
                    count, channel
                )
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for SequenceError {}

/// Errors from a full programming cycle against a device handle.
#[derive(Clone, PartialEq)]
pub enum Error<D>
where
    D: DmdInterface,
{
    /// Sequence synthesis failed; the device was never touched.
    Sequence(SequenceError),

    /// The device transport failed while programming an already-synthesized
    /// sequence. The length of the attempted sequence is kept for diagnostics.
    Programming {
        error: D::Error,
        sequence_len: usize,
    },
}

// Custom Debug implementation so that the transport itself doesn't need to
// implement Debug, only its error type.
impl<D> fmt::Debug for Error<D>
where
    D: DmdInterface,
    D::Error: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Sequence(err) => f.debug_tuple("Error::Sequence").field(err).finish(),
            Error::Programming {
                error,
                sequence_len,
            } => f
                .debug_struct("Error::Programming")
                .field("error", error)
                .field("sequence_len", sequence_len)
                .finish(),
        }
    }
}

impl<D> fmt::Display for Error<D>
where
    D: DmdInterface,
    D::Error: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Sequence(err) => write!(f, "Sequence error: {}", err),
            Error::Programming {
                error,
                sequence_len,
            } => write!(
                f,
                "Device programming failed after synthesizing {} frames: {:?}",
                sequence_len, error
            ),
        }
    }
}

#[cfg(feature = "std")]
impl<D> std::error::Error for Error<D>
where
    D: DmdInterface,
    D::Error: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Sequence(err) => Some(err),
            Error::Programming { error, .. } => Some(error),
        }
    }
}

impl<D> From<SequenceError> for Error<D>
where
    D: DmdInterface,
{
    fn from(err: SequenceError) -> Self {
        Self::Sequence(err)
    }
}
