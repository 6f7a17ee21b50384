// SPDX-License-Identifier: Apache-2.0
// Copyright © 2022 QI2 lab

//! Pattern-sequence synthesis.
//!
//! [`synthesize`] turns a high-level [`SequenceRequest`] into the exact
//! ordered list of `(picture, bit)` firmware coordinates the controller will
//! play back. It is a pure function over the request and the catalog: no
//! device interaction, no interior state, identical inputs always produce
//! identical output.
//!
//! The transformation is a fixed pipeline applied per channel, in request
//! order:
//!
//! 1. broadcast the per-channel request fields to one entry per channel;
//! 2. resolve `(channel, mode)` through the catalog and select the requested
//!    pattern subset, preserving order (duplicates allowed);
//! 3. tile the selection by the channel's repeat count;
//! 4. prefix the global number of dark frames using the channel's `off`
//!    pattern;
//! 5. if blanking is requested, interleave an `off` frame after every
//!    pattern frame (pattern first, never off first);
//! 6. concatenate all channels into one flat sequence.

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use paste::paste;

use crate::catalog::{Catalog, MODE_DEFAULT, MODE_OFF};
use crate::error::SequenceError;

/// DRY macro for the broadcastable `with_*` setters on `SequenceRequest`.
///
/// Each broadcastable field gets a plural setter taking one value per channel
/// and a singular setter that broadcasts one value across all of them.
macro_rules! broadcast_field {
    { $plural:ident, $single:ident, $typ:ty, $doc:literal } => {
        paste! {
            #[doc = $doc]
            ///
            /// A single-element slice broadcasts across every requested
            /// channel; any other length mismatch fails during synthesis.
            pub fn [< with_ $plural >](mut self, values: &[$typ]) -> Self {
                self.$plural = values.to_vec();
                self
            }

            #[doc = $doc]
            ///
            /// Singleton form, broadcast across every requested channel.
            pub fn [< with_ $single >](mut self, value: $typ) -> Self {
                self.$plural = alloc::vec![value];
                self
            }
        }
    };
}

/// A description of the sequence to synthesize.
///
/// Only the channel list is mandatory. Modes default to `"default"`, repeat
/// counts to 1, blanking to off, dark frames to 0, and the pattern subset to
/// the full pattern bank of each resolved mode.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SequenceRequest {
    channels: Vec<String>,
    modes: Vec<String>,
    pattern_indices: Option<Vec<Vec<usize>>>,
    repeats: Vec<i32>,
    dark_frames: u32,
    blank_flags: Vec<bool>,
    triggered: bool,
}

impl SequenceRequest {
    /// A request for the given channels with all other fields defaulted.
    pub fn new<S: AsRef<str>>(channels: &[S]) -> Self {
        Self {
            channels: channels.iter().map(|c| c.as_ref().to_string()).collect(),
            modes: alloc::vec![MODE_DEFAULT.to_string()],
            pattern_indices: None,
            repeats: alloc::vec![1],
            dark_frames: 0,
            blank_flags: alloc::vec![false],
            triggered: false,
        }
    }

    /// The mode to resolve for each channel.
    ///
    /// A single-element slice broadcasts across every requested channel; any
    /// other length mismatch fails during synthesis.
    pub fn with_modes<S: AsRef<str>>(mut self, modes: &[S]) -> Self {
        self.modes = modes.iter().map(|m| m.as_ref().to_string()).collect();
        self
    }

    /// One mode, broadcast across every requested channel.
    pub fn with_mode(mut self, mode: &str) -> Self {
        self.modes = alloc::vec![mode.to_string()];
        self
    }

    /// The subset of pattern positions to select per channel, in playback
    /// order. Duplicates and reordering are allowed, which is how a single
    /// angle/phase pattern gets replayed by index.
    ///
    /// A single-element slice broadcasts across every requested channel.
    /// When unset, each channel uses its full pattern bank in storage order.
    pub fn with_pattern_indices(mut self, subsets: &[&[usize]]) -> Self {
        self.pattern_indices = Some(subsets.iter().map(|s| s.to_vec()).collect());
        self
    }

    /// One pattern subset, broadcast across every requested channel.
    pub fn with_pattern_subset(mut self, subset: &[usize]) -> Self {
        self.pattern_indices = Some(alloc::vec![subset.to_vec()]);
        self
    }

    broadcast_field! {
        repeats,
        repeat,
        i32,
        "How many times to tile each channel's selected patterns."
    }

    broadcast_field! {
        blank_flags,
        blank,
        bool,
        "Whether to interleave an `off` frame after every pattern frame."
    }

    /// The number of `off` frames prepended to every channel's sequence.
    pub fn with_dark_frames(mut self, count: u32) -> Self {
        self.dark_frames = count;
        self
    }

    /// Whether the firmware should advance patterns on the external hardware
    /// trigger instead of its internal timer.
    pub fn with_triggered(mut self, triggered: bool) -> Self {
        self.triggered = triggered;
        self
    }

    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    pub fn triggered(&self) -> bool {
        self.triggered
    }

    pub fn dark_frames(&self) -> u32 {
        self.dark_frames
    }
}

/// The flat `(picture, bit)` index pair handed to the device for upload.
///
/// A derived, transient artifact: recomputed per acquisition, never stored.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DeviceSequence {
    picture_indices: Vec<u16>,
    bit_indices: Vec<u16>,
}

impl DeviceSequence {
    /// The number of frames in the sequence.
    pub fn len(&self) -> usize {
        self.picture_indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.picture_indices.is_empty()
    }

    pub fn picture_indices(&self) -> &[u16] {
        &self.picture_indices
    }

    pub fn bit_indices(&self) -> &[u16] {
        &self.bit_indices
    }

    fn push(&mut self, picture: u16, bit: u16) {
        self.picture_indices.push(picture);
        self.bit_indices.push(bit);
    }
}

/// Broadcast a per-channel field to one entry per channel.
///
/// The single broadcasting rule, shared by every broadcastable field: length
/// 1 broadcasts to N, length N is used as-is, anything else is an error.
fn broadcast<T: Clone>(
    field: &'static str,
    values: &[T],
    nchannels: usize,
) -> Result<Vec<T>, SequenceError> {
    if values.len() == nchannels {
        Ok(values.to_vec())
    } else if values.len() == 1 {
        Ok(alloc::vec![values[0].clone(); nchannels])
    } else {
        Err(SequenceError::ArityMismatch {
            field,
            expected: nchannels,
            actual: values.len(),
        })
    }
}

/// The first coordinate of a channel's `off` pattern, used for dark frames
/// and blank interleaving.
fn off_coordinate(catalog: &Catalog, channel: &str) -> Result<(u16, u16), SequenceError> {
    let off = catalog.lookup(channel, MODE_OFF)?;
    // Validated catalogs never have empty mode sets, but don't panic on an
    // unvalidated one.
    off.head().ok_or_else(|| SequenceError::IndexOutOfRange {
        channel: channel.to_string(),
        index: 0,
        len: 0,
    })
}

/// Synthesize the flat device sequence for a request.
///
/// An empty channel list yields an empty sequence, not an error. All failures
/// happen before any device interaction; see [`SequenceError`] for the
/// taxonomy.
pub fn synthesize(
    catalog: &Catalog,
    request: &SequenceRequest,
) -> Result<DeviceSequence, SequenceError> {
    let nchannels = request.channels.len();
    let modes = broadcast("modes", &request.modes, nchannels)?;
    let repeats = broadcast("repeat_counts", &request.repeats, nchannels)?;
    let blank = broadcast("blank_flags", &request.blank_flags, nchannels)?;
    let subsets = request
        .pattern_indices
        .as_deref()
        .map(|subsets| broadcast("pattern_indices", subsets, nchannels))
        .transpose()?;

    let mut sequence = DeviceSequence::default();
    for (ii, channel) in request.channels.iter().enumerate() {
        let patterns = catalog.lookup(channel, &modes[ii])?;

        // Select the requested subset, preserving the given order.
        let full_bank: Vec<usize>;
        let subset: &[usize] = match &subsets {
            Some(subsets) => &subsets[ii],
            None => {
                full_bank = (0..patterns.len()).collect();
                &full_bank
            }
        };
        let mut selected = Vec::with_capacity(subset.len());
        for &index in subset {
            let coordinate =
                patterns
                    .coordinate(index)
                    .ok_or_else(|| SequenceError::IndexOutOfRange {
                        channel: channel.clone(),
                        index,
                        len: patterns.len(),
                    })?;
            selected.push(coordinate);
        }

        // Tile by the repeat count.
        let count = repeats[ii];
        if count < 0 {
            return Err(SequenceError::InvalidRepeatCount {
                channel: channel.clone(),
                count,
            });
        }
        let mut frames: Vec<(u16, u16)> = Vec::with_capacity(selected.len() * count as usize);
        for _ in 0..count {
            frames.extend_from_slice(&selected);
        }

        // Dark frames go in front, before any blanking.
        if request.dark_frames > 0 {
            let off = off_coordinate(catalog, channel)?;
            let mut prefixed = Vec::with_capacity(frames.len() + request.dark_frames as usize);
            prefixed.extend(core::iter::repeat(off).take(request.dark_frames as usize));
            prefixed.extend(frames);
            frames = prefixed;
        }

        // Blanking doubles the channel: pattern, off, pattern, off, ...
        if blank[ii] {
            let off = off_coordinate(catalog, channel)?;
            let mut interleaved = Vec::with_capacity(frames.len() * 2);
            for frame in frames {
                interleaved.push(frame);
                interleaved.push(off);
            }
            frames = interleaved;
        }

        for (picture, bit) in frames {
            sequence.push(picture, bit);
        }
    }
    Ok(sequence)
}
