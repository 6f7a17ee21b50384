// SPDX-License-Identifier: Apache-2.0
// Copyright © 2022 QI2 lab

//! Pattern-sequence programming for TI DLP6500/DLP9000 DMD controllers.
//!
//! These controllers drive a digital micromirror device (DMD) used here as a
//! programmable light-pattern projector in a structured-illumination (SIM)
//! microscope. The firmware image, prepared ahead of time with TI's
//! DLPC900REF-SW GUI, stores a fixed bank of binary mirror patterns addressed
//! by a `(picture, bit)` coordinate pair. At acquisition time this crate
//! selects, orders, repeats and interleaves subsets of those stored patterns
//! into the single linear sequence the firmware plays back, optionally
//! advancing on an external hardware trigger.
//!
//! # High-Level API
//! ```no_run
//! use dlp6500::{firmware, DmdDriver, SequenceRequest};
//! # use dlp6500::{DmdInterface, SequenceUpload, TriggerEdge, TriggerIn1};
//! # struct UsbDmd;
//! # impl DmdInterface for UsbDmd {
//! #     type Error = std::io::Error;
//! #     fn start_sequence(&mut self) -> Result<(), Self::Error> { Ok(()) }
//! #     fn stop_sequence(&mut self) -> Result<(), Self::Error> { Ok(()) }
//! #     fn trigger_in1(&mut self) -> Result<TriggerIn1, Self::Error> { unimplemented!() }
//! #     fn trigger_in2(&mut self) -> Result<TriggerEdge, Self::Error> { unimplemented!() }
//! #     fn set_pattern_sequence(&mut self, _: &SequenceUpload<'_>) -> Result<(), Self::Error> { Ok(()) }
//! # }
//! # let transport = UsbDmd;
//!
//! // `transport` is any DmdInterface implementation, typically the USB HID
//! // connection to the evaluation board.
//! let mut dmd = DmdDriver::new(transport, firmware::catalog());
//! let request = SequenceRequest::new(&["blue", "red"])
//!     .with_mode("sim")
//!     .with_dark_frames(2)
//!     .with_blank(true)
//!     .with_triggered(true);
//! let frames = dmd.program_sequence(&request)?;
//! println!("programmed {} frames", frames);
//! # Ok::<(), dlp6500::Error<UsbDmd>>(())
//! ```
//!
//! The request names channels (excitation colors) and a mode per channel and
//! leaves the index bookkeeping to the crate: each `(channel, mode)` pair is
//! resolved through the [`Catalog`] to its stored coordinates, then repeated,
//! prefixed with dark frames and interleaved with blanking frames as asked.
//!
//! # Low-Level API
//! [`sequence::synthesize`] is the pure synthesis function underneath
//! [`DmdDriver::program_sequence`], usable without a device when you only
//! need the index lists. Custom firmware layouts are described by building a
//! [`Catalog`] by hand instead of using [`firmware::catalog`], which covers
//! the standard mcSIM image.
//!
//! # Pictures and bits
//! The controller stores patterns as 1-bit planes packed 24 to a "picture".
//! A sequence entry is therefore a pair of indices: which picture, and which
//! bit plane within it. Sequences built here refer only to pre-stored
//! patterns; on-the-fly pattern upload is a different firmware mode this
//! crate does not touch.

#![no_std]

extern crate alloc;

pub mod catalog;
pub mod driver;
pub mod error;
pub mod firmware;
pub mod sequence;
#[cfg(test)]
mod test;

pub use catalog::{BasePatterns, Catalog, CatalogBuilder, Channel, PatternSet};
pub use driver::{
    DmdDriver, DmdInterface, PatternSource, SequenceUpload, TriggerEdge, TriggerIn1, TriggerMode,
};
pub use error::{Error, SequenceError};
pub use sequence::{synthesize, DeviceSequence, SequenceRequest};
