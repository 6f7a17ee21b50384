// SPDX-License-Identifier: Apache-2.0
// Copyright © 2022 QI2 lab

//! The high-level driver tying the catalog and synthesizer to a device
//! transport.
//!
//! The physical link to the controller (USB HID on the evaluation boards) is
//! abstracted behind [`DmdInterface`], so the same programming logic works
//! against any transport implementation, including the scripted mock used by
//! the tests.

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::catalog::Catalog;
use crate::error::Error;
use crate::sequence::{synthesize, DeviceSequence, SequenceRequest};

/// Exposure time passed to the firmware for every frame, in the controller's
/// exposure time units.
pub const EXPOSURE_TIME: u32 = 105;

/// Delay before sequence start, in the controller's time units.
pub const START_DELAY: u32 = 0;

/// Bit depth of the stored patterns. The firmware bank holds binary mirror
/// images, so this is always 1.
pub const BIT_DEPTH: u8 = 1;

/// How the hardware trigger input 1 advances the sequence.
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum TriggerMode {
    Disabled = 0,
    RisingEdge = 1,
    FallingEdge = 2,
}

/// Active edge of the hardware trigger input 2.
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum TriggerEdge {
    Rising = 0,
    Falling = 1,
}

/// Where the controller sources pattern data from during playback.
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum PatternSource {
    Video = 0,
    /// Patterns already stored in the firmware image. The only source this
    /// crate programs sequences for.
    PreStored = 1,
    VideoPattern = 2,
    OnTheFly = 3,
}

/// The trigger input 1 configuration, as reported by the controller.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TriggerIn1 {
    /// Delay between the trigger edge and the pattern advance, in
    /// microseconds.
    pub delay_us: u32,
    pub mode: TriggerMode,
}

/// One pattern-sequence upload, with every firmware parameter spelled out.
///
/// The driver treats the upload as a single atomic operation; partial upload
/// failures are not decomposed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SequenceUpload<'a> {
    pub picture_indices: &'a [u16],
    pub bit_indices: &'a [u16],
    pub exposure_time: u32,
    pub start_delay: u32,
    /// Advance on the external hardware trigger instead of the internal
    /// timer.
    pub triggered: bool,
    pub clear_pattern_after_trigger: bool,
    pub bit_depth: u8,
    /// Extra device-side repeats of the whole sequence. 0 plays it once per
    /// start.
    pub num_repeats: u32,
    pub source: PatternSource,
}

/// The transport-level operations a DMD controller connection must provide.
///
/// Implementations own the wire protocol; this crate only decides what to
/// send. All operations are synchronous and non-reentrant: callers keep
/// exclusive use of the handle for the duration of a programming cycle.
pub trait DmdInterface {
    type Error;

    /// Begin playback of the currently programmed sequence.
    fn start_sequence(&mut self) -> Result<(), Self::Error>;

    /// Halt any running sequence.
    fn stop_sequence(&mut self) -> Result<(), Self::Error>;

    /// Read the trigger input 1 configuration. Read-only.
    fn trigger_in1(&mut self) -> Result<TriggerIn1, Self::Error>;

    /// Read the trigger input 2 active edge. Read-only.
    fn trigger_in2(&mut self) -> Result<TriggerEdge, Self::Error>;

    /// Upload a pattern sequence to the controller.
    fn set_pattern_sequence(&mut self, upload: &SequenceUpload<'_>) -> Result<(), Self::Error>;
}

/// High-level driver for programming pattern sequences.
///
/// Owns the transport handle and the immutable catalog. A programming cycle
/// is: synthesize the sequence (all request errors surface here, before any
/// device traffic), stop playback, log the trigger configuration, upload.
#[derive(Clone, Debug)]
pub struct DmdDriver<D> {
    device: D,
    catalog: Catalog,
}

impl<D> DmdDriver<D>
where
    D: DmdInterface,
{
    /// Create a driver from a transport handle and a catalog.
    ///
    /// An invalid catalog is logged but not rejected; lookups against the
    /// malformed entries will fail per-request instead.
    pub fn new(device: D, catalog: Catalog) -> Self {
        if !catalog.validate() {
            log::warn!("catalog failed validation; some requests will be rejected");
        }
        Self { device, catalog }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Give the transport handle back, dropping the driver.
    pub fn into_inner(self) -> D {
        self.device
    }

    /// Synthesize the sequence for `request` without touching the device.
    pub fn synthesize(&self, request: &SequenceRequest) -> Result<DeviceSequence, Error<D>> {
        Ok(synthesize(&self.catalog, request)?)
    }

    /// Run a full programming cycle for `request`.
    ///
    /// Returns the number of frames programmed. Request problems surface as
    /// [`Error::Sequence`] before any device interaction; any transport
    /// failure afterwards surfaces as [`Error::Programming`] with the
    /// attempted sequence length attached.
    pub fn program_sequence(&mut self, request: &SequenceRequest) -> Result<usize, Error<D>> {
        let sequence = synthesize(&self.catalog, request)?;
        let sequence_len = sequence.len();
        log::debug!("picture indices: {:?}", sequence.picture_indices());
        log::debug!("bit indices: {:?}", sequence.bit_indices());

        self.device
            .stop_sequence()
            .map_err(|error| Error::Programming {
                error,
                sequence_len,
            })?;

        // Trigger state is reported for diagnostics only, never altered here.
        let trigger1 = self
            .device
            .trigger_in1()
            .map_err(|error| Error::Programming {
                error,
                sequence_len,
            })?;
        log::info!(
            "trigger 1: delay={}us mode={:?}",
            trigger1.delay_us,
            trigger1.mode
        );
        let trigger2 = self
            .device
            .trigger_in2()
            .map_err(|error| Error::Programming {
                error,
                sequence_len,
            })?;
        log::info!("trigger 2: edge={:?}", trigger2);

        let upload = SequenceUpload {
            picture_indices: sequence.picture_indices(),
            bit_indices: sequence.bit_indices(),
            exposure_time: EXPOSURE_TIME,
            start_delay: START_DELAY,
            triggered: request.triggered(),
            clear_pattern_after_trigger: false,
            bit_depth: BIT_DEPTH,
            num_repeats: 0,
            source: PatternSource::PreStored,
        };
        self.device
            .set_pattern_sequence(&upload)
            .map_err(|error| Error::Programming {
                error,
                sequence_len,
            })?;
        log::info!("programmed {} frames", sequence_len);
        Ok(sequence_len)
    }

    /// Begin playback of the programmed sequence.
    ///
    /// Outside a programming cycle there is no attempted sequence, so a
    /// transport failure here carries a length of 0.
    pub fn start_sequence(&mut self) -> Result<(), Error<D>> {
        self.device
            .start_sequence()
            .map_err(|error| Error::Programming {
                error,
                sequence_len: 0,
            })
    }

    /// Halt any running sequence.
    pub fn stop_sequence(&mut self) -> Result<(), Error<D>> {
        self.device
            .stop_sequence()
            .map_err(|error| Error::Programming {
                error,
                sequence_len: 0,
            })
    }
}
