// SPDX-License-Identifier: Apache-2.0
// Copyright © 2022 QI2 lab

//! A scripted stand-in for the DMD transport.
//!
//! Every operation the driver performs is appended to a journal so tests can
//! assert on the exact order and parameters of the programming cycle, and
//! uploads can be made to fail on demand.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;

use crate::driver::{
    DmdInterface, PatternSource, SequenceUpload, TriggerEdge, TriggerIn1, TriggerMode,
};

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum DmdOperation {
    Start,
    Stop,
    QueryTriggerIn1,
    QueryTriggerIn2,
    Upload {
        picture_indices: Vec<u16>,
        bit_indices: Vec<u16>,
        exposure_time: u32,
        start_delay: u32,
        triggered: bool,
        clear_pattern_after_trigger: bool,
        bit_depth: u8,
        num_repeats: u32,
        source: PatternSource,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum MockError {
    UploadRefused,
}

impl fmt::Display for MockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MockError::UploadRefused => write!(f, "mock transport refused the upload"),
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct MockDmd {
    journal: Rc<RefCell<Vec<DmdOperation>>>,
    trigger1: TriggerIn1,
    trigger2: TriggerEdge,
    refuse_uploads: bool,
}

impl MockDmd {
    pub(crate) fn new() -> Self {
        Self {
            journal: Rc::new(RefCell::new(Vec::new())),
            trigger1: TriggerIn1 {
                delay_us: 0,
                mode: TriggerMode::RisingEdge,
            },
            trigger2: TriggerEdge::Rising,
            refuse_uploads: false,
        }
    }

    /// Make every subsequent upload fail with [`MockError::UploadRefused`].
    pub(crate) fn refuse_uploads(&mut self) {
        self.refuse_uploads = true;
    }

    pub(crate) fn journal(&self) -> Vec<DmdOperation> {
        self.journal.borrow().clone()
    }

    fn record(&self, operation: DmdOperation) {
        self.journal.borrow_mut().push(operation);
    }
}

impl DmdInterface for MockDmd {
    type Error = MockError;

    fn start_sequence(&mut self) -> Result<(), Self::Error> {
        self.record(DmdOperation::Start);
        Ok(())
    }

    fn stop_sequence(&mut self) -> Result<(), Self::Error> {
        self.record(DmdOperation::Stop);
        Ok(())
    }

    fn trigger_in1(&mut self) -> Result<TriggerIn1, Self::Error> {
        self.record(DmdOperation::QueryTriggerIn1);
        Ok(self.trigger1)
    }

    fn trigger_in2(&mut self) -> Result<TriggerEdge, Self::Error> {
        self.record(DmdOperation::QueryTriggerIn2);
        Ok(self.trigger2)
    }

    fn set_pattern_sequence(&mut self, upload: &SequenceUpload<'_>) -> Result<(), Self::Error> {
        self.record(DmdOperation::Upload {
            picture_indices: upload.picture_indices.to_vec(),
            bit_indices: upload.bit_indices.to_vec(),
            exposure_time: upload.exposure_time,
            start_delay: upload.start_delay,
            triggered: upload.triggered,
            clear_pattern_after_trigger: upload.clear_pattern_after_trigger,
            bit_depth: upload.bit_depth,
            num_repeats: upload.num_repeats,
            source: upload.source,
        });
        if self.refuse_uploads {
            return Err(MockError::UploadRefused);
        }
        Ok(())
    }
}
