// SPDX-License-Identifier: Apache-2.0
// Copyright © 2022 QI2 lab
mod dmd_mock;

pub(crate) use dmd_mock::{DmdOperation, MockDmd, MockError};
