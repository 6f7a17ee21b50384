// SPDX-License-Identifier: Apache-2.0
// Copyright © 2022 QI2 lab

//! Firmware pattern layout for the mcSIM instrument.
//!
//! These constants describe where each pattern lives in the firmware image
//! flashed to the controller. Pattern loading itself is done ahead of time
//! with TI's DLPC900REF-SW GUI; if the firmware image is rebuilt with a
//! different layout, this module is the only place that needs to change.
//!
//! The SIM banks hold one pattern per (angle, phase) combination, phase
//! fastest, which is what [`sim_index`] encodes.

use arrayvec::ArrayVec;

use crate::catalog::{BasePatterns, Catalog, PatternSet};

/// Number of SIM pattern angles stored per channel.
pub const NANGLES: usize = 3;
/// Number of SIM pattern phases stored per angle.
pub const NPHASES: usize = 3;
/// Patterns in one channel's SIM bank.
pub const SIM_PATTERNS: usize = NANGLES * NPHASES;

/// All-mirrors-on pattern.
pub const ON: (u16, u16) = (1, 3);
/// All-mirrors-off pattern.
pub const OFF: (u16, u16) = (1, 4);
/// Affine calibration pattern, on polarity.
pub const AFFINE_ON: (u16, u16) = (1, 5);
/// Affine calibration pattern, off polarity.
pub const AFFINE_OFF: (u16, u16) = (1, 6);

/// Wavelength aliases for the channel names, so requests can name a channel
/// by its excitation wavelength in nanometers.
pub const CHANNEL_ALIASES: &[(&str, &str)] = &[
    ("473", "blue"),
    ("635", "red"),
    ("532", "green"),
    ("405", "purple"),
];

/// Map a wavelength alias to its canonical channel name.
///
/// Names that aren't aliases pass through unchanged; a genuinely unknown
/// channel is caught later by the catalog lookup.
pub fn canonical_channel(name: &str) -> &str {
    CHANNEL_ALIASES
        .iter()
        .find(|(alias, _)| *alias == name)
        .map_or(name, |(_, canonical)| canonical)
}

/// The position of an (angle, phase) SIM pattern within its channel bank.
///
/// Returns [None] when either index is outside the stored grid.
pub fn sim_index(angle: usize, phase: usize) -> Option<usize> {
    (angle < NANGLES && phase < NPHASES).then(|| NPHASES * angle + phase)
}

/// The base blanking and calibration patterns shared by every channel.
pub fn base_patterns() -> BasePatterns {
    BasePatterns {
        on: PatternSet::single(ON.0, ON.1),
        off: PatternSet::single(OFF.0, OFF.1),
        affine_on: PatternSet::single(AFFINE_ON.0, AFFINE_ON.1),
        affine_off: PatternSet::single(AFFINE_OFF.0, AFFINE_OFF.1),
    }
}

/// Assemble one channel's SIM bank from a picture index and a run of bit
/// plane indices, possibly spilling into the next picture.
fn sim_bank<P, B>(pictures: P, bits: B) -> PatternSet
where
    P: IntoIterator<Item = u16>,
    B: IntoIterator<Item = u16>,
{
    let pictures: ArrayVec<u16, SIM_PATTERNS> = pictures.into_iter().collect();
    let bits: ArrayVec<u16, SIM_PATTERNS> = bits.into_iter().collect();
    PatternSet::new(pictures.to_vec(), bits.to_vec())
        .expect("SIM bank picture and bit index runs have the same length")
}

/// Build the catalog for the standard mcSIM firmware image.
///
/// Channels: `blue` (473 nm), `red` (635 nm), `green` (532 nm, polarity
/// inverted), `purple` (405 nm), and the single-pattern `odt` channel.
pub fn catalog() -> Catalog {
    Catalog::builder(base_patterns())
        .channel("blue", false, sim_bank([0; 9], 0..9))
        .channel("red", false, sim_bank([0; 9], 9..18))
        .channel(
            "green",
            true,
            sim_bank(
                [0, 0, 0, 0, 0, 0, 1, 1, 1],
                (18..24).chain(0..3),
            ),
        )
        .channel("purple", false, sim_bank([1; 9], [3; 9]))
        .channel("odt", false, PatternSet::single(0, 0))
        .build()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::catalog::{MODE_OFF, MODE_SIM};

    #[test]
    fn standard_catalog_validates() {
        assert!(catalog().validate());
    }

    #[test]
    fn sim_banks_match_firmware_layout() {
        let catalog = catalog();
        let blue = catalog.lookup("blue", MODE_SIM).unwrap();
        assert_eq!(blue.picture_indices(), &[0; 9]);
        assert_eq!(blue.bit_indices(), &[0, 1, 2, 3, 4, 5, 6, 7, 8]);

        let green = catalog.lookup("green", MODE_SIM).unwrap();
        assert_eq!(green.picture_indices(), &[0, 0, 0, 0, 0, 0, 1, 1, 1]);
        assert_eq!(green.bit_indices(), &[18, 19, 20, 21, 22, 23, 0, 1, 2]);
    }

    #[test]
    fn green_polarity_is_inverted() {
        let catalog = catalog();
        assert!(catalog.channel("green").unwrap().inverted());
        // Inverted channels blank with the base "on" pattern.
        let off = catalog.lookup("green", MODE_OFF).unwrap();
        assert_eq!(off.head(), Some(ON));
    }

    #[test]
    fn wavelength_aliases_resolve() {
        assert_eq!(canonical_channel("473"), "blue");
        assert_eq!(canonical_channel("532"), "green");
        assert_eq!(canonical_channel("blue"), "blue");
        assert_eq!(canonical_channel("odt"), "odt");
    }

    #[test]
    fn sim_index_layout() {
        assert_eq!(sim_index(0, 0), Some(0));
        assert_eq!(sim_index(1, 0), Some(3));
        assert_eq!(sim_index(2, 2), Some(8));
        assert_eq!(sim_index(3, 0), None);
        assert_eq!(sim_index(0, 3), None);
    }
}
