// SPDX-License-Identifier: Apache-2.0
// Copyright © 2022 QI2 lab

//! The channel/mode catalog mapping named pattern groups to their firmware
//! storage coordinates.
//!
//! DLPC900-class controllers store pattern images in firmware as bit planes
//! addressed by a `(picture, bit)` pair; pictures hold 24 bit planes each.
//! Which plane holds which pattern is decided when the firmware image is
//! assembled (for example with TI's DLPC900REF-SW GUI), so the mapping is
//! static for the lifetime of the process. The catalog captures that mapping
//! as a two-level table: channel name → mode name → [`PatternSet`].
//!
//! A catalog is built once at startup from the firmware layout constants and
//! never mutated afterwards. Mode derivation (widefield/on/off/affine/sim
//! aliases from the base blanking patterns and the channel polarity) happens
//! entirely at build time, so every lookup afterwards is a plain map access.

use alloc::borrow::ToOwned;
use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

use crate::error::SequenceError;

/// Mode name every channel is required to define.
pub const MODE_DEFAULT: &str = "default";
/// Structured-illumination pattern bank; aliases `default` unless a channel
/// defines it explicitly.
pub const MODE_SIM: &str = "sim";
/// Uniform illumination.
pub const MODE_WIDEFIELD: &str = "widefield";
/// Affine calibration patterns.
pub const MODE_AFFINE: &str = "affine";
/// All mirrors directing light into the optical path.
pub const MODE_ON: &str = "on";
/// Blanking pattern; also used for dark frames.
pub const MODE_OFF: &str = "off";

/// An ordered list of firmware `(picture, bit)` coordinates.
///
/// The two index lists always have the same length; position `i` of each
/// together address one stored pattern image.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PatternSet {
    picture_indices: Vec<u16>,
    bit_indices: Vec<u16>,
}

impl PatternSet {
    /// Create a pattern set from parallel picture and bit index lists.
    ///
    /// Returns [None] if the two lists differ in length.
    pub fn new(picture_indices: Vec<u16>, bit_indices: Vec<u16>) -> Option<Self> {
        if picture_indices.len() != bit_indices.len() {
            return None;
        }
        Some(Self {
            picture_indices,
            bit_indices,
        })
    }

    /// A pattern set addressing a single stored pattern.
    pub fn single(picture: u16, bit: u16) -> Self {
        Self {
            picture_indices: alloc::vec![picture],
            bit_indices: alloc::vec![bit],
        }
    }

    /// The number of patterns in the set.
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

    /// The coordinate pair at `index`, if present.
    pub fn coordinate(&self, index: usize) -> Option<(u16, u16)> {
        Some((
            *self.picture_indices.get(index)?,
            *self.bit_indices.get(index)?,
        ))
    }

    /// The first coordinate pair in the set.
    ///
    /// Blanking and dark-frame insertion use this on a channel's `off` set,
    /// which holds exactly one pattern in practice.
    pub fn head(&self) -> Option<(u16, u16)> {
        self.coordinate(0)
    }
}

/// The four base patterns every catalog is seeded with.
///
/// `on` and `off` are the full-field mirror states used for widefield
/// illumination, blanking and dark frames. The affine pair are the dedicated
/// calibration patterns. All four are stored once per firmware image and
/// shared by every channel, with the channel polarity deciding which of each
/// pair a given mode resolves to.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BasePatterns {
    pub on: PatternSet,
    pub off: PatternSet,
    pub affine_on: PatternSet,
    pub affine_off: PatternSet,
}

/// A named pattern group scoped to one excitation channel.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Channel {
    name: String,
    inverted: bool,
    modes: BTreeMap<String, PatternSet>,
}

impl Channel {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the channel's polarity is reversed relative to the optical
    /// path, swapping the meaning of the base on/off patterns.
    pub fn inverted(&self) -> bool {
        self.inverted
    }

    pub fn mode(&self, name: &str) -> Option<&PatternSet> {
        self.modes.get(name)
    }

    pub fn mode_names(&self) -> impl Iterator<Item = &str> {
        self.modes.keys().map(String::as_str)
    }
}

/// The immutable channel → mode → [`PatternSet`] table.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Catalog {
    channels: BTreeMap<String, Channel>,
}

impl Catalog {
    /// Start building a catalog from the shared base patterns.
    pub fn builder(base: BasePatterns) -> CatalogBuilder {
        CatalogBuilder {
            base,
            channels: Vec::new(),
        }
    }

    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.channels.get(name)
    }

    pub fn channel_names(&self) -> impl Iterator<Item = &str> {
        self.channels.keys().map(String::as_str)
    }

    /// Resolve a `(channel, mode)` pair to its firmware coordinates.
    pub fn lookup(&self, channel: &str, mode: &str) -> Result<&PatternSet, SequenceError> {
        let chan = self
            .channels
            .get(channel)
            .ok_or_else(|| SequenceError::UnknownChannel(channel.to_owned()))?;
        chan.mode(mode).ok_or_else(|| SequenceError::UnknownMode {
            channel: channel.to_owned(),
            mode: mode.to_owned(),
        })
    }

    /// Check the catalog invariants: every channel defines a `default` mode,
    /// and every mode's index lists are non-empty (equal length is already
    /// enforced by [`PatternSet::new`]).
    pub fn validate(&self) -> bool {
        self.channels.values().all(|chan| {
            chan.modes.contains_key(MODE_DEFAULT)
                && chan.modes.values().all(|set| !set.is_empty())
        })
    }
}

struct PendingChannel {
    name: String,
    inverted: bool,
    default: PatternSet,
    explicit: Vec<(String, PatternSet)>,
}

/// Builder assembling a [`Catalog`] from firmware layout knowledge.
///
/// Construction is deterministic and idempotent: building twice from the same
/// inputs yields catalogs that compare equal.
pub struct CatalogBuilder {
    base: BasePatterns,
    channels: Vec<PendingChannel>,
}

impl CatalogBuilder {
    /// Add a channel with its polarity and its `default` pattern bank.
    ///
    /// The standard mode family (`sim`, `widefield`, `affine`, `on`, `off`)
    /// is derived from the base patterns when the catalog is built.
    pub fn channel(mut self, name: &str, inverted: bool, default: PatternSet) -> Self {
        self.channels.push(PendingChannel {
            name: name.to_owned(),
            inverted,
            default,
            explicit: Vec::new(),
        });
        self
    }

    /// Define a mode explicitly on the most recently added channel,
    /// overriding the derived alias of the same name.
    ///
    /// Calling this before any [`channel`][Self::channel] call is a no-op.
    pub fn explicit_mode(mut self, name: &str, set: PatternSet) -> Self {
        if let Some(chan) = self.channels.last_mut() {
            chan.explicit.push((name.to_owned(), set));
        }
        self
    }

    /// Materialize the catalog, deriving the convenience modes per channel.
    pub fn build(self) -> Catalog {
        let base = &self.base;
        let channels = self
            .channels
            .into_iter()
            .map(|pending| {
                // The polarity rule: inverted channels swap which base
                // pattern "on" and "off" resolve to, and select the affine
                // pattern of the opposite polarity.
                let (widefield, on, off, affine) = if pending.inverted {
                    (&base.on, &base.off, &base.on, &base.affine_off)
                } else {
                    (&base.on, &base.on, &base.off, &base.affine_on)
                };
                let mut modes = BTreeMap::new();
                modes.insert(MODE_DEFAULT.to_owned(), pending.default.clone());
                modes.insert(MODE_SIM.to_owned(), pending.default);
                modes.insert(MODE_WIDEFIELD.to_owned(), widefield.clone());
                modes.insert(MODE_ON.to_owned(), on.clone());
                modes.insert(MODE_OFF.to_owned(), off.clone());
                modes.insert(MODE_AFFINE.to_owned(), affine.clone());
                for (name, set) in pending.explicit {
                    modes.insert(name, set);
                }
                (
                    pending.name.clone(),
                    Channel {
                        name: pending.name,
                        inverted: pending.inverted,
                        modes,
                    },
                )
            })
            .collect();
        Catalog { channels }
    }
}

#[cfg(test)]
mod test {
    use alloc::vec;

    use super::*;

    fn base() -> BasePatterns {
        BasePatterns {
            on: PatternSet::single(1, 3),
            off: PatternSet::single(1, 4),
            affine_on: PatternSet::single(1, 5),
            affine_off: PatternSet::single(1, 6),
        }
    }

    fn sim_bank() -> PatternSet {
        PatternSet::new(vec![0; 9], (0..9).collect()).unwrap()
    }

    #[test]
    fn mismatched_lengths_rejected() {
        assert!(PatternSet::new(vec![0, 0], vec![1]).is_none());
    }

    #[test]
    fn non_inverted_aliases() {
        let catalog = Catalog::builder(base())
            .channel("blue", false, sim_bank())
            .build();
        assert_eq!(
            catalog.lookup("blue", MODE_WIDEFIELD).unwrap(),
            &PatternSet::single(1, 3)
        );
        assert_eq!(
            catalog.lookup("blue", MODE_ON).unwrap(),
            &PatternSet::single(1, 3)
        );
        assert_eq!(
            catalog.lookup("blue", MODE_OFF).unwrap(),
            &PatternSet::single(1, 4)
        );
        assert_eq!(
            catalog.lookup("blue", MODE_AFFINE).unwrap(),
            &PatternSet::single(1, 5)
        );
    }

    #[test]
    fn inverted_aliases_swapped() {
        let catalog = Catalog::builder(base())
            .channel("green", true, sim_bank())
            .build();
        assert_eq!(
            catalog.lookup("green", MODE_WIDEFIELD).unwrap(),
            &PatternSet::single(1, 3)
        );
        assert_eq!(
            catalog.lookup("green", MODE_ON).unwrap(),
            &PatternSet::single(1, 4)
        );
        assert_eq!(
            catalog.lookup("green", MODE_OFF).unwrap(),
            &PatternSet::single(1, 3)
        );
        assert_eq!(
            catalog.lookup("green", MODE_AFFINE).unwrap(),
            &PatternSet::single(1, 6)
        );
    }

    #[test]
    fn sim_aliases_default_unless_explicit() {
        let catalog = Catalog::builder(base())
            .channel("blue", false, sim_bank())
            .channel("odt", false, PatternSet::single(0, 0))
            .explicit_mode(MODE_SIM, PatternSet::single(2, 7))
            .build();
        assert_eq!(catalog.lookup("blue", MODE_SIM).unwrap(), &sim_bank());
        assert_eq!(
            catalog.lookup("odt", MODE_SIM).unwrap(),
            &PatternSet::single(2, 7)
        );
        assert_eq!(
            catalog.lookup("odt", MODE_DEFAULT).unwrap(),
            &PatternSet::single(0, 0)
        );
    }

    #[test]
    fn lookup_failures() {
        let catalog = Catalog::builder(base())
            .channel("blue", false, sim_bank())
            .build();
        assert_eq!(
            catalog.lookup("teal", MODE_SIM).unwrap_err(),
            SequenceError::UnknownChannel("teal".into())
        );
        assert_eq!(
            catalog.lookup("blue", "strobe").unwrap_err(),
            SequenceError::UnknownMode {
                channel: "blue".into(),
                mode: "strobe".into(),
            }
        );
    }

    #[test]
    fn validate_rejects_empty_sets() {
        let good = Catalog::builder(base())
            .channel("blue", false, sim_bank())
            .build();
        assert!(good.validate());

        let empty_default = Catalog::builder(base())
            .channel("blue", false, PatternSet::new(vec![], vec![]).unwrap())
            .build();
        assert!(!empty_default.validate());
    }

    #[test]
    fn validate_requires_default_mode() {
        let mut catalog = Catalog::builder(base())
            .channel("blue", false, sim_bank())
            .build();
        let chan = catalog.channels.get_mut("blue").unwrap();
        chan.modes.remove(MODE_DEFAULT);
        assert!(!catalog.validate());
    }

    #[test]
    fn build_is_deterministic() {
        let build = || {
            Catalog::builder(base())
                .channel("blue", false, sim_bank())
                .channel("green", true, sim_bank())
                .build()
        };
        assert_eq!(build(), build());
    }
}
