// SPDX-License-Identifier: Apache-2.0
// Copyright © 2022 QI2 lab

//! Program a DMD pattern sequence from the command line.
//!
//! Patterns must already be present in the controller firmware (loaded with
//! TI's DLPC900REF-SW GUI); this tool only selects and orders them. The
//! device transport is out of scope here, so the synthesized sequence is
//! printed and handed to a dry-run transport that echoes the programming
//! cycle instead of a USB connection.

use std::env;

use anyhow::{bail, Context, Result};

use dlp6500::{
    firmware, DmdDriver, DmdInterface, SequenceRequest, SequenceUpload, TriggerEdge, TriggerIn1,
    TriggerMode,
};

const USAGE: &str = "usage: set-dmd-sequence <color>... [options]

Colors may be channel names (blue, red, green, purple, odt) or excitation
wavelengths (473, 635, 532, 405).

options:
  -m, --mode <sim|widefield|affine>  pattern mode (default sim)
  -wr, --repeats <n>                 times to repeat widefield/affine patterns
                                     (default 9, simulating the SIM sequence)
  -t, --triggered                    advance patterns on the hardware trigger
  -d, --darkframes <n>               off frames before each color (default 0)
  -b, --blank                        insert an off frame between patterns
  -s, --singlepattern                display one SIM pattern, chosen by angle/phase
  -a, --angle <0..2>                 angle index for --singlepattern
  -p, --phase <0..2>                 phase index for --singlepattern
  -v, --verbose                      print the full index lists";

struct Options {
    colors: Vec<String>,
    mode: String,
    repeats: i32,
    triggered: bool,
    dark_frames: u32,
    blank: bool,
    single_pattern: bool,
    angle: Option<usize>,
    phase: Option<usize>,
    verbose: bool,
}

fn parse_args() -> Result<Options> {
    let mut options = Options {
        colors: Vec::new(),
        mode: "sim".to_string(),
        repeats: (firmware::NANGLES * firmware::NPHASES) as i32,
        triggered: false,
        dark_frames: 0,
        blank: false,
        single_pattern: false,
        angle: None,
        phase: None,
        verbose: false,
    };
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => bail!("{}", USAGE),
            "-m" | "--mode" => {
                let mode = args.next().context("--mode requires a value")?;
                match mode.as_str() {
                    "sim" | "widefield" | "affine" => options.mode = mode,
                    other => bail!("mode {:?} is not one of sim, widefield, affine", other),
                }
            }
            "-wr" | "--repeats" => {
                let value = args.next().context("--repeats requires a value")?;
                options.repeats = value
                    .parse()
                    .with_context(|| format!("bad repeat count {:?}", value))?;
            }
            "-t" | "--triggered" => options.triggered = true,
            "-d" | "--darkframes" => {
                let value = args.next().context("--darkframes requires a value")?;
                options.dark_frames = value
                    .parse()
                    .with_context(|| format!("bad dark frame count {:?}", value))?;
            }
            "-b" | "--blank" => options.blank = true,
            "-s" | "--singlepattern" => options.single_pattern = true,
            "-a" | "--angle" => {
                let value = args.next().context("--angle requires a value")?;
                options.angle = Some(value.parse().context("bad angle index")?);
            }
            "-p" | "--phase" => {
                let value = args.next().context("--phase requires a value")?;
                options.phase = Some(value.parse().context("bad phase index")?);
            }
            "-v" | "--verbose" => options.verbose = true,
            color if !color.starts_with('-') => {
                options
                    .colors
                    .push(firmware::canonical_channel(color).to_string());
            }
            other => bail!("unknown argument {:?}\n{}", other, USAGE),
        }
    }
    if options.colors.is_empty() {
        bail!("at least one color is required\n{}", USAGE);
    }
    if options.single_pattern {
        if options.colors.len() != 1 {
            bail!("--singlepattern needs exactly one color argument");
        }
        if options.angle.is_none() || options.phase.is_none() {
            bail!("--singlepattern needs both --angle and --phase");
        }
    }
    Ok(options)
}

fn build_request(options: &Options) -> Result<SequenceRequest> {
    let mut request = SequenceRequest::new(&options.colors)
        .with_triggered(options.triggered)
        .with_dark_frames(options.dark_frames)
        .with_blank(options.blank);
    match options.mode.as_str() {
        "sim" => request = request.with_mode("sim"),
        // Widefield and affine banks hold one pattern; repeating it stands in
        // for the angle/phase loop of the SIM sequence.
        mode => request = request.with_mode(mode).with_repeat(options.repeats),
    }
    if options.single_pattern {
        let (angle, phase) = (options.angle.unwrap(), options.phase.unwrap());
        let index = firmware::sim_index(angle, phase)
            .with_context(|| format!("no stored pattern for angle {} phase {}", angle, phase))?;
        request = request
            .with_mode("sim")
            .with_pattern_subset(&[index])
            .with_repeat(1);
    }
    Ok(request)
}

fn main() -> Result<()> {
    let options = parse_args()?;
    let mut dmd = DmdDriver::new(DryRunDmd, firmware::catalog());
    let request = build_request(&options)?;

    let sequence = dmd.synthesize(&request)?;
    println!("{} frames", sequence.len());
    if options.verbose {
        println!("picture indices: {:?}", sequence.picture_indices());
        println!("    bit indices: {:?}", sequence.bit_indices());
    }

    dmd.program_sequence(&request)?;
    println!("finished programming DMD");
    Ok(())
}

/// A transport that echoes the programming cycle instead of talking to
/// hardware. Swap in a real `DmdInterface` implementation to drive a device.
struct DryRunDmd;

impl DmdInterface for DryRunDmd {
    type Error = std::convert::Infallible;

    fn start_sequence(&mut self) -> Result<(), Self::Error> {
        println!("dmd: start sequence");
        Ok(())
    }

    fn stop_sequence(&mut self) -> Result<(), Self::Error> {
        println!("dmd: stop sequence");
        Ok(())
    }

    fn trigger_in1(&mut self) -> Result<TriggerIn1, Self::Error> {
        Ok(TriggerIn1 {
            delay_us: 0,
            mode: TriggerMode::RisingEdge,
        })
    }

    fn trigger_in2(&mut self) -> Result<TriggerEdge, Self::Error> {
        Ok(TriggerEdge::Rising)
    }

    fn set_pattern_sequence(&mut self, upload: &SequenceUpload<'_>) -> Result<(), Self::Error> {
        println!(
            "dmd: upload {} frames (exposure={}, triggered={}, source={:?})",
            upload.picture_indices.len(),
            upload.exposure_time,
            upload.triggered,
            upload.source
        );
        Ok(())
    }
}
