// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::collections::HashMap;
use std::path::Path;
use std::process;

use pico_args::Arguments;

const HELP: &str = "\
svg2pptx converts SVG documents into PowerPoint presentations.

USAGE:
  svg2pptx [OPTIONS] <in-svg> <out-pptx>

OPTIONS:
  -h, --help                    Prints help information
  -V, --version                 Prints version information

  --profile PROFILE             Selects the policy profile
                                [default: balanced]
                                [possible values: speed, balanced, quality]
  --animation-mode MODE         Selects the animation lowering strategy
                                [default: powerpoint]
                                [possible values: powerpoint, baked, static]
  --no-animations               Drops animations; the last-frame state is used
  --bake-fps FPS                Sets the sample rate for baked animations
                                [default: 24] [possible values: 1..60]
  --bake-max-keyframes N        Caps the baked keyframe count
                                [default: 30] [possible values: 1..120]
  --slide-width-emu N           Sets the target slide width in EMU
                                [default: 12192000]
  --font-fallback FROM=TO       Substitutes a font family during text
                                lowering. This option can be set
                                multiple times
  --dpi DPI                     Sets the resolution used for unit
                                conversion [default: 96]

  --quiet                       Disables warnings

ARGS:
  <in-svg>                      Input file
  <out-pptx>                    Output file
";

#[derive(Debug)]
struct Args {
    profile: svg2pptx::Profile,
    animation_mode: svg2pptx::AnimationMode,
    no_animations: bool,
    bake_fps: u32,
    bake_max_keyframes: u32,
    slide_width_emu: u64,
    font_fallback: Vec<(String, String)>,
    dpi: u32,
    quiet: bool,
    input: String,
    output: String,
}

fn collect_args() -> Result<Args, pico_args::Error> {
    let mut input = Arguments::from_env();

    if input.contains(["-h", "--help"]) {
        print!("{}", HELP);
        process::exit(0);
    }

    if input.contains(["-V", "--version"]) {
        println!("{}", env!("CARGO_PKG_VERSION"));
        process::exit(0);
    }

    Ok(Args {
        profile: input
            .opt_value_from_str("--profile")?
            .unwrap_or(svg2pptx::Profile::Balanced),
        animation_mode: input
            .opt_value_from_str("--animation-mode")?
            .unwrap_or(svg2pptx::AnimationMode::PowerPoint),
        no_animations: input.contains("--no-animations"),
        bake_fps: input
            .opt_value_from_fn("--bake-fps", parse_bake_fps)?
            .unwrap_or(24),
        bake_max_keyframes: input
            .opt_value_from_fn("--bake-max-keyframes", parse_max_keyframes)?
            .unwrap_or(30),
        slide_width_emu: input
            .opt_value_from_fn("--slide-width-emu", parse_slide_width)?
            .unwrap_or(svg2pptx::WIDESCREEN_SLIDE.0),
        font_fallback: input
            .values_from_fn("--font-fallback", parse_font_fallback)?,
        dpi: input.opt_value_from_fn("--dpi", parse_dpi)?.unwrap_or(96),
        quiet: input.contains("--quiet"),
        input: input.free_from_str()?,
        output: input.free_from_str()?,
    })
}

fn parse_bake_fps(s: &str) -> Result<u32, String> {
    let n: u32 = s.parse().map_err(|_| "invalid number")?;
    if (1..=60).contains(&n) {
        Ok(n)
    } else {
        Err("FPS out of bounds".to_string())
    }
}

fn parse_max_keyframes(s: &str) -> Result<u32, String> {
    let n: u32 = s.parse().map_err(|_| "invalid number")?;
    if (1..=120).contains(&n) {
        Ok(n)
    } else {
        Err("keyframe cap out of bounds".to_string())
    }
}

fn parse_slide_width(s: &str) -> Result<u64, String> {
    let n: u64 = s.parse().map_err(|_| "invalid number")?;
    if n > 0 {
        Ok(n)
    } else {
        Err("slide width cannot be zero".to_string())
    }
}

fn parse_font_fallback(s: &str) -> Result<(String, String), String> {
    let mut parts = s.splitn(2, '=');
    let from = parts.next().unwrap_or("").trim();
    let to = parts.next().unwrap_or("").trim();
    if from.is_empty() || to.is_empty() {
        return Err("expected FROM=TO".to_string());
    }

    Ok((from.to_string(), to.to_string()))
}

fn parse_dpi(s: &str) -> Result<u32, String> {
    let n: u32 = s.parse().map_err(|_| "invalid number")?;
    if (10..=4000).contains(&n) {
        Ok(n)
    } else {
        Err("DPI out of bounds".to_string())
    }
}

fn main() {
    let args = match collect_args() {
        Ok(v) => v,
        Err(e) => {
            eprintln!("Error: {}.", e);
            process::exit(1);
        }
    };

    if !args.quiet {
        if let Ok(()) = log::set_logger(&LOGGER) {
            log::set_max_level(log::LevelFilter::Warn);
        }
    }

    process::exit(process(args));
}

fn process(args: Args) -> i32 {
    if !Path::new(&args.input).exists() {
        eprintln!("Error: '{}' does not exist.", args.input);
        return 2;
    }

    let data = match std::fs::read(&args.input) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("Error: failed to read '{}' cause {}.", args.input, e);
            return 2;
        }
    };

    let mut font_fallback = HashMap::new();
    for (from, to) in args.font_fallback {
        font_fallback.insert(from, to);
    }

    let opt = svg2pptx::Options {
        profile: args.profile,
        slide_width_emu: args.slide_width_emu,
        preserve_animations: !args.no_animations,
        animation_mode: args.animation_mode,
        bake_fps: args.bake_fps,
        bake_max_keyframes: args.bake_max_keyframes,
        font_fallback,
        parser: svg2pptx::parser::Options {
            dpi: args.dpi as f64,
            ..svg2pptx::parser::Options::default()
        },
    };

    let conversion = match svg2pptx::convert(&data, &opt) {
        Ok(conversion) => conversion,
        Err(svg2pptx::Error::Parse(e)) => {
            eprintln!("Error: {}.", e);
            return 2;
        }
        Err(e) => {
            eprintln!("Error: {}.", e);
            return 3;
        }
    };

    if let Err(e) = std::fs::write(&args.output, conversion.pptx) {
        eprintln!("Error: failed to write '{}' cause {}.", args.output, e);
        return 4;
    }

    0
}

/// Prints warnings and errors to stderr; quieter levels are filtered
/// out at `set_max_level`.
static LOGGER: StderrLogger = StderrLogger;
struct StderrLogger;

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::LevelFilter::Warn
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let prefix = match record.level() {
            log::Level::Error => "error",
            log::Level::Warn => "warning",
            log::Level::Info => "info",
            log::Level::Debug => "debug",
            log::Level::Trace => "trace",
        };

        eprintln!("{}: {}", prefix, record.args());
    }

    fn flush(&self) {}
}
