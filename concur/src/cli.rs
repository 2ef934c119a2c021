use clap::parser::ValueSource;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use concur::icon::inputs::DeclaredKind;
use concur::icon::meta::{BuildStep, SourceDeclaration};
use concur::icon::requests::{self, IconSize};
use std::ffi::OsString;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::str::FromStr;
use tracing_subscriber::filter::LevelFilter;

const SOURCE_HELP: &str = "Adding an image does not guarantee that it will be used, use -s to \
    request an output image of the same or smaller size.";

const HOTSPOT_HELP: &str = "Makes the output a cursor, regardless of the extension of the output \
    file. Only applies to sizes declared after it. The number is either a value in the range \
    [0, 1] or an integer ratio like 4/16. Use -xy to set both coordinates at once.";

const EXAMPLES: &str = "\
Examples:
  concur icon.ico -i icon_image.tga -A
      16x16, 24x24, 32x32, 48x48 and 256x256 bitmaps from a single image.

  concur -b icon_16x16.png -b icon_64x64.png -i icon_256x256.png -SNX -s 128 icon.ico
      16x16 and 32x32 bitmaps, 128x128 and 256x256 PNGs.

  concur -i icon_image.tga -xy 2/16 -SM -x 3/32 -N cursor.cur
      A cursor with the hotspot at 2,2 (16x16), 3,3 (24x24) and 3,4 (32x32).";

/// Preset flags and the size each of them requests.
const PRESET_FLAGS: [(&str, u16); 5] = [
    ("small", 16),
    ("medium", 24),
    ("normal", 32),
    ("large", 48),
    ("extra-large", 256),
];

pub fn command() -> Command {
    Command::new(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .about("Converts one or more image files into a Windows icon or cursor.")
        .after_help(EXAMPLES)
        .arg(
            Arg::new("output")
                .value_name("OUTPUT_PATH")
                .value_parser(value_parser!(PathBuf))
                .help("The icon or cursor file to write"),
        )
        .arg(
            source_arg("input", 'i', 'I')
                .help("Adds a source image, stored as PNG if the image is a PNG file")
                .long_help(format!(
                    "Adds the specified path as a source image. If the image is a PNG \
                     image, it will be stored as such in the icon or cursor, even if it is \
                     resized. Otherwise it will be stored as a bitmap.\n\n{}",
                    SOURCE_HELP
                )),
        )
        .arg(
            source_arg("png", 'p', 'P')
                .help("Adds a source image whose output images are stored as PNGs")
                .long_help(format!(
                    "Adds the specified path as a source image. Output images based on \
                     this one will be stored as PNGs.\n\n{}",
                    SOURCE_HELP
                )),
        )
        .arg(
            source_arg("bmp", 'b', 'B')
                .alias("dib")
                .help("Adds a source image whose output images are stored as bitmaps")
                .long_help(format!(
                    "Adds the specified path as a source image. Output images based on \
                     this one will be stored as bitmaps.\n\n{}",
                    SOURCE_HELP
                )),
        )
        .arg(
            Arg::new("hotspot-x")
                .short('x')
                .long("hotspot-x")
                .value_name("NUMBER")
                .action(ArgAction::Append)
                .value_parser(requests::parse_coordinate)
                .help("Sets the X coordinate of the cursor hotspot")
                .long_help(format!(
                    "Sets the X coordinate of the cursor hotspot. {}",
                    HOTSPOT_HELP
                )),
        )
        .arg(
            Arg::new("hotspot-y")
                .short('y')
                .long("hotspot-y")
                .value_name("NUMBER")
                .action(ArgAction::Append)
                .value_parser(requests::parse_coordinate)
                .help("Sets the Y coordinate of the cursor hotspot")
                .long_help(format!(
                    "Sets the Y coordinate of the cursor hotspot. {}",
                    HOTSPOT_HELP
                )),
        )
        .arg(
            Arg::new("size")
                .short('s')
                .long("size")
                .value_name("DIMENSION")
                .action(ArgAction::Append)
                .value_parser(IconSize::from_str)
                .help("Adds an image of the specified width and height to the output")
                .long_help(
                    "Adds an image of the specified width and height to the output. If no \
                     source image of this size or larger was added, a warning is generated \
                     and the size is skipped.",
                ),
        )
        .arg(preset_arg("small", 'S', "16"))
        .arg(preset_arg("medium", 'M', "24"))
        .arg(preset_arg("normal", 'N', "32"))
        .arg(preset_arg("large", 'L', "48"))
        .arg(preset_arg("extra-large", 'X', "256"))
        .arg(
            Arg::new("all")
                .short('A')
                .long("all")
                .action(ArgAction::Count)
                .help("Equivalent to -SMNLX"),
        )
        .arg(
            Arg::new("manifest")
                .short('m')
                .long("manifest")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .help("Loads sources and sizes from a JSON file before the command line ones"),
        )
        .arg(
            Arg::new("jobs")
                .short('j')
                .long("jobs")
                .value_name("N")
                .value_parser(|s: &str| s.parse::<NonZeroUsize>())
                .help("The maximum number of images processed at the same time"),
        )
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbosity")
                .value_name("LEVEL")
                .default_value("info")
                .value_parser(|s: &str| s.parse::<LevelFilter>())
                .help("The minimum level of log messages: off, error, warn, info, debug or trace"),
        )
}

fn source_arg(id: &'static str, short: char, alias: char) -> Arg {
    Arg::new(id)
        .short(short)
        .short_alias(alias)
        .long(id)
        .value_name("PATH")
        .action(ArgAction::Append)
        .value_parser(value_parser!(PathBuf))
}

fn preset_arg(id: &'static str, short: char, size: &'static str) -> Arg {
    Arg::new(id)
        .short(short)
        .long(id)
        .alias(size)
        .action(ArgAction::Count)
        .help(format!("Equivalent to -s {}", size))
}

/// Splits combined hotspot flags such as `-xy 2/16` into `-x 2/16 -y 2/16`.
///
/// Every letter of the group takes the same value. Arguments after `--` are left alone.
pub fn expand_hotspot_groups<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut args = args.into_iter().map(Into::<OsString>::into);
    let mut expanded = Vec::new();

    while let Some(arg) = args.next() {
        if arg.to_str() == Some("--") {
            expanded.push(arg);
            expanded.extend(args);
            break;
        }

        let letters = arg
            .to_str()
            .and_then(|s| s.strip_prefix('-'))
            .filter(|s| s.len() > 1 && s.chars().all(|c| c == 'x' || c == 'y'))
            .map(str::to_owned);

        // Only a group consumes the following argument
        match letters.and_then(|letters| Some((letters, args.next()?))) {
            Some((letters, value)) => {
                for letter in letters.chars() {
                    expanded.push(OsString::from(format!("-{}", letter)));
                    expanded.push(value.clone());
                }
            }
            None => expanded.push(arg),
        }
    }

    expanded
}

/// Everything the command line asked for.
#[derive(Debug)]
pub struct Invocation {
    pub output: Option<PathBuf>,
    pub manifest: Option<PathBuf>,
    pub jobs: Option<NonZeroUsize>,
    pub verbosity: LevelFilter,

    /// Source, hotspot and size declarations in command line order
    pub steps: Vec<BuildStep>,
}

impl Invocation {
    pub fn from_matches(matches: &ArgMatches) -> Self {
        let mut steps: Vec<(usize, BuildStep)> = Vec::new();

        for (id, kind) in [
            ("input", DeclaredKind::Automatic),
            ("png", DeclaredKind::Png),
            ("bmp", DeclaredKind::Bitmap),
        ] {
            collect_values(matches, id, &mut steps, |file: &PathBuf| {
                BuildStep::Source(SourceDeclaration {
                    file: file.clone(),
                    kind,
                })
            });
        }

        collect_values(matches, "hotspot-x", &mut steps, |x: &f64| {
            BuildStep::HotspotX(*x)
        });
        collect_values(matches, "hotspot-y", &mut steps, |y: &f64| {
            BuildStep::HotspotY(*y)
        });
        collect_values(matches, "size", &mut steps, |size: &IconSize| {
            BuildStep::Size(size.get())
        });

        for (id, size) in PRESET_FLAGS {
            collect_flags(matches, id, &mut steps, || BuildStep::Size(size));
        }
        collect_flags(matches, "all", &mut steps, || BuildStep::Presets);

        // Hotspots only apply to later sizes, so command line order matters
        steps.sort_by_key(|(index, _)| *index);

        Self {
            output: matches.get_one::<PathBuf>("output").cloned(),
            manifest: matches.get_one::<PathBuf>("manifest").cloned(),
            jobs: matches.get_one::<NonZeroUsize>("jobs").copied(),
            verbosity: matches
                .get_one::<LevelFilter>("verbosity")
                .copied()
                .unwrap_or(LevelFilter::INFO),
            steps: steps.into_iter().map(|(_, step)| step).collect(),
        }
    }
}

fn collect_values<T: Clone + Send + Sync + 'static>(
    matches: &ArgMatches,
    id: &str,
    steps: &mut Vec<(usize, BuildStep)>,
    map: impl Fn(&T) -> BuildStep,
) {
    if let (Some(values), Some(indices)) = (matches.get_many::<T>(id), matches.indices_of(id)) {
        steps.extend(indices.zip(values).map(|(index, value)| (index, map(value))));
    }
}

fn collect_flags(
    matches: &ArgMatches,
    id: &str,
    steps: &mut Vec<(usize, BuildStep)>,
    step: impl Fn() -> BuildStep,
) {
    if matches.value_source(id) != Some(ValueSource::CommandLine) {
        return;
    }

    if let Some(indices) = matches.indices_of(id) {
        steps.extend(indices.map(|index| (index, step())));
    }
}
