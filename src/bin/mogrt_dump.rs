use anyhow::{Context, Result, bail};
use clap::{Arg, ArgAction, ArgMatches, Command};
use indoc::indoc;
use log::{Level, info};
use mogrt::Mogrt;
use serde_json::Value;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::exit;

#[derive(Copy, Clone, PartialEq, Eq)]
enum DumpTarget {
    Manifest,
    Fields,
}

struct MogrtDump {
    input: PathBuf,
    target: DumpTarget,
    flatten: bool,
    indent: bool,
    extract_to: Option<PathBuf>,
    verbosity_level: Option<Level>,
}

impl MogrtDump {
    fn from_cli_matches(matches: &ArgMatches) -> Result<Self> {
        let input = PathBuf::from(
            matches
                .get_one::<String>("INPUT")
                .context("tried to access INPUT, which is required")?,
        );

        let target = if matches.get_flag("fields") {
            DumpTarget::Fields
        } else {
            DumpTarget::Manifest
        };

        let verbosity_level = match matches.get_count("verbose") {
            0 => None,
            1 => Some(Level::Info),
            2 => Some(Level::Debug),
            3 => Some(Level::Trace),
            _ => {
                eprintln!("using more than  -vvv does not affect verbosity level");
                Some(Level::Trace)
            }
        };

        Ok(MogrtDump {
            input,
            target,
            flatten: !matches.get_flag("raw"),
            indent: !matches.get_flag("no-indent"),
            extract_to: matches.get_one::<String>("extract-to").map(PathBuf::from),
            verbosity_level,
        })
    }

    fn run(&self) -> Result<()> {
        self.try_to_initialize_logging();

        let mut template = Mogrt::new(&self.input);
        template
            .init()
            .with_context(|| format!("Failed to read template {}", self.input.display()))?;

        if let Some(dir) = &self.extract_to {
            return self.extract(&mut template, dir);
        }

        let value = match self.target {
            DumpTarget::Manifest => template.get_manifest(self.flatten)?,
            DumpTarget::Fields => Value::Array(template.get_essential_fields(self.flatten)?),
        };

        let rendered = if self.indent {
            serde_json::to_string_pretty(&value)?
        } else {
            serde_json::to_string(&value)?
        };

        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{}", rendered)?;
        Ok(())
    }

    fn extract(&self, template: &mut Mogrt, dir: &Path) -> Result<()> {
        if dir.is_file() {
            bail!(
                "There is a file at {}, refusing to extract into it",
                dir.display()
            );
        }
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

        let written = template
            .extract_to(dir)
            .with_context(|| format!("Failed to extract into {}", dir.display()))?;
        info!("extracted {} files", written.len());

        let mut stdout = io::stdout().lock();
        for name in written {
            writeln!(stdout, "{}", name)?;
        }
        Ok(())
    }

    fn try_to_initialize_logging(&self) {
        if let Some(level) = self.verbosity_level {
            if let Err(e) = simplelog::TermLogger::init(
                level.to_level_filter(),
                simplelog::Config::default(),
                simplelog::TerminalMode::Stderr,
                simplelog::ColorChoice::Auto,
            ) {
                eprintln!("Failed to initialize logging: {:?}", e);
            }
        }
    }
}

fn command() -> Command {
    Command::new("mogrt_dump")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Utility to inspect Motion Graphics Template (.mogrt) files")
        .long_about(indoc!(
            r#"
            Utility to inspect Motion Graphics Template (.mogrt) files.

            Prints the template manifest (or its Essential Graphics fields) as JSON.
            Localized strings are flattened to a single string unless `--raw` is passed.
        "#
        ))
        .arg(Arg::new("INPUT").required(true))
        .arg(
            Arg::new("fields")
                .long("fields")
                .action(ArgAction::SetTrue)
                .help("Print the Essential Graphics fields instead of the manifest."),
        )
        .arg(
            Arg::new("raw")
                .long("raw")
                .action(ArgAction::SetTrue)
                .help("Keep localized strings as locale tables (`strDB`) instead of flattening them."),
        )
        .arg(
            Arg::new("no-indent")
                .long("no-indent")
                .action(ArgAction::SetTrue)
                .help("When set, output will not be indented."),
        )
        .arg(
            Arg::new("extract-to")
                .long("extract-to")
                .short('x')
                .value_name("DIR")
                .help("Extract the project file and the manifest into DIR and print the written file names. \
                       Will create DIR if needed."),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .action(ArgAction::Count)
                .help("-v - info, -vv - debug, -vvv - trace"),
        )
}

fn main() {
    let matches = command().get_matches();

    let result = MogrtDump::from_cli_matches(&matches).and_then(|app| app.run());
    if let Err(e) = result {
        eprintln!("{:?}", e);
        exit(1);
    }
}
