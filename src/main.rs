use std::path::PathBuf;

use lensfx::{DemoOptions, HEADLESS_SIZE, PassError, load_hmd, render_headless};

const USAGE: &str = "\
usage: lensfx [--hmd <file.json>] [--headless <dir>]

  --hmd <file>       HMD description for the lens effect
  --headless <dir>   render every effect to PNG files in <dir> and exit
  -h, --help         show this help";

#[derive(Debug, Default, PartialEq)]
struct Args {
    hmd: Option<PathBuf>,
    headless: Option<PathBuf>,
    help: bool,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args, String> {
    let mut parsed = Args::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--hmd" => {
                let path = args.next().ok_or("--hmd needs a file")?;
                parsed.hmd = Some(PathBuf::from(path));
            }
            "--headless" => {
                let dir = args.next().ok_or("--headless needs a directory")?;
                parsed.headless = Some(PathBuf::from(dir));
            }
            "-h" | "--help" => parsed.help = true,
            other => return Err(format!("unexpected argument '{other}'")),
        }
    }
    Ok(parsed)
}

fn main() -> Result<(), PassError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{message}\n\n{USAGE}");
            std::process::exit(2);
        }
    };
    if args.help {
        println!("{USAGE}");
        return Ok(());
    }

    let hmd = args.hmd.as_deref().map(load_hmd).transpose()?;

    match args.headless {
        Some(dir) => {
            render_headless(&dir, hmd.as_ref(), HEADLESS_SIZE)?;
            Ok(())
        }
        None => {
            let mut options = DemoOptions::new();
            if let Some(hmd) = hmd {
                options = options.hmd(hmd);
            }
            lensfx::run(options)
        }
    }
}
