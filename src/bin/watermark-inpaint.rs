use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use watermark_inpaint::image_io::with_default_extension;
use watermark_inpaint::{
    is_supported_image, Error, OpenOutcome, Phase, PreviewPoint, Session, SessionOptions,
};

const COMMANDS: &str = "\
Commands (coordinates are preview pixels):
  open <path>               load an image
  press <x> <y>             start a rectangle
  drag <x> <y>              move the rectangle corner
  release <x> <y>           finish the rectangle
  rect <x0> <y0> <x1> <y1>  press, drag and release in one go
  reconstruct               inpaint the marked area
  save [path]               write the result (default: <name>_cleaned.jpg)
  preview <path>            write what the display shows
  info                      show image and preview sizes
  help                      show this list
  quit                      exit";

#[derive(Parser)]
#[command(
    name = "watermark-inpaint",
    about = "Mark a watermark on a scaled preview and inpaint it at full resolution",
    version,
    after_help = COMMANDS
)]
struct Cli {
    /// Image to open on startup
    input: Option<PathBuf>,

    /// TOML file with session options
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Inpainting neighborhood radius in pixels
    #[arg(short, long)]
    radius: Option<u32>,

    /// Largest preview width or height
    #[arg(long)]
    max_preview: Option<u32>,

    /// JPEG quality (1-100)
    #[arg(long)]
    quality: Option<u8>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Open(PathBuf),
    Press(PreviewPoint),
    Drag(PreviewPoint),
    Release(PreviewPoint),
    Rect(PreviewPoint, PreviewPoint),
    Reconstruct,
    Save(Option<PathBuf>),
    Preview(PathBuf),
    Info,
    Help,
    Quit,
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else if cli.quiet {
        EnvFilter::new("error")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let options = match build_options(&cli) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    let mut session = Session::new(options);

    if let Some(input) = &cli.input {
        match session.open(input) {
            Ok(outcome) => print_opened(&outcome, cli.quiet),
            Err(e) => eprintln!("Error: {e}"),
        }
    }

    let interactive = io::stdin().is_terminal();
    if interactive && !cli.quiet {
        eprintln!("Type `help` for a list of commands.");
    }

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        if interactive {
            eprint!("> ");
            io::stderr().flush().ok();
        }
        let Some(line) = lines.next() else {
            break;
        };
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                eprintln!("Error: failed to read input: {e}");
                process::exit(1);
            }
        };

        let command = match parse_command(&line) {
            Ok(Some(c)) => c,
            Ok(None) => continue,
            Err(msg) => {
                eprintln!("Error: {msg}");
                continue;
            }
        };

        match execute(&mut session, command, cli.quiet) {
            Ok(Flow::Continue) => {}
            Ok(Flow::Quit) => break,
            Err(Error::NoImageLoaded) => {
                debug!("ignored: no image loaded");
                if !cli.quiet {
                    eprintln!("[SKIP] open an image first");
                }
            }
            Err(Error::NothingToSave) => eprintln!("[SKIP] nothing to save: reconstruct first"),
            Err(e) if e.is_fatal() => {
                eprintln!("Fatal: {e}");
                process::exit(2);
            }
            Err(e) => eprintln!("[FAIL] {e}"),
        }
    }
}

fn build_options(cli: &Cli) -> watermark_inpaint::Result<SessionOptions> {
    let mut options = match &cli.config {
        Some(path) => SessionOptions::load(path)?,
        None => SessionOptions::default(),
    };
    if let Some(r) = cli.radius {
        options.inpaint_radius = r;
    }
    if let Some(m) = cli.max_preview {
        options.max_preview_dim = m;
    }
    if let Some(q) = cli.quality {
        options.jpeg_quality = q;
    }
    options.validate()?;
    Ok(options)
}

fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();

    let command = match word.to_lowercase().as_str() {
        "open" => Command::Open(required_path(rest, "open")?),
        "press" | "down" => Command::Press(parse_point(rest)?),
        "drag" | "move" => Command::Drag(parse_point(rest)?),
        "release" | "up" => Command::Release(parse_point(rest)?),
        "rect" => {
            let v = parse_ints::<4>(rest)?;
            Command::Rect(PreviewPoint::new(v[0], v[1]), PreviewPoint::new(v[2], v[3]))
        }
        "reconstruct" | "remove" => Command::Reconstruct,
        "save" => Command::Save((!rest.is_empty()).then(|| PathBuf::from(rest))),
        "preview" => Command::Preview(required_path(rest, "preview")?),
        "info" => Command::Info,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(format!("unknown command `{other}` (try `help`)")),
    };
    Ok(Some(command))
}

fn required_path(rest: &str, command: &str) -> Result<PathBuf, String> {
    if rest.is_empty() {
        Err(format!("`{command}` needs a path"))
    } else {
        Ok(PathBuf::from(rest))
    }
}

fn parse_point(rest: &str) -> Result<PreviewPoint, String> {
    let [x, y] = parse_ints::<2>(rest)?;
    Ok(PreviewPoint::new(x, y))
}

fn parse_ints<const N: usize>(rest: &str) -> Result<[i32; N], String> {
    let parts: Vec<&str> = rest.split_whitespace().collect();
    if parts.len() != N {
        return Err(format!("expected {N} integers, got {}", parts.len()));
    }
    let mut out = [0; N];
    for (slot, part) in out.iter_mut().zip(parts) {
        *slot = part
            .parse()
            .map_err(|_| format!("`{part}` is not an integer"))?;
    }
    Ok(out)
}

fn execute(session: &mut Session, command: Command, quiet: bool) -> watermark_inpaint::Result<Flow> {
    match command {
        Command::Open(path) => {
            let outcome = session.open(&path)?;
            print_opened(&outcome, quiet);
        }
        Command::Press(p) => session.begin_stroke(p)?,
        Command::Drag(p) => {
            session.extend_stroke(p)?;
        }
        Command::Release(p) => {
            let marked = session.end_stroke(p)?;
            if !quiet {
                match marked {
                    Some(r) => eprintln!(
                        "[OK] marked ({}, {})-({}, {}) in the original",
                        r.x0, r.y0, r.x1, r.y1
                    ),
                    None => eprintln!("[SKIP] empty rectangle"),
                }
            }
        }
        Command::Rect(a, b) => {
            session.begin_stroke(a)?;
            session.extend_stroke(b)?;
            return execute(session, Command::Release(b), quiet);
        }
        Command::Reconstruct => {
            if session.phase() == Phase::Reconstructed {
                eprintln!("[SKIP] no new marks since the last reconstruction");
                return Ok(Flow::Continue);
            }
            let marked = session.mask().map_or(0, watermark_inpaint::Mask::marked_count);
            let out = session.reconstruct()?;
            if !quiet {
                eprintln!(
                    "[OK] reconstructed {marked} pixels ({}x{})",
                    out.width(),
                    out.height()
                );
            }
        }
        Command::Save(path) => {
            if session.phase() != Phase::Reconstructed {
                return Err(Error::NothingToSave);
            }
            let target = match path.or_else(|| session.default_save_path()) {
                Some(p) => with_default_extension(&p),
                None => {
                    eprintln!("[FAIL] `save` needs a path for images not opened from a file");
                    return Ok(Flow::Continue);
                }
            };
            if !is_supported_image(&target) {
                return Err(Error::UnsupportedFormat(format!(
                    "{} (use .jpg, .png, .webp or .bmp)",
                    target.display()
                )));
            }
            let written = session.save(&target)?;
            if !quiet {
                eprintln!("[OK] saved {}", written.display());
            }
        }
        Command::Preview(path) => write_preview(session, &path, quiet)?,
        Command::Info => match session.readout() {
            Some(r) => println!("{r}"),
            None => println!("no image loaded"),
        },
        Command::Help => println!("{COMMANDS}"),
        Command::Quit => return Ok(Flow::Quit),
    }
    Ok(Flow::Continue)
}

/// After a reconstruction the display shows the result; otherwise the source
/// preview with the rectangle being dragged.
fn write_preview(session: &Session, path: &Path, quiet: bool) -> watermark_inpaint::Result<()> {
    let shown = if session.phase() == Phase::Reconstructed {
        session.output_preview()
    } else {
        session.render_preview()
    };
    let shown = shown.ok_or(Error::NoImageLoaded)?;
    let path = with_default_extension(path);
    watermark_inpaint::save_image(&shown, &path, session.options().jpeg_quality)?;
    if !quiet {
        eprintln!("[OK] preview written to {}", path.display());
    }
    Ok(())
}

fn print_opened(outcome: &OpenOutcome, quiet: bool) {
    if outcome.discarded_marks {
        eprintln!("WARNING: unreconstructed marks were discarded");
    }
    if outcome.discarded_output {
        eprintln!("WARNING: the previous result was never saved and has been discarded");
    }
    if !quiet {
        println!("{}", outcome.readout);
    }
}
