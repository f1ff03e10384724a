//! fmcglyph - FMC font capture tool
//!
//! Lists, previews and edits glyphs in a captured display-protocol hex dump,
//! then writes the capture back out with only the edited bytes changed.

use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args as ClapArgs, Parser, Subcommand};

use fmcglyph::capture::{self, CaptureProfile};
use fmcglyph::clipboard::{self, ClipboardTarget};
use fmcglyph::{GlyphCollection, HeaderOptions, OutputFormat};

/// FMC font capture tool
#[derive(Parser, Debug)]
#[command(name = "fmcglyph")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input capture file (default: stdin)
    #[arg(short, long, global = true)]
    input: Option<PathBuf>,

    /// Capture profile: "standard" (default) or "extended"
    #[arg(short, long, global = true, default_value = "standard")]
    profile: String,

    /// Override the reset opcode (hex, e.g. "2A")
    #[arg(long, global = true)]
    reset_opcode: Option<String>,

    /// Override the extra cursor skip on the first data block of a run
    #[arg(long, global = true)]
    header_skip: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List glyphs: index, codepoint, character
    List,

    /// Print one glyph bitmap
    Show {
        /// Glyph index or codepoint ("12", "U+0041")
        glyph: String,
    },

    /// Apply pixel edits and write the capture
    Edit {
        /// Edits in format "glyph:x,y=0|1" (e.g. "U+0041:3,10=1")
        edits: Vec<String>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Write the capture without edits
    Export {
        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(ClapArgs, Debug)]
struct OutputArgs {
    /// Output format: "plain" (default), "header", "clipboard"
    #[arg(short, long, default_value = "plain")]
    format: String,

    /// Include guard for header output
    #[arg(long)]
    guard: Option<String>,

    /// Table name for header output
    #[arg(long)]
    table: Option<String>,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

/// A single pixel edit
#[derive(Debug, PartialEq)]
struct PixelEdit {
    glyph: String,
    x: usize,
    y: usize,
    value: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    let profile = build_profile(&args)?;
    let mut collection = load_collection(args.input.as_ref(), profile)?;

    match args.command {
        Command::List => cmd_list(&collection),
        Command::Show { glyph } => cmd_show(&collection, &glyph),
        Command::Edit { edits, output } => {
            apply_edits(&mut collection, &edits)?;
            write_output(&collection, &output)
        }
        Command::Export { output } => write_output(&collection, &output),
    }
}

/// Build the capture profile from the command line
fn build_profile(args: &Args) -> Result<CaptureProfile> {
    let Some(mut profile) = CaptureProfile::from_name(&args.profile) else {
        bail!("Profile must be 'standard' or 'extended': {}", args.profile);
    };

    if let Some(ref opcode) = args.reset_opcode {
        let opcode = opcode.trim_start_matches("0x").trim_start_matches("0X");
        profile.reset_opcode = u8::from_str_radix(opcode, 16)
            .map_err(|e| anyhow::anyhow!("Invalid reset opcode: {}", e))?;
    }
    if let Some(skip) = args.header_skip {
        profile.header_skip = skip;
    }
    Ok(profile)
}

/// Read the capture from file or stdin and parse it
fn load_collection(path: Option<&PathBuf>, profile: CaptureProfile) -> Result<GlyphCollection> {
    let lines = match path {
        Some(p) => capture::load(p)?,
        None => {
            let mut raw = Vec::new();
            io::stdin().read_to_end(&mut raw)?;
            capture::decode_text(&raw)
        }
    };

    let mut collection = GlyphCollection::with_profile(profile);
    if !collection.parse(&lines) {
        bail!("Capture contains no lines");
    }
    Ok(collection)
}

/// Resolve a glyph by index or "U+XXXX" codepoint
fn resolve_glyph(collection: &GlyphCollection, selector: &str) -> Result<usize> {
    let index = if let Some(hex) = selector.strip_prefix("U+").or_else(|| selector.strip_prefix("u+")) {
        let codepoint = u16::from_str_radix(hex, 16)
            .map_err(|e| anyhow::anyhow!("Invalid codepoint: {}", e))?;
        match collection.find_codepoint(codepoint) {
            Some(glyph) => glyph.index(),
            None => bail!("No glyph with codepoint U+{:04X}", codepoint),
        }
    } else {
        selector.parse().map_err(|e| anyhow::anyhow!("Invalid glyph index: {}", e))?
    };

    if index >= collection.len() {
        bail!("Glyph index {} out of range ({} glyphs)", index, collection.len());
    }
    Ok(index)
}

/// Parse edit "glyph:x,y=value"
fn parse_edit(s: &str) -> Result<PixelEdit> {
    let Some((target, value)) = s.split_once('=') else {
        bail!("Edit must be in format 'glyph:x,y=0|1': {}", s);
    };
    let Some((glyph, coords)) = target.rsplit_once(':') else {
        bail!("Edit must be in format 'glyph:x,y=0|1': {}", s);
    };
    let Some((x, y)) = coords.split_once(',') else {
        bail!("Pixel must be in format 'x,y': {}", coords);
    };

    let value = match value.trim() {
        "1" | "on" | "true" => true,
        "0" | "off" | "false" => false,
        other => bail!("Pixel value must be 0 or 1: {}", other),
    };

    Ok(PixelEdit {
        glyph: glyph.trim().to_string(),
        x: x.trim().parse().map_err(|e| anyhow::anyhow!("Invalid x: {}", e))?,
        y: y.trim().parse().map_err(|e| anyhow::anyhow!("Invalid y: {}", e))?,
        value,
    })
}

fn apply_edits(collection: &mut GlyphCollection, edits: &[String]) -> Result<()> {
    for s in edits {
        let edit = parse_edit(s)?;
        let index = resolve_glyph(collection, &edit.glyph)?;
        if !collection.set_pixel(index, edit.x, edit.y, edit.value) {
            log::warn!("Pixel {},{} is outside glyph {}, ignored", edit.x, edit.y, index);
        }
    }
    log::info!("{} glyphs modified", collection.modified_count());
    Ok(())
}

// === Commands ===

fn cmd_list(collection: &GlyphCollection) -> Result<()> {
    for glyph in collection.glyphs() {
        let character = glyph.character();
        let shown = if character.is_control() { ' ' } else { character };
        println!(
            "{:4}  U+{:04X}  {}  {} bytes",
            glyph.index(),
            glyph.codepoint(),
            shown,
            glyph.data().len()
        );
    }
    Ok(())
}

fn cmd_show(collection: &GlyphCollection, selector: &str) -> Result<()> {
    let index = resolve_glyph(collection, selector)?;
    if let Some(glyph) = collection.glyph(index) {
        println!("#{} U+{:04X} {:?}", glyph.index(), glyph.codepoint(), glyph.character());
        print!("{}", glyph);
    }
    Ok(())
}

fn write_output(collection: &GlyphCollection, args: &OutputArgs) -> Result<()> {
    let mut format = OutputFormat::from(args.format.as_str());
    if let OutputFormat::Header(ref mut options) = format {
        let defaults = HeaderOptions::default();
        *options = HeaderOptions {
            guard: args.guard.clone().unwrap_or(defaults.guard),
            table: args.table.clone().unwrap_or(defaults.table),
        };
    }
    if let OutputFormat::Unknown(ref name) = format {
        bail!("Format must be 'plain', 'header' or 'clipboard': {}", name);
    }

    let Some(text) = collection.serialize(&format) else {
        bail!("Capture contains no glyphs");
    };

    if format == OutputFormat::HeaderClipboard && args.output.is_none() {
        let target = clipboard::copy_to_all(&text)?;
        let rows = text.lines().count();
        match target {
            ClipboardTarget::System => eprintln!("Copied {} lines to clipboard", rows),
            ClipboardTarget::Terminal => eprintln!("Sent {} lines to terminal clipboard", rows),
        }
        return Ok(());
    }

    match args.output {
        Some(ref path) => std::fs::write(path, text + "\n")
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => println!("{}", text),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_edit() {
        assert_eq!(
            parse_edit("U+0041:3,10=1").unwrap(),
            PixelEdit { glyph: "U+0041".to_string(), x: 3, y: 10, value: true }
        );
        assert_eq!(
            parse_edit("7: 0 , 2 =off").unwrap(),
            PixelEdit { glyph: "7".to_string(), x: 0, y: 2, value: false }
        );
        assert!(parse_edit("7:0,2").is_err());
        assert!(parse_edit("7:0=1").is_err());
        assert!(parse_edit("7:0,2=5").is_err());
    }

    #[test]
    fn test_args() {
        use clap::CommandFactory;
        Args::command().debug_assert();

        let args = Args::parse_from(["fmcglyph", "export", "--profile", "extended", "-f", "header"]);
        assert_eq!(build_profile(&args).unwrap(), CaptureProfile::EXTENDED);

        let args = Args::parse_from(["fmcglyph", "list", "--reset-opcode", "0x05", "--header-skip", "3"]);
        let profile = build_profile(&args).unwrap();
        assert_eq!(profile.reset_opcode, 0x05);
        assert_eq!(profile.header_skip, 3);
    }
}
