//! Balatrack CLI.
//!
//! Three entry points around the engine crates: inspect the sprite sheets the
//! atlas would load, recognize the cards in a capture, and render a card with
//! modifiers baked in.

mod assets;
mod config;
mod layout;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use sprites::{CardClass, ModifierCategory, ModifierSelection, compose};
use vision::{MatchMethod, OwnedImage, Recognizer, TemplateBank};

use crate::config::Config;

#[derive(Parser)]
#[command(name = "balatrack", version, about = "Card tracker toolbox")]
struct Cli {
    /// Path to the JSON config file.
    #[arg(long, default_value = "balatrack.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the sprite sheets the atlas would load.
    Sheets,
    /// Detect and identify the cards in a capture image.
    Recognize {
        /// Screenshot of the game window.
        capture: PathBuf,
        /// The image is already cropped to the hand area.
        #[arg(long)]
        cropped: bool,
        /// Print the top candidates for every slot, not just the winner.
        #[arg(long)]
        candidates: bool,
    },
    /// Render a card with modifiers and write it as a PNG.
    Compose {
        /// Card class index, 0..=51 (rank-major: 0 is the 2 of Hearts).
        card: u8,
        /// Composite the face onto the card back first.
        #[arg(long)]
        on_back: bool,
        /// Cell index of a configured enhancement.
        #[arg(long)]
        enhancement: Option<u32>,
        /// Cell index of a configured edition.
        #[arg(long)]
        edition: Option<u32>,
        /// Cell index of a configured seal.
        #[arg(long)]
        seal: Option<u32>,
        /// Cell index of a configured debuff.
        #[arg(long)]
        debuff: Option<u32>,
        /// Output path.
        #[arg(short, long, default_value = "card.png")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    // Structured logging. Use `RUST_LOG=info` etc.
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::load_or_default(&cli.config);

    match cli.command {
        Command::Sheets => sheets(&config),
        Command::Recognize {
            capture,
            cropped,
            candidates,
        } => recognize(&config, &capture, cropped, candidates),
        Command::Compose {
            card,
            on_back,
            enhancement,
            edition,
            seal,
            debuff,
            output,
        } => compose_card(
            &config,
            card,
            on_back,
            [
                (ModifierCategory::Enhancement, enhancement),
                (ModifierCategory::Edition, edition),
                (ModifierCategory::Seal, seal),
                (ModifierCategory::Debuff, debuff),
            ],
            &output,
        ),
    }
}

fn sheets(config: &Config) -> Result<()> {
    let atlas = assets::load_atlas(config)?;

    let mut names: Vec<&str> = atlas.sheet_names().collect();
    names.sort_unstable();
    if names.is_empty() {
        println!("no sheets found in {:?}", config.assets_dir);
        return Ok(());
    }

    for name in names {
        if let Some(sheet) = atlas.sheet(name) {
            let (cell_w, cell_h) = sheet.cell_size();
            println!(
                "{name}: {}x{} cells of {cell_w}x{cell_h} px",
                sheet.cols(),
                sheet.rows()
            );
        }
    }
    if atlas.card_back().is_some() {
        println!(
            "card back: {} index {}",
            config.backs_sheet, config.card_back_index
        );
    }
    Ok(())
}

fn recognize(config: &Config, path: &Path, cropped: bool, candidates: bool) -> Result<()> {
    let mut atlas = assets::load_atlas(config)?;
    // Templates come from complete cards (face on back) so the corners carry
    // the same backdrop the capture shows. Without a card back this degrades
    // to the bare faces.
    let deck = atlas
        .get_all_sprites(&config.deck_sheet, true)
        .with_context(|| format!("load deck sheet {:?}", config.deck_sheet))?;
    let bank = TemplateBank::build(&deck, &config.recognizer.matcher)?;
    let recognizer = Recognizer::new(bank, config.recognizer.clone());

    let mut capture = OwnedImage::open(path)?;
    if let Some(max) = config.max_capture_height {
        capture.clamp_height(max);
    }

    let (view, (ox, oy)) = if cropped {
        (capture.as_image(), (0, 0))
    } else {
        (layout::hand_area(&capture), layout::hand_offset(&capture))
    };

    let slots = recognizer.recognize_hand(view);
    if slots.is_empty() {
        println!("no cards detected");
        return Ok(());
    }

    for (i, slot) in slots.iter().enumerate() {
        let r = slot.region;
        let at = format!("{}x{} at ({}, {})", r.w, r.h, ox + r.x, oy + r.y);
        match &slot.result {
            Some(m) => println!(
                "slot {i}: {} (score {:.2}, {}), {at}",
                m.card,
                m.score,
                method_name(m.method)
            ),
            None => println!(
                "slot {i}: unrecognized (best score {:.2}), {at}",
                slot.best_score
            ),
        }

        if candidates {
            for m in recognizer.match_region(view, r).iter().take(5) {
                println!("    {} {:.3} ({})", m.card, m.score, method_name(m.method));
            }
        }
    }
    Ok(())
}

fn method_name(method: MatchMethod) -> &'static str {
    match method {
        MatchMethod::Feature => "features",
        MatchMethod::Correlation => "correlation",
    }
}

fn compose_card(
    config: &Config,
    card: u8,
    on_back: bool,
    picks: [(ModifierCategory, Option<u32>); 4],
    output: &Path,
) -> Result<()> {
    let Some(card) = CardClass::new(card) else {
        bail!("card index must be 0..=51");
    };

    let mut atlas = assets::load_atlas(config)?;
    let specs = config.modifiers.resolve(&mut atlas)?;

    let mut selection = ModifierSelection::new();
    for (category, pick) in picks {
        let Some(index) = pick else { continue };
        let spec = specs
            .iter()
            .find(|s| s.category == category && s.index == index)
            .with_context(|| format!("no configured {category:?} modifier with index {index}"))?;
        selection.toggle(spec.clone());
    }

    let face = atlas.get_sprite(&config.deck_sheet, card.index() as u32, false)?;
    let base = if on_back {
        atlas.get_sprite(&config.deck_sheet, card.index() as u32, true)?
    } else {
        face.clone()
    };

    let composed = compose(card, &base, Some(&*face), &selection);
    composed
        .image
        .save(output)
        .with_context(|| format!("write {output:?}"))?;
    println!(
        "{} with {} modifier(s) -> {:?}",
        composed.base_card,
        composed.applied.len(),
        output
    );
    Ok(())
}
