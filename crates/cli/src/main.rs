//! CLI for syncing and mutating a Google Slides presentation.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use slides_core::{
    DispatchOutcome, DocumentViews, Intent, IntentDispatcher, ShapeType, SyncController,
};
use slides_remote::{HttpSlidesClient, StaticTokenAuth, DEFAULT_API_BASE};
use std::time::Duration;

/// Fetch a presentation, print its derived views, and apply simple edits.
#[derive(Parser, Debug)]
#[command(name = "slides-sync")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Presentation to operate on
    #[arg(short, long, env = "SLIDES_PRESENTATION_ID")]
    presentation_id: String,

    /// OAuth access token with the presentations scope
    #[arg(short = 't', long, env = "SLIDES_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    /// API base URL
    #[arg(long, default_value = DEFAULT_API_BASE)]
    api_base: String,

    /// Request timeout in seconds (default: none)
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Print views as JSON
    #[arg(short, long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch and print slide texts and shapes
    Fetch,

    /// Add a shape with an id label
    AddShape {
        /// Target slide (default: first slide)
        #[arg(long)]
        slide: Option<String>,

        #[arg(long, default_value = "blue")]
        color: String,

        /// Shape kind, e.g. RECTANGLE, ELLIPSE
        #[arg(long, default_value = "RECTANGLE")]
        kind: String,

        /// Text to put inside the shape
        #[arg(long)]
        text: Option<String>,
    },

    /// Move a shape and its label by a relative offset (points)
    MoveShape {
        shape_id: String,

        #[arg(long, default_value = "100")]
        dx: f64,

        #[arg(long, default_value = "0")]
        dy: f64,
    },

    /// Hand a spoken transcript to the dispatcher
    Say {
        #[arg(required = true)]
        words: Vec<String>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    let auth = StaticTokenAuth::new(args.access_token.clone());
    let client = HttpSlidesClient::new(
        &args.api_base,
        auth.token().unwrap_or_default(),
        args.timeout_secs.map(Duration::from_secs),
    );
    let mut controller = SyncController::new(client, &args.presentation_id);
    let mut dispatcher = IntentDispatcher::new(auth);

    check(dispatcher.dispatch(&mut controller, Intent::SignIn))
        .context("Sign-in failed; pass --access-token or set SLIDES_ACCESS_TOKEN")?;

    let intent = match &args.command {
        Command::Fetch => None,
        Command::AddShape {
            slide,
            color,
            kind,
            text,
        } => {
            let kind = ShapeType::from_name(kind)
                .with_context(|| format!("Unknown shape kind: {}", kind))?;
            Some(Intent::AddShape {
                slide_id: slide.clone(),
                color: color.clone(),
                kind,
                text: text.clone(),
            })
        }
        Command::MoveShape { shape_id, dx, dy } => Some(Intent::MoveShape {
            shape_id: shape_id.clone(),
            dx: *dx,
            dy: *dy,
        }),
        Command::Say { words } => Some(Intent::Spoken(words.join(" "))),
    };

    if let Some(intent) = intent {
        match dispatcher.dispatch(&mut controller, intent) {
            DispatchOutcome::Unrecognized(text) => {
                eprintln!("No command recognized in: {}", text);
            }
            outcome => check(outcome)?,
        }
    }

    let views = controller
        .views()
        .context("No snapshot available after sync")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(views)?);
    } else {
        print!("{}", render_views(views));
    }

    Ok(())
}

/// Turn a failed outcome into an error.
fn check(outcome: DispatchOutcome) -> Result<()> {
    if let DispatchOutcome::Failed(e) = outcome {
        bail!(e);
    }
    Ok(())
}

/// Plain-text rendering of slide texts and shape overlay boxes.
fn render_views(views: &DocumentViews) -> String {
    let mut out = String::new();

    out.push_str("Slide Texts\n");
    for (idx, texts) in &views.slide_texts {
        out.push_str(&format!("  Slide {}\n", idx + 1));
        for text in texts {
            out.push_str(&format!("    - {}\n", text.trim_end()));
        }
    }

    out.push_str("Shapes\n");
    for (shape, rect) in views.shapes.iter().zip(views.overlay()) {
        out.push_str(&format!(
            "  {} [{}] on {} at ({}, {}) size {}x{}\n",
            shape.object_id,
            shape.shape_type,
            shape.page_object_id,
            rect.left,
            rect.top,
            rect.width,
            rect.height
        ));
    }

    out
}
