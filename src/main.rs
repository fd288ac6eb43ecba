use anyhow::Result;
use clap::Parser;
use quick_blogger::app::App;
use quick_blogger::models::{parse_keywords, BlogOutcome, BlogRequest, Config};
use std::fmt::Write as _;
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "quick-blogger")]
#[command(about = "Write more in less time: generate a blog post with illustrations")]
struct CliArgs {
    /// Blog title.
    #[arg(long)]
    title: String,

    /// Keywords, comma-separated.
    #[arg(long, default_value = "")]
    keywords: String,

    /// Approximate length of the blog, 200 to 1000 in steps of 100.
    #[arg(long, default_value_t = 200, value_parser = parse_word_count)]
    words: u32,

    /// Number of images to generate.
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..=6))]
    images: u32,

    /// Directory the images are saved to (overrides OUTPUT_DIR).
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Use mock services instead of the real APIs.
    #[arg(long)]
    dry_run: bool,

    /// Print the outcome as JSON instead of text.
    #[arg(long)]
    json: bool,
}

fn parse_word_count(input: &str) -> std::result::Result<u32, String> {
    let words: u32 = input
        .parse()
        .map_err(|_| format!("Invalid word count '{}'", input))?;
    if !(200..=1000).contains(&words) || words % 100 != 0 {
        return Err(format!(
            "Word count must be between 200 and 1000 in steps of 100, got {}",
            words
        ));
    }
    Ok(words)
}

fn render_outcome(outcome: &BlogOutcome) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Quick Blogger");
    let _ = writeln!(out);
    let _ = writeln!(out, "== Generated Blog Content ==");
    let _ = writeln!(out, "{}", outcome.blog.body_text);
    let _ = writeln!(out);
    let _ = writeln!(out, "Word Count: {}", outcome.blog.word_count);
    let _ = writeln!(out);
    let _ = writeln!(out, "== Generated Images ==");
    for image in &outcome.images {
        match (image.local_path(), image.error()) {
            (Some(path), _) => {
                let _ = writeln!(out, "{}: {}", image.caption(), path.display());
            }
            (None, Some(err)) => {
                let _ = writeln!(out, "Error generating image {}: {}", image.index, err);
            }
            (None, None) => {}
        }
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "Blog and images generation complete!");
    out
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quick_blogger=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = CliArgs::parse();

    let mut config = Config::from_env()?;
    if let Some(dir) = args.output_dir {
        config.output_dir = dir;
    }
    config.dry_run |= args.dry_run;

    let request = BlogRequest::new(
        args.title,
        parse_keywords(&args.keywords),
        args.words,
        args.images,
    )?;

    let app = match App::new(&config) {
        Ok(app) => app,
        Err(e) => {
            error!("Failed to initialize application: {}", e);
            std::process::exit(1);
        }
    };

    let outcome = match app.generate(&request).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("Failed to generate blog: {}", e);
            std::process::exit(1);
        }
    };

    match app.store().write_summary(&outcome) {
        Ok(path) => info!("Saved summary at: {}", path.display()),
        Err(e) => warn!("Could not write summary: {}", e),
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print!("{}", render_outcome(&outcome));
    }

    Ok(())
}
