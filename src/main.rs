use clap::{Parser, Subcommand};

use adbreak::vast::fetch::{AutoFetcher, Fetcher};
use adbreak::vast::parser::parse_vast;
use adbreak::vast::pixel::NullPixelSink;
use adbreak::vast::resolver::Resolver;
use adbreak::vtt::layout::{BoxPosition, process_cues};
use adbreak::vtt::parser::WebVttParser;

/// VAST ad and WebVTT caption inspector
#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a VAST file or URL without following wrappers
    Parse {
        /// Path to the VAST file or URL
        #[arg(short, long)]
        input: String,

        /// Pretty print the output
        #[arg(short, long)]
        pretty: bool,
    },

    /// Resolve a VAST file or URL, following the wrapper chain
    Unwrap {
        /// Path to the VAST file or URL
        #[arg(short, long)]
        input: String,

        /// Pretty print the output
        #[arg(short, long)]
        pretty: bool,
    },

    /// Parse a WebVTT file and lay out its cues
    Captions {
        /// Path to the WebVTT file or URL
        #[arg(short, long)]
        input: String,

        /// Layout container width in pixels
        #[arg(long, default_value_t = 640.0)]
        width: f64,

        /// Layout container height in pixels
        #[arg(long, default_value_t = 360.0)]
        height: f64,

        /// Line height in pixels
        #[arg(long, default_value_t = 20.0)]
        line_height: f64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let fetcher = AutoFetcher::new()?;

    match &cli.command {
        Commands::Parse { input, pretty } => {
            let content = fetcher.fetch(input).await?;
            let outcome = parse_vast(&content)?;

            if outcome.malformed_ads > 0 {
                eprintln!("dropped {} malformed ad(s)", outcome.malformed_ads);
            }
            if *pretty {
                println!("{:#?}", outcome.response);
            } else {
                println!("{:?}", outcome.response);
            }
        }
        Commands::Unwrap { input, pretty } => {
            let pixels = NullPixelSink;
            let resolver = Resolver::new(&fetcher, &pixels);

            match resolver.resolve(input).await {
                Some(response) => {
                    if *pretty {
                        println!("{:#?}", response);
                    } else {
                        println!("{:?}", response);
                    }
                }
                None => println!("no ads resolved"),
            }
        }
        Commands::Captions {
            input,
            width,
            height,
            line_height,
        } => {
            let content = fetcher.fetch(input).await?;

            let mut parser = WebVttParser::new();
            parser.set_error_handler(|e| eprintln!("parse error: {}", e));
            parser.parse(&content);
            parser.flush();

            let mut cues = parser.take_cues();
            let container = BoxPosition::new(0.0, 0.0, *width, *height);
            let boxes = process_cues(&container, &mut cues, *line_height);

            for (cue, cue_box) in cues.iter().zip(&boxes) {
                println!(
                    "{:>10.3} --> {:<10.3} [{:>6.1},{:>6.1} {:>6.1}x{:<6.1}] {}",
                    cue.start_time,
                    cue.end_time,
                    cue_box.left,
                    cue_box.top,
                    cue_box.width,
                    cue_box.height,
                    cue.text().replace('\n', " / "),
                );
            }
        }
    }

    Ok(())
}
