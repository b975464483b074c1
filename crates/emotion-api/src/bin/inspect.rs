//! Print the inputs and outputs of the emotion classifier model.

use std::path::PathBuf;
use std::process;

use clap::Parser;

use emotion_models::Emotion;
use emotion_vision::{ModelPaths, OnnxEmotionClassifier};

/// Inspect the emotion classifier artifact.
#[derive(Parser)]
#[command(name = "emotion-inspect")]
struct Cli {
    /// Classifier model file (overrides --model-dir).
    #[arg(long)]
    model: Option<PathBuf>,

    /// Directory holding the model artifacts (default: MODEL_DIR or <exe dir>/models).
    #[arg(long, env = "MODEL_DIR")]
    model_dir: Option<PathBuf>,
}

fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let model_path = match cli.model {
        Some(path) => path,
        None => match ModelPaths::resolve(cli.model_dir.as_deref()) {
            Ok(paths) => paths.classifier,
            Err(e) => {
                eprintln!("Error: {e}");
                process::exit(1);
            }
        },
    };

    let classifier = match OnnxEmotionClassifier::load(&model_path) {
        Ok(classifier) => classifier,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    print!("{}", classifier.describe());
    println!("Labels:");
    for emotion in Emotion::ALL {
        println!("  {}: {}", emotion.index(), emotion);
    }
}
