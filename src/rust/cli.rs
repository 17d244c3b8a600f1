use std::path::PathBuf;

use clap::Parser;

use crate::config::AppConfig;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// JSON configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Model asset (path or URL) to use instead of the catalog
    #[arg(short, long)]
    pub model: Option<String>,

    /// Label list for --model
    #[arg(long, requires = "model")]
    pub labels: Option<String>,

    /// Minimum confidence shown, between 0 and 1
    #[arg(short, long)]
    pub threshold: Option<f32>,

    /// Maximum number of categories per result
    #[arg(long)]
    pub max_results: Option<usize>,

    /// Directory of frames replayed as the camera stream
    #[arg(long)]
    pub camera_dir: Option<PathBuf>,

    /// Force a fresh download of remote model assets
    #[arg(short, long)]
    pub fresh: bool,
}

impl Args {
    /// Applies the command line overrides on top of a loaded configuration
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(model) = &self.model {
            let name = crate::catalog::asset_file_name(model).to_string();
            let mut descriptor = crate::catalog::ModelDescriptor::new(name, model.clone());
            descriptor.labels = self.labels.clone();
            config.models = vec![descriptor];
        }
        if let Some(threshold) = self.threshold {
            config.score_threshold = threshold;
        }
        if let Some(max_results) = self.max_results {
            config.max_results = max_results;
        }
        if let Some(dir) = &self.camera_dir {
            config.camera_dir = Some(dir.clone());
        }
    }
}

/// A line typed into the terminal front-end
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Models,
    SelectModel(usize),
    /// `open <path>`; a bare `open` clears the selection
    Open(Option<PathBuf>),
    Paste(PathBuf),
    Click,
    CameraOn,
    CameraOff,
    Status,
    Quit,
}

pub const HELP: &str = "\
commands:
  models          list the model catalog
  model <n>       switch to catalog entry n
  open <path>     classify an image file (bare `open` clears the selection)
  paste <path>    paste an image file as clipboard content
  click           classify the displayed image again
  cam on|off      start or stop live camera classification
  status          show the current state
  quit            exit";

pub fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    match word.to_lowercase().as_str() {
        "help" | "?" => Ok(Command::Help),
        "models" => Ok(Command::Models),
        "model" => rest
            .parse::<usize>()
            .map(Command::SelectModel)
            .map_err(|_| format!("expected a model number, got '{}'", rest)),
        "open" if rest.is_empty() => Ok(Command::Open(None)),
        "open" => Ok(Command::Open(Some(PathBuf::from(rest)))),
        "paste" if rest.is_empty() => Err("paste needs a file path".to_string()),
        "paste" => Ok(Command::Paste(PathBuf::from(rest))),
        "click" => Ok(Command::Click),
        "cam" | "camera" => match rest {
            "on" => Ok(Command::CameraOn),
            "off" => Ok(Command::CameraOff),
            _ => Err("usage: cam on|off".to_string()),
        },
        "status" => Ok(Command::Status),
        "quit" | "exit" => Ok(Command::Quit),
        "" => Err("empty command".to_string()),
        other => Err(format!("unknown command '{}', type 'help'", other)),
    }
}
