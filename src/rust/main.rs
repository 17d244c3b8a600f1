use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use lensclass::cli::{parse_command, Args, Command, HELP};
use lensclass::{
    mime_for_path, App, AppConfig, AppEvent, CameraDevice, ClipboardItem, FrameDirectoryCamera,
    ModelManager, NoCamera, OnnxEngine,
};
use log::{info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::{interval, Instant, MissedTickBehavior};

async fn read_clipboard_item(path: &Path) -> anyhow::Result<ClipboardItem> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {:?}", path))?;
    Ok(ClipboardItem {
        mime: mime_for_path(path).unwrap_or("application/octet-stream").to_string(),
        name: path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default(),
        bytes,
    })
}

fn print_models(app: &App) {
    for (i, model) in app.catalog().iter().enumerate() {
        println!("  {}: {} ({})", i, model.name, model.path);
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    lensclass::init_logger();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    args.apply(&mut config);
    config.validate()?;

    info!("=== Starting lensclass ===");

    let manager = ModelManager::new_default().context("failed to create model cache")?;
    if args.fresh {
        info!("Fresh download requested - removing cached remote assets...");
        for model in config.models.iter().filter(|m| m.is_remote()) {
            manager.remove_cached(&model.path)?;
        }
    }

    let engine = Arc::new(OnnxEngine::new(config.runtime.clone(), manager));
    let camera: Arc<dyn CameraDevice> = match &config.camera_dir {
        Some(dir) => Arc::new(FrameDirectoryCamera::new(dir, config.camera_fps)),
        None => Arc::new(NoCamera),
    };

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut app = App::new(&config, engine, camera, tx.clone());
    app.start();

    let (lines_tx, mut lines) = mpsc::unbounded_channel::<String>();
    tokio::spawn(async move {
        let mut stdin = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = stdin.next_line().await {
            if lines_tx.send(line).is_err() {
                break;
            }
        }
    });

    let started = Instant::now();
    let mut frames = interval(config.frame_interval());
    frames.set_missed_tick_behavior(MissedTickBehavior::Skip);

    println!("{}", HELP);
    let mut shown = app.ui().clone();
    println!("{}", shown.render());

    loop {
        tokio::select! {
            Some(event) = rx.recv() => app.dispatch(event).await,
            _ = frames.tick(), if app.wants_animation_frame() => {
                let now_ms = started.elapsed().as_millis() as u64;
                app.dispatch(AppEvent::AnimationFrame(now_ms)).await;
            }
            line = lines.recv() => {
                let Some(line) = line else { break };
                match parse_command(&line) {
                    Ok(Command::Quit) => break,
                    Ok(Command::Help) => println!("{}", HELP),
                    Ok(Command::Models) => print_models(&app),
                    Ok(Command::Status) => println!("{}", app.ui().render()),
                    Ok(Command::SelectModel(index)) => app.dispatch(AppEvent::SelectModel(index)).await,
                    Ok(Command::Open(path)) => app.dispatch(AppEvent::OpenFile(path)).await,
                    Ok(Command::Paste(path)) => match read_clipboard_item(&path).await {
                        Ok(item) => app.dispatch(AppEvent::Paste(vec![item])).await,
                        Err(e) => warn!("{:#}", e),
                    },
                    Ok(Command::Click) => app.dispatch(AppEvent::ClickImage).await,
                    Ok(Command::CameraOn) => app.dispatch(AppEvent::EnableCamera).await,
                    Ok(Command::CameraOff) => app.dispatch(AppEvent::DisableCamera).await,
                    Err(e) => eprintln!("{}", e),
                }
            }
        }

        if let Some(notice) = app.ui_mut().take_notice() {
            println!("!! {}", notice);
        }
        if app.ui() != &shown {
            shown = app.ui().clone();
            println!("{}", shown.render());
        }
    }

    app.shutdown();
    info!("=== lensclass stopped ===");
    Ok(())
}
