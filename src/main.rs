use adsnap::{
    geometry, logger, EdgeRatios, ExpandParams, ImageSource, LifestyleTextParams, Operation,
    PackshotParams, PlacementParams, ProductOptions, Session, StudioClient, StudioConfig,
    StudioError,
};
use std::env;
use std::fs;
use tokio_util::sync::CancellationToken;

const USAGE: &str = "usage: adsnap <packshot|expand|lifestyle> <image-path> \
                     [background-color | edge-ratio | scene]";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_loaded = dotenv::dotenv().is_ok();
    logger::init_with_config(logger::LoggerConfig::development())?;
    if !env_loaded {
        log::warn!("⚠️  No .env file found, using system environment variables");
    }

    let args: Vec<String> = env::args().skip(1).collect();
    let (command, path) = match (args.first(), args.get(1)) {
        (Some(command), Some(path)) => (command.as_str(), path.as_str()),
        _ => {
            eprintln!("{}", USAGE);
            std::process::exit(2);
        }
    };
    let extra = args.get(2).map(String::as_str);

    let config = StudioConfig::from_env();
    logger::log_config_info(&config);

    let client = match StudioClient::new(config) {
        Ok(client) => client,
        Err(e) => {
            log::error!("❌ Failed to create client: {}", e);
            return Err(e.into());
        }
    };

    let mut session = Session::new();
    let image = fs::read(path)?;
    let operation = match command {
        "packshot" => Operation::Packshot(PackshotParams {
            image,
            background_color: extra.unwrap_or("#FFFFFF").to_string(),
            options: ProductOptions::default(),
        }),
        "expand" => {
            let ratio = extra.map(str::parse::<f64>).transpose()?.unwrap_or(0.25);
            Operation::Expand(ExpandParams {
                image_size: geometry::image_size(&image)?,
                image: ImageSource::Bytes(image),
                edges: EdgeRatios::uniform(ratio),
                sync: false,
            })
        }
        "lifestyle" => {
            session.set_prompt(extra.unwrap_or("a bright, minimal studio"));
            match client.enhance_prompt(&mut session).await {
                Ok(enhanced) => log::info!("✨ Scene: {}", enhanced),
                Err(e) => log::warn!("⚠️  Keeping the original scene: {}", e),
            }
            Operation::LifestyleByText(LifestyleTextParams {
                image,
                scene_description: String::new(),
                placement: PlacementParams {
                    placement_type: "automatic".into(),
                    ..Default::default()
                },
                num_results: 2,
                sync: false,
                fast: true,
                optimize_description: true,
                original_quality: false,
                exclude_elements: None,
                options: ProductOptions::default(),
            })
        }
        other => {
            eprintln!("unknown command '{}'\n{}", other, USAGE);
            std::process::exit(2);
        }
    };

    let request = client.assemble_for(&operation, &session)?;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let results = match client.submit(&request, &mut session, &cancel).await {
        Ok(results) => results,
        Err(e) if e.is_retryable() => {
            log::warn!("⏳ Results not ready yet, checking once more...");
            client.recheck(&mut session, &cancel).await?
        }
        Err(e) if e.is_content_moderation() => {
            log::error!("❌ Content moderation rejected the image");
            return Err(e.into());
        }
        Err(StudioError::Cancelled) => {
            log::info!("Cancelled");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    for (i, result) in results.iter().enumerate() {
        match result.as_url() {
            Some(url) => log::info!("🖼️  Result {}: {}", i + 1, url),
            None => log::info!("🖼️  Result {}: inline image", i + 1),
        }
    }

    if let Some(primary) = results.primary() {
        let bytes = client.download(primary).await?;
        fs::write("adsnap-result.png", &bytes)?;
        log::info!("💾 Saved {} bytes to adsnap-result.png", bytes.len());
    }

    Ok(())
}
