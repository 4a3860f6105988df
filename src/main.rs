use promptcraft::{
    codec, logger, GenAiConfig, GenAiError, ImageRef, ImageUpload, Pipeline, Session,
};
use std::env;
use std::fs;

const USAGE: &str = "usage: promptcraft <prompt> [reference-image ...]\n       promptcraft --analyze <image>";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dotenv_loaded = dotenv::dotenv().is_ok();

    logger::init_with_config(
        logger::LoggerConfig::development().with_level(logger::LogLevel::Info),
    )?;

    if dotenv_loaded {
        log::info!("✅ .env file loaded successfully");
    } else {
        log::warn!("⚠️  No .env file found, using system environment variables");
    }

    let config = GenAiConfig::from_env()?;
    logger::log_config_info(&config);

    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        eprintln!("{}", USAGE);
        return Ok(());
    }

    let pipeline = Pipeline::new(&config);
    let mut session = Session::new();
    if let Some(key) = &config.api_key {
        session.set_api_key(key.clone());
    }

    if args[0] == "--analyze" {
        let Some(path) = args.get(1) else {
            eprintln!("{}", USAGE);
            return Ok(());
        };
        let upload = ImageUpload::from_path(path)?;
        match pipeline.analyze_for_prompt(&mut session, &upload).await {
            Ok(description) => {
                log::info!("📝 Suggested prompt:");
                println!("{}", description);
            }
            Err(e) => report_failure(&e),
        }
        return Ok(());
    }

    session.set_prompt(args[0].clone());
    let uploads = args[1..]
        .iter()
        .map(ImageUpload::from_path)
        .collect::<Result<Vec<_>, _>>()?;
    if !uploads.is_empty() {
        let accepted = session.add_reference_images(&uploads)?;
        log::info!("🖼️  Using {} reference image(s)", accepted);
    }

    log::info!("🎨 Generating for prompt: {}", session.prompt());
    let report = match pipeline.generate(&mut session).await {
        Ok(report) => report,
        Err(e) => {
            report_failure(&e);
            return Ok(());
        }
    };

    log::info!("🧾 Final prompt: {}", report.final_prompt);
    if let Some(warning) = &report.warning {
        log::warn!("⚠️  {}", warning.user_message());
    }

    let images = session
        .current_result()
        .map(|result| result.images().to_vec())
        .unwrap_or_default();
    for (index, image) in images.iter().enumerate() {
        save_image(index + 1, image);
    }

    log::info!("🎉 Done: {} image(s)", report.image_count);
    Ok(())
}

fn save_image(number: usize, image: &ImageRef) {
    match image {
        ImageRef::Inline { data, .. } => {
            let filename = format!("generated-variation-{}.png", number);
            match codec::decode_base64(data) {
                Ok(bytes) => match fs::write(&filename, bytes) {
                    Ok(_) => log::info!("💾 Image saved to: {}", filename),
                    Err(e) => log::error!("❌ Failed to save image: {}", e),
                },
                Err(e) => log::error!("❌ Failed to decode image {}: {}", number, e),
            }
        }
        ImageRef::Url { url } => log::info!("🔗 Variation {}: {}", number, url),
    }
}

fn report_failure(error: &GenAiError) {
    log::error!("❌ {}", error.user_message());
    if error.is_billing_required() {
        log::warn!(
            "💡 This backend requires a billing-enabled account. Enable billing for the API key's \
             project, then try again."
        );
    }
}
