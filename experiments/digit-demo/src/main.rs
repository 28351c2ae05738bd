use {
    digit_camera::VideoIn,
    digit_demo::*,
    digit_image::Preprocessor,
    digit_infer::{Classifier, ClassifierConfig, ModelSource, create_registry},
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::from_env()?;
    init_logging(&settings)?;
    log::info!("digit demo: model {}", settings.model_path.display());

    let registry = create_registry();
    let backend = registry.for_model(&settings.model_path).ok_or_else(|| {
        DemoError::Usage(format!(
            "no backend for {} (available: {:?})",
            settings.model_path.display(),
            registry.list()
        ))
    })?;
    let session = backend.load_model(
        ModelSource::File(settings.model_path.clone()),
        settings.infer_device.clone(),
    )?;

    let mut pipeline = Pipeline::new(
        Preprocessor::default(),
        Classifier::new(session, ClassifierConfig::default()),
    );
    if let Some(dir) = &settings.dump_dir {
        log::info!("dumping network inputs to {}", dir.display());
        pipeline = pipeline.with_dump_dir(dir.clone());
    }

    let config = settings.camera_config();
    let mut video = VideoIn::open(config.clone(), DemoDrivers::new(settings.test_pattern)).await?;
    log::info!("capturing {:?} from {}", video.format(), config.device());

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    let mut ticker = tokio::time::interval(settings.interval);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {}
        }

        let captured = tokio::select! {
            _ = &mut shutdown => break,
            captured = video.capture() => captured,
        };

        let frame = match captured {
            Ok(frame) => frame,
            Err(err) if needs_restart(&err) => {
                log::warn!("capture lost ({}), reopening {}", err, config.device());
                drop(video);
                video = VideoIn::open(config.clone(), DemoDrivers::new(settings.test_pattern)).await?;
                continue;
            }
            Err(err) => return Err(err.into()),
        };

        match pipeline.process(&frame) {
            Ok(prediction) => log::info!("frame {}: {}", frame.sequence, describe(&prediction)),
            Err(err) => log::warn!("frame {} skipped: {}", frame.sequence, err),
        }
    }

    log::info!("shutting down");
    Ok(())
}
