#[derive(Clone, Copy, Default)]
pub struct LogSettings {
    pub ucode: bool,
    pub sim: bool,
}

pub fn setup_logging(settings: LogSettings) -> Result<(), fern::InitError> {
    if settings.ucode || settings.sim {
        fern::Dispatch::new()
            .filter(move |metadata| {
                if metadata.target() == "ucode" {
                    settings.ucode
                } else if metadata.target() == "sim" {
                    settings.sim
                } else {
                    true
                }
            })
            .format(|out, message, record| {
                out.finish(format_args!("[{}]: {}", record.target(), message))
            })
            .level(log::LevelFilter::Trace)
            .chain(std::io::stderr())
            .apply()?;
    }
    Ok(())
}
