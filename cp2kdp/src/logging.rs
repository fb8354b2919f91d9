use std::path::Path;
use std::io::IsTerminal;
use std::sync::Mutex;

use once_cell::sync::Lazy;
use shared::{
    anyhow::anyhow,
    log::LevelFilter,
    Result,
};
use log4rs::{
    append::{
        console::{
            ConsoleAppender,
            Target,
        },
        file::FileAppender,
    },
    config::{
        Appender,
        Config,
        Root,
    },
    encode::pattern::PatternEncoder,
    init_config,
    Handle,
};


const ENCODE_STR: &str = "{d(%Y-%m-%d %H:%M:%S)} [{h({l:>5})}] {m}{n}";
const GLOBAL_LOG: &str = "./cp2kdp.log";


/// `None` if the logger could not be installed, e.g. another logger is already set.
pub static HANDLE: Lazy<Option<Mutex<Handle>>> = Lazy::new(|| {
    let config = gen_logger_config(Option::<&Path>::None).ok()?;
    let handle = init_config(config).ok()?;
    Some(Mutex::new(handle))
});


fn file_appender(path: impl AsRef<Path>) -> Result<FileAppender> {
    Ok(FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(ENCODE_STR)))
        .build(path)?)
}


fn gen_logger_config(path: Option<impl AsRef<Path>>) -> Result<Config> {
    let level = LevelFilter::Info;
    let isatty = std::io::stderr().is_terminal();

    let stderr = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(ENCODE_STR)))
        .target(Target::Stderr)
        .build();

    let global_log = if isatty {
        Some(file_appender(GLOBAL_LOG)?)
    } else {
        None
    };

    let logfile = match path {
        Some(p) => Some(file_appender(p.as_ref().join("run.log"))?),
        None => None,
    };

    let mut root = Root::builder().appender("stderr");
    let mut builder = Config::builder().appender(Appender::builder().build("stderr", Box::new(stderr)));

    if let Some(global_log) = global_log {
        root = root.appender("global_log");
        builder = builder.appender(Appender::builder().build("global_log", Box::new(global_log)));
    }
    if let Some(logfile) = logfile {
        root = root.appender("logfile");
        builder = builder.appender(Appender::builder().build("logfile", Box::new(logfile)));
    }

    Ok(builder.build(root.build(level))?)
}


pub fn logger_init() {
    Lazy::force(&HANDLE);
}


/// Adds `<path>/run.log` to the log targets.
pub fn logger_redirect(path: impl AsRef<Path>) -> Result<()> {
    let config = gen_logger_config(Some(path))?;
    let handle = HANDLE.as_ref().ok_or_else(|| anyhow!("Logger is not initialized."))?;
    handle.lock()
        .map_err(|_| anyhow!("Logger handle is poisoned."))?
        .set_config(config);
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logger_config_with_file() {
        let dir = tempfile::tempdir().unwrap();
        gen_logger_config(Some(dir.path())).unwrap();
        assert!(dir.path().join("run.log").is_file());
    }
}
