use std::fmt;
use once_cell::sync::Lazy;
use once_cell::sync::OnceCell;

pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}


fn built_time() -> &'static str {
    static INSTANCE: OnceCell<String> = OnceCell::new();
    INSTANCE.get_or_init(|| {
        built::util::strptime(built_info::BUILT_TIME_UTC)
            .with_timezone(&built::chrono::offset::Local)
            .to_string()
    })
    .as_str()
}


static LOGO_STR: Lazy<&str> = Lazy::new(|| {
    &r"
+--------------------------------------------------------------+
|                                                              |
|     ____  ____   ____   _  __  ____   ____                   |
|    / ___||  _ \ |___ \ | |/ / |  _ \ |  _ \                  |
|   | |    | |_) |  __) || ' /  | | | || |_) |                 |
|   | |___ |  __/  / __/ | . \  | |_| ||  __/                  |
|    \____||_|    |_____||_|\_\ |____/ |_|                     |
|                                                              |
|          CP2K AIMD trajectories => DeePMD-kit data           |
+--------------------------------------------------------------+
    ".trim()
});


/// Build information shown in `--help` and at startup.
#[derive(Clone, Copy, Debug)]
pub struct Version {
    logo:       &'static str,
    built_time: &'static str,
}


impl Version {
    pub fn new() -> Self {
        Self {
            logo:       *LOGO_STR,
            built_time: built_time(),
        }
    }

    pub fn git_hash(&self) -> &'static str {
        built_info::GIT_COMMIT_HASH_SHORT.unwrap_or("NO GIT INFO")
    }
}


impl Default for Version {
    fn default() -> Self { Self::new() }
}


impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use built_info::*;

        writeln!(f, "{}", self.logo)?;
        writeln!(f)?;
        writeln!(f, "Welcome to use {}!", PKG_NAME)?;
        writeln!(f, "    current version:    {}", PKG_VERSION)?;
        writeln!(f, "    git hash:           {}", self.git_hash())?;
        writeln!(f, "    author(s):          {}", PKG_AUTHORS)?;
        writeln!(f, "    built time:         {}", self.built_time)?;

        if f.alternate() {
            let dirty = match GIT_DIRTY {
                Some(true)  => " (dirty)",
                _           => "",
            };
            writeln!(f, "        git_hash_long:  {}{}", GIT_COMMIT_HASH.unwrap_or("NO GIT INFO"), dirty)?;
            writeln!(f, "        host:           {}", HOST)?;
            writeln!(f, "        opt level:      {}", OPT_LEVEL)?;
            writeln!(f, "        build profile:  {}", PROFILE)?;
            writeln!(f, "        rustc version:  {}", RUSTC_VERSION)?;
            writeln!(f, "        build target:   {}", TARGET)?;
        }
        Ok(())
    }
}
