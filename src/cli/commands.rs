//! # CLI Commands Module / CLI 命令模块
//!
//! One module per subcommand. They share the loaded configuration and the
//! file-backed store through [`AppContext`].
//!
//! 每个子命令一个模块。它们通过 [`AppContext`] 共享已加载的配置和文件存储。

pub mod enqueue;
pub mod init;
pub mod notifications;
pub mod plan;
pub mod project;
pub mod worker;

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

use crate::core::config::CraneConfig;
use crate::infra::store::FileStore;

/// State shared by the subcommands.
pub struct AppContext {
    pub config: CraneConfig,
    pub locale: String,
}

impl AppContext {
    /// Loads the configuration and activates the locale. `--lang` wins over
    /// the `language` of the configuration file.
    ///
    /// 加载配置并激活语言。`--lang` 优先于配置文件中的 `language`。
    pub fn load(config_path: Option<&Path>, requested_locale: Option<&str>) -> Result<Self> {
        let config = CraneConfig::load(config_path)?;
        let locale = crate::resolve_locale(requested_locale.unwrap_or(&config.language));
        rust_i18n::set_locale(&locale);
        Ok(Self { config, locale })
    }

    pub fn open_store(&self) -> Result<Arc<FileStore>> {
        Ok(Arc::new(FileStore::open(self.config.storage.data_dir()?)?))
    }
}
