use serde::Deserialize;

use crate::error::Result;
use crate::storage::StorageType;

#[derive(Debug, PartialEq, Deserialize)]
pub struct Config {
    pub log_level: String,
    pub storage_type: StorageType,
    /// Number of frames in the buffer pool.
    pub pool_size: u32,
    /// Directory holding the data files of the disk storage type.
    pub data_dir: String,
}

impl Config {
    pub fn new(file: &str) -> Result<Config> {
        let mut cfg = config::Config::builder()
            .set_default("log_level", "debug")?
            .set_default("storage_type", "disk")?
            .set_default("pool_size", 64_i64)?
            .set_default("data_dir", "data")?;
        if !file.is_empty() {
            cfg = cfg.add_source(config::File::with_name(file))
        }
        cfg = cfg.add_source(config::Environment::with_prefix("BUFDB"));
        Ok(cfg.build()?.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() -> Result<()> {
        let cfg = Config::new("")?;
        assert_eq!("debug", cfg.log_level);
        assert_eq!(StorageType::Disk, cfg.storage_type);
        assert_eq!(64, cfg.pool_size);
        assert_eq!("data", cfg.data_dir);
        Ok(())
    }
}
