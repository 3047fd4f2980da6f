use bufdb::buffer::BufMgr;
use bufdb::config::Config;
use bufdb::error::Result;
use bufdb::storage::{open_page_file, PageFile, StorageType};

/// Demo driver: run a small record workload through the buffer pool and
/// log what the pool looks like afterwards.
fn main() -> Result<()> {
    let args = clap::command!()
        .arg(
            clap::Arg::new("config")
                .short('c')
                .long("config")
                .help("Configuration file path for the demo driver")
                .default_value("config/bufdb.yaml"),
        )
        .get_matches();
    let cfg = Config::new(args.get_one::<String>("config").unwrap().as_ref())?;
    let loglevel = cfg.log_level.parse::<simplelog::LevelFilter>()?;
    simplelog::SimpleLogger::init(loglevel, simplelog::Config::default())?;

    let path = match cfg.storage_type {
        StorageType::Disk => {
            std::fs::create_dir_all(&cfg.data_dir)?;
            format!("{}/demo.db", cfg.data_dir)
        }
        StorageType::Memory => "demo".to_string(),
    };
    let file = open_page_file(cfg.storage_type, &path)?;
    let mut mgr = BufMgr::new(cfg.pool_size);

    let mut records = Vec::new();
    for i in 0..8 {
        let (page_no, page) = mgr.alloc_page(&file)?;
        let rid = page.write()?.insert_record(format!("record #{}", i).as_bytes())?;
        mgr.unpin_page(&file, page_no, true)?;
        records.push(rid);
    }
    log::info!("allocated {} pages in {}", records.len(), file.filename());

    mgr.flush_file(&file)?;
    for rid in records {
        let page = mgr.read_page(&file, rid.page_no)?;
        let guard = page.read()?;
        log::info!("page {}: {}", rid.page_no, String::from_utf8_lossy(guard.get_record(rid)?));
        drop(guard);
        mgr.unpin_page(&file, rid.page_no, false)?;
    }
    mgr.print_self();
    Ok(())
}
