use std::fs;
use std::io;
use std::time::SystemTime;

use commit_log::{Config, Error, Index, Store};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Read every record of the pair, from the first offset until the end of the index
fn loop_store(store: &Store, index: &Index) -> Result<u64, Error> {
    let mut offset = 0;
    loop {
        match index.read(offset) {
            Ok((_, position)) => {
                store.read_at(position)?;
                offset += 1;
            }
            Err(ref e) if e.is_end_of_data() => return Ok(offset as u64),
            Err(e) => return Err(e),
        }
    }
}

fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut target_path = dirs::home_dir()
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no home directory"))?;
    target_path.push("loglady/");
    if target_path.exists() {
        fs::remove_dir_all(&target_path)?;
    }
    fs::create_dir_all(&target_path)?;

    info!(path = %target_path.display(), "👵 loglady benchmark starting");

    let total_messages: u64 = 1_000_000; // 1M messages
    let total_size_gb = (total_messages * 1000) / 1_000_000_000; // (messages vs 1000 bytes) / 1 GB
    let config = Config::new()
        .max_store_bytes(2_000_000_000) // 2GB
        .max_index_bytes(total_messages * 12);

    let store = Store::open(target_path.join("00000000000000000000.store"))?;
    let mut index = Index::open(target_path.join("00000000000000000000.index"), &config)?;

    // ########### Write Performance Benchmark  ###########
    let start = SystemTime::now();
    for i in 0..total_messages {
        let (_, position) = store.append(format!("{:01000}", i).as_bytes())?; // 1KB record
        index.write(i as u32, position)?;
    }
    store.flush()?;

    let write_time = SystemTime::now();
    info!(
        "{} GB worth records written in {:?}",
        total_size_gb,
        write_time.duration_since(start).unwrap_or_default()
    );

    // ########### Cold Read Performance Benchmark  ###########
    let read = loop_store(&store, &index)?;

    info!(
        "{} GB worth cold records ({}) read in {:?}",
        total_size_gb,
        read,
        SystemTime::now()
            .duration_since(write_time)
            .unwrap_or_default()
    );

    // ########### Warm Read Performance Benchmark  ###########
    let warm = SystemTime::now();

    loop_store(&store, &index)?;
    info!(
        "{} GB worth warm records read in {:?}",
        total_size_gb,
        SystemTime::now().duration_since(warm).unwrap_or_default()
    );

    index.close()?;
    store.close()?;
    Ok(())
}
