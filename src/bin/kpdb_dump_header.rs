//! Prints the parsed header of a kdbx database
//!
//! Primarily for investigating archives that fail to open.

fn main() -> Result<(), kpdb::Error> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: kpdb-dump-header <path to kdbx file>");
        std::process::exit(2);
    }
    let kdbx = kpdb::open(&args[1])?;
    let header = kdbx.header();
    println!("Version: {}.{}", kdbx.major_version(), kdbx.minor_version());
    println!("Cipher: {}", header.cipher);
    println!("Compression: {:?}", header.compression_type);
    println!("Transform rounds: {}", header.transform_rounds);
    println!("Master seed: {:?}", header.master_seed);
    println!("Transform seed: {:?}", header.transform_seed);
    println!("Encryption IV: {:?}", header.encryption_iv);
    println!("Inner stream: {:?}", header.inner_stream_id);
    Ok(())
}
