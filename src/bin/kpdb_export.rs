//! Exports the inner XML document of a kdbx database
//!
//! Primarily for investigating the kdbx format. It takes the password
//! on the CLI, which is insecure.

fn main() -> Result<(), kpdb::Error> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 4 {
        eprintln!("Usage: kpdb-export <path to kdbx file> <password> <target> [xml|gzip]");
        std::process::exit(2);
    }
    let format = args
        .get(4)
        .map(String::as_str)
        .unwrap_or("xml");
    let format = match kpdb::ExportFormat::from_name(format) {
        Some(format) => format,
        None => {
            eprintln!("Unknown export format '{}', expected xml or gzip", format);
            std::process::exit(2);
        }
    };
    let key = kpdb::CompositeKey::from_password(&args[2]);
    let kdbx = kpdb::open(&args[1])?.unlock(&key)?;
    kdbx.export(&args[3], format)?;
    Ok(())
}
