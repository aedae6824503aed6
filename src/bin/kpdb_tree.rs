//! Unlocks a kdbx database and renders its tree
//!
//! Primarily for investigating the kdbx format. It takes the password
//! on the CLI, which is insecure. Passwords are masked; pass --show to
//! print them.

fn main() -> Result<(), kpdb::Error> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: kpdb-tree <path to kdbx file> <password> [--show]");
        std::process::exit(2);
    }
    let show_password = args.iter().any(|arg| arg == "--show");
    let key = kpdb::CompositeKey::from_password(&args[2]);
    let kdbx = kpdb::open(&args[1])?.unlock(&key)?;
    print!("{}", kdbx.database().root().details(0, show_password));
    Ok(())
}
