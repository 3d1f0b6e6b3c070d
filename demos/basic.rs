//! Walk one file through every representation.
//!
//! Run with: cargo run --example basic

use std::io::Write;

use handles::{HandleKind, HandleUnion};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    println!("handles {}", handles::version_string());

    let path = std::env::temp_dir().join("t.txt");
    let mut handle = HandleUnion::new();

    println!("\n--- Opening {} as a stream ---", path.display());
    handle.open_stream(&path, "w")?;
    handle.write_all(b"Hello from a FILE*\n")?;
    println!("kind: {}", handle.kind());

    println!("\n--- Converting ---");
    handle.stream_to_descriptor()?;
    println!("kind: {}", handle.kind());
    handle.descriptor_to_native()?;
    println!("kind: {}", handle.kind());

    // Closing as the wrong representation changes nothing.
    if let Err(err) = handle.close_stream() {
        println!("close_stream refused: {}", err);
    }

    println!("\n--- Closing ---");
    handle.close_native()?;
    assert_eq!(handle.kind(), HandleKind::Invalid);
    println!("kind: {}", handle.kind());

    let contents = std::fs::read_to_string(&path)?;
    print!("contents: {}", contents);
    std::fs::remove_file(&path)?;

    Ok(())
}
