//! # pagegrid CLI
//!
//! Usage:
//!   pagegrid album.json -o arranged.json
//!   echo '{ ... }' | pagegrid -o arranged.json
//!   pagegrid --images a.jpg b.png c.webp -o arranged.json
//!   pagegrid --example > album.json

use std::env;
use std::fs;
use std::io::{self, Read};
use std::process;

use pagegrid::{source, AlbumInput, LayoutError};

fn main() {
    // Keep the handle alive for the whole run or logging stops.
    let _logger = flexi_logger::Logger::try_with_env_or_str("info")
        .and_then(|logger| logger.start())
        .map_err(|e| eprintln!("Logging disabled: {}", e))
        .ok();

    let args: Vec<String> = env::args().collect();

    if args.iter().any(|a| a == "--example") {
        print!("{}", example_album_json());
        return;
    }

    let output_path = args
        .windows(2)
        .find(|w| w[0] == "-o")
        .map(|w| w[1].clone())
        .unwrap_or_else(|| "arranged.json".to_string());

    match run(&args) {
        Ok(json) => match fs::write(&output_path, &json) {
            Ok(()) => log::info!("Written {} bytes to {}", json.len(), output_path),
            Err(e) => fail(&LayoutError::Io(e)),
        },
        Err(e) => fail(&e),
    }
}

fn run(args: &[String]) -> Result<String, LayoutError> {
    if let Some(pos) = args.iter().position(|a| a == "--images") {
        let paths: Vec<&String> = args[pos + 1..]
            .iter()
            .take_while(|a| !a.starts_with('-'))
            .collect();
        let images = source::probe_all(&paths)?;
        let session = pagegrid::arrange(AlbumInput {
            config: Default::default(),
            images,
        })?;
        return session.state().to_json();
    }

    let input = if args.len() > 1 && !args[1].starts_with('-') {
        fs::read_to_string(&args[1])?
    } else {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        buf
    };
    pagegrid::arrange_json(&input)
}

fn fail(e: &LayoutError) -> ! {
    log::error!("{}", e);
    eprintln!("✗ {}", e);
    process::exit(1);
}

fn example_album_json() -> &'static str {
    r##"{
  "config": {
    "pageWidth": 1000,
    "pageHeight": 700,
    "maxImagesPerRow": 3,
    "maxNumberOfRows": 2,
    "pageMarginPx": 20,
    "imageGapPx": 0
  },
  "images": [
    { "id": 1, "sourceRef": "beach.jpg", "naturalWidth": 4000, "naturalHeight": 3000 },
    { "id": 2, "sourceRef": "dunes.jpg", "naturalWidth": 3000, "naturalHeight": 4000 },
    { "id": 3, "sourceRef": "pier.jpg", "naturalWidth": 4000, "naturalHeight": 3000 },
    { "id": 4, "sourceRef": "sunset.jpg", "naturalWidth": 6000, "naturalHeight": 2000 },
    { "id": 5, "sourceRef": "gulls.jpg", "naturalWidth": 3000, "naturalHeight": 3000 },
    { "id": 6, "sourceRef": "boat.jpg", "naturalWidth": 4000, "naturalHeight": 3000 },
    { "id": 7, "sourceRef": "harbour.jpg", "naturalWidth": 3000, "naturalHeight": 4000 },
    { "id": 8, "sourceRef": "lighthouse.jpg", "naturalWidth": 2000, "naturalHeight": 4000 }
  ]
}
"##
}
