//
// Reads an XCF file and writes out a PNG file for every layer, plus one for
// the flattened image. Files are written to the current directory.
//
// Usage: cargo run --example layer_splitter -- image.xcf
//
use std::{env, path::Path, process};

use image::{ImageFormat, RgbaImage};
use xcfile::Canvas;

fn main() {
    let path = match env::args().nth(1) {
        Some(path) => path,
        None => {
            eprintln!("please provide an XCF file as the first parameter");
            process::exit(1);
        }
    };

    let canvas = match Canvas::read_file(Path::new(&path)) {
        Ok(canvas) => canvas,
        Err(err) => {
            eprintln!("could not load {}: {}", path, err);
            process::exit(1);
        }
    };

    for layer in canvas.layers() {
        save_png(layer.image(), &format!("{}_layer.png", layer.name()));
    }
    save_png(&canvas.composed_image(), "composed_layer.png");
}

fn save_png(image: &RgbaImage, path: &str) {
    if let Err(err) = image.save_with_format(path, ImageFormat::Png) {
        eprintln!("could not write {}: {}", path, err);
        process::exit(1);
    }
}
