use std::path::Path;

#[cfg(feature = "window")]
use anyhow::{anyhow, Result};
#[cfg(feature = "window")]
use raylib::prelude::*;

/// File type hint for the decoder, taken from the reference's extension.
/// Query strings and fragments of URLs are ignored; no extension means png.
pub fn image_extension(reference: &str) -> String {
    let path = reference.split(['?', '#']).next().unwrap_or(reference);
    Path::new(path)
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("png")
        .to_lowercase()
}

// --- Decode fetched bytes and upload them as a texture ---
#[cfg(feature = "window")]
pub fn load_texture_from_bytes(
    rl: &mut RaylibHandle,
    thread: &RaylibThread,
    reference: &str,
    bytes: &[u8],
) -> Result<Texture2D> {
    let extension = image_extension(reference);

    // Provide extension hint for loading from memory
    let image = Image::load_image_from_mem(&(".".to_string() + &extension), bytes)
        .map_err(|e| anyhow!("Failed to load image data for {}: {}", reference, e))?;

    let texture = rl
        .load_texture_from_image(thread, &image)
        .map_err(|e| anyhow!("Failed to create texture for {}: {}", reference, e))?;

    // Unload the Image data from CPU memory
    drop(image);

    Ok(texture)
}
