// Assets module - sprite images split into RGB pixmap + alpha mask,
// cached by name for the process lifetime
use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{Context, Result};

use crate::types::Rgb;

#[derive(Clone, Debug)]
pub struct Sprite {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<Rgb>,
    pub mask: Vec<u8>,
}

/// Sprites are either decoded from image files under `root` or produced on
/// demand by a generate closure (for built-in procedural sprites). Either
/// way the first lookup populates the cache and later lookups are free.
pub struct AssetManager {
    root: Option<PathBuf>,
    assets: HashMap<String, Rc<Sprite>>,
}

impl AssetManager {
    pub fn new(root: Option<PathBuf>) -> Self {
        AssetManager {
            root,
            assets: HashMap::new(),
        }
    }

    pub fn has_root(&self) -> bool {
        self.root.is_some()
    }

    /// Load a sprite from disk. A missing or undecodable file is fatal; the
    /// caller is expected to resolve all assets before the frame loop starts.
    pub fn get(&mut self, name: &str) -> Result<Rc<Sprite>> {
        if let Some(sprite) = self.assets.get(name) {
            return Ok(sprite.clone());
        }
        let path = match &self.root {
            Some(root) => root.join(name),
            None => PathBuf::from(name),
        };
        let img = image::open(&path)
            .with_context(|| format!("loading asset {}", path.display()))?
            .to_rgba8();
        let (width, height) = (img.width() as usize, img.height() as usize);
        let mut pixels = Vec::with_capacity(width * height);
        let mut mask = Vec::with_capacity(width * height);
        for p in img.pixels() {
            pixels.push(Rgb::new(p[0], p[1], p[2]));
            mask.push(p[3]);
        }
        let sprite = Rc::new(Sprite {
            width,
            height,
            pixels,
            mask,
        });
        self.assets.insert(name.to_string(), sprite.clone());
        Ok(sprite)
    }

    /// Fetch a sprite, generating it on first use if it is not cached.
    pub fn get_or_generate<F>(&mut self, name: &str, generate: F) -> Rc<Sprite>
    where
        F: FnOnce() -> Sprite,
    {
        if let Some(sprite) = self.assets.get(name) {
            return sprite.clone();
        }
        let sprite = Rc::new(generate());
        self.assets.insert(name.to_string(), sprite.clone());
        sprite
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_cached() {
        let mut assets = AssetManager::new(None);
        let mut calls = 0;
        let make = |calls: &mut usize| {
            *calls += 1;
            Sprite {
                width: 1,
                height: 1,
                pixels: vec![Rgb::new(1, 2, 3)],
                mask: vec![255],
            }
        };
        let a = assets.get_or_generate("gen", || make(&mut calls));
        assert_eq!(calls, 1);
        let b = assets.get_or_generate("gen", || make(&mut calls));
        assert_eq!(calls, 1);
        assert_eq!(a.pixels[0], b.pixels[0]);
    }

    #[test]
    fn test_missing_file_is_error() {
        let mut assets = AssetManager::new(Some(PathBuf::from("/nonexistent")));
        assert!(assets.get("no-such-sprite.png").is_err());
    }
}
