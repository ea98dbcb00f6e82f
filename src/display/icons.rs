/*
 *  display/icons.rs
 *
 *  WxMonS - weather at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  Weather and umbrella icons: SVG assets with built-in fallback glyphs
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Arc, Circle, Line, Polyline, PrimitiveStyle};
use log::{debug, warn};
use resvg::usvg::{Options, Transform, Tree};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tiny_skia::Pixmap;

use crate::display::bitmap::Bitmap;

pub const UMBRELLA_SIZE: u32 = 16;

const THRESHOLD: u8 = 128;

#[derive(Debug, Error)]
pub enum IconError {
    #[error("icon asset {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("SVG parse error: {0}")]
    Parse(String),

    #[error("cannot allocate {0}x{1} pixmap")]
    Pixmap(u32, u32),
}

/// Rasterise SVG text into a `size` square, aspect preserved and centred.
/// Light opaque pixels are lit; artwork with no light pixels falls back to
/// its alpha coverage so dark-on-transparent icons still show.
pub fn render_svg(svg: &str, size: u32) -> Result<Bitmap, IconError> {
    let tree = Tree::from_str(svg, &Options::default()).map_err(|e| IconError::Parse(e.to_string()))?;
    let mut pixmap = Pixmap::new(size, size).ok_or(IconError::Pixmap(size, size))?;

    let svg_size = tree.size();
    let scale = (size as f32 / svg_size.width()).min(size as f32 / svg_size.height());
    let dx = (size as f32 - svg_size.width() * scale) / 2.0;
    let dy = (size as f32 - svg_size.height() * scale) / 2.0;
    resvg::render(&tree, Transform::from_row(scale, 0.0, 0.0, scale, dx, dy), &mut pixmap.as_mut());

    let mut bmp = Bitmap::new(size, size);
    let mut any_light = false;
    for (i, p) in pixmap.pixels().iter().enumerate() {
        let luminance = 0.299 * p.red() as f32 + 0.587 * p.green() as f32 + 0.114 * p.blue() as f32;
        if luminance > THRESHOLD as f32 && p.alpha() > THRESHOLD {
            bmp.set((i as u32 % size) as i32, (i as u32 / size) as i32, true);
            any_light = true;
        }
    }
    if !any_light {
        for (i, p) in pixmap.pixels().iter().enumerate() {
            if p.alpha() > THRESHOLD {
                bmp.set((i as u32 % size) as i32, (i as u32 / size) as i32, true);
            }
        }
    }
    Ok(bmp)
}

pub fn load_svg(path: &Path, size: u32) -> Result<Bitmap, IconError> {
    let text = std::fs::read_to_string(path).map_err(|source| IconError::Io { path: path.to_path_buf(), source })?;
    render_svg(&text, size)
}

/// Icon families keyed by the two digit OpenWeatherMap code prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IconFamily {
    Clear,
    Clouds,
    Rain,
    Storm,
    Snow,
    Mist,
}

impl IconFamily {
    pub fn from_code(code: &str) -> Self {
        match code.get(..2).unwrap_or("") {
            "01" => IconFamily::Clear,
            "09" | "10" => IconFamily::Rain,
            "11" => IconFamily::Storm,
            "13" => IconFamily::Snow,
            "50" => IconFamily::Mist,
            _ => IconFamily::Clouds,
        }
    }
}

fn at(s: u32, fx: f32, fy: f32) -> Point {
    Point::new((s as f32 * fx) as i32, (s as f32 * fy) as i32)
}

fn len(s: u32, f: f32) -> u32 {
    ((s as f32 * f) as u32).max(1)
}

fn cloud(b: &mut Bitmap, s: u32, style: PrimitiveStyle<BinaryColor>) {
    Circle::with_center(at(s, 0.35, 0.45), len(s, 0.36)).into_styled(style).draw(&mut *b).ok();
    Circle::with_center(at(s, 0.60, 0.38), len(s, 0.46)).into_styled(style).draw(&mut *b).ok();
    Line::new(at(s, 0.15, 0.62), at(s, 0.85, 0.62)).into_styled(style).draw(&mut *b).ok();
}

/// Primitive drawing used when no SVG asset is available.
pub fn fallback_glyph(family: IconFamily, size: u32) -> Bitmap {
    let mut b = Bitmap::new(size, size);
    let style = PrimitiveStyle::with_stroke(BinaryColor::On, (size / 16).max(1));
    let s = size;
    match family {
        IconFamily::Clear => {
            Circle::with_center(at(s, 0.5, 0.5), len(s, 0.44)).into_styled(style).draw(&mut b).ok();
            for (dx, dy) in [(0.0, -1.0), (0.0, 1.0), (-1.0, 0.0), (1.0, 0.0), (0.7, 0.7), (-0.7, 0.7), (0.7, -0.7), (-0.7, -0.7)] {
                let from = at(s, 0.5 + dx * 0.3, 0.5 + dy * 0.3);
                let to = at(s, 0.5 + dx * 0.45, 0.5 + dy * 0.45);
                Line::new(from, to).into_styled(style).draw(&mut b).ok();
            }
        }
        IconFamily::Clouds => cloud(&mut b, s, style),
        IconFamily::Rain => {
            cloud(&mut b, s, style);
            for fx in [0.3, 0.5, 0.7] {
                Line::new(at(s, fx, 0.72), at(s, fx - 0.08, 0.92)).into_styled(style).draw(&mut b).ok();
            }
        }
        IconFamily::Storm => {
            cloud(&mut b, s, style);
            let bolt = [at(s, 0.55, 0.66), at(s, 0.42, 0.80), at(s, 0.56, 0.80), at(s, 0.44, 0.96)];
            Polyline::new(&bolt).into_styled(style).draw(&mut b).ok();
        }
        IconFamily::Snow => {
            cloud(&mut b, s, style);
            let flake = PrimitiveStyle::with_fill(BinaryColor::On);
            for (fx, fy) in [(0.3, 0.76), (0.5, 0.88), (0.7, 0.76)] {
                Circle::with_center(at(s, fx, fy), len(s, 0.08).max(2)).into_styled(flake).draw(&mut b).ok();
            }
        }
        IconFamily::Mist => {
            for (fy, x0, x1) in [(0.35, 0.15, 0.85), (0.5, 0.25, 0.9), (0.65, 0.1, 0.75)] {
                Line::new(at(s, x0, fy), at(s, x1, fy)).into_styled(style).draw(&mut b).ok();
            }
        }
    }
    b
}

/// Canopy, shaft and hook.
pub fn umbrella_glyph(size: u32) -> Bitmap {
    let mut b = Bitmap::new(size, size);
    let style = PrimitiveStyle::with_stroke(BinaryColor::On, 1);
    let s = size;
    Arc::with_center(at(s, 0.5, 0.5), len(s, 0.9), 180.0_f32.deg(), 180.0_f32.deg())
        .into_styled(style)
        .draw(&mut b)
        .ok();
    Line::new(at(s, 0.05, 0.5), at(s, 0.95, 0.5)).into_styled(style).draw(&mut b).ok();
    Line::new(at(s, 0.5, 0.5), at(s, 0.5, 0.88)).into_styled(style).draw(&mut b).ok();
    Line::new(at(s, 0.5, 0.88), at(s, 0.35, 0.88)).into_styled(style).draw(&mut b).ok();
    b
}

/// Rendered icons keyed by (code, size), loaded from `{assets}/icons`.
#[derive(Debug)]
pub struct IconSet {
    dir: PathBuf,
    weather: HashMap<(String, u32), Bitmap>,
    umbrella: Option<Bitmap>,
}

impl IconSet {
    pub fn new(assets_dir: impl AsRef<Path>) -> Self {
        Self {
            dir: assets_dir.as_ref().join("icons"),
            weather: HashMap::new(),
            umbrella: None,
        }
    }

    fn load_or(&self, name: &str, size: u32, fallback: impl FnOnce() -> Bitmap) -> Bitmap {
        let path = self.dir.join(format!("{name}.svg"));
        match load_svg(&path, size) {
            Ok(b) => b,
            Err(IconError::Io { .. }) => {
                debug!("no icon asset {}, using built-in glyph", path.display());
                fallback()
            }
            Err(e) => {
                warn!("{e}, using built-in glyph");
                fallback()
            }
        }
    }

    pub fn weather(&mut self, code: &str, size: u32) -> &Bitmap {
        let key = (code.to_string(), size);
        if !self.weather.contains_key(&key) {
            let bmp = self.load_or(code, size, || fallback_glyph(IconFamily::from_code(code), size));
            self.weather.insert(key.clone(), bmp);
        }
        &self.weather[&key]
    }

    pub fn umbrella(&mut self) -> &Bitmap {
        if self.umbrella.is_none() {
            self.umbrella = Some(self.load_or("brolly", UMBRELLA_SIZE, || umbrella_glyph(UMBRELLA_SIZE)));
        }
        self.umbrella.get_or_insert_with(|| umbrella_glyph(UMBRELLA_SIZE))
    }

    pub fn len(&self) -> usize {
        self.weather.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weather.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE_SQUARE: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10"><rect width="10" height="10" fill="white"/></svg>"#;
    const BLACK_DOT: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10"><rect x="3" y="3" width="4" height="4" fill="black"/></svg>"#;

    #[test]
    fn test_family_from_code() {
        assert_eq!(IconFamily::from_code("01d"), IconFamily::Clear);
        assert_eq!(IconFamily::from_code("04n"), IconFamily::Clouds);
        assert_eq!(IconFamily::from_code("10d"), IconFamily::Rain);
        assert_eq!(IconFamily::from_code("11d"), IconFamily::Storm);
        assert_eq!(IconFamily::from_code("13n"), IconFamily::Snow);
        assert_eq!(IconFamily::from_code("50d"), IconFamily::Mist);
        assert_eq!(IconFamily::from_code(""), IconFamily::Clouds);
    }

    #[test]
    fn test_render_light_svg_scaled() {
        let b = render_svg(WHITE_SQUARE, 20).unwrap();
        assert_eq!(b.width(), 20);
        assert!(b.count_on() > 380);
    }

    #[test]
    fn test_render_dark_svg_uses_coverage() {
        let b = render_svg(BLACK_DOT, 10).unwrap();
        assert!(b.count_on() > 0);
        assert!(!b.is_on(0, 0));
        assert!(b.is_on(5, 5));
    }

    #[test]
    fn test_invalid_svg() {
        assert!(matches!(render_svg("not svg", 16), Err(IconError::Parse(_))));
    }

    #[test]
    fn test_every_fallback_draws_something() {
        for family in [
            IconFamily::Clear,
            IconFamily::Clouds,
            IconFamily::Rain,
            IconFamily::Storm,
            IconFamily::Snow,
            IconFamily::Mist,
        ] {
            for size in [28, 64] {
                let b = fallback_glyph(family, size);
                assert_eq!((b.width(), b.height()), (size, size));
                assert!(b.count_on() > 0, "{family:?} at {size}");
            }
        }
        assert!(umbrella_glyph(UMBRELLA_SIZE).count_on() > 0);
    }

    #[test]
    fn test_icon_set_prefers_asset() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("icons")).unwrap();
        std::fs::write(dir.path().join("icons/01d.svg"), WHITE_SQUARE).unwrap();
        std::fs::write(dir.path().join("icons/10d.svg"), "broken").unwrap();

        let mut icons = IconSet::new(dir.path());
        assert!(icons.weather("01d", 28).count_on() > 700);
        assert_eq!(icons.weather("10d", 28), &fallback_glyph(IconFamily::Rain, 28));
        assert_eq!(icons.weather("13n", 28), &fallback_glyph(IconFamily::Snow, 28));
        assert_eq!(icons.len(), 3);
        assert_eq!(icons.umbrella(), &umbrella_glyph(UMBRELLA_SIZE));
    }

    #[test]
    fn test_bundled_assets_render() {
        let assets = Path::new(env!("CARGO_MANIFEST_DIR")).join("assets");
        let codes = ["01", "02", "03", "04", "09", "10", "11", "13", "50"];
        for code in codes.iter().flat_map(|c| [format!("{c}d"), format!("{c}n")]) {
            let path = assets.join("icons").join(format!("{code}.svg"));
            for size in [28, 64] {
                let b = load_svg(&path, size).unwrap();
                assert!(b.count_on() > 0, "{code} at {size}");
                assert_ne!(b, fallback_glyph(IconFamily::from_code(&code), size));
            }
        }
        let mut icons = IconSet::new(&assets);
        assert!(icons.umbrella().count_on() > 0);
        assert_ne!(icons.umbrella(), &umbrella_glyph(UMBRELLA_SIZE));
    }
}
