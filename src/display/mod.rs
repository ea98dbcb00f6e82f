/*
 *  display/mod.rs
 *
 *  WxMonS - weather at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  Display subsystem: panel drivers, raster helpers and dashboard composition
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

// Core trait definitions
pub mod traits;
pub mod error;
pub mod bitmap;
pub mod canvas;

// Panel drivers
pub mod drivers;

// Text and layout
pub mod fonts;
pub mod text_cache;
pub mod layout;

// Animation
pub mod transition;

// Dashboard content
pub mod icons;
pub mod slots;
pub mod components;

// Re-exports for convenience
pub use traits::{DisplayDriver, DisplayCapabilities, ColorDepth};
pub use error::DisplayError;
pub use bitmap::Bitmap;
pub use canvas::Canvas;
pub use fonts::FontFace;
pub use text_cache::{RasterEntry, TextRasterCache};
pub use transition::{TransitionController, TransitionEffect, TransitionPhase, TransitionStep};
