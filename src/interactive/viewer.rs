//! Interactive light viewer - a torch follows the mouse through a paintable
//! tile world, lit by the propagation engine every frame.

use minifb::{Key, KeyRepeat, MouseButton, MouseMode, Window, WindowOptions};
use rayon::prelude::*;
use thiserror::Error;

use crate::color::{Rgb, to_byte};
use crate::engine::decay::TileClass;
use crate::engine::{EngineConfig, EngineError, LightEngine, Resolution};
use crate::lightmap::LightMap;
use crate::render::{NormalizationMode, normalize};

/// Configuration for the interactive viewer
#[derive(Clone)]
pub struct ViewerConfig {
    /// Grid size (width x height in cells)
    pub grid_size: (usize, usize),
    /// Pixel scale factor (each cell = scale x scale pixels)
    pub scale: usize,
    /// Torch color (r, g, b)
    pub light_color: Rgb,
    /// Initial engine configuration
    pub engine: EngineConfig,
    /// Initial normalization mode
    pub normalization_mode: NormalizationMode,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            grid_size: (120, 80),
            scale: 10,
            light_color: Rgb::new(1.0, 0.8, 0.4), // Warm torch color
            engine: EngineConfig {
                max_light_range: 48,
                ..EngineConfig::default()
            },
            normalization_mode: NormalizationMode::BrightnessLimit(1.0),
        }
    }
}

#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("window error: {0}")]
    Window(String),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Interactive viewer for poking at the propagation engine
pub struct InteractiveViewer {
    config: ViewerConfig,
    engine: LightEngine,
    map: LightMap,
    walls: Vec<bool>,
    anchors: Vec<(usize, usize, Rgb)>,
    window: Window,
    buffer: Vec<u32>,
}

impl InteractiveViewer {
    /// Create a new interactive viewer with the given configuration
    pub fn new(config: ViewerConfig) -> Result<Self, ViewerError> {
        let (grid_w, grid_h) = config.grid_size;
        let window_w = grid_w * config.scale;
        let window_h = grid_h * config.scale;

        let window = Window::new(
            "gridlight - Interactive Viewer (ESC to exit)",
            window_w,
            window_h,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        )
        .map_err(|e| ViewerError::Window(e.to_string()))?;

        let engine = LightEngine::new(config.engine.clone())?;
        let map = LightMap::new(grid_w, grid_h);
        let walls = vec![false; grid_w * grid_h];
        let buffer = vec![0u32; window_w * window_h];

        Ok(Self {
            config,
            engine,
            map,
            walls,
            anchors: Vec::new(),
            window,
            buffer,
        })
    }

    /// Run the interactive viewer loop
    pub fn run(&mut self) -> Result<(), ViewerError> {
        let (grid_w, grid_h) = self.config.grid_size;
        let scale = self.config.scale;

        // Limit to ~60fps
        self.window.set_target_fps(60);

        let mut color = self.config.light_color;
        let mut mode = self.config.normalization_mode;

        println!("=== gridlight Interactive Viewer ===");
        println!("Controls:");
        println!("  Mouse      - Move torch");
        println!("  Left Drag  - Paint walls");
        println!("  Right Drag - Erase walls");
        println!("  1/2/3      - Resolution: 1x/2x/4x");
        println!("  I          - Toggle bounce light");
        println!("  T          - Toggle temporal optimization");
        println!("  H          - Toggle hi-def gamma handling");
        println!("  +/-        - Adjust exit loss");
        println!("  R/G/B/Y/W  - Torch color");
        println!("  N          - Cycle normalization mode");
        println!("  A          - Drop an anchor light at the cursor");
        println!("  C          - Clear walls and anchors");
        println!("  ESC        - Exit");
        println!();

        while self.window.is_open() && !self.window.is_key_down(Key::Escape) {
            let mut config = self.engine.config().clone();
            let mut config_changed = false;

            if self.window.is_key_pressed(Key::Key1, KeyRepeat::No) {
                config.resolution = Resolution::X1;
                config_changed = true;
                println!("Resolution: 1x");
            }
            if self.window.is_key_pressed(Key::Key2, KeyRepeat::No) {
                config.resolution = Resolution::X2;
                config_changed = true;
                println!("Resolution: 2x");
            }
            if self.window.is_key_pressed(Key::Key3, KeyRepeat::No) {
                config.resolution = Resolution::X4;
                config_changed = true;
                println!("Resolution: 4x");
            }
            if self.window.is_key_pressed(Key::I, KeyRepeat::No) {
                config.bounce_light = !config.bounce_light;
                config_changed = true;
                println!(
                    "Bounce light: {}",
                    if config.bounce_light { "ON" } else { "OFF" }
                );
            }
            if self.window.is_key_pressed(Key::T, KeyRepeat::No) {
                config.temporal = !config.temporal;
                config_changed = true;
                println!("Temporal: {}", if config.temporal { "ON" } else { "OFF" });
            }
            if self.window.is_key_pressed(Key::H, KeyRepeat::No) {
                config.hi_def = !config.hi_def;
                config_changed = true;
                println!("Hi-def: {}", if config.hi_def { "ON" } else { "OFF" });
            }
            if self.window.is_key_pressed(Key::Equal, KeyRepeat::Yes)
                || self.window.is_key_pressed(Key::NumPadPlus, KeyRepeat::Yes)
            {
                config.exit_loss_percent = (config.exit_loss_percent + 5.0).min(100.0);
                config_changed = true;
                println!("Exit loss: {:.0}%", config.exit_loss_percent);
            }
            if self.window.is_key_pressed(Key::Minus, KeyRepeat::Yes)
                || self.window.is_key_pressed(Key::NumPadMinus, KeyRepeat::Yes)
            {
                config.exit_loss_percent = (config.exit_loss_percent - 5.0).max(0.0);
                config_changed = true;
                println!("Exit loss: {:.0}%", config.exit_loss_percent);
            }
            if config_changed {
                if let Err(e) = self.engine.update_config(config) {
                    log::error!("failed to apply config: {e}");
                }
            }

            // Color keys
            if self.window.is_key_pressed(Key::R, KeyRepeat::No) {
                color = Rgb::new(1.0, 0.0, 0.0);
                println!("Color: Red");
            }
            if self.window.is_key_pressed(Key::G, KeyRepeat::No) {
                color = Rgb::new(0.0, 1.0, 0.0);
                println!("Color: Green");
            }
            if self.window.is_key_pressed(Key::B, KeyRepeat::No) {
                color = Rgb::new(0.2, 0.4, 1.0);
                println!("Color: Blue");
            }
            if self.window.is_key_pressed(Key::Y, KeyRepeat::No) {
                color = Rgb::new(1.0, 1.0, 0.0);
                println!("Color: Yellow");
            }
            if self.window.is_key_pressed(Key::W, KeyRepeat::No) {
                color = Rgb::WHITE;
                println!("Color: White");
            }
            if self.window.is_key_pressed(Key::N, KeyRepeat::No) {
                mode = match mode {
                    NormalizationMode::Standard => NormalizationMode::BrightnessLimit(1.0),
                    NormalizationMode::BrightnessLimit(_) => {
                        NormalizationMode::PerceptualLuminance(1.0)
                    }
                    NormalizationMode::PerceptualLuminance(_) => NormalizationMode::Standard,
                };
                println!("Normalization: {mode:?}");
            }
            if self.window.is_key_pressed(Key::C, KeyRepeat::No) {
                self.walls.fill(false);
                self.anchors.clear();
                println!("Walls and anchors cleared");
            }

            let mouse = self.window.get_mouse_pos(MouseMode::Discard).map(|(mx, my)| {
                (
                    (mx as usize / scale).min(grid_w - 1),
                    (my as usize / scale).min(grid_h - 1),
                )
            });

            if let Some((gx, gy)) = mouse {
                if self.window.get_mouse_down(MouseButton::Left) {
                    self.walls[gx * grid_h + gy] = true;
                }
                if self.window.get_mouse_down(MouseButton::Right) {
                    self.walls[gx * grid_h + gy] = false;
                }
                if self.window.is_key_pressed(Key::A, KeyRepeat::No) {
                    self.anchors.push((gx, gy, color));
                    println!("Anchor light at ({gx}, {gy})");
                }
            }

            self.rebuild_scene(mouse, color);
            if let Err(e) = self.engine.spread_light(&mut self.map) {
                log::error!("propagation failed: {e}");
            }
            self.render_to_buffer(mode);

            self.window
                .update_with_buffer(&self.buffer, grid_w * scale, grid_h * scale)
                .map_err(|e| ViewerError::Window(e.to_string()))?;
        }

        Ok(())
    }

    /// Refresh emissions and mask for this frame, the way a host would.
    fn rebuild_scene(&mut self, torch: Option<(usize, usize)>, color: Rgb) {
        let (grid_w, grid_h) = self.config.grid_size;
        self.map.clear();
        for x in 0..grid_w {
            for y in 0..grid_h {
                if self.walls[x * grid_h + y] {
                    self.map.set_class(x, y, TileClass::Solid);
                }
            }
        }
        for &(ax, ay, anchor_color) in &self.anchors {
            self.map.set_color(ax, ay, anchor_color);
        }
        if let Some((tx, ty)) = torch {
            self.map.set_color(tx, ty, color);
        }
    }

    /// Scale the normalized light map into the window buffer.
    fn render_to_buffer(&mut self, mode: NormalizationMode) {
        let (grid_w, grid_h) = self.config.grid_size;
        let scale = self.config.scale;
        let window_w = grid_w * scale;
        let normalized = normalize(self.map.colors(), mode);
        let walls = &self.walls;

        self.buffer
            .par_chunks_mut(window_w)
            .enumerate()
            .for_each(|(py, row)| {
                let gy = py / scale;
                for (px, pixel) in row.iter_mut().enumerate() {
                    let gx = px / scale;
                    let i = gx * grid_h + gy;
                    *pixel = if walls[i] {
                        // Dark gray floor per channel so painted walls stay
                        // visible even unlit
                        let c = normalized[i];
                        let r = (to_byte(c.r).max(30)) as u32;
                        let g = (to_byte(c.g).max(30)) as u32;
                        let b = (to_byte(c.b).max(30)) as u32;
                        (r << 16) | (g << 8) | b
                    } else {
                        normalized[i].to_u32()
                    };
                }
            });
    }
}
