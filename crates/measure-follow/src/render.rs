//! Score rendering.
//!
//! [`GridRenderer`] lays the score out as a grid of fixed-size cells, one per
//! measure. The visible window is tinted and the latest predicted measure is
//! highlighted. [`NullRenderer`] is for headless runs.

use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use follow_conf::RenderConfig;
use tracing::info;

use crate::error::{FollowError, Result};

pub type Rgb = [u8; 3];

pub const BLACK: Rgb = [0, 0, 0];
pub const WHITE: Rgb = [255, 255, 255];
pub const PLAIN: Rgb = [234, 247, 241];
pub const ACTIVATE: Rgb = [204, 227, 201];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderMode {
    /// Log a text strip of the score.
    Human,
    /// Return an RGB frame.
    RgbArray,
}

impl FromStr for RenderMode {
    type Err = FollowError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "human" => Ok(RenderMode::Human),
            "rgb_array" => Ok(RenderMode::RgbArray),
            other => Err(FollowError::UnsupportedRenderMode(other.to_string())),
        }
    }
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderMode::Human => write!(f, "human"),
            RenderMode::RgbArray => write!(f, "rgb_array"),
        }
    }
}

/// What a renderer needs to know about the episode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderView {
    pub window: Range<usize>,
    pub predicted: Option<usize>,
}

/// 8-bit RGB image, channel-first (`3 x H x W`) unless `channel_last`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbFrame {
    pub width: usize,
    pub height: usize,
    pub channel_last: bool,
    pub data: Vec<u8>,
}

impl RgbFrame {
    /// `(C, H, W)` or `(H, W, C)`.
    pub fn shape(&self) -> (usize, usize, usize) {
        if self.channel_last {
            (self.height, self.width, 3)
        } else {
            (3, self.height, self.width)
        }
    }

    pub fn pixel(&self, x: usize, y: usize) -> Rgb {
        if self.channel_last {
            let i = (y * self.width + x) * 3;
            [self.data[i], self.data[i + 1], self.data[i + 2]]
        } else {
            let plane = self.width * self.height;
            let i = y * self.width + x;
            [self.data[i], self.data[plane + i], self.data[2 * plane + i]]
        }
    }
}

pub trait Renderer: Send {
    /// Modes this renderer can produce.
    fn modes(&self) -> &[RenderMode];

    /// Prepare for an episode over the given score measures.
    fn reset(&mut self, measures: Range<usize>);

    fn render(&mut self, view: &RenderView, mode: RenderMode) -> Result<Option<RgbFrame>>;

    fn close(&mut self);
}

/// Renders nothing and supports no modes.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn modes(&self) -> &[RenderMode] {
        &[]
    }

    fn reset(&mut self, _measures: Range<usize>) {}

    fn render(&mut self, _view: &RenderView, mode: RenderMode) -> Result<Option<RgbFrame>> {
        Err(FollowError::UnsupportedRenderMode(mode.to_string()))
    }

    fn close(&mut self) {}
}

/// Measures drawn row-major in fixed-size cells with one-pixel borders.
#[derive(Debug, Clone)]
pub struct GridRenderer {
    config: RenderConfig,
    measures: Range<usize>,
    /// Row-major `H x W x 3` scratch buffer, dropped on close.
    buffer: Option<Vec<u8>>,
}

impl GridRenderer {
    const MODES: [RenderMode; 2] = [RenderMode::Human, RenderMode::RgbArray];

    pub fn new(config: RenderConfig) -> Self {
        Self {
            config,
            measures: 0..0,
            buffer: None,
        }
    }

    /// Image size in pixels as `(width, height)`.
    pub fn dimensions(&self) -> (usize, usize) {
        let columns = self.config.columns.max(1);
        let rows = self.measures.len().div_ceil(columns);
        (
            columns * self.config.cell_width,
            rows * self.config.cell_height,
        )
    }

    fn cell_colour(&self, measure: usize, view: &RenderView) -> Rgb {
        if view.predicted == Some(measure) {
            ACTIVATE
        } else if view.window.contains(&measure) {
            PLAIN
        } else {
            WHITE
        }
    }

    fn draw(&mut self, view: &RenderView) -> RgbFrame {
        let (width, height) = self.dimensions();
        let (cw, ch) = (self.config.cell_width, self.config.cell_height);
        let columns = self.config.columns.max(1);

        let colours: Vec<Rgb> = self
            .measures
            .clone()
            .map(|m| self.cell_colour(m, view))
            .collect();

        let buffer = self.buffer.get_or_insert_with(Vec::new);
        buffer.clear();
        buffer.resize(width * height * 3, 255);

        for (cell, colour) in colours.iter().enumerate() {
            let (x0, y0) = ((cell % columns) * cw, (cell / columns) * ch);
            for dy in 0..ch {
                for dx in 0..cw {
                    let border = dx == 0 || dy == 0 || dx + 1 == cw || dy + 1 == ch;
                    let rgb = if border { BLACK } else { *colour };
                    let i = ((y0 + dy) * width + x0 + dx) * 3;
                    buffer[i..i + 3].copy_from_slice(&rgb);
                }
            }
        }

        let data = if self.config.channel_last {
            buffer.clone()
        } else {
            let plane = width * height;
            let mut planar = vec![0u8; plane * 3];
            for (i, rgb) in buffer.chunks_exact(3).enumerate() {
                for (c, value) in rgb.iter().enumerate() {
                    planar[c * plane + i] = *value;
                }
            }
            planar
        };

        RgbFrame {
            width,
            height,
            channel_last: self.config.channel_last,
            data,
        }
    }

    fn strip(&self, view: &RenderView) -> String {
        self.measures
            .clone()
            .map(|m| {
                if view.predicted == Some(m) {
                    '#'
                } else if view.window.contains(&m) {
                    '='
                } else {
                    '.'
                }
            })
            .collect()
    }
}

impl Renderer for GridRenderer {
    fn modes(&self) -> &[RenderMode] {
        &Self::MODES
    }

    fn reset(&mut self, measures: Range<usize>) {
        self.measures = measures;
    }

    fn render(&mut self, view: &RenderView, mode: RenderMode) -> Result<Option<RgbFrame>> {
        match mode {
            RenderMode::Human => {
                info!(
                    window = ?view.window,
                    predicted = ?view.predicted,
                    "{}",
                    self.strip(view)
                );
                Ok(None)
            }
            RenderMode::RgbArray => Ok(Some(self.draw(view))),
        }
    }

    fn close(&mut self) {
        self.buffer = None;
    }
}
