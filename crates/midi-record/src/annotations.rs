//! Performance annotations: when the performer enters each measure.
//!
//! The file is a two-column CSV with a `seconds,measure` header. `measure`
//! is an absolute measure index, `stay` (or `-1`) while nothing from the
//! score is being played, or `slide` (or `-2`) to signal that the visible
//! window should move on.
//!
//! ```text
//! seconds,measure
//! 0.0,stay
//! 0.75,0
//! 2.75,1
//! 4.75,slide
//! 5.0,2
//! ```

use crate::{Error, Result};
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Label {
    Measure(usize),
    Stay,
    Slide,
}

impl FromStr for Label {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stay" | "-1" => Ok(Label::Stay),
            "slide" | "-2" => Ok(Label::Slide),
            other => other
                .parse::<usize>()
                .map(Label::Measure)
                .map_err(|_| format!("invalid measure label '{other}'")),
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Measure(m) => write!(f, "{m}"),
            Label::Stay => write!(f, "stay"),
            Label::Slide => write!(f, "slide"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Annotation {
    pub seconds: f64,
    pub label: Label,
}

impl Annotation {
    /// Parse annotation CSV text. Rows come back sorted by time.
    pub fn parse_csv(text: &str) -> Result<Vec<Annotation>> {
        let mut rows = Vec::new();

        for (index, raw) in text.lines().enumerate() {
            let line_no = index + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut fields = line.split(',').map(str::trim);
            let (Some(seconds), Some(label), None) = (fields.next(), fields.next(), fields.next())
            else {
                return Err(Error::Annotation {
                    line: line_no,
                    message: format!("expected two columns, got '{line}'"),
                });
            };

            if rows.is_empty() && seconds.eq_ignore_ascii_case("seconds") {
                continue;
            }

            let seconds: f64 = seconds.parse().map_err(|_| Error::Annotation {
                line: line_no,
                message: format!("invalid time '{seconds}'"),
            })?;
            if !seconds.is_finite() || seconds < 0.0 {
                return Err(Error::Annotation {
                    line: line_no,
                    message: format!("time must be a non-negative number, got {seconds}"),
                });
            }

            let label = label.parse().map_err(|message| Error::Annotation {
                line: line_no,
                message,
            })?;

            rows.push(Annotation { seconds, label });
        }

        rows.sort_by(|a, b| a.seconds.total_cmp(&b.seconds));
        Ok(rows)
    }
}

/// Per-frame ground truth derived from annotations.
///
/// `labels` never holds `Slide`: a slide row marks a single frame in
/// `slide_frames` and the previous label stays in force until the next row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Timeline {
    labels: Vec<Label>,
    slide_frames: Vec<usize>,
}

impl Timeline {
    /// Frames before the first row are `Stay`.
    pub fn from_annotations(annotations: &[Annotation], num_frames: usize, fps: usize) -> Self {
        let mut labels = vec![Label::Stay; num_frames];
        let mut slide_frames = Vec::new();
        let mut current = Label::Stay;
        let mut from = 0usize;

        for annotation in annotations {
            let frame = ((annotation.seconds * fps as f64).floor() as usize).min(num_frames);
            if annotation.label == Label::Slide {
                if frame < num_frames {
                    slide_frames.push(frame);
                }
                continue;
            }
            for label in &mut labels[from.min(frame)..frame] {
                *label = current;
            }
            from = frame.max(from);
            current = annotation.label;
        }
        for label in &mut labels[from..] {
            *label = current;
        }

        slide_frames.dedup();
        Self {
            labels,
            slide_frames,
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Label in force at `frame`; past the end, the final label.
    pub fn label_at(&self, frame: usize) -> Label {
        match self.labels.get(frame) {
            Some(label) => *label,
            None => self.labels.last().copied().unwrap_or(Label::Stay),
        }
    }

    /// Whether a slide marker falls in `frames`.
    pub fn slide_in(&self, frames: Range<usize>) -> bool {
        self.slide_frames.iter().any(|f| frames.contains(f))
    }

    pub fn slide_frames(&self) -> &[usize] {
        &self.slide_frames
    }

    /// First frame labelled with `measure`.
    pub fn first_frame_of(&self, measure: usize) -> Option<usize> {
        self.labels.iter().position(|l| *l == Label::Measure(measure))
    }

    /// Highest measure index referenced.
    pub fn max_measure(&self) -> Option<usize> {
        self.labels
            .iter()
            .filter_map(|l| match l {
                Label::Measure(m) => Some(*m),
                _ => None,
            })
            .max()
    }
}
