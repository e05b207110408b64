//! Bounding-box arithmetic between screen, display and window coordinates.
//!
//! A `Rect` is `{left, top, width, height}`; a `Span` is the same region as
//! `{left, top, right, bottom}`. Both convert into each other exactly.

use std::fmt;

use crate::error::{BotError, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Span {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub const fn new(left: i32, top: i32, width: i32, height: i32) -> Self {
        Self { left, top, width, height }
    }

    pub fn to_span(self) -> Span {
        Span {
            left: self.left,
            top: self.top,
            right: self.left + self.width,
            bottom: self.top + self.height,
        }
    }

    /// Integer midpoint, rounding towards the top-left.
    pub fn center(&self) -> (i32, i32) {
        (self.left + self.width / 2, self.top + self.height / 2)
    }
}

impl Span {
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self { left, top, right, bottom }
    }

    pub fn to_rect(self) -> Rect {
        Rect {
            left: self.left,
            top: self.top,
            width: self.right - self.left,
            height: self.bottom - self.top,
        }
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }
}

impl From<Rect> for Span {
    fn from(r: Rect) -> Self {
        r.to_span()
    }
}

impl From<Span> for Rect {
    fn from(s: Span) -> Self {
        s.to_rect()
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {}x{})", self.left, self.top, self.width, self.height)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})-({}, {})", self.left, self.top, self.right, self.bottom)
    }
}

/// Origin-and-size containment test.
///
/// Only the top-left corner and the dimensions are compared, so an inner box
/// shifted past the outer's right or bottom edge still passes. Callers rely on
/// this exact behaviour when matching a window to its display.
pub fn is_subbox(outer: &Rect, inner: &Rect) -> bool {
    outer.left <= inner.left
        && outer.top <= inner.top
        && outer.width >= inner.width
        && outer.height >= inner.height
}

/// Position of `inner` expressed in `outer`'s coordinate space.
pub fn relative_location(outer: &Rect, inner: &Rect) -> Result<Span> {
    if !is_subbox(outer, inner) {
        return Err(BotError::Geometry {
            outer: outer.to_string(),
            inner: inner.to_string(),
        });
    }
    let left = inner.left - outer.left;
    let top = inner.top - outer.top;
    Ok(Span::new(left, top, left + inner.width, top + inner.height))
}

/// Translate a span local to `origin` into `origin`'s parent space.
pub fn absolute_location(origin: &Span, local: &Span) -> Span {
    Span::new(
        origin.left + local.left,
        origin.top + local.top,
        origin.left + local.right,
        origin.top + local.bottom,
    )
}
