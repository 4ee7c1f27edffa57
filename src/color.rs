//! Implements utilities to create color values.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::str::FromStr;

static HEX_COLOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^#([0-9a-fA-F]{2})([0-9a-fA-F]{2})([0-9a-fA-F]{2})([0-9a-fA-F]{2})?$")
        .expect("hex color pattern is valid")
});

#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: Option<f64>,
}

impl Color {
    pub const BLACK: Color = Color { r: 0.0, g: 0.0, b: 0.0, a: None };

    /// Fill used when a reply carries the magic marker, `#A08CF9`.
    pub const MAGIC: Color = Color {
        r: 160.0 / 255.0,
        g: 140.0 / 255.0,
        b: 249.0 / 255.0,
        a: None,
    };

    pub fn rgba(&self) -> (f64, f64, f64, f64) {
        (self.r, self.g, self.b, self.a.unwrap_or(1.0))
    }
}

impl FromStr for Color {
    type Err = &'static str;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let captures = HEX_COLOR
            .captures(s)
            .ok_or("string not in form #RRGGBB or #RRGGBBAA")?;
        let channel = |i: usize| {
            captures
                .get(i)
                .and_then(|m| u8::from_str_radix(m.as_str(), 16).ok())
                .map(|x| x as f64 / 255.0)
        };
        Ok(Color {
            r: channel(1).unwrap_or(0.0),
            g: channel(2).unwrap_or(0.0),
            b: channel(3).unwrap_or(0.0),
            a: channel(4),
        })
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self { r, g, b, a } = *self;
        let byte = |x: f64| (x.clamp(0.0, 1.0) * 255.0).round() as u8;
        write!(f, "#{:02X}{:02X}{:02X}", byte(r), byte(g), byte(b))?;
        if let Some(a) = a {
            write!(f, "{:02X}", byte(a))?;
        }
        Ok(())
    }
}

struct ColorVisitor;

impl<'de> Visitor<'de> for ColorVisitor {
    type Value = Color;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a string in the form #RRGGBBAA or #RRGGBB")
    }

    fn visit_str<E>(self, v: &str) -> std::result::Result<Self::Value, E>
    where
        E: de::Error,
    {
        v.parse::<Color>().map_err(|e| E::custom(e))
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Color, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_str(ColorVisitor)
    }
}
