use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Default, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Color {
    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    /// Builds a color from floating point channels, truncating toward zero.
    /// Values outside [0, 255] saturate at the bounds.
    pub fn truncate(channels: [f32; 3]) -> Self {
        Self {
            red: channels[0] as u8,
            green: channels[1] as u8,
            blue: channels[2] as u8,
        }
    }
}

impl From<[u8; 3]> for Color {
    fn from(value: [u8; 3]) -> Self {
        Self {
            red: value[0],
            green: value[1],
            blue: value[2],
        }
    }
}

impl From<Color> for [u8; 3] {
    fn from(value: Color) -> Self {
        [value.red, value.green, value.blue]
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, Copy, PartialEq)]
pub struct Point3D {
    pub position: [f64; 3],
    pub color: Color,
}

impl Point3D {
    pub fn new(position: [f64; 3], color: impl Into<Color>) -> Self {
        Self {
            position,
            color: color.into(),
        }
    }

    pub fn x(&self) -> f64 {
        self.position[0]
    }

    pub fn y(&self) -> f64 {
        self.position[1]
    }

    pub fn z(&self) -> f64 {
        self.position[2]
    }
}

impl From<[f64; 3]> for Point3D {
    fn from(value: [f64; 3]) -> Self {
        Self {
            position: value,
            ..Default::default()
        }
    }
}
