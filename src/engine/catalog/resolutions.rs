use serde::Serialize;
use std::fmt;

/// Output frame size preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub name: &'static str,
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    /// True when both dimensions are at least the given floor.
    pub fn at_least(&self, min_width: u32, min_height: u32) -> bool {
        self.width >= min_width && self.height >= min_height
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}x{})", self.name, self.width, self.height)
    }
}

#[derive(Debug)]
pub struct ResolutionDef {
    pub resolution: Resolution,
    /// Display aspect ratio label for help output
    pub aspect: &'static str,
}

const fn preset(name: &'static str, width: u32, height: u32, aspect: &'static str) -> ResolutionDef {
    ResolutionDef {
        resolution: Resolution {
            name,
            width,
            height,
        },
        aspect,
    }
}

pub static RESOLUTIONS: &[ResolutionDef] = &[
    preset("QVGA", 320, 240, "4:3"),
    preset("VGA", 640, 480, "4:3"),
    preset("SVGA", 800, 600, "4:3"),
    preset("XGA", 1024, 768, "4:3"),
    preset("QuadVGA", 1280, 960, "4:3"),
    preset("UXGA", 1600, 1200, "4:3"),
    preset("HD", 1280, 720, "16:9"),
    preset("FHD", 1920, 1080, "16:9"),
    preset("2K", 1920, 1080, "16:9"),
    preset("DCI2K", 2048, 1080, "~17:9"),
    preset("UHD", 3840, 2160, "16:9"),
    preset("4K", 3840, 2160, "16:9"),
    preset("DCI4K", 4096, 2160, "~17:9"),
];
