//! Encoder registry.
//!
//! Every supported encoder is one entry in [`ENCODERS`], grouped by codec
//! family in display order. The entry carries everything the compiler needs
//! to know about the encoder: which pixel format the capture caps must ask
//! for, how frames are converted before encoding, fixed encoder properties,
//! and any minimum input resolution.

use serde::Serialize;
use std::fmt;

use crate::engine::graph::PropertyValue;

/// Codec family (interoperable bitstream format).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CodecFamily {
    H264,
    H265,
    Vp8,
    Vp9,
    Av1,
}

impl CodecFamily {
    pub const ALL: [CodecFamily; 5] = [
        CodecFamily::H264,
        CodecFamily::H265,
        CodecFamily::Vp8,
        CodecFamily::Vp9,
        CodecFamily::Av1,
    ];

    /// Heading used in help output ("H.264").
    pub fn display_name(&self) -> &'static str {
        match self {
            CodecFamily::H264 => "H.264",
            CodecFamily::H265 => "H.265",
            CodecFamily::Vp8 => "VP8",
            CodecFamily::Vp9 => "VP9",
            CodecFamily::Av1 => "AV1",
        }
    }
}

impl fmt::Display for CodecFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CodecFamily::H264 => "H264",
            CodecFamily::H265 => "H265",
            CodecFamily::Vp8 => "VP8",
            CodecFamily::Vp9 => "VP9",
            CodecFamily::Av1 => "AV1",
        };
        f.write_str(s)
    }
}

/// Raw video pixel formats the pipelines negotiate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PixelFormat {
    /// Semi-planar 4:2:0, the default capture format
    Nv12,
    /// Planar 4:2:0
    I420,
    /// Packed 4:2:2
    Yuy2,
}

impl PixelFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            PixelFormat::Nv12 => "NV12",
            PixelFormat::I420 => "I420",
            PixelFormat::Yuy2 => "YUY2",
        }
    }
}

/// How frames get from the capture format into the encoder's format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    /// The encoder takes the capture caps as-is.
    Direct,
    /// `videoconvert` into a system-memory format.
    Software(PixelFormat),
    /// `nvvideoconvert` into NVMM device memory (Jetson V4L2 encoders).
    Nvmm(PixelFormat),
}

/// Compile rule for one encoder.
#[derive(Debug)]
pub struct EncoderRule {
    /// Format requested by the capture caps filter; `None` leaves it to
    /// negotiation.
    pub capture_format: Option<PixelFormat>,
    pub conversion: Conversion,
    /// Properties always set on the encoder stage, in order.
    pub properties: &'static [(&'static str, PropertyValue)],
    /// Smallest accepted (width, height).
    pub min_resolution: Option<(u32, u32)>,
}

#[derive(Debug)]
pub struct EncoderDef {
    /// Identifier, also the GStreamer element factory name.
    pub id: &'static str,
    pub family: CodecFamily,
    /// Implementation shown in help output.
    pub implementation: &'static str,
    pub hardware: bool,
    pub rule: EncoderRule,
}

const NATIVE: EncoderRule = EncoderRule {
    capture_format: Some(PixelFormat::Nv12),
    conversion: Conversion::Direct,
    properties: &[],
    min_resolution: None,
};

const NEGOTIATED: EncoderRule = EncoderRule {
    capture_format: None,
    conversion: Conversion::Direct,
    properties: &[],
    min_resolution: None,
};

const TO_I420: EncoderRule = EncoderRule {
    capture_format: None,
    conversion: Conversion::Software(PixelFormat::I420),
    properties: &[],
    min_resolution: None,
};

// Rockchip MPP encoders want NV12 but UVC cameras deliver YUY2 at useful
// frame rates.
const MPP: EncoderRule = EncoderRule {
    capture_format: Some(PixelFormat::Yuy2),
    conversion: Conversion::Software(PixelFormat::Nv12),
    properties: &[],
    min_resolution: None,
};

const NVMM: EncoderRule = EncoderRule {
    capture_format: Some(PixelFormat::Nv12),
    conversion: Conversion::Nvmm(PixelFormat::Nv12),
    properties: &[],
    min_resolution: None,
};

const VIDEOTOOLBOX_MIN: Option<(u32, u32)> = Some((640, 480));

const LOW_LATENCY_X26X: &[(&str, PropertyValue)] = &[
    ("tune", PropertyValue::text("zerolatency")),
    ("speed-preset", PropertyValue::text("ultrafast")),
];

pub static ENCODERS: &[EncoderDef] = &[
    // H.264
    EncoderDef {
        id: "vtenc_h264_hw",
        family: CodecFamily::H264,
        implementation: "Apple VideoToolbox",
        hardware: true,
        rule: EncoderRule {
            properties: &[("realtime", PropertyValue::Bool(true))],
            min_resolution: VIDEOTOOLBOX_MIN,
            ..NATIVE
        },
    },
    EncoderDef {
        id: "amfh264enc",
        family: CodecFamily::H264,
        implementation: "AMD AMF",
        hardware: true,
        rule: NATIVE,
    },
    EncoderDef {
        id: "nvh264enc",
        family: CodecFamily::H264,
        implementation: "NVIDIA NVENC",
        hardware: true,
        rule: NATIVE,
    },
    EncoderDef {
        id: "nvv4l2h264enc",
        family: CodecFamily::H264,
        implementation: "NVIDIA V4L2",
        hardware: true,
        rule: NVMM,
    },
    EncoderDef {
        id: "vah264enc",
        family: CodecFamily::H264,
        implementation: "VA-API",
        hardware: true,
        rule: NATIVE,
    },
    EncoderDef {
        id: "vah264lpenc",
        family: CodecFamily::H264,
        implementation: "VA-API low power",
        hardware: true,
        rule: NATIVE,
    },
    EncoderDef {
        id: "openh264enc",
        family: CodecFamily::H264,
        implementation: "OpenH264",
        hardware: false,
        rule: TO_I420,
    },
    EncoderDef {
        id: "mpph264enc",
        family: CodecFamily::H264,
        implementation: "Rockchip MPP",
        hardware: true,
        rule: EncoderRule {
            properties: &[
                ("level", PropertyValue::Int(40)),
                ("profile", PropertyValue::Int(100)),
            ],
            ..MPP
        },
    },
    EncoderDef {
        id: "x264enc",
        family: CodecFamily::H264,
        implementation: "x264",
        hardware: false,
        rule: EncoderRule {
            properties: LOW_LATENCY_X26X,
            ..NATIVE
        },
    },
    // H.265
    EncoderDef {
        id: "vtenc_h265_hw",
        family: CodecFamily::H265,
        implementation: "Apple VideoToolbox",
        hardware: true,
        rule: EncoderRule {
            properties: &[
                ("realtime", PropertyValue::Bool(true)),
                ("allow-frame-reordering", PropertyValue::Bool(false)),
            ],
            min_resolution: VIDEOTOOLBOX_MIN,
            ..NATIVE
        },
    },
    EncoderDef {
        id: "amfh265enc",
        family: CodecFamily::H265,
        implementation: "AMD AMF",
        hardware: true,
        rule: NATIVE,
    },
    EncoderDef {
        id: "nvh265enc",
        family: CodecFamily::H265,
        implementation: "NVIDIA NVENC",
        hardware: true,
        rule: NATIVE,
    },
    EncoderDef {
        id: "nvv4l2h265enc",
        family: CodecFamily::H265,
        implementation: "NVIDIA V4L2",
        hardware: true,
        rule: NVMM,
    },
    EncoderDef {
        id: "vah265enc",
        family: CodecFamily::H265,
        implementation: "VA-API",
        hardware: true,
        rule: NATIVE,
    },
    EncoderDef {
        id: "vah265lpenc",
        family: CodecFamily::H265,
        implementation: "VA-API low power",
        hardware: true,
        rule: NATIVE,
    },
    EncoderDef {
        id: "x265enc",
        family: CodecFamily::H265,
        implementation: "x265",
        hardware: false,
        rule: EncoderRule {
            properties: LOW_LATENCY_X26X,
            ..TO_I420
        },
    },
    EncoderDef {
        id: "mpph265enc",
        family: CodecFamily::H265,
        implementation: "Rockchip MPP",
        hardware: true,
        rule: MPP,
    },
    // VP8
    EncoderDef {
        id: "vp8enc",
        family: CodecFamily::Vp8,
        implementation: "libvpx",
        hardware: false,
        rule: EncoderRule {
            properties: &[("deadline", PropertyValue::Int(1))],
            ..TO_I420
        },
    },
    EncoderDef {
        id: "nvv4l2vp8enc",
        family: CodecFamily::Vp8,
        implementation: "NVIDIA V4L2",
        hardware: true,
        rule: NVMM,
    },
    EncoderDef {
        id: "mppvp8enc",
        family: CodecFamily::Vp8,
        implementation: "Rockchip MPP",
        hardware: true,
        rule: MPP,
    },
    // VP9
    EncoderDef {
        id: "vp9enc",
        family: CodecFamily::Vp9,
        implementation: "libvpx",
        hardware: false,
        rule: EncoderRule {
            properties: &[
                ("deadline", PropertyValue::Int(1)),
                ("cpu-used", PropertyValue::Int(8)),
                ("threads", PropertyValue::Int(4)),
                ("lag-in-frames", PropertyValue::Int(0)),
            ],
            ..TO_I420
        },
    },
    EncoderDef {
        id: "nvv4l2vp9enc",
        family: CodecFamily::Vp9,
        implementation: "NVIDIA V4L2",
        hardware: true,
        rule: NVMM,
    },
    // AV1
    EncoderDef {
        id: "svtav1enc",
        family: CodecFamily::Av1,
        implementation: "SVT-AV1",
        hardware: false,
        rule: TO_I420,
    },
    EncoderDef {
        id: "amfav1enc",
        family: CodecFamily::Av1,
        implementation: "AMD AMF",
        hardware: true,
        rule: NEGOTIATED,
    },
    EncoderDef {
        id: "nvav1enc",
        family: CodecFamily::Av1,
        implementation: "NVIDIA NVENC",
        hardware: true,
        rule: NEGOTIATED,
    },
    EncoderDef {
        id: "vaav1enc",
        family: CodecFamily::Av1,
        implementation: "VA-API",
        hardware: true,
        rule: NEGOTIATED,
    },
];

/// A validated encoder choice. Cheap to copy; points into [`ENCODERS`].
#[derive(Clone, Copy)]
pub struct EncoderDescriptor(&'static EncoderDef);

impl EncoderDescriptor {
    pub(crate) fn new(def: &'static EncoderDef) -> Self {
        Self(def)
    }

    pub fn id(&self) -> &'static str {
        self.0.id
    }

    pub fn family(&self) -> CodecFamily {
        self.0.family
    }

    pub fn implementation(&self) -> &'static str {
        self.0.implementation
    }

    pub fn is_hardware(&self) -> bool {
        self.0.hardware
    }

    pub fn rule(&self) -> &'static EncoderRule {
        &self.0.rule
    }
}

impl PartialEq for EncoderDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for EncoderDescriptor {}

impl fmt::Debug for EncoderDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncoderDescriptor")
            .field("id", &self.0.id)
            .field("family", &self.0.family)
            .finish()
    }
}

impl fmt::Display for EncoderDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.id)
    }
}
