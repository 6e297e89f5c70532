//! Capability catalog: supported encoders, resolution presets and the
//! cross-cutting rules between them.

mod encoders;
mod resolutions;

pub use encoders::{
    CodecFamily, Conversion, ENCODERS, EncoderDef, EncoderDescriptor, EncoderRule, PixelFormat,
};
pub use resolutions::{RESOLUTIONS, Resolution, ResolutionDef};

use super::error::ConfigError;

/// Iterate over every known encoder in declared order.
pub fn encoders() -> impl Iterator<Item = EncoderDescriptor> {
    ENCODERS.iter().map(EncoderDescriptor::new)
}

/// Encoders belonging to one codec family, in declared order.
pub fn encoders_in(family: CodecFamily) -> impl Iterator<Item = EncoderDescriptor> {
    encoders().filter(move |e| e.family() == family)
}

/// Case-insensitive encoder lookup.
pub fn lookup_encoder(token: &str) -> Result<EncoderDescriptor, ConfigError> {
    ENCODERS
        .iter()
        .find(|def| def.id.eq_ignore_ascii_case(token.trim()))
        .map(EncoderDescriptor::new)
        .ok_or_else(|| ConfigError::UnknownEncoder {
            token: token.to_string(),
            remediation: list_encoders(),
        })
}

/// Case-insensitive resolution lookup.
pub fn lookup_resolution(token: &str) -> Result<Resolution, ConfigError> {
    RESOLUTIONS
        .iter()
        .map(|def| def.resolution)
        .find(|res| res.name.eq_ignore_ascii_case(token.trim()))
        .ok_or_else(|| ConfigError::UnknownResolution {
            token: token.to_string(),
            remediation: list_resolutions(),
        })
}

/// Check constraints between an encoder and a resolution that a plain table
/// lookup cannot express. Call after both lookups succeeded.
pub fn check_compatibility(
    encoder: EncoderDescriptor,
    resolution: Resolution,
) -> Result<(), ConfigError> {
    if let Some((min_w, min_h)) = encoder.rule().min_resolution {
        if !resolution.at_least(min_w, min_h) {
            return Err(ConfigError::IncompatibleConfiguration {
                message: format!(
                    "{} encoder '{}' requires minimum resolution of {}x{}\nYour resolution: {}",
                    encoder.implementation(),
                    encoder.id(),
                    min_w,
                    min_h,
                    resolution
                ),
                remediation: min_resolution_remediation(encoder, min_w, min_h),
            });
        }
    }
    Ok(())
}

fn min_resolution_remediation(encoder: EncoderDescriptor, min_w: u32, min_h: u32) -> String {
    let large_enough: Vec<&str> = RESOLUTIONS
        .iter()
        .map(|def| def.resolution)
        .filter(|res| res.at_least(min_w, min_h))
        .map(|res| res.name)
        .collect();

    let mut text = String::from("Solutions:\n");
    text.push_str(&format!(
        "  1. Use a resolution of at least {}x{}: {}\n",
        min_w,
        min_h,
        large_enough.join(", ")
    ));
    text.push_str("  2. Use a software encoder that supports lower resolutions:");
    for alt in encoders().filter(|e| !e.is_hardware() && e.rule().min_resolution.is_none()) {
        if alt.family() == encoder.family() {
            text.push_str(&format!(
                "\n     - {} ({})",
                alt.id(),
                alt.family().display_name()
            ));
        }
    }
    for alt in encoders().filter(|e| !e.is_hardware() && e.rule().min_resolution.is_none()) {
        if alt.family() != encoder.family() {
            text.push_str(&format!(
                "\n     - {} ({})",
                alt.id(),
                alt.family().display_name()
            ));
        }
    }
    text
}

/// Help text listing encoders grouped by family.
pub fn list_encoders() -> String {
    let mut sections = Vec::new();
    for family in CodecFamily::ALL {
        let mut section = format!("{}:", family.display_name());
        for encoder in encoders_in(family) {
            section.push_str(&format!(
                "\n  - {} ({})",
                encoder.id(),
                encoder.implementation()
            ));
        }
        sections.push(section);
    }
    format!("Supported encoders:\n\n{}", sections.join("\n\n"))
}

/// Help text listing resolution presets.
pub fn list_resolutions() -> String {
    let mut text = String::from("Supported resolutions:");
    for def in RESOLUTIONS {
        let res = def.resolution;
        text.push_str(&format!(
            "\n  - {:<8}({:<11}{})",
            res.name,
            format!("{}x{},", res.width, res.height),
            def.aspect
        ));
    }
    text
}
