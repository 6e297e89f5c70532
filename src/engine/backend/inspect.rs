//! Element factory lookup through `gst-inspect-1.0`, cached per factory.
//!
//! A report is reduced to what construction needs: the media formats each
//! pad direction accepts and the type of every property.

use std::collections::HashMap;
use std::fmt;
use std::process::Command;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use crate::engine::error::EngineError;
use crate::engine::graph::{Caps, PropertyValue};

const INSPECT_PROGRAM: &str = "gst-inspect-1.0";

/// Media type plus optional caps features, e.g. `video/x-raw(memory:NVMM)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFormat {
    media_type: String,
    features: Option<String>,
}

impl MediaFormat {
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        match text.split_once('(') {
            Some((media_type, rest)) => Self {
                media_type: media_type.trim().to_string(),
                features: Some(rest.trim_end_matches(')').trim().to_string()),
            },
            None => Self {
                media_type: text.to_string(),
                features: None,
            },
        }
    }

    pub fn of_caps(caps: &Caps) -> Self {
        Self {
            media_type: caps.media_type.to_string(),
            features: caps.features.map(str::to_string),
        }
    }

    fn features(&self) -> &str {
        self.features.as_deref().unwrap_or("memory:SystemMemory")
    }

    /// Same media type and memory, with `ANY` features matching any memory.
    pub fn accepts(&self, other: &MediaFormat) -> bool {
        self.media_type == other.media_type
            && (self.features() == other.features()
                || self.features() == "ANY"
                || other.features() == "ANY")
    }
}

impl fmt::Display for MediaFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.media_type)?;
        if let Some(features) = &self.features {
            write!(f, "({})", features)?;
        }
        Ok(())
    }
}

/// Value type of an element property as reported by `gst-inspect-1.0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyKind {
    Boolean,
    Integer { min: i128, max: i128 },
    Float,
    String,
    Enum(Vec<(i64, String)>),
    Caps,
    /// Flags, objects and anything else that is passed through unchecked
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertySpec {
    pub name: String,
    pub kind: PropertyKind,
}

impl PropertySpec {
    /// Reason the value does not fit this property, if it does not.
    pub fn check(&self, value: &PropertyValue) -> Result<(), String> {
        match (&self.kind, value) {
            (PropertyKind::Boolean, PropertyValue::Bool(_)) => Ok(()),
            (PropertyKind::Boolean, PropertyValue::Str(s)) if matches!(&**s, "true" | "false") => Ok(()),
            (PropertyKind::Boolean, _) => Err("expected a boolean".to_string()),

            (PropertyKind::Integer { min, max }, value) => {
                let parsed = match value {
                    PropertyValue::Int(v) => Some(i128::from(*v)),
                    PropertyValue::Str(s) => s.parse::<i128>().ok(),
                    _ => None,
                };
                match parsed {
                    Some(v) if (*min..=*max).contains(&v) => Ok(()),
                    Some(_) => Err(format!("out of range {} - {}", min, max)),
                    None => Err("expected an integer".to_string()),
                }
            }

            (PropertyKind::Float, PropertyValue::Int(_)) => Ok(()),
            (PropertyKind::Float, PropertyValue::Str(s)) if s.parse::<f64>().is_ok() => Ok(()),
            (PropertyKind::Float, _) => Err("expected a number".to_string()),

            (PropertyKind::Enum(values), value) => {
                let known = match value {
                    PropertyValue::Int(v) => values.iter().any(|(n, _)| n == v),
                    PropertyValue::Str(s) => values
                        .iter()
                        .any(|(n, nick)| nick.as_str() == &**s || s.parse::<i64>().ok() == Some(*n)),
                    _ => false,
                };
                if known {
                    Ok(())
                } else {
                    let nicks: Vec<&str> = values.iter().map(|(_, nick)| nick.as_str()).collect();
                    Err(format!("expected one of: {}", nicks.join(", ")))
                }
            }

            (PropertyKind::Caps, PropertyValue::Caps(_) | PropertyValue::Str(_)) => Ok(()),
            (PropertyKind::Caps, _) => Err("expected caps".to_string()),

            (PropertyKind::String | PropertyKind::Other, _) => Ok(()),
        }
    }
}

/// What `gst-inspect-1.0 <factory>` says about one factory.
///
/// `None` formats mean the direction is unconstrained (`ANY` caps or no
/// pad template at all).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementInfo {
    pub src_formats: Option<Vec<MediaFormat>>,
    pub sink_formats: Option<Vec<MediaFormat>>,
    pub properties: Vec<PropertySpec>,
}

impl ElementInfo {
    pub fn property(&self, name: &str) -> Option<&PropertySpec> {
        self.properties.iter().find(|p| p.name == name)
    }
}

type InfoCache = HashMap<String, Option<Arc<ElementInfo>>>;

/// Cached answers from `gst-inspect-1.0`.
///
/// A cached `None` means the factory is not installed.
#[derive(Debug, Default)]
pub struct ElementInspector {
    program: Option<String>,
    cache: Mutex<InfoCache>,
}

impl ElementInspector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different inspect binary (tests, non-standard installs).
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: Some(program.into()),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Seed the cache with an already captured report for `factory`.
    pub fn with_report(mut self, factory: &str, report: &str) -> Self {
        let info = Arc::new(parse_element_info(report));
        if let Ok(cache) = self.cache.get_mut() {
            cache.insert(factory.to_string(), Some(info));
        }
        self
    }

    fn program(&self) -> &str {
        self.program.as_deref().unwrap_or(INSPECT_PROGRAM)
    }

    /// Pad formats and property types of `factory`, or `None` when it is not
    /// installed.
    pub fn element(&self, factory: &str) -> Result<Option<Arc<ElementInfo>>, EngineError> {
        if let Some(cached) = self.lock_cache()?.get(factory) {
            return Ok(cached.clone());
        }

        let output = Command::new(self.program())
            .arg(factory)
            .env("GST_INSPECT_NO_COLORS", "1")
            .output()
            .map_err(|e| {
                EngineError::Unavailable(format!("{} could not be run: {}", self.program(), e))
            })?;

        let entry = if output.status.success() {
            let report = String::from_utf8_lossy(&output.stdout);
            let info = parse_element_info(&report);
            debug!(factory, properties = info.properties.len(), "inspected element");
            Some(Arc::new(info))
        } else {
            debug!(factory, "element factory not found");
            None
        };

        self.lock_cache()?.insert(factory.to_string(), entry.clone());
        Ok(entry)
    }

    pub fn factory_exists(&self, factory: &str) -> Result<bool, EngineError> {
        Ok(self.element(factory)?.is_some())
    }

    fn lock_cache(&self) -> Result<MutexGuard<'_, InfoCache>, EngineError> {
        self.cache
            .lock()
            .map_err(|_| EngineError::Unavailable("inspector cache poisoned".to_string()))
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Other,
    PadTemplates,
    Properties,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Direction {
    Src,
    Sink,
}

#[derive(Default)]
struct FormatSet {
    formats: Vec<MediaFormat>,
    any: bool,
}

impl FormatSet {
    fn finish(self) -> Option<Vec<MediaFormat>> {
        if self.any || self.formats.is_empty() {
            None
        } else {
            Some(self.formats)
        }
    }
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

/// Parse a `gst-inspect-1.0 <factory>` report.
pub fn parse_element_info(report: &str) -> ElementInfo {
    let mut section = Section::Other;
    let mut src = FormatSet::default();
    let mut sink = FormatSet::default();
    let mut properties: Vec<PropertySpec> = Vec::new();

    // Pad template state
    let mut direction: Option<Direction> = None;
    let mut caps_indent: Option<usize> = None;
    let mut in_caps = false;

    // Property state: type line is read once the flags line has been seen
    let mut seen_flags = false;
    let mut typed = false;

    for line in report.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let indent = indent_of(line);
        if indent == 0 {
            section = match trimmed {
                "Pad Templates:" => Section::PadTemplates,
                "Element Properties:" => Section::Properties,
                _ => Section::Other,
            };
            continue;
        }

        match section {
            Section::Other => {}
            Section::PadTemplates => {
                if trimmed.starts_with("SRC template") {
                    direction = Some(Direction::Src);
                    in_caps = false;
                } else if trimmed.starts_with("SINK template") {
                    direction = Some(Direction::Sink);
                    in_caps = false;
                } else if trimmed == "Capabilities:" {
                    in_caps = true;
                    caps_indent = None;
                } else if in_caps {
                    let base = *caps_indent.get_or_insert(indent);
                    if indent < base {
                        in_caps = false;
                        continue;
                    }
                    if indent > base {
                        continue;
                    }
                    let set = match direction {
                        Some(Direction::Src) => &mut src,
                        Some(Direction::Sink) => &mut sink,
                        None => continue,
                    };
                    match trimmed {
                        "ANY" => set.any = true,
                        "EMPTY" => {}
                        other => set.formats.push(MediaFormat::parse(other)),
                    }
                }
            }
            Section::Properties => {
                if indent <= 2 {
                    if let Some((name, _)) = trimmed.split_once(':') {
                        let name = name.trim();
                        if !name.is_empty() && !name.contains(' ') {
                            properties.push(PropertySpec {
                                name: name.to_string(),
                                kind: PropertyKind::Other,
                            });
                            seen_flags = false;
                            typed = false;
                        }
                    }
                    continue;
                }

                let Some(current) = properties.last_mut() else {
                    continue;
                };
                if trimmed.starts_with("flags:") {
                    seen_flags = true;
                } else if seen_flags && !typed {
                    current.kind = parse_kind(trimmed);
                    typed = true;
                } else if let PropertyKind::Enum(values) = &mut current.kind {
                    if let Some(value) = parse_enum_value(trimmed) {
                        values.push(value);
                    }
                }
            }
        }
    }

    ElementInfo {
        src_formats: src.finish(),
        sink_formats: sink.finish(),
        properties,
    }
}

fn parse_kind(line: &str) -> PropertyKind {
    if line.starts_with("Boolean") {
        PropertyKind::Boolean
    } else if line.starts_with("Enum") {
        PropertyKind::Enum(Vec::new())
    } else if line.starts_with("String") {
        PropertyKind::String
    } else if line.starts_with("Caps") {
        PropertyKind::Caps
    } else if line.starts_with("Float") || line.starts_with("Double") {
        PropertyKind::Float
    } else if ["Integer", "Unsigned Integer", "Long", "Unsigned Long"]
        .iter()
        .any(|prefix| line.starts_with(prefix))
    {
        parse_range(line).unwrap_or(PropertyKind::Other)
    } else {
        PropertyKind::Other
    }
}

/// `Integer. Range: -1 - 2147483647 Default: 0`
fn parse_range(line: &str) -> Option<PropertyKind> {
    let (_, rest) = line.split_once("Range:")?;
    let (min, rest) = rest.trim().split_once(" - ")?;
    let max = rest.split_whitespace().next()?;
    Some(PropertyKind::Integer {
        min: min.trim().parse().ok()?,
        max: max.parse().ok()?,
    })
}

/// `(2): downstream       - Leaky on downstream (old buffers)`
fn parse_enum_value(line: &str) -> Option<(i64, String)> {
    let (value, rest) = line.strip_prefix('(')?.split_once("):")?;
    let nick = rest.split_whitespace().next()?;
    Some((value.trim().parse().ok()?, nick.to_string()))
}
