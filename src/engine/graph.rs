//! Stage graph model shared by the compiler, the materializer and the
//! command renderer.
//!
//! A [`PipelineGraph`] is a strictly linear chain: stage `i` links to stage
//! `i + 1`. The same graph is either fed to a media engine or rendered as a
//! `gst-launch-1.0` command for display.

use serde::Serialize;
use std::borrow::Cow;
use std::fmt;

use super::error::GraphError;

/// Which of the two independent pipelines a graph or event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Branch {
    Video,
    Audio,
}

impl Branch {
    pub fn as_str(&self) -> &'static str {
        match self {
            Branch::Video => "video",
            Branch::Audio => "audio",
        }
    }

    /// Name given to the engine-side pipeline container.
    pub fn pipeline_name(&self) -> String {
        format!("{}-pipeline", self.as_str())
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a stage does in the chain, independent of the engine factory used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageRole {
    Source,
    Scale,
    RateConvert,
    FormatConvert,
    CapsFilter,
    Queue,
    Encoder,
    Parser,
    Payloader,
    Resample,
    Sink,
}

impl StageRole {
    pub fn token(&self) -> &'static str {
        match self {
            StageRole::Source => "source",
            StageRole::Scale => "scale",
            StageRole::RateConvert => "rate-convert",
            StageRole::FormatConvert => "format-convert",
            StageRole::CapsFilter => "caps-filter",
            StageRole::Queue => "queue",
            StageRole::Encoder => "encoder",
            StageRole::Parser => "parser",
            StageRole::Payloader => "payloader",
            StageRole::Resample => "resample",
            StageRole::Sink => "sink",
        }
    }
}

impl fmt::Display for StageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// A single value inside a caps structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CapsValue {
    Int(i64),
    Fraction(i64, i64),
    Text(String),
}

impl fmt::Display for CapsValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapsValue::Int(v) => write!(f, "{}", v),
            CapsValue::Fraction(n, d) => write!(f, "{}/{}", n, d),
            CapsValue::Text(s) => f.write_str(s),
        }
    }
}

/// Media format description carried by a caps filter.
///
/// Fields keep insertion order so the rendered string is stable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Caps {
    pub media_type: &'static str,
    pub features: Option<&'static str>,
    pub fields: Vec<(&'static str, CapsValue)>,
}

impl Caps {
    pub fn new(media_type: &'static str) -> Self {
        Self {
            media_type,
            features: None,
            fields: Vec::new(),
        }
    }

    /// Restrict the caps to a memory feature such as `memory:NVMM`.
    pub fn with_features(mut self, features: &'static str) -> Self {
        self.features = Some(features);
        self
    }

    pub fn int(mut self, name: &'static str, value: i64) -> Self {
        self.fields.push((name, CapsValue::Int(value)));
        self
    }

    pub fn fraction(mut self, name: &'static str, num: i64, den: i64) -> Self {
        self.fields.push((name, CapsValue::Fraction(num, den)));
        self
    }

    pub fn text(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.fields.push((name, CapsValue::Text(value.into())));
        self
    }

    pub fn field(&self, name: &str) -> Option<&CapsValue> {
        self.fields
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value)
    }
}

impl fmt::Display for Caps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.media_type)?;
        if let Some(features) = self.features {
            write!(f, "({})", features)?;
        }
        for (name, value) in &self.fields {
            write!(f, ",{}={}", name, value)?;
        }
        Ok(())
    }
}

/// Typed stage property value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Str(Cow<'static, str>),
    Int(i64),
    Bool(bool),
    Caps(Caps),
}

impl PropertyValue {
    /// Const constructor for string values in static rule tables.
    pub const fn text(value: &'static str) -> Self {
        PropertyValue::Str(Cow::Borrowed(value))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            PropertyValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_caps(&self) -> Option<&Caps> {
        match self {
            PropertyValue::Caps(c) => Some(c),
            _ => None,
        }
    }

    /// Value in `gst-launch-1.0` syntax, quoted when the parser needs it.
    pub fn to_launch_value(&self) -> String {
        let raw = self.to_string();
        if raw.is_empty() || raw.contains(|c: char| c.is_whitespace() || c == '!' || c == '"') {
            format!("\"{}\"", raw.replace('\\', "\\\\").replace('"', "\\\""))
        } else {
            raw
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Str(s) => f.write_str(s),
            PropertyValue::Int(v) => write!(f, "{}", v),
            PropertyValue::Bool(v) => write!(f, "{}", v),
            PropertyValue::Caps(c) => write!(f, "{}", c),
        }
    }
}

impl From<&'static str> for PropertyValue {
    fn from(value: &'static str) -> Self {
        PropertyValue::Str(Cow::Borrowed(value))
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Str(Cow::Owned(value))
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Int(value)
    }
}

impl From<i32> for PropertyValue {
    fn from(value: i32) -> Self {
        PropertyValue::Int(i64::from(value))
    }
}

impl From<u32> for PropertyValue {
    fn from(value: u32) -> Self {
        PropertyValue::Int(i64::from(value))
    }
}

impl From<u16> for PropertyValue {
    fn from(value: u16) -> Self {
        PropertyValue::Int(i64::from(value))
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

impl From<Caps> for PropertyValue {
    fn from(value: Caps) -> Self {
        PropertyValue::Caps(value)
    }
}

/// One node of a pipeline graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageSpec {
    pub role: StageRole,
    pub factory: &'static str,
    pub properties: Vec<(&'static str, PropertyValue)>,
}

impl StageSpec {
    pub fn new(role: StageRole, factory: &'static str) -> Self {
        Self {
            role,
            factory,
            properties: Vec::new(),
        }
    }

    /// A `capsfilter` stage fixing the given caps.
    pub fn caps_filter(caps: Caps) -> Self {
        Self::new(StageRole::CapsFilter, "capsfilter").with("caps", caps)
    }

    pub fn with(mut self, name: &'static str, value: impl Into<PropertyValue>) -> Self {
        self.properties.push((name, value.into()));
        self
    }

    /// Append several properties in order.
    pub fn with_all(mut self, properties: &[(&'static str, PropertyValue)]) -> Self {
        self.properties.extend(properties.iter().cloned());
        self
    }

    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value)
    }

    /// Tokens for this stage in `gst-launch-1.0` syntax. A caps filter is
    /// written in the bare-caps shorthand.
    pub fn launch_tokens(&self) -> Vec<String> {
        if self.role == StageRole::CapsFilter && self.properties.len() == 1 {
            if let Some(caps) = self.property("caps").and_then(PropertyValue::as_caps) {
                return vec![caps.to_string()];
            }
        }

        let mut tokens = Vec::with_capacity(self.properties.len() + 1);
        tokens.push(self.factory.to_string());
        for (name, value) in &self.properties {
            tokens.push(format!("{}={}", name, value.to_launch_value()));
        }
        tokens
    }
}

/// An ordered, linear, validated stage sequence for one branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineGraph {
    branch: Branch,
    stages: Vec<StageSpec>,
}

impl PipelineGraph {
    /// Build a graph, checking it starts with exactly one source and ends
    /// with exactly one sink.
    pub fn new(branch: Branch, stages: Vec<StageSpec>) -> Result<Self, GraphError> {
        let (first, last) = match (stages.first(), stages.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Err(GraphError::Empty(branch)),
        };

        if first.role != StageRole::Source {
            return Err(GraphError::MissingSource {
                branch,
                found: first.factory.to_string(),
            });
        }
        if last.role != StageRole::Sink || stages.len() < 2 {
            return Err(GraphError::MissingSink {
                branch,
                found: last.factory.to_string(),
            });
        }

        let inner = &stages[1..stages.len() - 1];
        if let Some((index, stage)) = inner
            .iter()
            .enumerate()
            .find(|(_, s)| matches!(s.role, StageRole::Source | StageRole::Sink))
        {
            return Err(GraphError::MisplacedTerminal {
                branch,
                role: stage.role.token(),
                index: index + 1,
            });
        }

        Ok(Self { branch, stages })
    }

    pub fn branch(&self) -> Branch {
        self.branch
    }

    pub fn stages(&self) -> &[StageSpec] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn factories(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.factory).collect()
    }

    pub fn roles(&self) -> Vec<StageRole> {
        self.stages.iter().map(|s| s.role).collect()
    }

    pub fn source(&self) -> &StageSpec {
        &self.stages[0]
    }

    pub fn sink(&self) -> &StageSpec {
        &self.stages[self.stages.len() - 1]
    }

    /// First stage with the given role.
    pub fn find(&self, role: StageRole) -> Option<&StageSpec> {
        self.stages.iter().find(|s| s.role == role)
    }

    pub fn position(&self, role: StageRole) -> Option<usize> {
        self.stages.iter().position(|s| s.role == role)
    }

    /// Full `gst-launch-1.0` argument list (without the program name),
    /// stages separated by `!`.
    pub fn launch_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        for (i, stage) in self.stages.iter().enumerate() {
            if i > 0 {
                args.push("!".to_string());
            }
            args.extend(stage.launch_tokens());
        }
        args
    }

    /// Single-line pipeline description, as accepted by `gst_parse_launch`.
    pub fn launch_line(&self) -> String {
        self.launch_args().join(" ")
    }

    /// Copy-pasteable shell command reproducing this pipeline.
    pub fn launch_command(&self) -> String {
        let chunks: Vec<String> = self
            .stages
            .iter()
            .map(|stage| {
                stage
                    .launch_tokens()
                    .iter()
                    .map(|token| shell_quote(token))
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect();

        format!(
            "GST_DEBUG=2 gst-launch-1.0 -v -e {}",
            chunks.join(" ! \\\n    ")
        )
    }
}

fn shell_quote(token: &str) -> String {
    match shlex::try_quote(token) {
        Ok(quoted) => quoted.into_owned(),
        Err(_) => format!("'{}'", token.replace('\0', "")),
    }
}
