use std::collections::BTreeMap;

/// Key of the expression that selects a sub-voicebank by color.
pub const VOICE_COLOR_KEY: &str = "clr";

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpressionKind {
    Numerical,
    Options,
    Curve,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ExpressionDescriptor {
    pub name: String,
    pub abbr: String,
    #[serde(rename = "type")]
    pub kind: ExpressionKind,
    pub min: f32,
    pub max: f32,
    pub default_value: f32,
    #[serde(default)]
    pub is_flag: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flag: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

impl ExpressionDescriptor {
    pub fn numerical(name: &str, abbr: &str, min: f32, max: f32, default_value: f32) -> Self {
        Self {
            name: name.into(),
            abbr: abbr.into(),
            kind: ExpressionKind::Numerical,
            min,
            max,
            default_value,
            is_flag: false,
            flag: None,
            options: Vec::new(),
        }
    }

    pub fn curve(name: &str, abbr: &str, min: f32, max: f32, default_value: f32) -> Self {
        Self {
            kind: ExpressionKind::Curve,
            ..Self::numerical(name, abbr, min, max, default_value)
        }
    }

    pub fn options(name: &str, abbr: &str, options: Vec<String>) -> Self {
        let mut this = Self {
            kind: ExpressionKind::Options,
            ..Self::numerical(name, abbr, 0.0, 0.0, 0.0)
        };
        this.set_options(options);
        this
    }

    /// `max` is always the last valid option index, so an empty list leaves it at -1.
    pub fn set_options(&mut self, options: Vec<String>) {
        self.max = options.len() as f32 - 1.0;
        self.options = options;
    }

    pub fn with_options(&self, options: Vec<String>) -> Self {
        let mut this = self.clone();
        this.set_options(options);
        this
    }
}

/// Project-wide expression descriptors, keyed by abbreviation.
pub type ExpressionTable = BTreeMap<String, ExpressionDescriptor>;

/// The descriptors every new project starts out with.
pub fn default_expressions() -> ExpressionTable {
    [
        ExpressionDescriptor::numerical("velocity", "vel", 0.0, 200.0, 100.0),
        ExpressionDescriptor::numerical("volume", "vol", 0.0, 200.0, 100.0),
        ExpressionDescriptor::numerical("attack", "atk", 0.0, 200.0, 100.0),
        ExpressionDescriptor::numerical("decay", "dec", 0.0, 100.0, 0.0),
        ExpressionDescriptor::curve("pitch deviation", "pitd", -1200.0, 1200.0, 0.0),
        ExpressionDescriptor::curve("breathiness", "bre", 0.0, 100.0, 0.0),
        ExpressionDescriptor::curve("gender", "gen", -100.0, 100.0, 0.0),
        ExpressionDescriptor::options("voice color", VOICE_COLOR_KEY, Vec::new()),
    ]
    .into_iter()
    .map(|descriptor| (descriptor.abbr.clone(), descriptor))
    .collect()
}
