use crate::layout::routing::{DEFAULT_CORNER_RADIUS, DEFAULT_LEAD_LENGTH};
use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    pub lead_length: f32,
    pub corner_radius: f32,
    /// Closeness to a group edge that triggers side fallback. `None` uses `lead_length`.
    pub group_margin: Option<f32>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            lead_length: DEFAULT_LEAD_LENGTH,
            corner_radius: DEFAULT_CORNER_RADIUS,
            group_margin: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewportConfig {
    /// Bounds for programmatic `set_scale`.
    pub min_scale: f32,
    pub max_scale: f32,
    /// Bounds for interactive wheel zoom.
    pub zoom_min: f32,
    pub zoom_max: f32,
    pub zoom_in_factor: f32,
    pub zoom_out_factor: f32,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            min_scale: 0.1,
            max_scale: 10.0,
            zoom_min: 0.4,
            zoom_max: 2.5,
            zoom_in_factor: 1.1,
            zoom_out_factor: 0.9,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub width: f32,
    pub height: f32,
    pub background: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 2000.0,
            height: 1200.0,
            background: "#FFFFFF".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub theme: Theme,
    pub routing: RoutingConfig,
    pub viewport: ViewportConfig,
    pub render: RenderConfig,
}

impl Default for Config {
    fn default() -> Self {
        let theme = Theme::editor_default();
        let render = RenderConfig {
            background: theme.background.clone(),
            ..Default::default()
        };
        Self {
            theme,
            routing: RoutingConfig::default(),
            viewport: ViewportConfig::default(),
            render,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    font_family: Option<String>,
    font_size: Option<f32>,
    node_fill: Option<String>,
    node_border: Option<String>,
    node_text: Option<String>,
    disabled_fill: Option<String>,
    edge_color: Option<String>,
    edge_width: Option<f32>,
    group_fill: Option<String>,
    group_border: Option<String>,
    background: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoutingConfigFile {
    lead_length: Option<f32>,
    corner_radius: Option<f32>,
    group_margin: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ViewportConfigFile {
    min_scale: Option<f32>,
    max_scale: Option<f32>,
    zoom_min: Option<f32>,
    zoom_max: Option<f32>,
    zoom_in_factor: Option<f32>,
    zoom_out_factor: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenderConfigFile {
    width: Option<f32>,
    height: Option<f32>,
    background: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    routing: Option<RoutingConfigFile>,
    viewport: Option<ViewportConfigFile>,
    render: Option<RenderConfigFile>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let parsed: ConfigFile = serde_json::from_str(contents)?;

    if let Some(theme_name) = parsed.theme.as_deref() {
        if theme_name == "dark" {
            config.theme = Theme::dark();
        } else if theme_name == "default" || theme_name == "light" {
            config.theme = Theme::editor_default();
        }
        config.render.background = config.theme.background.clone();
    }

    if let Some(vars) = parsed.theme_variables {
        if let Some(v) = vars.font_family {
            config.theme.font_family = v;
        }
        if let Some(v) = vars.font_size {
            config.theme.font_size = v;
        }
        if let Some(v) = vars.node_fill {
            config.theme.node_fill = v;
        }
        if let Some(v) = vars.node_border {
            config.theme.node_border = v;
        }
        if let Some(v) = vars.node_text {
            config.theme.node_text = v;
        }
        if let Some(v) = vars.disabled_fill {
            config.theme.disabled_fill = v;
        }
        if let Some(v) = vars.edge_color {
            config.theme.edge_color = v;
        }
        if let Some(v) = vars.edge_width {
            config.theme.edge_width = v;
        }
        if let Some(v) = vars.group_fill {
            config.theme.group_fill = v;
        }
        if let Some(v) = vars.group_border {
            config.theme.group_border = v;
        }
        if let Some(v) = vars.background {
            config.render.background = v.clone();
            config.theme.background = v;
        }
    }

    if let Some(routing) = parsed.routing {
        if let Some(v) = routing.lead_length {
            config.routing.lead_length = v;
        }
        if let Some(v) = routing.corner_radius {
            config.routing.corner_radius = v;
        }
        if routing.group_margin.is_some() {
            config.routing.group_margin = routing.group_margin;
        }
    }

    if let Some(viewport) = parsed.viewport {
        if let Some(v) = viewport.min_scale {
            config.viewport.min_scale = v;
        }
        if let Some(v) = viewport.max_scale {
            config.viewport.max_scale = v;
        }
        if let Some(v) = viewport.zoom_min {
            config.viewport.zoom_min = v;
        }
        if let Some(v) = viewport.zoom_max {
            config.viewport.zoom_max = v;
        }
        if let Some(v) = viewport.zoom_in_factor {
            config.viewport.zoom_in_factor = v;
        }
        if let Some(v) = viewport.zoom_out_factor {
            config.viewport.zoom_out_factor = v;
        }
    }

    if let Some(render) = parsed.render {
        if let Some(v) = render.width {
            config.render.width = v;
        }
        if let Some(v) = render.height {
            config.render.height = v;
        }
        if let Some(v) = render.background {
            config.render.background = v;
        }
    }

    Ok(config)
}
