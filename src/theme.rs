use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub font_size: f32,
    pub node_fill: String,
    pub node_border: String,
    pub node_text: String,
    pub question_fill: String,
    pub disabled_fill: String,
    pub tag_color: String,
    pub edge_color: String,
    pub edge_width: f32,
    pub edge_label_color: String,
    pub group_fill: String,
    pub group_border: String,
    pub handle_color: String,
    pub background: String,
}

impl Theme {
    pub fn editor_default() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            font_size: 13.0,
            node_fill: "#1E3A8A".to_string(),
            node_border: "#1E40AF".to_string(),
            node_text: "#FFFFFF".to_string(),
            question_fill: "#312E81".to_string(),
            disabled_fill: "#94A3B8".to_string(),
            tag_color: "#BFDBFE".to_string(),
            edge_color: "#3B82F6".to_string(),
            edge_width: 2.0,
            edge_label_color: "#000000".to_string(),
            group_fill: "#F7FAFF".to_string(),
            group_border: "#D7E0F0".to_string(),
            handle_color: "#2563EB".to_string(),
            background: "#FFFFFF".to_string(),
        }
    }

    pub fn dark() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            font_size: 13.0,
            node_fill: "#1F2937".to_string(),
            node_border: "#4B5563".to_string(),
            node_text: "#F9FAFB".to_string(),
            question_fill: "#3730A3".to_string(),
            disabled_fill: "#374151".to_string(),
            tag_color: "#93C5FD".to_string(),
            edge_color: "#60A5FA".to_string(),
            edge_width: 2.0,
            edge_label_color: "#E5E7EB".to_string(),
            group_fill: "#111827".to_string(),
            group_border: "#374151".to_string(),
            handle_color: "#93C5FD".to_string(),
            background: "#030712".to_string(),
        }
    }
}
