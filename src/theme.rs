use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub font_size: f32,
    pub background: String,
    pub card_background: String,
    pub name_color: String,
    pub title_color: String,
    pub reports_color: String,
    pub border_color: String,
    pub highlight_color: String,
    pub line_color: String,
    pub link_icon_color: String,
}

impl Theme {
    pub fn classic() -> Self {
        Self {
            font_family: "Helvetica, Arial, sans-serif".to_string(),
            font_size: 16.0,
            background: "#FFFFFF".to_string(),
            card_background: "#FFFFFF".to_string(),
            name_color: "#222D38".to_string(),
            title_color: "#617080".to_string(),
            reports_color: "#92A0AD".to_string(),
            border_color: "#E6E8E9".to_string(),
            highlight_color: "#1FA3F1".to_string(),
            line_color: "#A9B2BA".to_string(),
            link_icon_color: "#617080".to_string(),
        }
    }

    pub fn modern() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            font_size: 15.0,
            background: "#F7FAFF".to_string(),
            card_background: "#FFFFFF".to_string(),
            name_color: "#1C2430".to_string(),
            title_color: "#4A5A70".to_string(),
            reports_color: "#7A8AA6".to_string(),
            border_color: "#C7D2E5".to_string(),
            highlight_color: "#3B82F6".to_string(),
            line_color: "#7A8AA6".to_string(),
            link_icon_color: "#4A5A70".to_string(),
        }
    }

    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "classic" | "default" => Some(Self::classic()),
            "modern" => Some(Self::modern()),
            _ => None,
        }
    }
}
