//! Render styles for graph nodes.
//!
//! The front end keys its legend on these exact values.

use super::EntityKind;

/// Visual attributes of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeStyle {
    pub shape: &'static str,
    pub size: u32,
    pub color: &'static str,
    pub border: &'static str,
    pub highlight: &'static str,
    pub highlight_border: &'static str,
}

const fn dot(
    size: u32,
    color: &'static str,
    border: &'static str,
    highlight: &'static str,
    highlight_border: &'static str,
) -> NodeStyle {
    NodeStyle {
        shape: "dot",
        size,
        color,
        border,
        highlight,
        highlight_border,
    }
}

const INDICATOR: NodeStyle = dot(10, "#00CCFF", "#007A99", "#66E0FF", "#00CCFF");
const EVENT: NodeStyle = dot(35, "#00FF00", "#009900", "#66FF66", "#00FF00");
const SAMPLE: NodeStyle = dot(25, "#FF6666", "#993D3D", "#FFA3A3", "#FF6666");
const EMAIL: NodeStyle = dot(25, "#CC66FF", "#7A3D99", "#E0A3FF", "#CC66FF");
const DOMAIN: NodeStyle = dot(20, "#FF9933", "#995C1F", "#FFC285", "#FF9933");
const IP: NodeStyle = dot(20, "#FFFF66", "#99993D", "#FFFFA3", "#FFFF66");

impl EntityKind {
    pub fn style(self) -> NodeStyle {
        match self {
            EntityKind::Indicator => INDICATOR,
            EntityKind::Event => EVENT,
            EntityKind::Sample => SAMPLE,
            EntityKind::Email => EMAIL,
            EntityKind::Domain => DOMAIN,
            EntityKind::Ip => IP,
        }
    }
}

/// Escape a label for the renderer: backslashes are doubled.
pub fn escape_label(label: &str) -> String {
    label.replace('\\', "\\\\")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_table() {
        let expected = [
            (EntityKind::Indicator, 10, "#00CCFF", "#007A99", "#66E0FF", "#00CCFF"),
            (EntityKind::Event, 35, "#00FF00", "#009900", "#66FF66", "#00FF00"),
            (EntityKind::Sample, 25, "#FF6666", "#993D3D", "#FFA3A3", "#FF6666"),
            (EntityKind::Email, 25, "#CC66FF", "#7A3D99", "#E0A3FF", "#CC66FF"),
            (EntityKind::Domain, 20, "#FF9933", "#995C1F", "#FFC285", "#FF9933"),
            (EntityKind::Ip, 20, "#FFFF66", "#99993D", "#FFFFA3", "#FFFF66"),
        ];
        for (kind, size, color, border, highlight, highlight_border) in expected {
            let style = kind.style();
            assert_eq!(style.shape, "dot", "{kind}");
            assert_eq!(style.size, size, "{kind}");
            assert_eq!(style.color, color, "{kind}");
            assert_eq!(style.border, border, "{kind}");
            assert_eq!(style.highlight, highlight, "{kind}");
            assert_eq!(style.highlight_border, highlight_border, "{kind}");
        }
    }

    #[test]
    fn test_escape_label() {
        assert_eq!(escape_label(r"C:\Windows\evil.exe"), r"C:\\Windows\\evil.exe");
        assert_eq!(escape_label("plain.example"), "plain.example");
        assert_eq!(escape_label(r"\\"), r"\\\\");
    }
}
