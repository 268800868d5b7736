use crate::config::RenderConfig;
use crate::layout::routing::PathCommand;
use crate::layout::{EdgeLayout, HandleKind, Layout, NodeLayout};
use crate::theme::Theme;
use anyhow::Result;
use std::path::Path;

const NODE_RADIUS: f32 = 8.0;
const PADDING: f32 = 24.0;

pub fn render_svg(layout: &Layout, theme: &Theme) -> String {
    let mut svg = String::new();
    let width = (layout.width + PADDING).max(200.0);
    let height = (layout.height + PADDING).max(200.0);

    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">",
    ));

    svg.push_str(&format!(
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        theme.background
    ));

    svg.push_str("<defs>");
    svg.push_str(&format!(
        "<marker id=\"arrow\" viewBox=\"0 0 10 10\" refX=\"10\" refY=\"5\" markerWidth=\"6\" markerHeight=\"6\" orient=\"auto-start-reverse\"><path d=\"M 0 0 L 10 5 L 0 10 z\" fill=\"{}\"/></marker>",
        theme.edge_color
    ));
    svg.push_str("</defs>");

    for group in &layout.groups {
        svg.push_str(&format!(
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"12\" ry=\"12\" fill=\"{}\" stroke=\"{}\" stroke-width=\"1.2\"/>",
            group.rect.x,
            group.rect.y,
            group.rect.w,
            group.rect.h,
            theme.group_fill,
            theme.group_border
        ));
        svg.push_str(&format!(
            "<text x=\"{:.2}\" y=\"{:.2}\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">{}</text>",
            group.rect.x + 12.0,
            group.rect.y + 18.0,
            theme.font_family,
            theme.font_size,
            theme.group_border,
            escape_xml(&group.label)
        ));
    }

    for edge in &layout.edges {
        svg.push_str(&edge_svg(edge, theme));
    }

    for node in &layout.nodes {
        svg.push_str(&node_svg(node, theme));
    }

    svg.push_str("</svg>");
    svg
}

fn edge_svg(edge: &EdgeLayout, theme: &Theme) -> String {
    if edge.route.is_degenerate() {
        return String::new();
    }
    let mut out = format!(
        "<path d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{}\" marker-end=\"url(#arrow)\"/>",
        commands_to_path(&edge.route.commands),
        theme.edge_color,
        theme.edge_width
    );
    if let (Some(label), Some(anchor)) = (&edge.edge.label, edge.label_anchor) {
        out.push_str(&format!(
            "<text x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"middle\" dy=\"-4\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">{}</text>",
            anchor.x,
            anchor.y,
            theme.font_family,
            theme.font_size - 1.0,
            theme.edge_label_color,
            escape_xml(label)
        ));
    }
    for handle in &edge.handles {
        let radius = match handle.kind {
            HandleKind::Waypoint { .. } => 5.0,
            HandleKind::Insert { .. } => 3.5,
        };
        out.push_str(&format!(
            "<circle cx=\"{:.2}\" cy=\"{:.2}\" r=\"{radius}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"1\"/>",
            handle.point.x, handle.point.y, theme.background, theme.handle_color
        ));
    }
    out
}

fn node_svg(node: &NodeLayout, theme: &Theme) -> String {
    if node.rect.is_empty() {
        return String::new();
    }
    let fill = if !node.enabled {
        &theme.disabled_fill
    } else if node.is_question {
        &theme.question_fill
    } else {
        &theme.node_fill
    };
    let mut out = format!(
        "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"{NODE_RADIUS}\" ry=\"{NODE_RADIUS}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"1.4\"/>",
        node.rect.x, node.rect.y, node.rect.w, node.rect.h, fill, theme.node_border
    );
    let center = node.rect.center();
    let (label_y, tag_y) = match node.tag {
        Some(_) => (center.y - 2.0, center.y + theme.font_size),
        None => (center.y + theme.font_size / 3.0, 0.0),
    };
    out.push_str(&format!(
        "<text x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">{}</text>",
        center.x,
        label_y,
        theme.font_family,
        theme.font_size,
        theme.node_text,
        escape_xml(&node.label)
    ));
    if let Some(tag) = &node.tag {
        out.push_str(&format!(
            "<text x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">{}</text>",
            center.x,
            tag_y,
            theme.font_family,
            theme.font_size - 2.0,
            theme.tag_color,
            escape_xml(tag)
        ));
    }
    out
}

/// SVG path data for a route.
pub fn commands_to_path(commands: &[PathCommand]) -> String {
    let mut d = String::new();
    for (idx, command) in commands.iter().enumerate() {
        if idx > 0 {
            d.push(' ');
        }
        match command {
            PathCommand::MoveTo(p) => d.push_str(&format!("M {:.2} {:.2}", p.x, p.y)),
            PathCommand::LineTo(p) => d.push_str(&format!("L {:.2} {:.2}", p.x, p.y)),
            PathCommand::QuadTo { control, to } => d.push_str(&format!(
                "Q {:.2} {:.2} {:.2} {:.2}",
                control.x, control.y, to.x, to.y
            )),
        }
    }
    d
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, render_cfg: &RenderConfig, theme: &Theme) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.font_family = theme
        .font_family
        .split(',')
        .next()
        .map(str::trim)
        .unwrap_or("Inter")
        .to_string();
    opt.default_size = usvg::Size::from_wh(render_cfg.width, render_cfg.height)
        .or_else(|| usvg::Size::from_wh(800.0, 600.0))
        .ok_or_else(|| anyhow::anyhow!("Invalid render size"))?;

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

#[cfg(not(feature = "png"))]
pub fn write_output_png(_svg: &str, _output: &Path, _render_cfg: &RenderConfig, _theme: &Theme) -> Result<()> {
    Err(anyhow::anyhow!("PNG output requires the `png` feature"))
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
