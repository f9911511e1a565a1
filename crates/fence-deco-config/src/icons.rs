/// An icon usable in a code block header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Icon {
    pub id: String,
    /// `data:` URL of the image.
    pub data_url: String,
    /// Colored icons are shown as-is; monochrome ones are masked with the
    /// language color.
    pub is_colored: bool,
    /// CSS `background-size` value.
    pub background_size: String,
}

/// Source of header icons.
pub trait IconRegistry {
    fn icon(&self, id: &str) -> Option<&Icon>;
}

/// A fixed list of icons.
#[derive(Debug, Clone, Default)]
pub struct IconSet {
    icons: Vec<Icon>,
}

const CODE_SVG: &str = "<svg xmlns='http://www.w3.org/2000/svg' viewBox='0 0 24 24'><path d='M8 6l-6 6 6 6M16 6l6 6-6 6' fill='none' stroke='black' stroke-width='2'/></svg>";
const TERMINAL_SVG: &str = "<svg xmlns='http://www.w3.org/2000/svg' viewBox='0 0 24 24'><path d='M4 7l5 5-5 5M12 17h8' fill='none' stroke='black' stroke-width='2'/></svg>";
const FILE_SVG: &str = "<svg xmlns='http://www.w3.org/2000/svg' viewBox='0 0 24 24'><path d='M6 2h8l4 4v16H6z' fill='none' stroke='black' stroke-width='2'/></svg>";
const BRACES_SVG: &str = "<svg xmlns='http://www.w3.org/2000/svg' viewBox='0 0 24 24'><path d='M9 4c-3 0-3 2-3 4s-1 4-3 4c2 0 3 2 3 4s0 4 3 4M15 4c3 0 3 2 3 4s1 4 3 4c-2 0-3 2-3 4s0 4-3 4' fill='none' stroke='black' stroke-width='2'/></svg>";

impl IconSet {
    pub fn new(icons: Vec<Icon>) -> Self {
        Self { icons }
    }

    /// Monochrome outline icons referenced by the built-in language table.
    pub fn builtin() -> Self {
        let icons = [
            ("code", CODE_SVG),
            ("terminal", TERMINAL_SVG),
            ("file", FILE_SVG),
            ("braces", BRACES_SVG),
        ]
        .into_iter()
        .map(|(id, svg)| Icon {
            id: id.to_string(),
            data_url: svg_data_url(svg),
            is_colored: false,
            background_size: "contain".to_string(),
        })
        .collect();
        Self { icons }
    }

    pub fn push(&mut self, icon: Icon) {
        self.icons.retain(|i| i.id != icon.id);
        self.icons.push(icon);
    }
}

impl IconRegistry for IconSet {
    fn icon(&self, id: &str) -> Option<&Icon> {
        self.icons.iter().find(|i| i.id == id)
    }
}

fn svg_data_url(svg: &str) -> String {
    let mut out = String::from("data:image/svg+xml,");
    for ch in svg.chars() {
        match ch {
            '<' => out.push_str("%3C"),
            '>' => out.push_str("%3E"),
            '#' => out.push_str("%23"),
            '"' => out.push_str("%22"),
            _ => out.push(ch),
        }
    }
    out
}
