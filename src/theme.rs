use ratatui::style::Color;

/// A named color scheme. Switching schemes produces a new value; nothing global changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub name: &'static str,
    pub bg: Color,
    pub sidebar: Color,
    pub selection: Color,
    pub cursor: Color,
    pub accent: Color,
    pub dim: Color,
    pub text: Color,
    pub header: Color,
    pub border: Color,
    pub done: Color,
    pub info: Color,
    pub warn: Color,
    pub danger: Color,
}

const fn rgb(hex: u32) -> Color {
    Color::Rgb((hex >> 16) as u8, (hex >> 8) as u8, hex as u8)
}

const WARN: Color = rgb(0xe5c07b);
const DANGER: Color = rgb(0xe06c75);

const SCHEMES: [Theme; 5] = [
    Theme {
        name: "black",
        bg: rgb(0x0a0a0a),
        sidebar: rgb(0x0d0d0d),
        selection: rgb(0x1a1a1a),
        cursor: rgb(0x242424),
        accent: rgb(0x9aa3a8),
        dim: rgb(0x5b5f63),
        text: rgb(0xc0c5c8),
        header: rgb(0xb5babf),
        border: rgb(0x151515),
        done: rgb(0x3b3b3b),
        info: rgb(0x2a2a2a),
        warn: WARN,
        danger: DANGER,
    },
    Theme {
        name: "copper",
        bg: rgb(0x11110f),
        sidebar: rgb(0x14120f),
        selection: rgb(0x2a1f16),
        cursor: rgb(0x3a2c20),
        accent: rgb(0xc58b5a),
        dim: rgb(0x6f6256),
        text: rgb(0xb9ab9d),
        header: rgb(0xd3a57a),
        border: rgb(0x1f1a14),
        done: rgb(0x4d3f33),
        info: rgb(0x3a2b20),
        warn: WARN,
        danger: DANGER,
    },
    Theme {
        name: "seafoam",
        bg: rgb(0x0a1214),
        sidebar: rgb(0x0b1518),
        selection: rgb(0x16262b),
        cursor: rgb(0x20343a),
        accent: rgb(0x70c0b6),
        dim: rgb(0x5d7274),
        text: rgb(0xa7b6b6),
        header: rgb(0x88c9c0),
        border: rgb(0x162126),
        done: rgb(0x3f4d52),
        info: rgb(0x203237),
        warn: WARN,
        danger: DANGER,
    },
    Theme {
        name: "forest",
        bg: rgb(0x0c120f),
        sidebar: rgb(0x0e1512),
        selection: rgb(0x1a251f),
        cursor: rgb(0x243126),
        accent: rgb(0x7fa879),
        dim: rgb(0x5f6d60),
        text: rgb(0xaab3a7),
        header: rgb(0x93b98c),
        border: rgb(0x172019),
        done: rgb(0x3f4b41),
        info: rgb(0x27352b),
        warn: WARN,
        danger: DANGER,
    },
    Theme {
        name: "slate",
        bg: rgb(0x0b0f14),
        sidebar: rgb(0x0e131a),
        selection: rgb(0x1a2430),
        cursor: rgb(0x243242),
        accent: rgb(0x87a2c2),
        dim: rgb(0x5a6676),
        text: rgb(0xa4afbd),
        header: rgb(0x98b4d1),
        border: rgb(0x16202a),
        done: rgb(0x3c4654),
        info: rgb(0x243244),
        warn: WARN,
        danger: DANGER,
    },
];

impl Theme {
    pub fn named(name: &str) -> Option<Theme> {
        SCHEMES.iter().copied().find(|scheme| scheme.name == name)
    }

    pub fn names() -> Vec<&'static str> {
        SCHEMES.iter().map(|scheme| scheme.name).collect()
    }
}

impl Default for Theme {
    fn default() -> Self {
        SCHEMES[0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schemes_are_looked_up_by_exact_name() {
        assert_eq!(Theme::default().name, "black");
        assert_eq!(Theme::named("forest").map(|t| t.accent), Some(rgb(0x7fa879)));
        assert!(Theme::named("Forest").is_none());
        assert_eq!(Theme::names(), vec!["black", "copper", "seafoam", "forest", "slate"]);
    }
}
