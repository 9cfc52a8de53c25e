//! Reply rendering.
//!
//! Replies are Markdown. Styled output goes through a `termimad` skin and is
//! formatted in full before anything is written. If the terminal refuses the
//! styled text before taking any of it, the reply is written again unstyled.

use std::fmt;
use std::io::Write;
use std::str::FromStr;

use termimad::MadSkin;

use crate::error::ChatError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderStyle {
    #[default]
    Dark,
    Light,
    /// No colors or attributes, Markdown layout only.
    Ascii,
}

impl FromStr for RenderStyle {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dark" => Ok(RenderStyle::Dark),
            "light" => Ok(RenderStyle::Light),
            "ascii" | "notty" => Ok(RenderStyle::Ascii),
            _ => Err(ChatError::UnsupportedStyle(s.to_string())),
        }
    }
}

impl fmt::Display for RenderStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RenderStyle::Dark => "dark",
            RenderStyle::Light => "light",
            RenderStyle::Ascii => "ascii",
        })
    }
}

pub struct Renderer {
    /// `None` prints replies verbatim.
    skin: Option<MadSkin>,
}

impl Renderer {
    pub fn new(style: RenderStyle, plain: bool) -> Self {
        let skin = (!plain).then(|| match style {
            RenderStyle::Dark => MadSkin::default_dark(),
            RenderStyle::Light => MadSkin::default_light(),
            RenderStyle::Ascii => MadSkin::no_style(),
        });
        Self { skin }
    }

    pub fn render(&self, w: &mut impl Write, text: &str) -> std::io::Result<()> {
        if let Some(skin) = &self.skin {
            let styled = skin.term_text(text).to_string();
            match w.write(styled.as_bytes()) {
                // Once any styled bytes are out, finish them; a plain copy would repeat them.
                Ok(n) => {
                    w.write_all(&styled.as_bytes()[n..])?;
                    return w.flush();
                }
                Err(e) => tracing::warn!(error = %e, "styled render failed, falling back to plain text"),
            }
        }
        writeln!(w, "{text}")?;
        w.flush()
    }
}
