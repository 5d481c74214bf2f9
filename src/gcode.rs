// src/gcode.rs - Minimal view of a sent G-code line
//
// Only what the send-path observers need: the command word and its
// parameter words. Line numbers, checksums and comments are dropped.

#[derive(Debug, Clone, PartialEq)]
pub struct SentCommand<'a> {
    pub code: String,
    pub params: Vec<&'a str>,
}

impl<'a> SentCommand<'a> {
    pub fn parse(line: &'a str) -> Option<Self> {
        let code = line.split(';').next().unwrap_or("");
        let code = code.split('*').next().unwrap_or("");
        let mut tokens = code
            .split_whitespace()
            .filter(|t| !t.starts_with('N') && !t.starts_with('n'));
        let command = tokens.next()?;
        Some(Self {
            code: command.to_ascii_uppercase(),
            params: tokens.collect(),
        })
    }

    /// Numeric value of a parameter word such as `E1.5`.
    pub fn word(&self, letter: char) -> Option<f64> {
        self.params.iter().find_map(|p| {
            let mut chars = p.chars();
            let first = chars.next()?;
            if first.eq_ignore_ascii_case(&letter) {
                chars.as_str().parse().ok()
            } else {
                None
            }
        })
    }
}
