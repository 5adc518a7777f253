//! Minimal line-oriented INI reader
//!
//! Only what `config.ini` uses: `[section]` headers and `key=value` lines,
//! matched case-insensitively. Every lookup rescans from the top: find the
//! section header, then the key before the next header. Lookups only happen
//! at load time.

/// A parsed document, kept as trimmed lines
#[derive(Debug, Clone, Default)]
pub struct IniDocument {
    lines: Vec<String>,
}

impl IniDocument {
    pub fn parse(text: &str) -> Self {
        Self {
            lines: text.lines().map(|l| l.trim().to_string()).collect(),
        }
    }

    /// Whether a `[section]` header exists
    pub fn has_section(&self, section: &str) -> bool {
        self.section_start(section).is_some()
    }

    /// Value of `key` inside `[section]`
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        let start = self.section_start(section)?;

        for line in &self.lines[start..] {
            if section_name(line).is_some() {
                break;
            }
            if let Some((k, v)) = line.split_once('=') {
                if k.trim().eq_ignore_ascii_case(key) {
                    return Some(v.trim());
                }
            }
        }

        None
    }

    /// Index of the first line after the section header
    fn section_start(&self, section: &str) -> Option<usize> {
        self.lines
            .iter()
            .position(|line| section_name(line).is_some_and(|s| s.eq_ignore_ascii_case(section)))
            .map(|i| i + 1)
    }
}

fn section_name(line: &str) -> Option<&str> {
    line.strip_prefix('[')?.strip_suffix(']').map(str::trim)
}
