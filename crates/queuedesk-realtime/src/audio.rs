// SPDX-FileCopyrightText: 2026 QueueDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Audio announcement cues.
//!
//! A called ticket is announced as a fixed sequence of clips: the alert
//! chime, "ticket number", each letter of the code, the number spelled out
//! in Indonesian, "please proceed to counter", and finally the clip naming
//! the counter or location. Display clients play the list in order.

const ALERT: &str = "ting";
const TICKET_NUMBER: &str = "nomor_antrian";
const PROCEED: &str = "ke_loket";

const ONES: [&str; 10] = [
    "nol", "satu", "dua", "tiga", "empat", "lima", "enam", "tujuh", "delapan", "sembilan",
];

/// Resolves clip names to paths under a common base and extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioCatalog {
    base: String,
    extension: String,
}

impl AudioCatalog {
    /// `base` is a path prefix such as `audio/`; a trailing `/` is added
    /// when missing. `extension` is given without the dot.
    pub fn new(base: impl Into<String>, extension: impl Into<String>) -> Self {
        let mut base = base.into();
        if !base.is_empty() && !base.ends_with('/') {
            base.push('/');
        }
        let extension = extension.into().trim_start_matches('.').to_string();
        Self { base, extension }
    }

    fn clip(&self, name: &str) -> String {
        format!("{}{}.{}", self.base, name, self.extension)
    }

    /// Path of the clip naming where the visitor should go.
    ///
    /// A configured clip is a file name taken as-is under the base path.
    /// Otherwise the clip is derived from the counter label, falling back to
    /// the location name. Returns `None` when nothing usable remains.
    pub fn location_clip(
        &self,
        configured: Option<&str>,
        counter: &str,
        location_name: &str,
    ) -> Option<String> {
        if let Some(file) = configured.map(str::trim).filter(|f| !f.is_empty()) {
            return Some(format!("{}{}", self.base, file));
        }
        [counter, location_name]
            .into_iter()
            .map(slug)
            .find(|s| !s.is_empty())
            .map(|s| self.clip(&s))
    }

    /// Full announcement for `ticket_code`, ending with `location_clip`.
    pub fn announcement(&self, ticket_code: &str, location_clip: Option<&str>) -> Vec<String> {
        let mut paths = vec![self.clip(ALERT), self.clip(TICKET_NUMBER)];

        let mut digits = String::new();
        for c in ticket_code.chars() {
            if c.is_ascii_alphabetic() {
                paths.push(self.clip(&c.to_ascii_lowercase().to_string()));
            } else if c.is_ascii_digit() {
                digits.push(c);
            }
        }
        if let Ok(number) = digits.parse::<u32>() {
            let mut words = Vec::new();
            spell_number(number, &mut words);
            paths.extend(words.into_iter().map(|w| self.clip(w)));
        }

        paths.push(self.clip(PROCEED));
        if let Some(clip) = location_clip {
            paths.push(clip.to_string());
        }
        paths
    }
}

/// Appends the clip names that spell `n`. Numbers above 1000 have no clips.
pub fn spell_number(n: u32, out: &mut Vec<&'static str>) {
    match n {
        0..=9 => out.push(ONES[n as usize]),
        10 => out.push("sepuluh"),
        11 => out.push("sebelas"),
        12..=19 => out.extend([ONES[(n - 10) as usize], "belas"]),
        20..=99 => {
            out.extend([ONES[(n / 10) as usize], "puluh"]);
            if n % 10 > 0 {
                out.push(ONES[(n % 10) as usize]);
            }
        }
        100 => out.push("seratus"),
        101..=199 => {
            out.push("seratus");
            spell_number(n - 100, out);
        }
        200..=999 => {
            out.extend([ONES[(n / 100) as usize], "ratus"]);
            if n % 100 > 0 {
                spell_number(n % 100, out);
            }
        }
        1000 => out.push("seribu"),
        _ => {}
    }
}

/// Lower-cases `label` and joins its alphanumeric runs with `_`.
fn slug(label: &str) -> String {
    label
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}
