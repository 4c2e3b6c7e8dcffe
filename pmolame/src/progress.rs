//! Classification of the text LAME prints while it works.
//!
//! Encoding prints a frame table with a `(NN%)|` column and an ETA; decoding
//! prints `Frame# current/total`. Both end with the tag sentinel once the
//! output file has been finalized.

use once_cell::sync::Lazy;
use regex::Regex;

/// Printed by the codec once the output has been written successfully.
pub const LAME_TAG_MESSAGE: &str = "Writing LAME Tag...done";

/// Prefix shared by every message the codec emits on its own behalf.
pub const LAME_PREFIX: &str = "lame: ";

static ENCODE_PROGRESS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(\s*((?:[0-9]{1,2})|100)%\)\|").expect("valid encode regex"));

static ENCODE_ETA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9]{1,2}:[0-9]{2}(?:\s|$)").expect("valid eta regex"));

static DECODE_PROGRESS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([0-9]{1,10})/([0-9]{1,10})").expect("valid decode regex"));

/// Direction of a LAME run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LameMode {
    Encode,
    Decode,
}

impl LameMode {
    pub fn as_str(self) -> &'static str {
        match self {
            LameMode::Encode => "encode",
            LameMode::Decode => "decode",
        }
    }
}

/// Result of [`classify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineClass {
    /// A progress line. `percent` is `None` when the line carried a ratio
    /// that cannot be turned into a percentage (`n/0`).
    Progress {
        percent: Option<u8>,
        eta: Option<String>,
    },
    /// The tag sentinel.
    Complete,
    /// A warning or error, already normalized to start with `lame: `.
    Warning(String),
    Unrecognized,
}

/// Classifies one line of codec output.
///
/// The sentinel wins over everything, then progress, then the warning
/// heuristics. Blank lines are always [`LineClass::Unrecognized`].
pub fn classify(line: &str, mode: LameMode) -> LineClass {
    let line = line.trim();
    if line.is_empty() {
        return LineClass::Unrecognized;
    }

    if line.contains(LAME_TAG_MESSAGE) {
        return LineClass::Complete;
    }

    let progress = match mode {
        LameMode::Encode => parse_encode_progress(line),
        LameMode::Decode => parse_decode_progress(line),
    };
    if let Some(progress) = progress {
        return progress;
    }

    match normalize_cli_message(line) {
        Some(message) => LineClass::Warning(message),
        None => LineClass::Unrecognized,
    }
}

fn parse_encode_progress(line: &str) -> Option<LineClass> {
    let captures = ENCODE_PROGRESS.captures(line)?;
    let percent = captures.get(1)?.as_str().parse::<u8>().ok()?;
    let eta = ENCODE_ETA
        .find(line)
        .map(|m| m.as_str().trim().to_string());

    Some(LineClass::Progress {
        percent: Some(percent),
        eta,
    })
}

fn parse_decode_progress(line: &str) -> Option<LineClass> {
    let captures = DECODE_PROGRESS.captures(line)?;
    let current = captures.get(1)?.as_str().parse::<u64>().ok()?;
    let total = captures.get(2)?.as_str().parse::<u64>().ok()?;

    let percent = if total == 0 {
        None
    } else {
        Some((current.saturating_mul(100) / total).min(100) as u8)
    };

    Some(LineClass::Progress { percent, eta: None })
}

/// Returns the `lame: `-prefixed form of a warning/error line, `None` for
/// anything else.
pub fn normalize_cli_message(line: &str) -> Option<String> {
    let line = line.trim();
    if line.starts_with(LAME_PREFIX) {
        return Some(line.to_string());
    }
    if line.starts_with("Warning: ") || line.contains("Error ") {
        return Some(format!("{LAME_PREFIX}{line}"));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_progress_with_eta() {
        let line = "  1200/2400  (50%)|    0:01/    0:02|    0:01/    0:02|   25.123x|    0:01 ";
        assert_eq!(
            classify(line, LameMode::Encode),
            LineClass::Progress {
                percent: Some(50),
                eta: Some("0:01".to_string())
            }
        );
    }

    #[test]
    fn test_encode_eta_at_end_of_line() {
        assert_eq!(
            classify("( 40%)| 00:05 ", LameMode::Encode),
            LineClass::Progress {
                percent: Some(40),
                eta: Some("00:05".to_string())
            }
        );
        assert_eq!(
            classify("( 40%)| 00:05", LameMode::Encode),
            LineClass::Progress {
                percent: Some(40),
                eta: Some("00:05".to_string())
            }
        );
    }

    #[test]
    fn test_encode_progress_bounds() {
        assert_eq!(
            classify("(100%)|", LameMode::Encode),
            LineClass::Progress {
                percent: Some(100),
                eta: None
            }
        );
        assert_eq!(
            classify("( 5%)|", LameMode::Encode),
            LineClass::Progress {
                percent: Some(5),
                eta: None
            }
        );
        assert_eq!(classify("(50%)", LameMode::Encode), LineClass::Unrecognized);
    }

    #[test]
    fn test_decode_progress_floors_ratio() {
        assert_eq!(
            classify("Frame# 1/3 128 kbps", LameMode::Decode),
            LineClass::Progress {
                percent: Some(33),
                eta: None
            }
        );
        assert_eq!(
            classify("Frame# 40/40", LameMode::Decode),
            LineClass::Progress {
                percent: Some(100),
                eta: None
            }
        );
    }

    #[test]
    fn test_decode_zero_total_has_no_percentage() {
        assert_eq!(
            classify("Frame# 3/0", LameMode::Decode),
            LineClass::Progress {
                percent: None,
                eta: None
            }
        );
    }

    #[test]
    fn test_progress_is_mode_specific() {
        assert_eq!(classify("Frame# 1/3", LameMode::Encode), LineClass::Unrecognized);
        assert_eq!(classify("(50%)|", LameMode::Decode), LineClass::Unrecognized);
    }

    #[test]
    fn test_sentinel_completes_in_both_modes() {
        for mode in [LameMode::Encode, LameMode::Decode] {
            assert_eq!(classify("Writing LAME Tag...done", mode), LineClass::Complete);
            assert_eq!(
                classify("  Writing LAME Tag...done  ", mode),
                LineClass::Complete
            );
        }
    }

    #[test]
    fn test_warnings_are_normalized() {
        assert_eq!(
            classify("Warning: unsupported audio format", LameMode::Encode),
            LineClass::Warning("lame: Warning: unsupported audio format".to_string())
        );
        assert_eq!(
            classify("lame: something failed", LameMode::Decode),
            LineClass::Warning("lame: something failed".to_string())
        );
        assert_eq!(
            classify("Fatal Error during read", LameMode::Encode),
            LineClass::Warning("lame: Fatal Error during read".to_string())
        );
    }

    #[test]
    fn test_blank_and_noise_lines() {
        assert_eq!(classify("", LameMode::Encode), LineClass::Unrecognized);
        assert_eq!(classify("   \t", LameMode::Decode), LineClass::Unrecognized);
        assert_eq!(
            classify("LAME 3.100 64bits (http://lame.sf.net)", LameMode::Encode),
            LineClass::Unrecognized
        );
        assert_eq!(classify("Errors were found", LameMode::Encode), LineClass::Unrecognized);
    }

    #[test]
    fn test_normalize_cli_message() {
        assert_eq!(normalize_cli_message("hello"), None);
        assert_eq!(
            normalize_cli_message("  Warning: x  "),
            Some("lame: Warning: x".to_string())
        );
    }
}
