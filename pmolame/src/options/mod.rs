//! Option validation and translation into LAME command-line arguments.
//!
//! Options arrive as an ordered list of `(name, value)` pairs (or a JSON
//! object, or through [`LameOptionsBuilder`]). Each name must be one of the
//! [`OptionKey`] variants; each value is checked against the domain of its
//! key and turned into zero or more argument tokens, appended in the order
//! the options were supplied.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::error::LameError;

pub mod key;
mod meta;

pub use key::OptionKey;

pub(crate) type OptionResult = Result<Vec<String>, LameError>;

/// Sample rates (kHz) accepted by `sfreq` and `resample`.
pub const SAMPLE_FREQUENCIES: [f64; 9] = [8.0, 11.025, 12.0, 16.0, 22.05, 24.0, 32.0, 44.1, 48.0];

/// Bit widths accepted by `bitwidth`.
pub const BIT_WIDTHS: [u8; 4] = [8, 16, 24, 32];

/// Bitrate ladder (kbps) accepted by `bitrate` and `max-bitrate`.
pub const BITRATES: [u16; 18] = [
    8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160, 192, 224, 256, 320,
];

const CHANNEL_MODES: [&str; 8] = ["s", "j", "f", "d", "m", "l", "r", "a"];
const PRESET_KEYWORDS: [&str; 4] = ["medium", "standard", "extreme", "insane"];
const FREEFORMAT_ALIASES: [&str; 5] = ["FreeAmp", "in_mpg123", "l3dec", "LAME", "MAD"];
const NOASM_VALUES: [&str; 3] = ["mmx", "3dnow", "sse"];
const HELP_TOPICS: [&str; 2] = ["id3", "dev"];

const SFREQ_RANGE: &str = "8, 11.025, 12, 16, 22.05, 24, 32, 44.1 or 48";
const BITRATE_RANGE: &str =
    "8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160, 192, 224, 256 or 320";
const PRESET_DOMAIN: &str = "'preset' must be a supported preset keyword, numeric bitrate, or preset tuple like 'fast <value>' or 'cbr <bitrate>'.";

/// Where the codec writes its result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// Write to this path; missing parent directories are created.
    File(PathBuf),
    /// Write to a temporary file and hand back its bytes.
    Buffer,
    /// Write to stdout for [`crate::LameStream`].
    Stream,
}

impl OutputTarget {
    fn from_value(value: &Value) -> Result<Self, LameError> {
        match value {
            Value::String(s) if s == "buffer" => Ok(OutputTarget::Buffer),
            Value::String(s) if s == "stream" => Ok(OutputTarget::Stream),
            Value::String(s) if !s.trim().is_empty() => Ok(OutputTarget::File(PathBuf::from(s))),
            _ => Err(LameError::invalid(
                "'output' must be a file path, 'buffer' or 'stream'.",
            )),
        }
    }
}

impl From<&Path> for OutputTarget {
    fn from(path: &Path) -> Self {
        OutputTarget::File(path.to_path_buf())
    }
}

impl From<PathBuf> for OutputTarget {
    fn from(path: PathBuf) -> Self {
        OutputTarget::File(path)
    }
}

/// Raw PCM sample layout implied by `bitwidth`, `signed`, `unsigned`,
/// `big-endian` and `little-endian`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmLayout {
    pub bitwidth: u8,
    pub signed: bool,
    pub unsigned: bool,
    pub big_endian: bool,
    pub little_endian: bool,
}

impl Default for PcmLayout {
    fn default() -> Self {
        Self {
            bitwidth: 16,
            signed: false,
            unsigned: false,
            big_endian: false,
            little_endian: false,
        }
    }
}

impl PcmLayout {
    /// 8-bit PCM is unsigned unless `signed` is requested; wider samples are
    /// signed unless `unsigned` is requested.
    pub fn is_signed(&self) -> bool {
        if self.unsigned {
            return false;
        }
        if self.bitwidth == 8 {
            return self.signed;
        }
        true
    }

    /// Little endian unless `big-endian` was set.
    pub fn is_big_endian(&self) -> bool {
        self.big_endian
    }
}

/// A validated option set: output target plus the argument tokens.
#[derive(Debug, Clone)]
pub struct LameOptions {
    output: OutputTarget,
    args: Vec<String>,
    disptime_configured: bool,
    pcm: PcmLayout,
}

impl LameOptions {
    pub fn builder() -> LameOptionsBuilder {
        LameOptionsBuilder::new()
    }

    /// Validates `(name, value)` pairs in order. The `output` entry is
    /// mandatory.
    pub fn from_entries<I, K>(entries: I) -> Result<Self, LameError>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        let mut output = None;
        let mut rest = Vec::new();
        for (name, value) in entries {
            if name.as_ref() == OptionKey::Output.name() {
                output = Some(OutputTarget::from_value(&value)?);
            } else {
                rest.push((name.as_ref().to_string(), value));
            }
        }
        Self::parse(output, rest)
    }

    /// Validates a JSON object, keys taken in document order.
    pub fn from_json(value: &Value) -> Result<Self, LameError> {
        let Value::Object(map) = value else {
            return Err(LameError::invalid("options must be an object."));
        };
        Self::from_entries(map.iter().map(|(k, v)| (k.as_str(), v.clone())))
    }

    fn parse(output: Option<OutputTarget>, entries: Vec<(String, Value)>) -> Result<Self, LameError> {
        let output = output.ok_or_else(|| LameError::invalid("'output' is required"))?;

        let mut state = ParseState::default();
        for (name, value) in &entries {
            let key: OptionKey = name.parse()?;
            let tokens = state.tokens_for(key, value)?;
            state.args.extend(tokens);
        }

        debug!(args = ?state.args, "Validated LAME options");

        Ok(Self {
            output,
            args: state.args,
            disptime_configured: state.disptime_configured,
            pcm: state.pcm,
        })
    }

    pub fn output(&self) -> &OutputTarget {
        &self.output
    }

    /// Argument tokens, in the order the options were supplied.
    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    /// False once `disptime` was given, either as an interval or `false`.
    pub fn should_use_default_disptime(&self) -> bool {
        !self.disptime_configured
    }

    pub fn pcm_layout(&self) -> PcmLayout {
        self.pcm
    }
}

#[derive(Default)]
struct ParseState {
    args: Vec<String>,
    disptime_configured: bool,
    pcm: PcmLayout,
}

impl ParseState {
    fn tokens_for(&mut self, key: OptionKey, value: &Value) -> OptionResult {
        if let Some(switch) = key.flag_switch() {
            let tokens = flag(key, value, switch)?;
            if !tokens.is_empty() {
                self.track_layout_flag(key);
            }
            return Ok(tokens);
        }

        match key {
            OptionKey::Output => Ok(Vec::new()),
            OptionKey::Gain => {
                let gain = number(value)
                    .filter(|v| (-20.0..=12.0).contains(v))
                    .ok_or_else(|| {
                        LameError::invalid("'gain' must be a number between -20 and 12.")
                    })?;
                Ok(pair("--gain", format_number(gain)))
            }
            OptionKey::Sfreq | OptionKey::Resample => {
                let switch = if key == OptionKey::Sfreq { "-s" } else { "--resample" };
                let freq = number(value)
                    .filter(|v| SAMPLE_FREQUENCIES.iter().any(|f| (f - v).abs() < 1e-9))
                    .ok_or_else(|| {
                        LameError::invalid(format!("'{key}' is not in range of {SFREQ_RANGE}."))
                    })?;
                Ok(pair(switch, format_number(freq)))
            }
            OptionKey::Bitwidth => {
                let bits = integer(value)
                    .and_then(|v| u8::try_from(v).ok())
                    .filter(|v| BIT_WIDTHS.contains(v))
                    .ok_or_else(|| {
                        LameError::invalid("'bitwidth' is not in range of 8, 16, 24 or 32.")
                    })?;
                self.pcm.bitwidth = bits;
                Ok(pair("--bitwidth", bits.to_string()))
            }
            OptionKey::Mode => {
                let mode = value
                    .as_str()
                    .filter(|m| CHANNEL_MODES.contains(m))
                    .ok_or_else(|| {
                        LameError::invalid(
                            "'mode' is not in range of 's', 'j', 'f', 'd', 'm', 'l', 'r' or 'a'.",
                        )
                    })?;
                Ok(pair("-m", mode.to_string()))
            }
            OptionKey::Freeformat => match value {
                Value::Bool(true) => Ok(vec!["--freeformat".to_string()]),
                Value::Bool(false) | Value::Null => Ok(Vec::new()),
                Value::String(alias) if FREEFORMAT_ALIASES.contains(&alias.as_str()) => {
                    Ok(vec!["--freeformat".to_string()])
                }
                Value::String(_) => Err(LameError::invalid(
                    "'freeformat' string value must be one of 'FreeAmp', 'in_mpg123', 'l3dec', 'LAME', 'MAD'.",
                )),
                _ => Err(LameError::invalid("'freeformat' must be boolean.")),
            },
            OptionKey::Nogap => nogap(value),
            OptionKey::NogapOut | OptionKey::OutDir => {
                if value.is_null() {
                    return Ok(Vec::new());
                }
                let path = value
                    .as_str()
                    .filter(|p| !p.trim().is_empty())
                    .ok_or_else(|| {
                        LameError::invalid(format!("'{key}' must be a non-empty string path."))
                    })?;
                Ok(pair(&format!("--{key}"), path.to_string()))
            }
            OptionKey::Comp
            | OptionKey::Scale
            | OptionKey::ScaleL
            | OptionKey::ScaleR
            | OptionKey::Lowpass
            | OptionKey::LowpassWidth
            | OptionKey::Highpass
            | OptionKey::HighpassWidth
            | OptionKey::DecodeMp3Delay => {
                if value.is_null() {
                    return Ok(Vec::new());
                }
                let v = number(value).ok_or_else(|| {
                    LameError::invalid(format!("'{key}' must be a finite number."))
                })?;
                Ok(pair(&format!("--{key}"), format_number(v)))
            }
            OptionKey::Preset => preset(value),
            OptionKey::Noasm => {
                let v = value
                    .as_str()
                    .filter(|v| NOASM_VALUES.contains(v))
                    .ok_or_else(|| {
                        LameError::invalid("'noasm' is not in range of 'mmx', '3dnow' or 'sse'.")
                    })?;
                Ok(pair("--noasm", v.to_string()))
            }
            OptionKey::Quality | OptionKey::VbrQuality => {
                let switch = if key == OptionKey::Quality { "-q" } else { "-V" };
                let v = number(value)
                    .filter(|v| (0.0..=9.0).contains(v))
                    .ok_or_else(|| {
                        LameError::invalid(format!("'{key}' is not in range of 0 to 9."))
                    })?;
                Ok(pair(switch, format_number(v)))
            }
            OptionKey::Bitrate | OptionKey::MaxBitrate => {
                let switch = if key == OptionKey::Bitrate { "-b" } else { "-B" };
                let v = integer(value)
                    .and_then(|v| u16::try_from(v).ok())
                    .filter(|v| BITRATES.contains(v))
                    .ok_or_else(|| {
                        LameError::invalid(format!("'{key}' is not in range of {BITRATE_RANGE}."))
                    })?;
                Ok(pair(switch, v.to_string()))
            }
            OptionKey::Abr => {
                let v = number(value)
                    .filter(|v| (8.0..=310.0).contains(v))
                    .ok_or_else(|| LameError::invalid("'abr' is not in range of 8 to 310."))?;
                Ok(pair("--abr", format_number(v)))
            }
            OptionKey::Emp => {
                let v = match value {
                    Value::String(s) if s == "n" || s == "c" || s == "5" => s.clone(),
                    Value::Number(n) if n.as_f64() == Some(5.0) => "5".to_string(),
                    _ => {
                        return Err(LameError::invalid(
                            "'emp' is not in range of 'n', 5 or 'c'.",
                        ));
                    }
                };
                Ok(pair("-e", v))
            }
            OptionKey::Priority => {
                if value.is_null() {
                    return Ok(Vec::new());
                }
                let v = integer(value).filter(|v| (0..=4).contains(v)).ok_or_else(|| {
                    LameError::invalid("'priority' must be an integer between 0 and 4.")
                })?;
                Ok(pair("--priority", v.to_string()))
            }
            OptionKey::Disptime => match value {
                Value::Null => Ok(Vec::new()),
                Value::Bool(false) => {
                    self.disptime_configured = true;
                    Ok(Vec::new())
                }
                _ => {
                    let v = number(value).filter(|v| *v > 0.0).ok_or_else(|| {
                        LameError::invalid(
                            "'disptime' must be a positive number of seconds or false to disable progress output.",
                        )
                    })?;
                    self.disptime_configured = true;
                    Ok(pair("--disptime", format_number(v)))
                }
            },
            OptionKey::Help | OptionKey::Usage => {
                let switch = format!("--{key}");
                match value {
                    Value::Bool(true) => Ok(vec![switch]),
                    Value::Bool(false) | Value::Null => Ok(Vec::new()),
                    Value::String(topic) if HELP_TOPICS.contains(&topic.as_str()) => {
                        Ok(vec![switch, topic.clone()])
                    }
                    _ => Err(LameError::invalid(format!(
                        "'{key}' must be boolean or one of 'id3', 'dev'."
                    ))),
                }
            }
            OptionKey::Meta => meta::meta_tokens(value),
            // flags are handled through `flag_switch` above
            _ => flag(key, value, ""),
        }
    }

    fn track_layout_flag(&mut self, key: OptionKey) {
        match key {
            OptionKey::Signed => self.pcm.signed = true,
            OptionKey::Unsigned => self.pcm.unsigned = true,
            OptionKey::BigEndian => self.pcm.big_endian = true,
            OptionKey::LittleEndian => self.pcm.little_endian = true,
            _ => {}
        }
    }
}

fn flag(key: OptionKey, value: &Value, switch: &str) -> OptionResult {
    match value {
        Value::Bool(true) if !switch.is_empty() => Ok(vec![switch.to_string()]),
        Value::Bool(false) | Value::Null => Ok(Vec::new()),
        _ => Err(LameError::invalid(format!("'{key}' must be boolean."))),
    }
}

fn pair(switch: &str, value: String) -> Vec<String> {
    vec![switch.to_string(), value]
}

fn nogap(value: &Value) -> OptionResult {
    if value.is_null() {
        return Ok(Vec::new());
    }
    let invalid = || LameError::invalid("'nogap' must be a non-empty array of file paths.");
    let files = value.as_array().filter(|files| !files.is_empty()).ok_or_else(invalid)?;

    let mut args = vec!["--nogap".to_string()];
    for file in files {
        let path = file.as_str().filter(|p| !p.trim().is_empty()).ok_or_else(invalid)?;
        args.push(path.to_string());
    }
    Ok(args)
}

fn preset(value: &Value) -> OptionResult {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Number(_) => {
            let v = integer(value)
                .filter(|v| (8..=320).contains(v))
                .ok_or_else(|| LameError::invalid(PRESET_DOMAIN))?;
            Ok(pair("--preset", v.to_string()))
        }
        Value::String(text) => {
            let text = text.trim();
            if text.is_empty() {
                return Err(LameError::invalid("'preset' cannot be empty."));
            }
            let parts: Vec<&str> = text.split_whitespace().collect();
            match parts.as_slice() {
                [keyword] if PRESET_KEYWORDS.contains(keyword) => {
                    Ok(pair("--preset", keyword.to_string()))
                }
                [bitrate] if is_preset_bitrate(bitrate) => {
                    Ok(pair("--preset", bitrate.to_string()))
                }
                ["fast", target] if PRESET_KEYWORDS.contains(target) || is_preset_bitrate(target) => {
                    Ok(vec!["--preset".into(), "fast".into(), target.to_string()])
                }
                ["cbr", bitrate] if is_preset_bitrate(bitrate) => {
                    Ok(vec!["--preset".into(), "cbr".into(), bitrate.to_string()])
                }
                _ => Err(LameError::invalid(PRESET_DOMAIN)),
            }
        }
        _ => Err(LameError::invalid(PRESET_DOMAIN)),
    }
}

fn is_preset_bitrate(text: &str) -> bool {
    text.parse::<u16>().is_ok_and(|v| (8..=320).contains(&v))
}

/// Finite numeric value, numeric strings included.
fn number(value: &Value) -> Option<f64> {
    let v = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    v.filter(|v| v.is_finite())
}

fn integer(value: &Value) -> Option<i64> {
    number(value)
        .filter(|v| v.fract() == 0.0)
        .map(|v| v as i64)
}

/// Renders a number the way the codec expects it: `44.1`, `128`, `0.8`.
pub(crate) fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

pub(crate) fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => n.as_f64().map(format_number),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Fluent construction of an option set.
///
/// Options keep the order in which they were first set; setting a key again
/// replaces its value in place.
#[derive(Debug, Clone, Default)]
pub struct LameOptionsBuilder {
    output: Option<Result<OutputTarget, LameError>>,
    entries: Vec<(String, Value)>,
}

impl LameOptionsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn output(mut self, target: impl Into<OutputTarget>) -> Self {
        self.output = Some(Ok(target.into()));
        self
    }

    pub fn output_buffer(self) -> Self {
        self.output(OutputTarget::Buffer)
    }

    /// Sets any option by name; validation happens in [`build`](Self::build).
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        let value = value.into();
        if key == OptionKey::Output.name() {
            // a bad value is reported by build() unless replaced first
            self.output = Some(OutputTarget::from_value(&value));
            return self;
        }
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
        self
    }

    pub fn bitrate(self, kbps: u16) -> Self {
        self.set("bitrate", kbps)
    }

    pub fn quality(self, level: u8) -> Self {
        self.set("quality", level)
    }

    pub fn vbr_quality(self, level: u8) -> Self {
        self.set("vbr-quality", level)
    }

    pub fn sfreq(self, khz: f64) -> Self {
        self.set("sfreq", khz)
    }

    pub fn bitwidth(self, bits: u8) -> Self {
        self.set("bitwidth", bits)
    }

    pub fn raw(self, enabled: bool) -> Self {
        self.set("raw", enabled)
    }

    pub fn mode(self, mode: &str) -> Self {
        self.set("mode", mode)
    }

    /// `None` disables progress output entirely (`disptime: false`).
    pub fn disptime(self, seconds: Option<f64>) -> Self {
        match seconds {
            Some(s) => self.set("disptime", s),
            None => self.set("disptime", false),
        }
    }

    pub fn meta(self, tags: Value) -> Self {
        self.set("meta", tags)
    }

    pub fn build(self) -> Result<LameOptions, LameError> {
        LameOptions::parse(self.output.transpose()?, self.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn build(value: Value) -> Result<LameOptions, LameError> {
        LameOptions::from_json(&value)
    }

    fn args(value: Value) -> Vec<String> {
        build(value).unwrap().arguments().to_vec()
    }

    fn message(value: Value) -> String {
        build(value).unwrap_err().to_string()
    }

    #[test]
    fn test_output_is_required() {
        assert_eq!(message(json!({})), "lame: Invalid option: 'output' is required");
        assert_eq!(
            message(json!({ "bitrate": 128 })),
            "lame: Invalid option: 'output' is required"
        );
    }

    #[test]
    fn test_output_targets() {
        assert_eq!(build(json!({ "output": "buffer" })).unwrap().output(), &OutputTarget::Buffer);
        assert_eq!(build(json!({ "output": "stream" })).unwrap().output(), &OutputTarget::Stream);
        assert_eq!(
            build(json!({ "output": "out/file.mp3" })).unwrap().output(),
            &OutputTarget::File(PathBuf::from("out/file.mp3"))
        );
    }

    #[test]
    fn test_tokens_follow_supplied_order() {
        let got = args(json!({
            "output": "buffer",
            "bitrate": 192,
            "raw": true,
            "sfreq": 44.1,
            "mode": "j",
        }));
        assert_eq!(got, vec!["-b", "192", "-r", "-s", "44.1", "-m", "j"]);

        let got = args(json!({
            "output": "buffer",
            "mode": "j",
            "sfreq": 44.1,
            "raw": true,
            "bitrate": 192,
        }));
        assert_eq!(got, vec!["-m", "j", "-s", "44.1", "-r", "-b", "192"]);
    }

    #[test]
    fn test_comprehensive_configuration() {
        let got = args(json!({
            "output": "buffer",
            "swap-channel": true,
            "gain": 3,
            "bitwidth": 16,
            "unsigned": true,
            "mp1Input": true,
            "nogap": ["./track-1.wav", "./track-2.wav"],
            "nogapout": "./gapless-out",
            "out-dir": "./exports",
            "scale": 0.8,
            "no-replaygain": true,
            "clip-detect": true,
            "preset": "fast 128",
            "quality-high": true,
            "max-bitrate": 256,
            "vbr-quality": 3,
            "decode-mp3delay": 576,
            "priority": 2,
            "disptime": 2,
            "help": "dev",
            "no-histogram": true,
        }));

        let expected = vec![
            "--swap-channel", "--gain", "3", "--bitwidth", "16", "--unsigned",
            "--mp1input", "--nogap", "./track-1.wav", "./track-2.wav", "--nogapout",
            "./gapless-out", "--out-dir", "./exports", "--scale", "0.8", "--noreplaygain",
            "--clipdetect", "--preset", "fast", "128", "-h", "-B", "256", "-V", "3",
            "--decode-mp3delay", "576", "--priority", "2", "--disptime", "2", "--help",
            "dev", "--nohist",
        ];
        assert_eq!(got, expected);
    }

    #[test]
    fn test_false_flags_emit_nothing() {
        let got = args(json!({
            "output": "buffer",
            "raw": false,
            "unsigned": false,
            "mp2Input": false,
            "vbr": false,
            "silent": false,
            "help": false,
        }));
        assert!(got.is_empty());
    }

    #[test]
    fn test_sample_frequency_domain() {
        for freq in SAMPLE_FREQUENCIES {
            assert!(build(json!({ "output": "buffer", "sfreq": freq })).is_ok());
        }
        assert_eq!(
            message(json!({ "output": "buffer", "sfreq": 9 })),
            "lame: Invalid option: 'sfreq' is not in range of 8, 11.025, 12, 16, 22.05, 24, 32, 44.1 or 48."
        );
        assert_eq!(
            message(json!({ "output": "buffer", "resample": 20 })),
            "lame: Invalid option: 'resample' is not in range of 8, 11.025, 12, 16, 22.05, 24, 32, 44.1 or 48."
        );
    }

    #[test]
    fn test_numeric_ranges() {
        let cases = [
            (json!({ "output": "buffer", "quality": 20 }), "'quality' is not in range of 0 to 9."),
            (json!({ "output": "buffer", "bitwidth": 12 }), "'bitwidth' is not in range of 8, 16, 24 or 32."),
            (json!({ "output": "buffer", "bitrate": 999 }), "'bitrate' is not in range of 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160, 192, 224, 256 or 320."),
            (json!({ "output": "buffer", "abr": 400 }), "'abr' is not in range of 8 to 310."),
            (json!({ "output": "buffer", "vbr-quality": 11 }), "'vbr-quality' is not in range of 0 to 9."),
            (json!({ "output": "buffer", "gain": 30 }), "'gain' must be a number between -20 and 12."),
            (json!({ "output": "buffer", "priority": 7 }), "'priority' must be an integer between 0 and 4."),
            (json!({ "output": "buffer", "decode-mp3delay": "foo" }), "'decode-mp3delay' must be a finite number."),
            (json!({ "output": "buffer", "disptime": 0 }), "'disptime' must be a positive number of seconds or false to disable progress output."),
        ];

        for (value, expected) in cases {
            assert_eq!(message(value), format!("lame: Invalid option: {expected}"));
        }
    }

    #[test]
    fn test_bitrate_ladder_accepted() {
        for rate in BITRATES {
            let got = args(json!({ "output": "buffer", "bitrate": rate }));
            assert_eq!(got, vec!["-b".to_string(), rate.to_string()]);
        }
    }

    #[test]
    fn test_enumerations() {
        for mode in CHANNEL_MODES {
            assert!(build(json!({ "output": "buffer", "mode": mode })).is_ok());
        }
        assert_eq!(
            message(json!({ "output": "buffer", "mode": "x" })),
            "lame: Invalid option: 'mode' is not in range of 's', 'j', 'f', 'd', 'm', 'l', 'r' or 'a'."
        );
        assert_eq!(
            message(json!({ "output": "buffer", "noasm": "avx" })),
            "lame: Invalid option: 'noasm' is not in range of 'mmx', '3dnow' or 'sse'."
        );
        assert_eq!(
            message(json!({ "output": "buffer", "emp": "x" })),
            "lame: Invalid option: 'emp' is not in range of 'n', 5 or 'c'."
        );
        assert_eq!(args(json!({ "output": "buffer", "emp": 5 })), vec!["-e", "5"]);
    }

    #[test]
    fn test_presets() {
        let ok = [
            (json!("standard"), vec!["--preset", "standard"]),
            (json!(192), vec!["--preset", "192"]),
            (json!("fast 128"), vec!["--preset", "fast", "128"]),
            (json!("cbr 256"), vec!["--preset", "cbr", "256"]),
        ];
        for (value, expected) in ok {
            assert_eq!(args(json!({ "output": "buffer", "preset": value })), expected);
        }

        for value in [json!("fast"), json!(true), json!("fast foo")] {
            assert_eq!(
                message(json!({ "output": "buffer", "preset": value })),
                format!("lame: Invalid option: {PRESET_DOMAIN}")
            );
        }
        assert_eq!(
            message(json!({ "output": "buffer", "preset": "   " })),
            "lame: Invalid option: 'preset' cannot be empty."
        );
    }

    #[test]
    fn test_freeformat_variants() {
        assert_eq!(args(json!({ "output": "buffer", "freeformat": true })), vec!["--freeformat"]);
        assert_eq!(args(json!({ "output": "buffer", "freeformat": "LAME" })), vec!["--freeformat"]);
        assert_eq!(
            message(json!({ "output": "buffer", "freeformat": "Unknown" })),
            "lame: Invalid option: 'freeformat' string value must be one of 'FreeAmp', 'in_mpg123', 'l3dec', 'LAME', 'MAD'."
        );
        assert_eq!(
            message(json!({ "output": "buffer", "freeformat": 123 })),
            "lame: Invalid option: 'freeformat' must be boolean."
        );
    }

    #[test]
    fn test_paths_and_gapless() {
        assert_eq!(
            message(json!({ "output": "buffer", "nogap": [] })),
            "lame: Invalid option: 'nogap' must be a non-empty array of file paths."
        );
        assert_eq!(
            message(json!({ "output": "buffer", "nogap": [123] })),
            "lame: Invalid option: 'nogap' must be a non-empty array of file paths."
        );
        assert_eq!(
            message(json!({ "output": "buffer", "nogapout": "   " })),
            "lame: Invalid option: 'nogapout' must be a non-empty string path."
        );
        assert_eq!(
            message(json!({ "output": "buffer", "out-dir": "" })),
            "lame: Invalid option: 'out-dir' must be a non-empty string path."
        );
        assert_eq!(
            message(json!({ "output": "buffer", "nogaptags": "yes" })),
            "lame: Invalid option: 'nogaptags' must be boolean."
        );
    }

    #[test]
    fn test_help_topics() {
        assert_eq!(args(json!({ "output": "buffer", "help": true })), vec!["--help"]);
        assert_eq!(args(json!({ "output": "buffer", "usage": "id3" })), vec!["--usage", "id3"]);
        assert_eq!(
            message(json!({ "output": "buffer", "help": "foo" })),
            "lame: Invalid option: 'help' must be boolean or one of 'id3', 'dev'."
        );
    }

    #[test]
    fn test_strict_boolean_toggles() {
        for key in ["silent", "quiet", "verbose", "longhelp", "version", "license", "no-histogram"] {
            assert_eq!(
                message(json!({ "output": "buffer", key: "yes" })),
                format!("lame: Invalid option: '{key}' must be boolean.")
            );
        }
    }

    #[test]
    fn test_unknown_key() {
        assert_eq!(
            message(json!({ "output": "buffer", "unexpected": true })),
            "lame: Invalid option: unknown parameter 'unexpected'"
        );
    }

    #[test]
    fn test_disptime_tracking() {
        let options = build(json!({ "output": "buffer" })).unwrap();
        assert!(options.should_use_default_disptime());

        let options = build(json!({ "output": "buffer", "disptime": false })).unwrap();
        assert!(!options.should_use_default_disptime());
        assert!(options.arguments().is_empty());

        let options = build(json!({ "output": "buffer", "disptime": 5 })).unwrap();
        assert!(!options.should_use_default_disptime());
        assert_eq!(options.arguments(), ["--disptime", "5"]);
    }

    #[test]
    fn test_pcm_layout_extraction() {
        let layout = build(json!({ "output": "buffer" })).unwrap().pcm_layout();
        assert_eq!(layout.bitwidth, 16);
        assert!(layout.is_signed());
        assert!(!layout.is_big_endian());

        let layout = build(json!({ "output": "buffer", "bitwidth": 8 })).unwrap().pcm_layout();
        assert!(!layout.is_signed());

        let layout = build(json!({ "output": "buffer", "bitwidth": 8, "signed": true }))
            .unwrap()
            .pcm_layout();
        assert!(layout.is_signed());

        let layout = build(json!({ "output": "buffer", "bitwidth": 24, "big-endian": true, "unsigned": true }))
            .unwrap()
            .pcm_layout();
        assert!(layout.is_big_endian());
        assert!(!layout.is_signed());
    }

    #[test]
    fn test_builder_keeps_first_position_and_replaces_value() {
        let options = LameOptions::builder()
            .output_buffer()
            .bitrate(128)
            .raw(true)
            .bitrate(192)
            .build()
            .unwrap();
        assert_eq!(options.arguments(), ["-b", "192", "-r"]);
    }

    #[test]
    fn test_builder_without_output_fails() {
        let err = LameOptions::builder().bitrate(128).build().unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_builder_reports_invalid_output_value() {
        let err = LameOptions::builder()
            .output_buffer()
            .set("output", 42)
            .build()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "lame: Invalid option: 'output' must be a file path, 'buffer' or 'stream'."
        );

        let options = LameOptions::builder()
            .set("output", "")
            .output_buffer()
            .build()
            .unwrap();
        assert_eq!(options.output(), &OutputTarget::Buffer);

        let options = LameOptions::builder().set("output", "stream").build().unwrap();
        assert_eq!(options.output(), &OutputTarget::Stream);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(44.1), "44.1");
        assert_eq!(format_number(128.0), "128");
        assert_eq!(format_number(-3.0), "-3");
        assert_eq!(format_number(0.95), "0.95");
    }
}
