use std::{fmt, str::FromStr};

use crate::error::LameError;

/// Closed set of option names understood by the validator.
///
/// The string form is the public key used in option maps (`"swap-bytes"`,
/// `"mp3Input"`, ...). Anything else is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionKey {
    Output,
    Raw,
    SwapBytes,
    SwapChannel,
    Gain,
    Sfreq,
    Bitwidth,
    Signed,
    Unsigned,
    LittleEndian,
    BigEndian,
    Mp1Input,
    Mp2Input,
    Mp3Input,
    Mode,
    ToMono,
    ChannelDifferentBlockSizes,
    Freeformat,
    DisableInfoTag,
    Nogap,
    NogapOut,
    NogapTags,
    OutDir,
    Comp,
    Scale,
    ScaleL,
    ScaleR,
    ReplaygainFast,
    ReplaygainAccurate,
    NoReplaygain,
    ClipDetect,
    Preset,
    Noasm,
    Quality,
    QualityHigh,
    FastEncoding,
    Bitrate,
    MaxBitrate,
    ForceBitrate,
    Cbr,
    Abr,
    Vbr,
    VbrQuality,
    VbrOld,
    VbrNew,
    IgnoreNoiseInSfb21,
    Emp,
    MarkAsCopyrighted,
    MarkAsCopy,
    CrcErrorProtection,
    Nores,
    StrictlyEnforceIso,
    Lowpass,
    LowpassWidth,
    Highpass,
    HighpassWidth,
    Resample,
    DecodeMp3Delay,
    Priority,
    Disptime,
    Silent,
    Quiet,
    Verbose,
    Help,
    Usage,
    LongHelp,
    Version,
    License,
    NoHistogram,
    Meta,
}

const KEY_NAMES: &[(OptionKey, &str)] = &[
    (OptionKey::Output, "output"),
    (OptionKey::Raw, "raw"),
    (OptionKey::SwapBytes, "swap-bytes"),
    (OptionKey::SwapChannel, "swap-channel"),
    (OptionKey::Gain, "gain"),
    (OptionKey::Sfreq, "sfreq"),
    (OptionKey::Bitwidth, "bitwidth"),
    (OptionKey::Signed, "signed"),
    (OptionKey::Unsigned, "unsigned"),
    (OptionKey::LittleEndian, "little-endian"),
    (OptionKey::BigEndian, "big-endian"),
    (OptionKey::Mp1Input, "mp1Input"),
    (OptionKey::Mp2Input, "mp2Input"),
    (OptionKey::Mp3Input, "mp3Input"),
    (OptionKey::Mode, "mode"),
    (OptionKey::ToMono, "to-mono"),
    (
        OptionKey::ChannelDifferentBlockSizes,
        "channel-different-block-sizes",
    ),
    (OptionKey::Freeformat, "freeformat"),
    (OptionKey::DisableInfoTag, "disable-info-tag"),
    (OptionKey::Nogap, "nogap"),
    (OptionKey::NogapOut, "nogapout"),
    (OptionKey::NogapTags, "nogaptags"),
    (OptionKey::OutDir, "out-dir"),
    (OptionKey::Comp, "comp"),
    (OptionKey::Scale, "scale"),
    (OptionKey::ScaleL, "scale-l"),
    (OptionKey::ScaleR, "scale-r"),
    (OptionKey::ReplaygainFast, "replaygain-fast"),
    (OptionKey::ReplaygainAccurate, "replaygain-accurate"),
    (OptionKey::NoReplaygain, "no-replaygain"),
    (OptionKey::ClipDetect, "clip-detect"),
    (OptionKey::Preset, "preset"),
    (OptionKey::Noasm, "noasm"),
    (OptionKey::Quality, "quality"),
    (OptionKey::QualityHigh, "quality-high"),
    (OptionKey::FastEncoding, "fast-encoding"),
    (OptionKey::Bitrate, "bitrate"),
    (OptionKey::MaxBitrate, "max-bitrate"),
    (OptionKey::ForceBitrate, "force-bitrate"),
    (OptionKey::Cbr, "cbr"),
    (OptionKey::Abr, "abr"),
    (OptionKey::Vbr, "vbr"),
    (OptionKey::VbrQuality, "vbr-quality"),
    (OptionKey::VbrOld, "vbr-old"),
    (OptionKey::VbrNew, "vbr-new"),
    (OptionKey::IgnoreNoiseInSfb21, "ignore-noise-in-sfb21"),
    (OptionKey::Emp, "emp"),
    (OptionKey::MarkAsCopyrighted, "mark-as-copyrighted"),
    (OptionKey::MarkAsCopy, "mark-as-copy"),
    (OptionKey::CrcErrorProtection, "crc-error-protection"),
    (OptionKey::Nores, "nores"),
    (OptionKey::StrictlyEnforceIso, "strictly-enforce-ISO"),
    (OptionKey::Lowpass, "lowpass"),
    (OptionKey::LowpassWidth, "lowpass-width"),
    (OptionKey::Highpass, "highpass"),
    (OptionKey::HighpassWidth, "highpass-width"),
    (OptionKey::Resample, "resample"),
    (OptionKey::DecodeMp3Delay, "decode-mp3delay"),
    (OptionKey::Priority, "priority"),
    (OptionKey::Disptime, "disptime"),
    (OptionKey::Silent, "silent"),
    (OptionKey::Quiet, "quiet"),
    (OptionKey::Verbose, "verbose"),
    (OptionKey::Help, "help"),
    (OptionKey::Usage, "usage"),
    (OptionKey::LongHelp, "longhelp"),
    (OptionKey::Version, "version"),
    (OptionKey::License, "license"),
    (OptionKey::NoHistogram, "no-histogram"),
    (OptionKey::Meta, "meta"),
];

impl OptionKey {
    /// Public key name as accepted in option maps.
    pub fn name(self) -> &'static str {
        KEY_NAMES
            .iter()
            .find(|(key, _)| *key == self)
            .map(|(_, name)| *name)
            .unwrap_or("unknown")
    }

    /// Switch emitted for simple on/off options, `None` for valued keys.
    pub(crate) fn flag_switch(self) -> Option<&'static str> {
        let switch = match self {
            OptionKey::Raw => "-r",
            OptionKey::SwapBytes => "-x",
            OptionKey::SwapChannel => "--swap-channel",
            OptionKey::Signed => "--signed",
            OptionKey::Unsigned => "--unsigned",
            OptionKey::LittleEndian => "--little-endian",
            OptionKey::BigEndian => "--big-endian",
            OptionKey::Mp1Input => "--mp1input",
            OptionKey::Mp2Input => "--mp2input",
            OptionKey::Mp3Input => "--mp3input",
            OptionKey::ToMono => "-a",
            OptionKey::ChannelDifferentBlockSizes => "-d",
            OptionKey::DisableInfoTag => "-t",
            OptionKey::NogapTags => "--nogaptags",
            OptionKey::ReplaygainFast => "--replaygain-fast",
            OptionKey::ReplaygainAccurate => "--replaygain-accurate",
            OptionKey::NoReplaygain => "--noreplaygain",
            OptionKey::ClipDetect => "--clipdetect",
            OptionKey::QualityHigh => "-h",
            OptionKey::FastEncoding => "-f",
            OptionKey::ForceBitrate => "-F",
            OptionKey::Cbr => "--cbr",
            OptionKey::Vbr => "-v",
            OptionKey::VbrOld => "--vbr-old",
            OptionKey::VbrNew => "--vbr-new",
            OptionKey::IgnoreNoiseInSfb21 => "-Y",
            OptionKey::MarkAsCopyrighted => "-c",
            OptionKey::MarkAsCopy => "-o",
            OptionKey::CrcErrorProtection => "-p",
            OptionKey::Nores => "--nores",
            OptionKey::StrictlyEnforceIso => "--strictly-enforce-ISO",
            OptionKey::Silent => "--silent",
            OptionKey::Quiet => "--quiet",
            OptionKey::Verbose => "--verbose",
            OptionKey::LongHelp => "--longhelp",
            OptionKey::Version => "--version",
            OptionKey::License => "--license",
            OptionKey::NoHistogram => "--nohist",
            _ => return None,
        };
        Some(switch)
    }
}

impl fmt::Display for OptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OptionKey {
    type Err = LameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KEY_NAMES
            .iter()
            .find(|(_, name)| *name == s)
            .map(|(key, _)| *key)
            .ok_or_else(|| LameError::invalid(format!("unknown parameter '{s}'")))
    }
}
