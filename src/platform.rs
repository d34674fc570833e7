//! Build target platform table.
//!
//! Files at [`FormatVersion::Unknown8`](crate::version::FormatVersion) and
//! later record the platform the build was produced for. The id space has
//! grown (and occasionally been retired) over the engine's lifetime; an id
//! this table does not know is substituted with [`BuildTarget::Unknown`] and
//! decoding continues - platform identity is advisory, not structural.

use tracing::warn;

/// Platform a serialized file was built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildTarget {
    NoTarget,
    AnyPlayer,
    ValidPlayer,
    StandaloneOsx,
    StandaloneOsxPpc,
    StandaloneOsxIntel,
    StandaloneWindows,
    WebPlayer,
    WebPlayerStreamed,
    Wii,
    Ios,
    Ps3,
    Xbox360,
    Android,
    StandaloneGlesEmu,
    NaCl,
    StandaloneLinux,
    FlashPlayer,
    StandaloneWindows64,
    WebGl,
    WsaPlayer,
    StandaloneLinux64,
    StandaloneLinuxUniversal,
    Wp8Player,
    StandaloneOsxIntel64,
    BlackBerry,
    Tizen,
    PsVita,
    Ps4,
    PsM,
    XboxOne,
    SamsungTv,
    Nintendo3ds,
    WiiU,
    TvOs,
    Switch,
    Lumin,
    Stadia,
    CloudRendering,
    GameCoreXboxSeries,
    GameCoreXboxOne,
    Ps5,
    EmbeddedLinux,
    Qnx,
    /// Id not present in the known set.
    Unknown,
}

impl BuildTarget {
    /// Map a raw platform id, substituting [`BuildTarget::Unknown`] for ids
    /// outside the known set.
    pub fn from_raw(raw: i32) -> Self {
        use BuildTarget::*;
        match raw {
            -2 => NoTarget,
            -1 => AnyPlayer,
            1 => ValidPlayer,
            2 => StandaloneOsx,
            3 => StandaloneOsxPpc,
            4 => StandaloneOsxIntel,
            5 => StandaloneWindows,
            6 => WebPlayer,
            7 => WebPlayerStreamed,
            8 => Wii,
            9 => Ios,
            10 => Ps3,
            11 => Xbox360,
            13 => Android,
            14 => StandaloneGlesEmu,
            16 => NaCl,
            17 => StandaloneLinux,
            18 => FlashPlayer,
            19 => StandaloneWindows64,
            20 => WebGl,
            21 => WsaPlayer,
            24 => StandaloneLinux64,
            25 => StandaloneLinuxUniversal,
            26 => Wp8Player,
            27 => StandaloneOsxIntel64,
            28 => BlackBerry,
            29 => Tizen,
            30 => PsVita,
            31 => Ps4,
            32 => PsM,
            33 => XboxOne,
            34 => SamsungTv,
            35 => Nintendo3ds,
            36 => WiiU,
            37 => TvOs,
            38 => Switch,
            39 => Lumin,
            40 => Stadia,
            41 => CloudRendering,
            42 => GameCoreXboxSeries,
            43 => GameCoreXboxOne,
            44 => Ps5,
            45 => EmbeddedLinux,
            46 => Qnx,
            other => {
                warn!(id = other, "unrecognized build target id");
                Unknown
            }
        }
    }
}
