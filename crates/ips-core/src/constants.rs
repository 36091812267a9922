//! Integer and GUID constants understood by modules written against the host

/// Instance status codes
pub mod status {
    /// Instance is being created
    pub const IS_CREATING: i32 = 100;
    /// Instance is active
    pub const IS_ACTIVE: i32 = 102;
    /// Instance is being deleted
    pub const IS_DELETING: i32 = 103;
    /// Instance is inactive
    pub const IS_INACTIVE: i32 = 104;
    /// Instance was not created
    pub const IS_NOTCREATED: i32 = 105;
    /// First code of the module-defined error range
    pub const IS_EBASE: i32 = 200;
}

/// Kernel runlevels
pub mod runlevel {
    pub const KR_CREATE: i32 = 10101;
    pub const KR_INIT: i32 = 10102;
    pub const KR_READY: i32 = 10103;
    pub const KR_UNINIT: i32 = 10104;
    pub const KR_SHUTDOWN: i32 = 10105;
}

/// Message types accepted by `LogMessage`
pub mod log {
    pub const KL_SUCCESS: i32 = 10201;
    pub const KL_NOTIFY: i32 = 10203;
    pub const KL_WARNING: i32 = 10204;
    pub const KL_ERROR: i32 = 10206;
    pub const KL_DEBUG: i32 = 10207;
    pub const KL_CUSTOM: i32 = 10208;
    pub const KL_MESSAGE: i32 = 10205;
}

/// Structured presentation identifiers
pub mod presentation {
    /// Presentation wrapping a named variable profile
    pub const LEGACY: &str = "{4153A8D4-5C33-C65F-C1F3-7B61AAF99B1C}";
    /// Value/caption option list
    pub const ENUMERATION: &str = "{52D9E126-D7D2-2CBB-5E62-4CF7BA7C5D82}";
    pub const VALUE_PRESENTATION: &str = "{3319437D-7CDE-699D-750A-3C6A3841FA75}";
    pub const VALUE_INPUT: &str = "{6F477326-1683-A2FD-D2E7-477F366ECB62}";
    pub const SLIDER: &str = "{6B9CAEEC-5958-C223-30F7-BD36569FC57A}";
    pub const WEB_CONTENT: &str = "{9DE1D610-5106-97FB-714D-1AADEDF8377A}";
    pub const COLOR: &str = "{05CC3CC2-A0B2-5837-A4A7-A07EA0B9DDFB}";
    pub const DATE_TIME: &str = "{497C4845-27FA-6E4F-AE37-5D951D3BDBF9}";
    pub const SWITCH: &str = "{60AE6B26-B3E2-BDB1-A3A1-BE232940664B}";
    pub const SHUTTER: &str = "{6075FC22-69AF-B110-3749-C24138883082}";
    pub const PLAYBACK: &str = "{2F0FF5B0-FC86-117B-DDAA-2D2D33C3F8AC}";
    pub const DURATION: &str = "{08A6AF76-394E-D354-48D5-BFC690488E4E}";
    pub const TEXT_BOX: &str = "{56696857-92B2-1780-16B8-EB6F09D4AEF7}";

    /// Presentation record key holding the presentation id
    pub const KEY_PRESENTATION: &str = "PRESENTATION";
    /// Presentation record key holding the legacy profile name
    pub const KEY_PROFILE: &str = "PROFILE";
    /// Presentation record key holding enumeration options
    pub const KEY_OPTIONS: &str = "OPTIONS";
}

/// Comparison operators of condition rules
pub mod comparison {
    pub const EQUAL: i64 = 0;
    pub const NOT_EQUAL: i64 = 1;
    pub const GREATER: i64 = 2;
    pub const GREATER_OR_EQUAL: i64 = 3;
    pub const SMALLER: i64 = 4;
    pub const SMALLER_OR_EQUAL: i64 = 5;
}

/// Lowest identity treated as a bound action by `HasAction`
pub const FIRST_ACTION_ID: u32 = 10000;

/// Name of the root object
pub const ROOT_NAME: &str = "IP-Symcon";
